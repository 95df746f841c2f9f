//! echobench: TCP round-trip latency benchmark.
//!
//! `echobench server` (the default) runs the echo server on port 8888.
//! `echobench client` connects to a local server, performs 1000 timed
//! exchanges and prints the statistics.
//!
//! Run with: `cargo run -- client`

use anyhow::Context;
use clap::{Parser, ValueEnum};
use echobench_client::ClientBuilder;
use echobench_server::{ServerBuilder, ServerError};
use tracing_subscriber::EnvFilter;

/// Which side of the benchmark to run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Accept connections and echo every message.
    #[default]
    Server,
    /// Connect to the server and measure round trips.
    Client,
}

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "echobench")]
#[command(version)]
#[command(about = "TCP round-trip latency benchmark", long_about = None)]
struct CliArgs {
    /// Run as server or client
    #[arg(value_enum, default_value_t = Mode::Server)]
    mode: Mode,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match args.mode {
        Mode::Server => run_server().await,
        Mode::Client => run_client().await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    let (mut server, handle) = ServerBuilder::new().build();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutting down server");
            handle.stop();
        }
    });

    match server.start().await {
        Ok(()) | Err(ServerError::Shutdown) => {
            tracing::info!("Server stopped");
            Ok(())
        }
        Err(e) => Err(e).context("server failed to start"),
    }
}

async fn run_client() -> anyhow::Result<()> {
    let (client, handle) = ClientBuilder::default().build();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Cancelling benchmark");
            handle.cancel();
        }
    });

    let report = client
        .run()
        .await
        .context("benchmark client could not connect")?;

    if let Some(failure) = &report.failure {
        tracing::warn!(
            completed = report.completed(),
            requested = report.requested,
            %failure,
            "Benchmark ended early"
        );
    }

    match &report.stats {
        Some(stats) => println!("{stats}"),
        None => println!("No statistics: no exchange completed"),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults_to_server() {
        let args = CliArgs::try_parse_from(["echobench"]).unwrap();
        assert_eq!(args.mode, Mode::Server);
    }

    #[test]
    fn test_mode_client() {
        let args = CliArgs::try_parse_from(["echobench", "client"]).unwrap();
        assert_eq!(args.mode, Mode::Client);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        assert!(CliArgs::try_parse_from(["echobench", "proxy"]).is_err());
    }
}
