//! Client and server exercised together over loopback.

use echobench_client::{ClientBuilder, ClientError, FailureKind};
use echobench_core::EchoResponse;
use echobench_server::{ListenerState, ServerBuilder, ServerHandle};
use echobench_transport::TuningProfile;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

async fn spawn_server() -> (SocketAddr, ServerHandle, JoinHandle<()>) {
    let (mut server, mut handle) = ServerBuilder::new()
        .bind("127.0.0.1:0".parse().unwrap())
        .drain_timeout(Duration::from_millis(200))
        .build();
    let task = tokio::spawn(async move {
        server.start().await.unwrap();
    });
    let addr = handle.listening().await.unwrap();
    (addr, handle, task)
}

/// A raw peer that echoes the first `count` reads and then hangs up.
async fn spawn_short_lived_peer(count: u64) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let task = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 8192];
        for n in 1..=count {
            let read = stream.read(&mut buf).await.unwrap();
            let text = String::from_utf8_lossy(&buf[..read]).into_owned();
            let reply = echobench_core::message::encode_echo(&text, n, 0);
            stream.write_all(reply.as_bytes()).await.unwrap();
        }
    });
    (addr, task)
}

#[tokio::test]
async fn test_benchmark_against_echo_server() {
    let (addr, handle, server) = spawn_server().await;

    let (client, _client_handle) = ClientBuilder::new(addr).message_count(3).build();
    let report = client.run().await.unwrap();

    assert!(report.is_complete());
    assert_eq!(report.completed(), 3);
    let stats = report.stats.clone().unwrap();
    assert_eq!(stats.count, 3);
    assert!(stats.min_latency <= stats.avg_latency);
    assert!(stats.avg_latency <= stats.max_latency);
    assert!(stats.total_bytes > 0);

    let sum: Duration = report.samples.iter().map(|s| s.as_duration()).sum();
    assert!(sum <= report.total_duration);

    handle.stop();
    server.await.unwrap();
    assert_eq!(handle.state(), ListenerState::Stopped);
}

#[tokio::test]
async fn test_server_numbers_messages_per_connection() {
    let (addr, handle, server) = spawn_server().await;

    for _ in 0..2 {
        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        let mut buf = vec![0u8; 8192];
        for expected in 1..=3u64 {
            stream.write_all(b"Message #1 from test").await.unwrap();
            let n = stream.read(&mut buf).await.unwrap();
            let reply = String::from_utf8(buf[..n].to_vec()).unwrap();
            let parsed = EchoResponse::parse(&reply).unwrap();
            assert_eq!(parsed.echoed, "Message #1 from test");
            assert_eq!(parsed.message_number, expected);
        }
    }

    handle.stop();
    server.await.unwrap();
}

#[tokio::test]
async fn test_server_serves_clients_concurrently() {
    let (addr, handle, server) = spawn_server().await;

    let runs: Vec<_> = (0..4)
        .map(|i| {
            tokio::spawn(
                ClientBuilder::new(addr)
                    .message_count(20)
                    .client_id(format!("client-{i}"))
                    .build()
                    .0
                    .run(),
            )
        })
        .collect();

    for run in runs {
        let report = run.await.unwrap().unwrap();
        assert!(report.is_complete());
        assert_eq!(report.completed(), 20);
    }

    handle.stop();
    server.await.unwrap();
}

#[tokio::test]
async fn test_run_ends_early_when_server_hangs_up() {
    let (addr, peer) = spawn_short_lived_peer(2).await;

    let (client, _handle) = ClientBuilder::new(addr).message_count(5).build();
    let report = tokio::time::timeout(Duration::from_secs(10), client.run())
        .await
        .expect("client hung after server closed")
        .unwrap();
    peer.await.unwrap();

    assert_eq!(report.completed(), 2);
    assert!(report.completed() <= report.requested as usize);
    assert_eq!(report.failure.as_ref().unwrap().seq, 3);
    assert_eq!(report.stats.unwrap().count, 2);
}

#[tokio::test]
async fn test_cancel_while_awaiting_response() {
    // Accepts but never answers.
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let silent = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(stream);
    });

    let (client, handle) = ClientBuilder::new(addr).message_count(5).build();
    let run = tokio::spawn(client.run());
    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.cancel();

    let report = run.await.unwrap().unwrap();
    assert_eq!(report.failure.unwrap().kind, FailureKind::Cancelled);
    assert!(report.stats.is_none());
    silent.abort();
}

#[tokio::test]
async fn test_receive_timeout_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let silent = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;
        drop(stream);
    });

    let (client, _handle) = ClientBuilder::new(addr)
        .message_count(2)
        .profile(TuningProfile::default().recv_timeout(Duration::from_millis(100)))
        .build();
    let report = client.run().await.unwrap();

    let failure = report.failure.unwrap();
    assert_eq!(failure.seq, 1);
    assert_eq!(failure.kind, FailureKind::Timeout);
    silent.abort();
}

#[tokio::test]
async fn test_connect_refused_is_fatal() {
    let (addr, handle, server) = spawn_server().await;
    handle.stop();
    server.await.unwrap();

    let (client, _handle) = ClientBuilder::new(addr).build();
    assert!(matches!(client.run().await, Err(ClientError::Connect { .. })));
}

#[tokio::test]
async fn test_stop_drains_open_sessions() {
    let (addr, handle, server) = spawn_server().await;

    let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
    stream.write_all(b"hello").await.unwrap();
    let mut buf = vec![0u8; 8192];
    let n = stream.read(&mut buf).await.unwrap();
    assert!(n > 0);

    // The session stays open past the drain window; stop still returns.
    handle.stop();
    tokio::time::timeout(Duration::from_secs(5), server)
        .await
        .expect("server did not finish after drain window")
        .unwrap();
    assert_eq!(handle.state(), ListenerState::Stopped);
}
