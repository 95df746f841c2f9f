//! Latency samples and benchmark statistics.

use std::fmt;
use std::time::Duration;

const BYTES_PER_MB: f64 = 1_048_576.0;

/// One measured request/response round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LatencySample(Duration);

impl LatencySample {
    /// Wraps a measured round-trip duration.
    #[must_use]
    pub const fn new(rtt: Duration) -> Self {
        Self(rtt)
    }

    /// Creates a sample from a microsecond count.
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(Duration::from_micros(micros))
    }

    /// Returns the round-trip duration.
    #[must_use]
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// Returns the round trip in whole microseconds.
    #[must_use]
    pub fn as_micros(&self) -> u64 {
        u64::try_from(self.0.as_micros()).unwrap_or(u64::MAX)
    }
}

impl From<Duration> for LatencySample {
    fn from(rtt: Duration) -> Self {
        Self(rtt)
    }
}

/// Summary of a benchmark run.
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkStats {
    /// Number of completed exchanges.
    pub count: usize,
    /// Wall time of the run in milliseconds.
    pub total_duration_ms: u64,
    /// Bytes sent plus bytes received.
    pub total_bytes: u64,
    /// Mean round trip.
    pub avg_latency: Duration,
    /// Fastest round trip.
    pub min_latency: Duration,
    /// Slowest round trip.
    pub max_latency: Duration,
    /// Median round trip (nearest rank).
    pub p50_latency: Duration,
    /// 99th percentile round trip (nearest rank).
    pub p99_latency: Duration,
    /// Throughput in MB/s, `None` when the run took under a millisecond.
    pub throughput_mbps: Option<f64>,
    /// Exchanges per second, `None` when the run took under a millisecond.
    pub messages_per_sec: Option<f64>,
}

impl BenchmarkStats {
    /// Reduces a run's samples and totals into summary statistics.
    ///
    /// Returns `None` when there are no samples.
    #[must_use]
    pub fn compute(
        samples: &[LatencySample],
        total_bytes: u64,
        total_duration: Duration,
    ) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted: Vec<Duration> = samples.iter().map(LatencySample::as_duration).collect();
        sorted.sort_unstable();

        let count = sorted.len();
        let total: Duration = sorted.iter().sum();
        let avg_latency = total / u32::try_from(count).unwrap_or(u32::MAX);
        let total_duration_ms = u64::try_from(total_duration.as_millis()).unwrap_or(u64::MAX);

        let (throughput_mbps, messages_per_sec) = if total_duration_ms == 0 {
            (None, None)
        } else {
            let secs = total_duration_ms as f64 / 1000.0;
            (
                Some(total_bytes as f64 / BYTES_PER_MB / secs),
                Some(count as f64 * 1000.0 / total_duration_ms as f64),
            )
        };

        Some(Self {
            count,
            total_duration_ms,
            total_bytes,
            avg_latency,
            min_latency: sorted[0],
            max_latency: sorted[count - 1],
            p50_latency: sorted[count / 2],
            p99_latency: sorted[(count * 99 / 100).min(count - 1)],
            throughput_mbps,
            messages_per_sec,
        })
    }

    /// Mean round trip in milliseconds.
    #[must_use]
    pub fn avg_latency_ms(&self) -> f64 {
        as_millis_f64(self.avg_latency)
    }

    /// Fastest round trip in milliseconds.
    #[must_use]
    pub fn min_latency_ms(&self) -> f64 {
        as_millis_f64(self.min_latency)
    }

    /// Slowest round trip in milliseconds.
    #[must_use]
    pub fn max_latency_ms(&self) -> f64 {
        as_millis_f64(self.max_latency)
    }
}

/// Messages per second over `elapsed`, `None` if no time has passed.
#[must_use]
pub fn message_rate(count: u64, elapsed: Duration) -> Option<f64> {
    let secs = elapsed.as_secs_f64();
    (secs > 0.0).then(|| count as f64 / secs)
}

fn as_millis_f64(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}

fn fmt_optional(value: Option<f64>, unit: &str) -> String {
    match value {
        Some(v) => format!("{v:.2}{unit}"),
        None => "n/a".to_string(),
    }
}

impl fmt::Display for BenchmarkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(40);
        let thin = "-".repeat(40);

        writeln!(f, "{rule}")?;
        writeln!(f, "BENCHMARK RESULTS")?;
        writeln!(f, "{rule}")?;
        writeln!(f, "Messages Sent:     {}", self.count)?;
        writeln!(f, "Total Duration:    {} ms", self.total_duration_ms)?;
        writeln!(f, "Total Data:        {:.2} KB", self.total_bytes as f64 / 1024.0)?;
        writeln!(f, "{thin}")?;
        writeln!(f, "Latency (RTT):")?;
        writeln!(f, "  Average:         {:.3} ms", self.avg_latency_ms())?;
        writeln!(f, "  Min:             {:.3} ms", self.min_latency_ms())?;
        writeln!(f, "  Max:             {:.3} ms", self.max_latency_ms())?;
        writeln!(f, "  p50:             {:.3} ms", as_millis_f64(self.p50_latency))?;
        writeln!(f, "  p99:             {:.3} ms", as_millis_f64(self.p99_latency))?;
        writeln!(f, "{thin}")?;
        writeln!(
            f,
            "Throughput:        {}",
            fmt_optional(self.throughput_mbps, " MB/s")
        )?;
        writeln!(
            f,
            "Messages/sec:      {}",
            fmt_optional(self.messages_per_sec, "")
        )?;
        write!(f, "{rule}")
    }
}
