//! Latency measurement utilities.

use echobench_core::LatencySample;
use hdrhistogram::{CreationError, Histogram};
use std::time::{Duration, Instant};

/// Highest trackable round trip in microseconds (one minute).
const MAX_TRACKABLE_MICROS: u64 = 60_000_000;

/// Percentile summary of recorded round trips.
#[derive(Debug, Clone, PartialEq)]
pub struct HistogramSummary {
    /// Minimum latency.
    pub min: Duration,
    /// Maximum latency.
    pub max: Duration,
    /// Mean latency.
    pub mean: Duration,
    /// Median latency (p50).
    pub p50: Duration,
    /// 99th percentile latency.
    pub p99: Duration,
    /// 99.9th percentile latency.
    pub p999: Duration,
    /// Sample count.
    pub count: u64,
}

/// Records round-trip samples into an HDR histogram with microsecond
/// resolution.
///
/// Values above one minute are clamped to the highest trackable value.
pub struct LatencyHistogram {
    histogram: Histogram<u64>,
}

impl LatencyHistogram {
    /// Creates a histogram with three significant figures of precision.
    ///
    /// # Errors
    /// Returns the histogram creation error if the bounds are rejected.
    pub fn new() -> Result<Self, CreationError> {
        Ok(Self {
            histogram: Histogram::new_with_bounds(1, MAX_TRACKABLE_MICROS, 3)?,
        })
    }

    /// Creates a histogram holding `samples`.
    ///
    /// # Errors
    /// Returns the histogram creation error if the bounds are rejected.
    pub fn from_samples(samples: &[LatencySample]) -> Result<Self, CreationError> {
        let mut histogram = Self::new()?;
        for &sample in samples {
            histogram.record_sample(sample);
        }
        Ok(histogram)
    }

    /// Records a round trip.
    pub fn record(&mut self, latency: Duration) {
        let micros = u64::try_from(latency.as_micros()).unwrap_or(u64::MAX);
        self.histogram.saturating_record(micros.max(1));
    }

    /// Records a benchmark sample.
    pub fn record_sample(&mut self, sample: LatencySample) {
        self.record(sample.as_duration());
    }

    /// Measures the latency of a function.
    pub fn measure<F, T>(&mut self, f: F) -> T
    where
        F: FnOnce() -> T,
    {
        let start = Instant::now();
        let result = f();
        self.record(start.elapsed());
        result
    }

    /// Computes the percentile summary.
    ///
    /// Returns `None` if nothing has been recorded.
    #[must_use]
    pub fn summary(&self) -> Option<HistogramSummary> {
        if self.is_empty() {
            return None;
        }

        let h = &self.histogram;
        Some(HistogramSummary {
            min: Duration::from_micros(h.min()),
            max: Duration::from_micros(h.max()),
            mean: Duration::from_secs_f64(h.mean() / 1_000_000.0),
            p50: Duration::from_micros(h.value_at_quantile(0.5)),
            p99: Duration::from_micros(h.value_at_quantile(0.99)),
            p999: Duration::from_micros(h.value_at_quantile(0.999)),
            count: h.len(),
        })
    }

    /// Clears all samples.
    pub fn clear(&mut self) {
        self.histogram.reset();
    }

    /// Returns the number of samples.
    #[must_use]
    pub fn len(&self) -> u64 {
        self.histogram.len()
    }

    /// Returns true if no samples have been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.histogram.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_histogram_summary() {
        let mut histogram = LatencyHistogram::new().unwrap();

        for i in 1..=100 {
            histogram.record(Duration::from_micros(i * 10));
        }

        let summary = histogram.summary().unwrap();
        assert_eq!(summary.count, 100);
        assert_eq!(summary.min, Duration::from_micros(10));
        assert_eq!(summary.max, Duration::from_micros(1000));
        assert!(summary.p50 >= Duration::from_micros(490));
        assert!(summary.p50 <= Duration::from_micros(510));
        assert!(summary.p99 <= summary.max);
        assert!(summary.min <= summary.mean && summary.mean <= summary.max);
    }

    #[test]
    fn test_empty_histogram() {
        let histogram = LatencyHistogram::new().unwrap();
        assert!(histogram.is_empty());
        assert!(histogram.summary().is_none());
    }

    #[test]
    fn test_record_samples() {
        let samples = [1000, 2000, 3000].map(LatencySample::from_micros);
        let mut histogram = LatencyHistogram::from_samples(&samples).unwrap();

        assert_eq!(histogram.len(), 3);
        let summary = histogram.summary().unwrap();
        assert_eq!(summary.min, Duration::from_micros(1000));
        assert!(summary.mean >= Duration::from_micros(1990));
        assert!(summary.mean <= Duration::from_micros(2010));

        histogram.clear();
        assert!(histogram.is_empty());
    }

    #[test]
    fn test_measure() {
        let mut histogram = LatencyHistogram::new().unwrap();

        let result = histogram.measure(|| 42);
        assert_eq!(result, 42);
        assert_eq!(histogram.len(), 1);
    }

    #[test]
    fn test_oversized_value_is_clamped() {
        let mut histogram = LatencyHistogram::new().unwrap();
        histogram.record(Duration::from_secs(3600));
        assert_eq!(histogram.len(), 1);
    }
}
