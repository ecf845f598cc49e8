//! Timing collection for traced calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;

/// Sink for named call timings.
///
/// Implement this to bridge the transport's observations into an existing
/// metrics system. Implementations are shared across concurrent deliveries
/// and must be cheap and non-blocking.
pub trait Collector: Send + Sync {
    /// Records one call under `name` that took `elapsed`.
    fn record(&self, name: &str, elapsed: Duration, success: bool);
}

/// In-memory [`Collector`] keeping aggregate timings per name.
///
/// Cloning is cheap; clones share the same data.
///
/// ## Example
///
/// ```rust
/// use std::time::Duration;
/// use agent_outbound_http::tracing_support::{Collector, TimingCollector};
///
/// let collector = TimingCollector::new();
/// collector.record("outbound-http:request", Duration::from_millis(12), true);
///
/// let timing = collector.get("outbound-http:request").unwrap();
/// assert_eq!(timing.count, 1);
/// assert_eq!(timing.mean(), Duration::from_millis(12));
/// ```
#[derive(Debug, Clone, Default)]
pub struct TimingCollector {
    inner: Arc<RwLock<HashMap<String, TimingSnapshot>>>,
}

impl TimingCollector {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the aggregate for `name`, if anything was recorded.
    pub fn get(&self, name: &str) -> Option<TimingSnapshot> {
        self.inner.read().get(name).cloned()
    }

    /// Returns all aggregates.
    pub fn snapshot(&self) -> HashMap<String, TimingSnapshot> {
        self.inner.read().clone()
    }

    /// Clears all aggregates.
    pub fn reset(&self) {
        self.inner.write().clear();
    }
}

impl Collector for TimingCollector {
    fn record(&self, name: &str, elapsed: Duration, success: bool) {
        let mut timings = self.inner.write();
        let entry = timings.entry(name.to_string()).or_default();
        entry.count += 1;
        if !success {
            entry.failures += 1;
        }
        entry.total += elapsed;
        entry.max = entry.max.max(elapsed);
    }
}

/// Aggregate timings recorded under one name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimingSnapshot {
    /// Number of recorded calls.
    pub count: u64,
    /// Number of calls recorded as failed.
    pub failures: u64,
    /// Sum of all call durations.
    pub total: Duration,
    /// Longest call duration.
    pub max: Duration,
}

impl TimingSnapshot {
    /// Returns the mean call duration.
    pub fn mean(&self) -> Duration {
        if self.count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos((self.total.as_nanos() / u128::from(self.count)) as u64)
    }

    /// Returns the failure rate (0.0 - 1.0).
    pub fn failure_rate(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.failures as f64 / self.count as f64
    }
}
