//! Passive observation of outbound HTTP calls.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use url::Url;

use super::collector::Collector;
use crate::Error;

/// Prefix tagging every observation made by the HTTP transport.
pub const TRACE_PREFIX: &str = "outbound-http:";

/// Observer invoked around each network call.
///
/// All methods default to no-ops, so implementors override only the events
/// they care about. Hooks must not block: they run inline on the delivery
/// path. A hook never influences delivery; the transport calls it and
/// ignores it.
pub trait TraceHook: Send + Sync {
    /// A connection slot was granted after waiting `waited` in the pool queue.
    ///
    /// Not called when a slot was free on arrival.
    fn on_connection_queued(&self, _endpoint: &Url, _waited: Duration) {}

    /// The POST is about to be sent.
    fn on_request_start(&self, _endpoint: &Url) {}

    /// A response with `status` arrived `elapsed` after the request started.
    fn on_request_end(&self, _endpoint: &Url, _status: u16, _elapsed: Duration) {}

    /// The exchange failed without a usable response.
    fn on_request_exception(&self, _endpoint: &Url, _error: &Error, _elapsed: Duration) {}
}

/// Hook used when no observability collaborator is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopTraceHook;

impl TraceHook for NoopTraceHook {}

/// Hook forwarding call timings to a [`Collector`] under a fixed prefix.
///
/// Recorded names:
/// - `<prefix>connection_queued`: time spent waiting for a pool slot, only
///   for deliveries that found their host or the pool full
/// - `<prefix>request`: time from sending the POST to its response or
///   failure; only 2xx responses count as successes
///
/// ## Example
///
/// ```rust
/// use std::sync::Arc;
/// use agent_outbound_http::tracing_support::{StatsTracer, TimingCollector, TRACE_PREFIX};
///
/// let collector = TimingCollector::new();
/// let tracer = StatsTracer::new(Arc::new(collector.clone()), TRACE_PREFIX);
/// assert_eq!(tracer.prefix(), "outbound-http:");
/// ```
pub struct StatsTracer {
    collector: Arc<dyn Collector>,
    prefix: String,
    queued_name: String,
    request_name: String,
}

impl StatsTracer {
    /// Creates a tracer recording into `collector` with names under `prefix`.
    pub fn new(collector: Arc<dyn Collector>, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        Self {
            collector,
            queued_name: format!("{}connection_queued", prefix),
            request_name: format!("{}request", prefix),
            prefix,
        }
    }

    /// Returns the name prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl fmt::Debug for StatsTracer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatsTracer")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl TraceHook for StatsTracer {
    fn on_connection_queued(&self, _endpoint: &Url, waited: Duration) {
        self.collector.record(&self.queued_name, waited, true);
    }

    fn on_request_end(&self, _endpoint: &Url, status: u16, elapsed: Duration) {
        self.collector
            .record(&self.request_name, elapsed, (200..300).contains(&status));
    }

    fn on_request_exception(&self, _endpoint: &Url, _error: &Error, elapsed: Duration) {
        self.collector.record(&self.request_name, elapsed, false);
    }
}
