//! Mock transport implementation for testing.
//!
//! This module provides a transport that records deliveries in memory,
//! allowing orchestrator code to be tested without network dependencies.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::http::HTTP_SCHEMES;
use super::traits::{OutboundTransport, Payload, TransportState};
use crate::Error;

/// A delivery recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDelivery {
    /// The payload as handed to `deliver`.
    pub payload: Payload,
    /// The target endpoint.
    pub endpoint: String,
    /// The `Content-Type` the payload would have been posted with.
    pub content_type: &'static str,
}

/// Mock transport for testing.
///
/// Follows the same lifecycle and endpoint preconditions as
/// [`HttpTransport`](super::HttpTransport) but never touches the network.
/// Failures can be injected with [`set_failure`](MockTransport::set_failure).
///
/// ## Example
///
/// ```rust
/// use agent_outbound_http::{MockTransport, OutboundTransport, Payload};
///
/// # tokio_test::block_on(async {
/// let transport = MockTransport::new();
/// transport.start().await.unwrap();
/// transport
///     .deliver(Payload::from("hello"), "https://agent.example/inbox")
///     .await
///     .unwrap();
///
/// assert_eq!(transport.deliveries().len(), 1);
/// # });
/// ```
pub struct MockTransport {
    schemes: &'static [&'static str],
    state: RwLock<TransportState>,
    deliveries: RwLock<Vec<RecordedDelivery>>,
    /// Delivery attempt counter.
    request_count: AtomicU64,
    /// Failure returned by the next delivery attempt.
    simulate_failure: RwLock<Option<Error>>,
}

impl MockTransport {
    /// Creates a mock transport handling `http` and `https`.
    pub fn new() -> Self {
        Self::with_schemes(HTTP_SCHEMES)
    }

    /// Creates a mock transport handling the given schemes.
    pub fn with_schemes(schemes: &'static [&'static str]) -> Self {
        Self {
            schemes,
            state: RwLock::new(TransportState::Uninitialized),
            deliveries: RwLock::new(Vec::new()),
            request_count: AtomicU64::new(0),
            simulate_failure: RwLock::new(None),
        }
    }

    /// Sets a failure to simulate on the next delivery.
    pub fn set_failure(&self, error: Error) {
        *self.simulate_failure.write() = Some(error);
    }

    /// Clears any simulated failure.
    pub fn clear_failure(&self) {
        *self.simulate_failure.write() = None;
    }

    /// Returns the number of delivery attempts that reached the transport
    /// while started, including simulated failures.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Returns the successful deliveries, in order.
    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries.read().clone()
    }

    /// Returns the successful deliveries to `endpoint`.
    pub fn deliveries_to(&self, endpoint: &str) -> Vec<RecordedDelivery> {
        self.deliveries
            .read()
            .iter()
            .filter(|delivery| delivery.endpoint == endpoint)
            .cloned()
            .collect()
    }

    /// Clears recorded deliveries.
    pub fn clear_deliveries(&self) {
        self.deliveries.write().clear();
    }

    fn check_failure(&self) -> Result<(), Error> {
        let failure = self.simulate_failure.write().take();
        if let Some(error) = failure {
            return Err(error);
        }
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockTransport")
            .field("schemes", &self.schemes)
            .field("state", &*self.state.read())
            .field("request_count", &self.request_count())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl OutboundTransport for MockTransport {
    fn schemes(&self) -> &'static [&'static str] {
        self.schemes
    }

    fn state(&self) -> TransportState {
        *self.state.read()
    }

    async fn start(&self) -> Result<(), Error> {
        let mut state = self.state.write();
        match *state {
            TransportState::Uninitialized => {
                *state = TransportState::Started;
                Ok(())
            }
            TransportState::Started => Err(Error::invalid_state("transport already started")),
            TransportState::Stopped => Err(Error::invalid_state("transport has been stopped")),
        }
    }

    async fn stop(&self) -> Result<(), Error> {
        let mut state = self.state.write();
        match *state {
            TransportState::Started => {
                *state = TransportState::Stopped;
                Ok(())
            }
            TransportState::Uninitialized => {
                Err(Error::invalid_state("transport has not been started"))
            }
            TransportState::Stopped => Err(Error::invalid_state("transport already stopped")),
        }
    }

    async fn deliver(&self, payload: Payload, endpoint: &str) -> Result<(), Error> {
        if endpoint.is_empty() {
            return Err(Error::missing_endpoint());
        }
        if !self.supports(endpoint) {
            return Err(Error::invalid_endpoint("unsupported scheme").with_endpoint(endpoint));
        }
        if !self.state().is_started() {
            return Err(Error::invalid_state("transport has not been started"));
        }

        self.request_count.fetch_add(1, Ordering::Relaxed);
        self.check_failure()
            .map_err(|e| e.with_endpoint(endpoint))?;

        let content_type = payload.content_type();
        self.deliveries.write().push(RecordedDelivery {
            payload,
            endpoint: endpoint.to_string(),
            content_type,
        });
        Ok(())
    }
}
