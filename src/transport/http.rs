//! HTTP/HTTPS outbound transport.
//!
//! This module provides the transport that POSTs serialized agent messages to
//! `http` and `https` endpoints. One attempt per call, no retries.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, warn};
use url::Url;

use super::session::TransportSession;
use super::traits::{DeliveryStats, OutboundTransport, Payload, TransportState};
use crate::config::{FailureMode, HttpTransportConfig, PoolConfig, TlsConfig};
use crate::tracing_support::{Collector, NoopTraceHook, StatsTracer, TRACE_PREFIX, TraceHook};
use crate::Error;

/// URI schemes handled by [`HttpTransport`].
pub const HTTP_SCHEMES: &[&str] = &["http", "https"];

enum Lifecycle {
    Uninitialized,
    Started(Arc<TransportSession>),
    Stopped,
}

impl Lifecycle {
    fn state(&self) -> TransportState {
        match self {
            Lifecycle::Uninitialized => TransportState::Uninitialized,
            Lifecycle::Started(_) => TransportState::Started,
            Lifecycle::Stopped => TransportState::Stopped,
        }
    }
}

// ============================================================================
// HTTP Transport
// ============================================================================

/// Outbound transport for `http` and `https` endpoints.
///
/// Owns a pooled connection resource between [`start`](HttpTransport::start)
/// and [`stop`](HttpTransport::stop). [`deliver`](HttpTransport::deliver) is
/// safe to call concurrently; calls beyond the pool limits wait for a slot.
///
/// ## Example
///
/// ```rust,no_run
/// use agent_outbound_http::{HttpTransport, Payload};
///
/// # async fn run() -> Result<(), agent_outbound_http::Error> {
/// let transport = HttpTransport::builder().build();
/// transport.start().await?;
///
/// transport
///     .deliver(vec![0x01u8, 0x02], "https://agent.example/inbox")
///     .await?;
///
/// transport.stop().await?;
/// # Ok(())
/// # }
/// ```
pub struct HttpTransport {
    config: HttpTransportConfig,
    hook: Arc<dyn TraceHook>,
    lifecycle: RwLock<Lifecycle>,
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("state", &self.state())
            .field("failure_mode", &self.config.failure_mode)
            .finish_non_exhaustive()
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new(HttpTransportConfig::default())
    }
}

impl HttpTransport {
    /// Creates a new HTTP transport builder.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::new()
    }

    /// Creates an unstarted transport with the given configuration and no
    /// trace hook.
    pub fn new(config: HttpTransportConfig) -> Self {
        Self {
            config,
            hook: Arc::new(NoopTraceHook),
            lifecycle: RwLock::new(Lifecycle::Uninitialized),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// Returns the lifecycle state.
    pub fn state(&self) -> TransportState {
        self.lifecycle.read().state()
    }

    /// Returns delivery statistics for the running session, if started.
    pub fn stats(&self) -> Option<DeliveryStats> {
        match &*self.lifecycle.read() {
            Lifecycle::Started(session) => Some(session.stats()),
            _ => None,
        }
    }

    /// Opens the connection pool.
    ///
    /// Returns the transport for chaining. Fails with
    /// [`ErrorKind::InvalidState`](crate::ErrorKind::InvalidState) if the
    /// transport was already started or stopped, and with
    /// [`ErrorKind::Configuration`](crate::ErrorKind::Configuration) if the
    /// HTTP client cannot be built.
    pub async fn start(&self) -> Result<&Self, Error> {
        let mut lifecycle = self.lifecycle.write();
        match *lifecycle {
            Lifecycle::Uninitialized => {}
            Lifecycle::Started(_) => {
                return Err(Error::invalid_state("transport already started"));
            }
            Lifecycle::Stopped => {
                return Err(Error::invalid_state(
                    "transport has been stopped; construct a new transport",
                ));
            }
        }

        let session = TransportSession::new(&self.config, Arc::clone(&self.hook))?;
        *lifecycle = Lifecycle::Started(Arc::new(session));

        debug!(
            max_connections = self.config.pool.max_connections,
            max_connections_per_host = self.config.pool.max_connections_per_host,
            "outbound HTTP transport started"
        );
        Ok(self)
    }

    /// Closes the connection pool.
    ///
    /// Deliveries waiting for a connection slot fail with
    /// [`ErrorKind::InvalidState`](crate::ErrorKind::InvalidState);
    /// deliveries already on the wire run to completion. Calling `stop`
    /// twice, or before `start`, is an error.
    pub async fn stop(&self) -> Result<(), Error> {
        let session = {
            let mut lifecycle = self.lifecycle.write();
            match std::mem::replace(&mut *lifecycle, Lifecycle::Stopped) {
                Lifecycle::Started(session) => session,
                Lifecycle::Uninitialized => {
                    *lifecycle = Lifecycle::Uninitialized;
                    return Err(Error::invalid_state("transport has not been started"));
                }
                Lifecycle::Stopped => {
                    return Err(Error::invalid_state("transport already stopped"));
                }
            }
        };

        session.close();
        debug!(stats = ?session.stats(), "outbound HTTP transport stopped");
        Ok(())
    }

    /// POSTs `payload` to `endpoint` once.
    ///
    /// The `Content-Type` is `application/ssi-agent-wire` for binary payloads
    /// and `application/json` for text. Any 2xx response counts as delivered.
    ///
    /// An empty, unparseable or non-HTTP endpoint fails with
    /// [`ErrorKind::InvalidEndpoint`](crate::ErrorKind::InvalidEndpoint)
    /// before any network I/O. Other failures are returned or only logged
    /// depending on [`FailureMode`].
    pub async fn deliver(&self, payload: impl Into<Payload>, endpoint: &str) -> Result<(), Error> {
        if endpoint.is_empty() {
            return Err(Error::missing_endpoint());
        }
        let url = parse_endpoint(endpoint)?;
        let session = self.session()?;

        let payload = payload.into();
        let content_type = payload.content_type();
        debug!(
            endpoint = %url,
            payload = %payload.display(),
            content_type,
            "Posting to {}", url
        );

        let err = match session.post(&url, payload, content_type).await {
            Ok(()) => return Ok(()),
            Err(e) => e.with_endpoint(endpoint),
        };

        if err.kind().is_precondition() || self.config.failure_mode.propagates() {
            debug!(endpoint, error = %err, source = ?std::error::Error::source(&err), "delivery failed");
            return Err(err);
        }

        warn!(
            endpoint,
            error = %err,
            source = ?std::error::Error::source(&err),
            "delivery failed; caller is not notified in log-only mode"
        );
        Ok(())
    }

    fn session(&self) -> Result<Arc<TransportSession>, Error> {
        match &*self.lifecycle.read() {
            Lifecycle::Started(session) => Ok(Arc::clone(session)),
            Lifecycle::Uninitialized => Err(Error::invalid_state(
                "transport has not been started",
            )),
            Lifecycle::Stopped => Err(Error::invalid_state("transport has been stopped")),
        }
    }
}

/// Parses an endpoint and checks it targets an HTTP scheme.
fn parse_endpoint(endpoint: &str) -> Result<Url, Error> {
    let url = Url::parse(endpoint).map_err(|e| Error::from(e).with_endpoint(endpoint))?;
    if !HTTP_SCHEMES.contains(&url.scheme()) {
        return Err(Error::invalid_endpoint(format!(
            "unsupported scheme '{}'",
            url.scheme()
        ))
        .with_endpoint(endpoint));
    }
    Ok(url)
}

#[async_trait::async_trait]
impl OutboundTransport for HttpTransport {
    fn schemes(&self) -> &'static [&'static str] {
        HTTP_SCHEMES
    }

    fn state(&self) -> TransportState {
        HttpTransport::state(self)
    }

    async fn start(&self) -> Result<(), Error> {
        HttpTransport::start(self).await.map(|_| ())
    }

    async fn stop(&self) -> Result<(), Error> {
        HttpTransport::stop(self).await
    }

    async fn deliver(&self, payload: Payload, endpoint: &str) -> Result<(), Error> {
        HttpTransport::deliver(self, payload, endpoint).await
    }
}

// ============================================================================
// HTTP Transport Builder
// ============================================================================

/// Builder for [`HttpTransport`].
pub struct HttpTransportBuilder {
    config: HttpTransportConfig,
    hook: Option<Arc<dyn TraceHook>>,
}

impl HttpTransportBuilder {
    fn new() -> Self {
        Self {
            config: HttpTransportConfig::default(),
            hook: None,
        }
    }

    /// Sets the whole configuration.
    pub fn config(mut self, config: HttpTransportConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the connection pool configuration.
    pub fn pool_config(mut self, config: PoolConfig) -> Self {
        self.config.pool = config;
        self
    }

    /// Sets the TLS configuration.
    pub fn tls_config(mut self, config: TlsConfig) -> Self {
        self.config.tls = config;
        self
    }

    /// Sets the per-request deadline.
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    /// Sets the failure mode.
    pub fn failure_mode(mut self, mode: FailureMode) -> Self {
        self.config.failure_mode = mode;
        self
    }

    /// Reports call timings to `collector` under the `outbound-http:` prefix.
    ///
    /// Replaces any hook set with [`trace_hook`](Self::trace_hook).
    pub fn collector(mut self, collector: Arc<dyn Collector>) -> Self {
        self.hook = Some(Arc::new(StatsTracer::new(collector, TRACE_PREFIX)));
        self
    }

    /// Installs a custom trace hook.
    ///
    /// Replaces any collector set with [`collector`](Self::collector).
    pub fn trace_hook(mut self, hook: Arc<dyn TraceHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Builds the (unstarted) transport.
    pub fn build(self) -> HttpTransport {
        let mut transport = HttpTransport::new(self.config);
        if let Some(hook) = self.hook {
            transport.hook = hook;
        }
        transport
    }
}

// ============================================================================
// Tests
// ============================================================================
