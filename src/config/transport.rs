//! Top-level configuration for the HTTP transport.

use std::time::Duration;

use super::{FailureMode, PoolConfig, TlsConfig};

/// Configuration for [`HttpTransport`](crate::HttpTransport).
///
/// ## Default Values
///
/// - `pool`: [`PoolConfig::default()`] (200 total, 50 per host)
/// - `tls`: platform roots, verification on
/// - `request_timeout`: 60s
/// - `connect_timeout`: 10s
/// - `failure_mode`: [`FailureMode::Propagate`]
///
/// ## Example
///
/// ```rust
/// use agent_outbound_http::{FailureMode, HttpTransportConfig, PoolConfig};
/// use std::time::Duration;
///
/// let config = HttpTransportConfig::new()
///     .with_pool(PoolConfig::builder().max_connections_per_host(8).build())
///     .with_request_timeout(Duration::from_secs(15))
///     .with_failure_mode(FailureMode::LogOnly);
/// assert_eq!(config.pool.max_connections_per_host, 8);
/// ```
#[derive(Debug, Clone)]
pub struct HttpTransportConfig {
    /// Connection pool limits.
    pub pool: PoolConfig,

    /// TLS settings for `https` endpoints.
    pub tls: TlsConfig,

    /// Deadline for one whole delivery once a connection slot is held.
    ///
    /// `None` disables the deadline, letting a hung peer hold its slot
    /// indefinitely.
    pub request_timeout: Option<Duration>,

    /// Deadline for establishing a new connection.
    pub connect_timeout: Duration,

    /// How failures reach the caller.
    pub failure_mode: FailureMode,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            pool: PoolConfig::default(),
            tls: TlsConfig::default(),
            request_timeout: Some(Duration::from_secs(60)),
            connect_timeout: Duration::from_secs(10),
            failure_mode: FailureMode::default(),
        }
    }
}

impl HttpTransportConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the fire-and-forget configuration: failures are logged only.
    pub fn log_only() -> Self {
        Self::new().with_failure_mode(FailureMode::LogOnly)
    }

    /// Sets the connection pool limits.
    #[must_use]
    pub fn with_pool(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Sets the TLS configuration.
    #[must_use]
    pub fn with_tls(mut self, tls: TlsConfig) -> Self {
        self.tls = tls;
        self
    }

    /// Sets the per-request deadline.
    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Disables the per-request deadline.
    #[must_use]
    pub fn without_request_timeout(mut self) -> Self {
        self.request_timeout = None;
        self
    }

    /// Sets the connect deadline.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the failure mode.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }
}
