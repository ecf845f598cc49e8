//! Connection pool limits.

use std::time::Duration;

/// Default maximum number of simultaneous connections across all hosts.
pub const DEFAULT_MAX_CONNECTIONS: usize = 200;

/// Default maximum number of simultaneous connections to one host.
pub const DEFAULT_MAX_CONNECTIONS_PER_HOST: usize = 50;

/// Connection pool configuration.
///
/// `max_connections` caps deliveries in flight across all hosts.
/// `max_connections_per_host` caps both the deliveries in flight to one host
/// and the sockets open to it, idle pooled sockets included. A limit of `0`
/// means unlimited.
///
/// ## Default Values
///
/// - `max_connections`: 200
/// - `max_connections_per_host`: 50
/// - `idle_timeout`: 90s
///
/// ## Example
///
/// ```rust
/// use agent_outbound_http::PoolConfig;
///
/// // Small pool for tests
/// let config = PoolConfig::builder()
///     .max_connections(4)
///     .max_connections_per_host(2)
///     .build();
/// assert_eq!(config.max_connections_per_host, 2);
/// ```
#[derive(Debug, Clone, bon::Builder)]
pub struct PoolConfig {
    /// Maximum simultaneous connections across all hosts (`0` = unlimited).
    #[builder(default = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: usize,

    /// Maximum simultaneous connections to one `scheme://host:port`
    /// (`0` = unlimited).
    #[builder(default = DEFAULT_MAX_CONNECTIONS_PER_HOST)]
    pub max_connections_per_host: usize,

    /// How long an idle pooled connection is kept open.
    #[builder(default = Duration::from_secs(90))]
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl PoolConfig {
    /// Returns the number of idle connections kept per host.
    pub(crate) fn max_idle_per_host(&self) -> usize {
        match self.max_connections_per_host {
            0 => usize::MAX,
            limit => limit,
        }
    }
}
