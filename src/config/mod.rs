//! Configuration types for the HTTP transport.
//!
//! This module provides configuration options for:
//! - [`HttpTransportConfig`]: Top-level transport settings
//! - [`PoolConfig`]: Connection pool limits
//! - [`TlsConfig`]: TLS settings for `https` endpoints
//! - [`FailureMode`]: Whether delivery failures reach the caller

mod failure;
mod pool;
mod tls;
mod transport;

pub use failure::FailureMode;
pub use pool::{DEFAULT_MAX_CONNECTIONS, DEFAULT_MAX_CONNECTIONS_PER_HOST, PoolConfig};
pub use tls::TlsConfig;
pub use transport::HttpTransportConfig;
