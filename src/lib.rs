//! # Agent Outbound HTTP
//!
//! Outbound HTTP/HTTPS transport for an identity agent: POSTs serialized
//! agent messages to remote endpoints over a shared, bounded connection pool.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use agent_outbound_http::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), agent_outbound_http::Error> {
//!     let transport = HttpTransport::builder()
//!         .pool_config(PoolConfig::builder().max_connections_per_host(10).build())
//!         .build();
//!     transport.start().await?;
//!
//!     // Binary payloads go out as application/ssi-agent-wire
//!     transport
//!         .deliver(vec![0x01u8, 0x02], "https://agent.example/inbox")
//!         .await?;
//!
//!     // Text payloads go out as application/json
//!     transport
//!         .deliver(r#"{"@type":"ping"}"#, "https://agent.example/inbox")
//!         .await?;
//!
//!     transport.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Key Concepts
//!
//! - **Lifecycle**: `Uninitialized` → `Started` → `Stopped`; a stopped
//!   transport is not restartable
//! - **One attempt**: `deliver` never retries; the returned [`Error`] tells
//!   the caller whether a retry makes sense
//! - **Success is 2xx**: any other status is
//!   [`ErrorKind::UnexpectedStatus`] with the status and reason phrase
//! - **Bounded pool**: at most 200 concurrent requests in total and 50 per
//!   host by default; excess deliveries wait. A host never has more than
//!   its limit of sockets open, idle pooled ones included
//!
//! ## Features
//!
//! - `rustls` (default): `https` endpoints over rustls, trusting the
//!   platform root certificates

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod transport;

// Observability hooks
pub mod tracing_support;

// Convenient imports
pub mod prelude;

// Re-export main types at crate root
pub use config::{FailureMode, HttpTransportConfig, PoolConfig, TlsConfig};
pub use error::{Error, ErrorKind, Result};
pub use transport::{
    DeliveryStats, HttpTransport, HttpTransportBuilder, MockTransport, OutboundTransport,
    Payload, TransportState,
};
