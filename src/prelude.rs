//! Prelude module for convenient imports.
//!
//! This module re-exports the most commonly used types for easy importing:
//!
//! ```rust
//! use agent_outbound_http::prelude::*;
//! ```
//!
//! This provides access to:
//! - Transport types and the transport trait
//! - Configuration types
//! - Error types

pub use crate::{
    config::{FailureMode, HttpTransportConfig, PoolConfig, TlsConfig},
    error::{Error, ErrorKind, Result},
    transport::{
        DeliveryStats, HttpTransport, HttpTransportBuilder, MockTransport, OutboundTransport,
        Payload, TransportState,
    },
};
