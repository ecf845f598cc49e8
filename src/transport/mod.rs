//! Outbound transports for agent messages.
//!
//! This module provides the delivery side of an agent's messaging stack:
//!
//! - [`OutboundTransport`]: the scheme-keyed contract an orchestrator routes
//!   messages through
//! - [`HttpTransport`]: pooled HTTP/HTTPS delivery
//! - [`MockTransport`]: in-memory delivery for testing
//!
//! ## Content Negotiation
//!
//! The payload representation alone selects the `Content-Type`:
//!
//! | Payload            | Content-Type                 |
//! |--------------------|------------------------------|
//! | `Payload::Binary`  | `application/ssi-agent-wire` |
//! | `Payload::Text`    | `application/json`           |

mod connector;
mod http;
mod limiter;
mod mock;
mod session;
mod traits;

pub use http::{HTTP_SCHEMES, HttpTransport, HttpTransportBuilder};
pub use mock::{MockTransport, RecordedDelivery};
pub use traits::{
    DeliveryStats, JSON_MEDIA_TYPE, OutboundTransport, Payload, PayloadDisplay, TransportState,
    WIRE_MEDIA_TYPE,
};
