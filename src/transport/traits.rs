//! Outbound transport trait and the types it exchanges.
//!
//! An orchestrator owns a set of [`OutboundTransport`]s and routes each
//! message to the one whose [`schemes`](OutboundTransport::schemes) match the
//! endpoint. This module defines that contract and the payload model shared
//! by every implementation.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::Error;

/// Media type for binary (packed wire format) payloads.
pub const WIRE_MEDIA_TYPE: &str = "application/ssi-agent-wire";

/// Media type for textual payloads.
pub const JSON_MEDIA_TYPE: &str = "application/json";

/// Bytes of a binary payload shown in debug logs before truncation.
const LOG_PREVIEW_BYTES: usize = 256;

// ============================================================================
// Payload
// ============================================================================

/// An opaque, already-serialized outbound message.
///
/// The representation alone decides the `Content-Type` of the delivery; the
/// content is never inspected.
///
/// ## Example
///
/// ```rust
/// use agent_outbound_http::Payload;
///
/// let packed = Payload::from(vec![0x01u8, 0x02]);
/// assert_eq!(packed.content_type(), "application/ssi-agent-wire");
///
/// let plain = Payload::from("{\"@type\":\"ping\"}");
/// assert_eq!(plain.content_type(), "application/json");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Binary payload, sent as `application/ssi-agent-wire`.
    Binary(Bytes),
    /// Textual payload, sent as `application/json`.
    Text(String),
}

impl Payload {
    /// Serializes `value` to a textual JSON payload.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        Ok(Payload::Text(serde_json::to_string(value)?))
    }

    /// Returns the `Content-Type` this payload is delivered with.
    pub fn content_type(&self) -> &'static str {
        match self {
            Payload::Binary(_) => WIRE_MEDIA_TYPE,
            Payload::Text(_) => JSON_MEDIA_TYPE,
        }
    }

    /// Returns `true` for binary payloads.
    pub fn is_binary(&self) -> bool {
        matches!(self, Payload::Binary(_))
    }

    /// Returns the payload bytes.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Binary(bytes) => bytes,
            Payload::Text(text) => text.as_bytes(),
        }
    }

    /// Returns the payload length in bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Returns `true` if the payload has no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns a log-friendly rendering: text as-is, binary as truncated hex.
    pub fn display(&self) -> PayloadDisplay<'_> {
        PayloadDisplay(self)
    }
}

impl From<Bytes> for Payload {
    fn from(bytes: Bytes) -> Self {
        Payload::Binary(bytes)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(Bytes::from(bytes))
    }
}

impl From<&[u8]> for Payload {
    fn from(bytes: &[u8]) -> Self {
        Payload::Binary(Bytes::copy_from_slice(bytes))
    }
}

impl<const N: usize> From<&[u8; N]> for Payload {
    fn from(bytes: &[u8; N]) -> Self {
        Payload::Binary(Bytes::copy_from_slice(bytes))
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

/// Display adapter returned by [`Payload::display`].
pub struct PayloadDisplay<'a>(&'a Payload);

impl fmt::Display for PayloadDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Payload::Text(text) => f.write_str(text),
            Payload::Binary(bytes) if bytes.len() > LOG_PREVIEW_BYTES => write!(
                f,
                "{}... ({} bytes)",
                hex::encode(&bytes[..LOG_PREVIEW_BYTES]),
                bytes.len()
            ),
            Payload::Binary(bytes) => f.write_str(&hex::encode(bytes)),
        }
    }
}

// ============================================================================
// Transport State
// ============================================================================

/// Lifecycle state of a transport instance.
///
/// `Uninitialized -> Started -> Stopped`. There is no way back from
/// `Stopped`; construct a new transport instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportState {
    /// Constructed, `start` not yet called.
    #[default]
    Uninitialized,
    /// Accepting deliveries.
    Started,
    /// Resources released.
    Stopped,
}

impl TransportState {
    /// Returns `true` if deliveries are accepted.
    pub fn is_started(&self) -> bool {
        matches!(self, TransportState::Started)
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportState::Uninitialized => write!(f, "uninitialized"),
            TransportState::Started => write!(f, "started"),
            TransportState::Stopped => write!(f, "stopped"),
        }
    }
}

// ============================================================================
// Delivery Stats
// ============================================================================

/// Delivery statistics for one started session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Requests that were sent (a connection slot was acquired).
    pub requests_sent: u64,
    /// Sent requests that did not end in a 2xx response.
    pub requests_failed: u64,
    /// Requests currently holding a connection slot.
    pub in_flight: u64,
    /// Highest number of requests that held a slot at the same time.
    pub peak_in_flight: u64,
    /// Sockets currently open, in use or idle in the pool.
    pub open_connections: u64,
    /// Highest number of sockets open at the same time.
    pub peak_open_connections: u64,
}

// ============================================================================
// Outbound Transport Trait
// ============================================================================

/// A scheme-specific delivery mechanism.
///
/// Implementations follow the same lifecycle: `start` once, `deliver` any
/// number of times (concurrently), `stop` once.
#[async_trait::async_trait]
pub trait OutboundTransport: Send + Sync {
    /// URI schemes handled by this transport (lowercase).
    fn schemes(&self) -> &'static [&'static str];

    /// Returns `true` if the endpoint's scheme is handled by this transport.
    fn supports(&self, endpoint: &str) -> bool {
        endpoint
            .split_once(':')
            .map(|(scheme, _)| {
                self.schemes()
                    .iter()
                    .any(|supported| supported.eq_ignore_ascii_case(scheme))
            })
            .unwrap_or(false)
    }

    /// Returns the lifecycle state.
    fn state(&self) -> TransportState;

    /// Acquires the transport's resources.
    async fn start(&self) -> Result<(), Error>;

    /// Releases the transport's resources.
    async fn stop(&self) -> Result<(), Error>;

    /// Attempts a single delivery of `payload` to `endpoint`.
    async fn deliver(&self, payload: Payload, endpoint: &str) -> Result<(), Error>;
}
