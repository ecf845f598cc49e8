//! Error kind enumeration for classifying delivery failures.

/// Classification of transport errors.
///
/// This enum provides a stable interface for matching on failure modes so an
/// orchestrator can decide what to do with an undelivered message. The
/// transport itself never retries.
///
/// ## Transient vs Permanent
///
/// | ErrorKind          | Transient | Typical cause                          |
/// |--------------------|-----------|----------------------------------------|
/// | `EmptyResponse`    | Yes       | Peer closed the connection early       |
/// | `Timeout`          | Yes       | Connect or request deadline exceeded   |
/// | `Connection`       | Yes       | Refused, DNS failure, TLS handshake    |
/// | `UnexpectedStatus` | Depends   | Non-2xx response (see `Error::status`) |
/// | `InvalidEndpoint`  | No        | Empty or unsupported endpoint URI      |
/// | `InvalidState`     | No        | Transport not started, or stopped      |
/// | `InvalidPayload`   | No        | Message could not be serialized        |
/// | `Configuration`    | No        | HTTP client could not be built         |
/// | `Transport`        | No        | Other HTTP stack failure               |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
    /// The endpoint was empty, unparseable, or used a scheme this transport
    /// does not handle.
    ///
    /// Raised before any network I/O. Always surfaced to the caller.
    #[error("invalid endpoint")]
    InvalidEndpoint,

    /// The transport was used outside the `Started` state.
    ///
    /// This is a programming error in the caller: `deliver` before `start`,
    /// `deliver` or `stop` after `stop`, or `start` on a used instance.
    #[error("invalid transport state")]
    InvalidState,

    /// The message could not be serialized into a payload.
    ///
    /// Raised by [`Payload::json`](crate::Payload::json), before any delivery.
    #[error("invalid payload")]
    InvalidPayload,

    /// A response arrived with a status outside 200-299.
    ///
    /// The numeric status and reason phrase are available on the error.
    #[error("unexpected response status")]
    UnexpectedStatus,

    /// The connection closed without producing any response.
    ///
    /// **Transient.** The peer may have dropped the connection mid-request.
    #[error("empty response")]
    EmptyResponse,

    /// Connect or request timed out.
    ///
    /// **Transient.**
    #[error("timeout")]
    Timeout,

    /// Connection error (refused, DNS, TLS handshake, network unreachable).
    ///
    /// **Transient.**
    #[error("connection error")]
    Connection,

    /// Any other failure reported by the HTTP stack.
    #[error("transport error")]
    Transport,

    /// The HTTP client could not be configured (e.g. invalid CA certificate).
    #[error("configuration error")]
    Configuration,
}

impl ErrorKind {
    /// Returns `true` if a failure of this kind is usually transient.
    ///
    /// `UnexpectedStatus` returns `false` here because transience depends on
    /// the status code; use [`Error::is_retriable`](crate::Error::is_retriable)
    /// for the full decision.
    ///
    /// # Example
    ///
    /// ```rust
    /// use agent_outbound_http::ErrorKind;
    ///
    /// assert!(ErrorKind::Timeout.is_retriable());
    /// assert!(!ErrorKind::InvalidEndpoint.is_retriable());
    /// ```
    #[inline]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ErrorKind::EmptyResponse | ErrorKind::Timeout | ErrorKind::Connection
        )
    }

    /// Returns `true` if this failure was detected before any network I/O.
    #[inline]
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            ErrorKind::InvalidEndpoint | ErrorKind::InvalidState | ErrorKind::InvalidPayload
        )
    }
}
