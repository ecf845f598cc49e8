//! Main error type for outbound delivery.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use super::ErrorKind;

/// The error type returned by transport operations.
///
/// `Error` carries enough context for an orchestrator to decide what to do
/// with an undelivered message:
/// - [`kind()`](Error::kind): classification for `match` statements
/// - [`status()`](Error::status) / [`reason()`](Error::reason): the HTTP
///   status line, for [`ErrorKind::UnexpectedStatus`]
/// - [`endpoint()`](Error::endpoint): the endpoint the delivery targeted
/// - [`is_retriable()`](Error::is_retriable): quick transience check
///
/// ## Error Hierarchy
///
/// ```text
/// Error
/// ├── kind: ErrorKind          (classification for matching)
/// ├── message: String          (human-readable description)
/// ├── status: Option<u16>      (HTTP status, if a response arrived)
/// ├── reason: Option<String>   (HTTP reason phrase)
/// ├── endpoint: Option<String> (delivery target)
/// └── source: Option           (underlying cause)
/// ```
///
/// ## Example
///
/// ```rust
/// use agent_outbound_http::{Error, ErrorKind};
///
/// let err = Error::unexpected_status(503, "Service Unavailable");
/// assert_eq!(err.kind(), ErrorKind::UnexpectedStatus);
/// assert_eq!(err.status(), Some(503));
/// assert!(err.is_retriable());
/// ```
#[derive(Debug)]
pub struct Error {
    /// The error category.
    kind: ErrorKind,

    /// Human-readable error message.
    message: Cow<'static, str>,

    /// HTTP status code of the response, if one arrived.
    status: Option<u16>,

    /// HTTP reason phrase of the response, if one arrived.
    reason: Option<String>,

    /// The endpoint the failed delivery targeted.
    endpoint: Option<String>,

    /// The underlying error, if any.
    source: Option<Box<dyn StdError + Send + Sync + 'static>>,
}

impl Error {
    /// Creates a new error with the given kind and message.
    ///
    /// # Example
    ///
    /// ```rust
    /// use agent_outbound_http::{Error, ErrorKind};
    ///
    /// let err = Error::new(ErrorKind::Transport, "stream reset");
    /// assert_eq!(err.kind(), ErrorKind::Transport);
    /// ```
    pub fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            reason: None,
            endpoint: None,
            source: None,
        }
    }

    /// Creates an error from a kind with a default message.
    pub fn from_kind(kind: ErrorKind) -> Self {
        let message = match kind {
            ErrorKind::InvalidEndpoint => "No endpoint provided",
            ErrorKind::InvalidState => "transport is not started",
            ErrorKind::InvalidPayload => "payload could not be serialized",
            ErrorKind::UnexpectedStatus => "unexpected response status",
            ErrorKind::EmptyResponse => "Unexpected empty response, caused by unknown error",
            ErrorKind::Timeout => "request timed out",
            ErrorKind::Connection => "connection failed",
            ErrorKind::Transport => "transport error",
            ErrorKind::Configuration => "configuration error",
        };
        Self::new(kind, message)
    }

    /// Returns the error kind.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message without the kind prefix.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code, if a response was received.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the HTTP reason phrase, if a response was received.
    #[inline]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns the endpoint of the failed delivery, if known.
    #[inline]
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Returns `true` if the failure is usually transient.
    ///
    /// Beyond [`ErrorKind::is_retriable`], an `UnexpectedStatus` error is
    /// transient when the status is 408, 429 or 5xx.
    #[inline]
    pub fn is_retriable(&self) -> bool {
        match (self.kind, self.status) {
            (ErrorKind::UnexpectedStatus, Some(status)) => {
                status == 408 || status == 429 || (500..=599).contains(&status)
            }
            (kind, _) => kind.is_retriable(),
        }
    }

    /// Sets the endpoint for this error.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the source error for this error.
    #[must_use]
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        self.source = Some(Box::new(source));
        self
    }

    // Convenience constructors for common error types

    /// Creates an invalid endpoint error.
    pub fn invalid_endpoint(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidEndpoint, message)
    }

    /// Creates the precondition error for an empty endpoint.
    pub fn missing_endpoint() -> Self {
        Self::from_kind(ErrorKind::InvalidEndpoint)
    }

    /// Creates an invalid state error.
    pub fn invalid_state(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidState, message)
    }

    /// Creates an unexpected status error from a response status line.
    pub fn unexpected_status(status: u16, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let mut err = Self::new(
            ErrorKind::UnexpectedStatus,
            format!(
                "Unexpected response status {}, caused by: {}",
                status, reason
            ),
        );
        err.status = Some(status);
        err.reason = Some(reason);
        err
    }

    /// Creates an empty response error.
    pub fn empty_response() -> Self {
        Self::from_kind(ErrorKind::EmptyResponse)
    }

    /// Creates a timeout error.
    pub fn timeout(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Creates a connection error.
    pub fn connection(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Connection, message)
    }

    /// Creates a generic transport error.
    pub fn transport(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::InvalidPayload, message)
    }

    /// Creates a configuration error.
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;

        if let Some(ref endpoint) = self.endpoint {
            write!(f, " (endpoint: {})", endpoint)?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Self::from_kind(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::ConnectionRefused
            | std::io::ErrorKind::ConnectionReset
            | std::io::ErrorKind::ConnectionAborted
            | std::io::ErrorKind::NotConnected => ErrorKind::Connection,
            std::io::ErrorKind::TimedOut => ErrorKind::Timeout,
            std::io::ErrorKind::UnexpectedEof => ErrorKind::EmptyResponse,
            _ => ErrorKind::Transport,
        };
        Error::new(kind, err.to_string()).with_source(err)
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::invalid_endpoint(format!("invalid endpoint URL: {}", err)).with_source(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::invalid_payload(format!("JSON payload error: {}", err)).with_source(err)
    }
}
