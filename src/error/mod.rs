//! Error types for outbound delivery.
//!
//! Every failure is an [`Error`] carrying an [`ErrorKind`] for matching:
//!
//! - precondition failures ([`ErrorKind::InvalidEndpoint`], [`ErrorKind::InvalidPayload`],
//!   [`ErrorKind::InvalidState`]) are raised before any network I/O and are
//!   always returned to the caller;
//! - failures during or after the HTTP exchange are classified and, under the
//!   default [`FailureMode::Propagate`](crate::FailureMode::Propagate), also
//!   returned.
//!
//! ```rust,ignore
//! match transport.deliver(payload, endpoint).await {
//!     Ok(()) => {}
//!     Err(e) if e.kind() == ErrorKind::UnexpectedStatus => {
//!         eprintln!("rejected with {:?} {:?}", e.status(), e.reason());
//!     }
//!     Err(e) if e.is_retriable() => requeue(message),
//!     Err(e) => drop_message(message, e),
//! }
//! ```

mod core;
mod kind;

pub use core::Error;
pub use kind::ErrorKind;

/// A specialized `Result` type for transport operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;
