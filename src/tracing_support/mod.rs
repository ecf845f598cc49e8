//! Observability hooks for outbound calls.
//!
//! Logging goes through the `tracing` crate and needs no setup here beyond
//! installing a subscriber. This module covers the optional observability
//! collaborator: a [`TraceHook`] sees every network call, and
//! [`StatsTracer`] turns those observations into named timings for a
//! [`Collector`].
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use agent_outbound_http::HttpTransport;
//! use agent_outbound_http::tracing_support::TimingCollector;
//!
//! let collector = TimingCollector::new();
//! let transport = HttpTransport::builder()
//!     .collector(Arc::new(collector.clone()))
//!     .build();
//!
//! // After deliveries, timings appear under "outbound-http:request".
//! # let _ = transport;
//! ```

mod collector;
mod hook;

pub use collector::{Collector, TimingCollector, TimingSnapshot};
pub use hook::{NoopTraceHook, StatsTracer, TRACE_PREFIX, TraceHook};
