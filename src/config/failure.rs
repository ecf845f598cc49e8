//! Failure surfacing policy for deliveries.

/// How failures after the precondition checks reach the caller.
///
/// Precondition failures (empty or unsupported endpoint, transport not
/// started) are returned in every mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailureMode {
    /// Return classified failures to the caller.
    ///
    /// Callers can tell confirmed delivery apart from every failure mode.
    #[default]
    Propagate,

    /// Log failures at warn level and report the delivery as completed.
    ///
    /// Fire-and-forget semantics for orchestrators that predate typed
    /// delivery results. The caller only learns that delivery was attempted.
    LogOnly,
}

impl FailureMode {
    /// Returns `true` if failures are returned to the caller.
    pub fn propagates(&self) -> bool {
        matches!(self, FailureMode::Propagate)
    }
}
