// crates/caseflow-core/src/core/error.rs
// ============================================================================
// Module: Caseflow Error Taxonomy
// Description: Closed error kinds shared across the case state machine,
//              store, and service layers.
// Purpose: Give every layer one vocabulary for "what kind of failure was
//          this" so callers can decide retry/rollback/surface behavior
//          without inspecting error strings.
// Dependencies: thiserror
// ============================================================================

//! ## Overview
//! Six kinds cover every failure in the system:
//!
//! - [`CaseflowError::Validation`] — caller error, rejected at the edge, never
//!   mutates state.
//! - [`CaseflowError::NotFound`] — the referenced entity does not exist.
//! - [`CaseflowError::Conflict`] — a state transition was attempted that the
//!   current state forbids, or a lock/queue is already held.
//! - [`CaseflowError::Transient`] — likely to succeed on retry (transport
//!   5xx, lock contention, deadlock); the caller may retry with backoff.
//! - [`CaseflowError::Permanent`] — surfaced after retries are exhausted or
//!   retry would never help; state is rolled back to the last safe point.
//! - [`CaseflowError::PartialSideEffect`] — an outbound side effect
//!   succeeded but the subsequent state update failed; reconciled later from
//!   the `Execution` log, the source of truth for "what actually happened".
//!
//! Propagation policy: surface errors from the lowest layer able to
//! describe them, never wrap a lower error in a less specific kind.

use thiserror::Error;

/// The closed set of failure kinds used across Caseflow's components.
///
/// # Invariants
/// - Variants are stable for programmatic handling (callers match on kind,
///   not on message text).
#[derive(Debug, Error)]
pub enum CaseflowError {
    /// Caller-supplied input was invalid; no state was mutated.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// The requested transition or operation conflicts with current state.
    #[error("conflict: {0}")]
    Conflict(String),
    /// The operation failed in a way likely to succeed on retry.
    #[error("transient failure: {0}")]
    Transient(String),
    /// The operation failed in a way unlikely to succeed on retry; state was
    /// rolled back to its last safe point.
    #[error("permanent failure: {0}")]
    Permanent(String),
    /// An outbound side effect completed but the state update recording it
    /// failed; reconciliation must consult the `Execution` log.
    #[error("partial side effect: {0}")]
    PartialSideEffect(String),
}

impl CaseflowError {
    /// Returns `true` for [`CaseflowError::Transient`], the only kind the
    /// core itself ever automatically retries.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

#[cfg(test)]
mod tests {
    use super::CaseflowError;

    #[test]
    fn only_transient_is_retryable() {
        assert!(CaseflowError::Transient("x".to_string()).is_retryable());
        assert!(!CaseflowError::Permanent("x".to_string()).is_retryable());
        assert!(!CaseflowError::Conflict("x".to_string()).is_retryable());
    }
}
