// crates/caseflow-core/src/core/time.rs
// ============================================================================
// Module: Caseflow Time Model
// Description: Canonical timestamp representation for case records, runs,
//              and activity log entries.
// Purpose: Provide deterministic, replayable time values across Caseflow
//          records so the state machine guards stay pure and testable.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! The core state machine never reads wall-clock time directly; hosts supply
//! timestamps explicitly via triggers, store writes, or runtime helpers. This
//! keeps the guard table in `case_machine` a pure function of its inputs.

use serde::Deserialize;
use serde::Serialize;

/// Canonical timestamp used in case records, run records, and the activity
/// log.
///
/// # Invariants
/// - Values are explicitly provided by callers; the core never reads
///   wall-clock time itself.
/// - No validation is performed; monotonicity is a caller responsibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Timestamp {
    /// Unix epoch milliseconds.
    UnixMillis(i64),
    /// Monotonic logical time value, used in deterministic replay tests.
    Logical(u64),
}

impl Timestamp {
    /// Returns the timestamp as unix milliseconds when available.
    #[must_use]
    pub const fn as_unix_millis(&self) -> Option<i64> {
        match self {
            Self::UnixMillis(value) => Some(*value),
            Self::Logical(_) => None,
        }
    }

    /// Returns the timestamp as logical time when available.
    #[must_use]
    pub const fn as_logical(&self) -> Option<u64> {
        match self {
            Self::UnixMillis(_) => None,
            Self::Logical(value) => Some(*value),
        }
    }

    /// Returns `true` when `self` is strictly before `other`, comparing only
    /// within the same representation. Cross-representation comparisons
    /// (`UnixMillis` vs `Logical`) are never orderable and return `false`.
    #[must_use]
    pub const fn precedes(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::UnixMillis(a), Self::UnixMillis(b)) => *a < *b,
            (Self::Logical(a), Self::Logical(b)) => *a < *b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Timestamp;

    #[test]
    fn unix_millis_round_trips() {
        let ts = Timestamp::UnixMillis(42);
        assert_eq!(ts.as_unix_millis(), Some(42));
        assert_eq!(ts.as_logical(), None);
    }

    #[test]
    fn precedes_requires_matching_representation() {
        assert!(Timestamp::UnixMillis(1).precedes(&Timestamp::UnixMillis(2)));
        assert!(!Timestamp::UnixMillis(1).precedes(&Timestamp::Logical(2)));
    }
}
