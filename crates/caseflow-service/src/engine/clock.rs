// crates/caseflow-service/src/engine/clock.rs
// ============================================================================
// Module: Host Clock and Token Generation
// Description: The one place this crate reads the wall clock or generates
//              random tokens, so every other module stays a pure function of
//              its arguments.
// Purpose: caseflow-core's state machine and hashing never touch
//          SystemTime/rand directly (see core::time); this module is the
//          host-side source those values come from.
// Dependencies: caseflow-core, rand
// ============================================================================

use caseflow_core::Timestamp;
use rand::Rng;
use rand::distributions::Alphanumeric;

/// Returns the current wall-clock time as a [`Timestamp::UnixMillis`].
#[must_use]
pub fn now_millis() -> Timestamp {
    let millis = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0);
    Timestamp::UnixMillis(millis)
}

/// Generates an unguessable opaque token with at least 128 bits of entropy,
/// suitable for waitpoint tokens, lock tokens, and execution keys.
#[must_use]
pub fn generate_token(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect();
    format!("{prefix}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_unique_and_prefixed() {
        let a = generate_token("wp");
        let b = generate_token("wp");
        assert_ne!(a, b);
        assert!(a.starts_with("wp_"));
    }
}
