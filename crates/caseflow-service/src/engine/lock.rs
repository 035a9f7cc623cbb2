// crates/caseflow-service/src/engine/lock.rs
// ============================================================================
// Module: Case Lock Helper
// Description: Acquire-with-retry and guaranteed-release wrapper around
//              `CaseLockPort`, used by every operation that mutates a case.
// Purpose: Keep the acquire/release bookkeeping (and its backoff-on-
//          contention policy) in one place instead of duplicating it across
//          transition, planning, and reset logic.
// Dependencies: caseflow-core
// ============================================================================

//! ## Overview
//! [`with_case_lock`] acquires the named operation lock, runs the closure,
//! and releases the lock whether the closure succeeds or fails. Contention
//! retries with linear backoff up to [`MAX_ACQUIRE_ATTEMPTS`] before
//! surfacing [`CaseflowError::Transient`], matching spec §4.2's fencing-token
//! design: a caller that loses the lock race backs off rather than busy-spins.

use std::thread;
use std::time::Duration;

use caseflow_core::CaseId;
use caseflow_core::CaseflowError;
use caseflow_core::LockError;

use crate::engine::clock::now_millis;
use crate::engine::context::EngineContext;

/// Maximum number of acquisition attempts before giving up on contention.
const MAX_ACQUIRE_ATTEMPTS: u32 = 5;
/// Backoff between acquisition attempts, in milliseconds, multiplied by the
/// attempt number (linear backoff).
const ACQUIRE_BACKOFF_BASE_MILLIS: u64 = 20;

/// Acquires the named operation lock on `case_id`, runs `f`, then releases
/// the lock regardless of `f`'s outcome.
///
/// # Errors
///
/// Returns [`CaseflowError::Transient`] when the lock cannot be acquired
/// after [`MAX_ACQUIRE_ATTEMPTS`] attempts, or whatever error `f` returns.
pub fn with_case_lock<F, T>(
    ctx: &EngineContext,
    case_id: &CaseId,
    operation: &str,
    ttl_millis: u64,
    f: F,
) -> Result<T, CaseflowError>
where
    F: FnOnce() -> Result<T, CaseflowError>,
{
    let token = acquire_with_retry(ctx, case_id, operation, ttl_millis)?;
    let result = f();
    if let Err(err) = ctx.locks.release(case_id, operation, &token) {
        // Release failures are logged by the caller via activity log, not
        // surfaced over a successful `f`: the lock will simply expire.
        if result.is_ok() {
            return Err(CaseflowError::Transient(format!(
                "failed to release lock on case {case_id} operation {operation}: {err}"
            )));
        }
    }
    result
}

/// Attempts to acquire `operation` on `case_id`, retrying on contention with
/// linear backoff.
fn acquire_with_retry(
    ctx: &EngineContext,
    case_id: &CaseId,
    operation: &str,
    ttl_millis: u64,
) -> Result<caseflow_core::CaseLockToken, CaseflowError> {
    for attempt in 1..=MAX_ACQUIRE_ATTEMPTS {
        match ctx.locks.acquire(case_id, operation, ttl_millis, now_millis()) {
            Ok((token, _fencing)) => return Ok(token),
            Err(LockError::Contention(_)) if attempt < MAX_ACQUIRE_ATTEMPTS => {
                thread::sleep(Duration::from_millis(ACQUIRE_BACKOFF_BASE_MILLIS * u64::from(attempt)));
            }
            Err(LockError::Contention(detail)) => {
                return Err(CaseflowError::Transient(format!(
                    "lock contention on case {case_id} operation {operation} after {attempt} attempts: {detail}"
                )));
            }
            Err(LockError::Io(detail)) => {
                return Err(CaseflowError::Transient(format!("lock store io error: {detail}")));
            }
        }
    }
    unreachable!("loop always returns by its final iteration")
}
