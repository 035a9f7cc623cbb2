// crates/caseflow-service/src/engine/transition.rs
// ============================================================================
// Module: TransitionCase Operation
// Description: The lock-guarded, activity-logged wrapper around
//              `caseflow_core::case_machine::apply` (spec §4.1/§4.2).
// Purpose: Give every caller (pipeline, decisioner, executor, reset
//          handling) one operation that acquires the case lock, applies the
//          guarded transition, persists the new case row, and appends the
//          activity log entry in one place.
// Dependencies: caseflow-core
// ============================================================================

use caseflow_core::case_machine;
use caseflow_core::case_machine::CaseEvent;
use caseflow_core::case_machine::TransitionRecord;
use caseflow_core::CaseId;
use caseflow_core::CaseflowError;
use caseflow_core::MetadataMap;
use caseflow_core::StoreError;

use crate::engine::clock::now_millis;
use crate::engine::context::EngineContext;
use crate::engine::lock::with_case_lock;

/// Applies `event` to the case named by `case_id`, holding the
/// `transition` operation lock for the duration.
///
/// # Errors
///
/// Returns [`CaseflowError::NotFound`] when the case does not exist,
/// whatever [`case_machine::apply`] returns for an illegal transition, or
/// [`CaseflowError::Transient`] on a lock or storage failure.
pub fn transition_case(
    ctx: &EngineContext,
    case_id: &CaseId,
    event: CaseEvent,
) -> Result<TransitionRecord, CaseflowError> {
    with_case_lock(
        ctx,
        case_id,
        "transition",
        ctx.config.timeouts.case_lock_ttl_transition_millis,
        || {
            let mut case = ctx.store.get_case(case_id).map_err(store_err)?;
            let record = case_machine::apply(&mut case, event)?;
            ctx.store.put_case(&case).map_err(store_err)?;
            ctx.store
                .append_activity_log(
                    case_id,
                    record.event_type,
                    &record.description,
                    MetadataMap::new(),
                    now_millis(),
                )
                .map_err(store_err)?;
            Ok(record)
        },
    )
}

/// Maps a [`StoreError`] to the matching [`CaseflowError`] kind.
pub(crate) fn store_err(err: StoreError) -> CaseflowError {
    match err {
        StoreError::NotFound(detail) => CaseflowError::NotFound(detail),
        StoreError::Conflict(detail) => CaseflowError::Conflict(detail),
        StoreError::Io(detail) => CaseflowError::Transient(detail),
    }
}
