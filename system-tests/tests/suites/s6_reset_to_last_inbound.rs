// system-tests/tests/suites/s6_reset_to_last_inbound.rs
// ============================================================================
// Module: Scenario S6 - Reset To Last Inbound
// Description: A case with a parked proposal, a live run, and an open
//              waitpoint gets reset back to reprocessing its last inbound
//              message.
// Purpose: Confirms the reset dismisses the stale waitpoint exactly once,
//          cancels the stale run, clears the message, and re-gates a fresh
//          run/waitpoint pair instead of leaving the case stuck.
// Dependencies: caseflow-core, caseflow-service
// ============================================================================

#![allow(clippy::unwrap_used, reason = "test assertions")]
#![allow(clippy::expect_used, reason = "test assertions")]

use caseflow_core::ActionType;
use caseflow_core::AutopilotMode;
use caseflow_core::CaseId;
use caseflow_core::DispatcherPort;
use caseflow_core::GateOption;
use caseflow_core::ProposalStatus;
use caseflow_core::RunStatus;
use caseflow_core::RunTrigger;
use caseflow_core::WaitpointError;
use caseflow_core::WaitpointPayload;
use caseflow_core::WaitpointPort;
use caseflow_service::engine;

use crate::helpers::fixtures;
use crate::helpers::harness::build_harness_with;

#[test]
fn reset_cancels_the_stale_run_and_dismisses_the_open_waitpoint_exactly_once() {
    let harness = build_harness_with(fixtures::collaborators_with_exemption_denial_classifier());
    let case_id = CaseId::new("case-s6");
    fixtures::seed_case(&harness.ctx, &case_id, AutopilotMode::Supervised);
    let message_id = fixtures::seed_inbound_message(
        &harness.ctx,
        &case_id,
        "Your request is denied. Exemption 7(A): an ongoing law enforcement investigation.",
    );

    let first_trigger = harness
        .dispatcher
        .trigger(
            "process_inbound",
            serde_json::json!({ "message_id": message_id.as_str() }),
            fixtures::trigger_opts(&case_id),
        )
        .expect("trigger accepted");

    let gated = harness.ctx.store.list_proposals_for_case(&case_id).expect("lists proposals").remove(0);
    assert_eq!(gated.status, ProposalStatus::PendingApproval);
    assert_eq!(gated.action_type, ActionType::SendRebuttal);
    let stale_token = gated.waitpoint_token.clone().expect("a waitpoint is open behind the gated proposal");
    let stale_run = harness.ctx.store.get_run(&first_trigger.run_id).expect("loads the parked run");
    assert_eq!(stale_run.status, RunStatus::Waiting);

    let new_run_id =
        engine::reset_to_last_inbound(&harness.ctx, &harness.dispatcher, &case_id).expect("resets the case");

    let cancelled_run = harness.ctx.store.get_run(&stale_run.id).expect("reloads the stale run");
    assert_eq!(cancelled_run.status, RunStatus::Cancelled);
    assert_eq!(cancelled_run.error.as_deref(), Some("superseded"));

    let stale_completion = harness.ctx.waitpoints.complete(
        &stale_token,
        WaitpointPayload { action: GateOption::Dismiss, instruction: None, reason: None },
        caseflow_service::engine::clock::now_millis(),
    );
    assert!(
        matches!(stale_completion, Err(WaitpointError::AlreadyCompleted)),
        "invariant #6: the reset's own dismiss already completed this waitpoint exactly once"
    );

    let message = harness.ctx.store.get_message(&message_id).expect("reloads the inbound message");
    assert!(message.processed_at.is_none());
    assert!(message.processed_run_id.is_none());

    let new_run = harness.ctx.store.get_run(&new_run_id).expect("loads the reset's run");
    assert_eq!(new_run.trigger_type, RunTrigger::ResetToLastInbound);

    let re_gated = harness.ctx.store.get_proposal(&gated.id).expect("reloads the original proposal");
    assert_eq!(re_gated.status, ProposalStatus::PendingApproval);
    let fresh_token = re_gated.waitpoint_token.clone().expect("the reset re-gated behind a fresh waitpoint");
    assert_ne!(fresh_token, stale_token, "a new waitpoint replaces the dismissed one");
}
