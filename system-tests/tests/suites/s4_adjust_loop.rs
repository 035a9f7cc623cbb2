// system-tests/tests/suites/s4_adjust_loop.rs
// ============================================================================
// Module: Scenario S4 - Adjust Loop
// Description: A human asks for a revision instead of approving; the
//              original proposal is superseded by a fresh draft in the same
//              proposal-key family.
// Purpose: Confirms invariant #1 holds across an adjustment: the superseded
//          proposal leaves `PENDING_APPROVAL`/`BLOCKED` exactly as its
//          replacement enters it, so the case never reports two live
//          proposals at once.
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
use caseflow_service::engine;
use caseflow_service::engine::HumanResolutionRequest;

use crate::helpers::fixtures;
use crate::helpers::harness::build_harness_with;

#[test]
fn adjust_supersedes_the_proposal_with_a_revised_draft_in_the_same_family() {
    let harness = build_harness_with(fixtures::collaborators_with_exemption_denial_classifier());
    let case_id = CaseId::new("case-s4");
    fixtures::seed_case(&harness.ctx, &case_id, AutopilotMode::Supervised);
    let message_id = fixtures::seed_inbound_message(
        &harness.ctx,
        &case_id,
        "Your request is denied. Exemption 7(A): an ongoing law enforcement investigation.",
    );

    harness
        .dispatcher
        .trigger(
            "process_inbound",
            serde_json::json!({ "message_id": message_id.as_str() }),
            fixtures::trigger_opts(&case_id),
        )
        .expect("trigger accepted");

    let mut original = harness.ctx.store.list_proposals_for_case(&case_id).expect("lists proposals").remove(0);
    assert_eq!(original.status, ProposalStatus::PendingApproval);
    let original_key = original.proposal_key.clone();

    engine::resolve_human_decision(
        &harness.ctx,
        &mut original,
        HumanResolutionRequest {
            action: GateOption::Adjust,
            instruction: Some("cite more case law".to_string()),
            reason: None,
            route_mode: None,
            user_id: Some("reviewer-1".to_string()),
        },
    )
    .expect("resolves the adjust decision");

    engine::dispatch_resume(&harness.ctx, &harness.dispatcher, &original).expect("dispatches the resume run");

    let superseded = harness.ctx.store.get_proposal(&original.id).expect("reloads original proposal");
    assert_eq!(superseded.status, ProposalStatus::AdjustmentRequested);

    let proposals = harness.ctx.store.list_proposals_for_case(&case_id).expect("lists proposals");
    assert_eq!(proposals.len(), 2, "the original plus its revision");
    let revised = proposals.iter().find(|p| p.id != superseded.id).expect("the revision exists");
    assert_eq!(revised.status, ProposalStatus::PendingApproval);
    assert_eq!(revised.action_type, ActionType::SendRebuttal);
    assert_eq!(revised.adjustment_count, 1);
    assert_ne!(revised.proposal_key, original_key, "a fresh draft digest changes the proposal key");
    assert_eq!(revised.trigger_message_id, superseded.trigger_message_id);

    assert_eq!(
        harness.ctx.store.count_pending_proposals(&case_id).expect("counts pending"),
        1,
        "invariant #1: exactly one pending proposal even mid-adjustment"
    );
}
