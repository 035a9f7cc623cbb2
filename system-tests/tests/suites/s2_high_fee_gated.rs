// system-tests/tests/suites/s2_high_fee_gated.rs
// ============================================================================
// Module: Scenario S2 - High Fee Gated For Review
// Description: A supervised-mode case receives a fee notice above the hard
//              cap.
// Purpose: Confirms invariant #1 (a case requiring human attention has
//          exactly one pending proposal and a pause reason) for the
//          fee-negotiation path.
// Dependencies: caseflow-core, caseflow-service
// ============================================================================

#![allow(clippy::unwrap_used, reason = "test assertions")]
#![allow(clippy::expect_used, reason = "test assertions")]

use caseflow_core::ActionType;
use caseflow_core::AutopilotMode;
use caseflow_core::CaseId;
use caseflow_core::DispatcherPort;
use caseflow_core::PauseReason;
use caseflow_core::ProposalStatus;

use crate::helpers::fixtures;
use crate::helpers::harness::build_harness;

#[test]
fn high_fee_above_the_hard_cap_gates_for_review() {
    let harness = build_harness();
    let case_id = CaseId::new("case-s2");
    fixtures::seed_case(&harness.ctx, &case_id, AutopilotMode::Supervised);
    let message_id = fixtures::seed_inbound_message(
        &harness.ctx,
        &case_id,
        "Estimated cost $350.00 with a required $75 deposit.",
    );

    harness
        .dispatcher
        .trigger(
            "process_inbound",
            serde_json::json!({ "message_id": message_id.as_str() }),
            fixtures::trigger_opts(&case_id),
        )
        .expect("trigger accepted");

    let proposals = harness.ctx.store.list_proposals_for_case(&case_id).expect("lists proposals");
    assert_eq!(
        harness.ctx.store.count_pending_proposals(&case_id).expect("counts pending"),
        1,
        "invariant #1: exactly one pending proposal"
    );
    let proposal = &proposals[0];
    assert!(
        matches!(proposal.action_type, ActionType::AcceptFee | ActionType::NegotiateFee),
        "got {:?}",
        proposal.action_type
    );
    assert_eq!(proposal.action_type, ActionType::NegotiateFee, "$350 exceeds the $250 hard cap");
    assert_eq!(proposal.status, ProposalStatus::PendingApproval);
    assert!(proposal.risk_flags.contains(&"fee_above_hard_cap".to_string()));

    let case = harness.ctx.store.get_case(&case_id).expect("loads case");
    assert!(case.requires_human);
    assert_eq!(case.pause_reason, Some(PauseReason::FeeQuote));
    assert!(proposal.waitpoint_token.is_some(), "exactly one waitpoint is open behind this proposal");
}
