// system-tests/tests/suites/s3_strong_denial_approved.rs
// ============================================================================
// Module: Scenario S3 - Strong Denial Approved
// Description: A denial citing a specific exemption gates a rebuttal, which
//              a human then approves straight through to execution.
// Purpose: Exercises the waitpoint-complete-then-execute path end to end,
//          distinct from S1/S2's fee path.
// Dependencies: caseflow-core, caseflow-service
// ============================================================================

#![allow(clippy::unwrap_used, reason = "test assertions")]
#![allow(clippy::expect_used, reason = "test assertions")]

use caseflow_core::ActionType;
use caseflow_core::AutopilotMode;
use caseflow_core::CaseId;
use caseflow_core::CaseStatus;
use caseflow_core::DispatcherPort;
use caseflow_core::GateOption;
use caseflow_core::MessageDirection;
use caseflow_core::PauseReason;
use caseflow_core::ProposalStatus;
use caseflow_service::engine;
use caseflow_service::engine::HumanResolutionRequest;

use crate::helpers::fixtures;
use crate::helpers::harness::build_harness_with;

#[test]
fn denial_citing_an_exemption_gates_a_rebuttal_then_executes_on_approval() {
    let harness = build_harness_with(fixtures::collaborators_with_exemption_denial_classifier());
    let case_id = CaseId::new("case-s3");
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

    let mut proposal = harness.ctx.store.list_proposals_for_case(&case_id).expect("lists proposals").remove(0);
    assert_eq!(proposal.action_type, ActionType::SendRebuttal);
    assert_eq!(proposal.status, ProposalStatus::PendingApproval);
    assert!(proposal.risk_flags.contains(&"strong_denial".to_string()));

    let case = harness.ctx.store.get_case(&case_id).expect("loads case");
    assert!(case.requires_human);
    assert_eq!(case.pause_reason, Some(PauseReason::Denial));
    assert_eq!(case.status, CaseStatus::NeedsPhoneCall);

    engine::resolve_human_decision(
        &harness.ctx,
        &mut proposal,
        HumanResolutionRequest {
            action: GateOption::Approve,
            instruction: None,
            reason: None,
            route_mode: None,
            user_id: Some("reviewer-1".to_string()),
        },
    )
    .expect("waitpoint completes exactly once");

    engine::dispatch_resume(&harness.ctx, &harness.dispatcher, &proposal).expect("dispatches the resume run");

    let executed = harness.ctx.store.get_proposal(&proposal.id).expect("reloads proposal");
    assert_eq!(executed.status, ProposalStatus::Executed);
    assert!(executed.execution_key.is_some());

    let case = harness.ctx.store.get_case(&case_id).expect("reloads case");
    assert!(!case.requires_human);
    assert_eq!(case.status, CaseStatus::AwaitingResponse);

    let messages = harness.ctx.store.list_messages_for_case(&case_id).expect("lists messages");
    let appeal = messages
        .iter()
        .find(|m| m.direction == MessageDirection::Outbound)
        .expect("the rebuttal sent an outbound appeal message");
    assert_eq!(appeal.subject.as_deref(), Some("SendRebuttal"));
}
