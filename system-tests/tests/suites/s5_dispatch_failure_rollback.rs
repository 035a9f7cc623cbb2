// system-tests/tests/suites/s5_dispatch_failure_rollback.rs
// ============================================================================
// Module: Scenario S5 - Transport Failure Rolls Back
// Description: The Executor's email transport fails permanently on an
//              approved proposal.
// Purpose: Confirms a failed side effect never leaves a proposal stranded
//          on `APPROVED` with no way back into review.
// Dependencies: caseflow-core, caseflow-service, caseflow-providers
// ============================================================================

#![allow(clippy::unwrap_used, reason = "test assertions")]
#![allow(clippy::expect_used, reason = "test assertions")]

use std::sync::Arc;

use caseflow_core::AutopilotMode;
use caseflow_core::CaseId;
use caseflow_core::DispatcherPort;
use caseflow_core::EmailTransportPort;
use caseflow_core::GateOption;
use caseflow_core::OutboundEmail;
use caseflow_core::ProposalStatus;
use caseflow_core::SendReceipt;
use caseflow_core::TransportError;
use caseflow_providers::CollaboratorSet;
use caseflow_service::engine;
use caseflow_service::engine::HumanResolutionRequest;

use crate::helpers::fixtures;
use crate::helpers::harness::build_harness_with;

/// Always refuses the send outright, the way a provider reports a
/// permanently bad recipient rather than a retryable outage.
#[derive(Debug, Default)]
struct RefusingEmailTransport;

impl EmailTransportPort for RefusingEmailTransport {
    fn send(&self, _email: &OutboundEmail) -> Result<SendReceipt, TransportError> {
        Err(TransportError::Permanent("agency mail server rejected the message".to_string()))
    }
}

fn collaborators_with_refusing_email() -> CollaboratorSet {
    let config = caseflow_config::CaseflowConfig::load_from_str(&caseflow_config::config_toml_example())
        .expect("example config loads");
    let base = CollaboratorSet::from_config(&config.providers).expect("stub collaborators build");
    CollaboratorSet { email: Arc::new(RefusingEmailTransport), ..base }
}

#[test]
fn a_permanently_failing_transport_rolls_the_proposal_back_to_pending_approval() {
    let harness = build_harness_with(collaborators_with_refusing_email());
    let case_id = CaseId::new("case-s5");
    fixtures::seed_case(&harness.ctx, &case_id, AutopilotMode::Auto);
    let message_id = fixtures::seed_inbound_message(&harness.ctx, &case_id, "Your records will cost $15.00.");

    harness
        .dispatcher
        .trigger(
            "process_inbound",
            serde_json::json!({ "message_id": message_id.as_str() }),
            fixtures::trigger_opts(&case_id),
        )
        .expect("trigger accepted");

    let mut proposal = harness.ctx.store.list_proposals_for_case(&case_id).expect("lists proposals").remove(0);
    assert_eq!(proposal.status, ProposalStatus::PendingApproval);

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
    .expect("resolves the gated decision");

    engine::dispatch_resume(&harness.ctx, &harness.dispatcher, &proposal).expect("dispatches the resume run");

    let rolled_back = harness.ctx.store.get_proposal(&proposal.id).expect("reloads proposal");
    assert_eq!(rolled_back.status, ProposalStatus::PendingApproval, "spec: rolled back to PENDING_APPROVAL");
    assert!(rolled_back.human_decision.is_none(), "spec: human_decision cleared");
    assert!(rolled_back.execution_key.is_some(), "the execution_key is preserved so a retry is idempotent");

    let log = harness.ctx.store.list_activity_log(&case_id).expect("lists activity log");
    let failure_entry = log
        .iter()
        .find(|entry| entry.event_type == "proposal_execution_failed")
        .expect("the rollback is recorded on the activity log");
    assert!(failure_entry.description.contains("agency mail server rejected the message"));
}
