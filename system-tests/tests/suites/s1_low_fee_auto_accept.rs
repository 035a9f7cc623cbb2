// system-tests/tests/suites/s1_low_fee_auto_accept.rs
// ============================================================================
// Module: Scenario S1 - Low Fee Gated Then Approved
// Description: An auto-mode case receives a fee notice under the
//              auto-approve ceiling.
// Purpose: `AcceptFee` forces a human gate unconditionally, regardless of
//          autopilot mode (`decisioner::forces_human_gate`), so even a
//          trivially low, high-confidence fee never auto-executes on its
//          own. This suite exercises the real path: gate, approve, execute.
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
use crate::helpers::harness::build_harness;

/// A $15.00 fee, below the example config's $25.00 auto-approve ceiling,
/// still gates: `AcceptFee` is on `decisioner::forces_human_gate`'s list, so
/// an `Auto`-mode case parks the proposal behind a waitpoint exactly like a
/// `Supervised` one would.
#[test]
fn low_fee_gates_behind_a_waitpoint_even_in_auto_mode() {
    let harness = build_harness();
    let case_id = CaseId::new("case-s1-gate");
    fixtures::seed_case(&harness.ctx, &case_id, AutopilotMode::Auto);
    let message_id = fixtures::seed_inbound_message(&harness.ctx, &case_id, "Your records will cost $15.00.");

    let handle = harness
        .dispatcher
        .trigger(
            "process_inbound",
            serde_json::json!({ "message_id": message_id.as_str() }),
            fixtures::trigger_opts(&case_id),
        )
        .expect("trigger accepted");
    assert!(!handle.deduplicated);

    let proposals = harness.ctx.store.list_proposals_for_case(&case_id).expect("lists proposals");
    assert_eq!(proposals.len(), 1, "invariant #1: exactly one pending proposal");
    let proposal = &proposals[0];
    assert_eq!(proposal.action_type, ActionType::AcceptFee);
    assert_eq!(proposal.status, ProposalStatus::PendingApproval);
    assert!(proposal.execution_key.is_none(), "invariant #2: pending proposals carry no execution_key");
    assert!(proposal.waitpoint_token.is_some());

    let case = harness.ctx.store.get_case(&case_id).expect("loads case");
    assert!(case.requires_human);
    assert_eq!(case.pause_reason, Some(PauseReason::FeeQuote));
    assert_eq!(case.status, CaseStatus::NeedsHumanFeeApproval);
    let fee_quote = case.fee_quote.expect("fee quote folded from the classified analysis");
    assert_eq!(fee_quote.amount, "15.00".parse().expect("parses"));

    let run = harness.ctx.store.get_run(&handle.run_id).expect("loads run");
    assert_eq!(run.status, caseflow_core::RunStatus::Waiting);
}

/// Approving the gated proposal executes it: the outbound email goes out,
/// the proposal lands on `Executed` with a fresh `execution_key`, and the
/// case reconciles back out of its review state (not via `CASE_SENT`, which
/// only fires for a first request going out; this is `CASE_RECONCILED`).
#[test]
fn approving_the_gated_proposal_executes_it_and_reconciles_the_case() {
    let harness = build_harness();
    let case_id = CaseId::new("case-s1-approve");
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
    assert!(proposal.gate_options.contains(&GateOption::Approve));

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

    let executed = harness.ctx.store.get_proposal(&proposal.id).expect("reloads proposal");
    assert_eq!(executed.status, ProposalStatus::Executed);
    assert!(executed.execution_key.is_some(), "invariant #3: executed proposals carry an execution_key");

    let case = harness.ctx.store.get_case(&case_id).expect("reloads case");
    assert!(!case.requires_human);
    assert_eq!(case.pause_reason, None);
    assert_eq!(case.status, CaseStatus::AwaitingResponse);

    let messages = harness.ctx.store.list_messages_for_case(&case_id).expect("lists messages");
    let outbound = messages
        .iter()
        .find(|m| m.direction == MessageDirection::Outbound)
        .expect("the accept-fee action sent an outbound message");
    assert_eq!(outbound.message_type, "email");
}
