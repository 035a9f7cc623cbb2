// crates/caseflow-service/src/engine/pipeline.rs
// ============================================================================
// Module: Inbound Pipeline
// Description: Matches an unattached inbound message to its case, guards
//              against concurrent double-processing, classifies it, folds
//              the analysis into the case snapshot, plans, and decides.
// Purpose: The one place an inbound message turns into a Proposal (spec
//          §4.5).
// Dependencies: caseflow-core, caseflow-config
// ============================================================================

//! ## Overview
//! [`attach_inbound_message`] runs outside any case lock (there is no case
//! to lock until a match is found): it resolves `message.case_id` via
//! [`caseflow_core::Store::match_case_for_message`] and persists the
//! attachment, or leaves the message unmatched.
//!
//! [`process_inbound`] is the durable task body a queue worker invokes for
//! `task_type == "process_inbound"`. It holds the case's `process_inbound`
//! lock for its whole body (spec §4.5: steps 1-2 run a dedup check, 3-6 run
//! under the same lock the triggering run already owns by virtue of the
//! per-case dispatcher queue), classifies the message, folds the analysis
//! into the case, plans a proposal, and routes it through the decisioner —
//! dispatching the Executor itself when the proposal auto-executes.

use caseflow_core::case_machine::CaseEvent;
use caseflow_core::CaseId;
use caseflow_core::CaseflowError;
use caseflow_core::ClassifyRequest;
use caseflow_core::DispatchError;
use caseflow_core::DispatcherPort;
use caseflow_core::Message;
use caseflow_core::MessageId;
use caseflow_core::RunId;
use caseflow_core::RunStatus;
use caseflow_core::ScopeItemStatus;
use caseflow_core::Timestamp;
use caseflow_core::TriggerOptions;

use crate::engine::clock::now_millis;
use crate::engine::context::EngineContext;
use crate::engine::decisioner;
use crate::engine::decisioner::DecisionOutcome;
use crate::engine::planner;
use crate::engine::planner::PlanInput;
use crate::engine::transition::store_err;
use crate::engine::transition::transition_case;

/// Attaches `message` to its owning case, if one can be matched.
///
/// # Errors
///
/// Returns [`CaseflowError::Transient`] on a store failure.
pub fn attach_inbound_message(ctx: &EngineContext, message: &mut Message) -> Result<Option<CaseId>, CaseflowError> {
    let matched = ctx.store.match_case_for_message(message).map_err(store_err)?;
    if let Some(case_id) = matched.clone() {
        message.case_id = Some(case_id);
        ctx.store.put_message(message).map_err(store_err)?;
    }
    Ok(matched)
}

/// Runs the inbound pipeline for an already-attached message, as the task
/// body for a dispatcher-triggered `process_inbound` run.
///
/// `force_new_run` bypasses the dedup check (spec §4.5 step 2): used by
/// `reset-to-last-inbound` and the HTTP trigger-inbound endpoint's explicit
/// override.
///
/// # Errors
///
/// Returns [`CaseflowError::Conflict`] when another run already owns this
/// case and `force_new_run` is false, or whatever the classify/plan/decide
/// stages return.
pub fn process_inbound(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    message_id: &MessageId,
    run_id: &RunId,
    force_new_run: bool,
) -> Result<(), CaseflowError> {
    let message = ctx.store.get_message(message_id).map_err(store_err)?;
    let Some(case_id) = message.case_id.clone() else {
        return Err(CaseflowError::Validation(format!(
            "message {message_id} has no attached case; call attach_inbound_message first"
        )));
    };

    let ttl = ctx.config.timeouts.case_lock_ttl_transition_millis;
    let token = acquire_pipeline_lock(ctx, &case_id, ttl)?;
    let result = run_pipeline_body(ctx, dispatcher, &case_id, &message, run_id, force_new_run);
    let _ = ctx.locks.release(&case_id, "process_inbound", &token);

    match &result {
        Ok(()) => complete_run(ctx, run_id, None),
        Err(err) => complete_run(ctx, run_id, Some(err.to_string())),
    }
    result
}

fn acquire_pipeline_lock(
    ctx: &EngineContext,
    case_id: &CaseId,
    ttl_millis: u64,
) -> Result<caseflow_core::CaseLockToken, CaseflowError> {
    ctx.locks
        .acquire(case_id, "process_inbound", ttl_millis, now_millis())
        .map(|(token, _fencing)| token)
        .map_err(|err| CaseflowError::Transient(format!("failed to acquire process_inbound lock: {err}")))
}

fn run_pipeline_body(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    case_id: &CaseId,
    message: &Message,
    run_id: &RunId,
    force_new_run: bool,
) -> Result<(), CaseflowError> {
    // Step 2: dedup against another live run on this case.
    if let Some(live_run) = ctx.store.find_live_run(case_id).map_err(store_err)? {
        if live_run.id != *run_id && !force_new_run {
            if live_run.status == RunStatus::Waiting && run_obsoleted_by(ctx, &live_run.proposal_id)? {
                dispatcher
                    .cancel(&live_run.id, "superseded")
                    .map_err(|err| CaseflowError::Transient(err.to_string()))?;
            } else {
                return Err(CaseflowError::Conflict(format!(
                    "case {case_id} already has an active run {}", live_run.id
                )));
            }
        }
    }

    // Step 3: classify.
    let case = ctx.store.get_case(case_id).map_err(store_err)?;
    let thread = ctx.store.list_messages_for_case(case_id).map_err(store_err)?;
    let analysis = ctx
        .collaborators
        .classifier
        .classify(&ClassifyRequest {
            case: case.clone(),
            message: message.clone(),
            thread,
            attachments: message.attachments.clone(),
        })
        .map_err(|err| CaseflowError::Transient(err.to_string()))?;

    // Step 4: fold analysis into the case snapshot.
    let mut case = case;
    fold_analysis(&mut case, &analysis);
    ctx.store.put_case(&case).map_err(store_err)?;

    let mut processed_message = message.clone();
    processed_message.processed_at = Some(now_millis());
    processed_message.processed_run_id = Some(run_id.clone());
    ctx.store.put_message(&processed_message).map_err(store_err)?;

    let prior_sent = ctx
        .store
        .list_messages_for_case(case_id)
        .map_err(store_err)?
        .iter()
        .filter(|m| m.direction == caseflow_core::MessageDirection::Outbound)
        .count();

    // Step 5: plan.
    let mut proposal = planner::plan(
        ctx,
        &case,
        &PlanInput {
            analysis: Some(&analysis),
            trigger_message_id: Some(message.id.clone()),
            timer_epoch_bucket: None,
            prior_sent_message_count: prior_sent,
            now: now_millis(),
        },
    )?;

    if proposal.action_type == caseflow_core::ActionType::None {
        transition_case(
            ctx,
            case_id,
            CaseEvent::InboundReceived { message_id: message.id.clone() },
        )?;
        return Ok(());
    }

    // Step 6: decide.
    let outcome = decisioner::decide(ctx, case_id, &mut proposal, run_id)?;
    if let DecisionOutcome::Approved { execution_key } = outcome {
        dispatcher
            .trigger(
                "execute_proposal",
                serde_json::json!({ "proposal_id": proposal.id.as_str() }),
                TriggerOptions {
                    queue: format!("case:{case_id}"),
                    idempotency_key: execution_key.as_str().to_string(),
                    idempotency_key_ttl_millis: ctx.config.timeouts.idempotency_key_ttl_millis,
                    debounce: None,
                },
            )
            .map_err(|err: DispatchError| CaseflowError::Transient(err.to_string()))?;
    }

    Ok(())
}

/// Whether a waiting run's proposal was superseded by a newer inbound
/// message (spec §4.5 step 2): true when the parked proposal is no longer
/// pending.
fn run_obsoleted_by(ctx: &EngineContext, proposal_id: &Option<caseflow_core::ProposalId>) -> Result<bool, CaseflowError> {
    let Some(proposal_id) = proposal_id else {
        return Ok(true);
    };
    let proposal = ctx.store.get_proposal(proposal_id).map_err(store_err)?;
    Ok(proposal.status != caseflow_core::ProposalStatus::PendingApproval)
}

/// Folds a classifier's [`caseflow_core::Analysis`] into the case snapshot
/// (spec §4.5 step 4): canonicalizes detected constraints and advances scope
/// item statuses from `Requested`.
fn fold_analysis(case: &mut caseflow_core::Case, analysis: &caseflow_core::Analysis) {
    for detected in &analysis.constraints_detected {
        case.constraints.insert(caseflow_core::ConstraintTag::new(detected.tag.clone()));
    }

    let target_status = match analysis.intent {
        caseflow_core::Intent::FullApproval => Some(ScopeItemStatus::ConfirmedAvailable),
        caseflow_core::Intent::Denial => Some(ScopeItemStatus::NotDisclosable),
        caseflow_core::Intent::NoRecordsFound => Some(ScopeItemStatus::NotHeld),
        _ => None,
    };
    if let Some(target_status) = target_status {
        for item in &mut case.scope_items {
            if item.status == ScopeItemStatus::Requested {
                item.status = target_status;
            }
        }
    }

    if let Some(amount) = analysis.extracted_fee_amount.clone() {
        case.fee_quote = Some(caseflow_core::FeeQuote {
            amount,
            currency: "USD".to_string(),
            quoted_at: now_millis(),
            status: caseflow_core::FeeQuoteStatus::Quoted,
        });
    }
}

pub(crate) fn complete_run(ctx: &EngineContext, run_id: &RunId, error: Option<String>) {
    let Ok(mut run) = ctx.store.get_run(run_id) else {
        return;
    };
    if run.status == RunStatus::Waiting {
        // The decisioner already parked this run on a waitpoint; leave it.
        return;
    }
    run.status = if error.is_some() { RunStatus::Failed } else { RunStatus::Completed };
    run.ended_at = Some(now_millis());
    run.error = error;
    let _ = ctx.store.put_run(&run);
}

#[allow(dead_code, reason = "kept to document the intended timestamp type import")]
fn _assert_timestamp_type(_: Timestamp) {}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use caseflow_core::AgentRun;
    use caseflow_core::AutopilotMode;
    use caseflow_core::Case;
    use caseflow_core::CaseStatus;
    use caseflow_core::DispatchError;
    use caseflow_core::MessageDirection;
    use caseflow_core::RunTrigger;
    use caseflow_core::TriggerHandle;

    use super::*;
    use crate::engine::test_support::build_test_context;

    struct NoopDispatcher;
    impl DispatcherPort for NoopDispatcher {
        fn trigger(
            &self,
            _task_type: &str,
            _payload: serde_json::Value,
            opts: TriggerOptions,
        ) -> Result<TriggerHandle, DispatchError> {
            Ok(TriggerHandle {
                task_handle_id: "handle-1".to_string(),
                run_id: RunId::new(format!("run-for-{}", opts.idempotency_key)),
                deduplicated: false,
            })
        }

        fn cancel(&self, _run_id: &RunId, _reason: &str) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    fn seed_case(ctx: &EngineContext) {
        let case = Case {
            id: CaseId::new("case-1"),
            status: CaseStatus::AwaitingResponse,
            substatus: None,
            autopilot_mode: AutopilotMode::Auto,
            requires_human: false,
            pause_reason: None,
            agency_email: Some("agency@example.gov".to_string()),
            portal_url: None,
            deadline_date: None,
            fee_quote: None,
            scope_items: Vec::new(),
            constraints: BTreeSet::new(),
            send_date: Some(Timestamp::Logical(1)),
            last_portal_status: None,
            closed_at: None,
            outcome_type: None,
            outcome_summary: None,
        };
        ctx.store.put_case(&case).expect("seeds case");
    }

    fn seed_message(ctx: &EngineContext, body: &str) -> MessageId {
        let message = Message {
            id: MessageId::new("msg-1"),
            case_id: Some(CaseId::new("case-1")),
            thread_id: None,
            direction: MessageDirection::Inbound,
            from: "agency@example.gov".to_string(),
            to: "requester@example.com".to_string(),
            subject: Some("Re: records request".to_string()),
            body_text: Some(body.to_string()),
            body_html: None,
            provider_message_id: None,
            received_at: Some(Timestamp::Logical(2)),
            sent_at: None,
            processed_at: None,
            processed_run_id: None,
            message_type: "email".to_string(),
            attachments: Vec::new(),
        };
        ctx.store.insert_message(&message).expect("seeds message");
        message.id
    }

    fn seed_run(ctx: &EngineContext, message_id: &MessageId) -> RunId {
        let run_id = RunId::new("run-1");
        ctx.store
            .insert_run(&AgentRun {
                id: run_id.clone(),
                case_id: CaseId::new("case-1"),
                trigger_type: RunTrigger::InboundMessage,
                status: RunStatus::Running,
                started_at: Some(Timestamp::Logical(2)),
                ended_at: None,
                error: None,
                continuation_token: None,
                message_id: Some(message_id.clone()),
                proposal_id: None,
                metadata: BTreeMap::new(),
            })
            .expect("seeds run");
        run_id
    }

    #[test]
    fn clarification_message_gates_for_human_review() {
        let ctx = build_test_context();
        seed_case(&ctx);
        let message_id = seed_message(&ctx, "We need clarification on the scope of your request.");
        let run_id = seed_run(&ctx, &message_id);

        process_inbound(&ctx, &NoopDispatcher, &message_id, &run_id, false).expect("processes");

        let case = ctx.store.get_case(&CaseId::new("case-1")).expect("loads case");
        assert!(case.requires_human);
        let proposals = ctx.store.list_proposals_for_case(&CaseId::new("case-1")).expect("lists");
        assert_eq!(proposals.len(), 1);
        assert_eq!(proposals[0].action_type, caseflow_core::ActionType::SendClarification);
    }

    #[test]
    fn fee_notice_message_auto_accepts_a_low_fee() {
        let ctx = build_test_context();
        seed_case(&ctx);
        let message_id = seed_message(&ctx, "There is a $15.00 fee for this request.");
        let run_id = seed_run(&ctx, &message_id);

        process_inbound(&ctx, &NoopDispatcher, &message_id, &run_id, false).expect("processes");

        let proposals = ctx.store.list_proposals_for_case(&CaseId::new("case-1")).expect("lists");
        assert_eq!(proposals[0].action_type, caseflow_core::ActionType::AcceptFee);
        assert_eq!(proposals[0].status, caseflow_core::ProposalStatus::Approved);
    }

    #[test]
    fn dedup_rejects_a_second_concurrent_run() {
        let ctx = build_test_context();
        seed_case(&ctx);
        let message_id = seed_message(&ctx, "Please see the attached unrelated document.");
        let first_run = seed_run(&ctx, &message_id);
        ctx.store
            .insert_run(&AgentRun {
                id: RunId::new("run-2"),
                case_id: CaseId::new("case-1"),
                trigger_type: RunTrigger::Timer,
                status: RunStatus::Queued,
                started_at: None,
                ended_at: None,
                error: None,
                continuation_token: None,
                message_id: None,
                proposal_id: None,
                metadata: BTreeMap::new(),
            })
            .expect("seeds a second live run");

        let err = process_inbound(&ctx, &NoopDispatcher, &message_id, &first_run, false).unwrap_err();
        assert!(matches!(err, CaseflowError::Conflict(_)));
    }
}
