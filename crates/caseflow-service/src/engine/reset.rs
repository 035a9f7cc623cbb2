// crates/caseflow-service/src/engine/reset.rs
// ============================================================================
// Module: Reset To Last Inbound
// Description: Unwinds a case's in-flight work and re-triggers processing
//              of its most recent inbound message (spec §6, §8 S6).
// Purpose: Give an operator one idempotent recovery operation for a case
//          that is stuck behind a stale waitpoint or a run that will never
//          finish, without hand-editing rows.
// Dependencies: caseflow-core
// ============================================================================

//! ## Overview
//! [`reset_to_last_inbound`] holds the case's `reset_to_last_inbound`
//! operation lock for its whole body: it dismisses every open waitpoint on
//! the case's pending proposals, cancels whatever run is currently live,
//! clears `processed_at` on the most recent inbound message, and triggers a
//! fresh `process_inbound` run against it. Running it twice in a row is a
//! no-op the second time past the first message-clear — there is nothing
//! left to dismiss or cancel — matching the idempotence the spec requires.

use caseflow_core::CaseId;
use caseflow_core::CaseflowError;
use caseflow_core::DispatchError;
use caseflow_core::DispatcherPort;
use caseflow_core::GateOption;
use caseflow_core::ProposalStatus;
use caseflow_core::RunId;
use caseflow_core::RunStatus;
use caseflow_core::RunTrigger;
use caseflow_core::TriggerOptions;
use caseflow_core::WaitpointPayload;

use crate::engine::clock::generate_token;
use crate::engine::clock::now_millis;
use crate::engine::context::EngineContext;
use crate::engine::lock::with_case_lock;
use crate::engine::reaper::latest_inbound;
use crate::engine::transition::store_err;

/// Resets `case_id` to reprocess its last inbound message (spec §8 S6).
///
/// # Errors
///
/// Returns [`CaseflowError::NotFound`] when the case has no inbound message
/// to reprocess, or [`CaseflowError::Transient`] on a lock, store, or
/// dispatch failure.
pub fn reset_to_last_inbound(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    case_id: &CaseId,
) -> Result<RunId, CaseflowError> {
    with_case_lock(
        ctx,
        case_id,
        "reset_to_last_inbound",
        ctx.config.timeouts.case_lock_ttl_reset_millis,
        || reset_body(ctx, dispatcher, case_id),
    )
}

fn reset_body(ctx: &EngineContext, dispatcher: &dyn DispatcherPort, case_id: &CaseId) -> Result<RunId, CaseflowError> {
    dismiss_open_waitpoints(ctx, case_id)?;
    cancel_live_run(ctx, dispatcher, case_id)?;

    let messages = ctx.store.list_messages_for_case(case_id).map_err(store_err)?;
    let Some(last_inbound) = latest_inbound(&messages) else {
        return Err(CaseflowError::NotFound(format!("case {case_id} has no inbound message to reset to")));
    };
    let mut cleared = last_inbound.clone();
    cleared.processed_at = None;
    cleared.processed_run_id = None;
    ctx.store.put_message(&cleared).map_err(store_err)?;

    let opts = TriggerOptions {
        queue: format!("case:{case_id}"),
        idempotency_key: generate_token("reset"),
        idempotency_key_ttl_millis: ctx.config.timeouts.idempotency_key_ttl_millis,
        debounce: None,
    };
    let handle = dispatcher
        .trigger(
            "process_inbound",
            serde_json::json!({ "message_id": cleared.id.as_str(), "force_new_run": true }),
            opts,
        )
        .map_err(|err: DispatchError| CaseflowError::Transient(err.to_string()))?;

    // `trigger` stamps a generic `InboundMessage` run; relabel it so the
    // activity trail distinguishes an operator-initiated reset from an
    // ordinary inbound arrival.
    let mut run = ctx.store.get_run(&handle.run_id).map_err(store_err)?;
    run.trigger_type = RunTrigger::ResetToLastInbound;
    ctx.store.put_run(&run).map_err(store_err)?;

    Ok(handle.run_id)
}

/// Completes every still-open waitpoint for `case_id`'s pending proposals
/// with a `DISMISS` decision.
fn dismiss_open_waitpoints(ctx: &EngineContext, case_id: &CaseId) -> Result<(), CaseflowError> {
    let proposals = ctx.store.list_proposals_for_case(case_id).map_err(store_err)?;
    let now = now_millis();
    let payload = WaitpointPayload {
        action: GateOption::Dismiss,
        instruction: None,
        reason: Some("reset_to_last_inbound".to_string()),
    };
    for proposal in proposals {
        if !matches!(proposal.status, ProposalStatus::PendingApproval | ProposalStatus::Blocked) {
            continue;
        }
        let Some(token) = proposal.waitpoint_token.clone() else {
            continue;
        };
        // Already completed (or expired and reaped) is not an error here:
        // the reset still proceeds to cancel the run and clear the message.
        let _ = ctx.waitpoints.complete(&token, payload.clone(), now);
    }
    Ok(())
}

/// Cancels whatever run currently owns `case_id`, if any.
fn cancel_live_run(ctx: &EngineContext, dispatcher: &dyn DispatcherPort, case_id: &CaseId) -> Result<(), CaseflowError> {
    let Some(run) = ctx.store.find_live_run(case_id).map_err(store_err)? else {
        return Ok(());
    };
    if matches!(run.status, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled) {
        return Ok(());
    }
    dispatcher
        .cancel(&run.id, "superseded")
        .map_err(|err: DispatchError| CaseflowError::Transient(err.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use caseflow_core::AgentRun;
    use caseflow_core::AutopilotMode;
    use caseflow_core::Case;
    use caseflow_core::CaseStatus;
    use caseflow_core::DispatchError as CoreDispatchError;
    use caseflow_core::GateOption;
    use caseflow_core::Message;
    use caseflow_core::MessageDirection;
    use caseflow_core::MessageId;
    use caseflow_core::Proposal;
    use caseflow_core::ProposalId;
    use caseflow_core::Timestamp;
    use caseflow_core::TriggerHandle;

    use super::*;
    use crate::engine::test_support::build_test_context;

    struct RecordingDispatcher {
        cancelled: std::sync::Mutex<Vec<RunId>>,
    }

    impl RecordingDispatcher {
        fn new() -> Self {
            Self { cancelled: std::sync::Mutex::new(Vec::new()) }
        }
    }

    impl DispatcherPort for RecordingDispatcher {
        fn trigger(
            &self,
            _task_type: &str,
            _payload: serde_json::Value,
            opts: TriggerOptions,
        ) -> Result<TriggerHandle, CoreDispatchError> {
            Ok(TriggerHandle {
                task_handle_id: "handle".to_string(),
                run_id: RunId::new(format!("run-for-{}", opts.idempotency_key)),
                deduplicated: false,
            })
        }

        fn cancel(&self, run_id: &RunId, _reason: &str) -> Result<(), CoreDispatchError> {
            self.cancelled.lock().unwrap().push(run_id.clone());
            Ok(())
        }
    }

    fn seed_case(ctx: &EngineContext) {
        ctx.store
            .put_case(&Case {
                id: CaseId::new("case-1"),
                status: CaseStatus::NeedsHumanReview,
                substatus: None,
                autopilot_mode: AutopilotMode::Manual,
                requires_human: true,
                pause_reason: None,
                agency_email: Some("agency@example.gov".to_string()),
                portal_url: None,
                deadline_date: None,
                fee_quote: None,
                scope_items: Vec::new(),
                constraints: BTreeSet::new(),
                send_date: None,
                last_portal_status: None,
                closed_at: None,
                outcome_type: None,
                outcome_summary: None,
            })
            .expect("seeds case");
    }

    fn seed_inbound(ctx: &EngineContext) -> MessageId {
        let message = Message {
            id: MessageId::new("msg-1"),
            case_id: Some(CaseId::new("case-1")),
            thread_id: None,
            direction: MessageDirection::Inbound,
            from: "agency@example.gov".to_string(),
            to: "requester@example.com".to_string(),
            subject: None,
            body_text: Some("denied under exemption 7(a)".to_string()),
            body_html: None,
            provider_message_id: None,
            received_at: Some(Timestamp::Logical(1)),
            sent_at: None,
            processed_at: Some(Timestamp::Logical(2)),
            processed_run_id: Some(RunId::new("run-0")),
            message_type: "email".to_string(),
            attachments: Vec::new(),
        };
        ctx.store.insert_message(&message).expect("seeds message");
        message.id
    }

    #[test]
    fn resets_clears_message_cancels_run_and_dismisses_waitpoint() {
        let ctx = build_test_context();
        seed_case(&ctx);
        seed_inbound(&ctx);

        let token = ctx.waitpoints.create(&caseflow_core::ProposalId::new("prop-1"), 60_000, now_millis()).expect("creates waitpoint");
        let proposal = Proposal {
            id: ProposalId::new("prop-1"),
            case_id: CaseId::new("case-1"),
            trigger_message_id: Some(MessageId::new("msg-1")),
            action_type: caseflow_core::ActionType::SendRebuttal,
            status: ProposalStatus::PendingApproval,
            confidence: 0.8,
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            gate_options: vec![GateOption::Approve, GateOption::Dismiss],
            draft_subject: None,
            draft_body_text: None,
            draft_body_html: None,
            reasoning: Vec::new(),
            waitpoint_token: Some(token),
            execution_key: None,
            run_id: Some(RunId::new("run-0")),
            human_decision: None,
            executed_at: None,
            email_job_id: None,
            proposal_key: "key-1".to_string(),
            adjustment_count: 0,
        };
        ctx.store.insert_proposal(&proposal).expect("inserts proposal");
        ctx.store
            .insert_run(&AgentRun {
                id: RunId::new("run-0"),
                case_id: CaseId::new("case-1"),
                trigger_type: RunTrigger::InboundMessage,
                status: RunStatus::Waiting,
                started_at: Some(Timestamp::Logical(1)),
                ended_at: None,
                error: None,
                continuation_token: None,
                message_id: Some(MessageId::new("msg-1")),
                proposal_id: Some(proposal.id.clone()),
                metadata: BTreeMap::new(),
            })
            .expect("seeds run");

        let dispatcher = RecordingDispatcher::new();
        let new_run_id = reset_to_last_inbound(&ctx, &dispatcher, &CaseId::new("case-1")).expect("resets");

        assert_eq!(*dispatcher.cancelled.lock().unwrap(), vec![RunId::new("run-0")]);
        let message = ctx.store.get_message(&MessageId::new("msg-1")).expect("loads message");
        assert!(message.processed_at.is_none());
        let run = ctx.store.get_run(&new_run_id).expect("loads new run");
        assert_eq!(run.trigger_type, RunTrigger::ResetToLastInbound);
    }

    #[test]
    fn reset_with_no_inbound_message_is_not_found() {
        let ctx = build_test_context();
        seed_case(&ctx);
        let dispatcher = RecordingDispatcher::new();
        let err = reset_to_last_inbound(&ctx, &dispatcher, &CaseId::new("case-1")).unwrap_err();
        assert!(matches!(err, CaseflowError::NotFound(_)));
    }
}
