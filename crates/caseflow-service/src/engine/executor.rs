// crates/caseflow-service/src/engine/executor.rs
// ============================================================================
// Module: Executor
// Description: Exactly-once side-effect execution for an approved Proposal.
// Purpose: The single-flight claim, transport call, and forward-only
//          recovery discipline described in spec §4.9.
// Dependencies: caseflow-core
// ============================================================================

//! ## Overview
//! [`execute`] is the task body a queue worker invokes for
//! `task_type == "execute_proposal"`. It claims the proposal with a
//! compare-and-set on `(status == Approved, execution_key)` so a retried or
//! duplicated trigger is a no-op for every caller but the one that won the
//! claim, performs the action's side effect through the matching
//! collaborator port with `execution_key` as the downstream idempotency
//! key, retries transient transport failures up to three times with
//! exponential backoff, and on success records the `Execution` row, writes
//! the outbound `Message`, and transitions the case. A failure that survives
//! retries rolls the proposal back to `PendingApproval` (never leaves it
//! stranded in `Executing`) and appends an activity log entry explaining
//! why, per spec §7's forward-or-fully-back rule.
//!
//! `SubmitPortal` is the one action this claim does not resolve inline:
//! [`PortalWorkerPort::submit`][caseflow_core::PortalWorkerPort::submit] is a
//! durable task meant to run on its own worker thread, not block the claim
//! that dispatched it. [`execute`] instead hands it off via
//! [`begin_portal_submission`], which parks the proposal on
//! `PENDING_PORTAL` and dispatches a separate `submit_portal_task`;
//! [`run_portal_submission`] is that task's body, and is the one that
//! actually blocks on the portal worker and reconciles the result. This
//! keeps the `Execution` row genuinely `Started` for the interval the reaper's
//! soft/hard timeout sweep watches.

use std::thread::sleep;
use std::time::Duration;

use caseflow_core::case_machine::CaseEvent;
use caseflow_core::ActionType;
use caseflow_core::Attachment;
use caseflow_core::Case;
use caseflow_core::CaseflowError;
use caseflow_core::DispatcherPort;
use caseflow_core::Execution;
use caseflow_core::ExecutionId;
use caseflow_core::ExecutionKey;
use caseflow_core::ExecutionKind;
use caseflow_core::ExecutionStatus;
use caseflow_core::Message;
use caseflow_core::MessageDirection;
use caseflow_core::MessageId;
use caseflow_core::MetadataMap;
use caseflow_core::OutboundEmail;
use caseflow_core::PortalResult;
use caseflow_core::PortalSubmission;
use caseflow_core::PortalTaskStatus;
use caseflow_core::Proposal;
use caseflow_core::ProposalId;
use caseflow_core::ProposalStatus;
use caseflow_core::TransportError;
use caseflow_core::TriggerOptions;
use rand::Rng;

use crate::engine::clock::generate_token;
use crate::engine::clock::now_millis;
use crate::engine::context::EngineContext;
use crate::engine::transition::store_err;
use crate::engine::transition::transition_case;

const MAX_TRANSPORT_ATTEMPTS: u32 = 3;
const RETRY_BASE_MILLIS: u64 = 100;

/// What a side effect produced, before the case is transitioned.
struct SideEffectOutcome {
    kind: ExecutionKind,
    provider_message_id: Option<String>,
    case_event: CaseEvent,
    outbound_message: Option<Message>,
}

/// Executes the approved proposal `proposal_id` under `execution_key` (spec
/// §4.9).
///
/// Returns `Ok(())` both when execution succeeds and when another worker
/// already claimed the same proposal — the caller has nothing further to do
/// either way.
///
/// # Errors
///
/// Returns [`CaseflowError::Transient`] when every retry of the side effect
/// fails, after the proposal has been rolled back to `PendingApproval`.
pub fn execute(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    proposal_id: &ProposalId,
    execution_key: &ExecutionKey,
) -> Result<(), CaseflowError> {
    let claimed = ctx
        .store
        .claim_proposal_for_execution(proposal_id, ProposalStatus::Approved, execution_key)
        .map_err(store_err)?;
    if !claimed {
        return Ok(());
    }

    let proposal = ctx.store.get_proposal(proposal_id).map_err(store_err)?;
    let case = ctx.store.get_case(&proposal.case_id).map_err(store_err)?;

    let execution_id = ExecutionId::new(generate_token("exec-row"));
    let execution = Execution {
        id: execution_id.clone(),
        proposal_id: proposal.id.clone(),
        case_id: case.id.clone(),
        kind: execution_kind_for(proposal.action_type),
        provider_message_id: None,
        status: ExecutionStatus::Started,
        started_at: now_millis(),
        completed_at: None,
        error: None,
    };
    ctx.store.insert_execution(&execution).map_err(store_err)?;

    if proposal.action_type == ActionType::SubmitPortal {
        return begin_portal_submission(ctx, dispatcher, &case, &proposal, execution, execution_key);
    }

    match perform_with_retries(ctx, &case, &proposal, execution_key) {
        Ok(outcome) => finish_success(ctx, &case, &proposal, execution, outcome),
        Err(err) => finish_failure(ctx, &proposal, execution, err),
    }
}

/// Runs the action's side effect, retrying a [`TransportError::Transient`]
/// failure up to [`MAX_TRANSPORT_ATTEMPTS`] times with jittered exponential
/// backoff, always reusing the same `execution_key`.
fn perform_with_retries(
    ctx: &EngineContext,
    case: &Case,
    proposal: &Proposal,
    execution_key: &ExecutionKey,
) -> Result<SideEffectOutcome, TransportError> {
    let mut attempt = 0;
    loop {
        match perform_side_effect(ctx, case, proposal, execution_key) {
            Ok(outcome) => return Ok(outcome),
            Err(TransportError::Transient(detail)) => {
                attempt += 1;
                if attempt >= MAX_TRANSPORT_ATTEMPTS {
                    return Err(TransportError::Transient(detail));
                }
                sleep(backoff_duration(attempt));
            }
            Err(err @ TransportError::Permanent(_)) => return Err(err),
        }
    }
}

/// `100ms * 2^attempt` plus up to 50ms of jitter.
fn backoff_duration(attempt: u32) -> Duration {
    let base = RETRY_BASE_MILLIS.saturating_mul(1u64 << attempt.min(16));
    let jitter = rand::thread_rng().gen_range(0..50);
    Duration::from_millis(base + jitter)
}

/// Dispatches to the transport appropriate for `proposal.action_type` (spec
/// §4.9 step 2): email for every `Send*`/`AcceptFee`/`NegotiateFee`/
/// `DeclineFee`/`SendFeeWaiverRequest` action. `SubmitPortal` never reaches
/// here — [`execute`] routes it to [`begin_portal_submission`] before
/// `perform_with_retries` is called. `ActionType::None` and research-only
/// actions have no transport call and simply record an
/// `OutboundMessageWrite`.
fn perform_side_effect(
    ctx: &EngineContext,
    case: &Case,
    proposal: &Proposal,
    execution_key: &ExecutionKey,
) -> Result<SideEffectOutcome, TransportError> {
    if proposal.action_type == ActionType::SendPdfEmail {
        return send_pdf_email(ctx, case, proposal, execution_key);
    }
    if needs_email(proposal.action_type) {
        return send_email(ctx, case, proposal, execution_key);
    }
    // Record-only action (e.g. a manually logged outcome): no transport,
    // still produces an Execution/Message pair so the activity trail is
    // complete.
    Ok(SideEffectOutcome {
        kind: ExecutionKind::OutboundMessageWrite,
        provider_message_id: None,
        case_event: reconcile_event(),
        outbound_message: None,
    })
}

fn needs_email(action_type: ActionType) -> bool {
    matches!(
        action_type,
        ActionType::SendInitialRequest
            | ActionType::SendFollowup
            | ActionType::SendClarification
            | ActionType::SendRebuttal
            | ActionType::SendAppeal
            | ActionType::RespondPartialApproval
            | ActionType::AcceptFee
            | ActionType::NegotiateFee
            | ActionType::DeclineFee
            | ActionType::SendFeeWaiverRequest
            | ActionType::ReformulateRequest
            | ActionType::SendStatusUpdate
    )
}

fn send_email(
    ctx: &EngineContext,
    case: &Case,
    proposal: &Proposal,
    execution_key: &ExecutionKey,
) -> Result<SideEffectOutcome, TransportError> {
    let to = case
        .agency_email
        .clone()
        .ok_or_else(|| TransportError::Permanent(format!("case {} has no agency_email on file", case.id)))?;
    let email = OutboundEmail {
        to,
        from: "requester@caseflow.example".to_string(),
        subject: proposal.draft_subject.clone().unwrap_or_default(),
        text: proposal.draft_body_text.clone().unwrap_or_default(),
        html: proposal.draft_body_html.clone().unwrap_or_default(),
        headers: MetadataMap::new(),
        attachments: Vec::new(),
        idempotency_key: execution_key.as_str().to_string(),
    };
    let receipt = ctx.collaborators.email.send(&email)?;

    let message = Message {
        id: MessageId::new(generate_token("msg")),
        case_id: Some(case.id.clone()),
        thread_id: None,
        direction: MessageDirection::Outbound,
        from: email.from.clone(),
        to: email.to.clone(),
        subject: Some(email.subject.clone()),
        body_text: Some(email.text.clone()),
        body_html: Some(email.html.clone()),
        provider_message_id: Some(receipt.provider_message_id.clone()),
        received_at: None,
        sent_at: Some(now_millis()),
        processed_at: None,
        processed_run_id: None,
        message_type: "email".to_string(),
        attachments: Vec::new(),
    };

    let case_event = if proposal.action_type == ActionType::SendInitialRequest {
        CaseEvent::CaseSent { sent_at: now_millis() }
    } else {
        reconcile_event()
    };

    Ok(SideEffectOutcome {
        kind: ExecutionKind::EmailSend,
        provider_message_id: Some(receipt.provider_message_id),
        case_event,
        outbound_message: Some(message),
    })
}

/// Finds the `filled_*.pdf` attachment on the proposal's trigger message
/// (spec §4.8's `SEND_PDF_EMAIL + APPROVE` special case: the agency's blank
/// form, filled in and attached back to the inbound thread, is what gets
/// mailed out).
pub(crate) fn locate_filled_pdf_attachment(ctx: &EngineContext, proposal: &Proposal) -> Result<Attachment, String> {
    let message_id = proposal
        .trigger_message_id
        .clone()
        .ok_or_else(|| format!("proposal {} has no trigger message to draw a filled PDF from", proposal.id))?;
    let message = ctx.store.get_message(&message_id).map_err(|err| err.to_string())?;
    message
        .attachments
        .into_iter()
        .find(|attachment| attachment.filename.starts_with("filled_") && attachment.filename.ends_with(".pdf"))
        .ok_or_else(|| format!("no filled_*.pdf attachment on message {message_id}"))
}

fn send_pdf_email(
    ctx: &EngineContext,
    case: &Case,
    proposal: &Proposal,
    execution_key: &ExecutionKey,
) -> Result<SideEffectOutcome, TransportError> {
    let attachment = locate_filled_pdf_attachment(ctx, proposal).map_err(TransportError::Permanent)?;
    let to = case
        .agency_email
        .clone()
        .ok_or_else(|| TransportError::Permanent(format!("case {} has no agency_email on file", case.id)))?;
    let email = OutboundEmail {
        to,
        from: "requester@caseflow.example".to_string(),
        subject: proposal.draft_subject.clone().unwrap_or_default(),
        text: proposal.draft_body_text.clone().unwrap_or_default(),
        html: proposal.draft_body_html.clone().unwrap_or_default(),
        headers: MetadataMap::new(),
        attachments: vec![attachment],
        idempotency_key: execution_key.as_str().to_string(),
    };
    let receipt = ctx.collaborators.email.send(&email)?;

    let message = Message {
        id: MessageId::new(generate_token("msg")),
        case_id: Some(case.id.clone()),
        thread_id: None,
        direction: MessageDirection::Outbound,
        from: email.from.clone(),
        to: email.to.clone(),
        subject: Some(email.subject.clone()),
        body_text: Some(email.text.clone()),
        body_html: Some(email.html.clone()),
        provider_message_id: Some(receipt.provider_message_id.clone()),
        received_at: None,
        sent_at: Some(now_millis()),
        processed_at: None,
        processed_run_id: None,
        message_type: "email".to_string(),
        attachments: email.attachments.clone(),
    };

    Ok(SideEffectOutcome {
        kind: ExecutionKind::EmailSend,
        provider_message_id: Some(receipt.provider_message_id),
        case_event: CaseEvent::CaseSent { sent_at: now_millis() },
        outbound_message: Some(message),
    })
}

/// Begins a `SubmitPortal` execution (spec §4.8/§6/§4.9): rather than
/// blocking the claim on
/// [`PortalWorkerPort::submit`][caseflow_core::PortalWorkerPort::submit],
/// parks the proposal on `PENDING_PORTAL` and hands the actual blocking call
/// off to a freshly dispatched `submit_portal_task`, which
/// [`run_portal_submission`] executes. The `Execution` row this call already
/// inserted stays `Started` until that task reconciles it — exactly the
/// window the reaper's portal timeout sweep watches.
///
/// A case with no `portal_url` on file fails immediately, same as before;
/// nothing durable to dispatch in that case.
fn begin_portal_submission(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    case: &Case,
    proposal: &Proposal,
    execution: Execution,
    execution_key: &ExecutionKey,
) -> Result<(), CaseflowError> {
    let Some(portal_url) = case.portal_url.clone() else {
        return finish_failure(
            ctx,
            proposal,
            execution,
            TransportError::Permanent(format!("case {} has no portal_url on file", case.id)),
        );
    };

    let portal_task_id = generate_token("portal");
    let payload = serde_json::json!({
        "proposal_id": proposal.id.as_str(),
        "execution_id": execution.id.as_str(),
        "portal_url": portal_url,
        "portal_task_id": portal_task_id,
        "execution_key": execution_key.as_str(),
    });
    let opts = TriggerOptions {
        queue: format!("case:{}", case.id),
        idempotency_key: format!("portal-submit:{}", execution_key.as_str()),
        idempotency_key_ttl_millis: ctx.config.timeouts.idempotency_key_ttl_millis,
        debounce: None,
    };

    if let Err(err) = dispatcher.trigger("submit_portal_task", payload, opts) {
        return finish_failure(ctx, proposal, execution, TransportError::Transient(err.to_string()));
    }

    let mut proposal = proposal.clone();
    proposal.status = ProposalStatus::PendingPortal;
    ctx.store.put_proposal(&proposal).map_err(store_err)?;
    Ok(())
}

/// Task body for `task_type == "submit_portal_task"`: the worker
/// [`begin_portal_submission`] hands the actual blocking
/// `PortalWorkerPort::submit` call off to. Reconciles the `Execution` row
/// `execution_id` and the `proposal_id` proposal exactly as a synchronous
/// `perform_side_effect` would have, just on a separate task so the claim
/// that dispatched it never blocks.
///
/// A no-op if the proposal has already moved on from `PENDING_PORTAL` — a
/// superseding decision (e.g. the reaper reopening a timed-out submission)
/// raced this task and won.
///
/// # Errors
///
/// Returns [`CaseflowError::NotFound`] or [`CaseflowError::Transient`] on a
/// store failure, or whatever [`finish_failure`] maps the portal transport
/// error to.
pub fn run_portal_submission(
    ctx: &EngineContext,
    proposal_id: &ProposalId,
    execution_id: &ExecutionId,
    portal_url: &str,
    portal_task_id: &str,
    execution_key: &ExecutionKey,
) -> Result<(), CaseflowError> {
    let proposal = ctx.store.get_proposal(proposal_id).map_err(store_err)?;
    if proposal.status != ProposalStatus::PendingPortal {
        return Ok(());
    }
    let case = ctx.store.get_case(&proposal.case_id).map_err(store_err)?;
    let execution = ctx
        .store
        .list_executions_for_proposal(proposal_id)
        .map_err(store_err)?
        .into_iter()
        .find(|execution| &execution.id == execution_id)
        .ok_or_else(|| CaseflowError::NotFound(format!("execution {execution_id} not found for proposal {proposal_id}")))?;

    let submission = PortalSubmission {
        case_id: case.id.clone(),
        portal_url: portal_url.to_string(),
        provider: "generic".to_string(),
        instructions: proposal.reasoning.join("; "),
        portal_task_id: portal_task_id.to_string(),
        idempotency_key: execution_key.as_str().to_string(),
    };

    match submit_portal_with_retries(ctx, &submission) {
        Ok(result) if result.status == PortalTaskStatus::Success => finish_success(
            ctx,
            &case,
            &proposal,
            execution,
            SideEffectOutcome {
                kind: ExecutionKind::PortalSubmission,
                provider_message_id: result.confirmation_number,
                case_event: CaseEvent::PortalStarted { status: format!("{:?}", result.status) },
                outbound_message: None,
            },
        ),
        Ok(result) => finish_failure(
            ctx,
            &proposal,
            execution,
            TransportError::Permanent(format!("portal submission ended in {:?}", result.status)),
        ),
        Err(err) => finish_failure(ctx, &proposal, execution, err),
    }
}

/// [`perform_with_retries`]'s retry/backoff policy, applied to the one
/// blocking call [`run_portal_submission`] makes.
fn submit_portal_with_retries(ctx: &EngineContext, submission: &PortalSubmission) -> Result<PortalResult, TransportError> {
    let mut attempt = 0;
    loop {
        match ctx.collaborators.portal.submit(submission) {
            Ok(result) => return Ok(result),
            Err(TransportError::Transient(detail)) => {
                attempt += 1;
                if attempt >= MAX_TRANSPORT_ATTEMPTS {
                    return Err(TransportError::Transient(detail));
                }
                sleep(backoff_duration(attempt));
            }
            Err(err @ TransportError::Permanent(_)) => return Err(err),
        }
    }
}

/// The case-status follow-up for a non-initial send: reconciles out of a
/// review state back into `AwaitingResponse`. Callers only apply this event
/// when the case is actually in a review state (see `finish_success`); a
/// case already `AwaitingResponse` or `Responded` needs no transition.
fn reconcile_event() -> CaseEvent {
    CaseEvent::CaseReconciled { target: caseflow_core::CaseStatus::AwaitingResponse }
}

fn finish_success(
    ctx: &EngineContext,
    case: &Case,
    proposal: &Proposal,
    mut execution: Execution,
    outcome: SideEffectOutcome,
) -> Result<(), CaseflowError> {
    execution.status = ExecutionStatus::Completed;
    execution.provider_message_id = outcome.provider_message_id.clone();
    execution.completed_at = Some(now_millis());
    ctx.store.put_execution(&execution).map_err(store_err)?;

    if let Some(message) = &outcome.outbound_message {
        ctx.store.insert_message(message).map_err(store_err)?;
    }

    let mut proposal = proposal.clone();
    proposal.status = ProposalStatus::Executed;
    proposal.executed_at = Some(now_millis());
    ctx.store.put_proposal(&proposal).map_err(store_err)?;

    if case.status.is_review_state()
        || proposal.action_type == ActionType::SendInitialRequest
        || proposal.action_type == ActionType::SendPdfEmail
    {
        // `CaseReconciled`/`CaseSent` both assert a source-state guard the
        // case machine enforces; an action that doesn't need a transition
        // (e.g. re-submitting to an already-AwaitingResponse case) falls
        // through to the no-op default below.
        match transition_case(ctx, &case.id, outcome.case_event) {
            Ok(_) => {}
            Err(CaseflowError::Conflict(_)) => {}
            Err(err) => return Err(err),
        }
    } else if matches!(outcome.kind, ExecutionKind::PortalSubmission) {
        transition_case(ctx, &case.id, outcome.case_event)?;
    }

    ctx.notifier.notify(
        caseflow_core::NotificationKind::ProposalExecuted,
        &format!("proposal {} executed ({:?})", proposal.id, proposal.action_type),
        Some(&case.id),
    );

    Ok(())
}

fn finish_failure(
    ctx: &EngineContext,
    proposal: &Proposal,
    mut execution: Execution,
    err: TransportError,
) -> Result<(), CaseflowError> {
    execution.status = ExecutionStatus::Failed;
    execution.error = Some(err.to_string());
    execution.completed_at = Some(now_millis());
    let execution_id = execution.id.clone();
    let _ = ctx.store.put_execution(&execution);

    let mut proposal = proposal.clone();
    proposal.status = ProposalStatus::PendingApproval;
    proposal.human_decision = None;
    let _ = ctx.store.put_proposal(&proposal);

    let mut metadata = MetadataMap::new();
    metadata.insert("proposal_id".to_string(), serde_json::json!(proposal.id.as_str()));
    metadata.insert("execution_id".to_string(), serde_json::json!(execution_id.as_str()));
    let _ = ctx.store.append_activity_log(
        &proposal.case_id,
        "proposal_execution_failed",
        &err.to_string(),
        metadata,
        now_millis(),
    );

    match err {
        TransportError::Transient(detail) => Err(CaseflowError::Transient(detail)),
        TransportError::Permanent(detail) => Err(CaseflowError::Permanent(detail)),
    }
}

fn execution_kind_for(action_type: ActionType) -> ExecutionKind {
    if action_type == ActionType::SubmitPortal {
        ExecutionKind::PortalSubmission
    } else if action_type == ActionType::SendPdfEmail || needs_email(action_type) {
        ExecutionKind::EmailSend
    } else {
        ExecutionKind::OutboundMessageWrite
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use caseflow_core::AutopilotMode;
    use caseflow_core::CaseId;
    use caseflow_core::CaseStatus;
    use caseflow_core::DispatchError;
    use caseflow_core::GateOption;
    use caseflow_core::Timestamp;
    use caseflow_core::TriggerHandle;

    use super::*;
    use crate::engine::test_support::build_test_context;

    /// A no-op dispatcher: every `submit_portal_task` trigger in these tests
    /// is reconciled by calling [`run_portal_submission`] directly rather
    /// than waiting on a real queue worker.
    struct RecordingDispatcher;

    impl DispatcherPort for RecordingDispatcher {
        fn trigger(
            &self,
            _task_type: &str,
            _payload: serde_json::Value,
            opts: TriggerOptions,
        ) -> Result<TriggerHandle, DispatchError> {
            Ok(TriggerHandle {
                task_handle_id: "handle".to_string(),
                run_id: caseflow_core::RunId::new(format!("run-for-{}", opts.idempotency_key)),
                deduplicated: false,
            })
        }

        fn cancel(&self, _run_id: &caseflow_core::RunId, _reason: &str) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    fn seed_case(ctx: &EngineContext, status: CaseStatus) -> Case {
        let case = Case {
            id: CaseId::new("case-1"),
            status,
            substatus: None,
            autopilot_mode: AutopilotMode::Auto,
            requires_human: status.is_review_state(),
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
        case
    }

    fn seed_proposal(ctx: &EngineContext, action_type: ActionType, execution_key: &ExecutionKey) -> Proposal {
        let proposal = Proposal {
            id: ProposalId::new("prop-1"),
            case_id: CaseId::new("case-1"),
            trigger_message_id: None,
            action_type,
            status: ProposalStatus::Approved,
            confidence: 0.95,
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            gate_options: vec![GateOption::Approve, GateOption::Adjust, GateOption::Dismiss],
            draft_subject: Some("Follow-up".to_string()),
            draft_body_text: Some("body".to_string()),
            draft_body_html: Some("<p>body</p>".to_string()),
            reasoning: Vec::new(),
            waitpoint_token: None,
            execution_key: Some(execution_key.clone()),
            run_id: None,
            human_decision: None,
            executed_at: None,
            email_job_id: None,
            proposal_key: "key-1".to_string(),
            adjustment_count: 0,
        };
        ctx.store.insert_proposal(&proposal).expect("inserts proposal");
        proposal
    }

    #[test]
    fn executes_a_followup_and_marks_the_proposal_executed() {
        let ctx = build_test_context();
        seed_case(&ctx, CaseStatus::NeedsHumanReview);
        let execution_key = ExecutionKey::new("exec-1");
        seed_proposal(&ctx, ActionType::SendFollowup, &execution_key);

        execute(&ctx, &RecordingDispatcher, &ProposalId::new("prop-1"), &execution_key).expect("executes");

        let proposal = ctx.store.get_proposal(&ProposalId::new("prop-1")).expect("loads");
        assert_eq!(proposal.status, ProposalStatus::Executed);
        assert!(proposal.executed_at.is_some());

        let case = ctx.store.get_case(&CaseId::new("case-1")).expect("loads case");
        assert_eq!(case.status, CaseStatus::AwaitingResponse);
    }

    #[test]
    fn a_second_claim_on_the_same_proposal_is_a_no_op() {
        let ctx = build_test_context();
        seed_case(&ctx, CaseStatus::AwaitingResponse);
        let execution_key = ExecutionKey::new("exec-1");
        seed_proposal(&ctx, ActionType::SendFollowup, &execution_key);

        execute(&ctx, &RecordingDispatcher, &ProposalId::new("prop-1"), &execution_key).expect("first claim executes");
        execute(&ctx, &RecordingDispatcher, &ProposalId::new("prop-1"), &execution_key).expect("second claim is a no-op");

        let proposal = ctx.store.get_proposal(&ProposalId::new("prop-1")).expect("loads");
        assert_eq!(proposal.status, ProposalStatus::Executed);
    }

    #[test]
    fn send_pdf_email_locates_the_filled_attachment_and_sends_it() {
        let ctx = build_test_context();
        seed_case(&ctx, CaseStatus::ReadyToSend);

        let trigger = Message {
            id: MessageId::new("msg-form"),
            case_id: Some(CaseId::new("case-1")),
            thread_id: None,
            direction: MessageDirection::Inbound,
            from: "agency@example.gov".to_string(),
            to: "requester@caseflow.example".to_string(),
            subject: Some("Please complete the attached form".to_string()),
            body_text: None,
            body_html: None,
            provider_message_id: None,
            received_at: Some(Timestamp::Logical(1)),
            sent_at: None,
            processed_at: None,
            processed_run_id: None,
            message_type: "email".to_string(),
            attachments: vec![
                Attachment {
                    filename: "blank_form.pdf".to_string(),
                    content_type: "application/pdf".to_string(),
                    uri: "mem://blank".to_string(),
                    size_bytes: 10,
                },
                Attachment {
                    filename: "filled_form.pdf".to_string(),
                    content_type: "application/pdf".to_string(),
                    uri: "mem://filled".to_string(),
                    size_bytes: 12,
                },
            ],
        };
        ctx.store.insert_message(&trigger).expect("seeds trigger message");

        let execution_key = ExecutionKey::new("exec-pdf");
        let mut proposal = seed_proposal(&ctx, ActionType::SendPdfEmail, &execution_key);
        proposal.trigger_message_id = Some(MessageId::new("msg-form"));
        ctx.store.put_proposal(&proposal).expect("updates proposal");

        execute(&ctx, &RecordingDispatcher, &ProposalId::new("prop-1"), &execution_key).expect("executes");

        let proposal = ctx.store.get_proposal(&ProposalId::new("prop-1")).expect("loads");
        assert_eq!(proposal.status, ProposalStatus::Executed);

        let case = ctx.store.get_case(&CaseId::new("case-1")).expect("loads case");
        assert_eq!(case.status, CaseStatus::AwaitingResponse);
    }

    #[test]
    fn send_pdf_email_fails_without_a_filled_attachment() {
        let ctx = build_test_context();
        seed_case(&ctx, CaseStatus::ReadyToSend);
        let execution_key = ExecutionKey::new("exec-pdf-2");
        let mut proposal = seed_proposal(&ctx, ActionType::SendPdfEmail, &execution_key);
        proposal.trigger_message_id = None;
        ctx.store.put_proposal(&proposal).expect("updates proposal");

        let err = execute(&ctx, &RecordingDispatcher, &ProposalId::new("prop-1"), &execution_key).unwrap_err();
        assert!(matches!(err, CaseflowError::Permanent(_)));

        let proposal = ctx.store.get_proposal(&ProposalId::new("prop-1")).expect("loads");
        assert_eq!(proposal.status, ProposalStatus::PendingApproval);
    }

    #[test]
    fn submit_portal_parks_on_pending_portal_without_blocking_the_claim() {
        let ctx = build_test_context();
        let mut case = seed_case(&ctx, CaseStatus::AwaitingResponse);
        case.portal_url = Some("https://agency.example/portal".to_string());
        ctx.store.put_case(&case).expect("updates case");
        let execution_key = ExecutionKey::new("exec-2");
        seed_proposal(&ctx, ActionType::SubmitPortal, &execution_key);

        execute(&ctx, &RecordingDispatcher, &ProposalId::new("prop-1"), &execution_key).expect("executes");

        // The claim returns without ever calling the portal worker: the
        // proposal is parked, and the case has not yet transitioned.
        let proposal = ctx.store.get_proposal(&ProposalId::new("prop-1")).expect("loads");
        assert_eq!(proposal.status, ProposalStatus::PendingPortal);
        let parked = ctx.store.get_case(&CaseId::new("case-1")).expect("loads case");
        assert_eq!(parked.status, CaseStatus::AwaitingResponse);

        let executions = ctx
            .store
            .list_executions_for_proposal(&ProposalId::new("prop-1"))
            .expect("loads executions");
        assert_eq!(executions.len(), 1);
        assert_eq!(executions[0].status, ExecutionStatus::Started);
    }

    #[test]
    fn reconciling_a_portal_submission_transitions_case_to_portal_in_progress() {
        let ctx = build_test_context();
        let mut case = seed_case(&ctx, CaseStatus::AwaitingResponse);
        case.portal_url = Some("https://agency.example/portal".to_string());
        ctx.store.put_case(&case).expect("updates case");
        let execution_key = ExecutionKey::new("exec-2");
        seed_proposal(&ctx, ActionType::SubmitPortal, &execution_key);
        execute(&ctx, &RecordingDispatcher, &ProposalId::new("prop-1"), &execution_key).expect("executes");

        let execution_id = ctx
            .store
            .list_executions_for_proposal(&ProposalId::new("prop-1"))
            .expect("loads executions")
            .remove(0)
            .id;

        run_portal_submission(
            &ctx,
            &ProposalId::new("prop-1"),
            &execution_id,
            "https://agency.example/portal",
            "portal-task-1",
            &execution_key,
        )
        .expect("reconciles");

        let proposal = ctx.store.get_proposal(&ProposalId::new("prop-1")).expect("loads");
        assert_eq!(proposal.status, ProposalStatus::Executed);
        let updated = ctx.store.get_case(&CaseId::new("case-1")).expect("loads case");
        assert_eq!(updated.status, CaseStatus::PortalInProgress);
    }
}
