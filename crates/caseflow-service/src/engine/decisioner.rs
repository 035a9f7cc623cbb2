// crates/caseflow-service/src/engine/decisioner.rs
// ============================================================================
// Module: Decisioner
// Description: Routes a freshly planned Proposal to auto-execution or to a
//              human gate, and resolves a human's decision once one arrives.
// Purpose: The single place that reads `Case.autopilot_mode` against policy
//          thresholds to decide whether a plan may proceed unattended (spec
//          §4.7, §4.8).
// Dependencies: caseflow-core, caseflow-config, caseflow-logic
// ============================================================================

//! ## Overview
//! [`decide`] computes `can_auto_execute` as a [`caseflow_logic::Requirement`]
//! over a small [`Gate`] condition set, evaluated against
//! [`caseflow_config::AutopilotPolicy`] — never a hardcoded confidence or fee
//! threshold, per the open question this policy answers. A `true` result
//! approves the proposal and hands it to the dispatcher under
//! `idempotency_key = execution_key`; a `false` result mints a waitpoint,
//! marks the case `requires_human`, and parks the run.
//!
//! [`resolve_human_decision`] is the counterpart for spec §4.8: it validates
//! a human's gate choice against the proposal's `gate_options`, completes the
//! waitpoint (or falls through to the legacy dispatch path when none
//! exists), and performs the gate-specific follow-up (dismiss-and-reconcile,
//! adjust-and-replan, escalate-with-instruction, ...).

use caseflow_config::AutopilotPolicy;
use caseflow_core::case_machine::CaseEvent;
use caseflow_core::ActionType;
use caseflow_core::AutopilotMode;
use caseflow_core::Case;
use caseflow_core::CaseStatus;
use caseflow_core::CaseflowError;
use caseflow_core::DispatchError;
use caseflow_core::DispatcherPort;
use caseflow_core::ExecutionKey;
use caseflow_core::GateOption;
use caseflow_core::HumanDecision;
use caseflow_core::NotificationKind;
use caseflow_core::PauseReason;
use caseflow_core::Proposal;
use caseflow_core::ProposalId;
use caseflow_core::ProposalStatus;
use caseflow_core::RunId;
use caseflow_core::RunStatus;
use caseflow_core::RunTrigger;
use caseflow_core::TriggerOptions;
use caseflow_core::WaitpointPayload;
use caseflow_logic::LogicMode;
use caseflow_logic::Requirement;
use caseflow_logic::TriState;

use crate::engine::clock::generate_token;
use crate::engine::clock::now_millis;
use crate::engine::context::EngineContext;
use crate::engine::pipeline::complete_run;
use crate::engine::planner::plan_adjustment;
use crate::engine::transition::store_err;
use crate::engine::transition::transition_case;

/// Conditions [`decide`] composes into a [`Requirement`] tree; kept small
/// and named so the gate logic reads as policy, not arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    /// `proposal.action_type` is in `AutopilotPolicy::auto_safe_actions`.
    ActionIsAutoSafe,
    /// `proposal.action_type == ActionType::SendFollowup`.
    ActionIsSupervisedFollowup,
    /// `proposal.risk_flags` is empty.
    NoRiskFlags,
    /// `proposal.confidence >= AutopilotPolicy::auto_min_confidence`.
    MeetsAutoConfidence,
    /// `proposal.confidence >= AutopilotPolicy::supervised_min_confidence`.
    MeetsSupervisedConfidence,
}

/// What [`decide`] did with a proposal, for the caller (pipeline or the
/// dispatcher's executor trigger wiring) to act on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// Approved for immediate execution under `execution_key`.
    Approved {
        /// Idempotency key the Executor (and downstream transport) must use.
        execution_key: ExecutionKey,
    },
    /// Gated behind a human decision; the run should park on `waitpoint`.
    Gated {
        /// Waitpoint the run is now suspended on.
        waitpoint: caseflow_core::WaitpointToken,
    },
}

/// Routes `proposal` per spec §4.7, mutating both `proposal` and the case
/// row in the store and returning what happened.
///
/// # Errors
///
/// Returns [`CaseflowError::Transient`] on a store, lock, or waitpoint
/// failure, or whatever [`crate::engine::transition::transition_case`]
/// returns when the resulting case transition is illegal.
pub fn decide(
    ctx: &EngineContext,
    case_id: &caseflow_core::CaseId,
    proposal: &mut Proposal,
    run_id: &RunId,
) -> Result<DecisionOutcome, CaseflowError> {
    let case = ctx.store.get_case(case_id).map_err(store_err)?;
    let can_auto_execute = evaluate_can_auto_execute(&case, proposal, &ctx.config.autopilot);

    if can_auto_execute {
        let execution_key = ExecutionKey::new(generate_token("exec"));
        proposal.status = ProposalStatus::Approved;
        proposal.execution_key = Some(execution_key.clone());
        proposal.run_id = Some(run_id.clone());
        ctx.store.put_proposal(proposal).map_err(store_err)?;
        Ok(DecisionOutcome::Approved { execution_key })
    } else {
        gate_for_human(ctx, &case, proposal, run_id)
    }
}

/// Evaluates the `can_auto_execute` policy predicate for `proposal` under
/// `case.autopilot_mode` (spec §4.7).
fn evaluate_can_auto_execute(case: &Case, proposal: &Proposal, policy: &AutopilotPolicy) -> bool {
    match case.autopilot_mode {
        AutopilotMode::Manual => false,
        AutopilotMode::Auto => {
            let requirement = Requirement::and([
                Requirement::condition(Gate::ActionIsAutoSafe),
                Requirement::condition(Gate::NoRiskFlags),
                Requirement::condition(Gate::MeetsAutoConfidence),
            ]);
            requirement
                .evaluate(&gate_eval(proposal, policy), LogicMode::Kleene)
                .resolve_or(false)
                && !forces_human_gate(proposal.action_type)
        }
        AutopilotMode::Supervised => {
            let requirement = Requirement::and([
                Requirement::condition(Gate::ActionIsSupervisedFollowup),
                Requirement::condition(Gate::NoRiskFlags),
                Requirement::condition(Gate::MeetsSupervisedConfidence),
            ]);
            requirement
                .evaluate(&gate_eval(proposal, policy), LogicMode::Kleene)
                .resolve_or(false)
        }
    }
}

/// Builds the closure evaluating each [`Gate`] leaf against `proposal` and
/// `policy`, relying on [`caseflow_logic`]'s blanket
/// `impl<P, F: Fn(&P) -> TriState> TriStateConditionEval<P> for F`.
fn gate_eval<'a>(proposal: &'a Proposal, policy: &'a AutopilotPolicy) -> impl Fn(&Gate) -> TriState + 'a {
    move |gate: &Gate| match gate {
        Gate::ActionIsAutoSafe => policy.auto_safe_actions.contains(&proposal.action_type).into(),
        Gate::ActionIsSupervisedFollowup => {
            (proposal.action_type == ActionType::SendFollowup).into()
        }
        Gate::NoRiskFlags => proposal.risk_flags.is_empty().into(),
        Gate::MeetsAutoConfidence => (proposal.confidence >= policy.auto_min_confidence).into(),
        Gate::MeetsSupervisedConfidence => {
            (proposal.confidence >= policy.supervised_min_confidence).into()
        }
    }
}

/// Action types that always force a human gate regardless of policy
/// thresholds, because the action itself is a point where an agency's
/// framing (a fee quote, a denial) demands a person in the loop.
fn forces_human_gate(action_type: ActionType) -> bool {
    matches!(
        action_type,
        ActionType::AcceptFee
            | ActionType::NegotiateFee
            | ActionType::DeclineFee
            | ActionType::SendFeeWaiverRequest
            | ActionType::SendRebuttal
            | ActionType::Escalate
    )
}

/// Mints a waitpoint, marks the case as requiring human attention, and
/// parks the run (spec §4.7's gated path).
fn gate_for_human(
    ctx: &EngineContext,
    case: &Case,
    proposal: &mut Proposal,
    run_id: &RunId,
) -> Result<DecisionOutcome, CaseflowError> {
    let now = now_millis();
    let waitpoint_ttl = ctx.config.timeouts.waitpoint_ttl_millis;
    let token = ctx
        .waitpoints
        .create(&proposal.id, waitpoint_ttl, now)
        .map_err(|err| CaseflowError::Transient(err.to_string()))?;

    proposal.status = ProposalStatus::PendingApproval;
    proposal.waitpoint_token = Some(token.clone());
    proposal.run_id = Some(run_id.clone());
    ctx.store.put_proposal(proposal).map_err(store_err)?;

    let pause_reason = pause_reason_for(proposal.action_type);
    transition_to_review(ctx, case, proposal, pause_reason)?;

    let mut run = ctx.store.get_run(run_id).map_err(store_err)?;
    run.status = RunStatus::Waiting;
    run.proposal_id = Some(proposal.id.clone());
    ctx.store.put_run(&run).map_err(store_err)?;

    ctx.notifier.notify(
        NotificationKind::RequiresHuman,
        &format!(
            "case {} requires a human decision on proposal {} ({:?})",
            case.id, proposal.id, proposal.action_type
        ),
        Some(&case.id),
    );

    Ok(DecisionOutcome::Gated { waitpoint: token })
}

/// Maps a gated action to its default [`PauseReason`] (spec §4.6/§4.7).
fn pause_reason_for(action_type: ActionType) -> PauseReason {
    match action_type {
        ActionType::AcceptFee
        | ActionType::NegotiateFee
        | ActionType::DeclineFee
        | ActionType::SendFeeWaiverRequest => PauseReason::FeeQuote,
        ActionType::SendRebuttal => PauseReason::Denial,
        ActionType::SendClarification => PauseReason::Scope,
        _ => PauseReason::Manual,
    }
}

/// Maps a [`PauseReason`] to the review [`CaseStatus`] it escalates into.
fn review_status_for(pause_reason: PauseReason) -> CaseStatus {
    match pause_reason {
        PauseReason::FeeQuote => CaseStatus::NeedsHumanFeeApproval,
        PauseReason::Denial => CaseStatus::NeedsPhoneCall,
        PauseReason::IdRequired => CaseStatus::NeedsContactInfo,
        PauseReason::Scope | PauseReason::Sensitive | PauseReason::Manual => {
            CaseStatus::NeedsHumanReview
        }
    }
}

/// Transitions the case into the review state for `pause_reason`, using the
/// more specific `FeeQuoteReceived` event when a fee quote is already on
/// file so the case's `fee_quote` field stays authoritative.
fn transition_to_review(
    ctx: &EngineContext,
    case: &Case,
    proposal: &Proposal,
    pause_reason: PauseReason,
) -> Result<(), CaseflowError> {
    if pause_reason == PauseReason::FeeQuote {
        if let Some(fee_quote) = case.fee_quote.clone() {
            transition_case(
                ctx,
                &case.id,
                CaseEvent::FeeQuoteReceived {
                    fee_quote,
                    pending_proposal: proposal.id.clone(),
                    pending_proposal_count: 1,
                },
            )?;
            return Ok(());
        }
    }
    transition_case(
        ctx,
        &case.id,
        CaseEvent::CaseEscalated {
            target: review_status_for(pause_reason),
            pause_reason,
        },
    )?;
    Ok(())
}

/// A human's resolution of a gated proposal (spec §4.8).
#[derive(Debug, Clone)]
pub struct HumanResolutionRequest {
    /// Chosen gate option; must be one of `proposal.gate_options`.
    pub action: GateOption,
    /// Free-text instruction; required for `Escalate + Approve`.
    pub instruction: Option<String>,
    /// Free-text reason.
    pub reason: Option<String>,
    /// Caller-supplied routing hint.
    pub route_mode: Option<String>,
    /// Identifier of the human making the decision.
    pub user_id: Option<String>,
}

/// Outcome of resolving a human decision, naming what the caller should
/// trigger next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The waitpoint was completed; the parked run will resume and re-enter
    /// the decisioner on its own.
    WaitpointCompleted,
    /// No waitpoint existed (legacy path); the caller must dispatch a fresh
    /// reprocessing task for this case.
    DispatchReprocessRequired,
    /// The proposal was dismissed and, if nothing else is pending, the case
    /// was reconciled back to a working status.
    DismissedAndReconciled,
    /// A revised proposal was planned from the `Adjust` instruction.
    Adjusted {
        /// The replacement proposal's id.
        new_proposal_id: caseflow_core::ProposalId,
    },
}

/// Resolves a human's gate decision on `proposal` (spec §4.8).
///
/// # Errors
///
/// Returns [`CaseflowError::Validation`] when `action` is not offered by
/// `proposal.gate_options`, [`CaseflowError::Conflict`] when the proposal is
/// not `PendingApproval`, or [`CaseflowError::Transient`] on a store or
/// waitpoint failure.
pub fn resolve_human_decision(
    ctx: &EngineContext,
    proposal: &mut Proposal,
    request: HumanResolutionRequest,
) -> Result<ResolutionOutcome, CaseflowError> {
    if proposal.status != ProposalStatus::PendingApproval {
        return Err(CaseflowError::Conflict(format!(
            "proposal {} is {:?}, not pending_approval",
            proposal.id, proposal.status
        )));
    }
    if !proposal.gate_options.contains(&request.action) {
        return Err(CaseflowError::Validation(format!(
            "{:?} is not offered by proposal {}", request.action, proposal.id
        )));
    }
    if request.action == GateOption::Approve
        && proposal.action_type == ActionType::Escalate
        && request.instruction.as_deref().is_none_or(str::is_empty)
    {
        return Err(CaseflowError::Validation(
            "Escalate + Approve requires a non-empty instruction".to_string(),
        ));
    }

    let human_decision = HumanDecision {
        action: request.action,
        instruction: request.instruction.clone(),
        reason: request.reason.clone(),
        route_mode: request.route_mode.clone(),
        user_id: request.user_id.clone(),
    };

    if let Some(token) = proposal.waitpoint_token.clone() {
        let payload = WaitpointPayload {
            action: request.action,
            instruction: request.instruction.clone(),
            reason: request.reason.clone(),
        };
        match ctx.waitpoints.complete(&token, payload, now_millis()) {
            Ok(()) => {
                proposal.status = ProposalStatus::DecisionReceived;
                proposal.human_decision = Some(human_decision);
                ctx.store.put_proposal(proposal).map_err(store_err)?;
                return Ok(ResolutionOutcome::WaitpointCompleted);
            }
            Err(_expired_or_cancelled) => {
                // Fall through to the legacy dispatch path below.
            }
        }
    }

    proposal.status = ProposalStatus::DecisionReceived;
    proposal.human_decision = Some(human_decision);
    ctx.store.put_proposal(proposal).map_err(store_err)?;
    Ok(ResolutionOutcome::DispatchReprocessRequired)
}

/// Applies a `Dismiss` decision: finalizes the proposal and, if no other
/// proposal is pending, reconciles the case out of its review state (spec
/// §4.8).
///
/// # Errors
///
/// Returns [`CaseflowError::Transient`] on a store failure.
pub fn apply_dismiss(ctx: &EngineContext, proposal: &mut Proposal) -> Result<ResolutionOutcome, CaseflowError> {
    proposal.status = ProposalStatus::Dismissed;
    ctx.store.put_proposal(proposal).map_err(store_err)?;

    let case = ctx.store.get_case(&proposal.case_id).map_err(store_err)?;
    if !case.status.is_review_state() {
        return Ok(ResolutionOutcome::DismissedAndReconciled);
    }
    let pending = ctx.store.count_pending_proposals(&proposal.case_id).map_err(store_err)?;
    if pending > 0 {
        return Ok(ResolutionOutcome::DismissedAndReconciled);
    }

    let messages = ctx.store.list_messages_for_case(&proposal.case_id).map_err(store_err)?;
    let has_inbound = messages
        .iter()
        .any(|m| m.direction == caseflow_core::MessageDirection::Inbound);
    let target = if has_inbound {
        CaseStatus::Responded
    } else {
        CaseStatus::AwaitingResponse
    };
    transition_case(ctx, &proposal.case_id, CaseEvent::CaseReconciled { target })?;
    Ok(ResolutionOutcome::DismissedAndReconciled)
}

/// Applies an `Adjust` decision: plans a revised proposal from the human's
/// instruction (spec §4.8 S4).
///
/// # Errors
///
/// Returns [`CaseflowError::Validation`] when no instruction was supplied,
/// or [`CaseflowError::Transient`] on a store or draft-collaborator
/// failure.
pub fn apply_adjustment(
    ctx: &EngineContext,
    proposal: &mut Proposal,
) -> Result<ResolutionOutcome, CaseflowError> {
    let instruction = proposal
        .human_decision
        .as_ref()
        .and_then(|d| d.instruction.clone())
        .ok_or_else(|| CaseflowError::Validation("Adjust requires an instruction".to_string()))?;

    proposal.status = ProposalStatus::AdjustmentRequested;
    ctx.store.put_proposal(proposal).map_err(store_err)?;

    let case = ctx.store.get_case(&proposal.case_id).map_err(store_err)?;
    let revised = plan_adjustment(ctx, &case, proposal, &instruction)?;
    Ok(ResolutionOutcome::Adjusted { new_proposal_id: revised.id })
}

/// Task body for `task_type == "resume_decision"`: the counterpart to the
/// run [`gate_for_human`] parked, woken by the waitpoint's completion (spec
/// §4.8). Routes `proposal.human_decision.action` to its follow-up and
/// finalizes the run the dispatcher handed this task.
///
/// # Errors
///
/// Returns [`CaseflowError::Validation`] when `proposal` has no recorded
/// decision, or whatever the routed follow-up returns.
pub fn resume_decision(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    proposal_id: &ProposalId,
    run_id: &RunId,
) -> Result<(), CaseflowError> {
    let result = route_recorded_decision(ctx, dispatcher, proposal_id);
    match &result {
        Ok(()) => complete_run(ctx, run_id, None),
        Err(err) => complete_run(ctx, run_id, Some(err.to_string())),
    }
    result
}

/// Completes the run [`gate_for_human`] parked on `proposal` (its wait is
/// over, successfully) and dispatches a fresh run to carry out the
/// recorded decision, returning that new run's id.
///
/// Called by the HTTP decisions handler right after [`resolve_human_decision`]
/// returns either [`ResolutionOutcome::WaitpointCompleted`] or
/// [`ResolutionOutcome::DispatchReprocessRequired`] — both leave the actual
/// routing to a dispatched `resume_decision` task rather than doing it
/// inline on the request thread.
///
/// # Errors
///
/// Returns [`CaseflowError::Transient`] on a store or dispatch failure.
pub fn dispatch_resume(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    proposal: &Proposal,
) -> Result<RunId, CaseflowError> {
    if let Some(parked_run_id) = proposal.run_id.clone() {
        if let Ok(mut parked_run) = ctx.store.get_run(&parked_run_id) {
            if parked_run.status == RunStatus::Waiting {
                parked_run.status = RunStatus::Completed;
                parked_run.ended_at = Some(now_millis());
                let _ = ctx.store.put_run(&parked_run);
            }
        }
    }

    let handle = dispatcher
        .trigger(
            "resume_decision",
            serde_json::json!({ "proposal_id": proposal.id.as_str() }),
            TriggerOptions {
                queue: format!("case:{}", proposal.case_id),
                idempotency_key: generate_token("resume"),
                idempotency_key_ttl_millis: ctx.config.timeouts.idempotency_key_ttl_millis,
                debounce: None,
            },
        )
        .map_err(|err: DispatchError| CaseflowError::Transient(err.to_string()))?;

    let mut run = ctx.store.get_run(&handle.run_id).map_err(store_err)?;
    run.trigger_type = RunTrigger::HumanReviewResolution;
    run.proposal_id = Some(proposal.id.clone());
    ctx.store.put_run(&run).map_err(store_err)?;

    Ok(handle.run_id)
}

fn route_recorded_decision(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    proposal_id: &ProposalId,
) -> Result<(), CaseflowError> {
    let mut proposal = ctx.store.get_proposal(proposal_id).map_err(store_err)?;
    let decision = proposal.human_decision.clone().ok_or_else(|| {
        CaseflowError::Validation(format!("proposal {} has no recorded decision", proposal.id))
    })?;

    match decision.action {
        GateOption::Dismiss => {
            apply_dismiss(ctx, &mut proposal)?;
        }
        GateOption::Adjust => {
            apply_adjustment(ctx, &mut proposal)?;
        }
        GateOption::RetryResearch => apply_retry_research(ctx, dispatcher, &mut proposal)?,
        GateOption::Approve => apply_approval(ctx, dispatcher, &mut proposal)?,
    }
    Ok(())
}

/// Applies an `Approve` decision: mints an execution key and dispatches the
/// Executor, mirroring [`decide`]'s auto-execute path (spec §4.8).
///
/// `SendPdfEmail + Approve` is validated up front: the Executor's direct-send
/// path needs the `filled_*.pdf` attachment its trigger message carries, and
/// failing fast here reports a `400 Validation` rather than letting the
/// Executor discover the missing attachment only after the proposal is
/// already `Approved`.
///
/// `SubmitPortal + Approve` cancels any portal submission still `Started`
/// from an earlier approval of this same proposal (the reaper reopens a
/// proposal for re-approval after a hard portal timeout without removing
/// its old `Execution` row) before dispatching the new one.
fn apply_approval(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    proposal: &mut Proposal,
) -> Result<(), CaseflowError> {
    if proposal.action_type == ActionType::SendPdfEmail {
        crate::engine::executor::locate_filled_pdf_attachment(ctx, proposal).map_err(CaseflowError::Validation)?;
    }
    if proposal.action_type == ActionType::SubmitPortal {
        cancel_open_portal_executions(ctx, &proposal.id)?;
    }

    let execution_key = ExecutionKey::new(generate_token("exec"));
    proposal.status = ProposalStatus::Approved;
    proposal.execution_key = Some(execution_key.clone());
    ctx.store.put_proposal(proposal).map_err(store_err)?;

    dispatcher
        .trigger(
            "execute_proposal",
            serde_json::json!({ "proposal_id": proposal.id.as_str() }),
            TriggerOptions {
                queue: format!("case:{}", proposal.case_id),
                idempotency_key: execution_key.as_str().to_string(),
                idempotency_key_ttl_millis: ctx.config.timeouts.idempotency_key_ttl_millis,
                debounce: None,
            },
        )
        .map_err(|err: DispatchError| CaseflowError::Transient(err.to_string()))?;
    Ok(())
}

/// Marks every still-`Started` portal submission recorded for `proposal_id`
/// as failed/cancelled, so a re-approval never leaves two portal tasks
/// racing for the same proposal.
fn cancel_open_portal_executions(ctx: &EngineContext, proposal_id: &ProposalId) -> Result<(), CaseflowError> {
    let executions = ctx.store.list_executions_for_proposal(proposal_id).map_err(store_err)?;
    for mut execution in executions {
        if execution.status != caseflow_core::ExecutionStatus::Started {
            continue;
        }
        execution.status = caseflow_core::ExecutionStatus::Failed;
        execution.error = Some("cancelled: superseded by a new portal submission approval".to_string());
        execution.completed_at = Some(now_millis());
        ctx.store.put_execution(&execution).map_err(store_err)?;
    }
    Ok(())
}

/// Applies a `RetryResearch` decision: dismisses the proposal and dispatches
/// a guided reprocess of its trigger message, so the next planning pass
/// re-runs research instead of replanning from the stale analysis (spec
/// §4.8).
fn apply_retry_research(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    proposal: &mut Proposal,
) -> Result<(), CaseflowError> {
    apply_dismiss(ctx, proposal)?;
    let Some(message_id) = proposal.trigger_message_id.clone() else {
        return Ok(());
    };
    dispatcher
        .trigger(
            "process_inbound",
            serde_json::json!({ "message_id": message_id.as_str(), "force_new_run": true }),
            TriggerOptions {
                queue: format!("case:{}", proposal.case_id),
                idempotency_key: generate_token("retry-research"),
                idempotency_key_ttl_millis: ctx.config.timeouts.idempotency_key_ttl_millis,
                debounce: None,
            },
        )
        .map_err(|err: DispatchError| CaseflowError::Transient(err.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use caseflow_core::CaseId;
    use caseflow_core::MessageId;
    use caseflow_core::ProposalId;
    use caseflow_core::RunTrigger;
    use caseflow_core::Timestamp;

    use super::*;
    use crate::engine::test_support::build_test_context;

    fn seed_case(ctx: &EngineContext, mode: AutopilotMode) -> Case {
        let case = Case {
            id: CaseId::new("case-1"),
            status: CaseStatus::AwaitingResponse,
            substatus: None,
            autopilot_mode: mode,
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
        case
    }

    fn seed_run(ctx: &EngineContext) -> RunId {
        let run_id = RunId::new("run-1");
        ctx.store
            .insert_run(&caseflow_core::AgentRun {
                id: run_id.clone(),
                case_id: CaseId::new("case-1"),
                trigger_type: RunTrigger::InboundMessage,
                status: RunStatus::Running,
                started_at: Some(Timestamp::Logical(1)),
                ended_at: None,
                error: None,
                continuation_token: None,
                message_id: Some(MessageId::new("msg-1")),
                proposal_id: None,
                metadata: BTreeMap::new(),
            })
            .expect("seeds run");
        run_id
    }

    fn bare_proposal(action_type: ActionType, confidence: f64, risk_flags: Vec<String>) -> Proposal {
        Proposal {
            id: ProposalId::new("prop-1"),
            case_id: CaseId::new("case-1"),
            trigger_message_id: Some(MessageId::new("msg-1")),
            action_type,
            status: ProposalStatus::PendingApproval,
            confidence,
            risk_flags,
            warnings: Vec::new(),
            gate_options: vec![GateOption::Approve, GateOption::Adjust, GateOption::Dismiss],
            draft_subject: Some("subject".to_string()),
            draft_body_text: Some("body".to_string()),
            draft_body_html: Some("<p>body</p>".to_string()),
            reasoning: Vec::new(),
            waitpoint_token: None,
            execution_key: None,
            run_id: None,
            human_decision: None,
            executed_at: None,
            email_job_id: None,
            proposal_key: "key-1".to_string(),
            adjustment_count: 0,
        }
    }

    #[test]
    fn auto_mode_auto_safe_action_executes_without_a_gate() {
        let ctx = build_test_context();
        seed_case(&ctx, AutopilotMode::Auto);
        let run_id = seed_run(&ctx);
        let mut proposal = bare_proposal(ActionType::SendFollowup, 0.95, Vec::new());
        ctx.store.insert_proposal(&proposal).expect("inserts");

        let outcome = decide(&ctx, &CaseId::new("case-1"), &mut proposal, &run_id).expect("decides");
        assert!(matches!(outcome, DecisionOutcome::Approved { .. }));
        assert_eq!(proposal.status, ProposalStatus::Approved);
        assert!(proposal.execution_key.is_some());
    }

    #[test]
    fn auto_mode_fee_action_always_gates() {
        let ctx = build_test_context();
        let mut case = seed_case(&ctx, AutopilotMode::Auto);
        case.fee_quote = Some(caseflow_core::FeeQuote {
            amount: "15.00".parse().unwrap(),
            currency: "USD".to_string(),
            quoted_at: Timestamp::Logical(1),
            status: caseflow_core::FeeQuoteStatus::Quoted,
        });
        ctx.store.put_case(&case).expect("updates case");
        let run_id = seed_run(&ctx);
        let mut proposal = bare_proposal(ActionType::AcceptFee, 0.99, Vec::new());
        ctx.store.insert_proposal(&proposal).expect("inserts");

        let outcome = decide(&ctx, &CaseId::new("case-1"), &mut proposal, &run_id).expect("decides");
        assert!(matches!(outcome, DecisionOutcome::Gated { .. }));
        assert_eq!(proposal.status, ProposalStatus::PendingApproval);

        let updated_case = ctx.store.get_case(&CaseId::new("case-1")).expect("loads case");
        assert!(updated_case.requires_human);
        assert_eq!(updated_case.status, CaseStatus::NeedsHumanFeeApproval);
    }

    #[test]
    fn manual_mode_always_gates() {
        let ctx = build_test_context();
        seed_case(&ctx, AutopilotMode::Manual);
        let run_id = seed_run(&ctx);
        let mut proposal = bare_proposal(ActionType::SendFollowup, 0.99, Vec::new());
        ctx.store.insert_proposal(&proposal).expect("inserts");

        let outcome = decide(&ctx, &CaseId::new("case-1"), &mut proposal, &run_id).expect("decides");
        assert!(matches!(outcome, DecisionOutcome::Gated { .. }));
    }

    #[test]
    fn resolve_decision_rejects_action_outside_gate_options() {
        let ctx = build_test_context();
        let mut proposal = bare_proposal(ActionType::SubmitPortal, 0.9, Vec::new());
        proposal.gate_options = vec![GateOption::Approve, GateOption::Dismiss, GateOption::RetryResearch];
        let err = resolve_human_decision(
            &ctx,
            &mut proposal,
            HumanResolutionRequest {
                action: GateOption::Adjust,
                instruction: None,
                reason: None,
                route_mode: None,
                user_id: None,
            },
        )
        .unwrap_err();
        assert!(matches!(err, CaseflowError::Validation(_)));
    }

    #[test]
    fn resolve_decision_without_waitpoint_requires_dispatch() {
        let ctx = build_test_context();
        let mut proposal = bare_proposal(ActionType::SendFollowup, 0.9, Vec::new());
        let outcome = resolve_human_decision(
            &ctx,
            &mut proposal,
            HumanResolutionRequest {
                action: GateOption::Approve,
                instruction: None,
                reason: Some("looks fine".to_string()),
                route_mode: None,
                user_id: Some("reviewer-1".to_string()),
            },
        )
        .expect("resolves");
        assert_eq!(outcome, ResolutionOutcome::DispatchReprocessRequired);
        assert_eq!(proposal.status, ProposalStatus::DecisionReceived);
    }

    struct RecordingDispatcher {
        triggers: std::sync::Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl RecordingDispatcher {
        fn new() -> Self {
            Self { triggers: std::sync::Mutex::new(Vec::new()) }
        }
    }

    impl DispatcherPort for RecordingDispatcher {
        fn trigger(
            &self,
            task_type: &str,
            payload: serde_json::Value,
            opts: TriggerOptions,
        ) -> Result<caseflow_core::TriggerHandle, DispatchError> {
            self.triggers.lock().unwrap().push((task_type.to_string(), payload));
            Ok(caseflow_core::TriggerHandle {
                task_handle_id: "handle".to_string(),
                run_id: RunId::new(format!("run-for-{}", opts.idempotency_key)),
                deduplicated: false,
            })
        }

        fn cancel(&self, _run_id: &RunId, _reason: &str) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    fn seed_run_for_proposal(ctx: &EngineContext) -> RunId {
        let run_id = seed_run(ctx);
        let mut run = ctx.store.get_run(&run_id).expect("loads run");
        run.status = RunStatus::Waiting;
        ctx.store.put_run(&run).expect("updates run");
        run_id
    }

    #[test]
    fn resume_decision_approve_dispatches_executor() {
        let ctx = build_test_context();
        seed_case(&ctx, AutopilotMode::Manual);
        let run_id = seed_run_for_proposal(&ctx);
        let mut proposal = bare_proposal(ActionType::SendFollowup, 0.5, Vec::new());
        proposal.status = ProposalStatus::DecisionReceived;
        proposal.human_decision = Some(HumanDecision {
            action: GateOption::Approve,
            instruction: None,
            reason: None,
            route_mode: None,
            user_id: Some("reviewer-1".to_string()),
        });
        ctx.store.insert_proposal(&proposal).expect("inserts");

        let dispatcher = RecordingDispatcher::new();
        resume_decision(&ctx, &dispatcher, &proposal.id, &run_id).expect("resumes");

        let stored = ctx.store.get_proposal(&proposal.id).expect("loads proposal");
        assert_eq!(stored.status, ProposalStatus::Approved);
        assert!(stored.execution_key.is_some());
        let triggers = dispatcher.triggers.lock().unwrap();
        assert_eq!(triggers[0].0, "execute_proposal");
    }

    #[test]
    fn resume_decision_retry_research_dismisses_and_redispatches() {
        let ctx = build_test_context();
        seed_case(&ctx, AutopilotMode::Manual);
        let run_id = seed_run_for_proposal(&ctx);
        let mut proposal = bare_proposal(ActionType::SubmitPortal, 0.5, Vec::new());
        proposal.status = ProposalStatus::DecisionReceived;
        proposal.human_decision = Some(HumanDecision {
            action: GateOption::RetryResearch,
            instruction: None,
            reason: None,
            route_mode: None,
            user_id: None,
        });
        ctx.store.insert_proposal(&proposal).expect("inserts");

        let dispatcher = RecordingDispatcher::new();
        resume_decision(&ctx, &dispatcher, &proposal.id, &run_id).expect("resumes");

        let stored = ctx.store.get_proposal(&proposal.id).expect("loads proposal");
        assert_eq!(stored.status, ProposalStatus::Dismissed);
        let triggers = dispatcher.triggers.lock().unwrap();
        assert_eq!(triggers[0].0, "process_inbound");
    }

    #[test]
    fn resume_decision_without_a_recorded_decision_is_rejected() {
        let ctx = build_test_context();
        seed_case(&ctx, AutopilotMode::Manual);
        let run_id = seed_run_for_proposal(&ctx);
        let proposal = bare_proposal(ActionType::SendFollowup, 0.5, Vec::new());
        ctx.store.insert_proposal(&proposal).expect("inserts");

        let dispatcher = RecordingDispatcher::new();
        let err = resume_decision(&ctx, &dispatcher, &proposal.id, &run_id).unwrap_err();
        assert!(matches!(err, CaseflowError::Validation(_)));
    }
}
