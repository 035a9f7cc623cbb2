// crates/caseflow-service/src/engine/planner.rs
// ============================================================================
// Module: Planner
// Description: Selects exactly one `ActionType` for a case given its latest
//              analysis and prior proposals, drafts content for the chosen
//              action, and persists the resulting Proposal idempotently.
// Purpose: Turn a folded case snapshot into one concrete, reviewable plan
//          (spec §4.6).
// Dependencies: caseflow-core, caseflow-config
// ============================================================================

//! ## Overview
//! [`plan`] applies the ordered rule list of spec §4.6, first match wins.
//! Each rule names an [`ActionType`]; `SEND_*` and `ACCEPT_FEE` actions also
//! call the [`caseflow_core::DraftPort`] to produce subject/text/html
//! content. The resulting [`Proposal`] carries a `proposal_key` hash so a
//! second planning pass over the same trigger is a no-op: `Store::
//! insert_proposal` returns the existing row rather than inserting a
//! duplicate.

use bigdecimal::BigDecimal;
use caseflow_core::ActionType;
use caseflow_core::Analysis;
use caseflow_core::Case;
use caseflow_core::CaseflowError;
use caseflow_core::DraftRequest;
use caseflow_core::GateOption;
use caseflow_core::HashAlgorithm;
use caseflow_core::Intent;
use caseflow_core::MessageId;
use caseflow_core::Proposal;
use caseflow_core::ProposalId;
use caseflow_core::ProposalStatus;
use caseflow_core::Sentiment;
use caseflow_core::hashing::hash_canonical_json;

use crate::engine::clock::generate_token;
use crate::engine::context::EngineContext;
use crate::engine::transition::store_err;

/// Planning input beyond the case itself: the triggering message's analysis
/// (absent for timer-driven planning), the message that triggered this
/// plan (absent for timer triggers), and a stable bucket identifying the
/// timer tick when there is no message (spec §4.6's `proposal_key` input).
#[derive(Debug, Clone)]
pub struct PlanInput<'a> {
    /// Folded analysis of the triggering inbound message, when one exists.
    pub analysis: Option<&'a Analysis>,
    /// The message that triggered this planning pass.
    pub trigger_message_id: Option<MessageId>,
    /// Stable bucket for timer-triggered planning, used in the proposal key
    /// in place of a message id.
    pub timer_epoch_bucket: Option<u64>,
    /// Whether at least one outbound request has already been sent for this
    /// case (drives the `SEND_FOLLOWUP` rule).
    pub prior_sent_message_count: usize,
    /// Current wall-clock/logical time, for the deadline comparison in rule
    /// 5; supplied by the caller so this stays a pure function of its
    /// arguments.
    pub now: caseflow_core::Timestamp,
}

/// Selects an action, drafts content, and persists the resulting proposal.
///
/// # Errors
///
/// Returns [`CaseflowError::Transient`] on a store or draft-collaborator
/// failure.
pub fn plan(ctx: &EngineContext, case: &Case, input: &PlanInput<'_>) -> Result<Proposal, CaseflowError> {
    let decision = select_action(case, input, &ctx.config.autopilot);
    let draft = if needs_draft(decision.action_type) {
        let draft = ctx
            .collaborators
            .draft
            .draft(&DraftRequest {
                case: case.clone(),
                analysis: input.analysis.cloned(),
                action_type: decision.action_type,
                instruction: None,
            })
            .map_err(|err| CaseflowError::Transient(err.to_string()))?;
        Some(draft)
    } else {
        None
    };

    let draft_digest = draft
        .as_ref()
        .map(|d| format!("{}|{}|{}", d.subject, d.body_text, d.body_html))
        .unwrap_or_default();
    let proposal_key = compute_proposal_key(
        &case.id,
        input.trigger_message_id.as_ref(),
        input.timer_epoch_bucket,
        decision.action_type,
        &draft_digest,
        0,
    );

    let proposal = Proposal {
        id: ProposalId::new(generate_token("prop")),
        case_id: case.id.clone(),
        trigger_message_id: input.trigger_message_id.clone(),
        action_type: decision.action_type,
        status: ProposalStatus::PendingApproval,
        confidence: decision.confidence,
        risk_flags: decision.risk_flags,
        warnings: decision.warnings,
        gate_options: default_gate_options(decision.action_type),
        draft_subject: draft.as_ref().map(|d| d.subject.clone()),
        draft_body_text: draft.as_ref().map(|d| d.body_text.clone()),
        draft_body_html: draft.as_ref().map(|d| d.body_html.clone()),
        reasoning: decision.reasoning,
        waitpoint_token: None,
        execution_key: None,
        run_id: None,
        human_decision: None,
        executed_at: None,
        email_job_id: None,
        proposal_key,
        adjustment_count: 0,
    };

    ctx.store.insert_proposal(&proposal).map_err(store_err)
}

/// Builds an adjustment-revision proposal superseding `previous`, drafted
/// with the human's `instruction`, keeping the same proposal-key family but
/// a fresh digest (spec §4.8 S4).
///
/// # Errors
///
/// Returns [`CaseflowError::Transient`] on a store or draft-collaborator
/// failure.
pub fn plan_adjustment(
    ctx: &EngineContext,
    case: &Case,
    previous: &Proposal,
    instruction: &str,
) -> Result<Proposal, CaseflowError> {
    let draft = ctx
        .collaborators
        .draft
        .draft(&DraftRequest {
            case: case.clone(),
            analysis: None,
            action_type: previous.action_type,
            instruction: Some(instruction.to_string()),
        })
        .map_err(|err| CaseflowError::Transient(err.to_string()))?;

    let draft_digest = format!("{}|{}|{}", draft.subject, draft.body_text, draft.body_html);
    let adjustment_count = previous.adjustment_count + 1;
    let proposal_key = compute_proposal_key(
        &case.id,
        previous.trigger_message_id.as_ref(),
        None,
        previous.action_type,
        &draft_digest,
        adjustment_count,
    );

    let proposal = Proposal {
        id: ProposalId::new(generate_token("prop")),
        case_id: case.id.clone(),
        trigger_message_id: previous.trigger_message_id.clone(),
        action_type: previous.action_type,
        status: ProposalStatus::PendingApproval,
        confidence: previous.confidence,
        risk_flags: previous.risk_flags.clone(),
        warnings: previous.warnings.clone(),
        gate_options: previous.gate_options.clone(),
        draft_subject: Some(draft.subject),
        draft_body_text: Some(draft.body_text),
        draft_body_html: Some(draft.body_html),
        reasoning: vec![format!("revised per reviewer instruction: {instruction}")],
        waitpoint_token: None,
        execution_key: None,
        run_id: None,
        human_decision: None,
        executed_at: None,
        email_job_id: None,
        proposal_key,
        adjustment_count,
    };

    ctx.store.insert_proposal(&proposal).map_err(store_err)
}

/// The outcome of rule selection, before a draft is attached.
struct Decision {
    action_type: ActionType,
    confidence: f64,
    risk_flags: Vec<String>,
    warnings: Vec<String>,
    reasoning: Vec<String>,
}

/// Applies the first-match rule list of spec §4.6.
fn select_action(
    case: &Case,
    input: &PlanInput<'_>,
    policy: &caseflow_config::AutopilotPolicy,
) -> Decision {
    // Rule 1: portal submission outstanding.
    if case.portal_url.is_some() && case.send_date.is_none() {
        return Decision {
            action_type: ActionType::SubmitPortal,
            confidence: 1.0,
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            reasoning: vec!["case has a portal_url and no initial submission yet".to_string()],
        };
    }

    let Some(analysis) = input.analysis else {
        // Timer-triggered planning with no message: only rule 5 (follow-up)
        // and the uncertainty fallback can fire.
        if input.prior_sent_message_count >= 1 && deadline_elapsed(case, input.now) {
            return Decision {
                action_type: ActionType::SendFollowup,
                confidence: 0.9,
                risk_flags: Vec::new(),
                warnings: Vec::new(),
                reasoning: vec!["no response received past the deadline".to_string()],
            };
        }
        return Decision {
            action_type: ActionType::None,
            confidence: 1.0,
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            reasoning: vec!["timer tick with nothing actionable".to_string()],
        };
    };

    // Rule 2: fee notice.
    if analysis.intent == Intent::FeeNotice {
        return plan_fee_response(analysis, policy);
    }

    // Rule 3: denial with a strong exemption signal.
    if analysis.intent == Intent::Denial {
        let strong_signal = analysis.sentiment != Sentiment::Neutral
            || !analysis.constraints_detected.is_empty();
        if strong_signal {
            return Decision {
                action_type: ActionType::SendRebuttal,
                confidence: analysis.confidence,
                risk_flags: vec!["strong_denial".to_string()],
                warnings: Vec::new(),
                reasoning: vec!["denial carries a strong exemption/sentiment signal".to_string()],
            };
        }
    }

    // Rule 4: clarification request.
    if analysis.intent == Intent::Clarification {
        return Decision {
            action_type: ActionType::SendClarification,
            confidence: analysis.confidence,
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            reasoning: vec!["agency asked for scope clarification".to_string()],
        };
    }

    // Rule 5: overdue follow-up.
    if analysis.intent == Intent::NoResponse
        && input.prior_sent_message_count >= 1
        && deadline_elapsed(case, input.now)
    {
        return Decision {
            action_type: ActionType::SendFollowup,
            confidence: analysis.confidence,
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            reasoning: vec!["no response received past the deadline".to_string()],
        };
    }

    // Rule 6: hostile sentiment.
    if analysis.sentiment == Sentiment::Hostile {
        return Decision {
            action_type: ActionType::Escalate,
            confidence: analysis.confidence,
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            reasoning: vec!["hostile sentiment detected".to_string()],
        };
    }

    // Rule 7: low confidence fallback.
    if analysis.confidence < 0.5 {
        return Decision {
            action_type: ActionType::Escalate,
            confidence: analysis.confidence,
            risk_flags: Vec::new(),
            warnings: vec!["no planning rule matched with acceptable confidence".to_string()],
            reasoning: vec![format!(
                "no rule matched and confidence {:.2} is below the uncertainty threshold",
                analysis.confidence
            )],
        };
    }

    // Default: nothing actionable this cycle.
    Decision {
        action_type: ActionType::None,
        confidence: analysis.confidence,
        risk_flags: Vec::new(),
        warnings: Vec::new(),
        reasoning: vec!["no planning rule matched".to_string()],
    }
}

/// Rule 2's fee-notice routing: accept below the auto-approve ceiling,
/// negotiate above the hard cap, and fall back to a confidence check for
/// the band in between (spec §9's open question: thresholds are policy
/// config, never hardcoded).
fn plan_fee_response(analysis: &Analysis, policy: &caseflow_config::AutopilotPolicy) -> Decision {
    let Some(amount) = analysis.extracted_fee_amount.clone() else {
        return Decision {
            action_type: ActionType::Escalate,
            confidence: analysis.confidence,
            risk_flags: Vec::new(),
            warnings: vec!["fee notice carried no extractable amount".to_string()],
            reasoning: vec!["fee intent detected but no amount could be extracted".to_string()],
        };
    };
    let auto_max: BigDecimal = policy
        .fee_auto_approve_max
        .parse()
        .expect("config validated fee_auto_approve_max parses");
    let hard_cap: BigDecimal = policy
        .fee_hard_cap
        .parse()
        .expect("config validated fee_hard_cap parses");

    if amount <= auto_max {
        Decision {
            action_type: ActionType::AcceptFee,
            confidence: analysis.confidence.max(0.9),
            risk_flags: Vec::new(),
            warnings: Vec::new(),
            reasoning: vec![format!("fee {amount} is at or below the auto-approve ceiling {auto_max}")],
        }
    } else if amount > hard_cap {
        Decision {
            action_type: ActionType::NegotiateFee,
            confidence: analysis.confidence,
            risk_flags: vec!["fee_above_hard_cap".to_string()],
            warnings: Vec::new(),
            reasoning: vec![format!("fee {amount} exceeds the hard cap {hard_cap}")],
        }
    } else if analysis.confidence >= policy.auto_min_confidence {
        Decision {
            action_type: ActionType::AcceptFee,
            confidence: analysis.confidence,
            risk_flags: Vec::new(),
            warnings: vec!["fee within the negotiable band".to_string()],
            reasoning: vec![format!(
                "fee {amount} is between thresholds but confidence {:.2} clears the auto bar",
                analysis.confidence
            )],
        }
    } else {
        Decision {
            action_type: ActionType::NegotiateFee,
            confidence: analysis.confidence,
            risk_flags: Vec::new(),
            warnings: vec!["fee within the negotiable band, confidence too low to accept".to_string()],
            reasoning: vec![format!("fee {amount} is between thresholds, confidence too low to auto-accept")],
        }
    }
}

/// Whether `now` is past the case's deadline; cases without a deadline
/// never trigger the overdue-follow-up rule.
fn deadline_elapsed(case: &Case, now: caseflow_core::Timestamp) -> bool {
    match case.deadline_date {
        Some(deadline) => deadline.precedes(&now),
        None => false,
    }
}

/// Whether `action_type` requires the draft generator.
fn needs_draft(action_type: ActionType) -> bool {
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

/// The gate options offered alongside a proposal of this action type (spec
/// §4.6): portal submissions never offer `Adjust` (there is no draft to
/// revise), everything else reviewable offers the full set.
fn default_gate_options(action_type: ActionType) -> Vec<GateOption> {
    match action_type {
        ActionType::SubmitPortal => {
            vec![GateOption::Approve, GateOption::Dismiss, GateOption::RetryResearch]
        }
        ActionType::None => Vec::new(),
        _ => vec![GateOption::Approve, GateOption::Adjust, GateOption::Dismiss],
    }
}

/// Computes the idempotent `proposal_key` hash (spec §4.6): a function of
/// the case, the trigger (message or timer bucket), the action, the draft
/// content, and the adjustment generation (so an `Adjust` revision never
/// collides with the proposal it replaced).
fn compute_proposal_key(
    case_id: &caseflow_core::CaseId,
    trigger_message_id: Option<&MessageId>,
    timer_epoch_bucket: Option<u64>,
    action_type: ActionType,
    draft_digest: &str,
    adjustment_count: u32,
) -> String {
    let value = serde_json::json!({
        "case_id": case_id.as_str(),
        "trigger_message_id": trigger_message_id.map(MessageId::as_str),
        "timer_epoch_bucket": timer_epoch_bucket,
        "action_type": action_type,
        "draft_digest": draft_digest,
        "adjustment_count": adjustment_count,
    });
    hash_canonical_json(HashAlgorithm::Sha256, &value)
        .expect("proposal key input is always valid JSON")
        .value
}
