// crates/caseflow-core/src/core/case_machine.rs
// ============================================================================
// Module: Case State Machine
// Description: Guarded transitions for Case.status, applied as a pure
//              function of (current case, event) so the guard table stays
//              testable without a store or lock in scope.
// Purpose: Give `TransitionCase` (owned by caseflow-service, which supplies
//          the CaseLock and transaction around this call) one place that
//          knows which transitions are legal and what they mutate.
// Dependencies: crate::core::model, crate::core::error, crate::core::time
// ============================================================================

//! ## Overview
//! [`apply`] takes the event names from spec §4.1 and turns them into a
//! single guarded mutation of a [`Case`]: it never reads a store, never
//! acquires a lock, and never appends to the activity log itself — it
//! returns a [`TransitionRecord`] describing what happened so the caller
//! (holding the case lock, inside one transaction) can persist the new row
//! and the log entry together. This keeps the guard table a pure function
//! of its inputs, matching the "core never reads wall-clock time" rule in
//! `time`.
//!
//! Terminal cases (`Completed`, `Cancelled`) reject every event here with
//! [`CaseflowError::Conflict`]; the caller is expected to check
//! `CaseStatus::is_terminal` before even attempting a transition, but the
//! guard enforces it regardless.

use crate::core::error::CaseflowError;
use crate::core::identifiers::MessageId;
use crate::core::identifiers::ProposalId;
use crate::core::model::Case;
use crate::core::model::CaseStatus;
use crate::core::model::FeeQuote;
use crate::core::model::OutcomeType;
use crate::core::model::PauseReason;
use crate::core::time::Timestamp;

/// The abstract input to the case state machine (spec §4.1), distinct from
/// whatever literal message or function name a caller used to trigger it.
#[derive(Debug, Clone, PartialEq)]
pub enum CaseEvent {
    /// The initial or a follow-up request was sent.
    CaseSent {
        /// When the send completed.
        sent_at: Timestamp,
    },
    /// A new inbound message was attached to this case.
    InboundReceived {
        /// The message that was attached.
        message_id: MessageId,
    },
    /// The agency quoted a fee.
    FeeQuoteReceived {
        /// The quote itself.
        fee_quote: FeeQuote,
        /// The single pending proposal this quote is gated behind.
        pending_proposal: ProposalId,
        /// Number of proposals currently pending for this case; must be
        /// exactly one or the event is rejected (invariant #1, §8).
        pending_proposal_count: usize,
    },
    /// A portal submission began.
    PortalStarted {
        /// Worker-reported status string.
        status: String,
    },
    /// The case was escalated to a human review state.
    CaseEscalated {
        /// Which review state to escalate into.
        target: CaseStatus,
        /// Why.
        pause_reason: PauseReason,
    },
    /// A review state was resolved without further human gating.
    CaseReconciled {
        /// The non-review status to land in.
        target: CaseStatus,
    },
    /// The case reached a terminal outcome.
    CaseClosed {
        /// `Completed` or `Cancelled`.
        target: CaseStatus,
        /// When it closed.
        closed_at: Timestamp,
        /// Final disposition.
        outcome_type: OutcomeType,
        /// Human-readable summary, usually produced by the external
        /// summarizer.
        outcome_summary: Option<String>,
    },
}

/// What `apply` did, for the caller to persist as one `ActivityLog` entry
/// alongside the mutated `Case` row.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionRecord {
    /// Stable event type string for the activity log (`case_sent`, ...).
    pub event_type: &'static str,
    /// Human-readable description.
    pub description: String,
    /// Status before the transition.
    pub from_status: CaseStatus,
    /// Status after the transition.
    pub to_status: CaseStatus,
}

/// Applies `event` to `case`, mutating it in place and returning a record of
/// what happened.
///
/// # Errors
///
/// Returns [`CaseflowError::Conflict`] when `case.status` is terminal or the
/// event's source-state guard fails, and [`CaseflowError::Validation`] when
/// the event's own payload is malformed (e.g. an escalation target that is
/// not a review state).
#[allow(clippy::too_many_lines, reason = "one guard per event, kept flat and exhaustive by design")]
pub fn apply(case: &mut Case, event: CaseEvent) -> Result<TransitionRecord, CaseflowError> {
    if case.status.is_terminal() {
        return Err(CaseflowError::Conflict(format!(
            "case {} is terminal ({:?}); no further transitions are permitted",
            case.id, case.status
        )));
    }

    let from_status = case.status;

    match event {
        CaseEvent::CaseSent { sent_at } => {
            if from_status != CaseStatus::ReadyToSend {
                return Err(CaseflowError::Conflict(format!(
                    "CASE_SENT requires ready_to_send, case {} is {from_status:?}",
                    case.id
                )));
            }
            case.status = CaseStatus::AwaitingResponse;
            case.send_date = Some(sent_at);
            case.requires_human = false;
            Ok(TransitionRecord {
                event_type: "case_sent",
                description: "request sent to agency".to_string(),
                from_status,
                to_status: case.status,
            })
        }

        CaseEvent::InboundReceived { message_id } => {
            if !matches!(from_status, CaseStatus::AwaitingResponse | CaseStatus::Sent) {
                return Err(CaseflowError::Conflict(format!(
                    "INBOUND_RECEIVED requires awaiting_response or sent, case {} is {from_status:?}",
                    case.id
                )));
            }
            case.status = CaseStatus::Responded;
            Ok(TransitionRecord {
                event_type: "inbound_received",
                description: format!("inbound message {message_id} attached"),
                from_status,
                to_status: case.status,
            })
        }

        CaseEvent::FeeQuoteReceived {
            fee_quote,
            pending_proposal,
            pending_proposal_count,
        } => {
            if pending_proposal_count != 1 {
                return Err(CaseflowError::Validation(format!(
                    "FEE_QUOTE_RECEIVED requires exactly one pending proposal, found {pending_proposal_count}"
                )));
            }
            case.status = CaseStatus::NeedsHumanFeeApproval;
            case.pause_reason = Some(PauseReason::FeeQuote);
            case.requires_human = true;
            case.fee_quote = Some(fee_quote);
            Ok(TransitionRecord {
                event_type: "fee_quote_received",
                description: format!("fee quote gated behind proposal {pending_proposal}"),
                from_status,
                to_status: case.status,
            })
        }

        CaseEvent::PortalStarted { status } => {
            case.status = CaseStatus::PortalInProgress;
            case.requires_human = false;
            case.pause_reason = None;
            case.last_portal_status = Some(status.clone());
            Ok(TransitionRecord {
                event_type: "portal_started",
                description: format!("portal submission started: {status}"),
                from_status,
                to_status: case.status,
            })
        }

        CaseEvent::CaseEscalated {
            target,
            pause_reason,
        } => {
            if !target.is_review_state() {
                return Err(CaseflowError::Validation(format!(
                    "CASE_ESCALATED target {target:?} is not a review state"
                )));
            }
            case.status = target;
            case.requires_human = true;
            case.pause_reason = Some(pause_reason);
            Ok(TransitionRecord {
                event_type: "case_escalated",
                description: format!("escalated to {target:?} ({pause_reason:?})"),
                from_status,
                to_status: case.status,
            })
        }

        CaseEvent::CaseReconciled { target } => {
            if !from_status.is_review_state() {
                return Err(CaseflowError::Conflict(format!(
                    "CASE_RECONCILED requires a review state, case {} is {from_status:?}",
                    case.id
                )));
            }
            if target.is_review_state() || target.is_terminal() {
                return Err(CaseflowError::Validation(format!(
                    "CASE_RECONCILED target {target:?} must be a non-review, non-terminal status"
                )));
            }
            case.status = target;
            case.requires_human = false;
            case.pause_reason = None;
            Ok(TransitionRecord {
                event_type: "case_reconciled",
                description: format!("reconciled from {from_status:?} to {target:?}"),
                from_status,
                to_status: case.status,
            })
        }

        CaseEvent::CaseClosed {
            target,
            closed_at,
            outcome_type,
            outcome_summary,
        } => {
            if !target.is_terminal() {
                return Err(CaseflowError::Validation(format!(
                    "CASE_CLOSED target {target:?} must be terminal"
                )));
            }
            case.status = target;
            case.closed_at = Some(closed_at);
            case.outcome_type = Some(outcome_type);
            case.outcome_summary = outcome_summary.clone();
            case.requires_human = false;
            Ok(TransitionRecord {
                event_type: "case_closed",
                description: outcome_summary
                    .unwrap_or_else(|| format!("case closed as {outcome_type:?}")),
                from_status,
                to_status: case.status,
            })
        }
    }
}
