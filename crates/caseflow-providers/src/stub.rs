// crates/caseflow-providers/src/stub.rs
// ============================================================================
// Module: Deterministic Stub Providers
// Description: In-memory, deterministic implementations of every external
//              collaborator port.
// Purpose: Give local runs and tests a `use_stub = true` provider wiring
//          that needs no network access and produces reproducible output.
// Dependencies: caseflow-core
// ============================================================================

//! ## Overview
//! Stub providers never fail transiently and never touch the network. They
//! exist so `caseflow-cli serve` and the system test suite can run the full
//! orchestration engine without a live classifier, draft generator, email
//! transport, or portal worker.

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use bigdecimal::BigDecimal;
use caseflow_core::AiCollaboratorError;
use caseflow_core::Analysis;
use caseflow_core::ClassifierPort;
use caseflow_core::ClassifyRequest;
use caseflow_core::Draft;
use caseflow_core::DraftPort;
use caseflow_core::DraftRequest;
use caseflow_core::EmailTransportPort;
use caseflow_core::Intent;
use caseflow_core::OutboundEmail;
use caseflow_core::PortalResult;
use caseflow_core::PortalSubmission;
use caseflow_core::PortalTaskStatus;
use caseflow_core::PortalWorkerPort;
use caseflow_core::Sentiment;
use caseflow_core::SendReceipt;
use caseflow_core::TransportError;

/// Deterministic classifier: reads the inbound message's `message_type`
/// field and maps common agency phrasings to an [`Intent`], otherwise
/// reports [`Intent::Other`] at low confidence.
///
/// # Invariants
/// - Never returns [`AiCollaboratorError`].
#[derive(Debug, Default)]
pub struct StubClassifierPort;

impl ClassifierPort for StubClassifierPort {
    fn classify(&self, request: &ClassifyRequest) -> Result<Analysis, AiCollaboratorError> {
        let body = request.message.body_text.as_deref().unwrap_or_default().to_lowercase();
        let (intent, confidence) = classify_body(&body);
        Ok(Analysis {
            intent,
            sentiment: Sentiment::Neutral,
            confidence,
            key_points: vec![format!("stub classification of message {}", request.message.id)],
            extracted_fee_amount: extract_fee_amount(&body),
            constraints_detected: Vec::new(),
            extra: std::collections::BTreeMap::new(),
        })
    }
}

/// Maps lowercase message text to a coarse intent and confidence.
fn classify_body(body: &str) -> (Intent, f64) {
    if body.contains("fee") || body.contains("payment") {
        (Intent::FeeNotice, 0.9)
    } else if body.contains("denied") || body.contains("denial") {
        (Intent::Denial, 0.9)
    } else if body.contains("no responsive records") || body.contains("no records") {
        (Intent::NoRecordsFound, 0.85)
    } else if body.contains("granted") || body.contains("approved") {
        (Intent::FullApproval, 0.9)
    } else if body.contains("partial") {
        (Intent::PartialApproval, 0.85)
    } else if body.contains("clarif") {
        (Intent::Clarification, 0.85)
    } else if body.contains("acknowledg") || body.contains("received your request") {
        (Intent::Acknowledgment, 0.8)
    } else {
        (Intent::Other, 0.4)
    }
}

/// Extracts the first `$<amount>` token from message text, for fee-notice
/// classification. Commas are tolerated; anything that doesn't parse as a
/// decimal after stripping them is skipped rather than guessed at.
fn extract_fee_amount(body: &str) -> Option<BigDecimal> {
    let dollar_pos = body.find('$')?;
    let rest = &body[dollar_pos + 1..];
    let digits: String = rest
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    if digits.is_empty() {
        return None;
    }
    digits.parse::<BigDecimal>().ok()
}

/// Deterministic draft generator: produces a fixed-shape draft naming the
/// requested action type, with no external call.
#[derive(Debug, Default)]
pub struct StubDraftPort;

impl DraftPort for StubDraftPort {
    fn draft(&self, request: &DraftRequest) -> Result<Draft, AiCollaboratorError> {
        let subject = format!("{:?}", request.action_type);
        Ok(Draft {
            subject: subject.clone(),
            body_text: format!("Stub draft body for {subject} on case {}.", request.case.id),
            body_html: format!("<p>Stub draft body for {subject} on case {}.</p>", request.case.id),
        })
    }
}

/// Deterministic email transport: accepts every send and issues a
/// sequential provider message id.
#[derive(Debug, Default)]
pub struct StubEmailTransportPort {
    counter: AtomicU64,
}

impl EmailTransportPort for StubEmailTransportPort {
    fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, TransportError> {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(SendReceipt {
            provider_message_id: format!("stub-email-{seq}-{}", email.idempotency_key),
        })
    }
}

/// Deterministic portal worker: accepts every submission and issues a
/// sequential confirmation number.
#[derive(Debug, Default)]
pub struct StubPortalWorkerPort {
    counter: AtomicU64,
}

impl PortalWorkerPort for StubPortalWorkerPort {
    fn submit(&self, submission: &PortalSubmission) -> Result<PortalResult, TransportError> {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        Ok(PortalResult {
            status: PortalTaskStatus::Success,
            confirmation_number: Some(format!(
                "stub-portal-{seq}-{}",
                submission.idempotency_key
            )),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use caseflow_core::AutopilotMode;
    use caseflow_core::Case;
    use caseflow_core::CaseId;
    use caseflow_core::CaseStatus;
    use caseflow_core::Message;
    use caseflow_core::MessageDirection;
    use caseflow_core::MessageId;
    use caseflow_core::ThreadId;
    use caseflow_core::Timestamp;

    fn sample_case() -> Case {
        Case {
            id: CaseId::new("case-1"),
            status: CaseStatus::AwaitingResponse,
            substatus: None,
            autopilot_mode: AutopilotMode::Supervised,
            requires_human: false,
            pause_reason: None,
            agency_email: Some("agency@example.gov".to_string()),
            portal_url: None,
            deadline_date: None,
            fee_quote: None,
            scope_items: Vec::new(),
            constraints: std::collections::BTreeSet::new(),
            send_date: Some(Timestamp::Logical(1)),
            last_portal_status: None,
            closed_at: None,
            outcome_type: None,
            outcome_summary: None,
        }
    }

    fn sample_message(body: &str) -> Message {
        Message {
            id: MessageId::new("msg-1"),
            case_id: Some(CaseId::new("case-1")),
            thread_id: Some(ThreadId::new("thread-1")),
            direction: MessageDirection::Inbound,
            from: "agency@example.gov".to_string(),
            to: "requester@example.com".to_string(),
            subject: Some("Re: records request".to_string()),
            body_text: Some(body.to_string()),
            body_html: None,
            provider_message_id: None,
            received_at: Some(Timestamp::Logical(1)),
            sent_at: None,
            processed_at: None,
            processed_run_id: None,
            message_type: "email".to_string(),
            attachments: Vec::new(),
        }
    }

    #[test]
    fn classifies_fee_notice() {
        let classifier = StubClassifierPort;
        let request = ClassifyRequest {
            case: sample_case(),
            message: sample_message("There is a $25.00 fee for this request."),
            thread: Vec::new(),
            attachments: Vec::new(),
        };
        let analysis = classifier.classify(&request).expect("classifies");
        assert_eq!(analysis.intent, Intent::FeeNotice);
    }

    #[test]
    fn classifies_fee_notice_extracts_amount() {
        let classifier = StubClassifierPort;
        let request = ClassifyRequest {
            case: sample_case(),
            message: sample_message("Your records will cost $15.00, payable in advance."),
            thread: Vec::new(),
            attachments: Vec::new(),
        };
        let analysis = classifier.classify(&request).expect("classifies");
        let amount = analysis.extracted_fee_amount.expect("amount extracted");
        assert_eq!(amount, "15.00".parse::<bigdecimal::BigDecimal>().expect("parses"));
    }

    #[test]
    fn falls_back_to_other_intent() {
        let classifier = StubClassifierPort;
        let request = ClassifyRequest {
            case: sample_case(),
            message: sample_message("Please see the attached unrelated document."),
            thread: Vec::new(),
            attachments: Vec::new(),
        };
        let analysis = classifier.classify(&request).expect("classifies");
        assert_eq!(analysis.intent, Intent::Other);
    }

    #[test]
    fn email_transport_echoes_idempotency_key() {
        let transport = StubEmailTransportPort::default();
        let email = OutboundEmail {
            to: "agency@example.gov".to_string(),
            from: "requester@example.com".to_string(),
            subject: "Follow-up".to_string(),
            text: "text".to_string(),
            html: String::new(),
            headers: std::collections::BTreeMap::new(),
            attachments: Vec::new(),
            idempotency_key: "exec-123".to_string(),
        };
        let receipt = transport.send(&email).expect("sends");
        assert!(receipt.provider_message_id.contains("exec-123"));
    }
}
