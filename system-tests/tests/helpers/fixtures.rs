// system-tests/tests/helpers/fixtures.rs
// ============================================================================
// Module: Scenario Fixtures
// Description: Minimal Case/Message builders for the end-to-end suites.
// Purpose: Every scenario starts from a freshly seeded case and an inbound
//          message; this is the one place that shape is defined, so a
//          change to a required field only needs fixing here.
// Dependencies: caseflow-core
// ============================================================================

use std::collections::BTreeSet;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use caseflow_core::AiCollaboratorError;
use caseflow_core::Analysis;
use caseflow_core::AutopilotMode;
use caseflow_core::Case;
use caseflow_core::CaseId;
use caseflow_core::CaseStatus;
use caseflow_core::ClassifierPort;
use caseflow_core::ClassifyRequest;
use caseflow_core::DetectedConstraint;
use caseflow_core::Intent;
use caseflow_core::Message;
use caseflow_core::MessageDirection;
use caseflow_core::MessageId;
use caseflow_core::Sentiment;
use caseflow_core::Timestamp;
use caseflow_providers::CollaboratorSet;
use caseflow_service::engine::EngineContext;

static SEQ: AtomicU64 = AtomicU64::new(0);

/// Returns a fresh, process-unique suffix, so concurrently seeded fixtures
/// within the same test never collide on id.
pub fn next_seq() -> u64 {
    SEQ.fetch_add(1, Ordering::Relaxed)
}

/// Seeds and returns a case in `AwaitingResponse` with no outstanding
/// portal submission, the shape every fee/denial/clarification scenario
/// starts from.
pub fn seed_case(ctx: &EngineContext, case_id: &CaseId, mode: AutopilotMode) -> Case {
    let case = Case {
        id: case_id.clone(),
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

/// Inserts an inbound message with `body` attached to `case_id`.
pub fn seed_inbound_message(ctx: &EngineContext, case_id: &CaseId, body: &str) -> MessageId {
    let message_id = MessageId::new(format!("msg-{}", next_seq()));
    let message = Message {
        id: message_id.clone(),
        case_id: Some(case_id.clone()),
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
    message_id
}

/// Builds the `TriggerOptions` a real caller (the `trigger-inbound` HTTP
/// endpoint, the decisioner's own follow-ups) would pass for `case_id`,
/// with a freshly generated idempotency key so repeated calls in one test
/// never accidentally dedup against each other.
pub fn trigger_opts(case_id: &CaseId) -> caseflow_core::TriggerOptions {
    caseflow_core::TriggerOptions {
        queue: format!("case:{case_id}"),
        idempotency_key: format!("trigger-{}", next_seq()),
        idempotency_key_ttl_millis: 3_600_000,
        debounce: None,
    }
}

/// A classifier that reads a cited exemption out of the message body.
///
/// The stub classifier shipped for local runs (`caseflow-providers::stub`)
/// only does coarse keyword-to-intent mapping: sentiment is always
/// `Neutral` and `constraints_detected` is always empty, so a denial never
/// reads as a "strong signal" under `planner::plan`'s rule 3. A real
/// classifier extracts the cited exemption as a constraint; this one does
/// the same, just by a fixed phrase match instead of an external call.
#[derive(Debug, Default)]
pub struct ExemptionDenialClassifier;

impl ClassifierPort for ExemptionDenialClassifier {
    fn classify(&self, request: &ClassifyRequest) -> Result<Analysis, AiCollaboratorError> {
        let body = request.message.body_text.as_deref().unwrap_or_default().to_lowercase();
        let is_denial = body.contains("denied") || body.contains("denial");
        let exemption = extract_exemption(&body);
        let constraints_detected = match &exemption {
            Some(tag) => vec![DetectedConstraint { tag: tag.clone(), excerpt: Some(body.clone()) }],
            None => Vec::new(),
        };
        Ok(Analysis {
            intent: if is_denial { Intent::Denial } else { Intent::Other },
            sentiment: Sentiment::Neutral,
            confidence: if is_denial { 0.9 } else { 0.4 },
            key_points: vec![format!("exemption-aware classification of message {}", request.message.id)],
            extracted_fee_amount: None,
            constraints_detected,
            extra: std::collections::BTreeMap::new(),
        })
    }
}

/// Picks out an `Exemption N(letter)` citation, case-insensitively.
fn extract_exemption(body: &str) -> Option<String> {
    let idx = body.find("exemption")?;
    let tail: String = body[idx..].chars().take(20).collect();
    Some(tail.split_whitespace().take(2).collect::<Vec<_>>().join(" "))
}

/// Builds a [`CollaboratorSet`] identical to [`crate::helpers::harness::build_harness`]'s
/// default, except the classifier is swapped for [`ExemptionDenialClassifier`].
pub fn collaborators_with_exemption_denial_classifier() -> CollaboratorSet {
    let config = caseflow_config::CaseflowConfig::load_from_str(&caseflow_config::config_toml_example())
        .expect("example config loads");
    let base = CollaboratorSet::from_config(&config.providers).expect("stub collaborators build");
    CollaboratorSet { classifier: Arc::new(ExemptionDenialClassifier), ..base }
}
