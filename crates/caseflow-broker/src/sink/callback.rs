// crates/caseflow-broker/src/sink/callback.rs
// ============================================================================
// Module: Callback Sink
// Description: Posts notifications to an operator-configured webhook URL.
// Purpose: Let deployments wire notifications to Slack, PagerDuty, or any
//          other webhook-based channel without this crate knowing which.
// Dependencies: caseflow-core, reqwest
// ============================================================================

//! ## Overview
//! [`CallbackSink`] fires a best-effort HTTP POST per notification. Per the
//! `NotificationPort` contract, delivery failures are swallowed; callers
//! never retry and never learn whether the webhook succeeded.

use std::time::Duration;

use caseflow_core::CaseId;
use caseflow_core::NotificationKind;
use caseflow_core::NotificationPort;
use reqwest::blocking::Client;
use serde::Serialize;

/// JSON body posted to the configured webhook URL.
#[derive(Debug, Serialize)]
struct CallbackBody<'a> {
    kind: &'a str,
    message: &'a str,
    case_id: Option<&'a str>,
}

/// Posts notifications to a webhook URL.
pub struct CallbackSink {
    webhook_url: String,
    client: Client,
}

impl CallbackSink {
    /// Creates a callback sink posting to `webhook_url`.
    ///
    /// # Errors
    ///
    /// Returns a descriptive error string when the HTTP client cannot be
    /// built.
    pub fn new(webhook_url: impl Into<String>, timeout_ms: u64) -> Result<Self, String> {
        let client = Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent("caseflow-broker/0.1")
            .build()
            .map_err(|err| format!("callback sink client build failed: {err}"))?;
        Ok(Self {
            webhook_url: webhook_url.into(),
            client,
        })
    }
}

impl NotificationPort for CallbackSink {
    fn notify(&self, kind: NotificationKind, message: &str, case_id: Option<&CaseId>) {
        let kind_str = match kind {
            NotificationKind::RequiresHuman => "requires_human",
            NotificationKind::ProposalExecuted => "proposal_executed",
            NotificationKind::CaseClosed => "case_closed",
            NotificationKind::ErrorRecorded => "error_recorded",
        };
        let body = CallbackBody {
            kind: kind_str,
            message,
            case_id: case_id.map(CaseId::as_str),
        };
        let _ = self.client.post(&self.webhook_url).json(&body).send();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_malformed_webhook_url_construction_gracefully() {
        let sink = CallbackSink::new("not a url", 100).expect("client still builds");
        sink.notify(NotificationKind::RequiresHuman, "hi", None);
    }
}
