// crates/caseflow-broker/src/source/email.rs
// ============================================================================
// Module: Email Poll Source
// Description: Polls an HTTP-fronted mailbox for new inbound email.
// Purpose: Give the engine a transport-agnostic view of an inbox without
//          embedding MIME parsing or IMAP protocol handling in this crate.
// Dependencies: caseflow-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! The mailbox endpoint is expected to have already parsed MIME into plain
//! text/HTML bodies and attachment metadata; this adapter only decodes the
//! JSON envelope and maps it to [`RawInboundMessage`]. Non-goal per scope:
//! no MIME parsing happens in this crate.

use std::time::Duration;

use caseflow_core::Attachment;
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::source::InboundSource;
use crate::source::RawInboundMessage;
use crate::source::SourceError;

/// Configuration for [`EmailPollSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailPollSourceConfig {
    /// Base URL of the mailbox poll endpoint, e.g. `http://localhost:9201`.
    pub base_url: String,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Wire representation returned by the mailbox endpoint's `/inbox/poll`.
#[derive(Debug, Deserialize)]
struct WireMessage {
    from: String,
    to: String,
    subject: Option<String>,
    body_text: Option<String>,
    body_html: Option<String>,
    provider_message_id: Option<String>,
    #[serde(default)]
    attachments: Vec<WireAttachment>,
}

#[derive(Debug, Deserialize)]
struct WireAttachment {
    filename: String,
    content_type: String,
    uri: String,
    size_bytes: u64,
}

impl From<WireAttachment> for Attachment {
    fn from(value: WireAttachment) -> Self {
        Self {
            filename: value.filename,
            content_type: value.content_type,
            uri: value.uri,
            size_bytes: value.size_bytes,
        }
    }
}

impl From<WireMessage> for RawInboundMessage {
    fn from(value: WireMessage) -> Self {
        Self {
            from: value.from,
            to: value.to,
            subject: value.subject,
            body_text: value.body_text,
            body_html: value.body_html,
            provider_message_id: value.provider_message_id,
            message_type: "email".to_string(),
            attachments: value.attachments.into_iter().map(Into::into).collect(),
        }
    }
}

/// Polls a mailbox over HTTP for new inbound email.
pub struct EmailPollSource {
    config: EmailPollSourceConfig,
    client: Client,
}

impl EmailPollSource {
    /// Creates a new email poll source.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Transient`] when the HTTP client cannot be
    /// built.
    pub fn new(config: EmailPollSourceConfig) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .user_agent("caseflow-broker/0.1")
            .build()
            .map_err(|err| SourceError::Transient(format!("mail client build failed: {err}")))?;
        Ok(Self { config, client })
    }
}

impl InboundSource for EmailPollSource {
    fn poll(&self) -> Result<Vec<RawInboundMessage>, SourceError> {
        let url = format!("{}/inbox/poll", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|err| SourceError::Transient(format!("polling {url} failed: {err}")))?;
        if !response.status().is_success() {
            return Err(SourceError::Transient(format!(
                "{url} returned {}",
                response.status()
            )));
        }
        let messages: Vec<WireMessage> = response
            .json()
            .map_err(|err| SourceError::Invalid(format!("decoding {url} response: {err}")))?;
        Ok(messages.into_iter().map(Into::into).collect())
    }
}
