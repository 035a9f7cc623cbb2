// crates/caseflow-broker/src/source/portal.rs
// ============================================================================
// Module: Portal Webhook Source
// Description: Parses agency portal webhook payloads into raw inbound
//              messages; does not poll, since portals push.
// Purpose: Give the HTTP server a single parsing entry point for portal
//          callbacks so webhook shape lives in one place.
// Dependencies: caseflow-core, serde_json
// ============================================================================

//! ## Overview
//! Portals deliver updates by pushing a webhook rather than by polling, so
//! [`PortalWebhookSource`] has no `poll` loop: the HTTP server hands it a
//! received payload and gets back a [`RawInboundMessage`] to forward into
//! the engine's `InboundPipeline`, or an error if the payload is malformed.

use caseflow_core::Attachment;
use serde::Deserialize;

use crate::source::RawInboundMessage;
use crate::source::SourceError;

/// JSON body an agency portal posts when a case's status changes.
#[derive(Debug, Deserialize)]
pub struct PortalWebhookPayload {
    /// Agency-facing submission or case reference used as the from address.
    pub agency_reference: String,
    /// Requester email the portal has on file.
    pub requester_email: String,
    /// Human-readable status text (e.g. "Fee due", "Records released").
    pub status_text: String,
    /// Optional free-text note attached to the status change.
    pub note: Option<String>,
    /// Attachment metadata for any document the portal published.
    #[serde(default)]
    pub attachments: Vec<PortalWebhookAttachment>,
    /// Portal-assigned identifier for this status event, used for dedupe.
    pub event_id: String,
}

/// Attachment metadata carried on a portal webhook payload.
#[derive(Debug, Deserialize)]
pub struct PortalWebhookAttachment {
    /// Original filename.
    pub filename: String,
    /// MIME content type.
    pub content_type: String,
    /// Storage location the portal published the document at.
    pub uri: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

impl From<PortalWebhookAttachment> for Attachment {
    fn from(value: PortalWebhookAttachment) -> Self {
        Self {
            filename: value.filename,
            content_type: value.content_type,
            uri: value.uri,
            size_bytes: value.size_bytes,
        }
    }
}

/// Parses portal webhook payloads into raw inbound messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct PortalWebhookSource;

impl PortalWebhookSource {
    /// Creates a new portal webhook parser.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Parses a received webhook body into a raw inbound message.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Invalid`] when `body` is not a well-formed
    /// [`PortalWebhookPayload`].
    pub fn parse(&self, body: &[u8]) -> Result<RawInboundMessage, SourceError> {
        let payload: PortalWebhookPayload = serde_json::from_slice(body)
            .map_err(|err| SourceError::Invalid(format!("portal webhook payload: {err}")))?;
        Ok(RawInboundMessage {
            from: payload.agency_reference,
            to: payload.requester_email,
            subject: Some(payload.status_text),
            body_text: payload.note,
            body_html: None,
            provider_message_id: Some(payload.event_id),
            message_type: "portal".to_string(),
            attachments: payload.attachments.into_iter().map(Into::into).collect(),
        })
    }
}
