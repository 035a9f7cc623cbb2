// crates/caseflow-broker/src/source/mod.rs
// ============================================================================
// Module: Inbound Message Sources
// Description: The `InboundSource` trait and its concrete implementations.
// Purpose: Produce raw inbound messages for the orchestration engine's
//          `InboundPipeline` to attach, dedupe, and classify.
// Dependencies: caseflow-core, thiserror
// ============================================================================

//! ## Overview
//! A source never attaches a message to a case or writes to the store; it
//! only resolves bytes at the transport boundary into [`RawInboundMessage`]
//! values. Attachment, dedupe, and classification happen downstream in the
//! engine's `InboundPipeline`.
//! Invariants:
//! - `poll` never blocks indefinitely; callers are expected to run it from
//!   a bounded retry loop.
//! - A raw message's `provider_message_id` is the caller's key for dedupe
//!   when the transport can reuse ids across polls (email folders, portal
//!   replays).

use caseflow_core::Attachment;
use thiserror::Error;

pub mod email;
pub mod inline;
pub mod portal;

pub use email::EmailPollSource;
pub use inline::InlineSource;
pub use portal::PortalWebhookSource;

/// Errors emitted while resolving an inbound source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The remote transport could not be reached or returned a transient
    /// failure; callers should retry with backoff.
    #[error("source transport failed: {0}")]
    Transient(String),
    /// The payload could not be decoded into a raw inbound message.
    #[error("source payload rejected: {0}")]
    Invalid(String),
}

/// A message as it arrives at the transport boundary, before case
/// attachment.
///
/// # Invariants
/// - `message_type` matches the transport the message arrived over
///   (`email`, `portal`, `inline`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawInboundMessage {
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line, when present.
    pub subject: Option<String>,
    /// Plain-text body.
    pub body_text: Option<String>,
    /// HTML body.
    pub body_html: Option<String>,
    /// Identifier assigned by the transport, used for dedupe and
    /// in-reply-to thread matching.
    pub provider_message_id: Option<String>,
    /// Transport this message arrived over.
    pub message_type: String,
    /// Attachments carried by the message.
    pub attachments: Vec<Attachment>,
}

/// Resolves new inbound messages from one transport.
pub trait InboundSource: Send + Sync {
    /// Returns every message available since the last successful poll.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Transient`] when the transport cannot be
    /// reached and the caller should retry, or [`SourceError::Invalid`]
    /// when a payload cannot be parsed.
    fn poll(&self) -> Result<Vec<RawInboundMessage>, SourceError>;
}
