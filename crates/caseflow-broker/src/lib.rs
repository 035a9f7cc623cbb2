// crates/caseflow-broker/src/lib.rs
// ============================================================================
// Crate: caseflow-broker
// Description: Inbound message sources and outbound notification sinks, the
//              concrete edges where the orchestration engine meets the
//              outside world.
// Purpose: Keep ingestion transport (email polling, portal webhooks, inline
//          test injection) and notification fanout (log, SSE channel,
//          webhook callback) out of the engine's business logic.
// Dependencies: caseflow-core, reqwest, tokio, url
// ============================================================================

//! ## Overview
//! [`source`] resolves new inbound messages from wherever they arrive;
//! [`sink`] fans out best-effort notifications to wherever an operator or
//! UI is watching. Neither module touches case state directly: sources
//! hand raw messages to the engine's `InboundPipeline`, and sinks implement
//! `caseflow_core::NotificationPort`.

#![forbid(unsafe_code)]

pub mod sink;
pub mod source;

pub use sink::CallbackSink;
pub use sink::ChannelSink;
pub use sink::LogSink;
pub use sink::SinkError;
pub use source::EmailPollSource;
pub use source::InboundSource;
pub use source::InlineSource;
pub use source::PortalWebhookSource;
pub use source::RawInboundMessage;
pub use source::SourceError;
