// crates/caseflow-broker/src/sink/mod.rs
// ============================================================================
// Module: Notification Sinks
// Description: Concrete `NotificationPort` implementations: durable log,
//              in-process broadcast channel, and webhook callback.
// Purpose: Give operators and UIs a way to observe engine events without
//          the engine depending on any one fanout mechanism.
// Dependencies: caseflow-core, thiserror, tokio
// ============================================================================

//! ## Overview
//! Every sink implements [`caseflow_core::NotificationPort`], whose
//! contract is fire-and-forget: a send failure is swallowed, never
//! propagated to the caller. [`SinkError`] exists for sinks' own internal
//! bookkeeping and tests, not for the trait's public surface.

use thiserror::Error;

pub mod callback;
pub mod channel;
pub mod log;

pub use callback::CallbackSink;
pub use channel::ChannelSink;
pub use log::LogSink;

/// Errors a sink may observe internally before swallowing them at the
/// `NotificationPort` boundary.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink's delivery mechanism failed.
    #[error("sink delivery failed: {0}")]
    DeliveryFailed(String),
}
