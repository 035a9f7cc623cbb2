// crates/caseflow-broker/src/sink/channel.rs
// ============================================================================
// Module: Channel Sink
// Description: Fans notifications out over a tokio broadcast channel for
//              the HTTP server's SSE endpoint to forward to connected UIs.
// Purpose: Decouple notification production from however many SSE clients
//          are currently connected.
// Dependencies: caseflow-core, tokio
// ============================================================================

//! ## Overview
//! [`ChannelSink`] never blocks and never fails: `tokio::sync::broadcast`
//! drops messages for lagging subscribers rather than backing up the
//! notifier, which matches the port's documented at-most-once contract.

use caseflow_core::CaseId;
use caseflow_core::NotificationKind;
use caseflow_core::NotificationPort;
use tokio::sync::broadcast;

/// One notification event as delivered to SSE subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationEvent {
    /// The kind of event that occurred.
    pub kind: NotificationKind,
    /// Human-readable description.
    pub message: String,
    /// The case the event concerns, when any.
    pub case_id: Option<CaseId>,
}

/// Broadcasts notifications to every subscriber of an in-process channel.
pub struct ChannelSink {
    sender: broadcast::Sender<NotificationEvent>,
}

impl ChannelSink {
    /// Creates a sink with the given broadcast channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribes to the notification stream, for the SSE handler to
    /// forward to one client.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.sender.subscribe()
    }
}

impl NotificationPort for ChannelSink {
    fn notify(&self, kind: NotificationKind, message: &str, case_id: Option<&CaseId>) {
        let _ = self.sender.send(NotificationEvent {
            kind,
            message: message.to_string(),
            case_id: case_id.cloned(),
        });
    }
}
