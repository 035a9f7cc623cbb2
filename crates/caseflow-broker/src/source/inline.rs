// crates/caseflow-broker/src/source/inline.rs
// ============================================================================
// Module: Inline Inbound Source
// Description: An in-process queue of raw inbound messages for tests and
//              local runs that have no live email or portal transport.
// Purpose: Let operators and system tests inject inbound messages directly.
// Dependencies: std::sync
// ============================================================================

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::source::InboundSource;
use crate::source::RawInboundMessage;
use crate::source::SourceError;

/// Inbound source backed by an in-process FIFO queue.
///
/// # Invariants
/// - `poll` drains the queue and never blocks.
#[derive(Debug, Default)]
pub struct InlineSource {
    queue: Mutex<VecDeque<RawInboundMessage>>,
}

impl InlineSource {
    /// Creates an empty inline source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a message to be returned by the next `poll`.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned by a prior panic.
    pub fn push(&self, message: RawInboundMessage) {
        self.queue
            .lock()
            .expect("inline source queue mutex poisoned")
            .push_back(message);
    }
}

impl InboundSource for InlineSource {
    fn poll(&self) -> Result<Vec<RawInboundMessage>, SourceError> {
        let mut queue = self.queue.lock().expect("inline source queue mutex poisoned");
        Ok(queue.drain(..).collect())
    }
}
