// crates/caseflow-broker/src/sink/log.rs
// ============================================================================
// Module: Log Sink
// Description: Records notifications into a case's durable activity log.
// Purpose: Give every notification a queryable, persisted trail without
//          adopting a generic logging crate.
// Dependencies: caseflow-core
// ============================================================================

//! ## Overview
//! [`LogSink`] is the default [`NotificationPort`] in every deployment: it
//! writes each notification as an [`caseflow_core::ActivityLogEntry`]
//! through [`caseflow_core::Store::append_activity_log`]. Notifications
//! with no associated case (a process-wide error, say) are dropped, since
//! the activity log is keyed by case.

use std::sync::Arc;

use caseflow_core::CaseId;
use caseflow_core::MetadataMap;
use caseflow_core::NotificationKind;
use caseflow_core::NotificationPort;
use caseflow_core::Store;
use caseflow_core::Timestamp;

/// Writes notifications into the case activity log.
pub struct LogSink {
    store: Arc<dyn Store + Send + Sync>,
    clock: Arc<dyn Fn() -> Timestamp + Send + Sync>,
}

impl LogSink {
    /// Creates a new log sink over `store`, stamping entries with `clock`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store + Send + Sync>,
        clock: Arc<dyn Fn() -> Timestamp + Send + Sync>,
    ) -> Self {
        Self { store, clock }
    }
}

impl NotificationPort for LogSink {
    fn notify(&self, kind: NotificationKind, message: &str, case_id: Option<&CaseId>) {
        let Some(case_id) = case_id else {
            return;
        };
        let event_type = match kind {
            NotificationKind::RequiresHuman => "notification.requires_human",
            NotificationKind::ProposalExecuted => "notification.proposal_executed",
            NotificationKind::CaseClosed => "notification.case_closed",
            NotificationKind::ErrorRecorded => "notification.error_recorded",
        };
        let _ = self.store.append_activity_log(
            case_id,
            event_type,
            message,
            MetadataMap::new(),
            (self.clock)(),
        );
    }
}
