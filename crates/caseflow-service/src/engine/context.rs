// crates/caseflow-service/src/engine/context.rs
// ============================================================================
// Module: Engine Context
// Description: The bundle of durable store, lock, waitpoint, collaborator,
//              and notification dependencies every engine operation closes
//              over.
// Purpose: Give the pipeline/planner/decisioner/executor/reaper one shared,
//          cheaply-cloneable handle instead of threading five Arcs through
//          every function signature separately.
// Dependencies: caseflow-core, caseflow-config, caseflow-providers
// ============================================================================

use std::sync::Arc;

use caseflow_config::CaseflowConfig;
use caseflow_core::CaseLockPort;
use caseflow_core::NotificationPort;
use caseflow_core::Store;
use caseflow_core::WaitpointPort;
use caseflow_providers::CollaboratorSet;

/// Everything an engine operation needs to act on one case, minus the
/// dispatcher (which owns its own lifecycle and hands the context to the
/// task runner it drives).
///
/// # Invariants
/// - Cloning is cheap: every field is an `Arc`.
pub struct EngineContext {
    /// Durable storage for cases, messages, proposals, runs, executions, and
    /// the activity log.
    pub store: Arc<dyn Store + Send + Sync>,
    /// Per-case advisory locking.
    pub locks: Arc<dyn CaseLockPort + Send + Sync>,
    /// Durable human-decision suspension points.
    pub waitpoints: Arc<dyn WaitpointPort + Send + Sync>,
    /// The four external collaborator ports.
    pub collaborators: Arc<CollaboratorSet>,
    /// Best-effort event fanout.
    pub notifier: Arc<dyn NotificationPort + Send + Sync>,
    /// Resolved deployment configuration.
    pub config: Arc<CaseflowConfig>,
}

impl Clone for EngineContext {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            locks: Arc::clone(&self.locks),
            waitpoints: Arc::clone(&self.waitpoints),
            collaborators: Arc::clone(&self.collaborators),
            notifier: Arc::clone(&self.notifier),
            config: Arc::clone(&self.config),
        }
    }
}
