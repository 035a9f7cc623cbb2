// crates/caseflow-service/src/engine/test_support.rs
// ============================================================================
// Module: Engine Test Support
// Description: Builds an `EngineContext` over an in-memory store and stub
//              collaborators, shared by every engine submodule's unit tests.
// Purpose: Avoid re-deriving the same stub wiring in each test module.
// Dependencies: caseflow-store-sqlite, caseflow-providers, caseflow-broker,
//               caseflow-config
// ============================================================================

#![cfg(test)]

use std::sync::Arc;

use caseflow_broker::ChannelSink;
use caseflow_config::CaseflowConfig;
use caseflow_core::CaseLockPort;
use caseflow_core::Store;
use caseflow_core::WaitpointPort;
use caseflow_providers::CollaboratorSet;
use caseflow_store_sqlite::SqliteStore;

use crate::engine::context::EngineContext;

/// Builds an `EngineContext` backed by a fresh in-memory SQLite store (which
/// doubles as the `CaseLockPort` and `WaitpointPort` implementation) and the
/// deterministic stub collaborators, per the example config.
#[must_use]
pub fn build_test_context() -> EngineContext {
    let sqlite = Arc::new(SqliteStore::open_in_memory().expect("in-memory store opens"));
    let store: Arc<dyn Store + Send + Sync> = sqlite.clone();
    let locks: Arc<dyn CaseLockPort + Send + Sync> = sqlite.clone();
    let waitpoints: Arc<dyn WaitpointPort + Send + Sync> = sqlite;
    let config = CaseflowConfig::load_from_str(&caseflow_config::config_toml_example())
        .expect("example config loads");
    let collaborators =
        CollaboratorSet::from_config(&config.providers).expect("stub collaborators build");
    EngineContext {
        store,
        locks,
        waitpoints,
        collaborators: Arc::new(collaborators),
        notifier: Arc::new(ChannelSink::new(16)),
        config: Arc::new(config),
    }
}
