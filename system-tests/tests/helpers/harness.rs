// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Scenario Harness
// Description: Builds an in-memory `EngineContext` plus a synchronous
//              dispatcher stand-in the scenario suites drive directly.
// Purpose: `InProcessDispatcher` hands work to background queue worker
//          threads, which makes an end-to-end assertion a poll loop. Every
//          engine operation is already a plain synchronous function over
//          `DispatcherPort`, so a dispatcher that runs its task inline on
//          the caller's thread gives the exact same state transitions
//          without the flakiness of waiting on another thread.
// Dependencies: caseflow-core, caseflow-config, caseflow-providers,
//               caseflow-service, caseflow-store-sqlite
// ============================================================================

//! ## Overview
//! [`build_harness`] mirrors `caseflow-service`'s own
//! `engine::test_support::build_test_context` (an in-memory SQLite store,
//! the example config, and stub collaborators), which is private to that
//! crate and so cannot be reused directly from here. [`SyncDispatcher`]
//! mirrors `caseflow-service::lib`'s private `run_task` match on
//! `task_type`, except it runs the matched engine call inline inside
//! `trigger()` rather than handing it to a queue worker thread.

use std::collections::HashMap;
use std::sync::Mutex;

use caseflow_broker::ChannelSink;
use caseflow_config::CaseflowConfig;
use caseflow_core::AgentRun;
use caseflow_core::CaseId;
use caseflow_core::CaseflowError;
use caseflow_core::CaseLockPort;
use caseflow_core::DispatchError;
use caseflow_core::DispatcherPort;
use caseflow_core::MessageId;
use caseflow_core::ProposalId;
use caseflow_core::RunId;
use caseflow_core::RunStatus;
use caseflow_core::RunTrigger;
use caseflow_core::Store;
use caseflow_core::TriggerHandle;
use caseflow_core::TriggerOptions;
use caseflow_core::WaitpointPort;
use caseflow_providers::CollaboratorSet;
use caseflow_service::engine;
use caseflow_service::engine::clock::generate_token;
use caseflow_service::engine::clock::now_millis;
use caseflow_service::engine::EngineContext;
use caseflow_store_sqlite::SqliteStore;

/// An `EngineContext` plus the dispatcher the scenario drives it through.
pub struct Harness {
    /// Shared engine dependencies (store, locks, waitpoints, collaborators,
    /// notifier, config), over an in-memory store and stub collaborators.
    pub ctx: EngineContext,
    /// Synchronous stand-in for `InProcessDispatcher`.
    pub dispatcher: SyncDispatcher,
}

/// Builds an in-memory [`Harness`] with the example config's stub
/// collaborators (deterministic classifier, draft, email, and portal
/// adapters; no network).
#[must_use]
pub fn build_harness() -> Harness {
    let config =
        CaseflowConfig::load_from_str(&caseflow_config::config_toml_example()).expect("example config loads");
    let collaborators = CollaboratorSet::from_config(&config.providers).expect("stub collaborators build");
    build_harness_with(collaborators)
}

/// Builds an in-memory [`Harness`] like [`build_harness`], but with a
/// caller-supplied [`CollaboratorSet`] — for scenarios that need a
/// collaborator the stub set doesn't model (a classifier that detects a
/// strong denial signal, a transport that fails).
#[must_use]
pub fn build_harness_with(collaborators: CollaboratorSet) -> Harness {
    let sqlite = std::sync::Arc::new(SqliteStore::open_in_memory().expect("in-memory store opens"));
    let store: std::sync::Arc<dyn Store + Send + Sync> = sqlite.clone();
    let locks: std::sync::Arc<dyn CaseLockPort + Send + Sync> = sqlite.clone();
    let waitpoints: std::sync::Arc<dyn WaitpointPort + Send + Sync> = sqlite;
    let config =
        CaseflowConfig::load_from_str(&caseflow_config::config_toml_example()).expect("example config loads");
    let ctx = EngineContext {
        store: store.clone(),
        locks,
        waitpoints,
        collaborators: std::sync::Arc::new(collaborators),
        notifier: std::sync::Arc::new(ChannelSink::new(16)),
        config: std::sync::Arc::new(config),
    };
    let dispatcher = SyncDispatcher::new(store);
    dispatcher.bind(ctx.clone());
    Harness { ctx, dispatcher }
}

/// A [`DispatcherPort`] that runs its task inline inside `trigger()` instead
/// of handing it to a queue worker thread, so a scenario can assert on the
/// resulting state the instant the call that triggered it returns.
///
/// Idempotency is honored the same way `InProcessDispatcher` honors it
/// (a repeat `idempotency_key` dedups to the original handle); debounce is
/// not implemented, since nothing under test relies on it.
pub struct SyncDispatcher {
    store: std::sync::Arc<dyn Store + Send + Sync>,
    idempotency: Mutex<HashMap<String, TriggerHandle>>,
    ctx: Mutex<Option<EngineContext>>,
}

impl SyncDispatcher {
    fn new(store: std::sync::Arc<dyn Store + Send + Sync>) -> Self {
        Self { store, idempotency: Mutex::new(HashMap::new()), ctx: Mutex::new(None) }
    }

    /// Binds the engine context this dispatcher runs tasks against. Called
    /// once by [`build_harness`] right after construction, mirroring
    /// `caseflow-service::build_dispatcher`'s `OnceLock` self-reference for
    /// the same reason: the dispatcher must be able to hand a task a
    /// `&dyn DispatcherPort` that routes back through itself.
    fn bind(&self, ctx: EngineContext) {
        *self.ctx.lock().expect("dispatcher ctx mutex poisoned") = Some(ctx);
    }

    fn with_ctx<R>(&self, f: impl FnOnce(&EngineContext) -> R) -> R {
        let guard = self.ctx.lock().expect("dispatcher ctx mutex poisoned");
        let ctx = guard.as_ref().expect("harness binds the dispatcher's context before first use");
        f(ctx)
    }

    fn run_task(&self, task_type: &str, payload: serde_json::Value, run_id: &RunId) {
        self.with_ctx(|ctx| match task_type {
            "process_inbound" => {
                let Some(message_id) = payload.get("message_id").and_then(serde_json::Value::as_str) else {
                    complete_run(ctx, run_id, Some("invalid process_inbound payload".to_string()));
                    return;
                };
                let force_new_run = payload.get("force_new_run").and_then(serde_json::Value::as_bool).unwrap_or(false);
                let _ = engine::process_inbound(ctx, self, &MessageId::new(message_id), run_id, force_new_run);
            }
            "resume_decision" => {
                let Some(proposal_id) = payload.get("proposal_id").and_then(serde_json::Value::as_str) else {
                    complete_run(ctx, run_id, Some("invalid resume_decision payload".to_string()));
                    return;
                };
                let _ = engine::resume_decision(ctx, self, &ProposalId::new(proposal_id), run_id);
            }
            "execute_proposal" => {
                let result = run_execute_proposal(ctx, self, &payload);
                match result {
                    Ok(()) => complete_run(ctx, run_id, None),
                    Err(err) => complete_run(ctx, run_id, Some(err.to_string())),
                }
            }
            "submit_portal_task" => {
                let result = run_submit_portal_task(ctx, &payload);
                match result {
                    Ok(()) => complete_run(ctx, run_id, None),
                    Err(err) => complete_run(ctx, run_id, Some(err.to_string())),
                }
            }
            other => complete_run(ctx, run_id, Some(format!("unknown task type {other}"))),
        });
    }
}

impl DispatcherPort for SyncDispatcher {
    fn trigger(
        &self,
        task_type: &str,
        payload: serde_json::Value,
        opts: TriggerOptions,
    ) -> Result<TriggerHandle, DispatchError> {
        {
            let idempotency = self.idempotency.lock().expect("dispatcher idempotency mutex poisoned");
            if let Some(handle) = idempotency.get(&opts.idempotency_key) {
                let mut deduplicated = handle.clone();
                deduplicated.deduplicated = true;
                return Ok(deduplicated);
            }
        }

        let run_id = RunId::new(generate_token("run"));
        let run = AgentRun {
            id: run_id.clone(),
            case_id: CaseId::new(opts.queue.trim_start_matches("case:").to_string()),
            trigger_type: RunTrigger::InboundMessage,
            status: RunStatus::Queued,
            started_at: None,
            ended_at: None,
            error: None,
            continuation_token: None,
            message_id: None,
            proposal_id: None,
            metadata: caseflow_core::MetadataMap::new(),
        };
        self.store.insert_run(&run).map_err(|err| DispatchError::Transient(err.to_string()))?;

        let handle = TriggerHandle { task_handle_id: generate_token("task"), run_id: run_id.clone(), deduplicated: false };
        self.idempotency
            .lock()
            .expect("dispatcher idempotency mutex poisoned")
            .insert(opts.idempotency_key.clone(), handle.clone());

        let mut running = run;
        running.status = RunStatus::Running;
        running.started_at = Some(now_millis());
        let _ = self.store.put_run(&running);

        self.run_task(task_type, payload, &run_id);
        Ok(handle)
    }

    fn cancel(&self, run_id: &RunId, reason: &str) -> Result<(), DispatchError> {
        let mut run = self.store.get_run(run_id).map_err(|err| DispatchError::Transient(err.to_string()))?;
        run.status = RunStatus::Cancelled;
        run.ended_at = Some(now_millis());
        run.error = Some(reason.to_string());
        self.store.put_run(&run).map_err(|err| DispatchError::Transient(err.to_string()))
    }
}

fn run_execute_proposal(
    ctx: &EngineContext,
    dispatcher: &dyn DispatcherPort,
    payload: &serde_json::Value,
) -> Result<(), CaseflowError> {
    let proposal_id = payload
        .get("proposal_id")
        .and_then(serde_json::Value::as_str)
        .map(ProposalId::new)
        .ok_or_else(|| CaseflowError::Validation("execute_proposal payload missing proposal_id".to_string()))?;
    let proposal = ctx.store.get_proposal(&proposal_id).map_err(|err| CaseflowError::Transient(err.to_string()))?;
    let execution_key = proposal
        .execution_key
        .clone()
        .ok_or_else(|| CaseflowError::Validation(format!("proposal {proposal_id} has no execution_key")))?;
    engine::execute(ctx, dispatcher, &proposal_id, &execution_key)
}

fn run_submit_portal_task(ctx: &EngineContext, payload: &serde_json::Value) -> Result<(), CaseflowError> {
    let proposal_id = payload
        .get("proposal_id")
        .and_then(serde_json::Value::as_str)
        .map(ProposalId::new)
        .ok_or_else(|| CaseflowError::Validation("submit_portal_task payload missing proposal_id".to_string()))?;
    let execution_id = payload
        .get("execution_id")
        .and_then(serde_json::Value::as_str)
        .map(caseflow_core::ExecutionId::new)
        .ok_or_else(|| CaseflowError::Validation("submit_portal_task payload missing execution_id".to_string()))?;
    let portal_url = payload
        .get("portal_url")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CaseflowError::Validation("submit_portal_task payload missing portal_url".to_string()))?;
    let portal_task_id = payload
        .get("portal_task_id")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| CaseflowError::Validation("submit_portal_task payload missing portal_task_id".to_string()))?;
    let execution_key = payload
        .get("execution_key")
        .and_then(serde_json::Value::as_str)
        .map(caseflow_core::ExecutionKey::new)
        .ok_or_else(|| CaseflowError::Validation("submit_portal_task payload missing execution_key".to_string()))?;
    engine::run_portal_submission(ctx, &proposal_id, &execution_id, &portal_url, &portal_task_id, &execution_key)
}

/// Mirrors `caseflow-service::engine::pipeline::complete_run`, which is
/// `pub(crate)` and so not reachable from here.
fn complete_run(ctx: &EngineContext, run_id: &RunId, error: Option<String>) {
    let Ok(mut run) = ctx.store.get_run(run_id) else {
        return;
    };
    if run.status == RunStatus::Waiting {
        return;
    }
    run.status = if error.is_some() { RunStatus::Failed } else { RunStatus::Completed };
    run.ended_at = Some(now_millis());
    run.error = error;
    let _ = ctx.store.put_run(&run);
}
