// crates/caseflow-service/src/lib.rs
// ============================================================================
// Crate: caseflow-service
// Description: Wires the orchestration engine, dispatcher, reaper, and
//              HTTP/SSE shell into one running application.
// Purpose: The one crate that turns the port traits in caseflow-core into a
//          deployable process: opens the SQLite store, builds the
//          collaborator set, starts the dispatcher's task runner, spawns
//          the reaper loop, and serves the external HTTP interface.
// Dependencies: caseflow-core, caseflow-config, caseflow-providers,
//               caseflow-store-sqlite, caseflow-broker, axum, tokio
// ============================================================================

//! ## Overview
//! [`Application::start`] is the single entry point a binary (or an
//! integration test) calls to stand up a whole caseflow deployment in one
//! process. Everything downstream of it — [`engine`], [`server`] — only
//! ever sees the port traits from `caseflow-core`; this module is where
//! those traits get their one real implementation bolted on.

#![forbid(unsafe_code)]

pub mod engine;
pub mod server;

use std::sync::Arc;
use std::sync::OnceLock;
use std::thread;
use std::time::Duration;

use caseflow_broker::ChannelSink;
use caseflow_config::CaseflowConfig;
use caseflow_core::CaseflowError;
use caseflow_core::MessageId;
use caseflow_core::ProposalId;
use caseflow_core::RunId;
use caseflow_core::TransportError;
use caseflow_providers::CollaboratorSet;
use caseflow_store_sqlite::SqliteStore;
use caseflow_store_sqlite::SqliteStoreConfig;
use caseflow_store_sqlite::SqliteStoreError;
use caseflow_store_sqlite::SqliteSyncMode;

use crate::engine::clock::now_millis;
use crate::engine::dispatcher::TaskRunner;
use crate::engine::pipeline::complete_run;
use crate::engine::EngineContext;
use crate::engine::InProcessDispatcher;

/// Failures that can prevent an [`Application`] from starting.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// The SQLite store failed to open.
    #[error("failed to open store: {0}")]
    Store(#[from] SqliteStoreError),
    /// A collaborator adapter failed to build from its configured endpoint.
    #[error("failed to build collaborator set: {0}")]
    Collaborators(#[from] TransportError),
}

/// Opens the durable SQLite store per the deployment's store configuration.
fn open_store(config: &caseflow_config::StoreConfig) -> Result<SqliteStore, ServiceError> {
    let mut store_config = SqliteStoreConfig::new(config.path.clone());
    store_config.sync_mode = match config.sync_mode {
        caseflow_config::StoreSyncMode::Full => SqliteSyncMode::Full,
        caseflow_config::StoreSyncMode::Normal => SqliteSyncMode::Normal,
    };
    store_config.read_pool_size = config.read_pool_size as usize;
    SqliteStore::open(&store_config).map_err(ServiceError::Store)
}

/// Parses the `message_id` field a `process_inbound` task payload carries.
fn parse_message_id(payload: &serde_json::Value) -> Result<MessageId, CaseflowError> {
    payload
        .get("message_id")
        .and_then(serde_json::Value::as_str)
        .map(MessageId::new)
        .ok_or_else(|| CaseflowError::Validation("process_inbound payload missing message_id".to_string()))
}

/// Parses the optional `force_new_run` field a `process_inbound` task
/// payload carries, defaulting to `false`.
fn parse_force_new_run(payload: &serde_json::Value) -> bool {
    payload.get("force_new_run").and_then(serde_json::Value::as_bool).unwrap_or(false)
}

/// Parses the `proposal_id` field an `execute_proposal`/`resume_decision`
/// task payload carries.
fn parse_proposal_id(payload: &serde_json::Value) -> Result<ProposalId, CaseflowError> {
    payload
        .get("proposal_id")
        .and_then(serde_json::Value::as_str)
        .map(ProposalId::new)
        .ok_or_else(|| CaseflowError::Validation("payload missing proposal_id".to_string()))
}

/// Parses the fields a `submit_portal_task` payload carries
/// (`begin_portal_submission` is the one writer).
fn parse_portal_submission_payload(
    payload: &serde_json::Value,
) -> Result<(ProposalId, caseflow_core::ExecutionId, String, String, caseflow_core::ExecutionKey), CaseflowError> {
    let proposal_id = parse_proposal_id(payload)?;
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
    Ok((proposal_id, execution_id, portal_url, portal_task_id, execution_key))
}

/// Executes one dispatcher task, matching on `task_type` and routing to the
/// matching engine operation (spec §4.3).
///
/// `process_inbound` and `resume_decision` complete the run they were handed
/// themselves; `execute_proposal` does not (the Executor has no run to
/// finalize of its own), so this function completes it on their behalf.
fn run_task(
    ctx: &EngineContext,
    dispatcher: &dyn caseflow_core::DispatcherPort,
    task_type: &str,
    payload: serde_json::Value,
    run_id: &RunId,
) {
    match task_type {
        "process_inbound" => {
            let Ok(message_id) = parse_message_id(&payload) else {
                complete_run(ctx, run_id, Some("invalid process_inbound payload".to_string()));
                return;
            };
            let force_new_run = parse_force_new_run(&payload);
            // `process_inbound` owns its own run completion.
            let _ = engine::process_inbound(ctx, dispatcher, &message_id, run_id, force_new_run);
        }
        "resume_decision" => {
            let Ok(proposal_id) = parse_proposal_id(&payload) else {
                complete_run(ctx, run_id, Some("invalid resume_decision payload".to_string()));
                return;
            };
            // `resume_decision` owns its own run completion.
            let _ = engine::resume_decision(ctx, dispatcher, &proposal_id, run_id);
        }
        "execute_proposal" => {
            let result = run_execute_proposal(ctx, dispatcher, &payload);
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
        other => {
            complete_run(ctx, run_id, Some(format!("unknown task type {other}")));
        }
    }
}

fn run_execute_proposal(
    ctx: &EngineContext,
    dispatcher: &dyn caseflow_core::DispatcherPort,
    payload: &serde_json::Value,
) -> Result<(), CaseflowError> {
    let proposal_id = parse_proposal_id(payload)?;
    let proposal = ctx
        .store
        .get_proposal(&proposal_id)
        .map_err(|err| CaseflowError::Transient(err.to_string()))?;
    let execution_key = proposal
        .execution_key
        .clone()
        .ok_or_else(|| CaseflowError::Validation(format!("proposal {proposal_id} has no execution_key")))?;
    engine::execute(ctx, dispatcher, &proposal_id, &execution_key)
}

/// Task body for `task_type == "submit_portal_task"`: the Executor's
/// `begin_portal_submission` dispatches this to perform the actual blocking
/// portal worker call off of the claim that approved the proposal.
fn run_submit_portal_task(ctx: &EngineContext, payload: &serde_json::Value) -> Result<(), CaseflowError> {
    let (proposal_id, execution_id, portal_url, portal_task_id, execution_key) =
        parse_portal_submission_payload(payload)?;
    engine::run_portal_submission(ctx, &proposal_id, &execution_id, &portal_url, &portal_task_id, &execution_key)
}

/// Builds the in-process dispatcher, closing its task runner over a cell
/// that is filled with the dispatcher's own `Arc` right after construction
/// so the runner can dispatch further tasks through the very dispatcher it
/// runs inside of (`resume_decision`'s `Approve`/`RetryResearch` follow-ups
/// both do this).
fn build_dispatcher(ctx: EngineContext) -> Arc<InProcessDispatcher> {
    let cell: Arc<OnceLock<Arc<InProcessDispatcher>>> = Arc::new(OnceLock::new());
    let runner_cell = Arc::clone(&cell);
    let store = Arc::clone(&ctx.store);
    let runner: Arc<TaskRunner> = Arc::new(move |task_type, payload, run_id| {
        let Some(dispatcher) = runner_cell.get() else {
            return;
        };
        run_task(&ctx, dispatcher.as_ref(), task_type, payload, run_id);
    });
    let dispatcher = Arc::new(InProcessDispatcher::new(store, runner));
    let _ = cell.set(Arc::clone(&dispatcher));
    dispatcher
}

/// Spawns the background thread that periodically sweeps expired
/// waitpoints, locks, and stuck runs (spec §4.10).
fn spawn_reaper_loop(ctx: EngineContext, dispatcher: Arc<InProcessDispatcher>, interval: Duration) -> thread::JoinHandle<()> {
    thread::Builder::new()
        .name("caseflow-reaper".to_string())
        .spawn(move || loop {
            thread::sleep(interval);
            let report = engine::sweep(&ctx, dispatcher.as_ref(), now_millis());
            if report.waitpoints_expired > 0
                || report.locks_released > 0
                || report.runs_marked_stuck > 0
                || report.portal_hard_timeouts > 0
            {
                ctx.notifier.notify(
                    caseflow_core::NotificationKind::ErrorRecorded,
                    &format!(
                        "reaper swept {} expired waitpoints, {} released locks, {} stuck runs ({} reprocessed), {} hard portal timeouts",
                        report.waitpoints_expired,
                        report.locks_released,
                        report.runs_marked_stuck,
                        report.runs_reprocessed,
                        report.portal_hard_timeouts,
                    ),
                    None,
                );
            }
        })
        .expect("spawning the reaper thread")
}

/// A fully wired caseflow deployment: durable store, dispatcher, reaper
/// loop, and the notification fanout the HTTP/SSE shell subscribes to.
pub struct Application {
    /// The shared engine context every HTTP handler and task runner closes
    /// over.
    pub context: EngineContext,
    /// The per-case FIFO task dispatcher.
    pub dispatcher: Arc<InProcessDispatcher>,
    /// The concrete notification sink, so `server` can subscribe SSE
    /// clients to it directly rather than through the `NotificationPort`
    /// trait object.
    pub notifications: Arc<ChannelSink>,
    _reaper: thread::JoinHandle<()>,
}

impl Application {
    /// Opens the store, builds the collaborator set, starts the dispatcher
    /// and reaper, and returns a ready-to-serve [`Application`].
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError`] if the store fails to open or a collaborator
    /// adapter fails to build.
    pub fn start(config: CaseflowConfig) -> Result<Self, ServiceError> {
        let sqlite = Arc::new(open_store(&config.store)?);
        let store: Arc<dyn caseflow_core::Store + Send + Sync> = Arc::clone(&sqlite) as _;
        let locks: Arc<dyn caseflow_core::CaseLockPort + Send + Sync> = Arc::clone(&sqlite) as _;
        let waitpoints: Arc<dyn caseflow_core::WaitpointPort + Send + Sync> = sqlite as _;
        let collaborators = Arc::new(CollaboratorSet::from_config(&config.providers)?);
        let notifications = Arc::new(ChannelSink::new(256));
        let config = Arc::new(config);

        let context = EngineContext {
            store,
            locks,
            waitpoints,
            collaborators,
            notifier: Arc::clone(&notifications) as Arc<dyn caseflow_core::NotificationPort + Send + Sync>,
            config: Arc::clone(&config),
        };

        let reaper_interval = Duration::from_millis(config.timeouts.run_stuck_after_millis.clamp(1_000, 60_000));
        let dispatcher = build_dispatcher(context.clone());
        let reaper = spawn_reaper_loop(context.clone(), Arc::clone(&dispatcher), reaper_interval);

        Ok(Self { context, dispatcher, notifications, _reaper: reaper })
    }
}
