// crates/caseflow-service/src/engine/dispatcher.rs
// ============================================================================
// Module: In-Process Dispatcher
// Description: `DispatcherPort` implementation with a per-case FIFO worker
//              thread, an idempotency-key cache, and trailing debounce
//              coalescing (spec §4.3).
// Purpose: Let the HTTP/SSE shell and the reaper trigger durable background
//          work (`process_inbound`, `resume_decision`, `run_timer`) without
//          ever running two tasks for the same case concurrently.
// Dependencies: caseflow-core, std::sync, std::thread
// ============================================================================

//! ## Overview
//! [`InProcessDispatcher`] lazily spawns one worker thread per distinct
//! `TriggerOptions::queue` value (conventionally `case:{case_id}`) the first
//! time a task targets it; that thread drains an unbounded FIFO channel for
//! the rest of the process's life, guaranteeing at most one task per queue
//! runs at a time. Idempotency is a time-boxed cache keyed by
//! `TriggerOptions::idempotency_key`: a repeat trigger within the window
//! returns the original [`TriggerHandle`] with `deduplicated = true` instead
//! of enqueueing new work. Debounce coalesces bursts: only the last trigger
//! sharing a `Debounce::key` within `delay_millis` actually enqueues,
//! matching [`DebounceMode::Trailing`].
//!
//! This is a single-process engine; a multi-node deployment would replace
//! this module with a durable external queue, but every caller only ever
//! sees the [`DispatcherPort`] trait, so that swap requires no changes
//! upstream.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use caseflow_core::AgentRun;
use caseflow_core::CaseId;
use caseflow_core::DebounceMode;
use caseflow_core::DispatchError;
use caseflow_core::DispatcherPort;
use caseflow_core::RunId;
use caseflow_core::RunStatus;
use caseflow_core::RunTrigger;
use caseflow_core::Store;
use caseflow_core::TriggerHandle;
use caseflow_core::TriggerOptions;

use crate::engine::clock::generate_token;
use crate::engine::clock::now_millis;

/// One unit of durable work handed to a queue's worker thread.
struct Task {
    task_type: String,
    payload: serde_json::Value,
    run_id: RunId,
}

/// Shared mutable state guarded by one mutex: queue senders, the idempotency
/// cache, and the debounce generation counters.
struct DispatcherState {
    queues: HashMap<String, mpsc::Sender<Task>>,
    idempotency: HashMap<String, (Instant, TriggerHandle)>,
    debounce_generation: HashMap<String, u64>,
    /// The run registered for the most recent trigger on each debounce key,
    /// so a new trigger in the same window can cancel the one it supersedes.
    debounce_pending: HashMap<String, RunId>,
}

/// Callback invoked by a queue worker thread for each dispatched task,
/// receiving the task type, its JSON payload, and the run it owns the
/// lifecycle of. Implementations are expected to update the run's status as
/// it progresses (see `pipeline::process_inbound` for the canonical caller).
pub type TaskRunner = dyn Fn(&str, serde_json::Value, &RunId) + Send + Sync;

/// In-process, per-case-serialized task dispatcher (spec §4.3).
pub struct InProcessDispatcher {
    state: Arc<Mutex<DispatcherState>>,
    store: Arc<dyn Store + Send + Sync>,
    runner: Arc<TaskRunner>,
}

impl InProcessDispatcher {
    /// Creates a dispatcher that hands every task to `runner` from its
    /// queue's worker thread.
    #[must_use]
    pub fn new(store: Arc<dyn Store + Send + Sync>, runner: Arc<TaskRunner>) -> Self {
        Self {
            state: Arc::new(Mutex::new(DispatcherState {
                queues: HashMap::new(),
                idempotency: HashMap::new(),
                debounce_generation: HashMap::new(),
                debounce_pending: HashMap::new(),
            })),
            store,
            runner,
        }
    }

    /// Returns (creating if absent) the FIFO worker channel for `queue`.
    fn queue_sender(&self, queue: &str) -> mpsc::Sender<Task> {
        let mut state = self.state.lock().expect("dispatcher state mutex poisoned");
        if let Some(sender) = state.queues.get(queue) {
            return sender.clone();
        }
        let (sender, receiver) = mpsc::channel::<Task>();
        let runner = Arc::clone(&self.runner);
        let store = Arc::clone(&self.store);
        thread::Builder::new()
            .name(format!("caseflow-queue-{queue}"))
            .spawn(move || {
                for task in receiver {
                    let mut run = match store.get_run(&task.run_id) {
                        Ok(run) => run,
                        Err(_) => continue,
                    };
                    run.status = RunStatus::Running;
                    run.started_at = Some(now_millis());
                    let _ = store.put_run(&run);
                    (runner)(&task.task_type, task.payload, &task.run_id);
                }
            })
            .expect("spawning a dispatcher queue worker thread");
        state.queues.insert(queue.to_string(), sender.clone());
        sender
    }

    /// Prunes idempotency cache entries older than their TTL. Called
    /// opportunistically from `trigger`; a background sweep is unnecessary
    /// since the cache is bounded by actual trigger volume.
    fn prune_idempotency(state: &mut DispatcherState) {
        let now = Instant::now();
        state
            .idempotency
            .retain(|_, (expires_at, _)| *expires_at > now);
    }
}

impl DispatcherPort for InProcessDispatcher {
    fn trigger(
        &self,
        task_type: &str,
        payload: serde_json::Value,
        opts: TriggerOptions,
    ) -> Result<TriggerHandle, DispatchError> {
        let mut state = self.state.lock().expect("dispatcher state mutex poisoned");
        Self::prune_idempotency(&mut state);

        if let Some((_, handle)) = state.idempotency.get(&opts.idempotency_key) {
            let mut deduplicated = handle.clone();
            deduplicated.deduplicated = true;
            return Ok(deduplicated);
        }

        if let Some(debounce) = &opts.debounce {
            if debounce.mode == DebounceMode::Trailing {
                let generation = state
                    .debounce_generation
                    .entry(debounce.key.clone())
                    .and_modify(|g| *g += 1)
                    .or_insert(0);
                let generation = *generation;

                // Register the run and the idempotency entry now, not when
                // the timer fires — every returned handle must resolve via
                // `Store::get_run` immediately, and a second trigger sharing
                // `idempotency_key` during the debounce window must dedup
                // against this entry rather than starting its own timer.
                let run_id = RunId::new(generate_token("run"));
                let run = AgentRun {
                    id: run_id.clone(),
                    case_id: CaseId::new(opts.queue.trim_start_matches("case:").to_string()),
                    trigger_type: RunTrigger::Timer,
                    status: RunStatus::Queued,
                    started_at: None,
                    ended_at: None,
                    error: None,
                    continuation_token: None,
                    message_id: None,
                    proposal_id: None,
                    metadata: caseflow_core::MetadataMap::new(),
                };
                self.store
                    .insert_run(&run)
                    .map_err(|err| DispatchError::Transient(err.to_string()))?;

                let handle = TriggerHandle {
                    task_handle_id: generate_token("task"),
                    run_id: run_id.clone(),
                    deduplicated: false,
                };
                state.idempotency.insert(
                    opts.idempotency_key.clone(),
                    (Instant::now() + Duration::from_millis(opts.idempotency_key_ttl_millis.max(1)), handle.clone()),
                );

                // The trigger this one supersedes never fires; its run was
                // only ever `Queued`, so cancel it rather than leave it
                // stranded.
                if let Some(superseded) = state.debounce_pending.insert(debounce.key.clone(), run_id.clone()) {
                    if let Ok(mut superseded_run) = self.store.get_run(&superseded) {
                        superseded_run.status = RunStatus::Cancelled;
                        superseded_run.ended_at = Some(now_millis());
                        superseded_run.error = Some("superseded by a later debounced trigger".to_string());
                        let _ = self.store.put_run(&superseded_run);
                    }
                }

                let key = debounce.key.clone();
                let delay = Duration::from_millis(debounce.delay_millis);
                let dispatcher_state = Arc::clone(&self.state);
                let queue = opts.queue.clone();
                let task_type = task_type.to_string();
                drop(state);
                thread::spawn(move || {
                    thread::sleep(delay);
                    let state = dispatcher_state.lock().expect("dispatcher state mutex poisoned");
                    if state.debounce_generation.get(&key).copied() != Some(generation) {
                        return;
                    }
                    let sender = {
                        if let Some(sender) = state.queues.get(&queue) {
                            sender.clone()
                        } else {
                            drop(state);
                            return;
                        }
                    };
                    drop(state);
                    let _ = sender.send(Task {
                        task_type,
                        payload: serde_json::Value::Null,
                        run_id,
                    });
                });
                // Ensure the queue exists before the debounce timer fires.
                self.queue_sender(&opts.queue);
                return Ok(handle);
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
        self.store
            .insert_run(&run)
            .map_err(|err| DispatchError::Transient(err.to_string()))?;

        let handle = TriggerHandle {
            task_handle_id: generate_token("task"),
            run_id: run_id.clone(),
            deduplicated: false,
        };
        state.idempotency.insert(
            opts.idempotency_key.clone(),
            (
                Instant::now() + Duration::from_millis(opts.idempotency_key_ttl_millis.max(1)),
                handle.clone(),
            ),
        );
        drop(state);

        let sender = self.queue_sender(&opts.queue);
        sender
            .send(Task {
                task_type: task_type.to_string(),
                payload,
                run_id,
            })
            .map_err(|_| DispatchError::Refused("queue worker thread has shut down".to_string()))?;

        Ok(handle)
    }

    fn cancel(&self, run_id: &RunId, reason: &str) -> Result<(), DispatchError> {
        let mut run = self
            .store
            .get_run(run_id)
            .map_err(|err| DispatchError::Transient(err.to_string()))?;
        run.status = RunStatus::Cancelled;
        run.ended_at = Some(now_millis());
        run.error = Some(reason.to_string());
        self.store
            .put_run(&run)
            .map_err(|err| DispatchError::Transient(err.to_string()))
    }
}
