// crates/caseflow-service/src/engine/reaper.rs
// ============================================================================
// Module: Reaper
// Description: Periodic sweep that expires stale waitpoints and case locks,
//              reaps stuck agent runs, flags slow portal submissions, and
//              re-triggers orphaned review cases (spec §4.10).
// Purpose: Recover from a crashed worker or a collaborator that never
//          resolves without requiring a human to notice.
// Dependencies: caseflow-core, caseflow-config
// ============================================================================

//! ## Overview
//! [`sweep`] is driven by an external timer; nothing in this module
//! schedules itself. Every step only touches rows already past their own
//! expiry and is safe to run concurrently with in-flight case work, using
//! the same compare-and-set primitives (`WaitpointPort::complete`,
//! `CaseLockPort::release`) the rest of the engine relies on.

use caseflow_core::case_machine::CaseEvent;
use caseflow_core::AgentRun;
use caseflow_core::CaseStatus;
use caseflow_core::CaseflowError;
use caseflow_core::DispatcherPort;
use caseflow_core::Execution;
use caseflow_core::ExecutionStatus;
use caseflow_core::GateOption;
use caseflow_core::Message;
use caseflow_core::MessageDirection;
use caseflow_core::NotificationKind;
use caseflow_core::PauseReason;
use caseflow_core::ProposalStatus;
use caseflow_core::RunStatus;
use caseflow_core::Timestamp;
use caseflow_core::TriggerOptions;
use caseflow_core::WaitpointPayload;

use crate::engine::clock::generate_token;
use crate::engine::context::EngineContext;
use crate::engine::transition::transition_case;

/// Tally of work a [`sweep`] pass performed, for logging/metrics by the
/// caller that schedules it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReaperReport {
    /// Waitpoints dismissed for having passed their expiry.
    pub waitpoints_expired: usize,
    /// Case operation locks released for having passed their expiry.
    pub locks_released: usize,
    /// Runs marked `Failed` for having made no progress past
    /// `run_stuck_after_millis`.
    pub runs_marked_stuck: usize,
    /// Of those, how many had their case re-triggered for reprocessing.
    pub runs_reprocessed: usize,
    /// Open portal submissions past their soft timeout.
    pub portal_soft_timeouts: usize,
    /// Open portal submissions past their hard timeout.
    pub portal_hard_timeouts: usize,
    /// Review-state cases with no pending proposal and no active run,
    /// re-triggered against their last inbound message.
    pub orphaned_cases_reprocessed: usize,
}

/// Runs one reaper pass as of `now`.
#[must_use]
pub fn sweep(ctx: &EngineContext, dispatcher: &dyn DispatcherPort, now: Timestamp) -> ReaperReport {
    let waitpoints_expired = expire_waitpoints(ctx, now);
    let locks_released = release_expired_locks(ctx, now);
    let (runs_marked_stuck, runs_reprocessed) = reap_stuck_runs(ctx, dispatcher, now);
    let (portal_soft_timeouts, portal_hard_timeouts) = sweep_portal_timeouts(ctx, now);
    let orphaned_cases_reprocessed = reprocess_orphaned_cases(ctx, dispatcher);

    ReaperReport {
        waitpoints_expired,
        locks_released,
        runs_marked_stuck,
        runs_reprocessed,
        portal_soft_timeouts,
        portal_hard_timeouts,
        orphaned_cases_reprocessed,
    }
}

/// Dismisses every waitpoint past its expiry with a `DISMISS` gate decision,
/// unparking whatever run is waiting on it.
fn expire_waitpoints(ctx: &EngineContext, now: Timestamp) -> usize {
    let Ok(expired) = ctx.waitpoints.list_expired(now) else {
        return 0;
    };
    let payload = WaitpointPayload {
        action: GateOption::Dismiss,
        instruction: None,
        reason: Some("waitpoint_expired".to_string()),
    };
    expired
        .into_iter()
        .filter(|waitpoint| ctx.waitpoints.complete(&waitpoint.token, payload.clone(), now).is_ok())
        .count()
}

/// Releases every case operation lock past its expiry.
fn release_expired_locks(ctx: &EngineContext, now: Timestamp) -> usize {
    let Ok(expired) = ctx.locks.list_expired(now) else {
        return 0;
    };
    expired
        .into_iter()
        .filter(|lock| ctx.locks.release(&lock.case_id, &lock.operation, &lock.token).is_ok())
        .count()
}

/// Marks every run that has been `Running` for longer than
/// `run_stuck_after_millis` as `Failed`, and re-triggers its case unless
/// that case has since closed.
fn reap_stuck_runs(ctx: &EngineContext, dispatcher: &dyn DispatcherPort, now: Timestamp) -> (usize, usize) {
    let cutoff = subtract_millis(now, ctx.config.timeouts.run_stuck_after_millis);
    let Ok(stuck) = ctx.store.list_stuck_runs(cutoff) else {
        return (0, 0);
    };

    let mut marked = 0;
    let mut reprocessed = 0;
    for mut run in stuck {
        run.status = RunStatus::Failed;
        run.error = Some("stuck".to_string());
        run.ended_at = Some(now);
        let case_id = run.case_id.clone();
        if ctx.store.put_run(&run).is_err() {
            continue;
        }
        marked += 1;
        ctx.notifier.notify(
            NotificationKind::ErrorRecorded,
            &format!("run {} reaped as stuck", run.id),
            Some(&case_id),
        );

        let Ok(case) = ctx.store.get_case(&case_id) else {
            continue;
        };
        if case.status.is_terminal() {
            continue;
        }
        if retrigger_stuck_run(ctx, dispatcher, &run).is_ok() {
            reprocessed += 1;
        }
    }
    (marked, reprocessed)
}

/// Re-triggers the task a stuck run was performing, based on what drove it:
/// an inbound message replays `process_inbound`; an approved proposal
/// replays `execute_proposal`. Timer-triggered runs with neither are left
/// alone — there is nothing durable to replay.
fn retrigger_stuck_run(ctx: &EngineContext, dispatcher: &dyn DispatcherPort, run: &AgentRun) -> Result<(), CaseflowError> {
    let opts = TriggerOptions {
        queue: format!("case:{}", run.case_id),
        idempotency_key: generate_token("reaper"),
        idempotency_key_ttl_millis: ctx.config.timeouts.idempotency_key_ttl_millis,
        debounce: None,
    };

    let handle = if let Some(message_id) = &run.message_id {
        dispatcher.trigger(
            "process_inbound",
            serde_json::json!({ "message_id": message_id.as_str(), "force_new_run": true }),
            opts,
        )
    } else if let Some(proposal_id) = &run.proposal_id {
        dispatcher.trigger(
            "execute_proposal",
            serde_json::json!({ "proposal_id": proposal_id.as_str() }),
            opts,
        )
    } else {
        return Ok(());
    };
    handle.map(|_| ()).map_err(|err| CaseflowError::Transient(err.to_string()))
}

/// Reports soft/hard-timeout counts for portal submissions still open. A
/// soft timeout only notifies; a hard timeout also fails the `Execution` row
/// and reopens its proposal for re-approval (spec §4.10) — the `submit_portal_task`
/// this `Execution` belongs to may still be blocked inside
/// `PortalWorkerPort::submit`, but the case stops waiting on it.
fn sweep_portal_timeouts(ctx: &EngineContext, now: Timestamp) -> (usize, usize) {
    let Ok(open) = ctx.store.list_open_portal_submissions() else {
        return (0, 0);
    };

    let mut soft = 0;
    let mut hard = 0;
    for mut execution in open {
        let Some(elapsed) = elapsed_millis(execution.started_at, now) else {
            continue;
        };
        if elapsed >= ctx.config.timeouts.portal_hard_timeout_millis {
            hard += 1;
            execution.status = ExecutionStatus::Failed;
            execution.error = Some("portal submission exceeded its hard timeout".to_string());
            execution.completed_at = Some(now);
            let case_id = execution.case_id.clone();
            let execution_id = execution.id.clone();
            if ctx.store.put_execution(&execution).is_ok() {
                reopen_timed_out_portal_proposal(ctx, &execution);
            }
            ctx.notifier.notify(
                NotificationKind::ErrorRecorded,
                &format!("portal submission {execution_id} past its hard timeout, reopened for review"),
                Some(&case_id),
            );
        } else if elapsed >= ctx.config.timeouts.portal_soft_timeout_millis {
            soft += 1;
            ctx.notifier.notify(
                NotificationKind::ErrorRecorded,
                &format!("portal submission {} past its soft timeout", execution.id),
                Some(&execution.case_id),
            );
        }
    }
    (soft, hard)
}

/// Rolls a proposal whose portal submission hard-timed-out back to
/// `PendingApproval` and re-escalates its case, so a human can decide
/// whether to retry or abandon it. A no-op if the proposal already moved on
/// (e.g. a prior sweep pass already reopened it).
fn reopen_timed_out_portal_proposal(ctx: &EngineContext, execution: &Execution) {
    let Ok(mut proposal) = ctx.store.get_proposal(&execution.proposal_id) else {
        return;
    };
    if proposal.status != ProposalStatus::PendingPortal {
        return;
    }
    proposal.status = ProposalStatus::PendingApproval;
    proposal.execution_key = None;
    proposal.waitpoint_token = None;
    let _ = ctx.store.put_proposal(&proposal);

    let Ok(case) = ctx.store.get_case(&execution.case_id) else {
        return;
    };
    if case.status.is_review_state() || case.status.is_terminal() {
        return;
    }
    let _ = transition_case(
        ctx,
        &execution.case_id,
        CaseEvent::CaseEscalated { target: CaseStatus::NeedsHumanReview, pause_reason: PauseReason::Manual },
    );
}

/// Re-triggers review-state cases whose `requires_human` flag has no
/// corresponding pending proposal or active run to resolve it — the
/// decisioner or executor crashed, or a run finished without leaving a
/// proposal behind.
fn reprocess_orphaned_cases(ctx: &EngineContext, dispatcher: &dyn DispatcherPort) -> usize {
    let Ok(cases) = ctx.store.list_cases_requiring_human() else {
        return 0;
    };

    let mut reprocessed = 0;
    for case in cases {
        if case.status.is_terminal() {
            continue;
        }
        let Ok(pending) = ctx.store.count_pending_proposals(&case.id) else {
            continue;
        };
        if pending > 0 {
            continue;
        }
        let Ok(live_run) = ctx.store.find_live_run(&case.id) else {
            continue;
        };
        if live_run.is_some() {
            continue;
        }
        let Ok(messages) = ctx.store.list_messages_for_case(&case.id) else {
            continue;
        };
        let Some(last_inbound) = latest_inbound(&messages) else {
            continue;
        };

        let opts = TriggerOptions {
            queue: format!("case:{}", case.id),
            idempotency_key: generate_token("reaper-orphan"),
            idempotency_key_ttl_millis: ctx.config.timeouts.idempotency_key_ttl_millis,
            debounce: None,
        };
        let triggered = dispatcher.trigger(
            "process_inbound",
            serde_json::json!({ "message_id": last_inbound.id.as_str(), "force_new_run": true }),
            opts,
        );
        if triggered.is_ok() {
            reprocessed += 1;
        }
    }
    reprocessed
}

/// Returns the most recently received inbound message, if any. Shared with
/// [`crate::engine::reset`], which needs the same "what was the case last
/// told" lookup to reprocess it.
pub(crate) fn latest_inbound(messages: &[Message]) -> Option<&Message> {
    let mut latest: Option<&Message> = None;
    for message in messages {
        if message.direction != MessageDirection::Inbound {
            continue;
        }
        let Some(received_at) = &message.received_at else {
            continue;
        };
        latest = match latest {
            None => Some(message),
            Some(current) => match &current.received_at {
                Some(current_at) if current_at.precedes(received_at) => Some(message),
                _ => Some(current),
            },
        };
    }
    latest
}

/// Subtracts `millis` from `ts`, preserving its representation.
fn subtract_millis(ts: Timestamp, millis: u64) -> Timestamp {
    match ts {
        Timestamp::UnixMillis(value) => {
            let delta = i64::try_from(millis).unwrap_or(i64::MAX);
            Timestamp::UnixMillis(value.saturating_sub(delta))
        }
        Timestamp::Logical(value) => Timestamp::Logical(value.saturating_sub(millis)),
    }
}

/// Milliseconds between `started_at` and `now`, when both share the same
/// timestamp representation.
fn elapsed_millis(started_at: Timestamp, now: Timestamp) -> Option<u64> {
    match (started_at, now) {
        (Timestamp::UnixMillis(start), Timestamp::UnixMillis(now)) => {
            u64::try_from(now.saturating_sub(start)).ok()
        }
        (Timestamp::Logical(start), Timestamp::Logical(now)) => Some(now.saturating_sub(start)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::collections::BTreeSet;

    use caseflow_core::AutopilotMode;
    use caseflow_core::Case;
    use caseflow_core::CaseId;
    use caseflow_core::CaseStatus;
    use caseflow_core::DispatchError;
    use caseflow_core::Execution;
    use caseflow_core::ExecutionId;
    use caseflow_core::ExecutionKind;
    use caseflow_core::ExecutionStatus;
    use caseflow_core::MessageId;
    use caseflow_core::ProposalId;
    use caseflow_core::RunId;
    use caseflow_core::RunTrigger;
    use caseflow_core::TriggerHandle;

    use super::*;
    use crate::engine::test_support::build_test_context;

    struct RecordingDispatcher {
        triggers: std::sync::Mutex<Vec<String>>,
    }

    impl RecordingDispatcher {
        fn new() -> Self {
            Self { triggers: std::sync::Mutex::new(Vec::new()) }
        }
    }

    impl DispatcherPort for RecordingDispatcher {
        fn trigger(
            &self,
            task_type: &str,
            _payload: serde_json::Value,
            opts: TriggerOptions,
        ) -> Result<TriggerHandle, DispatchError> {
            self.triggers.lock().unwrap().push(task_type.to_string());
            Ok(TriggerHandle {
                task_handle_id: "handle".to_string(),
                run_id: RunId::new(format!("run-for-{}", opts.idempotency_key)),
                deduplicated: false,
            })
        }

        fn cancel(&self, _run_id: &RunId, _reason: &str) -> Result<(), DispatchError> {
            Ok(())
        }
    }

    fn seed_case(ctx: &EngineContext, case_id: &str, requires_human: bool, status: CaseStatus) {
        ctx.store
            .put_case(&Case {
                id: CaseId::new(case_id),
                status,
                substatus: None,
                autopilot_mode: AutopilotMode::Auto,
                requires_human,
                pause_reason: None,
                agency_email: Some("agency@example.gov".to_string()),
                portal_url: None,
                deadline_date: None,
                fee_quote: None,
                scope_items: Vec::new(),
                constraints: BTreeSet::new(),
                send_date: None,
                last_portal_status: None,
                closed_at: None,
                outcome_type: None,
                outcome_summary: None,
            })
            .expect("seeds case");
    }

    #[test]
    fn marks_a_long_running_run_as_stuck_and_reprocesses_its_case() {
        let ctx = build_test_context();
        seed_case(&ctx, "case-1", false, CaseStatus::AwaitingResponse);
        let message_id = MessageId::new("msg-1");
        ctx.store
            .insert_run(&AgentRun {
                id: RunId::new("run-1"),
                case_id: CaseId::new("case-1"),
                trigger_type: RunTrigger::InboundMessage,
                status: RunStatus::Running,
                started_at: Some(Timestamp::Logical(0)),
                ended_at: None,
                error: None,
                continuation_token: None,
                message_id: Some(message_id),
                proposal_id: None,
                metadata: BTreeMap::new(),
            })
            .expect("seeds run");

        let dispatcher = RecordingDispatcher::new();
        let report = sweep(&ctx, &dispatcher, Timestamp::Logical(ctx.config.timeouts.run_stuck_after_millis + 1));

        assert_eq!(report.runs_marked_stuck, 1);
        assert_eq!(report.runs_reprocessed, 1);
        let run = ctx.store.get_run(&RunId::new("run-1")).expect("loads run");
        assert_eq!(run.status, RunStatus::Failed);
        assert_eq!(run.error.as_deref(), Some("stuck"));
        assert_eq!(*dispatcher.triggers.lock().unwrap(), vec!["process_inbound".to_string()]);
    }

    #[test]
    fn leaves_a_fresh_run_alone() {
        let ctx = build_test_context();
        seed_case(&ctx, "case-1", false, CaseStatus::AwaitingResponse);
        ctx.store
            .insert_run(&AgentRun {
                id: RunId::new("run-1"),
                case_id: CaseId::new("case-1"),
                trigger_type: RunTrigger::InboundMessage,
                status: RunStatus::Running,
                started_at: Some(Timestamp::Logical(100)),
                ended_at: None,
                error: None,
                continuation_token: None,
                message_id: None,
                proposal_id: None,
                metadata: BTreeMap::new(),
            })
            .expect("seeds run");

        let dispatcher = RecordingDispatcher::new();
        let report = sweep(&ctx, &dispatcher, Timestamp::Logical(100));

        assert_eq!(report.runs_marked_stuck, 0);
        let run = ctx.store.get_run(&RunId::new("run-1")).expect("loads run");
        assert_eq!(run.status, RunStatus::Running);
    }

    #[test]
    fn reprocesses_an_orphaned_review_case_against_its_last_inbound_message() {
        let ctx = build_test_context();
        seed_case(&ctx, "case-1", true, CaseStatus::NeedsHumanReview);
        ctx.store
            .insert_message(&Message {
                id: MessageId::new("msg-1"),
                case_id: Some(CaseId::new("case-1")),
                thread_id: None,
                direction: MessageDirection::Inbound,
                from: "agency@example.gov".to_string(),
                to: "requester@example.com".to_string(),
                subject: None,
                body_text: Some("first".to_string()),
                body_html: None,
                provider_message_id: None,
                received_at: Some(Timestamp::Logical(1)),
                sent_at: None,
                processed_at: None,
                processed_run_id: None,
                message_type: "email".to_string(),
                attachments: Vec::new(),
            })
            .expect("seeds first message");
        ctx.store
            .insert_message(&Message {
                id: MessageId::new("msg-2"),
                case_id: Some(CaseId::new("case-1")),
                thread_id: None,
                direction: MessageDirection::Inbound,
                from: "agency@example.gov".to_string(),
                to: "requester@example.com".to_string(),
                subject: None,
                body_text: Some("second".to_string()),
                body_html: None,
                provider_message_id: None,
                received_at: Some(Timestamp::Logical(2)),
                sent_at: None,
                processed_at: None,
                processed_run_id: None,
                message_type: "email".to_string(),
                attachments: Vec::new(),
            })
            .expect("seeds second message");

        let dispatcher = RecordingDispatcher::new();
        let report = sweep(&ctx, &dispatcher, Timestamp::Logical(10));

        assert_eq!(report.orphaned_cases_reprocessed, 1);
        assert_eq!(*dispatcher.triggers.lock().unwrap(), vec!["process_inbound".to_string()]);
    }

    #[test]
    fn counts_a_portal_submission_past_its_hard_timeout() {
        let ctx = build_test_context();
        seed_case(&ctx, "case-1", false, CaseStatus::PortalInProgress);
        ctx.store
            .insert_execution(&Execution {
                id: ExecutionId::new("exec-1"),
                proposal_id: ProposalId::new("proposal-1"),
                case_id: CaseId::new("case-1"),
                kind: ExecutionKind::PortalSubmission,
                provider_message_id: None,
                status: ExecutionStatus::Started,
                started_at: Timestamp::UnixMillis(0),
                completed_at: None,
                error: None,
            })
            .expect("seeds execution");

        let dispatcher = RecordingDispatcher::new();
        let report = sweep(
            &ctx,
            &dispatcher,
            Timestamp::UnixMillis(i64::try_from(ctx.config.timeouts.portal_hard_timeout_millis).unwrap() + 1),
        );

        assert_eq!(report.portal_hard_timeouts, 1);
        assert_eq!(report.portal_soft_timeouts, 0);
    }
}
