// crates/caseflow-core/src/interfaces/mod.rs
// ============================================================================
// Module: Caseflow Interfaces
// Description: Backend-agnostic port traits for storage, locking, dispatch,
//              waitpoints, and the out-of-process collaborators (classifier,
//              draft generator, email transport, portal worker,
//              notification bus) the core consumes.
// Purpose: Let caseflow-service depend on these traits alone; concrete
//          implementations live in caseflow-store-sqlite, caseflow-providers,
//          and caseflow-broker so the engine stays testable against
//          in-memory fakes.
// Dependencies: crate::core
// ============================================================================

//! ## Overview
//! Every side-effecting dependency of the orchestration engine is named here
//! as a trait, never a concrete type: [`Store`], [`CaseLockPort`],
//! [`DispatcherPort`], [`WaitpointPort`], [`ClassifierPort`], [`DraftPort`],
//! [`EmailTransportPort`], [`PortalWorkerPort`], and [`NotificationPort`].
//! Implementations must fail closed: a store or provider that cannot
//! determine an answer returns an error rather than a default that would
//! let a case auto-execute something unreviewed.

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

use crate::core::identifiers::CaseId;
use crate::core::identifiers::CaseLockToken;
use crate::core::identifiers::ExecutionKey;
use crate::core::identifiers::MessageId;
use crate::core::identifiers::ProposalId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::WaitpointToken;
use crate::core::model::ActionType;
use crate::core::model::ActivityLogEntry;
use crate::core::model::AgentRun;
use crate::core::model::Attachment;
use crate::core::model::Case;
use crate::core::model::CaseOperationLock;
use crate::core::model::Execution;
use crate::core::model::Message;
use crate::core::model::MetadataMap;
use crate::core::model::Proposal;
use crate::core::model::Waitpoint;
use crate::core::model::WaitpointPayload;
use crate::core::time::Timestamp;

// ============================================================================
// SECTION: Store
// ============================================================================

/// Errors produced by the durable [`Store`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying storage I/O failure; callers should treat as
    /// [`crate::core::error::CaseflowError::Transient`].
    #[error("store io error: {0}")]
    Io(String),
    /// The referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),
    /// A uniqueness or invariant constraint was violated (duplicate
    /// `execution_key`, duplicate `proposal_key`, ...).
    #[error("store conflict: {0}")]
    Conflict(String),
}

/// Durable storage of cases, messages, proposals, runs, and the append-only
/// execution and activity logs (spec §3).
///
/// # Invariants
/// - `insert_proposal` is idempotent on `proposal_key`: a conflicting key
///   returns the existing row rather than erroring or inserting a duplicate.
/// - `claim_proposal_for_execution` enforces the `execution_key` uniqueness
///   constraint: a second caller attempting to reuse a key observes `false`,
///   never a second successful claim.
/// - All multi-row mutations (a case transition plus its activity log
///   entry, a proposal status change plus an execution row) are applied in
///   one transaction.
pub trait Store {
    /// Loads a case by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when no such case exists, or
    /// [`StoreError::Io`] on a storage failure.
    fn get_case(&self, case_id: &CaseId) -> Result<Case, StoreError>;

    /// Inserts or replaces a case row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn put_case(&self, case: &Case) -> Result<(), StoreError>;

    /// Loads a message by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::Io`].
    fn get_message(&self, message_id: &MessageId) -> Result<Message, StoreError>;

    /// Inserts a new message row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn insert_message(&self, message: &Message) -> Result<(), StoreError>;

    /// Replaces a message row (attachment, `processed_at`, ...).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn put_message(&self, message: &Message) -> Result<(), StoreError>;

    /// Lists messages attached to a case, ordered by time received, for
    /// thread context assembled ahead of the classifier call.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn list_messages_for_case(&self, case_id: &CaseId) -> Result<Vec<Message>, StoreError>;

    /// Finds an unmatched inbound message's owning case by recipient
    /// address, in-reply-to thread, subject thread, or agency domain.
    /// Returns `None` when no match is found.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn match_case_for_message(&self, message: &Message) -> Result<Option<CaseId>, StoreError>;

    /// Inserts a proposal, or returns the existing row when
    /// `proposal.proposal_key` already exists (idempotent planner
    /// persistence).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn insert_proposal(&self, proposal: &Proposal) -> Result<Proposal, StoreError>;

    /// Loads a proposal by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::Io`].
    fn get_proposal(&self, proposal_id: &ProposalId) -> Result<Proposal, StoreError>;

    /// Replaces a proposal row. Callers are responsible for honoring the
    /// forward-only status invariant; the store only enforces the
    /// `execution_key` uniqueness constraint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Conflict`] when `proposal.execution_key` is set
    /// and already used by a different proposal, or [`StoreError::Io`].
    fn put_proposal(&self, proposal: &Proposal) -> Result<(), StoreError>;

    /// Compare-and-set used by the executor's single-flight claim: succeeds
    /// only when the stored proposal's status equals `expected_status` and
    /// its `execution_key` is unset or equal to `execution_key`. Returns
    /// `true` when the claim succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn claim_proposal_for_execution(
        &self,
        proposal_id: &ProposalId,
        expected_status: crate::core::model::ProposalStatus,
        execution_key: &ExecutionKey,
    ) -> Result<bool, StoreError>;

    /// Counts proposals for a case in `PendingApproval` or `Blocked` status.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn count_pending_proposals(&self, case_id: &CaseId) -> Result<usize, StoreError>;

    /// Lists every proposal attached to a case, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn list_proposals_for_case(&self, case_id: &CaseId) -> Result<Vec<Proposal>, StoreError>;

    /// Inserts a new run row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn insert_run(&self, run: &AgentRun) -> Result<(), StoreError>;

    /// Loads a run by id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] or [`StoreError::Io`].
    fn get_run(&self, run_id: &RunId) -> Result<AgentRun, StoreError>;

    /// Replaces a run row.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn put_run(&self, run: &AgentRun) -> Result<(), StoreError>;

    /// Returns the case's run currently `Queued`, `Running`, or `Waiting`,
    /// if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn find_live_run(&self, case_id: &CaseId) -> Result<Option<AgentRun>, StoreError>;

    /// Returns every run still `Running` whose `started_at` is older than
    /// `cutoff` — candidates for the reaper's stuck-run sweep.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn list_stuck_runs(&self, cutoff: Timestamp) -> Result<Vec<AgentRun>, StoreError>;

    /// Returns every case with `requires_human` set, regardless of status.
    ///
    /// Used by the reaper to find review-state cases that have fallen out
    /// of any active run or pending proposal.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn list_cases_requiring_human(&self) -> Result<Vec<Case>, StoreError>;

    /// Records a side-effect execution.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn insert_execution(&self, execution: &Execution) -> Result<(), StoreError>;

    /// Replaces an execution row (started -> completed/failed).
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn put_execution(&self, execution: &Execution) -> Result<(), StoreError>;

    /// Lists executions recorded for a proposal, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn list_executions_for_proposal(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<Vec<Execution>, StoreError>;

    /// Returns every [`Execution`] of kind
    /// [`ExecutionKind::PortalSubmission`][crate::ExecutionKind::PortalSubmission]
    /// still `Started`, for the reaper's soft/hard portal timeout sweep.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn list_open_portal_submissions(&self) -> Result<Vec<Execution>, StoreError>;

    /// Appends one activity log entry, assigning the next `seq` for the
    /// case.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn append_activity_log(
        &self,
        case_id: &CaseId,
        event_type: &str,
        description: &str,
        metadata: MetadataMap,
        recorded_at: Timestamp,
    ) -> Result<ActivityLogEntry, StoreError>;

    /// Lists activity log entries for a case in `seq` order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] on a storage failure.
    fn list_activity_log(&self, case_id: &CaseId) -> Result<Vec<ActivityLogEntry>, StoreError>;

    /// Reports store readiness for liveness/readiness probes.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] when the store is unavailable.
    fn readiness(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// ============================================================================
// SECTION: CaseLock
// ============================================================================

/// Errors produced by [`CaseLockPort`].
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock is currently held by another token and unexpired.
    #[error("lock contention on {0}")]
    Contention(String),
    /// Underlying storage failure.
    #[error("lock store io error: {0}")]
    Io(String),
}

/// Opaque proof that a lock acquisition succeeded, carrying enough
/// information for the holder to detect being superseded (fencing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencingInfo {
    /// Monotonically increasing generation for this `(case_id, operation)`
    /// pair; a holder observing a higher generation elsewhere knows it has
    /// been superseded.
    pub generation: u64,
}

/// Per-case advisory lock with TTL and a fencing token (spec §4.2).
///
/// # Invariants
/// - Acquisition is a conditional upsert: it succeeds only when no row
///   exists for `(case_id, operation)` or the existing row's `expires_at`
///   has passed.
/// - A mismatched token on `release`/`refresh` is a no-op, not an error:
///   another holder owns the lock.
pub trait CaseLockPort {
    /// Attempts to acquire the named operation lock on `case_id` for
    /// `ttl_millis`.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Contention`] when the lock is currently held and
    /// unexpired, or [`LockError::Io`] on a storage failure.
    fn acquire(
        &self,
        case_id: &CaseId,
        operation: &str,
        ttl_millis: u64,
        now: Timestamp,
    ) -> Result<(CaseLockToken, FencingInfo), LockError>;

    /// Releases the lock if `token` matches the current holder; a mismatch
    /// is silently ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Io`] on a storage failure.
    fn release(
        &self,
        case_id: &CaseId,
        operation: &str,
        token: &CaseLockToken,
    ) -> Result<(), LockError>;

    /// Extends the lock's expiry if `token` matches the current holder; a
    /// mismatch is silently ignored.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Io`] on a storage failure.
    fn refresh(
        &self,
        case_id: &CaseId,
        operation: &str,
        token: &CaseLockToken,
        ttl_millis: u64,
        now: Timestamp,
    ) -> Result<(), LockError>;

    /// Lists every lock past its `expires_at` as of `now`, for the reaper.
    ///
    /// # Errors
    ///
    /// Returns [`LockError::Io`] on a storage failure.
    fn list_expired(&self, now: Timestamp) -> Result<Vec<CaseOperationLock>, LockError>;
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Debounce coalescing mode for a triggered task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebounceMode {
    /// Only the last trigger within the delay window runs.
    Trailing,
}

/// Debounce configuration for a [`TriggerOptions`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debounce {
    /// Coalescing key; triggers sharing a key debounce against each other.
    pub key: String,
    /// Delay window in milliseconds.
    pub delay_millis: u64,
    /// Coalescing mode.
    pub mode: DebounceMode,
}

/// Options governing one [`DispatcherPort::trigger`] call (spec §4.3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerOptions {
    /// Serialization domain; tasks sharing a queue run one at a time.
    /// Conventionally `case:{case_id}`, the mandatory per-case FIFO queue.
    pub queue: String,
    /// Idempotency key. A repeat `trigger` within
    /// `idempotency_key_ttl_millis` returns the original handle instead of
    /// enqueueing a new task.
    pub idempotency_key: String,
    /// Idempotency window, milliseconds. Defaults to one hour.
    pub idempotency_key_ttl_millis: u64,
    /// Debounce configuration, when bursts of this trigger should coalesce.
    /// Idempotency takes precedence over debounce.
    pub debounce: Option<Debounce>,
}

/// Handle returned by a successful (or deduplicated) trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerHandle {
    /// Opaque task handle id.
    pub task_handle_id: String,
    /// The `AgentRun` this task owns the lifecycle of.
    pub run_id: RunId,
    /// `true` when this call deduplicated against an in-flight trigger
    /// rather than enqueueing a new task.
    pub deduplicated: bool,
}

/// Errors produced by [`DispatcherPort::trigger`].
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The durable task runtime refused the trigger outright.
    #[error("dispatch refused: {0}")]
    Refused(String),
    /// Underlying transport or storage failure; retryable.
    #[error("dispatch transient error: {0}")]
    Transient(String),
}

/// Schedules and tracks durable background tasks against a per-case FIFO
/// queue, with idempotency and debounce (spec §4.3).
pub trait DispatcherPort {
    /// Triggers a durable task of `task_type` with `payload`, honoring
    /// `opts`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Refused`] when the runtime permanently
    /// rejects the trigger, or [`DispatchError::Transient`] when the
    /// failure is likely to succeed on retry.
    fn trigger(
        &self,
        task_type: &str,
        payload: serde_json::Value,
        opts: TriggerOptions,
    ) -> Result<TriggerHandle, DispatchError>;

    /// Cancels a queued or running task, marking its `AgentRun`
    /// `Cancelled` with an explanatory error.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Transient`] on a storage or transport
    /// failure.
    fn cancel(&self, run_id: &RunId, reason: &str) -> Result<(), DispatchError>;
}

// ============================================================================
// SECTION: Waitpoint
// ============================================================================

/// Outcome of peeking a token (spec §4.4). The orchestration engine itself
/// never blocks on this: a run observing `Pending` persists its
/// continuation and returns, to be woken by the dispatcher when the
/// waitpoint resolves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WaitpointOutcome {
    /// Still open; the run should park here.
    Pending,
    /// Completed with a payload.
    Completed(Box<WaitpointPayload>),
    /// Expired past `expires_at` without a decision.
    Expired,
    /// Cancelled (case reset, superseded run).
    Cancelled,
}

/// Errors produced by [`WaitpointPort`].
#[derive(Debug, Error)]
pub enum WaitpointError {
    /// No waitpoint exists for this token.
    #[error("waitpoint not found")]
    NotFound,
    /// A different caller already completed this waitpoint; the
    /// compare-and-set on `completed_at IS NULL` lost the race.
    #[error("waitpoint already completed")]
    AlreadyCompleted,
    /// Underlying storage failure.
    #[error("waitpoint store io error: {0}")]
    Io(String),
}

/// Single-use durable tokens that suspend a run until a human decision
/// arrives (spec §4.4).
///
/// # Invariants
/// - `complete` is exactly-once: the first caller to observe
///   `completed_at IS NULL` and write it wins; every other concurrent
///   caller observes [`WaitpointError::AlreadyCompleted`].
pub trait WaitpointPort {
    /// Creates a waitpoint for `proposal_id`, expiring after `ttl_millis`.
    ///
    /// # Errors
    ///
    /// Returns [`WaitpointError::Io`] on a storage failure.
    fn create(
        &self,
        proposal_id: &ProposalId,
        ttl_millis: u64,
        now: Timestamp,
    ) -> Result<WaitpointToken, WaitpointError>;

    /// Completes the waitpoint named by `token` with `payload`. First
    /// caller wins.
    ///
    /// # Errors
    ///
    /// Returns [`WaitpointError::NotFound`],
    /// [`WaitpointError::AlreadyCompleted`], or [`WaitpointError::Io`].
    fn complete(
        &self,
        token: &WaitpointToken,
        payload: WaitpointPayload,
        now: Timestamp,
    ) -> Result<(), WaitpointError>;

    /// Reads the current outcome for `token` without mutating it.
    ///
    /// # Errors
    ///
    /// Returns [`WaitpointError::Io`] on a storage failure.
    fn peek(&self, token: &WaitpointToken) -> Result<WaitpointOutcome, WaitpointError>;

    /// Lists every open waitpoint past `expires_at` as of `now`, for the
    /// reaper.
    ///
    /// # Errors
    ///
    /// Returns [`WaitpointError::Io`] on a storage failure.
    fn list_expired(&self, now: Timestamp) -> Result<Vec<Waitpoint>, WaitpointError>;

    /// Revokes (cancels) every open waitpoint for the proposals of
    /// `case_id`, used by a case reset.
    ///
    /// # Errors
    ///
    /// Returns [`WaitpointError::Io`] on a storage failure.
    fn revoke_for_case(&self, case_id: &CaseId, now: Timestamp) -> Result<usize, WaitpointError>;
}

// ============================================================================
// SECTION: Classifier / Draft (AI collaborators)
// ============================================================================

/// One detected canonical constraint tag with the classifier's supporting
/// quote, used to populate `Case::constraints`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedConstraint {
    /// Canonical tag spelling.
    pub tag: String,
    /// Supporting excerpt from the message.
    pub excerpt: Option<String>,
}

/// Coarse classification of an inbound message's intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// The agency quoted a fee.
    FeeNotice,
    /// The agency denied the request.
    Denial,
    /// The agency asked for scope clarification.
    Clarification,
    /// The agency granted the request in part.
    PartialApproval,
    /// The agency granted the request in full.
    FullApproval,
    /// The agency reported no responsive records.
    NoRecordsFound,
    /// The agency acknowledged receipt with no decision yet.
    Acknowledgment,
    /// No agency response has arrived for this cycle (timer-driven, not
    /// produced for an inbound message).
    NoResponse,
    /// None of the above applied cleanly.
    Other,
}

/// Coarse sentiment reading of an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sentiment {
    /// Cooperative, neutral, or positive in tone.
    Neutral,
    /// Terse or unhelpful but not adversarial.
    Negative,
    /// Adversarial or uncooperative.
    Hostile,
}

/// Structured output of classifying one inbound message in thread context
/// (spec §4.5 step 3, §6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    /// Coarse classification of what the agency is communicating.
    pub intent: Intent,
    /// Coarse sentiment reading.
    pub sentiment: Sentiment,
    /// Classifier's confidence in `intent`, in `[0, 1]`.
    pub confidence: f64,
    /// Human-readable bullet points summarizing the message.
    pub key_points: Vec<String>,
    /// Fee amount extracted from the message text, when `intent` is
    /// `FeeNotice`.
    pub extracted_fee_amount: Option<BigDecimal>,
    /// Constraints detected in this message.
    pub constraints_detected: Vec<DetectedConstraint>,
    /// Free-form classifier metadata retained for forward compatibility.
    #[serde(default)]
    pub extra: MetadataMap,
}

/// Errors produced by [`ClassifierPort`] and [`DraftPort`].
#[derive(Debug, Error)]
pub enum AiCollaboratorError {
    /// The call exceeded its timeout after internal retries.
    #[error("classifier/draft call timed out")]
    Timeout,
    /// The remote service returned an error after retries were exhausted.
    #[error("classifier/draft call failed: {0}")]
    Failed(String),
}

/// Context passed to the classifier: case snapshot, the triggering message,
/// the prior thread, and any attachments (spec §4.5, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    /// Snapshot of the case at classification time.
    pub case: Case,
    /// The message being classified.
    pub message: Message,
    /// Prior messages in the same thread, oldest first.
    pub thread: Vec<Message>,
    /// Attachments carried by `message`.
    pub attachments: Vec<Attachment>,
}

/// External AI classifier producing structured [`Analysis`] (spec §6).
pub trait ClassifierPort {
    /// Classifies one inbound message in thread context.
    ///
    /// # Errors
    ///
    /// Returns [`AiCollaboratorError`] after the call's internal retries
    /// are exhausted.
    fn classify(&self, request: &ClassifyRequest) -> Result<Analysis, AiCollaboratorError>;
}

/// A drafted outbound message (spec §6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub body_text: String,
    /// HTML body.
    pub body_html: String,
}

/// Request to draft outbound content for one action type (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRequest {
    /// Snapshot of the case at draft time.
    pub case: Case,
    /// The analysis that motivated this draft, when one exists.
    pub analysis: Option<Analysis>,
    /// Action the draft is being produced for.
    pub action_type: ActionType,
    /// Human instruction steering an adjustment revision, when present.
    pub instruction: Option<String>,
}

/// External draft generator (spec §6).
pub trait DraftPort {
    /// Drafts subject/text/html content for one action.
    ///
    /// # Errors
    ///
    /// Returns [`AiCollaboratorError`] after internal retries are
    /// exhausted.
    fn draft(&self, request: &DraftRequest) -> Result<Draft, AiCollaboratorError>;
}

// ============================================================================
// SECTION: Email transport / Portal worker
// ============================================================================

/// Errors produced by [`EmailTransportPort`] and [`PortalWorkerPort`].
#[derive(Debug, Error)]
pub enum TransportError {
    /// The downstream transport reported a transient (5xx-class) failure;
    /// retryable.
    #[error("transport transient error: {0}")]
    Transient(String),
    /// The downstream transport reported a permanent failure.
    #[error("transport permanent error: {0}")]
    Permanent(String),
}

/// One outbound email to send (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundEmail {
    /// Recipient address.
    pub to: String,
    /// Sender address.
    pub from: String,
    /// Subject line.
    pub subject: String,
    /// Plain-text body.
    pub text: String,
    /// HTML body.
    pub html: String,
    /// Extra transport headers (e.g. `In-Reply-To`).
    pub headers: MetadataMap,
    /// Attachments to include.
    pub attachments: Vec<Attachment>,
    /// Idempotency key equal to the proposal's `execution_key`; the
    /// transport must deduplicate repeated sends carrying the same key.
    pub idempotency_key: String,
}

/// Result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    /// Identifier assigned by the transport provider.
    pub provider_message_id: String,
}

/// SMTP-style outbound email sender (spec §6).
pub trait EmailTransportPort {
    /// Sends `email`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`]; the executor retries
    /// [`TransportError::Transient`] with the same `idempotency_key`.
    fn send(&self, email: &OutboundEmail) -> Result<SendReceipt, TransportError>;
}

/// Portal submission task payload handed to the remote browser-driving
/// worker (spec §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortalSubmission {
    /// Case the submission is for.
    pub case_id: CaseId,
    /// Agency's online submission portal.
    pub portal_url: String,
    /// Portal automation provider name.
    pub provider: String,
    /// Free-form instructions for the worker (what to fill in, attach).
    pub instructions: String,
    /// Identifier of the portal task row tracking this submission.
    pub portal_task_id: String,
    /// Idempotency key equal to the proposal's `execution_key`.
    pub idempotency_key: String,
}

/// Terminal status of a portal submission task (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PortalTaskStatus {
    /// Submitted successfully.
    Success,
    /// Submission failed.
    Failed,
    /// Submission exceeded its hard timeout.
    Timeout,
    /// Cancelled, typically by a superseding approval.
    Cancelled,
}

/// Result of a portal submission task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortalResult {
    /// Final task status.
    pub status: PortalTaskStatus,
    /// Agency-issued confirmation number, when successful.
    pub confirmation_number: Option<String>,
}

/// Durable task handed to the remote portal automation worker (spec §6).
pub trait PortalWorkerPort {
    /// Submits `submission` and blocks the calling worker thread until the
    /// remote task resolves or its hard timeout elapses. Callers invoke
    /// this from inside a durable task, never from a request thread.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the worker cannot even be
    /// dispatched; a reachable worker that itself fails reports that via
    /// [`PortalResult::status`], not an `Err`.
    fn submit(&self, submission: &PortalSubmission) -> Result<PortalResult, TransportError>;
}

// ============================================================================
// SECTION: Notification bus
// ============================================================================

/// Fire-and-forget notification kinds (spec §6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// A case now requires a human decision.
    RequiresHuman,
    /// A proposal executed.
    ProposalExecuted,
    /// A case reached a terminal status.
    CaseClosed,
    /// A non-validation error was recorded to the activity log.
    ErrorRecorded,
}

/// Out-of-band event fanout for UIs (spec §6). Losses are acceptable: no
/// caller waits on or retries a failed [`NotificationPort::notify`].
pub trait NotificationPort {
    /// Best-effort notification; implementations should never let a send
    /// failure propagate to the caller.
    fn notify(&self, kind: NotificationKind, message: &str, case_id: Option<&CaseId>);
}
