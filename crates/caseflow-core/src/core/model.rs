// crates/caseflow-core/src/core/model.rs
// ============================================================================
// Module: Caseflow Data Model
// Description: Case/Message/Proposal/AgentRun/CaseOperationLock/Waitpoint/
//              Execution/ActivityLog records and their closed sub-enums.
// Purpose: The durable shape every store, service, and test in this system
//          reads and writes; everything else is built around these records.
// Dependencies: caseflow-core::identifiers, caseflow-core::time, bigdecimal,
//               serde, serde_json
// ============================================================================

//! ## Overview
//! A `Case` owns its `Message`s, `Proposal`s, `AgentRun`s, `Execution`s, and
//! `ActivityLog` entries exclusively; deleting a case cascades through all of
//! them. Threads are case-scoped; attachments are owned by the message that
//! carries them.
//!
//! Terminal case statuses (`Completed`, `Cancelled`) forbid further mutation
//! except `outcome_summary`. A case with `requires_human = true` must have a
//! `pause_reason` and exactly one pending proposal — enforced by the callers
//! that build these records, not by the types themselves (see
//! `case_machine` for the guarded transition path).

use std::collections::BTreeMap;
use std::collections::BTreeSet;

use bigdecimal::BigDecimal;
use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CaseId;
use crate::core::identifiers::CaseLockToken;
use crate::core::identifiers::ExecutionId;
use crate::core::identifiers::ExecutionKey;
use crate::core::identifiers::MessageId;
use crate::core::identifiers::ProposalId;
use crate::core::identifiers::RunId;
use crate::core::identifiers::ThreadId;
use crate::core::identifiers::WaitpointToken;
use crate::core::time::Timestamp;

/// Free-form structured metadata, decoded strictly where a closed shape is
/// known and retained verbatim otherwise, so forward-incompatible fields
/// survive a round trip instead of being silently dropped.
pub type MetadataMap = BTreeMap<String, serde_json::Value>;

// ============================================================================
// SECTION: Case
// ============================================================================

/// Lifecycle status of a case. See `case_machine` for the guard table that
/// governs legal transitions between these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Request drafted but not yet sent.
    Draft,
    /// Draft approved, queued to send.
    ReadyToSend,
    /// Initial request sent, no response yet.
    Sent,
    /// Sent and actively awaiting the agency's response.
    AwaitingResponse,
    /// An agency response has been received and processed.
    Responded,
    /// A human must review the case before it can proceed.
    NeedsHumanReview,
    /// The case needs a phone call to the agency to proceed.
    NeedsPhoneCall,
    /// The case is missing requester contact information.
    NeedsContactInfo,
    /// A fee quote is pending human approval.
    NeedsHumanFeeApproval,
    /// An online portal submission is in progress.
    PortalInProgress,
    /// The case reached a final outcome.
    Completed,
    /// The case was withdrawn or abandoned before completion.
    Cancelled,
}

impl CaseStatus {
    /// Returns `true` for the terminal statuses that forbid further mutation
    /// (aside from `outcome_summary`).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Returns `true` for the side-branch "needs a human" statuses.
    #[must_use]
    pub const fn is_review_state(self) -> bool {
        matches!(
            self,
            Self::NeedsHumanReview
                | Self::NeedsPhoneCall
                | Self::NeedsContactInfo
                | Self::NeedsHumanFeeApproval
        )
    }
}

/// Per-case autonomy policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutopilotMode {
    /// Every proposal requires a human decision.
    Manual,
    /// A narrow, high-confidence subset of action types may auto-execute.
    Supervised,
    /// The configured `AUTO_SAFE` action types may auto-execute.
    Auto,
}

/// Why a case is currently paused for human attention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseReason {
    /// A fee quote needs approval.
    FeeQuote,
    /// The agency issued a denial that needs a human call.
    Denial,
    /// The agency is asking for scope clarification.
    Scope,
    /// The material is sensitive and needs a human look.
    Sensitive,
    /// The agency requires identity verification.
    IdRequired,
    /// Escalated for a reason not covered by the other variants.
    Manual,
}

/// Status of a fee quote attached to a case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeeQuoteStatus {
    /// The agency quoted a fee; no response sent yet.
    Quoted,
    /// The requester accepted the fee.
    Accepted,
    /// The requester is negotiating the fee down.
    Negotiating,
    /// The requester declined to pay.
    Declined,
}

/// A fee quote from the agency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeQuote {
    /// Quoted amount.
    pub amount: BigDecimal,
    /// ISO 4217 currency code.
    pub currency: String,
    /// When the quote was received.
    pub quoted_at: Timestamp,
    /// Current status of the quote.
    pub status: FeeQuoteStatus,
}

/// Disposition of one scope item requested in the original ask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScopeItemStatus {
    /// Requested, agency has not yet responded.
    Requested,
    /// Agency confirmed the records exist and will be disclosed.
    ConfirmedAvailable,
    /// Agency asserts an exemption applies.
    NotDisclosable,
    /// Agency does not hold responsive records.
    NotHeld,
}

/// One item of the case's scope and its current status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScopeItem {
    /// Human-readable description of the requested item.
    pub name: String,
    /// Current disposition.
    pub status: ScopeItemStatus,
    /// Agency-supplied reason, when status is not `Requested`.
    pub reason: Option<String>,
}

/// A canonical tag summarizing something the agency has asserted about a
/// case (`fee_required`, `exemption`, `not_held`, ...). Open-ended by
/// design: new tags do not require a schema change, but producers are
/// expected to use the canonical spelling documented in the glossary.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintTag(String);

impl ConstraintTag {
    /// Creates a constraint tag from its canonical string form.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Returns the tag as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConstraintTag {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Final disposition of a completed or cancelled case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeType {
    /// All requested records were disclosed.
    Fulfilled,
    /// Some but not all requested records were disclosed.
    PartiallyFulfilled,
    /// The agency denied the request in full.
    Denied,
    /// The requester withdrew the request.
    Withdrawn,
    /// The agency reported no responsive records exist.
    NoRecordsFound,
    /// The case was abandoned without a final agency response.
    Abandoned,
}

/// One records request against one agency: the central, long-lived record
/// that every message, proposal, run, and activity entry is scoped to.
///
/// # Invariants
/// - `requires_human = true` implies `pause_reason.is_some()` and exactly
///   one pending proposal for this case (enforced by the component that
///   sets this flag, not by this type).
/// - `status.is_terminal()` forbids further mutation except
///   `outcome_summary`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    /// Case identifier.
    pub id: CaseId,
    /// Current lifecycle status.
    pub status: CaseStatus,
    /// Free-text status detail shown to the requester, not load-bearing.
    pub substatus: Option<String>,
    /// Autonomy policy governing whether proposals can auto-execute.
    pub autopilot_mode: AutopilotMode,
    /// Whether the case currently requires a human decision.
    pub requires_human: bool,
    /// Why the case is paused for a human, when `requires_human`.
    pub pause_reason: Option<PauseReason>,
    /// Agency contact address used for outbound email.
    pub agency_email: Option<String>,
    /// Agency's online submission portal, when one exists.
    pub portal_url: Option<String>,
    /// Statutory or agency-quoted response deadline.
    pub deadline_date: Option<Timestamp>,
    /// Current fee quote, when one has been issued.
    pub fee_quote: Option<FeeQuote>,
    /// Ordered list of requested items and their disposition.
    pub scope_items: Vec<ScopeItem>,
    /// Canonical tags summarizing agency assertions about this case.
    pub constraints: BTreeSet<ConstraintTag>,
    /// When the initial or a follow-up request was last sent.
    pub send_date: Option<Timestamp>,
    /// Most recent portal worker status, when a portal submission is or was
    /// in progress.
    pub last_portal_status: Option<String>,
    /// When the case was closed, for completed or cancelled cases.
    pub closed_at: Option<Timestamp>,
    /// Final disposition, set when the case reaches a terminal status.
    pub outcome_type: Option<OutcomeType>,
    /// Human-readable summary of the final disposition.
    pub outcome_summary: Option<String>,
}

// ============================================================================
// SECTION: Message
// ============================================================================

/// Direction of a message relative to the requester's system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    /// Received from the agency (or portal, or other external source).
    Inbound,
    /// Sent by this system to the agency.
    Outbound,
}

/// An attachment carried by a message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// Original filename.
    pub filename: String,
    /// MIME content type.
    pub content_type: String,
    /// Storage location (provider-specific URI or path).
    pub uri: String,
    /// Size in bytes.
    pub size_bytes: u64,
}

/// One inbound or outbound communication tied to a case.
///
/// # Invariants
/// - Inbound messages are immutable except for `case_id`/`thread_id`
///   attachment and `processed_at`/`processed_run_id`, which are set exactly
///   once by the run that consumes them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Owning case, `None` until ingestion attaches it.
    pub case_id: Option<CaseId>,
    /// Conversation thread, `None` until attachment resolves it.
    pub thread_id: Option<ThreadId>,
    /// Inbound or outbound.
    pub direction: MessageDirection,
    /// Sender address.
    pub from: String,
    /// Recipient address.
    pub to: String,
    /// Subject line.
    pub subject: Option<String>,
    /// Plain-text body.
    pub body_text: Option<String>,
    /// HTML body.
    pub body_html: Option<String>,
    /// Identifier assigned by the transport provider (email message-id,
    /// portal submission id, ...).
    pub provider_message_id: Option<String>,
    /// When the message was received, for inbound messages.
    pub received_at: Option<Timestamp>,
    /// When the message was sent, for outbound messages.
    pub sent_at: Option<Timestamp>,
    /// When the `InboundPipeline` finished processing this message.
    pub processed_at: Option<Timestamp>,
    /// The run that processed this message, set alongside `processed_at`.
    pub processed_run_id: Option<RunId>,
    /// Transport the message arrived or was sent over (`email`, `portal`,
    /// ...). Open-ended like `ConstraintTag`, kept as plain text.
    pub message_type: String,
    /// Attachments carried by this message.
    pub attachments: Vec<Attachment>,
}

// ============================================================================
// SECTION: Proposal
// ============================================================================

/// The closed set of actions a proposal can plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Send the initial records request.
    SendInitialRequest,
    /// Send a status-check follow-up.
    SendFollowup,
    /// Ask the agency to clarify scope.
    SendClarification,
    /// Push back on a denial.
    SendRebuttal,
    /// File a formal appeal.
    SendAppeal,
    /// Acknowledge a partial approval.
    RespondPartialApproval,
    /// Accept a quoted fee.
    AcceptFee,
    /// Counter-offer on a quoted fee.
    NegotiateFee,
    /// Decline to pay a quoted fee.
    DeclineFee,
    /// Ask the agency to waive the fee.
    SendFeeWaiverRequest,
    /// Hand the case to a human with no specific next action chosen.
    Escalate,
    /// Research the agency's disclosure practices before proceeding.
    ResearchAgency,
    /// Rewrite the request for clarity or narrower scope.
    ReformulateRequest,
    /// Submit the request through the agency's online portal.
    SubmitPortal,
    /// Email a filled PDF form required by the agency.
    SendPdfEmail,
    /// Send a status update to the requester.
    SendStatusUpdate,
    /// Close the case.
    CloseCase,
    /// Withdraw the request.
    Withdraw,
    /// No action selected; the planner found nothing to do.
    None,
}

/// A reviewable option offered alongside a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GateOption {
    /// Execute the proposal as planned.
    Approve,
    /// Revise the draft and resubmit for approval.
    Adjust,
    /// Discard the proposal without acting.
    Dismiss,
    /// Discard and re-run research before replanning.
    RetryResearch,
}

/// Status of a proposal.
///
/// `Executing` is internal and never externally visible; it exists so the
/// Executor's single-flight claim is an ordinary compare-and-set row update
/// (`status='APPROVED' -> 'EXECUTING'`) rather than a separate claims table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Awaiting a human decision.
    PendingApproval,
    /// Blocked on a precondition other than a human decision.
    Blocked,
    /// A human decision was recorded; a run is resuming to act on it.
    DecisionReceived,
    /// Approved and queued for execution (auto or human-approved).
    Approved,
    /// Claimed by an executor worker; internal, never externally visible.
    Executing,
    /// Submitted to a portal worker; awaiting its result.
    PendingPortal,
    /// The planned action was carried out.
    Executed,
    /// Discarded without acting.
    Dismissed,
    /// The case (not just this proposal) was withdrawn.
    Withdrawn,
    /// A human asked for a revised draft; a replacement proposal follows.
    AdjustmentRequested,
}

/// A recorded human decision on a proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HumanDecision {
    /// The chosen gate option.
    pub action: GateOption,
    /// Free-text instruction, required for `Escalate + Approve`.
    pub instruction: Option<String>,
    /// Free-text reason for the decision.
    pub reason: Option<String>,
    /// Caller-supplied routing hint (e.g. which reviewer queue to bypass).
    pub route_mode: Option<String>,
    /// Identifier of the human who made the decision.
    pub user_id: Option<String>,
}

/// A concrete, reviewable plan for the next action on a case.
///
/// # Invariants
/// - `status == PendingApproval` implies `execution_key.is_none()`.
/// - `status == Executed` implies `execution_key.is_some()` and that key is
///   globally unique across all proposals.
/// - Status transitions are forward-only, except the dispatch-failure
///   rollback from `Executing`/`DecisionReceived` back to `PendingApproval`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    /// Proposal identifier.
    pub id: ProposalId,
    /// Owning case.
    pub case_id: CaseId,
    /// Inbound message that triggered this proposal, `None` for
    /// timer-triggered proposals.
    pub trigger_message_id: Option<MessageId>,
    /// Chosen action.
    pub action_type: ActionType,
    /// Current status.
    pub status: ProposalStatus,
    /// Planner's confidence in this plan, in `[0, 1]`.
    pub confidence: f64,
    /// Hard concerns that force human review under an `Auto` policy.
    pub risk_flags: Vec<String>,
    /// Soft issues surfaced for a reviewer's attention.
    pub warnings: Vec<String>,
    /// Gate options a human reviewer may choose between.
    pub gate_options: Vec<GateOption>,
    /// Drafted outbound subject, for `Send*`/`AcceptFee` actions.
    pub draft_subject: Option<String>,
    /// Drafted outbound plain-text body.
    pub draft_body_text: Option<String>,
    /// Drafted outbound HTML body.
    pub draft_body_html: Option<String>,
    /// Human-readable bullet points explaining the plan.
    pub reasoning: Vec<String>,
    /// Open waitpoint parking a run on this proposal's decision.
    pub waitpoint_token: Option<WaitpointToken>,
    /// Idempotency key for the Executor's side effect, set once approved.
    pub execution_key: Option<ExecutionKey>,
    /// Run that produced (or is resuming to act on) this proposal.
    pub run_id: Option<RunId>,
    /// Recorded human decision, once one has been made.
    pub human_decision: Option<HumanDecision>,
    /// When the proposal's action was executed.
    pub executed_at: Option<Timestamp>,
    /// Downstream email job identifier, for email-sending actions.
    pub email_job_id: Option<String>,
    /// Idempotency key for proposal creation itself: a hash of
    /// `(case_id, trigger_message_id or timer epoch bucket, action_type,
    /// draft digest)`. A second planner pass with a matching key returns
    /// the existing row instead of inserting a duplicate.
    pub proposal_key: String,
    /// Number of times this proposal's draft has been revised via
    /// `Adjust`, starting at zero.
    pub adjustment_count: u32,
}

// ============================================================================
// SECTION: AgentRun
// ============================================================================

/// What kind of event started this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunTrigger {
    /// An inbound message was attached and needs processing.
    InboundMessage,
    /// The case's initial request needs to be planned and sent.
    InitialRequest,
    /// Resuming after a human decision was recorded.
    HumanReviewResolution,
    /// A manual `reset-to-last-inbound` operation.
    ResetToLastInbound,
    /// A scheduled timer tick (deadline checks, follow-up cadence).
    Timer,
}

/// Lifecycle status of an orchestration attempt.
///
/// # Invariants
/// - At most one of a case's runs may be in `Queued`, `Running`, or
///   `Waiting` at any instant; a second live run is a reconciliation
///   signal, not a state this type itself prevents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Row created, not yet claimed by a worker.
    Created,
    /// Claimed by the dispatcher, waiting for a worker slot.
    Queued,
    /// Actively executing.
    Running,
    /// Suspended on a waitpoint.
    Waiting,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Cancelled, typically superseded by a newer compatible run.
    Cancelled,
}

impl RunStatus {
    /// Returns `true` for the statuses counted as "a run is live" for the
    /// at-most-one-live-run-per-case invariant.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Queued | Self::Running | Self::Waiting)
    }
}

/// One orchestration attempt against a case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRun {
    /// Run identifier.
    pub id: RunId,
    /// Owning case.
    pub case_id: CaseId,
    /// What started this run.
    pub trigger_type: RunTrigger,
    /// Current status.
    pub status: RunStatus,
    /// When the run started executing.
    pub started_at: Option<Timestamp>,
    /// When the run finished, in any terminal status.
    pub ended_at: Option<Timestamp>,
    /// Error detail, when `status == Failed`.
    pub error: Option<String>,
    /// Opaque continuation token for the orchestration engine's own
    /// suspended-execution bookkeeping. Treated as a black box here; see
    /// the module-level note on the "coroutine" suspension model.
    pub continuation_token: Option<String>,
    /// Inbound message that triggered this run, when applicable.
    pub message_id: Option<MessageId>,
    /// Proposal this run most recently produced or is resuming into.
    pub proposal_id: Option<ProposalId>,
    /// Additional run metadata, decoded strictly where a shape is known and
    /// retained verbatim otherwise.
    pub metadata: MetadataMap,
}

// ============================================================================
// SECTION: CaseOperationLock
// ============================================================================

/// A named mutual-exclusion lock scoped to one case and one operation
/// (`transition`, `reset_to_last_inbound`, ...).
///
/// # Invariants
/// - Acquisition is a conditional upsert: it succeeds only when no row
///   exists for `(case_id, operation)` or the existing row's `expires_at`
///   has passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseOperationLock {
    /// Locked case.
    pub case_id: CaseId,
    /// Named operation this lock guards.
    pub operation: String,
    /// Token the holder must present to `Release`/`Refresh`.
    pub token: CaseLockToken,
    /// Run holding the lock, when acquired on behalf of a run.
    pub holder_run_id: Option<RunId>,
    /// When the lock was acquired.
    pub acquired_at: Timestamp,
    /// When the lock expires if not refreshed or released.
    pub expires_at: Timestamp,
}

// ============================================================================
// SECTION: Waitpoint
// ============================================================================

/// The payload delivered to a parked run when its waitpoint completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaitpointPayload {
    /// Chosen gate option.
    pub action: GateOption,
    /// Free-text instruction accompanying the decision.
    pub instruction: Option<String>,
    /// Free-text reason accompanying the decision.
    pub reason: Option<String>,
}

/// A single-use durable suspension point parking a run on a proposal's
/// pending decision.
///
/// # Invariants
/// - First `Complete(token, payload)` wins: `completed_at` is a
///   compare-and-set written exactly once, transitioning from `None` to
///   `Some`. Subsequent completions observe `completed_at.is_some()` and
///   must be rejected by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Waitpoint {
    /// Unguessable token identifying this waitpoint.
    pub token: WaitpointToken,
    /// Proposal this waitpoint is parking a decision for.
    pub proposal_id: ProposalId,
    /// When the waitpoint was created.
    pub created_at: Timestamp,
    /// When the waitpoint expires if never completed.
    pub expires_at: Timestamp,
    /// When the waitpoint was completed, `None` while still open.
    pub completed_at: Option<Timestamp>,
    /// The payload it completed with, set alongside `completed_at`.
    pub completion_payload: Option<WaitpointPayload>,
}

// ============================================================================
// SECTION: Execution
// ============================================================================

/// The kind of side effect an execution record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionKind {
    /// An outbound email was sent.
    EmailSend,
    /// A portal submission was enqueued.
    PortalSubmission,
    /// An outbound message row was written without a live transport call
    /// (e.g. a manually-recorded phone call outcome).
    OutboundMessageWrite,
}

/// Status of one side-effect attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// The side effect was attempted and has not yet resolved.
    Started,
    /// The side effect completed successfully.
    Completed,
    /// The side effect failed.
    Failed,
}

/// An append-only record of one side effect, the source of truth for "what
/// actually happened" when reconciling a partial failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Execution {
    /// Execution identifier.
    pub id: ExecutionId,
    /// Proposal this execution carries out.
    pub proposal_id: ProposalId,
    /// Owning case.
    pub case_id: CaseId,
    /// Kind of side effect performed.
    pub kind: ExecutionKind,
    /// Identifier assigned by the downstream transport provider.
    pub provider_message_id: Option<String>,
    /// Current status.
    pub status: ExecutionStatus,
    /// When the attempt started.
    pub started_at: Timestamp,
    /// When the attempt resolved.
    pub completed_at: Option<Timestamp>,
    /// Error detail, when `status == Failed`.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: ActivityLog
// ============================================================================

/// One append-only entry in a case's audit stream. Every state transition
/// appends here; this is also the system's primary logging surface (see the
/// crate-level documentation on ambient observability).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    /// Entry identifier.
    pub id: crate::core::identifiers::ActivityId,
    /// Owning case.
    pub case_id: CaseId,
    /// Monotonically increasing sequence number within the case.
    pub seq: u64,
    /// Event type (`case_sent`, `proposal_dispatch_failed`, ...).
    pub event_type: String,
    /// Human-readable description.
    pub description: String,
    /// Structured metadata enough to resume manually if this event
    /// represents a failure.
    pub metadata: MetadataMap,
    /// When the event was recorded.
    pub recorded_at: Timestamp,
}
