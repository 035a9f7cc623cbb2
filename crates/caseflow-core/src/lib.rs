// crates/caseflow-core/src/lib.rs
// ============================================================================
// Crate: caseflow-core
// Description: Pure domain model, identifiers, case state machine, error
//              taxonomy, and port traits shared by every store, provider,
//              and service crate in this system.
// Purpose: Keep the parts of the system that decide WHAT should happen free
//          of I/O, wall-clock reads, and backend-specific types, so the
//          state machine and policy evaluation stay deterministic and
//          testable without a database or network in the loop.
// ============================================================================

//! Caseflow's domain crate.
//!
//! Nothing in this crate performs I/O or reads the wall clock: [`Timestamp`]
//! values are always supplied by a caller, and every side effect (storage,
//! dispatch, email, portal automation, classification, drafting) is named
//! as a trait in [`interfaces`] for an outer crate to implement.

#![forbid(unsafe_code)]

pub mod core;
pub mod interfaces;

pub use core::case_machine;
pub use core::case_machine::CaseEvent;
pub use core::case_machine::TransitionRecord;
pub use core::error::CaseflowError;
pub use core::hashing;
pub use core::hashing::HashAlgorithm;
pub use core::hashing::HashDigest;
pub use core::hashing::HashingError;
pub use core::identifiers::ActivityId;
pub use core::identifiers::CaseId;
pub use core::identifiers::CaseLockToken;
pub use core::identifiers::ExecutionId;
pub use core::identifiers::ExecutionKey;
pub use core::identifiers::IdempotencyKey;
pub use core::identifiers::MessageId;
pub use core::identifiers::ProposalId;
pub use core::identifiers::RunId;
pub use core::identifiers::TenantId;
pub use core::identifiers::ThreadId;
pub use core::identifiers::WaitpointToken;
pub use core::model::ActionType;
pub use core::model::ActivityLogEntry;
pub use core::model::AgentRun;
pub use core::model::Attachment;
pub use core::model::AutopilotMode;
pub use core::model::Case;
pub use core::model::CaseOperationLock;
pub use core::model::CaseStatus;
pub use core::model::ConstraintTag;
pub use core::model::Execution;
pub use core::model::ExecutionKind;
pub use core::model::ExecutionStatus;
pub use core::model::FeeQuote;
pub use core::model::FeeQuoteStatus;
pub use core::model::GateOption;
pub use core::model::HumanDecision;
pub use core::model::Message;
pub use core::model::MessageDirection;
pub use core::model::MetadataMap;
pub use core::model::OutcomeType;
pub use core::model::PauseReason;
pub use core::model::Proposal;
pub use core::model::ProposalStatus;
pub use core::model::RunStatus;
pub use core::model::RunTrigger;
pub use core::model::ScopeItem;
pub use core::model::ScopeItemStatus;
pub use core::model::Waitpoint;
pub use core::model::WaitpointPayload;
pub use core::time::Timestamp;
pub use interfaces::AiCollaboratorError;
pub use interfaces::Analysis;
pub use interfaces::CaseLockPort;
pub use interfaces::ClassifierPort;
pub use interfaces::ClassifyRequest;
pub use interfaces::Debounce;
pub use interfaces::DebounceMode;
pub use interfaces::DetectedConstraint;
pub use interfaces::DispatchError;
pub use interfaces::DispatcherPort;
pub use interfaces::Draft;
pub use interfaces::DraftPort;
pub use interfaces::DraftRequest;
pub use interfaces::EmailTransportPort;
pub use interfaces::FencingInfo;
pub use interfaces::Intent;
pub use interfaces::LockError;
pub use interfaces::NotificationKind;
pub use interfaces::NotificationPort;
pub use interfaces::OutboundEmail;
pub use interfaces::PortalResult;
pub use interfaces::PortalSubmission;
pub use interfaces::PortalTaskStatus;
pub use interfaces::PortalWorkerPort;
pub use interfaces::SendReceipt;
pub use interfaces::Sentiment;
pub use interfaces::Store;
pub use interfaces::StoreError;
pub use interfaces::TransportError;
pub use interfaces::TriggerHandle;
pub use interfaces::TriggerOptions;
pub use interfaces::WaitpointError;
pub use interfaces::WaitpointOutcome;
pub use interfaces::WaitpointPort;
