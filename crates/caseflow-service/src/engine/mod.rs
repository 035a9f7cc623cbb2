// crates/caseflow-service/src/engine/mod.rs
// ============================================================================
// Module: Orchestration Engine
// Description: The synchronous core that turns inbound messages and human
//              decisions into case transitions, proposals, and side effects.
// Purpose: Everything here is ordinary synchronous Rust over the
//          caseflow-core port traits; the only async code in this crate is
//          the HTTP/SSE shell in `server`, which reaches into this module via
//          `tokio::task::spawn_blocking`.
// Dependencies: caseflow-core, caseflow-config, caseflow-logic,
//               caseflow-providers
// ============================================================================

pub mod clock;
pub mod context;
pub mod decisioner;
pub mod dispatcher;
pub mod executor;
pub mod lock;
pub mod pipeline;
pub mod planner;
pub mod reaper;
pub mod reset;
mod test_support;
pub mod transition;

pub use context::EngineContext;
pub use decisioner::decide;
pub use decisioner::dispatch_resume;
pub use decisioner::resolve_human_decision;
pub use decisioner::resume_decision;
pub use decisioner::DecisionOutcome;
pub use decisioner::HumanResolutionRequest;
pub use decisioner::ResolutionOutcome;
pub use dispatcher::InProcessDispatcher;
pub use executor::execute;
pub use executor::run_portal_submission;
pub use lock::with_case_lock;
pub use pipeline::attach_inbound_message;
pub use pipeline::process_inbound;
pub use planner::plan;
pub use reaper::sweep;
pub use reaper::ReaperReport;
pub use reset::reset_to_last_inbound;
pub use transition::transition_case;
