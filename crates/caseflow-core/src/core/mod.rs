// crates/caseflow-core/src/core/mod.rs
// ============================================================================
// Module: Caseflow Core
// Description: Data model, identifiers, error taxonomy, and the case state
//              machine shared by every store, service, and test in this
//              system.
// Purpose: Group the pure, dependency-light domain types so higher layers
//          (store, providers, service) depend on one stable module path.
// ============================================================================

pub mod case_machine;
pub mod error;
pub mod hashing;
pub mod identifiers;
pub mod model;
pub mod time;
