// crates/caseflow-logic/src/lib.rs
// ============================================================================
// Crate: caseflow-logic
// Description: Tri-state logic, requirement trees, and a small DSL for
//              expressing policy predicates over arbitrary domain
//              conditions.
// Purpose: Give policy components (decision routing, planner rules) a
//          shared, fail-closed way to compose "did we confirm this" logic
//          without hardcoding thresholds as Rust constants.
// ============================================================================

//! Tri-state requirement trees and a compact DSL for authoring them.
//!
//! This crate has no domain knowledge of cases, proposals, or evidence — its
//! leaf condition type is generic (`Requirement<P>`). Callers supply `P` and
//! a [`tristate::TriStateConditionEval<P>`] implementation that knows how to
//! resolve their own conditions.

pub mod dsl;
mod requirement;
mod serde_support;
mod tristate;

pub use requirement::GroupCounts;
pub use requirement::Requirement;
pub use requirement::RequirementTrace;
pub use serde_support::RequirementValidationError;
pub use serde_support::RequirementValidator;
pub use tristate::BochvarLogic;
pub use tristate::KleeneLogic;
pub use tristate::LogicMode;
pub use tristate::TriLogic;
pub use tristate::TriState;
pub use tristate::TriStateConditionEval;
