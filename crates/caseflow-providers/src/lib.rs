// crates/caseflow-providers/src/lib.rs
// ============================================================================
// Crate: caseflow-providers
// Description: HTTP-backed and deterministic stub implementations of the
//              four external collaborator ports (classifier, draft,
//              email transport, portal worker), plus a registry that
//              resolves which to use from configuration.
// Purpose: Keep the orchestration engine's business logic free of any
//          concrete collaborator backend; everything here is an adapter.
// Dependencies: caseflow-core, caseflow-config, reqwest, serde_json
// ============================================================================

//! ## Overview
//! This crate ships adapters for the four collaborator ports defined in
//! `caseflow-core::interfaces`: classification, drafting, email delivery,
//! and portal submission. [`CollaboratorSet`] wires the right adapter per
//! endpoint from a [`caseflow_config::ProvidersConfig`].
//! Invariants:
//! - HTTP adapters never retry internally; retry and backoff belong to the
//!   caller's dispatch loop.
//! - Stub adapters are deterministic and never touch the network.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod http;
pub mod registry;
pub mod stub;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use http::HttpClassifierPort;
pub use http::HttpDraftPort;
pub use http::HttpEmailTransportPort;
pub use http::HttpPortalWorkerPort;
pub use http::HttpProviderConfig;
pub use registry::CollaboratorSet;
pub use stub::StubClassifierPort;
pub use stub::StubDraftPort;
pub use stub::StubEmailTransportPort;
pub use stub::StubPortalWorkerPort;

#[cfg(test)]
mod tests;
