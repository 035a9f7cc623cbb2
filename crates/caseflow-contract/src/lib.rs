// crates/caseflow-contract/src/lib.rs
// ============================================================================
// Crate: caseflow-contract
// Description: The closed ActionType/ProposalStatus lexicon and the minimal
//              HTTP surface, expressed as a versioned, hashed artifact
//              bundle for SDK generation and request/response validation.
// Purpose: Give caseflow-service and caseflow-sdk-gen one generated source
//          of truth for "what actions exist", "what statuses a proposal can
//          be in", and "what the HTTP/SSE surface looks like", instead of
//          each crate hand-maintaining its own copy.
// ============================================================================

//! Generates and verifies the caseflow wire contract: JSON Schema for every
//! [`caseflow_core::ActionType`] draft request/response, the
//! [`caseflow_core::ProposalStatus`] lexicon with its legal predecessors,
//! and the endpoint contracts for the minimal HTTP/SSE surface.

pub mod contract;
pub mod tooling;
pub mod types;

use std::path::PathBuf;

use thiserror::Error;

pub use contract::ContractBuilder;
pub use types::ActionContract;
pub use types::ActionExample;
pub use types::ContractArtifact;
pub use types::ContractBundle;
pub use types::ContractManifest;
pub use types::EndpointContract;
pub use types::HttpMethod;
pub use types::ManifestArtifact;
pub use types::ProposalStatusContract;

/// Errors produced while generating, writing, or verifying the contract
/// bundle.
#[derive(Debug, Error)]
pub enum ContractError {
    /// Serializing an artifact to JSON failed.
    #[error("contract serialization error: {0}")]
    Serialization(String),
    /// Artifact generation produced an invalid bundle (duplicate path,
    /// empty path, ...).
    #[error("contract generation error: {0}")]
    Generation(String),
    /// The output directory path is unsafe or otherwise unusable.
    #[error("invalid output path: {0}")]
    OutputPath(PathBuf),
    /// An I/O error occurred while reading or writing artifacts.
    #[error("contract io error: {0}")]
    Io(String),
}
