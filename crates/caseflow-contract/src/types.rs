// crates/caseflow-contract/src/types.rs
// ============================================================================
// Module: Contract Types
// Description: Shared data models for caseflow contract artifacts.
// Purpose: Provide canonical shapes for the generated schema bundle, the
//          closed action/status lexicon, and the HTTP surface contract.
// Dependencies: caseflow-core, serde, serde_json
// ============================================================================

//! ## Overview
//! This module defines the typed contract shapes serialized into the
//! generated artifact bundle under the configured output directory. These
//! structures are the canonical source for SDK generation and for the
//! request/response validation `caseflow-service` applies at its HTTP
//! boundary.

// ============================================================================
// SECTION: Imports
// ============================================================================

use caseflow_core::ActionType;
use caseflow_core::ProposalStatus;
use caseflow_core::hashing::HashAlgorithm;
use caseflow_core::hashing::HashDigest;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

// ============================================================================
// SECTION: Manifest Types
// ============================================================================

/// Manifest describing the generated contract artifacts.
///
/// # Invariants
/// - When produced by [`crate::ContractBuilder`], `contract_version` matches
///   the crate version that generated the artifacts.
/// - When produced by [`crate::ContractBuilder`], `artifacts` are ordered
///   by their `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractManifest {
    /// Contract version identifier (matches the crate version).
    pub contract_version: String,
    /// Hash algorithm used for artifact digests.
    pub hash_algorithm: HashAlgorithm,
    /// Artifacts included in the bundle, ordered by path.
    pub artifacts: Vec<ManifestArtifact>,
}

/// Manifest entry describing a single artifact.
///
/// # Invariants
/// - `path` is a safe, relative path under the output directory.
/// - `digest` is computed using `hash_algorithm` from the associated
///   [`ContractManifest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestArtifact {
    /// Relative artifact path under the output directory.
    pub path: String,
    /// Artifact content type.
    pub content_type: String,
    /// Content digest for the artifact payload.
    pub digest: HashDigest,
}

// ============================================================================
// SECTION: Bundle Types
// ============================================================================

/// Generated contract bundle with artifacts and manifest metadata.
///
/// # Invariants
/// - `manifest` is derived from `artifacts` and matches their digests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractBundle {
    /// Manifest describing the artifacts.
    pub manifest: ContractManifest,
    /// Artifact payloads included in the bundle.
    pub artifacts: Vec<ContractArtifact>,
}

/// Artifact payload with content bytes.
///
/// # Invariants
/// - `path` is a safe, relative path under the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    /// Relative artifact path under the output directory.
    pub path: String,
    /// MIME content type for the artifact.
    pub content_type: String,
    /// Serialized artifact payload bytes.
    pub bytes: Vec<u8>,
}

// ============================================================================
// SECTION: Action Lexicon
// ============================================================================

/// Contract describing one member of the closed [`ActionType`] lexicon:
/// the draft request/response schemas a `caseflow-providers` draft
/// implementation must honor, plus human-facing notes.
///
/// # Invariants
/// - `action_type` values are unique across a generated bundle.
/// - `input_schema` and `output_schema` are JSON Schema payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionContract {
    /// Action this contract describes.
    pub action_type: ActionType,
    /// Human-facing summary of what executing this action does.
    pub description: String,
    /// JSON schema for the draft request payload.
    pub input_schema: Value,
    /// JSON schema for the draft response payload.
    pub output_schema: Value,
    /// Whether this action type sends agency-facing content (as opposed to
    /// an internal bookkeeping action like `CloseCase`).
    pub produces_outbound_content: bool,
    /// Example request/response pairs for documentation and SDKs.
    pub examples: Vec<ActionExample>,
}

/// Example draft request/response pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionExample {
    /// Short example description.
    pub description: String,
    /// Example input payload.
    pub input: Value,
    /// Example output payload.
    pub output: Value,
}

/// One entry of the closed [`ProposalStatus`] lexicon, naming which
/// statuses are legal predecessors (spec §3's forward-only invariant).
///
/// # Invariants
/// - `status` values are unique across a generated bundle.
/// - `predecessors` only ever names other statuses in the same lexicon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalStatusContract {
    /// Status this entry describes.
    pub status: ProposalStatus,
    /// Human-facing description of the status.
    pub description: String,
    /// Statuses a proposal may transition from into this one.
    pub predecessors: Vec<ProposalStatus>,
    /// `true` when this status is terminal (no further transitions).
    pub terminal: bool,
}

// ============================================================================
// SECTION: HTTP Surface Contract
// ============================================================================

/// HTTP method of an [`EndpointContract`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET.
    Get,
    /// POST.
    Post,
}

/// Contract describing one endpoint of the minimal HTTP/SSE surface (spec
/// §6): request/response schemas and the path template.
///
/// # Invariants
/// - `path_template` uses `{name}` placeholders matching `path_params`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointContract {
    /// Endpoint name, stable across versions.
    pub name: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Path template, e.g. `/cases/{case_id}/messages`.
    pub path_template: String,
    /// Path parameter names appearing in `path_template`.
    pub path_params: Vec<String>,
    /// Endpoint description.
    pub description: String,
    /// JSON schema for the request body, when the method accepts one.
    pub request_schema: Option<Value>,
    /// JSON schema for the response body.
    pub response_schema: Value,
    /// `true` when the response is a Server-Sent Events stream rather than
    /// a single JSON document.
    pub is_event_stream: bool,
}
