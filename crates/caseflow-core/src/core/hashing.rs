// crates/caseflow-core/src/core/hashing.rs
// ============================================================================
// Module: Caseflow Hashing
// Description: Content hashing over raw bytes and canonical JSON.
// Purpose: Give the planner a stable `proposal_key` digest and the broker a
//          way to verify delivered content against its declared hash.
// Dependencies: sha2, serde_jcs
// ============================================================================

//! ## Overview
//! [`hash_bytes`] hashes raw bytes directly. [`hash_canonical_json`] first
//! serializes a [`serde_json::Value`] to its RFC 8785-style canonical form
//! (via `serde_jcs`) so two semantically identical JSON documents with
//! different key ordering or whitespace hash identically.

use serde::Deserialize;
use serde::Serialize;
use sha2::Digest;
use sha2::Sha256;

/// Supported hash algorithms.
///
/// # Invariants
/// - Only one variant exists today; the enum exists so digests carry their
///   algorithm on the wire and can be extended without breaking callers that
///   match exhaustively with a wildcard arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashAlgorithm {
    /// SHA-256.
    Sha256,
}

/// A computed content digest, hex-encoded.
///
/// # Invariants
/// - `value` is lowercase hex and matches `algorithm`'s output length.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashDigest {
    /// Algorithm used to compute this digest.
    pub algorithm: HashAlgorithm,
    /// Lowercase hex-encoded digest value.
    pub value: String,
}

/// Errors produced while hashing.
#[derive(Debug, thiserror::Error)]
pub enum HashingError {
    /// The input value could not be canonicalized to JSON.
    #[error("canonicalization failed: {0}")]
    Canonicalize(String),
}

/// Hashes raw bytes with the given algorithm.
#[must_use]
pub fn hash_bytes(algorithm: HashAlgorithm, bytes: &[u8]) -> HashDigest {
    match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(bytes);
            let digest = hasher.finalize();
            HashDigest {
                algorithm,
                value: hex_encode(&digest),
            }
        }
    }
}

/// Hashes a JSON value after canonicalizing it (stable key order, no
/// insignificant whitespace), so equivalent documents hash identically.
///
/// # Errors
///
/// Returns [`HashingError`] when the value cannot be canonicalized.
pub fn hash_canonical_json(
    algorithm: HashAlgorithm,
    value: &serde_json::Value,
) -> Result<HashDigest, HashingError> {
    let canonical =
        serde_jcs::to_string(value).map_err(|err| HashingError::Canonicalize(err.to_string()))?;
    Ok(hash_bytes(algorithm, canonical.as_bytes()))
}

/// Encodes bytes as lowercase hex without pulling in a dedicated crate.
fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // `write!` to a `String` never fails.
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    reason = "test assertions only"
)]
mod tests {
    use super::HashAlgorithm;
    use super::hash_bytes;
    use super::hash_canonical_json;

    #[test]
    fn hash_bytes_is_deterministic() {
        let a = hash_bytes(HashAlgorithm::Sha256, b"hello");
        let b = hash_bytes(HashAlgorithm::Sha256, b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn canonical_json_ignores_key_order() {
        let a = serde_json::json!({"b": 1, "a": 2});
        let b = serde_json::json!({"a": 2, "b": 1});
        let da = hash_canonical_json(HashAlgorithm::Sha256, &a).unwrap();
        let db = hash_canonical_json(HashAlgorithm::Sha256, &b).unwrap();
        assert_eq!(da, db);
    }
}
