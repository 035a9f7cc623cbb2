// crates/caseflow-core/src/core/identifiers.rs
// ============================================================================
// Module: Caseflow Identifiers
// Description: Canonical opaque identifiers for cases, messages, proposals,
//              runs, and the tokens that guard locks and waitpoints.
// Purpose: Provide strongly typed, serializable identifiers with stable wire
//          forms instead of passing bare strings between components.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers are opaque and serialize as numbers or strings on the wire.
//! `TenantId` enforces a non-zero, 1-based invariant at construction
//! boundaries; the rest are opaque UTF-8 strings with no further
//! normalization.

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;

/// Tenant identifier scoping every case to one deployment's multi-tenant
/// boundary.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(NonZeroU64);

impl TenantId {
    /// Creates a new tenant identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    /// Creates a tenant identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

/// Case identifier: the lifetime record of a public-records request against
/// one agency.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseId(String);

impl CaseId {
    /// Creates a new case identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CaseId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CaseId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Message identifier for one inbound or outbound communication.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Creates a new message identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Thread identifier grouping messages into one email conversation.
///
/// Owned by the case; matching by headers/addresses happens once during
/// attachment and is never revisited.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(String);

impl ThreadId {
    /// Creates a new thread identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ThreadId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ThreadId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Proposal identifier: a concrete, reviewable plan for one next action on a
/// case.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProposalId(String);

impl ProposalId {
    /// Creates a new proposal identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProposalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ProposalId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProposalId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Run identifier: one orchestration attempt against a case.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Creates a new run identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for RunId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for RunId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Execution identifier: one row in the append-only side-effect log.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Creates a new execution identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ExecutionId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ExecutionId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Activity log entry identifier.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityId(String);

impl ActivityId {
    /// Creates a new activity log identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActivityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ActivityId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ActivityId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Execution key: an unguessable string, unique per executed proposal, used
/// as the downstream idempotency key for outbound side effects.
///
/// # Invariants
/// - Opaque UTF-8 string. Callers are responsible for generating it with
///   enough entropy (>= 128 bits) that it cannot be guessed; this type does
///   not enforce that itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionKey(String);

impl ExecutionKey {
    /// Creates a new execution key from an already-generated token.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for ExecutionKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ExecutionKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Waitpoint token: a single-use, unguessable token that suspends a run
/// until a human decision (or expiry) arrives.
///
/// # Invariants
/// - Opaque UTF-8 string; callers generate it with enough entropy that it
///   cannot be guessed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WaitpointToken(String);

impl WaitpointToken {
    /// Creates a new waitpoint token from an already-generated value.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WaitpointToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for WaitpointToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for WaitpointToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Case lock token: presented to `Release`/`Refresh` to prove ownership of a
/// held `CaseOperationLock`.
///
/// # Invariants
/// - Opaque UTF-8 string; callers generate it with enough entropy that it
///   cannot be guessed by a non-holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaseLockToken(String);

impl CaseLockToken {
    /// Creates a new case lock token from an already-generated value.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the token as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseLockToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for CaseLockToken {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for CaseLockToken {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Idempotency key presented to the Dispatcher's `Trigger` operation.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Creates a new idempotency key.
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for IdempotencyKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for IdempotencyKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
