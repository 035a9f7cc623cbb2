// crates/caseflow-config/src/lib.rs
// ============================================================================
// Crate: caseflow-config
// Description: Canonical configuration model, strict TOML loading, and
//              docs/schema/example generation for the caseflow orchestration
//              engine.
// Purpose: Give every deployment a single, strictly-validated source of
//          truth for store location, server binding, autopilot policy,
//          timeout policy, and provider wiring.
// ============================================================================

//! Caseflow's configuration crate.
//!
//! [`CaseflowConfig`] is loaded from TOML with `deny_unknown_fields`, so a
//! typo in a deployment's config file is a load-time error rather than a
//! silently-ignored field. The model intentionally keeps every
//! policy-relevant number — fee thresholds, confidence bands, TTLs — as a
//! config field rather than a source constant, per the orchestration
//! engine's autopilot design.

#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use caseflow_core::ActionType;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced while loading or validating [`CaseflowConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read from disk.
    #[error("failed to read config file {path}: {source}")]
    Read {
        /// Path that failed to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The TOML payload did not parse against [`CaseflowConfig`].
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// The config parsed but failed semantic validation.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Top-Level Config
// ============================================================================

/// Root configuration for a caseflow deployment.
///
/// # Invariants
/// - Every field is required; no field carries an implicit `serde` default,
///   so a deployment must state its policy rather than inherit one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CaseflowConfig {
    /// Durable store location and sync mode.
    pub store: StoreConfig,
    /// HTTP/SSE server bind address and request limits.
    pub server: ServerConfig,
    /// Autopilot thresholds governing automatic proposal execution.
    pub autopilot: AutopilotPolicy,
    /// TTLs and staleness thresholds for locks, waitpoints, and runs.
    pub timeouts: TimeoutPolicy,
    /// External collaborator wiring (classifier, draft, email, portal).
    pub providers: ProvidersConfig,
}

impl CaseflowConfig {
    /// Loads and validates a config from a TOML file on disk.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the file cannot be read, does not parse,
    /// or fails semantic validation.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::load_from_str(&raw)
    }

    /// Parses and validates a config from a TOML string.
    ///
    /// # Errors
    /// Returns [`ConfigError`] if the string does not parse or fails
    /// semantic validation.
    pub fn load_from_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field invariants not expressible in the type system.
    ///
    /// # Errors
    /// Returns [`ConfigError::Invalid`] with a description of the first
    /// violated invariant.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.autopilot.validate()?;
        self.timeouts.validate()?;
        self.server.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Store Config
// ============================================================================

/// Durable store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Filesystem path to the SQLite database file.
    pub path: String,
    /// Synchronous mode for the writer connection.
    pub sync_mode: StoreSyncMode,
    /// Size of the read-only connection pool.
    pub read_pool_size: u32,
}

/// Mirrors `caseflow_store_sqlite::SqliteSyncMode` without a hard
/// dependency edge, so this crate's public API stays storage-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreSyncMode {
    /// `PRAGMA synchronous = FULL`.
    Full,
    /// `PRAGMA synchronous = NORMAL`, safe under WAL.
    Normal,
}

// ============================================================================
// SECTION: Server Config
// ============================================================================

/// HTTP/SSE server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address the HTTP server binds to, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,
    /// Maximum accepted request body size, in bytes.
    pub max_request_bytes: u64,
    /// Maximum number of concurrently open SSE event streams.
    pub max_sse_connections: u32,
}

impl ServerConfig {
    /// Validates server-level invariants.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_addr.trim().is_empty() {
            return Err(ConfigError::Invalid("server.bind_addr must not be empty".to_string()));
        }
        if self.max_request_bytes == 0 {
            return Err(ConfigError::Invalid(
                "server.max_request_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_sse_connections == 0 {
            return Err(ConfigError::Invalid(
                "server.max_sse_connections must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Autopilot Policy
// ============================================================================

/// Thresholds governing when the decisioner may auto-execute a proposal
/// versus route it to a human through a waitpoint.
///
/// # Invariants
/// - `fee_auto_approve_max <= fee_hard_cap`.
/// - `0.0 <= auto_min_confidence <= supervised_min_confidence <= 1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AutopilotPolicy {
    /// Maximum fee quote, in the case's currency's minor units represented
    /// as a decimal string, that may be auto-approved without human review.
    pub fee_auto_approve_max: String,
    /// Fee quote above which a proposal is never offered for auto-approval,
    /// regardless of confidence.
    pub fee_hard_cap: String,
    /// Action types eligible for autonomous execution when confidence and
    /// fee gates both pass.
    pub auto_safe_actions: BTreeSet<ActionType>,
    /// Minimum planner confidence required for autonomous execution.
    pub auto_min_confidence: f64,
    /// Minimum planner confidence required even under supervised mode;
    /// below this the proposal is held rather than offered at all.
    pub supervised_min_confidence: f64,
}

impl AutopilotPolicy {
    /// Validates confidence ordering and fee ordering invariants.
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.auto_min_confidence) {
            return Err(ConfigError::Invalid(
                "autopilot.auto_min_confidence must be within [0.0, 1.0]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.supervised_min_confidence) {
            return Err(ConfigError::Invalid(
                "autopilot.supervised_min_confidence must be within [0.0, 1.0]".to_string(),
            ));
        }
        if self.supervised_min_confidence < self.auto_min_confidence {
            return Err(ConfigError::Invalid(
                "autopilot.supervised_min_confidence must be >= auto_min_confidence".to_string(),
            ));
        }
        let auto_max = parse_decimal(&self.fee_auto_approve_max, "autopilot.fee_auto_approve_max")?;
        let hard_cap = parse_decimal(&self.fee_hard_cap, "autopilot.fee_hard_cap")?;
        if auto_max > hard_cap {
            return Err(ConfigError::Invalid(
                "autopilot.fee_auto_approve_max must be <= fee_hard_cap".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parses a decimal string field, mapping failures to [`ConfigError::Invalid`].
fn parse_decimal(raw: &str, field: &str) -> Result<bigdecimal::BigDecimal, ConfigError> {
    raw.parse::<bigdecimal::BigDecimal>()
        .map_err(|_err| ConfigError::Invalid(format!("{field} is not a valid decimal: {raw:?}")))
}

// ============================================================================
// SECTION: Timeout Policy
// ============================================================================

/// TTLs and staleness thresholds, all in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeoutPolicy {
    /// Waitpoint expiry, after which a pending human decision is abandoned.
    pub waitpoint_ttl_millis: u64,
    /// Case lock TTL held during a state transition.
    pub case_lock_ttl_transition_millis: u64,
    /// Case lock TTL held during a reset-to-last-inbound operation.
    pub case_lock_ttl_reset_millis: u64,
    /// Idempotency key retention window for dispatcher triggers.
    pub idempotency_key_ttl_millis: u64,
    /// Soft timeout after which a portal submission is flagged as slow.
    pub portal_soft_timeout_millis: u64,
    /// Hard timeout after which a portal submission is treated as failed.
    pub portal_hard_timeout_millis: u64,
    /// Age after which a live run with no progress is reaped as stuck.
    pub run_stuck_after_millis: u64,
}

impl TimeoutPolicy {
    /// Validates timeout ordering invariants.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.portal_soft_timeout_millis > self.portal_hard_timeout_millis {
            return Err(ConfigError::Invalid(
                "timeouts.portal_soft_timeout_millis must be <= portal_hard_timeout_millis"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Providers Config
// ============================================================================

/// Endpoint wiring for each external collaborator port.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    /// Classifier collaborator endpoint.
    pub classifier: ProviderEndpoint,
    /// Draft-generator collaborator endpoint.
    pub draft: ProviderEndpoint,
    /// Email transport collaborator endpoint.
    pub email: ProviderEndpoint,
    /// Portal worker collaborator endpoint.
    pub portal: ProviderEndpoint,
}

/// A single HTTP-backed collaborator endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEndpoint {
    /// Base URL for the collaborator's HTTP API.
    pub base_url: String,
    /// Request timeout, in milliseconds.
    pub timeout_millis: u64,
    /// Whether the in-memory deterministic stub should be used instead of
    /// the HTTP-backed implementation. Intended for tests and local runs.
    pub use_stub: bool,
}

// ============================================================================
// SECTION: Artifact Generation
// ============================================================================

/// Returns the JSON Schema describing [`CaseflowConfig`]'s TOML shape.
///
/// The schema is handwritten rather than derived, since the config's
/// cross-field invariants (fee ordering, confidence ordering) are not
/// expressible in a generated schema and are documented here instead.
#[must_use]
pub fn config_schema() -> serde_json::Value {
    serde_json::json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "title": "CaseflowConfig",
        "type": "object",
        "required": ["store", "server", "autopilot", "timeouts", "providers"],
        "additionalProperties": false,
        "properties": {
            "store": {
                "type": "object",
                "required": ["path", "sync_mode", "read_pool_size"],
                "additionalProperties": false,
                "properties": {
                    "path": { "type": "string" },
                    "sync_mode": { "type": "string", "enum": ["full", "normal"] },
                    "read_pool_size": { "type": "integer", "minimum": 1 }
                }
            },
            "server": {
                "type": "object",
                "required": ["bind_addr", "max_request_bytes", "max_sse_connections"],
                "additionalProperties": false,
                "properties": {
                    "bind_addr": { "type": "string" },
                    "max_request_bytes": { "type": "integer", "minimum": 1 },
                    "max_sse_connections": { "type": "integer", "minimum": 1 }
                }
            },
            "autopilot": {
                "type": "object",
                "required": [
                    "fee_auto_approve_max",
                    "fee_hard_cap",
                    "auto_safe_actions",
                    "auto_min_confidence",
                    "supervised_min_confidence"
                ],
                "additionalProperties": false,
                "properties": {
                    "fee_auto_approve_max": { "type": "string" },
                    "fee_hard_cap": { "type": "string" },
                    "auto_safe_actions": { "type": "array", "items": { "type": "string" } },
                    "auto_min_confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 },
                    "supervised_min_confidence": { "type": "number", "minimum": 0.0, "maximum": 1.0 }
                }
            },
            "timeouts": {
                "type": "object",
                "required": [
                    "waitpoint_ttl_millis",
                    "case_lock_ttl_transition_millis",
                    "case_lock_ttl_reset_millis",
                    "idempotency_key_ttl_millis",
                    "portal_soft_timeout_millis",
                    "portal_hard_timeout_millis",
                    "run_stuck_after_millis"
                ],
                "additionalProperties": false,
                "properties": {
                    "waitpoint_ttl_millis": { "type": "integer", "minimum": 0 },
                    "case_lock_ttl_transition_millis": { "type": "integer", "minimum": 0 },
                    "case_lock_ttl_reset_millis": { "type": "integer", "minimum": 0 },
                    "idempotency_key_ttl_millis": { "type": "integer", "minimum": 0 },
                    "portal_soft_timeout_millis": { "type": "integer", "minimum": 0 },
                    "portal_hard_timeout_millis": { "type": "integer", "minimum": 0 },
                    "run_stuck_after_millis": { "type": "integer", "minimum": 0 }
                }
            },
            "providers": {
                "type": "object",
                "required": ["classifier", "draft", "email", "portal"],
                "additionalProperties": false,
                "properties": {
                    "classifier": { "$ref": "#/definitions/provider_endpoint" },
                    "draft": { "$ref": "#/definitions/provider_endpoint" },
                    "email": { "$ref": "#/definitions/provider_endpoint" },
                    "portal": { "$ref": "#/definitions/provider_endpoint" }
                }
            }
        },
        "definitions": {
            "provider_endpoint": {
                "type": "object",
                "required": ["base_url", "timeout_millis", "use_stub"],
                "additionalProperties": false,
                "properties": {
                    "base_url": { "type": "string" },
                    "timeout_millis": { "type": "integer", "minimum": 1 },
                    "use_stub": { "type": "boolean" }
                }
            }
        }
    })
}

/// Returns a complete, validating example `CaseflowConfig` TOML document.
#[must_use]
pub fn config_toml_example() -> String {
    r#"[store]
path = "caseflow.sqlite3"
sync_mode = "normal"
read_pool_size = 4

[server]
bind_addr = "0.0.0.0:8080"
max_request_bytes = 1048576
max_sse_connections = 256

[autopilot]
fee_auto_approve_max = "25.00"
fee_hard_cap = "250.00"
auto_safe_actions = ["send_followup", "send_clarification", "send_status_update"]
auto_min_confidence = 0.85
supervised_min_confidence = 0.55

[timeouts]
waitpoint_ttl_millis = 1209600000
case_lock_ttl_transition_millis = 30000
case_lock_ttl_reset_millis = 90000
idempotency_key_ttl_millis = 3600000
portal_soft_timeout_millis = 60000
portal_hard_timeout_millis = 900000
run_stuck_after_millis = 900000

[providers.classifier]
base_url = "http://localhost:9101"
timeout_millis = 10000
use_stub = true

[providers.draft]
base_url = "http://localhost:9102"
timeout_millis = 10000
use_stub = true

[providers.email]
base_url = "http://localhost:9103"
timeout_millis = 10000
use_stub = true

[providers.portal]
base_url = "http://localhost:9104"
timeout_millis = 10000
use_stub = true
"#
    .to_string()
}

/// Renders human-readable documentation for every config field, grouped by
/// section, for inclusion in deployment runbooks.
#[must_use]
pub fn config_docs_markdown() -> String {
    let mut out = String::new();
    out.push_str("# Caseflow Configuration Reference\n\n");
    out.push_str("## `[store]`\n\n");
    out.push_str("- `path`: filesystem path to the SQLite database file.\n");
    out.push_str("- `sync_mode`: `full` or `normal`; `normal` is safe under WAL.\n");
    out.push_str("- `read_pool_size`: number of read-only connections in the pool.\n\n");
    out.push_str("## `[server]`\n\n");
    out.push_str("- `bind_addr`: HTTP/SSE listen address.\n");
    out.push_str("- `max_request_bytes`: request body size cap.\n");
    out.push_str("- `max_sse_connections`: concurrent SSE stream cap.\n\n");
    out.push_str("## `[autopilot]`\n\n");
    out.push_str("- `fee_auto_approve_max`: highest fee quote eligible for auto-approval.\n");
    out.push_str("- `fee_hard_cap`: fee quote above which no proposal auto-executes.\n");
    out.push_str("- `auto_safe_actions`: action types eligible for autonomous execution.\n");
    out.push_str("- `auto_min_confidence`: confidence floor for autonomous execution.\n");
    out.push_str(
        "- `supervised_min_confidence`: confidence floor below which a proposal is held.\n\n",
    );
    out.push_str("## `[timeouts]`\n\n");
    out.push_str("All fields are milliseconds: `waitpoint_ttl_millis`, ");
    out.push_str("`case_lock_ttl_transition_millis`, `case_lock_ttl_reset_millis`, ");
    out.push_str("`idempotency_key_ttl_millis`, `portal_soft_timeout_millis`, ");
    out.push_str("`portal_hard_timeout_millis`, `run_stuck_after_millis`.\n\n");
    out.push_str("## `[providers.*]`\n\n");
    out.push_str("Each of `classifier`, `draft`, `email`, `portal` takes `base_url`, ");
    out.push_str("`timeout_millis`, and `use_stub`.\n");
    out
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}
