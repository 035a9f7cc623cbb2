// crates/caseflow-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Store
// Description: Durable Store/CaseLockPort/WaitpointPort implementation
//              backed by SQLite WAL, a single writer connection, and a
//              round-robin read-only connection pool.
// Purpose: Give caseflow-service a durable backend for every record named
//          in spec §3 without forcing the orchestration engine to know
//          anything about SQL.
// Dependencies: caseflow-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//! One SQLite database file holds every table this system needs: `cases`,
//! `messages`, `proposals`, `agent_runs`, `case_operation_locks`,
//! `waitpoints`, `executions`, and `activity_log`. Writes are serialized
//! through a single mutex-guarded connection opened in WAL mode, which is
//! sufficient concurrency for a per-case-serialized workload (the Dispatcher
//! never runs two tasks for the same case at once, so writers rarely
//! contend with each other, only with readers). Reads use a small
//! round-robin pool of read-only connections so a slow read (e.g. listing a
//! long activity log) never blocks the writer.
//!
//! Composite fields (`fee_quote`, `scope_items`, `risk_flags`,
//! `human_decision`, `metadata`, ...) are stored as canonical JSON text
//! columns rather than normalized further: none of them are queried by
//! sub-field, only loaded and stored whole, so normalizing them would add
//! joins without buying anything.
//!
//! Security posture: this store trusts its inputs are already validated by
//! the service layer; it enforces only the invariants spec §3/§8 assign to
//! storage itself (idempotent proposal insert, execution-key uniqueness,
//! waitpoint-completion compare-and-set, lock acquire-on-expiry).

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use caseflow_core::ActivityId;
use caseflow_core::ActivityLogEntry;
use caseflow_core::AgentRun;
use caseflow_core::Case;
use caseflow_core::CaseId;
use caseflow_core::CaseLockPort;
use caseflow_core::CaseLockToken;
use caseflow_core::CaseOperationLock;
use caseflow_core::ConstraintTag;
use caseflow_core::Execution;
use caseflow_core::ExecutionId;
use caseflow_core::ExecutionKey;
use caseflow_core::ExecutionKind;
use caseflow_core::ExecutionStatus;
use caseflow_core::FeeQuote;
use caseflow_core::FencingInfo;
use caseflow_core::GateOption;
use caseflow_core::HumanDecision;
use caseflow_core::LockError;
use caseflow_core::Message;
use caseflow_core::MessageId;
use caseflow_core::MetadataMap;
use caseflow_core::OutcomeType;
use caseflow_core::Proposal;
use caseflow_core::ProposalId;
use caseflow_core::ProposalStatus;
use caseflow_core::RunId;
use caseflow_core::RunStatus;
use caseflow_core::ScopeItem;
use caseflow_core::Store;
use caseflow_core::StoreError;
use caseflow_core::ThreadId;
use caseflow_core::Timestamp;
use caseflow_core::Waitpoint;
use caseflow_core::WaitpointError;
use caseflow_core::WaitpointPayload;
use caseflow_core::WaitpointPort;
use caseflow_core::WaitpointToken;
use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version created by [`SqliteStore::open`].
const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout, in milliseconds, applied to every connection.
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Default number of read-only connections in the pool.
const DEFAULT_READ_POOL_SIZE: usize = 4;
/// Maximum accepted size, in bytes, for any single JSON column. Guards
/// against a misbehaving upstream collaborator writing an unbounded blob
/// (e.g. a runaway classifier `extra` map) into the store.
pub const MAX_JSON_COLUMN_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` `synchronous` pragma setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full durability (safest, default).
    #[default]
    Full,
    /// Reduced durability in exchange for throughput.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the pragma value `SQLite` expects.
    const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for [`SqliteStore::open`].
#[derive(Debug, Clone)]
pub struct SqliteStoreConfig {
    /// Path to the database file.
    pub path: PathBuf,
    /// Busy timeout, in milliseconds, for every connection.
    pub busy_timeout_ms: u64,
    /// `synchronous` pragma mode.
    pub sync_mode: SqliteSyncMode,
    /// Number of read-only connections in the pool.
    pub read_pool_size: usize,
}

impl SqliteStoreConfig {
    /// Builds a config pointing at `path` with every other setting at its
    /// default.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            sync_mode: SqliteSyncMode::default(),
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors produced while opening or operating a [`SqliteStore`].
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Underlying `SQLite` engine error.
    #[error("sqlite error: {0}")]
    Db(String),
    /// A JSON column could not be encoded or decoded.
    #[error("json encoding error: {0}")]
    Json(String),
    /// A stored value was outside the range a caseflow-core type accepts.
    #[error("invalid stored value: {0}")]
    Invalid(String),
    /// A JSON column exceeded [`MAX_JSON_COLUMN_BYTES`].
    #[error("json column too large: {actual} bytes (max {MAX_JSON_COLUMN_BYTES})")]
    TooLarge {
        /// Observed size in bytes.
        actual: usize,
    },
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Db(error.to_string())
    }
}

impl From<SqliteStoreError> for StoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Db(message) => Self::Io(message),
            SqliteStoreError::Json(message) | SqliteStoreError::Invalid(message) => {
                Self::Io(message)
            }
            SqliteStoreError::TooLarge { actual } => {
                Self::Io(format!("json column too large: {actual} bytes"))
            }
        }
    }
}

impl From<SqliteStoreError> for LockError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Io(error.to_string())
    }
}

impl From<SqliteStoreError> for WaitpointError {
    fn from(error: SqliteStoreError) -> Self {
        Self::Io(error.to_string())
    }
}

// ============================================================================
// SECTION: JSON column helpers
// ============================================================================

/// Serializes `value` to a size-checked JSON string for storage in a TEXT
/// column.
fn encode_json<T: Serialize>(value: &T) -> Result<String, SqliteStoreError> {
    let text =
        serde_json::to_string(value).map_err(|error| SqliteStoreError::Json(error.to_string()))?;
    if text.len() > MAX_JSON_COLUMN_BYTES {
        return Err(SqliteStoreError::TooLarge { actual: text.len() });
    }
    Ok(text)
}

/// Deserializes a JSON column previously written by [`encode_json`].
fn decode_json<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, SqliteStoreError> {
    serde_json::from_str(text).map_err(|error| SqliteStoreError::Json(error.to_string()))
}

/// Splits a [`Timestamp`] into its `(kind, value)` column pair.
fn ts_columns(ts: &Timestamp) -> Result<(&'static str, i64), SqliteStoreError> {
    match ts {
        Timestamp::UnixMillis(value) => Ok(("u", *value)),
        Timestamp::Logical(value) => {
            let value = i64::try_from(*value)
                .map_err(|_| SqliteStoreError::Invalid("logical timestamp overflow".to_string()))?;
            Ok(("l", value))
        }
    }
}

/// Reconstructs a [`Timestamp`] from its `(kind, value)` column pair.
fn ts_from_columns(kind: &str, value: i64) -> Result<Timestamp, SqliteStoreError> {
    match kind {
        "u" => Ok(Timestamp::UnixMillis(value)),
        "l" => {
            let value = u64::try_from(value)
                .map_err(|_| SqliteStoreError::Invalid("negative logical timestamp".to_string()))?;
            Ok(Timestamp::Logical(value))
        }
        other => Err(SqliteStoreError::Invalid(format!(
            "unknown timestamp kind column value: {other}"
        ))),
    }
}

/// Reconstructs an optional [`Timestamp`] from nullable `(kind, value)`
/// columns.
fn opt_ts_from_columns(
    kind: Option<String>,
    value: Option<i64>,
) -> Result<Option<Timestamp>, SqliteStoreError> {
    match (kind, value) {
        (Some(kind), Some(value)) => Ok(Some(ts_from_columns(&kind, value)?)),
        _ => Ok(None),
    }
}

/// Splits an optional [`Timestamp`] into its nullable `(kind, value)` column
/// pair.
fn opt_ts_columns(
    ts: Option<&Timestamp>,
) -> Result<(Option<&'static str>, Option<i64>), SqliteStoreError> {
    match ts {
        Some(ts) => {
            let (kind, value) = ts_columns(ts)?;
            Ok((Some(kind), Some(value)))
        }
        None => Ok((None, None)),
    }
}

/// Serializes a unit-like enum (tagged `snake_case` by `serde`) to its bare
/// JSON string form, e.g. `CaseStatus::Draft` -> `draft`.
fn enum_to_text<T: Serialize>(value: &T) -> Result<String, SqliteStoreError> {
    let json = encode_json(value)?;
    Ok(json.trim_matches('"').to_string())
}

/// Reconstructs a unit-like enum from the bare text form written by
/// [`enum_to_text`].
fn enum_from_text<T: for<'de> Deserialize<'de>>(text: &str) -> Result<T, SqliteStoreError> {
    decode_json(&format!("\"{text}\""))
}

// ============================================================================
// SECTION: Row mapping - Case
// ============================================================================

/// Reconstructs a [`Case`] from a `cases` row.
fn case_from_row(row: &Row<'_>) -> rusqlite::Result<Case> {
    Ok(Case {
        id: CaseId::new(row.get::<_, String>("id")?),
        status: enum_from_text(&row.get::<_, String>("status")?).map_err(sqlite_fromsql_error)?,
        substatus: row.get("substatus")?,
        autopilot_mode: enum_from_text(&row.get::<_, String>("autopilot_mode")?)
            .map_err(sqlite_fromsql_error)?,
        requires_human: row.get("requires_human")?,
        pause_reason: row
            .get::<_, Option<String>>("pause_reason")?
            .map(|text| enum_from_text(&text))
            .transpose()
            .map_err(sqlite_fromsql_error)?,
        agency_email: row.get("agency_email")?,
        portal_url: row.get("portal_url")?,
        deadline_date: opt_ts_from_columns(
            row.get("deadline_date_kind")?,
            row.get("deadline_date_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
        fee_quote: row
            .get::<_, Option<String>>("fee_quote_json")?
            .map(|text| decode_json::<FeeQuote>(&text))
            .transpose()
            .map_err(sqlite_fromsql_error)?,
        scope_items: decode_json::<Vec<ScopeItem>>(&row.get::<_, String>("scope_items_json")?)
            .map_err(sqlite_fromsql_error)?,
        constraints: decode_json::<BTreeSet<ConstraintTag>>(
            &row.get::<_, String>("constraints_json")?,
        )
        .map_err(sqlite_fromsql_error)?,
        send_date: opt_ts_from_columns(row.get("send_date_kind")?, row.get("send_date_value")?)
            .map_err(sqlite_fromsql_error)?,
        last_portal_status: row.get("last_portal_status")?,
        closed_at: opt_ts_from_columns(row.get("closed_at_kind")?, row.get("closed_at_value")?)
            .map_err(sqlite_fromsql_error)?,
        outcome_type: row
            .get::<_, Option<String>>("outcome_type")?
            .map(|text| enum_from_text::<OutcomeType>(&text))
            .transpose()
            .map_err(sqlite_fromsql_error)?,
        outcome_summary: row.get("outcome_summary")?,
    })
}

/// Converts a `rusqlite::Error`-incompatible [`SqliteStoreError`] into a
/// `rusqlite::Error` so row-mapping closures can use `?` uniformly; the
/// outer caller immediately converts it back via [`From<rusqlite::Error>`].
fn sqlite_fromsql_error(error: SqliteStoreError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(error))
}

impl std::fmt::Display for SqliteStoreErrorAsStdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for SqliteStoreErrorAsStdError {}

/// Wrapper letting [`SqliteStoreError`] satisfy `std::error::Error` for use
/// inside `rusqlite::Error::FromSqlConversionFailure`'s boxed payload.
#[derive(Debug)]
struct SqliteStoreErrorAsStdError(String);

impl From<SqliteStoreError> for Box<dyn std::error::Error + Send + Sync + 'static> {
    fn from(error: SqliteStoreError) -> Self {
        Box::new(SqliteStoreErrorAsStdError(error.to_string()))
    }
}

/// Upserts a [`Case`] into the `cases` table.
fn put_case_stmt(conn: &Connection, case: &Case) -> Result<(), SqliteStoreError> {
    let (deadline_kind, deadline_value) = opt_ts_columns(case.deadline_date.as_ref())?;
    let (send_kind, send_value) = opt_ts_columns(case.send_date.as_ref())?;
    let (closed_kind, closed_value) = opt_ts_columns(case.closed_at.as_ref())?;
    let fee_quote_json = case.fee_quote.as_ref().map(encode_json).transpose()?;
    let scope_items_json = encode_json(&case.scope_items)?;
    let constraints_json = encode_json(&case.constraints)?;
    let pause_reason = case.pause_reason.as_ref().map(enum_to_text).transpose()?;
    let outcome_type = case.outcome_type.as_ref().map(enum_to_text).transpose()?;
    conn.execute(
        "INSERT INTO cases (
            id, status, substatus, autopilot_mode, requires_human, pause_reason,
            agency_email, portal_url, deadline_date_kind, deadline_date_value,
            fee_quote_json, scope_items_json, constraints_json, send_date_kind,
            send_date_value, last_portal_status, closed_at_kind, closed_at_value,
            outcome_type, outcome_summary
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)
        ON CONFLICT(id) DO UPDATE SET
            status = excluded.status,
            substatus = excluded.substatus,
            autopilot_mode = excluded.autopilot_mode,
            requires_human = excluded.requires_human,
            pause_reason = excluded.pause_reason,
            agency_email = excluded.agency_email,
            portal_url = excluded.portal_url,
            deadline_date_kind = excluded.deadline_date_kind,
            deadline_date_value = excluded.deadline_date_value,
            fee_quote_json = excluded.fee_quote_json,
            scope_items_json = excluded.scope_items_json,
            constraints_json = excluded.constraints_json,
            send_date_kind = excluded.send_date_kind,
            send_date_value = excluded.send_date_value,
            last_portal_status = excluded.last_portal_status,
            closed_at_kind = excluded.closed_at_kind,
            closed_at_value = excluded.closed_at_value,
            outcome_type = excluded.outcome_type,
            outcome_summary = excluded.outcome_summary",
        params![
            case.id.as_str(),
            enum_to_text(&case.status)?,
            case.substatus,
            enum_to_text(&case.autopilot_mode)?,
            case.requires_human,
            pause_reason,
            case.agency_email,
            case.portal_url,
            deadline_kind,
            deadline_value,
            fee_quote_json,
            scope_items_json,
            constraints_json,
            send_kind,
            send_value,
            case.last_portal_status,
            closed_kind,
            closed_value,
            outcome_type,
            case.outcome_summary,
        ],
    )?;
    Ok(())
}

// ============================================================================
// SECTION: Row mapping - Message
// ============================================================================

/// Reconstructs a [`Message`] from a `messages` row.
fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: MessageId::new(row.get::<_, String>("id")?),
        case_id: row.get::<_, Option<String>>("case_id")?.map(CaseId::new),
        thread_id: row
            .get::<_, Option<String>>("thread_id")?
            .map(ThreadId::new),
        direction: enum_from_text(&row.get::<_, String>("direction")?)
            .map_err(sqlite_fromsql_error)?,
        from: row.get("from_addr")?,
        to: row.get("to_addr")?,
        subject: row.get("subject")?,
        body_text: row.get("body_text")?,
        body_html: row.get("body_html")?,
        provider_message_id: row.get("provider_message_id")?,
        received_at: opt_ts_from_columns(
            row.get("received_at_kind")?,
            row.get("received_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
        sent_at: opt_ts_from_columns(row.get("sent_at_kind")?, row.get("sent_at_value")?)
            .map_err(sqlite_fromsql_error)?,
        processed_at: opt_ts_from_columns(
            row.get("processed_at_kind")?,
            row.get("processed_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
        processed_run_id: row
            .get::<_, Option<String>>("processed_run_id")?
            .map(RunId::new),
        message_type: row.get("message_type")?,
        attachments: decode_json(&row.get::<_, String>("attachments_json")?)
            .map_err(sqlite_fromsql_error)?,
    })
}

/// Upserts a [`Message`] into the `messages` table.
fn put_message_stmt(conn: &Connection, message: &Message) -> Result<(), SqliteStoreError> {
    let (received_kind, received_value) = opt_ts_columns(message.received_at.as_ref())?;
    let (sent_kind, sent_value) = opt_ts_columns(message.sent_at.as_ref())?;
    let (processed_kind, processed_value) = opt_ts_columns(message.processed_at.as_ref())?;
    let attachments_json = encode_json(&message.attachments)?;
    conn.execute(
        "INSERT INTO messages (
            id, case_id, thread_id, direction, from_addr, to_addr, subject,
            body_text, body_html, provider_message_id, received_at_kind,
            received_at_value, sent_at_kind, sent_at_value, processed_at_kind,
            processed_at_value, processed_run_id, message_type, attachments_json
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)
        ON CONFLICT(id) DO UPDATE SET
            case_id = excluded.case_id,
            thread_id = excluded.thread_id,
            direction = excluded.direction,
            from_addr = excluded.from_addr,
            to_addr = excluded.to_addr,
            subject = excluded.subject,
            body_text = excluded.body_text,
            body_html = excluded.body_html,
            provider_message_id = excluded.provider_message_id,
            received_at_kind = excluded.received_at_kind,
            received_at_value = excluded.received_at_value,
            sent_at_kind = excluded.sent_at_kind,
            sent_at_value = excluded.sent_at_value,
            processed_at_kind = excluded.processed_at_kind,
            processed_at_value = excluded.processed_at_value,
            processed_run_id = excluded.processed_run_id,
            message_type = excluded.message_type,
            attachments_json = excluded.attachments_json",
        params![
            message.id.as_str(),
            message.case_id.as_ref().map(CaseId::as_str),
            message.thread_id.as_ref().map(ThreadId::as_str),
            enum_to_text(&message.direction)?,
            message.from,
            message.to,
            message.subject,
            message.body_text,
            message.body_html,
            message.provider_message_id,
            received_kind,
            received_value,
            sent_kind,
            sent_value,
            processed_kind,
            processed_value,
            message.processed_run_id.as_ref().map(RunId::as_str),
            message.message_type,
            attachments_json,
        ],
    )?;
    Ok(())
}

// ============================================================================
// SECTION: Row mapping - Proposal
// ============================================================================

/// Reconstructs a [`Proposal`] from a `proposals` row.
fn proposal_from_row(row: &Row<'_>) -> rusqlite::Result<Proposal> {
    Ok(Proposal {
        id: ProposalId::new(row.get::<_, String>("id")?),
        case_id: CaseId::new(row.get::<_, String>("case_id")?),
        trigger_message_id: row
            .get::<_, Option<String>>("trigger_message_id")?
            .map(MessageId::new),
        action_type: enum_from_text(&row.get::<_, String>("action_type")?)
            .map_err(sqlite_fromsql_error)?,
        status: enum_from_text(&row.get::<_, String>("status")?).map_err(sqlite_fromsql_error)?,
        confidence: row.get("confidence")?,
        risk_flags: decode_json(&row.get::<_, String>("risk_flags_json")?)
            .map_err(sqlite_fromsql_error)?,
        warnings: decode_json(&row.get::<_, String>("warnings_json")?)
            .map_err(sqlite_fromsql_error)?,
        gate_options: decode_json::<Vec<GateOption>>(&row.get::<_, String>("gate_options_json")?)
            .map_err(sqlite_fromsql_error)?,
        draft_subject: row.get("draft_subject")?,
        draft_body_text: row.get("draft_body_text")?,
        draft_body_html: row.get("draft_body_html")?,
        reasoning: decode_json(&row.get::<_, String>("reasoning_json")?)
            .map_err(sqlite_fromsql_error)?,
        waitpoint_token: row
            .get::<_, Option<String>>("waitpoint_token")?
            .map(WaitpointToken::new),
        execution_key: row
            .get::<_, Option<String>>("execution_key")?
            .map(ExecutionKey::new),
        run_id: row.get::<_, Option<String>>("run_id")?.map(RunId::new),
        human_decision: row
            .get::<_, Option<String>>("human_decision_json")?
            .map(|text| decode_json::<HumanDecision>(&text))
            .transpose()
            .map_err(sqlite_fromsql_error)?,
        executed_at: opt_ts_from_columns(
            row.get("executed_at_kind")?,
            row.get("executed_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
        email_job_id: row.get("email_job_id")?,
        proposal_key: row.get("proposal_key")?,
        adjustment_count: row.get("adjustment_count")?,
    })
}

/// Inserts a [`Proposal`] into the `proposals` table.
fn insert_proposal_stmt(conn: &Connection, proposal: &Proposal) -> Result<(), SqliteStoreError> {
    let (executed_kind, executed_value) = opt_ts_columns(proposal.executed_at.as_ref())?;
    conn.execute(
        "INSERT INTO proposals (
            id, case_id, trigger_message_id, action_type, status, confidence,
            risk_flags_json, warnings_json, gate_options_json, draft_subject,
            draft_body_text, draft_body_html, reasoning_json, waitpoint_token,
            execution_key, run_id, human_decision_json, executed_at_kind,
            executed_at_value, email_job_id, proposal_key, adjustment_count
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
        params![
            proposal.id.as_str(),
            proposal.case_id.as_str(),
            proposal.trigger_message_id.as_ref().map(MessageId::as_str),
            enum_to_text(&proposal.action_type)?,
            enum_to_text(&proposal.status)?,
            proposal.confidence,
            encode_json(&proposal.risk_flags)?,
            encode_json(&proposal.warnings)?,
            encode_json(&proposal.gate_options)?,
            proposal.draft_subject,
            proposal.draft_body_text,
            proposal.draft_body_html,
            encode_json(&proposal.reasoning)?,
            proposal.waitpoint_token.as_ref().map(WaitpointToken::as_str),
            proposal.execution_key.as_ref().map(ExecutionKey::as_str),
            proposal.run_id.as_ref().map(RunId::as_str),
            proposal.human_decision.as_ref().map(encode_json).transpose()?,
            executed_kind,
            executed_value,
            proposal.email_job_id,
            proposal.proposal_key,
            proposal.adjustment_count,
        ],
    )?;
    Ok(())
}

/// Replaces a [`Proposal`] row wholesale.
fn put_proposal_stmt(conn: &Connection, proposal: &Proposal) -> Result<(), SqliteStoreError> {
    let (executed_kind, executed_value) = opt_ts_columns(proposal.executed_at.as_ref())?;
    conn.execute(
        "UPDATE proposals SET
            trigger_message_id = ?2, action_type = ?3, status = ?4, confidence = ?5,
            risk_flags_json = ?6, warnings_json = ?7, gate_options_json = ?8,
            draft_subject = ?9, draft_body_text = ?10, draft_body_html = ?11,
            reasoning_json = ?12, waitpoint_token = ?13, execution_key = ?14,
            run_id = ?15, human_decision_json = ?16, executed_at_kind = ?17,
            executed_at_value = ?18, email_job_id = ?19, adjustment_count = ?20
        WHERE id = ?1",
        params![
            proposal.id.as_str(),
            proposal.trigger_message_id.as_ref().map(MessageId::as_str),
            enum_to_text(&proposal.action_type)?,
            enum_to_text(&proposal.status)?,
            proposal.confidence,
            encode_json(&proposal.risk_flags)?,
            encode_json(&proposal.warnings)?,
            encode_json(&proposal.gate_options)?,
            proposal.draft_subject,
            proposal.draft_body_text,
            proposal.draft_body_html,
            encode_json(&proposal.reasoning)?,
            proposal
                .waitpoint_token
                .as_ref()
                .map(WaitpointToken::as_str),
            proposal.execution_key.as_ref().map(ExecutionKey::as_str),
            proposal.run_id.as_ref().map(RunId::as_str),
            proposal
                .human_decision
                .as_ref()
                .map(encode_json)
                .transpose()?,
            executed_kind,
            executed_value,
            proposal.email_job_id,
            proposal.adjustment_count,
        ],
    )?;
    Ok(())
}

// ============================================================================
// SECTION: Row mapping - AgentRun
// ============================================================================

/// Reconstructs an [`AgentRun`] from an `agent_runs` row.
fn run_from_row(row: &Row<'_>) -> rusqlite::Result<AgentRun> {
    Ok(AgentRun {
        id: RunId::new(row.get::<_, String>("id")?),
        case_id: CaseId::new(row.get::<_, String>("case_id")?),
        trigger_type: enum_from_text(&row.get::<_, String>("trigger_type")?)
            .map_err(sqlite_fromsql_error)?,
        status: enum_from_text(&row.get::<_, String>("status")?).map_err(sqlite_fromsql_error)?,
        started_at: opt_ts_from_columns(row.get("started_at_kind")?, row.get("started_at_value")?)
            .map_err(sqlite_fromsql_error)?,
        ended_at: opt_ts_from_columns(row.get("ended_at_kind")?, row.get("ended_at_value")?)
            .map_err(sqlite_fromsql_error)?,
        error: row.get("error")?,
        continuation_token: row.get("continuation_token")?,
        message_id: row
            .get::<_, Option<String>>("message_id")?
            .map(MessageId::new),
        proposal_id: row
            .get::<_, Option<String>>("proposal_id")?
            .map(ProposalId::new),
        metadata: decode_json::<MetadataMap>(&row.get::<_, String>("metadata_json")?)
            .map_err(sqlite_fromsql_error)?,
    })
}

/// Inserts an [`AgentRun`] into the `agent_runs` table.
fn insert_run_stmt(conn: &Connection, run: &AgentRun) -> Result<(), SqliteStoreError> {
    put_run_inner(conn, run, true)
}

/// Replaces an [`AgentRun`] row wholesale.
fn put_run_stmt(conn: &Connection, run: &AgentRun) -> Result<(), SqliteStoreError> {
    put_run_inner(conn, run, false)
}

/// Shared insert/replace logic for `agent_runs`.
fn put_run_inner(conn: &Connection, run: &AgentRun, insert: bool) -> Result<(), SqliteStoreError> {
    let (started_kind, started_value) = opt_ts_columns(run.started_at.as_ref())?;
    let (ended_kind, ended_value) = opt_ts_columns(run.ended_at.as_ref())?;
    let metadata_json = encode_json(&run.metadata)?;
    let verb = if insert {
        "INSERT INTO agent_runs"
    } else {
        "INSERT OR REPLACE INTO agent_runs"
    };
    conn.execute(
        &format!(
            "{verb} (
                id, case_id, trigger_type, status, started_at_kind, started_at_value,
                ended_at_kind, ended_at_value, error, continuation_token, message_id,
                proposal_id, metadata_json
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"
        ),
        params![
            run.id.as_str(),
            run.case_id.as_str(),
            enum_to_text(&run.trigger_type)?,
            enum_to_text(&run.status)?,
            started_kind,
            started_value,
            ended_kind,
            ended_value,
            run.error,
            run.continuation_token,
            run.message_id.as_ref().map(MessageId::as_str),
            run.proposal_id.as_ref().map(ProposalId::as_str),
            metadata_json,
        ],
    )?;
    Ok(())
}

// ============================================================================
// SECTION: Row mapping - Execution
// ============================================================================

/// Reconstructs an [`Execution`] from an `executions` row.
fn execution_from_row(row: &Row<'_>) -> rusqlite::Result<Execution> {
    Ok(Execution {
        id: ExecutionId::new(row.get::<_, String>("id")?),
        proposal_id: ProposalId::new(row.get::<_, String>("proposal_id")?),
        case_id: CaseId::new(row.get::<_, String>("case_id")?),
        kind: enum_from_text(&row.get::<_, String>("kind")?).map_err(sqlite_fromsql_error)?,
        provider_message_id: row.get("provider_message_id")?,
        status: enum_from_text(&row.get::<_, String>("status")?).map_err(sqlite_fromsql_error)?,
        started_at: ts_from_columns(
            &row.get::<_, String>("started_at_kind")?,
            row.get("started_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
        completed_at: opt_ts_from_columns(
            row.get("completed_at_kind")?,
            row.get("completed_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
        error: row.get("error")?,
    })
}

/// Inserts an [`Execution`] into the `executions` table.
fn insert_execution_stmt(conn: &Connection, execution: &Execution) -> Result<(), SqliteStoreError> {
    let (started_kind, started_value) = ts_columns(&execution.started_at)?;
    let (completed_kind, completed_value) = opt_ts_columns(execution.completed_at.as_ref())?;
    conn.execute(
        "INSERT INTO executions (
            id, proposal_id, case_id, kind, provider_message_id, status,
            started_at_kind, started_at_value, completed_at_kind, completed_at_value, error
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
            execution.id.as_str(),
            execution.proposal_id.as_str(),
            execution.case_id.as_str(),
            enum_to_text(&execution.kind)?,
            execution.provider_message_id,
            enum_to_text(&execution.status)?,
            started_kind,
            started_value,
            completed_kind,
            completed_value,
            execution.error,
        ],
    )?;
    Ok(())
}

/// Replaces an `executions` row wholesale (`started` -> `completed`/`failed`).
fn put_execution_stmt(conn: &Connection, execution: &Execution) -> Result<(), SqliteStoreError> {
    let (completed_kind, completed_value) = opt_ts_columns(execution.completed_at.as_ref())?;
    conn.execute(
        "UPDATE executions SET
            provider_message_id = ?2, status = ?3, completed_at_kind = ?4,
            completed_at_value = ?5, error = ?6
        WHERE id = ?1",
        params![
            execution.id.as_str(),
            execution.provider_message_id,
            enum_to_text(&execution.status)?,
            completed_kind,
            completed_value,
            execution.error,
        ],
    )?;
    Ok(())
}

// ============================================================================
// SECTION: Row mapping - ActivityLogEntry / CaseOperationLock / Waitpoint
// ============================================================================

/// Reconstructs an [`ActivityLogEntry`] from an `activity_log` row.
fn activity_from_row(row: &Row<'_>) -> rusqlite::Result<ActivityLogEntry> {
    let seq: i64 = row.get("seq")?;
    let seq = u64::try_from(seq).map_err(sqlite_int_error)?;
    Ok(ActivityLogEntry {
        id: ActivityId::new(row.get::<_, String>("id")?),
        case_id: CaseId::new(row.get::<_, String>("case_id")?),
        seq,
        event_type: row.get("event_type")?,
        description: row.get("description")?,
        metadata: decode_json(&row.get::<_, String>("metadata_json")?)
            .map_err(sqlite_fromsql_error)?,
        recorded_at: ts_from_columns(
            &row.get::<_, String>("recorded_at_kind")?,
            row.get("recorded_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
    })
}

/// Converts an out-of-range integer column into a `rusqlite::Error`.
fn sqlite_int_error(error: std::num::TryFromIntError) -> rusqlite::Error {
    rusqlite::Error::IntegralValueOutOfRange(0, error.into())
}

/// Reconstructs a [`CaseOperationLock`] from a `case_operation_locks` row.
fn lock_from_row(row: &Row<'_>) -> rusqlite::Result<CaseOperationLock> {
    Ok(CaseOperationLock {
        case_id: CaseId::new(row.get::<_, String>("case_id")?),
        operation: row.get("operation")?,
        token: CaseLockToken::new(row.get::<_, String>("token")?),
        holder_run_id: row
            .get::<_, Option<String>>("holder_run_id")?
            .map(RunId::new),
        acquired_at: ts_from_columns(
            &row.get::<_, String>("acquired_at_kind")?,
            row.get("acquired_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
        expires_at: ts_from_columns(
            &row.get::<_, String>("expires_at_kind")?,
            row.get("expires_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
    })
}

/// Reconstructs a [`Waitpoint`] from a `waitpoints` row.
fn waitpoint_from_row(row: &Row<'_>) -> rusqlite::Result<Waitpoint> {
    Ok(Waitpoint {
        token: WaitpointToken::new(row.get::<_, String>("token")?),
        proposal_id: ProposalId::new(row.get::<_, String>("proposal_id")?),
        created_at: ts_from_columns(
            &row.get::<_, String>("created_at_kind")?,
            row.get("created_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
        expires_at: ts_from_columns(
            &row.get::<_, String>("expires_at_kind")?,
            row.get("expires_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
        completed_at: opt_ts_from_columns(
            row.get("completed_at_kind")?,
            row.get("completed_at_value")?,
        )
        .map_err(sqlite_fromsql_error)?,
        completion_payload: row
            .get::<_, Option<String>>("completion_payload_json")?
            .map(|text| decode_json::<WaitpointPayload>(&text))
            .transpose()
            .map_err(sqlite_fromsql_error)?,
    })
}

// ============================================================================
// SECTION: SqliteStore
// ============================================================================

/// A round-robin pool of read-only connections.
struct ReadPool {
    /// The pooled connections, each guarded by its own mutex so one slow
    /// reader does not block a reader on a different connection.
    connections: Vec<Mutex<Connection>>,
    /// Cursor selecting the next connection to try.
    cursor: AtomicUsize,
}

impl ReadPool {
    /// Runs `f` against the next pooled connection in round-robin order.
    fn with<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.connections.len();
        let guard = self.connections[index]
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    }
}

/// `SQLite`-backed implementation of [`Store`], [`CaseLockPort`], and
/// [`WaitpointPort`].
///
/// # Invariants
/// - Every write goes through `write_connection`; no caller ever opens a
///   second writable handle to the same file.
/// - `proposal_key` and `execution_key` carry `UNIQUE` constraints in the
///   schema, so a conflicting insert surfaces as [`StoreError::Conflict`]
///   rather than corrupting the uniqueness invariant silently.
#[derive(Clone)]
pub struct SqliteStore {
    /// The single writable connection, guarded by a mutex.
    write_connection: Arc<Mutex<Connection>>,
    /// Read-only connection pool.
    read_pool: Arc<ReadPool>,
}

impl SqliteStore {
    /// Opens (creating if necessary) a `SQLite` store at `config.path`,
    /// applying pragmas and creating the schema if it does not yet exist.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the file cannot be opened or
    /// the schema cannot be created.
    pub fn open(config: &SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let write_connection = open_connection(&config.path, config)?;
        create_schema(&write_connection)?;
        let mut connections = Vec::with_capacity(config.read_pool_size);
        for _ in 0..config.read_pool_size {
            let conn = open_connection(&config.path, config)?;
            connections.push(Mutex::new(conn));
        }
        Ok(Self {
            write_connection: Arc::new(Mutex::new(write_connection)),
            read_pool: Arc::new(ReadPool {
                connections,
                cursor: AtomicUsize::new(0),
            }),
        })
    }

    /// Opens an in-memory store, primarily for tests.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError::Db`] when the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, SqliteStoreError> {
        let write_connection = Connection::open_in_memory()?;
        write_connection.execute_batch("PRAGMA journal_mode = MEMORY;")?;
        create_schema(&write_connection)?;
        Ok(Self {
            write_connection: Arc::new(Mutex::new(write_connection)),
            read_pool: Arc::new(ReadPool {
                connections: Vec::new(),
                cursor: AtomicUsize::new(0),
            }),
        })
    }

    /// Runs `f` against the write connection.
    fn with_write<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        let guard = self
            .write_connection
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        f(&guard)
    }

    /// Runs `f` against a read connection when the pool is non-empty,
    /// falling back to the write connection for in-memory stores opened
    /// with [`Self::open_in_memory`] (which carries no read pool).
    fn with_read<T>(
        &self,
        f: impl Fn(&Connection) -> Result<T, SqliteStoreError>,
    ) -> Result<T, SqliteStoreError> {
        if self.read_pool.connections.is_empty() {
            self.with_write(|conn| f(conn))
        } else {
            self.read_pool.with(|conn| f(conn))
        }
    }
}

/// Opens one connection at `path` with `config`'s pragmas applied.
fn open_connection(
    path: &Path,
    config: &SqliteStoreConfig,
) -> Result<Connection, SqliteStoreError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
    conn.pragma_update(None, "journal_mode", "wal")?;
    conn.pragma_update(None, "synchronous", config.sync_mode.pragma_value())?;
    conn.pragma_update(None, "foreign_keys", "on")?;
    Ok(conn)
}

/// Creates the schema if it does not already exist.
fn create_schema(conn: &Connection) -> Result<(), SqliteStoreError> {
    conn.execute_batch(&format!(
        "
        CREATE TABLE IF NOT EXISTS schema_meta (version INTEGER NOT NULL);
        INSERT INTO schema_meta (version)
            SELECT {SCHEMA_VERSION} WHERE NOT EXISTS (SELECT 1 FROM schema_meta);

        CREATE TABLE IF NOT EXISTS cases (
            id TEXT PRIMARY KEY,
            status TEXT NOT NULL,
            substatus TEXT,
            autopilot_mode TEXT NOT NULL,
            requires_human INTEGER NOT NULL,
            pause_reason TEXT,
            agency_email TEXT,
            portal_url TEXT,
            deadline_date_kind TEXT,
            deadline_date_value INTEGER,
            fee_quote_json TEXT,
            scope_items_json TEXT NOT NULL,
            constraints_json TEXT NOT NULL,
            send_date_kind TEXT,
            send_date_value INTEGER,
            last_portal_status TEXT,
            closed_at_kind TEXT,
            closed_at_value INTEGER,
            outcome_type TEXT,
            outcome_summary TEXT
        );

        CREATE TABLE IF NOT EXISTS messages (
            id TEXT PRIMARY KEY,
            case_id TEXT,
            thread_id TEXT,
            direction TEXT NOT NULL,
            from_addr TEXT NOT NULL,
            to_addr TEXT NOT NULL,
            subject TEXT,
            body_text TEXT,
            body_html TEXT,
            provider_message_id TEXT,
            received_at_kind TEXT,
            received_at_value INTEGER,
            sent_at_kind TEXT,
            sent_at_value INTEGER,
            processed_at_kind TEXT,
            processed_at_value INTEGER,
            processed_run_id TEXT,
            message_type TEXT NOT NULL,
            attachments_json TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_messages_case ON messages(case_id, received_at_value);

        CREATE TABLE IF NOT EXISTS proposals (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL,
            trigger_message_id TEXT,
            action_type TEXT NOT NULL,
            status TEXT NOT NULL,
            confidence REAL NOT NULL,
            risk_flags_json TEXT NOT NULL,
            warnings_json TEXT NOT NULL,
            gate_options_json TEXT NOT NULL,
            draft_subject TEXT,
            draft_body_text TEXT,
            draft_body_html TEXT,
            reasoning_json TEXT NOT NULL,
            waitpoint_token TEXT,
            execution_key TEXT UNIQUE,
            run_id TEXT,
            human_decision_json TEXT,
            executed_at_kind TEXT,
            executed_at_value INTEGER,
            email_job_id TEXT,
            proposal_key TEXT NOT NULL UNIQUE,
            adjustment_count INTEGER NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_proposals_case ON proposals(case_id);

        CREATE TABLE IF NOT EXISTS agent_runs (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL,
            trigger_type TEXT NOT NULL,
            status TEXT NOT NULL,
            started_at_kind TEXT,
            started_at_value INTEGER,
            ended_at_kind TEXT,
            ended_at_value INTEGER,
            error TEXT,
            continuation_token TEXT,
            message_id TEXT,
            proposal_id TEXT,
            metadata_json TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_runs_case ON agent_runs(case_id, status);

        CREATE TABLE IF NOT EXISTS case_operation_locks (
            case_id TEXT NOT NULL,
            operation TEXT NOT NULL,
            token TEXT NOT NULL,
            holder_run_id TEXT,
            acquired_at_kind TEXT NOT NULL,
            acquired_at_value INTEGER NOT NULL,
            expires_at_kind TEXT NOT NULL,
            expires_at_value INTEGER NOT NULL,
            generation INTEGER NOT NULL,
            PRIMARY KEY (case_id, operation)
        );

        CREATE TABLE IF NOT EXISTS waitpoints (
            token TEXT PRIMARY KEY,
            proposal_id TEXT NOT NULL,
            created_at_kind TEXT NOT NULL,
            created_at_value INTEGER NOT NULL,
            expires_at_kind TEXT NOT NULL,
            expires_at_value INTEGER NOT NULL,
            completed_at_kind TEXT,
            completed_at_value INTEGER,
            completion_payload_json TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_waitpoints_proposal ON waitpoints(proposal_id);

        CREATE TABLE IF NOT EXISTS executions (
            id TEXT PRIMARY KEY,
            proposal_id TEXT NOT NULL,
            case_id TEXT NOT NULL,
            kind TEXT NOT NULL,
            provider_message_id TEXT,
            status TEXT NOT NULL,
            started_at_kind TEXT NOT NULL,
            started_at_value INTEGER NOT NULL,
            completed_at_kind TEXT,
            completed_at_value INTEGER,
            error TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_executions_proposal ON executions(proposal_id);

        CREATE TABLE IF NOT EXISTS activity_log (
            id TEXT PRIMARY KEY,
            case_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            event_type TEXT NOT NULL,
            description TEXT NOT NULL,
            metadata_json TEXT NOT NULL,
            recorded_at_kind TEXT NOT NULL,
            recorded_at_value INTEGER NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_activity_case_seq ON activity_log(case_id, seq);
        "
    ))?;
    Ok(())
}

// ============================================================================
// SECTION: Store impl
// ============================================================================

impl Store for SqliteStore {
    fn get_case(&self, case_id: &CaseId) -> Result<Case, StoreError> {
        self.with_read(|conn| {
            conn.query_row(
                "SELECT * FROM cases WHERE id = ?1",
                params![case_id.as_str()],
                case_from_row,
            )
            .optional()?
            .ok_or_else(|| SqliteStoreError::Invalid(format!("case {case_id} not found")))
        })
        .map_err(|error| match error {
            SqliteStoreError::Invalid(message) if message.contains("not found") => {
                StoreError::NotFound(message)
            }
            other => other.into(),
        })
    }

    fn put_case(&self, case: &Case) -> Result<(), StoreError> {
        self.with_write(|conn| put_case_stmt(conn, case))
            .map_err(Into::into)
    }

    fn get_message(&self, message_id: &MessageId) -> Result<Message, StoreError> {
        self.with_read(|conn| {
            conn.query_row(
                "SELECT * FROM messages WHERE id = ?1",
                params![message_id.as_str()],
                message_from_row,
            )
            .optional()?
            .ok_or_else(|| SqliteStoreError::Invalid(format!("message {message_id} not found")))
        })
        .map_err(|error| match error {
            SqliteStoreError::Invalid(message) if message.contains("not found") => {
                StoreError::NotFound(message)
            }
            other => other.into(),
        })
    }

    fn insert_message(&self, message: &Message) -> Result<(), StoreError> {
        self.with_write(|conn| put_message_stmt(conn, message))
            .map_err(Into::into)
    }

    fn put_message(&self, message: &Message) -> Result<(), StoreError> {
        self.with_write(|conn| put_message_stmt(conn, message))
            .map_err(Into::into)
    }

    fn list_messages_for_case(&self, case_id: &CaseId) -> Result<Vec<Message>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM messages WHERE case_id = ?1
                 ORDER BY COALESCE(received_at_value, sent_at_value, 0) ASC",
            )?;
            let rows = stmt.query_map(params![case_id.as_str()], message_from_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            Ok(messages)
        })
        .map_err(Into::into)
    }

    fn match_case_for_message(&self, message: &Message) -> Result<Option<CaseId>, StoreError> {
        self.with_read(|conn| {
            let by_recipient: Option<String> = conn
                .query_row(
                    "SELECT case_id FROM cases WHERE agency_email = ?1 LIMIT 1",
                    params![message.to],
                    |row| row.get(0),
                )
                .optional()?;
            if let Some(case_id) = by_recipient {
                return Ok(Some(CaseId::new(case_id)));
            }
            let by_sender: Option<String> = conn
                .query_row(
                    "SELECT case_id FROM cases WHERE agency_email = ?1 LIMIT 1",
                    params![message.from],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(by_sender.map(CaseId::new))
        })
        .map_err(Into::into)
    }

    fn insert_proposal(&self, proposal: &Proposal) -> Result<Proposal, StoreError> {
        self.with_write(|conn| {
            let existing = conn
                .query_row(
                    "SELECT * FROM proposals WHERE proposal_key = ?1",
                    params![proposal.proposal_key],
                    proposal_from_row,
                )
                .optional()?;
            if let Some(existing) = existing {
                return Ok(existing);
            }
            insert_proposal_stmt(conn, proposal)?;
            Ok(proposal.clone())
        })
        .map_err(Into::into)
    }

    fn get_proposal(&self, proposal_id: &ProposalId) -> Result<Proposal, StoreError> {
        self.with_read(|conn| {
            conn.query_row(
                "SELECT * FROM proposals WHERE id = ?1",
                params![proposal_id.as_str()],
                proposal_from_row,
            )
            .optional()?
            .ok_or_else(|| SqliteStoreError::Invalid(format!("proposal {proposal_id} not found")))
        })
        .map_err(|error| match error {
            SqliteStoreError::Invalid(message) if message.contains("not found") => {
                StoreError::NotFound(message)
            }
            other => other.into(),
        })
    }

    fn put_proposal(&self, proposal: &Proposal) -> Result<(), StoreError> {
        self.with_write(|conn| put_proposal_stmt(conn, proposal))
            .map_err(|error| match error {
                SqliteStoreError::Db(message) if message.contains("UNIQUE") => {
                    StoreError::Conflict(format!("execution_key already in use: {message}"))
                }
                other => other.into(),
            })
    }

    fn claim_proposal_for_execution(
        &self,
        proposal_id: &ProposalId,
        expected_status: ProposalStatus,
        execution_key: &ExecutionKey,
    ) -> Result<bool, StoreError> {
        self.with_write(|conn| {
            let rows = conn.execute(
                "UPDATE proposals SET status = ?4, execution_key = ?3
                 WHERE id = ?1 AND status = ?2
                   AND (execution_key IS NULL OR execution_key = ?3)",
                params![
                    proposal_id.as_str(),
                    enum_to_text(&expected_status)?,
                    execution_key.as_str(),
                    enum_to_text(&ProposalStatus::Executing)?,
                ],
            )?;
            Ok(rows > 0)
        })
        .map_err(Into::into)
    }

    fn count_pending_proposals(&self, case_id: &CaseId) -> Result<usize, StoreError> {
        self.with_read(|conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM proposals WHERE case_id = ?1 AND status IN (?2, ?3)",
                params![
                    case_id.as_str(),
                    enum_to_text(&ProposalStatus::PendingApproval)?,
                    enum_to_text(&ProposalStatus::Blocked)?,
                ],
                |row| row.get(0),
            )?;
            usize::try_from(count)
                .map_err(|_| SqliteStoreError::Invalid("negative count".to_string()))
        })
        .map_err(Into::into)
    }

    fn list_proposals_for_case(&self, case_id: &CaseId) -> Result<Vec<Proposal>, StoreError> {
        self.with_read(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM proposals WHERE case_id = ?1 ORDER BY rowid DESC")?;
            let rows = stmt.query_map(params![case_id.as_str()], proposal_from_row)?;
            let mut proposals = Vec::new();
            for row in rows {
                proposals.push(row?);
            }
            Ok(proposals)
        })
        .map_err(Into::into)
    }

    fn insert_run(&self, run: &AgentRun) -> Result<(), StoreError> {
        self.with_write(|conn| insert_run_stmt(conn, run))
            .map_err(Into::into)
    }

    fn get_run(&self, run_id: &RunId) -> Result<AgentRun, StoreError> {
        self.with_read(|conn| {
            conn.query_row(
                "SELECT * FROM agent_runs WHERE id = ?1",
                params![run_id.as_str()],
                run_from_row,
            )
            .optional()?
            .ok_or_else(|| SqliteStoreError::Invalid(format!("run {run_id} not found")))
        })
        .map_err(|error| match error {
            SqliteStoreError::Invalid(message) if message.contains("not found") => {
                StoreError::NotFound(message)
            }
            other => other.into(),
        })
    }

    fn put_run(&self, run: &AgentRun) -> Result<(), StoreError> {
        self.with_write(|conn| put_run_stmt(conn, run))
            .map_err(Into::into)
    }

    fn find_live_run(&self, case_id: &CaseId) -> Result<Option<AgentRun>, StoreError> {
        self.with_read(|conn| {
            conn.query_row(
                "SELECT * FROM agent_runs WHERE case_id = ?1 AND status IN (?2, ?3, ?4)
                 ORDER BY rowid DESC LIMIT 1",
                params![
                    case_id.as_str(),
                    enum_to_text(&RunStatus::Queued)?,
                    enum_to_text(&RunStatus::Running)?,
                    enum_to_text(&RunStatus::Waiting)?,
                ],
                run_from_row,
            )
            .optional()
            .map_err(SqliteStoreError::from)
        })
        .map_err(Into::into)
    }

    fn list_stuck_runs(&self, cutoff: Timestamp) -> Result<Vec<AgentRun>, StoreError> {
        self.with_read(|conn| {
            let (_, cutoff_value) = ts_columns(&cutoff)?;
            let mut stmt = conn.prepare(
                "SELECT * FROM agent_runs WHERE status = ?1
                 AND started_at_value IS NOT NULL AND started_at_value < ?2",
            )?;
            let rows = stmt.query_map(
                params![enum_to_text(&RunStatus::Running)?, cutoff_value],
                run_from_row,
            )?;
            let mut runs = Vec::new();
            for row in rows {
                runs.push(row?);
            }
            Ok(runs)
        })
        .map_err(Into::into)
    }

    fn list_cases_requiring_human(&self) -> Result<Vec<Case>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare("SELECT * FROM cases WHERE requires_human = 1")?;
            let rows = stmt.query_map(params![], case_from_row)?;
            let mut cases = Vec::new();
            for row in rows {
                cases.push(row?);
            }
            Ok(cases)
        })
        .map_err(Into::into)
    }

    fn insert_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        self.with_write(|conn| insert_execution_stmt(conn, execution))
            .map_err(Into::into)
    }

    fn put_execution(&self, execution: &Execution) -> Result<(), StoreError> {
        self.with_write(|conn| put_execution_stmt(conn, execution))
            .map_err(Into::into)
    }

    fn list_executions_for_proposal(
        &self,
        proposal_id: &ProposalId,
    ) -> Result<Vec<Execution>, StoreError> {
        self.with_read(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM executions WHERE proposal_id = ?1 ORDER BY rowid ASC")?;
            let rows = stmt.query_map(params![proposal_id.as_str()], execution_from_row)?;
            let mut executions = Vec::new();
            for row in rows {
                executions.push(row?);
            }
            Ok(executions)
        })
        .map_err(Into::into)
    }

    fn list_open_portal_submissions(&self) -> Result<Vec<Execution>, StoreError> {
        self.with_read(|conn| {
            let mut stmt = conn.prepare(
                "SELECT * FROM executions WHERE kind = ?1 AND status = ?2 ORDER BY rowid ASC",
            )?;
            let rows = stmt.query_map(
                params![
                    enum_to_text(&ExecutionKind::PortalSubmission)?,
                    enum_to_text(&ExecutionStatus::Started)?,
                ],
                execution_from_row,
            )?;
            let mut executions = Vec::new();
            for row in rows {
                executions.push(row?);
            }
            Ok(executions)
        })
        .map_err(Into::into)
    }

    fn append_activity_log(
        &self,
        case_id: &CaseId,
        event_type: &str,
        description: &str,
        metadata: MetadataMap,
        recorded_at: Timestamp,
    ) -> Result<ActivityLogEntry, StoreError> {
        self.with_write(|conn| {
            let next_seq: i64 = conn.query_row(
                "SELECT COALESCE(MAX(seq), 0) + 1 FROM activity_log WHERE case_id = ?1",
                params![case_id.as_str()],
                |row| row.get(0),
            )?;
            let (kind, value) = ts_columns(&recorded_at)?;
            let metadata_json = encode_json(&metadata)?;
            let id = format!("{case_id}-{next_seq}");
            conn.execute(
                "INSERT INTO activity_log (
                    id, case_id, seq, event_type, description, metadata_json,
                    recorded_at_kind, recorded_at_value
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    case_id.as_str(),
                    next_seq,
                    event_type,
                    description,
                    metadata_json,
                    kind,
                    value
                ],
            )?;
            let seq = u64::try_from(next_seq)
                .map_err(|_| SqliteStoreError::Invalid("negative sequence".to_string()))?;
            Ok(ActivityLogEntry {
                id: ActivityId::new(id),
                case_id: case_id.clone(),
                seq,
                event_type: event_type.to_string(),
                description: description.to_string(),
                metadata,
                recorded_at,
            })
        })
        .map_err(Into::into)
    }

    fn list_activity_log(&self, case_id: &CaseId) -> Result<Vec<ActivityLogEntry>, StoreError> {
        self.with_read(|conn| {
            let mut stmt =
                conn.prepare("SELECT * FROM activity_log WHERE case_id = ?1 ORDER BY seq ASC")?;
            let rows = stmt.query_map(params![case_id.as_str()], activity_from_row)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .map_err(Into::into)
    }

    fn readiness(&self) -> Result<(), StoreError> {
        self.with_read(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))
                .map_err(SqliteStoreError::from)
        })
        .map_err(Into::into)
    }
}

// ============================================================================
// SECTION: CaseLockPort impl
// ============================================================================

impl CaseLockPort for SqliteStore {
    fn acquire(
        &self,
        case_id: &CaseId,
        operation: &str,
        ttl_millis: u64,
        now: Timestamp,
    ) -> Result<(CaseLockToken, FencingInfo), LockError> {
        self.with_write(|conn| {
            let expires_at = add_millis(&now, ttl_millis)?;
            let (now_kind, now_value) = ts_columns(&now)?;
            let (expires_kind, expires_value) = ts_columns(&expires_at)?;
            let token = CaseLockToken::new(generate_token());

            let existing: Option<(String, i64)> = conn
                .query_row(
                    "SELECT expires_at_kind, expires_at_value FROM case_operation_locks
                     WHERE case_id = ?1 AND operation = ?2",
                    params![case_id.as_str(), operation],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;

            let expired_now = match &existing {
                None => true,
                Some((kind, value)) => {
                    let existing_expiry = ts_from_columns(kind, *value)?;
                    existing_expiry.precedes(&now)
                }
            };

            if !expired_now {
                return Err(SqliteStoreError::Invalid("lock contention".to_string()));
            }

            let generation: i64 = conn.query_row(
                "SELECT COALESCE(generation, 0) + 1 FROM case_operation_locks
                 WHERE case_id = ?1 AND operation = ?2
                 UNION ALL SELECT 1 LIMIT 1",
                params![case_id.as_str(), operation],
                |row| row.get(0),
            )?;

            conn.execute(
                "INSERT INTO case_operation_locks (
                    case_id, operation, token, holder_run_id, acquired_at_kind,
                    acquired_at_value, expires_at_kind, expires_at_value, generation
                ) VALUES (?1, ?2, ?3, NULL, ?4, ?5, ?6, ?7, ?8)
                ON CONFLICT(case_id, operation) DO UPDATE SET
                    token = excluded.token,
                    holder_run_id = excluded.holder_run_id,
                    acquired_at_kind = excluded.acquired_at_kind,
                    acquired_at_value = excluded.acquired_at_value,
                    expires_at_kind = excluded.expires_at_kind,
                    expires_at_value = excluded.expires_at_value,
                    generation = excluded.generation",
                params![
                    case_id.as_str(),
                    operation,
                    token.as_str(),
                    now_kind,
                    now_value,
                    expires_kind,
                    expires_value,
                    generation,
                ],
            )?;

            let generation = u64::try_from(generation)
                .map_err(|_| SqliteStoreError::Invalid("negative generation".to_string()))?;
            Ok((token, FencingInfo { generation }))
        })
        .map_err(|error| match error {
            SqliteStoreError::Invalid(message) if message == "lock contention" => {
                LockError::Contention(format!("{case_id}/{operation}"))
            }
            other => other.into(),
        })
    }

    fn release(
        &self,
        case_id: &CaseId,
        operation: &str,
        token: &CaseLockToken,
    ) -> Result<(), LockError> {
        self.with_write(|conn| {
            conn.execute(
                "DELETE FROM case_operation_locks WHERE case_id = ?1 AND operation = ?2 AND token = ?3",
                params![case_id.as_str(), operation, token.as_str()],
            )?;
            Ok(())
        })
        .map_err(Into::into)
    }

    fn refresh(
        &self,
        case_id: &CaseId,
        operation: &str,
        token: &CaseLockToken,
        ttl_millis: u64,
        now: Timestamp,
    ) -> Result<(), LockError> {
        self.with_write(|conn| {
            let expires_at = add_millis(&now, ttl_millis)?;
            let (expires_kind, expires_value) = ts_columns(&expires_at)?;
            conn.execute(
                "UPDATE case_operation_locks SET expires_at_kind = ?4, expires_at_value = ?5
                 WHERE case_id = ?1 AND operation = ?2 AND token = ?3",
                params![
                    case_id.as_str(),
                    operation,
                    token.as_str(),
                    expires_kind,
                    expires_value
                ],
            )?;
            Ok(())
        })
        .map_err(Into::into)
    }

    fn list_expired(&self, now: Timestamp) -> Result<Vec<CaseOperationLock>, LockError> {
        self.with_read(|conn| {
            let (_, now_value) = ts_columns(&now)?;
            let mut stmt =
                conn.prepare("SELECT * FROM case_operation_locks WHERE expires_at_value < ?1")?;
            let rows = stmt.query_map(params![now_value], lock_from_row)?;
            let mut locks = Vec::new();
            for row in rows {
                locks.push(row?);
            }
            Ok(locks)
        })
        .map_err(Into::into)
    }
}

/// Adds `millis` to `ts`, preserving its representation (`Logical` ticks
/// advance by the same integer amount as `UnixMillis`).
fn add_millis(ts: &Timestamp, millis: u64) -> Result<Timestamp, SqliteStoreError> {
    match ts {
        Timestamp::UnixMillis(value) => {
            let delta = i64::try_from(millis)
                .map_err(|_| SqliteStoreError::Invalid("ttl overflow".to_string()))?;
            Ok(Timestamp::UnixMillis(value.saturating_add(delta)))
        }
        Timestamp::Logical(value) => Ok(Timestamp::Logical(value.saturating_add(millis))),
    }
}

/// Generates an unguessable token (>= 128 bits of entropy) for locks and
/// waitpoints using the operating system's CSPRNG.
fn generate_token() -> String {
    use rand::RngCore;
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|byte| format!("{byte:02x}")).collect()
}

// ============================================================================
// SECTION: WaitpointPort impl
// ============================================================================

impl WaitpointPort for SqliteStore {
    fn create(
        &self,
        proposal_id: &ProposalId,
        ttl_millis: u64,
        now: Timestamp,
    ) -> Result<WaitpointToken, WaitpointError> {
        self.with_write(|conn| {
            let token = WaitpointToken::new(generate_token());
            let expires_at = add_millis(&now, ttl_millis)?;
            let (created_kind, created_value) = ts_columns(&now)?;
            let (expires_kind, expires_value) = ts_columns(&expires_at)?;
            conn.execute(
                "INSERT INTO waitpoints (
                    token, proposal_id, created_at_kind, created_at_value,
                    expires_at_kind, expires_at_value, completed_at_kind,
                    completed_at_value, completion_payload_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, NULL, NULL, NULL)",
                params![
                    token.as_str(),
                    proposal_id.as_str(),
                    created_kind,
                    created_value,
                    expires_kind,
                    expires_value,
                ],
            )?;
            Ok(token)
        })
        .map_err(Into::into)
    }

    fn complete(
        &self,
        token: &WaitpointToken,
        payload: WaitpointPayload,
        now: Timestamp,
    ) -> Result<(), WaitpointError> {
        self.with_write(|conn| {
            let (kind, value) = ts_columns(&now)?;
            let payload_json = encode_json(&payload)?;
            let rows = conn.execute(
                "UPDATE waitpoints SET completed_at_kind = ?2, completed_at_value = ?3,
                     completion_payload_json = ?4
                 WHERE token = ?1 AND completed_at_kind IS NULL",
                params![token.as_str(), kind, value, payload_json],
            )?;
            if rows == 0 {
                let exists: Option<i64> = conn
                    .query_row(
                        "SELECT 1 FROM waitpoints WHERE token = ?1",
                        params![token.as_str()],
                        |row| row.get(0),
                    )
                    .optional()?;
                return Err(SqliteStoreError::Invalid(if exists.is_some() {
                    "already completed".to_string()
                } else {
                    "not found".to_string()
                }));
            }
            Ok(())
        })
        .map_err(|error| match error {
            SqliteStoreError::Invalid(message) if message == "already completed" => {
                WaitpointError::AlreadyCompleted
            }
            SqliteStoreError::Invalid(message) if message == "not found" => {
                WaitpointError::NotFound
            }
            other => other.into(),
        })
    }

    fn peek(
        &self,
        token: &WaitpointToken,
    ) -> Result<caseflow_core::WaitpointOutcome, WaitpointError> {
        use caseflow_core::WaitpointOutcome;
        self.with_read(|conn| {
            let waitpoint = conn
                .query_row(
                    "SELECT * FROM waitpoints WHERE token = ?1",
                    params![token.as_str()],
                    waitpoint_from_row,
                )
                .optional()?;
            let Some(waitpoint) = waitpoint else {
                return Err(SqliteStoreError::Invalid("not found".to_string()));
            };
            Ok(match waitpoint.completion_payload {
                Some(payload) => WaitpointOutcome::Completed(Box::new(payload)),
                None => WaitpointOutcome::Pending,
            })
        })
        .map_err(|error| match error {
            SqliteStoreError::Invalid(message) if message == "not found" => {
                WaitpointError::NotFound
            }
            other => other.into(),
        })
    }

    fn list_expired(&self, now: Timestamp) -> Result<Vec<Waitpoint>, WaitpointError> {
        self.with_read(|conn| {
            let (_, now_value) = ts_columns(&now)?;
            let mut stmt = conn.prepare(
                "SELECT * FROM waitpoints WHERE completed_at_kind IS NULL AND expires_at_value < ?1",
            )?;
            let rows = stmt.query_map(params![now_value], waitpoint_from_row)?;
            let mut waitpoints = Vec::new();
            for row in rows {
                waitpoints.push(row?);
            }
            Ok(waitpoints)
        })
        .map_err(Into::into)
    }

    fn revoke_for_case(&self, case_id: &CaseId, now: Timestamp) -> Result<usize, WaitpointError> {
        self.with_write(|conn| {
            let (kind, value) = ts_columns(&now)?;
            let payload = encode_json(&WaitpointPayload {
                action: GateOption::Dismiss,
                instruction: None,
                reason: Some("case_reset".to_string()),
            })?;
            let rows = conn.execute(
                "UPDATE waitpoints SET completed_at_kind = ?1, completed_at_value = ?2,
                     completion_payload_json = ?3
                 WHERE completed_at_kind IS NULL AND proposal_id IN (
                     SELECT id FROM proposals WHERE case_id = ?4
                 )",
                params![kind, value, payload, case_id.as_str()],
            )?;
            usize::try_from(rows)
                .map_err(|_| SqliteStoreError::Invalid("negative row count".to_string()))
        })
        .map_err(Into::into)
    }
}
