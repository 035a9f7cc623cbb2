// crates/caseflow-store-sqlite/src/lib.rs
// ============================================================================
// Crate: caseflow-store-sqlite
// Description: SQLite-backed implementation of caseflow-core's Store,
//              CaseLockPort, and WaitpointPort traits.
// Purpose: Durable storage of cases, messages, proposals, runs, operation
//          locks, waitpoints, executions, and the activity log behind a
//          single writer connection and a small read-only pool.
// ============================================================================

//! Caseflow's SQLite storage crate.
//!
//! [`SqliteStore`] is the one durable backend shipped in this workspace. It
//! implements every port the orchestration engine needs against a shared
//! database file: [`caseflow_core::Store`], [`caseflow_core::CaseLockPort`],
//! and [`caseflow_core::WaitpointPort`]. Writes serialize through a single
//! mutex-guarded connection in WAL mode; reads use a small round-robin pool
//! of read-only connections so a long read never blocks the writer.

#![forbid(unsafe_code)]

mod store;

pub use store::SqliteStore;
pub use store::SqliteStoreConfig;
pub use store::SqliteStoreError;
pub use store::SqliteSyncMode;
pub use store::MAX_JSON_COLUMN_BYTES;
