// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared harness and fixture builders for the caseflow
//              end-to-end scenario suites.
// Purpose: Give every suite file the same in-memory engine context, a
//          synchronous stand-in dispatcher, and small model fixture
//          builders, so suites read as scenario setup, not plumbing.
// Dependencies: caseflow-core, caseflow-config, caseflow-providers,
//               caseflow-service, caseflow-store-sqlite
// ============================================================================

#![allow(dead_code, reason = "Not every suite binary exercises every helper.")]

pub mod fixtures;
pub mod harness;
