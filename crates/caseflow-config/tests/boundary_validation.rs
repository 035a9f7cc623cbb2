//! Boundary validation tests for caseflow-config.
// crates/caseflow-config/tests/boundary_validation.rs
// =============================================================================
// Module: Boundary Validation Tests
// Description: Min/max boundary coverage for autopilot, timeout, and server
//              fields.
// Purpose: Ensure numeric boundaries in CaseflowConfig::validate are exact.
// =============================================================================

use caseflow_config::CaseflowConfig;
use caseflow_config::ConfigError;
use caseflow_config::config_toml_example;

type TestResult = Result<(), String>;

fn base_config() -> CaseflowConfig {
    CaseflowConfig::load_from_str(&config_toml_example()).expect("example config must load")
}

fn assert_invalid(result: Result<(), ConfigError>, needle: &str) -> TestResult {
    match result {
        Err(error) => {
            let message = error.to_string();
            if message.contains(needle) {
                Ok(())
            } else {
                Err(format!("error '{message}' did not contain '{needle}'"))
            }
        }
        Ok(()) => Err("expected invalid config".to_string()),
    }
}

#[test]
fn max_request_bytes_at_minimum_one() -> TestResult {
    let mut config = base_config();
    config.server.max_request_bytes = 1;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn max_request_bytes_at_zero_rejected() -> TestResult {
    let mut config = base_config();
    config.server.max_request_bytes = 0;
    assert_invalid(config.validate(), "max_request_bytes must be greater than zero")
}

#[test]
fn max_sse_connections_at_zero_rejected() -> TestResult {
    let mut config = base_config();
    config.server.max_sse_connections = 0;
    assert_invalid(config.validate(), "max_sse_connections must be greater than zero")
}

#[test]
fn empty_bind_addr_rejected() -> TestResult {
    let mut config = base_config();
    config.server.bind_addr = "   ".to_string();
    assert_invalid(config.validate(), "bind_addr must not be empty")
}

#[test]
fn confidence_at_exact_bounds_accepted() -> TestResult {
    let mut config = base_config();
    config.autopilot.auto_min_confidence = 0.0;
    config.autopilot.supervised_min_confidence = 1.0;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn confidence_above_one_rejected() -> TestResult {
    let mut config = base_config();
    config.autopilot.auto_min_confidence = 1.5;
    assert_invalid(config.validate(), "auto_min_confidence must be within")
}

#[test]
fn confidence_below_zero_rejected() -> TestResult {
    let mut config = base_config();
    config.autopilot.supervised_min_confidence = -0.1;
    assert_invalid(config.validate(), "supervised_min_confidence must be within")
}

#[test]
fn supervised_confidence_below_auto_confidence_rejected() -> TestResult {
    let mut config = base_config();
    config.autopilot.auto_min_confidence = 0.9;
    config.autopilot.supervised_min_confidence = 0.2;
    assert_invalid(config.validate(), "supervised_min_confidence must be >= auto_min_confidence")
}

#[test]
fn fee_auto_approve_max_equal_to_hard_cap_accepted() -> TestResult {
    let mut config = base_config();
    config.autopilot.fee_auto_approve_max = "100.00".to_string();
    config.autopilot.fee_hard_cap = "100.00".to_string();
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn fee_auto_approve_max_above_hard_cap_rejected() -> TestResult {
    let mut config = base_config();
    config.autopilot.fee_auto_approve_max = "300.00".to_string();
    config.autopilot.fee_hard_cap = "100.00".to_string();
    assert_invalid(config.validate(), "fee_auto_approve_max must be <= fee_hard_cap")
}

#[test]
fn non_decimal_fee_string_rejected() -> TestResult {
    let mut config = base_config();
    config.autopilot.fee_auto_approve_max = "not-a-number".to_string();
    assert_invalid(config.validate(), "is not a valid decimal")
}

#[test]
fn portal_soft_timeout_above_hard_timeout_rejected() -> TestResult {
    let mut config = base_config();
    config.timeouts.portal_soft_timeout_millis = 999_999;
    config.timeouts.portal_hard_timeout_millis = 1_000;
    assert_invalid(
        config.validate(),
        "portal_soft_timeout_millis must be <= portal_hard_timeout_millis",
    )
}

#[test]
fn portal_soft_timeout_equal_to_hard_timeout_accepted() -> TestResult {
    let mut config = base_config();
    config.timeouts.portal_soft_timeout_millis = 5_000;
    config.timeouts.portal_hard_timeout_millis = 5_000;
    config.validate().map_err(|err| err.to_string())
}

#[test]
fn empty_auto_safe_actions_is_valid() -> TestResult {
    let mut config = base_config();
    config.autopilot.auto_safe_actions.clear();
    config.validate().map_err(|err| err.to_string())
}
