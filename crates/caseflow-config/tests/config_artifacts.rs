//! Config artifact validation tests for caseflow-config.
// crates/caseflow-config/tests/config_artifacts.rs
// ============================================================================
// Module: Config Artifact Validation Tests
// Description: Validate config schema, example, and docs generators.
// Purpose: Prevent drift between config model and generated artifacts.
// Dependencies: caseflow-config, jsonschema, toml
// ============================================================================

use caseflow_config::config_docs_markdown;
use caseflow_config::config_schema;
use caseflow_config::config_toml_example;
use jsonschema::Draft;

type TestResult = Result<(), String>;

#[test]
fn config_schema_accepts_the_example_config() -> TestResult {
    let schema = config_schema();
    let validator = jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(&schema)
        .map_err(|err| err.to_string())?;

    let toml_str = config_toml_example();
    let toml_value: toml::Value = toml::from_str(&toml_str).map_err(|err| err.to_string())?;
    let json_value = serde_json::to_value(toml_value).map_err(|err| err.to_string())?;
    if !validator.is_valid(&json_value) {
        return Err("example config should validate against the schema".to_string());
    }
    Ok(())
}

#[test]
fn config_schema_rejects_an_empty_document() -> TestResult {
    let schema = config_schema();
    let validator = jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(&schema)
        .map_err(|err| err.to_string())?;
    if validator.is_valid(&serde_json::json!({})) {
        return Err("an empty document should not satisfy the required top-level keys".to_string());
    }
    Ok(())
}

#[test]
fn config_docs_cover_every_section() {
    let docs = config_docs_markdown();
    for heading in ["[store]", "[server]", "[autopilot]", "[timeouts]", "[providers.*]"] {
        assert!(docs.contains(heading), "docs missing section for {heading}");
    }
}
