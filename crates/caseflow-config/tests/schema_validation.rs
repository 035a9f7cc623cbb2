//! Schema validation tests for caseflow-config.
// crates/caseflow-config/tests/schema_validation.rs
// =============================================================================
// Module: Schema Validation Tests
// Description: Tests for schema completeness and correctness against the
//              CaseflowConfig model.
// Purpose: Ensure the generated JSON Schema matches config_toml_example and
//          rejects structurally invalid documents.
// =============================================================================

use caseflow_config::config_schema;
use caseflow_config::config_toml_example;
use jsonschema::Draft;
use jsonschema::Validator;
use serde_json::Value;
use serde_json::json;

type TestResult = Result<(), String>;

fn compile_schema(schema: &Value) -> Result<Validator, String> {
    jsonschema::options()
        .with_draft(Draft::Draft7)
        .build(schema)
        .map_err(|err| format!("failed to compile schema: {err}"))
}

fn schema_property<'a>(schema: &'a Value, pointer: &str) -> Result<&'a Value, String> {
    schema.pointer(pointer).ok_or_else(|| format!("missing schema property at {pointer}"))
}

fn example_as_json() -> Value {
    let toml_value: toml::Value = toml::from_str(&config_toml_example()).expect("example parses");
    serde_json::to_value(toml_value).expect("toml converts to json")
}

#[test]
fn schema_contains_all_top_level_fields() -> TestResult {
    let schema = config_schema();
    let properties = schema_property(&schema, "/properties")?;
    for field in ["store", "server", "autopilot", "timeouts", "providers"] {
        if properties.get(field).is_none() {
            return Err(format!("schema missing top-level field: {field}"));
        }
    }
    Ok(())
}

#[test]
fn schema_autopilot_section_complete() -> TestResult {
    let schema = config_schema();
    let props = schema_property(&schema, "/properties/autopilot/properties")?;
    for field in [
        "fee_auto_approve_max",
        "fee_hard_cap",
        "auto_safe_actions",
        "auto_min_confidence",
        "supervised_min_confidence",
    ] {
        if props.get(field).is_none() {
            return Err(format!("schema missing autopilot field: {field}"));
        }
    }
    Ok(())
}

#[test]
fn schema_timeouts_section_complete() -> TestResult {
    let schema = config_schema();
    let props = schema_property(&schema, "/properties/timeouts/properties")?;
    for field in [
        "waitpoint_ttl_millis",
        "case_lock_ttl_transition_millis",
        "case_lock_ttl_reset_millis",
        "idempotency_key_ttl_millis",
        "portal_soft_timeout_millis",
        "portal_hard_timeout_millis",
        "run_stuck_after_millis",
    ] {
        if props.get(field).is_none() {
            return Err(format!("schema missing timeouts field: {field}"));
        }
    }
    Ok(())
}

#[test]
fn schema_confidence_bounds_are_zero_to_one() -> TestResult {
    let schema = config_schema();
    let field = schema_property(&schema, "/properties/autopilot/properties/auto_min_confidence")?;
    let minimum =
        field.get("minimum").and_then(Value::as_f64).ok_or("auto_min_confidence missing minimum")?;
    let maximum =
        field.get("maximum").and_then(Value::as_f64).ok_or("auto_min_confidence missing maximum")?;
    if (minimum - 0.0).abs() > f64::EPSILON || (maximum - 1.0).abs() > f64::EPSILON {
        return Err(format!("auto_min_confidence bounds should be [0.0, 1.0], got [{minimum}, {maximum}]"));
    }
    Ok(())
}

#[test]
fn schema_all_objects_have_additional_properties_false() -> TestResult {
    let schema = config_schema();
    for pointer in
        ["", "/properties/store", "/properties/server", "/properties/autopilot", "/properties/timeouts"]
    {
        let node = if pointer.is_empty() { &schema } else { schema_property(&schema, pointer)? };
        let additional = node
            .get("additionalProperties")
            .and_then(Value::as_bool)
            .ok_or_else(|| format!("{pointer} missing additionalProperties"))?;
        if additional {
            return Err(format!("{pointer} should have additionalProperties=false"));
        }
    }
    Ok(())
}

#[test]
fn schema_rejects_unknown_top_level_field() -> TestResult {
    let schema = config_schema();
    let validator = compile_schema(&schema)?;
    let mut invalid = example_as_json();
    invalid["unknown_field"] = json!("value");
    if validator.is_valid(&invalid) {
        return Err("schema should reject unknown top-level field".to_string());
    }
    Ok(())
}

#[test]
fn schema_rejects_config_with_wrong_type() -> TestResult {
    let schema = config_schema();
    let validator = compile_schema(&schema)?;
    let mut invalid = example_as_json();
    invalid["server"]["max_request_bytes"] = json!("not a number");
    if validator.is_valid(&invalid) {
        return Err("schema should reject wrong type for max_request_bytes".to_string());
    }
    Ok(())
}

#[test]
fn schema_rejects_missing_required_section() -> TestResult {
    let schema = config_schema();
    let validator = compile_schema(&schema)?;
    let mut invalid = example_as_json();
    invalid.as_object_mut().expect("object").remove("timeouts");
    if validator.is_valid(&invalid) {
        return Err("schema should reject a document missing [timeouts]".to_string());
    }
    Ok(())
}

#[test]
fn schema_accepts_the_example_document() -> TestResult {
    let schema = config_schema();
    let validator = compile_schema(&schema)?;
    if !validator.is_valid(&example_as_json()) {
        return Err("schema should accept config_toml_example()".to_string());
    }
    Ok(())
}

#[test]
fn schema_sync_mode_enum_complete() -> TestResult {
    let schema = config_schema();
    let enum_values = schema_property(&schema, "/properties/store/properties/sync_mode/enum")?
        .as_array()
        .ok_or("sync_mode enum missing")?;
    for value in ["full", "normal"] {
        if !enum_values.iter().any(|entry| entry.as_str() == Some(value)) {
            return Err(format!("sync_mode enum missing value: {value}"));
        }
    }
    Ok(())
}

#[test]
fn schema_generation_is_deterministic() -> TestResult {
    let first = serde_json::to_string(&config_schema()).expect("serializes");
    let second = serde_json::to_string(&config_schema()).expect("serializes");
    if first != second {
        return Err("schema generation is not deterministic".to_string());
    }
    Ok(())
}

#[test]
fn schema_has_correct_schema_field() -> TestResult {
    let schema = config_schema();
    let schema_field =
        schema.get("$schema").and_then(Value::as_str).ok_or("schema missing $schema field")?;
    if !schema_field.contains("json-schema.org") {
        return Err(format!("$schema field should reference json-schema.org, got {schema_field}"));
    }
    Ok(())
}
