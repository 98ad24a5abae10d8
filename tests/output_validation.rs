//! Output Validation Tests
//!
//! Builder outputs coerced and checked by the output adapter.

use std::error::Error as _;
use std::sync::Arc;

use schema_overseer::{
    BuildError, Builder, CanonicalOnly, Output, OutputAdapter, OutputViolation, RegistryConfig,
    Schema, SchemaRegistry,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize)]
struct InputFormat {
    value: String,
}

impl Schema for InputFormat {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct OutputRecord {
    value: i64,
}

#[derive(Serialize)]
struct OutputStrRecord {
    value: String,
}

fn validating<O>() -> SchemaRegistry<O>
where
    O: Serialize + serde::de::DeserializeOwned + 'static,
{
    let mut registry = SchemaRegistry::new(RegistryConfig::new().with_validate_output(true));
    registry.register_schema::<InputFormat>();
    registry
}

#[test]
fn test_validate_output_record() {
    let mut registry = validating::<OutputRecord>();
    registry
        .register_builder(Builder::from_fn("builder", |data: InputFormat| OutputRecord {
            value: data.value.parse().unwrap_or_default(),
        }))
        .unwrap();
    registry.setup().unwrap();

    let output = registry.build_from_value(json!({"value": "123"})).unwrap();
    assert_eq!(output.value, 123);
}

#[test]
fn test_validate_output_different_record() {
    let mut registry = validating::<OutputRecord>();
    registry
        .register_builder(Builder::from_fn("builder", |data: InputFormat| {
            Output::<OutputRecord>::record(&OutputStrRecord { value: data.value })
        }))
        .unwrap();
    registry.setup().unwrap();

    let output = registry.build_from_value(json!({"value": "123"})).unwrap();
    assert_eq!(output, OutputRecord { value: 123 });
}

#[test]
fn test_validate_output_record_error() {
    let mut registry = validating::<OutputRecord>();
    registry
        .register_builder(Builder::from_fn("builder", |data: InputFormat| {
            Output::<OutputRecord>::record(&OutputStrRecord { value: data.value })
        }))
        .unwrap();
    registry.setup().unwrap();

    let err = registry.build_from_value(json!({"value": "qwe"})).unwrap_err();
    assert!(matches!(err, BuildError::OutputValidation { .. }));
    assert!(!err.is_invalid_input());

    let cause = err.source().expect("output validation error chains its cause");
    assert!(cause.to_string().contains("OutputRecord"));
}

#[test]
fn test_validate_output_converts_plain_mapping() {
    let mut registry = validating::<OutputRecord>();
    registry
        .register_builder(Builder::from_fn("builder", |data: InputFormat| {
            Output::<OutputRecord>::plain(json!({ "value": data.value }))
        }))
        .unwrap();
    registry.setup().unwrap();

    let output = registry.build_from_value(json!({"value": "123"})).unwrap();
    assert_eq!(output.value, 123);
}

#[test]
fn test_validate_output_int() {
    let mut registry = validating::<i64>();
    registry
        .register_builder(Builder::from_fn("builder", |data: InputFormat| {
            Output::<i64>::plain(data.value)
        }))
        .unwrap();
    registry.setup().unwrap();

    assert_eq!(registry.build_from_value(json!({"value": "123"})).unwrap(), 123);
}

/// Percentage that only deserializes from values up to 100
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "u8")]
struct Percent(u8);

impl TryFrom<u8> for Percent {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value <= 100 {
            Ok(Percent(value))
        } else {
            Err(format!("{} is not a percentage", value))
        }
    }
}

fn percent_registry(validate_output: bool) -> SchemaRegistry<Percent> {
    let config = RegistryConfig::new().with_validate_output(validate_output);
    let mut registry = SchemaRegistry::new(config);
    registry.register_schema::<InputFormat>();
    registry
        .register_builder(Builder::from_fn("builder", |data: InputFormat| {
            Percent(data.value.parse().unwrap_or(u8::MAX))
        }))
        .unwrap();
    registry.setup().unwrap();
    registry
}

#[test]
fn test_validate_output_rejects_inconsistent_canonical_value() {
    let registry = percent_registry(true);

    assert_eq!(registry.build_from_value(json!({"value": "42"})).unwrap(), Percent(42));
    assert!(matches!(
        registry.build_from_value(json!({"value": "150"})),
        Err(BuildError::OutputValidation { .. })
    ));
}

#[test]
fn test_canonical_output_is_returned_as_is_without_validation() {
    let registry = percent_registry(false);
    assert_eq!(registry.build_from_value(json!({"value": "150"})).unwrap(), Percent(150));
}

// =============================================================================
// Output types without serde
// =============================================================================

type Thunk = Arc<dyn Fn() -> i64 + Send + Sync>;

#[test]
fn test_output_function() {
    let config = RegistryConfig::new().with_validate_output(true);
    let mut registry: SchemaRegistry<Thunk> =
        SchemaRegistry::with_output_adapter(config, CanonicalOnly);
    registry.register_schema::<InputFormat>();
    registry
        .register_builder(Builder::from_fn("builder", |data: InputFormat| -> Thunk {
            let value = data.value.parse().unwrap_or_default();
            Arc::new(move || value)
        }))
        .unwrap();
    registry.setup().unwrap();

    let output = registry.build_from_value(json!({"value": "123"})).unwrap();
    assert_eq!(output(), 123);
}

// =============================================================================
// Custom adapters
// =============================================================================

/// Accepts only even values
struct EvenOnly;

impl OutputAdapter<i64> for EvenOnly {
    fn validate_output(&self, output: Output<i64>) -> Result<i64, OutputViolation> {
        match output {
            Output::Canonical(value) if value % 2 == 0 => Ok(value),
            Output::Canonical(value) => Err(OutputViolation::custom(format!("{} is odd", value))),
            other => Err(OutputViolation::custom(format!("unexpected {} output", other.variant()))),
        }
    }
}

#[test]
fn test_custom_output_adapter() {
    let config = RegistryConfig::new().with_validate_output(true);
    let mut registry: SchemaRegistry<i64> = SchemaRegistry::with_output_adapter(config, EvenOnly);
    registry.register_schema::<InputFormat>();
    registry
        .register_builder(Builder::from_fn("builder", |data: InputFormat| {
            data.value.parse::<i64>().unwrap_or_default()
        }))
        .unwrap();
    registry.setup().unwrap();

    assert_eq!(registry.build_from_value(json!({"value": "4"})).unwrap(), 4);

    let err = registry.build_from_value(json!({"value": "3"})).unwrap_err();
    assert_eq!(err.source().map(|e| e.to_string()), Some("3 is odd".to_string()));
}
