//! Builder output and output validation
//!
//! Builders return an [`Output`], one of three representations of the registry's
//! output type. An [`OutputAdapter`] turns any of them into the output type and
//! checks it. The adapter is a hook: registries whose output type has no serde
//! support, or that need their own coercion rules, install a different one.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::coerce;
use crate::schema::short_type_name;

/// Output produced by a builder
#[derive(Debug)]
pub enum Output<O> {
    /// Already the registry's output type
    Canonical(O),
    /// Fields of a structurally compatible record
    Record(Fields),
    /// A raw scalar or mapping assignable to the output type
    Plain(Value),
}

impl<O> Output<O> {
    /// Output from any serializable record with the output type's field layout
    pub fn record<T: Serialize + ?Sized>(record: &T) -> Self {
        Output::Record(Fields::of(record))
    }

    /// Output from a raw value
    pub fn plain(value: impl Into<Value>) -> Self {
        Output::Plain(value.into())
    }

    /// Name of the representation, for messages
    pub fn variant(&self) -> &'static str {
        match self {
            Output::Canonical(_) => "canonical",
            Output::Record(_) => "record",
            Output::Plain(_) => "plain",
        }
    }
}

impl<O> From<O> for Output<O> {
    fn from(output: O) -> Self {
        Output::Canonical(output)
    }
}

/// Field mapping of a record
#[derive(Debug, Clone, PartialEq)]
pub struct Fields(Result<Map<String, Value>, String>);

impl Fields {
    /// Read the fields of a serializable record
    pub fn of<T: Serialize + ?Sized>(record: &T) -> Self {
        match serde_json::to_value(record) {
            Ok(Value::Object(map)) => Self(Ok(map)),
            Ok(other) => Self(Err(format!("expected a field record, got {}", json_kind(&other)))),
            Err(err) => Self(Err(err.to_string())),
        }
    }

    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(Ok(map))
    }

    /// Get the field mapping, if the record could be read
    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        self.0.as_ref().ok()
    }

    fn into_value(self) -> Result<Value, OutputViolation> {
        self.0.map(Value::Object).map_err(OutputViolation::UnreadableRecord)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Output validation failure
#[derive(Error, Debug)]
pub enum OutputViolation {
    #[error("Output record could not be read: {0}")]
    UnreadableRecord(String),

    #[error("Output does not match \"{expected}\": {source}")]
    Mismatch {
        expected: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("\"{expected}\" cannot be produced from a {variant} output")]
    Unsupported {
        expected: &'static str,
        variant: &'static str,
    },

    #[error("{0}")]
    Custom(String),
}

impl OutputViolation {
    pub fn custom(message: impl std::fmt::Display) -> Self {
        OutputViolation::Custom(message.to_string())
    }
}

/// Coerces a builder output into the output type and verifies it
pub trait OutputAdapter<O>: Send + Sync {
    fn validate_output(&self, output: Output<O>) -> Result<O, OutputViolation>;
}

/// Default adapter for serde-capable output types
///
/// Canonical values are serialized and read back, so a value assembled around a
/// validating `Deserialize` impl is still checked. Records and plain values are
/// read into the output type with lenient coercion.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructuralAdapter;

impl<O> OutputAdapter<O> for StructuralAdapter
where
    O: Serialize + DeserializeOwned,
{
    fn validate_output(&self, output: Output<O>) -> Result<O, OutputViolation> {
        let expected = short_type_name(std::any::type_name::<O>());
        let data = match output {
            Output::Canonical(value) => serde_json::to_value(&value)
                .map_err(|source| OutputViolation::Mismatch { expected, source })?,
            Output::Record(fields) => fields.into_value()?,
            Output::Plain(value) => value,
        };
        coerce::from_value(&data).map_err(|source| OutputViolation::Mismatch { expected, source })
    }
}

/// Adapter that accepts only canonical outputs, for output types without serde
#[derive(Debug, Clone, Copy, Default)]
pub struct CanonicalOnly;

impl<O> OutputAdapter<O> for CanonicalOnly {
    fn validate_output(&self, output: Output<O>) -> Result<O, OutputViolation> {
        match output {
            Output::Canonical(value) => Ok(value),
            other => Err(OutputViolation::Unsupported {
                expected: short_type_name(std::any::type_name::<O>()),
                variant: other.variant(),
            }),
        }
    }
}
