//! Error types for the schema registry

use thiserror::Error;

use crate::output::OutputViolation;

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Registration and setup errors
///
/// Every variant is a contract violation in registration code. They surface
/// while the host program initializes and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SetupError {
    #[error("Builder \"{builder}\" doesn't have argument for the input data")]
    MissingInputArgument { builder: String },

    #[error("Builder \"{builder}\" has too many arguments without default values")]
    RequiredExtraArguments { builder: String },

    #[error("Argument type annotation is missing for builder \"{builder}\"")]
    MissingArgumentType { builder: String },

    #[error("Builder \"{builder}\" is registered for the unregistered schema: {schema}")]
    UnregisteredSchema { builder: String, schema: String },

    #[error("Return type annotation is missing for builder \"{builder}\"")]
    MissingReturnType { builder: String },

    #[error("Return type annotation of builder \"{builder}\" must be \"{expected}\" instead of \"{found}\"")]
    ReturnTypeMismatch {
        builder: String,
        expected: String,
        found: String,
    },

    #[error("Builder \"{builder}\" declares input \"{declared}\" but its handler accepts \"{actual}\"")]
    HandlerInputMismatch {
        builder: String,
        declared: String,
        actual: String,
    },

    #[error("Missing builders for the following schema: {}", .schemas.join(", "))]
    MissingBuilders { schemas: Vec<String> },

    #[error("Cannot discover module \"{path}\"{}", suggestion_suffix(.suggestion))]
    UnknownModule {
        path: String,
        suggestion: Option<String>,
    },

    #[error("Invalid module path: \"{0}\"")]
    InvalidModulePath(String),
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(s) => format!(" (did you mean \"{}\"?)", s),
        None => String::new(),
    }
}

/// Errors raised while resolving a payload in `build`
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("No registered schema matches the input")]
    NoMatchingSchema,

    #[error("Multiple schemas match the input: {}", .schemas.join(", "))]
    MultipleValidSchemas { schemas: Vec<String> },

    #[error("Output validation failed")]
    OutputValidation {
        #[source]
        source: OutputViolation,
    },
}

impl BuildError {
    /// Whether this error was caused by the input payload rather than by a builder
    pub fn is_invalid_input(&self) -> bool {
        matches!(
            self,
            BuildError::NoMatchingSchema | BuildError::MultipleValidSchemas { .. }
        )
    }
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error("Setup error: {0}")]
    Setup(#[from] SetupError),

    #[error("Build error: {0}")]
    Build(#[from] BuildError),

    #[error("Config error: {0}")]
    Config(#[from] config_crate::ConfigError),
}
