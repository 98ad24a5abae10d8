//! Schema types and structures

use std::any::{Any, TypeId};
use std::fmt;
use std::hash::{Hash, Hasher};

use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::coerce::Lenient;
use crate::source::Source;

/// Identity of a Rust type, used as the registry key
///
/// Equality and hashing only look at the `TypeId`; the name is kept for messages.
#[derive(Debug, Clone, Copy)]
pub struct TypeTag {
    id: TypeId,
    name: &'static str,
}

impl TypeTag {
    /// Tag for `T`, named by its short type name
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self::named::<T>(short_type_name(std::any::type_name::<T>()))
    }

    /// Tag for `T` with an explicit display name
    pub fn named<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            id: TypeId::of::<T>(),
            name,
        }
    }

    /// Get the display name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Get the underlying `TypeId`
    pub fn type_id(&self) -> TypeId {
        self.id
    }

    /// Check whether this tag identifies `T`
    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }
}

impl PartialEq for TypeTag {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeTag {}

impl Hash for TypeTag {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Strip module paths from a `type_name` string, keeping generic arguments
pub(crate) fn short_type_name(full: &'static str) -> &'static str {
    let head_end = full.find('<').unwrap_or(full.len());
    match full[..head_end].rfind("::") {
        Some(idx) => &full[idx + 2..],
        None => full,
    }
}

/// A structural validation failure of one schema against one source
///
/// Inside `build` this only means "try the next candidate" and never escapes.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{schema}: {message}")]
pub struct Violation {
    pub schema: String,
    pub message: String,
}

impl Violation {
    /// Create a violation for schema `S`
    pub fn new<S: Schema>(message: impl Into<String>) -> Self {
        Self {
            schema: S::name().to_string(),
            message: message.into(),
        }
    }

    /// Create a violation not yet attributed to a schema
    ///
    /// The registry fills in the schema name when it catches the violation.
    pub fn custom(message: impl fmt::Display) -> Self {
        Self {
            schema: String::new(),
            message: message.to_string(),
        }
    }
}

impl From<serde_json::Error> for Violation {
    fn from(err: serde_json::Error) -> Self {
        Self::custom(err)
    }
}

/// A candidate input shape
///
/// Structural validation is lenient deserialization followed by [`Schema::validate`].
/// Custom checks that convert values must report their failures as [`Violation`]s;
/// anything else (a panic) is not caught by the registry.
///
/// ```ignore
/// #[derive(Deserialize)]
/// struct OldPayload { query: String }
///
/// impl Schema for OldPayload {}
/// ```
pub trait Schema: DeserializeOwned + Send + 'static {
    /// Name used in error messages
    fn name() -> &'static str {
        short_type_name(std::any::type_name::<Self>())
    }

    /// Checks that deserialization alone cannot express
    fn validate(&self) -> Result<(), Violation> {
        Ok(())
    }

    /// Validate a source against this schema
    fn from_source(source: &Source) -> Result<Self, Violation> {
        let instance = Self::deserialize(Lenient::new(source.value()))?;
        instance.validate()?;
        Ok(instance)
    }
}

/// Type-erased structural validator stored per registered schema
pub(crate) type ErasedValidator = fn(&Source) -> Result<Box<dyn Any + Send>, Violation>;

pub(crate) fn erased_validator<S: Schema>() -> ErasedValidator {
    |source| {
        S::from_source(source)
            .map(|instance| Box::new(instance) as Box<dyn Any + Send>)
            .map_err(|mut violation| {
                if violation.schema.is_empty() {
                    violation.schema = S::name().to_string();
                }
                violation
            })
    }
}
