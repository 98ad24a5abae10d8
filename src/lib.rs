//! Schema Overseer
//!
//! A schema-resolution registry for version-tolerant payload handling. Producers
//! evolve payload shapes over time; consumers register every shape they still
//! accept together with a builder into one canonical output type, and the
//! registry picks the matching shape for each incoming payload.
//!
//! ## Features
//!
//! - **Ordered Resolution**: Schemas are tried in registration order, first match wins
//! - **Ambiguity Checking**: Optionally reject payloads accepted by more than one schema
//! - **Eager Signature Checks**: Builder descriptors are verified at registration time
//! - **Completeness Checking**: `setup` fails unless every schema has a builder
//! - **Output Validation**: Builder outputs can be coerced and checked by a replaceable adapter
//! - **Module Discovery**: Registration code grouped into dotted modules, loaded on `setup`
//!
//! ## Lifecycle
//!
//! ```text
//! register_schema / register_builder / add_module
//!         │
//!         ▼
//!      setup()  ── discovery + completeness check (once)
//!         │
//!         ▼
//!      build()  ── resolve → build → validate output (any number of times, any thread)
//! ```
//!
//! ## Example
//!
//! ```
//! use schema_overseer::{Builder, RegistryConfig, Schema, SchemaRegistry};
//! use serde::{Deserialize, Serialize};
//! use serde_json::json;
//!
//! #[derive(Debug, PartialEq, Serialize, Deserialize)]
//! struct Context {
//!     value: i64,
//! }
//!
//! #[derive(Deserialize)]
//! struct Old {
//!     value: String,
//! }
//! impl Schema for Old {}
//!
//! #[derive(Deserialize)]
//! struct New {
//!     renamed_value: i64,
//! }
//! impl Schema for New {}
//!
//! let mut registry = SchemaRegistry::<Context>::new(RegistryConfig::default());
//! registry.register_schema::<Old>();
//! registry.register_schema::<New>();
//! registry
//!     .register_builder(Builder::from_fn("old_builder", |old: Old| Context {
//!         value: old.value.parse().unwrap_or_default(),
//!     }))
//!     .unwrap();
//! registry
//!     .register_builder(Builder::from_fn("new_builder", |new: New| Context {
//!         value: new.renamed_value,
//!     }))
//!     .unwrap();
//! registry.setup().unwrap();
//!
//! let context = registry.build_from_value(json!({"renamed_value": 123})).unwrap();
//! assert_eq!(context, Context { value: 123 });
//! ```

pub mod builder;
pub mod coerce;
pub mod config;
pub mod discovery;
pub mod error;
pub mod output;
pub mod registry;
pub mod schema;
pub mod source;

pub use builder::{Builder, Handler, Param};
pub use config::RegistryConfig;
pub use discovery::{ModuleCatalog, RegisterFn};
pub use error::{BuildError, Error, Result, SetupError};
pub use output::{CanonicalOnly, Fields, Output, OutputAdapter, OutputViolation, StructuralAdapter};
pub use registry::SchemaRegistry;
pub use schema::{Schema, TypeTag, Violation};
pub use source::{Source, SourceKind};
