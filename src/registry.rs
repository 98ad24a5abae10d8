//! Schema Registry
//!
//! Maps candidate input schemas to the builders that turn them into one output
//! type, checks that mapping when the registry is set up, and resolves untyped
//! payloads against it.
//!
//! Schemas are tried in registration order. Unless the ambiguity check is on,
//! the first schema that accepts a payload wins.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, info, trace, warn};

use crate::builder::Builder;
use crate::config::RegistryConfig;
use crate::discovery::{LoadedModules, ModuleCatalog};
use crate::error::{BuildError, SetupError};
use crate::output::{Output, OutputAdapter, StructuralAdapter};
use crate::schema::{erased_validator, ErasedValidator, Schema, TypeTag};
use crate::source::Source;

/// A registered schema and, once declared, its builder
struct SchemaSlot<O> {
    validator: ErasedValidator,
    builder: Option<Builder<O>>,
}

/// A schema paired with its builder, frozen by `setup`
struct Candidate<O> {
    schema: TypeTag,
    validator: ErasedValidator,
    builder: Builder<O>,
}

/// The schema registry
pub struct SchemaRegistry<O> {
    config: RegistryConfig,
    output_type: TypeTag,
    /// Registered schemas in registration order
    storage: IndexMap<TypeTag, SchemaSlot<O>>,
    catalog: ModuleCatalog<O>,
    loaded: LoadedModules,
    adapter: Arc<dyn OutputAdapter<O>>,
    /// Present once `setup` has succeeded
    candidates: Option<Vec<Candidate<O>>>,
}

impl<O> SchemaRegistry<O>
where
    O: Serialize + DeserializeOwned + 'static,
{
    /// Create a registry validating outputs with the [`StructuralAdapter`]
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_output_adapter(config, StructuralAdapter)
    }
}

impl<O: 'static> SchemaRegistry<O> {
    /// Create a registry with a custom output adapter
    pub fn with_output_adapter(
        config: RegistryConfig,
        adapter: impl OutputAdapter<O> + 'static,
    ) -> Self {
        Self {
            config,
            output_type: TypeTag::of::<O>(),
            storage: IndexMap::new(),
            catalog: ModuleCatalog::new(),
            loaded: LoadedModules::default(),
            adapter: Arc::new(adapter),
            candidates: None,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get the output type every builder must declare
    pub fn output_type(&self) -> TypeTag {
        self.output_type
    }

    /// Whether `setup` has completed
    pub fn is_ready(&self) -> bool {
        self.candidates.is_some()
    }

    /// Registered schemas in priority order
    pub fn schemas(&self) -> impl Iterator<Item = TypeTag> + '_ {
        self.storage.keys().copied()
    }

    /// Get the builder registered for a schema
    pub fn builder_for(&self, schema: TypeTag) -> Option<&Builder<O>> {
        self.storage.get(&schema).and_then(|slot| slot.builder.as_ref())
    }

    pub fn catalog(&self) -> &ModuleCatalog<O> {
        &self.catalog
    }

    /// Add a registration module that discovery can load
    pub fn add_module<F>(&mut self, path: impl Into<String>, register: F) -> Result<(), SetupError>
    where
        F: Fn(&mut SchemaRegistry<O>) -> Result<(), SetupError> + Send + Sync + 'static,
    {
        self.assert_not_ready();
        self.catalog.add(path, register)
    }

    /// Register a candidate input schema
    ///
    /// Registering the same type again keeps its priority and builder.
    pub fn register_schema<S: Schema>(&mut self) -> TypeTag {
        self.assert_not_ready();
        let tag = TypeTag::named::<S>(S::name());
        if !self.storage.contains_key(&tag) {
            self.storage.insert(
                tag,
                SchemaSlot {
                    validator: erased_validator::<S>(),
                    builder: None,
                },
            );
            debug!(schema = tag.name(), priority = self.storage.len() - 1, "schema registered");
        }
        tag
    }

    /// Register a builder for an already registered schema
    ///
    /// The declared signature must take the schema as its only required
    /// parameter and return the registry's output type. Replaces any builder
    /// previously registered for that schema.
    pub fn register_builder(&mut self, builder: Builder<O>) -> Result<TypeTag, SetupError> {
        self.assert_not_ready();
        let name = builder.name().to_string();

        let Some((first, rest)) = builder.params().split_first() else {
            return Err(SetupError::MissingInputArgument { builder: name });
        };

        if rest.iter().any(|param| !param.has_default) {
            return Err(SetupError::RequiredExtraArguments { builder: name });
        }

        let Some(schema) = first.ty else {
            return Err(SetupError::MissingArgumentType { builder: name });
        };

        if !self.storage.contains_key(&schema) {
            return Err(SetupError::UnregisteredSchema {
                builder: name,
                schema: schema.name().to_string(),
            });
        }

        let Some(returns) = builder.return_type() else {
            return Err(SetupError::MissingReturnType { builder: name });
        };

        if returns != self.output_type {
            return Err(SetupError::ReturnTypeMismatch {
                builder: name,
                expected: self.output_type.name().to_string(),
                found: returns.name().to_string(),
            });
        }

        let handler_input = builder.handler().input();
        if handler_input != schema {
            return Err(SetupError::HandlerInputMismatch {
                builder: name,
                declared: schema.name().to_string(),
                actual: handler_input.name().to_string(),
            });
        }

        if let Some(slot) = self.storage.get_mut(&schema) {
            if let Some(previous) = slot.builder.replace(builder) {
                debug!(schema = schema.name(), previous = previous.name(), "builder replaced");
            }
        }
        debug!(schema = schema.name(), builder = %name, "builder registered");
        Ok(schema)
    }

    /// Run discovery and check that every schema has a builder
    ///
    /// Succeeds at most once; later calls are no-ops.
    pub fn setup(&mut self) -> Result<(), SetupError> {
        if self.is_ready() {
            debug!("schema registry already set up");
            return Ok(());
        }

        let paths = self.config.discovery_paths.clone();
        for path in &paths {
            for (module, register) in self.catalog.expand(path)? {
                if !self.loaded.mark(&module) {
                    continue;
                }
                debug!(module = %module, "loading module");
                register(self)?;
            }
        }

        let missing: Vec<String> = self
            .storage
            .iter()
            .filter(|(_, slot)| slot.builder.is_none())
            .map(|(tag, _)| tag.name().to_string())
            .collect();
        if !missing.is_empty() {
            return Err(SetupError::MissingBuilders { schemas: missing });
        }

        let candidates = self
            .storage
            .iter()
            .filter_map(|(tag, slot)| {
                slot.builder.as_ref().map(|builder| Candidate {
                    schema: *tag,
                    validator: slot.validator,
                    builder: builder.clone(),
                })
            })
            .collect::<Vec<_>>();

        info!(
            schemas = candidates.len(),
            modules = self.loaded.len(),
            output = self.output_type.name(),
            "schema registry ready"
        );
        self.candidates = Some(candidates);
        Ok(())
    }

    /// Resolve a source against the registered schemas and build the output
    ///
    /// # Panics
    ///
    /// Panics if called before `setup` has succeeded.
    pub fn build(&self, source: &Source) -> Result<O, BuildError> {
        let Some(candidates) = &self.candidates else {
            panic!("setup() method must be called before building");
        };

        let single = self.config.check_for_single_valid_schema;
        let mut matched: Vec<(&Candidate<O>, Box<dyn Any + Send>)> = Vec::new();

        for candidate in candidates {
            match (candidate.validator)(source) {
                Ok(instance) => {
                    matched.push((candidate, instance));
                    if !single {
                        break;
                    }
                }
                Err(violation) => {
                    trace!(schema = candidate.schema.name(), %violation, "schema rejected input");
                }
            }
        }

        if matched.len() > 1 {
            return Err(BuildError::MultipleValidSchemas {
                schemas: matched
                    .iter()
                    .map(|(candidate, _)| candidate.schema.name().to_string())
                    .collect(),
            });
        }

        let Some((candidate, instance)) = matched.into_iter().next() else {
            return Err(BuildError::NoMatchingSchema);
        };

        debug!(
            schema = candidate.schema.name(),
            builder = candidate.builder.name(),
            "schema matched"
        );
        let output = candidate.builder.handler().invoke(instance);
        self.finish(output)
    }

    /// Build from a key-value mapping
    pub fn build_from_mapping(&self, mapping: Map<String, Value>) -> Result<O, BuildError> {
        self.build(&Source::mapping(mapping))
    }

    /// Build from an object's attributes
    pub fn build_from_object<T: Serialize + ?Sized>(&self, object: &T) -> Result<O, BuildError> {
        self.build(&Source::object(object))
    }

    /// Build from a raw JSON value
    pub fn build_from_value(&self, value: Value) -> Result<O, BuildError> {
        self.build(&Source::from_value(value))
    }

    fn finish(&self, output: Output<O>) -> Result<O, BuildError> {
        match output {
            Output::Canonical(value) if !self.config.validate_output => Ok(value),
            output => {
                if !self.config.validate_output {
                    warn!(
                        variant = output.variant(),
                        output = self.output_type.name(),
                        "coercing non-canonical builder output"
                    );
                }
                self.adapter
                    .validate_output(output)
                    .map_err(|source| BuildError::OutputValidation { source })
            }
        }
    }

    fn assert_not_ready(&self) {
        assert!(
            !self.is_ready(),
            "schema registry is already set up; register everything before setup()"
        );
    }
}

impl<O: 'static> fmt::Debug for SchemaRegistry<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("config", &self.config)
            .field("output_type", &self.output_type)
            .field("schemas", &self.storage.keys().map(TypeTag::name).collect::<Vec<_>>())
            .field("catalog", &self.catalog)
            .field("ready", &self.is_ready())
            .finish()
    }
}
