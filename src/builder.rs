//! Builder descriptors
//!
//! A builder turns one validated schema instance into the registry's output type.
//! Instead of reflecting on a function signature, callers hand the registry a
//! [`Builder`] that spells the signature out: its parameters, its return type
//! and the handler itself. The registry checks the declared signature eagerly
//! in `register_builder`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::output::Output;
use crate::schema::{Schema, TypeTag};

/// A declared builder parameter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub name: String,
    pub ty: Option<TypeTag>,
    pub has_default: bool,
}

impl Param {
    /// A required parameter of type `T`
    pub fn of<T: 'static>(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: Some(TypeTag::of::<T>()),
            has_default: false,
        }
    }

    /// A required parameter without a declared type
    pub fn untyped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: None,
            has_default: false,
        }
    }

    /// Mark the parameter as having a default value
    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }
}

type ErasedCall<O> = dyn Fn(Box<dyn Any + Send>) -> Output<O> + Send + Sync;

/// The callable part of a builder, tagged with the input type it accepts
pub struct Handler<O> {
    input: TypeTag,
    call: Arc<ErasedCall<O>>,
}

impl<O: 'static> Handler<O> {
    /// Wrap a typed function
    pub fn new<S, R, F>(f: F) -> Self
    where
        S: Schema,
        R: Into<Output<O>>,
        F: Fn(S) -> R + Send + Sync + 'static,
    {
        let input = TypeTag::named::<S>(S::name());
        let call = move |instance: Box<dyn Any + Send>| match instance.downcast::<S>() {
            Ok(instance) => f(*instance).into(),
            // register_builder rejects descriptors whose handler disagrees with
            // the declared input, so the registry only passes `S` here.
            Err(_) => unreachable!("builder handler invoked with a foreign schema instance"),
        };
        Self {
            input,
            call: Arc::new(call),
        }
    }

    /// Get the schema type the handler accepts
    pub fn input(&self) -> TypeTag {
        self.input
    }

    pub(crate) fn invoke(&self, instance: Box<dyn Any + Send>) -> Output<O> {
        (self.call)(instance)
    }
}

impl<O> Clone for Handler<O> {
    fn clone(&self) -> Self {
        Self {
            input: self.input,
            call: Arc::clone(&self.call),
        }
    }
}

/// A builder registration descriptor
pub struct Builder<O> {
    name: String,
    params: Vec<Param>,
    returns: Option<TypeTag>,
    handler: Handler<O>,
}

impl<O: 'static> Builder<O> {
    /// Well-formed builder for a typed function: one parameter of type `S`, returning `O`
    pub fn from_fn<S, R, F>(name: impl Into<String>, f: F) -> Self
    where
        S: Schema,
        R: Into<Output<O>>,
        F: Fn(S) -> R + Send + Sync + 'static,
    {
        let handler = Handler::new(f);
        let input = handler.input();
        Self {
            name: name.into(),
            params: vec![Param {
                name: "input".to_string(),
                ty: Some(input),
                has_default: false,
            }],
            returns: Some(TypeTag::of::<O>()),
            handler,
        }
    }

    /// Bare descriptor: no parameters and no return type declared yet
    pub fn new<S, R, F>(name: impl Into<String>, f: F) -> Self
    where
        S: Schema,
        R: Into<Output<O>>,
        F: Fn(S) -> R + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            handler: Handler::new(f),
        }
    }

    /// Declare the next parameter
    pub fn param(mut self, param: Param) -> Self {
        self.params.push(param);
        self
    }

    /// Declare the return type
    pub fn returns<T: 'static>(mut self) -> Self {
        self.returns = Some(TypeTag::of::<T>());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn return_type(&self) -> Option<TypeTag> {
        self.returns
    }

    pub fn handler(&self) -> &Handler<O> {
        &self.handler
    }
}

impl<O> fmt::Debug for Builder<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builder")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("handler_input", &self.handler.input)
            .finish()
    }
}

impl<O> Clone for Builder<O> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            params: self.params.clone(),
            returns: self.returns,
            handler: self.handler.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct OldInputFormat {
        value: String,
    }

    impl Schema for OldInputFormat {}

    #[derive(Debug, PartialEq)]
    struct Output1 {
        value: String,
    }

    #[test]
    fn test_from_fn_signature() {
        let builder = Builder::<Output1>::from_fn("old_builder", |data: OldInputFormat| Output1 {
            value: data.value,
        });

        assert_eq!(builder.name(), "old_builder");
        assert_eq!(builder.params().len(), 1);
        assert_eq!(builder.params()[0].ty, Some(TypeTag::of::<OldInputFormat>()));
        assert_eq!(builder.return_type(), Some(TypeTag::of::<Output1>()));
    }

    #[test]
    fn test_declared_signature() {
        let builder = Builder::<Output1>::new("builder_with_extra_args", |data: OldInputFormat| {
            Output1 { value: data.value }
        })
        .param(Param::of::<OldInputFormat>("data"))
        .param(Param::untyped("extra").with_default());

        assert_eq!(builder.params().len(), 2);
        assert!(builder.params()[1].has_default);
        assert!(builder.return_type().is_none());
    }

    #[test]
    fn test_handler_invoke() {
        let handler = Handler::<Output1>::new(|data: OldInputFormat| Output1 { value: data.value });
        let output = handler.invoke(Box::new(OldInputFormat {
            value: "123".to_string(),
        }));

        match output {
            Output::Canonical(out) => assert_eq!(out.value, "123"),
            other => panic!("Expected canonical output, got {:?}", other.variant()),
        }
    }
}
