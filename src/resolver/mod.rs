//! Turns definitions into values.
//!
//! [`ResolverDispatcher`] routes each [`Definition`] variant to the resolver
//! for that kind. Self-resolving definitions are handled first, without a
//! resolver. Extension kinds go to resolvers registered on the builder; an
//! extension kind nobody registered is a configuration error.

mod array;
mod decorator;
mod env_var;
mod factory;
mod object;
mod proxy;
mod value;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::container::Container;
use crate::definition::{Definition, ExtensionDefinition, Value};
use crate::errors::{ContainerError, Result};
use crate::invoker::Parameters;

pub use array::ArrayResolver;
pub use decorator::DecoratorResolver;
pub use env_var::EnvironmentVariableResolver;
pub use factory::FactoryResolver;
pub use object::ObjectCreator;
pub use proxy::LazyProxy;
pub use value::ValueResolver;

/// Per-call state handed to resolvers.
pub struct ResolutionContext<'a> {
    container: &'a Container,
    entry: &'a str,
    parameters: &'a Parameters,
}

impl<'a> ResolutionContext<'a> {
    pub fn new(container: &'a Container, entry: &'a str, parameters: &'a Parameters) -> Self {
        Self {
            container,
            entry,
            parameters,
        }
    }

    pub fn container(&self) -> &'a Container {
        self.container
    }

    /// Entry the outermost definition was registered under.
    pub fn entry(&self) -> &'a str {
        self.entry
    }

    pub fn parameters(&self) -> &'a Parameters {
        self.parameters
    }

    /// Resolves a definition nested inside the current one. Nested definitions
    /// see the same entry name but none of the caller's extra parameters.
    pub fn resolve_nested(&self, definition: &Definition) -> Result<Value> {
        let parameters = Parameters::default();
        let nested = ResolutionContext::new(self.container, self.entry, &parameters);
        self.container.dispatcher().resolve(definition, &nested)
    }

    pub fn is_nested_resolvable(&self, definition: &Definition) -> bool {
        let parameters = Parameters::default();
        let nested = ResolutionContext::new(self.container, self.entry, &parameters);
        self.container.dispatcher().is_resolvable(definition, &nested)
    }
}

/// Resolves one kind of definition.
pub trait DefinitionResolver<D: ?Sized>: Send + Sync {
    fn resolve(&self, definition: &D, context: &ResolutionContext<'_>) -> Result<Value>;

    fn is_resolvable(&self, definition: &D, context: &ResolutionContext<'_>) -> bool;
}

pub type ExtensionResolver = Arc<dyn DefinitionResolver<ExtensionDefinition>>;

/// Routes definitions to the resolver for their kind.
///
/// Built-in resolvers are created on first use and then reused; none of them
/// keeps entry values between calls.
#[derive(Default)]
pub struct ResolverDispatcher {
    value: OnceCell<ValueResolver>,
    factory: OnceCell<FactoryResolver>,
    object: OnceCell<ObjectCreator>,
    decorator: OnceCell<DecoratorResolver>,
    array: OnceCell<ArrayResolver>,
    environment: OnceCell<EnvironmentVariableResolver>,
    extensions: HashMap<String, ExtensionResolver>,
}

impl ResolverDispatcher {
    pub fn new(extensions: HashMap<String, ExtensionResolver>) -> Self {
        Self {
            extensions,
            ..Self::default()
        }
    }

    pub fn resolve(&self, definition: &Definition, context: &ResolutionContext<'_>) -> Result<Value> {
        match definition {
            Definition::SelfResolving(definition) => definition.resolve(context.container()),
            Definition::Value(definition) => self.value().resolve(definition, context),
            Definition::Factory(definition) => self.factory().resolve(definition, context),
            Definition::Object(definition) => self.object().resolve(definition, context),
            Definition::Decorator(definition) => self.decorator().resolve(definition, context),
            Definition::Array(definition) => self.array().resolve(definition, context),
            Definition::EnvironmentVariable(definition) => {
                self.environment().resolve(definition, context)
            }
            Definition::Extension(definition) => {
                self.extension(definition.kind())?.resolve(definition, context)
            }
        }
    }

    pub fn is_resolvable(&self, definition: &Definition, context: &ResolutionContext<'_>) -> bool {
        match definition {
            Definition::SelfResolving(definition) => definition.is_resolvable(context.container()),
            Definition::Value(definition) => self.value().is_resolvable(definition, context),
            Definition::Factory(definition) => self.factory().is_resolvable(definition, context),
            Definition::Object(definition) => self.object().is_resolvable(definition, context),
            Definition::Decorator(definition) => self.decorator().is_resolvable(definition, context),
            Definition::Array(definition) => self.array().is_resolvable(definition, context),
            Definition::EnvironmentVariable(definition) => {
                self.environment().is_resolvable(definition, context)
            }
            Definition::Extension(definition) => match self.extension(definition.kind()) {
                Ok(resolver) => resolver.is_resolvable(definition, context),
                Err(_) => false,
            },
        }
    }

    pub fn supports_extension(&self, kind: &str) -> bool {
        self.extensions.contains_key(kind)
    }

    pub(crate) fn factory(&self) -> &FactoryResolver {
        self.factory.get_or_init(FactoryResolver::new)
    }

    fn value(&self) -> &ValueResolver {
        self.value.get_or_init(|| ValueResolver)
    }

    fn object(&self) -> &ObjectCreator {
        self.object.get_or_init(|| ObjectCreator)
    }

    fn decorator(&self) -> &DecoratorResolver {
        self.decorator.get_or_init(|| DecoratorResolver)
    }

    fn array(&self) -> &ArrayResolver {
        self.array.get_or_init(|| ArrayResolver)
    }

    fn environment(&self) -> &EnvironmentVariableResolver {
        self.environment.get_or_init(|| EnvironmentVariableResolver)
    }

    pub(crate) fn extension(&self, kind: &str) -> Result<&ExtensionResolver> {
        self.extensions
            .get(kind)
            .ok_or_else(|| ContainerError::UnsupportedDefinitionKind {
                kind: kind.to_string(),
            })
    }
}
