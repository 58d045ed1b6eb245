use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use super::{CompiledEntries, Container};
use crate::config::ContainerConfig;
use crate::definition::{typed_decorator, DecoratedSource, DecoratorDefinition, Definition};
use crate::environment::{EnvironmentSource, ProcessEnvironment};
use crate::errors::{ContainerError, InvalidDefinitionReason, Result};
use crate::resolver::{ExtensionResolver, ResolverDispatcher};

/// Collects definitions and settings, then builds a [`Container`].
///
/// ```ignore
/// let container = ContainerBuilder::new()
///     .add_definition("apiKey", "ABC123")
///     .add_definition("client", Definition::factory(|c| {
///         Ok(Client::new(c.get_as::<String>("apiKey")?))
///     }))
///     .build()?;
/// ```
#[derive(Default)]
pub struct ContainerBuilder {
    definitions: HashMap<String, Definition>,
    extensions: HashMap<String, ExtensionResolver>,
    environment: Option<Arc<dyn EnvironmentSource>>,
    parent: Option<Container>,
    compile: bool,
    debug: bool,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `definition` under `name`, replacing any earlier one.
    pub fn add_definition(&mut self, name: impl Into<String>, definition: impl Into<Definition>) -> &mut Self {
        self.definitions.insert(name.into(), definition.into());
        self
    }

    pub fn add_definitions<I, K, D>(&mut self, definitions: I) -> &mut Self
    where
        I: IntoIterator<Item = (K, D)>,
        K: Into<String>,
        D: Into<Definition>,
    {
        for (name, definition) in definitions {
            self.add_definition(name, definition);
        }
        self
    }

    /// Registers `definition` under the type name of `T`.
    pub fn add_type<T: ?Sized + 'static>(&mut self, definition: impl Into<Definition>) -> &mut Self {
        self.add_definition(std::any::type_name::<T>(), definition)
    }

    /// Wraps the definition currently registered under `name`.
    pub fn decorate<T, U, F>(&mut self, name: &str, decorate: F) -> Result<&mut Self>
    where
        T: Any + Send + Sync,
        U: Any + Send + Sync,
        F: Fn(Arc<T>, &Container) -> anyhow::Result<U> + Send + Sync + 'static,
    {
        let previous = self
            .definitions
            .remove(name)
            .ok_or_else(|| ContainerError::invalid(name, InvalidDefinitionReason::NothingToDecorate))?;
        let decorator = DecoratorDefinition::new(
            DecoratedSource::Previous(Box::new(previous)),
            typed_decorator(decorate),
        );
        self.definitions.insert(name.to_string(), decorator.into());
        Ok(self)
    }

    /// Resolver for extension definitions of `kind`.
    pub fn register_resolver(&mut self, kind: impl Into<String>, resolver: ExtensionResolver) -> &mut Self {
        self.extensions.insert(kind.into(), resolver);
        self
    }

    /// Where environment-variable definitions read from. Defaults to the
    /// process environment.
    pub fn environment(&mut self, environment: Arc<dyn EnvironmentSource>) -> &mut Self {
        self.environment = Some(environment);
        self
    }

    pub fn parent(&mut self, parent: Container) -> &mut Self {
        self.parent = Some(parent);
        self
    }

    pub fn enable_compilation(&mut self) -> &mut Self {
        self.compile = true;
        self
    }

    /// Logs failed resolutions through [`crate::logging::ErrorLog`].
    pub fn debug(&mut self, debug: bool) -> &mut Self {
        self.debug = debug;
        self
    }

    /// Takes the compile and debug flags and every definition from `config`.
    pub fn apply_config(&mut self, config: &ContainerConfig) -> &mut Self {
        self.compile |= config.compile;
        self.debug |= config.debug;
        for (name, definition) in &config.definitions {
            self.add_definition(name.clone(), definition.to_definition());
        }
        self
    }

    pub fn build(&self) -> Result<Container> {
        if self.definitions.contains_key("") {
            return Err(ContainerError::invalid("", InvalidDefinitionReason::EmptyEntryName));
        }

        let dispatcher = ResolverDispatcher::new(self.extensions.clone());
        let environment = self
            .environment
            .clone()
            .unwrap_or_else(|| Arc::new(ProcessEnvironment));

        let (definitions, compiled) = if self.compile {
            let compiled = CompiledEntries::compile(&self.definitions, &dispatcher)?;
            (HashMap::new(), Some(compiled))
        } else {
            (self.definitions.clone(), None)
        };

        tracing::debug!(
            entries = self.definitions.len(),
            compiled = self.compile,
            extensions = self.extensions.len(),
            "container built"
        );
        Ok(Container::from_parts(
            definitions,
            dispatcher,
            compiled,
            self.parent.clone(),
            environment,
            self.debug,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decorating_nothing_fails() {
        let mut builder = ContainerBuilder::new();
        let err = builder
            .decorate("missing", |value: Arc<i64>, _: &Container| Ok(*value + 1))
            .err()
            .unwrap();
        assert!(matches!(
            err,
            ContainerError::InvalidDefinition {
                reason: InvalidDefinitionReason::NothingToDecorate,
                ..
            }
        ));
    }

    #[test]
    fn decorates_previous_definition() {
        let mut builder = ContainerBuilder::new();
        builder.add_definition("retries", 3i64);
        builder
            .decorate("retries", |value: Arc<i64>, _: &Container| Ok(*value * 2))
            .unwrap();
        let container = builder.build().unwrap();
        assert_eq!(*container.get_as::<i64>("retries").unwrap(), 6);
    }

    #[test]
    fn rejects_empty_names() {
        let err = ContainerBuilder::new()
            .add_definition("", 1i64)
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            ContainerError::InvalidDefinition {
                reason: InvalidDefinitionReason::EmptyEntryName,
                ..
            }
        ));
    }

    #[test]
    fn type_keyed_entries() {
        #[derive(Debug, PartialEq)]
        struct Endpoint(&'static str);

        let container = ContainerBuilder::new()
            .add_type::<Endpoint>(Definition::value(Endpoint("https://api.deepl.com")))
            .build()
            .unwrap();
        assert_eq!(*container.get_type::<Endpoint>().unwrap(), Endpoint("https://api.deepl.com"));
    }
}
