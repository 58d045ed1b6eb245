//! Declarative recipes for producing entry values.
//!
//! A [`Definition`] is a closed sum over the supported kinds. New resolution
//! strategies plug in either as a [`SelfResolvingDefinition`] implementation or
//! as an [`ExtensionDefinition`] paired with a resolver registered on the
//! container builder.

mod decorator;
mod env_var;
mod factory;
mod object;
mod reference;

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::container::Container;
use crate::errors::Result;

pub use decorator::{Decorate, DecoratedSource, DecoratorDefinition};
pub(crate) use decorator::typed_decorator;
pub use env_var::EnvironmentVariableDefinition;
pub use factory::{callable, Callable, FactoryCallable, FactoryDefinition, FactoryParameter};
pub use object::{Constructor, Injector, MethodInjection, ObjectDefinition};
pub use reference::{Reference, StringExpression};

/// A resolved entry value.
pub type Value = Arc<dyn Any + Send + Sync>;

/// Erases a factory or decorator result. A result that already is a [`Value`]
/// (say, forwarded from `Container::get`) is returned as is.
pub(crate) fn into_value<T: Any + Send + Sync>(result: T) -> Value {
    let boxed: Box<dyn Any + Send + Sync> = Box::new(result);
    match boxed.downcast::<Value>() {
        Ok(shared) => *shared,
        Err(other) => Arc::from(other),
    }
}

/// Whether a resolved value is memoized for the lifetime of the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lifetime {
    /// Resolved once, then served from the cache.
    #[default]
    Singleton,
    /// Resolved on every request, never cached.
    Transient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionKind {
    Value,
    Factory,
    Object,
    Decorator,
    Array,
    EnvironmentVariable,
    SelfResolving,
    Extension,
}

impl fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DefinitionKind::Value => "value",
            DefinitionKind::Factory => "factory",
            DefinitionKind::Object => "object",
            DefinitionKind::Decorator => "decorator",
            DefinitionKind::Array => "array",
            DefinitionKind::EnvironmentVariable => "environment variable",
            DefinitionKind::SelfResolving => "self-resolving",
            DefinitionKind::Extension => "extension",
        };
        f.write_str(name)
    }
}

/// Definitions that know how to resolve themselves against a container.
///
/// The dispatcher tries these before anything else.
pub trait SelfResolvingDefinition: Send + Sync + fmt::Debug {
    fn resolve(&self, container: &Container) -> Result<Value>;

    fn is_resolvable(&self, container: &Container) -> bool;
}

#[derive(Clone)]
pub struct ValueDefinition {
    value: Value,
    type_name: &'static str,
}

impl ValueDefinition {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_name: std::any::type_name::<T>(),
        }
    }

    /// Wraps an already shared value without re-boxing it.
    pub fn shared<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            value,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for ValueDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueDefinition")
            .field("type", &self.type_name)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ArrayDefinition {
    items: Vec<Definition>,
}

impl ArrayDefinition {
    pub fn new(items: Vec<Definition>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[Definition] {
        &self.items
    }
}

/// A definition of a kind the crate does not know about.
///
/// Resolved by whatever resolver was registered for `kind`.
#[derive(Clone)]
pub struct ExtensionDefinition {
    kind: String,
    payload: Value,
    lifetime: Lifetime,
}

impl ExtensionDefinition {
    pub fn new<T: Any + Send + Sync>(kind: impl Into<String>, payload: T) -> Self {
        Self {
            kind: kind.into(),
            payload: Arc::new(payload),
            lifetime: Lifetime::Singleton,
        }
    }

    pub fn transient(mut self) -> Self {
        self.lifetime = Lifetime::Transient;
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn payload(&self) -> &Value {
        &self.payload
    }

    pub fn payload_as<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }
}

impl fmt::Debug for ExtensionDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDefinition")
            .field("kind", &self.kind)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum Definition {
    Value(ValueDefinition),
    Factory(FactoryDefinition),
    Object(ObjectDefinition),
    Decorator(DecoratorDefinition),
    Array(ArrayDefinition),
    EnvironmentVariable(EnvironmentVariableDefinition),
    SelfResolving(Arc<dyn SelfResolvingDefinition>),
    Extension(ExtensionDefinition),
}

impl Definition {
    pub fn value<T: Any + Send + Sync>(value: T) -> Self {
        Definition::Value(ValueDefinition::new(value))
    }

    /// Factory taking only the container handle.
    pub fn factory<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Container) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Definition::Factory(FactoryDefinition::new(move |call| factory(call.container())))
    }

    pub fn reference(target: impl Into<String>) -> Self {
        Definition::SelfResolving(Arc::new(Reference::new(target)))
    }

    /// Reference to the entry registered for type `T`.
    pub fn reference_type<T: ?Sized + 'static>() -> Self {
        Definition::reference(std::any::type_name::<T>())
    }

    pub fn alias(target: impl Into<String>) -> Self {
        Definition::Decorator(DecoratorDefinition::alias(target))
    }

    pub fn array(items: Vec<Definition>) -> Self {
        Definition::Array(ArrayDefinition::new(items))
    }

    pub fn env(variable: impl Into<String>) -> Self {
        Definition::EnvironmentVariable(EnvironmentVariableDefinition::new(variable))
    }

    pub fn env_or(variable: impl Into<String>, default: impl Into<Definition>) -> Self {
        Definition::EnvironmentVariable(
            EnvironmentVariableDefinition::new(variable).with_default(default),
        )
    }

    pub fn string(expression: impl Into<String>) -> Self {
        Definition::SelfResolving(Arc::new(StringExpression::new(expression)))
    }

    pub fn kind(&self) -> DefinitionKind {
        match self {
            Definition::Value(_) => DefinitionKind::Value,
            Definition::Factory(_) => DefinitionKind::Factory,
            Definition::Object(_) => DefinitionKind::Object,
            Definition::Decorator(_) => DefinitionKind::Decorator,
            Definition::Array(_) => DefinitionKind::Array,
            Definition::EnvironmentVariable(_) => DefinitionKind::EnvironmentVariable,
            Definition::SelfResolving(_) => DefinitionKind::SelfResolving,
            Definition::Extension(_) => DefinitionKind::Extension,
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        match self {
            Definition::Factory(factory) => factory.lifetime(),
            Definition::Object(object) => object.lifetime(),
            Definition::Extension(extension) => extension.lifetime,
            _ => Lifetime::Singleton,
        }
    }

    pub fn is_cacheable(&self) -> bool {
        self.lifetime() == Lifetime::Singleton
    }

    /// Label used in logs: the definition kind, or the extension kind name.
    pub fn kind_label(&self) -> String {
        match self {
            Definition::Extension(extension) => extension.kind.clone(),
            other => other.kind().to_string(),
        }
    }
}

impl From<ValueDefinition> for Definition {
    fn from(definition: ValueDefinition) -> Self {
        Definition::Value(definition)
    }
}

impl From<FactoryDefinition> for Definition {
    fn from(definition: FactoryDefinition) -> Self {
        Definition::Factory(definition)
    }
}

impl From<ObjectDefinition> for Definition {
    fn from(definition: ObjectDefinition) -> Self {
        Definition::Object(definition)
    }
}

impl From<DecoratorDefinition> for Definition {
    fn from(definition: DecoratorDefinition) -> Self {
        Definition::Decorator(definition)
    }
}

impl From<ArrayDefinition> for Definition {
    fn from(definition: ArrayDefinition) -> Self {
        Definition::Array(definition)
    }
}

impl From<EnvironmentVariableDefinition> for Definition {
    fn from(definition: EnvironmentVariableDefinition) -> Self {
        Definition::EnvironmentVariable(definition)
    }
}

impl From<ExtensionDefinition> for Definition {
    fn from(definition: ExtensionDefinition) -> Self {
        Definition::Extension(definition)
    }
}

impl From<Reference> for Definition {
    fn from(reference: Reference) -> Self {
        Definition::SelfResolving(Arc::new(reference))
    }
}

impl From<StringExpression> for Definition {
    fn from(expression: StringExpression) -> Self {
        Definition::SelfResolving(Arc::new(expression))
    }
}

impl From<&str> for Definition {
    fn from(value: &str) -> Self {
        Definition::value(value.to_string())
    }
}

impl From<String> for Definition {
    fn from(value: String) -> Self {
        Definition::value(value)
    }
}

impl From<i64> for Definition {
    fn from(value: i64) -> Self {
        Definition::value(value)
    }
}

impl From<bool> for Definition {
    fn from(value: bool) -> Self {
        Definition::value(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifetimes_follow_definition_kind() {
        assert!(Definition::value(1i64).is_cacheable());
        assert!(Definition::reference("a").is_cacheable());

        let transient = FactoryDefinition::new(|_| Ok(1u8)).transient();
        assert_eq!(Definition::from(transient).lifetime(), Lifetime::Transient);
    }

    #[test]
    fn kind_labels() {
        assert_eq!(Definition::env("HOME").kind_label(), "environment variable");
        let ext = ExtensionDefinition::new("wp_option", "deepl_api_key".to_string());
        assert_eq!(Definition::from(ext).kind_label(), "wp_option");
    }

    #[test]
    fn shared_values_are_not_wrapped_twice() {
        let inner: Value = Arc::new(String::from("ABC123"));
        let forwarded = into_value(inner.clone());
        assert!(Arc::ptr_eq(&inner, &forwarded));

        let plain = into_value(7i64);
        assert_eq!(plain.downcast_ref::<i64>(), Some(&7));
    }

    #[test]
    fn value_definition_remembers_type() {
        let def = ValueDefinition::new(String::from("ABC123"));
        assert_eq!(def.type_name(), "alloc::string::String");
        assert_eq!(
            def.value().downcast_ref::<String>().map(String::as_str),
            Some("ABC123")
        );
    }
}
