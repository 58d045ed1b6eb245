use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{into_value, Lifetime, Value};
use crate::invoker::FactoryCall;

/// Type-erased factory function.
pub type Callable = Arc<dyn Fn(&FactoryCall<'_>) -> anyhow::Result<Value> + Send + Sync>;

/// Erases a typed factory function into a [`Callable`]. Factories returning a
/// [`Value`] hand it through unchanged.
pub fn callable<T, F>(factory: F) -> Callable
where
    T: Any + Send + Sync,
    F: Fn(&FactoryCall<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
{
    Arc::new(move |call: &FactoryCall<'_>| -> anyhow::Result<Value> {
        Ok(into_value(factory(call)?))
    })
}

#[derive(Clone)]
pub enum FactoryCallable {
    Function(Callable),
    /// Name of a container entry whose value is a [`Callable`].
    Entry(String),
}

impl fmt::Debug for FactoryCallable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactoryCallable::Function(_) => f.write_str("Function(..)"),
            FactoryCallable::Entry(name) => f.debug_tuple("Entry").field(name).finish(),
        }
    }
}

/// A parameter the factory declares in addition to the container handle and
/// the requested entry, which are always available.
#[derive(Clone)]
pub struct FactoryParameter {
    pub name: String,
    /// Entry name to pull from the container when nothing else binds it.
    pub type_hint: Option<String>,
    pub default: Option<Value>,
}

impl FactoryParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_hint: None,
            default: None,
        }
    }

    pub fn typed(mut self, entry: impl Into<String>) -> Self {
        self.type_hint = Some(entry.into());
        self
    }

    /// Shorthand for a type hint naming the entry registered for `T`.
    pub fn of_type<T: ?Sized + 'static>(self) -> Self {
        self.typed(std::any::type_name::<T>())
    }

    pub fn default_value<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.default = Some(Arc::new(value));
        self
    }
}

impl fmt::Debug for FactoryParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FactoryParameter")
            .field("name", &self.name)
            .field("type_hint", &self.type_hint)
            .field("has_default", &self.default.is_some())
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct FactoryDefinition {
    callable: FactoryCallable,
    parameters: Vec<FactoryParameter>,
    lifetime: Lifetime,
}

impl FactoryDefinition {
    pub fn new<T, F>(factory: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&FactoryCall<'_>) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        Self::from_callable(callable(factory))
    }

    pub fn from_callable(callable: Callable) -> Self {
        Self {
            callable: FactoryCallable::Function(callable),
            parameters: Vec::new(),
            lifetime: Lifetime::Singleton,
        }
    }

    /// Uses the callable stored under another entry.
    pub fn from_entry(name: impl Into<String>) -> Self {
        Self {
            callable: FactoryCallable::Entry(name.into()),
            parameters: Vec::new(),
            lifetime: Lifetime::Singleton,
        }
    }

    pub fn parameter(mut self, parameter: FactoryParameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn transient(mut self) -> Self {
        self.lifetime = Lifetime::Transient;
        self
    }

    pub fn callable(&self) -> &FactoryCallable {
        &self.callable
    }

    pub fn parameters(&self) -> &[FactoryParameter] {
        &self.parameters
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}
