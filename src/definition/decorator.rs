use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{into_value, Definition, Value};
use crate::container::Container;
use crate::invoker::downcast;

pub type Decorate = Arc<dyn Fn(Value, &Container) -> anyhow::Result<Value> + Send + Sync>;

#[derive(Clone, Debug)]
pub enum DecoratedSource {
    /// Another container entry, resolved through `Container::get`.
    Entry(String),
    /// The definition that was registered under the same name before.
    Previous(Box<Definition>),
}

/// Alias to another entry, optionally wrapped by decoration logic.
#[derive(Clone)]
pub struct DecoratorDefinition {
    source: DecoratedSource,
    decorate: Option<Decorate>,
}

impl DecoratorDefinition {
    pub fn alias(target: impl Into<String>) -> Self {
        Self {
            source: DecoratedSource::Entry(target.into()),
            decorate: None,
        }
    }

    pub fn new(source: DecoratedSource, decorate: Decorate) -> Self {
        Self {
            source,
            decorate: Some(decorate),
        }
    }

    /// Decorates `target` with a typed function.
    pub fn typed<T, U, F>(target: impl Into<String>, decorate: F) -> Self
    where
        T: Any + Send + Sync,
        U: Any + Send + Sync,
        F: Fn(Arc<T>, &Container) -> anyhow::Result<U> + Send + Sync + 'static,
    {
        Self::new(DecoratedSource::Entry(target.into()), typed_decorator(decorate))
    }

    pub fn source(&self) -> &DecoratedSource {
        &self.source
    }

    pub fn decorator(&self) -> Option<&Decorate> {
        self.decorate.as_ref()
    }
}

impl fmt::Debug for DecoratorDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecoratorDefinition")
            .field("source", &self.source)
            .field("decorated", &self.decorate.is_some())
            .finish()
    }
}

pub(crate) fn typed_decorator<T, U, F>(decorate: F) -> Decorate
where
    T: Any + Send + Sync,
    U: Any + Send + Sync,
    F: Fn(Arc<T>, &Container) -> anyhow::Result<U> + Send + Sync + 'static,
{
    Arc::new(move |value: Value, container: &Container| -> anyhow::Result<Value> {
        let inner = downcast::<T>(value)?;
        Ok(into_value(decorate(inner, container)?))
    })
}
