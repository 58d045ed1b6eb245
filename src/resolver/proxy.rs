use std::any::Any;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::container::{Container, Routine, WeakContainer};
use crate::definition::Value;
use crate::errors::{ContainerError, Result};
use crate::invoker::downcast;

/// Placeholder handed out for lazy object definitions.
///
/// The real instance is built the first time [`LazyProxy::instance`] is
/// called, which lets two objects refer to each other as long as neither
/// needs the other while being constructed. The proxy only holds a weak
/// handle to its container.
pub struct LazyProxy {
    entry: String,
    class_name: &'static str,
    container: WeakContainer,
    initializer: Routine,
    instance: OnceCell<Value>,
}

impl LazyProxy {
    pub(crate) fn new(
        container: &Container,
        entry: &str,
        class_name: &'static str,
        initializer: Routine,
    ) -> Self {
        Self {
            entry: entry.to_string(),
            class_name,
            container: container.downgrade(),
            initializer,
            instance: OnceCell::new(),
        }
    }

    pub fn entry(&self) -> &str {
        &self.entry
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn is_initialized(&self) -> bool {
        self.instance.get().is_some()
    }

    /// Builds the wrapped instance on first call and returns it afterwards.
    pub fn instance(&self) -> Result<Value> {
        if let Some(instance) = self.instance.get() {
            return Ok(instance.clone());
        }
        let container = self.container.upgrade().ok_or_else(|| {
            ContainerError::InvalidState(format!(
                "the container owning lazy entry '{}' was dropped before it was initialized",
                self.entry
            ))
        })?;
        container.initialize_lazy(&self.entry, &self.instance, || {
            (self.initializer)(&container, &self.entry)
        })
    }

    pub fn instance_as<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        downcast::<T>(self.instance()?).map_err(|reason| ContainerError::invalid(&self.entry, reason))
    }
}

impl fmt::Debug for LazyProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyProxy")
            .field("entry", &self.entry)
            .field("class", &self.class_name)
            .field("initialized", &self.is_initialized())
            .finish()
    }
}
