use once_cell::sync::OnceCell;

use super::{DefinitionResolver, ResolutionContext};
use crate::container::Container;
use crate::definition::{Callable, FactoryCallable, FactoryDefinition, Value};
use crate::errors::{ContainerError, InvalidDefinitionReason, Result};
use crate::invoker::{downcast, Invoker};

/// Calls factory definitions through an [`Invoker`] built on first use.
pub struct FactoryResolver {
    invoker: OnceCell<Invoker>,
}

impl FactoryResolver {
    pub fn new() -> Self {
        Self {
            invoker: OnceCell::new(),
        }
    }

    pub(crate) fn invoker(&self) -> &Invoker {
        self.invoker.get_or_init(Invoker::for_factories)
    }

    /// Turns the definition's callable reference into something invocable.
    pub(crate) fn callable(
        reference: &FactoryCallable,
        container: &Container,
        entry: &str,
    ) -> Result<Callable> {
        match reference {
            FactoryCallable::Function(callable) => Ok(callable.clone()),
            FactoryCallable::Entry(name) => {
                if !container.has(name) {
                    return Err(ContainerError::invalid(
                        entry,
                        InvalidDefinitionReason::NotCallable(format!("'{name}'")),
                    ));
                }
                let value = container.get(name)?;
                downcast::<Callable>(value)
                    .map(|callable| (*callable).clone())
                    .map_err(|_| {
                        ContainerError::invalid(
                            entry,
                            InvalidDefinitionReason::NotCallable(format!("'{name}'")),
                        )
                    })
            }
        }
    }
}

impl Default for FactoryResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl DefinitionResolver<FactoryDefinition> for FactoryResolver {
    fn resolve(&self, definition: &FactoryDefinition, context: &ResolutionContext<'_>) -> Result<Value> {
        let callable = Self::callable(definition.callable(), context.container(), context.entry())?;
        self.invoker().call(
            &callable,
            definition.parameters(),
            context.entry(),
            context.container(),
            context.parameters(),
        )
    }

    fn is_resolvable(&self, definition: &FactoryDefinition, context: &ResolutionContext<'_>) -> bool {
        match definition.callable() {
            FactoryCallable::Function(_) => true,
            FactoryCallable::Entry(name) => context.container().has(name),
        }
    }
}
