use std::sync::Arc;

use super::{DefinitionResolver, LazyProxy, ResolutionContext};
use crate::container::{Container, Routine};
use crate::definition::{Definition, ObjectDefinition, Value};
use crate::errors::{ContainerError, Result};
use crate::invoker::{Arguments, Parameters};

/// Constructs objects: constructor injection, then method and property
/// injection. Lazy definitions resolve to a [`LazyProxy`] instead.
pub struct ObjectCreator;

impl ObjectCreator {
    /// Runs the constructor and the injections with already resolved values.
    pub(crate) fn instantiate(
        definition: &ObjectDefinition,
        entry: &str,
        arguments: Vec<Value>,
        method_arguments: Vec<Vec<Value>>,
    ) -> Result<Value> {
        let constructor = definition.constructor();
        let mut instance = constructor(&Arguments::positional(arguments))
            .map_err(|error| ContainerError::from_user(entry, error))?;

        for (method, values) in definition.methods().iter().zip(method_arguments) {
            tracing::trace!(entry, class = definition.class_name(), method = method.name(), "injecting");
            let apply = method.apply();
            apply(&mut *instance, &Arguments::positional(values))
                .map_err(|error| ContainerError::from_user(entry, error))?;
        }

        Ok(Arc::from(instance))
    }

    fn lazy_initializer(definition: ObjectDefinition) -> Routine {
        let definition = Definition::Object(definition);
        Arc::new(move |container: &Container, entry: &str| {
            let parameters = Parameters::default();
            let context = ResolutionContext::new(container, entry, &parameters);
            container.dispatcher().resolve(&definition, &context)
        })
    }
}

impl DefinitionResolver<ObjectDefinition> for ObjectCreator {
    fn resolve(&self, definition: &ObjectDefinition, context: &ResolutionContext<'_>) -> Result<Value> {
        if definition.is_lazy() {
            let proxy = LazyProxy::new(
                context.container(),
                context.entry(),
                definition.class_name(),
                Self::lazy_initializer(definition.eager()),
            );
            return Ok(Arc::new(proxy));
        }

        let arguments = definition
            .arguments()
            .iter()
            .map(|argument| context.resolve_nested(argument))
            .collect::<Result<Vec<_>>>()?;
        let method_arguments = definition
            .methods()
            .iter()
            .map(|method| {
                method
                    .arguments()
                    .iter()
                    .map(|argument| context.resolve_nested(argument))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;

        Self::instantiate(definition, context.entry(), arguments, method_arguments)
    }

    fn is_resolvable(&self, definition: &ObjectDefinition, context: &ResolutionContext<'_>) -> bool {
        definition
            .arguments()
            .iter()
            .chain(definition.methods().iter().flat_map(|method| method.arguments()))
            .all(|argument| context.is_nested_resolvable(argument))
    }
}
