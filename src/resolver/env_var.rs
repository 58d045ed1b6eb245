use std::sync::Arc;

use super::{DefinitionResolver, ResolutionContext};
use crate::container::Container;
use crate::definition::{EnvironmentVariableDefinition, Value};
use crate::errors::{ContainerError, Result};

/// Reads the variable at resolution time; falls back to the declared default.
pub struct EnvironmentVariableResolver;

impl EnvironmentVariableResolver {
    pub(crate) fn lookup(container: &Container, definition: &EnvironmentVariableDefinition) -> Option<Value> {
        container
            .environment()
            .var(definition.variable())
            .map(|value| Arc::new(value) as Value)
    }

    pub(crate) fn missing(definition: &EnvironmentVariableDefinition) -> ContainerError {
        ContainerError::not_found(definition.variable())
    }
}

impl DefinitionResolver<EnvironmentVariableDefinition> for EnvironmentVariableResolver {
    fn resolve(
        &self,
        definition: &EnvironmentVariableDefinition,
        context: &ResolutionContext<'_>,
    ) -> Result<Value> {
        if let Some(value) = Self::lookup(context.container(), definition) {
            return Ok(value);
        }
        match definition.default() {
            Some(default) => context.resolve_nested(default),
            None => {
                tracing::debug!(
                    entry = context.entry(),
                    variable = definition.variable(),
                    "environment variable is not set and has no default"
                );
                Err(Self::missing(definition))
            }
        }
    }

    fn is_resolvable(
        &self,
        definition: &EnvironmentVariableDefinition,
        context: &ResolutionContext<'_>,
    ) -> bool {
        if Self::lookup(context.container(), definition).is_some() {
            return true;
        }
        definition
            .default()
            .is_some_and(|default| context.is_nested_resolvable(default))
    }
}
