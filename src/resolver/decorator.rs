use super::{DefinitionResolver, ResolutionContext};
use crate::definition::{DecoratedSource, DecoratorDefinition, Value};
use crate::errors::{ContainerError, Result};

/// Resolves the aliased entry (or the previous definition) and applies the
/// decoration, if any. Self-aliases surface as circular dependencies through
/// the container's in-progress chain.
pub struct DecoratorResolver;

impl DefinitionResolver<DecoratorDefinition> for DecoratorResolver {
    fn resolve(&self, definition: &DecoratorDefinition, context: &ResolutionContext<'_>) -> Result<Value> {
        let inner = match definition.source() {
            DecoratedSource::Entry(target) => context.container().get(target)?,
            DecoratedSource::Previous(previous) => context.resolve_nested(previous)?,
        };
        match definition.decorator() {
            Some(decorate) => decorate(inner, context.container())
                .map_err(|error| ContainerError::from_user(context.entry(), error)),
            None => Ok(inner),
        }
    }

    fn is_resolvable(&self, definition: &DecoratorDefinition, context: &ResolutionContext<'_>) -> bool {
        match definition.source() {
            DecoratedSource::Entry(target) => context.container().has(target),
            DecoratedSource::Previous(previous) => context.is_nested_resolvable(previous),
        }
    }
}
