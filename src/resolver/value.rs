use super::{DefinitionResolver, ResolutionContext};
use crate::definition::{Value, ValueDefinition};
use crate::errors::Result;

/// Hands back the stored value.
pub struct ValueResolver;

impl DefinitionResolver<ValueDefinition> for ValueResolver {
    fn resolve(&self, definition: &ValueDefinition, _context: &ResolutionContext<'_>) -> Result<Value> {
        Ok(definition.value().clone())
    }

    fn is_resolvable(&self, _definition: &ValueDefinition, _context: &ResolutionContext<'_>) -> bool {
        true
    }
}
