use std::sync::Arc;

use super::{DefinitionResolver, ResolutionContext};
use crate::definition::{ArrayDefinition, Value};
use crate::errors::Result;

/// Resolves every item in declaration order into a `Vec<Value>`.
pub struct ArrayResolver;

impl DefinitionResolver<ArrayDefinition> for ArrayResolver {
    fn resolve(&self, definition: &ArrayDefinition, context: &ResolutionContext<'_>) -> Result<Value> {
        let values = definition
            .items()
            .iter()
            .map(|item| context.resolve_nested(item))
            .collect::<Result<Vec<Value>>>()?;
        Ok(Arc::new(values))
    }

    fn is_resolvable(&self, definition: &ArrayDefinition, context: &ResolutionContext<'_>) -> bool {
        definition
            .items()
            .iter()
            .all(|item| context.is_nested_resolvable(item))
    }
}
