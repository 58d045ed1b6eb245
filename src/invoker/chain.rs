use std::collections::BTreeMap;

use super::Parameters;
use crate::container::Container;
use crate::definition::{FactoryParameter, Value};
use crate::errors::Result;

/// One link of the parameter binding chain.
///
/// Implementations only fill positions that are still missing from
/// `resolved`; earlier links win.
pub trait ParameterResolver: Send + Sync {
    fn resolve_parameters(
        &self,
        declared: &[FactoryParameter],
        provided: &Parameters,
        container: &Container,
        resolved: &mut BTreeMap<usize, Value>,
    ) -> Result<()>;
}

/// Runs resolvers in order until every declared parameter is bound.
#[derive(Default)]
pub struct ResolverChain {
    resolvers: Vec<Box<dyn ParameterResolver>>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<Box<dyn ParameterResolver>>) -> Self {
        Self { resolvers }
    }

    pub fn append(&mut self, resolver: Box<dyn ParameterResolver>) {
        self.resolvers.push(resolver);
    }

    pub fn prepend(&mut self, resolver: Box<dyn ParameterResolver>) {
        self.resolvers.insert(0, resolver);
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }
}

impl ParameterResolver for ResolverChain {
    fn resolve_parameters(
        &self,
        declared: &[FactoryParameter],
        provided: &Parameters,
        container: &Container,
        resolved: &mut BTreeMap<usize, Value>,
    ) -> Result<()> {
        for resolver in &self.resolvers {
            if resolved.len() >= declared.len() {
                break;
            }
            resolver.resolve_parameters(declared, provided, container, resolved)?;
        }
        Ok(())
    }
}

/// Binds caller-supplied parameters by name.
pub struct NamedParameterResolver;

impl ParameterResolver for NamedParameterResolver {
    fn resolve_parameters(
        &self,
        declared: &[FactoryParameter],
        provided: &Parameters,
        _container: &Container,
        resolved: &mut BTreeMap<usize, Value>,
    ) -> Result<()> {
        for (position, parameter) in declared.iter().enumerate() {
            if resolved.contains_key(&position) {
                continue;
            }
            if let Some(value) = provided.named(&parameter.name) {
                resolved.insert(position, value.clone());
            }
        }
        Ok(())
    }
}

/// Binds caller-supplied positional parameters: the n-th positional value
/// goes to the n-th declared parameter if nothing bound it yet.
pub struct PositionalParameterResolver;

impl ParameterResolver for PositionalParameterResolver {
    fn resolve_parameters(
        &self,
        declared: &[FactoryParameter],
        provided: &Parameters,
        _container: &Container,
        resolved: &mut BTreeMap<usize, Value>,
    ) -> Result<()> {
        for (position, value) in provided.positional().iter().enumerate().take(declared.len()) {
            resolved.entry(position).or_insert_with(|| value.clone());
        }
        Ok(())
    }
}

/// Pulls entries named by a parameter's type hint out of the container.
pub struct TypeHintResolver;

impl ParameterResolver for TypeHintResolver {
    fn resolve_parameters(
        &self,
        declared: &[FactoryParameter],
        _provided: &Parameters,
        container: &Container,
        resolved: &mut BTreeMap<usize, Value>,
    ) -> Result<()> {
        for (position, parameter) in declared.iter().enumerate() {
            if resolved.contains_key(&position) {
                continue;
            }
            let Some(entry) = parameter.type_hint.as_deref() else {
                continue;
            };
            if container.has(entry) {
                resolved.insert(position, container.get(entry)?);
            }
        }
        Ok(())
    }
}

pub struct DefaultValueResolver;

impl ParameterResolver for DefaultValueResolver {
    fn resolve_parameters(
        &self,
        declared: &[FactoryParameter],
        _provided: &Parameters,
        _container: &Container,
        resolved: &mut BTreeMap<usize, Value>,
    ) -> Result<()> {
        for (position, parameter) in declared.iter().enumerate() {
            if let Some(default) = &parameter.default {
                resolved.entry(position).or_insert_with(|| default.clone());
            }
        }
        Ok(())
    }
}
