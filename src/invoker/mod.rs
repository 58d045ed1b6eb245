//! Factory invocation: binds declared factory parameters and calls the
//! factory with the container handle and the requested entry.

mod chain;

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::container::Container;
use crate::definition::{Callable, FactoryParameter, Value};
use crate::errors::{ContainerError, InvalidDefinitionReason, Result};

pub use chain::{
    DefaultValueResolver, NamedParameterResolver, ParameterResolver, PositionalParameterResolver,
    ResolverChain, TypeHintResolver,
};

/// Downcasts a resolved value, reporting the expected type on mismatch.
pub fn downcast<T: Any + Send + Sync>(value: Value) -> Result<Arc<T>, InvalidDefinitionReason> {
    value
        .downcast::<T>()
        .map_err(|_| InvalidDefinitionReason::TypeMismatch {
            expected: std::any::type_name::<T>(),
        })
}

/// Extra parameters supplied by the caller of `Container::make`.
#[derive(Clone, Default)]
pub struct Parameters {
    named: HashMap<String, Value>,
    positional: Vec<Value>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<T: Any + Send + Sync>(mut self, name: impl Into<String>, value: T) -> Self {
        self.named.insert(name.into(), Arc::new(value));
        self
    }

    pub fn push<T: Any + Send + Sync>(mut self, value: T) -> Self {
        self.positional.push(Arc::new(value));
        self
    }

    pub fn named(&self, name: &str) -> Option<&Value> {
        self.named.get(name)
    }

    pub fn positional(&self) -> &[Value] {
        &self.positional
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }
}

impl std::fmt::Debug for Parameters {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.named.keys().collect();
        names.sort();
        f.debug_struct("Parameters")
            .field("named", &names)
            .field("positional", &self.positional.len())
            .finish()
    }
}

/// Name of the entry a factory is currently producing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestedEntry(String);

impl RequestedEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// Bound argument values, in declaration order.
#[derive(Clone, Default)]
pub struct Arguments {
    values: Vec<(String, Value)>,
}

impl Arguments {
    pub fn new(values: Vec<(String, Value)>) -> Self {
        Self { values }
    }

    pub(crate) fn positional(values: Vec<Value>) -> Self {
        Self {
            values: values
                .into_iter()
                .enumerate()
                .map(|(index, value)| (index.to_string(), value))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn value(&self, index: usize) -> Option<&Value> {
        self.values.get(index).map(|(_, value)| value)
    }

    pub fn at<T: Any + Send + Sync>(&self, index: usize) -> Result<Arc<T>, InvalidDefinitionReason> {
        let value = self.value(index).cloned().ok_or_else(|| {
            InvalidDefinitionReason::NotEnoughParameters {
                name: index.to_string(),
                position: index,
            }
        })?;
        downcast(value)
    }

    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, InvalidDefinitionReason> {
        let value = self
            .values
            .iter()
            .find(|(bound, _)| bound == name)
            .map(|(_, value)| value.clone())
            .ok_or_else(|| InvalidDefinitionReason::NotEnoughParameters {
                name: name.to_string(),
                position: self.values.len(),
            })?;
        downcast(value)
    }
}

/// Everything a factory gets to see when it is called.
pub struct FactoryCall<'a> {
    container: &'a Container,
    requested: RequestedEntry,
    arguments: Arguments,
}

impl<'a> FactoryCall<'a> {
    pub fn container(&self) -> &'a Container {
        self.container
    }

    pub fn requested_entry(&self) -> &RequestedEntry {
        &self.requested
    }

    pub fn arguments(&self) -> &Arguments {
        &self.arguments
    }

    pub fn arg<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>, InvalidDefinitionReason> {
        self.arguments.get(name)
    }
}

/// Calls factories after binding their declared parameters through a
/// [`ResolverChain`].
pub struct Invoker {
    chain: ResolverChain,
}

impl Invoker {
    pub fn new(chain: ResolverChain) -> Self {
        Self { chain }
    }

    /// Chain used for factory definitions: caller-supplied parameters first,
    /// then container entries by type hint, then declared defaults.
    pub fn for_factories() -> Self {
        Self::new(ResolverChain::new(vec![
            Box::new(NamedParameterResolver),
            Box::new(PositionalParameterResolver),
            Box::new(TypeHintResolver),
            Box::new(DefaultValueResolver),
        ]))
    }

    pub fn chain_mut(&mut self) -> &mut ResolverChain {
        &mut self.chain
    }

    pub fn call(
        &self,
        callable: &Callable,
        declared: &[FactoryParameter],
        entry: &str,
        container: &Container,
        provided: &Parameters,
    ) -> Result<Value> {
        let mut resolved = BTreeMap::new();
        self.chain
            .resolve_parameters(declared, provided, container, &mut resolved)?;

        let mut values = Vec::with_capacity(declared.len());
        for (position, parameter) in declared.iter().enumerate() {
            let value = resolved.remove(&position).ok_or_else(|| {
                ContainerError::invalid(
                    entry,
                    InvalidDefinitionReason::NotEnoughParameters {
                        name: parameter.name.clone(),
                        position,
                    },
                )
            })?;
            values.push((parameter.name.clone(), value));
        }

        let call = FactoryCall {
            container,
            requested: RequestedEntry::new(entry),
            arguments: Arguments::new(values),
        };
        callable(&call).map_err(|error| ContainerError::from_user(entry, error))
    }
}

impl Default for Invoker {
    fn default() -> Self {
        Self::for_factories()
    }
}
