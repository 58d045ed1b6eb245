//! Ahead-of-time compilation of definitions into resolution routines.
//!
//! Every registered definition becomes a closure specialized for its kind, so
//! a compiled container skips the per-call dispatch on the definition enum.
//! Extension kinds must have a resolver at compile time.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use super::Container;
use crate::definition::{DecoratedSource, Definition, ObjectDefinition, Value};
use crate::errors::{ContainerError, Result};
use crate::invoker::{Invoker, Parameters};
use crate::resolver::{
    EnvironmentVariableResolver, FactoryResolver, LazyProxy, ObjectCreator, ResolutionContext,
    ResolverDispatcher,
};

/// Resolves one entry against a container; the `&str` is the requested entry.
pub(crate) type Routine = Arc<dyn Fn(&Container, &str) -> Result<Value> + Send + Sync>;

pub(crate) struct CompiledEntry {
    definition: Definition,
    routine: Routine,
    cacheable: bool,
}

impl CompiledEntry {
    pub(crate) fn definition(&self) -> &Definition {
        &self.definition
    }

    pub(crate) fn routine(&self) -> &Routine {
        &self.routine
    }

    pub(crate) fn is_cacheable(&self) -> bool {
        self.cacheable
    }
}

pub(crate) struct CompiledEntries {
    entries: HashMap<String, CompiledEntry>,
    factory_invoker: OnceCell<Invoker>,
}

impl CompiledEntries {
    pub(crate) fn compile(
        definitions: &HashMap<String, Definition>,
        dispatcher: &ResolverDispatcher,
    ) -> Result<Self> {
        let mut entries = HashMap::with_capacity(definitions.len());
        for (name, definition) in definitions {
            let routine = compile(definition, dispatcher)?;
            entries.insert(
                name.clone(),
                CompiledEntry {
                    definition: definition.clone(),
                    routine,
                    cacheable: definition.is_cacheable(),
                },
            );
        }
        tracing::debug!(entries = entries.len(), "definitions compiled");
        Ok(Self {
            entries,
            factory_invoker: OnceCell::new(),
        })
    }

    pub(crate) fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub(crate) fn get(&self, name: &str) -> Option<&CompiledEntry> {
        self.entries.get(name)
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Created on the first factory call.
    pub(crate) fn factory_invoker(&self) -> &Invoker {
        self.factory_invoker.get_or_init(Invoker::for_factories)
    }
}

fn compile(definition: &Definition, dispatcher: &ResolverDispatcher) -> Result<Routine> {
    let routine: Routine = match definition {
        Definition::Value(value) => {
            let value = value.value().clone();
            Arc::new(move |_: &Container, _: &str| -> Result<Value> { Ok(value.clone()) })
        }
        Definition::Factory(factory) => {
            let factory = factory.clone();
            Arc::new(move |container: &Container, entry: &str| -> Result<Value> {
                let callable = FactoryResolver::callable(factory.callable(), container, entry)?;
                container.invoke_factory(&callable, factory.parameters(), entry)
            })
        }
        Definition::Object(object) if object.is_lazy() => {
            let class_name = object.class_name();
            let initializer = compile_object(&object.eager(), dispatcher)?;
            Arc::new(move |container: &Container, entry: &str| -> Result<Value> {
                let proxy = LazyProxy::new(container, entry, class_name, initializer.clone());
                Ok(Arc::new(proxy) as Value)
            })
        }
        Definition::Object(object) => compile_object(object, dispatcher)?,
        Definition::Decorator(decorator) => {
            let source: Routine = match decorator.source() {
                DecoratedSource::Entry(target) => {
                    let target = target.clone();
                    Arc::new(move |container: &Container, _: &str| -> Result<Value> {
                        container.get(&target)
                    })
                }
                DecoratedSource::Previous(previous) => compile(previous, dispatcher)?,
            };
            match decorator.decorator().cloned() {
                Some(decorate) => Arc::new(move |container: &Container, entry: &str| -> Result<Value> {
                    let inner = source(container, entry)?;
                    decorate(inner, container).map_err(|error| ContainerError::from_user(entry, error))
                }),
                None => source,
            }
        }
        Definition::Array(array) => {
            let items = compile_all(array.items(), dispatcher)?;
            Arc::new(move |container: &Container, entry: &str| -> Result<Value> {
                let values = items
                    .iter()
                    .map(|item| item(container, entry))
                    .collect::<Result<Vec<Value>>>()?;
                Ok(Arc::new(values) as Value)
            })
        }
        Definition::EnvironmentVariable(variable) => {
            let default = variable
                .default()
                .map(|default| compile(default, dispatcher))
                .transpose()?;
            let variable = variable.clone();
            Arc::new(move |container: &Container, entry: &str| -> Result<Value> {
                if let Some(value) = EnvironmentVariableResolver::lookup(container, &variable) {
                    return Ok(value);
                }
                match &default {
                    Some(default) => default(container, entry),
                    None => Err(EnvironmentVariableResolver::missing(&variable)),
                }
            })
        }
        Definition::SelfResolving(definition) => {
            let definition = definition.clone();
            Arc::new(move |container: &Container, _: &str| -> Result<Value> {
                definition.resolve(container)
            })
        }
        Definition::Extension(extension) => {
            let resolver = dispatcher.extension(extension.kind())?.clone();
            let extension = extension.clone();
            Arc::new(move |container: &Container, entry: &str| -> Result<Value> {
                let parameters = Parameters::default();
                let context = ResolutionContext::new(container, entry, &parameters);
                resolver.resolve(&extension, &context)
            })
        }
    };
    Ok(routine)
}

fn compile_all(definitions: &[Definition], dispatcher: &ResolverDispatcher) -> Result<Vec<Routine>> {
    definitions
        .iter()
        .map(|definition| compile(definition, dispatcher))
        .collect()
}

fn compile_object(object: &ObjectDefinition, dispatcher: &ResolverDispatcher) -> Result<Routine> {
    let arguments = compile_all(object.arguments(), dispatcher)?;
    let methods = object
        .methods()
        .iter()
        .map(|method| compile_all(method.arguments(), dispatcher))
        .collect::<Result<Vec<_>>>()?;
    let object = object.clone();

    Ok(Arc::new(move |container: &Container, entry: &str| -> Result<Value> {
        let values = arguments
            .iter()
            .map(|argument| argument(container, entry))
            .collect::<Result<Vec<_>>>()?;
        let method_values = methods
            .iter()
            .map(|routines| {
                routines
                    .iter()
                    .map(|argument| argument(container, entry))
                    .collect::<Result<Vec<_>>>()
            })
            .collect::<Result<Vec<_>>>()?;
        ObjectCreator::instantiate(&object, entry, values, method_values)
    }))
}
