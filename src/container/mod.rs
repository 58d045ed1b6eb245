//! Definition-based service container.
//!
//! Resolution order for `get(name)`:
//! - the resolved-value cache (lock-free read)
//! - the compiled routine for `name`, when the container was compiled
//! - the registered definition, through the [`ResolverDispatcher`]
//! - the parent container, if one was configured
//!
//! Cache misses are serialized per container by a re-entrant lock that also
//! guards the in-progress chain used for cycle detection. Factories may call
//! back into the container on the same thread; a factory that waits on
//! another thread resolving from the same container will deadlock.

mod builder;
mod compiled;
mod stats;

use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Weak};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::{ReentrantMutex, RwLock};

use crate::definition::{Callable, Definition, FactoryParameter, Value};
use crate::environment::EnvironmentSource;
use crate::errors::{ContainerError, InvalidDefinitionReason, Result};
use crate::invoker::{downcast, Invoker, Parameters};
use crate::logging::{ErrorLog, ResolutionTimer};
use crate::resolver::{LazyProxy, ResolutionContext, ResolverDispatcher};

pub use builder::ContainerBuilder;
pub(crate) use compiled::{CompiledEntries, Routine};
pub use stats::ContainerStats;
use stats::InnerStats;

/// Handle to a container. Cloning is cheap; clones share everything.
#[derive(Clone)]
pub struct Container {
    inner: Arc<Inner>,
}

/// Non-owning handle, used by lazy proxies.
#[derive(Clone)]
pub struct WeakContainer {
    inner: Weak<Inner>,
}

impl WeakContainer {
    pub fn upgrade(&self) -> Option<Container> {
        self.inner.upgrade().map(|inner| Container { inner })
    }
}

struct Inner {
    definitions: RwLock<HashMap<String, Definition>>,
    resolved: DashMap<String, Value>,
    /// Entries currently being resolved, in discovery order.
    resolving: ReentrantMutex<RefCell<Vec<String>>>,
    dispatcher: ResolverDispatcher,
    compiled: Option<CompiledEntries>,
    parent: Option<Container>,
    environment: Arc<dyn EnvironmentSource>,
    debug: bool,
    stats: InnerStats,
}

/// Removes its entry from the in-progress chain when dropped, whatever way
/// the resolution ends.
struct InProgress<'a> {
    chain: &'a RefCell<Vec<String>>,
    name: String,
}

impl Drop for InProgress<'_> {
    fn drop(&mut self) {
        let mut chain = self.chain.borrow_mut();
        if let Some(position) = chain.iter().rposition(|entry| *entry == self.name) {
            chain.remove(position);
        }
    }
}

enum Source {
    Compiled(Routine, bool),
    Definition(Definition),
}

impl Container {
    pub fn builder() -> ContainerBuilder {
        ContainerBuilder::new()
    }

    pub(crate) fn from_parts(
        definitions: HashMap<String, Definition>,
        dispatcher: ResolverDispatcher,
        compiled: Option<CompiledEntries>,
        parent: Option<Container>,
        environment: Arc<dyn EnvironmentSource>,
        debug: bool,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                definitions: RwLock::new(definitions),
                resolved: DashMap::new(),
                resolving: ReentrantMutex::new(RefCell::new(Vec::new())),
                dispatcher,
                compiled,
                parent,
                environment,
                debug,
                stats: InnerStats::default(),
            }),
        }
    }

    /// Returns the value for `name`, resolving and caching it on first use.
    pub fn get(&self, name: &str) -> Result<Value> {
        self.inner.stats.record_resolution();
        if let Some(value) = self.cached(name) {
            self.inner.stats.record_hit();
            tracing::trace!(entry = name, "cache hit");
            return Ok(value);
        }
        self.inner.stats.record_miss();
        self.resolve(name, None)
    }

    /// Typed `get`. Lazy proxies are initialized transparently unless `T` is
    /// [`LazyProxy`] itself.
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        let value = self.get(name)?;
        let value = match value.downcast::<LazyProxy>() {
            Ok(proxy) if std::any::TypeId::of::<T>() != std::any::TypeId::of::<LazyProxy>() => {
                proxy.instance()?
            }
            Ok(proxy) => proxy as Value,
            Err(value) => value,
        };
        downcast::<T>(value).map_err(|reason| ContainerError::invalid(name, reason))
    }

    /// Entry registered under the type name of `T`.
    pub fn get_type<T: Any + Send + Sync>(&self) -> Result<Arc<T>> {
        self.get_as::<T>(std::any::type_name::<T>())
    }

    /// Resolves `name` with extra parameters. The result is neither read from
    /// nor written to the cache.
    pub fn make(&self, name: &str, parameters: Parameters) -> Result<Value> {
        self.inner.stats.record_resolution();
        self.resolve(name, Some(&parameters))
    }

    /// True when `name` has a definition, a compiled routine or a cached value
    /// here or in the parent. Never resolves anything.
    pub fn has(&self, name: &str) -> bool {
        self.inner.resolved.contains_key(name)
            || self
                .inner
                .compiled
                .as_ref()
                .is_some_and(|compiled| compiled.contains(name))
            || self.inner.definitions.read().contains_key(name)
            || self.inner.parent.as_ref().is_some_and(|parent| parent.has(name))
    }

    /// Registers or replaces the definition for `name`.
    ///
    /// Rejected once a cached value exists for `name`, or while `name` is being
    /// resolved. Compiled containers only accept raw values for names outside
    /// their compiled set; those go straight into the cache.
    pub fn set(&self, name: &str, definition: impl Into<Definition>) -> Result<()> {
        if name.is_empty() {
            return Err(ContainerError::invalid(name, InvalidDefinitionReason::EmptyEntryName));
        }
        let definition = definition.into();
        let guard = self.inner.resolving.lock();

        if guard.borrow().iter().any(|entry| entry == name) {
            return Err(self.reject_set(name, "it is being resolved"));
        }
        if self.inner.resolved.contains_key(name) {
            return Err(self.reject_set(name, "it has already been resolved"));
        }

        if let Some(compiled) = &self.inner.compiled {
            if compiled.contains(name) {
                return Err(self.reject_set(name, "it is part of the compiled container"));
            }
            return match definition {
                Definition::Value(value) => {
                    self.inner.resolved.insert(name.to_string(), value.value().clone());
                    Ok(())
                }
                other => Err(self.reject_set(
                    name,
                    &format!(
                        "a compiled container only accepts raw values at runtime, got a {} definition",
                        other.kind()
                    ),
                )),
            };
        }

        tracing::debug!(entry = name, kind = %definition.kind_label(), "definition set");
        self.inner
            .definitions
            .write()
            .insert(name.to_string(), definition);
        Ok(())
    }

    /// Asks the resolver for `name`'s definition whether it could be resolved,
    /// without building anything.
    pub fn can_resolve(&self, name: &str) -> bool {
        if self.inner.resolved.contains_key(name) {
            return true;
        }
        match self.definition(name) {
            Some(definition) => {
                let parameters = Parameters::default();
                let context = ResolutionContext::new(self, name, &parameters);
                self.inner.dispatcher.is_resolvable(&definition, &context)
            }
            None => self
                .inner
                .parent
                .as_ref()
                .is_some_and(|parent| parent.can_resolve(name)),
        }
    }

    /// Every name this container knows about, sorted. Parent names excluded.
    pub fn known_entry_names(&self) -> Vec<String> {
        let mut names: BTreeSet<String> = self.inner.definitions.read().keys().cloned().collect();
        if let Some(compiled) = &self.inner.compiled {
            names.extend(compiled.names().map(str::to_string));
        }
        names.extend(self.inner.resolved.iter().map(|entry| entry.key().clone()));
        names.into_iter().collect()
    }

    pub fn is_compiled(&self) -> bool {
        self.inner.compiled.is_some()
    }

    pub fn stats(&self) -> ContainerStats {
        self.inner.stats.snapshot(
            self.inner.definitions.read().len(),
            self.inner.resolved.len(),
            self.inner.compiled.as_ref().map_or(0, CompiledEntries::len),
        )
    }

    pub fn downgrade(&self) -> WeakContainer {
        WeakContainer {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn dispatcher(&self) -> &ResolverDispatcher {
        &self.inner.dispatcher
    }

    pub(crate) fn environment(&self) -> &dyn EnvironmentSource {
        self.inner.environment.as_ref()
    }

    /// Factory invocation for compiled routines, through the compiled
    /// container's own invoker.
    pub(crate) fn invoke_factory(
        &self,
        callable: &Callable,
        parameters: &[FactoryParameter],
        entry: &str,
    ) -> Result<Value> {
        let invoker: &Invoker = match &self.inner.compiled {
            Some(compiled) => compiled.factory_invoker(),
            None => self.inner.dispatcher.factory().invoker(),
        };
        invoker.call(callable, parameters, entry, self, &Parameters::default())
    }

    /// Runs `initialize` for a lazy proxy under the resolution lock, with
    /// `entry` on the in-progress chain so self-referencing initializers fail
    /// as circular dependencies instead of deadlocking.
    pub(crate) fn initialize_lazy(
        &self,
        entry: &str,
        cell: &OnceCell<Value>,
        initialize: impl FnOnce() -> Result<Value>,
    ) -> Result<Value> {
        let guard = self.inner.resolving.lock();
        if let Some(value) = cell.get() {
            return Ok(value.clone());
        }
        let in_progress = self.enter(&guard, entry)?;
        let value = initialize();
        drop(in_progress);
        let value = value?;
        Ok(cell.get_or_init(|| value).clone())
    }

    fn cached(&self, name: &str) -> Option<Value> {
        self.inner.resolved.get(name).map(|value| value.value().clone())
    }

    fn definition(&self, name: &str) -> Option<Definition> {
        if let Some(compiled) = &self.inner.compiled {
            if let Some(entry) = compiled.get(name) {
                return Some(entry.definition().clone());
            }
        }
        self.inner.definitions.read().get(name).cloned()
    }

    fn source(&self, name: &str) -> Option<Source> {
        if let Some(compiled) = &self.inner.compiled {
            if let Some(entry) = compiled.get(name) {
                return Some(Source::Compiled(entry.routine().clone(), entry.is_cacheable()));
            }
        }
        self.inner
            .definitions
            .read()
            .get(name)
            .cloned()
            .map(Source::Definition)
    }

    /// `parameters` is `Some` for `make`, which bypasses the cache.
    fn resolve(&self, name: &str, parameters: Option<&Parameters>) -> Result<Value> {
        let guard = self.inner.resolving.lock();
        if parameters.is_none() {
            // Another thread may have finished this entry while we waited.
            if let Some(value) = self.cached(name) {
                return Ok(value);
            }
        }

        let source = match parameters {
            Some(_) => self.definition(name).map(Source::Definition),
            None => self.source(name),
        };
        let Some(source) = source else {
            drop(guard);
            return self.fallback(name, parameters);
        };

        let in_progress = self.enter(&guard, name)?;
        let (kind, cacheable) = match &source {
            Source::Compiled(_, cacheable) => ("compiled".to_string(), *cacheable),
            Source::Definition(definition) => (definition.kind_label(), definition.is_cacheable()),
        };
        tracing::debug!(entry = name, kind = %kind, "resolving entry");
        let timer = ResolutionTimer::new(name, kind);

        let empty = Parameters::default();
        let result = match &source {
            Source::Compiled(routine, _) => routine(self, name),
            Source::Definition(definition) => {
                let context = ResolutionContext::new(self, name, parameters.unwrap_or(&empty));
                self.inner.dispatcher.resolve(definition, &context)
            }
        };
        drop(in_progress);
        timer.finish(result.is_ok());

        let value = match result {
            Ok(value) => value,
            Err(error) => {
                if guard.borrow().is_empty() {
                    self.log_error(&format!("failed to resolve '{name}': {error}"));
                }
                return Err(error);
            }
        };

        if parameters.is_none() && cacheable {
            self.inner.resolved.insert(name.to_string(), value.clone());
        }
        Ok(value)
    }

    fn fallback(&self, name: &str, parameters: Option<&Parameters>) -> Result<Value> {
        match (&self.inner.parent, parameters) {
            (Some(parent), None) => parent.get(name),
            (Some(parent), Some(parameters)) => parent.make(name, parameters.clone()),
            (None, _) => Err(ContainerError::NotFound {
                name: name.to_string(),
                suggestion: self.suggest(name),
            }),
        }
    }

    fn enter<'g>(&self, chain: &'g RefCell<Vec<String>>, name: &str) -> Result<InProgress<'g>> {
        let mut in_progress = chain.borrow_mut();
        if in_progress.iter().any(|entry| entry == name) {
            self.inner.stats.record_circular();
            let mut cycle = in_progress.clone();
            cycle.push(name.to_string());
            tracing::debug!(entry = name, chain = %cycle.join(" -> "), "circular dependency");
            return Err(ContainerError::CircularDependency {
                entry: name.to_string(),
                chain: cycle,
            });
        }
        in_progress.push(name.to_string());
        Ok(InProgress {
            chain,
            name: name.to_string(),
        })
    }

    fn reject_set(&self, name: &str, why: &str) -> ContainerError {
        tracing::warn!(entry = name, reason = why, "rejected definition override");
        ContainerError::InvalidState(format!("cannot set entry '{name}': {why}"))
    }

    /// A registered name equal ignoring case, otherwise the closest one in
    /// length that contains (or is contained in) the requested name. The
    /// shorter side of a substring match needs `MIN_SUGGESTION_OVERLAP` chars.
    fn suggest(&self, name: &str) -> Option<String> {
        const MIN_SUGGESTION_OVERLAP: usize = 3;

        let wanted = name.to_lowercase();
        let names = self.known_entry_names();
        if let Some(exact) = names.iter().find(|known| known.to_lowercase() == wanted) {
            return Some(exact.clone());
        }
        names
            .into_iter()
            .filter(|known| {
                let known = known.to_lowercase();
                let (shorter, longer) = if known.len() < wanted.len() {
                    (&known, &wanted)
                } else {
                    (&wanted, &known)
                };
                shorter.chars().count() >= MIN_SUGGESTION_OVERLAP && longer.contains(shorter.as_str())
            })
            .min_by_key(|known| known.len().abs_diff(wanted.len()))
    }
}

impl ErrorLog for Container {
    fn debug_enabled(&self) -> bool {
        self.inner.debug
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("compiled", &self.is_compiled())
            .field("entries", &self.known_entry_names())
            .finish()
    }
}
