use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{Definition, Lifetime};
use crate::errors::InvalidDefinitionReason;
use crate::invoker::Arguments;

pub type Constructor =
    Arc<dyn Fn(&Arguments) -> anyhow::Result<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// Applies a setter or property assignment to a freshly constructed instance.
pub type Injector = Arc<
    dyn Fn(&mut (dyn Any + Send + Sync + 'static), &Arguments) -> anyhow::Result<()> + Send + Sync,
>;

#[derive(Clone)]
pub struct MethodInjection {
    name: String,
    arguments: Vec<Definition>,
    apply: Injector,
}

impl MethodInjection {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arguments(&self) -> &[Definition] {
        &self.arguments
    }

    pub fn apply(&self) -> &Injector {
        &self.apply
    }
}

impl fmt::Debug for MethodInjection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodInjection")
            .field("name", &self.name)
            .field("arguments", &self.arguments)
            .finish()
    }
}

/// Builds an instance through constructor injection, then runs setter and
/// property injections in declaration order.
#[derive(Clone)]
pub struct ObjectDefinition {
    class_name: &'static str,
    constructor: Constructor,
    arguments: Vec<Definition>,
    methods: Vec<MethodInjection>,
    lazy: bool,
    lifetime: Lifetime,
}

impl ObjectDefinition {
    pub fn new<T, F>(constructor: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&Arguments) -> anyhow::Result<T> + Send + Sync + 'static,
    {
        let constructor: Constructor = Arc::new(
            move |arguments: &Arguments| -> anyhow::Result<Box<dyn Any + Send + Sync>> {
                Ok(Box::new(constructor(arguments)?))
            },
        );
        Self {
            class_name: std::any::type_name::<T>(),
            constructor,
            arguments: Vec::new(),
            methods: Vec::new(),
            lazy: false,
            lifetime: Lifetime::Singleton,
        }
    }

    /// Explicitly bound constructor argument.
    pub fn argument(mut self, definition: impl Into<Definition>) -> Self {
        self.arguments.push(definition.into());
        self
    }

    /// Constructor argument resolved by type through the container.
    pub fn inject<U: ?Sized + 'static>(self) -> Self {
        self.argument(Definition::reference_type::<U>())
    }

    pub fn method<T, F>(mut self, name: impl Into<String>, arguments: Vec<Definition>, apply: F) -> Self
    where
        T: Any + Send + Sync,
        F: Fn(&mut T, &Arguments) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let apply: Injector = Arc::new(
            move |instance: &mut (dyn Any + Send + Sync + 'static),
                  arguments: &Arguments|
                  -> anyhow::Result<()> {
                let target = instance.downcast_mut::<T>().ok_or(
                    InvalidDefinitionReason::TypeMismatch {
                        expected: std::any::type_name::<T>(),
                    },
                )?;
                apply(target, arguments)
            },
        );
        self.methods.push(MethodInjection {
            name: name.into(),
            arguments,
            apply,
        });
        self
    }

    pub fn property<T, V, F>(self, name: impl Into<String>, definition: impl Into<Definition>, assign: F) -> Self
    where
        T: Any + Send + Sync,
        V: Any + Send + Sync,
        F: Fn(&mut T, Arc<V>) + Send + Sync + 'static,
    {
        self.method(name, vec![definition.into()], move |target: &mut T, arguments| {
            assign(target, arguments.at::<V>(0)?);
            Ok(())
        })
    }

    /// Defers construction until the value is first used, see `LazyProxy`.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    pub fn transient(mut self) -> Self {
        self.lifetime = Lifetime::Transient;
        self
    }

    pub fn class_name(&self) -> &'static str {
        self.class_name
    }

    pub fn constructor(&self) -> &Constructor {
        &self.constructor
    }

    pub fn arguments(&self) -> &[Definition] {
        &self.arguments
    }

    pub fn methods(&self) -> &[MethodInjection] {
        &self.methods
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }

    pub(crate) fn eager(&self) -> Self {
        Self {
            lazy: false,
            ..self.clone()
        }
    }
}

impl fmt::Debug for ObjectDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectDefinition")
            .field("class", &self.class_name)
            .field("arguments", &self.arguments)
            .field("methods", &self.methods)
            .field("lazy", &self.lazy)
            .field("lifetime", &self.lifetime)
            .finish()
    }
}
