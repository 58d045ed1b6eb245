pub mod config;
pub mod container;
pub mod definition;
pub mod environment;
pub mod errors;
pub mod invoker;
pub mod logging;
pub mod resolver;

// Re-export commonly used items for convenience
pub use container::{Container, ContainerBuilder, ContainerStats, WeakContainer};
pub use definition::{Definition, Lifetime, Value};
pub use errors::{ContainerError, InvalidDefinitionReason, Result};
pub use invoker::Parameters;
