use thiserror::Error;

/// Result alias used across the container.
pub type Result<T, E = ContainerError> = std::result::Result<T, E>;

/// Failures surfaced by `Container::get` and friends.
///
/// Every variant propagates to the original caller unchanged; nested
/// resolutions never wrap a container error into another one.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("No entry or class found for '{name}'{}", suggestion_hint(.suggestion))]
    NotFound {
        name: String,
        suggestion: Option<String>,
    },
    #[error(
        "Circular dependency detected while trying to resolve entry '{entry}': Dependencies: {}",
        .chain.join(" -> ")
    )]
    CircularDependency {
        entry: String,
        /// In-progress entries in discovery order, ending with `entry` again.
        chain: Vec<String>,
    },
    #[error("Entry \"{entry}\" cannot be resolved: {reason}")]
    InvalidDefinition {
        entry: String,
        #[source]
        reason: InvalidDefinitionReason,
    },
    #[error("Invalid container state: {0}")]
    InvalidState(String),
    #[error("No definition resolver was configured for definition of kind '{kind}'")]
    UnsupportedDefinitionKind { kind: String },
}

/// Why a definition could not be turned into a value.
#[derive(Debug, Error)]
pub enum InvalidDefinitionReason {
    #[error("factory {0} is neither a callable nor a valid container entry")]
    NotCallable(String),
    #[error("Unable to invoke the callable because no value was given for parameter {position} (${name})")]
    NotEnoughParameters { name: String, position: usize },
    #[error("expected a value of type {expected}")]
    TypeMismatch { expected: &'static str },
    #[error("the decorated entry has no previous definition to decorate")]
    NothingToDecorate,
    #[error("entry names must not be empty")]
    EmptyEntryName,
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ContainerError {
    pub fn not_found(name: impl Into<String>) -> Self {
        ContainerError::NotFound {
            name: name.into(),
            suggestion: None,
        }
    }

    pub fn invalid(entry: impl Into<String>, reason: InvalidDefinitionReason) -> Self {
        ContainerError::InvalidDefinition {
            entry: entry.into(),
            reason,
        }
    }

    /// Wraps an error raised by user code (factory, constructor, decorator).
    ///
    /// Container errors travelling back through user code are returned as-is so
    /// that a `NotFound` three levels down still reads as `NotFound`.
    pub fn from_user(entry: &str, error: anyhow::Error) -> Self {
        let error = match error.downcast::<ContainerError>() {
            Ok(container_error) => return container_error,
            Err(other) => other,
        };
        match error.downcast::<InvalidDefinitionReason>() {
            Ok(reason) => ContainerError::invalid(entry, reason),
            Err(other) => ContainerError::InvalidDefinition {
                entry: entry.to_string(),
                reason: InvalidDefinitionReason::Failed {
                    message: format!("{other:#}"),
                    source: other,
                },
            },
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ContainerError::NotFound { .. })
    }

    pub fn is_circular(&self) -> bool {
        matches!(self, ContainerError::CircularDependency { .. })
    }
}

fn suggestion_hint(suggestion: &Option<String>) -> String {
    match suggestion {
        Some(name) => format!(". Did you mean '{name}'?"),
        None => String::new(),
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read file '{0}': {1}")]
    FileRead(String, #[source] std::io::Error),
    #[error("Failed to parse TOML from file '{0}': {1}")]
    TomlParse(String, #[source] toml::de::Error),
    #[error("Invalid value for '{0}': {1}")]
    InvalidValue(String, String),
}

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{0}': {1}")]
    InvalidFilter(String, String),
    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_message_lists_chain_in_order() {
        let err = ContainerError::CircularDependency {
            entry: "a".into(),
            chain: vec!["a".into(), "b".into(), "a".into()],
        };
        assert!(err.to_string().ends_with("Dependencies: a -> b -> a"));
    }

    #[test]
    fn not_found_mentions_suggestion() {
        let err = ContainerError::NotFound {
            name: "apikey".into(),
            suggestion: Some("apiKey".into()),
        };
        assert_eq!(
            err.to_string(),
            "No entry or class found for 'apikey'. Did you mean 'apiKey'?"
        );
    }

    #[test]
    fn user_errors_keep_container_errors_intact() {
        let nested: anyhow::Error = ContainerError::not_found("db").into();
        assert!(ContainerError::from_user("repo", nested).is_not_found());

        let other = anyhow::anyhow!("connection refused");
        match ContainerError::from_user("repo", other) {
            ContainerError::InvalidDefinition {
                entry,
                reason: InvalidDefinitionReason::Failed { message, .. },
            } => {
                assert_eq!(entry, "repo");
                assert_eq!(message, "connection refused");
            }
            e => panic!("unexpected error: {e:?}"),
        }
    }
}
