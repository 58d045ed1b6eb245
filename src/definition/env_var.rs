use super::Definition;

/// Reads a variable from the container's environment source when resolved.
#[derive(Clone, Debug)]
pub struct EnvironmentVariableDefinition {
    variable: String,
    default: Option<Box<Definition>>,
}

impl EnvironmentVariableDefinition {
    pub fn new(variable: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            default: None,
        }
    }

    /// Fallback used when the variable is not set; may itself be any definition.
    pub fn with_default(mut self, default: impl Into<Definition>) -> Self {
        self.default = Some(Box::new(default.into()));
        self
    }

    pub fn variable(&self) -> &str {
        &self.variable
    }

    pub fn default(&self) -> Option<&Definition> {
        self.default.as_deref()
    }
}
