use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::ContainerConfig;
use crate::environment::{EnvironmentSource, ProcessEnvironment};
use crate::errors::ConfigError;

/// Forces compilation on (`true`/`1`) or off (`false`/`0`).
pub const COMPILE_OVERRIDE_VAR: &str = "YARD_DI_COMPILE";
pub const DEBUG_OVERRIDE_VAR: &str = "YARD_DI_DEBUG";

/// Loads a [`ContainerConfig`] from a TOML file and applies environment
/// overrides.
pub struct ConfigLoader {
    environment: Arc<dyn EnvironmentSource>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            environment: Arc::new(ProcessEnvironment),
        }
    }

    /// Reads overrides from `environment` instead of the process (for testing)
    pub fn with_environment(environment: Arc<dyn EnvironmentSource>) -> Self {
        Self { environment }
    }

    /// Load the file at `path`; a leading `~` is expanded.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<ContainerConfig, ConfigError> {
        let path = expand_path(path.as_ref());
        let content = fs::read_to_string(&path)
            .map_err(|e| ConfigError::FileRead(path.to_string_lossy().to_string(), e))?;
        let config: ContainerConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::TomlParse(path.to_string_lossy().to_string(), e))?;
        tracing::debug!(
            path = %path.display(),
            definitions = config.definitions.len(),
            "container configuration loaded"
        );
        self.apply_overrides(config)
    }

    /// Parse configuration from a string, then apply overrides.
    pub fn load_str(&self, content: &str) -> Result<ContainerConfig, ConfigError> {
        let config: ContainerConfig = toml::from_str(content)
            .map_err(|e| ConfigError::TomlParse("<inline>".to_string(), e))?;
        self.apply_overrides(config)
    }

    fn apply_overrides(&self, mut config: ContainerConfig) -> Result<ContainerConfig, ConfigError> {
        if let Some(compile) = self.flag(COMPILE_OVERRIDE_VAR)? {
            config.compile = compile;
        }
        if let Some(debug) = self.flag(DEBUG_OVERRIDE_VAR)? {
            config.debug = debug;
        }
        Ok(config)
    }

    fn flag(&self, name: &str) -> Result<Option<bool>, ConfigError> {
        let Some(raw) = self.environment.var(name) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(Some(true)),
            "0" | "false" | "no" | "off" => Ok(Some(false)),
            "" => Ok(None),
            _ => Err(ConfigError::InvalidValue(
                name.to_string(),
                format!("expected a boolean, got '{raw}'"),
            )),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    PathBuf::from(shellexpand::tilde(raw.as_ref()).as_ref())
}
