//! TOML configuration for containers.
//!
//! ```toml
//! compile = false
//! debug = true
//!
//! [logging]
//! level = "yard_di=debug"
//!
//! [definitions]
//! apiKey = { env = "DEEPL_API_KEY", default = "" }
//! endpoint = "https://api-free.deepl.com"
//! translateUrl = { string = "{endpoint}/v2/translate" }
//! languages = ["nl", "de", "fr"]
//! defaultKey = { alias = "apiKey" }
//! ```

mod loader;

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::definition::{Definition, EnvironmentVariableDefinition};
use crate::logging::LoggingConfig;

pub use loader::{ConfigLoader, COMPILE_OVERRIDE_VAR, DEBUG_OVERRIDE_VAR};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ContainerConfig {
    pub compile: bool,
    pub debug: bool,
    pub logging: LoggingConfig,
    pub definitions: BTreeMap<String, DefinitionConfig>,
}

/// One entry of the `[definitions]` table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DefinitionConfig {
    Env {
        env: String,
        #[serde(default)]
        default: Option<Box<DefinitionConfig>>,
    },
    Reference {
        #[serde(rename = "ref")]
        target: String,
    },
    Alias {
        alias: String,
    },
    Expression {
        string: String,
    },
    Array(Vec<DefinitionConfig>),
    /// Anything else: strings, numbers, booleans, datetimes and plain tables.
    Literal(toml::Value),
}

impl DefinitionConfig {
    pub fn to_definition(&self) -> Definition {
        match self {
            DefinitionConfig::Env { env, default } => {
                let mut definition = EnvironmentVariableDefinition::new(env.clone());
                if let Some(default) = default {
                    definition = definition.with_default(default.to_definition());
                }
                definition.into()
            }
            DefinitionConfig::Reference { target } => Definition::reference(target.clone()),
            DefinitionConfig::Alias { alias } => Definition::alias(alias.clone()),
            DefinitionConfig::Expression { string } => Definition::string(string.clone()),
            DefinitionConfig::Array(items) => {
                Definition::array(items.iter().map(DefinitionConfig::to_definition).collect())
            }
            DefinitionConfig::Literal(value) => literal(value),
        }
    }
}

fn literal(value: &toml::Value) -> Definition {
    match value {
        toml::Value::String(value) => Definition::value(value.clone()),
        toml::Value::Integer(value) => Definition::value(*value),
        toml::Value::Float(value) => Definition::value(*value),
        toml::Value::Boolean(value) => Definition::value(*value),
        toml::Value::Datetime(value) => Definition::value(value.to_string()),
        toml::Value::Array(items) => Definition::array(items.iter().map(literal).collect()),
        toml::Value::Table(table) => Definition::value(table.clone()),
    }
}
