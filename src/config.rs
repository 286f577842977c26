//! Check configuration loading
//!
//! Reads a `gatorgrade.yml` file in one of three layouts:
//! - two YAML documents: a front matter mapping (`setup`, `name`) followed by
//!   the list of checks
//! - a single list whose leading `setup` / `name` entries are front matter
//! - a single mapping with optional `setup` and `name` keys and a `checks` list
//!
//! The front matter is split off here so that the flattener only ever sees
//! the check tree.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::path::Path;
use thiserror::Error;

/// Configuration file used when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "gatorgrade.yml";

const SETUP_KEY: &str = "setup";
const NAME_KEY: &str = "name";
const CHECKS_KEY: &str = "checks";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Check at {location} defines more than one check ({keys}); split it into separate entries")]
    MultipleChecks { location: String, keys: String },

    #[error("Option '{key}' of check at {location} must be a boolean, number or string")]
    InvalidOption { location: String, key: String },

    #[error("The configuration does not define any checks")]
    NoChecks,
}

/// Settings that precede the checks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrontMatter {
    /// Newline-delimited shell commands run once before any check
    pub setup: Option<String>,

    /// Project name shown in the summary and the report
    pub name: Option<String>,
}

impl FrontMatter {
    fn from_mapping(mapping: &Mapping) -> Result<Self, ConfigError> {
        Ok(Self {
            setup: optional_string(mapping.get(SETUP_KEY), SETUP_KEY)?,
            name: optional_string(mapping.get(NAME_KEY), NAME_KEY)?,
        })
    }

    fn absorb(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            SETUP_KEY => self.setup = optional_string(Some(value), SETUP_KEY)?,
            NAME_KEY => self.name = optional_string(Some(value), NAME_KEY)?,
            _ => {}
        }
        Ok(())
    }
}

/// A loaded configuration: front matter plus the raw check tree
#[derive(Debug, Clone, Default)]
pub struct CheckConfig {
    pub front_matter: FrontMatter,

    /// Top-level nodes of the check tree, handed to the flattener
    pub body: Vec<Value>,
}

impl CheckConfig {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        log::debug!("loaded configuration from {}", path.display());
        Self::parse(&content)
    }

    /// Parse configuration text, which may hold one or two YAML documents
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut documents = Vec::new();
        for document in serde_yaml::Deserializer::from_str(content) {
            documents.push(Value::deserialize(document)?);
        }
        Self::from_documents(documents)
    }

    /// Build configuration from already parsed YAML documents
    pub fn from_documents(mut documents: Vec<Value>) -> Result<Self, ConfigError> {
        match documents.len() {
            0 => Err(empty_config()),
            1 => Self::from_single_document(documents.remove(0)),
            2 => {
                let body = documents.remove(1);
                let front_matter = match documents.remove(0) {
                    Value::Mapping(mapping) => FrontMatter::from_mapping(&mapping)?,
                    Value::Null => FrontMatter::default(),
                    _ => {
                        return Err(ConfigError::Invalid(
                            "front matter must be a mapping".to_string(),
                        ))
                    }
                };
                Ok(Self {
                    front_matter,
                    body: body_nodes(body)?,
                })
            }
            n => Err(ConfigError::Invalid(format!(
                "expected at most two YAML documents, found {}",
                n
            ))),
        }
    }

    fn from_single_document(document: Value) -> Result<Self, ConfigError> {
        match document {
            Value::Null => Err(empty_config()),
            Value::Sequence(items) => {
                let mut front_matter = FrontMatter::default();
                let mut items = items.into_iter().peekable();
                while let Some((key, value)) = items.peek().and_then(front_matter_entry) {
                    front_matter.absorb(&key, &value)?;
                    items.next();
                }
                Ok(Self {
                    front_matter,
                    body: items.collect(),
                })
            }
            Value::Mapping(mut mapping) => {
                let front_matter = FrontMatter::from_mapping(&mapping)?;
                mapping.remove(SETUP_KEY);
                mapping.remove(NAME_KEY);
                let body = match mapping.remove(CHECKS_KEY) {
                    Some(checks) if mapping.is_empty() => body_nodes(checks)?,
                    Some(_) => {
                        return Err(ConfigError::Invalid(
                            "'checks' cannot be combined with other top-level keys".to_string(),
                        ))
                    }
                    None if mapping.is_empty() => Vec::new(),
                    None => vec![Value::Mapping(mapping)],
                };
                Ok(Self { front_matter, body })
            }
            _ => Err(ConfigError::Invalid(
                "configuration must be a list or a mapping".to_string(),
            )),
        }
    }
}

/// Returns the entry if `value` is a one-key `setup` or `name` mapping
fn front_matter_entry(value: &Value) -> Option<(String, Value)> {
    let mapping = value.as_mapping()?;
    if mapping.len() != 1 {
        return None;
    }
    let (key, value) = mapping.iter().next()?;
    match key.as_str()? {
        key @ (SETUP_KEY | NAME_KEY) => Some((key.to_string(), value.clone())),
        _ => None,
    }
}

fn empty_config() -> ConfigError {
    ConfigError::Invalid("configuration file is empty".to_string())
}

fn body_nodes(body: Value) -> Result<Vec<Value>, ConfigError> {
    match body {
        Value::Null => Ok(Vec::new()),
        Value::Sequence(items) => Ok(items),
        Value::Mapping(mapping) => Ok(vec![Value::Mapping(mapping)]),
        _ => Err(ConfigError::Invalid(
            "checks must be a list or a mapping".to_string(),
        )),
    }
}

fn optional_string(value: Option<&Value>, key: &str) -> Result<Option<String>, ConfigError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ConfigError::Invalid(format!("'{}' must be a string", key))),
    }
}
