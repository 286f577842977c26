//! Config tree flattening
//!
//! Walks the nested check tree depth-first and emits one [`FlattenedCheck`]
//! per leaf, in pre-order. A mapping whose values are all lists is a
//! grouping node: each key becomes a path segment for everything below it.
//! A mapping with scalar values is a single check.

use crate::config::ConfigError;
use serde_yaml::{Mapping, Number, Value};
use std::fmt;

/// Raw check data as written in the configuration, key order preserved
pub type RawInfo = serde_json::Map<String, serde_json::Value>;

/// Value of an engine check option
#[derive(Debug, Clone, PartialEq)]
pub enum OptionValue {
    Bool(bool),
    Number(Number),
    String(String),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Number(n) => write!(f, "{}", n),
            OptionValue::String(s) => write!(f, "{}", s),
        }
    }
}

/// What a check runs
#[derive(Debug, Clone, PartialEq)]
pub enum CheckKind {
    /// Shell command, passes on exit code 0
    Command(String),

    /// Named check evaluated by the checking engine
    Engine {
        check_name: String,
        /// Options in declaration order
        options: Vec<(String, OptionValue)>,
    },
}

/// A single check description from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct CheckSpec {
    pub description: Option<String>,
    pub kind: CheckKind,
    pub raw_info: RawInfo,
}

/// A check together with the path of the groupings that contain it
#[derive(Debug, Clone, PartialEq)]
pub struct FlattenedCheck {
    /// `/`-joined grouping keys, `None` for top-level checks
    pub file_context: Option<String>,
    pub check: CheckSpec,
}

/// Flatten the check tree into pre-order leaf checks
pub fn flatten(nodes: &[Value]) -> Result<Vec<FlattenedCheck>, ConfigError> {
    let mut flattened = Vec::new();
    walk(nodes, None, &mut flattened)?;
    log::debug!("flattened {} checks", flattened.len());
    Ok(flattened)
}

fn walk(
    nodes: &[Value],
    context: Option<String>,
    out: &mut Vec<FlattenedCheck>,
) -> Result<(), ConfigError> {
    for (index, node) in nodes.iter().enumerate() {
        let mapping = node.as_mapping().ok_or_else(|| {
            ConfigError::Invalid(format!(
                "entry {} at {} must be a mapping",
                index + 1,
                location(&context)
            ))
        })?;

        if is_grouping(mapping) {
            for (key, value) in mapping {
                let segment = key_string(key, &context)?;
                let path = match &context {
                    Some(parent) => format!("{}/{}", parent, segment),
                    None => segment,
                };
                if let Value::Sequence(children) = value {
                    walk(children, Some(path), out)?;
                }
            }
        } else {
            out.push(FlattenedCheck {
                file_context: context.clone(),
                check: parse_leaf(mapping, &context)?,
            });
        }
    }
    Ok(())
}

fn is_grouping(mapping: &Mapping) -> bool {
    !mapping.is_empty() && mapping.values().all(Value::is_sequence)
}

fn location(context: &Option<String>) -> String {
    match context {
        Some(path) => format!("'{}'", path),
        None => "top level".to_string(),
    }
}

fn key_string(key: &Value, context: &Option<String>) -> Result<String, ConfigError> {
    scalar_string(key).ok_or_else(|| {
        ConfigError::Invalid(format!("non-scalar key at {}", location(context)))
    })
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn parse_leaf(mapping: &Mapping, context: &Option<String>) -> Result<CheckSpec, ConfigError> {
    let at = location(context);

    let grouped: Vec<String> = mapping
        .iter()
        .filter(|(_, value)| value.is_sequence())
        .filter_map(|(key, _)| scalar_string(key))
        .collect();
    if !grouped.is_empty() {
        return Err(ConfigError::MultipleChecks {
            location: at,
            keys: grouped.join(", "),
        });
    }

    let field = |name: &str| -> Result<Option<String>, ConfigError> {
        match mapping.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(value) => scalar_string(value).map(Some).ok_or_else(|| {
                ConfigError::Invalid(format!("'{}' of check at {} must be a string", name, at))
            }),
        }
    };

    let description = field("description")?;
    let kind = match (field("command")?, field("check")?) {
        (Some(_), Some(_)) => {
            return Err(ConfigError::MultipleChecks {
                location: at,
                keys: "command, check".to_string(),
            })
        }
        (Some(command), None) => CheckKind::Command(command),
        (None, Some(check_name)) => CheckKind::Engine {
            check_name,
            options: parse_options(mapping.get("options"), &at)?,
        },
        (None, None) => {
            return Err(ConfigError::Invalid(format!(
                "check at {} must define either 'command' or 'check'",
                at
            )))
        }
    };

    Ok(CheckSpec {
        description,
        kind,
        raw_info: raw_info(mapping, &at)?,
    })
}

fn parse_options(
    options: Option<&Value>,
    at: &str,
) -> Result<Vec<(String, OptionValue)>, ConfigError> {
    let mapping = match options {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Mapping(mapping)) => mapping,
        Some(_) => {
            return Err(ConfigError::Invalid(format!(
                "'options' of check at {} must be a mapping",
                at
            )))
        }
    };

    mapping
        .iter()
        .map(|(key, value)| {
            let key = scalar_string(key).ok_or_else(|| {
                ConfigError::Invalid(format!("non-scalar option name in check at {}", at))
            })?;
            let value = match value {
                Value::Bool(b) => OptionValue::Bool(*b),
                Value::Number(n) => OptionValue::Number(n.clone()),
                Value::String(s) => OptionValue::String(s.clone()),
                _ => {
                    return Err(ConfigError::InvalidOption {
                        location: at.to_string(),
                        key,
                    })
                }
            };
            Ok((key, value))
        })
        .collect()
}

fn raw_info(mapping: &Mapping, at: &str) -> Result<RawInfo, ConfigError> {
    let mut raw = RawInfo::new();
    for (key, value) in mapping {
        let key = scalar_string(key)
            .ok_or_else(|| ConfigError::Invalid(format!("non-scalar key in check at {}", at)))?;
        let value = serde_json::to_value(value).map_err(|e| {
            ConfigError::Invalid(format!("value of '{}' in check at {}: {}", key, at, e))
        })?;
        raw.insert(key, value);
    }
    Ok(raw)
}
