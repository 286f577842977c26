//! Check synthesis
//!
//! Turns flattened check descriptions into executable [`Check`]s. Engine
//! checks get their argument list built here, in the exact order the engine
//! expects:
//!
//! ```text
//! [--description <text>] <check name> [--<option> [<value>]]... [--directory <dir> --file <name>]
//! ```

use crate::config::ConfigError;
use crate::flatten::{flatten, CheckKind, FlattenedCheck, OptionValue, RawInfo};
use serde_yaml::Value;

/// A check that runs a shell command
#[derive(Debug, Clone, PartialEq)]
pub struct ShellCheck {
    pub command: String,
    /// Configured description, or the command itself
    pub description: String,
    pub raw_info: RawInfo,
}

/// A check evaluated by the external checking engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineCheck {
    pub args: Vec<String>,
    pub raw_info: RawInfo,
}

/// An executable check
#[derive(Debug, Clone, PartialEq)]
pub enum Check {
    Shell(ShellCheck),
    Engine(EngineCheck),
}

impl Check {
    /// Build the executable form of a flattened check
    pub fn synthesize(flattened: &FlattenedCheck) -> Self {
        let spec = &flattened.check;
        match &spec.kind {
            CheckKind::Command(command) => Check::Shell(ShellCheck {
                command: command.clone(),
                description: spec
                    .description
                    .clone()
                    .unwrap_or_else(|| command.clone()),
                raw_info: spec.raw_info.clone(),
            }),
            CheckKind::Engine {
                check_name,
                options,
            } => Check::Engine(EngineCheck {
                args: engine_args(
                    spec.description.as_deref(),
                    check_name,
                    options,
                    flattened.file_context.as_deref(),
                ),
                raw_info: spec.raw_info.clone(),
            }),
        }
    }
}

fn engine_args(
    description: Option<&str>,
    check_name: &str,
    options: &[(String, OptionValue)],
    file_context: Option<&str>,
) -> Vec<String> {
    let mut args = Vec::new();

    if let Some(description) = description {
        args.push("--description".to_string());
        args.push(description.to_string());
    }
    args.push(check_name.to_string());

    for (key, value) in options {
        match value {
            // Boolean options are presence flags
            OptionValue::Bool(true) => args.push(format!("--{}", key)),
            OptionValue::Bool(false) => {}
            other => {
                args.push(format!("--{}", key));
                args.push(other.to_string());
            }
        }
    }

    if let Some(context) = file_context {
        let (directory, file) = split_file_context(context);
        args.push("--directory".to_string());
        args.push(directory.to_string());
        args.push("--file".to_string());
        args.push(file.to_string());
    }

    args
}

/// Split a file context into (directory, file name) on the last separator
pub fn split_file_context(context: &str) -> (&str, &str) {
    match context.rsplit_once('/') {
        Some((directory, file)) => (directory, file),
        None => (".", context),
    }
}

/// Flatten the check tree and synthesize every check
pub fn build_checks(body: &[Value]) -> Result<Vec<Check>, ConfigError> {
    let checks: Vec<Check> = flatten(body)?.iter().map(Check::synthesize).collect();
    if checks.is_empty() {
        return Err(ConfigError::NoChecks);
    }
    Ok(checks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flatten::CheckSpec;
    use pretty_assertions::assert_eq;

    fn engine_check(
        description: Option<&str>,
        options: Vec<(&str, OptionValue)>,
        file_context: Option<&str>,
    ) -> FlattenedCheck {
        FlattenedCheck {
            file_context: file_context.map(str::to_string),
            check: CheckSpec {
                description: description.map(str::to_string),
                kind: CheckKind::Engine {
                    check_name: "MatchFileFragment".to_string(),
                    options: options
                        .into_iter()
                        .map(|(k, v)| (k.to_string(), v))
                        .collect(),
                },
                raw_info: RawInfo::new(),
            },
        }
    }

    fn args_of(check: Check) -> Vec<String> {
        match check {
            Check::Engine(engine) => engine.args,
            Check::Shell(_) => panic!("expected engine check"),
        }
    }

    #[test]
    fn test_true_boolean_is_bare_flag() {
        let flat = engine_check(None, vec![("exact", OptionValue::Bool(true))], None);
        assert_eq!(
            args_of(Check::synthesize(&flat)),
            vec!["MatchFileFragment", "--exact"]
        );
    }

    #[test]
    fn test_false_boolean_is_omitted() {
        let flat = engine_check(None, vec![("exact", OptionValue::Bool(false))], None);
        assert_eq!(args_of(Check::synthesize(&flat)), vec!["MatchFileFragment"]);
    }

    #[test]
    fn test_zero_count_keeps_value() {
        let flat = engine_check(
            None,
            vec![("count", OptionValue::Number(serde_yaml::Number::from(0i64)))],
            None,
        );
        assert_eq!(
            args_of(Check::synthesize(&flat)),
            vec!["MatchFileFragment", "--count", "0"]
        );
    }

    #[test]
    fn test_file_context_with_directory() {
        let flat = engine_check(Some("desc"), vec![], Some("src/main.py"));
        let args = args_of(Check::synthesize(&flat));
        assert_eq!(
            args[args.len() - 4..].to_vec(),
            vec!["--directory", "src", "--file", "main.py"]
        );
    }

    #[test]
    fn test_file_context_without_directory() {
        let flat = engine_check(Some("desc"), vec![], Some("README.md"));
        let args = args_of(Check::synthesize(&flat));
        assert_eq!(
            args[args.len() - 4..].to_vec(),
            vec!["--directory", ".", "--file", "README.md"]
        );
    }

    #[test]
    fn test_nested_file_context_splits_on_last_separator() {
        assert_eq!(split_file_context("a/b/c.txt"), ("a/b", "c.txt"));
    }

    #[test]
    fn test_shell_description_defaults_to_command() {
        let flat = FlattenedCheck {
            file_context: Some("src".to_string()),
            check: CheckSpec {
                description: None,
                kind: CheckKind::Command("ls src".to_string()),
                raw_info: RawInfo::new(),
            },
        };
        match Check::synthesize(&flat) {
            Check::Shell(shell) => {
                assert_eq!(shell.command, "ls src");
                assert_eq!(shell.description, "ls src");
            }
            Check::Engine(_) => panic!("expected shell check"),
        }
    }

    #[test]
    fn test_build_checks_end_to_end() {
        let yaml = r#"
setup: null
checks:
  - a.py:
      - description: no TODO
        check: MatchFileFragment
        options:
          fragment: TODO
          count: 0
          exact: true
"#;
        let config = crate::config::CheckConfig::parse(yaml).unwrap();
        let flattened = flatten(&config.body).unwrap();
        assert_eq!(flattened.len(), 1);
        assert_eq!(flattened[0].file_context.as_deref(), Some("a.py"));

        let checks = build_checks(&config.body).unwrap();
        assert_eq!(
            args_of(checks[0].clone()),
            vec![
                "--description",
                "no TODO",
                "MatchFileFragment",
                "--fragment",
                "TODO",
                "--count",
                "0",
                "--exact",
                "--directory",
                ".",
                "--file",
                "a.py",
            ]
        );
    }

    #[test]
    fn test_build_checks_rejects_empty_tree() {
        assert!(matches!(build_checks(&[]), Err(ConfigError::NoChecks)));
    }
}
