//! Check execution
//!
//! [`Executor::execute`] runs exactly one check and always returns exactly one
//! [`CheckResult`]. Engine errors are contained here and become an ordinary
//! failing result, so a broken check never hides the results of the others.

use crate::check::{Check, EngineCheck, ShellCheck};
use crate::engine::CheckEngine;
use crate::flatten::RawInfo;
use crate::shell::{self, OutputMode, COMMAND_TIMEOUT};
use std::time::Duration;

/// Indentation applied to continuation lines of a diagnostic
const DIAGNOSTIC_INDENT: &str = "\n     ";

/// Result of running a single check
#[derive(Debug, Clone, PartialEq)]
pub struct CheckResult {
    pub passed: bool,
    pub description: String,
    /// Explanation of a failure, empty when passed
    pub diagnostic: String,
    pub raw_info: RawInfo,
    /// `directory/file` the check inspected, if any
    pub path: Option<String>,
    /// Command a student can run to reproduce the check
    pub run_command: Option<String>,
}

/// Runs checks against a checking engine
pub struct Executor<'a> {
    engine: &'a dyn CheckEngine,
    timeout: Duration,
}

impl<'a> Executor<'a> {
    pub fn new(engine: &'a dyn CheckEngine) -> Self {
        Self {
            engine,
            timeout: COMMAND_TIMEOUT,
        }
    }

    /// Override the shell check timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run one check
    pub fn execute(&self, check: &Check) -> CheckResult {
        match check {
            Check::Shell(shell) => self.execute_shell(shell),
            Check::Engine(engine) => self.execute_engine(engine),
        }
    }

    fn execute_shell(&self, check: &ShellCheck) -> CheckResult {
        let (passed, diagnostic) =
            match shell::run_shell(&check.command, OutputMode::Capture, self.timeout) {
                Ok(output) if output.timed_out => (
                    false,
                    format!(
                        "Command timed out after {} seconds",
                        self.timeout.as_secs()
                    ),
                ),
                Ok(output) if output.success() => (true, String::new()),
                Ok(output) => (false, indent_diagnostic(&output.stdout)),
                Err(e) => (false, e.to_string()),
            };

        CheckResult {
            passed,
            description: check.description.clone(),
            diagnostic,
            raw_info: check.raw_info.clone(),
            path: None,
            run_command: Some(check.command.clone()),
        }
    }

    fn execute_engine(&self, check: &EngineCheck) -> CheckResult {
        match self.engine.grade(&check.args) {
            Ok(outcome) => CheckResult {
                passed: outcome.passed,
                description: outcome.description,
                diagnostic: outcome.diagnostic,
                raw_info: check.raw_info.clone(),
                path: checked_path(&check.args),
                run_command: value_after(&check.args, "--command").map(str::to_string),
            },
            Err(e) => {
                log::warn!("check {:?} faulted: {}", check.args, e);
                CheckResult {
                    passed: false,
                    description: format!("Invalid check: {}", check.args.join(" ")),
                    diagnostic: e.kind().to_string(),
                    raw_info: check.raw_info.clone(),
                    path: None,
                    run_command: None,
                }
            }
        }
    }
}

/// Trim captured output and indent every continuation line
fn indent_diagnostic(output: &str) -> String {
    output.trim().replace('\n', DIAGNOSTIC_INDENT)
}

fn value_after<'s>(args: &'s [String], flag: &str) -> Option<&'s str> {
    let index = args.iter().position(|arg| arg == flag)?;
    args.get(index + 1).map(String::as_str)
}

/// `--directory <dir> --file <name>` becomes `dir/name`
fn checked_path(args: &[String]) -> Option<String> {
    let index = args.iter().position(|arg| arg == "--directory")?;
    let directory = args.get(index + 1)?;
    let file = args.get(index + 3)?;
    Some(format!("{}/{}", directory, file))
}
