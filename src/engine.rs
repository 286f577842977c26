//! External checking engine
//!
//! The engine evaluates named checks (for example matching a fragment in a
//! file). Its check vocabulary is opaque here: it receives the synthesized
//! argument list and answers with `(description, passed, diagnostic)`, or an
//! error when the arguments make no sense to it.
//!
//! [`ProcessEngine`] runs the engine as a program. It is expected to print a
//! single JSON object on stdout:
//!
//! ```json
//! {"description": "Complete all TODOs", "passed": false, "diagnostic": "Found 2 fragments"}
//! ```
//!
//! Exit status 2 signals rejected arguments, with the reason on stderr.

use crate::shell::{self, OutputMode, ShellError, COMMAND_TIMEOUT};
use serde::Deserialize;
use std::process::Command;
use std::time::Duration;
use thiserror::Error;

/// Program used by [`ProcessEngine`] when none is configured
pub const DEFAULT_ENGINE_PROGRAM: &str = "gatorgrader";

/// Exit status an engine program uses to reject its arguments
const USAGE_EXIT_CODE: i32 = 2;

/// Answer from the engine for one check
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineOutcome {
    pub description: String,
    pub passed: bool,
    #[serde(default)]
    pub diagnostic: String,
}

/// Engine failure for a single check
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown check: {0}")]
    UnknownCheck(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("engine could not be started: {0}")]
    SpawnFailed(#[source] ShellError),

    #[error("engine timed out after {} seconds", .0.as_secs())]
    TimedOut(Duration),

    #[error("engine produced unreadable output: {0}")]
    InvalidOutput(String),
}

impl EngineError {
    /// Name of the error kind, shown as the diagnostic of a faulted check
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::UnknownCheck(_) => "UnknownCheck",
            EngineError::InvalidArguments(_) => "InvalidArguments",
            EngineError::SpawnFailed(_) => "SpawnFailed",
            EngineError::TimedOut(_) => "TimedOut",
            EngineError::InvalidOutput(_) => "InvalidOutput",
        }
    }
}

/// Something that can evaluate engine checks
pub trait CheckEngine {
    /// Evaluate one check given its argument list
    fn grade(&self, args: &[String]) -> Result<EngineOutcome, EngineError>;
}

impl<F> CheckEngine for F
where
    F: Fn(&[String]) -> Result<EngineOutcome, EngineError>,
{
    fn grade(&self, args: &[String]) -> Result<EngineOutcome, EngineError> {
        self(args)
    }
}

/// Engine backed by an external program
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: String,
    timeout: Duration,
}

impl Default for ProcessEngine {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_PROGRAM)
    }
}

impl ProcessEngine {
    /// Create an engine that runs `program`
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            timeout: COMMAND_TIMEOUT,
        }
    }

    /// Override the per-call timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

impl CheckEngine for ProcessEngine {
    fn grade(&self, args: &[String]) -> Result<EngineOutcome, EngineError> {
        let mut command = Command::new(&self.program);
        command.args(args);

        let output = shell::run(command, &self.program, OutputMode::Capture, self.timeout)
            .map_err(EngineError::SpawnFailed)?;

        if output.timed_out {
            return Err(EngineError::TimedOut(self.timeout));
        }

        if output.exit_code == Some(USAGE_EXIT_CODE) {
            let reason = first_non_empty(&output.stderr, &output.stdout);
            return Err(classify_rejection(reason));
        }

        parse_outcome(&output.stdout)
    }
}

fn first_non_empty<'a>(primary: &'a str, fallback: &'a str) -> &'a str {
    let primary = primary.trim();
    if primary.is_empty() {
        fallback.trim()
    } else {
        primary
    }
}

fn classify_rejection(reason: &str) -> EngineError {
    if reason.to_lowercase().contains("unknown check") {
        EngineError::UnknownCheck(reason.to_string())
    } else {
        EngineError::InvalidArguments(reason.to_string())
    }
}

/// Parse the engine's answer, taking the last JSON line so that any chatter
/// printed before it is ignored
fn parse_outcome(stdout: &str) -> Result<EngineOutcome, EngineError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or_else(|| EngineError::InvalidOutput("no output".to_string()))?;

    serde_json::from_str(line).map_err(|e| EngineError::InvalidOutput(e.to_string()))
}
