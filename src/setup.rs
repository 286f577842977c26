//! Setup commands
//!
//! The front matter may carry a block of shell commands that prepare the
//! environment. Each line runs once, in order, before any check. The first
//! failure aborts the whole run.

use crate::shell::{self, OutputMode, ShellError, COMMAND_TIMEOUT};
use std::time::Duration;
use thiserror::Error;

/// Setup failure, always fatal
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("The set up command \"{command}\" failed with exit code {code}")]
    Failed { command: String, code: String },

    #[error("The set up command \"{command}\" timed out after {seconds} seconds")]
    TimedOut { command: String, seconds: u64 },

    #[error(transparent)]
    Shell(#[from] ShellError),
}

/// Runs the setup block
#[derive(Debug, Clone)]
pub struct SetupRunner {
    timeout: Duration,
}

impl Default for SetupRunner {
    fn default() -> Self {
        Self {
            timeout: COMMAND_TIMEOUT,
        }
    }
}

impl SetupRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the per-command timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run every non-blank line of `setup`; returns the number of commands run
    pub fn run(&self, setup: &str) -> Result<usize, SetupError> {
        let mut executed = 0;
        for command in setup.lines().map(str::trim).filter(|line| !line.is_empty()) {
            log::info!("setup: {}", command);
            let output = shell::run_shell(command, OutputMode::Inherit, self.timeout)?;
            if output.timed_out {
                return Err(SetupError::TimedOut {
                    command: command.to_string(),
                    seconds: self.timeout.as_secs(),
                });
            }
            if !output.success() {
                return Err(SetupError::Failed {
                    command: command.to_string(),
                    code: output
                        .exit_code
                        .map(|code| code.to_string())
                        .unwrap_or_else(|| "none".to_string()),
                });
            }
            executed += 1;
        }
        Ok(executed)
    }
}
