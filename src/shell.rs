//! Timed subprocess execution
//!
//! Every command, whether a setup line, a shell check, or an engine call,
//! runs through [`run`]. The child is polled until it exits and its output
//! is closed, or until the timeout elapses, in which case the child and the
//! processes it started are killed and reported as timed out.

use std::io::Read;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Timeout applied to setup commands, shell checks and engine calls
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

const POLL_INTERVAL: Duration = Duration::from_millis(25);

/// Subprocess error
#[derive(Debug, Error)]
pub enum ShellError {
    #[error("failed to start `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed while waiting for `{command}`: {source}")]
    Wait {
        command: String,
        #[source]
        source: std::io::Error,
    },
}

/// Where the child's output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Collect stdout and stderr
    Capture,
    /// Share the parent's terminal
    Inherit,
}

/// Outcome of a finished (or killed) subprocess
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code, `None` when killed by a signal or on timeout
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Whether the command exited with status 0 in time
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }
}

/// Build a shell invocation for `command`
///
/// With [`OutputMode::Capture`] stderr is redirected into stdout so the two
/// streams interleave as they would on a terminal.
pub fn shell_command(command: &str, mode: OutputMode) -> Command {
    #[cfg(windows)]
    {
        let mut cmd = Command::new("cmd");
        match mode {
            OutputMode::Capture => cmd.arg("/C").arg(format!("({}) 2>&1", command)),
            OutputMode::Inherit => cmd.arg("/C").arg(command),
        };
        cmd
    }

    #[cfg(not(windows))]
    {
        let mut cmd = Command::new("sh");
        match mode {
            OutputMode::Capture => cmd.arg("-c").arg(format!("exec 2>&1\n{}", command)),
            OutputMode::Inherit => cmd.arg("-c").arg(command),
        };
        cmd
    }
}

/// Run a shell command with a timeout
pub fn run_shell(
    command: &str,
    mode: OutputMode,
    timeout: Duration,
) -> Result<CommandOutput, ShellError> {
    run(shell_command(command, mode), command, mode, timeout)
}

/// Run a prepared command with a timeout
///
/// `label` names the command in errors and logs. The deadline covers both
/// the child's exit and the end of its output, so a background process that
/// keeps the pipes open cannot stall the run.
pub fn run(
    mut command: Command,
    label: &str,
    mode: OutputMode,
    timeout: Duration,
) -> Result<CommandOutput, ShellError> {
    match mode {
        OutputMode::Capture => {
            command
                .stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped());
            own_process_group(&mut command);
        }
        OutputMode::Inherit => {
            command
                .stdin(Stdio::inherit())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit());
        }
    }

    log::debug!("running `{}` (timeout {}s)", label, timeout.as_secs());
    let mut child = command.spawn().map_err(|source| ShellError::Spawn {
        command: label.to_string(),
        source,
    })?;

    let (tx, rx) = mpsc::channel();
    let mut open = 0;
    if let Some(pipe) = child.stdout.take() {
        drain(pipe, Stream::Stdout, tx.clone());
        open += 1;
    }
    if let Some(pipe) = child.stderr.take() {
        drain(pipe, Stream::Stderr, tx.clone());
        open += 1;
    }
    drop(tx);

    let grouped = mode == OutputMode::Capture;
    let deadline = Instant::now() + timeout;
    let mut status: Option<ExitStatus> = None;
    let mut stdout = Vec::new();
    let mut stderr = Vec::new();

    loop {
        if status.is_none() {
            status = child.try_wait().map_err(|source| ShellError::Wait {
                command: label.to_string(),
                source,
            })?;
        }
        if status.is_some() && open == 0 {
            break;
        }

        let now = Instant::now();
        if now >= deadline {
            // Output of a killed command is incomplete; discard it
            log::warn!("`{}` timed out after {}s", label, timeout.as_secs());
            terminate(&mut child, grouped);
            return Ok(CommandOutput {
                exit_code: None,
                timed_out: true,
                ..CommandOutput::default()
            });
        }

        let wait = POLL_INTERVAL.min(deadline - now);
        if open == 0 {
            thread::sleep(wait);
            continue;
        }
        match rx.recv_timeout(wait) {
            Ok((Stream::Stdout, Some(bytes))) => stdout.extend_from_slice(&bytes),
            Ok((Stream::Stderr, Some(bytes))) => stderr.extend_from_slice(&bytes),
            Ok((_, None)) => open -= 1,
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => open = 0,
        }
    }

    Ok(CommandOutput {
        exit_code: status.and_then(|s| s.code()),
        timed_out: false,
        stdout: String::from_utf8_lossy(&stdout).into_owned(),
        stderr: String::from_utf8_lossy(&stderr).into_owned(),
    })
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

/// Chunk of output, `None` once the pipe is closed
type Chunk = (Stream, Option<Vec<u8>>);

/// Forward a pipe to the channel on a helper thread so the child never
/// blocks on a full pipe buffer
fn drain<R: Read + Send + 'static>(mut pipe: R, stream: Stream, tx: Sender<Chunk>) {
    thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            match pipe.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send((stream, Some(buf[..n].to_vec()))).is_err() {
                        return;
                    }
                }
            }
        }
        let _ = tx.send((stream, None));
    });
}

#[cfg(unix)]
fn own_process_group(command: &mut Command) {
    use std::os::unix::process::CommandExt;
    command.process_group(0);
}

#[cfg(not(unix))]
fn own_process_group(_command: &mut Command) {}

/// Kill the child, and with `grouped` everything it started
fn terminate(child: &mut Child, grouped: bool) {
    if grouped {
        kill_group(child.id());
    }
    let _ = child.kill();
    let _ = child.wait();
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    let _ = Command::new("kill")
        .args(["-s", "KILL", "--"])
        .arg(format!("-{}", pgid))
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_captures_stdout_and_stderr_together() {
        let output = run_shell(
            "echo out; echo err 1>&2",
            OutputMode::Capture,
            COMMAND_TIMEOUT,
        )
        .unwrap();
        assert!(output.success());
        assert!(output.stdout.contains("out"));
        assert!(output.stdout.contains("err"));
        assert!(output.stderr.is_empty());
    }

    #[test]
    fn test_reports_exit_code() {
        let output = run_shell("exit 3", OutputMode::Capture, COMMAND_TIMEOUT).unwrap();
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.success());
    }

    #[test]
    fn test_timeout_kills_child() {
        let started = Instant::now();
        let output =
            run_shell("sleep 5", OutputMode::Capture, Duration::from_millis(200)).unwrap();
        assert!(output.timed_out);
        assert!(!output.success());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_spawn_failure() {
        let result = run(
            Command::new("definitely-not-a-real-program-xyz"),
            "definitely-not-a-real-program-xyz",
            OutputMode::Capture,
            COMMAND_TIMEOUT,
        );
        assert!(matches!(result, Err(ShellError::Spawn { .. })));
    }

    #[test]
    fn test_background_child_cannot_outlive_timeout() {
        let started = Instant::now();
        let output = run_shell(
            "sleep 4 & echo started; exit 1",
            OutputMode::Capture,
            Duration::from_millis(200),
        )
        .unwrap();
        assert!(output.timed_out);
        assert!(!output.success());
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_large_output_is_collected() {
        let output = run_shell(
            "i=0; while [ $i -lt 5000 ]; do echo line$i; i=$((i+1)); done",
            OutputMode::Capture,
            COMMAND_TIMEOUT,
        )
        .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.lines().count(), 5000);
        assert!(output.stdout.ends_with("line4999\n"));
    }
}
