//! External command execution.
//!
//! Commands are always spawned from an argument vector, never through a
//! shell, so user-supplied fragments cannot change the command line.

use serde::Serialize;
use std::fmt;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command as TokioCommand;
use tracing::{debug, warn};

/// Exit code reported when the process could not be started.
pub const EXIT_SPAWN_FAILED: i32 = -1;
/// Exit code reported when the process exceeded its timeout and was killed.
pub const EXIT_TIMED_OUT: i32 = -2;
/// Exit code reported when the process was terminated by a signal.
pub const EXIT_SIGNALED: i32 = -3;

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new<I, S>(program: &str, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.to_string(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " \"{arg}\"")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Captured outcome of one command execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub command: String,
    pub exit_code: i32,
    pub stdout_lines: Vec<String>,
    pub raw_output: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn completed(spec: &CommandSpec, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        Self {
            command: spec.to_string(),
            exit_code,
            stdout_lines: stdout.lines().map(str::to_string).collect(),
            raw_output: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    pub fn spawn_failed(spec: &CommandSpec, reason: &str) -> Self {
        Self {
            command: spec.to_string(),
            exit_code: EXIT_SPAWN_FAILED,
            stdout_lines: Vec::new(),
            raw_output: String::new(),
            stderr: reason.to_string(),
        }
    }

    pub fn timed_out(spec: &CommandSpec) -> Self {
        Self {
            command: spec.to_string(),
            exit_code: EXIT_TIMED_OUT,
            stdout_lines: Vec::new(),
            raw_output: String::new(),
            stderr: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    pub fn failed_to_start(&self) -> bool {
        self.exit_code == EXIT_SPAWN_FAILED
    }

    pub fn is_timeout(&self) -> bool {
        self.exit_code == EXIT_TIMED_OUT
    }

    /// stdout and stderr joined, for success-marker and error-text checks.
    pub fn combined_output(&self) -> String {
        format!("{} {}", self.raw_output, self.stderr)
    }
}

/// Runs external commands.
///
/// Implementations never fail: every problem is encoded in
/// [`CommandResult::exit_code`] using the `EXIT_*` sentinels.
#[allow(async_fn_in_trait)]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> CommandResult;
}

/// [`CommandRunner`] backed by `tokio::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemCommandRunner;

impl SystemCommandRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for SystemCommandRunner {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> CommandResult {
        let started = Instant::now();
        let mut cmd = TokioCommand::new(&spec.program);
        cmd.args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(command = %spec, error = %e, "failed to start command");
                return CommandResult::spawn_failed(spec, &e.to_string());
            }
        };

        // Dropping the wait future on timeout drops the child, and
        // kill_on_drop terminates it.
        let result = match tokio::time::timeout(timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => {
                let exit_code = output.status.code().unwrap_or(EXIT_SIGNALED);
                CommandResult::completed(
                    spec,
                    exit_code,
                    &String::from_utf8_lossy(&output.stdout),
                    &String::from_utf8_lossy(&output.stderr),
                )
            }
            Ok(Err(e)) => {
                warn!(command = %spec, error = %e, "failed to collect command output");
                CommandResult::spawn_failed(spec, &e.to_string())
            }
            Err(_) => {
                warn!(
                    command = %spec,
                    timeout_ms = timeout.as_millis() as u64,
                    "command timed out, child terminated"
                );
                CommandResult::timed_out(spec)
            }
        };

        debug!(
            command = %spec,
            exit_code = result.exit_code,
            lines = result.stdout_lines.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "command finished"
        );
        result
    }
}
