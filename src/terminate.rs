//! Process termination.
//!
//! Kill failures are data, never errors: every requested PID yields one
//! [`KillOutcome`], and a batch keeps going after individual failures.

use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::platform::Platform;
use crate::records::{BatchKillResult, KillOutcome};
use crate::runner::{CommandResult, CommandRunner, CommandSpec, SystemCommandRunner};
use crate::utils::validate_pid;

pub const PROTECTED_MESSAGE: &str = "protected system process";

/// Idle/kernel and init/launchd PIDs.
const BASE_PROTECTED_PIDS: [u32; 2] = [0, 1];

const PROTECTED_NAMES: [&str; 7] = [
    "system idle process",
    "system",
    "kernel_task",
    "launchd",
    "init",
    "systemd",
    "kthreadd",
];

/// Best-effort denylist of PIDs that must never be targeted.
///
/// Covers PIDs 0 and 1 everywhere, the platform's own kernel PIDs, this
/// process itself and any `protectedPids` from the configuration. It guards against
/// accidents and is not a security boundary.
#[derive(Debug, Clone)]
pub struct SystemProcessGuard {
    pids: HashSet<u32>,
}

impl SystemProcessGuard {
    pub fn new(platform: Platform, extra: &[u32]) -> Self {
        let platform_pids: &[u32] = match platform {
            Platform::Windows => &[4],
            Platform::Linux => &[2],
            Platform::MacOS => &[],
        };
        let mut pids: HashSet<u32> = BASE_PROTECTED_PIDS
            .iter()
            .chain(platform_pids)
            .copied()
            .collect();
        pids.insert(std::process::id());
        pids.extend(extra.iter().copied());
        Self { pids }
    }

    pub fn is_protected(&self, pid: u32) -> bool {
        self.pids.contains(&pid)
    }

    /// Case-insensitive match against well-known system process names.
    pub fn is_protected_name(name: &str) -> bool {
        let name = name.trim().to_lowercase();
        PROTECTED_NAMES.contains(&name.as_str())
    }
}

/// Command that force-kills `pid` on `platform`.
pub fn kill_command(platform: Platform, pid: u32) -> CommandSpec {
    match platform {
        Platform::Windows => {
            CommandSpec::new("taskkill", ["/F".to_string(), "/PID".into(), pid.to_string()])
        }
        Platform::Linux | Platform::MacOS => {
            CommandSpec::new("kill", ["-9".to_string(), pid.to_string()])
        }
    }
}

/// Kills processes through a [`CommandRunner`].
pub struct TerminationEngine<R = SystemCommandRunner> {
    runner: R,
    platform: Platform,
    config: Config,
    guard: SystemProcessGuard,
}

impl TerminationEngine<SystemCommandRunner> {
    pub fn new(config: Config) -> Self {
        Self::with_runner(SystemCommandRunner::new(), Platform::detect(), config)
    }
}

impl<R: CommandRunner> TerminationEngine<R> {
    pub fn with_runner(runner: R, platform: Platform, config: Config) -> Self {
        let guard = SystemProcessGuard::new(platform, &config.protected_pids);
        Self {
            runner,
            platform,
            config,
            guard,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// True when `pid` parses and is on the denylist.
    pub fn is_system_process(&self, pid: &str) -> bool {
        validate_pid(pid).is_ok_and(|pid| self.guard.is_protected(pid))
    }

    /// Kills one process. Invalid and protected PIDs fail without
    /// running any command. The outcome carries `pid` as given, trimmed.
    pub async fn kill_one(&self, pid: &str) -> KillOutcome {
        let label = pid.trim();
        let pid = match validate_pid(label) {
            Ok(pid) => pid,
            Err(e) => return KillOutcome::failed(label, e.to_string()),
        };

        if self.guard.is_protected(pid) {
            warn!(pid, "refusing to kill protected system process");
            return KillOutcome::failed(label, PROTECTED_MESSAGE);
        }

        let spec = kill_command(self.platform, pid);
        let result = self.runner.run(&spec, self.config.command_timeout()).await;
        let outcome = self.interpret(label, &spec, &result);
        debug!(pid, success = outcome.success, message = %outcome.message, "kill finished");
        outcome
    }

    /// Kills every PID with at most `killConcurrency` commands in flight.
    /// Outcomes follow the input order.
    pub async fn kill_many<S: AsRef<str>>(&self, pids: &[S]) -> BatchKillResult {
        let outcomes: Vec<KillOutcome> = stream::iter(pids.iter().map(|p| p.as_ref()))
            .map(|pid| self.kill_one(pid))
            .buffered(self.config.kill_concurrency())
            .collect()
            .await;

        let result = BatchKillResult::from_outcomes(outcomes);
        info!(
            total = result.total_count,
            succeeded = result.success_count,
            failed = result.failed_count,
            "{}",
            result.message
        );
        result
    }

    fn interpret(&self, pid: &str, spec: &CommandSpec, result: &CommandResult) -> KillOutcome {
        if result.failed_to_start() {
            return KillOutcome::failed(
                pid,
                format!("{} could not be started: {}", spec.program, result.stderr.trim()),
            );
        }
        if result.is_timeout() {
            return KillOutcome::failed(
                pid,
                format!(
                    "{} timed out after {}ms",
                    spec.program, self.config.command_timeout_ms
                ),
            );
        }

        // taskkill prints "SUCCESS:" in English locales only; the exit
        // code is checked first and the text is a fallback.
        let succeeded = result.success()
            || (self.platform.is_windows() && result.combined_output().contains("SUCCESS"));
        if succeeded {
            return KillOutcome::succeeded(pid, format!("Process {pid} terminated"));
        }

        let detail = [result.stderr.trim(), result.raw_output.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("exit code {}", result.exit_code));
        KillOutcome::failed(pid, format!("Failed to kill process {pid}: {detail}"))
    }
}
