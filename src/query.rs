//! Port and process queries.
//!
//! Flow for every query: validate input, pick the platform's command
//! template, run it, parse the output, then filter client-side.

use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::config::Config;
use crate::parser::{self, linux, windows};
use crate::platform::Platform;
use crate::records::{MemoryUsage, PortRecord, ProcessRecord};
use crate::runner::{CommandResult, CommandRunner, CommandSpec, SystemCommandRunner};
use crate::utils::{
    validate_cpu_threshold, validate_keyword, validate_memory_threshold, validate_port,
    validate_user, ProcessFilter,
};
use crate::{Error, Result};

/// Command that lists sockets, optionally narrowed to one port by the OS.
pub fn port_command(platform: Platform, port: Option<u16>) -> CommandSpec {
    match (platform, port) {
        (Platform::Windows, _) => CommandSpec::new("netstat", ["-ano"]),
        (Platform::Linux, _) => CommandSpec::new("ss", ["-tulpn"]),
        (Platform::MacOS, Some(port)) => {
            CommandSpec::new("lsof", ["-i".to_string(), format!(":{port}"), "-n".into(), "-P".into()])
        }
        (Platform::MacOS, None) => CommandSpec::new("lsof", ["-i", "-n", "-P"]),
    }
}

/// Command that lists every process.
pub fn process_list_command(platform: Platform) -> CommandSpec {
    match platform {
        Platform::Windows => CommandSpec::new("tasklist", ["/FO", "CSV", "/NH"]),
        Platform::Linux | Platform::MacOS => CommandSpec::new("ps", ["aux"]),
    }
}

/// Command that lists exactly one PID.
pub fn process_pid_command(platform: Platform, pid: u32) -> CommandSpec {
    match platform {
        Platform::Windows => CommandSpec::new(
            "tasklist",
            ["/FO".to_string(), "CSV".into(), "/NH".into(), "/FI".into(), format!("PID eq {pid}")],
        ),
        Platform::Linux | Platform::MacOS => {
            CommandSpec::new("ps", ["u".to_string(), "-p".into(), pid.to_string()])
        }
    }
}

/// OS-level name filter used as the first query phase, where one exists.
pub fn process_name_command(platform: Platform, name: &str) -> Option<CommandSpec> {
    match platform {
        Platform::Windows => Some(CommandSpec::new(
            "tasklist",
            [
                "/FO".to_string(),
                "CSV".into(),
                "/NH".into(),
                "/FI".into(),
                format!("IMAGENAME eq {name}*"),
            ],
        )),
        Platform::Linux => Some(CommandSpec::new("ps", ["u", "-C", name])),
        Platform::MacOS => None,
    }
}

/// Case-insensitive substring match on the process name.
pub fn filter_by_name(processes: Vec<ProcessRecord>, keyword: &str) -> Vec<ProcessRecord> {
    let needle = keyword.to_lowercase();
    processes
        .into_iter()
        .filter(|p| p.name.to_lowercase().contains(&needle))
        .collect()
}

/// Adds `/V` to a tasklist command so its rows carry status, owner and
/// CPU time. Other programs are left alone.
fn with_verbose(mut spec: CommandSpec, verbose: bool) -> CommandSpec {
    if verbose && spec.program == "tasklist" {
        spec.args.insert(0, "/V".to_string());
    }
    spec
}

/// Filters applied to a process listing after it has been parsed.
///
/// Unset fields match everything. A record whose CPU or memory column is
/// empty or not comparable never passes a threshold on that column.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProcessCriteria {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_cpu: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_memory: Option<MemoryUsage>,
}

impl ProcessCriteria {
    /// Validates raw values as they come from the command line.
    pub fn from_args(
        user: Option<&str>,
        min_cpu: Option<f64>,
        min_memory: Option<&str>,
    ) -> Result<Self> {
        Ok(Self {
            user: user.map(validate_user).transpose()?,
            min_cpu: min_cpu.map(validate_cpu_threshold).transpose()?,
            min_memory: min_memory.map(validate_memory_threshold).transpose()?,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.min_cpu.is_none() && self.min_memory.is_none()
    }

    pub fn matches(&self, process: &ProcessRecord) -> bool {
        if let Some(user) = &self.user {
            if !owned_by(&process.user, user) {
                return false;
            }
        }
        if let Some(min) = self.min_cpu {
            if !process.cpu_percent().is_some_and(|cpu| cpu >= min) {
                return false;
            }
        }
        if let Some(min) = self.min_memory {
            if !process.memory().is_some_and(|memory| memory.at_least(min)) {
                return false;
            }
        }
        true
    }
}

/// Exact owner match, or a match on the account part of `DOMAIN\user`.
fn owned_by(owner: &str, user: &str) -> bool {
    let owner = owner.trim();
    owner == user
        || owner
            .rsplit_once('\\')
            .is_some_and(|(_, account)| account == user)
}

/// Runs port and process queries through a [`CommandRunner`].
pub struct QueryEngine<R = SystemCommandRunner> {
    runner: R,
    platform: Platform,
    config: Config,
}

impl QueryEngine<SystemCommandRunner> {
    /// Engine for the host platform using real system commands.
    pub fn new(config: Config) -> Self {
        Self::with_runner(SystemCommandRunner::new(), Platform::detect(), config)
    }
}

impl<R: CommandRunner> QueryEngine<R> {
    pub fn with_runner(runner: R, platform: Platform, config: Config) -> Self {
        Self {
            runner,
            platform,
            config,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn required_commands(&self) -> &'static [&'static str] {
        self.platform.required_commands()
    }

    /// Lists sockets, optionally only those whose local port is `port`.
    ///
    /// `None` or an empty string means all ports. No match is an empty
    /// list, not an error.
    pub async fn query_ports(&self, port: Option<&str>) -> Result<Vec<PortRecord>> {
        let port = match port {
            Some(raw) => validate_port(raw)?,
            None => None,
        };

        let mut records = match self.platform {
            Platform::Linux => self.linux_ports().await?,
            platform => {
                let result = self.execute(&port_command(platform, port)).await?;
                parser::parse_ports(platform, &result.stdout_lines)
            }
        };

        if let Some(port) = port {
            let wanted = port.to_string();
            records.retain(|r| r.port == wanted);
        }
        if self.config.resolve_process_names {
            self.resolve_process_details(&mut records).await;
        }

        debug!(platform = %self.platform, ?port, count = records.len(), "port query finished");
        Ok(records)
    }

    /// Lists processes. Empty keyword lists everything, a numeric keyword
    /// selects that PID, anything else matches process names.
    pub async fn query_processes(&self, keyword: Option<&str>) -> Result<Vec<ProcessRecord>> {
        self.processes(keyword, false).await
    }

    /// Like [`query_processes`](Self::query_processes), keeping only the
    /// records that satisfy `criteria`.
    ///
    /// An owner filter on Windows switches tasklist to verbose output, the
    /// only form that reports user names.
    pub async fn query_processes_matching(
        &self,
        keyword: Option<&str>,
        criteria: &ProcessCriteria,
    ) -> Result<Vec<ProcessRecord>> {
        let mut records = self.processes(keyword, criteria.user.is_some()).await?;
        if !criteria.is_empty() {
            let listed = records.len();
            records.retain(|p| criteria.matches(p));
            debug!(?criteria, listed, kept = records.len(), "process criteria applied");
        }
        Ok(records)
    }

    /// Processes owned by `user`.
    pub async fn query_processes_by_user(&self, user: &str) -> Result<Vec<ProcessRecord>> {
        let criteria = ProcessCriteria::from_args(Some(user), None, None)?;
        self.query_processes_matching(None, &criteria).await
    }

    /// Processes using at least `threshold` percent CPU.
    pub async fn query_high_cpu_processes(&self, threshold: f64) -> Result<Vec<ProcessRecord>> {
        let criteria = ProcessCriteria::from_args(None, Some(threshold), None)?;
        self.query_processes_matching(None, &criteria).await
    }

    /// Processes using at least `threshold` memory, given as `5%` or `100MB`.
    pub async fn query_high_memory_processes(
        &self,
        threshold: &str,
    ) -> Result<Vec<ProcessRecord>> {
        let criteria = ProcessCriteria::from_args(None, None, Some(threshold))?;
        self.query_processes_matching(None, &criteria).await
    }

    async fn processes(&self, keyword: Option<&str>, verbose: bool) -> Result<Vec<ProcessRecord>> {
        let filter = match keyword {
            Some(raw) => validate_keyword(raw)?,
            None => None,
        };

        let records = match filter {
            None => self.list_processes(verbose).await?,
            Some(ProcessFilter::Pid(pid)) => {
                let spec = with_verbose(process_pid_command(self.platform, pid), verbose);
                let result = self.execute(&spec).await?;
                let wanted = pid.to_string();
                parser::parse_processes(self.platform, &result.stdout_lines)
                    .into_iter()
                    .filter(|p| p.pid == wanted)
                    .collect()
            }
            Some(ProcessFilter::Name(name)) => self.query_processes_by_name(&name, verbose).await?,
        };

        debug!(platform = %self.platform, count = records.len(), "process query finished");
        Ok(records)
    }

    /// Two-phase name lookup: the OS-level exact filter first, then a full
    /// listing filtered here when the first phase finds nothing. The retry
    /// covers tasklist's image-name truncation and `ps -C` only matching
    /// the 15-character kernel comm.
    async fn query_processes_by_name(
        &self,
        name: &str,
        verbose: bool,
    ) -> Result<Vec<ProcessRecord>> {
        if let Some(spec) = process_name_command(self.platform, name) {
            let result = self.execute(&with_verbose(spec, verbose)).await?;
            let matches = filter_by_name(
                parser::parse_processes(self.platform, &result.stdout_lines),
                name,
            );
            if !matches.is_empty() {
                return Ok(matches);
            }
            debug!(name, "exact name filter found nothing, falling back to full listing");
        }

        let all = self.list_processes(verbose).await?;
        Ok(filter_by_name(all, name))
    }

    async fn list_processes(&self, verbose: bool) -> Result<Vec<ProcessRecord>> {
        let spec = with_verbose(process_list_command(self.platform), verbose);
        let result = self.execute(&spec).await?;
        Ok(parser::parse_processes(self.platform, &result.stdout_lines))
    }

    /// `ss` first, `netstat` when `ss` cannot be run at all.
    async fn linux_ports(&self) -> Result<Vec<PortRecord>> {
        match self.execute(&port_command(Platform::Linux, None)).await {
            Ok(result) => Ok(linux::parse_ss(&result.stdout_lines)),
            Err(ss_err) => {
                warn!(error = %ss_err, "ss unavailable, falling back to netstat");
                let fallback = CommandSpec::new("netstat", ["-tulpn"]);
                match self.execute(&fallback).await {
                    Ok(result) => Ok(linux::parse_netstat(&result.stdout_lines)),
                    Err(netstat_err) => Err(Error::SystemCommand(format!(
                        "ss and netstat both unavailable ({ss_err}; {netstat_err})"
                    ))),
                }
            }
        }
    }

    /// Fills empty process names and command lines, one lookup per PID.
    async fn resolve_process_details(&self, records: &mut [PortRecord]) {
        let mut cache: HashMap<String, Option<(String, String)>> = HashMap::new();

        for record in records.iter_mut() {
            if record.pid.is_empty()
                || (!record.process_name.is_empty() && !record.command_line.is_empty())
            {
                continue;
            }
            if !cache.contains_key(&record.pid) {
                let details = self.lookup_process(&record.pid).await;
                cache.insert(record.pid.clone(), details);
            }
            if let Some(Some((name, command_line))) = cache.get(&record.pid) {
                if record.process_name.is_empty() {
                    record.process_name = name.clone();
                }
                if record.command_line.is_empty() {
                    record.command_line = command_line.clone();
                }
            }
        }
    }

    async fn lookup_process(&self, pid: &str) -> Option<(String, String)> {
        let pid: u32 = pid.parse().ok()?;
        let spec = match self.platform {
            Platform::Windows => process_pid_command(Platform::Windows, pid),
            Platform::Linux | Platform::MacOS => CommandSpec::new(
                "ps",
                ["-p".to_string(), pid.to_string(), "-o".into(), "command=".into()],
            ),
        };

        let result = self
            .runner
            .run(&spec, self.config.command_timeout())
            .await;
        if !result.success() {
            debug!(pid, exit_code = result.exit_code, "process lookup found nothing");
            return None;
        }

        match self.platform {
            Platform::Windows => {
                let name = windows::tasklist_image_name(&result.stdout_lines)?;
                Some((name.clone(), name))
            }
            platform => {
                let command_line = linux::ps_command_line(&result.stdout_lines)?;
                Some((parser::name_from_command(platform, &command_line), command_line))
            }
        }
    }

    /// Runs `spec`, turning "could not run at all" into `SystemCommand`.
    ///
    /// Other non-zero exits are returned as-is: lsof, `ps -p` and `ps -C`
    /// exit with 1 when nothing matched.
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandResult> {
        let result = self.runner.run(spec, self.config.command_timeout()).await;

        if result.failed_to_start() {
            return Err(Error::SystemCommand(format!(
                "{} could not be started: {}",
                spec.program,
                result.stderr.trim()
            )));
        }
        if result.is_timeout() {
            return Err(Error::SystemCommand(format!(
                "{} timed out after {}ms",
                spec.program, self.config.command_timeout_ms
            )));
        }
        if !result.success() {
            debug!(
                command = %result.command,
                exit_code = result.exit_code,
                stderr = result.stderr.trim(),
                "command exited non-zero, parsing its output anyway"
            );
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::testing::SpyRunner;
    use crate::runner::{EXIT_SPAWN_FAILED, EXIT_TIMED_OUT};

    const NETSTAT: &str = "\
  Proto  Local Address          Foreign Address        State           PID
  TCP    0.0.0.0:8080           0.0.0.0:0              LISTENING       1234
  TCP    127.0.0.1:8080         127.0.0.1:52000        ESTABLISHED     1234
  TCP    127.0.0.1:52000        127.0.0.1:8080         ESTABLISHED     5678
  TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       948
";

    const PS_AUX: &str = "\
USER         PID %CPU %MEM    VSZ   RSS TTY      STAT START   TIME COMMAND
root           1  0.0  0.1 167744 11520 ?        Ss   Oct17   0:05 /sbin/init
www-data    1000  0.0  0.3  55000  9000 ?        S    10:00   0:00 /usr/sbin/nginx -g daemon off;
alice       4242  1.0  2.0 900000 80000 pts/0    Sl+  10:01   1:00 /usr/bin/python3 app.py
";

    fn config_without_lookups() -> Config {
        Config {
            resolve_process_names: false,
            ..Config::default()
        }
    }

    fn engine(runner: SpyRunner, platform: Platform) -> QueryEngine<SpyRunner> {
        QueryEngine::with_runner(runner, platform, config_without_lookups())
    }

    #[tokio::test]
    async fn test_invalid_port_runs_no_command() {
        for platform in [Platform::Windows, Platform::Linux, Platform::MacOS] {
            let engine = engine(SpyRunner::new(), platform);
            for bad in ["abc", "0", "65536", "80; rm -rf /", "-1"] {
                let err = engine.query_ports(Some(bad)).await.unwrap_err();
                assert!(matches!(err, Error::Validation(_)), "{bad:?}");
            }
            assert_eq!(engine.runner().call_count(), 0);
        }
    }

    #[tokio::test]
    async fn test_windows_port_filter_matches_local_port_only() {
        let engine = engine(SpyRunner::with_default(0, NETSTAT, ""), Platform::Windows);
        let records = engine.query_ports(Some("8080")).await.unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.port == "8080"));
        assert!(records.iter().all(|r| r.pid == "1234"));
        assert_eq!(
            engine.runner().calls(),
            vec![CommandSpec::new("netstat", ["-ano"])]
        );
    }

    #[tokio::test]
    async fn test_all_ports_when_port_is_absent_or_empty() {
        let engine = engine(SpyRunner::with_default(0, NETSTAT, ""), Platform::Windows);
        assert_eq!(engine.query_ports(None).await.unwrap().len(), 4);
        assert_eq!(engine.query_ports(Some("")).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let engine = engine(SpyRunner::with_default(1, "", ""), Platform::MacOS);
        let records = engine.query_ports(Some("9999")).await.unwrap();
        assert!(records.is_empty());
        assert_eq!(
            engine.runner().calls(),
            vec![CommandSpec::new("lsof", ["-i", ":9999", "-n", "-P"])]
        );
    }

    #[tokio::test]
    async fn test_macos_lsof_port_query() {
        let output = "\
COMMAND   PID  USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
nginx    1234  user    6u  IPv4 0x3d8015e195af1f3f      0t0  TCP *:8080 (LISTEN)
curl     4444  user    5u  IPv4 0x3d8015e195af1f40      0t0  TCP 127.0.0.1:60000->127.0.0.1:8080 (ESTABLISHED)
";
        let engine = engine(SpyRunner::with_default(0, output, ""), Platform::MacOS);
        let records = engine.query_ports(Some("8080")).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pid, "1234");
        assert_eq!(records[0].state, "LISTEN");
    }

    #[tokio::test]
    async fn test_missing_binary_is_system_command_error() {
        let runner = SpyRunner::with_default(EXIT_SPAWN_FAILED, "", "No such file or directory");
        let engine = engine(runner, Platform::Windows);
        let err = engine.query_ports(None).await.unwrap_err();
        assert!(matches!(err, Error::SystemCommand(_)));
        assert!(err.to_string().contains("netstat could not be started"));
        assert!(err.to_string().contains("system tools"));
    }

    #[tokio::test]
    async fn test_timeout_is_system_command_error() {
        let engine = engine(SpyRunner::with_default(EXIT_TIMED_OUT, "", ""), Platform::MacOS);
        let err = engine.query_processes(None).await.unwrap_err();
        assert!(matches!(err, Error::SystemCommand(_)));
        assert!(err.to_string().contains("timed out"));
        assert!(!err.to_string().contains("system tools"));
    }

    #[tokio::test]
    async fn test_linux_falls_back_to_netstat() {
        let netstat = "\
Proto Recv-Q Send-Q Local Address           Foreign Address         State       PID/Program name
tcp        0      0 0.0.0.0:22              0.0.0.0:*               LISTEN      812/sshd
";
        let runner = SpyRunner::new()
            .reply(EXIT_SPAWN_FAILED, "", "No such file or directory")
            .reply(0, netstat, "");
        let engine = engine(runner, Platform::Linux);
        let records = engine.query_ports(Some("22")).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pid, "812");
        let programs: Vec<String> = engine
            .runner()
            .calls()
            .into_iter()
            .map(|c| c.program)
            .collect();
        assert_eq!(programs, vec!["ss", "netstat"]);
    }

    #[tokio::test]
    async fn test_linux_both_port_tools_missing() {
        let runner = SpyRunner::with_default(EXIT_SPAWN_FAILED, "", "not found");
        let engine = engine(runner, Platform::Linux);
        let err = engine.query_ports(None).await.unwrap_err();
        assert!(matches!(err, Error::SystemCommand(_)));
        assert!(err.to_string().contains("ss and netstat"));
    }

    #[tokio::test]
    async fn test_port_records_get_process_names_once_per_pid() {
        let runner = SpyRunner::new()
            .reply(0, NETSTAT, "")
            .reply(0, r#""nginx.exe","1234","Console","1","12,345 K""#, "")
            .reply(0, r#""curl.exe","5678","Console","1","2,000 K""#, "")
            .reply(0, r#""svchost.exe","948","Services","0","10,220 K""#, "");
        let engine = QueryEngine::with_runner(runner, Platform::Windows, Config::default());
        let records = engine.query_ports(None).await.unwrap();

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].process_name, "nginx.exe");
        assert_eq!(records[1].process_name, "nginx.exe");
        assert_eq!(records[2].process_name, "curl.exe");
        assert_eq!(records[3].process_name, "svchost.exe");
        // netstat plus one tasklist per distinct PID
        assert_eq!(engine.runner().call_count(), 4);
        assert_eq!(
            engine.runner().calls()[1],
            CommandSpec::new("tasklist", ["/FO", "CSV", "/NH", "/FI", "PID eq 1234"])
        );
    }

    #[tokio::test]
    async fn test_failed_lookup_leaves_fields_empty() {
        let ss = "\
Netid State  Recv-Q Send-Q Local Address:Port Peer Address:Port Process
tcp   LISTEN 0      128    0.0.0.0:22         0.0.0.0:*         users:((\"sshd\",pid=812,fd=3))
";
        let runner = SpyRunner::new().reply(0, ss, "").reply(1, "", "");
        let engine = QueryEngine::with_runner(runner, Platform::Linux, Config::default());
        let records = engine.query_ports(None).await.unwrap();

        assert_eq!(records[0].process_name, "sshd");
        assert_eq!(records[0].command_line, "");
        assert_eq!(
            engine.runner().calls()[1],
            CommandSpec::new("ps", ["-p", "812", "-o", "command="])
        );
    }

    #[tokio::test]
    async fn test_invalid_keyword_runs_no_command() {
        let engine = engine(SpyRunner::new(), Platform::Linux);
        for bad in ["-e", "nginx|sh", "x\"y", "a*"] {
            let err = engine.query_processes(Some(bad)).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{bad:?}");
        }
        assert_eq!(engine.runner().call_count(), 0);
    }

    #[tokio::test]
    async fn test_all_processes() {
        let engine = engine(SpyRunner::with_default(0, PS_AUX, ""), Platform::Linux);
        let records = engine.query_processes(Some("  ")).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(engine.runner().calls(), vec![CommandSpec::new("ps", ["aux"])]);
    }

    #[tokio::test]
    async fn test_numeric_keyword_is_pid_filter() {
        let output = "\
USER         PID %CPU %MEM    VSZ   RSS TTY      STAT START   TIME COMMAND
alice       4242  1.0  2.0 900000 80000 pts/0    Sl+  10:01   1:00 /usr/bin/python3 app.py
";
        let engine = engine(SpyRunner::with_default(0, output, ""), Platform::MacOS);
        let records = engine.query_processes(Some("4242")).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pid, "4242");
        assert_eq!(
            engine.runner().calls(),
            vec![CommandSpec::new("ps", ["u", "-p", "4242"])]
        );
    }

    #[tokio::test]
    async fn test_windows_name_query_exact_hit_skips_fallback() {
        let runner = SpyRunner::new().reply(0, r#""nginx.exe","1234","Console","1","12,345 K""#, "");
        let engine = engine(runner, Platform::Windows);
        let records = engine.query_processes(Some("nginx")).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "nginx.exe");
        assert_eq!(
            engine.runner().calls(),
            vec![CommandSpec::new(
                "tasklist",
                ["/FO", "CSV", "/NH", "/FI", "IMAGENAME eq nginx*"]
            )]
        );
    }

    #[tokio::test]
    async fn test_windows_name_query_falls_back_to_substring() {
        let full = "\
\"System Idle Process\",\"0\",\"Services\",\"0\",\"8 K\"
\"MyNginxWrapper.exe\",\"2222\",\"Console\",\"1\",\"3,000 K\"
\"explorer.exe\",\"3333\",\"Console\",\"1\",\"90,000 K\"
";
        let runner = SpyRunner::new()
            .reply(0, "INFO: No tasks are running which match the specified criteria.", "")
            .reply(0, full, "");
        let engine = engine(runner, Platform::Windows);
        let records = engine.query_processes(Some("NGINX")).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pid, "2222");
        let calls = engine.runner().calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], CommandSpec::new("tasklist", ["/FO", "CSV", "/NH"]));
    }

    #[tokio::test]
    async fn test_linux_name_query_exact_then_fallback() {
        let runner = SpyRunner::new()
            .reply(1, "USER PID %CPU %MEM VSZ RSS TTY STAT START TIME COMMAND\n", "")
            .reply(0, PS_AUX, "");
        let engine = engine(runner, Platform::Linux);
        let records = engine.query_processes(Some("python")).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "python3");
        let calls = engine.runner().calls();
        assert_eq!(calls[0], CommandSpec::new("ps", ["u", "-C", "python"]));
        assert_eq!(calls[1], CommandSpec::new("ps", ["aux"]));
    }

    #[tokio::test]
    async fn test_macos_name_query_goes_straight_to_listing() {
        let engine = engine(SpyRunner::with_default(0, PS_AUX, ""), Platform::MacOS);
        let records = engine.query_processes(Some("nginx")).await.unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].pid, "1000");
        assert_eq!(engine.runner().calls(), vec![CommandSpec::new("ps", ["aux"])]);
    }

    #[test]
    fn test_filter_by_name_is_case_insensitive() {
        let processes = vec![
            ProcessRecord {
                pid: "1".into(),
                name: "Nginx".into(),
                ..Default::default()
            },
            ProcessRecord {
                pid: "2".into(),
                name: "node".into(),
                ..Default::default()
            },
        ];
        let matched = filter_by_name(processes, "NGI");
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].pid, "1");
    }

    const TASKLIST_VERBOSE: &str = "\
\"System\",\"4\",\"Services\",\"0\",\"144 K\",\"Unknown\",\"NT AUTHORITY\\SYSTEM\",\"0:10:00\",\"N/A\"
\"code.exe\",\"4321\",\"Console\",\"1\",\"250,000 K\",\"Running\",\"DESKTOP\\alice\",\"0:01:02\",\"Visual Studio Code\"
\"notepad.exe\",\"5555\",\"Console\",\"1\",\"8,000 K\",\"Running\",\"DESKTOP\\bob\",\"0:00:01\",\"notes.txt\"
";

    fn pids(records: &[ProcessRecord]) -> Vec<&str> {
        records.iter().map(|r| r.pid.as_str()).collect()
    }

    #[tokio::test]
    async fn test_unix_filters_by_user_cpu_and_memory() {
        for platform in [Platform::Linux, Platform::MacOS] {
            let engine = engine(SpyRunner::with_default(0, PS_AUX, ""), platform);

            let by_user = engine.query_processes_by_user("www-data").await.unwrap();
            assert_eq!(pids(&by_user), vec!["1000"]);

            let busy = engine.query_high_cpu_processes(1.0).await.unwrap();
            assert_eq!(pids(&busy), vec!["4242"]);
            assert!(engine.query_high_cpu_processes(1.1).await.unwrap().is_empty());

            let large = engine.query_high_memory_processes("0.3%").await.unwrap();
            assert_eq!(pids(&large), vec!["1000", "4242"]);
            // ps reports a share, so a size threshold matches nothing
            assert!(engine.query_high_memory_processes("1MB").await.unwrap().is_empty());

            assert!(engine
                .runner()
                .calls()
                .iter()
                .all(|c| *c == CommandSpec::new("ps", ["aux"])));
        }
    }

    #[tokio::test]
    async fn test_windows_memory_threshold_uses_sizes() {
        let listing = "\
\"System Idle Process\",\"0\",\"Services\",\"0\",\"8 K\"
\"nginx.exe\",\"1234\",\"Console\",\"1\",\"12,345 K\"
\"explorer.exe\",\"3333\",\"Console\",\"1\",\"90,000 K\"
";
        let engine = engine(SpyRunner::with_default(0, listing, ""), Platform::Windows);
        let records = engine.query_high_memory_processes("12MB").await.unwrap();

        assert_eq!(pids(&records), vec!["1234", "3333"]);
        assert_eq!(
            engine.runner().calls(),
            vec![CommandSpec::new("tasklist", ["/FO", "CSV", "/NH"])]
        );
    }

    #[tokio::test]
    async fn test_windows_user_filter_reads_verbose_listing() {
        let engine = engine(SpyRunner::with_default(0, TASKLIST_VERBOSE, ""), Platform::Windows);

        let records = engine.query_processes_by_user("alice").await.unwrap();
        assert_eq!(pids(&records), vec!["4321"]);
        let records = engine.query_processes_by_user("NT AUTHORITY\\SYSTEM").await.unwrap();
        assert_eq!(pids(&records), vec!["4"]);

        assert_eq!(
            engine.runner().calls()[0],
            CommandSpec::new("tasklist", ["/V", "/FO", "CSV", "/NH"])
        );
    }

    #[tokio::test]
    async fn test_windows_cpu_time_never_passes_cpu_threshold() {
        let engine = engine(SpyRunner::with_default(0, TASKLIST_VERBOSE, ""), Platform::Windows);
        assert!(engine.query_high_cpu_processes(0.0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_keyword_and_criteria_combine() {
        let runner = SpyRunner::new().reply(
            0,
            "\"code.exe\",\"4321\",\"Console\",\"1\",\"250,000 K\",\"Running\",\"DESKTOP\\alice\",\"0:01:02\",\"VS Code\"",
            "",
        );
        let engine = engine(runner, Platform::Windows);
        let criteria = ProcessCriteria::from_args(Some("alice"), None, Some("100MB")).unwrap();
        let records = engine
            .query_processes_matching(Some("code"), &criteria)
            .await
            .unwrap();

        assert_eq!(pids(&records), vec!["4321"]);
        assert_eq!(
            engine.runner().calls(),
            vec![CommandSpec::new(
                "tasklist",
                ["/V", "/FO", "CSV", "/NH", "/FI", "IMAGENAME eq code*"]
            )]
        );
    }

    #[tokio::test]
    async fn test_invalid_criteria_runs_no_command() {
        let engine = engine(SpyRunner::new(), Platform::Linux);
        assert!(matches!(
            engine.query_high_cpu_processes(-5.0).await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            engine.query_high_memory_processes("big").await,
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            engine.query_processes_by_user("  ").await,
            Err(Error::Validation(_))
        ));
        assert_eq!(engine.runner().call_count(), 0);
    }

    #[test]
    fn test_empty_criteria_match_everything() {
        let criteria = ProcessCriteria::default();
        assert!(criteria.is_empty());
        assert!(criteria.matches(&ProcessRecord::default()));
    }
}
