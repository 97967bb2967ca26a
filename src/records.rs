use serde::{Deserialize, Serialize};
use std::fmt;

/// One socket as reported by the platform's port listing.
///
/// Several records may share a PID when a process owns multiple
/// sockets; they are kept as separate rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    pub port: String,
    pub pid: String,
    pub protocol: String,
    pub local_address: String,
    pub remote_address: String,
    pub state: String,
    pub process_name: String,
    pub command_line: String,
}

/// One process as reported by `tasklist` or `ps`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessRecord {
    pub pid: String,
    pub name: String,
    pub user: String,
    pub cpu_usage: String,
    pub memory_usage: String,
    pub command_line: String,
    pub status: String,
}

impl ProcessRecord {
    /// CPU share as a percentage. `None` when the platform reports no
    /// percentage, as with tasklist's CPU time column.
    pub fn cpu_percent(&self) -> Option<f64> {
        let value: f64 = self.cpu_usage.trim().trim_end_matches('%').trim().parse().ok()?;
        (value.is_finite() && value >= 0.0).then_some(value)
    }

    pub fn memory(&self) -> Option<MemoryUsage> {
        MemoryUsage::parse(&self.memory_usage)
    }
}

/// Memory figure in the unit the platform reports: `ps` gives a share of
/// physical memory, tasklist gives a working-set size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MemoryUsage {
    Percent(f64),
    Kilobytes(f64),
}

impl MemoryUsage {
    /// Parses `2.0%`, `12,345 K`, `512KB`, `100MB` or `1.5 GB`. A bare
    /// number has no unit and is rejected.
    pub fn parse(raw: &str) -> Option<Self> {
        let compact: String = raw.chars().filter(|c| !c.is_whitespace() && *c != ',').collect();
        if let Some(number) = compact.strip_suffix('%') {
            return non_negative(number).map(Self::Percent);
        }

        let split = compact
            .find(|c: char| !c.is_ascii_digit() && c != '.')
            .filter(|&i| i > 0)?;
        let (number, unit) = compact.split_at(split);
        let scale = match unit.to_ascii_uppercase().as_str() {
            "K" | "KB" => 1.0,
            "M" | "MB" => 1024.0,
            "G" | "GB" => 1024.0 * 1024.0,
            _ => return None,
        };
        non_negative(number).map(|n| Self::Kilobytes(n * scale))
    }

    /// True when `self` is at least `threshold`. Figures in different
    /// units never compare.
    pub fn at_least(self, threshold: MemoryUsage) -> bool {
        match (self, threshold) {
            (Self::Percent(value), Self::Percent(min)) => value >= min,
            (Self::Kilobytes(value), Self::Kilobytes(min)) => value >= min,
            _ => false,
        }
    }
}

impl fmt::Display for MemoryUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Percent(value) => write!(f, "{value}%"),
            Self::Kilobytes(value) => write!(f, "{value} K"),
        }
    }
}

impl Serialize for MemoryUsage {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn non_negative(number: &str) -> Option<f64> {
    let value: f64 = number.parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Result of a single termination attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KillOutcome {
    pub pid: String,
    pub success: bool,
    pub message: String,
}

impl KillOutcome {
    pub fn succeeded(pid: &str, message: impl Into<String>) -> Self {
        Self {
            pid: pid.to_string(),
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(pid: &str, message: impl Into<String>) -> Self {
        Self {
            pid: pid.to_string(),
            success: false,
            message: message.into(),
        }
    }
}

/// Aggregate of a batch kill. `outcomes` follows the order of the
/// requested PIDs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchKillResult {
    pub outcomes: Vec<KillOutcome>,
    pub total_count: usize,
    pub success_count: usize,
    pub failed_count: usize,
    pub overall_success: bool,
    pub message: String,
}

impl BatchKillResult {
    pub fn from_outcomes(outcomes: Vec<KillOutcome>) -> Self {
        let success_count = outcomes.iter().filter(|o| o.success).count();
        let failed_count = outcomes.len() - success_count;
        Self {
            total_count: outcomes.len(),
            success_count,
            failed_count,
            overall_success: success_count > 0,
            message: summary_message(success_count, failed_count),
            outcomes,
        }
    }
}

fn summary_message(success: usize, failed: usize) -> String {
    match (success, failed) {
        (0, 0) => "No processes were processed".to_string(),
        (0, f) => format!("Failed to kill {f} process(es)"),
        (s, 0) => format!("Successfully killed {s} process(es)"),
        (s, f) => format!("Killed {s} process(es), failed to kill {f} process(es)"),
    }
}
