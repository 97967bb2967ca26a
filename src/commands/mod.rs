//! CLI subcommands. Each prints JSON (default) or a colored table to
//! stdout; progress and logs go to stderr.

pub mod doctor;
pub mod kill;
pub mod query_ports;
pub mod query_processes;

pub use doctor::DoctorCommand;
pub use kill::KillCommand;
pub use query_ports::QueryPortsCommand;
pub use query_processes::QueryProcessesCommand;

use chrono::{SecondsFormat, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

use crate::cli::OutputFormat;
use crate::Result;

/// RFC 3339 timestamp for JSON envelopes.
pub(crate) fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn print_json(value: &serde_json::Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Stderr spinner, shown only for table output.
pub(crate) fn start_spinner(format: OutputFormat, message: &'static str) -> Option<ProgressBar> {
    if format != OutputFormat::Table {
        return None;
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        spinner.set_style(style);
    }
    spinner.set_message(message);
    spinner.enable_steady_tick(Duration::from_millis(80));
    Some(spinner)
}

pub(crate) fn stop_spinner(spinner: Option<ProgressBar>) {
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }
}

pub(crate) trait StringExt {
    fn truncate_with_ellipsis(&self, max_len: usize) -> String;
}

impl StringExt for str {
    fn truncate_with_ellipsis(&self, max_len: usize) -> String {
        if self.chars().count() <= max_len {
            self.to_string()
        } else {
            let kept: String = self.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}
