use colored::Colorize;
use serde_json::json;

use super::{print_json, start_spinner, stop_spinner, timestamp, StringExt};
use crate::{
    cli::OutputFormat,
    config::Config,
    query::{ProcessCriteria, QueryEngine},
    records::ProcessRecord,
    terminate::SystemProcessGuard,
    Result,
};

pub struct QueryProcessesCommand;

impl QueryProcessesCommand {
    pub async fn execute(
        config: Config,
        name: Option<&str>,
        criteria: &ProcessCriteria,
        format: OutputFormat,
    ) -> Result<()> {
        let engine = QueryEngine::new(config);

        let spinner = start_spinner(format, "Querying processes...");
        let result = engine.query_processes_matching(name, criteria).await;
        stop_spinner(spinner);
        let records = result?;

        match format {
            OutputFormat::Json => print_json(&json!({
                "platform": engine.platform(),
                "queried_at": timestamp(),
                "keyword": name.map(str::trim).filter(|n| !n.is_empty()),
                "filters": criteria,
                "total": records.len(),
                "records": records,
            })),
            OutputFormat::Table => {
                Self::print_table(&records);
                Ok(())
            }
        }
    }

    pub(crate) fn print_table(records: &[ProcessRecord]) {
        if records.is_empty() {
            println!("{} No matching processes found", "○".blue());
            return;
        }

        println!("{}", "Processes:".bold().green());
        println!();
        println!(
            "{:<10} {:<24} {:<14} {:<8} {:<10} {:<8} {}",
            "PID".cyan().bold(),
            "NAME".cyan().bold(),
            "USER".cyan().bold(),
            "CPU".cyan().bold(),
            "MEMORY".cyan().bold(),
            "STATUS".cyan().bold(),
            "COMMAND".cyan().bold()
        );
        println!("{}", "-".repeat(130));

        for record in records {
            let name = record.name.truncate_with_ellipsis(22);
            let name = if SystemProcessGuard::is_protected_name(&record.name) {
                format!("{name} *").red()
            } else {
                name.yellow()
            };
            println!(
                "{:<10} {:<24} {:<14} {:<8} {:<10} {:<8} {}",
                record.pid.blue(),
                name,
                record.user.truncate_with_ellipsis(14),
                record.cpu_usage,
                record.memory_usage,
                record.status,
                record.command_line.truncate_with_ellipsis(50).dimmed()
            );
        }

        println!();
        println!(
            "{} {} processes",
            "Total:".cyan(),
            records.len().to_string().bold()
        );
        if records
            .iter()
            .any(|r| SystemProcessGuard::is_protected_name(&r.name))
        {
            println!("{} protected system process", "*".red());
        }
    }
}
