use colored::Colorize;
use serde_json::json;

use super::{print_json, start_spinner, stop_spinner, timestamp, StringExt};
use crate::{cli::OutputFormat, config::Config, query::QueryEngine, records::PortRecord, Result};

pub struct QueryPortsCommand;

impl QueryPortsCommand {
    pub async fn execute(config: Config, port: Option<&str>, format: OutputFormat) -> Result<()> {
        let engine = QueryEngine::new(config);

        let spinner = start_spinner(format, "Querying ports...");
        let result = engine.query_ports(port).await;
        stop_spinner(spinner);
        let records = result?;

        match format {
            OutputFormat::Json => print_json(&json!({
                "platform": engine.platform(),
                "queried_at": timestamp(),
                "port": port.map(str::trim).filter(|p| !p.is_empty()),
                "total": records.len(),
                "records": records,
            })),
            OutputFormat::Table => {
                Self::print_table(&records);
                Ok(())
            }
        }
    }

    pub(crate) fn print_table(records: &[PortRecord]) {
        if records.is_empty() {
            println!("{} No ports in use found", "○".blue());
            return;
        }

        println!("{}", "Ports in use:".bold().green());
        println!();
        println!(
            "{:<8} {:<6} {:<10} {:<20} {:<24} {:<24} {:<12} {}",
            "PORT".cyan().bold(),
            "PROTO".cyan().bold(),
            "PID".cyan().bold(),
            "PROCESS".cyan().bold(),
            "LOCAL".cyan().bold(),
            "REMOTE".cyan().bold(),
            "STATE".cyan().bold(),
            "COMMAND".cyan().bold()
        );
        println!("{}", "-".repeat(130));

        for record in records {
            println!(
                "{:<8} {:<6} {:<10} {:<20} {:<24} {:<24} {:<12} {}",
                record.port.white(),
                record.protocol.green(),
                record.pid.blue(),
                record.process_name.truncate_with_ellipsis(18).yellow(),
                record.local_address.truncate_with_ellipsis(24),
                record.remote_address.truncate_with_ellipsis(24).dimmed(),
                record.state,
                record.command_line.truncate_with_ellipsis(40).dimmed()
            );
        }

        println!();
        println!(
            "{} {} sockets",
            "Total:".cyan(),
            records.len().to_string().bold()
        );
    }
}
