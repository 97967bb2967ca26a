use colored::Colorize;
use dialoguer::Confirm;
use serde_json::json;

use super::{print_json, timestamp};
use crate::{
    cli::OutputFormat, config::Config, records::BatchKillResult, terminate::TerminationEngine,
    utils::validate_pids, Result,
};

pub struct KillCommand;

impl KillCommand {
    /// Malformed PIDs are rejected before anything runs. Kill failures
    /// are reported in the output, not as an error exit.
    pub async fn execute(
        config: Config,
        pids: &[String],
        confirm: bool,
        format: OutputFormat,
    ) -> Result<()> {
        validate_pids(pids)?;
        let engine = TerminationEngine::new(config);

        if confirm {
            let prompt = format!(
                "Kill {} process(es) (PID: {})?",
                pids.len().to_string().yellow(),
                pids.join(", ").cyan()
            );
            let confirmed = Confirm::new()
                .with_prompt(prompt)
                .default(false)
                .interact()?;

            if !confirmed {
                eprintln!("{} Operation cancelled", "×".yellow());
                return Ok(());
            }
        }

        let result = engine.kill_many(pids).await;

        match format {
            OutputFormat::Json => print_json(&json!({
                "platform": engine.platform(),
                "queried_at": timestamp(),
                "result": result,
            })),
            OutputFormat::Table => {
                Self::print_result(&result);
                Ok(())
            }
        }
    }

    pub(crate) fn print_result(result: &BatchKillResult) {
        for outcome in &result.outcomes {
            if outcome.success {
                println!(
                    "{} Killed process (PID: {})",
                    "✓".green(),
                    outcome.pid.cyan()
                );
            } else {
                println!(
                    "{} PID {}: {}",
                    "×".red(),
                    outcome.pid.cyan(),
                    outcome.message
                );
            }
        }

        println!();
        let summary = if result.failed_count == 0 && result.success_count > 0 {
            result.message.green()
        } else if result.success_count == 0 {
            result.message.red()
        } else {
            result.message.yellow()
        };
        println!("{summary}");
    }
}
