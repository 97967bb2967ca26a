use colored::Colorize;
use procsweep::{
    cli::{Cli, Commands, LogFormat},
    commands::{DoctorCommand, KillCommand, QueryPortsCommand, QueryProcessesCommand},
    config::Config,
    query::ProcessCriteria,
    Result,
};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse_args();
    init_logging(cli.verbose, cli.log_format);

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red(), e);
        std::process::exit(1);
    }
}

/// Logs go to stderr; stdout carries only command output.
fn init_logging(verbose: bool, format: LogFormat) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load(cli.config.as_deref()).await?;
    if let Some(timeout_ms) = cli.timeout_ms {
        config.command_timeout_ms = timeout_ms;
    }

    match cli.command {
        Commands::QueryPorts { port } => {
            QueryPortsCommand::execute(config, port.as_deref(), cli.format).await?;
        }
        Commands::QueryProcesses {
            name,
            user,
            min_cpu,
            min_memory,
        } => {
            let criteria =
                ProcessCriteria::from_args(user.as_deref(), min_cpu, min_memory.as_deref())?;
            QueryProcessesCommand::execute(config, name.as_deref(), &criteria, cli.format)
                .await?;
        }
        Commands::Kill { pids, confirm } => {
            KillCommand::execute(config, &pids, confirm, cli.format).await?;
        }
        Commands::Doctor => {
            DoctorCommand::execute(config, cli.format)?;
        }
    }

    Ok(())
}
