use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "procsweep",
    about = "Query listening ports and running processes, and terminate them",
    version,
    author,
    subcommand_help_heading = "Commands",
    help_template = "{before-help}{name} {version}\n{author-with-newline}{about-with-newline}\n{usage-heading} {usage}\n\n{all-args}{after-help}"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(
        short,
        long,
        global = true,
        value_enum,
        default_value_t = OutputFormat::Json,
        help = "Output format"
    )]
    pub format: OutputFormat,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging on stderr")]
    pub verbose: bool,

    #[arg(
        long,
        global = true,
        value_enum,
        default_value_t = LogFormat::Text,
        help = "Log line format"
    )]
    pub log_format: LogFormat,

    #[arg(short, long, global = true, help = "Path to a JSON configuration file")]
    pub config: Option<PathBuf>,

    #[arg(long, global = true, help = "Timeout for each system command in milliseconds")]
    pub timeout_ms: Option<u64>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    #[command(about = "List sockets, optionally only those on one local port")]
    QueryPorts {
        #[arg(short, long, help = "Port number to look up (1-65535)")]
        port: Option<String>,
    },

    #[command(about = "List processes, optionally filtered by name, PID, owner or usage")]
    QueryProcesses {
        #[arg(short, long, help = "Process name fragment or exact PID")]
        name: Option<String>,

        #[arg(short, long, help = "Only processes owned by this user")]
        user: Option<String>,

        #[arg(long, value_name = "PERCENT", help = "Only processes using at least this much CPU")]
        min_cpu: Option<f64>,

        #[arg(long, value_name = "AMOUNT", help = "Only processes using at least this much memory (5% or 100MB)")]
        min_memory: Option<String>,
    },

    #[command(about = "Forcefully terminate processes by PID")]
    Kill {
        #[arg(
            short,
            long = "pid",
            required = true,
            help = "PID to terminate (repeatable)"
        )]
        pids: Vec<String>,

        #[arg(long, help = "Ask for confirmation before terminating")]
        confirm: bool,
    },

    #[command(about = "Check that the system tools this platform needs are installed")]
    Doctor,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
