use colored::Colorize;
use serde::Serialize;
use serde_json::json;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use super::{print_json, timestamp};
use crate::{cli::OutputFormat, config::Config, query::QueryEngine, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolStatus {
    pub name: String,
    pub available: bool,
    pub path: Option<PathBuf>,
}

pub struct DoctorCommand;

impl DoctorCommand {
    pub fn execute(config: Config, format: OutputFormat) -> Result<()> {
        let engine = QueryEngine::new(config);
        let search_path = std::env::var_os("PATH").unwrap_or_default();
        let tools = Self::check(engine.required_commands(), &search_path);

        match format {
            OutputFormat::Json => print_json(&json!({
                "platform": engine.platform(),
                "queried_at": timestamp(),
                "all_available": tools.iter().all(|t| t.available),
                "tools": tools,
            })),
            OutputFormat::Table => {
                println!(
                    "{} {}",
                    "Platform:".cyan(),
                    engine.platform().to_string().bold()
                );
                for tool in &tools {
                    match &tool.path {
                        Some(path) => println!(
                            "{} {:<10} {}",
                            "✓".green(),
                            tool.name,
                            path.display().to_string().dimmed()
                        ),
                        None => println!("{} {:<10} {}", "×".red(), tool.name, "not found".red()),
                    }
                }
                Ok(())
            }
        }
    }

    pub fn check(commands: &[&str], search_path: &OsStr) -> Vec<ToolStatus> {
        commands
            .iter()
            .map(|name| {
                let path = find_in_path(name, search_path);
                ToolStatus {
                    name: name.to_string(),
                    available: path.is_some(),
                    path,
                }
            })
            .collect()
    }
}

fn find_in_path(program: &str, search_path: &OsStr) -> Option<PathBuf> {
    std::env::split_paths(search_path)
        .flat_map(|dir| candidates(&dir, program))
        .find(|candidate| candidate.is_file())
}

fn candidates(dir: &Path, program: &str) -> Vec<PathBuf> {
    if cfg!(windows) {
        vec![dir.join(format!("{program}.exe")), dir.join(program)]
    } else {
        vec![dir.join(program)]
    }
}
