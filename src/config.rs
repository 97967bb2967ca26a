//! Engine settings.
//!
//! Stored as JSON, by default at `~/.procsweep/config.json`. Every key is
//! optional; missing keys take their defaults.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::debug;

use crate::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Upper bound for each spawned system command, in milliseconds.
    pub command_timeout_ms: u64,

    /// Maximum number of kill commands in flight during a batch kill.
    pub kill_concurrency: usize,

    /// PIDs refused by the kill path in addition to the platform defaults.
    pub protected_pids: Vec<u32>,

    /// Look up process names and command lines for port records that lack them.
    pub resolve_process_names: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            command_timeout_ms: 10_000,
            kill_concurrency: 4,
            protected_pids: Vec::new(),
            resolve_process_names: true,
        }
    }
}

impl Config {
    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms.max(1))
    }

    pub fn kill_concurrency(&self) -> usize {
        self.kill_concurrency.max(1)
    }

    /// `~/.procsweep/config.json`, if a home directory is known.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".procsweep").join("config.json"))
    }

    /// Loads `path` if given (it must exist), otherwise the default path
    /// if that file exists, otherwise the built-in defaults.
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path).await,
            None => match Self::default_path() {
                Some(path) if fs::try_exists(&path).await.unwrap_or(false) => {
                    Self::load_from(&path).await
                }
                _ => {
                    debug!("no configuration file, using defaults");
                    Ok(Self::default())
                }
            },
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        Self::read(path)
            .await
            .map_err(|e| Error::Config(format!("{e:#}")))
    }

    async fn read(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        debug!(path = %path.display(), ?config, "configuration loaded");
        Ok(config)
    }
}
