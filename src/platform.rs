use serde::{Deserialize, Serialize};
use std::fmt;

/// Operating-system family that decides which command templates and
/// output parsers are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Windows,
    Linux,
    #[serde(rename = "macos")]
    MacOS,
}

impl Platform {
    /// Classifies the host this binary was built for.
    pub fn detect() -> Self {
        Self::from_os_name(std::env::consts::OS)
    }

    /// Classifies an OS name such as `std::env::consts::OS` reports it.
    ///
    /// Unrecognized names fall back to [`Platform::Linux`]: the BSDs and
    /// other Unix systems ship `ps`/`kill` with Linux-compatible flags.
    pub fn from_os_name(os: &str) -> Self {
        match os.trim().to_lowercase().as_str() {
            "windows" | "win32" | "win64" => Platform::Windows,
            "macos" | "darwin" | "osx" => Platform::MacOS,
            _ => Platform::Linux,
        }
    }

    pub fn is_windows(self) -> bool {
        self == Platform::Windows
    }

    /// System utilities this platform's queries and kills rely on.
    pub fn required_commands(self) -> &'static [&'static str] {
        match self {
            Platform::Windows => &["netstat", "tasklist", "taskkill"],
            Platform::MacOS => &["lsof", "ps", "kill"],
            Platform::Linux => &["ss", "ps", "kill"],
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Platform::Windows => "windows",
            Platform::Linux => "linux",
            Platform::MacOS => "macos",
        };
        write!(f, "{name}")
    }
}
