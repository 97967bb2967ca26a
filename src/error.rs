use std::fmt;

/// Phrases in a `SystemCommand` message that mean a tool is not installed
/// or not runnable, as opposed to a tool that ran but hung.
const MISSING_TOOL_MARKERS: [&str; 2] = ["could not be started", "both unavailable"];

/// Error types for the procsweep engine.
///
/// Every public operation either returns a well-formed value or one of
/// these variants. Individual kill failures are not errors; they are
/// reported as [`crate::records::KillOutcome`] data.
#[derive(Debug, Clone)]
pub enum Error {
    /// Malformed port, PID or process keyword. Raised before any command runs.
    Validation(String),
    /// The required OS utility could not be invoked at all
    SystemCommand(String),
    /// Configuration file could not be read or decoded
    Config(String),
    /// I/O operation failed
    Io(String),
    /// Failed to encode or decode data
    Parse(String),
    /// Other generic error
    Other(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "Invalid input: {msg}"),
            Error::SystemCommand(msg) => {
                if MISSING_TOOL_MARKERS.iter().any(|m| msg.contains(m)) {
                    write!(
                        f,
                        "System command failed: {msg}. Make sure required system tools are installed"
                    )
                } else {
                    write!(f, "System command failed: {msg}")
                }
            }
            Error::Config(msg) => write!(f, "Configuration error: {msg}"),
            Error::Io(msg) => write!(f, "I/O error: {msg}"),
            Error::Parse(msg) => write!(f, "Parse error: {msg}"),
            Error::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Other(format!("{e:#}"))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Parse(e.to_string())
    }
}

impl From<dialoguer::Error> for Error {
    fn from(e: dialoguer::Error) -> Self {
        Error::Other(e.to_string())
    }
}

/// A specialized `Result` type for procsweep operations.
pub type Result<T> = std::result::Result<T, Error>;
