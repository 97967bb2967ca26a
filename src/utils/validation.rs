use crate::records::MemoryUsage;
use crate::{Error, Result};

const MAX_KEYWORD_LEN: usize = 255;
const FORBIDDEN_KEYWORD_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

/// A validated process query: exact PID or a name fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessFilter {
    Pid(u32),
    Name(String),
}

/// Validates an optional port. Empty input means "all ports".
pub fn validate_port(input: &str) -> Result<Option<u16>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    validate_required_port(input).map(Some)
}

/// Validates a port where one must be given.
pub fn validate_required_port(input: &str) -> Result<u16> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Validation("port number is required".to_string()));
    }
    if !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Validation(format!(
            "port must be numeric: {input}"
        )));
    }
    match input.parse::<u32>() {
        Ok(port @ 1..=65535) => Ok(port as u16),
        _ => Err(Error::Validation(format!(
            "port must be between 1 and 65535: {input}"
        ))),
    }
}

/// Validates a PID string: ASCII digits only, fitting in 32 bits.
///
/// `0` is well-formed here; refusing it is the system-process guard's job.
pub fn validate_pid(input: &str) -> Result<u32> {
    let input = input.trim();
    if input.is_empty() || !input.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::Validation(format!(
            "PID must contain only digits: '{input}'"
        )));
    }
    input
        .parse::<u32>()
        .map_err(|_| Error::Validation(format!("PID is out of range: {input}")))
}

/// Validates every PID, failing on the first malformed one.
pub fn validate_pids<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<u32>> {
    inputs.iter().map(|p| validate_pid(p.as_ref())).collect()
}

/// Validates a process keyword. Empty means "all processes"; all digits
/// means an exact PID; anything else is a name fragment.
pub fn validate_keyword(input: &str) -> Result<Option<ProcessFilter>> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    if input.bytes().all(|b| b.is_ascii_digit()) {
        return validate_pid(input).map(|pid| Some(ProcessFilter::Pid(pid)));
    }

    if input.len() > MAX_KEYWORD_LEN {
        return Err(Error::Validation(format!(
            "process name is longer than {MAX_KEYWORD_LEN} bytes"
        )));
    }
    // `-x` and `/FI` would be read as options by ps and tasklist.
    if input.starts_with('-') || (input.starts_with('/') && !input[1..].contains('/')) {
        return Err(Error::Validation(format!(
            "process name must not start with '{}': {input}",
            &input[..1]
        )));
    }
    if let Some(c) = input
        .chars()
        .find(|c| FORBIDDEN_KEYWORD_CHARS.contains(c) || c.is_control())
    {
        return Err(Error::Validation(format!(
            "process name contains invalid character {c:?}: {input}"
        )));
    }

    Ok(Some(ProcessFilter::Name(input.to_string())))
}

/// Validates a user name to match against process owners.
pub fn validate_user(input: &str) -> Result<String> {
    let input = input.trim();
    if input.is_empty() {
        return Err(Error::Validation("user name must not be empty".to_string()));
    }
    if input.len() > MAX_KEYWORD_LEN || input.chars().any(char::is_control) {
        return Err(Error::Validation(format!("invalid user name: {input:?}")));
    }
    Ok(input.to_string())
}

/// Validates a CPU percentage threshold. Values above 100 are allowed
/// since `ps` reports per-core shares.
pub fn validate_cpu_threshold(value: f64) -> Result<f64> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::Validation(format!(
            "CPU threshold must be a non-negative percentage: {value}"
        )));
    }
    Ok(value)
}

/// Validates a memory threshold such as `5%` or `100MB`.
pub fn validate_memory_threshold(input: &str) -> Result<MemoryUsage> {
    MemoryUsage::parse(input).ok_or_else(|| {
        Error::Validation(format!(
            "memory threshold must be a percentage or a size like 100MB: {}",
            input.trim()
        ))
    })
}
