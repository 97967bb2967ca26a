//! Turns raw command output into [`PortRecord`] and [`ProcessRecord`] lists.
//!
//! Every parser is pure and total: lines that are headers, blank, too
//! short for the platform's column layout, or carry a non-numeric PID
//! are skipped. Duplicate PIDs are kept.

pub mod linux;
pub mod macos;
pub mod windows;

use crate::platform::Platform;
use crate::records::{PortRecord, ProcessRecord};

/// Parses port listing output produced by the platform's primary port command.
pub fn parse_ports<S: AsRef<str>>(platform: Platform, lines: &[S]) -> Vec<PortRecord> {
    match platform {
        Platform::Windows => windows::parse_netstat(lines),
        Platform::Linux => linux::parse_ss(lines),
        Platform::MacOS => macos::parse_lsof(lines),
    }
}

/// Parses process listing output produced by the platform's process command.
pub fn parse_processes<S: AsRef<str>>(platform: Platform, lines: &[S]) -> Vec<ProcessRecord> {
    match platform {
        Platform::Windows => windows::parse_tasklist(lines),
        Platform::Linux => linux::parse_ps(lines),
        Platform::MacOS => macos::parse_ps(lines),
    }
}

/// Display name for a process given its full command line.
pub fn name_from_command(platform: Platform, command: &str) -> String {
    match platform {
        Platform::Windows => executable_name(command),
        Platform::Linux => linux::name_from_command(command),
        Platform::MacOS => macos::name_from_command(command),
    }
}

/// True for a non-empty string of ASCII digits.
pub fn is_pid(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit())
}

/// Extracts the port from `addr:port`, `[v6]:port` or `:::port` forms.
///
/// Returns `None` for wildcards (`*:*`) and for anything outside 1..=65535.
pub(crate) fn port_of(address: &str) -> Option<String> {
    let (_, port) = address.rsplit_once(':')?;
    match port.parse::<u16>() {
        Ok(p) if p > 0 && is_pid(port) => Some(p.to_string()),
        _ => None,
    }
}

/// Splits on runs of whitespace into at most `max` columns; the last
/// column keeps the remainder of the line, inner spacing included.
pub(crate) fn split_columns(line: &str, max: usize) -> Vec<&str> {
    let mut columns = Vec::with_capacity(max);
    let mut rest = line.trim();
    while !rest.is_empty() {
        if columns.len() + 1 == max {
            columns.push(rest);
            break;
        }
        match rest.find(char::is_whitespace) {
            Some(end) => {
                columns.push(&rest[..end]);
                rest = rest[end..].trim_start();
            }
            None => {
                columns.push(rest);
                break;
            }
        }
    }
    columns
}

/// File name of the executable that starts `command`.
pub(crate) fn executable_name(command: &str) -> String {
    let first = command.split_whitespace().next().unwrap_or("");
    first
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(first)
        .to_string()
}

/// Upper-cased protocol family: `tcp6` -> `TCP`, `udp` -> `UDP`.
pub(crate) fn normalize_protocol(raw: &str) -> String {
    let lower = raw.to_lowercase();
    if lower.starts_with("tcp") {
        "TCP".to_string()
    } else if lower.starts_with("udp") {
        "UDP".to_string()
    } else {
        raw.to_uppercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_of_address_forms() {
        assert_eq!(port_of("0.0.0.0:8080").as_deref(), Some("8080"));
        assert_eq!(port_of("*:80").as_deref(), Some("80"));
        assert_eq!(port_of("[::1]:3000").as_deref(), Some("3000"));
        assert_eq!(port_of(":::22").as_deref(), Some("22"));
        assert_eq!(port_of("127.0.0.53%lo:53").as_deref(), Some("53"));
        assert_eq!(port_of("0.0.0.0:*"), None);
        assert_eq!(port_of("0.0.0.0:0"), None);
        assert_eq!(port_of("host:70000"), None);
        assert_eq!(port_of("noport"), None);
    }

    #[test]
    fn test_split_columns_keeps_remainder() {
        let cols = split_columns("root   1  0.0  /sbin/init  splash", 4);
        assert_eq!(cols, vec!["root", "1", "0.0", "/sbin/init  splash"]);

        let cols = split_columns("  a b  ", 5);
        assert_eq!(cols, vec!["a", "b"]);

        assert!(split_columns("   ", 3).is_empty());
    }

    #[test]
    fn test_executable_name() {
        assert_eq!(executable_name("/usr/sbin/nginx -g daemon off;"), "nginx");
        assert_eq!(executable_name("C:\\Windows\\System32\\svchost.exe -k"), "svchost.exe");
        assert_eq!(executable_name("python3"), "python3");
        assert_eq!(executable_name(""), "");
    }

    #[test]
    fn test_name_from_command_per_platform() {
        assert_eq!(name_from_command(Platform::Linux, "[kworker/0:1]"), "kworker/0:1");
        assert_eq!(
            name_from_command(
                Platform::MacOS,
                "/Applications/Visual Studio Code.app/Contents/MacOS/Electron --inspect"
            ),
            "Electron"
        );
        assert_eq!(name_from_command(Platform::Windows, "node.exe"), "node.exe");
    }

    #[test]
    fn test_is_pid() {
        assert!(is_pid("1234"));
        assert!(!is_pid(""));
        assert!(!is_pid("12a"));
        assert!(!is_pid("-1"));
    }

    #[test]
    fn test_dispatch_handles_empty_output_everywhere() {
        let empty: [&str; 0] = [];
        for platform in [Platform::Windows, Platform::Linux, Platform::MacOS] {
            assert!(parse_ports(platform, &empty).is_empty());
            assert!(parse_processes(platform, &empty).is_empty());
        }
    }
}
