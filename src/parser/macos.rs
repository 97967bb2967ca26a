//! Parsers for `lsof -i -n -P` and `ps aux` output on macOS.

use super::linux::parse_ps_with;
use super::{executable_name, is_pid, normalize_protocol, port_of};
use crate::records::{PortRecord, ProcessRecord};

/// COMMAND PID USER FD TYPE plus at least the protocol and NAME columns.
const LSOF_MIN_FIELDS: usize = 8;
const APP_BUNDLE_MARKER: &str = ".app/Contents/MacOS/";

/// Parses `lsof -i -n -P` / `lsof -i :PORT -n -P`.
///
/// ```text
/// COMMAND   PID  USER   FD   TYPE             DEVICE SIZE/OFF NODE NAME
/// nginx    1234  user    6u  IPv4 0x3d8015e195af1f3f      0t0  TCP *:8080 (LISTEN)
/// Google   5678  user   23u  IPv4 0x3d8015e195af2a2a      0t0  TCP 10.0.0.2:50000->142.250.1.1:443 (ESTABLISHED)
/// ```
///
/// DEVICE and SIZE/OFF are sometimes blank, so the protocol column is
/// located by value instead of by position.
pub fn parse_lsof<S: AsRef<str>>(lines: &[S]) -> Vec<PortRecord> {
    let mut records = Vec::new();

    for line in lines {
        let fields: Vec<&str> = line.as_ref().split_whitespace().collect();
        if fields.len() < LSOF_MIN_FIELDS || fields[0] == "COMMAND" {
            continue;
        }
        if !is_pid(fields[1]) {
            continue;
        }

        let Some(proto_idx) = fields
            .iter()
            .skip(4)
            .position(|f| *f == "TCP" || *f == "UDP")
            .map(|i| i + 4)
        else {
            continue;
        };
        let Some(&name) = fields.get(proto_idx + 1) else {
            continue;
        };

        let (local, remote) = name.split_once("->").unwrap_or((name, ""));
        let Some(port) = port_of(local) else {
            continue;
        };
        let state = fields
            .get(proto_idx + 2)
            .map(|s| s.trim_start_matches('(').trim_end_matches(')'))
            .unwrap_or("");

        records.push(PortRecord {
            port,
            pid: fields[1].to_string(),
            protocol: normalize_protocol(fields[proto_idx]),
            local_address: local.to_string(),
            remote_address: remote.to_string(),
            state: state.to_string(),
            process_name: unescape_lsof(fields[0]),
            command_line: String::new(),
        });
    }

    records
}

/// lsof escapes spaces and slashes in COMMAND as `\x20` and `\x2f`.
fn unescape_lsof(command: &str) -> String {
    command.replace("\\x20", " ").replace("\\x2f", "/")
}

/// Parses `ps aux` / `ps u -p N` on macOS.
///
/// Application bundles run from paths with spaces
/// (`/Applications/Google Chrome.app/Contents/MacOS/Google Chrome`), so
/// the name is taken from the bundle's executable when present.
pub fn parse_ps<S: AsRef<str>>(lines: &[S]) -> Vec<ProcessRecord> {
    parse_ps_with(lines, name_from_command)
}

pub(crate) fn name_from_command(command: &str) -> String {
    if let Some(idx) = command.find(APP_BUNDLE_MARKER) {
        let rest = &command[idx + APP_BUNDLE_MARKER.len()..];
        let end = rest.find(" -").unwrap_or(rest.len());
        let exe = rest[..end].trim();
        if !exe.is_empty() && !exe.contains('/') {
            return exe.to_string();
        }
    }
    executable_name(command)
}
