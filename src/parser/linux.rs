//! Parsers for `ss -tulpn`, `netstat -tulpn` and `ps aux`/`ps u` output.

use super::{executable_name, is_pid, normalize_protocol, port_of, split_columns};
use crate::records::{PortRecord, ProcessRecord};

/// State, Recv-Q, Send-Q, local address, peer address.
const SS_MIN_FIELDS: usize = 5;
/// Proto, Recv-Q, Send-Q, local, foreign, PID/Program (UDP rows have no state).
const NETSTAT_MIN_FIELDS: usize = 6;
/// USER PID %CPU %MEM VSZ RSS TTY STAT START TIME COMMAND
pub(crate) const PS_COLUMNS: usize = 11;

const SS_NETIDS: [&str; 8] = ["tcp", "udp", "raw", "u_str", "u_dgr", "u_seq", "sctp", "mptcp"];

/// Parses `ss -tulpn` (with a Netid column) or `ss -tlpn` (without).
///
/// ```text
/// Netid State  Recv-Q Send-Q Local Address:Port Peer Address:Port Process
/// tcp   LISTEN 0      4096   0.0.0.0:22         0.0.0.0:*         users:(("sshd",pid=812,fd=3))
/// ```
///
/// A socket shared by several processes yields one record per process.
/// Without root, `ss` omits the process column and the PID stays empty.
pub fn parse_ss<S: AsRef<str>>(lines: &[S]) -> Vec<PortRecord> {
    let mut records = Vec::new();

    for line in lines {
        let fields: Vec<&str> = line.as_ref().split_whitespace().collect();
        let Some(first) = fields.first() else {
            continue;
        };
        if *first == "Netid" || *first == "State" {
            continue;
        }

        let has_netid = SS_NETIDS.contains(&first.to_lowercase().as_str());
        let offset = usize::from(has_netid);
        if fields.len() < SS_MIN_FIELDS + offset {
            continue;
        }

        let local = fields[offset + 3];
        let Some(port) = port_of(local) else {
            continue;
        };
        let protocol = if has_netid {
            normalize_protocol(first)
        } else {
            "TCP".to_string()
        };

        let base = PortRecord {
            port,
            pid: String::new(),
            protocol,
            local_address: local.to_string(),
            remote_address: fields[offset + 4].to_string(),
            state: fields[offset].to_string(),
            process_name: String::new(),
            command_line: String::new(),
        };

        let process_info = fields[offset + 5..].join(" ");
        let owners = ss_users(&process_info);
        if owners.is_empty() {
            records.push(base);
            continue;
        }
        for (name, pid) in owners {
            records.push(PortRecord {
                pid,
                process_name: name,
                ..base.clone()
            });
        }
    }

    records
}

/// Extracts `(name, pid)` pairs from `users:(("nginx",pid=10,fd=6),("nginx",pid=11,fd=6))`.
fn ss_users(process_info: &str) -> Vec<(String, String)> {
    let mut owners = Vec::new();
    let mut rest = process_info;

    while let Some(start) = rest.find("(\"") {
        let after = &rest[start + 2..];
        let Some(name_end) = after.find('"') else {
            break;
        };
        let name = &after[..name_end];
        let tail = &after[name_end..];
        let entry_end = tail.find(')').unwrap_or(tail.len());
        let entry = &tail[..entry_end];

        if let Some(pid_start) = entry.find("pid=") {
            let pid: String = entry[pid_start + 4..]
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            if is_pid(&pid) {
                owners.push((name.to_string(), pid));
            }
        }
        rest = &tail[entry_end..];
    }

    owners
}

/// Parses `netstat -tulpn`, used when `ss` is not installed.
///
/// ```text
/// Proto Recv-Q Send-Q Local Address   Foreign Address  State   PID/Program name
/// tcp        0      0 0.0.0.0:22      0.0.0.0:*        LISTEN  812/sshd
/// udp        0      0 0.0.0.0:68      0.0.0.0:*                700/dhclient
/// ```
pub fn parse_netstat<S: AsRef<str>>(lines: &[S]) -> Vec<PortRecord> {
    let mut records = Vec::new();

    for line in lines {
        let fields: Vec<&str> = line.as_ref().split_whitespace().collect();
        if fields.len() < NETSTAT_MIN_FIELDS {
            continue;
        }
        let proto = fields[0].to_lowercase();
        if !proto.starts_with("tcp") && !proto.starts_with("udp") {
            continue;
        }

        let Some(port) = port_of(fields[3]) else {
            continue;
        };

        let (state, program) = if fields.len() > NETSTAT_MIN_FIELDS {
            (fields[5], fields[6..].join(" "))
        } else {
            ("", fields[5].to_string())
        };

        // "-" when the socket belongs to another user
        let (pid, process_name) = match program.split_once('/') {
            Some((pid, name)) if is_pid(pid) => (pid.to_string(), name.to_string()),
            _ => (String::new(), String::new()),
        };

        records.push(PortRecord {
            port,
            pid,
            protocol: normalize_protocol(&proto),
            local_address: fields[3].to_string(),
            remote_address: fields[4].to_string(),
            state: state.to_string(),
            process_name,
            command_line: String::new(),
        });
    }

    records
}

/// Parses BSD-style `ps aux` / `ps u` output on Linux.
///
/// Kernel threads show up as `[kworker/0:1]`; their name is the text
/// inside the brackets rather than a path basename.
pub fn parse_ps<S: AsRef<str>>(lines: &[S]) -> Vec<ProcessRecord> {
    parse_ps_with(lines, name_from_command)
}

pub(crate) fn name_from_command(command: &str) -> String {
    let trimmed = command.trim();
    if trimmed.starts_with('[') && trimmed.ends_with(']') {
        trimmed[1..trimmed.len() - 1].to_string()
    } else {
        executable_name(trimmed)
    }
}

/// Shared column handling for the Linux and macOS `ps` parsers.
pub(crate) fn parse_ps_with<S, F>(lines: &[S], name_of: F) -> Vec<ProcessRecord>
where
    S: AsRef<str>,
    F: Fn(&str) -> String,
{
    let mut records = Vec::new();

    for line in lines {
        let columns = split_columns(line.as_ref(), PS_COLUMNS);
        if columns.len() < PS_COLUMNS || columns[0] == "USER" {
            continue;
        }
        if !is_pid(columns[1]) {
            continue;
        }

        let command_line = columns[10].to_string();
        records.push(ProcessRecord {
            pid: columns[1].to_string(),
            name: name_of(&command_line),
            user: columns[0].to_string(),
            cpu_usage: format!("{}%", columns[2]),
            memory_usage: format!("{}%", columns[3]),
            command_line,
            status: columns[7].to_string(),
        });
    }

    records
}

/// Output of `ps -p N -o command=`: the full command line, if any.
pub fn ps_command_line<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    lines
        .iter()
        .map(|l| l.as_ref().trim())
        .find(|l| !l.is_empty())
        .map(str::to_string)
}
