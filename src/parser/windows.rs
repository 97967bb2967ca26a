//! Parsers for `netstat -ano` and `tasklist /FO CSV` output.

use super::{is_pid, normalize_protocol, port_of};
use crate::records::{PortRecord, ProcessRecord};

/// TCP rows: proto, local, foreign, state, pid. UDP rows omit the state.
const NETSTAT_MIN_FIELDS: usize = 4;
/// Image Name, PID, Session Name, Session#, Mem Usage.
const TASKLIST_MIN_FIELDS: usize = 5;
/// `tasklist /V` adds Status, User Name, CPU Time and Window Title.
const TASKLIST_VERBOSE_FIELDS: usize = 9;

/// Parses `netstat -ano`.
///
/// ```text
///   Proto  Local Address          Foreign Address        State           PID
///   TCP    0.0.0.0:135            0.0.0.0:0              LISTENING       948
///   UDP    0.0.0.0:5353           *:*                                    2044
/// ```
pub fn parse_netstat<S: AsRef<str>>(lines: &[S]) -> Vec<PortRecord> {
    let mut records = Vec::new();

    for line in lines {
        let fields: Vec<&str> = line.as_ref().split_whitespace().collect();
        if fields.len() < NETSTAT_MIN_FIELDS {
            continue;
        }

        // Skips "Active Connections", the "Proto" header and anything else
        // that is not a socket row.
        let proto = fields[0].to_uppercase();
        if proto != "TCP" && proto != "UDP" {
            continue;
        }

        let (state, pid) = match (proto.as_str(), fields.len()) {
            ("TCP", n) if n >= 5 => (fields[3], fields[4]),
            ("TCP", _) => continue,
            ("UDP", 4) => ("", fields[3]),
            (_, _) => (fields[3], fields[4]),
        };

        if !is_pid(pid) {
            continue;
        }
        let Some(port) = port_of(fields[1]) else {
            continue;
        };

        records.push(PortRecord {
            port,
            pid: pid.to_string(),
            protocol: normalize_protocol(&proto),
            local_address: fields[1].to_string(),
            remote_address: fields[2].to_string(),
            state: state.to_string(),
            process_name: String::new(),
            command_line: String::new(),
        });
    }

    records
}

/// Parses `tasklist /FO CSV` with or without `/NH` and `/V`.
///
/// Fields are CSV-quoted and may contain commas (`"12,345 K"`), so each
/// line goes through a real CSV reader rather than a comma split.
pub fn parse_tasklist<S: AsRef<str>>(lines: &[S]) -> Vec<ProcessRecord> {
    let mut records = Vec::new();

    for line in lines {
        let line = line.as_ref().trim();
        if line.is_empty() || line.starts_with("INFO:") {
            continue;
        }

        let Some(fields) = csv_fields(line) else {
            continue;
        };
        if fields.len() < TASKLIST_MIN_FIELDS || fields[0] == "Image Name" {
            continue;
        }

        let pid = fields[1].trim();
        if !is_pid(pid) {
            continue;
        }

        let name = fields[0].trim().to_string();
        let (status, user, cpu_usage) = if fields.len() >= TASKLIST_VERBOSE_FIELDS {
            (fields[5].clone(), fields[6].clone(), fields[7].clone())
        } else {
            ("Running".to_string(), String::new(), String::new())
        };

        records.push(ProcessRecord {
            pid: pid.to_string(),
            command_line: name.clone(),
            name,
            user,
            cpu_usage,
            memory_usage: fields[4].trim().to_string(),
            status,
        });
    }

    records
}

/// Image name from the first row of `tasklist /FI "PID eq N" /FO CSV /NH`.
pub fn tasklist_image_name<S: AsRef<str>>(lines: &[S]) -> Option<String> {
    parse_tasklist(lines).into_iter().next().map(|p| p.name)
}

fn csv_fields(line: &str) -> Option<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let record = reader.records().next()?.ok()?;
    Some(record.iter().map(str::to_string).collect())
}
