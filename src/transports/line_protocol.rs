//! Line protocol encoding for time-series databases
//!
//! `measurement,tag=v field=v <unix-ns>`, one entry per line.

use super::batch::LineEncoder;
use crate::core::{flatten_data, EffectiveSettings, LogEntry, LoggerError, Result};
use serde_json::Value;

/// Backslash-escape `special`; line breaks become a literal `\n` or `\r`
fn escape_with(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c if special.contains(&c) => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

fn escape_measurement(s: &str) -> String {
    escape_with(s, &[',', ' '])
}

/// Tag keys, tag values and field keys
fn escape_key(s: &str) -> String {
    escape_with(s, &[',', ' ', '='])
}

fn escape_string_field(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

fn field_value(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) if n.is_i64() => Some(format!("{}i", n)),
        // Beyond i64::MAX only the unsigned type can hold it
        Value::Number(n) if n.is_u64() => Some(format!("{}u", n)),
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(escape_string_field(s)),
        Value::Null => None,
        other => Some(escape_string_field(&other.to_string())),
    }
}

/// Encodes entries as line protocol
///
/// # Example
///
/// ```
/// use rust_log_pipeline::core::{LogEntry, TransportCore, TransportOptions};
/// use rust_log_pipeline::transports::{LineEncoder, LineProtocolEncoder};
/// use chrono::TimeZone;
///
/// let encoder = LineProtocolEncoder::new("cli logs");
/// let settings = TransportCore::new("t", TransportOptions::default()).settings();
/// let entry = LogEntry::new("info", 2, "done")
///     .with_pkg_chain("app")
///     .with_timestamp(chrono::Utc.timestamp_opt(1, 0).unwrap());
///
/// assert_eq!(
///     encoder.encode(&entry, &settings).unwrap(),
///     r#"cli\ logs,level=info,pkg=app message="done",rank=2i 1000000000"#
/// );
/// ```
#[derive(Debug, Clone)]
pub struct LineProtocolEncoder {
    measurement: String,
}

impl LineProtocolEncoder {
    pub fn new(measurement: impl Into<String>) -> Self {
        Self {
            measurement: measurement.into(),
        }
    }

    pub fn measurement(&self) -> &str {
        &self.measurement
    }
}

impl LineEncoder for LineProtocolEncoder {
    fn encode(&self, entry: &LogEntry, _settings: &EffectiveSettings) -> Result<String> {
        let mut line = escape_measurement(&self.measurement);

        for (key, value) in [
            ("level", Some(entry.level.as_str())),
            ("pkg", entry.pkg_chain.as_deref()),
            ("session_id", entry.session_id.as_deref()),
            ("request_id", entry.request_id.as_deref()),
        ] {
            if let Some(value) = value.filter(|v| !v.is_empty()) {
                line.push(',');
                line.push_str(key);
                line.push('=');
                line.push_str(&escape_key(value));
            }
        }

        let mut fields = vec![
            format!("message={}", escape_string_field(&entry.plain_message())),
            format!("rank={}i", entry.rank),
        ];
        if let Some(ms) = entry.elapsed_ms {
            fields.push(format!("elapsed_ms={}i", ms));
        }
        if let Some(ref data) = entry.data {
            for (key, value) in flatten_data(data, "data") {
                if let Some(value) = field_value(&value) {
                    fields.push(format!("{}={}", escape_key(&key), value));
                }
            }
        }

        let nanos = entry.timestamp.timestamp_nanos_opt().ok_or_else(|| {
            LoggerError::other(format!("timestamp {} out of range for line protocol", entry.timestamp))
        })?;

        line.push(' ');
        line.push_str(&fields.join(","));
        line.push(' ');
        line.push_str(&nanos.to_string());
        Ok(line)
    }
}
