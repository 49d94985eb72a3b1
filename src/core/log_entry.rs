//! Log entry structure

use super::log_level::Rank;
use super::message::Message;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// One immutable record passed from a logger to the transports
#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: String,
    pub rank: Rank,
    pub timestamp: DateTime<Utc>,
    pub message: Message,
    pub data: Option<Value>,
    pub pkg_chain: Option<String>,
    pub session_id: Option<String>,
    pub request_id: Option<String>,
    pub elapsed_ms: Option<u64>,
    pub indent: Option<String>,
}

impl LogEntry {
    pub fn new(level: impl Into<String>, rank: Rank, message: impl Into<Message>) -> Self {
        Self {
            level: level.into(),
            rank,
            timestamp: Utc::now(),
            message: message.into(),
            data: None,
            pkg_chain: None,
            session_id: None,
            request_id: None,
            elapsed_ms: None,
            indent: None,
        }
    }

    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    #[must_use]
    pub fn with_pkg_chain(mut self, pkg_chain: impl Into<String>) -> Self {
        self.pkg_chain = Some(pkg_chain.into());
        self
    }

    #[must_use]
    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    #[must_use]
    pub fn with_elapsed_ms(mut self, elapsed_ms: u64) -> Self {
        self.elapsed_ms = Some(elapsed_ms);
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Message text without colour, prefixed by the indentation
    pub fn plain_message(&self) -> String {
        match &self.indent {
            Some(indent) => format!("{}{}", indent, self.message.plain()),
            None => self.message.plain(),
        }
    }
}

/// Escape line breaks so a message cannot spill into the next line
///
/// Batched sinks are newline-delimited; an unescaped newline would turn one
/// entry into two records.
pub fn sanitize_line(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Flatten structured data into dotted keys
///
/// Objects recurse with `parent.child`, arrays with `parent.0`. A non-object
/// top-level value is stored under `prefix`.
pub fn flatten_data(data: &Value, prefix: &str) -> Vec<(String, Value)> {
    let mut out = Vec::new();
    match data {
        Value::Object(map) if !map.is_empty() => {
            for (key, value) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", prefix, key)
                };
                flatten_into(value, path, &mut out);
            }
        }
        Value::Null => {}
        other => flatten_into(other, prefix.to_string(), &mut out),
    }
    out
}

fn flatten_into(value: &Value, path: String, out: &mut Vec<(String, Value)>) {
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (key, child) in map {
                flatten_into(child, format!("{}.{}", path, key), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, child) in items.iter().enumerate() {
                flatten_into(child, format!("{}.{}", path, i), out);
            }
        }
        other => out.push((path, other.clone())),
    }
}
