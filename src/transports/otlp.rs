//! OTLP/JSON log records
//!
//! Each line is one `logRecord`; `frame` wraps a batch in
//! `resourceLogs[].scopeLogs[].logRecords`.

use super::batch::LineEncoder;
use crate::core::{flatten_data, EffectiveSettings, LogEntry, Result};
use serde_json::{json, Map, Value};

pub const SCOPE_NAME: &str = "rust_log_pipeline";

/// OpenTelemetry severity number for a level name
pub fn severity_number(level: &str) -> u8 {
    match level.to_ascii_lowercase().as_str() {
        "trace" => 1,
        "debug" => 5,
        "verbose" => 7,
        "info" => 9,
        "warn" | "warning" => 13,
        "error" => 17,
        "fatal" => 21,
        _ => 9,
    }
}

fn any_value(value: &Value) -> Value {
    match value {
        Value::Bool(b) => json!({ "boolValue": b }),
        // int64 travels as a string in OTLP/JSON
        Value::Number(n) if n.is_i64() || n.is_u64() => json!({ "intValue": n.to_string() }),
        Value::Number(n) => json!({ "doubleValue": n.as_f64() }),
        Value::String(s) => json!({ "stringValue": s }),
        other => json!({ "stringValue": other.to_string() }),
    }
}

fn attribute(key: &str, value: &Value) -> Value {
    json!({ "key": key, "value": any_value(value) })
}

/// Encodes entries as OTLP log records
#[derive(Debug, Clone)]
pub struct OtlpEncoder {
    service_name: String,
}

impl OtlpEncoder {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn record(&self, entry: &LogEntry) -> Value {
        let nanos = entry
            .timestamp
            .timestamp_nanos_opt()
            .unwrap_or_default()
            .to_string();

        let mut attributes = Vec::new();
        if let Some(ref id) = entry.request_id {
            attributes.push(attribute("request.id", &Value::String(id.clone())));
        }
        if let Some(ref id) = entry.session_id {
            attributes.push(attribute("session.id", &Value::String(id.clone())));
        }
        if let Some(ref pkg) = entry.pkg_chain {
            attributes.push(attribute("namespace", &Value::String(pkg.clone())));
        }
        if let Some(ms) = entry.elapsed_ms {
            attributes.push(attribute("elapsed_ms", &Value::from(ms)));
        }
        if let Some(ref data) = entry.data {
            for (key, value) in flatten_data(data, "data") {
                if !value.is_null() {
                    attributes.push(attribute(&key, &value));
                }
            }
        }

        let mut record = Map::new();
        record.insert("timeUnixNano".into(), Value::String(nanos.clone()));
        record.insert("observedTimeUnixNano".into(), Value::String(nanos));
        record.insert("severityText".into(), Value::String(entry.level.to_uppercase()));
        record.insert("severityNumber".into(), Value::from(severity_number(&entry.level)));
        record.insert("body".into(), json!({ "stringValue": entry.plain_message() }));
        record.insert("attributes".into(), Value::Array(attributes));
        Value::Object(record)
    }
}

impl LineEncoder for OtlpEncoder {
    fn encode(&self, entry: &LogEntry, _settings: &EffectiveSettings) -> Result<String> {
        Ok(serde_json::to_string(&self.record(entry))?)
    }

    fn frame(&self, lines: &[String]) -> Result<String> {
        let records = lines
            .iter()
            .map(|line| serde_json::from_str::<Value>(line))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let payload = json!({
            "resourceLogs": [{
                "resource": {
                    "attributes": [attribute("service.name", &Value::String(self.service_name.clone()))]
                },
                "scopeLogs": [{
                    "scope": { "name": SCOPE_NAME },
                    "logRecords": records,
                }]
            }]
        });
        Ok(serde_json::to_string(&payload)?)
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TransportCore, TransportOptions};
    use chrono::TimeZone;

    fn encoded(entry: &LogEntry) -> String {
        let settings = TransportCore::new("t", TransportOptions::default()).settings();
        OtlpEncoder::new("cli").encode(entry, &settings).unwrap()
    }

    #[test]
    fn test_severity_numbers() {
        assert_eq!(severity_number("trace"), 1);
        assert_eq!(severity_number("debug"), 5);
        assert_eq!(severity_number("verbose"), 7);
        assert_eq!(severity_number("INFO"), 9);
        assert_eq!(severity_number("warn"), 13);
        assert_eq!(severity_number("error"), 17);
        assert_eq!(severity_number("fatal"), 21);
        assert_eq!(severity_number("notice"), 9);
    }

    #[test]
    fn test_record_fields() {
        let entry = LogEntry::new("warn", 1, "retrying")
            .with_timestamp(chrono::Utc.timestamp_opt(2, 0).unwrap())
            .with_request_id("req-9")
            .with_pkg_chain("net")
            .with_data(serde_json::json!({"attempt": 2, "host": "a.example", "ok": false}));

        let record: Value = serde_json::from_str(&encoded(&entry)).unwrap();
        assert_eq!(record["timeUnixNano"], "2000000000");
        assert_eq!(record["severityText"], "WARN");
        assert_eq!(record["severityNumber"], 13);
        assert_eq!(record["body"]["stringValue"], "retrying");

        let attrs = record["attributes"].as_array().unwrap();
        let find = |key: &str| attrs.iter().find(|a| a["key"] == key).map(|a| a["value"].clone());
        assert_eq!(find("request.id").unwrap()["stringValue"], "req-9");
        assert_eq!(find("namespace").unwrap()["stringValue"], "net");
        assert_eq!(find("data.attempt").unwrap()["intValue"], "2");
        assert_eq!(find("data.ok").unwrap()["boolValue"], false);
        assert!(find("session.id").is_none());
    }

    #[test]
    fn test_frame_wraps_records() {
        let encoder = OtlpEncoder::new("my-cli");
        let lines = vec![
            encoded(&LogEntry::new("info", 2, "a")),
            encoded(&LogEntry::new("error", 0, "b")),
        ];
        let payload: Value = serde_json::from_str(&encoder.frame(&lines).unwrap()).unwrap();

        let resource = &payload["resourceLogs"][0];
        assert_eq!(resource["resource"]["attributes"][0]["key"], "service.name");
        assert_eq!(resource["resource"]["attributes"][0]["value"]["stringValue"], "my-cli");
        let records = resource["scopeLogs"][0]["logRecords"].as_array().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["body"]["stringValue"], "b");
        assert_eq!(encoder.content_type(), "application/json");
    }
}
