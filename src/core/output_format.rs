//! Output formats for log entries
//!
//! - Text: human-readable columns, optionally coloured
//! - Json: one JSON object per entry
//! - JsonArray: fixed-position array, no per-field keys

use super::log_entry::LogEntry;
use super::log_level::LevelRegistry;
use super::message::RenderTarget;
use super::show::{LevelDisplay, ShowOptions};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Output format for log entries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Example: `[10:30:45.123] info  app.db connected (+12ms)`
    #[default]
    Text,

    /// Example: `{"level":"info","pkg":"app.db","message":"connected","elapsed":12}`
    Json,

    /// Positions: timestamp, level, pkg, sessionId, requestId, message, elapsed, data
    ///
    /// Example: `[null,"info","app.db",null,null,"connected",12,null]`
    JsonArray,
}

/// What a formatter needs besides the entry itself
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    pub levels: &'a LevelRegistry,
    pub show: &'a ShowOptions,
    /// Width of the padded level column
    pub level_width: usize,
}

impl OutputFormat {
    pub fn format(&self, entry: &LogEntry, ctx: &FormatContext<'_>) -> String {
        match self {
            OutputFormat::Text => format_text(entry, ctx),
            OutputFormat::Json => format_json(entry, ctx),
            OutputFormat::JsonArray => format_json_array(entry, ctx),
        }
    }
}

fn format_text(entry: &LogEntry, ctx: &FormatContext<'_>) -> String {
    let show = ctx.show;
    let color = show.color;
    let mut parts: Vec<String> = Vec::with_capacity(8);

    if let Some(ref format) = show.timestamp {
        let ts = format!("[{}]", format.format(&entry.timestamp));
        parts.push(if color { ts.dimmed().to_string() } else { ts });
    }

    if let Some(level) = level_column(entry, ctx) {
        parts.push(if color {
            ctx.levels.apply_color(&level, &entry.level)
        } else {
            level
        });
    }

    if show.pkg {
        if let Some(ref pkg) = entry.pkg_chain {
            parts.push(if color { pkg.magenta().to_string() } else { pkg.clone() });
        }
    }

    for (enabled, id) in [
        (show.session_id, &entry.session_id),
        (show.request_id, &entry.request_id),
    ] {
        if let (true, Some(id)) = (enabled, id) {
            let id = format!("[{}]", id);
            parts.push(if color { id.dimmed().to_string() } else { id });
        }
    }

    let mut message = entry.indent.clone().unwrap_or_default();
    message.push_str(&entry.message.render(RenderTarget::Text, color));
    parts.push(message);

    if show.elapsed {
        if let Some(ms) = entry.elapsed_ms {
            let elapsed = format!("(+{}ms)", ms);
            parts.push(if color { elapsed.dimmed().to_string() } else { elapsed });
        }
    }

    if show.data {
        if let Some(ref data) = entry.data {
            let data = data.to_string();
            parts.push(if color { data.dimmed().to_string() } else { data });
        }
    }

    parts.join(" ")
}

fn level_column(entry: &LogEntry, ctx: &FormatContext<'_>) -> Option<String> {
    match ctx.show.level {
        LevelDisplay::Hidden => None,
        LevelDisplay::Padded => Some(format!("{:<width$}", entry.level, width = ctx.level_width)),
        LevelDisplay::Width(n) if n < 0 => Some(format!(
            "{:>width$}",
            entry.level,
            width = n.unsigned_abs() as usize
        )),
        LevelDisplay::Width(n) => Some(format!("{:<width$}", entry.level, width = n as usize)),
        LevelDisplay::Icon => Some(
            ctx.levels
                .get(entry.level.as_str())
                .ok()
                .and_then(|def| def.icon.clone())
                .unwrap_or_else(|| entry.level.clone()),
        ),
    }
}

fn json_message(entry: &LogEntry) -> Value {
    let mut message = entry.indent.clone().unwrap_or_default();
    message.push_str(&entry.message.render(RenderTarget::Json, false));
    Value::String(message)
}

fn format_json(entry: &LogEntry, ctx: &FormatContext<'_>) -> String {
    let show = ctx.show;
    let mut obj = Map::new();

    if let Some(ref format) = show.timestamp {
        obj.insert("timestamp".to_string(), format.to_json(&entry.timestamp));
    }
    if show.level != LevelDisplay::Hidden {
        obj.insert("level".to_string(), Value::String(entry.level.clone()));
    }
    if show.pkg {
        if let Some(ref pkg) = entry.pkg_chain {
            obj.insert("pkg".to_string(), Value::String(pkg.clone()));
        }
    }
    if show.session_id {
        if let Some(ref id) = entry.session_id {
            obj.insert("sessionId".to_string(), Value::String(id.clone()));
        }
    }
    if show.request_id {
        if let Some(ref id) = entry.request_id {
            obj.insert("requestId".to_string(), Value::String(id.clone()));
        }
    }
    obj.insert("message".to_string(), json_message(entry));
    if show.elapsed {
        if let Some(ms) = entry.elapsed_ms {
            obj.insert("elapsed".to_string(), Value::from(ms));
        }
    }
    if show.data {
        if let Some(ref data) = entry.data {
            obj.insert("data".to_string(), data.clone());
        }
    }

    Value::Object(obj).to_string()
}

fn format_json_array(entry: &LogEntry, ctx: &FormatContext<'_>) -> String {
    let show = ctx.show;
    let opt_str = |enabled: bool, value: &Option<String>| match (enabled, value) {
        (true, Some(v)) => Value::String(v.clone()),
        _ => Value::Null,
    };

    let row = vec![
        show.timestamp
            .as_ref()
            .map(|format| format.to_json(&entry.timestamp))
            .unwrap_or(Value::Null),
        if show.level != LevelDisplay::Hidden {
            Value::String(entry.level.clone())
        } else {
            Value::Null
        },
        opt_str(show.pkg, &entry.pkg_chain),
        opt_str(show.session_id, &entry.session_id),
        opt_str(show.request_id, &entry.request_id),
        json_message(entry),
        match (show.elapsed, entry.elapsed_ms) {
            (true, Some(ms)) => Value::from(ms),
            _ => Value::Null,
        },
        match (show.data, &entry.data) {
            (true, Some(data)) => data.clone(),
            _ => Value::Null,
        },
    ];

    Value::Array(row).to_string()
}
