//! Display options shared by every transport
//!
//! Unknown or malformed option values deserialize to their defaults rather
//! than failing, so a bad config never stops logging.

use super::timestamp::TimestampFormat;
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How the level column is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Value", into = "Value")]
pub enum LevelDisplay {
    Hidden,
    /// Name padded to the widest level at the current threshold
    #[default]
    Padded,
    /// Explicit pad width; negative pads on the left
    Width(i32),
    /// Level glyph
    Icon,
}

impl From<Value> for LevelDisplay {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(true) => LevelDisplay::Padded,
            Value::Bool(false) => LevelDisplay::Hidden,
            Value::Number(n) => n
                .as_i64()
                .and_then(|n| i32::try_from(n).ok())
                .map(LevelDisplay::Width)
                .unwrap_or_default(),
            Value::String(s) if s.eq_ignore_ascii_case("icon") => LevelDisplay::Icon,
            _ => LevelDisplay::default(),
        }
    }
}

impl From<LevelDisplay> for Value {
    fn from(display: LevelDisplay) -> Self {
        match display {
            LevelDisplay::Hidden => Value::Bool(false),
            LevelDisplay::Padded => Value::Bool(true),
            LevelDisplay::Width(n) => Value::from(n),
            LevelDisplay::Icon => Value::String("icon".to_string()),
        }
    }
}

/// Which columns are displayed, and whether colour is used
///
/// # Example
///
/// ```
/// use rust_log_pipeline::{LevelDisplay, ShowOptions};
///
/// let show: ShowOptions =
///     serde_json::from_str(r#"{"level": "icon", "timestamp": "bogus", "session_id": true}"#).unwrap();
/// assert_eq!(show.level, LevelDisplay::Icon);
/// assert_eq!(show.timestamp, None);
/// assert!(show.session_id);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShowOptions {
    #[serde(default, deserialize_with = "lenient")]
    pub level: LevelDisplay,
    /// `None` hides the timestamp column
    #[serde(default, deserialize_with = "lenient")]
    pub timestamp: Option<TimestampFormat>,
    #[serde(default = "enabled", deserialize_with = "lenient_true")]
    pub pkg: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub session_id: bool,
    #[serde(default, deserialize_with = "lenient")]
    pub request_id: bool,
    #[serde(default = "enabled", deserialize_with = "lenient_true")]
    pub elapsed: bool,
    #[serde(default = "enabled", deserialize_with = "lenient_true")]
    pub data: bool,
    #[serde(default = "enabled", deserialize_with = "lenient_true")]
    pub color: bool,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self {
            level: LevelDisplay::Padded,
            timestamp: None,
            pkg: true,
            session_id: false,
            request_id: false,
            elapsed: true,
            data: true,
            color: true,
        }
    }
}

impl ShowOptions {
    /// Every column on, colour off
    pub fn all() -> Self {
        Self {
            level: LevelDisplay::Padded,
            timestamp: Some(TimestampFormat::Iso8601),
            pkg: true,
            session_id: true,
            request_id: true,
            elapsed: true,
            data: true,
            color: false,
        }
    }

    #[must_use]
    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Option<TimestampFormat>) -> Self {
        self.timestamp = timestamp;
        self
    }

    #[must_use]
    pub fn with_level(mut self, level: LevelDisplay) -> Self {
        self.level = level;
        self
    }
}

fn enabled() -> bool {
    true
}

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

fn lenient_true<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value.as_bool().unwrap_or(true))
}
