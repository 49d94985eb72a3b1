//! Level registry: named severity levels with numeric ranks

use super::error::{LoggerError, Result};
use colored::{Color, Colorize};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric rank of a level
pub type Rank = i32;

/// Direction in which ranks grow more severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityOrder {
    /// `error=0` is more severe than `debug=4`
    #[default]
    LowerIsMoreSevere,
    /// `error=50` is more severe than `debug=10`
    HigherIsMoreSevere,
}

/// A single level definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelDef {
    pub name: String,
    pub rank: Rank,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    pub color: String,
}

impl LevelDef {
    pub fn new(name: impl Into<String>, rank: Rank, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rank,
            icon: None,
            color: color.into(),
        }
    }

    #[must_use]
    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = Some(icon.into());
        self
    }
}

/// Reference to a level by name or by rank
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LevelRef {
    Name(String),
    Rank(Rank),
}

impl From<&str> for LevelRef {
    fn from(name: &str) -> Self {
        LevelRef::Name(name.to_string())
    }
}

impl From<String> for LevelRef {
    fn from(name: String) -> Self {
        LevelRef::Name(name)
    }
}

impl From<&String> for LevelRef {
    fn from(name: &String) -> Self {
        LevelRef::Name(name.clone())
    }
}

impl From<Rank> for LevelRef {
    fn from(rank: Rank) -> Self {
        LevelRef::Rank(rank)
    }
}

impl fmt::Display for LevelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelRef::Name(name) => write!(f, "{}", name),
            LevelRef::Rank(rank) => write!(f, "{}", rank),
        }
    }
}

/// Ordered, immutable table of levels
///
/// Levels are stored most severe first. A registry is built once per
/// manager and shared as `Arc<LevelRegistry>`.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::LevelRegistry;
///
/// let levels = LevelRegistry::default();
/// let warn = levels.as_value("warn").unwrap();
/// let info = levels.as_value("info").unwrap();
/// assert!(levels.meets_threshold(warn, info));
/// assert!(!levels.meets_threshold(levels.as_value("debug").unwrap(), info));
/// ```
#[derive(Debug, Clone)]
pub struct LevelRegistry {
    levels: Vec<LevelDef>,
    order: SeverityOrder,
    flush_threshold: Rank,
}

impl LevelRegistry {
    pub fn builder() -> LevelRegistryBuilder {
        LevelRegistryBuilder::new()
    }

    pub fn order(&self) -> SeverityOrder {
        self.order
    }

    /// Levels, most severe first
    pub fn levels(&self) -> impl Iterator<Item = &LevelDef> {
        self.levels.iter()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    pub fn most_severe(&self) -> &LevelDef {
        &self.levels[0]
    }

    pub fn least_severe(&self) -> &LevelDef {
        &self.levels[self.levels.len() - 1]
    }

    pub fn flush_threshold(&self) -> Rank {
        self.flush_threshold
    }

    /// Look up a level definition by name (case-insensitive) or rank
    pub fn get(&self, level: impl Into<LevelRef>) -> Result<&LevelDef> {
        match level.into() {
            LevelRef::Name(name) => self
                .levels
                .iter()
                .find(|def| def.name.eq_ignore_ascii_case(&name))
                .ok_or(LoggerError::UnknownLevel(name)),
            LevelRef::Rank(rank) => self
                .levels
                .iter()
                .find(|def| def.rank == rank)
                .ok_or(LoggerError::UnknownRank(rank)),
        }
    }

    pub fn as_value(&self, level: impl Into<LevelRef>) -> Result<Rank> {
        self.get(level).map(|def| def.rank)
    }

    pub fn as_name(&self, rank: Rank) -> Result<&str> {
        self.get(rank).map(|def| def.name.as_str())
    }

    /// True when `candidate` is at least as severe as `threshold`
    #[inline]
    pub fn meets_threshold(&self, candidate: Rank, threshold: Rank) -> bool {
        match self.order {
            SeverityOrder::LowerIsMoreSevere => candidate <= threshold,
            SeverityOrder::HigherIsMoreSevere => candidate >= threshold,
        }
    }

    /// True when the level should force batching transports to deliver now.
    /// Unknown levels never force a flush.
    pub fn meets_flush_threshold(&self, level: impl Into<LevelRef>) -> bool {
        self.as_value(level)
            .map(|rank| self.meets_threshold(rank, self.flush_threshold))
            .unwrap_or(false)
    }

    /// Colour `text` with the level's colour
    pub fn apply_color(&self, text: &str, level_name: &str) -> String {
        match self.get(level_name).ok().and_then(|def| color_for(&def.color)) {
            Some(color) => text.color(color).to_string(),
            None => text.to_string(),
        }
    }

    /// Widest level name at or above `threshold`, used for column alignment
    pub fn max_width(&self, threshold: Rank) -> usize {
        self.levels
            .iter()
            .filter(|def| self.meets_threshold(def.rank, threshold))
            .map(|def| def.name.chars().count())
            .max()
            .unwrap_or(0)
    }
}

impl Default for LevelRegistry {
    fn default() -> Self {
        Self {
            levels: vec![
                LevelDef::new("error", 0, "red").with_icon("✖"),
                LevelDef::new("warn", 1, "yellow").with_icon("⚠"),
                LevelDef::new("info", 2, "green").with_icon("ℹ"),
                LevelDef::new("verbose", 3, "cyan").with_icon("›"),
                LevelDef::new("debug", 4, "blue").with_icon("•"),
                LevelDef::new("trace", 5, "bright_black").with_icon("·"),
            ],
            order: SeverityOrder::LowerIsMoreSevere,
            flush_threshold: 0,
        }
    }
}

/// Builder for custom level tables
pub struct LevelRegistryBuilder {
    levels: Vec<LevelDef>,
    order: SeverityOrder,
    flush_threshold: Option<LevelRef>,
}

impl LevelRegistryBuilder {
    pub fn new() -> Self {
        Self {
            levels: Vec::new(),
            order: SeverityOrder::default(),
            flush_threshold: None,
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn order(mut self, order: SeverityOrder) -> Self {
        self.order = order;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn level(mut self, def: LevelDef) -> Self {
        self.levels.push(def);
        self
    }

    /// Defaults to the most severe level
    #[must_use = "builder methods return a new value"]
    pub fn flush_threshold(mut self, level: impl Into<LevelRef>) -> Self {
        self.flush_threshold = Some(level.into());
        self
    }

    pub fn build(self) -> Result<LevelRegistry> {
        let mut levels = self.levels;
        if levels.is_empty() {
            return Err(LoggerError::config("LevelRegistry", "at least one level is required"));
        }

        for (i, def) in levels.iter().enumerate() {
            if def.name.is_empty() {
                return Err(LoggerError::config("LevelRegistry", "level names must not be empty"));
            }
            for other in &levels[i + 1..] {
                if other.rank == def.rank {
                    return Err(LoggerError::config(
                        "LevelRegistry",
                        format!("rank {} is used by '{}' and '{}'", def.rank, def.name, other.name),
                    ));
                }
                if other.name.eq_ignore_ascii_case(&def.name) {
                    return Err(LoggerError::config(
                        "LevelRegistry",
                        format!("level '{}' is defined twice", def.name),
                    ));
                }
            }
        }

        match self.order {
            SeverityOrder::LowerIsMoreSevere => levels.sort_by_key(|def| def.rank),
            SeverityOrder::HigherIsMoreSevere => levels.sort_by_key(|def| std::cmp::Reverse(def.rank)),
        }

        let mut registry = LevelRegistry {
            flush_threshold: levels[0].rank,
            levels,
            order: self.order,
        };
        if let Some(level) = self.flush_threshold {
            registry.flush_threshold = registry.as_value(level)?;
        }
        Ok(registry)
    }
}

impl Default for LevelRegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn color_for(key: &str) -> Option<Color> {
    use Color::*;
    let color = match key.to_ascii_lowercase().as_str() {
        "black" => Black,
        "red" => Red,
        "green" => Green,
        "yellow" => Yellow,
        "blue" => Blue,
        "magenta" => Magenta,
        "cyan" => Cyan,
        "white" => White,
        "gray" | "grey" | "bright_black" => BrightBlack,
        "bright_red" => BrightRed,
        "bright_green" => BrightGreen,
        "bright_yellow" => BrightYellow,
        "bright_blue" => BrightBlue,
        "bright_magenta" => BrightMagenta,
        "bright_cyan" => BrightCyan,
        "bright_white" => BrightWhite,
        _ => return None,
    };
    Some(color)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn four_levels() -> LevelRegistry {
        LevelRegistry::builder()
            .level(LevelDef::new("DEBUG", 3, "blue"))
            .level(LevelDef::new("ERROR", 0, "red"))
            .level(LevelDef::new("INFO", 2, "green"))
            .level(LevelDef::new("WARN", 1, "yellow"))
            .build()
            .unwrap()
    }

    #[test]
    fn test_name_value_conversion() {
        let levels = four_levels();
        assert_eq!(levels.as_value("warn").unwrap(), 1);
        assert_eq!(levels.as_value(2).unwrap(), 2);
        assert_eq!(levels.as_name(3).unwrap(), "DEBUG");
        assert!(matches!(levels.as_name(9), Err(LoggerError::UnknownRank(9))));
        assert!(matches!(levels.as_value("loud"), Err(LoggerError::UnknownLevel(_))));
    }

    #[test]
    fn test_levels_sorted_most_severe_first() {
        let levels = four_levels();
        let names: Vec<_> = levels.levels().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["ERROR", "WARN", "INFO", "DEBUG"]);
        assert_eq!(levels.most_severe().name, "ERROR");
        assert_eq!(levels.least_severe().name, "DEBUG");
    }

    #[test]
    fn test_higher_is_more_severe() {
        let levels = LevelRegistry::builder()
            .order(SeverityOrder::HigherIsMoreSevere)
            .level(LevelDef::new("debug", 10, "blue"))
            .level(LevelDef::new("error", 50, "red"))
            .build()
            .unwrap();
        assert!(levels.meets_threshold(50, 10));
        assert!(!levels.meets_threshold(10, 50));
        assert_eq!(levels.flush_threshold(), 50);
        assert!(levels.meets_flush_threshold("error"));
        assert!(!levels.meets_flush_threshold("debug"));
    }

    #[test]
    fn test_duplicate_ranks_rejected() {
        let result = LevelRegistry::builder()
            .level(LevelDef::new("a", 1, "red"))
            .level(LevelDef::new("b", 1, "red"))
            .build();
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));

        let result = LevelRegistry::builder()
            .level(LevelDef::new("a", 1, "red"))
            .level(LevelDef::new("A", 2, "red"))
            .build();
        assert!(result.is_err());

        assert!(LevelRegistry::builder().build().is_err());
    }

    #[test]
    fn test_flush_threshold() {
        let levels = LevelRegistry::default();
        assert!(levels.meets_flush_threshold("error"));
        assert!(!levels.meets_flush_threshold("warn"));
        assert!(!levels.meets_flush_threshold("nonexistent"));

        let levels = LevelRegistry::builder()
            .level(LevelDef::new("error", 0, "red"))
            .level(LevelDef::new("warn", 1, "yellow"))
            .level(LevelDef::new("info", 2, "green"))
            .flush_threshold("warn")
            .build()
            .unwrap();
        assert!(levels.meets_flush_threshold(0));
        assert!(levels.meets_flush_threshold("warn"));
        assert!(!levels.meets_flush_threshold("info"));
    }

    #[test]
    fn test_max_width() {
        let levels = LevelRegistry::default();
        assert_eq!(levels.max_width(levels.as_value("warn").unwrap()), 5);
        assert_eq!(levels.max_width(levels.as_value("info").unwrap()), 5);
        assert_eq!(levels.max_width(levels.as_value("verbose").unwrap()), 7);
    }

    #[test]
    fn test_apply_color_unknown_level_is_identity() {
        let levels = LevelRegistry::default();
        assert_eq!(levels.apply_color("text", "nope"), "text");
        let custom = LevelRegistry::builder()
            .level(LevelDef::new("odd", 0, "chartreuse"))
            .build()
            .unwrap();
        assert_eq!(custom.apply_color("text", "odd"), "text");
    }
}
