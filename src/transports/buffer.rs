//! In-memory transport for tests and inspection

use crate::core::{
    LevelRef, LogEntry, LoggerError, Rank, Result, Transport, TransportCore, TransportOptions,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use regex::Regex;
use serde_json::Value;
use std::collections::VecDeque;
use std::time::Duration;

pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// What the buffer keeps of each entry
#[derive(Debug, Clone, PartialEq)]
pub struct BufferedEntry {
    pub level: String,
    pub rank: Rank,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub data: Option<Value>,
    pub pkg_chain: Option<String>,
}

impl From<&LogEntry> for BufferedEntry {
    fn from(entry: &LogEntry) -> Self {
        Self {
            level: entry.level.clone(),
            rank: entry.rank,
            message: entry.plain_message(),
            timestamp: entry.timestamp,
            data: entry.data.clone(),
            pkg_chain: entry.pkg_chain.clone(),
        }
    }
}

/// Capped FIFO of captured entries; the oldest is evicted first
///
/// # Example
///
/// ```
/// use rust_log_pipeline::transports::BufferTransport;
/// use rust_log_pipeline::core::{LogEntry, Transport};
///
/// let buffer = BufferTransport::new().with_max_entries(2);
/// for msg in ["a", "b", "c"] {
///     buffer.emit(&LogEntry::new("info", 2, msg));
/// }
/// assert_eq!(buffer.messages(), vec!["b", "c"]);
/// buffer.assert_contains("c").unwrap();
/// assert!(buffer.assert_contains("a").is_err());
/// ```
pub struct BufferTransport {
    core: TransportCore,
    entries: Mutex<VecDeque<BufferedEntry>>,
    max_entries: usize,
    setup_delay: Option<Duration>,
}

impl BufferTransport {
    pub fn new() -> Self {
        Self::with_options(TransportOptions::default())
    }

    pub fn with_options(options: TransportOptions) -> Self {
        Self {
            core: TransportCore::new("buffer", options),
            entries: Mutex::new(VecDeque::new()),
            max_entries: DEFAULT_MAX_ENTRIES,
            setup_delay: None,
        }
    }

    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.core = TransportCore::new(name, self.core.options().clone());
        self
    }

    #[must_use]
    pub fn with_threshold(mut self, level: impl Into<LevelRef>) -> Self {
        let mut options = self.core.options().clone();
        options.threshold = Some(level.into());
        self.core = TransportCore::new(self.core.name().to_string(), options);
        self
    }

    /// Zero keeps nothing
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries;
        self
    }

    /// Delay `setup()` to simulate a slow transport
    #[must_use]
    pub fn with_setup_delay(mut self, delay: Duration) -> Self {
        self.setup_delay = Some(delay);
        self
    }

    pub fn entries(&self) -> Vec<BufferedEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Entries whose level name matches, case-insensitively
    pub fn by_level(&self, level: &str) -> Vec<BufferedEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| e.level.eq_ignore_ascii_case(level))
            .cloned()
            .collect()
    }

    pub fn last(&self) -> Option<BufferedEntry> {
        self.entries.lock().back().cloned()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries.lock().iter().map(|e| e.message.clone()).collect()
    }

    pub fn contains(&self, text: &str) -> bool {
        self.entries.lock().iter().any(|e| e.message.contains(text))
    }

    pub fn matches(&self, pattern: &Regex) -> Vec<BufferedEntry> {
        self.entries
            .lock()
            .iter()
            .filter(|e| pattern.is_match(&e.message))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    pub fn assert_contains(&self, text: &str) -> Result<()> {
        if self.contains(text) {
            Ok(())
        } else {
            Err(self.failure(format!("expected a message containing {:?}", text)))
        }
    }

    pub fn assert_matches(&self, pattern: &str) -> Result<()> {
        let regex = Regex::new(pattern)?;
        if self.matches(&regex).is_empty() {
            Err(self.failure(format!("expected a message matching /{}/", pattern)))
        } else {
            Ok(())
        }
    }

    pub fn assert_count(&self, expected: usize) -> Result<()> {
        let actual = self.len();
        if actual == expected {
            Ok(())
        } else {
            Err(self.failure(format!("expected {} entries, found {}", expected, actual)))
        }
    }

    pub fn assert_last_level(&self, level: &str) -> Result<()> {
        match self.last() {
            Some(ref e) if e.level.eq_ignore_ascii_case(level) => Ok(()),
            Some(e) => Err(self.failure(format!(
                "expected last entry at level {:?}, found {:?}",
                level, e.level
            ))),
            None => Err(self.failure(format!("expected last entry at level {:?}, buffer is empty", level))),
        }
    }

    fn failure(&self, message: String) -> LoggerError {
        let dump = self
            .entries
            .lock()
            .iter()
            .map(|e| format!("  [{}] {}", e.level, e.message))
            .collect::<Vec<_>>()
            .join("\n");
        LoggerError::assertion(message, dump)
    }
}

impl Default for BufferTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for BufferTransport {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    async fn setup(&self) -> Result<()> {
        if let Some(delay) = self.setup_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    fn emit(&self, entry: &LogEntry) {
        if !self.accepts(entry.rank) || self.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.lock();
        while entries.len() >= self.max_entries {
            entries.pop_front();
        }
        entries.push_back(BufferedEntry::from(entry));
    }
}
