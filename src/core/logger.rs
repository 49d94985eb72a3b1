//! Logger hierarchy: root and child emitters with inheritable context

use super::diagnostics;
use super::error::Result;
use super::log_entry::LogEntry;
use super::log_level::{LevelRef, Rank};
use super::log_manager::LogManager;
use super::message::Message;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Parameters for `LogManager::get_logger` and `Logger::get_child`
///
/// `pkg` is appended to the package chain; ids replace the inherited ones
/// when set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggerParams {
    pub pkg: Option<String>,
    pub session_id: Option<String>,
    pub request_id: Option<String>,
}

impl LoggerParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn pkg(mut self, pkg: impl Into<String>) -> Self {
        self.pkg = Some(pkg.into());
        self
    }

    #[must_use]
    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }
}

/// A node in the logger hierarchy
///
/// Cloning (and `get_child`) copies the package chain, ids and indent stack
/// by value; a child never shares mutable state with its parent.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::{LogManager, LoggerParams};
///
/// let manager = LogManager::new();
/// let root = manager.get_logger(LoggerParams::new().pkg("app"));
/// let mut db = root.get_child(LoggerParams::new().pkg("db"));
/// db.indent("  ");
///
/// assert_eq!(db.pkg_chain().as_deref(), Some("app.db"));
/// assert_eq!(db.indent_depth(), 1);
/// assert_eq!(root.indent_depth(), 0);
/// ```
#[derive(Clone)]
pub struct Logger {
    manager: LogManager,
    pkg_chain: Vec<String>,
    session_id: Option<String>,
    request_id: Option<String>,
    indent_stack: Vec<String>,
}

impl Logger {
    pub(crate) fn root(manager: LogManager, params: LoggerParams) -> Self {
        Self {
            manager,
            pkg_chain: params.pkg.into_iter().collect(),
            session_id: params.session_id,
            request_id: params.request_id,
            indent_stack: Vec::new(),
        }
    }

    pub fn get_child(&self, params: LoggerParams) -> Logger {
        let mut child = self.clone();
        if let Some(pkg) = params.pkg {
            child.pkg_chain.push(pkg);
        }
        if params.session_id.is_some() {
            child.session_id = params.session_id;
        }
        if params.request_id.is_some() {
            child.request_id = params.request_id;
        }
        child
    }

    pub fn manager(&self) -> &LogManager {
        &self.manager
    }

    /// Package chain joined with the manager's separator
    pub fn pkg_chain(&self) -> Option<String> {
        if self.pkg_chain.is_empty() {
            None
        } else {
            Some(self.pkg_chain.join(self.manager.pkg_separator()))
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn set_session_id(&mut self, session_id: Option<String>) {
        self.session_id = session_id;
    }

    pub fn set_request_id(&mut self, request_id: Option<String>) {
        self.request_id = request_id;
    }

    /// Push one indentation unit for subsequent messages
    pub fn indent(&mut self, unit: impl Into<String>) {
        self.indent_stack.push(unit.into());
    }

    pub fn outdent(&mut self) -> Option<String> {
        self.indent_stack.pop()
    }

    pub fn indent_depth(&self) -> usize {
        self.indent_stack.len()
    }

    pub fn indent_stack(&self) -> &[String] {
        &self.indent_stack
    }

    /// Start a record at `level`; unknown levels fail immediately
    pub fn at(&self, level: impl Into<LevelRef>) -> Result<Record<'_>> {
        let def = self.manager.levels().get(level)?;
        Ok(Record {
            logger: self,
            level: def.name.clone(),
            rank: def.rank,
            enabled: self.manager.meets_any_threshold(def.rank),
            message: None,
            data: None,
            elapsed_ms: None,
        })
    }

    pub fn is_enabled(&self, level: impl Into<LevelRef>) -> bool {
        self.manager
            .levels()
            .as_value(level)
            .map(|rank| self.manager.meets_any_threshold(rank))
            .unwrap_or(false)
    }

    /// Emit `message` at `level`
    ///
    /// An unknown level is reported on the diagnostics channel instead of
    /// failing, so call sites stay one-liners.
    pub fn log(&self, level: impl Into<LevelRef>, message: impl Into<Message>) -> Option<Arc<LogEntry>> {
        match self.at(level) {
            Ok(record) => record.emit_with(message),
            Err(e) => {
                diagnostics::report_error("Logger", e.to_string());
                None
            }
        }
    }

    #[inline]
    pub fn error(&self, message: impl Into<Message>) -> Option<Arc<LogEntry>> {
        self.log("error", message)
    }

    #[inline]
    pub fn warn(&self, message: impl Into<Message>) -> Option<Arc<LogEntry>> {
        self.log("warn", message)
    }

    #[inline]
    pub fn info(&self, message: impl Into<Message>) -> Option<Arc<LogEntry>> {
        self.log("info", message)
    }

    #[inline]
    pub fn verbose(&self, message: impl Into<Message>) -> Option<Arc<LogEntry>> {
        self.log("verbose", message)
    }

    #[inline]
    pub fn debug(&self, message: impl Into<Message>) -> Option<Arc<LogEntry>> {
        self.log("debug", message)
    }

    #[inline]
    pub fn trace(&self, message: impl Into<Message>) -> Option<Arc<LogEntry>> {
        self.log("trace", message)
    }

    fn build_entry(&self, record: Record<'_>, message: Message) -> LogEntry {
        let mut entry = LogEntry::new(record.level, record.rank, message);
        entry.data = record.data;
        entry.elapsed_ms = record.elapsed_ms;
        entry.pkg_chain = self.pkg_chain();
        entry.session_id = self.session_id.clone();
        entry.request_id = self.request_id.clone();
        if !self.indent_stack.is_empty() {
            entry.indent = Some(self.indent_stack.concat());
        }
        entry
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("pkg_chain", &self.pkg_chain)
            .field("session_id", &self.session_id)
            .field("request_id", &self.request_id)
            .field("indent_stack", &self.indent_stack)
            .finish()
    }
}

/// A message under construction at a fixed level
///
/// When no transport would accept the level, `enabled()` is false and
/// `emit` returns `None` without building an entry.
#[must_use = "a record does nothing until emitted"]
pub struct Record<'a> {
    logger: &'a Logger,
    level: String,
    rank: Rank,
    enabled: bool,
    message: Option<Message>,
    data: Option<Value>,
    elapsed_ms: Option<u64>,
}

impl<'a> Record<'a> {
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn level(&self) -> &str {
        &self.level
    }

    pub fn message(mut self, message: impl Into<Message>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Attach structured data; values that fail to serialize are kept as
    /// their debug string
    pub fn data<T: Serialize + fmt::Debug + ?Sized>(mut self, data: &T) -> Self {
        if self.enabled {
            self.data = Some(serde_json::to_value(data).unwrap_or_else(|_| Value::String(format!("{:?}", data))));
        }
        self
    }

    pub fn elapsed(mut self, elapsed: Duration) -> Self {
        self.elapsed_ms = Some(elapsed.as_millis() as u64);
        self
    }

    pub fn since(self, start: Instant) -> Self {
        self.elapsed(start.elapsed())
    }

    pub fn emit(mut self) -> Option<Arc<LogEntry>> {
        let message = self.message.take().unwrap_or_default();
        self.finish(message)
    }

    /// Emit with an explicit message, replacing any set before
    pub fn emit_with(self, message: impl Into<Message>) -> Option<Arc<LogEntry>> {
        self.finish(message.into())
    }

    fn finish(self, message: Message) -> Option<Arc<LogEntry>> {
        if !self.enabled {
            return None;
        }
        let logger = self.logger;
        let entry = Arc::new(logger.build_entry(self, message));
        logger.manager.dispatch(Arc::clone(&entry)).then_some(entry)
    }
}
