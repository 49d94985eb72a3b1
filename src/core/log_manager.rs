//! Log manager: owns levels, threshold, display options and transports

use super::diagnostics;
use super::error::{LoggerError, Result};
use super::log_entry::LogEntry;
use super::log_level::{LevelRef, LevelRegistry, Rank};
use super::logger::{Logger, LoggerParams};
use super::metrics::PipelineMetrics;
use super::show::ShowOptions;
use super::transport::{Transport, TransportSettings};
use super::transport_manager::TransportManager;
use crate::transports::ConsoleTransport;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

/// Package name used for entries the manager emits about itself
pub const INTERNAL_PKG: &str = "log_pipeline";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManagerState {
    Constructed,
    Starting,
    Running,
    Stopped,
}

struct Dispatch {
    state: ManagerState,
    pending: VecDeque<Arc<LogEntry>>,
}

struct GlobalSettings {
    threshold: Rank,
    show: ShowOptions,
}

struct ManagerInner {
    levels: Arc<LevelRegistry>,
    pkg_separator: String,
    settings: RwLock<GlobalSettings>,
    dispatch: Mutex<Dispatch>,
    transports: TransportManager,
    metrics: PipelineMetrics,
}

/// Serde-friendly manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManagerConfig {
    /// Level name; `None` keeps the registry default (`info`)
    pub threshold: Option<String>,
    pub show: ShowOptions,
    pub pkg_separator: String,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            threshold: None,
            show: ShowOptions::default(),
            pkg_separator: ".".to_string(),
        }
    }
}

impl ManagerConfig {
    /// Defaults adjusted by `NO_COLOR` and `LOG_LEVEL`
    pub fn from_env() -> Self {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if var("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            config.show.color = false;
        }
        if let Some(level) = var("LOG_LEVEL").filter(|v| !v.trim().is_empty()) {
            config.threshold = Some(level.trim().to_string());
        }
        config
    }
}

/// Entry point of the pipeline
///
/// Entries dispatched before `start()` completes are queued and delivered in
/// arrival order once every transport is ready.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::transports::BufferTransport;
/// use rust_log_pipeline::LogManager;
/// use std::sync::Arc;
///
/// # tokio_test::block_on(async {
/// let buffer = Arc::new(BufferTransport::new());
/// let manager = LogManager::builder()
///     .transport(buffer.clone())
///     .build()
///     .unwrap();
///
/// let logger = manager.root_logger();
/// logger.info("queued until start");
/// assert_eq!(buffer.len(), 0);
///
/// manager.start().await.unwrap();
/// assert_eq!(buffer.messages(), vec!["queued until start"]);
/// manager.stop().await.unwrap();
/// # });
/// ```
#[derive(Clone)]
pub struct LogManager {
    inner: Arc<ManagerInner>,
}

impl LogManager {
    /// Manager with the default registry, threshold `info` and no transports
    pub fn new() -> Self {
        Self::assemble(
            Arc::new(LevelRegistry::default()),
            None,
            ShowOptions::default(),
            ".".to_string(),
        )
    }

    pub fn builder() -> LogManagerBuilder {
        LogManagerBuilder::new()
    }

    pub fn from_config(config: ManagerConfig) -> Result<Self> {
        let mut builder = Self::builder()
            .show(config.show)
            .pkg_separator(config.pkg_separator);
        if let Some(threshold) = config.threshold {
            builder = builder.threshold(threshold);
        }
        builder.build()
    }

    fn assemble(
        levels: Arc<LevelRegistry>,
        threshold: Option<Rank>,
        show: ShowOptions,
        pkg_separator: String,
    ) -> Self {
        let threshold = threshold.unwrap_or_else(|| default_threshold(&levels));
        Self {
            inner: Arc::new(ManagerInner {
                levels,
                pkg_separator,
                settings: RwLock::new(GlobalSettings { threshold, show }),
                dispatch: Mutex::new(Dispatch {
                    state: ManagerState::Constructed,
                    pending: VecDeque::new(),
                }),
                transports: TransportManager::new(),
                metrics: PipelineMetrics::new(),
            }),
        }
    }

    fn transport_settings(&self) -> TransportSettings {
        let settings = self.inner.settings.read();
        TransportSettings {
            levels: Arc::clone(&self.inner.levels),
            threshold: settings.threshold,
            show: settings.show.clone(),
        }
    }

    /// Set up every transport and deliver queued entries
    ///
    /// Transports whose setup fails are removed; the rest proceed and the
    /// first failure is returned.
    pub async fn start(&self) -> Result<()> {
        {
            let mut dispatch = self.inner.dispatch.lock();
            match dispatch.state {
                ManagerState::Constructed => dispatch.state = ManagerState::Starting,
                ManagerState::Stopped => return Err(LoggerError::ManagerStopped),
                ManagerState::Starting | ManagerState::Running => {
                    drop(dispatch);
                    self.internal_warning("start() called more than once; ignoring");
                    return Ok(());
                }
            }
        }

        if self.inner.transports.is_empty() {
            self.inner.transports.add(Arc::new(ConsoleTransport::new()), false);
        }
        if let Err(e) = self.inner.transports.configure_all(&self.transport_settings()) {
            self.inner.dispatch.lock().state = ManagerState::Constructed;
            return Err(e);
        }

        // A transport registered while setup was running still needs its own
        let mut first_failure = None;
        while !self.inner.transports.all_ready() {
            for (transport, err) in self.inner.transports.setup_pending().await {
                diagnostics::report_error("LogManager", err.to_string());
                self.inner.transports.remove(&transport);
                first_failure.get_or_insert(err);
            }
        }

        if !self.drain_pending() {
            // stop() ran while setup was in flight; release what setup acquired
            let _ = self.inner.transports.stop_all().await;
        }
        first_failure.map_or(Ok(()), Err)
    }

    /// Flush the queue and switch to running, under the state lock
    ///
    /// Returns false if the manager was stopped meanwhile.
    fn drain_pending(&self) -> bool {
        let mut dispatch = self.inner.dispatch.lock();
        if dispatch.state != ManagerState::Starting {
            // stop() already accounted for the queue
            return false;
        }
        while let Some(entry) = dispatch.pending.pop_front() {
            self.inner.transports.emit(&entry);
            self.inner.metrics.record_emitted();
        }
        dispatch.state = ManagerState::Running;
        true
    }

    /// Stop every transport concurrently
    ///
    /// Stopping twice is a no-op. Entries still queued are discarded.
    pub async fn stop(&self) -> Result<()> {
        let discarded = {
            let mut dispatch = self.inner.dispatch.lock();
            if dispatch.state == ManagerState::Stopped {
                return Ok(());
            }
            dispatch.state = ManagerState::Stopped;
            let discarded = dispatch.pending.len();
            dispatch.pending.clear();
            discarded
        };
        if discarded > 0 {
            self.inner.metrics.record_dropped_many(discarded as u64);
            diagnostics::report_warning(
                "LogManager",
                format!("stopped before start; {} queued entries discarded", discarded),
            );
        }
        self.inner.transports.stop_all().await
    }

    /// Flush every transport without stopping
    pub async fn flush(&self) -> Result<()> {
        self.inner.transports.flush_all().await
    }

    /// Route a finished entry; returns false if it was dropped
    pub(crate) fn dispatch(&self, entry: Arc<LogEntry>) -> bool {
        let mut dispatch = self.inner.dispatch.lock();
        match dispatch.state {
            ManagerState::Running => {
                drop(dispatch);
                self.inner.transports.emit(&entry);
                self.inner.metrics.record_emitted();
                true
            }
            ManagerState::Constructed | ManagerState::Starting => {
                dispatch.pending.push_back(entry);
                self.inner.metrics.record_queued();
                true
            }
            ManagerState::Stopped => {
                self.inner.metrics.record_dropped();
                false
            }
        }
    }

    fn internal_warning(&self, message: &str) {
        let levels = &self.inner.levels;
        let def = levels.get("warn").unwrap_or_else(|_| levels.most_severe());
        let entry = LogEntry::new(def.name.clone(), def.rank, message).with_pkg_chain(INTERNAL_PKG);
        self.dispatch(Arc::new(entry));
    }

    pub fn set_threshold(&self, level: impl Into<LevelRef>) -> Result<()> {
        let rank = self.inner.levels.as_value(level)?;
        self.inner.settings.write().threshold = rank;
        self.inner.transports.configure_all(&self.transport_settings())
    }

    /// Push display options to every transport without its own override
    pub fn set_show(&self, show: ShowOptions) {
        self.inner.settings.write().show = show;
        if let Err(e) = self.inner.transports.configure_all(&self.transport_settings()) {
            diagnostics::report_error("LogManager", e.to_string());
        }
    }

    /// Register a transport
    ///
    /// Before `start()` it is queued for setup; afterwards it is set up here
    /// and only registered once ready.
    pub async fn add_transport(&self, transport: Arc<dyn Transport>) -> Result<()> {
        transport.configure(&self.transport_settings())?;
        match self.state() {
            ManagerState::Constructed => {
                self.inner.transports.add(transport, false);
            }
            ManagerState::Starting | ManagerState::Running => {
                transport
                    .setup()
                    .await
                    .map_err(|e| LoggerError::setup(transport.name(), e.to_string()))?;
                self.inner.transports.add(transport, true);
            }
            ManagerState::Stopped => return Err(LoggerError::ManagerStopped),
        }
        Ok(())
    }

    /// Destroy and remove every transport called `name`
    pub fn remove_transport(&self, name: &str) -> bool {
        self.inner.transports.remove_named(name)
    }

    pub fn get_logger(&self, params: LoggerParams) -> Logger {
        Logger::root(self.clone(), params)
    }

    pub fn root_logger(&self) -> Logger {
        self.get_logger(LoggerParams::default())
    }

    /// True if some transport would act on `rank`
    ///
    /// With no transport registered yet, the global threshold decides, since
    /// `start()` installs a console transport using it.
    pub fn meets_any_threshold(&self, rank: Rank) -> bool {
        if self.inner.transports.is_empty() {
            return self.inner.levels.meets_threshold(rank, self.threshold());
        }
        self.inner.transports.meets_any_threshold(rank)
    }

    pub fn state(&self) -> ManagerState {
        self.inner.dispatch.lock().state
    }

    pub fn pending_len(&self) -> usize {
        self.inner.dispatch.lock().pending.len()
    }

    pub fn levels(&self) -> &LevelRegistry {
        &self.inner.levels
    }

    pub fn threshold(&self) -> Rank {
        self.inner.settings.read().threshold
    }

    pub fn show(&self) -> ShowOptions {
        self.inner.settings.read().show.clone()
    }

    pub fn pkg_separator(&self) -> &str {
        &self.inner.pkg_separator
    }

    pub fn transport_names(&self) -> Vec<String> {
        self.inner.transports.names()
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.inner.metrics
    }
}

impl Default for LogManager {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for LogManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogManager")
            .field("state", &self.state())
            .field("threshold", &self.threshold())
            .field("transports", &self.transport_names())
            .finish()
    }
}

fn default_threshold(levels: &LevelRegistry) -> Rank {
    levels
        .as_value("info")
        .unwrap_or_else(|_| levels.least_severe().rank)
}

/// Builder for [`LogManager`]
pub struct LogManagerBuilder {
    levels: Option<LevelRegistry>,
    threshold: Option<LevelRef>,
    show: ShowOptions,
    pkg_separator: String,
    transports: Vec<Arc<dyn Transport>>,
}

impl LogManagerBuilder {
    pub fn new() -> Self {
        Self {
            levels: None,
            threshold: None,
            show: ShowOptions::default(),
            pkg_separator: ".".to_string(),
            transports: Vec::new(),
        }
    }

    #[must_use = "builder methods return a new value"]
    pub fn levels(mut self, levels: LevelRegistry) -> Self {
        self.levels = Some(levels);
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn threshold(mut self, level: impl Into<LevelRef>) -> Self {
        self.threshold = Some(level.into());
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn show(mut self, show: ShowOptions) -> Self {
        self.show = show;
        self
    }

    #[must_use = "builder methods return a new value"]
    pub fn pkg_separator(mut self, separator: impl Into<String>) -> Self {
        self.pkg_separator = separator.into();
        self
    }

    /// Transports are registered in call order, so the last one is first
    #[must_use = "builder methods return a new value"]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Fails if the threshold or any transport threshold names an unknown level
    pub fn build(self) -> Result<LogManager> {
        let levels = Arc::new(self.levels.unwrap_or_default());
        let threshold = self
            .threshold
            .map(|level| levels.as_value(level))
            .transpose()?;
        let manager = LogManager::assemble(levels, threshold, self.show, self.pkg_separator);
        let settings = manager.transport_settings();
        for transport in self.transports {
            transport.configure(&settings)?;
            manager.inner.transports.add(transport, false);
        }
        Ok(manager)
    }
}

impl Default for LogManagerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
