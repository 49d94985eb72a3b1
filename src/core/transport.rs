//! Transport trait for log output destinations

use super::error::Result;
use super::log_entry::LogEntry;
use super::log_level::{LevelRef, LevelRegistry, Rank};
use super::output_format::FormatContext;
use super::show::ShowOptions;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Manager-wide settings pushed to every transport
#[derive(Debug, Clone)]
pub struct TransportSettings {
    pub levels: Arc<LevelRegistry>,
    pub threshold: Rank,
    pub show: ShowOptions,
}

impl Default for TransportSettings {
    fn default() -> Self {
        let levels = Arc::new(LevelRegistry::default());
        let threshold = levels.as_value("info").unwrap_or_else(|_| levels.least_severe().rank);
        Self {
            levels,
            threshold,
            show: ShowOptions::default(),
        }
    }
}

/// Per-transport overrides of the manager settings
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    pub threshold: Option<LevelRef>,
    pub show: Option<ShowOptions>,
}

/// Settings in effect for one transport after overrides are applied
#[derive(Debug, Clone)]
pub struct EffectiveSettings {
    pub levels: Arc<LevelRegistry>,
    pub threshold: Rank,
    pub show: ShowOptions,
    /// Cached padded-level column width for `threshold`
    pub level_width: usize,
}

impl EffectiveSettings {
    pub fn format_context(&self) -> FormatContext<'_> {
        FormatContext {
            levels: &self.levels,
            show: &self.show,
            level_width: self.level_width,
        }
    }
}

/// State every transport shares: name, overrides, effective settings and
/// the destroyed flag
#[derive(Debug)]
pub struct TransportCore {
    name: String,
    options: TransportOptions,
    effective: RwLock<Arc<EffectiveSettings>>,
    destroyed: AtomicBool,
}

impl TransportCore {
    pub fn new(name: impl Into<String>, options: TransportOptions) -> Self {
        let defaults = TransportSettings::default();
        // Override may name a level only a custom registry knows; checked again on configure
        let effective = Self::resolve(&options, &defaults)
            .unwrap_or_else(|_| Self::effective(&options, &defaults, defaults.threshold));
        Self {
            name: name.into(),
            options,
            effective: RwLock::new(Arc::new(effective)),
            destroyed: AtomicBool::new(false),
        }
    }

    fn resolve(options: &TransportOptions, settings: &TransportSettings) -> Result<EffectiveSettings> {
        let threshold = match options.threshold {
            Some(ref level) => settings.levels.as_value(level.clone())?,
            None => settings.threshold,
        };
        Ok(Self::effective(options, settings, threshold))
    }

    fn effective(
        options: &TransportOptions,
        settings: &TransportSettings,
        threshold: Rank,
    ) -> EffectiveSettings {
        EffectiveSettings {
            levels: Arc::clone(&settings.levels),
            threshold,
            show: options.show.clone().unwrap_or_else(|| settings.show.clone()),
            level_width: settings.levels.max_width(threshold),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn options(&self) -> &TransportOptions {
        &self.options
    }

    /// Apply manager settings; fails if the local threshold names an unknown level
    pub fn apply(&self, settings: &TransportSettings) -> Result<()> {
        let effective = Self::resolve(&self.options, settings)?;
        *self.effective.write() = Arc::new(effective);
        Ok(())
    }

    pub fn settings(&self) -> Arc<EffectiveSettings> {
        self.effective.read().clone()
    }

    pub fn threshold(&self) -> Rank {
        self.effective.read().threshold
    }

    #[inline]
    pub fn accepts(&self, rank: Rank) -> bool {
        if self.is_destroyed() {
            return false;
        }
        let effective = self.effective.read();
        effective.levels.meets_threshold(rank, effective.threshold)
    }

    pub fn destroy(&self) {
        self.destroyed.store(true, Ordering::Release);
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }
}

/// A sink that consumes entries
///
/// `emit` is synchronous and must never block on I/O; transports that
/// deliver asynchronously buffer in `emit` and send from `flush`.
///
/// # Example
///
/// ```
/// use rust_log_pipeline::core::{LogEntry, Transport, TransportCore, TransportOptions};
/// use async_trait::async_trait;
///
/// struct Counter {
///     core: TransportCore,
///     seen: std::sync::atomic::AtomicUsize,
/// }
///
/// #[async_trait]
/// impl Transport for Counter {
///     fn core(&self) -> &TransportCore {
///         &self.core
///     }
///
///     fn emit(&self, entry: &LogEntry) {
///         if self.accepts(entry.rank) {
///             self.seen.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///         }
///     }
/// }
///
/// let counter = Counter {
///     core: TransportCore::new("counter", TransportOptions::default()),
///     seen: Default::default(),
/// };
/// counter.emit(&LogEntry::new("warn", 1, "hello"));
/// counter.emit(&LogEntry::new("debug", 4, "hidden"));
/// assert_eq!(counter.seen.load(std::sync::atomic::Ordering::Relaxed), 1);
/// ```
#[async_trait]
pub trait Transport: Send + Sync {
    fn core(&self) -> &TransportCore;

    fn name(&self) -> &str {
        self.core().name()
    }

    /// Become ready; may complete immediately
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    fn emit(&self, entry: &LogEntry);

    async fn flush(&self) -> Result<()> {
        Ok(())
    }

    /// Drain pending output and release resources
    async fn stop(&self) -> Result<()> {
        self.flush().await
    }

    /// Called when the transport is removed from a manager
    fn destroy(&self) {
        self.core().destroy();
    }

    fn accepts(&self, rank: Rank) -> bool {
        self.core().accepts(rank)
    }

    fn configure(&self, settings: &TransportSettings) -> Result<()> {
        self.core().apply(settings)
    }
}
