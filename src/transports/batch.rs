//! Batched delivery: buffer encoded lines and ship them to a sink
//!
//! A [`BatchTransport`] encodes each accepted entry into one line and appends
//! it to its [`Batcher`]. Lines leave the buffer when it reaches
//! `batch_size`, when an entry meets the registry's flush threshold, on every
//! timer tick, and on `stop()`. A failed delivery puts its lines back at the
//! front of the buffer.

use crate::core::diagnostics;
use crate::core::{
    EffectiveSettings, LevelRef, LogEntry, LoggerError, PipelineMetrics, Result, Transport,
    TransportCore, TransportOptions,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio::time::MissedTickBehavior;

/// Batching and retry settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Lines that trigger an immediate flush
    pub batch_size: usize,
    pub flush_interval_ms: u64,
    /// Total delivery attempts per flush; values below 1 mean 1
    pub max_retries: u32,
    /// First backoff delay; doubled after every failed attempt
    pub retry_base_ms: u64,
    /// Bound on a single attempt
    pub request_timeout_ms: u64,
    /// Oldest lines are evicted past this bound
    pub max_buffered_lines: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            flush_interval_ms: 5000,
            max_retries: 3,
            retry_base_ms: 100,
            request_timeout_ms: 10_000,
            max_buffered_lines: 10_000,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LoggerError::config("BatchConfig", "batch_size must be at least 1"));
        }
        if self.flush_interval_ms == 0 {
            return Err(LoggerError::config("BatchConfig", "flush_interval_ms must be positive"));
        }
        if self.max_buffered_lines < self.batch_size {
            return Err(LoggerError::config(
                "BatchConfig",
                format!(
                    "max_buffered_lines ({}) is smaller than batch_size ({})",
                    self.max_buffered_lines, self.batch_size
                ),
            ));
        }
        Ok(())
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Delay after the failed attempt with zero-based index `attempt`
    pub fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_base_ms.saturating_mul(2_u64.saturating_pow(attempt)))
    }
}

/// Destination of framed batches
#[async_trait]
pub trait BatchSink: Send + Sync {
    fn name(&self) -> &str;

    /// Called once from the transport's `setup()`
    async fn setup(&self) -> Result<()> {
        Ok(())
    }

    /// Deliver one framed payload; an error makes the attempt retryable
    async fn deliver(&self, payload: &str) -> Result<()>;
}

/// Turns entries into lines and lines into a payload
pub trait LineEncoder: Send + Sync {
    fn encode(&self, entry: &LogEntry, settings: &EffectiveSettings) -> Result<String>;

    /// Newline-delimited by default
    fn frame(&self, lines: &[String]) -> Result<String> {
        let mut payload = lines.join("\n");
        payload.push('\n');
        Ok(payload)
    }

    fn content_type(&self) -> &'static str {
        "text/plain; charset=utf-8"
    }
}

struct Buffer {
    lines: VecDeque<String>,
    transmitting: bool,
}

struct Shared {
    buffer: Mutex<Buffer>,
    idle: Notify,
    max_buffered_lines: usize,
    metrics: PipelineMetrics,
}

impl Shared {
    fn evict_overflow(&self, buffer: &mut Buffer) {
        let excess = buffer.lines.len().saturating_sub(self.max_buffered_lines);
        if excess > 0 {
            buffer.lines.drain(..excess);
            self.metrics.record_evicted(excess as u64);
        }
    }
}

/// Lines detached from the buffer for one transmission
///
/// Only a successful delivery consumes the lines. Dropping the batch on any
/// other path, including a cancelled task, puts them back at the front of the
/// buffer and clears the in-flight flag.
pub struct Batch {
    lines: Vec<String>,
    shared: Arc<Shared>,
}

impl Batch {
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Mark the lines as delivered, or otherwise disposed of
    fn consume(&mut self) -> Vec<String> {
        std::mem::take(&mut self.lines)
    }
}

impl Drop for Batch {
    fn drop(&mut self) {
        let lines = std::mem::take(&mut self.lines);
        let mut buffer = self.shared.buffer.lock();
        for line in lines.into_iter().rev() {
            buffer.lines.push_front(line);
        }
        self.shared.evict_overflow(&mut buffer);
        buffer.transmitting = false;
        drop(buffer);
        self.shared.idle.notify_waiters();
    }
}

/// Ordered line buffer with at most one transmission in flight
pub struct Batcher {
    shared: Arc<Shared>,
    config: BatchConfig,
}

impl Batcher {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                buffer: Mutex::new(Buffer {
                    lines: VecDeque::new(),
                    transmitting: false,
                }),
                idle: Notify::new(),
                max_buffered_lines: config.max_buffered_lines,
                metrics: PipelineMetrics::new(),
            }),
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        &self.shared.metrics
    }

    /// Append a line; true once the buffer holds a full batch
    pub fn push(&self, line: String) -> bool {
        let mut buffer = self.shared.buffer.lock();
        buffer.lines.push_back(line);
        self.shared.evict_overflow(&mut buffer);
        buffer.lines.len() >= self.config.batch_size
    }

    pub fn len(&self) -> usize {
        self.shared.buffer.lock().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.buffer.lock().lines.is_empty()
    }

    pub fn is_transmitting(&self) -> bool {
        self.shared.buffer.lock().transmitting
    }

    /// Buffered lines, oldest first
    pub fn pending(&self) -> Vec<String> {
        self.shared.buffer.lock().lines.iter().cloned().collect()
    }

    /// Detach the whole buffer unless it is empty or a batch is in flight
    pub fn take(&self) -> Option<Batch> {
        let mut buffer = self.shared.buffer.lock();
        if buffer.lines.is_empty() || buffer.transmitting {
            return None;
        }
        buffer.transmitting = true;
        let lines = buffer.lines.drain(..).collect();
        Some(Batch {
            lines,
            shared: Arc::clone(&self.shared),
        })
    }

    /// `take` followed by `transmit`; a no-op when nothing can be taken
    pub async fn flush(&self, sink: &dyn BatchSink, encoder: &dyn LineEncoder) -> Result<()> {
        match self.take() {
            Some(batch) => self.transmit(batch, sink, encoder).await,
            None => Ok(()),
        }
    }

    /// Deliver a detached batch, putting it back in front on failure
    ///
    /// A batch the encoder cannot frame would fail the same way on every
    /// flush, so its lines are dropped and counted instead of requeued.
    pub async fn transmit(
        &self,
        mut batch: Batch,
        sink: &dyn BatchSink,
        encoder: &dyn LineEncoder,
    ) -> Result<()> {
        let metrics = self.metrics();
        let payload = match encoder.frame(batch.lines()) {
            Ok(payload) => payload,
            Err(e) => {
                let dropped = batch.consume().len();
                metrics.record_dropped_many(dropped as u64);
                diagnostics::report_error(
                    sink.name(),
                    format!("failed to frame batch, {} lines dropped: {}", dropped, e),
                );
                return Err(e);
            }
        };

        metrics.record_flush();
        tracing::debug!(sink = sink.name(), lines = batch.len(), "flushing batch");

        match self.deliver(&payload, sink).await {
            Ok(()) => {
                metrics.record_delivered(batch.consume().len() as u64);
                Ok(())
            }
            Err(e) => {
                metrics.record_delivery_failure();
                diagnostics::report_error(
                    sink.name(),
                    format!(
                        "giving up after {} attempts, {} lines kept for the next flush: {}",
                        self.config.attempts(),
                        batch.len(),
                        e
                    ),
                );
                Err(e)
            }
        }
    }

    async fn deliver(&self, payload: &str, sink: &dyn BatchSink) -> Result<()> {
        let attempts = self.config.attempts();
        let timeout = self.config.request_timeout();
        let mut attempt = 0;

        loop {
            let result = match tokio::time::timeout(timeout, sink.deliver(payload)).await {
                Ok(result) => result,
                Err(_) => Err(LoggerError::timeout(sink.name(), self.config.request_timeout_ms)),
            };
            let err = match result {
                Ok(()) => return Ok(()),
                Err(e) => e,
            };
            if attempt + 1 >= attempts {
                return Err(err);
            }
            let backoff = self.config.backoff(attempt);
            tracing::debug!(
                sink = sink.name(),
                attempt = attempt + 1,
                backoff_ms = backoff.as_millis() as u64,
                error = %err,
                "delivery failed, retrying"
            );
            self.metrics().record_retry();
            tokio::time::sleep(backoff).await;
            attempt += 1;
        }
    }

    /// Wait until no batch is in flight
    pub async fn idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if !self.is_transmitting() {
                return;
            }
            notified.await;
        }
    }
}

struct Pipeline {
    batcher: Batcher,
    sink: Arc<dyn BatchSink>,
    encoder: Arc<dyn LineEncoder>,
}

impl Pipeline {
    async fn flush(&self) -> Result<()> {
        self.batcher.flush(&*self.sink, &*self.encoder).await
    }

    async fn send(&self, batch: Batch) -> Result<()> {
        self.batcher.transmit(batch, &*self.sink, &*self.encoder).await
    }
}

/// Transport that delivers encoded lines in batches to a [`BatchSink`]
pub struct BatchTransport {
    core: TransportCore,
    pipeline: Arc<Pipeline>,
    timer: Mutex<Option<JoinHandle<()>>>,
    /// Cancelled by `stop()`; a timer is never started afterwards
    shutdown: CancellationToken,
}

impl BatchTransport {
    pub fn new(
        name: impl Into<String>,
        sink: Arc<dyn BatchSink>,
        encoder: Arc<dyn LineEncoder>,
        config: BatchConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            core: TransportCore::new(name, TransportOptions::default()),
            pipeline: Arc::new(Pipeline {
                batcher: Batcher::new(config),
                sink,
                encoder,
            }),
            timer: Mutex::new(None),
            shutdown: CancellationToken::new(),
        })
    }

    #[must_use]
    pub fn with_options(mut self, options: TransportOptions) -> Self {
        self.core = TransportCore::new(self.core.name().to_string(), options);
        self
    }

    #[must_use]
    pub fn with_threshold(self, level: impl Into<LevelRef>) -> Self {
        let mut options = self.core.options().clone();
        options.threshold = Some(level.into());
        self.with_options(options)
    }

    pub fn batcher(&self) -> &Batcher {
        &self.pipeline.batcher
    }

    pub fn metrics(&self) -> &PipelineMetrics {
        self.pipeline.batcher.metrics()
    }

    pub fn content_type(&self) -> &'static str {
        self.pipeline.encoder.content_type()
    }

    fn spawn_send(&self) {
        // Without a runtime the lines wait for the next flush
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        if let Some(batch) = self.pipeline.batcher.take() {
            let pipeline = Arc::clone(&self.pipeline);
            handle.spawn(async move {
                let _ = pipeline.send(batch).await;
            });
        }
    }

    /// Tick `flush()` until shutdown; a flush in progress always completes
    fn start_timer(&self) {
        let mut timer = self.timer.lock();
        if self.shutdown.is_cancelled() {
            return;
        }
        let weak: Weak<Pipeline> = Arc::downgrade(&self.pipeline);
        let period = self.pipeline.batcher.config().flush_interval();
        let shutdown = self.shutdown.clone();
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let Some(pipeline) = weak.upgrade() else {
                    break;
                };
                let _ = pipeline.flush().await;
            }
        });
        if let Some(previous) = timer.replace(task) {
            previous.abort();
        }
    }
}

#[async_trait]
impl Transport for BatchTransport {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    async fn setup(&self) -> Result<()> {
        self.pipeline
            .sink
            .setup()
            .await
            .map_err(|e| LoggerError::setup(self.name(), e.to_string()))?;
        self.start_timer();
        Ok(())
    }

    fn emit(&self, entry: &LogEntry) {
        if !self.accepts(entry.rank) {
            return;
        }
        let settings = self.core.settings();
        let line = match self.pipeline.encoder.encode(entry, &settings) {
            Ok(line) => line,
            Err(e) => {
                diagnostics::report_error(self.name(), format!("failed to encode entry: {}", e));
                return;
            }
        };
        let full = self.pipeline.batcher.push(line);
        if full || settings.levels.meets_flush_threshold(entry.rank) {
            self.spawn_send();
        }
    }

    async fn flush(&self) -> Result<()> {
        self.pipeline.flush().await
    }

    /// Stop the timer, wait for an in-flight batch, then flush what is left
    async fn stop(&self) -> Result<()> {
        let timer = {
            let mut timer = self.timer.lock();
            self.shutdown.cancel();
            timer.take()
        };
        if let Some(timer) = timer {
            let _ = timer.await;
        }
        self.pipeline.batcher.idle().await;
        self.pipeline.flush().await
    }

    fn destroy(&self) {
        self.core.destroy();
        self.shutdown.cancel();
        if let Some(timer) = self.timer.lock().take() {
            timer.abort();
        }
    }
}

impl Drop for BatchTransport {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.get_mut().take() {
            timer.abort();
        }
    }
}
