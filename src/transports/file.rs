//! File sink: appends framed batches to a local file
//!
//! Uses tokio::fs so a slow disk never blocks the emitting thread; lines only
//! touch the file from a flush.

use super::batch::{BatchConfig, BatchSink, BatchTransport, LineEncoder};
use crate::core::{
    EffectiveSettings, FormatContext, LogEntry, LoggerError, OutputFormat, Result,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;

/// Appends newline-terminated lines, creating parent directories on setup
#[derive(Debug)]
pub struct FileSink {
    path: PathBuf,
    name: String,
}

impl FileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = format!("file:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn open(&self) -> Result<tokio::fs::File> {
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                LoggerError::io_operation("opening log file", self.path.display().to_string(), e)
            })
    }
}

#[async_trait]
impl BatchSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn setup(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                LoggerError::io_operation("creating log directory", parent.display().to_string(), e)
            })?;
        }
        self.open().await.map(|_| ())
    }

    async fn deliver(&self, payload: &str) -> Result<()> {
        let mut file = self.open().await?;
        file.write_all(payload.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Encodes entries with a console output format, never coloured
#[derive(Debug, Clone, Copy, Default)]
pub struct FormattedLineEncoder {
    format: OutputFormat,
}

impl FormattedLineEncoder {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl LineEncoder for FormattedLineEncoder {
    fn encode(&self, entry: &LogEntry, settings: &EffectiveSettings) -> Result<String> {
        let show = settings.show.clone().with_color(false);
        let ctx = FormatContext {
            levels: &settings.levels,
            show: &show,
            level_width: settings.level_width,
        };
        Ok(self.format.format(entry, &ctx).replace('\n', "\\n"))
    }
}

impl BatchTransport {
    /// Batched file output in one of the console formats
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rust_log_pipeline::transports::{BatchConfig, BatchTransport};
    /// use rust_log_pipeline::OutputFormat;
    ///
    /// let transport = BatchTransport::file("logs/app.log", OutputFormat::Json, BatchConfig::default())
    ///     .expect("valid batch config");
    /// ```
    pub fn file(path: impl AsRef<Path>, format: OutputFormat, config: BatchConfig) -> Result<Self> {
        let sink = FileSink::new(path);
        let name = sink.name().to_string();
        Self::new(name, Arc::new(sink), Arc::new(FormattedLineEncoder::new(format)), config)
    }
}
