//! Console transport implementation

use crate::core::diagnostics;
use crate::core::{
    LevelRef, LogEntry, OutputFormat, Result, ShowOptions, Transport, TransportCore,
    TransportOptions,
};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::Arc;

/// Standard stream the console transport writes to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleStream {
    #[default]
    Stdout,
    Stderr,
}

pub type SharedWriter = Arc<Mutex<dyn Write + Send>>;

enum Target {
    Stream(ConsoleStream),
    Writer(SharedWriter),
}

/// Formats each entry synchronously and writes one line
///
/// The destination is fixed per transport; entry severity never changes it.
pub struct ConsoleTransport {
    core: TransportCore,
    format: OutputFormat,
    target: Target,
}

impl ConsoleTransport {
    pub fn new() -> Self {
        Self {
            core: TransportCore::new("console", TransportOptions::default()),
            format: OutputFormat::default(),
            target: Target::Stream(ConsoleStream::Stdout),
        }
    }

    /// Set the output format for this transport
    ///
    /// # Example
    ///
    /// ```
    /// use rust_log_pipeline::transports::ConsoleTransport;
    /// use rust_log_pipeline::OutputFormat;
    ///
    /// let console = ConsoleTransport::new().with_format(OutputFormat::Json);
    /// ```
    #[must_use]
    pub fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    #[must_use]
    pub fn with_stream(mut self, stream: ConsoleStream) -> Self {
        self.target = Target::Stream(stream);
        self
    }

    /// Write into a shared writer instead of a standard stream
    #[must_use]
    pub fn with_writer(mut self, writer: SharedWriter) -> Self {
        self.target = Target::Writer(writer);
        self
    }

    #[must_use]
    pub fn with_name(self, name: impl Into<String>) -> Self {
        let options = self.core.options().clone();
        self.rebuild(name.into(), options)
    }

    /// Local threshold; overrides the manager's
    #[must_use]
    pub fn with_threshold(self, level: impl Into<LevelRef>) -> Self {
        let mut options = self.core.options().clone();
        options.threshold = Some(level.into());
        let name = self.core.name().to_string();
        self.rebuild(name, options)
    }

    /// Local display options; the manager's `set_show` no longer applies
    #[must_use]
    pub fn with_show(self, show: ShowOptions) -> Self {
        let mut options = self.core.options().clone();
        options.show = Some(show);
        let name = self.core.name().to_string();
        self.rebuild(name, options)
    }

    fn rebuild(mut self, name: String, options: TransportOptions) -> Self {
        self.core = TransportCore::new(name, options);
        self
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        match self.target {
            Target::Stream(ConsoleStream::Stdout) => writeln!(io::stdout().lock(), "{}", line),
            Target::Stream(ConsoleStream::Stderr) => writeln!(io::stderr().lock(), "{}", line),
            Target::Writer(ref writer) => writeln!(writer.lock(), "{}", line),
        }
    }
}

impl Default for ConsoleTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    fn emit(&self, entry: &LogEntry) {
        if !self.accepts(entry.rank) {
            return;
        }
        let settings = self.core.settings();
        let line = self.format.format(entry, &settings.format_context());
        if let Err(e) = self.write_line(&line) {
            diagnostics::report_error(self.name(), format!("write failed: {}", e));
        }
    }

    async fn flush(&self) -> Result<()> {
        match self.target {
            Target::Stream(ConsoleStream::Stdout) => io::stdout().flush()?,
            Target::Stream(ConsoleStream::Stderr) => io::stderr().flush()?,
            Target::Writer(ref writer) => writer.lock().flush()?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{LevelDisplay, TransportSettings};

    fn captured(console: ConsoleTransport) -> (ConsoleTransport, Arc<Mutex<Vec<u8>>>) {
        let sink = Arc::new(Mutex::new(Vec::new()));
        (console.with_writer(sink.clone()), sink)
    }

    fn text(sink: &Arc<Mutex<Vec<u8>>>) -> String {
        String::from_utf8(sink.lock().clone()).unwrap()
    }

    fn plain_show() -> ShowOptions {
        ShowOptions::default().with_color(false)
    }

    #[test]
    fn test_text_line() {
        let (console, sink) = captured(ConsoleTransport::new().with_show(plain_show()));
        let entry = LogEntry::new("warn", 1, "disk almost full")
            .with_pkg_chain("app.fs")
            .with_elapsed_ms(12);
        console.emit(&entry);
        assert_eq!(text(&sink), "warn  app.fs disk almost full (+12ms)\n");
    }

    #[test]
    fn test_threshold_filters() {
        let (console, sink) = captured(ConsoleTransport::new().with_show(plain_show()));
        console.emit(&LogEntry::new("debug", 4, "hidden"));
        assert!(text(&sink).is_empty());
    }

    #[test]
    fn test_json_format() {
        let (console, sink) = captured(
            ConsoleTransport::new()
                .with_format(OutputFormat::Json)
                .with_show(plain_show()),
        );
        console.emit(&LogEntry::new("error", 0, "boom").with_request_id("r1"));

        let out = text(&sink);
        let value: serde_json::Value = serde_json::from_str(out.trim_end()).unwrap();
        assert_eq!(value["level"], "error");
        assert_eq!(value["message"], "boom");
        assert!(value.get("requestId").is_none());
    }

    #[test]
    fn test_show_follows_manager_unless_overridden() {
        let (console, sink) = captured(ConsoleTransport::new());
        let mut settings = TransportSettings::default();
        settings.show = plain_show().with_level(LevelDisplay::Hidden);
        console.configure(&settings).unwrap();

        console.emit(&LogEntry::new("info", 2, "bare"));
        assert_eq!(text(&sink), "bare\n");

        let (pinned, sink) = captured(ConsoleTransport::new().with_show(plain_show()));
        pinned.configure(&settings).unwrap();
        pinned.emit(&LogEntry::new("info", 2, "padded"));
        assert_eq!(text(&sink), "info  padded\n");
    }

    #[test]
    fn test_builders_keep_name_and_threshold() {
        let console = ConsoleTransport::new()
            .with_threshold("error")
            .with_name("stderr")
            .with_stream(ConsoleStream::Stderr);
        assert_eq!(console.name(), "stderr");
        assert!(console.accepts(0));
        assert!(!console.accepts(1));
    }
}
