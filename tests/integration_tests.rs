//! Integration tests for the log pipeline
//!
//! These tests verify:
//! - Ordering of entries logged before transports are ready
//! - Global and per-transport thresholds
//! - Logger hierarchy isolation
//! - Manager lifecycle (double start, stop, setup failures)
//! - Batched file and network delivery end to end

use async_trait::async_trait;
use rust_log_pipeline::core::{LevelDef, TransportCore, TransportOptions};
use rust_log_pipeline::prelude::*;
use rust_log_pipeline::transports::{BatchSink, LineEncoder};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn buffered_manager(threshold: &str) -> (LogManager, Arc<BufferTransport>) {
    let buffer = Arc::new(BufferTransport::new());
    let manager = LogManager::builder()
        .threshold(threshold)
        .transport(buffer.clone())
        .build()
        .expect("valid manager config");
    (manager, buffer)
}

#[tokio::test]
async fn test_pre_ready_entries_keep_emission_order() {
    let fast = Arc::new(BufferTransport::new().with_name("fast"));
    let slow = Arc::new(
        BufferTransport::new()
            .with_name("slow")
            .with_setup_delay(Duration::from_millis(30)),
    );
    let manager = LogManager::builder()
        .transport(fast.clone())
        .transport(slow.clone())
        .build()
        .unwrap();

    let logger = manager.root_logger();
    let expected: Vec<String> = (0..20).map(|i| format!("message {}", i)).collect();
    for message in &expected[..10] {
        logger.info(message.as_str());
    }

    let starter = manager.clone();
    let start = tokio::spawn(async move { starter.start().await });
    for message in &expected[10..] {
        logger.info(message.as_str());
        tokio::task::yield_now().await;
    }
    start.await.unwrap().unwrap();

    assert_eq!(fast.messages(), expected);
    assert_eq!(slow.messages(), expected);
    assert_eq!(manager.pending_len(), 0);
}

#[tokio::test]
async fn test_custom_registry_threshold() {
    let levels = LevelRegistry::builder()
        .level(LevelDef::new("ERROR", 0, "red"))
        .level(LevelDef::new("WARN", 1, "yellow"))
        .level(LevelDef::new("INFO", 2, "green"))
        .level(LevelDef::new("DEBUG", 3, "blue"))
        .build()
        .unwrap();
    let buffer = Arc::new(BufferTransport::new());
    let manager = LogManager::builder()
        .levels(levels)
        .threshold("INFO")
        .transport(buffer.clone())
        .build()
        .unwrap();
    manager.start().await.unwrap();

    let logger = manager.root_logger();
    assert!(logger.log("DEBUG", "not captured").is_none());
    assert!(logger.log("WARN", "captured").is_some());

    buffer.assert_count(1).unwrap();
    buffer.assert_last_level("WARN").unwrap();
}

#[tokio::test]
async fn test_higher_is_more_severe_registry() {
    let levels = LevelRegistry::builder()
        .order(SeverityOrder::HigherIsMoreSevere)
        .level(LevelDef::new("low", 10, "white"))
        .level(LevelDef::new("mid", 20, "yellow"))
        .level(LevelDef::new("high", 30, "red"))
        .build()
        .unwrap();
    let buffer = Arc::new(BufferTransport::new());
    let manager = LogManager::builder()
        .levels(levels)
        .threshold("mid")
        .transport(buffer.clone())
        .build()
        .unwrap();
    manager.start().await.unwrap();

    let logger = manager.root_logger();
    logger.log("low", "quiet");
    logger.log("mid", "normal");
    logger.log("high", "loud");

    assert_eq!(buffer.messages(), vec!["normal", "loud"]);
}

#[tokio::test]
async fn test_child_loggers_do_not_share_state() {
    let (manager, buffer) = buffered_manager("info");
    manager.start().await.unwrap();

    let mut parent = manager.get_logger(LoggerParams::new().pkg("cli").session_id("s-1"));
    parent.indent("> ");
    let mut child = parent.get_child(LoggerParams::new().pkg("install"));
    child.indent("> ");
    parent.outdent();

    parent.info("parent");
    child.info("child");

    let entries = buffer.entries();
    assert_eq!(entries[0].message, "parent");
    assert_eq!(entries[0].pkg_chain.as_deref(), Some("cli"));
    assert_eq!(entries[1].message, "> > child");
    assert_eq!(entries[1].pkg_chain.as_deref(), Some("cli.install"));
    assert_eq!(child.session_id(), Some("s-1"));
}

#[tokio::test]
async fn test_double_start_is_a_warning() {
    let (manager, buffer) = buffered_manager("info");
    manager.start().await.unwrap();
    manager.start().await.unwrap();

    buffer.assert_last_level("warn").unwrap();
    buffer.assert_contains("more than once").unwrap();
}

#[tokio::test]
async fn test_stop_then_log_is_dropped() {
    let (manager, buffer) = buffered_manager("info");
    manager.start().await.unwrap();
    manager.root_logger().info("kept");
    manager.stop().await.unwrap();
    manager.root_logger().info("dropped");

    assert_eq!(buffer.messages(), vec!["kept"]);
    assert_eq!(manager.state(), ManagerState::Stopped);
    assert_eq!(manager.metrics().dropped(), 1);
    // stopping again is harmless
    manager.stop().await.unwrap();
}

struct FailingSetup {
    core: TransportCore,
}

#[async_trait]
impl Transport for FailingSetup {
    fn core(&self) -> &TransportCore {
        &self.core
    }

    async fn setup(&self) -> Result<()> {
        Err(LoggerError::other("connection refused"))
    }

    fn emit(&self, _entry: &LogEntry) {
        panic!("a transport that failed setup must never receive entries");
    }
}

#[tokio::test]
async fn test_failed_setup_removes_transport_and_keeps_others() {
    let good = Arc::new(BufferTransport::new());
    let manager = LogManager::builder()
        .transport(good.clone())
        .transport(Arc::new(FailingSetup {
            core: TransportCore::new("broken", TransportOptions::default()),
        }))
        .build()
        .unwrap();
    manager.root_logger().info("queued");

    let err = manager.start().await.unwrap_err();
    assert!(matches!(err, LoggerError::TransportSetup { ref transport, .. } if transport == "broken"));
    assert_eq!(manager.transport_names(), vec!["buffer"]);
    assert_eq!(manager.state(), ManagerState::Running);

    manager.root_logger().info("live");
    assert_eq!(good.messages(), vec!["queued", "live"]);
}

#[tokio::test]
async fn test_show_changes_reach_console() {
    let sink = Arc::new(parking_lot::Mutex::new(Vec::<u8>::new()));
    let console = Arc::new(ConsoleTransport::new().with_writer(sink.clone()));
    let manager = LogManager::builder()
        .show(ShowOptions::default().with_color(false))
        .transport(console)
        .build()
        .unwrap();
    manager.start().await.unwrap();

    let logger = manager.get_logger(LoggerParams::new().pkg("web"));
    logger.info("first");
    manager.set_show(
        ShowOptions::default()
            .with_color(false)
            .with_level(LevelDisplay::Icon),
    );
    logger.warn("second");

    let out = String::from_utf8(sink.lock().clone()).unwrap();
    assert_eq!(out, "info  web first\n⚠ web second\n");
}

#[tokio::test]
async fn test_file_transport_through_manager() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("logs/app.log");

    let file = Arc::new(
        BatchTransport::file(&log_file, OutputFormat::Json, BatchConfig::default()).unwrap(),
    );
    let manager = LogManager::builder()
        .transport(file.clone())
        .build()
        .unwrap();
    manager.start().await.unwrap();

    let logger = manager.get_logger(LoggerParams::new().pkg("job").request_id("r-1"));
    logger.info("User login\nERROR fake entry");
    logger
        .at("warn")
        .unwrap()
        .data(&serde_json::json!({"retries": 2}))
        .emit_with("slow");
    manager.stop().await.unwrap();

    let content = tokio::fs::read_to_string(&log_file).await.unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 2, "one line per entry: {:?}", lines);

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["message"], "User login\nERROR fake entry");
    assert_eq!(first["pkg"], "job");
    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["data"]["retries"], 2);
    assert_eq!(file.metrics().delivered_lines(), 2);
}

struct CountingSink {
    deliveries: AtomicUsize,
    lines: parking_lot::Mutex<Vec<String>>,
}

#[async_trait]
impl BatchSink for CountingSink {
    fn name(&self) -> &str {
        "counting"
    }

    async fn deliver(&self, payload: &str) -> Result<()> {
        self.deliveries.fetch_add(1, Ordering::SeqCst);
        self.lines
            .lock()
            .extend(payload.lines().map(str::to_string));
        Ok(())
    }
}

struct PlainEncoder;

impl LineEncoder for PlainEncoder {
    fn encode(
        &self,
        entry: &LogEntry,
        _settings: &rust_log_pipeline::core::EffectiveSettings,
    ) -> Result<String> {
        Ok(entry.plain_message())
    }
}

#[tokio::test]
async fn test_batch_size_triggers_single_flush() {
    let sink = Arc::new(CountingSink {
        deliveries: AtomicUsize::new(0),
        lines: parking_lot::Mutex::new(Vec::new()),
    });
    let transport = Arc::new(
        BatchTransport::new(
            "counting",
            sink.clone(),
            Arc::new(PlainEncoder),
            BatchConfig {
                batch_size: 2,
                flush_interval_ms: 3_600_000,
                ..BatchConfig::default()
            },
        )
        .unwrap(),
    );
    let manager = LogManager::builder()
        .transport(transport.clone())
        .build()
        .unwrap();
    manager.start().await.unwrap();

    let logger = manager.root_logger();
    logger.info("a");
    logger.info("b");
    logger.info("c");
    tokio::time::sleep(Duration::from_millis(20)).await;

    assert_eq!(sink.deliveries.load(Ordering::SeqCst), 1);
    assert_eq!(transport.batcher().pending(), vec!["c"]);

    manager.stop().await.unwrap();
    assert_eq!(sink.deliveries.load(Ordering::SeqCst), 2);
    assert_eq!(*sink.lines.lock(), vec!["a", "b", "c"]);
}

#[derive(Default)]
struct SlowSetupSink {
    payloads: parking_lot::Mutex<Vec<String>>,
}

#[async_trait]
impl BatchSink for SlowSetupSink {
    fn name(&self) -> &str {
        "slow-setup"
    }

    async fn setup(&self) -> Result<()> {
        tokio::time::sleep(Duration::from_millis(500)).await;
        Ok(())
    }

    async fn deliver(&self, payload: &str) -> Result<()> {
        self.payloads.lock().push(payload.to_string());
        Ok(())
    }
}

#[tokio::test(start_paused = true)]
async fn test_stop_during_start_leaves_no_flush_timer() {
    let sink = Arc::new(SlowSetupSink::default());
    let transport = Arc::new(
        BatchTransport::new(
            "slow-setup",
            sink.clone(),
            Arc::new(PlainEncoder),
            BatchConfig {
                flush_interval_ms: 1000,
                ..BatchConfig::default()
            },
        )
        .unwrap(),
    );
    let manager = LogManager::builder()
        .transport(transport.clone())
        .build()
        .unwrap();

    let starter = manager.clone();
    let start = tokio::spawn(async move { starter.start().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    manager.stop().await.unwrap();
    start.await.unwrap().unwrap();
    assert_eq!(manager.state(), ManagerState::Stopped);

    transport.emit(&LogEntry::new("info", 2, "after stop"));
    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(sink.payloads.lock().is_empty());
    assert_eq!(transport.batcher().pending(), vec!["after stop"]);
}
