//! File logging example
//!
//! Demonstrates logging to the console and a batched file transport at the
//! same time.
//!
//! Run with: cargo run --example file_logging

use rust_log_pipeline::prelude::*;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Rust Log Pipeline - File Logging Example ===\n");

    let path = std::env::temp_dir().join("rust_log_pipeline/application.log");
    let file = Arc::new(
        BatchTransport::file(
            &path,
            OutputFormat::Json,
            BatchConfig {
                batch_size: 5,
                flush_interval_ms: 1000,
                ..BatchConfig::default()
            },
        )?
        .with_threshold("debug"),
    );

    let manager = LogManager::builder()
        .transport(Arc::new(ConsoleTransport::new()))
        .transport(file.clone())
        .build()?;
    manager.start().await?;

    println!("1. Logging to both console and file:");
    let app = manager.get_logger(LoggerParams::new().pkg("app").session_id("s-1"));
    app.info("Application started");
    app.debug("Loading configuration...");
    app.info("Configuration loaded successfully");
    app.warn("Using default settings for some options");

    let db = app.get_child(LoggerParams::new().pkg("db"));
    db.info("Connecting to database...");
    db.at("info")?
        .data(&serde_json::json!({"pool": 8, "host": "localhost"}))
        .emit_with("Database connection established");
    app.error("Failed to load optional plugin");

    manager.stop().await?;

    println!("\n2. File contents ({}):", path.display());
    let content = tokio::fs::read_to_string(&path).await?;
    for line in content.lines() {
        println!("   {}", line);
    }
    println!(
        "\n   delivered {} lines in {} batches",
        file.metrics().delivered_lines(),
        file.metrics().flushes()
    );

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
