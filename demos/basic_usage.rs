//! Basic pipeline usage example
//!
//! Demonstrates the console transport, child loggers, indentation and
//! threshold changes.
//!
//! Run with: cargo run --example basic_usage

use rust_log_pipeline::prelude::*;
use std::time::{Duration, Instant};

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Rust Log Pipeline - Basic Usage Example ===\n");

    let manager = LogManager::from_config(ManagerConfig::from_env())?;
    let root = manager.get_logger(LoggerParams::new().pkg("demo"));

    // Logged before start: queued and delivered once the console is ready
    root.info("pipeline created");

    // No transport registered, so start() installs a console transport
    manager.start().await?;

    println!("\n1. Logging at different levels (threshold info):");
    root.error("This is an error message");
    root.warn("This is a warning message");
    root.info("This is an info message");
    root.verbose("This verbose message is hidden");

    println!("\n2. Child loggers and indentation:");
    let mut install = root.get_child(LoggerParams::new().pkg("install").request_id("req-42"));
    install.info("resolving packages");
    install.indent("  ");
    install.info("left-pad@1.3.0");
    install.outdent();

    let started = Instant::now();
    tokio::time::sleep(Duration::from_millis(15)).await;
    install
        .at("info")?
        .data(&serde_json::json!({"packages": 1}))
        .since(started)
        .emit_with("done");

    println!("\n3. Lowering the threshold to debug:");
    manager.set_threshold("debug")?;
    root.debug("debug output is now visible");

    println!("\n4. Icons instead of names, with timestamps:");
    manager.set_show(
        ShowOptions::default()
            .with_level(LevelDisplay::Icon)
            .with_timestamp(Some(TimestampFormat::TimeOnly)),
    );
    root.warn("icons make scanning easier");

    manager.stop().await?;
    println!("\n=== Example completed successfully! ===");
    Ok(())
}
