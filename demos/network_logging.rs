//! Network logging example
//!
//! Demonstrates batched delivery to an HTTP endpoint as line protocol or
//! OTLP log records. Point `LOG_ENDPOINT` at a collector to see the batches
//! arrive; without one the failures are reported on stderr and the lines are
//! kept for the next flush.
//!
//! Run with: cargo run --example network_logging

use rust_log_pipeline::prelude::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Rust Log Pipeline - Network Logging Example ===\n");

    let endpoint = std::env::var("LOG_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4318/v1/logs".to_string());
    let format = match std::env::var("LOG_FORMAT").as_deref() {
        Ok("line_protocol") => NetworkFormat::default(),
        _ => NetworkFormat::Otlp {
            service_name: "network-demo".to_string(),
        },
    };
    println!("1. Sending {:?} batches to {}", format, endpoint);

    let config = NetworkConfig::new(endpoint, format)
        .with_header("x-demo", "network_logging")
        .with_batch(BatchConfig {
            batch_size: 10,
            flush_interval_ms: 500,
            max_retries: 2,
            request_timeout_ms: 2000,
            ..BatchConfig::default()
        });
    let network = Arc::new(BatchTransport::network(config)?);

    let manager = LogManager::builder()
        .transport(Arc::new(ConsoleTransport::new()))
        .transport(network.clone())
        .build()?;
    manager.start().await?;

    let api = manager.get_logger(
        LoggerParams::new()
            .pkg("api")
            .session_id("session-7")
            .request_id("req-1001"),
    );
    for i in 0..25 {
        api.at("info")?
            .data(&serde_json::json!({"item": i}))
            .emit_with(format!("processed item {}", i));
    }
    api.error("upstream returned 503");

    println!("\n2. Waiting for the flush timer...");
    tokio::time::sleep(Duration::from_millis(800)).await;

    if let Err(e) = manager.stop().await {
        println!("   final flush failed: {}", e);
    }

    let metrics = network.metrics();
    println!("\n3. Delivery summary:");
    println!("   batches sent:      {}", metrics.flushes());
    println!("   lines delivered:   {}", metrics.delivered_lines());
    println!("   retries:           {}", metrics.retries());
    println!("   failed flushes:    {}", metrics.delivery_failures());
    println!("   still buffered:    {}", network.batcher().len());

    println!("\n=== Example completed successfully! ===");
    Ok(())
}
