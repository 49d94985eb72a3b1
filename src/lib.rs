//! # Rust Log Pipeline
//!
//! A structured logging pipeline: leveled, hierarchical entries delivered to
//! one or more transports, each with its own threshold, formatting and
//! readiness.
//!
//! ## Features
//!
//! - **Custom Levels**: ordered level registry with colours, icons and a flush threshold
//! - **Logger Hierarchy**: child loggers inherit package chain, ids and indentation
//! - **Ordered Startup**: entries logged before transports are ready are queued, never lost
//! - **Batched Delivery**: file and HTTP transports with timed flush and retry with backoff
//! - **Network Formats**: line protocol and OTLP log records
//!
//! ## Example
//!
//! ```
//! use rust_log_pipeline::prelude::*;
//! use std::sync::Arc;
//!
//! # tokio_test::block_on(async {
//! let buffer = Arc::new(BufferTransport::new());
//! let manager = LogManager::builder()
//!     .threshold("debug")
//!     .transport(buffer.clone())
//!     .build()?;
//! manager.start().await?;
//!
//! let logger = manager.get_logger(LoggerParams::new().pkg("app"));
//! let db = logger.get_child(LoggerParams::new().pkg("db"));
//! db.at("debug")?.message("connected").data(&serde_json::json!({"pool": 4})).emit();
//!
//! buffer.assert_last_level("debug")?;
//! assert_eq!(buffer.last().unwrap().pkg_chain.as_deref(), Some("app.db"));
//! manager.stop().await?;
//! # Ok::<(), LoggerError>(())
//! # }).unwrap();
//! ```

pub mod core;
pub mod macros;
pub mod transports;

pub mod prelude {
    pub use crate::core::{
        LevelDef, LevelDisplay, LevelRef, LevelRegistry, LogEntry, LogManager, LogManagerBuilder,
        Logger, LoggerError, LoggerParams, ManagerConfig, ManagerState, Message, OutputFormat,
        PipelineMetrics, Rank, Record, Result, SeverityOrder, ShowOptions, TimestampFormat,
        Transport,
    };
    pub use crate::transports::{
        BatchConfig, BatchTransport, BufferTransport, ConsoleStream, ConsoleTransport,
        NetworkConfig, NetworkFormat,
    };
}

pub use crate::core::{
    LevelDef, LevelDisplay, LevelRef, LevelRegistry, LogEntry, LogManager, LogManagerBuilder,
    Logger, LoggerError, LoggerParams, ManagerConfig, ManagerState, Message, OutputFormat,
    PipelineMetrics, Rank, Record, Render, RenderTarget, Result, SeverityOrder, ShowOptions,
    TimestampFormat, Transport,
};
pub use transports::{BatchTransport, BufferTransport, ConsoleTransport};
