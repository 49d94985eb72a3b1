//! Core pipeline types and traits

pub(crate) mod diagnostics;
pub mod error;
pub mod log_entry;
pub mod log_level;
pub mod log_manager;
pub mod logger;
pub mod message;
pub mod metrics;
pub mod output_format;
pub mod show;
pub mod timestamp;
pub mod transport;
pub mod transport_manager;

pub use error::{LoggerError, Result};
pub use log_entry::{flatten_data, sanitize_line, LogEntry};
pub use log_level::{LevelDef, LevelRef, LevelRegistry, LevelRegistryBuilder, Rank, SeverityOrder};
pub use log_manager::{LogManager, LogManagerBuilder, ManagerConfig, ManagerState, INTERNAL_PKG};
pub use logger::{Logger, LoggerParams, Record};
pub use message::{Message, Render, RenderTarget};
pub use metrics::PipelineMetrics;
pub use output_format::{FormatContext, OutputFormat};
pub use show::{LevelDisplay, ShowOptions};
pub use timestamp::TimestampFormat;
pub use transport::{EffectiveSettings, Transport, TransportCore, TransportOptions, TransportSettings};
pub use transport_manager::TransportManager;
