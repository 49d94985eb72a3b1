//! Transport implementations

pub mod batch;
pub mod buffer;
pub mod console;
pub mod file;
pub mod line_protocol;
pub mod network;
pub mod otlp;

pub use batch::{Batch, BatchConfig, BatchSink, BatchTransport, Batcher, LineEncoder};
pub use buffer::{BufferTransport, BufferedEntry};
pub use console::{ConsoleStream, ConsoleTransport, SharedWriter};
pub use file::{FileSink, FormattedLineEncoder};
pub use line_protocol::LineProtocolEncoder;
pub use network::{NetworkConfig, NetworkFormat};
pub use otlp::OtlpEncoder;

#[cfg(feature = "network")]
pub use network::HttpSink;

// Re-export the trait so transports can be implemented from this module alone
pub use crate::core::{Transport, TransportCore, TransportOptions};
