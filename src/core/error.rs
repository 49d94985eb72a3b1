//! Error types for the log pipeline

pub type Result<T> = std::result::Result<T, LoggerError>;

#[derive(Debug, thiserror::Error)]
pub enum LoggerError {
    /// IO error with context
    #[error("IO error while {operation}: {message}")]
    IoOperation {
        operation: String,
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Invalid regular expression passed to a query
    #[error("Invalid pattern: {0}")]
    PatternError(#[from] regex::Error),

    /// HTTP client error
    #[cfg(feature = "network")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Level name not present in the registry
    #[error("Unknown log level '{0}'")]
    UnknownLevel(String),

    /// Rank not present in the registry
    #[error("No log level registered with rank {0}")]
    UnknownRank(i32),

    /// Invalid configuration with details
    #[error("Invalid configuration for {component}: {message}")]
    InvalidConfiguration { component: String, message: String },

    /// Transport failed to become ready
    #[error("Transport '{transport}' failed to set up: {message}")]
    TransportSetup { transport: String, message: String },

    /// A batch could not be delivered
    #[error("Delivery to {sink} failed: {message}")]
    Delivery { sink: String, message: String },

    /// A delivery attempt exceeded its timeout
    #[error("Delivery to {sink} timed out after {timeout_ms}ms")]
    Timeout { sink: String, timeout_ms: u64 },

    /// Buffer transport assertion failed
    #[error("{message}\ncaptured messages:\n{dump}")]
    Assertion { message: String, dump: String },

    /// Manager already stopped
    #[error("Log manager already stopped")]
    ManagerStopped,

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl LoggerError {
    /// Create an IO operation error with context
    pub fn io_operation(
        operation: impl Into<String>,
        message: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        LoggerError::IoOperation {
            operation: operation.into(),
            message: message.into(),
            source,
        }
    }

    /// Create an invalid configuration error
    pub fn config(component: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::InvalidConfiguration {
            component: component.into(),
            message: message.into(),
        }
    }

    /// Create a transport setup error
    pub fn setup(transport: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::TransportSetup {
            transport: transport.into(),
            message: message.into(),
        }
    }

    /// Create a delivery error
    pub fn delivery(sink: impl Into<String>, message: impl Into<String>) -> Self {
        LoggerError::Delivery {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Create a delivery timeout error
    pub fn timeout(sink: impl Into<String>, timeout_ms: u64) -> Self {
        LoggerError::Timeout {
            sink: sink.into(),
            timeout_ms,
        }
    }

    /// Create an assertion error carrying the captured messages
    pub fn assertion(message: impl Into<String>, dump: impl Into<String>) -> Self {
        LoggerError::Assertion {
            message: message.into(),
            dump: dump.into(),
        }
    }

    /// Create a generic error
    pub fn other<S: Into<String>>(msg: S) -> Self {
        LoggerError::Other(msg.into())
    }
}
