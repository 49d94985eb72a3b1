//! Logging macros with `format!`-style arguments.
//!
//! The message is only formatted when some transport would accept the level.
//!
//! # Examples
//!
//! ```
//! use rust_log_pipeline::prelude::*;
//! use rust_log_pipeline::info;
//!
//! let manager = LogManager::new();
//! let logger = manager.root_logger();
//!
//! let port = 8080;
//! info!(logger, "listening on port {}", port);
//! assert_eq!(manager.pending_len(), 1);
//! ```

/// Log at any registered level.
///
/// Evaluates to `Option<Arc<LogEntry>>`, `None` when nothing would accept it
/// or the level is not registered.
///
/// ```
/// # use rust_log_pipeline::prelude::*;
/// use rust_log_pipeline::log;
/// let manager = LogManager::new();
/// let logger = manager.root_logger();
/// assert!(log!(logger, "warn", "disk at {}%", 91).is_some());
/// assert!(log!(logger, "debug", "hidden").is_none());
/// ```
#[macro_export]
macro_rules! log {
    ($logger:expr, $level:expr, $($arg:tt)+) => {{
        let __logger = &$logger;
        let __level: $crate::LevelRef = ::std::convert::Into::into($level);
        // unknown levels still go through `log` so they get reported
        if __logger.is_enabled(__level.clone())
            || __logger.manager().levels().get(__level.clone()).is_err()
        {
            __logger.log(__level, format!($($arg)+))
        } else {
            None
        }
    }};
}

#[macro_export]
macro_rules! trace {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, "trace", $($arg)+)
    };
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, "debug", $($arg)+)
    };
}

#[macro_export]
macro_rules! verbose {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, "verbose", $($arg)+)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, "info", $($arg)+)
    };
}

#[macro_export]
macro_rules! warn {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, "warn", $($arg)+)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::log!($logger, "error", $($arg)+)
    };
}

#[cfg(test)]
mod tests {
    use crate::core::{LogManager, LoggerParams};

    #[test]
    fn test_macros_queue_enabled_levels_only() {
        let manager = LogManager::builder().threshold("verbose").build().unwrap();
        let logger = manager.get_logger(LoggerParams::new().pkg("macros"));

        assert!(error!(logger, "code {}", 500).is_some());
        assert!(warn!(logger, "retry {} of {}", 1, 3).is_some());
        assert!(info!(logger, "items: {}", 100).is_some());
        assert!(verbose!(logger, "detail").is_some());
        assert!(debug!(logger, "count: {}", 5).is_none());
        assert!(trace!(logger, "value: {}", 10).is_none());
        assert_eq!(manager.pending_len(), 4);
    }

    #[test]
    fn test_log_macro_message_is_formatted() {
        let manager = LogManager::new();
        let logger = manager.root_logger();
        let entry = log!(logger, "info", "{}-{}", "a", 1).unwrap();
        assert_eq!(entry.plain_message(), "a-1");
        assert!(log!(logger, "unknown", "x").is_none());
    }
}
