//! Diagnostic sink seam.

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Severity of a diagnostic event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Fatal,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogLevel::Debug => "Debug",
            LogLevel::Info => "Info",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Fatal => "Fatal",
        };
        f.write_str(s)
    }
}

/// Receives leveled diagnostics from the batcher.
///
/// Fire-and-forget: implementations must not block or panic.
pub trait Logger: Send + Sync + 'static {
    fn log(&self, level: LogLevel, message: &str);
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, level: LogLevel, message: &str) {
        (**self).log(level, message)
    }
}

/// Discards everything.
#[derive(Debug, Default, Copy, Clone)]
pub struct NoopLogger;

impl Logger for NoopLogger {
    fn log(&self, _level: LogLevel, _message: &str) {}
}
