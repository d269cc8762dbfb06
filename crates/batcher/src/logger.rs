//! `tracing`-backed [`Logger`] used when the caller does not supply one.

use microbatch_core::{LogLevel, Logger};

/// Default sink: forwards diagnostics to `tracing`.
#[derive(Debug, Default, Copy, Clone)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "microbatch", "{message}"),
            LogLevel::Info => tracing::info!(target: "microbatch", "{message}"),
            LogLevel::Warning => tracing::warn!(target: "microbatch", "{message}"),
            LogLevel::Error => tracing::error!(target: "microbatch", "{message}"),
            LogLevel::Fatal => tracing::error!(target: "microbatch", fatal = true, "{message}"),
        }
    }
}
