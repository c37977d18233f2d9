// Tracing log adapter - Structured logging using tracing crate

use async_trait::async_trait;
use tracing::{debug, error, info, trace, warn};

use crate::ports::*;

/// Forwards `LogPort` calls to `tracing`
///
/// Filtering beyond `min_level` is left to the installed subscriber.
pub struct TracingLogAdapter {
    min_level: LogLevel,
}

impl TracingLogAdapter {
    pub fn new() -> Self {
        Self::with_level(LogLevel::Trace)
    }

    pub fn with_level(min_level: LogLevel) -> Self {
        Self { min_level }
    }

    fn should_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }
}

impl Default for TracingLogAdapter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LogPort for TracingLogAdapter {
    async fn info(&self, message: &str) {
        if self.should_log(LogLevel::Info) {
            info!("{}", message);
        }
    }

    async fn warn(&self, message: &str) {
        if self.should_log(LogLevel::Warn) {
            warn!("{}", message);
        }
    }

    async fn error(&self, message: &str) {
        if self.should_log(LogLevel::Error) {
            error!("{}", message);
        }
    }

    async fn debug(&self, message: &str) {
        if self.should_log(LogLevel::Debug) {
            debug!("{}", message);
        }
    }

    async fn log_event(&self, event: &LogEvent) {
        if !self.should_log(event.level) {
            return;
        }

        let mut context: Vec<_> = event.context.iter().collect();
        context.sort();
        match event.level {
            LogLevel::Error => error!(message = %event.message, ?context),
            LogLevel::Warn => warn!(message = %event.message, ?context),
            LogLevel::Info => info!(message = %event.message, ?context),
            LogLevel::Debug => debug!(message = %event.message, ?context),
            LogLevel::Trace => trace!(message = %event.message, ?context),
        }
    }
}
