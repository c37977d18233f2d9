//! Logging setup and progress reporting

use std::time::Instant;

use tracing_subscriber::EnvFilter;

use crate::error::{StudioError, StudioResult};

/// Logging configuration options
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `videostudio=debug`
    pub level: String,
    /// Emit JSON lines instead of human-readable text
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Logging system manager
pub struct LoggingSystem {
    config: LoggingConfig,
}

impl LoggingSystem {
    pub fn new(config: LoggingConfig) -> Self {
        Self { config }
    }

    /// Install the global subscriber. `RUST_LOG` wins over the configured level.
    pub fn initialize(&self) -> StudioResult<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.config.level))
            .map_err(|e| StudioError::Config {
                message: format!("Invalid log level '{}': {}", self.config.level, e),
            })?;

        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr);

        // A subscriber may already be installed (tests, embedding); keep it.
        let installed = if self.config.json {
            builder.json().try_init().is_ok()
        } else {
            builder.with_target(false).try_init().is_ok()
        };

        if installed {
            tracing::debug!(
                level = %self.config.level,
                json = self.config.json,
                "Logging system initialized"
            );
        }
        Ok(())
    }
}

/// Logs progress of a long-running operation in coarse steps
pub struct ProgressReporter {
    operation: String,
    start_time: Instant,
    step: f64,
    last_reported: Option<f64>,
}

impl ProgressReporter {
    /// Report every `step` percent
    pub fn new(operation: impl Into<String>, step: f64) -> Self {
        let operation = operation.into();
        tracing::info!("Starting: {}", operation);
        Self {
            operation,
            start_time: Instant::now(),
            step: step.max(1.0),
            last_reported: None,
        }
    }

    /// Feed a percentage in `[0, 100]`
    pub fn update(&mut self, percent: f64) {
        let bucket = (percent / self.step).floor() * self.step;
        if self.last_reported.map_or(true, |last| bucket > last) {
            self.last_reported = Some(bucket);
            let elapsed = self.start_time.elapsed().as_secs_f64();
            if percent > 0.0 && percent < 100.0 {
                let eta = elapsed * (100.0 - percent) / percent;
                tracing::info!("[{:>3.0}%] {} (ETA: {:.0}s)", percent, self.operation, eta);
            } else {
                tracing::info!("[{:>3.0}%] {}", percent, self.operation);
            }
        }
    }

    /// Close the operation
    pub fn finish(self, success: bool) {
        let status = if success { "completed" } else { "failed" };
        tracing::info!(
            "{} {} in {:.2}s",
            self.operation,
            status,
            self.start_time.elapsed().as_secs_f64()
        );
    }
}
