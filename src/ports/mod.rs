// Ports - Interface definitions (contracts)

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::errors::*;
use crate::domain::model::*;

/// Failure reported by a transcoding engine implementation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineFault {
    /// The engine core could not be found or started
    #[error("engine unavailable: {0}")]
    Unavailable(String),
    /// A named file does not exist in the engine filesystem
    #[error("no such file in engine filesystem: {0}")]
    NotFound(String),
    /// The name is not a plain engine-local file name
    #[error("invalid engine file name: {0:?}")]
    InvalidName(String),
    /// The engine filesystem rejected a read or write
    #[error("engine filesystem error: {0}")]
    Io(String),
    /// The engine aborted while running a command
    #[error("engine crashed: {0}")]
    Crashed(String),
}

/// Event emitted by the engine while a command runs
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// One line of engine diagnostic output
    Log(String),
    /// Completed fraction of the running command, in `[0, 1]`
    Progress(f64),
}

/// Sink the engine reports events into during `exec`
pub type EngineEvents = mpsc::UnboundedSender<EngineEvent>;

/// Port for the embedded transcoding engine
///
/// The engine owns a private virtual filesystem. Commands are argument vectors
/// that only ever reference names inside that filesystem.
#[async_trait]
pub trait TranscodeEnginePort: Send + Sync {
    /// Fetch and initialize the engine core
    async fn load(&self) -> Result<(), EngineFault>;

    /// Write a file into the engine filesystem
    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), EngineFault>;

    /// Run one command; returns the engine exit code
    async fn exec(&self, args: &[String], events: EngineEvents) -> Result<i32, EngineFault>;

    /// Read a file back out of the engine filesystem
    async fn read_file(&self, name: &str) -> Result<Vec<u8>, EngineFault>;

    /// Remove a file from the engine filesystem; absent files are not an error
    async fn delete_file(&self, name: &str) -> Result<(), EngineFault>;
}

/// Port for media probing
#[async_trait]
pub trait ProbePort: Send + Sync {
    /// Probe duration and primary stream parameters
    async fn probe_media(&self, source: &MediaSource) -> Result<MediaProbe, DomainError>;
}

/// Port for a reusable decode surface that frames are captured from
///
/// One surface decodes one position at a time, so callers serialize access.
#[async_trait]
pub trait FrameSurfacePort: Send {
    /// Point the surface at a source; a no-op when it is already attached
    async fn attach(&mut self, source: &MediaSource) -> Result<(), DomainError>;

    /// Seek and resolve once the surface has settled on `timestamp`
    async fn seek(&mut self, timestamp: f64) -> Result<(), DomainError>;

    /// Snapshot the current position as an RGB raster of the given size
    async fn capture(&mut self, width: u32, height: u32) -> Result<RasterImage, DomainError>;

    /// Release whatever the surface holds for the attached source
    async fn detach(&mut self);
}

/// Port for handing a finished artifact to the user
#[async_trait]
pub trait DeliveryPort: Send + Sync {
    async fn deliver(&self, artifact: &Artifact) -> Result<DeliveryReceipt, DomainError>;
}

/// Port for logging and observability
#[async_trait]
pub trait LogPort: Send + Sync {
    /// Log info message
    async fn info(&self, message: &str);

    /// Log warning message
    async fn warn(&self, message: &str);

    /// Log error message
    async fn error(&self, message: &str);

    /// Log debug message
    async fn debug(&self, message: &str);

    /// Log structured event
    async fn log_event(&self, event: &LogEvent);
}

/// Log event with structured data
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: std::time::SystemTime,
    pub context: HashMap<String, String>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: std::time::SystemTime::now(),
            context: HashMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
