//! VideoStudio Library
//!
//! Lossless trimming and joining of video clips over a single transcoding
//! engine session, with frame previews for scrubbing and timeline strips.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod config_initialization;
pub mod domain;
pub mod error;
pub mod ports;
pub mod utils;

// Re-export commonly used types
pub use app::{
    AppContainer, DefaultAppContainer, EngineSession, FramePreviewer, ProcessingInteractor,
};
pub use domain::errors::DomainError;
pub use domain::model::{
    EngineState, JobStatus, MediaSource, MergeSequence, ProcessingJob, TrimRange,
};
pub use error::{StudioError, StudioResult};
