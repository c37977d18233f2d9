// Adapters - External system implementations

pub mod exec_ffmpeg;
pub mod frame_ffmpeg;
pub mod fs_delivery;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock;
pub mod probe_ffprobe;
pub mod toml_config;
pub mod tracing_log;

// Re-export adapters
pub use exec_ffmpeg::FfmpegProcessEngine;
pub use frame_ffmpeg::FfmpegFrameSurface;
pub use fs_delivery::FsDeliveryAdapter;
pub use probe_ffprobe::FfprobeAdapter;
pub use toml_config::{StudioConfig, TomlConfigAdapter};
pub use tracing_log::TracingLogAdapter;
