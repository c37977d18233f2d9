// Application layer - Engine session and use case interactors

pub mod container;
pub mod engine_session;
pub mod frame_preview;
pub mod processing;
pub mod upload;

// Re-export interactors
pub use container::{AppContainer, ContainerPorts, DefaultAppContainer};
pub use engine_session::{EngineSession, ProgressSubscription};
pub use frame_preview::{FramePreviewer, FrameSequence};
pub use processing::{JobOutcome, ProcessingInteractor};
pub use upload::UploadCollector;
