// Domain errors - Error taxonomy shared by every layer

use thiserror::Error;

/// Domain-specific error types
///
/// Engine-facing failures are split by the step that produced them so the
/// orchestrator can turn each into a stable, operation-specific message.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DomainError {
    /// Invalid arguments provided
    #[error("Bad arguments: {0}")]
    BadArgs(String),

    /// The transcoding engine failed to initialize. Fatal for the session.
    #[error("Failed to load engine: {0}")]
    LoadError(String),

    /// A commit was attempted while the engine or the model was not ready
    #[error("Precondition failed: {0}")]
    PreconditionError(String),

    /// Writing into the engine filesystem failed
    #[error("Staging failed: {0}")]
    StagingError(String),

    /// The engine command failed; `diagnostics` holds the engine log
    #[error("Execution failed: {message}")]
    ExecutionError { message: String, diagnostics: String },

    /// Reading an output back from the engine filesystem failed
    #[error("Retrieval failed: {0}")]
    RetrievalError(String),

    /// Media probing failed
    #[error("Probe failed: {0}")]
    ProbeError(String),

    /// Seeking or capturing a preview frame failed
    #[error("Frame capture failed: {0}")]
    CaptureError(String),

    /// Handing the artifact to the delivery collaborator failed
    #[error("Delivery failed: {0}")]
    DeliveryError(String),

    /// The operation was superseded before it finished
    #[error("Cancelled: {0}")]
    Cancelled(String),

    /// Local file system failure
    #[error("File system error: {0}")]
    FsFail(String),
}

impl DomainError {
    /// Engine diagnostic text, if the error carries any
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            DomainError::ExecutionError { diagnostics, .. } if !diagnostics.is_empty() => {
                Some(diagnostics.as_str())
            }
            _ => None,
        }
    }

    /// True for errors that were rejected before any side effect
    pub fn is_precondition(&self) -> bool {
        matches!(self, DomainError::PreconditionError(_))
    }
}

impl From<std::io::Error> for DomainError {
    fn from(err: std::io::Error) -> Self {
        DomainError::FsFail(err.to_string())
    }
}
