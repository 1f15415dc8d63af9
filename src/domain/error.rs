use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    #[error("Document source URL is empty")]
    EmptySource,

    #[error("Document failed to load: {0}")]
    LoadFailure(String),

    #[error("Storage permission denied")]
    PermissionDenied,

    #[error("Unable to submit download: {0}")]
    DownloadSubmission(String),

    #[error("A download is already in progress")]
    DownloadInProgress,

    #[error("Downloads are disabled for this document")]
    DownloadDisabled,

    #[error("Invalid launch parameters: {0}")]
    LaunchParameters(String),
}

impl ViewerError {
    /// Errors that end the current screen once surfaced.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ViewerError::EmptySource | ViewerError::LoadFailure(_))
    }
}

/// Failures reported by the rendering collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("Invalid document URL: {0}")]
    InvalidUrl(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Failures reported by the platform download service at enqueue time.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DownloadServiceError {
    #[error("Download service unavailable")]
    Unavailable,

    #[error("Invalid destination: {0}")]
    InvalidDestination(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
