use thiserror::Error;
use uuid::Uuid;

pub type ImportResult<T> = std::result::Result<T, ImportError>;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Could not resolve URL: {0}")]
    Resolve(String),

    #[error("No profile for user {0}")]
    ProfileNotFound(Uuid),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Extraction service unavailable: {0}")]
    Upstream(String),
}

impl ImportError {
    /// Stable machine-readable code for the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            ImportError::InvalidUrl(_) => "INVALID_URL",
            ImportError::Resolve(_) => "RESOLVE_FAILED",
            ImportError::ProfileNotFound(_) => "PROFILE_NOT_FOUND",
            ImportError::Storage(_) => "STORAGE_ERROR",
            ImportError::Upstream(_) => "UPSTREAM_UNAVAILABLE",
        }
    }
}
