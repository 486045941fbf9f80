use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExtractionError>;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Client setup failed: {0}")]
    Setup(String),

    #[error("Unknown extraction endpoint: {0}")]
    UnknownEndpoint(String),
}

impl From<reqwest::Error> for ExtractionError {
    fn from(err: reqwest::Error) -> Self {
        ExtractionError::Network(err.to_string())
    }
}
