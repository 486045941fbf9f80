use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use tracing::error;

use recipe_common::ApiEnvelope;
use recipe_import::ImportError;

use crate::auth::AuthError;

/// Anything a route can fail with, rendered as the uniform envelope.
#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(AuthError),
    RateLimited { max_per_hour: usize },
    /// The request body could not be read as an import request.
    BadRequest(String),
    Import(ImportError),
    /// The extraction service's own error, relayed with its status.
    Upstream {
        status: u16,
        error: String,
        error_code: Option<String>,
    },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Import(e) => match e {
                ImportError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                ImportError::ProfileNotFound(_) => StatusCode::FORBIDDEN,
                ImportError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
                ImportError::Resolve(_) | ImportError::Upstream(_) => StatusCode::BAD_GATEWAY,
            },
            ApiError::Upstream { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY)
            }
        }
    }

    pub fn code(&self) -> Option<String> {
        match self {
            ApiError::Unauthenticated(_) => Some("UNAUTHENTICATED".to_string()),
            ApiError::RateLimited { .. } => Some("RATE_LIMITED".to_string()),
            ApiError::BadRequest(_) => Some("INVALID_URL".to_string()),
            ApiError::Import(e) => Some(e.code().to_string()),
            ApiError::Upstream { error_code, .. } => error_code.clone(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Unauthenticated(e) => e.to_string(),
            ApiError::RateLimited { max_per_hour } => {
                format!("Rate limit exceeded, max {max_per_hour} imports per hour")
            }
            ApiError::BadRequest(msg) => msg.clone(),
            // Database detail stays in the logs.
            ApiError::Import(ImportError::Storage(_)) => "Failed to store content".to_string(),
            ApiError::Import(e) => e.to_string(),
            ApiError::Upstream { error, .. } => error.clone(),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        ApiError::Unauthenticated(e)
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        ApiError::Import(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Import(ImportError::Storage(detail)) = &self {
            error!(error = %detail, "Storage failure");
        }
        let envelope: ApiEnvelope<serde_json::Value> = ApiEnvelope::fail(self.message(), self.code());
        (self.status(), Json(envelope)).into_response()
    }
}
