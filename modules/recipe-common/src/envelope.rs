use serde::{Deserialize, Serialize};

/// Uniform JSON envelope returned by every API route.
///
/// All four members are always present; absent values serialize as `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
    pub success: bool,
    pub error: Option<String>,
    pub error_code: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            error_code: None,
            data: Some(data),
        }
    }

    pub fn fail(error: impl Into<String>, error_code: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            error_code,
            data: None,
        }
    }
}
