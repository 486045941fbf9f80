use std::str::FromStr;

use recipe_common::ExtractedContent;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Which upstream route to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Endpoint {
    /// `POST /api/v2/import-from-url { url, email, mode }`
    #[default]
    V2,
    /// `POST /extract-content { url }`
    Legacy,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::V2 => "/api/v2/import-from-url",
            Endpoint::Legacy => "/extract-content",
        }
    }
}

impl FromStr for Endpoint {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v2" => Ok(Endpoint::V2),
            "legacy" | "v1" => Ok(Endpoint::Legacy),
            other => Err(ExtractionError::UnknownEndpoint(other.to_string())),
        }
    }
}

/// What the caller asks the extraction service to process.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExtractionRequest {
    pub url: String,
    pub email: Option<String>,
    pub mode: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct LegacyBody<'a> {
    pub url: &'a str,
}

#[derive(Serialize)]
pub(crate) struct V2Body<'a> {
    pub url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<&'a str>,
}

/// Upstream success/error envelope. Every member is optional because
/// deployments differ in how much of it they fill in.
#[derive(Debug, Default, Deserialize)]
struct UpstreamEnvelope {
    success: Option<bool>,
    data: Option<ExtractedContent>,
    error: Option<String>,
    error_code: Option<String>,
    /// FastAPI puts validation and HTTPException messages here.
    detail: Option<serde_json::Value>,
}

/// Raw status and body of the final upstream attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: u16,
    /// Parsed JSON body, or the raw text as a JSON string when the body
    /// was not JSON.
    pub body: serde_json::Value,
    /// Number of attempts made to obtain this response.
    pub attempts: u32,
}

/// How the pipeline should treat an upstream response.
#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamOutcome {
    Extracted(ExtractedContent),
    Failed {
        status: u16,
        error: String,
        error_code: Option<String>,
    },
}

impl UpstreamResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn into_outcome(self) -> UpstreamOutcome {
        let envelope: UpstreamEnvelope =
            serde_json::from_value(self.body.clone()).unwrap_or_default();

        if self.is_success() && envelope.success != Some(false) {
            if let Some(data) = envelope.data {
                return UpstreamOutcome::Extracted(data);
            }
        }

        let error = envelope
            .error
            .or_else(|| envelope.detail.map(detail_message))
            .or_else(|| self.body.as_str().filter(|s| !s.is_empty()).map(String::from))
            .unwrap_or_else(|| {
                if self.is_success() {
                    "Extraction service returned no content".to_string()
                } else {
                    format!("Extraction service returned status {}", self.status)
                }
            });

        UpstreamOutcome::Failed {
            status: self.status,
            error,
            error_code: envelope.error_code,
        }
    }
}

fn detail_message(detail: serde_json::Value) -> String {
    match detail {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}
