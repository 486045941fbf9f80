use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Imported content
// ---------------------------------------------------------------------------

/// Lifecycle of an imported content row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Processing,
    Completed,
    Failed,
}

impl ProcessingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessingStatus::Processing => "PROCESSING",
            ProcessingStatus::Completed => "COMPLETED",
            ProcessingStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessingStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PROCESSING" => Ok(ProcessingStatus::Processing),
            "COMPLETED" => Ok(ProcessingStatus::Completed),
            "FAILED" => Ok(ProcessingStatus::Failed),
            other => Err(format!("unknown processing status: {other}")),
        }
    }
}

/// One piece of extracted content, keyed by its canonical source URL.
///
/// `user_id` points at a profile when the row is written and is cleared
/// (never cascaded) when that profile goes away.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportedContent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub source_url: String,
    pub content: serde_json::Value,
    pub metadata: serde_json::Value,
    pub status: ProcessingStatus,
    pub retry_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Parameters for inserting a new content row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContent {
    pub user_id: Option<Uuid>,
    pub source_url: String,
    pub content: serde_json::Value,
    pub metadata: serde_json::Value,
    pub retry_count: i32,
}

/// Payload returned by the extraction service on success.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractedContent {
    #[serde(default)]
    pub content: serde_json::Value,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Identity established from a bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    /// Id issued by the authentication provider (`sub` claim).
    pub auth_user_id: Uuid,
    pub email: Option<String>,
}

// ---------------------------------------------------------------------------
// Import request / response data
// ---------------------------------------------------------------------------

/// Inbound import request body.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImportRequest {
    pub url: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub mode: Option<String>,
}

/// `data` member of a successful import envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportData {
    pub content: serde_json::Value,
    pub metadata: serde_json::Value,
    pub content_id: Uuid,
    pub source_url: String,
    pub cached: bool,
}

impl ImportData {
    pub fn from_record(record: &ImportedContent, cached: bool) -> Self {
        Self {
            content: record.content.clone(),
            metadata: record.metadata.clone(),
            content_id: record.id,
            source_url: record.source_url.clone(),
            cached,
        }
    }
}
