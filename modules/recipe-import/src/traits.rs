// Trait seams for the import pipeline.
//
// UrlResolver / PageFetcher: outbound web (redirects, canonical HTML).
// Extractor: the external extraction service.
// ContentStore / ProfileDirectory: Postgres.
//
// Each has an in-memory stand-in in `testing` so the pipeline runs without
// network or database.

use anyhow::Result;
use async_trait::async_trait;
use uuid::Uuid;

use extraction_client::{ExtractionClient, ExtractionRequest, UpstreamResponse};
use recipe_common::{ImportedContent, NewContent};

// ---------------------------------------------------------------------------
// Web
// ---------------------------------------------------------------------------

#[async_trait]
pub trait UrlResolver: Send + Sync {
    /// Follow redirects and return the final URL (the input when there were none).
    async fn resolve(&self, url: &str) -> Result<String>;
}

#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch a page body as text.
    async fn fetch_html(&self, url: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// Extraction service
// ---------------------------------------------------------------------------

#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> extraction_client::Result<UpstreamResponse>;
}

#[async_trait]
impl Extractor for ExtractionClient {
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> extraction_client::Result<UpstreamResponse> {
        ExtractionClient::extract(self, request).await
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Newest completed record whose source URL equals `url` exactly.
    async fn find_latest_by_source_url(&self, url: &str) -> Result<Option<ImportedContent>>;

    async fn insert_content(&self, new: NewContent) -> Result<ImportedContent>;

    /// Bump the profile's AI import counter by one, returning the new value.
    async fn increment_usage_counter(&self, profile_id: Uuid) -> Result<i64>;

    /// Detach every record owned by `profile_id`, keeping the rows.
    async fn anonymize_user_content(&self, profile_id: Uuid) -> Result<u64>;
}

#[async_trait]
pub trait ProfileDirectory: Send + Sync {
    /// Internal profile id for an authentication-provider user id.
    async fn profile_id_for_auth_user(&self, auth_user_id: Uuid) -> Result<Option<Uuid>>;
}
