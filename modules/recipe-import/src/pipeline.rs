//! Import pipeline: validate → resolve → canonicalize → dedup → extract →
//! persist → count usage. One request, run sequentially, no shared state
//! beyond the store.

use std::sync::Arc;

use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use extraction_client::{ExtractionRequest, UpstreamOutcome};
use recipe_common::{AuthUser, ImportRequest, ImportedContent, NewContent};

use crate::canonical::Canonicalizer;
use crate::error::{ImportError, ImportResult};
use crate::traits::{ContentStore, Extractor, PageFetcher, ProfileDirectory, UrlResolver};
use crate::validate::validate_input_url;

/// How an import request ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    /// A completed record already existed for the canonical URL.
    Cached(ImportedContent),
    /// Freshly extracted and stored.
    Extracted(ImportedContent),
    /// The extraction service answered with an error; relayed as-is.
    UpstreamFailure {
        status: u16,
        error: String,
        error_code: Option<String>,
    },
}

pub struct ImportPipeline {
    resolver: Arc<dyn UrlResolver>,
    canonicalizer: Canonicalizer,
    extractor: Arc<dyn Extractor>,
    store: Arc<dyn ContentStore>,
    profiles: Arc<dyn ProfileDirectory>,
}

impl ImportPipeline {
    pub fn new(
        resolver: Arc<dyn UrlResolver>,
        pages: Arc<dyn PageFetcher>,
        extractor: Arc<dyn Extractor>,
        store: Arc<dyn ContentStore>,
        profiles: Arc<dyn ProfileDirectory>,
    ) -> Self {
        Self {
            resolver,
            canonicalizer: Canonicalizer::new(pages),
            extractor,
            store,
            profiles,
        }
    }

    /// Validate, follow redirects and reduce to the dedup key.
    pub async fn canonical_url(&self, raw: &str) -> ImportResult<String> {
        let url = validate_input_url(raw)?;
        self.canonicalize_valid(&url).await
    }

    async fn canonicalize_valid(&self, url: &Url) -> ImportResult<String> {
        let resolved = self
            .resolver
            .resolve(url.as_str())
            .await
            .map_err(|e| ImportError::Resolve(format!("{e:#}")))?;
        self.canonicalizer.canonicalize(&resolved).await
    }

    pub async fn import(
        &self,
        request: ImportRequest,
        user: Option<&AuthUser>,
    ) -> ImportResult<ImportOutcome> {
        let url = validate_input_url(&request.url)?;

        let profile_id = match user {
            Some(user) => Some(self.profile_for(user).await?),
            None => None,
        };

        let canonical = self.canonicalize_valid(&url).await?;

        if let Some(existing) = self
            .store
            .find_latest_by_source_url(&canonical)
            .await
            .map_err(storage)?
        {
            info!(url = %canonical, content_id = %existing.id, "Dedup hit, returning cached content");
            return Ok(ImportOutcome::Cached(existing));
        }

        let extraction = ExtractionRequest {
            url: canonical.clone(),
            email: request
                .email
                .or_else(|| user.and_then(|u| u.email.clone())),
            mode: request.mode,
        };
        let response = self
            .extractor
            .extract(&extraction)
            .await
            .map_err(|e| ImportError::Upstream(e.to_string()))?;
        let attempts = response.attempts;

        let extracted = match response.into_outcome() {
            UpstreamOutcome::Extracted(extracted) => extracted,
            UpstreamOutcome::Failed {
                status,
                error,
                error_code,
            } => {
                warn!(url = %canonical, status, error_code = ?error_code, "Extraction failed");
                return Ok(ImportOutcome::UpstreamFailure {
                    status,
                    error,
                    error_code,
                });
            }
        };

        let record = self
            .store
            .insert_content(NewContent {
                user_id: profile_id,
                source_url: canonical,
                content: extracted.content,
                metadata: extracted.metadata,
                retry_count: attempts.saturating_sub(1) as i32,
            })
            .await
            .map_err(storage)?;
        info!(url = %record.source_url, content_id = %record.id, "Stored extracted content");

        // Usage accounting is best-effort once the content is stored.
        if let Some(profile_id) = profile_id {
            match self.store.increment_usage_counter(profile_id).await {
                Ok(used) => info!(profile_id = %profile_id, used, "AI import counted"),
                Err(e) => {
                    warn!(profile_id = %profile_id, error = %e, "Failed to increment usage counter")
                }
            }
        }

        Ok(ImportOutcome::Extracted(record))
    }

    async fn profile_for(&self, user: &AuthUser) -> ImportResult<Uuid> {
        self.profiles
            .profile_id_for_auth_user(user.auth_user_id)
            .await
            .map_err(storage)?
            .ok_or(ImportError::ProfileNotFound(user.auth_user_id))
    }
}

fn storage(e: anyhow::Error) -> ImportError {
    warn!(error = %e, "Storage operation failed");
    ImportError::Storage(e.to_string())
}
