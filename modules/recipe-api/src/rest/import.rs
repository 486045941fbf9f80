use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, State},
    response::Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use recipe_common::{ApiEnvelope, ImportData, ImportRequest};
use recipe_import::ImportOutcome;

use crate::auth::Caller;
use crate::error::ApiError;
use crate::AppState;

#[derive(Deserialize)]
pub struct CanonicalizeRequest {
    url: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct CanonicalData {
    pub canonical_url: String,
}

fn body_error(rejection: JsonRejection) -> ApiError {
    ApiError::BadRequest(format!("Invalid request body: {}", rejection.body_text()))
}

/// Import a recipe from a social video or web URL, reusing stored content
/// when the same canonical URL was imported before.
pub async fn api_import(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Caller(user): Caller,
    body: Result<Json<ImportRequest>, JsonRejection>,
) -> Result<Json<ApiEnvelope<ImportData>>, ApiError> {
    let Json(request) = body.map_err(body_error)?;

    if !state.rate_limiter.allow(addr.ip()).await {
        warn!("Import rate limit exceeded");
        return Err(ApiError::RateLimited {
            max_per_hour: state.rate_limiter.max_per_hour(),
        });
    }

    let data = match state.pipeline.import(request, user.as_ref()).await? {
        ImportOutcome::Cached(record) => ImportData::from_record(&record, true),
        ImportOutcome::Extracted(record) => ImportData::from_record(&record, false),
        ImportOutcome::UpstreamFailure {
            status,
            error,
            error_code,
        } => {
            return Err(ApiError::Upstream {
                status,
                error,
                error_code,
            })
        }
    };

    info!(
        content_id = %data.content_id,
        cached = data.cached,
        anonymous = user.is_none(),
        "Import served"
    );
    Ok(Json(ApiEnvelope::ok(data)))
}

/// Resolve and canonicalize a URL without extracting or storing anything.
pub async fn api_canonicalize(
    State(state): State<Arc<AppState>>,
    Caller(_user): Caller,
    body: Result<Json<CanonicalizeRequest>, JsonRejection>,
) -> Result<Json<ApiEnvelope<CanonicalData>>, ApiError> {
    let Json(request) = body.map_err(body_error)?;
    let canonical_url = state.pipeline.canonical_url(&request.url).await?;
    Ok(Json(ApiEnvelope::ok(CanonicalData { canonical_url })))
}
