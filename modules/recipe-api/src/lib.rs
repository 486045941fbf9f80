pub mod auth;
pub mod error;
pub mod jwt;
pub mod rate_limit;
pub mod rest;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue},
    routing::{get, post},
    Router,
};
use tower_http::set_header::SetResponseHeaderLayer;

use recipe_import::ImportPipeline;

use auth::{AuthPolicy, Authenticator};
use rate_limit::RateLimiter;

pub struct AppState {
    pub pipeline: ImportPipeline,
    pub auth: AuthPolicy,
    /// Absent only when tokens are never checked.
    pub authenticator: Option<Arc<dyn Authenticator>>,
    pub rate_limiter: RateLimiter,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(rest::health))
        // Import
        .route("/api/import", post(rest::api_import))
        .route("/api/v2/import-from-url", post(rest::api_import))
        .route("/api/canonicalize", post(rest::api_canonicalize))
        .with_state(state)
        // CORS
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        // Imported content is per-request; never cache responses
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::PRAGMA,
            HeaderValue::from_static("no-cache"),
        ))
        // Logging layer: method + path only (no query params, no IP)
        .layer(
            tower_http::trace::TraceLayer::new_for_http().make_span_with(
                |request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        path = %request.uri().path(),
                    )
                },
            ),
        )
}
