use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use extraction_client::{Endpoint, ExtractionClient, ExtractionConfig, RetryPolicy};
use recipe_api::auth::{AuthPolicy, Authenticator};
use recipe_api::jwt::JwtAuthenticator;
use recipe_api::rate_limit::RateLimiter;
use recipe_api::{router, AppState};
use recipe_common::AppConfig;
use recipe_import::{ImportPipeline, PgContentStore, PgProfileDirectory, WebFetcher};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("Failed to load configuration")?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to Postgres")?;
    sqlx::migrate!("../../migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let timeout = Duration::from_secs(config.http_timeout_secs);
    let web = Arc::new(WebFetcher::new(timeout)?);

    let endpoint: Endpoint = config.extraction_endpoint.parse()?;
    let extractor = ExtractionClient::new(
        ExtractionConfig::new(&config.extraction_service_url)
            .with_api_key(config.extraction_api_key.clone())
            .with_endpoint(endpoint)
            .with_retry(RetryPolicy::new(
                config.extraction_max_attempts,
                Duration::from_millis(config.extraction_retry_base_ms),
            ))
            .with_timeout(timeout),
    )?;

    let pipeline = ImportPipeline::new(
        web.clone(),
        web,
        Arc::new(extractor),
        Arc::new(PgContentStore::new(pool.clone())),
        Arc::new(PgProfileDirectory::new(pool)),
    );

    let auth = AuthPolicy::from_config(&config);
    if !auth.required {
        info!("DEV_AUTH_BYPASS set, unauthenticated imports are allowed");
    }
    let authenticator = config
        .jwt_secret
        .as_deref()
        .map(|secret| Arc::new(JwtAuthenticator::new(secret)) as Arc<dyn Authenticator>);

    let state = Arc::new(AppState {
        pipeline,
        auth,
        authenticator,
        rate_limiter: RateLimiter::new(config.import_rate_limit_per_hour),
    });
    let app = router(state);

    let addr = format!("{}:{}", config.api_host, config.api_port);
    info!(endpoint = ?endpoint, "Recipe import API starting on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
