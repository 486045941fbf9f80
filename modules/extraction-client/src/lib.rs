pub mod error;
pub mod retry;
pub mod types;

pub use error::{ExtractionError, Result};
pub use retry::{retry_with_backoff, RetryPolicy};
pub use types::{Endpoint, ExtractionRequest, UpstreamOutcome, UpstreamResponse};

use std::time::Duration;

use tracing::{info, warn};
use types::{LegacyBody, V2Body};

const API_KEY_HEADER: &str = "X-API-Key";

/// Connection settings for the extraction service.
#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub endpoint: Endpoint,
    pub retry: RetryPolicy,
    /// Per-attempt timeout.
    pub timeout: Duration,
}

impl ExtractionConfig {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: None,
            endpoint: Endpoint::default(),
            retry: RetryPolicy::default(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoint = endpoint;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// 502/503/504 are worth another attempt; everything else is final.
pub fn is_transient_status(status: u16) -> bool {
    matches!(status, 502..=504)
}

fn should_retry(result: &Result<UpstreamResponse>) -> bool {
    match result {
        Ok(resp) => is_transient_status(resp.status),
        Err(ExtractionError::Network(_)) => true,
        Err(_) => false,
    }
}

pub struct ExtractionClient {
    client: reqwest::Client,
    config: ExtractionConfig,
}

impl ExtractionClient {
    pub fn new(config: ExtractionConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ExtractionError::Setup(e.to_string()))?;

        Ok(Self { client, config })
    }

    pub fn endpoint_url(&self) -> String {
        format!("{}{}", self.config.base_url, self.config.endpoint.path())
    }

    /// Forward a URL to the extraction service, retrying transient failures.
    /// Returns the final upstream response whatever its status; only a
    /// network failure on the last attempt surfaces as `Err`.
    pub async fn extract(&self, request: &ExtractionRequest) -> Result<UpstreamResponse> {
        let policy = self.config.retry;
        let result = retry_with_backoff(
            &policy,
            |attempt| self.send_once(request, attempt),
            should_retry,
        )
        .await;

        match &result {
            Ok(resp) if resp.is_success() => {
                info!(url = %request.url, attempts = resp.attempts, "Extraction service responded");
            }
            Ok(resp) => {
                warn!(
                    url = %request.url,
                    status = resp.status,
                    attempts = resp.attempts,
                    "Extraction service returned an error"
                );
            }
            Err(e) => {
                warn!(url = %request.url, error = %e, "Extraction service unreachable");
            }
        }

        result
    }

    async fn send_once(&self, request: &ExtractionRequest, attempt: u32) -> Result<UpstreamResponse> {
        let endpoint = self.endpoint_url();
        let mut builder = self
            .client
            .post(&endpoint)
            .header("Content-Type", "application/json");

        if let Some(ref key) = self.config.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        builder = match self.config.endpoint {
            Endpoint::V2 => builder.json(&V2Body {
                url: &request.url,
                email: request.email.as_deref(),
                mode: request.mode.as_deref(),
            }),
            Endpoint::Legacy => builder.json(&LegacyBody { url: &request.url }),
        };

        let resp = builder.send().await.map_err(|e| {
            warn!(attempt, error = %e, "Extraction request failed");
            ExtractionError::from(e)
        })?;

        let status = resp.status().as_u16();
        let text = resp.text().await?;
        let body = serde_json::from_str(&text).unwrap_or(serde_json::Value::String(text));

        if is_transient_status(status) {
            warn!(attempt, status, "Extraction service temporarily unavailable");
        }

        Ok(UpstreamResponse {
            status,
            body,
            attempts: attempt,
        })
    }
}
