// Outbound HTTP for redirect resolution and canonical-tag lookups.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::redirect::Policy;
use tracing::{debug, warn};
use url::Url;

use crate::traits::{PageFetcher, UrlResolver};
use crate::validate::validate_input_url;

const MAX_REDIRECTS: usize = 10;

/// Share-link hosts serve a JS interstitial instead of a redirect to
/// clients that don't look like a browser.
const USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

/// Largest page body read when looking for a canonical link.
const MAX_PAGE_BYTES: usize = 2 * 1024 * 1024;

pub struct WebFetcher {
    client: reqwest::Client,
}

impl WebFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let policy = Policy::custom(|attempt| {
            match check_redirect_hop(attempt.url(), attempt.previous().len()) {
                Ok(()) => attempt.follow(),
                Err(reason) => {
                    warn!(to = %attempt.url(), reason = %reason, "Refusing redirect");
                    attempt.error(reason)
                }
            }
        });

        let client = reqwest::Client::builder()
            .redirect(policy)
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self { client })
    }
}

/// A redirect target gets the same checks as user input, and the chain is
/// capped. `hops` counts the URLs already visited.
fn check_redirect_hop(target: &Url, hops: usize) -> std::result::Result<(), String> {
    if hops >= MAX_REDIRECTS {
        return Err(format!("too many redirects (max {MAX_REDIRECTS})"));
    }
    validate_input_url(target.as_str())
        .map(|_| ())
        .map_err(|e| format!("redirect target rejected: {e}"))
}

/// Append `chunk` without letting `body` grow past `MAX_PAGE_BYTES`.
/// Returns true once the cap is reached.
fn append_capped(body: &mut Vec<u8>, chunk: &[u8]) -> bool {
    let room = MAX_PAGE_BYTES.saturating_sub(body.len());
    body.extend_from_slice(&chunk[..chunk.len().min(room)]);
    body.len() >= MAX_PAGE_BYTES
}

#[async_trait]
impl UrlResolver for WebFetcher {
    async fn resolve(&self, url: &str) -> Result<String> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?;

        let final_url = resp.url().to_string();
        if final_url != url {
            debug!(from = url, to = %final_url, status = resp.status().as_u16(), "Followed redirects");
        }
        Ok(final_url)
    }
}

#[async_trait]
impl PageFetcher for WebFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        let mut resp = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Request to {url} failed"))?
            .error_for_status()?;

        let mut body = Vec::new();
        while let Some(chunk) = resp.chunk().await? {
            if append_capped(&mut body, &chunk) {
                break;
            }
        }
        Ok(String::from_utf8_lossy(&body).into_owned())
    }
}
