//! Canonical form extraction.
//!
//! A resolved URL is reduced to the smallest stable form that identifies the
//! same piece of content, so the dedup gate sees one key per video/post.
//! Platform rules are tried in order; the first one that produces a form
//! wins, and anything left over just loses its query string.
//!
//! Every output is a fixed point: feeding it back in yields the same string.

mod instagram;
mod tiktok;
mod youtube;

use std::sync::Arc;

use tracing::debug;
use url::Url;

use crate::error::{ImportError, ImportResult};
use crate::traits::PageFetcher;

/// One platform-specific canonicalization strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformRule {
    TikTok,
    Instagram,
    YouTube,
    YouTubeShortLink,
}

impl PlatformRule {
    /// Evaluation order.
    pub const ALL: [PlatformRule; 4] = [
        PlatformRule::TikTok,
        PlatformRule::Instagram,
        PlatformRule::YouTube,
        PlatformRule::YouTubeShortLink,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            PlatformRule::TikTok => "tiktok",
            PlatformRule::Instagram => "instagram",
            PlatformRule::YouTube => "youtube",
            PlatformRule::YouTubeShortLink => "youtu.be",
        }
    }

    pub fn applies_to(&self, host: &str) -> bool {
        match self {
            PlatformRule::TikTok => host_matches(host, "tiktok.com"),
            PlatformRule::Instagram => host_matches(host, "instagram.com"),
            PlatformRule::YouTube => host_matches(host, "youtube.com"),
            PlatformRule::YouTubeShortLink => host_matches(host, "youtu.be"),
        }
    }

    /// Network-free part of the rule.
    pub fn canonical_form(&self, url: &Url) -> Option<String> {
        match self {
            PlatformRule::TikTok => tiktok::from_path(url),
            PlatformRule::Instagram => instagram::from_path(url),
            PlatformRule::YouTube => youtube::from_watch_url(url),
            PlatformRule::YouTubeShortLink => youtube::from_short_link(url),
        }
    }

    async fn apply(&self, url: &Url, pages: &dyn PageFetcher) -> Option<String> {
        if let Some(form) = self.canonical_form(url) {
            return Some(form);
        }
        match self {
            PlatformRule::TikTok => match tiktok::from_page(url, pages).await {
                Some(form) => Some(form),
                None => tiktok::video_without_username(url),
            },
            _ => None,
        }
    }
}

/// `host` is `domain` or one of its subdomains.
fn host_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

fn lowercase_host(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_ascii_lowercase()
}

/// Pure canonical form for URLs a platform rule recognizes from the URL
/// alone. `None` means the URL needs the network lookup or the generic
/// fallback.
pub fn canonical_form(url: &Url) -> Option<String> {
    let host = lowercase_host(url);
    PlatformRule::ALL
        .iter()
        .filter(|rule| rule.applies_to(&host))
        .find_map(|rule| rule.canonical_form(url))
}

/// Drop the query string, leave everything else alone.
pub fn strip_query(url: &Url) -> String {
    let mut stripped = url.clone();
    stripped.set_query(None);
    stripped.to_string()
}

/// Canonicalizer with access to the web for TikTok canonical-tag lookups.
pub struct Canonicalizer {
    pages: Arc<dyn PageFetcher>,
}

impl Canonicalizer {
    pub fn new(pages: Arc<dyn PageFetcher>) -> Self {
        Self { pages }
    }

    pub async fn canonicalize(&self, url: &str) -> ImportResult<String> {
        let parsed =
            Url::parse(url.trim()).map_err(|e| ImportError::InvalidUrl(format!("{url}: {e}")))?;
        let host = lowercase_host(&parsed);

        for rule in PlatformRule::ALL.iter().filter(|r| r.applies_to(&host)) {
            if let Some(form) = rule.apply(&parsed, self.pages.as_ref()).await {
                debug!(rule = rule.name(), url, canonical = %form, "Canonicalized");
                return Ok(form);
            }
        }

        Ok(strip_query(&parsed))
    }
}
