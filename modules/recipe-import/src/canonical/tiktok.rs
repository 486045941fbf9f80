use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, warn};
use url::Url;

use super::{host_matches, strip_query};
use crate::traits::PageFetcher;

/// Only the `<head>` matters for canonical links.
const HEAD_LIMIT: usize = 256 * 1024;

static RE_USER_VIDEO: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/@([A-Za-z0-9_.]+)/video/(\d+)(?:/|$)").unwrap());
static RE_VIDEO_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/video/(\d+)(?:/|$)").unwrap());

// rel before href, and href before rel
static RE_CANONICAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<link\s+(?:[^>]*?\s)?rel\s*=\s*["']canonical["'][^>]*?\shref\s*=\s*["']([^"']+)["']"#)
        .unwrap()
});
static RE_CANONICAL_REV: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<link\s+(?:[^>]*?\s)?href\s*=\s*["']([^"']+)["'][^>]*?\srel\s*=\s*["']canonical["']"#)
        .unwrap()
});

/// `/@<user>/video/<id>` → `https://www.tiktok.com/@<user>/video/<id>`.
pub(super) fn from_path(url: &Url) -> Option<String> {
    let caps = RE_USER_VIDEO.captures(url.path())?;
    Some(format!(
        "https://www.tiktok.com/@{}/video/{}",
        &caps[1], &caps[2]
    ))
}

/// Look for a `<link rel="canonical">` on the page that names the user and
/// video. Failures are logged and reported as "nothing found".
pub(super) async fn from_page(url: &Url, pages: &dyn PageFetcher) -> Option<String> {
    let html = match pages.fetch_html(url.as_str()).await {
        Ok(html) => html,
        Err(e) => {
            warn!(url = %url, error = %e, "TikTok page fetch failed, skipping canonical lookup");
            return None;
        }
    };

    let href = extract_canonical_link(&html)?;
    let target = url.join(&href).ok()?;
    let host = target.host_str().unwrap_or_default().to_ascii_lowercase();
    if !host_matches(&host, "tiktok.com") {
        debug!(url = %url, href = %href, "Canonical link points off TikTok, ignoring");
        return None;
    }
    from_path(&target)
}

/// Username-less `/video/<id>` URLs keep their path and lose the query.
pub(super) fn video_without_username(url: &Url) -> Option<String> {
    RE_VIDEO_ID
        .is_match(url.path())
        .then(|| strip_query(url))
}

/// href of the first canonical `<link>` in the document head.
pub(crate) fn extract_canonical_link(html: &str) -> Option<String> {
    let mut end = html.len().min(HEAD_LIMIT);
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    let head = match html[..end].find("</head>") {
        Some(close) => &html[..close],
        None => &html[..end],
    };

    RE_CANONICAL
        .captures(head)
        .or_else(|| RE_CANONICAL_REV.captures(head))
        .map(|caps| caps[1].replace("&amp;", "&"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPageFetcher;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn user_video_path_matches() {
        assert_eq!(
            from_path(&url("https://www.tiktok.com/@foo/video/555?is_copy_url=1")).as_deref(),
            Some("https://www.tiktok.com/@foo/video/555")
        );
        assert_eq!(
            from_path(&url("https://tiktok.com/@a.b_c/video/1/")).as_deref(),
            Some("https://www.tiktok.com/@a.b_c/video/1")
        );
    }

    #[test]
    fn non_numeric_id_rejected() {
        assert_eq!(from_path(&url("https://www.tiktok.com/@foo/video/abc")), None);
        assert_eq!(from_path(&url("https://www.tiktok.com/@foo/video/555abc")), None);
        assert_eq!(from_path(&url("https://www.tiktok.com/@foo")), None);
    }

    #[test]
    fn canonical_link_either_attribute_order() {
        let a = r#"<html><head><link rel="canonical" href="https://www.tiktok.com/@x/video/9"></head></html>"#;
        let b = r#"<head><link data-rh="true" href='https://www.tiktok.com/@x/video/9' rel='canonical'/></head>"#;
        assert_eq!(extract_canonical_link(a).as_deref(), Some("https://www.tiktok.com/@x/video/9"));
        assert_eq!(extract_canonical_link(b).as_deref(), Some("https://www.tiktok.com/@x/video/9"));
    }

    #[test]
    fn canonical_link_ignored_outside_head() {
        let html = r#"<head><title>t</title></head><body><link rel="canonical" href="https://www.tiktok.com/@x/video/9"></body>"#;
        assert_eq!(extract_canonical_link(html), None);
    }

    #[test]
    fn canonical_link_handles_multibyte_text() {
        let html = format!("<head>{}</head>", "é".repeat(10));
        assert_eq!(extract_canonical_link(&html), None);
    }

    #[tokio::test]
    async fn page_lookup_finds_user_form() {
        let pages = MockPageFetcher::new().on_page(
            "https://www.tiktok.com/video/777",
            r#"<head><link rel="canonical" href="https://www.tiktok.com/@chef/video/777?lang=en"></head>"#,
        );
        assert_eq!(
            from_page(&url("https://www.tiktok.com/video/777"), &pages).await.as_deref(),
            Some("https://www.tiktok.com/@chef/video/777")
        );
    }

    #[tokio::test]
    async fn page_lookup_failure_is_none() {
        let pages = MockPageFetcher::new();
        assert_eq!(from_page(&url("https://www.tiktok.com/video/777"), &pages).await, None);
    }

    #[tokio::test]
    async fn off_platform_canonical_ignored() {
        let pages = MockPageFetcher::new().on_page(
            "https://www.tiktok.com/video/777",
            r#"<head><link rel="canonical" href="https://evil.example/@chef/video/777"></head>"#,
        );
        assert_eq!(from_page(&url("https://www.tiktok.com/video/777"), &pages).await, None);
    }

    #[test]
    fn username_less_fallback_strips_query() {
        assert_eq!(
            video_without_username(&url("https://www.tiktok.com/video/555?is_copy_url=1")).as_deref(),
            Some("https://www.tiktok.com/video/555")
        );
        assert_eq!(video_without_username(&url("https://www.tiktok.com/discover/soup")), None);
    }
}
