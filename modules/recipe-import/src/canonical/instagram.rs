use std::sync::LazyLock;

use regex::Regex;
use url::Url;

// `/reel/`, `/reels/` and `/p/` address the same media by shortcode,
// optionally behind a username segment.
static RE_MEDIA: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:[A-Za-z0-9_.]+/)?(?:reels?|p)/([A-Za-z0-9_-]+)(?:/|$)").unwrap()
});

/// Any media path → `https://www.instagram.com/reel/<code>/`.
pub(super) fn from_path(url: &Url) -> Option<String> {
    let caps = RE_MEDIA.captures(url.path())?;
    Some(format!("https://www.instagram.com/reel/{}/", &caps[1]))
}
