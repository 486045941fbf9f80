use std::sync::LazyLock;

use regex::Regex;
use url::Url;

static RE_VIDEO_ID: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").unwrap());
static RE_PATH_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:shorts|embed|live)/([A-Za-z0-9_-]+)/?$").unwrap()
});
static RE_SHORT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^/([A-Za-z0-9_-]+)/?$").unwrap());

fn watch_url(id: &str) -> String {
    format!("https://www.youtube.com/watch?v={id}")
}

/// `/watch?v=<id>` keeps only `v`; `/shorts/<id>`, `/embed/<id>` and
/// `/live/<id>` name the same video.
pub(super) fn from_watch_url(url: &Url) -> Option<String> {
    if url.path() == "/watch" {
        let (_, id) = url.query_pairs().find(|(k, _)| *k == "v")?;
        return RE_VIDEO_ID.is_match(&id).then(|| watch_url(&id));
    }
    let caps = RE_PATH_ID.captures(url.path())?;
    Some(watch_url(&caps[1]))
}

/// `youtu.be/<id>` → watch URL.
pub(super) fn from_short_link(url: &Url) -> Option<String> {
    let caps = RE_SHORT_LINK.captures(url.path())?;
    Some(watch_url(&caps[1]))
}
