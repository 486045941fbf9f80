use std::net::{IpAddr, Ipv4Addr};

use url::Url;

use crate::error::{ImportError, ImportResult};

pub const MAX_URL_LEN: usize = 2048;

/// Check a user-supplied URL before any outbound request is made:
/// http(s) only, bounded length, no private or internal hosts.
pub fn validate_input_url(raw: &str) -> ImportResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ImportError::InvalidUrl("URL is required".to_string()));
    }
    if raw.len() > MAX_URL_LEN {
        return Err(ImportError::InvalidUrl(format!(
            "URL too long (max {MAX_URL_LEN} characters)"
        )));
    }

    let parsed = Url::parse(raw).map_err(|e| ImportError::InvalidUrl(e.to_string()))?;
    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(ImportError::InvalidUrl(
            "URL must use http or https scheme".to_string(),
        ));
    }

    let Some(host) = parsed.host_str() else {
        return Err(ImportError::InvalidUrl("URL has no host".to_string()));
    };

    // IPv6 literals come back bracketed from host_str
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if let Ok(ip) = bare.parse::<IpAddr>() {
        if is_private_ip(ip) {
            return Err(ImportError::InvalidUrl(
                "URLs pointing to private/loopback addresses are not allowed".to_string(),
            ));
        }
    }

    let lower = host.to_ascii_lowercase();
    if lower == "localhost" || lower.ends_with(".local") || lower.ends_with(".internal") {
        return Err(ImportError::InvalidUrl(
            "URLs pointing to internal hosts are not allowed".to_string(),
        ));
    }

    Ok(parsed)
}

/// Loopback, RFC 1918, link-local (incl. cloud metadata) and ULA ranges.
/// IPv4-mapped IPv6 addresses are judged by their IPv4 part.
fn is_private_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_private_v4(v4),
        IpAddr::V6(v6) => {
            if let Some(v4) = v6.to_ipv4_mapped() {
                return is_private_v4(v4);
            }
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                || (first & 0xfe00) == 0xfc00
                || (first & 0xffc0) == 0xfe80
        }
    }
}

fn is_private_v4(v4: Ipv4Addr) -> bool {
    let o = v4.octets();
    v4.is_loopback()
        || v4.is_link_local()
        || v4.is_unspecified()
        || o[0] == 10
        || (o[0] == 172 && (16..=31).contains(&o[1]))
        || (o[0] == 192 && o[1] == 168)
}
