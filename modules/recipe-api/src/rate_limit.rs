use std::collections::HashMap;
use std::net::IpAddr;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

const WINDOW: Duration = Duration::from_secs(3600);

/// Prune the limiter map once it tracks this many addresses.
const PRUNE_THRESHOLD: usize = 1000;

/// Sliding one-hour window of requests per client IP.
pub struct RateLimiter {
    max_per_hour: usize,
    entries: Mutex<HashMap<IpAddr, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(max_per_hour: usize) -> Self {
        Self {
            max_per_hour,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_per_hour(&self) -> usize {
        self.max_per_hour
    }

    /// Records the request and returns true if `ip` is under its limit.
    pub async fn allow(&self, ip: IpAddr) -> bool {
        let mut limiter = self.entries.lock().await;
        if limiter.len() > PRUNE_THRESHOLD {
            prune_empty_entries(&mut limiter, Instant::now());
        }
        let entries = limiter.entry(ip).or_default();
        check_rate_limit(entries, Instant::now(), self.max_per_hour)
    }
}

/// Check rate limit for an IP. Returns true if the request is allowed, false if rate-limited.
/// Prunes expired entries and records the new request if allowed.
pub fn check_rate_limit(entries: &mut Vec<Instant>, now: Instant, max_per_hour: usize) -> bool {
    if let Some(cutoff) = now.checked_sub(WINDOW) {
        entries.retain(|t| *t > cutoff);
    }
    if entries.len() >= max_per_hour {
        return false;
    }
    entries.push(now);
    true
}

fn prune_empty_entries(limiter: &mut HashMap<IpAddr, Vec<Instant>>, now: Instant) {
    let Some(cutoff) = now.checked_sub(WINDOW) else {
        return;
    };
    limiter.retain(|_, entries| {
        entries.retain(|t| *t > cutoff);
        !entries.is_empty()
    });
}
