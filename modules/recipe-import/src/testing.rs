// Test mocks for the import pipeline.
//
// One stand-in per trait seam:
// - MockResolver (UrlResolver): HashMap-based redirect table, identity otherwise
// - MockPageFetcher (PageFetcher): HashMap-based URL→HTML, Err for the rest
// - MockExtractor (Extractor): scripted upstream responses, counts calls
// - MemoryContentStore (ContentStore): Vec-backed rows plus usage counters
// - MemoryProfiles (ProfileDirectory): auth user → profile map

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;

use extraction_client::{ExtractionError, ExtractionRequest, UpstreamResponse};
use recipe_common::{ImportedContent, NewContent, ProcessingStatus};

use crate::traits::{ContentStore, Extractor, PageFetcher, ProfileDirectory, UrlResolver};

// ---------------------------------------------------------------------------
// MockResolver
// ---------------------------------------------------------------------------

/// Returns the registered redirect target, or the input unchanged.
#[derive(Default)]
pub struct MockResolver {
    redirects: HashMap<String, String>,
    failing: Vec<String>,
    calls: AtomicUsize,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn redirect(mut self, from: &str, to: &str) -> Self {
        self.redirects.insert(from.to_string(), to.to_string());
        self
    }

    pub fn fail_on(mut self, url: &str) -> Self {
        self.failing.push(url.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl UrlResolver for MockResolver {
    async fn resolve(&self, url: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.iter().any(|f| f == url) {
            bail!("connection timed out: {url}");
        }
        Ok(self
            .redirects
            .get(url)
            .cloned()
            .unwrap_or_else(|| url.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MockPageFetcher
// ---------------------------------------------------------------------------

/// HashMap-based page fetcher. Returns `Err` for unregistered URLs.
#[derive(Default)]
pub struct MockPageFetcher {
    pages: HashMap<String, String>,
}

impl MockPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_page(mut self, url: &str, html: &str) -> Self {
        self.pages.insert(url.to_string(), html.to_string());
        self
    }
}

#[async_trait]
impl PageFetcher for MockPageFetcher {
    async fn fetch_html(&self, url: &str) -> Result<String> {
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| anyhow!("no page registered for {url}"))
    }
}

// ---------------------------------------------------------------------------
// MockExtractor
// ---------------------------------------------------------------------------

/// Replays scripted responses in order; once the script runs out it keeps
/// answering with a successful extraction that echoes the URL.
#[derive(Default)]
pub struct MockExtractor {
    script: Mutex<VecDeque<extraction_client::Result<UpstreamResponse>>>,
    requests: Mutex<Vec<ExtractionRequest>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn then_respond(self, status: u16, body: serde_json::Value) -> Self {
        self.then_respond_after(1, status, body)
    }

    /// Scripted response reported as the result of `attempts` tries.
    pub fn then_respond_after(self, attempts: u32, status: u16, body: serde_json::Value) -> Self {
        self.script.lock().unwrap().push_back(Ok(UpstreamResponse {
            status,
            body,
            attempts,
        }));
        self
    }

    pub fn then_unreachable(self) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(Err(ExtractionError::Network("connection refused".to_string())));
        self
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ExtractionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

/// Body the default extraction answers with.
pub fn success_body(url: &str) -> serde_json::Value {
    json!({
        "success": true,
        "error": null,
        "error_code": null,
        "data": {
            "content": {"title": "Test Recipe", "source": url, "ingredients": ["salt"]},
            "metadata": {"platform": "test"}
        }
    })
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(
        &self,
        request: &ExtractionRequest,
    ) -> extraction_client::Result<UpstreamResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| {
            Ok(UpstreamResponse {
                status: 200,
                body: success_body(&request.url),
                attempts: 1,
            })
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryContentStore
// ---------------------------------------------------------------------------

/// In-memory content table and usage counters.
#[derive(Default)]
pub struct MemoryContentStore {
    rows: Mutex<Vec<ImportedContent>>,
    counters: Mutex<HashMap<Uuid, i64>>,
    increments: AtomicUsize,
    fail_lookups: AtomicBool,
    fail_inserts: AtomicBool,
    fail_increments: AtomicBool,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an existing record, created `age_secs` ago.
    pub fn with_record(self, user_id: Option<Uuid>, source_url: &str, age_secs: i64) -> Self {
        let created_at = Utc::now() - Duration::seconds(age_secs);
        self.rows.lock().unwrap().push(ImportedContent {
            id: Uuid::new_v4(),
            user_id,
            source_url: source_url.to_string(),
            content: json!({"title": "Cached Recipe", "age": age_secs}),
            metadata: json!({}),
            status: ProcessingStatus::Completed,
            retry_count: 0,
            created_at,
            updated_at: created_at,
        });
        self
    }

    pub fn with_profile(self, profile_id: Uuid) -> Self {
        self.counters.lock().unwrap().insert(profile_id, 0);
        self
    }

    pub fn fail_lookups(&self) {
        self.fail_lookups.store(true, Ordering::SeqCst);
    }

    pub fn fail_inserts(&self) {
        self.fail_inserts.store(true, Ordering::SeqCst);
    }

    pub fn fail_increments(&self) {
        self.fail_increments.store(true, Ordering::SeqCst);
    }

    pub fn rows(&self) -> Vec<ImportedContent> {
        self.rows.lock().unwrap().clone()
    }

    pub fn usage(&self, profile_id: Uuid) -> i64 {
        self.counters
            .lock()
            .unwrap()
            .get(&profile_id)
            .copied()
            .unwrap_or(0)
    }

    /// Successful increments across all profiles.
    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn find_latest_by_source_url(&self, url: &str) -> Result<Option<ImportedContent>> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            bail!("lookup failed");
        }
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.source_url == url && r.status == ProcessingStatus::Completed)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    async fn insert_content(&self, new: NewContent) -> Result<ImportedContent> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            bail!("insert failed");
        }
        let now = Utc::now();
        let record = ImportedContent {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            source_url: new.source_url,
            content: new.content,
            metadata: new.metadata,
            status: ProcessingStatus::Completed,
            retry_count: new.retry_count,
            created_at: now,
            updated_at: now,
        };
        self.rows.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn increment_usage_counter(&self, profile_id: Uuid) -> Result<i64> {
        if self.fail_increments.load(Ordering::SeqCst) {
            bail!("increment failed");
        }
        let mut counters = self.counters.lock().unwrap();
        let count = counters.entry(profile_id).or_insert(0);
        *count += 1;
        self.increments.fetch_add(1, Ordering::SeqCst);
        Ok(*count)
    }

    async fn anonymize_user_content(&self, profile_id: Uuid) -> Result<u64> {
        let mut rows = self.rows.lock().unwrap();
        let mut touched = 0;
        for row in rows.iter_mut().filter(|r| r.user_id == Some(profile_id)) {
            row.user_id = None;
            row.updated_at = Utc::now();
            touched += 1;
        }
        Ok(touched)
    }
}

// ---------------------------------------------------------------------------
// MemoryProfiles
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryProfiles {
    profiles: HashMap<Uuid, Uuid>,
    failing: bool,
}

impl MemoryProfiles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, auth_user_id: Uuid, profile_id: Uuid) -> Self {
        self.profiles.insert(auth_user_id, profile_id);
        self
    }

    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }
}

#[async_trait]
impl ProfileDirectory for MemoryProfiles {
    async fn profile_id_for_auth_user(&self, auth_user_id: Uuid) -> Result<Option<Uuid>> {
        if self.failing {
            bail!("profiles unavailable");
        }
        Ok(self.profiles.get(&auth_user_id).copied())
    }
}
