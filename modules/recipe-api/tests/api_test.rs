//! HTTP surface tests: the router with in-memory collaborators behind it.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::connect_info::MockConnectInfo,
    http::{header, Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, get_current_timestamp, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use recipe_api::auth::{AuthPolicy, Authenticator};
use recipe_api::jwt::{JwtAuthenticator, AUDIENCE};
use recipe_api::rate_limit::RateLimiter;
use recipe_api::{router, AppState};
use recipe_import::testing::{
    MemoryContentStore, MemoryProfiles, MockExtractor, MockPageFetcher, MockResolver,
};
use recipe_import::ImportPipeline;

const SECRET: &str = "test-jwt-secret";

struct Harness {
    store: Arc<MemoryContentStore>,
    extractor: Arc<MockExtractor>,
    profiles: MemoryProfiles,
    resolver: MockResolver,
    required: bool,
    rate_limit: usize,
}

impl Harness {
    fn new() -> Self {
        Self {
            store: Arc::new(MemoryContentStore::new()),
            extractor: Arc::new(MockExtractor::new()),
            profiles: MemoryProfiles::new(),
            resolver: MockResolver::new(),
            required: true,
            rate_limit: 100,
        }
    }

    fn bypass(mut self) -> Self {
        self.required = false;
        self
    }

    fn extractor(mut self, extractor: MockExtractor) -> Self {
        self.extractor = Arc::new(extractor);
        self
    }

    fn store(mut self, store: MemoryContentStore) -> Self {
        self.store = Arc::new(store);
        self
    }

    fn profile(mut self, auth_user_id: Uuid, profile_id: Uuid) -> Self {
        self.profiles = self.profiles.with(auth_user_id, profile_id);
        self
    }

    fn redirect(mut self, from: &str, to: &str) -> Self {
        self.resolver = self.resolver.redirect(from, to);
        self
    }

    fn rate_limit(mut self, max_per_hour: usize) -> Self {
        self.rate_limit = max_per_hour;
        self
    }

    fn app(self) -> (Router, Arc<MemoryContentStore>, Arc<MockExtractor>) {
        let pipeline = ImportPipeline::new(
            Arc::new(self.resolver),
            Arc::new(MockPageFetcher::new()),
            self.extractor.clone(),
            self.store.clone(),
            Arc::new(self.profiles),
        );
        let state = Arc::new(AppState {
            pipeline,
            auth: AuthPolicy {
                required: self.required,
            },
            authenticator: Some(Arc::new(JwtAuthenticator::new(SECRET)) as Arc<dyn Authenticator>),
            rate_limiter: RateLimiter::new(self.rate_limit),
        });
        let app = router(state).layer(MockConnectInfo(SocketAddr::from(([203, 0, 113, 7], 4000))));
        (app, self.store, self.extractor)
    }
}

fn token_for(auth_user_id: Uuid) -> String {
    let claims = json!({
        "sub": auth_user_id.to_string(),
        "email": "cook@example.com",
        "aud": AUDIENCE,
        "exp": get_current_timestamp() + 3600,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

fn post(path: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn health_is_ok_and_uncached() {
    let (app, _, _) = Harness::new().app();
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CACHE_CONTROL], "no-store");
}

#[tokio::test]
async fn missing_token_is_rejected() {
    let (app, store, extractor) = Harness::new().app();

    let (status, body) = send(&app, post("/api/import", json!({"url": "https://youtu.be/abc"}), None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "UNAUTHENTICATED");
    assert_eq!(body["data"], Value::Null);
    assert_eq!(extractor.calls(), 0);
    assert!(store.rows().is_empty());
}

#[tokio::test]
async fn forged_token_is_rejected() {
    let (app, _, _) = Harness::new().app();
    let forged = encode(
        &Header::default(),
        &json!({"sub": Uuid::new_v4().to_string(), "aud": AUDIENCE, "exp": get_current_timestamp() + 60}),
        &EncodingKey::from_secret(b"someone-else"),
    )
    .unwrap();

    let (status, body) = send(
        &app,
        post("/api/import", json!({"url": "https://youtu.be/abc"}), Some(&forged)),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHENTICATED");
}

#[tokio::test]
async fn authenticated_import_extracts_then_serves_cache() {
    let auth_user_id = Uuid::new_v4();
    let profile_id = Uuid::new_v4();
    let (app, store, extractor) = Harness::new()
        .store(MemoryContentStore::new().with_profile(profile_id))
        .profile(auth_user_id, profile_id)
        .app();
    let token = token_for(auth_user_id);

    let (status, first) = send(
        &app,
        post(
            "/api/import",
            json!({"url": "https://www.youtube.com/watch?v=abc123&t=30s"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["error"], Value::Null);
    assert_eq!(first["data"]["cached"], false);
    assert_eq!(first["data"]["source_url"], "https://www.youtube.com/watch?v=abc123");
    assert_eq!(first["data"]["content"]["title"], "Test Recipe");
    assert_eq!(extractor.requests()[0].email.as_deref(), Some("cook@example.com"));

    let (status, second) = send(
        &app,
        post(
            "/api/v2/import-from-url",
            json!({"url": "https://youtu.be/abc123"}),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["data"]["cached"], true);
    assert_eq!(second["data"]["content_id"], first["data"]["content_id"]);

    assert_eq!(extractor.calls(), 1);
    assert_eq!(store.usage(profile_id), 1);
    assert_eq!(store.rows()[0].user_id, Some(profile_id));
}

#[tokio::test]
async fn bypass_allows_anonymous_import() {
    let (app, store, _) = Harness::new().bypass().app();

    let (status, body) = send(
        &app,
        post("/api/import", json!({"url": "https://cooking.example.com/soup?utm=x"}), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["source_url"], "https://cooking.example.com/soup");
    assert_eq!(store.rows()[0].user_id, None);
    assert_eq!(store.increments(), 0);
}

#[tokio::test]
async fn user_without_profile_is_forbidden() {
    let (app, _, extractor) = Harness::new().app();

    let (status, body) = send(
        &app,
        post(
            "/api/import",
            json!({"url": "https://youtu.be/abc"}),
            Some(&token_for(Uuid::new_v4())),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "PROFILE_NOT_FOUND");
    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn invalid_urls_are_bad_requests() {
    let (app, _, extractor) = Harness::new().bypass().app();

    for url in ["not a url", "ftp://example.com/x", "http://127.0.0.1/admin", ""] {
        let (status, body) = send(&app, post("/api/import", json!({"url": url}), None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{url}");
        assert_eq!(body["error_code"], "INVALID_URL", "{url}");
    }
    assert_eq!(extractor.calls(), 0);
}

#[tokio::test]
async fn malformed_body_is_bad_request() {
    let (app, _, _) = Harness::new().bypass().app();

    let (status, body) = send(&app, post("/api/import", json!({"link": "https://a.com"}), None)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn upstream_error_passes_through() {
    let extractor = MockExtractor::new().then_respond(
        422,
        json!({"success": false, "error": "No recipe found in video", "error_code": "NO_RECIPE_FOUND", "data": null}),
    );
    let (app, store, _) = Harness::new().bypass().extractor(extractor).app();

    let (status, body) = send(&app, post("/api/import", json!({"url": "https://youtu.be/abc"}), None)).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No recipe found in video");
    assert_eq!(body["error_code"], "NO_RECIPE_FOUND");
    assert!(store.rows().is_empty());
}

#[tokio::test]
async fn unreachable_upstream_is_bad_gateway() {
    let extractor = MockExtractor::new().then_unreachable();
    let (app, _, _) = Harness::new().bypass().extractor(extractor).app();

    let (status, body) = send(&app, post("/api/import", json!({"url": "https://youtu.be/abc"}), None)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error_code"], "UPSTREAM_UNAVAILABLE");
}

#[tokio::test]
async fn imports_are_rate_limited_per_client() {
    let (app, _, extractor) = Harness::new().bypass().rate_limit(1).app();

    let (first, _) = send(&app, post("/api/import", json!({"url": "https://youtu.be/a"}), None)).await;
    let (second, body) = send(&app, post("/api/import", json!({"url": "https://youtu.be/b"}), None)).await;

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(body["error_code"], "RATE_LIMITED");
    assert_eq!(extractor.calls(), 1);
}

#[tokio::test]
async fn canonicalize_follows_redirects_without_storing() {
    let (app, store, extractor) = Harness::new()
        .bypass()
        .redirect(
            "https://vm.tiktok.com/ZMabc/",
            "https://www.tiktok.com/@chef/video/123?is_copy_url=1",
        )
        .app();

    let (status, body) = send(
        &app,
        post("/api/canonicalize", json!({"url": "https://vm.tiktok.com/ZMabc/"}), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["canonical_url"], "https://www.tiktok.com/@chef/video/123");
    assert_eq!(extractor.calls(), 0);
    assert!(store.rows().is_empty());
}

#[tokio::test]
async fn canonicalize_requires_auth_like_import() {
    let (app, _, _) = Harness::new().app();

    let (status, _) = send(
        &app,
        post("/api/canonicalize", json!({"url": "https://youtu.be/abc"}), None),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
