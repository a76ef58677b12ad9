//! Integration tests for the kids activities backend.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use reqwest::{redirect::Policy, Client};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::activities::ActivityService;
use crate::config::{Config, LogFormat};
use crate::db::init_database;
use crate::db::memory::MemoryDocumentStore;
use crate::session::testing::{identity, ManualIdentityProvider};
use crate::session::{
    ClientSession, SessionContext, SessionStore, DEFAULT_SESSION_TTL, SESSION_COOKIE,
};
use crate::tags::TagRegistry;
use crate::{create_router, AppState};

const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    state: AppState,
    _temp_dir: TempDir,
}

fn test_config(temp_dir: &TempDir, public_paths: Vec<String>) -> Config {
    Config {
        db_path: temp_dir.path().join("test.sqlite"),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        log_format: LogFormat::Pretty,
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        public_paths,
        session_ttl: DEFAULT_SESSION_TTL,
    }
}

async fn test_state(temp_dir: &TempDir, public_paths: Vec<String>) -> AppState {
    let config = test_config(temp_dir, public_paths);
    let pool = init_database(&config.db_path)
        .await
        .expect("Failed to init DB");
    let state = AppState::new(pool, &config);
    state
        .accounts
        .upsert_account(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("Failed to seed admin");
    state
}

impl TestFixture {
    async fn new() -> Self {
        Self::with_public_paths(Vec::new()).await
    }

    async fn with_public_paths(public_paths: Vec<String>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let state = test_state(&temp_dir, public_paths).await;

        let app = create_router(state.clone());

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        // Spawn server
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        // Keep cookies, but surface redirects to the tests
        let client = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none())
            .build()
            .unwrap();

        TestFixture {
            client,
            base_url,
            state,
            _temp_dir: temp_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn sign_in(&self) {
        let resp = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    async fn get_json(&self, path: &str) -> (u16, Value) {
        let resp = self.client.get(self.url(path)).send().await.unwrap();
        let status = resp.status().as_u16();
        (status, resp.json().await.unwrap())
    }
}

async fn body_text(resp: axum::response::Response) -> String {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8_lossy(&bytes).into_owned()
}

/// `name=value` pair from a response's `Set-Cookie` header.
fn cookie_pair(resp: &axum::response::Response) -> String {
    let set_cookie = resp.headers()[header::SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

fn soccer(tags: &[&str]) -> Value {
    json!({
        "title": "Soccer",
        "description": "Kick about in the park",
        "location": "Central Park",
        "ageRange": { "min": 5, "max": 10 },
        "price": 0,
        "date": "2024-06-01",
        "time": "10:00",
        "category": "sports",
        "tags": tags,
    })
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_public_listing_without_sign_in() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/activities").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"], json!([]));

    let resp = fixture.client.get(fixture.url("/")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("Local Kids Activities"));
}

#[tokio::test]
async fn test_guard_redirects_pages_to_sign_in() {
    let fixture = TestFixture::new().await;

    for path in ["/admin/activities", "/admin/activities/create"] {
        let resp = fixture.client.get(fixture.url(path)).send().await.unwrap();
        assert_eq!(resp.status(), 303, "{} was not redirected", path);
        assert_eq!(resp.headers()[header::LOCATION.as_str()], "/admin/login");
    }

    // The sign-in page itself is always reachable
    let resp = fixture
        .client
        .get(fixture.url("/admin/login"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("Admin Login"));
}

#[tokio::test]
async fn test_guard_rejects_admin_api_without_session() {
    let fixture = TestFixture::new().await;

    let (status, body) = fixture.get_json("/api/admin/tags").await;
    assert_eq!(status, 401);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_configured_public_path_skips_guard() {
    let fixture = TestFixture::with_public_paths(vec!["/admin/activities".to_string()]).await;

    let resp = fixture
        .client
        .get(fixture.url("/admin/activities"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp.text().await.unwrap().contains("Manage Activities"));
}

#[tokio::test]
async fn test_login_with_bad_password() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "wrong" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "AUTHENTICATION_ERROR");
    assert_eq!(body["error"]["message"], "Invalid email or password");

    let (_, session) = fixture.get_json("/api/auth/session").await;
    assert_eq!(session["data"]["user"], Value::Null);
    assert_eq!(session["data"]["loading"], false);
    assert_eq!(fixture.state.sessions.len().await, 0);
}

#[tokio::test]
async fn test_login_session_and_logout() {
    let fixture = TestFixture::new().await;
    fixture.sign_in().await;

    let (_, session) = fixture.get_json("/api/auth/session").await;
    assert_eq!(session["data"]["user"]["email"], ADMIN_EMAIL);
    assert_eq!(session["data"]["loading"], false);

    let resp = fixture
        .client
        .get(fixture.url("/admin/activities"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .post(fixture.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let cleared = resp.headers()[header::SET_COOKIE.as_str()].to_str().unwrap();
    assert!(cleared.starts_with("kids_session=;"));
    assert!(cleared.contains("Max-Age=0"));
    assert_eq!(fixture.state.sessions.len().await, 0);

    let (_, session) = fixture.get_json("/api/auth/session").await;
    assert_eq!(session["data"]["user"], Value::Null);

    let resp = fixture
        .client
        .get(fixture.url("/admin/activities"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
}

#[tokio::test]
async fn test_create_activity_with_new_tag_end_to_end() {
    let fixture = TestFixture::new().await;
    fixture.state.tags.add_tag("sports").await.unwrap();
    fixture.sign_in().await;

    for tag in ["sports", "new-tag"] {
        let resp = fixture
            .client
            .post(fixture.url("/api/admin/editor/tags"))
            .json(&json!({ "tag": tag }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/editor/submit"))
        .json(&soccer(&[]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let created = &body["data"];
    assert_eq!(created["tags"], json!(["sports", "new-tag"]));
    assert_eq!(created["ageRange"], json!({ "min": 5, "max": 10 }));
    assert!(created["createdBy"].as_str().is_some_and(|s| !s.is_empty()));

    // Registry gained exactly the missing tag
    let (_, tags) = fixture.get_json("/api/admin/tags").await;
    assert_eq!(tags["data"], json!(["sports", "new-tag"]));

    // Newest first in the public listing
    let (_, listing) = fixture.get_json("/api/activities").await;
    assert_eq!(listing["data"][0]["id"], created["id"]);
    assert_eq!(listing["data"][0]["title"], "Soccer");

    // The draft was reset
    let (_, editor) = fixture.get_json("/api/admin/editor").await;
    assert_eq!(editor["data"]["tags"]["selected"], json!([]));
    assert_eq!(editor["data"]["notice"]["kind"], "success");
}

#[tokio::test]
async fn test_editor_suggestions_and_tag_removal() {
    let fixture = TestFixture::new().await;
    for tag in ["music", "outdoor", "sports"] {
        fixture.state.tags.add_tag(tag).await.unwrap();
    }
    fixture.sign_in().await;

    let (_, body) = fixture.get_json("/api/admin/editor/suggestions?q=O").await;
    assert_eq!(body["data"], json!(["outdoor", "sports"]));

    let (_, body) = fixture.get_json("/api/admin/editor/suggestions?q=out").await;
    assert_eq!(body["data"], json!(["outdoor"]));

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/editor/tags"))
        .json(&json!({ "tag": "music" }))
        .send()
        .await
        .unwrap();
    let widget: Value = resp.json().await.unwrap();
    assert_eq!(widget["data"]["selected"], json!(["music"]));
    assert_eq!(widget["data"]["showSuggestions"], false);

    for _ in 0..2 {
        let resp = fixture
            .client
            .delete(fixture.url("/api/admin/editor/tags/music"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let widget: Value = resp.json().await.unwrap();
        assert_eq!(widget["data"]["selected"], json!([]));
    }
}

#[tokio::test]
async fn test_one_shot_create_registers_tags() {
    let fixture = TestFixture::new().await;
    fixture.sign_in().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/activities"))
        .json(&soccer(&["swim", "swim", "outdoor"]))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["tags"], json!(["swim", "outdoor"]));

    let (_, tags) = fixture.get_json("/api/admin/tags").await;
    assert_eq!(tags["data"], json!(["swim", "outdoor"]));

    let (_, listing) = fixture.get_json("/api/admin/activities").await;
    assert_eq!(listing["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_validation_error() {
    let fixture = TestFixture::new().await;
    fixture.sign_in().await;

    let mut activity = soccer(&[]);
    activity["title"] = json!("");

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/activities"))
        .json(&activity)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["message"], "Title is required");

    let (_, listing) = fixture.get_json("/api/activities").await;
    assert_eq!(listing["data"], json!([]));
}

#[tokio::test]
async fn test_listing_unwraps_image_redirects() {
    let fixture = TestFixture::new().await;
    fixture.sign_in().await;

    let mut activity = soccer(&[]);
    activity["imageUrl"] =
        json!("https://www.google.com/imgres?imgurl=https%3A%2F%2Fcdn.test%2Fball.png&w=10");
    let resp = fixture
        .client
        .post(fixture.url("/api/admin/activities"))
        .json(&activity)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let (_, listing) = fixture.get_json("/api/activities").await;
    assert_eq!(listing["data"][0]["imageUrl"], "https://cdn.test/ball.png");
}

#[tokio::test]
async fn test_html_sign_in_and_create_form() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/admin/login"))
        .form(&[("email", ADMIN_EMAIL), ("password", "wrong")])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    assert!(resp.text().await.unwrap().contains("Invalid email or password"));

    let resp = fixture
        .client
        .post(fixture.url("/admin/login"))
        .form(&[("email", ADMIN_EMAIL), ("password", ADMIN_PASSWORD)])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);
    assert_eq!(resp.headers()[header::LOCATION.as_str()], "/admin/activities");

    // Signed in: the login page forwards to the dashboard
    let resp = fixture
        .client
        .get(fixture.url("/admin/login"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 303);

    let fields = [
        ("title", "Pottery"),
        ("description", "Clay for small hands"),
        ("location", "Art Center"),
        ("min_age", "6"),
        ("max_age", "12"),
        ("price", "15"),
        ("date", "2024-07-01"),
        ("time", "14:00"),
        ("category", "arts"),
        ("image_url", ""),
    ];

    let mut add_tag = fields.to_vec();
    add_tag.push(("tag_input", "crafts"));
    add_tag.push(("action", "add_tag"));
    let resp = fixture
        .client
        .post(fixture.url("/admin/activities/create"))
        .form(&add_tag)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let page = resp.text().await.unwrap();
    assert!(page.contains("remove_tag:crafts"));
    assert!(page.contains("Pottery"));

    let mut submit = fields.to_vec();
    submit.push(("tag_input", ""));
    submit.push(("action", "submit"));
    let resp = fixture
        .client
        .post(fixture.url("/admin/activities/create"))
        .form(&submit)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert!(resp
        .text()
        .await
        .unwrap()
        .contains("Activity created successfully!"));

    let (_, listing) = fixture.get_json("/api/activities").await;
    assert_eq!(listing["data"][0]["title"], "Pottery");
    assert_eq!(listing["data"][0]["category"], "arts");
    assert_eq!(listing["data"][0]["price"], 15.0);
    assert_eq!(listing["data"][0]["tags"], json!(["crafts"]));

    let resp = fixture.client.get(fixture.url("/")).send().await.unwrap();
    let page = resp.text().await.unwrap();
    assert!(page.contains(r#"<span class="category">arts</span>"#));
    assert!(page.contains(r#"<p class="meta">$15</p>"#));
}

#[tokio::test]
async fn test_html_create_form_keeps_draft_on_error() {
    let fixture = TestFixture::new().await;
    fixture.sign_in().await;

    let resp = fixture
        .client
        .post(fixture.url("/admin/activities/create"))
        .form(&[
            ("title", "Chess club"),
            ("min_age", "ten"),
            ("action", "submit"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let page = resp.text().await.unwrap();
    assert!(page.contains("Minimum age must be a number"));
    assert!(page.contains("Chess club"));

    let (_, listing) = fixture.get_json("/api/activities").await;
    assert_eq!(listing["data"], json!([]));
}

#[tokio::test]
async fn test_pending_session_shows_placeholder() {
    let temp_dir = TempDir::new().unwrap();
    let state = test_state(&temp_dir, Vec::new()).await;

    // A provider that has not reported yet keeps the session pending
    let provider = Arc::new(ManualIdentityProvider::new(None));
    let context = SessionContext::attach(provider);
    let (token, _) = state.sessions.insert(ClientSession::new(context)).await;
    let cookie = format!("{}={}", SESSION_COOKIE, token);

    let app = create_router(state);

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/admin/activities")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(body_text(resp).await.contains("Loading..."));

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/tags")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body: Value = serde_json::from_str(&body_text(resp).await).unwrap();
    assert_eq!(body["error"]["code"], "SESSION_PENDING");
}

#[tokio::test]
async fn test_unknown_category_is_rejected() {
    let fixture = TestFixture::new().await;
    fixture.sign_in().await;

    let mut activity = soccer(&[]);
    activity["category"] = json!("chess");

    let resp = fixture
        .client
        .post(fixture.url("/api/admin/activities"))
        .json(&activity)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["message"], "Unknown category: chess");
}

#[tokio::test]
async fn test_idle_sessions_expire() {
    let temp_dir = TempDir::new().unwrap();
    let mut state = test_state(&temp_dir, Vec::new()).await;
    state.sessions = SessionStore::with_ttl(Duration::ZERO);
    let sessions = state.sessions.clone();
    let app = create_router(state);

    // Browsers that never sign out do not pile up
    let mut cookie = String::new();
    for _ in 0..5 {
        let resp = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/api/auth/login")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "email": ADMIN_EMAIL, "password": ADMIN_PASSWORD }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        cookie = cookie_pair(&resp);
    }
    assert_eq!(sessions.len().await, 1);

    let resp = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/tags")
                .header(header::COOKIE, &cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(sessions.len().await, 0);
}

#[tokio::test]
async fn test_html_submit_reports_store_failure() {
    let temp_dir = TempDir::new().unwrap();
    let mut state = test_state(&temp_dir, Vec::new()).await;
    let store = Arc::new(MemoryDocumentStore::new());
    state.activities = ActivityService::new(store.clone());
    state.tags = TagRegistry::new(store.clone());

    let provider = Arc::new(ManualIdentityProvider::new(Some(identity())));
    let (client, _) = ClientSession::sign_in(provider, ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .unwrap();
    let (token, _) = state.sessions.insert(client).await;
    store.fail_writes(true);

    let form = "title=Pottery&description=Clay&location=Art+Center&min_age=6&max_age=12\
                &price=15&date=2024-07-01&time=14%3A00&category=arts&action=submit";
    let resp = create_router(state)
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/admin/activities/create")
                .header(header::COOKIE, format!("{}={}", SESSION_COOKIE, token))
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(form))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let page = body_text(resp).await;
    assert!(page.contains("Failed to create activity"));
    assert!(page.contains("Pottery"));
}
