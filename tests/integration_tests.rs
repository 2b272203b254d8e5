//! Integration tests for the EduShare API
//!
//! These tests drive the full router, middleware included, over the
//! in-memory store: registration and login, bearer token enforcement,
//! material publishing with uploads, the rating and badge flow, download
//! counting, profiles and material requests.

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use chrono::Duration;
use edushare::database::{MaterialStore, RequestStore, UserStore};
use edushare::{
    AppState, HttpOptions, MemoryStore, PasswordHashing, ReputationThresholds,
    SecurityMiddlewareConfig, SecurityState, TokenIssuer, UploadStore, create_app,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// Test Helpers
// ============================================================================

const SECRET: &[u8] = b"integration-test-secret-0123456789";
const BOUNDARY: &str = "edushare-test-boundary";

struct TestApp {
    router: Router,
    store: Arc<MemoryStore>,
    _upload_dir: TempDir,
}

fn test_app() -> TestApp {
    test_app_with_rate_limit(10_000)
}

fn test_app_with_rate_limit(rate_limit_per_minute: u32) -> TestApp {
    let upload_dir = tempfile::tempdir().expect("tempdir");
    let store = Arc::new(MemoryStore::new());

    let state = AppState::new(
        store.clone(),
        TokenIssuer::new(SECRET, Duration::hours(24)),
        PasswordHashing::with_params(256, 1, 1).expect("argon2 params"),
        ReputationThresholds::default(),
        UploadStore::new(upload_dir.path()),
    );
    let security = SecurityState::new(SecurityMiddlewareConfig {
        rate_limit_per_minute,
        log_requests: false,
    });
    let router = create_app(
        state,
        security,
        &HttpOptions {
            enable_cors: true,
            max_body_bytes: 1024 * 1024,
        },
    );

    TestApp {
        router,
        store,
        _upload_dir: upload_dir,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, bytes) = self.send_raw(request).await;
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }

    async fn send_raw(&self, request: Request<Body>) -> (StatusCode, Vec<u8>) {
        let response = self.router.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        (status, bytes.to_vec())
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    async fn multipart(&self, token: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let request = Request::post("/api/materials")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .header(header::AUTHORIZATION, format!("Bearer {}", token))
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    /// Register a user and return (id, token)
    async fn register(&self, username: &str) -> (String, String) {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/register",
                None,
                json!({
                    "username": username,
                    "email": format!("{}@example.com", username),
                    "password": format!("{}-password", username),
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
        (
            body["_id"].as_str().unwrap().to_string(),
            body["token"].as_str().unwrap().to_string(),
        )
    }

    /// Publish a material by URL and return its id
    async fn publish(&self, token: &str, title: &str) -> String {
        let form = MultipartForm::new()
            .text("title", title)
            .text("description", "Practice problems")
            .text("subject", "Math")
            .text("educationLevel", "High School")
            .text("fileUrl", "https://files.example.com/algebra.pdf");
        let (status, body) = self.multipart(token, form.finish()).await;
        assert_eq!(status, StatusCode::CREATED, "publish failed: {}", body);
        body["_id"].as_str().unwrap().to_string()
    }

    async fn rate(&self, token: &str, material_id: &str, rating: Value) -> (StatusCode, Value) {
        self.json(
            Method::POST,
            &format!("/api/materials/{}/rate", material_id),
            Some(token),
            json!({ "rating": rating }),
        )
        .await
    }
}

/// Minimal multipart/form-data body builder
struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    fn new() -> Self {
        Self { body: Vec::new() }
    }

    fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    fn file(mut self, name: &str, file_name: &str, contents: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                BOUNDARY, name, file_name
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(contents);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

fn uuid(raw: &str) -> Uuid {
    Uuid::parse_str(raw).unwrap()
}

// ============================================================================
// Service
// ============================================================================

#[tokio::test]
async fn test_root_and_health() {
    let app = test_app();

    let (status, body) = app.send_raw(Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"EduShare API is running");

    let (status, body) = app.send_raw(Request::get("/health").body(Body::empty()).unwrap()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = test_app();
    let response = app
        .router
        .clone()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("x-ratelimit-limit"));
}

#[tokio::test]
async fn test_rate_limited_response_carries_security_headers() {
    let app = test_app_with_rate_limit(1);
    let request = || {
        Request::get("/health")
            .header("x-forwarded-for", "203.0.113.7")
            .body(Body::empty())
            .unwrap()
    };

    let first = app.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);

    let limited = app.router.clone().oneshot(request()).await.unwrap();
    assert_eq!(limited.status(), StatusCode::TOO_MANY_REQUESTS);
    let headers = limited.headers();
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert!(headers.contains_key("content-security-policy"));
    assert!(headers.contains_key(header::RETRY_AFTER));
}

// ============================================================================
// Auth
// ============================================================================

#[tokio::test]
async fn test_register_returns_user_without_password() {
    let app = test_app();
    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "username": "ada", "email": "ada@example.com", "password": "s3cret" }),
        )
        .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["username"], "ada");
    assert_eq!(body["email"], "ada@example.com");
    assert_eq!(body["badges"], json!(["Beginner"]));
    assert_eq!(body["contributionPoints"], 0);
    assert!(body["_id"].is_string());
    assert!(body["token"].is_string());
    assert!(body.get("password").is_none());
    assert!(body.get("passwordHash").is_none());
    assert!(!body.to_string().contains("s3cret"));
}

#[tokio::test]
async fn test_duplicate_email_or_username_rejected() {
    let app = test_app();
    app.register("ada").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "username": "someone", "email": "ada@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "User already exists");

    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "username": "ada", "email": "other@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    assert_eq!(app.store.user_count().unwrap(), 1);
}

#[tokio::test]
async fn test_register_requires_fields() {
    let app = test_app();
    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/register",
            None,
            json!({ "username": "", "email": "x@example.com", "password": "pw" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "username is required");
}

#[tokio::test]
async fn test_login() {
    let app = test_app();
    let (id, _) = app.register("grace").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "grace@example.com", "password": "grace-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], id.as_str());
    assert!(body["token"].is_string());

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "nobody@example.com", "password": "x" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");

    let (status, body) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "grace@example.com", "password": "wrong" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid password");
}

#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let app = test_app();
    let (_, token) = app.register("ada").await;
    let material_id = app.publish(&token, "Algebra").await;

    let request = Request::post(format!("/api/materials/{}/rate", material_id))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "rating": 5 }).to_string()))
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied. No token provided.");

    let material = app.store.find_material(uuid(&material_id)).await.unwrap().unwrap();
    assert!(material.ratings.is_empty());
}

#[tokio::test]
async fn test_invalid_tokens_are_forbidden_without_state_change() {
    let app = test_app();
    let (_, token) = app.register("ada").await;
    let material_id = app.publish(&token, "Algebra").await;

    let expired = TokenIssuer::new(SECRET, Duration::hours(-2))
        .issue(Uuid::new_v4())
        .unwrap();
    let forged = TokenIssuer::new(b"some-other-secret-some-other-secret", Duration::hours(1))
        .issue(Uuid::new_v4())
        .unwrap();

    let uri = format!("/api/materials/{}/download", material_id);
    for authorization in [
        format!("Bearer {}", expired),
        format!("Bearer {}", forged),
        "Bearer garbage".to_string(),
        format!("Token {}", token),
        "Bearer ".to_string(),
    ] {
        let request = Request::post(uri.as_str())
            .header(header::AUTHORIZATION, authorization)
            .body(Body::empty())
            .unwrap();
        let (status, body) = app.send(request).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["message"], "Invalid token");
    }

    let material = app.store.find_material(uuid(&material_id)).await.unwrap().unwrap();
    assert_eq!(material.download_count, 0);
}

#[tokio::test]
async fn test_bearer_scheme_is_case_insensitive() {
    let app = test_app();
    let (_, token) = app.register("ada").await;
    let material_id = app.publish(&token, "Algebra").await;

    let request = Request::post(format!("/api/materials/{}/download", material_id))
        .header(header::AUTHORIZATION, format!("bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["downloadCount"], 1);
}

// ============================================================================
// Materials
// ============================================================================

#[tokio::test]
async fn test_upload_stores_file_and_awards_points() {
    let app = test_app();
    let (user_id, token) = app.register("ada").await;

    let form = MultipartForm::new()
        .text("title", "Cell biology")
        .text("description", "Lecture notes")
        .text("subject", "Biology")
        .text("educationLevel", "University")
        .file("file", "cell notes.txt", b"mitochondria");
    let (status, body) = app.multipart(&token, form.finish()).await;

    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["uploadedBy"], user_id.as_str());
    assert_eq!(body["averageRating"], 0.0);
    assert_eq!(body["downloadCount"], 0);
    assert_eq!(body["ratings"], json!([]));

    let file_url = body["fileUrl"].as_str().unwrap().to_string();
    assert!(file_url.starts_with("/uploads/"));
    assert!(file_url.ends_with("-cell_notes.txt"));

    let (status, contents) = app
        .send_raw(Request::get(file_url.as_str()).body(Body::empty()).unwrap())
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(contents, b"mitochondria");

    let (_, user) = app.get(&format!("/api/users/{}", user_id)).await;
    assert_eq!(user["contributionPoints"], 10);
}

#[tokio::test]
async fn test_upload_requires_fields_and_file() {
    let app = test_app();
    let (user_id, token) = app.register("ada").await;

    let missing_title = MultipartForm::new()
        .text("description", "d")
        .text("subject", "s")
        .text("educationLevel", "e")
        .text("fileUrl", "https://files.example.com/x.pdf");
    let (status, body) = app.multipart(&token, missing_title.finish()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "title is required");

    let missing_file = MultipartForm::new()
        .text("title", "t")
        .text("description", "d")
        .text("subject", "s")
        .text("educationLevel", "e");
    let (status, body) = app.multipart(&token, missing_file.finish()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "fileUrl is required");

    assert_eq!(app.store.material_count().unwrap(), 0);
    let user = app.store.find_user(uuid(&user_id)).await.unwrap().unwrap();
    assert_eq!(user.contribution_points, 0);
}

#[tokio::test]
async fn test_upload_fulfills_request() {
    let app = test_app();
    let (_, requester) = app.register("student").await;
    let (_, uploader) = app.register("tutor").await;

    let (status, request) = app
        .json(
            Method::POST,
            "/api/requests",
            Some(&requester),
            json!({
                "title": "Trigonometry worksheet",
                "description": "Unit circle practice",
                "subject": "Math",
                "educationLevel": "High School",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "Open");
    let request_id = request["_id"].as_str().unwrap().to_string();

    let form = MultipartForm::new()
        .text("title", "Unit circle")
        .text("description", "Worksheet")
        .text("subject", "Math")
        .text("educationLevel", "High School")
        .text("fileUrl", "https://files.example.com/unit-circle.pdf")
        .text("fulfillsRequestId", &request_id);
    let (status, material) = app.multipart(&uploader, form.finish()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, request) = app.get(&format!("/api/requests/{}", request_id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(request["status"], "Fulfilled");
    assert_eq!(request["fulfillmentMaterial"], material["_id"]);
}

#[tokio::test]
async fn test_publish_with_json_body() {
    let app = test_app();
    let (ada_id, token) = app.register("ada").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/api/materials",
            Some(&token),
            json!({
                "title": "Cell Biology",
                "description": "Lecture notes",
                "subject": "Biology",
                "educationLevel": "University",
                "fileUrl": "https://files.example.com/cells.pdf",
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["fileUrl"], "https://files.example.com/cells.pdf");
    assert_eq!(body["uploadedBy"], ada_id.as_str());

    let user = app.store.find_user(uuid(&ada_id)).await.unwrap().unwrap();
    assert_eq!(user.contribution_points, 10);

    let (status, _) = app
        .json(
            Method::POST,
            "/api/materials",
            Some(&token),
            json!({ "title": "No file" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_invalid_fulfills_request_id_rejected() {
    let app = test_app();
    let (_, token) = app.register("ada").await;

    let form = MultipartForm::new()
        .text("title", "t")
        .text("description", "d")
        .text("subject", "s")
        .text("educationLevel", "e")
        .text("fileUrl", "https://files.example.com/x.pdf")
        .text("fulfillsRequestId", "not-an-id");
    let (status, _) = app.multipart(&token, form.finish()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(app.store.material_count().unwrap(), 0);
}

#[tokio::test]
async fn test_list_materials_populates_uploader_newest_first() {
    let app = test_app();
    let (user_id, token) = app.register("ada").await;

    let first = app.publish(&token, "First").await;
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = app.publish(&token, "Second").await;

    let (status, body) = app.get("/api/materials").await;
    assert_eq!(status, StatusCode::OK);

    let materials = body.as_array().unwrap();
    assert_eq!(materials.len(), 2);
    assert_eq!(materials[0]["_id"], second.as_str());
    assert_eq!(materials[1]["_id"], first.as_str());

    let uploader = &materials[0]["uploadedBy"];
    assert_eq!(uploader["_id"], user_id.as_str());
    assert_eq!(uploader["username"], "ada");
    assert_eq!(uploader["badges"], json!(["Beginner"]));
    assert!(uploader.get("email").is_none());
}

#[tokio::test]
async fn test_get_material() {
    let app = test_app();
    let (_, token) = app.register("ada").await;
    let id = app.publish(&token, "Algebra").await;

    let (status, body) = app.get(&format!("/api/materials/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["title"], "Algebra");
    assert_eq!(body["uploadedBy"]["username"], "ada");

    let (status, body) = app.get(&format!("/api/materials/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Material not found");

    let (status, _) = app.get("/api/materials/not-an-id").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Ratings & Reputation
// ============================================================================

#[tokio::test]
async fn test_rating_average_follows_latest_values() {
    let app = test_app();
    let (_, a) = app.register("author").await;
    let (_, b) = app.register("reader_b").await;
    let (_, c) = app.register("reader_c").await;
    let material_id = app.publish(&a, "Essay guide").await;

    let (status, _) = app.rate(&b, &material_id, json!(5)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.rate(&c, &material_id, json!(3)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["averageRating"], 4.0);

    let (status, body) = app.rate(&b, &material_id, json!(1)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["averageRating"], 2.0);
    assert_eq!(body["ratings"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_rating_validation() {
    let app = test_app();
    let (_, token) = app.register("ada").await;
    let material_id = app.publish(&token, "Algebra").await;

    for bad in [json!(0), json!(6), json!(3.5), json!(-1)] {
        let (status, _) = app.rate(&token, &material_id, bad).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    let (status, _) = app.rate(&token, &material_id, json!("five")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app.rate(&token, &Uuid::new_v4().to_string(), json!(4)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Material not found");

    let material = app.store.find_material(uuid(&material_id)).await.unwrap().unwrap();
    assert!(material.ratings.is_empty());
}

#[tokio::test]
async fn test_expert_badge_after_five_high_ratings() {
    let app = test_app();
    let (author_id, author) = app.register("author").await;
    let material_id = app.publish(&author, "Physics formulas").await;

    let mut raters = Vec::new();
    for i in 0..6 {
        raters.push(app.register(&format!("reader{}", i)).await.1);
    }

    for rater in &raters[..4] {
        app.rate(rater, &material_id, json!(5)).await;
    }
    let (_, user) = app.get(&format!("/api/users/{}", author_id)).await;
    assert_eq!(user["badges"], json!(["Beginner"]));

    app.rate(&raters[4], &material_id, json!(4)).await;
    app.rate(&raters[5], &material_id, json!(5)).await;

    let (_, user) = app.get(&format!("/api/users/{}", author_id)).await;
    assert_eq!(user["badges"], json!(["Beginner", "Expert"]));
}

#[tokio::test]
async fn test_download_increments_counter() {
    let app = test_app();
    let (_, token) = app.register("ada").await;
    let material_id = app.publish(&token, "Algebra").await;
    let uri = format!("/api/materials/{}/download", material_id);

    for expected in 1..=3 {
        let (status, body) = app.json(Method::POST, &uri, Some(&token), json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["downloadCount"], expected);
    }

    let (status, _) = app
        .json(
            Method::POST,
            &format!("/api/materials/{}/download", Uuid::new_v4()),
            Some(&token),
            json!({}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Users
// ============================================================================

#[tokio::test]
async fn test_get_user_profile() {
    let app = test_app();
    let (id, _) = app.register("ada").await;

    let (status, body) = app.get(&format!("/api/users/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ada");
    assert!(body.get("passwordHash").is_none());
    assert!(body["dateJoined"].is_string());

    let (status, body) = app.get(&format!("/api/users/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "User not found");
}

#[tokio::test]
async fn test_user_materials() {
    let app = test_app();
    let (ada_id, ada) = app.register("ada").await;
    let (_, grace) = app.register("grace").await;

    app.publish(&ada, "Mine").await;
    app.publish(&grace, "Theirs").await;

    let (status, body) = app.get(&format!("/api/users/{}/materials", ada_id)).await;
    assert_eq!(status, StatusCode::OK);
    let materials = body.as_array().unwrap();
    assert_eq!(materials.len(), 1);
    assert_eq!(materials[0]["title"], "Mine");
    assert_eq!(materials[0]["uploadedBy"], ada_id.as_str());

    let (status, body) = app.get(&format!("/api/users/{}/materials", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_update_profile() {
    let app = test_app();
    let (id, token) = app.register("ada").await;
    app.register("grace").await;

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            json!({
                "bio": "Mathematician",
                "profilePicture": "https://img.example.com/ada.png",
                "password": "hijacked",
                "contributionPoints": 9999,
                "badges": ["Master"],
            }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["_id"], id.as_str());
    assert_eq!(body["bio"], "Mathematician");
    assert_eq!(body["profilePicture"], "https://img.example.com/ada.png");
    assert_eq!(body["contributionPoints"], 0);
    assert_eq!(body["badges"], json!(["Beginner"]));

    // The password was not changed
    let (status, _) = app
        .json(
            Method::POST,
            "/api/auth/login",
            None,
            json!({ "email": "ada@example.com", "password": "ada-password" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            json!({ "username": "grace" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let user = app.store.find_user(uuid(&id)).await.unwrap().unwrap();
    assert_eq!(user.username, "ada");
}

#[tokio::test]
async fn test_update_profile_trims_login_identifiers() {
    let app = test_app();
    let (id, token) = app.register("ada").await;
    app.register("grace").await;

    let (status, body) = app
        .json(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            json!({ "username": "ada ", "email": " ada2@example.com " }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ada");
    assert_eq!(body["email"], "ada2@example.com");

    for email in ["ada2@example.com", " ada2@example.com "] {
        let (status, body) = app
            .json(
                Method::POST,
                "/api/auth/login",
                None,
                json!({ "email": email, "password": "ada-password" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login with {:?}: {}", email, body);
        assert_eq!(body["_id"], id.as_str());
    }

    // Padding does not sneak past the uniqueness check
    let (status, _) = app
        .json(
            Method::PUT,
            "/api/users/profile",
            Some(&token),
            json!({ "username": " grace " }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_profile_of_deleted_user() {
    let app = test_app();
    let ghost = TokenIssuer::new(SECRET, Duration::hours(1))
        .issue(Uuid::new_v4())
        .unwrap();

    let (status, _) = app
        .json(
            Method::PUT,
            "/api/users/profile",
            Some(&ghost),
            json!({ "bio": "boo" }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Requests
// ============================================================================

#[tokio::test]
async fn test_requests_listing_and_filter() {
    let app = test_app();
    let (user_id, token) = app.register("student").await;

    for title in ["Chemistry notes", "History timeline"] {
        let (status, _) = app
            .json(
                Method::POST,
                "/api/requests",
                Some(&token),
                json!({
                    "title": title,
                    "description": "Please",
                    "subject": "General",
                    "educationLevel": "High School",
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.get("/api/requests").await;
    assert_eq!(status, StatusCode::OK);
    let requests = body.as_array().unwrap();
    assert_eq!(requests.len(), 2);
    assert!(requests.iter().all(|r| r["requestedBy"] == user_id.as_str()));

    let open = app.store.list_requests(None).await.unwrap();
    let first = open[0].id;
    app.store.mark_fulfilled(first, Uuid::new_v4()).await.unwrap();

    let (_, body) = app.get("/api/requests?status=Open").await;
    assert_eq!(body.as_array().unwrap().len(), 1);

    let (_, body) = app.get("/api/requests?status=Fulfilled").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["_id"], first.to_string());

    let (status, _) = app.get("/api/requests?status=Pending").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_request_creation_requires_auth_and_fields() {
    let app = test_app();

    let (status, _) = app
        .json(
            Method::POST,
            "/api/requests",
            None,
            json!({ "title": "t", "description": "d", "subject": "s", "educationLevel": "e" }),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, token) = app.register("student").await;
    let (status, _) = app
        .json(
            Method::POST,
            "/api/requests",
            Some(&token),
            json!({ "title": "t", "description": "d", "subject": "", "educationLevel": "e" }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.get(&format!("/api/requests/{}", Uuid::new_v4())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
