//! HTTP API for EduShare
//!
//! Endpoints:
//!   POST /api/auth/register          -> create account, returns user + token
//!   POST /api/auth/login             -> returns user + token
//!   GET  /api/materials              -> all materials with uploader summary
//!   GET  /api/materials/{id}         -> one material with uploader summary
//!   POST /api/materials              -> publish (auth, multipart)
//!   POST /api/materials/{id}/rate    -> rate (auth)
//!   POST /api/materials/{id}/download -> count a download (auth)
//!   GET  /api/users/{id}             -> public profile
//!   GET  /api/users/{id}/materials   -> materials uploaded by a user
//!   PUT  /api/users/profile          -> update own profile (auth)
//!   POST /api/requests               -> open a material request (auth)
//!   GET  /api/requests               -> list requests, optional ?status=
//!   GET  /api/requests/{id}          -> one request
//!   GET  /uploads/*                  -> uploaded files
//!   GET  /health                     -> health check

pub mod auth;
pub mod materials;
pub mod middleware;
pub mod requests;
pub mod users;

pub use middleware::{
    AuthUser, RateLimiter, SecurityMiddlewareConfig, SecurityState, auth_middleware,
    logging_middleware, rate_limit_middleware, security_headers_middleware,
};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use uuid::Uuid;

use crate::crypto::{PasswordHashing, TokenIssuer};
use crate::database::Store;
use crate::error::{AppError, AppResult};
use crate::reputation::{ReputationManager, ReputationThresholds};
use crate::uploads::{UPLOAD_URL_PREFIX, UploadStore};

/// Everything a handler can reach
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub tokens: Arc<TokenIssuer>,
    pub passwords: PasswordHashing,
    pub reputation: Arc<ReputationManager>,
    pub uploads: Arc<UploadStore>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn Store>,
        tokens: TokenIssuer,
        passwords: PasswordHashing,
        thresholds: ReputationThresholds,
        uploads: UploadStore,
    ) -> Self {
        let reputation = Arc::new(ReputationManager::new(store.clone(), thresholds));
        Self {
            store,
            tokens: Arc::new(tokens),
            passwords,
            reputation,
            uploads: Arc::new(uploads),
        }
    }
}

/// Router-level HTTP options
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub enable_cors: bool,
    pub max_body_bytes: usize,
}

/// Parse a path id. An id that cannot exist is reported as a missing record.
pub(crate) fn parse_id(raw: &str, what: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(format!("{} not found", what)))
}

pub async fn root() -> &'static str {
    "EduShare API is running"
}

pub async fn health_check() -> &'static str {
    "OK"
}

pub fn create_app(state: AppState, security: SecurityState, options: &HttpOptions) -> Router {
    let public = Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/materials", get(materials::list_materials))
        .route("/api/materials/{id}", get(materials::get_material))
        .route("/api/users/{id}", get(users::get_user))
        .route("/api/users/{id}/materials", get(users::get_user_materials))
        .route("/api/requests", get(requests::list_requests))
        .route("/api/requests/{id}", get(requests::get_request));

    let protected = Router::new()
        .route("/api/materials", post(materials::create_material))
        .route("/api/materials/{id}/rate", post(materials::rate_material))
        .route("/api/materials/{id}/download", post(materials::download_material))
        .route("/api/users/profile", put(users::update_profile))
        .route("/api/requests", post(requests::create_request))
        .route_layer(from_fn_with_state(state.tokens.clone(), auth_middleware));

    let mut app = public
        .merge(protected)
        .nest_service(UPLOAD_URL_PREFIX, ServeDir::new(state.uploads.dir()))
        .with_state(state)
        .layer(DefaultBodyLimit::max(options.max_body_bytes))
        .layer(from_fn_with_state(security.clone(), rate_limit_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn_with_state(security, logging_middleware))
        .layer(TraceLayer::new_for_http());

    if options.enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    app
}
