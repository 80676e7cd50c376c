//! mealplan-server library - weekly meal planner HTTP service
//!
//! JSON API for the meal catalog, categories, weekly plans, the dashboard and
//! image uploads. Everything under `/api` except auth, image serving and health
//! requires a signed session cookie.

use axum::Router;
use sqlx::SqlitePool;
use std::path::PathBuf;

pub mod api;
pub mod db;
pub mod error;
pub mod seed;
pub mod uploads;

pub use error::{ApiError, ApiResult};
use uploads::UploadStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Session signing secret
    pub session_secret: i64,
    /// Uploaded image directory
    pub uploads: UploadStore,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
    /// Largest accepted decoded upload, in bytes
    pub max_upload_bytes: usize,
}

impl AppState {
    /// Create new application state
    pub fn new(db: SqlitePool, session_secret: i64, uploads_dir: PathBuf) -> Self {
        Self {
            db,
            session_secret,
            uploads: UploadStore::new(uploads_dir),
            secure_cookies: false,
            max_upload_bytes: 5 * 1024 * 1024,
        }
    }

    pub fn with_secure_cookies(mut self, secure: bool) -> Self {
        self.secure_cookies = secure;
        self
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

/// Build application router
///
/// Health, login/logout/session and image serving are public; everything
/// else passes through the session middleware.
pub fn build_router(state: AppState) -> Router {
    use axum::extract::DefaultBodyLimit;
    use axum::middleware;
    use axum::routing::{get, patch, post};
    use tower_http::trace::TraceLayer;

    // Base64 inflates by 4/3; leave headroom so oversize images get a JSON 400
    let upload_body_limit = state.max_upload_bytes.saturating_mul(2).max(1024 * 1024);

    // Protected routes (require a session)
    let protected = Router::new()
        .route("/api/auth/update-password", patch(api::update_password))
        .route("/api/meals", get(api::list_meals).post(api::create_meal))
        .route(
            "/api/meals/:id",
            get(api::get_meal)
                .patch(api::update_meal)
                .delete(api::delete_meal),
        )
        .route(
            "/api/categories",
            get(api::list_categories).post(api::create_category),
        )
        .route(
            "/api/categories/:id",
            patch(api::update_category).delete(api::delete_category),
        )
        .route(
            "/api/weekly-plans",
            get(api::get_weekly_plan).post(api::create_weekly_plan),
        )
        .route("/api/weekly-plans/ingredients", get(api::get_ingredients))
        .route("/api/planned-meals", post(api::create_planned_meal))
        .route(
            "/api/planned-meals/:id",
            patch(api::update_planned_meal).delete(api::delete_planned_meal),
        )
        .route("/api/dashboard/metrics", get(api::get_metrics))
        .route("/api/dashboard/calendar", get(api::get_calendar))
        .route("/api/dashboard/day-detail", get(api::get_day_detail))
        .route(
            "/api/upload",
            post(api::upload_image)
                .delete(api::delete_upload)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            api::auth_middleware,
        ));

    // Public routes (no session)
    let public = Router::new()
        .route("/api/auth/login", post(api::login))
        .route("/api/auth/logout", post(api::logout))
        .route("/api/auth/session", get(api::get_session))
        .route("/api/images/:filename", get(api::serve_image))
        .merge(api::health_routes());

    Router::new()
        .merge(protected)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
