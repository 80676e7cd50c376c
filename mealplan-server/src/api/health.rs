//! Health check endpoint
//!
//! Reports database reachability and the state of the uploads directory.
//! Does not require a session.

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;
use tracing::warn;

use crate::AppState;

/// Number of file names echoed back in `sampleFiles`
const SAMPLE_FILE_COUNT: usize = 3;

/// Health check response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub module: String,
    pub version: String,
    pub database: String,
    pub uploads_dir: String,
    pub directory_exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sample_files: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health
///
/// 500 when the database or the uploads directory is unusable.
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let database_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    let images = state.uploads.list_images().await;

    let mut response = HealthResponse {
        status: "ok".to_string(),
        module: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: if database_ok { "ok" } else { "error" }.to_string(),
        uploads_dir: state.uploads.dir().display().to_string(),
        directory_exists: images.is_ok(),
        image_count: None,
        sample_files: Vec::new(),
        error: None,
    };

    match images {
        Ok(names) => {
            response.image_count = Some(names.len());
            response.sample_files = names.into_iter().take(SAMPLE_FILE_COUNT).collect();
        }
        Err(e) => {
            warn!("Uploads directory not accessible: {}", e);
            response.error = Some("Uploads directory not accessible".to_string());
        }
    }

    if !database_ok {
        response.error.get_or_insert_with(|| "Database not reachable".to_string());
    }

    let status = if response.error.is_some() {
        response.status = "error".to_string();
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(response))
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/health", get(health_check))
}
