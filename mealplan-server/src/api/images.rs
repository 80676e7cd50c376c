//! Image upload, removal and serving

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::ApiJson;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

/// Browser cache lifetime for uploaded images; names are never reused
const IMAGE_CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    /// Base64 data, optionally as a `data:image/...;base64,` URL
    pub image: Option<String>,
    /// Client-side name; only logged, the stored type is sniffed from content
    pub filename: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteUploadQuery {
    pub path: Option<String>,
}

/// POST /api/upload
pub async fn upload_image(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<UploadRequest>,
) -> ApiResult<Json<Value>> {
    let image = req
        .image
        .filter(|data| !data.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("Image data is required".to_string()))?;

    if let Some(name) = req.filename.as_deref() {
        tracing::debug!("Upload from client file '{}'", name);
    }

    let url = state.uploads.save(&image, state.max_upload_bytes).await?;
    Ok(Json(json!({ "success": true, "url": url })))
}

/// DELETE /api/upload?path=/api/images/<name>
pub async fn delete_upload(
    State(state): State<AppState>,
    Query(query): Query<DeleteUploadQuery>,
) -> ApiResult<Json<Value>> {
    let path = query
        .path
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("path parameter is required".to_string()))?;

    let deleted = state.uploads.delete_by_url(path.trim()).await?;
    Ok(Json(json!({ "success": true, "deleted": deleted })))
}

/// GET /api/images/:filename
pub async fn serve_image(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Response {
    match state.uploads.read(&filename).await {
        Ok(Some((bytes, kind))) => (
            [
                (header::CONTENT_TYPE, kind.content_type()),
                (header::CACHE_CONTROL, IMAGE_CACHE_CONTROL),
            ],
            bytes,
        )
            .into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
        Err(e) => {
            tracing::error!("Failed to read image {}: {}", filename, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}
