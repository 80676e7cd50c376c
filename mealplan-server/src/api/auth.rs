//! Login, logout and the session middleware
//!
//! The session lives entirely in a signed cookie (see
//! `mealplan_common::session`); the server keeps no session table.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use mealplan_common::password::{hash_password, validate_new_password, verify_password};
use mealplan_common::session::{
    clear_session_cookie, decode_session, encode_session, find_cookie, session_cookie,
    SessionData, SessionError, SESSION_COOKIE_NAME,
};
use mealplan_common::time;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};

use super::ApiJson;
use crate::db::users;
use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

/// Identity returned to the client
#[derive(Debug, Serialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
}

/// Verified session from the request's cookie header
pub fn session_from_headers(headers: &HeaderMap, secret: i64) -> Result<SessionData, SessionError> {
    let token = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookies| find_cookie(cookies, SESSION_COOKIE_NAME))
        .ok_or(SessionError::NotLoggedIn)?;

    decode_session(token, secret, time::now_seconds())
}

fn set_cookie(value: String) -> ApiResult<HeaderMap> {
    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&value)
        .map_err(|e| ApiError::Internal(format!("Invalid cookie header: {}", e)))?;
    headers.insert(header::SET_COOKIE, value);
    Ok(headers)
}

/// Non-empty trimmed field value
fn required(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Run password hashing off the async runtime
async fn blocking<T, F>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| ApiError::Internal(format!("Password task failed: {}", e)))
}

/// Session middleware for protected routes
///
/// Stores the verified [`SessionData`] in request extensions; answers 401
/// `{"error": "Unauthorized"}` when the cookie is missing, tampered or expired.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    match session_from_headers(request.headers(), state.session_secret) {
        Ok(session) => {
            request.extensions_mut().insert(session);
            Ok(next.run(request).await)
        }
        Err(e) => {
            debug!("Rejected {} {}: {}", request.method(), request.uri().path(), e);
            Err(ApiError::Unauthorized("Unauthorized".to_string()))
        }
    }
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    let (Some(username), Some(password)) = (required(req.username), required(req.password)) else {
        return Err(ApiError::BadRequest(
            "Username and password are required".to_string(),
        ));
    };
    let username = username.trim().to_string();

    let user = users::find_by_username(&state.db, &username).await?;
    let Some(user) = user else {
        warn!("Login failed for unknown user '{}'", username);
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    };

    let stored_hash = user.password_hash.clone();
    if !blocking(move || verify_password(&password, &stored_hash)).await? {
        warn!("Login failed for user '{}': wrong password", username);
        return Err(ApiError::Unauthorized("Invalid credentials".to_string()));
    }

    let session = SessionData::logged_in(user.id, user.username.clone(), time::now_seconds());
    let token = encode_session(&session, state.session_secret);
    let headers = set_cookie(session_cookie(&token, state.secure_cookies))?;

    info!("User '{}' logged in", user.username);
    Ok((
        headers,
        Json(json!({
            "success": true,
            "user": SessionUser { id: user.id, username: user.username },
        })),
    ))
}

/// POST /api/auth/logout
pub async fn logout(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let headers = set_cookie(clear_session_cookie(state.secure_cookies))?;
    Ok((headers, Json(json!({ "success": true }))))
}

/// GET /api/auth/session
pub async fn get_session(State(state): State<AppState>, headers: HeaderMap) -> Response {
    match session_from_headers(&headers, state.session_secret) {
        Ok(session) => Json(json!({
            "isLoggedIn": true,
            "user": SessionUser { id: session.user_id, username: session.username },
        }))
        .into_response(),
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "isLoggedIn": false })),
        )
            .into_response(),
    }
}

/// PATCH /api/auth/update-password
pub async fn update_password(
    State(state): State<AppState>,
    Extension(session): Extension<SessionData>,
    ApiJson(req): ApiJson<UpdatePasswordRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let (Some(current), Some(new)) = (required(req.current_password), required(req.new_password))
    else {
        return Err(ApiError::BadRequest(
            "Current password and new password are required".to_string(),
        ));
    };
    validate_new_password(&new)?;

    let user = users::find_by_id(&state.db, session.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    let stored_hash = user.password_hash.clone();
    if !blocking(move || verify_password(&current, &stored_hash)).await? {
        return Err(ApiError::Unauthorized(
            "Current password is incorrect".to_string(),
        ));
    }

    let new_hash = blocking(move || hash_password(&new)).await??;
    users::update_password_hash(&state.db, user.id, &new_hash).await?;

    info!("Password updated for user '{}'", user.username);
    Ok(Json(json!({
        "success": true,
        "message": "Password updated successfully",
    })))
}
