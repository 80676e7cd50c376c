//! Security tests for mealplan-server
//!
//! Tests security-critical features:
//! - Session cookie required on protected routes; tampered, foreign and
//!   expired cookies are rejected
//! - Image serving and deletion stay inside the uploads directory
//! - Upload size limits

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mealplan_common::db::init::init_database;
use mealplan_common::session::{encode_session, SessionData, SESSION_COOKIE_NAME};
use mealplan_common::time;
use mealplan_server::{build_router, seed, AppState};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::util::ServiceExt;

const SECRET: i64 = 12345;

/// Test helper: seeded database and router with the given upload limit
async fn setup_app_with_limit(max_upload_bytes: usize) -> (TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let pool = init_database(&dir.path().join("mealplan.db")).await.unwrap();
    seed::seed_database(&pool).await.unwrap();

    let uploads = dir.path().join("uploads");
    std::fs::create_dir_all(&uploads).unwrap();
    let state = AppState::new(pool, SECRET, uploads).with_max_upload_bytes(max_upload_bytes);
    (dir, build_router(state))
}

async fn setup_app() -> (TempDir, Router) {
    setup_app_with_limit(5 * 1024 * 1024).await
}

fn session_cookie_for(session: &SessionData, secret: i64) -> String {
    format!("{}={}", SESSION_COOKIE_NAME, encode_session(session, secret))
}

fn valid_cookie() -> String {
    session_cookie_for(&SessionData::logged_in(1, "admin", time::now_seconds()), SECRET)
}

fn get_with_cookie(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

async fn extract_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX)
        .await
        .expect("Should read body");
    serde_json::from_slice(&bytes).expect("Should parse JSON")
}

// =============================================================================
// Session Enforcement Tests
// =============================================================================

#[tokio::test]
async fn test_protected_routes_require_session() {
    let (_dir, app) = setup_app().await;

    for uri in [
        "/api/meals",
        "/api/categories",
        "/api/weekly-plans?weekStartDate=2025-01-06",
        "/api/weekly-plans/ingredients?weekStartDate=2025-01-06",
        "/api/dashboard/metrics",
        "/api/dashboard/calendar?year=2025&month=1",
        "/api/dashboard/day-detail?date=2025-01-06",
    ] {
        let response = app.clone().oneshot(get_with_cookie(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["error"], "Unauthorized");
    }

    let response = app
        .clone()
        .oneshot(get_with_cookie("/api/meals", Some(&valid_cookie())))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_tampered_cookie_rejected() {
    let (_dir, app) = setup_app().await;

    let cookie = valid_cookie();
    let mut tampered = cookie.clone();
    let last = tampered.pop().unwrap();
    tampered.push(if last == 'A' { 'B' } else { 'A' });

    let response = app
        .clone()
        .oneshot(get_with_cookie("/api/meals", Some(&tampered)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cookie_signed_with_other_secret_rejected() {
    let (_dir, app) = setup_app().await;

    let forged = session_cookie_for(
        &SessionData::logged_in(1, "admin", time::now_seconds()),
        SECRET + 1,
    );
    let response = app
        .oneshot(get_with_cookie("/api/categories", Some(&forged)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_expired_cookie_rejected() {
    let (_dir, app) = setup_app().await;

    // Issued a year ago, long past the session lifetime
    let issued = time::now_seconds() - 365 * 24 * 60 * 60;
    let expired = session_cookie_for(&SessionData::logged_in(1, "admin", issued), SECRET);
    let response = app
        .oneshot(get_with_cookie("/api/meals", Some(&expired)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_unknown_route_is_not_found_not_unauthorized() {
    let (_dir, app) = setup_app().await;

    let response = app
        .oneshot(get_with_cookie("/api/does-not-exist", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_logout_clears_cookie() {
    let (_dir, app) = setup_app().await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/auth/logout")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(set_cookie.starts_with(&format!("{}=;", SESSION_COOKIE_NAME)));
    assert!(set_cookie.contains("Max-Age=0"));
    assert!(set_cookie.contains("HttpOnly"));
}

// =============================================================================
// Path Traversal Tests
// =============================================================================

#[tokio::test]
async fn test_image_path_traversal_not_found() {
    let (_dir, app) = setup_app().await;

    for uri in [
        "/api/images/..%2Fmealplan.db",
        "/api/images/%2E%2E%2Fmealplan.db",
        "/api/images/..%5Cmealplan.db",
        "/api/images/missing.png",
    ] {
        let response = app.clone().oneshot(get_with_cookie(uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_delete_upload_stays_in_uploads_dir() {
    let (dir, app) = setup_app().await;
    let db_path = dir.path().join("mealplan.db");
    let cookie = valid_cookie();

    for path in ["/api/images/../mealplan.db", "/etc/passwd", "mealplan.db"] {
        let request = Request::builder()
            .method("DELETE")
            .uri(format!("/api/upload?path={path}"))
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK, "{path}");
        let body = extract_json(response.into_body()).await;
        assert_eq!(body["deleted"], false);
    }

    assert!(db_path.exists());
}

// =============================================================================
// Upload Size Tests
// =============================================================================

#[tokio::test]
async fn test_upload_over_image_limit_rejected() {
    let (_dir, app) = setup_app_with_limit(1024 * 1024).await;

    // PNG signature followed by padding, 1.25MB decoded
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.resize(1024 * 1024 + 256 * 1024, 0);
    let body = json!({ "image": STANDARD.encode(&bytes) }).to_string();

    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, valid_cookie())
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = extract_json(response.into_body()).await;
    assert_eq!(body["error"], "Image size must be less than 1MB");
}

#[tokio::test]
async fn test_upload_body_over_request_limit_rejected() {
    let (_dir, app) = setup_app_with_limit(1024 * 1024).await;

    // Request body limit is twice the image limit
    let body = json!({ "image": "A".repeat(3 * 1024 * 1024) }).to_string();
    let request = Request::builder()
        .method("POST")
        .uri("/api/upload")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::COOKIE, valid_cookie())
        .body(Body::from(body))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        response.status() == StatusCode::PAYLOAD_TOO_LARGE
            || response.status() == StatusCode::BAD_REQUEST,
        "Expected 413/400 for oversized body, got {}",
        response.status()
    );
}
