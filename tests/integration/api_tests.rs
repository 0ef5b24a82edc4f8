//! End-to-end API tests covering registration, authentication, upload and
//! retrieval through the real router.

use std::io::Write;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::test_utils::{
    create_test_jpeg, create_test_png, decoded_dimensions, is_valid_jpeg, json_post,
    register_and_auth, response_bytes, response_text, test_app, test_app_with_store,
    FailingStore,
};

fn upload_request(token: &str, image_id: &str, params: Option<&str>, body: Vec<u8>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/upload_image")
        .header("access_token", token)
        .header("ImageID", image_id)
        .header("Content-Type", "application/octet-stream");
    if let Some(params) = params {
        builder = builder.header("CompressionParameters", params);
    }
    builder.body(Body::from(body)).unwrap()
}

fn get_image_request(token: &str, image_id: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/api/get_image")
        .header("access_token", token)
        .header("ImageID", image_id)
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_new_user() {
    let (router, _tokens, _log) = test_app();

    let response = router
        .oneshot(json_post(
            "/register_user",
            json!({"user_name": "alice", "password": "p1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response_text(response).await.contains("registered"));
}

#[tokio::test]
async fn test_register_duplicate_reports_already_exists() {
    let (router, _tokens, _log) = test_app();
    let creds = json!({"user_name": "alice", "password": "p1"});

    let response = router
        .clone()
        .oneshot(json_post("/register_user", creds.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response_text(response).await.contains("registered"));

    let response = router
        .clone()
        .oneshot(json_post("/register_user", creds))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response_text(response).await.contains("already exists"));
}

#[tokio::test]
async fn test_duplicate_registration_keeps_first_password() {
    let (router, _tokens, _log) = test_app();

    for password in ["original", "usurper"] {
        let response = router
            .clone()
            .oneshot(json_post(
                "/register_user",
                json!({"user_name": "alice", "password": password}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    // The first credential still authenticates; the second never took effect
    let response = router
        .clone()
        .oneshot(json_post(
            "/auth",
            json!({"user_name": "alice", "password": "original"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(json_post(
            "/auth",
            json!({"user_name": "alice", "password": "usurper"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_malformed_body_rejected() {
    let (router, _tokens, _log) = test_app();

    let request = Request::builder()
        .method("POST")
        .uri("/register_user")
        .header("Content-Type", "application/json")
        .body(Body::from(r#"{"user_name": "alice"}"#))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_auth_returns_usable_token() {
    let (router, tokens, _log) = test_app();

    let token = register_and_auth(&router, "alice", "p1").await;
    let claims = tokens.validate(&token).unwrap();
    assert_eq!(claims.user_id, 1);
}

#[tokio::test]
async fn test_auth_response_shape() {
    let (router, _tokens, _log) = test_app();
    register_and_auth(&router, "alice", "p1").await;

    let response = router
        .oneshot(json_post(
            "/auth",
            json!({"user_name": "alice", "password": "p1"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: serde_json::Value = serde_json::from_str(&response_text(response).await).unwrap();
    assert_eq!(body["status"], "success");
    assert!(body["access_token"].as_str().is_some());
}

#[tokio::test]
async fn test_auth_unknown_user_rejected() {
    let (router, _tokens, _log) = test_app();

    let response = router
        .oneshot(json_post(
            "/auth",
            json!({"user_name": "nobody", "password": "p1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response_text(response).await.contains("wrong user_name or password"));
}

#[tokio::test]
async fn test_auth_wrong_password_rejected() {
    let (router, _tokens, _log) = test_app();
    register_and_auth(&router, "alice", "p1").await;

    let response = router
        .oneshot(json_post(
            "/auth",
            json!({"user_name": "alice", "password": "wrong"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Upload & Retrieval
// =============================================================================

#[tokio::test]
async fn test_upload_and_fetch_roundtrip() {
    let (router, _tokens, _log) = test_app();
    let token = register_and_auth(&router, "alice", "p1").await;

    let png = create_test_png(1000, 1000);
    let params = r#"{"quality": 85, "width": 500, "height": 200}"#;

    let response = router
        .clone()
        .oneshot(upload_request(&token, "img1", Some(params), png))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response_text(response).await.contains("saved"));

    let response = router
        .clone()
        .oneshot(get_image_request(&token, "img1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/octet-stream"
    );

    let stored = response_bytes(response).await;
    // PNG upload normalized to canonical JPEG, resized into the bounding box
    assert!(is_valid_jpeg(&stored));
    assert_eq!(decoded_dimensions(&stored), (200, 200));
}

#[tokio::test]
async fn test_upload_without_params_keeps_dimensions() {
    let (router, _tokens, _log) = test_app();
    let token = register_and_auth(&router, "alice", "p1").await;

    let jpeg = create_test_jpeg(64, 48, 90);
    let response = router
        .clone()
        .oneshot(upload_request(&token, "img1", None, jpeg))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(get_image_request(&token, "img1"))
        .await
        .unwrap();
    let stored = response_bytes(response).await;
    assert!(is_valid_jpeg(&stored));
    assert_eq!(decoded_dimensions(&stored), (64, 48));
}

#[tokio::test]
async fn test_duplicate_upload_never_overwrites() {
    let (router, _tokens, _log) = test_app();
    let token = register_and_auth(&router, "alice", "p1").await;

    let first = create_test_png(100, 100);
    let response = router
        .clone()
        .oneshot(upload_request(&token, "img1", None, first))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(get_image_request(&token, "img1"))
        .await
        .unwrap();
    let original = response_bytes(response).await;

    // Second upload with the same id and different content
    let second = create_test_png(300, 300);
    let response = router
        .clone()
        .oneshot(upload_request(&token, "img1", None, second))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response_text(response).await.contains("already exist"));

    // The stored payload is byte-identical to the first upload
    let response = router
        .clone()
        .oneshot(get_image_request(&token, "img1"))
        .await
        .unwrap();
    assert_eq!(response_bytes(response).await, original);
}

#[tokio::test]
async fn test_upload_undecodable_payload_rejected() {
    let (router, _tokens, _log) = test_app();
    let token = register_and_auth(&router, "alice", "p1").await;

    let response = router
        .clone()
        .oneshot(upload_request(&token, "img1", None, b"not an image".to_vec()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Nothing was stored under the id
    let response = router
        .clone()
        .oneshot(get_image_request(&token, "img1"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_missing_image_id_rejected() {
    let (router, _tokens, _log) = test_app();
    let token = register_and_auth(&router, "alice", "p1").await;

    let request = Request::builder()
        .method("POST")
        .uri("/api/upload_image")
        .header("access_token", token)
        .body(Body::from(create_test_png(10, 10)))
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response_text(response).await.contains("ImageID"));
}

#[tokio::test]
async fn test_upload_malformed_params_rejected() {
    let (router, _tokens, _log) = test_app();
    let token = register_and_auth(&router, "alice", "p1").await;

    let response = router
        .oneshot(upload_request(
            &token,
            "img1",
            Some("{quality: oops}"),
            create_test_png(10, 10),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_unknown_image_not_found() {
    let (router, _tokens, _log) = test_app();
    let token = register_and_auth(&router, "alice", "p1").await;

    let response = router
        .oneshot(get_image_request(&token, "missing"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response_text(response).await.contains("missing"));
}

// =============================================================================
// Logs
// =============================================================================

#[tokio::test]
async fn test_get_logs_returns_file_contents() {
    let (router, tokens, log_file) = test_app();

    let mut file = log_file.as_file();
    writeln!(file, "2026-01-01T00:00:00Z INFO image-vault started").unwrap();
    file.sync_all().unwrap();

    let token = tokens.issue(1);
    let request = Request::builder()
        .method("GET")
        .uri("/api/get_logs")
        .header("access_token", token)
        .body(Body::empty())
        .unwrap();

    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response_text(response).await.contains("image-vault started"));
}

// =============================================================================
// Infrastructure Failures
// =============================================================================

#[tokio::test]
async fn test_store_failure_maps_to_500() {
    let (router, _tokens, _log) = test_app_with_store(FailingStore);

    let response = router
        .oneshot(json_post(
            "/register_user",
            json!({"user_name": "alice", "password": "p1"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    // The body stays generic; details go to the log only
    assert_eq!(response_text(response).await, "internal server error");
}

#[tokio::test]
async fn test_store_failure_on_fetch_maps_to_500() {
    let (router, tokens, _log) = test_app_with_store(FailingStore);

    let token = tokens.issue(1);
    let response = router
        .oneshot(get_image_request(&token, "img1"))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
