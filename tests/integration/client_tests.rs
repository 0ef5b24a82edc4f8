//! Client tests against a live server on an ephemeral port.
//!
//! These exercise the client-side responsibility the server deliberately does
//! not have: when a token lapses mid-session, the client re-authenticates
//! once and replays the request.

use std::io::Write;
use std::net::SocketAddr;
use std::time::Duration;

use tempfile::NamedTempFile;

use image_vault::client::{ClientError, VaultClient};
use image_vault::image::CompressionParams;
use image_vault::server::{create_router, AppState, RouterConfig, TokenService};

use super::test_utils::{
    create_test_png, decoded_dimensions, is_valid_jpeg, MemoryStore, TEST_SECRET,
};

/// Spawn a real server over a fresh in-memory store. Returns its address and
/// the live log file backing `/api/get_logs`.
async fn spawn_server(token_ttl: Duration) -> (SocketAddr, NamedTempFile) {
    let tokens = TokenService::new(TEST_SECRET, token_ttl);
    let log_file = NamedTempFile::new().expect("create temp log file");
    let state = AppState::new(MemoryStore::new(), tokens, log_file.path());
    let router = create_router(state, RouterConfig::new().with_tracing(false));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (addr, log_file)
}

fn client_for(addr: SocketAddr, user_name: &str, password: &str) -> VaultClient {
    VaultClient::new(format!("http://{}", addr), user_name, password)
}

#[tokio::test]
async fn test_full_flow() {
    let (addr, _log) = spawn_server(Duration::from_secs(30)).await;
    let client = client_for(addr, "alice", "p1");

    let message = client.register().await.unwrap();
    assert!(message.contains("registered"));

    client.authenticate().await.unwrap();

    let params = CompressionParams {
        quality: Some(85),
        width: Some(500),
        height: Some(200),
    };
    let message = client
        .upload_image("img1", create_test_png(1000, 1000), &params)
        .await
        .unwrap();
    assert!(message.contains("saved"));

    let stored = client.get_image("img1").await.unwrap();
    assert!(is_valid_jpeg(&stored));
    assert_eq!(decoded_dimensions(&stored), (200, 200));
}

#[tokio::test]
async fn test_expired_token_triggers_single_reauth_retry() {
    // One-second tokens so the first one lapses mid-session
    let (addr, _log) = spawn_server(Duration::from_secs(1)).await;
    let client = client_for(addr, "alice", "p1");

    client.register().await.unwrap();
    let first_token = client.authenticate().await.unwrap();

    client
        .upload_image("img1", create_test_png(50, 50), &CompressionParams::default())
        .await
        .unwrap();

    // Outlive the token, then fetch: the client sees a 403, re-auths once,
    // and the replayed request succeeds transparently.
    tokio::time::sleep(Duration::from_millis(1200)).await;

    let stored = client.get_image("img1").await.unwrap();
    assert!(is_valid_jpeg(&stored));

    let second_token = client.authenticate().await.unwrap();
    assert_ne!(first_token, second_token);
}

#[tokio::test]
async fn test_bad_credentials_surface_after_retry() {
    let (addr, _log) = spawn_server(Duration::from_secs(30)).await;

    // Never registered: authentication itself fails, so the retry policy has
    // nothing to work with and the error surfaces.
    let client = client_for(addr, "ghost", "p1");

    let result = client.get_image("img1").await;
    match result {
        Err(ClientError::AuthFailed { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected AuthFailed, got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_unknown_image_id_is_not_retried_as_auth_failure() {
    let (addr, _log) = spawn_server(Duration::from_secs(30)).await;
    let client = client_for(addr, "alice", "p1");

    client.register().await.unwrap();

    let result = client.get_image("missing").await;
    match result {
        Err(ClientError::Failed { status, message }) => {
            assert_eq!(status, 404);
            assert!(message.contains("missing"));
        }
        other => panic!("expected Failed(404), got {:?}", other.map(|_| ())),
    }
}

#[tokio::test]
async fn test_get_logs_roundtrip() {
    let (addr, log_file) = spawn_server(Duration::from_secs(30)).await;

    let mut file = log_file.as_file();
    writeln!(file, "startup complete").unwrap();
    file.sync_all().unwrap();

    let client = client_for(addr, "alice", "p1");
    client.register().await.unwrap();

    let logs = client.get_logs().await.unwrap();
    assert!(logs.contains("startup complete"));
}

#[tokio::test]
async fn test_duplicate_upload_reported_to_client() {
    let (addr, _log) = spawn_server(Duration::from_secs(30)).await;
    let client = client_for(addr, "alice", "p1");

    client.register().await.unwrap();

    let params = CompressionParams::default();
    let message = client
        .upload_image("img1", create_test_png(20, 20), &params)
        .await
        .unwrap();
    assert!(message.contains("saved"));

    let message = client
        .upload_image("img1", create_test_png(40, 40), &params)
        .await
        .unwrap();
    assert!(message.contains("already exist"));
}
