//! Runs the HTTP client end to end against a local stand-in for the OAuth
//! token endpoint and the edits API.

use assert_cmd::Command;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use play_bundle_publisher::{
    CloseOutcome, EditSession, EditsApi, PlayClient, PublishConfig, PublishError,
    RemoteServiceError, load_credentials,
};
use predicates::prelude::*;
use serde_json::{Value, json};
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

const PACKAGE: &str = "com.example.app";
const EDIT_ID: &str = "edit-9";
const ACCESS_TOKEN: &str = "test-token";
const BUNDLE_BYTES: &[u8] = b"PK\x03\x04 not really a bundle";

const FIXTURE: &str = concat!(
    env!("CARGO_MANIFEST_DIR"),
    "/tests/fixtures/service_account.json"
);

/// Local Play service that records each request as `METHOD path?query`
#[derive(Clone)]
struct FakePlay {
    calls: Arc<Mutex<Vec<String>>>,
    uploaded: Arc<Mutex<Vec<u8>>>,
    upload_status: StatusCode,
    delete_status: StatusCode,
}

impl FakePlay {
    fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            uploaded: Arc::new(Mutex::new(Vec::new())),
            upload_status: StatusCode::OK,
            delete_status: StatusCode::NO_CONTENT,
        }
    }

    fn upload_status(mut self, status: StatusCode) -> Self {
        self.upload_status = status;
        self
    }

    fn delete_status(mut self, status: StatusCode) -> Self {
        self.delete_status = status;
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn uploaded(&self) -> Vec<u8> {
        self.uploaded.lock().expect("upload lock").clone()
    }
}

fn error_envelope(status: StatusCode, message: &str, code: &str) -> Response {
    let body = json!({
        "error": {
            "code": status.as_u16(),
            "message": message,
            "status": code,
        }
    });
    (status, Json(body)).into_response()
}

async fn handle(
    State(play): State<FakePlay>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let target = uri
        .path_and_query()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| uri.path().to_string());
    play.calls
        .lock()
        .expect("calls lock")
        .push(format!("{method} {target}"));

    let path = uri.path();
    if method == Method::POST && path == "/token" {
        return Json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": 3599,
        }))
        .into_response();
    }

    let bearer = format!("Bearer {ACCESS_TOKEN}");
    if headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) != Some(bearer.as_str()) {
        return error_envelope(
            StatusCode::UNAUTHORIZED,
            "Request is missing required authentication credential",
            "UNAUTHENTICATED",
        );
    }

    if method == Method::POST && path.starts_with("/upload/") {
        if !play.upload_status.is_success() {
            return error_envelope(
                play.upload_status,
                "The caller does not have permission",
                "PERMISSION_DENIED",
            );
        }
        *play.uploaded.lock().expect("upload lock") = body.to_vec();
        return Json(json!({
            "versionCode": 7,
            "sha1": "5d41402abc4b2a76b9719d911017c592",
            "sha256": "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824",
        }))
        .into_response();
    }

    if method == Method::POST && path.ends_with(":commit") {
        return Json(json!({ "id": EDIT_ID })).into_response();
    }

    if method == Method::POST && path.ends_with("/edits") {
        return Json(json!({
            "id": EDIT_ID,
            "expiryTimeSeconds": "1700003600",
        }))
        .into_response();
    }

    if method == Method::DELETE {
        if play.delete_status.is_success() {
            return play.delete_status.into_response();
        }
        return error_envelope(
            play.delete_status,
            "This Edit has been deleted.",
            "FAILED_PRECONDITION",
        );
    }

    StatusCode::NOT_FOUND.into_response()
}

async fn serve(play: FakePlay) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind local listener");
    let addr = listener.local_addr().expect("local address");
    let app = Router::new().fallback(handle).with_state(play);
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake play server");
    });
    addr
}

/// Key file pointing at the local token endpoint, plus a bundle to upload
struct Workspace {
    _dir: TempDir,
    credentials: PathBuf,
    artifact: PathBuf,
}

fn workspace(addr: SocketAddr) -> Workspace {
    let dir = tempfile::tempdir().expect("temp dir");

    let mut key: Value =
        serde_json::from_str(&fs::read_to_string(FIXTURE).expect("read fixture"))
            .expect("fixture is json");
    key["token_uri"] = json!(format!("http://{addr}/token"));
    let credentials = dir.path().join("credentials.json");
    fs::write(&credentials, key.to_string()).expect("write credentials");

    let artifact = dir.path().join("app-release.aab");
    fs::write(&artifact, BUNDLE_BYTES).expect("write bundle");

    Workspace {
        _dir: dir,
        credentials,
        artifact,
    }
}

fn api_base(addr: SocketAddr) -> String {
    format!("http://{addr}/androidpublisher/v3/")
}

fn upload_base(addr: SocketAddr) -> String {
    format!("http://{addr}/upload/androidpublisher/v3/")
}

fn config(addr: SocketAddr, workspace: &Workspace) -> PublishConfig {
    let mut config = PublishConfig::new(&workspace.artifact, PACKAGE, &workspace.credentials);
    config.request_timeout = Duration::from_secs(10);
    config.api_base_url = api_base(addr);
    config.upload_base_url = upload_base(addr);
    config
}

fn edits_path() -> String {
    format!("/androidpublisher/v3/applications/{PACKAGE}/edits")
}

#[tokio::test]
async fn test_publish_sends_calls_in_order() {
    let play = FakePlay::new();
    let addr = serve(play.clone()).await;
    let workspace = workspace(addr);

    let outcome = play_bundle_publisher::publish(&config(addr, &workspace))
        .await
        .expect("publish succeeds");

    assert_eq!(outcome.edit_id, EDIT_ID);
    assert_eq!(outcome.commit_id, EDIT_ID);
    assert_eq!(outcome.version_code, 7);
    assert!(outcome.sha256.is_some());
    assert_eq!(outcome.close, CloseOutcome::Deleted);

    assert_eq!(
        play.calls(),
        vec![
            "POST /token".to_string(),
            format!("POST {}", edits_path()),
            format!(
                "POST /upload/androidpublisher/v3/applications/{PACKAGE}/edits/{EDIT_ID}/bundles?uploadType=media"
            ),
            format!("POST {}/{EDIT_ID}:commit", edits_path()),
            format!("DELETE {}/{EDIT_ID}", edits_path()),
        ]
    );
    assert_eq!(play.uploaded(), BUNDLE_BYTES);
}

#[tokio::test]
async fn test_delete_not_found_means_already_closed() {
    let play = FakePlay::new().delete_status(StatusCode::NOT_FOUND);
    let addr = serve(play.clone()).await;
    let workspace = workspace(addr);
    let config = config(addr, &workspace);

    let credential = load_credentials(&workspace.credentials).expect("credentials load");
    let client = PlayClient::new(credential, &config).expect("client builds");
    let session = EditSession {
        package_name: PACKAGE.to_string(),
        edit_id: EDIT_ID.to_string(),
        expiry_time_seconds: None,
    };

    assert_eq!(client.close_edit(&session).await, CloseOutcome::AlreadyClosed);

    // Same answer when the delete follows a commit in a full run
    let outcome = play_bundle_publisher::publish(&config)
        .await
        .expect("publish succeeds");
    assert_eq!(outcome.close, CloseOutcome::AlreadyClosed);
}

#[tokio::test]
async fn test_upload_rejection_keeps_service_message_and_still_closes() {
    let play = FakePlay::new().upload_status(StatusCode::FORBIDDEN);
    let addr = serve(play.clone()).await;
    let workspace = workspace(addr);

    let err = play_bundle_publisher::publish(&config(addr, &workspace))
        .await
        .unwrap_err();

    match err {
        PublishError::Remote(RemoteServiceError::Rejected {
            operation,
            status,
            message,
        }) => {
            assert_eq!(operation, "upload bundle");
            assert_eq!(status, 403);
            assert_eq!(message, "The caller does not have permission (PERMISSION_DENIED)");
        }
        other => panic!("unexpected error: {other}"),
    }

    let calls = play.calls();
    assert!(!calls.iter().any(|c| c.ends_with(":commit")));
    assert_eq!(
        calls.last().map(String::as_str),
        Some(format!("DELETE {}/{EDIT_ID}", edits_path()).as_str())
    );
}

#[tokio::test]
async fn test_close_failure_after_commit_keeps_success() {
    let play = FakePlay::new().delete_status(StatusCode::BAD_REQUEST);
    let addr = serve(play.clone()).await;
    let workspace = workspace(addr);

    let outcome = play_bundle_publisher::publish(&config(addr, &workspace))
        .await
        .expect("publish succeeds");

    assert_eq!(outcome.commit_id, EDIT_ID);
    assert!(matches!(outcome.close, CloseOutcome::Failed(_)));
}

/// Starts the fake service on its own runtime so the binary can run
/// synchronously on the test thread.
fn serve_blocking(play: FakePlay) -> (tokio::runtime::Runtime, SocketAddr) {
    let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
    let addr = runtime.block_on(serve(play));
    (runtime, addr)
}

fn play_publish(addr: SocketAddr, workspace: &Workspace) -> Command {
    let mut cmd = Command::cargo_bin("play_publish").expect("binary builds");
    cmd.env_remove("PLAY_ARTIFACT_PATH")
        .env_remove("PLAY_PACKAGE_NAME")
        .env_remove("PLAY_CREDENTIALS")
        .env_remove("RUST_LOG")
        .env("NO_PROXY", "127.0.0.1")
        .arg(&workspace.artifact)
        .args(["--package", PACKAGE])
        .arg("--credentials")
        .arg(&workspace.credentials)
        .args(["--api-base-url", &api_base(addr)])
        .args(["--upload-base-url", &upload_base(addr)]);
    cmd
}

#[test]
fn test_cli_reports_commit_id() {
    let play = FakePlay::new().delete_status(StatusCode::NOT_FOUND);
    let (_runtime, addr) = serve_blocking(play.clone());
    let workspace = workspace(addr);

    play_publish(addr, &workspace)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Bundle uploaded (version code 7)"))
        .stdout(predicate::str::contains(format!("Edit committed: {EDIT_ID}")))
        .stderr(predicate::str::is_empty());

    assert_eq!(
        play.calls().last().map(String::as_str),
        Some(format!("DELETE {}/{EDIT_ID}", edits_path()).as_str())
    );
}

#[test]
fn test_cli_upload_failure_reports_error_and_closes() {
    let play = FakePlay::new().upload_status(StatusCode::FORBIDDEN);
    let (_runtime, addr) = serve_blocking(play.clone());
    let workspace = workspace(addr);

    play_publish(addr, &workspace)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Publish failed"))
        .stderr(predicate::str::contains("The caller does not have permission"))
        .stdout(predicate::str::contains("Edit committed").not());

    let deletes = play
        .calls()
        .iter()
        .filter(|c| c.starts_with("DELETE "))
        .count();
    assert_eq!(deletes, 1);
}

#[test]
fn test_cli_close_failure_after_commit_is_not_reported() {
    let play = FakePlay::new().delete_status(StatusCode::BAD_REQUEST);
    let (_runtime, addr) = serve_blocking(play);
    let workspace = workspace(addr);

    play_publish(addr, &workspace)
        .assert()
        .code(0)
        .stdout(predicate::str::contains(format!("Edit committed: {EDIT_ID}")))
        .stdout(predicate::str::contains("expire").not())
        .stderr(predicate::str::is_empty());
}

#[test]
fn test_cli_verbose_mentions_close_failure_after_commit() {
    let play = FakePlay::new().delete_status(StatusCode::BAD_REQUEST);
    let (_runtime, addr) = serve_blocking(play);
    let workspace = workspace(addr);

    play_publish(addr, &workspace)
        .arg("--verbose")
        .assert()
        .code(0)
        .stdout(predicate::str::contains("Edit left to expire"))
        .stderr(predicate::str::is_empty());
}
