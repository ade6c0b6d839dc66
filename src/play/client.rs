//! HTTP implementation of [`EditsApi`] against the Android Publisher REST API.

use super::api::{CloseOutcome, CommitResult, EditSession, EditsApi, UploadResult};
use super::auth::fetch_access_token;
use super::credentials::Credential;
use crate::PublishConfig;
use crate::error::RemoteServiceError;
use async_trait::async_trait;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tokio::sync::OnceCell;
use tokio_util::io::ReaderStream;

/// Longest slice of a raw error body kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 512;

const BUNDLE_MIME_TYPE: &str = "application/octet-stream";

/// `AppEdit` resource
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppEdit {
    id: String,
    #[serde(default)]
    expiry_time_seconds: Option<String>,
}

/// `Bundle` resource
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Bundle {
    version_code: i64,
    #[serde(default)]
    sha1: Option<String>,
    #[serde(default)]
    sha256: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

/// Publishing API client authenticated as a service account.
///
/// The access token is requested on the first call and reused for the rest
/// of the run.
pub struct PlayClient {
    http: reqwest::Client,
    credential: Credential,
    api_base_url: String,
    upload_base_url: String,
    token: OnceCell<String>,
}

impl PlayClient {
    /// Create a client using the timeouts and endpoints from `config`
    pub fn new(credential: Credential, config: &PublishConfig) -> Result<Self, RemoteServiceError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|source| RemoteServiceError::Network {
                operation: "build http client",
                source,
            })?;

        Ok(Self {
            http,
            credential,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            upload_base_url: config.upload_base_url.trim_end_matches('/').to_string(),
            token: OnceCell::new(),
        })
    }

    fn edits_url(&self, package_name: &str) -> String {
        format!("{}/applications/{}/edits", self.api_base_url, package_name)
    }

    fn edit_url(&self, session: &EditSession) -> String {
        format!("{}/{}", self.edits_url(&session.package_name), session.edit_id)
    }

    fn bundle_upload_url(&self, session: &EditSession) -> String {
        format!(
            "{}/applications/{}/edits/{}/bundles?uploadType=media",
            self.upload_base_url, session.package_name, session.edit_id
        )
    }

    async fn access_token(&self) -> Result<&str, RemoteServiceError> {
        self.token
            .get_or_try_init(|| fetch_access_token(&self.http, &self.credential))
            .await
            .map(String::as_str)
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, RemoteServiceError> {
        let token = self.access_token().await?;
        let response = request
            .bearer_auth(token)
            .send()
            .await
            .map_err(|source| RemoteServiceError::Network { operation, source })?;
        ensure_success(operation, response).await
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, RemoteServiceError> {
        let response = self.send(operation, request).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| RemoteServiceError::UnexpectedResponse {
                operation,
                reason: e.to_string(),
            })
    }
}

#[async_trait]
impl EditsApi for PlayClient {
    async fn open_edit(&self, package_name: &str) -> Result<EditSession, RemoteServiceError> {
        log::info!("Opening edit for {}", package_name);

        let request = self
            .http
            .post(self.edits_url(package_name))
            .json(&serde_json::json!({}));
        let edit: AppEdit = self.send_json("create edit", request).await?;

        log::debug!("Opened edit {} (expires {:?})", edit.id, edit.expiry_time_seconds);

        Ok(EditSession {
            package_name: package_name.to_string(),
            edit_id: edit.id,
            expiry_time_seconds: edit
                .expiry_time_seconds
                .and_then(|secs| secs.parse().ok()),
        })
    }

    async fn upload_bundle(
        &self,
        session: &EditSession,
        artifact: &Path,
    ) -> Result<UploadResult, RemoteServiceError> {
        let unreadable = |source| RemoteServiceError::ArtifactUnreadable {
            path: artifact.to_path_buf(),
            source,
        };
        let file = tokio::fs::File::open(artifact).await.map_err(unreadable)?;
        let length = file.metadata().await.map_err(unreadable)?.len();

        log::info!(
            "Uploading {} ({} bytes) to edit {}",
            artifact.display(),
            length,
            session.edit_id
        );

        let request = self
            .http
            .post(self.bundle_upload_url(session))
            .header(CONTENT_TYPE, BUNDLE_MIME_TYPE)
            .header(CONTENT_LENGTH, length)
            .body(reqwest::Body::wrap_stream(ReaderStream::new(file)));
        let bundle: Bundle = self.send_json("upload bundle", request).await?;

        log::debug!(
            "Uploaded bundle version code {} (sha256 {:?})",
            bundle.version_code,
            bundle.sha256
        );

        Ok(UploadResult {
            version_code: bundle.version_code,
            sha1: bundle.sha1,
            sha256: bundle.sha256,
        })
    }

    async fn commit_edit(&self, session: &EditSession) -> Result<CommitResult, RemoteServiceError> {
        log::info!("Committing edit {}", session.edit_id);

        let request = self
            .http
            .post(format!("{}:commit", self.edit_url(session)))
            .header(CONTENT_LENGTH, 0);
        let edit: AppEdit = self.send_json("commit edit", request).await?;

        log::debug!("Committed edit {}", edit.id);

        Ok(CommitResult { id: edit.id })
    }

    async fn close_edit(&self, session: &EditSession) -> CloseOutcome {
        log::info!("Closing edit {}", session.edit_id);

        let request = self.http.delete(self.edit_url(session));
        match self.send("delete edit", request).await {
            Ok(_) => CloseOutcome::Deleted,
            Err(RemoteServiceError::Rejected {
                status: 404 | 410, ..
            }) => {
                log::debug!("Edit {} was already closed", session.edit_id);
                CloseOutcome::AlreadyClosed
            }
            Err(e) => {
                log::debug!("Failed to delete edit {}: {}", session.edit_id, e);
                CloseOutcome::Failed(e.to_string())
            }
        }
    }
}

async fn ensure_success(
    operation: &'static str,
    response: Response,
) -> Result<Response, RemoteServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    // A body we cannot read still leaves the status worth reporting.
    let body = response.text().await.unwrap_or_default();
    Err(RemoteServiceError::Rejected {
        operation,
        status: status.as_u16(),
        message: error_message(status, &body),
    })
}

fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return match envelope.error.status {
            Some(code) => format!("{} ({})", envelope.error.message, code),
            None => envelope.error.message,
        };
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}
