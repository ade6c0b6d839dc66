//! The four edit calls the publisher depends on, and the values they return.

use crate::error::RemoteServiceError;
use async_trait::async_trait;
use std::path::Path;

/// Server-side edit transaction for one package.
///
/// Exists from `open_edit` until it is committed or deleted. At most one is
/// open per run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    /// Application package the edit belongs to
    pub package_name: String,
    /// Identifier returned by the service
    pub edit_id: String,
    /// Unix time after which the service discards the edit, when reported
    pub expiry_time_seconds: Option<i64>,
}

/// Confirmation that a bundle was attached to an edit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadResult {
    /// Version code read from the bundle's manifest
    pub version_code: i64,
    /// SHA-1 of the uploaded bundle, hex encoded
    pub sha1: Option<String>,
    /// SHA-256 of the uploaded bundle, hex encoded
    pub sha256: Option<String>,
}

/// Confirmation that an edit was committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitResult {
    /// Identifier of the committed edit
    pub id: String,
}

/// How closing an edit went.
///
/// Closing is best effort, so failures are reported here instead of as an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    /// Edit was open and has been deleted
    Deleted,
    /// Edit no longer existed (committed or expired)
    AlreadyClosed,
    /// Delete call failed; the edit expires server-side
    Failed(String),
}

impl CloseOutcome {
    /// True unless the delete call itself failed
    pub fn is_clean(&self) -> bool {
        !matches!(self, CloseOutcome::Failed(_))
    }
}

/// Edit operations exposed by the publishing service.
#[async_trait]
pub trait EditsApi: Send + Sync {
    /// Open a new edit for `package_name`.
    async fn open_edit(&self, package_name: &str) -> Result<EditSession, RemoteServiceError>;

    /// Upload the bundle at `artifact` into `session`.
    async fn upload_bundle(
        &self,
        session: &EditSession,
        artifact: &Path,
    ) -> Result<UploadResult, RemoteServiceError>;

    /// Commit `session`, publishing everything staged in it.
    async fn commit_edit(&self, session: &EditSession) -> Result<CommitResult, RemoteServiceError>;

    /// Delete `session`. Must tolerate an edit that is already gone.
    async fn close_edit(&self, session: &EditSession) -> CloseOutcome;
}
