//! Release publisher: open an edit, upload one bundle, commit, always close.

use super::api::{CloseOutcome, EditSession, EditsApi};
use crate::PublishOutcome;
use crate::error::{PublishError, Result};
use std::future::Future;
use std::path::Path;

/// Drives one edit session against an [`EditsApi`].
pub struct Publisher<A> {
    api: A,
    package_name: String,
}

impl<A: EditsApi> Publisher<A> {
    /// Create a publisher for `package_name`
    pub fn new(api: A, package_name: impl Into<String>) -> Self {
        Self {
            api,
            package_name: package_name.into(),
        }
    }

    /// Underlying API handle
    pub fn api(&self) -> &A {
        &self.api
    }

    /// Upload `artifact` and commit it.
    ///
    /// The edit is closed exactly once whether upload and commit succeed or
    /// not. Only a failure to open the edit skips the close, since there is
    /// nothing to close.
    pub async fn publish(&self, artifact: &Path) -> Result<PublishOutcome> {
        let api = &self.api;
        let (staged, close) = self
            .with_edit(|session| async move {
                let upload = api.upload_bundle(&session, artifact).await?;
                let commit = api.commit_edit(&session).await?;
                Ok::<_, PublishError>((session, upload, commit))
            })
            .await?;

        let (session, upload, commit) = staged?;
        Ok(PublishOutcome {
            edit_id: session.edit_id,
            commit_id: commit.id,
            version_code: upload.version_code,
            sha256: upload.sha256,
            close,
        })
    }

    /// Run `body` inside a freshly opened edit and close the edit afterwards.
    ///
    /// Returns the body's own result next to the close outcome; a close
    /// failure never replaces the body's result.
    pub async fn with_edit<T, F, Fut>(&self, body: F) -> Result<(Result<T>, CloseOutcome)>
    where
        F: FnOnce(EditSession) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let session = self.api.open_edit(&self.package_name).await?;
        let mut guard = EditGuard::new(&session);

        let result = body(session.clone()).await;
        if let Err(e) = &result {
            log::error!("Edit {} failed: {}", session.edit_id, e);
        }

        let close = self.api.close_edit(&session).await;
        guard.disarm();

        match &close {
            CloseOutcome::Deleted => log::debug!("Edit {} deleted", session.edit_id),
            CloseOutcome::AlreadyClosed => {
                log::debug!("Edit {} already closed", session.edit_id)
            }
            // Once committed the bundle is published; a leftover edit just expires
            CloseOutcome::Failed(reason) if result.is_ok() => log::debug!(
                "Edit {} not deleted after commit: {}",
                session.edit_id,
                reason
            ),
            CloseOutcome::Failed(reason) => log::warn!(
                "Edit {} could not be closed and will expire server-side: {}",
                session.edit_id,
                reason
            ),
        }

        Ok((result, close))
    }
}

/// Flags an edit that was abandoned without a close call.
///
/// Only reachable if the scoped future is dropped mid-flight (cancellation
/// or panic); the async close cannot run from `Drop`.
struct EditGuard {
    edit_id: String,
    armed: bool,
}

impl EditGuard {
    fn new(session: &EditSession) -> Self {
        Self {
            edit_id: session.edit_id.clone(),
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for EditGuard {
    fn drop(&mut self) {
        if self.armed {
            log::warn!(
                "Edit {} was abandoned without being closed; it will expire server-side",
                self.edit_id
            );
        }
    }
}
