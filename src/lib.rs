//! # Play Bundle Publisher
//!
//! Uploads an Android App Bundle to Google Play using a service account.
//!
//! One run opens an edit, uploads the bundle into it, commits the edit and
//! then closes it. The close call always happens once an edit is open, even
//! when the upload or commit fails.
//!
//! ## Usage
//!
//! ```bash
//! play_publish app-release.aab --package com.example.app --credentials key.json
//! RUST_LOG=debug play_publish app-release.aab -p com.example.app
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod cli;
pub mod error;
pub mod play;

pub use cli::Args;
pub use error::{CliError, CredentialError, PublishError, RemoteServiceError, Result};
pub use play::{CloseOutcome, EditSession, EditsApi, PlayClient, Publisher, load_credentials};

use std::path::PathBuf;
use std::time::Duration;

/// Default Android Publisher REST root
pub const DEFAULT_API_BASE_URL: &str = "https://androidpublisher.googleapis.com/androidpublisher/v3/";

/// Default Android Publisher media upload root
pub const DEFAULT_UPLOAD_BASE_URL: &str =
    "https://androidpublisher.googleapis.com/upload/androidpublisher/v3/";

/// Configuration for one publish run
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Path to the `.aab` file to upload
    pub artifact_path: PathBuf,
    /// Application package name, e.g. `com.example.app`
    pub package_name: String,
    /// Path to the service-account JSON key
    pub credentials_path: PathBuf,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// REST root for edit calls
    pub api_base_url: String,
    /// REST root for media uploads
    pub upload_base_url: String,
}

impl PublishConfig {
    /// Create a configuration with default timeout and endpoints
    pub fn new(
        artifact_path: impl Into<PathBuf>,
        package_name: impl Into<String>,
        credentials_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            artifact_path: artifact_path.into(),
            package_name: package_name.into(),
            credentials_path: credentials_path.into(),
            request_timeout: Duration::from_secs(300),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            upload_base_url: DEFAULT_UPLOAD_BASE_URL.to_string(),
        }
    }
}

/// Result of a successful publish run
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    /// Edit the bundle was staged in
    pub edit_id: String,
    /// Identifier returned by the commit call
    pub commit_id: String,
    /// Version code of the uploaded bundle
    pub version_code: i64,
    /// SHA-256 of the uploaded bundle, when reported
    pub sha256: Option<String>,
    /// How the final close call went
    pub close: CloseOutcome,
}

/// Load credentials and publish `config.artifact_path`.
///
/// Credentials are loaded before any client is built, so a missing or broken
/// key file fails without touching the network.
pub async fn publish(config: &PublishConfig) -> Result<PublishOutcome> {
    let credential = load_credentials(&config.credentials_path)?;
    let client = PlayClient::new(credential, config)?;
    let publisher = Publisher::new(client, config.package_name.clone());
    publisher.publish(&config.artifact_path).await
}
