//! Error types for bundle publishing.
//!
//! Credential problems are kept apart from failures reported by the remote
//! service so callers can tell "fix your key file" from "the API said no".

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for publisher operations
pub type Result<T> = std::result::Result<T, PublishError>;

/// Main error type for all publisher operations
#[derive(Error, Debug)]
pub enum PublishError {
    /// Service-account key could not be loaded
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// One of the remote edit calls failed
    #[error("Remote service error: {0}")]
    Remote(#[from] RemoteServiceError),

    /// CLI argument errors
    #[error("CLI error: {0}")]
    Cli(#[from] CliError),
}

/// Service-account key errors
#[derive(Error, Debug)]
pub enum CredentialError {
    /// Key file does not exist
    #[error("Credential file not found at {path}")]
    NotFound {
        /// Path that was looked up
        path: PathBuf,
    },

    /// Key file exists but could not be read
    #[error("Failed to read credential file {path}: {source}")]
    Unreadable {
        /// Path to the key file
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },

    /// Key file is not valid service-account JSON
    #[error("Malformed credential file {path}: {source}")]
    Malformed {
        /// Path to the key file
        path: PathBuf,
        /// JSON parsing error
        #[source]
        source: serde_json::Error,
    },

    /// Key file describes something other than a service account
    #[error("Unsupported credential type '{found}', expected 'service_account'")]
    UnsupportedType {
        /// Value of the `type` field
        found: String,
    },

    /// Private key is not a usable RSA PEM
    #[error("Invalid private key: {reason}")]
    InvalidKey {
        /// Reason for the error
        reason: String,
    },
}

/// Failures from the publishing API (token exchange included)
#[derive(Error, Debug)]
pub enum RemoteServiceError {
    /// Access token could not be obtained
    #[error("Authentication failed: {reason}")]
    Authentication {
        /// Reason for the error
        reason: String,
    },

    /// Transport-level failure (DNS, TLS, timeout, connection reset)
    #[error("Network error during {operation}: {source}")]
    Network {
        /// Operation that failed
        operation: &'static str,
        /// Underlying HTTP client error
        #[source]
        source: reqwest::Error,
    },

    /// Service answered with a non-success status
    #[error("{operation} rejected with HTTP {status}: {message}")]
    Rejected {
        /// Operation that failed
        operation: &'static str,
        /// HTTP status code
        status: u16,
        /// Message from the error envelope, or the raw body
        message: String,
    },

    /// Service answered 2xx but the payload was not what we expected
    #[error("Unexpected response from {operation}: {reason}")]
    UnexpectedResponse {
        /// Operation that failed
        operation: &'static str,
        /// Reason for the error
        reason: String,
    },

    /// Bundle file could not be opened for upload
    #[error("Cannot read bundle {path}: {source}")]
    ArtifactUnreadable {
        /// Path to the bundle
        path: PathBuf,
        /// Underlying IO error
        #[source]
        source: std::io::Error,
    },
}

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Invalid command line arguments
    #[error("Invalid arguments: {reason}")]
    InvalidArguments {
        /// Reason for the error
        reason: String,
    },
}

impl PublishError {
    /// Get actionable recovery suggestions for this error
    pub fn recovery_suggestions(&self) -> Vec<String> {
        match self {
            PublishError::Credential(CredentialError::NotFound { path }) => vec![
                format!("Check that {} exists", path.display()),
                "Pass the key file with --credentials or PLAY_CREDENTIALS".to_string(),
            ],
            PublishError::Credential(CredentialError::Malformed { .. })
            | PublishError::Credential(CredentialError::UnsupportedType { .. })
            | PublishError::Credential(CredentialError::InvalidKey { .. }) => vec![
                "Download a fresh JSON key for the service account".to_string(),
                "Make sure the file is the key itself, not an OAuth client secret".to_string(),
            ],
            PublishError::Remote(RemoteServiceError::Authentication { .. }) => vec![
                "Verify the service account is not disabled and the key is not revoked"
                    .to_string(),
                "Check the system clock; token assertions are time-bound".to_string(),
            ],
            PublishError::Remote(RemoteServiceError::Rejected { status: 401, .. })
            | PublishError::Remote(RemoteServiceError::Rejected { status: 403, .. }) => vec![
                "Grant the service account release permissions in the Play Console".to_string(),
                "Enable the Google Play Android Developer API for the key's project"
                    .to_string(),
            ],
            PublishError::Remote(RemoteServiceError::Rejected { status: 404, .. }) => vec![
                "Check the package name; the app must already exist in the Play Console"
                    .to_string(),
            ],
            PublishError::Remote(RemoteServiceError::ArtifactUnreadable { path, .. }) => vec![
                format!("Check that {} exists and is readable", path.display()),
            ],
            PublishError::Remote(RemoteServiceError::Network { .. }) => vec![
                "Check network connectivity and rerun".to_string(),
                "Increase --timeout for large bundles on slow links".to_string(),
            ],
            _ => vec!["Check the error message above for specific details".to_string()],
        }
    }

    /// True when the failure happened before any remote call was attempted
    pub fn is_local(&self) -> bool {
        matches!(self, PublishError::Credential(_) | PublishError::Cli(_))
    }

    /// Process exit code: 2 for rejected arguments, 1 for everything else
    pub fn exit_code(&self) -> i32 {
        match self {
            PublishError::Cli(_) => 2,
            _ => 1,
        }
    }
}
