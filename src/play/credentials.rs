//! Service-account key loading.

use crate::error::CredentialError;
use jsonwebtoken::EncodingKey;
use serde::Deserialize;
use std::fmt;
use std::path::Path;

/// Token endpoint used when the key file does not name one
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// On-disk layout of a service-account JSON key.
///
/// Unknown fields (`project_id`, `client_id`, ...) are ignored.
#[derive(Debug, Deserialize)]
struct ServiceAccountKeyFile {
    #[serde(rename = "type")]
    key_type: String,
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

/// Loaded service-account identity, ready to sign token assertions.
pub struct Credential {
    client_email: String,
    private_key_id: Option<String>,
    token_uri: String,
    signing_key: EncodingKey,
}

impl Credential {
    /// Service account email, used as the assertion issuer
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Key id placed in the assertion header, if the key file has one
    pub fn private_key_id(&self) -> Option<&str> {
        self.private_key_id.as_deref()
    }

    /// OAuth token endpoint
    pub fn token_uri(&self) -> &str {
        &self.token_uri
    }

    pub(crate) fn signing_key(&self) -> &EncodingKey {
        &self.signing_key
    }
}

// Never print the key material.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

/// Load a service-account key file.
///
/// Fails with [`CredentialError`] when the file is missing, unreadable, not
/// service-account JSON, or carries a private key that is not RSA PEM.
/// No network access happens here.
pub fn load_credentials(path: &Path) -> Result<Credential, CredentialError> {
    let raw = std::fs::read_to_string(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            CredentialError::NotFound {
                path: path.to_path_buf(),
            }
        } else {
            CredentialError::Unreadable {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;

    let key_file: ServiceAccountKeyFile =
        serde_json::from_str(&raw).map_err(|source| CredentialError::Malformed {
            path: path.to_path_buf(),
            source,
        })?;

    if key_file.key_type != "service_account" {
        return Err(CredentialError::UnsupportedType {
            found: key_file.key_type,
        });
    }

    let signing_key = EncodingKey::from_rsa_pem(key_file.private_key.as_bytes()).map_err(|e| {
        CredentialError::InvalidKey {
            reason: e.to_string(),
        }
    })?;

    log::debug!(
        "Loaded service account {} from {}",
        key_file.client_email,
        path.display()
    );

    Ok(Credential {
        client_email: key_file.client_email,
        private_key_id: key_file.private_key_id,
        token_uri: key_file
            .token_uri
            .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
        signing_key,
    })
}
