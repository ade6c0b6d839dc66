//! Service-account token exchange.
//!
//! Signs a short-lived RS256 assertion with the service account's key and
//! trades it for a bearer token at the key's token endpoint. One token is
//! fetched per run; refresh is not handled.

use super::credentials::Credential;
use crate::error::RemoteServiceError;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, Header};
use serde::{Deserialize, Serialize};

/// OAuth scope for the Android Publisher API
pub const ANDROID_PUBLISHER_SCOPE: &str = "https://www.googleapis.com/auth/androidpublisher";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Maximum lifetime the token endpoint accepts for an assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct AssertionClaims {
    pub(crate) iss: String,
    pub(crate) scope: String,
    pub(crate) aud: String,
    pub(crate) iat: i64,
    pub(crate) exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Build the signed assertion for `credential`, issued at `now`.
pub(crate) fn build_assertion(
    credential: &Credential,
    now: DateTime<Utc>,
) -> Result<String, RemoteServiceError> {
    let mut header = Header::new(Algorithm::RS256);
    header.kid = credential.private_key_id().map(str::to_string);

    let claims = AssertionClaims {
        iss: credential.client_email().to_string(),
        scope: ANDROID_PUBLISHER_SCOPE.to_string(),
        aud: credential.token_uri().to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::seconds(ASSERTION_LIFETIME_SECS)).timestamp(),
    };

    jsonwebtoken::encode(&header, &claims, credential.signing_key()).map_err(|e| {
        RemoteServiceError::Authentication {
            reason: format!("failed to sign token assertion: {e}"),
        }
    })
}

/// Exchange a signed assertion for an access token.
pub(crate) async fn fetch_access_token(
    http: &reqwest::Client,
    credential: &Credential,
) -> Result<String, RemoteServiceError> {
    let assertion = build_assertion(credential, Utc::now())?;

    log::info!("Requesting access token for {}", credential.client_email());

    let response = http
        .post(credential.token_uri())
        .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
        .send()
        .await
        .map_err(|e| RemoteServiceError::Authentication {
            reason: format!("token request failed: {e}"),
        })?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| RemoteServiceError::Authentication {
            reason: format!("failed to read token response: {e}"),
        })?;

    if !status.is_success() {
        return Err(RemoteServiceError::Authentication {
            reason: describe_token_error(status.as_u16(), &body),
        });
    }

    let token: TokenResponse =
        serde_json::from_str(&body).map_err(|e| RemoteServiceError::Authentication {
            reason: format!("token response is not valid JSON: {e}"),
        })?;

    log::debug!(
        "Access token acquired (expires in {}s)",
        token.expires_in.unwrap_or_default()
    );

    Ok(token.access_token)
}

fn describe_token_error(status: u16, body: &str) -> String {
    match serde_json::from_str::<TokenErrorResponse>(body) {
        Ok(TokenErrorResponse {
            error,
            error_description: Some(description),
        }) => format!("HTTP {status}: {error} ({description})"),
        Ok(TokenErrorResponse { error, .. }) => format!("HTTP {status}: {error}"),
        Err(_) => format!("HTTP {status}: {}", body.trim()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::play::credentials::load_credentials;
    use jsonwebtoken::{DecodingKey, Validation};
    use std::path::Path;

    const FIXTURE: &str = concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/tests/fixtures/service_account.json"
    );
    const PUBLIC_KEY: &str = include_str!("../../tests/fixtures/service_account.pub.pem");

    #[test]
    fn test_assertion_verifies_with_public_key() {
        let credential = load_credentials(Path::new(FIXTURE)).expect("fixture loads");
        let jwt = build_assertion(&credential, Utc::now()).expect("assertion signs");

        let header = jsonwebtoken::decode_header(&jwt).expect("header decodes");
        assert_eq!(header.alg, Algorithm::RS256);
        assert_eq!(header.kid.as_deref(), Some("0123456789abcdef"));

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[credential.token_uri()]);
        validation.set_issuer(&[credential.client_email()]);
        let key = DecodingKey::from_rsa_pem(PUBLIC_KEY.as_bytes()).expect("public key parses");
        let data = jsonwebtoken::decode::<AssertionClaims>(&jwt, &key, &validation)
            .expect("assertion verifies");

        assert_eq!(data.claims.scope, ANDROID_PUBLISHER_SCOPE);
        assert_eq!(data.claims.exp - data.claims.iat, ASSERTION_LIFETIME_SECS);
    }

    #[test]
    fn test_describe_token_error_prefers_description() {
        let body = r#"{"error":"invalid_grant","error_description":"Invalid JWT Signature."}"#;
        assert_eq!(
            describe_token_error(400, body),
            "HTTP 400: invalid_grant (Invalid JWT Signature.)"
        );
        assert_eq!(
            describe_token_error(400, r#"{"error":"invalid_client"}"#),
            "HTTP 400: invalid_client"
        );
        assert_eq!(describe_token_error(502, "Bad Gateway\n"), "HTTP 502: Bad Gateway");
    }
}
