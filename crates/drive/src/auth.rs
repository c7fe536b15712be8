//! Service account authentication.
//!
//! A service account key is exchanged for a short-lived bearer token using
//! the OAuth 2.0 JWT bearer grant: an RS256-signed assertion is posted to
//! the key's `token_uri`.

use chrono::Utc;
use hub_core::{AppError, AppResult};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Read-only Drive scope.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

/// Token endpoint used when the key does not name one.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Lifetime requested for minted tokens, in seconds.
const TOKEN_LIFETIME_SECS: i64 = 3600;

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// The fields of a service account key file this crate needs.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    /// Parse a key from its JSON text.
    pub fn from_json(json: &str) -> AppResult<Self> {
        serde_json::from_str(json).map_err(|e| {
            AppError::CredentialsUnavailable(format!("Invalid service account JSON: {}", e))
        })
    }

    /// Read and parse a key file.
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            AppError::CredentialsUnavailable(format!(
                "Failed to read service account file {:?}: {}",
                path, e
            ))
        })?;
        Self::from_json(&json)
    }

    /// Build the signed assertion for `scope`, issued at `issued_at`.
    pub fn assertion(&self, scope: &str, issued_at: i64) -> AppResult<String> {
        let claims = Claims {
            iss: &self.client_email,
            scope,
            aud: &self.token_uri,
            iat: issued_at,
            exp: issued_at + TOKEN_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.private_key.as_bytes()).map_err(|e| {
            AppError::CredentialsUnavailable(format!("Invalid service account private key: {}", e))
        })?;

        jsonwebtoken::encode(&header, &claims, &key)
            .map_err(|e| AppError::Drive(format!("Failed to sign token request: {}", e)))
    }

    /// Exchange a signed assertion for a bearer token.
    pub async fn fetch_token(&self, client: &reqwest::Client, scope: &str) -> AppResult<String> {
        let assertion = self.assertion(scope, Utc::now().timestamp())?;

        let response = client
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|e| AppError::Drive(format!("Failed to reach token endpoint: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::CredentialsUnavailable(format!(
                "Token request for {} rejected ({}): {}",
                self.client_email, status, error_text
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::Drive(format!("Failed to parse token response: {}", e)))?;

        tracing::debug!("Minted Drive token for {}", self.client_email);
        Ok(token.access_token)
    }
}

#[derive(Debug, Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}
