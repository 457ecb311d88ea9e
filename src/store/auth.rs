//! Credentials for the Realtime Database REST API.
//!
//! Database secrets and ID tokens are sent as-is in `?auth=`. A
//! service-account key is traded for a short-lived OAuth access token
//! (JWT bearer grant), which is sent in `?access_token=` and refreshed
//! shortly before it expires.

use crate::error::{BridgeError, Result};
use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use log::info;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const SCOPES: &str = "https://www.googleapis.com/auth/firebase.database \
                      https://www.googleapis.com/auth/userinfo.email";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the access token runs out.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// How requests identify themselves to the database.
pub enum Credentials {
    /// Database secret or ID token, sent as `?auth=`.
    Token(String),
    /// Service-account key, exchanged for access tokens sent as `?access_token=`.
    ServiceAccount(ServiceAccount),
}

impl Credentials {
    pub fn kind(&self) -> &'static str {
        match self {
            Credentials::Token(_) => "token",
            Credentials::ServiceAccount(_) => "service account",
        }
    }

    /// Query parameter to attach to a request.
    pub async fn query_pair(&self, http: &reqwest::Client) -> Result<(&'static str, String)> {
        match self {
            Credentials::Token(token) => Ok(("auth", token.clone())),
            Credentials::ServiceAccount(account) => {
                Ok(("access_token", account.access_token(http).await?))
            }
        }
    }
}

#[derive(Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    ASSERTION_LIFETIME_SECS as u64
}

struct AccessToken {
    value: String,
    refresh_at: Instant,
}

/// A parsed service-account key plus the access token last obtained with it.
pub struct ServiceAccount {
    client_email: String,
    token_uri: String,
    key_id: Option<String>,
    signing_key: EncodingKey,
    cached: Mutex<Option<AccessToken>>,
}

impl ServiceAccount {
    fn from_key(key: ServiceAccountKey) -> std::result::Result<Self, String> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| format!("`private_key` is not an RSA PEM key: {e}"))?;
        Ok(Self {
            client_email: key.client_email,
            token_uri: key
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            key_id: key.private_key_id,
            signing_key,
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Current access token, exchanging a fresh assertion when the cached
    /// one is missing or about to expire.
    pub async fn access_token(&self, http: &reqwest::Client) -> Result<String> {
        {
            let cached = self.cached.lock();
            if let Some(token) = cached.as_ref()
                && Instant::now() < token.refresh_at
            {
                return Ok(token.value.clone());
            }
        }

        let iat = Utc::now().timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: SCOPES,
            aud: &self.token_uri,
            iat,
            exp: iat + ASSERTION_LIFETIME_SECS,
        };
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let assertion = jsonwebtoken::encode(&header, &claims, &self.signing_key)
            .map_err(|e| BridgeError::TokenExchange(format!("signing assertion: {e}")))?;

        let response = http
            .post(self.token_uri.as_str())
            .form(&[("grant_type", GRANT_TYPE), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(BridgeError::TokenExchange(format!(
                "{} answered HTTP {}",
                self.token_uri,
                status.as_u16()
            )));
        }
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| BridgeError::TokenExchange(format!("unreadable token response: {e}")))?;

        let lifetime = Duration::from_secs(body.expires_in).saturating_sub(EXPIRY_MARGIN);
        info!(
            "[Firebase] Access token for {} refreshed (valid {:?})",
            self.client_email,
            Duration::from_secs(body.expires_in)
        );
        *self.cached.lock() = Some(AccessToken {
            value: body.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(body.access_token)
    }
}

/// Read a credential file.
///
/// Accepted formats:
/// - a service-account key (JSON with `"type": "service_account"`)
/// - a JSON object with a `database_secret` or `token` field
/// - the bare token (database secret or ID token)
pub fn load_credentials(path: &Path) -> Result<Credentials> {
    if !path.exists() {
        return Err(BridgeError::CredentialsMissing(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let content = content.trim();
    let invalid = |reason: String| BridgeError::CredentialsInvalid {
        path: path.to_path_buf(),
        reason,
    };

    if content.is_empty() {
        return Err(invalid("file is empty".to_string()));
    }

    if !content.starts_with('{') {
        return Ok(Credentials::Token(content.to_string()));
    }

    let json: Value = serde_json::from_str(content)?;
    if json.get("type").and_then(Value::as_str) == Some("service_account") {
        let key: ServiceAccountKey =
            serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        let account = ServiceAccount::from_key(key).map_err(invalid)?;
        return Ok(Credentials::ServiceAccount(account));
    }

    ["database_secret", "token"]
        .iter()
        .find_map(|key| json.get(*key).and_then(Value::as_str))
        .filter(|token| !token.is_empty())
        .map(|token| Credentials::Token(token.to_string()))
        .ok_or_else(|| {
            invalid("no service-account key, `database_secret` or `token` field".to_string())
        })
}
