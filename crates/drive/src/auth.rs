//! Service-account authentication (OAuth2 JWT bearer grant).

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::debug;

use crate::Error;
use crate::types::{ServiceAccountKey, TokenResponse};

/// Read-only access to all files visible to the account.
pub const DRIVE_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/drive.readonly";

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime of the signed assertion. Google caps it at one hour.
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

#[derive(Serialize)]
struct Claims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Exchanges a service-account key for access tokens and caches them.
pub struct ServiceAccountAuth {
    client_email: String,
    token_uri: String,
    encoding_key: EncodingKey,
    http: reqwest::Client,
    cached: Mutex<Option<CachedToken>>,
}

impl fmt::Debug for ServiceAccountAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountAuth")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .field("scope", &DRIVE_READONLY_SCOPE)
            .field("encoding_key", &"[hidden]")
            .finish()
    }
}

impl ServiceAccountAuth {
    /// Loads a service-account JSON key file.
    pub fn from_file(path: &Path) -> Result<Self, Error> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::KeyFile {
            path: path.display().to_string(),
            source,
        })?;
        let key: ServiceAccountKey = serde_json::from_str(&content)?;
        Self::from_key(key)
    }

    /// Builds an authenticator from a parsed key with the read-only scope.
    pub fn from_key(key: ServiceAccountKey) -> Result<Self, Error> {
        let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| Error::InvalidKey(e.to_string()))?;
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            client_email: key.client_email,
            token_uri: key.token_uri,
            encoding_key,
            http,
            cached: Mutex::new(None),
        })
    }

    /// The service account's e-mail address.
    pub fn client_email(&self) -> &str {
        &self.client_email
    }

    /// Returns a valid access token, requesting a new one when needed.
    pub async fn access_token(&self) -> Result<String, Error> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref()
            && token.expires_at > Instant::now()
        {
            return Ok(token.value.clone());
        }

        let fresh = self.request_token().await?;
        let lifetime = Duration::from_secs(fresh.expires_in).saturating_sub(REFRESH_MARGIN);
        debug!(account = %self.client_email, expires_in = fresh.expires_in, "obtained access token");

        let value = fresh.access_token.clone();
        *cached = Some(CachedToken {
            value: fresh.access_token,
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    /// Signs the RS256 assertion presented to the token endpoint.
    fn assertion(&self) -> Result<String, Error> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            iss: &self.client_email,
            scope: DRIVE_READONLY_SCOPE,
            aud: &self.token_uri,
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        encode(&Header::new(Algorithm::RS256), &claims, &self.encoding_key)
            .map_err(|e| Error::InvalidKey(e.to_string()))
    }

    async fn request_token(&self) -> Result<TokenResponse, Error> {
        let assertion = self.assertion()?;
        let resp = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;
        let status = resp.status();

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Auth {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}
