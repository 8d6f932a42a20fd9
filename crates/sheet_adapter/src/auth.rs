//! Credentials for authorized queries.
//!
//! A service-account payload is validated up front; minting bearer tokens
//! from it is behind the `TokenSource` seam so the transport never handles
//! key material directly.

use crate::error::{AdapterError, Result};
use serde::Deserialize;
use std::fmt;

/// OAuth scopes requested for sheet queries.
pub const SCOPES: &[&str] = &["https://spreadsheets.google.com/feeds"];

/// The fields of a service-account key file this crate needs.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub token_uri: String,
}

// Never print key material.
impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

/// Validated service-account credentials plus an optional delegated subject.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub key: ServiceAccountKey,
    pub subject: Option<String>,
}

impl Credentials {
    pub fn from_service_account_info(info: &serde_json::Value, subject: Option<&str>) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_value(info.clone())
            .map_err(|e| AdapterError::Authentication(format!("malformed service account info: {e}")))?;
        if key.client_email.trim().is_empty() {
            return Err(AdapterError::Authentication("service account has no client_email".into()));
        }
        if !key.private_key.contains("PRIVATE KEY") {
            return Err(AdapterError::Authentication("service account private_key is not a PEM key".into()));
        }
        if !key.token_uri.starts_with("https://") && !key.token_uri.starts_with("http://") {
            return Err(AdapterError::Authentication(format!(
                "service account token_uri '{}' is not a URL",
                key.token_uri
            )));
        }
        Ok(Self {
            key,
            subject: subject.map(str::to_string),
        })
    }
}

/// Supplies bearer tokens for outgoing requests.
pub trait TokenSource {
    fn token(&self) -> Result<String>;
}

/// A pre-minted token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

impl TokenSource for StaticToken {
    fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

#[cfg(feature = "http")]
pub use service_account::ServiceAccountTokenSource;

#[cfg(feature = "http")]
mod service_account {
    use super::{Credentials, TokenSource, SCOPES};
    use crate::error::{AdapterError, Result};
    use crate::http::{HttpTransport, Transport};
    use jsonwebtoken::{Algorithm, EncodingKey, Header};
    use serde::{Deserialize, Serialize};
    use std::cell::RefCell;
    use std::time::{Duration, Instant};
    use tracing::{debug, warn};

    pub(super) const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
    const ASSERTION_LIFETIME_SECS: i64 = 3600;
    /// Refresh this long before the server-side expiry.
    const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

    #[derive(Serialize)]
    struct Claims<'a> {
        iss: &'a str,
        scope: String,
        aud: &'a str,
        iat: i64,
        exp: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        sub: Option<&'a str>,
    }

    #[derive(Deserialize)]
    struct TokenResponse {
        access_token: String,
        #[serde(default = "default_expires_in")]
        expires_in: u64,
    }

    fn default_expires_in() -> u64 {
        3600
    }

    struct CachedToken {
        token: String,
        expires_at: Instant,
    }

    /// Mints tokens with the JWT-bearer grant and caches them until shortly
    /// before they expire. Single-threaded: not `Sync`.
    pub struct ServiceAccountTokenSource {
        credentials: Credentials,
        key: EncodingKey,
        transport: Box<dyn Transport>,
        cached: RefCell<Option<CachedToken>>,
    }

    impl ServiceAccountTokenSource {
        /// Exchange tokens over an anonymous HTTP client.
        pub fn new(credentials: Credentials) -> Result<Self> {
            Self::with_transport(credentials, Box::new(HttpTransport::anonymous()?))
        }

        pub fn with_transport(credentials: Credentials, transport: Box<dyn Transport>) -> Result<Self> {
            let key = EncodingKey::from_rsa_pem(credentials.key.private_key.as_bytes())
                .map_err(|e| AdapterError::Authentication(format!("unusable private key: {e}")))?;
            Ok(Self {
                credentials,
                key,
                transport,
                cached: RefCell::new(None),
            })
        }

        fn assertion(&self) -> Result<String> {
            let now = chrono::Utc::now().timestamp();
            let claims = Claims {
                iss: &self.credentials.key.client_email,
                scope: SCOPES.join(" "),
                aud: &self.credentials.key.token_uri,
                iat: now,
                exp: now + ASSERTION_LIFETIME_SECS,
                sub: self.credentials.subject.as_deref(),
            };
            let mut header = Header::new(Algorithm::RS256);
            header.kid = self.credentials.key.private_key_id.clone();
            jsonwebtoken::encode(&header, &claims, &self.key)
                .map_err(|e| AdapterError::Authentication(format!("signing assertion: {e}")))
        }

        fn exchange(&self) -> Result<CachedToken> {
            let assertion = self.assertion()?;
            let resp = self.transport.post_form(
                &self.credentials.key.token_uri,
                &[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())],
            )?;
            if !(200..300).contains(&resp.status) {
                return Err(AdapterError::Authentication(format!(
                    "token exchange rejected (HTTP {}): {}",
                    resp.status, resp.body
                )));
            }
            let parsed: TokenResponse = serde_json::from_str(&resp.body)
                .map_err(|e| AdapterError::Authentication(format!("token response: {e}")))?;
            debug!(client = %self.credentials.key.client_email, expires_in = parsed.expires_in, "minted access token");

            let now = Instant::now();
            let lifetime = Duration::from_secs(parsed.expires_in).saturating_sub(EXPIRY_MARGIN);
            // Unrepresentable expiry: use the token once, refresh next time.
            let expires_at = now.checked_add(lifetime).unwrap_or_else(|| {
                warn!(expires_in = parsed.expires_in, "token lifetime out of range, not caching");
                now
            });
            Ok(CachedToken {
                token: parsed.access_token,
                expires_at,
            })
        }
    }

    impl TokenSource for ServiceAccountTokenSource {
        fn token(&self) -> Result<String> {
            if let Some(cached) = self.cached.borrow().as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
            let fresh = self.exchange()?;
            let token = fresh.token.clone();
            *self.cached.borrow_mut() = Some(fresh);
            Ok(token)
        }
    }
}
