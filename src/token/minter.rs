//! ES256 access token minting.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use super::error::TokenError;
use crate::config::ServiceConfig;

/// Claims carried by an upload token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadClaims {
    /// Issuer
    pub iss: String,
    /// Expiry (Unix epoch seconds)
    pub exp: i64,
    /// Verified identity
    pub sub: String,
    /// Operating service account
    pub pilot: String,
}

/// A signed token and the instant it expires.
#[derive(Debug, Clone)]
pub struct MintedToken {
    /// Compact JWS; opaque to everything downstream
    pub token: String,
    /// Matches the `exp` claim
    pub expires_at: DateTime<Utc>,
}

/// Signs upload tokens with the service key.
pub struct TokenMinter {
    key: EncodingKey,
    key_id: String,
    issuer: String,
    pilot: String,
    lifetime: Duration,
}

impl TokenMinter {
    /// Create a minter from the service configuration.
    #[must_use]
    pub fn new(config: &ServiceConfig) -> Self {
        Self {
            key: config.signing_key.clone(),
            key_id: config.key_id.clone(),
            issuer: config.issuer.clone(),
            pilot: config.pilot.clone(),
            lifetime: Duration::days(i64::from(config.expiration_days)),
        }
    }

    /// Token lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Mint a token for `subject`, expiring `lifetime` after `now`.
    ///
    /// # Errors
    ///
    /// [`TokenError::Signing`] if the key cannot produce an ES256 signature.
    pub fn mint(&self, subject: &str, now: DateTime<Utc>) -> Result<MintedToken, TokenError> {
        let expires_at = now + self.lifetime;

        let mut header = Header::new(Algorithm::ES256);
        header.kid = Some(self.key_id.clone());

        let claims = UploadClaims {
            iss: self.issuer.clone(),
            exp: expires_at.timestamp(),
            sub: subject.to_string(),
            pilot: self.pilot.clone(),
        };

        let token = jsonwebtoken::encode(&header, &claims, &self.key)?;

        Ok(MintedToken { token, expires_at })
    }
}
