//! Credential issuance: signed access tokens and opaque refresh tokens.

use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use tracing::debug;

use warden_core::PrincipalId;

use crate::claims::AccessClaims;
use crate::config::AuthSettings;
use crate::error::{AuthError, AuthResult};

/// Bytes of CSPRNG output behind every refresh token (256 bits).
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// Opaque refresh credential value.
///
/// Carries no claims; it only means something to the refresh store. `Debug`
/// never prints the value.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefreshToken(String);

impl RefreshToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl core::fmt::Debug for RefreshToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str("RefreshToken(<redacted>)")
    }
}

impl From<String> for RefreshToken {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RefreshToken {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Access + refresh credentials handed back on login and rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: RefreshToken,
    pub token_type: &'static str,
    pub auth_type: &'static str,
    /// Seconds until the access token expires.
    pub expires_in: i64,
}

/// Mints credentials from immutable settings. Holds no mutable state.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    header: Header,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenIssuer {
    pub fn new(settings: &AuthSettings) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(settings.signing_key()),
            header: Header::new(settings.algorithm()),
            access_ttl: settings.access_ttl(),
            refresh_ttl: settings.refresh_ttl(),
        }
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    /// Expiry of a refresh record created at `now`.
    pub fn refresh_expiry(&self, now: DateTime<Utc>) -> AuthResult<DateTime<Utc>> {
        expiry(now, self.refresh_ttl)
    }

    /// Sign an access token for `subject`, valid until `now + access_ttl`.
    pub fn issue_access(&self, subject: PrincipalId, now: DateTime<Utc>) -> AuthResult<String> {
        let claims = AccessClaims::new(subject, now, expiry(now, self.access_ttl)?);

        let token = jsonwebtoken::encode(&self.header, &claims, &self.encoding_key)
            .map_err(|e| AuthError::internal(format!("failed to sign access token: {e}")))?;

        debug!(
            principal_id = %subject,
            token_id = %claims.jti,
            expires_at = claims.exp,
            "issued access token"
        );

        Ok(token)
    }

    pub fn pair(&self, access_token: String, refresh_token: RefreshToken) -> TokenPair {
        TokenPair {
            access_token,
            refresh_token,
            token_type: "bearer",
            auth_type: "hybrid",
            expires_in: self.access_ttl.num_seconds(),
        }
    }

    /// Generate a fresh opaque refresh token (URL-safe base64 of 32 random bytes).
    pub fn issue_refresh(&self) -> AuthResult<RefreshToken> {
        let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
        OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| AuthError::internal(format!("failed to generate refresh token: {e}")))?;
        Ok(RefreshToken(
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes),
        ))
    }
}

fn expiry(now: DateTime<Utc>, ttl: Duration) -> AuthResult<DateTime<Utc>> {
    now.checked_add_signed(ttl)
        .ok_or_else(|| AuthError::internal("credential expiry is out of range"))
}
