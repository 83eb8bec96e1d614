//! Immutable credential settings (loaded once at startup).

use chrono::Duration;
use jsonwebtoken::Algorithm;

use crate::error::{AuthError, AuthResult};

pub const DEFAULT_ACCESS_TTL_MINUTES: i64 = 30;
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 7;
pub const DEFAULT_ACCESS_COOKIE: &str = "access_token";

/// Upper bounds keep `now + ttl` far from the representable date range.
pub const MAX_ACCESS_TTL_MINUTES: i64 = 24 * 60;
pub const MAX_REFRESH_TTL_DAYS: i64 = 365;

const MIN_BCRYPT_COST: u32 = 4;
const MAX_BCRYPT_COST: u32 = 31;

/// Signing key, algorithm, TTLs and carrier names for the credential core.
///
/// Only symmetric HMAC algorithms are accepted: the same key signs and verifies.
#[derive(Clone)]
pub struct AuthSettings {
    signing_key: Vec<u8>,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
    access_cookie: String,
    bcrypt_cost: u32,
}

impl AuthSettings {
    /// Settings with the default algorithm (HS256), TTLs and cookie name.
    pub fn new(signing_key: impl Into<Vec<u8>>) -> AuthResult<Self> {
        let signing_key = signing_key.into();
        if signing_key.is_empty() {
            return Err(AuthError::validation("signing key must not be empty"));
        }

        Ok(Self {
            signing_key,
            algorithm: Algorithm::HS256,
            access_ttl: Duration::minutes(DEFAULT_ACCESS_TTL_MINUTES),
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TTL_DAYS),
            access_cookie: DEFAULT_ACCESS_COOKIE.to_string(),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        })
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> AuthResult<Self> {
        match algorithm {
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => {
                self.algorithm = algorithm;
                Ok(self)
            }
            other => Err(AuthError::validation(format!(
                "unsupported signing algorithm {other:?} (expected HS256, HS384 or HS512)"
            ))),
        }
    }

    pub fn with_access_ttl(mut self, ttl: Duration) -> AuthResult<Self> {
        if ttl <= Duration::zero() {
            return Err(AuthError::validation("access TTL must be positive"));
        }
        if ttl > Duration::minutes(MAX_ACCESS_TTL_MINUTES) {
            return Err(AuthError::validation(format!(
                "access TTL must not exceed {MAX_ACCESS_TTL_MINUTES} minutes"
            )));
        }
        self.access_ttl = ttl;
        Ok(self)
    }

    pub fn with_refresh_ttl(mut self, ttl: Duration) -> AuthResult<Self> {
        if ttl <= Duration::zero() {
            return Err(AuthError::validation("refresh TTL must be positive"));
        }
        if ttl > Duration::days(MAX_REFRESH_TTL_DAYS) {
            return Err(AuthError::validation(format!(
                "refresh TTL must not exceed {MAX_REFRESH_TTL_DAYS} days"
            )));
        }
        self.refresh_ttl = ttl;
        Ok(self)
    }

    pub fn with_access_cookie(mut self, name: impl Into<String>) -> AuthResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(AuthError::validation("access cookie name must not be empty"));
        }
        self.access_cookie = name;
        Ok(self)
    }

    pub fn with_bcrypt_cost(mut self, cost: u32) -> AuthResult<Self> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(AuthError::validation(format!(
                "bcrypt cost must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}"
            )));
        }
        self.bcrypt_cost = cost;
        Ok(self)
    }

    pub fn signing_key(&self) -> &[u8] {
        &self.signing_key
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn access_cookie(&self) -> &str {
        &self.access_cookie
    }

    pub fn bcrypt_cost(&self) -> u32 {
        self.bcrypt_cost
    }
}

impl core::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("signing_key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("access_cookie", &self.access_cookie)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .finish()
    }
}
