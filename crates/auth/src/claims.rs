use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use warden_core::PrincipalId;

/// Access token payload as it travels on the wire.
///
/// Field names follow the registered JWT claim names; `sub` is the decimal
/// principal id and `iat`/`exp` are unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject / principal identifier.
    pub sub: String,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,

    /// Unique token id.
    pub jti: Uuid,
}

impl AccessClaims {
    pub fn new(subject: PrincipalId, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self {
            sub: subject.to_string(),
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
            jti: Uuid::now_v7(),
        }
    }
}

/// Claims of an access token whose signature and time window were verified.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifiedClaims {
    pub subject: PrincipalId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub token_id: Uuid,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (expires_at <= issued_at)")]
    InvalidTimeWindow,

    #[error("token subject is not a principal id")]
    InvalidSubject,
}

/// Deterministically validate decoded claims against `now`.
///
/// Signature verification happens before this, in the validator.
pub fn validate_claims(
    claims: &AccessClaims,
    now: DateTime<Utc>,
) -> Result<VerifiedClaims, TokenValidationError> {
    let issued_at =
        DateTime::from_timestamp(claims.iat, 0).ok_or(TokenValidationError::InvalidTimeWindow)?;
    let expires_at =
        DateTime::from_timestamp(claims.exp, 0).ok_or(TokenValidationError::InvalidTimeWindow)?;

    if expires_at <= issued_at {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < issued_at {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= expires_at {
        return Err(TokenValidationError::Expired);
    }

    let subject = claims
        .sub
        .parse::<PrincipalId>()
        .map_err(|_| TokenValidationError::InvalidSubject)?;

    Ok(VerifiedClaims {
        subject,
        issued_at,
        expires_at,
        token_id: claims.jti,
    })
}
