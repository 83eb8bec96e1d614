//! Authentication/authorization error taxonomy.

use serde::Serialize;
use thiserror::Error;

use warden_core::DomainError;

pub type AuthResult<T> = Result<T, AuthError>;

/// Failure of a credential or authorization operation.
///
/// Every variant maps to exactly one stable [`ErrorKind`]; boundaries should
/// branch on `kind()` rather than on the message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("not authenticated: {0}")]
    Unauthenticated(&'static str),

    #[error("invalid token format")]
    InvalidFormat,

    #[error("invalid or expired token")]
    InvalidOrExpired,

    #[error("refresh token already rotated, revoked or expired")]
    AlreadyRotatedOrRevoked,

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Stable error category, suitable for mapping onto transport status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Unauthenticated,
    InvalidFormat,
    InvalidOrExpired,
    AlreadyRotatedOrRevoked,
    Forbidden,
    NotFound,
    Conflict,
    Validation,
    Internal,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::InvalidFormat => "invalid_format",
            ErrorKind::InvalidOrExpired => "invalid_or_expired",
            ErrorKind::AlreadyRotatedOrRevoked => "already_rotated_or_revoked",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Validation => "validation",
            ErrorKind::Internal => "internal",
        }
    }
}

impl core::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AuthError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AuthError::Unauthenticated(_) => ErrorKind::Unauthenticated,
            AuthError::InvalidFormat => ErrorKind::InvalidFormat,
            AuthError::InvalidOrExpired => ErrorKind::InvalidOrExpired,
            AuthError::AlreadyRotatedOrRevoked => ErrorKind::AlreadyRotatedOrRevoked,
            AuthError::Forbidden(_) => ErrorKind::Forbidden,
            AuthError::NotFound(_) => ErrorKind::NotFound,
            AuthError::Conflict(_) => ErrorKind::Conflict,
            AuthError::Validation(_) => ErrorKind::Validation,
            AuthError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

impl From<DomainError> for AuthError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => AuthError::Validation(msg),
            DomainError::InvalidId(msg) => AuthError::Validation(msg),
            DomainError::NotFound => AuthError::NotFound("entity".to_string()),
            DomainError::Conflict(msg) => AuthError::Conflict(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_have_stable_codes() {
        assert_eq!(
            AuthError::AlreadyRotatedOrRevoked.kind().as_str(),
            "already_rotated_or_revoked"
        );
        assert_eq!(AuthError::forbidden("x").kind(), ErrorKind::Forbidden);
        assert_eq!(
            serde_json::to_string(&ErrorKind::InvalidOrExpired).unwrap(),
            "\"invalid_or_expired\""
        );
    }

    #[test]
    fn domain_errors_keep_their_category() {
        let err: AuthError = DomainError::conflict("email already registered").into();
        assert_eq!(err.kind(), ErrorKind::Conflict);

        let err: AuthError = DomainError::invalid_id("PrincipalId: bad").into();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
