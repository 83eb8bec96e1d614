use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{DomainError, DomainResult, Entity, PrincipalId};

/// An authenticatable account.
///
/// Roles are not embedded: they are resolved through principal↔role
/// association records at check time.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub full_name: Option<String>,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for Principal {
    type Id = PrincipalId;

    fn id(&self) -> PrincipalId {
        self.id
    }
}

impl core::fmt::Debug for Principal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Principal")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("username", &self.username)
            .field("is_active", &self.is_active)
            .field("is_superuser", &self.is_superuser)
            .finish_non_exhaustive()
    }
}

/// Registration input (plain-text password, not yet validated).
#[derive(Clone, Deserialize)]
pub struct Registration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub full_name: Option<String>,
    #[serde(default)]
    pub is_superuser: bool,
}

impl Registration {
    /// Trim and normalize the identifying fields, rejecting malformed input.
    pub fn normalized(&self) -> DomainResult<(String, String)> {
        let email = normalize_email(&self.email);
        if !valid_email(&email) {
            return Err(DomainError::validation("invalid email format"));
        }

        let username = self.username.trim().to_string();
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }

        if self.password.is_empty() {
            return Err(DomainError::validation("password cannot be empty"));
        }

        Ok((email, username))
    }
}

impl core::fmt::Debug for Registration {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registration")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("is_superuser", &self.is_superuser)
            .finish_non_exhaustive()
    }
}

/// A validated principal ready to be inserted (password already hashed).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPrincipal {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub full_name: Option<String>,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
}

/// Normalize an email for lookup/uniqueness checks.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !email.chars().any(char::is_whitespace)
        && domain
            .split_once('.')
            .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
}
