//! One-way password hashing.

use tracing::warn;

use crate::error::{AuthError, AuthResult};

/// Salted, adaptive one-way digest of a secret.
pub trait PasswordHasher: Send + Sync {
    /// Hash a secret. Two calls with the same secret yield different digests.
    fn hash(&self, secret: &str) -> AuthResult<String>;

    /// Check a secret against a digest. A mismatch (or a malformed digest) is
    /// `false`, never an error.
    fn verify(&self, secret: &str, digest: &str) -> bool;
}

/// bcrypt-backed hasher. Digest comparison inside `bcrypt::verify` is constant-time.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, secret: &str) -> AuthResult<String> {
        bcrypt::hash(secret, self.cost)
            .map_err(|e| AuthError::internal(format!("password hashing failed: {e}")))
    }

    fn verify(&self, secret: &str, digest: &str) -> bool {
        match bcrypt::verify(secret, digest) {
            Ok(matches) => matches,
            Err(e) => {
                warn!(error = %e, "stored password digest could not be parsed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> BcryptHasher {
        BcryptHasher::new(4)
    }

    #[test]
    fn verifies_matching_secret() {
        let digest = hasher().hash("correct horse").unwrap();
        assert!(hasher().verify("correct horse", &digest));
        assert!(!hasher().verify("battery staple", &digest));
    }

    #[test]
    fn salts_every_digest() {
        let a = hasher().hash("same").unwrap();
        let b = hasher().hash("same").unwrap();
        assert_ne!(a, b);
        assert!(hasher().verify("same", &a));
        assert!(hasher().verify("same", &b));
    }

    #[test]
    fn malformed_digest_is_a_mismatch() {
        assert!(!hasher().verify("anything", "not-a-bcrypt-digest"));
    }
}
