//! Storage-facing contracts consumed by the auth core.
//!
//! Implementations live in `warden-infra` (in-memory and Postgres). All methods
//! take `now` explicitly where time matters so behavior is deterministic under a
//! fixed clock.

use chrono::{DateTime, Utc};
use tracing::error;

use warden_core::{PrincipalId, RoleId};

use crate::error::{AuthError, AuthResult};
use crate::issuer::RefreshToken;
use crate::permissions::{Permission, PermissionName};
use crate::principal::{NewPrincipal, Principal};
use crate::refresh::{NewRefreshRecord, RefreshRecord};
use crate::roles::Role;

/// Trust store for refresh credentials, keyed by unique token value.
#[async_trait::async_trait]
pub trait RefreshStore: Send + Sync {
    /// Insert a new active record. Duplicate token values are `Conflict`.
    async fn create(&self, new: NewRefreshRecord) -> AuthResult<RefreshRecord>;

    /// Fetch a record regardless of its state.
    async fn lookup(&self, token: &RefreshToken) -> AuthResult<Option<RefreshRecord>>;

    /// Exists, is active, and `expires_at > now`.
    async fn is_valid(&self, token: &RefreshToken, now: DateTime<Utc>) -> AuthResult<bool> {
        Ok(self
            .lookup(token)
            .await?
            .is_some_and(|record| record.is_usable_at(now)))
    }

    /// Deactivate the record only if it is still active.
    ///
    /// Returns whether this call changed it. Of several concurrent callers at
    /// most one observes `true`.
    async fn revoke(&self, token: &RefreshToken, now: DateTime<Utc>) -> AuthResult<bool>;

    /// Deactivate every active record of `principal_id`; returns how many changed.
    async fn revoke_all(&self, principal_id: PrincipalId, now: DateTime<Utc>) -> AuthResult<u64>;

    /// Delete every record with `expires_at < now`, active or not.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> AuthResult<u64>;

    /// Consume `presented` and create `replacement` as one step.
    ///
    /// `Ok(None)` means the presented record was no longer active and nothing
    /// was written. A failure to create the replacement after the revoke
    /// succeeded is `Internal`; the caller has to log in again.
    async fn rotate_record(
        &self,
        presented: &RefreshToken,
        replacement: NewRefreshRecord,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshRecord>> {
        if !self.revoke(presented, now).await? {
            return Ok(None);
        }

        let principal_id = replacement.principal_id;
        match self.create(replacement).await {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                error!(
                    principal_id = %principal_id,
                    error = %err,
                    "refresh token consumed but replacement could not be stored"
                );
                Err(AuthError::internal(format!(
                    "rotation aborted after revoke: {err}"
                )))
            }
        }
    }
}

/// Lookup and creation of principals.
#[async_trait::async_trait]
pub trait PrincipalDirectory: Send + Sync {
    async fn find_by_id(&self, id: PrincipalId) -> AuthResult<Option<Principal>>;

    /// `email` is expected already normalized (see `normalize_email`).
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>>;

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Principal>>;

    /// Insert a principal; duplicate email or username is `Conflict`.
    async fn insert(&self, new: NewPrincipal) -> AuthResult<Principal>;
}

/// Role and permission associations used by the authorization resolver.
#[async_trait::async_trait]
pub trait RbacDirectory: Send + Sync {
    /// Every role assigned to the principal (many-to-many).
    async fn roles_for_principal(&self, principal_id: PrincipalId) -> AuthResult<Vec<Role>>;

    /// Permissions granted by any of `role_ids`, without duplicates.
    async fn permissions_for_roles(&self, role_ids: &[RoleId]) -> AuthResult<Vec<Permission>>;

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>>;

    /// Insert a permission definition; a duplicate name is `Conflict`.
    async fn insert_permission(
        &self,
        name: PermissionName,
        description: Option<String>,
    ) -> AuthResult<Permission>;
}
