//! Single-use refresh rotation.
//!
//! A refresh record moves `Active -> Consumed | Expired -> Swept`; every state
//! past `Active` is terminal. Rotation consumes the presented record and only
//! then creates its replacement, so of two callers presenting the same token
//! exactly one receives a new pair.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use warden_core::PrincipalId;

use crate::error::{AuthError, AuthResult};
use crate::issuer::{RefreshToken, TokenIssuer, TokenPair};
use crate::refresh::{NewRefreshRecord, RefreshRecord};
use crate::store::{PrincipalDirectory, RefreshStore};

/// Lifecycle state of a stored refresh record at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshState {
    Active,
    /// Rotated or revoked; storage does not distinguish the two.
    Consumed,
    Expired,
}

impl RefreshState {
    pub fn of(record: &RefreshRecord, now: DateTime<Utc>) -> Self {
        if !record.is_active {
            Self::Consumed
        } else if record.expires_at <= now {
            Self::Expired
        } else {
            Self::Active
        }
    }
}

/// Result of a successful rotation.
#[derive(Debug, Clone)]
pub struct Rotation {
    pub principal_id: PrincipalId,
    pub pair: TokenPair,
    pub record: RefreshRecord,
}

/// Exchange `presented` for a fresh access + refresh pair.
pub async fn rotate(
    store: &dyn RefreshStore,
    principals: &dyn PrincipalDirectory,
    issuer: &TokenIssuer,
    presented: &RefreshToken,
    now: DateTime<Utc>,
) -> AuthResult<Rotation> {
    let Some(current) = store.lookup(presented).await? else {
        warn!("rotation rejected: unknown refresh token");
        return Err(AuthError::AlreadyRotatedOrRevoked);
    };

    let principal_id = current.principal_id;
    match RefreshState::of(&current, now) {
        RefreshState::Active => {}
        RefreshState::Consumed => {
            warn!(principal_id = %principal_id, "refresh token reuse detected");
            return Err(AuthError::AlreadyRotatedOrRevoked);
        }
        RefreshState::Expired => {
            info!(principal_id = %principal_id, "rotation rejected: refresh token expired");
            return Err(AuthError::AlreadyRotatedOrRevoked);
        }
    }

    let owner_usable = principals
        .find_by_id(principal_id)
        .await?
        .is_some_and(|p| p.is_active);
    if !owner_usable {
        store.revoke(presented, now).await?;
        warn!(principal_id = %principal_id, "rotation rejected: principal missing or inactive");
        return Err(AuthError::Unauthenticated("principal is not active"));
    }

    let replacement = NewRefreshRecord {
        token: issuer.issue_refresh()?,
        principal_id,
        expires_at: issuer.refresh_expiry(now)?,
        issued_at: now,
    };

    let Some(record) = store.rotate_record(presented, replacement, now).await? else {
        warn!(principal_id = %principal_id, "rotation lost race on refresh token");
        return Err(AuthError::AlreadyRotatedOrRevoked);
    };

    let access = issuer.issue_access(principal_id, now)?;
    info!(principal_id = %principal_id, "refresh token rotated");

    Ok(Rotation {
        principal_id,
        pair: issuer.pair(access, record.token.clone()),
        record,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use chrono::{Duration, TimeZone};
    use warden_core::RefreshRecordId;

    use crate::config::AuthSettings;
    use crate::error::ErrorKind;
    use crate::principal::{NewPrincipal, Principal};

    fn record(is_active: bool, expires_in: Duration) -> (RefreshRecord, DateTime<Utc>) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut record = NewRefreshRecord {
            token: RefreshToken::new("t"),
            principal_id: PrincipalId::new(1),
            expires_at: now + expires_in,
            issued_at: now - Duration::hours(1),
        }
        .into_record(RefreshRecordId::new(1));
        record.is_active = is_active;
        (record, now)
    }

    #[test]
    fn classifies_lifecycle_states() {
        let (r, now) = record(true, Duration::days(1));
        assert_eq!(RefreshState::of(&r, now), RefreshState::Active);

        let (r, now) = record(false, Duration::days(1));
        assert_eq!(RefreshState::of(&r, now), RefreshState::Consumed);

        let (r, now) = record(true, Duration::zero());
        assert_eq!(RefreshState::of(&r, now), RefreshState::Expired);
    }

    #[test]
    fn consumed_wins_over_expired() {
        let (r, now) = record(false, -Duration::days(1));
        assert_eq!(RefreshState::of(&r, now), RefreshState::Consumed);
    }

    /// Keeps the trait's own `rotate_record`; every `create` fails.
    #[derive(Default)]
    struct UnwritableStore {
        records: Mutex<HashMap<String, RefreshRecord>>,
    }

    impl UnwritableStore {
        fn seeded(record: RefreshRecord) -> Self {
            let store = Self::default();
            store
                .records
                .lock()
                .unwrap()
                .insert(record.token.as_str().to_string(), record);
            store
        }
    }

    #[async_trait::async_trait]
    impl RefreshStore for UnwritableStore {
        async fn create(&self, _new: NewRefreshRecord) -> AuthResult<RefreshRecord> {
            Err(AuthError::internal("storage unavailable"))
        }

        async fn lookup(&self, token: &RefreshToken) -> AuthResult<Option<RefreshRecord>> {
            Ok(self.records.lock().unwrap().get(token.as_str()).cloned())
        }

        async fn revoke(&self, token: &RefreshToken, now: DateTime<Utc>) -> AuthResult<bool> {
            let mut records = self.records.lock().unwrap();
            match records.get_mut(token.as_str()) {
                Some(record) if record.is_active => {
                    record.is_active = false;
                    record.updated_at = now;
                    Ok(true)
                }
                _ => Ok(false),
            }
        }

        async fn revoke_all(&self, _principal_id: PrincipalId, _now: DateTime<Utc>) -> AuthResult<u64> {
            Ok(0)
        }

        async fn sweep_expired(&self, _now: DateTime<Utc>) -> AuthResult<u64> {
            Ok(0)
        }
    }

    struct ActiveOwner;

    #[async_trait::async_trait]
    impl PrincipalDirectory for ActiveOwner {
        async fn find_by_id(&self, id: PrincipalId) -> AuthResult<Option<Principal>> {
            Ok(Some(Principal {
                id,
                email: "owner@example.com".to_string(),
                username: "owner".to_string(),
                password_hash: String::new(),
                full_name: None,
                is_active: true,
                is_superuser: false,
                created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            }))
        }

        async fn find_by_email(&self, _email: &str) -> AuthResult<Option<Principal>> {
            Ok(None)
        }

        async fn find_by_username(&self, _username: &str) -> AuthResult<Option<Principal>> {
            Ok(None)
        }

        async fn insert(&self, _new: NewPrincipal) -> AuthResult<Principal> {
            Err(AuthError::internal("read-only"))
        }
    }

    #[tokio::test]
    async fn failed_replacement_leaves_presented_token_consumed() {
        let (presented, now) = record(true, Duration::days(1));
        let store = UnwritableStore::seeded(presented.clone());
        let issuer = TokenIssuer::new(&AuthSettings::new("rotation-test-key").unwrap());

        let err = rotate(&store, &ActiveOwner, &issuer, &presented.token, now)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(!store.is_valid(&presented.token, now).await.unwrap());

        let err = rotate(&store, &ActiveOwner, &issuer, &presented.token, now)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::AlreadyRotatedOrRevoked);
    }
}
