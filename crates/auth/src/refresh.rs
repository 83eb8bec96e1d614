//! Refresh credential records held by the trust store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_core::{Entity, PrincipalId, RefreshRecordId};

use crate::issuer::RefreshToken;

/// Persisted refresh credential.
///
/// Layout: `{id, token (unique), principal_id, expires_at, is_active,
/// created_at, updated_at}`. `is_active` only ever goes from `true` to `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshRecord {
    pub id: RefreshRecordId,
    pub token: RefreshToken,
    pub principal_id: PrincipalId,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RefreshRecord {
    /// Active and not yet expired at `now`.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at > now
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

impl Entity for RefreshRecord {
    type Id = RefreshRecordId;

    fn id(&self) -> RefreshRecordId {
        self.id
    }
}

/// Insert request for a refresh record (always created active).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRefreshRecord {
    pub token: RefreshToken,
    pub principal_id: PrincipalId,
    pub expires_at: DateTime<Utc>,
    pub issued_at: DateTime<Utc>,
}

impl NewRefreshRecord {
    pub fn into_record(self, id: RefreshRecordId) -> RefreshRecord {
        RefreshRecord {
            id,
            token: self.token,
            principal_id: self.principal_id,
            expires_at: self.expires_at,
            is_active: true,
            created_at: self.issued_at,
            updated_at: self.issued_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn usable_only_while_active_and_unexpired() {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut record = NewRefreshRecord {
            token: RefreshToken::new("t"),
            principal_id: PrincipalId::new(1),
            expires_at: now + Duration::days(7),
            issued_at: now,
        }
        .into_record(RefreshRecordId::new(1));

        assert!(record.is_usable_at(now));
        assert!(!record.is_usable_at(now + Duration::days(7)));

        record.is_active = false;
        assert!(!record.is_usable_at(now));
    }
}
