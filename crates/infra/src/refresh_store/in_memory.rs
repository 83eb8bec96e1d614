use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use chrono::{DateTime, Utc};

use warden_auth::{AuthError, AuthResult, NewRefreshRecord, RefreshRecord, RefreshStore, RefreshToken};
use warden_core::{PrincipalId, RefreshRecordId};

#[derive(Debug, Default)]
struct Inner {
    next_id: u64,
    records: HashMap<RefreshToken, RefreshRecord>,
}

impl Inner {
    fn insert(&mut self, new: NewRefreshRecord) -> AuthResult<RefreshRecord> {
        if self.records.contains_key(&new.token) {
            return Err(AuthError::conflict("refresh token already exists"));
        }
        self.next_id += 1;
        let record = new.into_record(RefreshRecordId::new(self.next_id));
        self.records.insert(record.token.clone(), record.clone());
        Ok(record)
    }

    fn deactivate(&mut self, token: &RefreshToken, now: DateTime<Utc>) -> bool {
        match self.records.get_mut(token) {
            Some(record) if record.is_active => {
                record.is_active = false;
                record.updated_at = now;
                true
            }
            _ => false,
        }
    }
}

/// In-memory refresh store.
///
/// Intended for tests/dev. Every mutation runs under one write lock, which is
/// what makes `revoke` and `rotate_record` conditional.
#[derive(Debug, Default)]
pub struct InMemoryRefreshStore {
    inner: RwLock<Inner>,
}

impl InMemoryRefreshStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records, active or not.
    ///
    /// Counts through a poisoned lock: the map itself is never left half-written.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .records
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> AuthResult<std::sync::RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| AuthError::internal("refresh store lock poisoned"))
    }
}

#[async_trait::async_trait]
impl RefreshStore for InMemoryRefreshStore {
    async fn create(&self, new: NewRefreshRecord) -> AuthResult<RefreshRecord> {
        self.write()?.insert(new)
    }

    async fn lookup(&self, token: &RefreshToken) -> AuthResult<Option<RefreshRecord>> {
        let inner = self
            .inner
            .read()
            .map_err(|_| AuthError::internal("refresh store lock poisoned"))?;
        Ok(inner.records.get(token).cloned())
    }

    async fn revoke(&self, token: &RefreshToken, now: DateTime<Utc>) -> AuthResult<bool> {
        Ok(self.write()?.deactivate(token, now))
    }

    async fn revoke_all(&self, principal_id: PrincipalId, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut inner = self.write()?;
        let mut changed = 0;
        for record in inner.records.values_mut() {
            if record.principal_id == principal_id && record.is_active {
                record.is_active = false;
                record.updated_at = now;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let mut inner = self.write()?;
        let before = inner.records.len();
        inner.records.retain(|_, record| !record.is_expired_at(now));
        Ok((before - inner.records.len()) as u64)
    }

    async fn rotate_record(
        &self,
        presented: &RefreshToken,
        replacement: NewRefreshRecord,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshRecord>> {
        let mut inner = self.write()?;
        if inner.records.contains_key(&replacement.token) {
            return Err(AuthError::internal("replacement refresh token collides"));
        }
        if !inner.deactivate(presented, now) {
            return Ok(None);
        }
        inner.insert(replacement).map(Some)
    }
}
