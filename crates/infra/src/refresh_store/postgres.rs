//! Postgres-backed refresh store over the `auth_tokens` table.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | AuthError |
//! |------------|----------------------|-----------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | Any other | `Internal` |
//! | PoolClosed / other | N/A | `Internal` |
//!
//! Conditional revocation is a single `UPDATE ... WHERE token = $1 AND
//! is_active`, so concurrent revokers serialize on the row and only one sees
//! a changed row.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{error, instrument};

use warden_auth::{AuthError, AuthResult, NewRefreshRecord, RefreshRecord, RefreshStore, RefreshToken};
use warden_core::{PrincipalId, RefreshRecordId};

use crate::db::map_sqlx_error;

const RECORD_COLUMNS: &str =
    "id, token, principal_id, expires_at, is_active, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresRefreshStore {
    pool: Arc<PgPool>,
}

impl PostgresRefreshStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn insert_in(
        tx: &mut Transaction<'_, Postgres>,
        new: &NewRefreshRecord,
    ) -> AuthResult<RefreshRecord> {
        let row = sqlx::query(&format!(
            "INSERT INTO auth_tokens (token, principal_id, expires_at, is_active, created_at, updated_at) \
             VALUES ($1, $2, $3, TRUE, $4, $4) \
             RETURNING {RECORD_COLUMNS}"
        ))
        .bind(new.token.as_str())
        .bind(new.principal_id.get() as i64)
        .bind(new.expires_at)
        .bind(new.issued_at)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("create_refresh", e))?;

        record_from_row(&row)
    }
}

fn record_from_row(row: &sqlx::postgres::PgRow) -> AuthResult<RefreshRecord> {
    let decode = |e: sqlx::Error| AuthError::internal(format!("failed to decode auth_tokens row: {e}"));
    Ok(RefreshRecord {
        id: RefreshRecordId::new(row.try_get::<i64, _>("id").map_err(decode)? as u64),
        token: RefreshToken::new(row.try_get::<String, _>("token").map_err(decode)?),
        principal_id: PrincipalId::new(row.try_get::<i64, _>("principal_id").map_err(decode)? as u64),
        expires_at: row.try_get("expires_at").map_err(decode)?,
        is_active: row.try_get("is_active").map_err(decode)?,
        created_at: row.try_get("created_at").map_err(decode)?,
        updated_at: row.try_get("updated_at").map_err(decode)?,
    })
}

#[async_trait::async_trait]
impl RefreshStore for PostgresRefreshStore {
    #[instrument(skip(self, new), fields(principal_id = %new.principal_id), err)]
    async fn create(&self, new: NewRefreshRecord) -> AuthResult<RefreshRecord> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;
        let record = Self::insert_in(&mut tx, &new).await?;
        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(record)
    }

    #[instrument(skip(self, token), err)]
    async fn lookup(&self, token: &RefreshToken) -> AuthResult<Option<RefreshRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {RECORD_COLUMNS} FROM auth_tokens WHERE token = $1"
        ))
        .bind(token.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("lookup_refresh", e))?;

        row.as_ref().map(record_from_row).transpose()
    }

    #[instrument(skip(self, token), err)]
    async fn revoke(&self, token: &RefreshToken, now: DateTime<Utc>) -> AuthResult<bool> {
        let result = sqlx::query(
            "UPDATE auth_tokens SET is_active = FALSE, updated_at = $2 \
             WHERE token = $1 AND is_active",
        )
        .bind(token.as_str())
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_refresh", e))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self), err)]
    async fn revoke_all(&self, principal_id: PrincipalId, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query(
            "UPDATE auth_tokens SET is_active = FALSE, updated_at = $2 \
             WHERE principal_id = $1 AND is_active",
        )
        .bind(principal_id.get() as i64)
        .bind(now)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("revoke_all_refresh", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), err)]
    async fn sweep_expired(&self, now: DateTime<Utc>) -> AuthResult<u64> {
        let result = sqlx::query("DELETE FROM auth_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("sweep_expired_refresh", e))?;

        Ok(result.rows_affected())
    }

    /// Revoke and insert in one transaction: either both land or neither does.
    #[instrument(skip(self, presented, replacement), fields(principal_id = %replacement.principal_id), err)]
    async fn rotate_record(
        &self,
        presented: &RefreshToken,
        replacement: NewRefreshRecord,
        now: DateTime<Utc>,
    ) -> AuthResult<Option<RefreshRecord>> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let revoked = sqlx::query(
            "UPDATE auth_tokens SET is_active = FALSE, updated_at = $2 \
             WHERE token = $1 AND is_active",
        )
        .bind(presented.as_str())
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("rotate_revoke", e))?;

        if revoked.rows_affected() != 1 {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback_transaction", e))?;
            return Ok(None);
        }

        let record = match Self::insert_in(&mut tx, &replacement).await {
            Ok(record) => record,
            Err(err) => {
                error!(error = %err, "replacement refresh token could not be stored");
                return Err(AuthError::internal(format!("rotation aborted: {err}")));
            }
        };

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(Some(record))
    }
}
