//! Postgres plumbing shared by the adapters.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use warden_auth::AuthError;

/// Schema the adapters expect; applied by external migration tooling.
pub const SCHEMA: &str = include_str!("../migrations/0001_auth.sql");

pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(5)
        .connect(database_url)
        .await
}

/// Map a sqlx error onto the auth taxonomy.
///
/// Unique violations (`23505`) are `Conflict`; everything else is `Internal`.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> AuthError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => AuthError::conflict(msg),
                _ => AuthError::internal(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            AuthError::internal(format!("connection pool closed in {operation}"))
        }
        _ => AuthError::internal(format!("sqlx error in {operation}: {err}")),
    }
}
