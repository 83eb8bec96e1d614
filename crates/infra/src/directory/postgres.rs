//! Postgres-backed principal and RBAC directory.
//!
//! Tables: `principals`, `roles`, `permissions` and the association tables
//! `principal_roles` / `role_permissions` (see `migrations/0001_auth.sql`).

use std::sync::Arc;

use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use warden_auth::{
    AuthError, AuthResult, NewPrincipal, Permission, PermissionName, Principal, PrincipalDirectory,
    RbacDirectory, Role, RoleName,
};
use warden_core::{PermissionId, PrincipalId, RoleId};

use crate::db::map_sqlx_error;

const PRINCIPAL_COLUMNS: &str =
    "id, email, username, password_hash, full_name, is_active, is_superuser, created_at";

#[derive(Debug, Clone)]
pub struct PostgresDirectory {
    pool: Arc<PgPool>,
}

impl PostgresDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn find_principal_where(
        &self,
        column: &'static str,
        value: &str,
    ) -> AuthResult<Option<Principal>> {
        let row = sqlx::query(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE {column} = $1"
        ))
        .bind(value)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_principal", e))?;

        row.as_ref().map(principal_from_row).transpose()
    }
}

fn decode_error(e: sqlx::Error) -> AuthError {
    AuthError::internal(format!("failed to decode row: {e}"))
}

fn principal_from_row(row: &PgRow) -> AuthResult<Principal> {
    Ok(Principal {
        id: PrincipalId::new(row.try_get::<i64, _>("id").map_err(decode_error)? as u64),
        email: row.try_get("email").map_err(decode_error)?,
        username: row.try_get("username").map_err(decode_error)?,
        password_hash: row.try_get("password_hash").map_err(decode_error)?,
        full_name: row.try_get("full_name").map_err(decode_error)?,
        is_active: row.try_get("is_active").map_err(decode_error)?,
        is_superuser: row.try_get("is_superuser").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn role_from_row(row: &PgRow) -> AuthResult<Role> {
    Ok(Role {
        id: RoleId::new(row.try_get::<i64, _>("id").map_err(decode_error)? as u64),
        name: RoleName::new(row.try_get::<String, _>("name").map_err(decode_error)?),
        description: row.try_get("description").map_err(decode_error)?,
    })
}

fn permission_from_row(row: &PgRow) -> AuthResult<Permission> {
    Ok(Permission {
        id: PermissionId::new(row.try_get::<i64, _>("id").map_err(decode_error)? as u64),
        name: PermissionName::new(row.try_get::<String, _>("name").map_err(decode_error)?),
        description: row.try_get("description").map_err(decode_error)?,
    })
}

#[async_trait::async_trait]
impl PrincipalDirectory for PostgresDirectory {
    #[instrument(skip(self), err)]
    async fn find_by_id(&self, id: PrincipalId) -> AuthResult<Option<Principal>> {
        let row = sqlx::query(&format!(
            "SELECT {PRINCIPAL_COLUMNS} FROM principals WHERE id = $1"
        ))
        .bind(id.get() as i64)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_principal_by_id", e))?;

        row.as_ref().map(principal_from_row).transpose()
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>> {
        self.find_principal_where("email", email).await
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Principal>> {
        self.find_principal_where("username", username).await
    }

    #[instrument(skip(self, new), err)]
    async fn insert(&self, new: NewPrincipal) -> AuthResult<Principal> {
        let row = sqlx::query(&format!(
            "INSERT INTO principals (email, username, password_hash, full_name, is_superuser, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {PRINCIPAL_COLUMNS}"
        ))
        .bind(&new.email)
        .bind(&new.username)
        .bind(&new.password_hash)
        .bind(&new.full_name)
        .bind(new.is_superuser)
        .bind(new.created_at)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_principal", e))?;

        principal_from_row(&row)
    }
}

#[async_trait::async_trait]
impl RbacDirectory for PostgresDirectory {
    #[instrument(skip(self), err)]
    async fn roles_for_principal(&self, principal_id: PrincipalId) -> AuthResult<Vec<Role>> {
        let rows = sqlx::query(
            "SELECT r.id, r.name, r.description \
             FROM roles r JOIN principal_roles pr ON pr.role_id = r.id \
             WHERE pr.principal_id = $1 \
             ORDER BY r.id",
        )
        .bind(principal_id.get() as i64)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("roles_for_principal", e))?;

        rows.iter().map(role_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn permissions_for_roles(&self, role_ids: &[RoleId]) -> AuthResult<Vec<Permission>> {
        let ids: Vec<i64> = role_ids.iter().map(|id| id.get() as i64).collect();
        let rows = sqlx::query(
            "SELECT DISTINCT p.id, p.name, p.description \
             FROM permissions p JOIN role_permissions rp ON rp.permission_id = p.id \
             WHERE rp.role_id = ANY($1) \
             ORDER BY p.id",
        )
        .bind(&ids)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("permissions_for_roles", e))?;

        rows.iter().map(permission_from_row).collect()
    }

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        let rows = sqlx::query("SELECT id, name, description FROM permissions ORDER BY id")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_permissions", e))?;

        rows.iter().map(permission_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn insert_permission(
        &self,
        name: PermissionName,
        description: Option<String>,
    ) -> AuthResult<Permission> {
        let row = sqlx::query(
            "INSERT INTO permissions (name, description) VALUES ($1, $2) \
             RETURNING id, name, description",
        )
        .bind(name.as_str())
        .bind(&description)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_permission", e))?;

        permission_from_row(&row)
    }
}
