use std::collections::{BTreeMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use warden_auth::{
    AuthError, AuthResult, NewPrincipal, Permission, PermissionName, Principal, PrincipalDirectory,
    PrincipalRole, RbacDirectory, Role, RoleName, RolePermission,
};
use warden_core::{PermissionId, PrincipalId, RoleId};

#[derive(Debug, Default)]
struct Tables {
    next_principal: u64,
    next_role: u64,
    next_permission: u64,
    principals: BTreeMap<PrincipalId, Principal>,
    roles: BTreeMap<RoleId, Role>,
    permissions: BTreeMap<PermissionId, Permission>,
    principal_roles: HashSet<PrincipalRole>,
    role_permissions: HashSet<RolePermission>,
}

/// In-memory principal + RBAC directory.
///
/// Intended for tests/dev. Besides the directory traits it exposes the
/// administrative writes (roles, grants, assignments) that the core itself
/// never performs.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    tables: RwLock<Tables>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> AuthResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| AuthError::internal("directory lock poisoned"))
    }

    fn write(&self) -> AuthResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| AuthError::internal("directory lock poisoned"))
    }

    pub fn add_role(&self, name: RoleName, description: Option<String>) -> AuthResult<Role> {
        let mut tables = self.write()?;
        if tables.roles.values().any(|r| r.name == name) {
            return Err(AuthError::conflict(format!("role '{name}' already exists")));
        }
        tables.next_role += 1;
        let role = Role {
            id: RoleId::new(tables.next_role),
            name,
            description,
        };
        tables.roles.insert(role.id, role.clone());
        Ok(role)
    }

    /// Grant `permission` to `role`. Idempotent.
    pub fn grant(&self, role_id: RoleId, permission_id: PermissionId) -> AuthResult<()> {
        let mut tables = self.write()?;
        if !tables.roles.contains_key(&role_id) {
            return Err(AuthError::not_found(format!("role {role_id}")));
        }
        if !tables.permissions.contains_key(&permission_id) {
            return Err(AuthError::not_found(format!("permission {permission_id}")));
        }
        tables.role_permissions.insert(RolePermission {
            role_id,
            permission_id,
        });
        Ok(())
    }

    /// Assign `role` to `principal`. Idempotent.
    pub fn assign(&self, principal_id: PrincipalId, role_id: RoleId) -> AuthResult<()> {
        let mut tables = self.write()?;
        if !tables.principals.contains_key(&principal_id) {
            return Err(AuthError::not_found(format!("principal {principal_id}")));
        }
        if !tables.roles.contains_key(&role_id) {
            return Err(AuthError::not_found(format!("role {role_id}")));
        }
        tables.principal_roles.insert(PrincipalRole {
            principal_id,
            role_id,
        });
        Ok(())
    }

    pub fn unassign(&self, principal_id: PrincipalId, role_id: RoleId) -> AuthResult<bool> {
        Ok(self.write()?.principal_roles.remove(&PrincipalRole {
            principal_id,
            role_id,
        }))
    }

    pub fn set_active(&self, principal_id: PrincipalId, is_active: bool) -> AuthResult<()> {
        let mut tables = self.write()?;
        let principal = tables
            .principals
            .get_mut(&principal_id)
            .ok_or_else(|| AuthError::not_found(format!("principal {principal_id}")))?;
        principal.is_active = is_active;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PrincipalDirectory for InMemoryDirectory {
    async fn find_by_id(&self, id: PrincipalId) -> AuthResult<Option<Principal>> {
        Ok(self.read()?.principals.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AuthResult<Option<Principal>> {
        Ok(self
            .read()?
            .principals
            .values()
            .find(|p| p.email == email)
            .cloned())
    }

    async fn find_by_username(&self, username: &str) -> AuthResult<Option<Principal>> {
        Ok(self
            .read()?
            .principals
            .values()
            .find(|p| p.username == username)
            .cloned())
    }

    async fn insert(&self, new: NewPrincipal) -> AuthResult<Principal> {
        let mut tables = self.write()?;
        if tables.principals.values().any(|p| p.email == new.email) {
            return Err(AuthError::conflict("email already registered"));
        }
        if tables.principals.values().any(|p| p.username == new.username) {
            return Err(AuthError::conflict("username already taken"));
        }

        tables.next_principal += 1;
        let principal = Principal {
            id: PrincipalId::new(tables.next_principal),
            email: new.email,
            username: new.username,
            password_hash: new.password_hash,
            full_name: new.full_name,
            is_active: true,
            is_superuser: new.is_superuser,
            created_at: new.created_at,
        };
        tables.principals.insert(principal.id, principal.clone());
        Ok(principal)
    }
}

#[async_trait::async_trait]
impl RbacDirectory for InMemoryDirectory {
    async fn roles_for_principal(&self, principal_id: PrincipalId) -> AuthResult<Vec<Role>> {
        let tables = self.read()?;
        Ok(tables
            .roles
            .values()
            .filter(|role| {
                tables.principal_roles.contains(&PrincipalRole {
                    principal_id,
                    role_id: role.id,
                })
            })
            .cloned()
            .collect())
    }

    async fn permissions_for_roles(&self, role_ids: &[RoleId]) -> AuthResult<Vec<Permission>> {
        let tables = self.read()?;
        Ok(tables
            .permissions
            .values()
            .filter(|permission| {
                role_ids.iter().any(|&role_id| {
                    tables.role_permissions.contains(&RolePermission {
                        role_id,
                        permission_id: permission.id,
                    })
                })
            })
            .cloned()
            .collect())
    }

    async fn list_permissions(&self) -> AuthResult<Vec<Permission>> {
        Ok(self.read()?.permissions.values().cloned().collect())
    }

    async fn insert_permission(
        &self,
        name: PermissionName,
        description: Option<String>,
    ) -> AuthResult<Permission> {
        let mut tables = self.write()?;
        if tables.permissions.values().any(|p| p.name == name) {
            return Err(AuthError::conflict(format!("permission '{name}' already exists")));
        }
        tables.next_permission += 1;
        let permission = Permission {
            id: PermissionId::new(tables.next_permission),
            name,
            description,
        };
        tables.permissions.insert(permission.id, permission.clone());
        Ok(permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_principal(email: &str, username: &str) -> NewPrincipal {
        NewPrincipal {
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "hash".to_string(),
            full_name: None,
            is_superuser: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_email_or_username_is_conflict() {
        let dir = InMemoryDirectory::new();
        dir.insert(new_principal("a@x.io", "a")).await.unwrap();

        let by_email = dir.insert(new_principal("a@x.io", "b")).await.unwrap_err();
        let by_username = dir.insert(new_principal("b@x.io", "a")).await.unwrap_err();
        assert_eq!(by_email.kind(), warden_auth::ErrorKind::Conflict);
        assert_eq!(by_username.kind(), warden_auth::ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn principal_may_hold_several_roles() {
        let dir = InMemoryDirectory::new();
        let p = dir.insert(new_principal("a@x.io", "a")).await.unwrap();
        let editor = dir.add_role(RoleName::new("editor"), None).unwrap();
        let viewer = dir.add_role(RoleName::new("viewer"), None).unwrap();
        dir.assign(p.id, editor.id).unwrap();
        dir.assign(p.id, viewer.id).unwrap();
        dir.assign(p.id, viewer.id).unwrap();

        let roles = dir.roles_for_principal(p.id).await.unwrap();
        assert_eq!(roles.len(), 2);
    }

    #[tokio::test]
    async fn permissions_for_roles_deduplicates_shared_grants() {
        let dir = InMemoryDirectory::new();
        let a = dir.add_role(RoleName::new("a"), None).unwrap();
        let b = dir.add_role(RoleName::new("b"), None).unwrap();
        let read = dir
            .insert_permission(PermissionName::new("doc:read"), None)
            .await
            .unwrap();
        dir.grant(a.id, read.id).unwrap();
        dir.grant(b.id, read.id).unwrap();

        let perms = dir.permissions_for_roles(&[a.id, b.id]).await.unwrap();
        assert_eq!(perms.len(), 1);
    }

    #[tokio::test]
    async fn assigning_unknown_role_is_not_found() {
        let dir = InMemoryDirectory::new();
        let p = dir.insert(new_principal("a@x.io", "a")).await.unwrap();
        let err = dir.assign(p.id, RoleId::new(99)).unwrap_err();
        assert_eq!(err.kind(), warden_auth::ErrorKind::NotFound);
    }
}
