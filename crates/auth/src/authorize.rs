use std::collections::BTreeSet;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use warden_core::{PrincipalId, RoleId};

use crate::error::{AuthError, AuthResult};
use crate::permissions::PermissionName;
use crate::principal::Principal;
use crate::roles::{Role, RoleName};
use crate::store::RbacDirectory;

/// Resolves role and permission checks against the RBAC directory.
///
/// Nothing is cached: every check reads the current associations, so a role
/// or grant change applies to the next request. The superuser flag bypasses
/// every check and is neither a role nor a permission.
#[derive(Clone)]
pub struct AuthorizationResolver {
    directory: Arc<dyn RbacDirectory>,
}

impl AuthorizationResolver {
    pub fn new(directory: Arc<dyn RbacDirectory>) -> Self {
        Self { directory }
    }

    /// Union of the permissions of every role assigned to `principal`.
    pub async fn effective_permissions(
        &self,
        principal: &Principal,
    ) -> AuthResult<BTreeSet<PermissionName>> {
        let roles = self.directory.roles_for_principal(principal.id).await?;
        self.permissions_of(&roles).await
    }

    #[instrument(skip(self, principal, allowed), fields(principal_id = %principal.id), err)]
    pub async fn require_role(&self, principal: &Principal, allowed: &[RoleName]) -> AuthResult<()> {
        if principal.is_superuser {
            return Ok(());
        }

        let roles = self.directory.roles_for_principal(principal.id).await?;
        if roles.iter().any(|role| allowed.contains(&role.name)) {
            return Ok(());
        }

        let names: Vec<&str> = allowed.iter().map(RoleName::as_str).collect();
        Err(AuthError::forbidden(format!(
            "requires one of roles [{}]",
            names.join(", ")
        )))
    }

    #[instrument(skip(self, principal), fields(principal_id = %principal.id), err)]
    pub async fn require_permission(
        &self,
        principal: &Principal,
        permission: &PermissionName,
    ) -> AuthResult<()> {
        if principal.is_superuser {
            return Ok(());
        }

        if self.effective_permissions(principal).await?.contains(permission) {
            Ok(())
        } else {
            Err(AuthError::forbidden(format!("missing permission '{permission}'")))
        }
    }

    /// Why `principal` would be allowed or denied `permission`.
    pub async fn explain_permission(
        &self,
        principal: &Principal,
        permission: &PermissionName,
    ) -> AuthResult<AuthorizationExplanation> {
        let roles = self.directory.roles_for_principal(principal.id).await?;
        let effective = self.permissions_of(&roles).await?;
        let has_permission = effective.contains(permission);
        let granted = principal.is_superuser || has_permission;

        let reason = if principal.is_superuser {
            "principal is a superuser; role and permission checks are bypassed".to_string()
        } else if has_permission {
            format!("permission '{permission}' is granted through an assigned role")
        } else {
            format!("no assigned role grants '{permission}'")
        };

        let denial = (!granted).then(|| DenialReason {
            message: format!("missing required permission '{permission}'"),
            suggestions: vec![
                format!("assign a role that grants '{permission}'"),
                format!("grant '{permission}' to one of: {}", role_list(&roles)),
            ],
        });

        debug!(principal_id = %principal.id, %permission, granted, "explained permission check");

        Ok(AuthorizationExplanation {
            required_permission: permission.as_str().to_string(),
            granted,
            reason,
            principal: PrincipalState {
                principal_id: principal.id,
                is_superuser: principal.is_superuser,
                roles: roles.iter().map(|r| r.name.as_str().to_string()).collect(),
                effective_permissions: effective.iter().map(|p| p.as_str().to_string()).collect(),
            },
            denial_reason: denial,
        })
    }

    async fn permissions_of(&self, roles: &[Role]) -> AuthResult<BTreeSet<PermissionName>> {
        if roles.is_empty() {
            return Ok(BTreeSet::new());
        }
        let role_ids: Vec<RoleId> = roles.iter().map(|r| r.id).collect();
        let permissions = self.directory.permissions_for_roles(&role_ids).await?;
        Ok(permissions.into_iter().map(|p| p.name).collect())
    }
}

fn role_list(roles: &[Role]) -> String {
    if roles.is_empty() {
        return "(no roles assigned)".to_string();
    }
    roles
        .iter()
        .map(|r| r.name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Auditable account of a permission decision.
#[derive(Debug, Clone, Serialize)]
pub struct AuthorizationExplanation {
    pub required_permission: String,
    pub granted: bool,
    pub reason: String,
    pub principal: PrincipalState,
    pub denial_reason: Option<DenialReason>,
}

/// Snapshot of the principal at decision time.
#[derive(Debug, Clone, Serialize)]
pub struct PrincipalState {
    pub principal_id: PrincipalId,
    pub is_superuser: bool,
    pub roles: Vec<String>,
    /// Sorted.
    pub effective_permissions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DenialReason {
    pub message: String,
    pub suggestions: Vec<String>,
}
