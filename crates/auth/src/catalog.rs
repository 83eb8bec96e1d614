//! Statically declared permissions and their reconciliation with storage.

use std::collections::HashSet;

use tracing::{info, instrument};

use crate::error::AuthResult;
use crate::permissions::PermissionName;
use crate::store::RbacDirectory;

/// A permission an application declares it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDef {
    pub name: &'static str,
    pub description: &'static str,
}

impl PermissionDef {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }
}

/// Permissions guarding principal management.
pub const USER_PERMISSIONS: &[PermissionDef] = &[
    PermissionDef::new("user:create", "Create new user accounts"),
    PermissionDef::new("user:list", "List user accounts"),
    PermissionDef::new("user:read", "View user details"),
    PermissionDef::new("user:update", "Modify user accounts"),
    PermissionDef::new("user:delete", "Delete user accounts"),
];

/// Insert every definition whose name is not stored yet.
///
/// Existing permissions are never renamed or removed. Returns the names that
/// were added, in definition order. Every name is validated before anything is
/// written, so a malformed definition leaves storage untouched.
#[instrument(skip(directory, defs), fields(defined = defs.len()), err)]
pub async fn sync_permissions(
    directory: &dyn RbacDirectory,
    defs: &[PermissionDef],
) -> AuthResult<Vec<PermissionName>> {
    let parsed = defs
        .iter()
        .map(|def| PermissionName::parse(def.name).map(|name| (name, def.description)))
        .collect::<Result<Vec<_>, _>>()?;

    let existing: HashSet<PermissionName> = directory
        .list_permissions()
        .await?
        .into_iter()
        .map(|p| p.name)
        .collect();

    let mut added = Vec::new();
    for (name, description) in parsed {
        if existing.contains(&name) || added.contains(&name) {
            continue;
        }
        directory
            .insert_permission(name.clone(), Some(description.to_string()))
            .await?;
        added.push(name);
    }

    if added.is_empty() {
        info!("permission catalog already synchronized");
    } else {
        info!(added = added.len(), "synchronized permission catalog");
    }

    Ok(added)
}
