use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use warden_core::{DomainError, DomainResult, Entity, PermissionId};

/// Permission name.
///
/// Permissions are namespaced strings of the form `"resource:action"`
/// (e.g. `"doc:write"`). `new` accepts any string so checks can be made for
/// names that are not (yet) defined; `parse` enforces the namespaced shape and
/// is what definitions go through.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionName(Cow<'static, str>);

impl PermissionName {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn parse(name: impl Into<Cow<'static, str>>) -> DomainResult<Self> {
        let name = name.into();
        let valid = match name.split_once(':') {
            Some((resource, action)) => {
                is_segment(resource) && is_segment(action) && !action.contains(':')
            }
            None => false,
        };
        if !valid {
            return Err(DomainError::validation(format!(
                "permission name '{name}' must look like 'resource:action'"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The part before `:` (the whole name if it is not namespaced).
    pub fn resource(&self) -> &str {
        self.as_str().split_once(':').map_or(self.as_str(), |(resource, _)| resource)
    }

    /// The part after `:`, if any.
    pub fn action(&self) -> Option<&str> {
        self.as_str().split_once(':').map(|(_, action)| action)
    }
}

fn is_segment(s: &str) -> bool {
    !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

impl core::fmt::Display for PermissionName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A stored permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    pub id: PermissionId,
    pub name: PermissionName,
    pub description: Option<String>,
}

impl Entity for Permission {
    type Id = PermissionId;

    fn id(&self) -> PermissionId {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_namespaced_names() {
        let name = PermissionName::parse("doc:write").unwrap();
        assert_eq!(name.resource(), "doc");
        assert_eq!(name.action(), Some("write"));
    }

    #[test]
    fn rejects_malformed_names() {
        for bad in ["", "doc", ":write", "doc:", "doc:write:all", "doc write:x"] {
            assert!(PermissionName::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn unchecked_names_still_compare_by_value() {
        assert_eq!(PermissionName::new("anything"), PermissionName::new("anything".to_string()));
        assert_eq!(PermissionName::new("anything").action(), None);
    }
}
