//! `warden-auth`: hybrid credential authentication and RBAC.
//!
//! Short-lived signed access tokens are verified without any lookup; opaque
//! refresh tokens live in a trust store and are single-use (rotated on every
//! exchange). Storage is reached only through the traits in [`store`].

pub mod authorize;
pub mod catalog;
pub mod claims;
pub mod config;
pub mod error;
pub mod issuer;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod refresh;
pub mod roles;
pub mod rotation;
pub mod service;
pub mod store;
pub mod validator;

pub use authorize::{AuthorizationExplanation, AuthorizationResolver, DenialReason, PrincipalState};
pub use catalog::{PermissionDef, USER_PERMISSIONS, sync_permissions};
pub use claims::{AccessClaims, TokenValidationError, VerifiedClaims, validate_claims};
pub use config::AuthSettings;
pub use error::{AuthError, AuthResult, ErrorKind};
pub use issuer::{RefreshToken, TokenIssuer, TokenPair};
pub use password::{BcryptHasher, PasswordHasher};
pub use permissions::{Permission, PermissionName};
pub use principal::{NewPrincipal, Principal, Registration, normalize_email};
pub use refresh::{NewRefreshRecord, RefreshRecord};
pub use roles::{PrincipalRole, Role, RoleName, RolePermission};
pub use rotation::{RefreshState, Rotation};
pub use service::{AuthBackends, AuthService};
pub use store::{PrincipalDirectory, RbacDirectory, RefreshStore};
pub use validator::{TokenValidator, looks_like_access_token};
