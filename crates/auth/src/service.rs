//! `AuthService`: the facade request handlers and operator tooling call.

use std::collections::BTreeSet;
use std::sync::Arc;

use http::HeaderMap;
use tracing::{info, instrument, warn};

use warden_core::{Clock, PrincipalId};

use crate::authorize::{AuthorizationExplanation, AuthorizationResolver};
use crate::catalog::{self, PermissionDef};
use crate::claims::VerifiedClaims;
use crate::config::AuthSettings;
use crate::error::{AuthError, AuthResult};
use crate::issuer::{RefreshToken, TokenIssuer, TokenPair};
use crate::password::{BcryptHasher, PasswordHasher};
use crate::permissions::PermissionName;
use crate::principal::{NewPrincipal, Principal, Registration, normalize_email};
use crate::refresh::NewRefreshRecord;
use crate::roles::RoleName;
use crate::rotation;
use crate::store::{PrincipalDirectory, RbacDirectory, RefreshStore};
use crate::validator::TokenValidator;

/// Verified against when the identifier matches nobody, so a miss costs the
/// same as a wrong password.
const DUMMY_SECRET: &str = "warden-timing-equalizer";

/// Storage collaborators of an [`AuthService`].
#[derive(Clone)]
pub struct AuthBackends {
    pub refresh_store: Arc<dyn RefreshStore>,
    pub principals: Arc<dyn PrincipalDirectory>,
    pub rbac: Arc<dyn RbacDirectory>,
}

#[derive(Clone)]
pub struct AuthService {
    hasher: Arc<dyn PasswordHasher>,
    issuer: TokenIssuer,
    validator: TokenValidator,
    refresh_store: Arc<dyn RefreshStore>,
    principals: Arc<dyn PrincipalDirectory>,
    rbac: Arc<dyn RbacDirectory>,
    resolver: AuthorizationResolver,
    clock: Arc<dyn Clock>,
    dummy_digest: String,
}

impl AuthService {
    /// Build a service hashing with bcrypt at the configured cost.
    pub fn new(
        settings: &AuthSettings,
        backends: AuthBackends,
        clock: Arc<dyn Clock>,
    ) -> AuthResult<Self> {
        let hasher = Arc::new(BcryptHasher::new(settings.bcrypt_cost()));
        Self::with_hasher(settings, backends, clock, hasher)
    }

    pub fn with_hasher(
        settings: &AuthSettings,
        backends: AuthBackends,
        clock: Arc<dyn Clock>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> AuthResult<Self> {
        let dummy_digest = hasher.hash(DUMMY_SECRET)?;
        Ok(Self {
            hasher,
            issuer: TokenIssuer::new(settings),
            validator: TokenValidator::new(settings),
            refresh_store: backends.refresh_store,
            principals: backends.principals,
            resolver: AuthorizationResolver::new(backends.rbac.clone()),
            rbac: backends.rbac,
            clock,
            dummy_digest,
        })
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn validator(&self) -> &TokenValidator {
        &self.validator
    }

    pub fn resolver(&self) -> &AuthorizationResolver {
        &self.resolver
    }

    /// Create a principal after validation and uniqueness checks.
    #[instrument(skip(self, registration), err)]
    pub async fn register(&self, registration: &Registration) -> AuthResult<Principal> {
        let (email, username) = registration.normalized()?;

        if self.principals.find_by_email(&email).await?.is_some() {
            return Err(AuthError::conflict("email already registered"));
        }
        if self.principals.find_by_username(&username).await?.is_some() {
            return Err(AuthError::conflict("username already taken"));
        }

        let password_hash = self.hasher.hash(&registration.password)?;
        let principal = self
            .principals
            .insert(NewPrincipal {
                email,
                username,
                password_hash,
                full_name: registration.full_name.clone(),
                is_superuser: registration.is_superuser,
                created_at: self.clock.now(),
            })
            .await?;

        info!(
            principal_id = %principal.id,
            is_superuser = principal.is_superuser,
            "registered principal"
        );
        Ok(principal)
    }

    /// Exchange an email or username plus password for a token pair.
    ///
    /// Every failure is the same `Unauthenticated` so callers cannot tell an
    /// unknown account from a wrong password.
    #[instrument(skip(self, identifier, secret), err)]
    pub async fn authenticate(&self, identifier: &str, secret: &str) -> AuthResult<TokenPair> {
        let found = self.find_by_identifier(identifier).await?;

        let Some(principal) = found else {
            self.hasher.verify(secret, &self.dummy_digest);
            warn!("login rejected: unknown identifier");
            return Err(AuthError::Unauthenticated("invalid credentials"));
        };

        if !self.hasher.verify(secret, &principal.password_hash) {
            warn!(principal_id = %principal.id, "login rejected: wrong password");
            return Err(AuthError::Unauthenticated("invalid credentials"));
        }

        if !principal.is_active {
            warn!(principal_id = %principal.id, "login rejected: principal inactive");
            return Err(AuthError::Unauthenticated("principal is not active"));
        }

        let now = self.clock.now();
        let access = self.issuer.issue_access(principal.id, now)?;
        let record = self
            .refresh_store
            .create(NewRefreshRecord {
                token: self.issuer.issue_refresh()?,
                principal_id: principal.id,
                expires_at: self.issuer.refresh_expiry(now)?,
                issued_at: now,
            })
            .await?;

        info!(principal_id = %principal.id, "principal logged in");
        Ok(self.issuer.pair(access, record.token))
    }

    async fn find_by_identifier(&self, identifier: &str) -> AuthResult<Option<Principal>> {
        let identifier = identifier.trim();
        if identifier.contains('@') {
            self.principals.find_by_email(&normalize_email(identifier)).await
        } else {
            self.principals.find_by_username(identifier).await
        }
    }

    pub fn validate_access(&self, raw: &str) -> AuthResult<VerifiedClaims> {
        self.validator.validate(raw, self.clock.now())
    }

    /// Extract (bearer header, then cookie) and validate the access credential.
    pub fn authenticate_request(&self, headers: &HeaderMap) -> AuthResult<VerifiedClaims> {
        self.validator.authenticate_request(headers, self.clock.now())
    }

    /// Resolve the request's access credential to an active principal.
    pub async fn current_principal(&self, headers: &HeaderMap) -> AuthResult<Principal> {
        let claims = self.authenticate_request(headers)?;
        match self.principals.find_by_id(claims.subject).await? {
            Some(principal) if principal.is_active => Ok(principal),
            Some(_) => Err(AuthError::Unauthenticated("principal is not active")),
            None => Err(AuthError::Unauthenticated("principal no longer exists")),
        }
    }

    #[instrument(skip(self, presented), err)]
    pub async fn rotate(&self, presented: &RefreshToken) -> AuthResult<TokenPair> {
        let rotation = rotation::rotate(
            self.refresh_store.as_ref(),
            self.principals.as_ref(),
            &self.issuer,
            presented,
            self.clock.now(),
        )
        .await?;
        Ok(rotation.pair)
    }

    /// Logout of one session. `false` if it was already inactive or unknown.
    #[instrument(skip(self, presented), err)]
    pub async fn revoke(&self, presented: &RefreshToken) -> AuthResult<bool> {
        let revoked = self.refresh_store.revoke(presented, self.clock.now()).await?;
        if revoked {
            info!("refresh token revoked");
        }
        Ok(revoked)
    }

    /// Logout everywhere.
    #[instrument(skip(self), err)]
    pub async fn revoke_all(&self, principal_id: PrincipalId) -> AuthResult<u64> {
        let count = self
            .refresh_store
            .revoke_all(principal_id, self.clock.now())
            .await?;
        info!(principal_id = %principal_id, revoked = count, "revoked all refresh tokens");
        Ok(count)
    }

    #[instrument(skip(self), err)]
    pub async fn sweep_expired(&self) -> AuthResult<u64> {
        let removed = self.refresh_store.sweep_expired(self.clock.now()).await?;
        info!(removed, "swept expired refresh tokens");
        Ok(removed)
    }

    pub async fn sync_permissions(&self, defs: &[PermissionDef]) -> AuthResult<Vec<PermissionName>> {
        catalog::sync_permissions(self.rbac.as_ref(), defs).await
    }

    pub async fn effective_permissions(
        &self,
        principal: &Principal,
    ) -> AuthResult<BTreeSet<PermissionName>> {
        self.resolver.effective_permissions(principal).await
    }

    pub async fn require_role(&self, principal: &Principal, allowed: &[RoleName]) -> AuthResult<()> {
        self.resolver.require_role(principal, allowed).await
    }

    pub async fn require_permission(
        &self,
        principal: &Principal,
        permission: &PermissionName,
    ) -> AuthResult<()> {
        self.resolver.require_permission(principal, permission).await
    }

    pub async fn explain_permission(
        &self,
        principal: &Principal,
        permission: &PermissionName,
    ) -> AuthResult<AuthorizationExplanation> {
        self.resolver.explain_permission(principal, permission).await
    }
}
