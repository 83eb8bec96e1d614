//! Access token extraction and verification.
//!
//! Validation is a pure function of the token, the configured key and `now`;
//! it never consults a store.

use chrono::{DateTime, Utc};
use http::HeaderMap;
use http::header::{AUTHORIZATION, COOKIE};
use jsonwebtoken::{DecodingKey, Validation};
use tracing::debug;

use crate::claims::{AccessClaims, VerifiedClaims, validate_claims};
use crate::config::AuthSettings;
use crate::error::{AuthError, AuthResult};

/// Cheap structural pre-check: exactly three dot-separated segments.
///
/// Opaque refresh tokens contain no dots and fail here without any
/// cryptographic work.
pub fn looks_like_access_token(raw: &str) -> bool {
    raw.split('.').count() == 3
}

#[derive(Clone)]
pub struct TokenValidator {
    decoding_key: DecodingKey,
    validation: Validation,
    access_cookie: String,
}

impl TokenValidator {
    pub fn new(settings: &AuthSettings) -> Self {
        let mut validation = Validation::new(settings.algorithm());
        // Expiry is checked against the caller's `now` in `validate_claims`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            decoding_key: DecodingKey::from_secret(settings.signing_key()),
            validation,
            access_cookie: settings.access_cookie().to_string(),
        }
    }

    /// Pull the raw access token out of request headers.
    ///
    /// `Authorization: Bearer <token>` wins; otherwise the access cookie is used.
    pub fn extract<'a>(&self, headers: &'a HeaderMap) -> Option<&'a str> {
        bearer_value(headers).or_else(|| cookie_value(headers, &self.access_cookie))
    }

    /// Verify signature and expiry of a raw access token.
    pub fn validate(&self, raw: &str, now: DateTime<Utc>) -> AuthResult<VerifiedClaims> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AuthError::Unauthenticated("no credential presented"));
        }
        if !looks_like_access_token(raw) {
            return Err(AuthError::InvalidFormat);
        }

        let decoded = jsonwebtoken::decode::<AccessClaims>(raw, &self.decoding_key, &self.validation)
            .map_err(|e| {
                debug!(error = %e, "access token rejected by signature check");
                AuthError::InvalidOrExpired
            })?;

        validate_claims(&decoded.claims, now).map_err(|e| {
            debug!(error = %e, "access token rejected by claim check");
            AuthError::InvalidOrExpired
        })
    }

    /// Extract then validate; no token at all is `Unauthenticated`.
    pub fn authenticate_request(
        &self,
        headers: &HeaderMap,
        now: DateTime<Utc>,
    ) -> AuthResult<VerifiedClaims> {
        let raw = self
            .extract(headers)
            .ok_or(AuthError::Unauthenticated("no credential presented"))?;
        self.validate(raw, now)
    }
}

fn bearer_value(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() { None } else { Some(token) }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, value)| *key == name && !value.is_empty())
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issuer::TokenIssuer;
    use chrono::{Duration, TimeZone};
    use http::HeaderValue;
    use proptest::prelude::*;
    use warden_core::PrincipalId;

    fn settings(key: &str) -> AuthSettings {
        AuthSettings::new(key).unwrap()
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, 9, 30, 0).unwrap()
    }

    #[test]
    fn round_trip_recovers_subject_and_expiry() {
        let s = settings("round-trip");
        let token = TokenIssuer::new(&s).issue_access(PrincipalId::new(77), t0()).unwrap();

        let claims = TokenValidator::new(&s).validate(&token, t0()).unwrap();
        assert_eq!(claims.subject, PrincipalId::new(77));
        assert_eq!(claims.expires_at, t0() + Duration::minutes(30));
    }

    #[test]
    fn token_from_another_key_is_rejected() {
        let token = TokenIssuer::new(&settings("key-a"))
            .issue_access(PrincipalId::new(1), t0())
            .unwrap();

        let err = TokenValidator::new(&settings("key-b")).validate(&token, t0()).unwrap_err();
        assert_eq!(err, AuthError::InvalidOrExpired);
    }

    #[test]
    fn expired_token_is_rejected() {
        let s = settings("expiry");
        let token = TokenIssuer::new(&s).issue_access(PrincipalId::new(1), t0()).unwrap();

        let err = TokenValidator::new(&s)
            .validate(&token, t0() + Duration::minutes(31))
            .unwrap_err();
        assert_eq!(err, AuthError::InvalidOrExpired);
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let s = settings("tamper");
        let token = TokenIssuer::new(&s).issue_access(PrincipalId::new(1), t0()).unwrap();
        let forged = TokenIssuer::new(&s).issue_access(PrincipalId::new(2), t0()).unwrap();

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_payload = forged.split('.').nth(1).unwrap();
        parts[1] = forged_payload;
        let spliced = parts.join(".");

        let err = TokenValidator::new(&s).validate(&spliced, t0()).unwrap_err();
        assert_eq!(err, AuthError::InvalidOrExpired);
    }

    #[test]
    fn refresh_token_fails_the_format_check() {
        let s = settings("format");
        let refresh = TokenIssuer::new(&s).issue_refresh().unwrap();

        let err = TokenValidator::new(&s).validate(refresh.as_str(), t0()).unwrap_err();
        assert_eq!(err, AuthError::InvalidFormat);
    }

    #[test]
    fn missing_token_is_unauthenticated() {
        let v = TokenValidator::new(&settings("missing"));
        assert!(matches!(v.validate("  ", t0()), Err(AuthError::Unauthenticated(_))));
        assert!(matches!(
            v.authenticate_request(&HeaderMap::new(), t0()),
            Err(AuthError::Unauthenticated(_))
        ));
    }

    #[test]
    fn bearer_header_takes_precedence_over_cookie() {
        let v = TokenValidator::new(&settings("carriers"));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer a.b.c"));
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; access_token=x.y.z"));

        assert_eq!(v.extract(&headers), Some("a.b.c"));

        headers.remove(AUTHORIZATION);
        assert_eq!(v.extract(&headers), Some("x.y.z"));
    }

    #[test]
    fn non_bearer_authorization_falls_back_to_cookie() {
        let v = TokenValidator::new(&settings("carriers"));
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(v.extract(&headers), None);

        headers.insert(COOKIE, HeaderValue::from_static("access_token=x.y.z"));
        assert_eq!(v.extract(&headers), Some("x.y.z"));
    }

    #[test]
    fn authenticate_request_validates_the_cookie_token() {
        let s = settings("cookie-flow");
        let token = TokenIssuer::new(&s).issue_access(PrincipalId::new(5), t0()).unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_str(&format!("access_token={token}")).unwrap(),
        );

        let claims = TokenValidator::new(&s).authenticate_request(&headers, t0()).unwrap();
        assert_eq!(claims.subject, PrincipalId::new(5));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        #[test]
        fn issued_tokens_validate_for_any_subject(id in any::<u64>(), offset in 0i64..1800) {
            let s = settings("prop-key");
            let token = TokenIssuer::new(&s).issue_access(PrincipalId::new(id), t0()).unwrap();
            let claims = TokenValidator::new(&s)
                .validate(&token, t0() + Duration::seconds(offset))
                .unwrap();
            prop_assert_eq!(claims.subject, PrincipalId::new(id));
        }

        #[test]
        fn strings_without_exactly_two_dots_fail_the_precheck(raw in "[A-Za-z0-9_-]{0,64}(\\.[A-Za-z0-9_-]{0,16}){0,1}") {
            prop_assert!(!looks_like_access_token(&raw));
        }
    }
}
