//! Environment-driven configuration.
//!
//! | Variable | Default |
//! |---|---|
//! | `WARDEN_SECRET_KEY` | required |
//! | `WARDEN_ALGORITHM` | `HS256` |
//! | `WARDEN_ACCESS_TTL_MINUTES` | `30` |
//! | `WARDEN_REFRESH_TTL_DAYS` | `7` |
//! | `WARDEN_ACCESS_COOKIE` | `access_token` |
//! | `WARDEN_BCRYPT_COST` | `12` |
//! | `DATABASE_URL` | unset (in-memory stores) |

use std::str::FromStr;

use chrono::Duration;
use jsonwebtoken::Algorithm;
use thiserror::Error;

use warden_auth::{AuthError, AuthSettings};

pub const SECRET_KEY: &str = "WARDEN_SECRET_KEY";
pub const ALGORITHM: &str = "WARDEN_ALGORITHM";
pub const ACCESS_TTL_MINUTES: &str = "WARDEN_ACCESS_TTL_MINUTES";
pub const REFRESH_TTL_DAYS: &str = "WARDEN_REFRESH_TTL_DAYS";
pub const ACCESS_COOKIE: &str = "WARDEN_ACCESS_COOKIE";
pub const BCRYPT_COST: &str = "WARDEN_BCRYPT_COST";
pub const DATABASE_URL: &str = "DATABASE_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl ConfigError {
    fn invalid(key: &'static str, reason: impl ToString) -> Self {
        Self::Invalid {
            key,
            reason: reason.to_string(),
        }
    }
}

/// Process configuration: auth settings plus the optional database URL.
#[derive(Debug, Clone)]
pub struct Settings {
    pub auth: AuthSettings,
    pub database_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Blank values count as unset.
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let secret = get(SECRET_KEY).ok_or(ConfigError::Missing(SECRET_KEY))?;
        let mut auth = AuthSettings::new(secret).map_err(|e| auth_error(SECRET_KEY, e))?;

        if let Some(raw) = get(ALGORITHM) {
            let algorithm = Algorithm::from_str(&raw).map_err(|e| ConfigError::invalid(ALGORITHM, e))?;
            auth = auth
                .with_algorithm(algorithm)
                .map_err(|e| auth_error(ALGORITHM, e))?;
        }

        if let Some(minutes) = parse::<i64>(&get, ACCESS_TTL_MINUTES)? {
            let ttl = Duration::try_minutes(minutes)
                .ok_or_else(|| ConfigError::invalid(ACCESS_TTL_MINUTES, "out of range"))?;
            auth = auth
                .with_access_ttl(ttl)
                .map_err(|e| auth_error(ACCESS_TTL_MINUTES, e))?;
        }

        if let Some(days) = parse::<i64>(&get, REFRESH_TTL_DAYS)? {
            let ttl = Duration::try_days(days)
                .ok_or_else(|| ConfigError::invalid(REFRESH_TTL_DAYS, "out of range"))?;
            auth = auth
                .with_refresh_ttl(ttl)
                .map_err(|e| auth_error(REFRESH_TTL_DAYS, e))?;
        }

        if let Some(cookie) = get(ACCESS_COOKIE) {
            auth = auth
                .with_access_cookie(cookie)
                .map_err(|e| auth_error(ACCESS_COOKIE, e))?;
        }

        if let Some(cost) = parse::<u32>(&get, BCRYPT_COST)? {
            auth = auth
                .with_bcrypt_cost(cost)
                .map_err(|e| auth_error(BCRYPT_COST, e))?;
        }

        Ok(Self {
            auth,
            database_url: get(DATABASE_URL),
        })
    }
}

fn parse<T>(get: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    get(key)
        .map(|raw| raw.parse::<T>().map_err(|e| ConfigError::invalid(key, e)))
        .transpose()
}

fn auth_error(key: &'static str, err: AuthError) -> ConfigError {
    ConfigError::invalid(key, err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_source(|key| env.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_only_the_key_is_set() {
        let settings = load(&[(SECRET_KEY, "s3cret")]).unwrap();
        assert_eq!(settings.auth.algorithm(), Algorithm::HS256);
        assert_eq!(settings.auth.access_ttl(), Duration::minutes(30));
        assert_eq!(settings.auth.refresh_ttl(), Duration::days(7));
        assert_eq!(settings.auth.access_cookie(), "access_token");
        assert_eq!(settings.auth.bcrypt_cost(), 12);
        assert!(settings.database_url.is_none());
    }

    #[test]
    fn missing_or_blank_key_is_rejected() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing(SECRET_KEY))));
        assert!(matches!(
            load(&[(SECRET_KEY, "   ")]),
            Err(ConfigError::Missing(SECRET_KEY))
        ));
    }

    #[test]
    fn overrides_are_applied() {
        let settings = load(&[
            (SECRET_KEY, "k"),
            (ALGORITHM, "HS512"),
            (ACCESS_TTL_MINUTES, "5"),
            (REFRESH_TTL_DAYS, "1"),
            (ACCESS_COOKIE, "session"),
            (BCRYPT_COST, "4"),
            (DATABASE_URL, "postgres://localhost/warden"),
        ])
        .unwrap();
        assert_eq!(settings.auth.algorithm(), Algorithm::HS512);
        assert_eq!(settings.auth.access_ttl(), Duration::minutes(5));
        assert_eq!(settings.auth.refresh_ttl(), Duration::days(1));
        assert_eq!(settings.auth.access_cookie(), "session");
        assert_eq!(settings.auth.bcrypt_cost(), 4);
        assert_eq!(settings.database_url.as_deref(), Some("postgres://localhost/warden"));
    }

    #[test]
    fn asymmetric_algorithm_is_rejected() {
        let err = load(&[(SECRET_KEY, "k"), (ALGORITHM, "RS256")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ALGORITHM, .. }));
    }

    #[test]
    fn non_numeric_ttl_is_rejected() {
        let err = load(&[(SECRET_KEY, "k"), (ACCESS_TTL_MINUTES, "soon")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ACCESS_TTL_MINUTES, .. }));
    }

    #[test]
    fn out_of_range_ttls_are_invalid() {
        let max = i64::MAX.to_string();
        let err = load(&[(SECRET_KEY, "k"), (ACCESS_TTL_MINUTES, max.as_str())]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ACCESS_TTL_MINUTES, .. }));

        let err = load(&[(SECRET_KEY, "k"), (REFRESH_TTL_DAYS, max.as_str())]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: REFRESH_TTL_DAYS, .. }));

        let err = load(&[(SECRET_KEY, "k"), (REFRESH_TTL_DAYS, "1000000000")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: REFRESH_TTL_DAYS, .. }));

        let err = load(&[(SECRET_KEY, "k"), (ACCESS_TTL_MINUTES, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: ACCESS_TTL_MINUTES, .. }));
    }
}
