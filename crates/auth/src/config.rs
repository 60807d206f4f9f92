//! Claim lifetime configuration.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use keystone_core::{PartyScope, UserId};

use crate::{Claims, HumanUser, RegistrationGrant, ResetPasswordGrant, SessionLogin};

pub const SESSION_LIFETIME_ENV: &str = "KEYSTONE_SESSION_LIFETIME_MINUTES";
pub const REGISTRATION_LIFETIME_ENV: &str = "KEYSTONE_REGISTRATION_LIFETIME_MINUTES";
pub const RESET_PASSWORD_LIFETIME_ENV: &str = "KEYSTONE_RESET_PASSWORD_LIFETIME_MINUTES";

/// Longest accepted lifetime: ten years, in minutes.
pub const MAX_LIFETIME_MINUTES: i64 = 10 * 365 * 24 * 60;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be between 1 and {MAX_LIFETIME_MINUTES} minutes, got '{value}'")]
    InvalidLifetime { key: &'static str, value: String },
}

/// How long each kind of claim stays valid after it is issued.
///
/// Every constructor, serde included, checks that each lifetime is positive
/// and at most [`MAX_LIFETIME_MINUTES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawAuthConfig", rename_all = "camelCase")]
pub struct AuthConfig {
    session_lifetime_minutes: i64,
    registration_lifetime_minutes: i64,
    reset_password_lifetime_minutes: i64,
}

#[derive(Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawAuthConfig {
    session_lifetime_minutes: i64,
    registration_lifetime_minutes: i64,
    reset_password_lifetime_minutes: i64,
}

impl Default for RawAuthConfig {
    fn default() -> Self {
        let defaults = AuthConfig::default();
        Self {
            session_lifetime_minutes: defaults.session_lifetime_minutes,
            registration_lifetime_minutes: defaults.registration_lifetime_minutes,
            reset_password_lifetime_minutes: defaults.reset_password_lifetime_minutes,
        }
    }
}

impl TryFrom<RawAuthConfig> for AuthConfig {
    type Error = ConfigError;

    fn try_from(raw: RawAuthConfig) -> Result<Self, Self::Error> {
        Ok(Self {
            session_lifetime_minutes: checked("sessionLifetimeMinutes", raw.session_lifetime_minutes)?,
            registration_lifetime_minutes: checked(
                "registrationLifetimeMinutes",
                raw.registration_lifetime_minutes,
            )?,
            reset_password_lifetime_minutes: checked(
                "resetPasswordLifetimeMinutes",
                raw.reset_password_lifetime_minutes,
            )?,
        })
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_lifetime_minutes: 90,
            registration_lifetime_minutes: 7 * 24 * 60,
            reset_password_lifetime_minutes: 90,
        }
    }
}

impl AuthConfig {
    pub fn new(
        session_lifetime_minutes: i64,
        registration_lifetime_minutes: i64,
        reset_password_lifetime_minutes: i64,
    ) -> Result<Self, ConfigError> {
        Self::try_from(RawAuthConfig {
            session_lifetime_minutes,
            registration_lifetime_minutes,
            reset_password_lifetime_minutes,
        })
    }

    /// Read lifetimes from the process environment; unset keys keep defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            session_lifetime_minutes: minutes(&lookup, SESSION_LIFETIME_ENV, defaults.session_lifetime_minutes)?,
            registration_lifetime_minutes: minutes(
                &lookup,
                REGISTRATION_LIFETIME_ENV,
                defaults.registration_lifetime_minutes,
            )?,
            reset_password_lifetime_minutes: minutes(
                &lookup,
                RESET_PASSWORD_LIFETIME_ENV,
                defaults.reset_password_lifetime_minutes,
            )?,
        })
    }

    pub fn session_lifetime(&self) -> Duration {
        Duration::minutes(self.session_lifetime_minutes)
    }

    pub fn registration_lifetime(&self) -> Duration {
        Duration::minutes(self.registration_lifetime_minutes)
    }

    pub fn reset_password_lifetime(&self) -> Duration {
        Duration::minutes(self.reset_password_lifetime_minutes)
    }

    /// Session claims for a human user who has just proven their credentials.
    pub fn human_login(&self, user_id: UserId, scope: PartyScope, now: DateTime<Utc>) -> Claims {
        Claims::HumanUserLogin(SessionLogin::issue(user_id, scope, now, self.session_lifetime()))
    }

    /// Session claims for an API user who has just proven their credentials.
    pub fn api_login(&self, user_id: UserId, scope: PartyScope, now: DateTime<Utc>) -> Claims {
        Claims::ApiUserLogin(SessionLogin::issue(user_id, scope, now, self.session_lifetime()))
    }

    pub fn registration(&self, user: HumanUser, now: DateTime<Utc>) -> RegistrationGrant {
        RegistrationGrant::issue(user, now, self.registration_lifetime())
    }

    pub fn reset_password(&self, user_id: UserId, scope: PartyScope, now: DateTime<Utc>) -> Claims {
        Claims::ResetPassword(ResetPasswordGrant::issue(
            user_id,
            scope,
            now,
            self.reset_password_lifetime(),
        ))
    }
}

fn minutes<F>(lookup: &F, key: &'static str, default: i64) -> Result<i64, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(default);
    };

    match raw.trim().parse::<i64>() {
        Ok(value) if in_range(value) => Ok(value),
        _ => Err(ConfigError::InvalidLifetime { key, value: raw }),
    }
}

fn checked(key: &'static str, value: i64) -> Result<i64, ConfigError> {
    if in_range(value) {
        Ok(value)
    } else {
        Err(ConfigError::InvalidLifetime {
            key,
            value: value.to_string(),
        })
    }
}

fn in_range(minutes: i64) -> bool {
    minutes > 0 && minutes <= MAX_LIFETIME_MINUTES
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use keystone_core::{PartyId, PartyType};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AuthConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AuthConfig::default());
        assert_eq!(config.session_lifetime(), Duration::minutes(90));
    }

    #[test]
    fn overrides_from_environment() {
        let config = AuthConfig::from_lookup(lookup(&[(SESSION_LIFETIME_ENV, "15")])).unwrap();
        assert_eq!(config.session_lifetime(), Duration::minutes(15));
        assert_eq!(config.reset_password_lifetime(), Duration::minutes(90));
    }

    #[test]
    fn rejects_bad_values() {
        for bad in ["0", "-5", "soon", "99999999999"] {
            let err = AuthConfig::from_lookup(lookup(&[(REGISTRATION_LIFETIME_ENV, bad)])).unwrap_err();
            assert_eq!(
                err,
                ConfigError::InvalidLifetime {
                    key: REGISTRATION_LIFETIME_ENV,
                    value: bad.to_string()
                }
            );
        }
    }

    #[test]
    fn partial_json_config_fills_defaults() {
        let config: AuthConfig = serde_json::from_str(r#"{"sessionLifetimeMinutes": 30}"#).unwrap();
        assert_eq!(config.session_lifetime(), Duration::minutes(30));
        assert_eq!(config.registration_lifetime(), Duration::days(7));
    }

    #[test]
    fn json_config_is_range_checked() {
        for bad in [
            r#"{"sessionLifetimeMinutes": -30}"#,
            r#"{"sessionLifetimeMinutes": 0}"#,
            r#"{"registrationLifetimeMinutes": 9223372036854775807}"#,
            r#"{"resetPasswordLifetimeMinutes": 5256001}"#,
        ] {
            let err = serde_json::from_str::<AuthConfig>(bad).unwrap_err();
            assert!(err.to_string().contains("LifetimeMinutes must be between"), "{bad}: {err}");
        }
    }

    #[test]
    fn serialized_config_loads_back() {
        let config = AuthConfig::new(15, 60, 30).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(serde_json::from_str::<AuthConfig>(&json).unwrap(), config);
    }

    #[test]
    fn explicit_lifetimes_are_range_checked() {
        assert_eq!(
            AuthConfig::new(90, -1, 90),
            Err(ConfigError::InvalidLifetime {
                key: "registrationLifetimeMinutes",
                value: "-1".to_string()
            })
        );
        assert!(AuthConfig::new(MAX_LIFETIME_MINUTES, 1, 1).is_ok());
    }

    #[test]
    fn login_claims_use_session_lifetime() {
        let now = Utc::now();
        let config = AuthConfig::default();
        let claims = config.human_login(
            UserId::new("U1"),
            PartyScope::new(PartyType::Company, PartyId::new("C1")),
            now,
        );

        assert_eq!(claims.expiration_time() - claims.issue_time(), 90 * 60);
    }
}
