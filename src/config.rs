//! Settings read from the environment (and `.env`, when present).
//!
//! Required: `DATABASE_URL`, `SESSION_SECRET` (at least 64 bytes),
//! `RESEND_API_KEY`.
//!
//! Optional: `BIND_ADDR` (0.0.0.0:8080), `DATABASE_MAX_CONNECTIONS` (16),
//! `COOKIE_SECURE` (false), `SESSION_IDLE_MINUTES` (10080),
//! `EMAIL_FROM`, `CODE_TTL_SECONDS` (300), `NOTIFY_TIMEOUT_SECONDS` (15).

use std::{net::SocketAddr, str::FromStr, time::Duration};

use thiserror::Error;
use tower_sessions::cookie::Key;

use crate::auth::AuthSettings;

const DEFAULT_EMAIL_FROM: &str = "Bridgegram <onboarding@resend.dev>";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[derive(Clone)]
pub struct SessionSettings {
    /// Signs the session cookie.
    pub key: Key,
    pub secure: bool,
    pub idle: time::Duration,
}

#[derive(Clone)]
pub struct Config {
    pub database_url: String,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    pub session: SessionSettings,
    pub auth: AuthSettings,
    pub resend_api_key: String,
    pub email_from: String,
}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        Config::from_lookup(|name| dotenv::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let required = |name: &'static str| lookup(name).filter(|v| !v.is_empty()).ok_or(ConfigError::Missing(name));

        let secret = required("SESSION_SECRET")?;
        let key = Key::try_from(secret.as_bytes())
            .map_err(|_| ConfigError::Invalid("SESSION_SECRET", "must be at least 64 bytes".to_owned()))?;

        Ok(Config {
            database_url: required("DATABASE_URL")?,
            max_connections: parse_or(&lookup, "DATABASE_MAX_CONNECTIONS", 16)?,
            bind_addr: parse_or(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            session: SessionSettings {
                key,
                secure: parse_or(&lookup, "COOKIE_SECURE", false)?,
                idle: time::Duration::minutes(parse_or(&lookup, "SESSION_IDLE_MINUTES", 7 * 24 * 60)?),
            },
            auth: AuthSettings {
                code_ttl: Duration::from_secs(parse_or(&lookup, "CODE_TTL_SECONDS", 300)?),
                notify_timeout: Duration::from_secs(parse_or(&lookup, "NOTIFY_TIMEOUT_SECONDS", 15)?),
            },
            resend_api_key: required("RESEND_API_KEY")?,
            email_from: lookup("EMAIL_FROM").unwrap_or(DEFAULT_EMAIL_FROM.to_owned()),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        Some(raw) => raw.parse().map_err(|err: T::Err| ConfigError::Invalid(name, err.to_string())),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |name| vars.get(name).cloned()
    }

    fn base() -> Vec<(&'static str, String)> {
        vec![
            ("DATABASE_URL", "sqlite://bridgegram.db".to_owned()),
            ("SESSION_SECRET", "k".repeat(64)),
            ("RESEND_API_KEY", "re_test".to_owned()),
        ]
    }

    #[test]
    fn defaults_apply() {
        let vars = base();
        let vars: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        let config = Config::from_lookup(lookup(&vars)).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.auth.code_ttl, Duration::from_secs(300));
        assert_eq!(config.auth.notify_timeout, Duration::from_secs(15));
        assert_eq!(config.email_from, DEFAULT_EMAIL_FROM);
        assert!(!config.session.secure);
    }

    #[test]
    fn missing_and_invalid_values() {
        let err = Config::from_lookup(lookup(&[("DATABASE_URL", "sqlite::memory:")])).err().unwrap();
        assert!(matches!(err, ConfigError::Missing("SESSION_SECRET")));

        let short = [("DATABASE_URL", "x"), ("SESSION_SECRET", "short"), ("RESEND_API_KEY", "k")];
        let err = Config::from_lookup(lookup(&short)).err().unwrap();
        assert!(matches!(err, ConfigError::Invalid("SESSION_SECRET", _)));

        let vars = base();
        let mut vars: Vec<(&str, &str)> = vars.iter().map(|(k, v)| (*k, v.as_str())).collect();
        vars.push(("CODE_TTL_SECONDS", "soon"));
        let err = Config::from_lookup(lookup(&vars)).err().unwrap();
        assert!(matches!(err, ConfigError::Invalid("CODE_TTL_SECONDS", _)));
    }
}
