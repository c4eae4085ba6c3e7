//! Runtime configuration read from the environment.
//!
//! `.env` in the working directory is loaded first (if present) so local runs
//! do not need exported variables.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::db;
use crate::error::{Error, Result};

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_METHODS_COMPONENT: &str = "Methods";
pub const DEFAULT_POLL_SECS: u64 = 30;
pub const DEFAULT_WEBHOOK_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_MAX_SUBSCRIPTIONS: u64 = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind: SocketAddr,
    pub db_path: PathBuf,
    /// `None` disables every operator route.
    pub operator_token: Option<String>,
    pub methods_component: String,
    pub poll_interval: Duration,
    pub seed: bool,
    pub webhook_timeout: Duration,
    /// Cap on stored subscriptions for public sign-ups.
    pub max_subscriptions: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup; empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let bind = get("STATUSPAGE_BIND")
            .unwrap_or_else(|| DEFAULT_BIND.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| Error::Config(format!("STATUSPAGE_BIND: {e}")))?;

        let db_path = match get("STATUSPAGE_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => db::default_db_path()?,
        };

        Ok(Self {
            bind,
            db_path,
            operator_token: get("STATUSPAGE_OPERATOR_TOKEN"),
            methods_component: get("STATUSPAGE_METHODS_COMPONENT")
                .unwrap_or_else(|| DEFAULT_METHODS_COMPONENT.to_string()),
            poll_interval: Duration::from_secs(parse_positive(
                "STATUSPAGE_POLL_SECS",
                get("STATUSPAGE_POLL_SECS"),
                DEFAULT_POLL_SECS,
            )?),
            seed: parse_bool("STATUSPAGE_SEED", get("STATUSPAGE_SEED"), true)?,
            webhook_timeout: Duration::from_secs(parse_positive(
                "STATUSPAGE_WEBHOOK_TIMEOUT_SECS",
                get("STATUSPAGE_WEBHOOK_TIMEOUT_SECS"),
                DEFAULT_WEBHOOK_TIMEOUT_SECS,
            )?),
            max_subscriptions: parse_positive(
                "STATUSPAGE_MAX_SUBSCRIPTIONS",
                get("STATUSPAGE_MAX_SUBSCRIPTIONS"),
                DEFAULT_MAX_SUBSCRIPTIONS,
            )?,
        })
    }
}

fn parse_positive(key: &str, raw: Option<String>, default: u64) -> Result<u64> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.parse::<u64>() {
        Ok(0) => Err(Error::Config(format!("{key} must be greater than zero"))),
        Ok(secs) => Ok(secs),
        Err(e) => Err(Error::Config(format!("{key}: {e}"))),
    }
}

fn parse_bool(key: &str, raw: Option<String>, default: bool) -> Result<bool> {
    let Some(raw) = raw else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(Error::Config(format!("{key}: expected a boolean, got {other:?}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = config_from(&[("STATUSPAGE_DB_PATH", "/tmp/status.sqlite")]).unwrap();
        assert_eq!(config.bind, DEFAULT_BIND.parse().unwrap());
        assert_eq!(config.db_path, PathBuf::from("/tmp/status.sqlite"));
        assert!(config.operator_token.is_none());
        assert_eq!(config.methods_component, "Methods");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
        assert!(config.seed);
        assert_eq!(config.webhook_timeout, Duration::from_secs(10));
        assert_eq!(config.max_subscriptions, DEFAULT_MAX_SUBSCRIPTIONS);
    }

    #[test]
    fn values_are_read_and_trimmed() {
        let config = config_from(&[
            ("STATUSPAGE_BIND", "0.0.0.0:9000"),
            ("STATUSPAGE_DB_PATH", "/tmp/x.sqlite"),
            ("STATUSPAGE_OPERATOR_TOKEN", "  s3cret "),
            ("STATUSPAGE_METHODS_COMPONENT", "Payments"),
            ("STATUSPAGE_POLL_SECS", "60"),
            ("STATUSPAGE_SEED", "off"),
            ("STATUSPAGE_MAX_SUBSCRIPTIONS", "50"),
        ])
        .unwrap();
        assert_eq!(config.max_subscriptions, 50);
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.operator_token.as_deref(), Some("s3cret"));
        assert_eq!(config.methods_component, "Payments");
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert!(!config.seed);
    }

    #[test]
    fn blank_token_counts_as_unset() {
        let config = config_from(&[
            ("STATUSPAGE_DB_PATH", "/tmp/x.sqlite"),
            ("STATUSPAGE_OPERATOR_TOKEN", "   "),
        ])
        .unwrap();
        assert!(config.operator_token.is_none());
    }

    #[test]
    fn invalid_values_are_config_errors() {
        for pairs in [
            [("STATUSPAGE_BIND", "not-an-addr")],
            [("STATUSPAGE_POLL_SECS", "0")],
            [("STATUSPAGE_POLL_SECS", "soon")],
            [("STATUSPAGE_SEED", "maybe")],
            [("STATUSPAGE_MAX_SUBSCRIPTIONS", "0")],
        ] {
            let mut all = vec![("STATUSPAGE_DB_PATH", "/tmp/x.sqlite")];
            all.extend_from_slice(&pairs);
            assert!(matches!(config_from(&all), Err(Error::Config(_))), "{pairs:?}");
        }
    }
}
