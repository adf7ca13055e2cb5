//! Runtime configuration loaded from environment variables.
//!
//! A `.env` file in the working directory is honoured for local runs.

use std::env;
use std::time::Duration;

use crate::sync::RetryPolicy;

#[derive(Debug, Clone)]
pub struct Config {
    /// Postgres mirror of the feeding history; only database commands need it.
    pub database_url: Option<String>,
    pub publish_attempts: u32,
    pub publish_backoff: Duration,
    pub watch_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: None,
            publish_attempts: 3,
            publish_backoff: Duration::from_millis(250),
            watch_interval: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok().filter(|v| !v.trim().is_empty()),
            publish_attempts: parse_var("FEEDER_PUBLISH_ATTEMPTS")?
                .unwrap_or(defaults.publish_attempts)
                .max(1),
            publish_backoff: parse_var("FEEDER_PUBLISH_BACKOFF_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.publish_backoff),
            watch_interval: parse_var("FEEDER_WATCH_INTERVAL_SECS")?
                .map(Duration::from_secs)
                .unwrap_or(defaults.watch_interval),
        })
    }

    pub fn database_url(&self) -> Result<&str, ConfigError> {
        self.database_url
            .as_deref()
            .ok_or(ConfigError::Missing("DATABASE_URL"))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.publish_attempts,
            initial_backoff: self.publish_backoff,
        }
    }
}

/// `LOG_FORMAT=json` switches logs to JSON. Never fails, so logging can be
/// set up before the rest of the configuration is validated.
pub fn log_json_from_env() -> bool {
    env::var("LOG_FORMAT")
        .map(|v| v.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => Ok(Some(value)),
            Err(_) => Err(ConfigError::Invalid { name, value: raw }),
        },
        Err(_) => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for environment variable {name}")]
    Invalid { name: &'static str, value: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_tries_three_times() {
        let policy = Config::default().retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.initial_backoff, Duration::from_millis(250));
    }

    #[test]
    fn database_url_is_required_on_demand() {
        let config = Config::default();
        assert!(matches!(
            config.database_url(),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));

        let config = Config {
            database_url: Some("postgres://localhost/feeder".to_string()),
            ..Config::default()
        };
        assert_eq!(config.database_url().unwrap(), "postgres://localhost/feeder");
    }
}
