use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::platform::RetryPolicy;

pub const DEFAULT_SETTINGS_FILE: &str = "htan2.toml";
pub const ORGANIZATION_ENV: &str = "ORGANIZATION_NAME";

/// Fixed team identifiers for the three non-project principal classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamIds {
    pub admins: u64,
    pub operations: u64,
    pub oversight: u64,
}

impl Default for TeamIds {
    fn default() -> Self {
        Self {
            admins: 3_497_313,
            operations: 3_391_844,
            oversight: 464_532,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub initial_backoff_secs: u64,
    pub max_backoff_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 6,
            initial_backoff_secs: 1,
            max_backoff_secs: 16,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the repository REST API.
    pub endpoint: String,
    /// Organization that owns registered schemas.
    pub organization: String,
    pub teams: TeamIds,
    pub http_timeout_secs: u64,
    pub retry: RetrySettings,
    /// Wall-clock limit for one binder subprocess in a batch run.
    pub bind_timeout_secs: u64,
    /// Wall-clock limit for one binder subprocess in a retry pass.
    pub retry_timeout_secs: u64,
    pub schemas_dir: PathBuf,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            endpoint: "https://repo-prod.prod.sagebase.org/repo/v1".to_string(),
            organization: "HTAN2Organization".to_string(),
            teams: TeamIds::default(),
            http_timeout_secs: 60,
            retry: RetrySettings::default(),
            bind_timeout_secs: 300,
            retry_timeout_secs: 1800,
            schemas_dir: PathBuf::from("schemas"),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, or from `htan2.toml` in the working
    /// directory when no path is given and that file exists. An explicit path
    /// that does not exist is a configuration error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut settings = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_SETTINGS_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_SETTINGS_FILE))?
            }
            None => Self::default(),
        };
        if let Ok(org) = env::var(ORGANIZATION_ENV) {
            if !org.trim().is_empty() {
                settings.organization = org;
            }
        }
        Ok(settings)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read settings file {}: {e}", path.display()))
        })?;
        debug!("loaded settings from {}", path.display());
        Self::parse(&content)
            .map_err(|e| Error::Config(format!("invalid settings file {}: {e}", path.display())))
    }

    pub fn parse(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts.max(1),
            initial_backoff: Duration::from_secs(self.retry.initial_backoff_secs),
            max_backoff: Duration::from_secs(self.retry.max_backoff_secs),
        }
    }

    #[must_use]
    pub fn bind_timeout(&self) -> Duration {
        Duration::from_secs(self.bind_timeout_secs)
    }

    #[must_use]
    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.retry_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.organization, "HTAN2Organization");
        assert_eq!(settings.teams.admins, 3_497_313);
        assert_eq!(settings.retry_policy(), RetryPolicy::default());
        assert_eq!(settings.bind_timeout(), Duration::from_secs(300));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::parse(
            r#"
            organization = "TestOrg"
            bind_timeout_secs = 10

            [teams]
            operations = 42
            "#,
        )
        .unwrap();
        assert_eq!(settings.organization, "TestOrg");
        assert_eq!(settings.bind_timeout_secs, 10);
        assert_eq!(settings.teams.operations, 42);
        assert_eq!(settings.teams.admins, 3_497_313);
        assert_eq!(settings.retry_timeout_secs, 1800);
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let err = Settings::load(Some(Path::new("/nonexistent/htan2.toml"))).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
