//! Startup configuration, read once from a JSON file.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::types::SearchConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config.json";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// How the Nettikone API is authenticated, if at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NettikoneAuth {
    ApiKey(String),
    Credentials { username: String, password: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub bot_token: String,
    #[serde(deserialize_with = "snowflake")]
    pub channel_id: u64,
    pub makes: Vec<String>,
    #[serde(default)]
    pub models: Vec<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub netti_login: Option<String>,
    #[serde(default)]
    pub netti_pass: Option<String>,
    #[serde(default = "default_delay")]
    pub delay: u64,
    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_nettix_rows")]
    pub nettix_rows: u32,
    #[serde(default = "default_makes_table")]
    pub makes_table: String,
}

fn default_delay() -> u64 {
    10
}

fn default_database() -> String {
    "listings.db".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_nettix_rows() -> u32 {
    crate::nettikone::scraper::DEFAULT_ROWS
}

fn default_makes_table() -> String {
    "nettimakes.json".to_string()
}

/// Discord IDs show up both as JSON numbers and as strings.
fn snowflake<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.bot_token.trim().is_empty() {
            return Err(ConfigError::Invalid("bot_token must not be empty".to_string()));
        }
        if self.channel_id == 0 {
            return Err(ConfigError::Invalid("channel_id must not be 0".to_string()));
        }
        if self.delay == 0 {
            return Err(ConfigError::Invalid("delay must be greater than 0".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if !(1..=100).contains(&self.nettix_rows) {
            return Err(ConfigError::Invalid(format!(
                "nettix_rows must be between 1 and 100, got {}",
                self.nettix_rows
            )));
        }
        Ok(self)
    }

    pub fn search(&self) -> SearchConfig {
        SearchConfig::new(
            self.makes
                .iter()
                .map(|m| m.trim())
                .filter(|m| !m.is_empty()),
        )
        .with_models(
            self.models
                .iter()
                .map(|m| m.trim())
                .filter(|m| !m.is_empty()),
        )
    }

    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// An explicit `api_key` wins over login credentials.
    pub fn nettikone_auth(&self) -> Option<NettikoneAuth> {
        let non_empty = |v: &Option<String>| v.as_ref().filter(|s| !s.trim().is_empty()).cloned();

        if let Some(key) = non_empty(&self.api_key) {
            return Some(NettikoneAuth::ApiKey(key));
        }
        match (non_empty(&self.netti_login), non_empty(&self.netti_pass)) {
            (Some(username), Some(password)) => {
                Some(NettikoneAuth::Credentials { username, password })
            }
            _ => None,
        }
    }
}
