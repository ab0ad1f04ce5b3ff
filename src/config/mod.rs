//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::auth::AuthConfig;
use crate::matcher::MatcherConfig;
use crate::provider::ProviderConfig;
use crate::resolve::PlaybackConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub auth: AuthConfig,

    #[serde(default)]
    pub matcher: MatcherConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            provider: ProviderConfig::default(),
            auth: AuthConfig::default(),
            matcher: MatcherConfig::default(),
            playback: PlaybackConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            info!("No config file at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Provider timeout must be greater than 0".to_string(),
            ));
        }

        if self.auth.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Auth timeout must be greater than 0".to_string(),
            ));
        }

        if self.provider.search_limit == 0 || self.provider.episode_limit == 0 {
            return Err(ConfigError::ValidationError(
                "Provider limits must be greater than 0".to_string(),
            ));
        }

        let matcher = &self.matcher;
        for (name, value) in [
            ("relevance_floor", matcher.relevance_floor),
            ("auto_play_threshold", matcher.auto_play_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "matcher.{} must be between 0 and 1, got {}",
                    name, value
                )));
            }
        }

        if matcher.max_candidates == 0 {
            return Err(ConfigError::ValidationError(
                "matcher.max_candidates must be greater than 0".to_string(),
            ));
        }

        for weight in [matcher.name_weight, matcher.description_weight] {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(ConfigError::ValidationError(format!(
                    "Matcher field weights must be positive and finite, got {}",
                    weight
                )));
            }
        }

        Ok(())
    }
}
