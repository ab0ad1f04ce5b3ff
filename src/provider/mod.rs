//! Streaming provider API.
//!
//! The resolver only depends on [`ProviderApi`]. [`SpotifyClient`] talks to
//! the real Web API; tests use the in-memory `MockProvider`.

mod spotify;

pub use spotify::SpotifyClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::AuthError;
use crate::models::{Episode, PlaybackState, Show};

/// Errors returned by the provider API.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Could not obtain access token: {0}")]
    Auth(#[from] AuthError),

    #[error("Provider rejected the access token")]
    Unauthorized,

    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response body: {0}")]
    Json(#[from] serde_json::Error),
}

/// Provider endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Base URL of the Web API
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Shows returned per search
    #[serde(default = "default_search_limit")]
    pub search_limit: u32,

    /// Episodes fetched per show
    #[serde(default = "default_episode_limit")]
    pub episode_limit: u32,
}

fn default_api_base_url() -> String {
    "https://api.spotify.com/v1".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_search_limit() -> u32 {
    10
}

fn default_episode_limit() -> u32 {
    50
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            timeout_seconds: default_timeout(),
            search_limit: default_search_limit(),
            episode_limit: default_episode_limit(),
        }
    }
}

/// Capabilities the resolver needs from the streaming provider.
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &'static str;

    /// Search podcast shows by free text, best first.
    async fn search_shows(&self, query: &str) -> Result<Vec<Show>, ProviderError>;

    /// Episodes of a show, newest first.
    async fn show_episodes(&self, show_id: &str) -> Result<Vec<Episode>, ProviderError>;

    /// Load `uri` on `device_id` and start playing at `position_ms`.
    async fn start_playback(
        &self,
        device_id: &str,
        uri: &str,
        position_ms: u64,
    ) -> Result<(), ProviderError>;

    /// Seek the active player to an absolute offset.
    async fn seek(&self, position_ms: u64) -> Result<(), ProviderError>;

    /// Current player state, `None` when nothing is active.
    async fn playback_state(&self) -> Result<Option<PlaybackState>, ProviderError>;

    /// Move playback to another device.
    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<(), ProviderError>;
}

/// Playback call recorded by `MockProvider`.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackCall {
    Start {
        device_id: String,
        uri: String,
        position_ms: u64,
    },
    Seek(u64),
    Transfer {
        device_id: String,
        play: bool,
    },
}

/// In-memory provider for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MockProvider {
    pub shows: Vec<Show>,
    pub episodes: std::collections::HashMap<String, Vec<Episode>>,
    pub state: Option<PlaybackState>,
    pub calls: std::sync::Mutex<Vec<PlaybackCall>>,
    pub searches: std::sync::Mutex<Vec<String>>,
}

#[cfg(test)]
impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_show(mut self, show: Show, episodes: Vec<Episode>) -> Self {
        self.episodes.insert(show.id.clone(), episodes);
        self.shows.push(show);
        self
    }

    pub fn calls(&self) -> Vec<PlaybackCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn searches(&self) -> Vec<String> {
        self.searches.lock().unwrap().clone()
    }
}

#[cfg(test)]
#[async_trait]
impl ProviderApi for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn search_shows(&self, query: &str) -> Result<Vec<Show>, ProviderError> {
        self.searches.lock().unwrap().push(query.to_string());
        Ok(self.shows.clone())
    }

    async fn show_episodes(&self, show_id: &str) -> Result<Vec<Episode>, ProviderError> {
        self.episodes
            .get(show_id)
            .cloned()
            .ok_or_else(|| ProviderError::Status {
                status: 404,
                body: format!("unknown show {}", show_id),
            })
    }

    async fn start_playback(
        &self,
        device_id: &str,
        uri: &str,
        position_ms: u64,
    ) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(PlaybackCall::Start {
            device_id: device_id.to_string(),
            uri: uri.to_string(),
            position_ms,
        });
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<(), ProviderError> {
        self.calls
            .lock()
            .unwrap()
            .push(PlaybackCall::Seek(position_ms));
        Ok(())
    }

    async fn playback_state(&self) -> Result<Option<PlaybackState>, ProviderError> {
        Ok(self.state.clone())
    }

    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<(), ProviderError> {
        self.calls.lock().unwrap().push(PlaybackCall::Transfer {
            device_id: device_id.to_string(),
            play,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_default() {
        let config = ProviderConfig::default();
        assert_eq!(config.api_base_url, "https://api.spotify.com/v1");
        assert_eq!(config.search_limit, 10);
        assert_eq!(config.episode_limit, 50);
    }

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::Status {
            status: 404,
            body: "missing".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: missing");

        let err = ProviderError::RateLimited {
            retry_after_secs: 7,
        };
        assert_eq!(err.to_string(), "Rate limited, retry after 7s");
    }

    #[tokio::test]
    async fn test_mock_provider_records_calls() {
        let provider = MockProvider::new();
        provider.start_playback("dev", "uri", 0).await.unwrap();
        provider.seek(5000).await.unwrap();
        provider.transfer_playback("dev2", true).await.unwrap();

        assert_eq!(
            provider.calls(),
            vec![
                PlaybackCall::Start {
                    device_id: "dev".to_string(),
                    uri: "uri".to_string(),
                    position_ms: 0,
                },
                PlaybackCall::Seek(5000),
                PlaybackCall::Transfer {
                    device_id: "dev2".to_string(),
                    play: true,
                },
            ]
        );
        assert!(provider.playback_state().await.unwrap().is_none());
    }
}
