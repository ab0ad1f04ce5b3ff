//! Spotify Web API client.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use super::{ProviderApi, ProviderConfig, ProviderError};
use crate::auth::TokenSource;
use crate::models::{Episode, PlaybackState, Show};

/// One page of a paged listing. Spotify may return `null` for items the
/// user's market cannot see.
#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    items: Vec<Option<T>>,
    #[serde(default)]
    next: Option<String>,
}

impl<T> Page<T> {
    fn into_items(self) -> Vec<T> {
        self.items.into_iter().flatten().collect()
    }
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    shows: Page<Show>,
}

#[derive(Debug, Serialize)]
struct PlayRequest<'a> {
    uris: [&'a str; 1],
    position_ms: u64,
}

#[derive(Debug, Serialize)]
struct TransferRequest<'a> {
    device_ids: [&'a str; 1],
    play: bool,
}

/// Client for the Spotify Web API.
pub struct SpotifyClient {
    client: Client,
    config: ProviderConfig,
    tokens: Arc<dyn TokenSource>,
}

impl SpotifyClient {
    pub fn new(config: ProviderConfig, tokens: Arc<dyn TokenSource>) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            config,
            tokens,
        })
    }

    fn endpoint(&self, segments: &[&str], params: &[(&str, String)]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.config.api_base_url)
            .map_err(|e| ProviderError::InvalidUrl(format!("{}: {}", self.config.api_base_url, e)))?;

        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidUrl(self.config.api_base_url.clone()))?
            .pop_if_empty()
            .extend(segments);

        if !params.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(params.iter().map(|(k, v)| (*k, v.as_str())));
        }

        Ok(url)
    }

    /// Attach the bearer token, send, and map error statuses.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ProviderError> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.invalidate().await;
            return Err(ProviderError::Unauthorized);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimited { retry_after_secs });
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ProviderError> {
        debug!("GET {}", url);
        let response = self.send(self.client.get(url)).await?;
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

#[async_trait]
impl ProviderApi for SpotifyClient {
    fn name(&self) -> &'static str {
        "spotify"
    }

    async fn search_shows(&self, query: &str) -> Result<Vec<Show>, ProviderError> {
        let url = self.endpoint(
            &["search"],
            &[
                ("q", query.to_string()),
                ("type", "show".to_string()),
                ("limit", self.config.search_limit.to_string()),
            ],
        )?;

        let response: SearchResponse = self.get_json(url).await?;
        let shows = response.shows.into_items();
        info!("Show search {:?} returned {} shows", query, shows.len());
        Ok(shows)
    }

    async fn show_episodes(&self, show_id: &str) -> Result<Vec<Episode>, ProviderError> {
        let url = self.endpoint(
            &["shows", show_id, "episodes"],
            &[("limit", self.config.episode_limit.to_string())],
        )?;

        let page: Page<Episode> = self.get_json(url).await?;
        if page.next.is_some() {
            debug!("Show {} has more episodes than the first page", show_id);
        }
        let episodes = page.into_items();
        info!("Fetched {} episodes for show {}", episodes.len(), show_id);
        Ok(episodes)
    }

    async fn start_playback(
        &self,
        device_id: &str,
        uri: &str,
        position_ms: u64,
    ) -> Result<(), ProviderError> {
        let url = self.endpoint(
            &["me", "player", "play"],
            &[("device_id", device_id.to_string())],
        )?;

        info!("Starting {} on device {} at {}ms", uri, device_id, position_ms);
        let body = PlayRequest {
            uris: [uri],
            position_ms,
        };
        self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }

    async fn seek(&self, position_ms: u64) -> Result<(), ProviderError> {
        let url = self.endpoint(
            &["me", "player", "seek"],
            &[("position_ms", position_ms.to_string())],
        )?;

        info!("Seeking to {}ms", position_ms);
        self.send(self.client.put(url).header(CONTENT_LENGTH, "0"))
            .await?;
        Ok(())
    }

    async fn playback_state(&self) -> Result<Option<PlaybackState>, ProviderError> {
        let url = self.endpoint(&["me", "player"], &[])?;

        let response = self.send(self.client.get(url)).await?;
        if response.status() == StatusCode::NO_CONTENT {
            return Ok(None);
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&body)?))
    }

    async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<(), ProviderError> {
        let url = self.endpoint(&["me", "player"], &[])?;

        info!("Transferring playback to device {}", device_id);
        let body = TransferRequest {
            device_ids: [device_id],
            play,
        };
        self.send(self.client.put(url).json(&body)).await?;
        Ok(())
    }
}
