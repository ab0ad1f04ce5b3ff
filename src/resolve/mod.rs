//! Resolve-and-cue flow.
//!
//! Turns "show name + episode hint" and a timestamp into playback:
//! 1. Parse the timestamp
//! 2. Search shows using the part of the query before the episode hint
//! 3. List the first show's episodes
//! 4. Match the full query against them
//! 5. On a confident match, start playback and seek to the offset

use std::sync::{Arc, LazyLock};
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::matcher::{EpisodeMatcher, MatchError};
use crate::models::{Episode, MatchOutcome, Show};
use crate::provider::{ProviderApi, ProviderError};
use crate::timestamp::{self, Timestamp, TimestampError};

static EPISODE_HINT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:episode|ep)\b|#|\b\d{1,2}/\d{1,2}").unwrap());

/// Errors from the resolve-and-cue flow.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("{0}")]
    Timestamp(#[from] TimestampError),

    #[error("No podcast shows found for \"{0}\"")]
    NoShows(String),

    #[error("No episodes found for \"{0}\"")]
    NoEpisodes(String),

    #[error("Match error: {0}")]
    Match(#[from] MatchError),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),
}

/// Playback timing configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Pause between starting playback and seeking
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

fn default_settle_delay_ms() -> u64 {
    2000
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// Show picked for a query and the matcher's verdict on its episodes.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub show: Show,
    pub outcome: MatchOutcome,
}

/// Result of [`Resolver::play`].
#[derive(Debug, Clone, Serialize)]
pub struct PlayReport {
    pub resolution: Resolution,
    pub timestamp: Timestamp,
    /// Episode that was cued, if the match was confident
    pub cued: Option<Episode>,
}

/// Extract the show-name part of a query.
///
/// Cuts at the first `episode`, `ep`, `#` or `D/D` date. Falls back to the
/// whole query when nothing precedes the marker.
pub fn extract_show_hint(query: &str) -> &str {
    let query = query.trim();
    let head = match EPISODE_HINT_RE.find(query) {
        Some(m) => query[..m.start()].trim(),
        None => query,
    };

    if head.is_empty() {
        query
    } else {
        head
    }
}

/// Drives the provider, matcher and codec for one query.
pub struct Resolver {
    provider: Arc<dyn ProviderApi>,
    matcher: EpisodeMatcher,
    settle_delay: Duration,
}

impl Resolver {
    pub fn new(provider: Arc<dyn ProviderApi>, matcher: EpisodeMatcher) -> Self {
        Self {
            provider,
            matcher,
            settle_delay: Duration::from_millis(default_settle_delay_ms()),
        }
    }

    pub fn with_playback_config(mut self, config: &PlaybackConfig) -> Self {
        self.settle_delay = Duration::from_millis(config.settle_delay_ms);
        self
    }

    /// Find the show and classify its episodes against `query`.
    pub async fn resolve(&self, query: &str) -> Result<Resolution, ResolveError> {
        let hint = extract_show_hint(query);
        info!("Resolving {:?} (show hint {:?}) via {}", query, hint, self.provider.name());

        let show = self
            .provider
            .search_shows(hint)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| ResolveError::NoShows(hint.to_string()))?;

        let episodes = self.provider.show_episodes(&show.id).await?;
        if episodes.is_empty() {
            return Err(ResolveError::NoEpisodes(show.name));
        }

        let outcome = self.matcher.match_episodes(&episodes, query)?;
        info!("Show \"{}\": {}", show.name, outcome);

        Ok(Resolution { show, outcome })
    }

    /// Start `episode` on `device_id`, wait for the player to settle, then
    /// seek to `position_ms`.
    pub async fn cue(
        &self,
        device_id: &str,
        episode: &Episode,
        position_ms: u64,
    ) -> Result<(), ResolveError> {
        self.provider
            .start_playback(device_id, &episode.uri, 0)
            .await?;

        if !self.settle_delay.is_zero() {
            tokio::time::sleep(self.settle_delay).await;
        }

        self.provider.seek(position_ms).await?;
        info!(
            "Cued \"{}\" at {}",
            episode.name,
            timestamp::format(position_ms)
        );
        Ok(())
    }

    /// Parse the timestamp, resolve the query, and cue a confident match.
    ///
    /// The timestamp is validated before any provider call. Shortlists and
    /// misses are returned uncued for the caller to present.
    pub async fn play(
        &self,
        device_id: &str,
        query: &str,
        timestamp_text: &str,
    ) -> Result<PlayReport, ResolveError> {
        let timestamp = timestamp::parse(timestamp_text)?;
        let resolution = self.resolve(query).await?;

        let cued = match resolution.outcome.auto_play() {
            Some(episode) => {
                if episode.duration_ms > 0 && timestamp.milliseconds >= episode.duration_ms {
                    warn!(
                        "Timestamp {} is past the end of \"{}\" ({})",
                        timestamp,
                        episode.name,
                        timestamp::format(episode.duration_ms)
                    );
                }
                self.cue(device_id, episode, timestamp.milliseconds).await?;
                Some(episode.clone())
            }
            None => None,
        };

        Ok(PlayReport {
            resolution,
            timestamp,
            cued,
        })
    }
}
