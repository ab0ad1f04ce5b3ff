//! Episode disambiguation.
//!
//! Scores every candidate episode against a free-text query and decides
//! whether to play the best one directly, ask the user to choose from a
//! shortlist, or report that nothing matched.

pub mod fuzzy;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::models::{Episode, EpisodeError, MatchOutcome, MatchResult};
use fuzzy::{EditDistanceScorer, FieldText, FuzzyScorer};

/// Errors raised before any scoring happens.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("Search query is empty")]
    EmptyQuery,

    #[error("Invalid episode: {0}")]
    InvalidEpisode(#[from] EpisodeError),
}

/// Scoring and classification parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatcherConfig {
    /// Engine distance above which a field match is discarded
    #[serde(default = "default_relevance_floor")]
    pub relevance_floor: f64,

    /// Confidence at which the top result plays without confirmation
    #[serde(default = "default_auto_play_threshold")]
    pub auto_play_threshold: f64,

    /// Maximum number of ranked results kept
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Characters of offset that add 1.0 to a match's distance
    #[serde(default = "default_location_distance")]
    pub location_distance: usize,

    /// Shortest run of matched characters that counts
    #[serde(default = "default_min_fragment_len")]
    pub min_fragment_len: usize,

    #[serde(default = "default_name_weight")]
    pub name_weight: f64,

    #[serde(default = "default_description_weight")]
    pub description_weight: f64,
}

fn default_relevance_floor() -> f64 {
    0.3
}

fn default_auto_play_threshold() -> f64 {
    0.7
}

fn default_max_candidates() -> usize {
    5
}

fn default_location_distance() -> usize {
    100
}

fn default_min_fragment_len() -> usize {
    3
}

fn default_name_weight() -> f64 {
    2.0
}

fn default_description_weight() -> f64 {
    1.0
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self {
            relevance_floor: default_relevance_floor(),
            auto_play_threshold: default_auto_play_threshold(),
            max_candidates: default_max_candidates(),
            location_distance: default_location_distance(),
            min_fragment_len: default_min_fragment_len(),
            name_weight: default_name_weight(),
            description_weight: default_description_weight(),
        }
    }
}

impl MatcherConfig {
    /// Build the default scoring engine for these parameters.
    pub fn scorer(&self) -> EditDistanceScorer {
        EditDistanceScorer::new(
            self.relevance_floor,
            self.location_distance,
            self.min_fragment_len,
        )
    }
}

/// Ranks episodes against a query and classifies the result.
#[derive(Debug, Clone)]
pub struct EpisodeMatcher<S = EditDistanceScorer> {
    config: MatcherConfig,
    scorer: S,
}

impl Default for EpisodeMatcher {
    fn default() -> Self {
        Self::new(MatcherConfig::default())
    }
}

impl EpisodeMatcher {
    pub fn new(config: MatcherConfig) -> Self {
        let scorer = config.scorer();
        Self { config, scorer }
    }
}

impl<S: FuzzyScorer> EpisodeMatcher<S> {
    /// Use a different scoring engine with the same classification rules.
    pub fn with_scorer(config: MatcherConfig, scorer: S) -> Self {
        Self { config, scorer }
    }

    pub fn config(&self) -> &MatcherConfig {
        &self.config
    }

    /// Score every episode, best first, at most `max_candidates` entries.
    ///
    /// Episodes that clear no field's relevance floor are left out. Equal
    /// confidences keep their input order.
    pub fn rank(&self, episodes: &[Episode], query: &str) -> Result<Vec<MatchResult>, MatchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MatchError::EmptyQuery);
        }
        for episode in episodes {
            episode.validate()?;
        }

        let mut results: Vec<MatchResult> = episodes
            .iter()
            .filter_map(|episode| {
                let fields = [
                    FieldText::new(&episode.name, self.config.name_weight),
                    FieldText::new(&episode.description, self.config.description_weight),
                ];
                let distance = self.scorer.score(&fields, query)?;
                Some(MatchResult {
                    episode: episode.clone(),
                    confidence: (1.0 - distance).clamp(0.0, 1.0),
                })
            })
            .collect();

        results.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        results.truncate(self.config.max_candidates);

        debug!(
            "Scored {} episodes for {:?}: {} above relevance floor",
            episodes.len(),
            query,
            results.len()
        );

        Ok(results)
    }

    /// Decide between auto-play, a shortlist and no match.
    pub fn match_episodes(
        &self,
        episodes: &[Episode],
        query: &str,
    ) -> Result<MatchOutcome, MatchError> {
        let mut ranked = self.rank(episodes, query)?;

        let outcome = match ranked.first() {
            None => MatchOutcome::NoMatch,
            Some(top) if top.confidence >= self.config.auto_play_threshold => {
                MatchOutcome::AutoPlay(ranked.swap_remove(0))
            }
            Some(_) => MatchOutcome::Disambiguate(ranked),
        };

        debug!("Match outcome: {}", outcome);
        Ok(outcome)
    }
}

/// Match with the default parameters.
pub fn match_episodes(episodes: &[Episode], query: &str) -> Result<MatchOutcome, MatchError> {
    EpisodeMatcher::default().match_episodes(episodes, query)
}
