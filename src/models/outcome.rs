//! Matcher results.

use serde::{Deserialize, Serialize};

use super::Episode;

/// One scored candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub episode: Episode,

    /// Similarity in [0, 1]; 1.0 is a perfect match
    pub confidence: f64,
}

/// Classification of a matcher run. Exactly one variant holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "matches", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// The top result cleared the auto-play threshold
    AutoPlay(MatchResult),

    /// Ranked shortlist, best first, for the user to pick from
    Disambiguate(Vec<MatchResult>),

    /// Nothing cleared the relevance floor
    NoMatch,
}

impl MatchOutcome {
    /// Episode to play without asking, if any.
    pub fn auto_play(&self) -> Option<&Episode> {
        match self {
            MatchOutcome::AutoPlay(result) => Some(&result.episode),
            _ => None,
        }
    }

    /// Candidates to show the user; empty unless disambiguating.
    pub fn shortlist(&self) -> &[MatchResult] {
        match self {
            MatchOutcome::Disambiguate(results) => results,
            _ => &[],
        }
    }

    pub fn is_no_match(&self) -> bool {
        matches!(self, MatchOutcome::NoMatch)
    }
}

impl std::fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchOutcome::AutoPlay(result) => write!(
                f,
                "auto-play \"{}\" ({:.0}%)",
                result.episode.name,
                result.confidence * 100.0
            ),
            MatchOutcome::Disambiguate(results) => {
                write!(f, "{} candidates need a choice", results.len())
            }
            MatchOutcome::NoMatch => write!(f, "no match"),
        }
    }
}
