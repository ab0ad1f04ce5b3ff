//! Podcast episode and show models as reported by the provider.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Episode record that cannot be used for matching or playback.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EpisodeError {
    #[error("Episode is missing an id")]
    MissingId,

    #[error("Episode {0} is missing a name")]
    MissingName(String),

    #[error("Episode {0} is missing a playable uri")]
    MissingUri(String),
}

/// Cover art reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub url: String,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub width: Option<u32>,
}

/// One playable episode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Opaque identifier, unique within a show
    pub id: String,

    /// Display name
    pub name: String,

    /// Free-text description
    pub description: String,

    /// Length in milliseconds
    pub duration_ms: u64,

    /// Release date (coarser precisions resolve to the first day)
    #[serde(deserialize_with = "deserialize_release_date")]
    pub release_date: NaiveDate,

    /// Playable reference handed to the player
    pub uri: String,

    #[serde(default)]
    pub images: Vec<Image>,
}

impl Episode {
    /// Check the fields the matcher and player rely on.
    pub fn validate(&self) -> Result<(), EpisodeError> {
        if self.id.trim().is_empty() {
            return Err(EpisodeError::MissingId);
        }
        if self.name.trim().is_empty() {
            return Err(EpisodeError::MissingName(self.id.clone()));
        }
        if self.uri.trim().is_empty() {
            return Err(EpisodeError::MissingUri(self.id.clone()));
        }
        Ok(())
    }
}

/// A podcast show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Show {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub publisher: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub images: Vec<Image>,
}

/// Parse a provider release date.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM` and `YYYY`. Month and year precision
/// resolve to the first day of the period.
pub fn parse_release_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(date);
    }

    let mut parts = s.splitn(2, '-');
    let year: i32 = parts.next()?.parse().ok()?;
    let month: u32 = match parts.next() {
        Some(m) => m.parse().ok()?,
        None => 1,
    };
    NaiveDate::from_ymd_opt(year, month, 1)
}

fn deserialize_release_date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_release_date(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("invalid release_date: {}", raw)))
}
