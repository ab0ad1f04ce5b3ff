//! # Podcue
//!
//! Find a podcast episode from a loose description and start it at a
//! given offset.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (episodes, shows, match outcomes, player state)
//! - **matcher**: Fuzzy episode ranking and auto-play / shortlist / no-match classification
//! - **timestamp**: `H:MM:SS` parsing and formatting
//! - **provider**: Streaming provider API and the Spotify client
//! - **auth**: Bearer token sources
//! - **resolve**: Show search, matching and cueing glued together
//! - **config**: Configuration loading and validation

pub mod auth;
pub mod config;
pub mod matcher;
pub mod models;
pub mod provider;
pub mod resolve;
pub mod timestamp;

pub use matcher::{match_episodes, EpisodeMatcher, MatchError, MatcherConfig};
pub use models::*;
pub use timestamp::{format, parse, Timestamp, TimestampError};
