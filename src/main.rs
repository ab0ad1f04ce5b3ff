use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use podcue::auth::{RefreshingToken, StaticToken, TokenSource};
use podcue::config::AppConfig;
use podcue::matcher::EpisodeMatcher;
use podcue::models::{Episode, MatchOutcome, MatchResult};
use podcue::provider::{ProviderApi, SpotifyClient};
use podcue::resolve::Resolver;
use podcue::timestamp;

#[derive(Parser)]
#[command(name = "podcue")]
#[command(about = "Find a podcast episode and start it at a timestamp")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./podcue.toml")]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); defaults to the config value
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a timestamp such as "1:02:03" into milliseconds
    Parse {
        text: String,
    },

    /// Format milliseconds as H:MM:SS
    Format {
        ms: u64,
    },

    /// Match a query against episodes stored in a JSON file
    Match {
        /// Array of episodes, or a provider page with an `items` array
        #[arg(long)]
        episodes: PathBuf,

        #[arg(long)]
        query: String,

        /// Print the outcome as JSON
        #[arg(long)]
        json: bool,
    },

    /// Search podcast shows
    Search {
        #[arg(long)]
        query: String,
    },

    /// Find an episode and start it at a timestamp
    Play {
        /// Show name plus episode hint, e.g. "The Daily Jan 15"
        #[arg(long)]
        query: String,

        /// Start offset, e.g. "12:30" or "1:02:03"
        #[arg(long)]
        at: String,

        /// Device to play on
        #[arg(long)]
        device: String,

        /// Choose an entry (1-based) when the match is ambiguous
        #[arg(long)]
        pick: Option<usize>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the current playback state
    State,

    /// Move playback to another device
    Transfer {
        #[arg(long)]
        device: String,

        /// Keep playing after the transfer
        #[arg(long)]
        play: bool,
    },
}

/// Episode file contents: a bare list or a provider page.
#[derive(Deserialize)]
#[serde(untagged)]
enum EpisodeFile {
    List(Vec<Episode>),
    Page { items: Vec<Option<Episode>> },
}

impl EpisodeFile {
    fn into_episodes(self) -> Vec<Episode> {
        match self {
            EpisodeFile::List(episodes) => episodes,
            EpisodeFile::Page { items } => items.into_iter().flatten().collect(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;

    // Initialize tracing
    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    tracing::debug!("Starting podcue v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Commands::Parse { text } => {
            let ts = timestamp::parse(&text)?;
            println!("{} ms ({})", ts.milliseconds, ts);
        }

        Commands::Format { ms } => {
            println!("{}", timestamp::format(ms));
        }

        Commands::Match {
            episodes,
            query,
            json,
        } => {
            let contents = std::fs::read_to_string(&episodes)
                .with_context(|| format!("Failed to read {}", episodes.display()))?;
            let file: EpisodeFile = serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse episodes in {}", episodes.display()))?;
            let episodes = file.into_episodes();

            let matcher = EpisodeMatcher::new(config.matcher.clone());
            let outcome = matcher.match_episodes(&episodes, &query)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                print_outcome(&outcome);
            }
        }

        Commands::Search { query } => {
            let provider = build_provider(&config)?;
            let shows = provider.search_shows(&query).await?;

            if shows.is_empty() {
                println!("No podcast shows found for \"{}\"", query);
            }
            for show in shows {
                println!("{}  {} ({})", show.id, show.name, show.publisher);
            }
        }

        Commands::Play {
            query,
            at,
            device,
            pick,
            json,
        } => {
            let provider = build_provider(&config)?;
            let resolver = Resolver::new(provider, EpisodeMatcher::new(config.matcher.clone()))
                .with_playback_config(&config.playback);

            let report = resolver.play(&device, &query, &at).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            }

            if let Some(episode) = &report.cued {
                if !json {
                    println!("Playing \"{}\" from {}", episode.name, report.timestamp);
                }
                return Ok(());
            }

            let shortlist = report.resolution.outcome.shortlist();
            match pick {
                Some(n) => {
                    let chosen = n
                        .checked_sub(1)
                        .and_then(|i| shortlist.get(i))
                        .with_context(|| {
                            format!("--pick {} is outside the {} candidates", n, shortlist.len())
                        })?;
                    resolver
                        .cue(&device, &chosen.episode, report.timestamp.milliseconds)
                        .await?;
                    println!("Playing \"{}\" from {}", chosen.episode.name, report.timestamp);
                }
                None if !json => {
                    println!("Show: {}", report.resolution.show.name);
                    print_outcome(&report.resolution.outcome);
                    if !shortlist.is_empty() {
                        println!("Re-run with --pick <N> to choose one.");
                    }
                }
                None => {}
            }
        }

        Commands::State => {
            let provider = build_provider(&config)?;
            match provider.playback_state().await? {
                None => println!("Nothing is playing"),
                Some(state) => {
                    let status = if state.is_playing { "Playing" } else { "Paused" };
                    match state.item {
                        Some(item) => println!(
                            "{} \"{}\" at {} / {}",
                            status,
                            item.name,
                            timestamp::format(state.progress_ms),
                            timestamp::format(item.duration_ms)
                        ),
                        None => println!(
                            "{} at {}",
                            status,
                            timestamp::format(state.progress_ms)
                        ),
                    }
                }
            }
        }

        Commands::Transfer { device, play } => {
            let provider = build_provider(&config)?;
            provider.transfer_playback(&device, play).await?;
            println!("Playback moved to {}", device);
        }
    }

    Ok(())
}

/// Build the provider client with a token from the environment.
fn build_provider(config: &AppConfig) -> Result<Arc<dyn ProviderApi>> {
    let tokens = token_source(config)?;
    let client = SpotifyClient::new(config.provider.clone(), tokens)?;
    Ok(Arc::new(client))
}

fn token_source(config: &AppConfig) -> Result<Arc<dyn TokenSource>> {
    if let Ok(token) = std::env::var("SPOTIFY_ACCESS_TOKEN") {
        if !token.is_empty() {
            return Ok(Arc::new(StaticToken::new(token)));
        }
    }

    let refresh_token = std::env::var("SPOTIFY_REFRESH_TOKEN")
        .context("Set SPOTIFY_ACCESS_TOKEN, or SPOTIFY_REFRESH_TOKEN with client credentials")?;
    let auth = config.auth.clone().with_env_overrides();
    Ok(Arc::new(RefreshingToken::new(auth, refresh_token)?))
}

fn print_outcome(outcome: &MatchOutcome) {
    match outcome {
        MatchOutcome::AutoPlay(result) => {
            println!("Best match:");
            print_result(1, result);
        }
        MatchOutcome::Disambiguate(results) => {
            println!("Did you mean:");
            for (i, result) in results.iter().enumerate() {
                print_result(i + 1, result);
            }
        }
        MatchOutcome::NoMatch => println!("No matching episodes found"),
    }
}

fn print_result(position: usize, result: &MatchResult) {
    println!(
        "  {}. {} ({}, {}) {:.0}%",
        position,
        result.episode.name,
        result.episode.release_date,
        timestamp::format(result.episode.duration_ms),
        result.confidence * 100.0
    );
}
