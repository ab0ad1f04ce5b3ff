//! Player state reported by the provider.

use serde::{Deserialize, Deserializer, Serialize};

/// The item currently loaded in the player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayingItem {
    pub id: String,
    pub name: String,
    pub duration_ms: u64,
}

/// Snapshot of the user's player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,

    /// Position in the current item; the provider sends `null` between items
    #[serde(default, deserialize_with = "null_as_zero")]
    pub progress_ms: u64,

    #[serde(default)]
    pub item: Option<PlayingItem>,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_state_without_item() {
        let state: PlaybackState =
            serde_json::from_str(r#"{"is_playing": false, "progress_ms": 0, "item": null}"#)
                .unwrap();

        assert!(!state.is_playing);
        assert!(state.item.is_none());
    }

    #[test]
    fn test_playback_state_null_progress() {
        let state: PlaybackState =
            serde_json::from_str(r#"{"is_playing": false, "progress_ms": null, "item": null}"#)
                .unwrap();
        assert_eq!(state.progress_ms, 0);

        let state: PlaybackState = serde_json::from_str(r#"{"is_playing": true}"#).unwrap();
        assert_eq!(state.progress_ms, 0);
    }

    #[test]
    fn test_playback_state_ignores_extra_fields() {
        let json = r#"{
            "is_playing": true,
            "progress_ms": 754000,
            "device": {"id": "abc"},
            "item": {"id": "ep1", "name": "Episode", "duration_ms": 1800000, "type": "episode"}
        }"#;
        let state: PlaybackState = serde_json::from_str(json).unwrap();

        assert_eq!(state.progress_ms, 754_000);
        assert_eq!(state.item.unwrap().id, "ep1");
    }
}
