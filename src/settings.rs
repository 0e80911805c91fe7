//! Player settings and preferences
//!
//! Persisted separately from scores through the [`PersistentStore`].
//! Missing fields take their defaults, so older saves keep loading.

use serde::{Deserialize, Serialize};

use crate::persistence::{PersistentStore, load_json, save_json};
use crate::sim::{DifficultyController, DifficultyMode, GameKind};

/// Player settings/preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    // === Audio ===
    /// Sound effects (flap, score, countdown)
    pub sound_enabled: bool,
    /// Background music
    pub music_enabled: bool,

    // === Gameplay ===
    /// Unknown stored values fall back to adaptive
    pub difficulty: DifficultyMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            music_enabled: true,
            difficulty: DifficultyMode::Adaptive,
        }
    }
}

impl Settings {
    /// Storage key
    const STORAGE_KEY: &'static str = "chain_arcade:settings";

    /// Difficulty controller for a game under these settings
    pub fn difficulty_for(&self, game: GameKind) -> DifficultyController {
        DifficultyController::new(game, self.difficulty)
    }

    pub fn load(store: &dyn PersistentStore) -> Self {
        match load_json(store, Self::STORAGE_KEY) {
            Some(settings) => {
                log::info!("Loaded settings");
                settings
            }
            None => {
                log::info!("Using default settings");
                Self::default()
            }
        }
    }

    pub fn save(&self, store: &dyn PersistentStore) {
        save_json(store, Self::STORAGE_KEY, self);
        log::info!("Settings saved");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;

    #[test]
    fn test_defaults_when_missing() {
        let store = MemoryStore::new();
        assert_eq!(Settings::load(&store), Settings::default());
    }

    #[test]
    fn test_partial_save_merges_defaults() {
        let store = MemoryStore::new();
        store.set(Settings::STORAGE_KEY, r#"{"musicEnabled": false}"#);
        let settings = Settings::load(&store);
        assert!(settings.sound_enabled);
        assert!(!settings.music_enabled);
        assert_eq!(settings.difficulty, DifficultyMode::Adaptive);
    }

    #[test]
    fn test_unknown_difficulty_is_adaptive() {
        let store = MemoryStore::new();
        store.set(Settings::STORAGE_KEY, r#"{"difficulty": "nightmare"}"#);
        assert_eq!(Settings::load(&store).difficulty, DifficultyMode::Adaptive);

        store.set(Settings::STORAGE_KEY, r#"{"difficulty": "hard"}"#);
        assert_eq!(Settings::load(&store).difficulty, DifficultyMode::Hard);
    }

    #[test]
    fn test_save_roundtrip() {
        let store = MemoryStore::new();
        let settings = Settings {
            sound_enabled: false,
            difficulty: DifficultyMode::Easy,
            ..Default::default()
        };
        settings.save(&store);
        assert_eq!(
            store.get(Settings::STORAGE_KEY).as_deref(),
            Some(r#"{"soundEnabled":false,"musicEnabled":true,"difficulty":"easy"}"#)
        );
        assert_eq!(Settings::load(&store), settings);
    }
}
