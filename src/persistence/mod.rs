//! Local key/value persistence
//!
//! Features:
//! - String-keyed JSON values
//! - In-memory store for native builds and tests
//! - LocalStorage store on wasm
//! - Advisory per-game best score (the ledger stays authoritative)

use std::cell::RefCell;
use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::sim::GameKind;

/// Minimal string store; failures are swallowed and logged by implementors
pub trait PersistentStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: RefCell<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PersistentStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

/// Browser LocalStorage
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct LocalStorageStore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageStore {
    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl PersistentStore for LocalStorageStore {
    fn get(&self, key: &str) -> Option<String> {
        Self::storage()?.get_item(key).ok().flatten()
    }

    fn set(&self, key: &str, value: &str) {
        if let Some(storage) = Self::storage() {
            if storage.set_item(key, value).is_err() {
                log::warn!("LocalStorage write failed for {}", key);
            }
        }
    }
}

/// Default store for the current target
#[cfg(target_arch = "wasm32")]
pub fn default_store() -> Box<dyn PersistentStore> {
    Box::new(LocalStorageStore)
}

#[cfg(not(target_arch = "wasm32"))]
pub fn default_store() -> Box<dyn PersistentStore> {
    Box::new(MemoryStore::new())
}

/// Read and parse a JSON value; missing or corrupt data reads as `None`
pub fn load_json<T: DeserializeOwned>(store: &dyn PersistentStore, key: &str) -> Option<T> {
    let json = store.get(key)?;
    match serde_json::from_str(&json) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Ignoring unreadable {}: {}", key, e);
            None
        }
    }
}

pub fn save_json<T: Serialize>(store: &dyn PersistentStore, key: &str, value: &T) {
    match serde_json::to_string(value) {
        Ok(json) => store.set(key, &json),
        Err(e) => log::warn!("Failed to serialize {}: {}", key, e),
    }
}

/// Locally remembered best score per game
pub struct BestScore;

impl BestScore {
    fn key(game: GameKind) -> String {
        format!("chain_arcade.{}.best", game.as_str())
    }

    pub fn load(store: &dyn PersistentStore, game: GameKind) -> u32 {
        load_json(store, &Self::key(game)).unwrap_or(0)
    }

    /// Compare-and-replace; returns true when `score` became the new best
    pub fn record(store: &dyn PersistentStore, game: GameKind, score: u32) -> bool {
        if score <= Self::load(store, game) {
            return false;
        }
        save_json(store, &Self::key(game), &score);
        log::info!("New local best for {}: {}", game.as_str(), score);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_roundtrip_and_corruption() {
        let store = MemoryStore::new();
        save_json(&store, "k", &vec![1u32, 2, 3]);
        assert_eq!(load_json::<Vec<u32>>(&store, "k"), Some(vec![1, 2, 3]));

        store.set("k", "{not json");
        assert_eq!(load_json::<Vec<u32>>(&store, "k"), None);
        assert_eq!(load_json::<u32>(&store, "missing"), None);
    }

    #[test]
    fn test_best_score_only_increases() {
        let store = MemoryStore::new();
        assert_eq!(BestScore::load(&store, GameKind::Snake), 0);
        assert!(BestScore::record(&store, GameKind::Snake, 12));
        assert!(!BestScore::record(&store, GameKind::Snake, 9));
        assert!(!BestScore::record(&store, GameKind::Snake, 12));
        assert_eq!(BestScore::load(&store, GameKind::Snake), 12);
        // Per game
        assert_eq!(BestScore::load(&store, GameKind::Flappy), 0);
    }
}
