//! Browser bindings
//!
//! A thin [`Session`] handle for the page. Rendering, audio and the wallet
//! connector stay in the page; it forwards keys, wallet readiness and panel
//! open/close here and reads back one JSON frame report per animation frame.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

use crate::persistence::{PersistentStore, default_store};
use crate::platform::InputEvent;
use crate::session::{Cue, Session};
use crate::settings::Settings;
use crate::sim::GameKind;
use crate::submission::ScoreSubmission;

#[wasm_bindgen(start)]
pub fn start() {
    crate::init_logging();
    log::info!("Chain Arcade starting...");
}

#[wasm_bindgen]
pub struct WebSession {
    inner: Session,
}

#[wasm_bindgen]
impl WebSession {
    /// `game` is `"flappy"` or `"snake"`
    #[wasm_bindgen(constructor)]
    pub fn new(game: &str, seed: f64) -> Result<WebSession, JsError> {
        let game = match game {
            "flappy" => GameKind::Flappy,
            "snake" => GameKind::Snake,
            other => return Err(JsError::new(&format!("unknown game: {}", other))),
        };
        let store: Rc<dyn PersistentStore> = Rc::from(default_store());
        let settings = Settings::load(store.as_ref());
        let machine = Rc::new(RefCell::new(ScoreSubmission::new()));
        Ok(WebSession {
            inner: Session::new(game, settings, store, machine, seed as u64),
        })
    }

    /// Returns the new round number
    #[wasm_bindgen(js_name = startRound)]
    pub fn start_round(&mut self) -> Result<f64, JsError> {
        Ok(self.inner.start_round()?.0 as f64)
    }

    /// Forward a `KeyboardEvent.key`; returns whether it was a game key
    pub fn key(&mut self, key: &str) -> bool {
        match InputEvent::from_key(key) {
            Some(event) => {
                self.inner.push_input(event);
                true
            }
            None => false,
        }
    }

    /// Advance by `elapsed_ms` and return the frame report as JSON
    pub fn frame(&mut self, elapsed_ms: f64) -> Result<String, JsError> {
        let report = self.inner.frame(elapsed_ms);
        Ok(serde_json::to_string(&report)?)
    }

    #[wasm_bindgen(js_name = setWalletReady)]
    pub fn set_wallet_ready(&mut self, ready: bool) {
        self.inner.set_wallet_ready(ready);
    }

    #[wasm_bindgen(js_name = openOverlay)]
    pub fn open_overlay(&mut self) {
        self.inner.open_overlay();
    }

    /// True when closing resumed the round
    #[wasm_bindgen(js_name = closeOverlay)]
    pub fn close_overlay(&mut self) -> bool {
        self.inner.close_overlay() == Some(Cue::Resumed)
    }

    pub fn score(&self) -> u32 {
        self.inner.score()
    }

    #[wasm_bindgen(js_name = localBest)]
    pub fn local_best(&self) -> u32 {
        self.inner.local_best()
    }

    #[wasm_bindgen(js_name = submissionStatus)]
    pub fn submission_status(&self) -> String {
        self.inner.submission_status().as_str().to_string()
    }
}
