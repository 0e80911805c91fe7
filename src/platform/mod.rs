//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Time
//! - Input events
//! - Browser bindings (wasm only)

pub mod input;
pub mod time;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use input::{InputEvent, InputQueue};
pub use time::now_ms;
