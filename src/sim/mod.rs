//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No rendering, chain, or platform dependencies

pub mod clock;
pub mod collision;
pub mod difficulty;
pub mod flappy;
pub mod outcome;
pub mod snake;
pub mod state;
pub mod tick;

pub use clock::{ClockAdvance, ClockCue, ClockPhase, SimulationClock};
pub use collision::{Aabb, CollisionVerdict, TerminalCause, evaluate};
pub use difficulty::{
    DifficultyController, DifficultyMode, DifficultyParameters, compute_parameters,
};
pub use outcome::{RoundOutcome, RoundOutcomeRecorder};
pub use snake::{Cell, Direction};
pub use state::{GameKind, GamePhase, RoundId, SimulationState, World};
pub use tick::{TickInput, TickOutcome, tick};
