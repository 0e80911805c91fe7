//! Round state and core simulation types
//!
//! Everything a tick reads or writes lives here. Owned by the session for
//! the lifetime of one round and discarded on the next start.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::clock::SimulationClock;
use super::difficulty::DifficultyController;
use super::flappy::FlappyWorld;
use super::snake::SnakeWorld;

/// Which mini-game a round belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Flappy,
    Snake,
}

impl GameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameKind::Flappy => "flappy",
            GameKind::Snake => "snake",
        }
    }
}

/// Identity of one round; outcomes and submissions are matched on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundId(pub u64);

/// Current phase of gameplay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Created, waiting for the clock to start ticking
    Ready,
    /// Active gameplay
    Playing,
    /// Terminal condition hit
    GameOver,
}

/// Game-specific entities
#[derive(Debug, Clone)]
pub enum World {
    Flappy(FlappyWorld),
    Snake(SnakeWorld),
}

/// Complete round state (deterministic for a given seed and input sequence)
#[derive(Debug, Clone)]
pub struct SimulationState {
    pub kind: GameKind,
    pub round: RoundId,
    /// Run seed for reproducibility
    pub seed: u64,
    pub rng: Pcg32,
    /// Simulation tick counter
    pub time_ticks: u64,
    /// Never decreases within a round
    pub score: u32,
    pub phase: GamePhase,
    pub world: World,
}

impl SimulationState {
    /// Fresh round with entities laid out for tick zero
    pub fn new(
        kind: GameKind,
        round: RoundId,
        seed: u64,
        difficulty: &DifficultyController,
    ) -> Self {
        let mut rng = Pcg32::seed_from_u64(seed);
        let world = match kind {
            GameKind::Flappy => World::Flappy(FlappyWorld::new(difficulty, &mut rng)),
            GameKind::Snake => World::Snake(SnakeWorld::new(&mut rng)),
        };
        Self {
            kind,
            round,
            seed,
            rng,
            time_ticks: 0,
            score: 0,
            phase: GamePhase::Ready,
            world,
        }
    }

    pub fn is_over(&self) -> bool {
        self.phase == GamePhase::GameOver
    }

    /// Peak speed for the outcome: scroll speed for flappy, tick rate for snake
    pub fn speed_peak(&self, clock: &SimulationClock) -> u32 {
        match &self.world {
            World::Flappy(world) => world.peak_speed.round() as u32,
            World::Snake(_) => clock.peak_rate(),
        }
    }

    pub fn flappy(&self) -> Option<&FlappyWorld> {
        match &self.world {
            World::Flappy(world) => Some(world),
            _ => None,
        }
    }

    pub fn snake(&self) -> Option<&SnakeWorld> {
        match &self.world {
            World::Snake(world) => Some(world),
            _ => None,
        }
    }
}
