//! Per-tick collision and scoring checks
//!
//! Checks run in a fixed order: boundary, then obstacle/self collision,
//! then scoring. A terminal result wins over a score in the same tick, so
//! a point earned on the killing move is never counted.

use glam::Vec2;
use rand::Rng;

use super::difficulty::{DifficultyController, DifficultyParameters};
use super::flappy::FlappyWorld;
use super::snake::SnakeWorld;
use super::state::{SimulationState, World};
use crate::consts::*;

/// Axis-aligned box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self { min, max }
    }

    /// Strict overlap; touching edges don't count
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }
}

/// What ended the round
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalCause {
    /// Left the playfield
    Boundary,
    /// Hit a pipe
    Obstacle,
    /// Ran into its own trail
    SelfCollision,
}

/// Result of evaluating one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CollisionVerdict {
    pub scored: bool,
    pub terminal: Option<TerminalCause>,
}

impl CollisionVerdict {
    pub fn is_terminal(&self) -> bool {
        self.terminal.is_some()
    }

    fn terminal(cause: TerminalCause) -> Self {
        Self {
            scored: false,
            terminal: Some(cause),
        }
    }
}

/// Evaluate the current state.
///
/// Flappy is evaluated after physics has moved everything; snake is
/// evaluated against the move it is about to make.
pub fn evaluate(state: &SimulationState) -> CollisionVerdict {
    evaluate_world(&state.world, state.score)
}

/// Same as [`evaluate`], for callers holding the world and score separately
pub fn evaluate_world(world: &World, score: u32) -> CollisionVerdict {
    match world {
        World::Flappy(world) => evaluate_flappy(world),
        World::Snake(world) => evaluate_snake(world, score),
    }
}

fn evaluate_flappy(world: &FlappyWorld) -> CollisionVerdict {
    let bird = world.bird.bounds();

    if bird.min.y <= 0.0 || bird.max.y >= FLAPPY_HEIGHT {
        return CollisionVerdict::terminal(TerminalCause::Boundary);
    }

    let hit = world
        .pipes
        .iter()
        .any(|pipe| bird.overlaps(&pipe.upper_bounds()) || bird.overlaps(&pipe.lower_bounds()));
    if hit {
        return CollisionVerdict::terminal(TerminalCause::Obstacle);
    }

    let scored = world
        .pipes
        .iter()
        .any(|pipe| !pipe.scored && pipe.right() < bird.min.x);
    CollisionVerdict {
        scored,
        terminal: None,
    }
}

fn evaluate_snake(world: &SnakeWorld, score: u32) -> CollisionVerdict {
    let next = world.next_head();

    if !next.in_bounds() {
        return CollisionVerdict::terminal(TerminalCause::Boundary);
    }

    let trail_len = score as usize + SNAKE_BASE_TRAIL;
    if world.trail_after_move(trail_len).any(|&cell| cell == next) {
        return CollisionVerdict::terminal(TerminalCause::SelfCollision);
    }

    CollisionVerdict {
        scored: world.food == Some(next),
        terminal: None,
    }
}

/// Re-place every pipe pair that scrolled off the left edge.
///
/// New pairs go one sampled spacing beyond the current rightmost pipe, so
/// active pairs never overlap horizontally. Returns how many were recycled.
pub fn recycle_obstacles<R: Rng>(
    world: &mut FlappyWorld,
    difficulty: &DifficultyController,
    params: &DifficultyParameters,
    rng: &mut R,
) -> usize {
    let mut recycled = 0;
    for index in 0..world.pipes.len() {
        if world.pipes[index].is_offscreen() {
            world.replace_pair(index, difficulty, params, rng);
            recycled += 1;
        }
    }
    debug_assert!(!obstacles_overlap(world));
    recycled
}

/// Whether any two pipe pairs share horizontal extent
pub fn obstacles_overlap(world: &FlappyWorld) -> bool {
    let mut spans: Vec<(f32, f32)> = world.pipes.iter().map(|p| (p.x, p.right())).collect();
    spans.sort_by(|a, b| a.0.total_cmp(&b.0));
    spans.windows(2).any(|w| w[1].0 < w[0].1)
}
