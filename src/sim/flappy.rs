//! Side-scrolling pipe game entities
//!
//! Coordinates are screen space: origin top-left, y grows downward.
//! Pipes scroll left at the difficulty speed; the bird only moves vertically.

use glam::Vec2;
use rand::Rng;

use super::clock::Smoother;
use super::collision::Aabb;
use super::difficulty::{DifficultyController, DifficultyParameters};
use crate::consts::*;

/// The player's bird (position is the hitbox's top-left corner)
#[derive(Debug, Clone)]
pub struct Bird {
    pub pos: Vec2,
    pub vel: Vec2,
}

impl Default for Bird {
    fn default() -> Self {
        Self {
            pos: Vec2::new(BIRD_START_X, BIRD_START_Y),
            vel: Vec2::ZERO,
        }
    }
}

impl Bird {
    pub fn bounds(&self) -> Aabb {
        Aabb::new(self.pos, self.pos + Vec2::new(BIRD_WIDTH, BIRD_HEIGHT))
    }

    pub fn flap(&mut self) {
        self.vel.y = -FLAP_VELOCITY;
    }

    pub fn integrate(&mut self, dt: f32) {
        self.vel.y += BIRD_GRAVITY * dt;
        self.pos += self.vel * dt;
    }
}

/// An upper/lower pipe pair sharing one gap
#[derive(Debug, Clone)]
pub struct PipePair {
    pub id: u32,
    /// Left edge
    pub x: f32,
    /// Bottom of the upper pipe
    pub gap_top: f32,
    pub gap: f32,
    /// Already counted toward the score
    pub scored: bool,
}

impl PipePair {
    pub fn right(&self) -> f32 {
        self.x + PIPE_WIDTH
    }

    pub fn upper_bounds(&self) -> Aabb {
        Aabb::new(Vec2::new(self.x, 0.0), Vec2::new(self.right(), self.gap_top))
    }

    pub fn lower_bounds(&self) -> Aabb {
        Aabb::new(
            Vec2::new(self.x, self.gap_top + self.gap),
            Vec2::new(self.right(), FLAPPY_HEIGHT),
        )
    }

    /// Fully scrolled past the left edge
    pub fn is_offscreen(&self) -> bool {
        self.right() < 0.0
    }
}

#[derive(Debug, Clone)]
pub struct FlappyWorld {
    pub bird: Bird,
    /// Sorted by id for deterministic iteration
    pub pipes: Vec<PipePair>,
    /// Scroll speed (px/s), eased toward the difficulty target
    pub speed: Smoother,
    pub peak_speed: f32,
    next_id: u32,
}

impl FlappyWorld {
    pub fn new<R: Rng>(difficulty: &DifficultyController, rng: &mut R) -> Self {
        let params = difficulty.parameters(0, 0.0);
        let mut world = Self {
            bird: Bird::default(),
            pipes: Vec::with_capacity(PIPES_TO_RENDER),
            speed: Smoother::new(params.speed as f64),
            peak_speed: params.speed,
            next_id: 1,
        };
        for _ in 0..PIPES_TO_RENDER {
            let id = world.next_id;
            world.next_id += 1;
            let pair = world.layout_pair(id, difficulty, &params, rng);
            world.pipes.push(pair);
        }
        world
    }

    /// Right edge of the furthest pipe (0 when there are none)
    pub fn rightmost_edge(&self) -> f32 {
        self.pipes.iter().map(PipePair::right).fold(0.0, f32::max)
    }

    /// Lay out a pair one spacing beyond the current rightmost pipe
    fn layout_pair<R: Rng>(
        &self,
        id: u32,
        difficulty: &DifficultyController,
        params: &DifficultyParameters,
        rng: &mut R,
    ) -> PipePair {
        let layout = difficulty.sample_layout(params, rng);
        let lowest_top = (FLAPPY_HEIGHT - PIPE_EDGE_MARGIN - layout.gap).max(PIPE_EDGE_MARGIN);
        let gap_top =
            rng.random_range(PIPE_EDGE_MARGIN as i32..=lowest_top as i32) as f32;
        PipePair {
            id,
            x: self.rightmost_edge() + layout.spacing,
            gap_top,
            gap: layout.gap,
            scored: false,
        }
    }

    /// Re-place the pair at `index` beyond the rightmost pipe
    pub fn replace_pair<R: Rng>(
        &mut self,
        index: usize,
        difficulty: &DifficultyController,
        params: &DifficultyParameters,
        rng: &mut R,
    ) {
        let id = self.pipes[index].id;
        // Exclude the recycled pair from the rightmost search
        self.pipes[index].x = f32::MIN;
        let pair = self.layout_pair(id, difficulty, params, rng);
        self.pipes[index] = pair;
    }

    /// Physics step: bird falls, pipes scroll
    pub fn integrate(&mut self, dt: f32, target_speed: f32) {
        self.speed.set_target(target_speed as f64);
        self.speed.advance(dt as f64 * 1000.0);
        let speed = self.speed.value() as f32;
        self.peak_speed = self.peak_speed.max(speed);

        self.bird.integrate(dt);
        for pipe in &mut self.pipes {
            pipe.x -= speed * dt;
        }
    }

    /// Mark every newly passed pair; returns how many
    pub fn mark_passed(&mut self) -> u32 {
        let bird_left = self.bird.pos.x;
        let mut passed = 0;
        for pipe in &mut self.pipes {
            if !pipe.scored && pipe.right() < bird_left {
                pipe.scored = true;
                passed += 1;
            }
        }
        passed
    }
}
