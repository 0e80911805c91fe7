//! Fixed timestep simulation tick
//!
//! Core game loop that advances one round deterministically.

use super::collision::{CollisionVerdict, evaluate_world, recycle_obstacles};
use super::difficulty::{DifficultyController, DifficultyParameters};
use super::snake::Direction;
use super::state::{GameKind, GamePhase, SimulationState, World};
use crate::consts::*;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickInput {
    /// Flap (space/click/tap); ignored by snake
    pub flap: bool,
    /// Turn requests in arrival order; ignored by flappy
    pub turns: Vec<Direction>,
}

/// What one tick did
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    pub verdict: CollisionVerdict,
    /// Points added this tick
    pub points: u32,
    pub flapped: bool,
    /// Parameters in effect after scoring
    pub params: DifficultyParameters,
}

/// Advance the round by one fixed step.
///
/// `dt` is the step length in seconds. A round in `Ready` starts playing on
/// its first tick; a finished round is left untouched.
pub fn tick(
    state: &mut SimulationState,
    input: &TickInput,
    difficulty: &DifficultyController,
    dt: f32,
    elapsed_secs: f32,
) -> TickOutcome {
    let mut out = TickOutcome {
        verdict: CollisionVerdict::default(),
        points: 0,
        flapped: false,
        params: difficulty.parameters(state.score, elapsed_secs),
    };

    match state.phase {
        GamePhase::GameOver => return out,
        GamePhase::Ready => state.phase = GamePhase::Playing,
        GamePhase::Playing => {}
    }
    state.time_ticks += 1;

    match state.kind {
        GameKind::Flappy => tick_flappy(state, input, difficulty, dt, elapsed_secs, &mut out),
        GameKind::Snake => tick_snake(state, input, difficulty, elapsed_secs, &mut out),
    }

    if out.verdict.is_terminal() {
        log::info!(
            "Round {} over ({:?}) with score {}",
            state.round.0,
            out.verdict.terminal,
            state.score
        );
        state.phase = GamePhase::GameOver;
    }
    out
}

fn tick_flappy(
    state: &mut SimulationState,
    input: &TickInput,
    difficulty: &DifficultyController,
    dt: f32,
    elapsed_secs: f32,
    out: &mut TickOutcome,
) {
    let World::Flappy(world) = &mut state.world else {
        return;
    };

    if input.flap {
        world.bird.flap();
        out.flapped = true;
    }
    world.integrate(dt, out.params.speed);

    out.verdict = evaluate_world(&state.world, state.score);
    if out.verdict.is_terminal() {
        return;
    }

    let World::Flappy(world) = &mut state.world else {
        return;
    };
    out.points = world.mark_passed();
    state.score += out.points;
    out.params = difficulty.parameters(state.score, elapsed_secs);
    recycle_obstacles(world, difficulty, &out.params, &mut state.rng);
}

fn tick_snake(
    state: &mut SimulationState,
    input: &TickInput,
    difficulty: &DifficultyController,
    elapsed_secs: f32,
    out: &mut TickOutcome,
) {
    if let World::Snake(world) = &mut state.world {
        world.steer(&input.turns);
    }

    out.verdict = evaluate_world(&state.world, state.score);
    if out.verdict.is_terminal() {
        return;
    }

    let World::Snake(world) = &mut state.world else {
        return;
    };
    world.advance(state.score as usize + SNAKE_BASE_TRAIL);
    if out.verdict.scored {
        out.points = 1;
        state.score += 1;
        world.food = world.place_food(&mut state.rng);
        out.params = difficulty.parameters(state.score, elapsed_secs);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::snake::Cell;
    use crate::sim::{DifficultyMode, GameKind, RoundId};

    const DT: f32 = FLAPPY_STEP_MS as f32 / 1000.0;

    fn round(kind: GameKind, seed: u64) -> (SimulationState, DifficultyController) {
        let difficulty = DifficultyController::new(kind, DifficultyMode::Adaptive);
        (SimulationState::new(kind, RoundId(1), seed, &difficulty), difficulty)
    }

    #[test]
    fn test_ready_starts_playing() {
        let (mut state, difficulty) = round(GameKind::Flappy, 1);
        assert_eq!(state.phase, GamePhase::Ready);
        tick(&mut state, &TickInput::default(), &difficulty, DT, 0.0);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.time_ticks, 1);
    }

    #[test]
    fn test_bird_falls_to_the_floor() {
        let (mut state, difficulty) = round(GameKind::Flappy, 1);
        let mut ticks = 0;
        while !state.is_over() && ticks < 1_000 {
            tick(&mut state, &TickInput::default(), &difficulty, DT, 0.0);
            ticks += 1;
        }
        assert!(state.is_over());
        assert_eq!(state.score, 0);

        // Finished rounds don't move
        let before = state.time_ticks;
        tick(&mut state, &TickInput::default(), &difficulty, DT, 0.0);
        assert_eq!(state.time_ticks, before);
    }

    #[test]
    fn test_flappy_scores_a_passed_pipe() {
        let (mut state, difficulty) = round(GameKind::Flappy, 4);
        if let World::Flappy(world) = &mut state.world {
            // Pipe about to clear the bird's left edge
            world.pipes[0].x = BIRD_START_X - PIPE_WIDTH + 0.5;
        }
        let out = tick(
            &mut state,
            &TickInput {
                flap: true,
                ..Default::default()
            },
            &difficulty,
            DT,
            0.0,
        );
        assert!(out.flapped);
        assert_eq!(out.points, 1);
        assert_eq!(state.score, 1);
    }

    #[test]
    fn test_snake_eats_and_grows() {
        let (mut state, difficulty) = round(GameKind::Snake, 2);
        if let World::Snake(world) = &mut state.world {
            world.food = Some(Cell::new(SNAKE_START.0, SNAKE_START.1 - 1));
        }
        let out = tick(&mut state, &TickInput::default(), &difficulty, 0.1, 0.0);
        assert_eq!(out.points, 1);
        assert_eq!(state.score, 1);

        let world = state.snake().unwrap();
        assert_eq!(world.head, Cell::new(SNAKE_START.0, SNAKE_START.1 - 1));
        assert!(world.food.is_some_and(|f| !world.occupies(f)));
    }

    #[test]
    fn test_snake_reverse_into_neck_is_ignored() {
        let (mut state, difficulty) = round(GameKind::Snake, 3);
        tick(&mut state, &TickInput::default(), &difficulty, 0.1, 0.0);
        // Moving up: "left" then "down" arrive within one tick
        let input = TickInput {
            turns: vec![Direction::Left, Direction::Down],
            ..Default::default()
        };
        tick(&mut state, &input, &difficulty, 0.1, 0.0);
        assert!(!state.is_over());
        assert_eq!(state.snake().unwrap().previous_heading, Direction::Left);
    }

    #[test]
    fn test_snake_hits_the_wall() {
        let (mut state, difficulty) = round(GameKind::Snake, 5);
        if let World::Snake(world) = &mut state.world {
            world.food = None;
        }
        // Start row 9 heading up: the tenth move leaves the grid
        for _ in 0..SNAKE_START.1 {
            tick(&mut state, &TickInput::default(), &difficulty, 0.1, 0.0);
            assert!(!state.is_over());
        }
        let out = tick(&mut state, &TickInput::default(), &difficulty, 0.1, 0.0);
        assert!(out.verdict.is_terminal());
        assert!(state.is_over());
    }

    #[test]
    fn test_determinism() {
        // Two rounds with the same seed and inputs end identically
        for kind in [GameKind::Flappy, GameKind::Snake] {
            let (mut a, difficulty) = round(kind, 99_999);
            let (mut b, _) = round(kind, 99_999);

            for i in 0..600 {
                let input = TickInput {
                    flap: i % 23 == 0,
                    turns: match i % 7 {
                        0 => vec![Direction::Left],
                        3 => vec![Direction::Down],
                        5 => vec![Direction::Right],
                        _ => vec![Direction::Up],
                    },
                };
                tick(&mut a, &input, &difficulty, DT, 0.0);
                tick(&mut b, &input, &difficulty, DT, 0.0);
            }

            assert_eq!(a.time_ticks, b.time_ticks);
            assert_eq!(a.score, b.score);
            assert_eq!(a.phase, b.phase);
        }
    }
}
