//! Round outcome capture
//!
//! The outcome is frozen once, at the terminal instant, and handed to the
//! submission flow through a single consumable signal.

use serde::{Deserialize, Serialize};

use super::clock::SimulationClock;
use super::state::{GameKind, RoundId, SimulationState};
use crate::persistence::{BestScore, PersistentStore};

/// Final result of one round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundOutcome {
    pub round: RoundId,
    pub game: GameKind,
    pub score: u32,
    /// Whole seconds of running time
    pub duration_secs: u32,
    pub speed_peak: u32,
}

#[derive(Debug, Default)]
pub struct RoundOutcomeRecorder {
    frozen: Option<RoundOutcome>,
    signal: Option<RoundOutcome>,
}

impl RoundOutcomeRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Capture the outcome. Later calls return the first capture unchanged
    /// until [`reset`](Self::reset).
    pub fn freeze(
        &mut self,
        state: &SimulationState,
        clock: &SimulationClock,
        store: &dyn PersistentStore,
    ) -> RoundOutcome {
        if let Some(outcome) = self.frozen {
            return outcome;
        }

        let outcome = RoundOutcome {
            round: state.round,
            game: state.kind,
            score: state.score,
            duration_secs: clock.elapsed_secs(),
            speed_peak: state.speed_peak(clock),
        };
        log::info!(
            "Froze round {}: score {} in {}s, peak {}",
            outcome.round.0,
            outcome.score,
            outcome.duration_secs,
            outcome.speed_peak
        );
        BestScore::record(store, outcome.game, outcome.score);

        self.frozen = Some(outcome);
        self.signal = Some(outcome);
        outcome
    }

    pub fn frozen(&self) -> Option<RoundOutcome> {
        self.frozen
    }

    /// Consume the completion signal; yields at most once per round
    pub fn take_completed(&mut self) -> Option<RoundOutcome> {
        self.signal.take()
    }

    pub fn reset(&mut self) {
        self.frozen = None;
        self.signal = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::*;
    use crate::persistence::MemoryStore;
    use crate::sim::{DifficultyController, DifficultyMode};

    fn finished_round(score: u32) -> (SimulationState, SimulationClock) {
        let difficulty = DifficultyController::new(GameKind::Snake, DifficultyMode::Normal);
        let mut state = SimulationState::new(GameKind::Snake, RoundId(7), 1, &difficulty);
        state.score = score;
        let mut clock = SimulationClock::new(100.0, SNAKE_COUNTDOWN_STEP_MS);
        clock.start(false);
        for _ in 0..9 {
            clock.advance(250.0);
        }
        (state, clock)
    }

    #[test]
    fn test_freeze_is_idempotent() {
        let store = MemoryStore::new();
        let (mut state, mut clock) = finished_round(5);
        let mut recorder = RoundOutcomeRecorder::new();

        let first = recorder.freeze(&state, &clock, &store);
        assert_eq!(first.round, RoundId(7));
        assert_eq!(first.score, 5);
        assert_eq!(first.duration_secs, 2);

        // Later changes don't leak into the frozen outcome
        state.score = 50;
        clock.advance(250.0);
        assert_eq!(recorder.freeze(&state, &clock, &store), first);
    }

    #[test]
    fn test_completion_signal_fires_once() {
        let store = MemoryStore::new();
        let (state, clock) = finished_round(3);
        let mut recorder = RoundOutcomeRecorder::new();

        recorder.freeze(&state, &clock, &store);
        recorder.freeze(&state, &clock, &store);
        assert!(recorder.take_completed().is_some());
        assert!(recorder.take_completed().is_none());

        recorder.reset();
        assert!(recorder.frozen().is_none());
        recorder.freeze(&state, &clock, &store);
        assert!(recorder.take_completed().is_some());
    }

    #[test]
    fn test_best_score_persisted() {
        let store = MemoryStore::new();
        let (state, clock) = finished_round(8);
        RoundOutcomeRecorder::new().freeze(&state, &clock, &store);
        assert_eq!(BestScore::load(&store, GameKind::Snake), 8);
    }
}
