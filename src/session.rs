//! Round lifecycle
//!
//! A [`Session`] owns the running round for one game: clock, simulation
//! state, outcome recorder and the queued input. The host calls
//! [`Session::frame`] once per animation frame with the elapsed wall time and
//! plays back the returned cues. When a round ends the outcome is frozen and
//! a submission attempt is opened on the shared submission machine; the host
//! hands that attempt to a [`Submitter`](crate::Submitter).

use std::cell::RefCell;
use std::rc::Rc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::Serialize;

use crate::consts::*;
use crate::error::SessionError;
use crate::persistence::{BestScore, PersistentStore};
use crate::platform::{InputEvent, InputQueue};
use crate::settings::Settings;
use crate::sim::{
    ClockCue, DifficultyController, GameKind, RoundId, RoundOutcome, RoundOutcomeRecorder,
    SimulationClock, SimulationState, tick,
};
use crate::submission::{Attempt, ScoreSubmission, SubmitStatus};

/// Audio/visual events raised during a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "cue", content = "value", rename_all = "camelCase")]
pub enum Cue {
    Countdown(u8),
    Go,
    Flap,
    /// New score after a point
    Score(u32),
    GameOver,
    Paused,
    Resumed,
}

/// What happened during one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameReport {
    pub ticks: u32,
    pub cues: Vec<Cue>,
    /// Set on the frame the round ended
    pub outcome: Option<RoundOutcome>,
    /// Submission attempt to drive, if the outcome is worth submitting
    #[serde(skip)]
    pub attempt: Option<Attempt>,
}

/// Why the round is paused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseReason {
    Player,
    Overlay,
    Wallet,
}

pub struct Session {
    game: GameKind,
    settings: Settings,
    difficulty: DifficultyController,
    state: Option<SimulationState>,
    clock: SimulationClock,
    recorder: RoundOutcomeRecorder,
    submission: Rc<RefCell<ScoreSubmission>>,
    store: Rc<dyn PersistentStore>,
    input: InputQueue,
    seeds: Pcg32,
    next_round: u64,
    wallet_ready: bool,
    open_overlays: u32,
    paused_by: Option<PauseReason>,
}

impl Session {
    pub fn new(
        game: GameKind,
        settings: Settings,
        store: Rc<dyn PersistentStore>,
        submission: Rc<RefCell<ScoreSubmission>>,
        seed: u64,
    ) -> Self {
        let difficulty = settings.difficulty_for(game);
        Self {
            game,
            clock: new_clock(game, &difficulty),
            settings,
            difficulty,
            state: None,
            recorder: RoundOutcomeRecorder::new(),
            submission,
            store,
            input: InputQueue::new(),
            seeds: Pcg32::seed_from_u64(seed),
            next_round: 1,
            wallet_ready: false,
            open_overlays: 0,
            paused_by: None,
        }
    }

    pub fn game(&self) -> GameKind {
        self.game
    }

    pub fn state(&self) -> Option<&SimulationState> {
        self.state.as_ref()
    }

    pub fn clock(&self) -> &SimulationClock {
        &self.clock
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Takes effect from the next round
    pub fn set_settings(&mut self, settings: Settings) {
        settings.save(self.store.as_ref());
        self.difficulty = settings.difficulty_for(self.game);
        self.settings = settings;
    }

    pub fn score(&self) -> u32 {
        self.state.as_ref().map_or(0, |s| s.score)
    }

    pub fn local_best(&self) -> u32 {
        BestScore::load(self.store.as_ref(), self.game)
    }

    pub fn submission_status(&self) -> SubmitStatus {
        self.submission.borrow().status()
    }

    pub fn paused_by(&self) -> Option<PauseReason> {
        self.paused_by
    }

    /// A round exists and hasn't ended
    pub fn in_round(&self) -> bool {
        self.state.as_ref().is_some_and(|s| !s.is_over())
    }

    /// Start a fresh round with the lead-in countdown
    pub fn start_round(&mut self) -> Result<RoundId, SessionError> {
        if self.submission.borrow().is_busy() {
            return Err(SessionError::SubmissionInFlight);
        }
        if !self.wallet_ready {
            return Err(SessionError::WalletNotReady);
        }
        // The previous round's record is superseded, even if still retryable
        self.submission.borrow_mut().abandon();

        let round = RoundId(self.next_round);
        self.next_round += 1;
        let seed = self.seeds.random::<u64>();

        self.state = Some(SimulationState::new(
            self.game,
            round,
            seed,
            &self.difficulty,
        ));
        self.clock = new_clock(self.game, &self.difficulty);
        self.clock.start(true);
        self.recorder.reset();
        self.input.clear();
        self.paused_by = None;

        log::info!(
            "Round {} of {} started ({}, seed {})",
            round.0,
            self.game.as_str(),
            self.difficulty.mode().as_str(),
            seed
        );
        Ok(round)
    }

    /// Drop any in-flight submission and start anyway
    pub fn abandon_and_start(&mut self) -> Result<RoundId, SessionError> {
        self.submission.borrow_mut().abandon();
        self.start_round()
    }

    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Running or counting down → paused; paused → countdown.
    ///
    /// Resuming is refused while the wallet isn't ready.
    pub fn toggle_pause(&mut self) -> Option<Cue> {
        if !self.in_round() {
            return None;
        }
        if self.clock.is_paused() {
            if !self.wallet_ready {
                log::info!("Resume refused: wallet not ready");
                return None;
            }
            self.clock.resume(true);
            self.paused_by = None;
            Some(Cue::Resumed)
        } else {
            self.pause_for(PauseReason::Player).then_some(Cue::Paused)
        }
    }

    fn pause_for(&mut self, reason: PauseReason) -> bool {
        if !self.in_round() || !self.clock.pause() {
            return false;
        }
        log::info!("Round paused ({:?})", reason);
        self.paused_by = Some(reason);
        self.input.clear();
        true
    }

    /// Wallet connected on the expected network (or not).
    ///
    /// Losing it mid-round pauses; getting it back does not auto-resume.
    pub fn set_wallet_ready(&mut self, ready: bool) {
        if self.wallet_ready != ready {
            log::info!("Wallet ready: {}", ready);
        }
        self.wallet_ready = ready;
        if !ready {
            self.pause_for(PauseReason::Wallet);
        }
    }

    pub fn wallet_ready(&self) -> bool {
        self.wallet_ready
    }

    /// A panel (leaderboard, history, settings) opened over the game
    pub fn open_overlay(&mut self) {
        self.open_overlays += 1;
        self.pause_for(PauseReason::Overlay);
    }

    /// Closing the last panel resumes only a pause the overlay caused
    pub fn close_overlay(&mut self) -> Option<Cue> {
        self.open_overlays = self.open_overlays.saturating_sub(1);
        if self.open_overlays > 0 || self.paused_by != Some(PauseReason::Overlay) {
            return None;
        }
        if !self.wallet_ready || !self.clock.resume(true) {
            return None;
        }
        self.paused_by = None;
        Some(Cue::Resumed)
    }

    /// Advance by `elapsed_ms` of wall time
    pub fn frame(&mut self, elapsed_ms: f64) -> FrameReport {
        let mut report = FrameReport::default();

        for _ in 0..self.input.take_toggles() {
            if let Some(cue) = self.toggle_pause() {
                report.cues.push(cue);
            }
        }

        let advance = self.clock.advance(elapsed_ms);
        report.cues.extend(advance.cues.iter().map(|cue| match cue {
            ClockCue::Countdown(n) => Cue::Countdown(*n),
            ClockCue::Go => Cue::Go,
        }));

        if !self.clock.is_running() {
            self.input.clear();
            return report;
        }
        let Some(state) = self.state.as_mut() else {
            return report;
        };

        let dt = (FLAPPY_STEP_MS / 1000.0) as f32;
        for _ in 0..advance.ticks {
            if state.is_over() {
                break;
            }
            // Input lands on the first tick of the frame
            let input = self.input.drain_tick();
            let elapsed = (self.clock.elapsed_ms() / 1000.0) as f32;
            let before = state.score;
            let out = tick(state, &input, &self.difficulty, dt, elapsed);
            report.ticks += 1;

            if out.flapped {
                report.cues.push(Cue::Flap);
            }
            if state.score > before {
                report.cues.push(Cue::Score(state.score));
            }
            if self.game == GameKind::Snake {
                self.clock.set_target_rate(out.params.speed);
            }

            if state.is_over() {
                report.cues.push(Cue::GameOver);
                self.clock.stop();
                let outcome = self.recorder.freeze(state, &self.clock, self.store.as_ref());
                report.attempt = self.submission.borrow_mut().open(outcome);
                break;
            }
        }

        report.outcome = self.recorder.take_completed();
        report
    }
}

fn new_clock(game: GameKind, difficulty: &DifficultyController) -> SimulationClock {
    match game {
        GameKind::Flappy => SimulationClock::new(FLAPPY_STEP_MS, FLAPPY_COUNTDOWN_STEP_MS),
        GameKind::Snake => {
            let rate = difficulty.parameters(0, 0.0).speed.max(1.0);
            SimulationClock::new(1000.0 / rate as f64, SNAKE_COUNTDOWN_STEP_MS)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::MemoryStore;
    use crate::sim::{Cell, ClockPhase, Direction, World};

    fn session(game: GameKind) -> Session {
        let mut session = Session::new(
            game,
            Settings::default(),
            Rc::new(MemoryStore::new()),
            Rc::new(RefCell::new(ScoreSubmission::new())),
            7,
        );
        session.set_wallet_ready(true);
        session
    }

    /// Feed 50ms frames, merging the reports
    fn run(session: &mut Session, total_ms: f64) -> FrameReport {
        let mut merged = FrameReport::default();
        let mut t = 0.0;
        while t < total_ms {
            let report = session.frame(50.0);
            merged.ticks += report.ticks;
            merged.cues.extend(report.cues);
            merged.outcome = merged.outcome.or(report.outcome);
            merged.attempt = merged.attempt.or(report.attempt);
            t += 50.0;
        }
        merged
    }

    fn snake_world(session: &mut Session) -> &mut crate::sim::snake::SnakeWorld {
        match session.state.as_mut().map(|s| &mut s.world) {
            Some(World::Snake(world)) => world,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_wallet_gate_blocks_start() {
        let mut s = session(GameKind::Flappy);
        s.set_wallet_ready(false);
        assert_eq!(s.start_round(), Err(SessionError::WalletNotReady));
        s.set_wallet_ready(true);
        assert_eq!(s.start_round(), Ok(RoundId(1)));
    }

    #[test]
    fn test_countdown_then_ticks() {
        let mut s = session(GameKind::Snake);
        s.start_round().unwrap();
        let report = run(&mut s, 2_400.0);
        assert_eq!(
            report.cues,
            vec![Cue::Countdown(3), Cue::Countdown(2), Cue::Countdown(1), Cue::Go]
        );
        assert_eq!(report.ticks, 0);

        let report = run(&mut s, 500.0);
        assert!(report.ticks > 0);
        assert!(s.state().unwrap().time_ticks > 0);
    }

    #[test]
    fn test_flappy_round_without_points_stays_idle() {
        let mut s = session(GameKind::Flappy);
        s.start_round().unwrap();
        let report = run(&mut s, 10_000.0);

        assert!(report.cues.contains(&Cue::GameOver));
        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.score, 0);
        assert!(report.attempt.is_none());
        assert_eq!(s.submission_status(), SubmitStatus::Idle);
        assert_eq!(s.clock().phase(), ClockPhase::Stopped);
    }

    #[test]
    fn test_snake_round_opens_submission() {
        let mut s = session(GameKind::Snake);
        s.start_round().unwrap();
        run(&mut s, 2_400.0);
        // Food straight ahead, then the wall
        snake_world(&mut s).food = Some(Cell::new(SNAKE_START.0, SNAKE_START.1 - 1));
        let report = run(&mut s, 5_000.0);

        assert!(report.cues.contains(&Cue::Score(1)));
        let outcome = report.outcome.unwrap();
        assert_eq!(outcome.round, RoundId(1));
        assert!(outcome.score >= 1);
        assert!(report.attempt.is_some());
        assert_eq!(s.submission_status(), SubmitStatus::ReadyToSign);
        assert_eq!(s.local_best(), outcome.score);
    }

    #[test]
    fn test_busy_submission_blocks_next_round() {
        let mut s = session(GameKind::Snake);
        s.start_round().unwrap();
        run(&mut s, 2_400.0);
        snake_world(&mut s).food = Some(Cell::new(SNAKE_START.0, SNAKE_START.1 - 1));
        let attempt = run(&mut s, 5_000.0).attempt.unwrap();

        // Simulate the submitter reaching the wallet prompt
        let pre = crate::submission::Preconditions {
            contract: Some(crate::chain::Address::from_bytes([1; 20])),
            client_ready: true,
            wallet: crate::chain::WalletState::Connected {
                account: crate::chain::Address::from_bytes([2; 20]),
                chain_id: 31337,
            },
            expected_chain_id: 31337,
        };
        s.submission.borrow_mut().begin_signing(attempt, &pre);
        assert_eq!(s.start_round(), Err(SessionError::SubmissionInFlight));

        assert_eq!(s.abandon_and_start(), Ok(RoundId(2)));
        assert_eq!(s.submission_status(), SubmitStatus::Idle);
    }

    #[test]
    fn test_new_round_supersedes_settled_record() {
        let mut s = session(GameKind::Snake);
        s.start_round().unwrap();
        run(&mut s, 2_400.0);
        snake_world(&mut s).food = Some(Cell::new(SNAKE_START.0, SNAKE_START.1 - 1));
        let attempt = run(&mut s, 5_000.0).attempt.unwrap();

        // Wallet went away before signing
        let pre = crate::submission::Preconditions {
            contract: Some(crate::chain::Address::from_bytes([1; 20])),
            client_ready: true,
            wallet: crate::chain::WalletState::NoWallet,
            expected_chain_id: 31337,
        };
        s.submission.borrow_mut().begin_signing(attempt, &pre);
        assert_eq!(s.submission_status(), SubmitStatus::NeedsWallet);

        assert_eq!(s.start_round(), Ok(RoundId(2)));
        assert_eq!(s.submission_status(), SubmitStatus::Idle);
        assert_eq!(s.submission.borrow_mut().retry(), None);
        assert_eq!(s.submission.borrow().outcome_for(attempt), None);
    }

    #[test]
    fn test_frame_report_json() {
        let report = FrameReport {
            ticks: 2,
            cues: vec![Cue::Countdown(1), Cue::Go, Cue::Score(4)],
            outcome: None,
            attempt: Some(Attempt { record: 1, number: 1 }),
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "ticks": 2,
                "cues": [
                    {"cue": "countdown", "value": 1},
                    {"cue": "go"},
                    {"cue": "score", "value": 4}
                ],
                "outcome": null
            })
        );
    }

    #[test]
    fn test_pause_toggle_via_input() {
        let mut s = session(GameKind::Snake);
        s.start_round().unwrap();
        run(&mut s, 2_400.0);

        s.push_input(InputEvent::TogglePause);
        let report = s.frame(50.0);
        assert!(report.cues.contains(&Cue::Paused));
        let ticks = s.state().unwrap().time_ticks;
        run(&mut s, 1_000.0);
        assert_eq!(s.state().unwrap().time_ticks, ticks);

        s.push_input(InputEvent::TogglePause);
        let report = s.frame(50.0);
        assert_eq!(report.cues, vec![Cue::Resumed, Cue::Countdown(3)]);
    }

    #[test]
    fn test_overlay_pause_resumes_only_its_own() {
        let mut s = session(GameKind::Flappy);
        s.start_round().unwrap();
        run(&mut s, 3_000.0);

        s.open_overlay();
        s.open_overlay();
        assert_eq!(s.paused_by(), Some(PauseReason::Overlay));
        assert_eq!(s.close_overlay(), None);
        assert_eq!(s.close_overlay(), Some(Cue::Resumed));
        assert!(s.clock().in_countdown());

        // A player pause survives opening and closing a panel
        run(&mut s, 3_000.0);
        if s.in_round() {
            s.toggle_pause();
            s.open_overlay();
            assert_eq!(s.close_overlay(), None);
            assert!(s.clock().is_paused());
        }
    }

    #[test]
    fn test_wallet_loss_pauses_until_explicit_resume() {
        let mut s = session(GameKind::Snake);
        s.start_round().unwrap();
        run(&mut s, 2_400.0);

        s.set_wallet_ready(false);
        assert_eq!(s.paused_by(), Some(PauseReason::Wallet));
        assert_eq!(s.toggle_pause(), None);

        s.set_wallet_ready(true);
        assert!(s.clock().is_paused());
        assert_eq!(s.toggle_pause(), Some(Cue::Resumed));
    }

    #[test]
    fn test_turns_reach_the_snake() {
        let mut s = session(GameKind::Snake);
        s.start_round().unwrap();
        run(&mut s, 2_400.0);
        snake_world(&mut s).food = None;

        s.push_input(InputEvent::Turn(Direction::Left));
        s.push_input(InputEvent::Turn(Direction::Down));
        run(&mut s, 200.0);
        let world = s.state().unwrap().snake().unwrap();
        assert_eq!(world.previous_heading, Direction::Left);
    }
}
