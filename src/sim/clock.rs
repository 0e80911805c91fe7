//! Simulation clock
//!
//! Turns host wall-time into fixed logical steps and owns the
//! running/paused/countdown phases. The step interval eases toward its
//! target so a difficulty-driven speed change never lands as a jump.

use serde::{Deserialize, Serialize};

use crate::consts::*;

/// Clock phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockPhase {
    /// No round in progress, or round ended
    Stopped,
    /// Lead-in before ticking (re)starts; ticks are suppressed
    Countdown { remaining: u8 },
    Running,
    Paused,
}

/// Presentation cues raised while advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockCue {
    /// Countdown shows this number
    Countdown(u8),
    /// Countdown finished, ticking resumes
    Go,
}

/// Result of one `advance` call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClockAdvance {
    /// Logical steps the caller must run now
    pub ticks: u32,
    pub cues: Vec<ClockCue>,
}

/// Eases a value toward a target in fixed periods.
///
/// Every `SMOOTHING_PERIOD_MS` the value covers `SMOOTHING_FACTOR` of the
/// remaining distance and snaps once within `SMOOTHING_SNAP`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Smoother {
    current: f64,
    target: f64,
    carry_ms: f64,
}

impl Smoother {
    pub fn new(value: f64) -> Self {
        Self {
            current: value,
            target: value,
            carry_ms: 0.0,
        }
    }

    pub fn value(&self) -> f64 {
        self.current
    }

    pub fn target(&self) -> f64 {
        self.target
    }

    pub fn set_target(&mut self, target: f64) {
        self.target = target;
    }

    /// Jump straight to a value (round start)
    pub fn snap_to(&mut self, value: f64) {
        self.current = value;
        self.target = value;
        self.carry_ms = 0.0;
    }

    pub fn advance(&mut self, elapsed_ms: f64) {
        self.carry_ms += elapsed_ms;
        while self.carry_ms >= SMOOTHING_PERIOD_MS {
            self.carry_ms -= SMOOTHING_PERIOD_MS;
            let diff = self.target - self.current;
            if diff.abs() < SMOOTHING_SNAP {
                self.current = self.target;
            } else {
                self.current += diff * SMOOTHING_FACTOR;
            }
        }
    }
}

/// Fixed-step clock with pause and countdown semantics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationClock {
    phase: ClockPhase,
    /// Effective ms per logical step
    step: Smoother,
    base_step_ms: f64,
    countdown_step_ms: f64,
    countdown_elapsed_ms: f64,
    accumulator_ms: f64,
    /// Running time only (pause and countdown excluded)
    active_ms: f64,
    ticks: u64,
    peak_rate: u32,
    #[serde(skip)]
    pending_cues: Vec<ClockCue>,
}

impl SimulationClock {
    /// `step_ms` is the initial interval; `countdown_step_ms` the length of one count
    pub fn new(step_ms: f64, countdown_step_ms: f64) -> Self {
        Self {
            phase: ClockPhase::Stopped,
            step: Smoother::new(step_ms),
            base_step_ms: step_ms,
            countdown_step_ms,
            countdown_elapsed_ms: 0.0,
            accumulator_ms: 0.0,
            active_ms: 0.0,
            ticks: 0,
            peak_rate: rate_for(step_ms),
            pending_cues: Vec::new(),
        }
    }

    pub fn phase(&self) -> ClockPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        self.phase == ClockPhase::Running
    }

    pub fn is_paused(&self) -> bool {
        self.phase == ClockPhase::Paused
    }

    pub fn in_countdown(&self) -> bool {
        matches!(self.phase, ClockPhase::Countdown { .. })
    }

    /// Ticks run since the round started
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Whole seconds of running time
    pub fn elapsed_secs(&self) -> u32 {
        (self.active_ms / 1000.0).floor() as u32
    }

    pub fn elapsed_ms(&self) -> f64 {
        self.active_ms
    }

    /// Current effective ticks per second
    pub fn rate(&self) -> u32 {
        rate_for(self.step.value())
    }

    /// Highest rate seen this round
    pub fn peak_rate(&self) -> u32 {
        self.peak_rate
    }

    pub fn step_ms(&self) -> f64 {
        self.step.value()
    }

    /// Set the rate the step interval eases toward
    pub fn set_target_rate(&mut self, ticks_per_sec: f32) {
        if ticks_per_sec > 0.0 {
            self.step.set_target(1000.0 / ticks_per_sec as f64);
        }
    }

    /// Begin a round from zero
    pub fn start(&mut self, with_countdown: bool) {
        self.reset();
        self.enter_active(with_countdown);
    }

    /// Running or counting down → paused. Returns whether the phase changed.
    pub fn pause(&mut self) -> bool {
        match self.phase {
            ClockPhase::Running | ClockPhase::Countdown { .. } => {
                self.phase = ClockPhase::Paused;
                true
            }
            _ => false,
        }
    }

    /// Paused → countdown or running. Returns whether the phase changed.
    pub fn resume(&mut self, with_countdown: bool) -> bool {
        if self.phase != ClockPhase::Paused {
            return false;
        }
        self.enter_active(with_countdown);
        true
    }

    /// Round ended; no further ticks until the next start
    pub fn stop(&mut self) {
        self.phase = ClockPhase::Stopped;
        self.accumulator_ms = 0.0;
        self.pending_cues.clear();
    }

    /// Back to the initial, stopped state
    pub fn reset(&mut self) {
        self.phase = ClockPhase::Stopped;
        self.step.snap_to(self.base_step_ms);
        self.countdown_elapsed_ms = 0.0;
        self.accumulator_ms = 0.0;
        self.active_ms = 0.0;
        self.ticks = 0;
        self.peak_rate = rate_for(self.base_step_ms);
        self.pending_cues.clear();
    }

    fn enter_active(&mut self, with_countdown: bool) {
        self.accumulator_ms = 0.0;
        if with_countdown {
            self.countdown_elapsed_ms = 0.0;
            self.phase = ClockPhase::Countdown {
                remaining: COUNTDOWN_COUNTS,
            };
            self.pending_cues.push(ClockCue::Countdown(COUNTDOWN_COUNTS));
        } else {
            self.phase = ClockPhase::Running;
        }
    }

    /// Feed host wall-time; returns the number of steps to run
    pub fn advance(&mut self, elapsed_ms: f64) -> ClockAdvance {
        let elapsed = elapsed_ms.clamp(0.0, MAX_FRAME_MS);
        let mut out = ClockAdvance {
            ticks: 0,
            cues: std::mem::take(&mut self.pending_cues),
        };

        match self.phase {
            ClockPhase::Countdown { mut remaining } => {
                self.countdown_elapsed_ms += elapsed;
                while remaining > 0 && self.countdown_elapsed_ms >= self.countdown_step_ms {
                    self.countdown_elapsed_ms -= self.countdown_step_ms;
                    remaining -= 1;
                    out.cues.push(if remaining == 0 {
                        ClockCue::Go
                    } else {
                        ClockCue::Countdown(remaining)
                    });
                }
                self.phase = if remaining == 0 {
                    self.accumulator_ms = 0.0;
                    ClockPhase::Running
                } else {
                    ClockPhase::Countdown { remaining }
                };
            }
            ClockPhase::Running => {
                self.active_ms += elapsed;
                self.step.advance(elapsed);
                self.accumulator_ms += elapsed;

                let step = self.step.value();
                while self.accumulator_ms >= step && out.ticks < MAX_SUBSTEPS {
                    self.accumulator_ms -= step;
                    out.ticks += 1;
                }
                // Drop backlog beyond the substep cap
                if out.ticks == MAX_SUBSTEPS {
                    self.accumulator_ms = self.accumulator_ms.min(step);
                }
                self.ticks += out.ticks as u64;
                self.peak_rate = self.peak_rate.max(self.rate());
            }
            ClockPhase::Paused | ClockPhase::Stopped => {}
        }

        out
    }
}

fn rate_for(step_ms: f64) -> u32 {
    if step_ms <= 0.0 {
        return 0;
    }
    (1000.0 / step_ms).round() as u32
}
