//! Difficulty presets and the adaptive curve
//!
//! Parameters are a pure function of `(score, elapsed, mode)`. Adaptive mode
//! eases from the easy preset to the hard one with a smoothstep over
//! `score / score_ceiling`. The only randomness is layout jitter, which is
//! clamped back into the easy/hard envelope.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::GameKind;

/// Difficulty mode chosen in settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DifficultyMode {
    Easy,
    Normal,
    Hard,
    /// Derive parameters continuously from score
    #[default]
    Adaptive,
}

impl DifficultyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DifficultyMode::Easy => "easy",
            DifficultyMode::Normal => "normal",
            DifficultyMode::Hard => "hard",
            DifficultyMode::Adaptive => "auto",
        }
    }

    /// Parse a stored mode; anything unrecognised is adaptive
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "easy" => DifficultyMode::Easy,
            "normal" => DifficultyMode::Normal,
            "hard" => DifficultyMode::Hard,
            _ => DifficultyMode::Adaptive,
        }
    }
}

impl From<String> for DifficultyMode {
    fn from(s: String) -> Self {
        DifficultyMode::parse(&s)
    }
}

impl From<DifficultyMode> for String {
    fn from(mode: DifficultyMode) -> Self {
        mode.as_str().to_string()
    }
}

/// Closed numeric range
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Span {
    pub min: f32,
    pub max: f32,
}

impl Span {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub const fn point(v: f32) -> Self {
        Self { min: v, max: v }
    }

    fn lerp(a: Span, b: Span, t: f32) -> Span {
        Span::new(lerp(a.min, b.min, t), lerp(a.max, b.max, t))
    }

    pub fn contains(&self, v: f32) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Generation parameters for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DifficultyParameters {
    /// Vertical opening between pipes (px)
    pub gap: Span,
    /// Horizontal distance to the previous pipe pair (px)
    pub spacing: Span,
    /// Pipe scroll speed (px/s) for flappy, ticks per second for snake
    pub speed: f32,
}

/// Per-game preset table
#[derive(Debug, Clone, Copy)]
pub struct DifficultyTable {
    pub easy: DifficultyParameters,
    pub normal: DifficultyParameters,
    pub hard: DifficultyParameters,
    /// Score at which adaptive mode reaches the hard preset
    pub score_ceiling: f32,
    /// Adaptive layout jitter (±px)
    pub gap_jitter: i32,
    pub spacing_jitter: i32,
}

pub const FLAPPY_TABLE: DifficultyTable = DifficultyTable {
    easy: DifficultyParameters {
        gap: Span::new(150.0, 250.0),
        spacing: Span::new(400.0, 450.0),
        speed: 360.0,
    },
    normal: DifficultyParameters {
        gap: Span::new(140.0, 190.0),
        spacing: Span::new(350.0, 400.0),
        speed: 400.0,
    },
    hard: DifficultyParameters {
        gap: Span::new(100.0, 150.0),
        spacing: Span::new(300.0, 350.0),
        speed: 440.0,
    },
    score_ceiling: 60.0,
    gap_jitter: 5,
    spacing_jitter: 8,
};

/// Snake only uses `speed`; gap and spacing stay zero
pub const SNAKE_TABLE: DifficultyTable = DifficultyTable {
    easy: DifficultyParameters {
        gap: Span::point(0.0),
        spacing: Span::point(0.0),
        speed: 10.0,
    },
    normal: DifficultyParameters {
        gap: Span::point(0.0),
        spacing: Span::point(0.0),
        speed: 12.0,
    },
    hard: DifficultyParameters {
        gap: Span::point(0.0),
        spacing: Span::point(0.0),
        speed: 15.0,
    },
    score_ceiling: 15.0,
    gap_jitter: 0,
    spacing_jitter: 0,
};

impl DifficultyTable {
    pub fn for_game(kind: GameKind) -> &'static DifficultyTable {
        match kind {
            GameKind::Flappy => &FLAPPY_TABLE,
            GameKind::Snake => &SNAKE_TABLE,
        }
    }

    /// Fixed preset for a mode (None for adaptive)
    pub fn preset(&self, mode: DifficultyMode) -> Option<&DifficultyParameters> {
        match mode {
            DifficultyMode::Easy => Some(&self.easy),
            DifficultyMode::Normal => Some(&self.normal),
            DifficultyMode::Hard => Some(&self.hard),
            DifficultyMode::Adaptive => None,
        }
    }

    /// Widest legal gap range: hardest minimum to easiest maximum
    pub fn gap_envelope(&self) -> Span {
        Span::new(self.hard.gap.min, self.easy.gap.max)
    }

    pub fn spacing_envelope(&self) -> Span {
        Span::new(self.hard.spacing.min, self.easy.spacing.max)
    }
}

#[inline]
fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// `3t² - 2t³` on a clamped `t`
#[inline]
pub fn smoothstep(t: f32) -> f32 {
    let t = t.clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Compute generation parameters for the current tick.
///
/// `elapsed_secs` is part of the input so callers always pass the full
/// round context; the current curves are score-driven only.
pub fn compute_parameters(
    table: &DifficultyTable,
    score: u32,
    _elapsed_secs: f32,
    mode: DifficultyMode,
) -> DifficultyParameters {
    if let Some(preset) = table.preset(mode) {
        return *preset;
    }

    let t = smoothstep(score as f32 / table.score_ceiling);
    DifficultyParameters {
        gap: Span::lerp(table.easy.gap, table.hard.gap, t),
        spacing: Span::lerp(table.easy.spacing, table.hard.spacing, t),
        speed: lerp(table.easy.speed, table.hard.speed, t),
    }
}

/// Concrete placement drawn from a parameter set
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layout {
    pub gap: f32,
    pub spacing: f32,
}

/// Difficulty for one game and mode
#[derive(Debug, Clone, Copy)]
pub struct DifficultyController {
    table: &'static DifficultyTable,
    mode: DifficultyMode,
}

impl DifficultyController {
    pub fn new(kind: GameKind, mode: DifficultyMode) -> Self {
        Self {
            table: DifficultyTable::for_game(kind),
            mode,
        }
    }

    pub fn mode(&self) -> DifficultyMode {
        self.mode
    }

    pub fn table(&self) -> &'static DifficultyTable {
        self.table
    }

    pub fn parameters(&self, score: u32, elapsed_secs: f32) -> DifficultyParameters {
        compute_parameters(self.table, score, elapsed_secs, self.mode)
    }

    /// Draw a gap/spacing pair. Adaptive mode adds jitter, clamped to the envelope.
    pub fn sample_layout<R: Rng>(&self, params: &DifficultyParameters, rng: &mut R) -> Layout {
        let mut gap = sample_span(params.gap, rng);
        let mut spacing = sample_span(params.spacing, rng);

        if self.mode == DifficultyMode::Adaptive {
            let gap_env = self.table.gap_envelope();
            let spacing_env = self.table.spacing_envelope();
            let gj = self.table.gap_jitter;
            let sj = self.table.spacing_jitter;
            gap = (gap + rng.random_range(-gj..=gj) as f32).clamp(gap_env.min, gap_env.max);
            spacing = (spacing + rng.random_range(-sj..=sj) as f32)
                .clamp(spacing_env.min, spacing_env.max);
        }

        Layout { gap, spacing }
    }
}

/// Whole-pixel draw from a span
fn sample_span<R: Rng>(span: Span, rng: &mut R) -> f32 {
    let lo = span.min.round() as i32;
    let hi = (span.max.round() as i32).max(lo);
    rng.random_range(lo..=hi) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn between(v: f32, a: f32, b: f32) -> bool {
        v >= a.min(b) - 1e-3 && v <= a.max(b) + 1e-3
    }

    #[test]
    fn test_presets_ignore_score() {
        let easy = compute_parameters(&FLAPPY_TABLE, 0, 0.0, DifficultyMode::Easy);
        let later = compute_parameters(&FLAPPY_TABLE, 500, 90.0, DifficultyMode::Easy);
        assert_eq!(easy, later);
        assert_eq!(easy.speed, 360.0);
    }

    #[test]
    fn test_adaptive_endpoints() {
        let start = compute_parameters(&FLAPPY_TABLE, 0, 0.0, DifficultyMode::Adaptive);
        assert_eq!(start, FLAPPY_TABLE.easy);

        let end = compute_parameters(&FLAPPY_TABLE, 60, 0.0, DifficultyMode::Adaptive);
        assert_eq!(end, FLAPPY_TABLE.hard);

        // Midpoint of smoothstep is exactly half way
        let mid = compute_parameters(&FLAPPY_TABLE, 30, 0.0, DifficultyMode::Adaptive);
        assert!((mid.speed - 400.0).abs() < 1e-3);
    }

    #[test]
    fn test_mode_parse_falls_back_to_adaptive() {
        assert_eq!(DifficultyMode::parse("HARD"), DifficultyMode::Hard);
        assert_eq!(DifficultyMode::parse("auto"), DifficultyMode::Adaptive);
        assert_eq!(DifficultyMode::parse("nightmare"), DifficultyMode::Adaptive);
        let mode: DifficultyMode = serde_json::from_str("\"extreme\"").unwrap();
        assert_eq!(mode, DifficultyMode::Adaptive);
        assert_eq!(serde_json::to_string(&DifficultyMode::Normal).unwrap(), "\"normal\"");
    }

    #[test]
    fn test_snake_speed_curve() {
        let c = DifficultyController::new(GameKind::Snake, DifficultyMode::Adaptive);
        assert_eq!(c.parameters(0, 0.0).speed, 10.0);
        assert_eq!(c.parameters(15, 0.0).speed, 15.0);
        assert_eq!(c.parameters(400, 0.0).speed, 15.0);
    }

    proptest! {
        #[test]
        fn prop_parameters_within_envelope(score in 0u32..100_000, elapsed in 0.0f32..3600.0) {
            for table in [&FLAPPY_TABLE, &SNAKE_TABLE] {
                let p = compute_parameters(table, score, elapsed, DifficultyMode::Adaptive);
                prop_assert!(between(p.gap.min, table.easy.gap.min, table.hard.gap.min));
                prop_assert!(between(p.gap.max, table.easy.gap.max, table.hard.gap.max));
                prop_assert!(between(p.spacing.min, table.easy.spacing.min, table.hard.spacing.min));
                prop_assert!(between(p.spacing.max, table.easy.spacing.max, table.hard.spacing.max));
                prop_assert!(between(p.speed, table.easy.speed, table.hard.speed));
            }
        }

        #[test]
        fn prop_jittered_layout_within_envelope(score in 0u32..200, seed in any::<u64>()) {
            let c = DifficultyController::new(GameKind::Flappy, DifficultyMode::Adaptive);
            let mut rng = Pcg32::seed_from_u64(seed);
            let params = c.parameters(score, 0.0);
            let layout = c.sample_layout(&params, &mut rng);
            prop_assert!(FLAPPY_TABLE.gap_envelope().contains(layout.gap));
            prop_assert!(FLAPPY_TABLE.spacing_envelope().contains(layout.spacing));
        }

        #[test]
        fn prop_adaptive_speed_monotonic(a in 0u32..200, b in 0u32..200) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let slow = compute_parameters(&FLAPPY_TABLE, lo, 0.0, DifficultyMode::Adaptive);
            let fast = compute_parameters(&FLAPPY_TABLE, hi, 0.0, DifficultyMode::Adaptive);
            prop_assert!(slow.speed <= fast.speed + 1e-3);
        }
    }
}
