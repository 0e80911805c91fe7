//! Chain Arcade - flappy and snake rounds recorded to an on-chain leaderboard
//!
//! Core modules:
//! - `sim`: Deterministic simulation (clock, difficulty, collisions, outcomes)
//! - `session`: Round lifecycle wiring between the simulation and the chain path
//! - `submission`: Score submission state machine and its async driver
//! - `leaderboard`: Cached, sorted leaderboard projections
//! - `chain`: Ledger client interface, runtime config, client pool
//! - `platform`: Input events and wall-clock time
//! - `persistence`: String-keyed JSON storage (LocalStorage on web)

pub mod chain;
pub mod error;
pub mod format;
pub mod leaderboard;
pub mod persistence;
pub mod platform;
pub mod session;
pub mod settings;
pub mod sim;
pub mod submission;

pub use error::{ChainError, ErrorClass, ReadError, SessionError, SubmitFailure};
pub use leaderboard::{LeaderboardCache, LeaderboardView};
pub use session::Session;
pub use settings::Settings;
pub use sim::{DifficultyMode, GameKind, RoundOutcome};
pub use submission::{ScoreSubmission, SubmitStatus, Submitter};

/// Game configuration constants
pub mod consts {
    /// Flappy simulation timestep (120 Hz for smooth physics)
    pub const FLAPPY_STEP_MS: f64 = 1000.0 / 120.0;
    /// Maximum substeps per advance to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Wall-time clamp for a single advance (tab switches, debugger stops)
    pub const MAX_FRAME_MS: f64 = 250.0;

    /// Countdown counts before ticking (re)starts
    pub const COUNTDOWN_COUNTS: u8 = 3;
    /// Flappy countdown: one count per second
    pub const FLAPPY_COUNTDOWN_STEP_MS: f64 = 1000.0;
    /// Snake countdown is a little snappier
    pub const SNAKE_COUNTDOWN_STEP_MS: f64 = 800.0;

    /// Speed smoothing cadence and strength
    pub const SMOOTHING_PERIOD_MS: f64 = 80.0;
    pub const SMOOTHING_FACTOR: f64 = 0.2;
    pub const SMOOTHING_SNAP: f64 = 0.5;

    /// Flappy playfield (virtual resolution)
    pub const FLAPPY_WIDTH: f32 = 720.0;
    pub const FLAPPY_HEIGHT: f32 = 600.0;
    /// Bird spawn point
    pub const BIRD_START_X: f32 = FLAPPY_WIDTH / 10.0;
    pub const BIRD_START_Y: f32 = FLAPPY_HEIGHT / 2.0;
    /// Bird hitbox (16px sprite at 3x, trimmed vertically)
    pub const BIRD_WIDTH: f32 = 48.0;
    pub const BIRD_HEIGHT: f32 = 40.0;
    /// Downward acceleration (px/s²)
    pub const BIRD_GRAVITY: f32 = 800.0;
    /// Upward velocity applied by a flap (px/s)
    pub const FLAP_VELOCITY: f32 = 350.0;
    /// Pipe pairs kept alive at once
    pub const PIPES_TO_RENDER: usize = 4;
    pub const PIPE_WIDTH: f32 = 39.0;
    /// Minimum distance between a gap and the playfield edge
    pub const PIPE_EDGE_MARGIN: f32 = 20.0;

    /// Snake grid (640x480 canvas with 20px cells)
    pub const GRID_COLUMNS: i32 = 32;
    pub const GRID_ROWS: i32 = 24;
    pub const SNAKE_START: (i32, i32) = (12, 9);
    /// Trail length is score + this
    pub const SNAKE_BASE_TRAIL: usize = 2;
    /// Random food placement attempts before scanning for a free cell
    pub const FOOD_PLACEMENT_ATTEMPTS: u32 = 64;

    /// Default bound on every remote read
    pub const READ_TIMEOUT_MS: u64 = 8_000;
    /// Default leaderboard auto-refresh period
    pub const AUTO_REFRESH_MS: f64 = 30_000.0;
    pub const GLOBAL_TOP_N: usize = 10;
    pub const PLAYER_RECENT_N: usize = 20;
}

/// Install the logger for the current platform.
///
/// Safe to call more than once; later calls are ignored.
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}

/// Install the logger for the current platform.
///
/// Safe to call more than once; later calls are ignored.
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}
