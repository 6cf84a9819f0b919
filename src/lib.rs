//! Balloon Pop - A casual balloon popping arcade game
//!
//! Core modules:
//! - `sim`: Deterministic simulation (spawning, entity lifecycle, scoring)
//! - `game`: Session controller (mode select, pause, game over, continue)
//! - `platform`: Sound/particle/ad/notice collaborators
//! - `persistence`: Key-value storage backends
//! - `tuning`: Data-driven game balance

pub mod audio;
pub mod game;
pub mod highscores;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod sim;
pub mod tuning;

pub use game::{Game, Snapshot};
pub use highscores::ScoreBook;
pub use settings::{Difficulty, Settings};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Fixed simulation timestep (100 Hz keeps every timer a whole number of steps)
    pub const SIM_DT_MS: u32 = 10;
    /// Longest frame the host loop will simulate before dropping time
    pub const MAX_FRAME_MS: u32 = 100;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 10;

    /// Horizontal spawn band in percent of the play area width
    pub const SPAWN_X_MIN: f32 = 5.0;
    pub const SPAWN_X_MAX: f32 = 90.0;

    /// Balloon kind roll thresholds (roll >= threshold)
    pub const GOLDEN_THRESHOLD: f32 = 0.95;
    pub const BOMB_THRESHOLD: f32 = 0.90;

    /// Points per balloon kind
    pub const NORMAL_POINTS: i64 = 10;
    pub const GOLDEN_POINTS: i64 = 50;
    pub const BOMB_POINTS: i64 = -20;

    /// Spawn cadence progression
    pub const SCORE_MILESTONE: i64 = 50;
    pub const SPAWN_INTERVAL_STEP_MS: u32 = 100;
    pub const MIN_SPAWN_INTERVAL_MS: u32 = 800;

    /// Power-up spawner
    pub const POWER_UP_SPAWN_INTERVAL_MS: u32 = 5_000;
    pub const POWER_UP_SPAWN_CHANCE: f64 = 0.3;

    /// Power-up durations
    pub const SLOW_MO_DURATION_MS: u32 = 10_000;
    pub const DOUBLE_SCORE_DURATION_MS: u32 = 10_000;
    pub const MULTI_POP_DURATION_MS: u32 = 5_000;

    /// Horizontal reach of a multi-pop (percent of width)
    pub const MULTI_POP_RADIUS: f32 = 12.0;

    /// Continue grants
    pub const CONTINUE_LIVES: u32 = 1;
    pub const CONTINUE_BONUS_MS: u32 = 15_000;

    /// Minimum game clock between two ads
    pub const AD_FREQUENCY_CAP_MS: u64 = 30_000;

    /// Base gain applied to sound volume (0-100 setting)
    pub const SFX_GAIN: f32 = 0.3;
}

/// Play-area position of an entity: x is the horizontal percent, y is the
/// percent of the climb completed (0 = bottom edge, 100 = top edge).
#[inline]
pub fn screen_position(x: f32, progress: f32) -> Vec2 {
    Vec2::new(x, progress.clamp(0.0, 1.0) * 100.0)
}

/// Initialize the logger for the current target
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Initialize the logger for the current target
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);
}
