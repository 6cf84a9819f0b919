//! Platform abstraction layer
//!
//! Everything the core asks of its host goes through [`Platform`]:
//! - Sound cues
//! - Particle bursts
//! - Interstitial and reward ads
//! - Player-facing notices
//!
//! Wall-clock time lives here too so the sim never touches it. Ad pacing
//! runs on that wall clock, which keeps moving while a run sits in game over.

use glam::Vec2;
use thiserror::Error;

use crate::audio::SoundEffect;
use crate::consts::AD_FREQUENCY_CAP_MS;
use crate::sim::{BalloonColor, PowerUpKind};

/// Errors reported by platform services
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlatformError {
    #[error("no ad available")]
    AdUnavailable,
    #[error("ad shown too recently")]
    AdFrequencyCapped,
    #[error("platform request failed: {0}")]
    Failed(String),
}

/// Player-facing messages
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    NewGame,
    NewHighScore(i64),
    GameOver,
    TimeUp,
    PowerUp(PowerUpKind),
    ContinueGranted,
    ContinueDenied,
    ContinueUnavailable(String),
    AdUnavailable(String),
    SaveFailed(String),
}

impl Notice {
    pub fn message(&self) -> String {
        match self {
            Notice::NewGame => "New game started".to_string(),
            Notice::NewHighScore(score) => format!("New high score: {}!", score),
            Notice::GameOver => "Game over".to_string(),
            Notice::TimeUp => "Time's up!".to_string(),
            Notice::PowerUp(kind) => format!("{} activated!", kind.label()),
            Notice::ContinueGranted => "Continue! Keep popping".to_string(),
            Notice::ContinueDenied => "Watch the whole ad to continue".to_string(),
            Notice::ContinueUnavailable(reason) => format!("Continue unavailable: {}", reason),
            Notice::AdUnavailable(reason) => format!("Ad unavailable: {}", reason),
            Notice::SaveFailed(reason) => format!("Could not save: {}", reason),
        }
    }
}

/// Host services used by the game controller
pub trait Platform {
    /// Play a cue at `volume` (0.0-1.0)
    fn play_sound(&mut self, effect: SoundEffect, volume: f32);

    /// Burst of particles at a pop position (percent coordinates)
    fn spawn_particle_effect(&mut self, position: Vec2, color: BalloonColor);

    /// Show a full-screen ad when a run ends
    fn show_interstitial_ad(&mut self) -> Result<(), PlatformError>;

    /// Start a reward ad. The outcome arrives later through
    /// `Game::resolve_continue`.
    fn request_reward_ad(&mut self) -> Result<(), PlatformError>;

    /// Surface a message to the player
    fn notify(&mut self, notice: Notice);

    /// Wall-clock milliseconds used to pace ads
    fn now_ms(&self) -> f64 {
        now_ms()
    }
}

/// Headless platform that logs every request and never has ads
#[derive(Debug, Default)]
pub struct LogPlatform;

impl Platform for LogPlatform {
    fn play_sound(&mut self, effect: SoundEffect, volume: f32) {
        log::debug!("Sound {:?} at {:.2}", effect, volume);
    }

    fn spawn_particle_effect(&mut self, position: Vec2, color: BalloonColor) {
        log::trace!("Particles {:?} at ({:.1}, {:.1})", color, position.x, position.y);
    }

    fn show_interstitial_ad(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::AdUnavailable)
    }

    fn request_reward_ad(&mut self) -> Result<(), PlatformError> {
        Err(PlatformError::AdUnavailable)
    }

    fn notify(&mut self, notice: Notice) {
        log::info!("{}", notice.message());
    }
}

/// Minimum wall-clock spacing between two ads of one kind
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AdPacing {
    last_shown_ms: Option<f64>,
}

impl AdPacing {
    pub fn can_show(&self, now_ms: f64) -> bool {
        self.last_shown_ms
            .is_none_or(|last| now_ms - last >= AD_FREQUENCY_CAP_MS as f64)
    }

    pub fn record(&mut self, now_ms: f64) {
        self.last_shown_ms = Some(now_ms);
    }
}

/// Wall-clock time in milliseconds since the Unix epoch
#[cfg(not(target_arch = "wasm32"))]
pub fn now_ms() -> f64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

/// Wall-clock time in milliseconds since the Unix epoch
#[cfg(target_arch = "wasm32")]
pub fn now_ms() -> f64 {
    js_sys::Date::now()
}
