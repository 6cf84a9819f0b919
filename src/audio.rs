//! Sound effect cues
//!
//! The core never synthesizes audio. It names the cue and describes the
//! tone sweep; the platform decides how to play it.

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Sound effect types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SoundEffect {
    /// Balloon popped
    Pop,
    /// Power-up collected
    PowerUp,
    /// Run ended
    GameOver,
}

/// Exponential frequency sweep with a matching gain fade
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ToneSweep {
    pub start_hz: f32,
    pub end_hz: f32,
    pub duration_secs: f32,
}

impl SoundEffect {
    /// Falling chirp for pops, rising for power-ups, long fall for game over
    pub fn sweep(&self) -> ToneSweep {
        match self {
            SoundEffect::Pop => ToneSweep {
                start_hz: 800.0,
                end_hz: 200.0,
                duration_secs: 0.1,
            },
            SoundEffect::PowerUp => ToneSweep {
                start_hz: 400.0,
                end_hz: 800.0,
                duration_secs: 0.2,
            },
            SoundEffect::GameOver => ToneSweep {
                start_hz: 400.0,
                end_hz: 100.0,
                duration_secs: 0.5,
            },
        }
    }
}

/// Gate cues on the player's sound settings
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundMixer {
    volume: f32,
}

impl SoundMixer {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            volume: settings.effective_volume(),
        }
    }

    /// Volume to play `effect` at, or None when muted
    pub fn volume_for(&self, _effect: SoundEffect) -> Option<f32> {
        (self.volume > 0.0).then_some(self.volume)
    }

    pub fn is_muted(&self) -> bool {
        self.volume <= 0.0
    }
}
