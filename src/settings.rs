//! Game settings and preferences
//!
//! Persisted separately from scores under their own storage key.

use serde::{Deserialize, Serialize};

use crate::persistence::{self, Storage, StorageError};

/// Maximum characters kept from a display name
pub const MAX_DISPLAY_NAME_LEN: usize = 20;

/// Difficulty levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" | "med" | "normal" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    /// Short description shown next to the selector
    pub fn description(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Slower balloons, more time",
            Difficulty::Medium => "Balanced gameplay",
            Difficulty::Hard => "Faster balloons, less time",
        }
    }
}

/// Player preferences
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Name recorded with saved scores
    pub display_name: String,
    pub difficulty: Difficulty,

    // === Audio ===
    pub sound_enabled: bool,
    /// Sound volume (0 - 100)
    pub sound_volume: u8,

    // === Visual Effects ===
    /// Particle bursts when popping balloons
    pub particles_enabled: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display_name: "Player".to_string(),
            difficulty: Difficulty::Medium,
            sound_enabled: true,
            sound_volume: 70,
            particles_enabled: true,
        }
    }
}

impl Settings {
    /// Storage key
    pub const STORAGE_KEY: &'static str = "balloon_pop_settings";

    /// Set the display name, trimmed and capped at `MAX_DISPLAY_NAME_LEN` chars.
    /// An empty name falls back to the default.
    pub fn set_display_name(&mut self, name: &str) {
        let trimmed: String = name.trim().chars().take(MAX_DISPLAY_NAME_LEN).collect();
        self.display_name = if trimmed.is_empty() {
            Self::default().display_name
        } else {
            trimmed
        };
    }

    /// Clamp out-of-range values coming from older or hand-edited records
    pub fn sanitized(mut self) -> Self {
        self.sound_volume = self.sound_volume.min(100);
        let name = self.display_name.clone();
        self.set_display_name(&name);
        self
    }

    /// Effective output gain (0 when sound is off)
    pub fn effective_volume(&self) -> f32 {
        if !self.sound_enabled {
            0.0
        } else {
            (self.sound_volume.min(100) as f32 / 100.0) * crate::consts::SFX_GAIN
        }
    }

    /// Load settings, falling back to defaults on missing or corrupt records
    pub fn load(storage: &impl Storage) -> Self {
        match persistence::load_json::<Settings>(storage, Self::STORAGE_KEY) {
            Ok(Some(settings)) => {
                log::info!("Loaded settings");
                settings.sanitized()
            }
            Ok(None) => {
                log::info!("Using default settings");
                Self::default()
            }
            Err(e) => {
                log::warn!("Settings unreadable ({}), using defaults", e);
                Self::default()
            }
        }
    }

    /// Save settings
    pub fn save(&self, storage: &mut impl Storage) -> Result<(), StorageError> {
        persistence::save_json(storage, Self::STORAGE_KEY, self)?;
        log::info!("Settings saved");
        Ok(())
    }
}
