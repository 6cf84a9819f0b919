//! Data-driven game balance
//!
//! Difficulty profiles are fixed per session; `GameConfig` carries the
//! gameplay policies that differ between variants of the rules.

use serde::{Deserialize, Serialize};

use crate::settings::Difficulty;

/// Immutable per-session balance parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub initial_lives: u32,
    /// Starting balloon cadence
    pub spawn_interval_ms: u32,
    /// Fastest crossing (shortest transit)
    pub min_transit_ms: u32,
    /// Slowest crossing (longest transit)
    pub max_transit_ms: u32,
    /// Time attack countdown
    pub time_attack_ms: u32,
}

impl DifficultyProfile {
    pub const EASY: Self = Self {
        initial_lives: 7,
        spawn_interval_ms: 1_800,
        min_transit_ms: 5_000,
        max_transit_ms: 8_000,
        time_attack_ms: 90_000,
    };

    pub const MEDIUM: Self = Self {
        initial_lives: 5,
        spawn_interval_ms: 1_500,
        min_transit_ms: 4_000,
        max_transit_ms: 7_000,
        time_attack_ms: 60_000,
    };

    pub const HARD: Self = Self {
        initial_lives: 3,
        spawn_interval_ms: 1_200,
        min_transit_ms: 3_000,
        max_transit_ms: 5_000,
        time_attack_ms: 45_000,
    };

    pub fn for_difficulty(difficulty: Difficulty) -> Self {
        match difficulty {
            Difficulty::Easy => Self::EASY,
            Difficulty::Medium => Self::MEDIUM,
            Difficulty::Hard => Self::HARD,
        }
    }
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Self::MEDIUM
    }
}

/// What a bomb balloon costs when it escapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BombMissPolicy {
    /// Letting a bomb go is the right play: no life lost
    #[default]
    Free,
    /// Every escaped balloon costs a life, bombs included
    CostsLife,
}

/// Rule variants chosen per session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    #[serde(default)]
    pub bomb_miss_policy: BombMissPolicy,
    /// Whether multi-pop clears neighbouring balloons (off = flag only)
    #[serde(default = "default_true")]
    pub multi_pop_chains: bool,
}

fn default_true() -> bool {
    true
}

impl GameConfig {
    pub fn new() -> Self {
        Self {
            bomb_miss_policy: BombMissPolicy::Free,
            multi_pop_chains: true,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::new()
    }
}
