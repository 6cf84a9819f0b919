//! Game state and core simulation types
//!
//! Everything a session needs to resume deterministically lives here.

use glam::Vec2;
use rand::SeedableRng;
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::spawn::SpawnScheduler;
use crate::consts::*;
use crate::screen_position;
use crate::tuning::{DifficultyProfile, GameConfig};

/// Entity identifier, unique within a session
pub type EntityId = u32;

/// Game modes offered at mode select
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    /// Limited lives, play until they run out
    Classic,
    /// Limited lives and a countdown
    TimeAttack,
    /// No lives, play as long as you like
    Endless,
}

impl GameMode {
    pub const ALL: [GameMode; 3] = [GameMode::Classic, GameMode::TimeAttack, GameMode::Endless];

    pub fn as_str(&self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::TimeAttack => "timeattack",
            GameMode::Endless => "endless",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "classic" => Some(GameMode::Classic),
            "timeattack" | "time-attack" | "time_attack" => Some(GameMode::TimeAttack),
            "endless" => Some(GameMode::Endless),
            _ => None,
        }
    }

    /// Whether misses cost lives in this mode
    pub fn uses_lives(&self) -> bool {
        !matches!(self, GameMode::Endless)
    }

    pub fn is_timed(&self) -> bool {
        matches!(self, GameMode::TimeAttack)
    }
}

/// Current phase of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GamePhase {
    /// Active gameplay
    Playing,
    /// Frozen by the player
    Paused,
    /// Run ended
    GameOver,
    /// Run ended, continue reward ad in flight
    AwaitingReward,
}

impl GamePhase {
    pub fn is_over(&self) -> bool {
        matches!(self, GamePhase::GameOver | GamePhase::AwaitingReward)
    }
}

/// Why a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    LivesDepleted,
    TimeUp,
}

/// Remaining lives; endless sessions never count down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Lives {
    Limited(u32),
    Unlimited,
}

impl Lives {
    pub fn for_mode(mode: GameMode, initial: u32) -> Self {
        if mode.uses_lives() {
            Lives::Limited(initial)
        } else {
            Lives::Unlimited
        }
    }

    /// Remove one life (never below zero)
    pub fn lose_one(&mut self) {
        if let Lives::Limited(n) = self {
            *n = n.saturating_sub(1);
        }
    }

    /// Returns false when there is nothing to add to
    pub fn gain_one(&mut self) -> bool {
        match self {
            Lives::Limited(n) => {
                *n = n.saturating_add(1);
                true
            }
            Lives::Unlimited => false,
        }
    }

    pub fn is_depleted(&self) -> bool {
        matches!(self, Lives::Limited(0))
    }

    pub fn count(&self) -> Option<u32> {
        match self {
            Lives::Limited(n) => Some(*n),
            Lives::Unlimited => None,
        }
    }
}

/// Balloon color palette
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BalloonColor {
    Red,
    Blue,
    Green,
    Yellow,
    Purple,
    Orange,
    Pink,
    Cyan,
    /// Golden balloons
    Gold,
    /// Bomb balloons
    Black,
}

impl BalloonColor {
    /// Colors a normal balloon can spawn with
    pub const PALETTE: [BalloonColor; 8] = [
        BalloonColor::Red,
        BalloonColor::Blue,
        BalloonColor::Green,
        BalloonColor::Yellow,
        BalloonColor::Purple,
        BalloonColor::Orange,
        BalloonColor::Pink,
        BalloonColor::Cyan,
    ];
}

/// Balloon types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BalloonKind {
    #[default]
    Normal,
    Golden,
    Bomb,
}

impl BalloonKind {
    /// Base points awarded for popping
    pub fn points(&self) -> i64 {
        match self {
            BalloonKind::Normal => NORMAL_POINTS,
            BalloonKind::Golden => GOLDEN_POINTS,
            BalloonKind::Bomb => BOMB_POINTS,
        }
    }

    /// Points after score multipliers; penalties are never multiplied
    pub fn points_with(&self, double_score: bool) -> i64 {
        let base = self.points();
        if double_score && base > 0 { base * 2 } else { base }
    }
}

/// Power-up types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PowerUpKind {
    SlowMo,
    ExtraLife,
    DoubleScore,
    MultiPop,
}

impl PowerUpKind {
    pub const ALL: [PowerUpKind; 4] = [
        PowerUpKind::SlowMo,
        PowerUpKind::ExtraLife,
        PowerUpKind::DoubleScore,
        PowerUpKind::MultiPop,
    ];

    /// How long the effect stays active (None = instantaneous)
    pub fn duration_ms(&self) -> Option<u32> {
        match self {
            PowerUpKind::SlowMo => Some(SLOW_MO_DURATION_MS),
            PowerUpKind::ExtraLife => None,
            PowerUpKind::DoubleScore => Some(DOUBLE_SCORE_DURATION_MS),
            PowerUpKind::MultiPop => Some(MULTI_POP_DURATION_MS),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PowerUpKind::SlowMo => "Slow Motion",
            PowerUpKind::ExtraLife => "Extra Life",
            PowerUpKind::DoubleScore => "Double Score",
            PowerUpKind::MultiPop => "Multi Pop",
        }
    }
}

/// Crossing timer shared by balloons and power-ups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transit {
    /// Total time to cross the play area
    pub duration_ms: u32,
    /// Unpaused time left before the entity escapes
    pub remaining_ms: u32,
    /// Session clock at spawn
    pub spawned_at_ms: u64,
}

impl Transit {
    pub fn new(duration_ms: u32, spawned_at_ms: u64) -> Self {
        Self {
            duration_ms,
            remaining_ms: duration_ms,
            spawned_at_ms,
        }
    }

    /// Advance by `dt_ms`; returns true once the entity has escaped
    pub fn advance(&mut self, dt_ms: u32) -> bool {
        self.remaining_ms = self.remaining_ms.saturating_sub(dt_ms);
        self.remaining_ms == 0
    }

    pub fn has_escaped(&self) -> bool {
        self.remaining_ms == 0
    }

    /// Fraction of the crossing completed (0-1)
    pub fn progress(&self) -> f32 {
        if self.duration_ms == 0 {
            return 1.0;
        }
        1.0 - self.remaining_ms as f32 / self.duration_ms as f32
    }
}

/// A balloon entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Balloon {
    pub id: EntityId,
    pub kind: BalloonKind,
    pub color: BalloonColor,
    /// Horizontal position (percent of width)
    pub x: f32,
    pub transit: Transit,
}

impl Balloon {
    pub fn position(&self) -> Vec2 {
        screen_position(self.x, self.transit.progress())
    }
}

/// A power-up entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PowerUp {
    pub id: EntityId,
    pub kind: PowerUpKind,
    /// Horizontal position (percent of width)
    pub x: f32,
    pub transit: Transit,
}

impl PowerUp {
    pub fn position(&self) -> Vec2 {
        screen_position(self.x, self.transit.progress())
    }
}

/// Active power-up effects (remaining ms, 0 = inactive)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveEffects {
    pub slow_mo_ms: u32,
    pub double_score_ms: u32,
    pub multi_pop_ms: u32,
}

impl ActiveEffects {
    fn slot(&mut self, kind: PowerUpKind) -> Option<&mut u32> {
        match kind {
            PowerUpKind::SlowMo => Some(&mut self.slow_mo_ms),
            PowerUpKind::DoubleScore => Some(&mut self.double_score_ms),
            PowerUpKind::MultiPop => Some(&mut self.multi_pop_ms),
            PowerUpKind::ExtraLife => None,
        }
    }

    pub fn remaining_ms(&self, kind: PowerUpKind) -> u32 {
        match kind {
            PowerUpKind::SlowMo => self.slow_mo_ms,
            PowerUpKind::DoubleScore => self.double_score_ms,
            PowerUpKind::MultiPop => self.multi_pop_ms,
            PowerUpKind::ExtraLife => 0,
        }
    }

    pub fn is_active(&self, kind: PowerUpKind) -> bool {
        self.remaining_ms(kind) > 0
    }

    /// Arm (or re-arm to the full duration) a timed effect.
    /// Returns false for instantaneous kinds.
    pub fn activate(&mut self, kind: PowerUpKind) -> bool {
        match (self.slot(kind), kind.duration_ms()) {
            (Some(slot), Some(duration)) => {
                *slot = duration;
                true
            }
            _ => false,
        }
    }

    /// Count effects down; returns the kinds that just expired
    pub fn decay(&mut self, dt_ms: u32) -> Vec<PowerUpKind> {
        let mut expired = Vec::new();
        for kind in PowerUpKind::ALL {
            if let Some(slot) = self.slot(kind) {
                if *slot > 0 {
                    *slot = slot.saturating_sub(dt_ms);
                    if *slot == 0 {
                        expired.push(kind);
                    }
                }
            }
        }
        expired
    }

    /// Currently active kinds, in declaration order
    pub fn active_kinds(&self) -> Vec<PowerUpKind> {
        PowerUpKind::ALL
            .into_iter()
            .filter(|k| self.is_active(*k))
            .collect()
    }
}

/// Events emitted by the simulation for the host to react to
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    BalloonSpawned { id: EntityId, kind: BalloonKind },
    PowerUpSpawned { id: EntityId, kind: PowerUpKind },
    BalloonPopped {
        id: EntityId,
        kind: BalloonKind,
        color: BalloonColor,
        points: i64,
        position: Vec2,
    },
    BalloonMissed {
        id: EntityId,
        kind: BalloonKind,
        life_lost: bool,
    },
    PowerUpCollected { id: EntityId, kind: PowerUpKind },
    PowerUpMissed { id: EntityId, kind: PowerUpKind },
    PowerUpExpired { kind: PowerUpKind },
    SpawnIntervalChanged { interval_ms: u32 },
    Paused,
    Resumed,
    GameOver { reason: GameOverReason, score: i64 },
    /// Reward granted, play resumes from where it ended
    Continued,
}

/// Complete session state (deterministic, serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    /// Session seed for reproducibility
    pub seed: u64,
    pub(crate) rng: Pcg32,
    pub mode: GameMode,
    pub profile: DifficultyProfile,
    pub config: GameConfig,
    pub phase: GamePhase,
    /// Score (bombs can take it below zero)
    pub score: i64,
    pub lives: Lives,
    /// Countdown, present only in time attack
    pub time_remaining_ms: Option<u32>,
    /// Unpaused session time
    pub clock_ms: u64,
    pub scheduler: SpawnScheduler,
    pub effects: ActiveEffects,
    /// Active balloons (sorted by id)
    pub balloons: Vec<Balloon>,
    /// Active power-ups (sorted by id)
    pub power_ups: Vec<PowerUp>,
    pub game_over_reason: Option<GameOverReason>,
    /// The one-time continue has been spent
    pub continue_used: bool,
    /// Next entity ID
    next_id: EntityId,
}

impl GameState {
    /// Create a new session in `Playing`
    pub fn new(seed: u64, mode: GameMode, profile: DifficultyProfile, config: GameConfig) -> Self {
        Self {
            seed,
            rng: Pcg32::seed_from_u64(seed),
            mode,
            profile,
            config,
            phase: GamePhase::Playing,
            score: 0,
            lives: Lives::for_mode(mode, profile.initial_lives),
            time_remaining_ms: mode.is_timed().then_some(profile.time_attack_ms),
            clock_ms: 0,
            scheduler: SpawnScheduler::new(&profile),
            effects: ActiveEffects::default(),
            balloons: Vec::new(),
            power_ups: Vec::new(),
            game_over_reason: None,
            continue_used: false,
            next_id: 1,
        }
    }

    /// Allocate a new entity ID
    pub fn next_entity_id(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// Whole seconds left on the countdown (rounded up)
    pub fn time_remaining_secs(&self) -> Option<u32> {
        self.time_remaining_ms.map(|ms| ms.div_ceil(1000))
    }

    /// Number of live entities of either type
    pub fn active_entities(&self) -> usize {
        self.balloons.len() + self.power_ups.len()
    }

    pub fn balloon(&self, id: EntityId) -> Option<&Balloon> {
        self.balloons.iter().find(|b| b.id == id)
    }

    pub fn power_up(&self, id: EntityId) -> Option<&PowerUp> {
        self.power_ups.iter().find(|p| p.id == id)
    }
}
