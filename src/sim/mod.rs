//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Time only advances through `tick` (integer milliseconds)
//! - Seeded RNG only
//! - Stable iteration order (by entity ID)
//! - No platform, storage or audio dependencies

pub mod spawn;
pub mod state;
pub mod tick;

pub use spawn::{SpawnDue, SpawnScheduler, roll_balloon_kind, spawn_balloon, spawn_power_up};
pub use state::{
    ActiveEffects, Balloon, BalloonColor, BalloonKind, EntityId, GameEvent, GameMode,
    GameOverReason, GamePhase, GameState, Lives, PowerUp, PowerUpKind, Transit,
};
pub use tick::{TickInput, begin_continue, finish_continue, pause, pop, resume, tick};
