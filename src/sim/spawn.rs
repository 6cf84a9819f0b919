//! Entity factory and spawn scheduling
//!
//! The factory functions are pure apart from the RNG they draw from. The
//! scheduler is a pair of countdowns that only move when the session is
//! ticked while playing, so pausing needs no special handling here.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::state::{Balloon, BalloonColor, BalloonKind, EntityId, PowerUp, PowerUpKind, Transit};
use crate::consts::*;
use crate::tuning::DifficultyProfile;

/// Map a uniform roll in [0, 1) to a balloon kind (5% golden, 5% bomb)
pub fn roll_balloon_kind(roll: f32) -> BalloonKind {
    if roll >= GOLDEN_THRESHOLD {
        BalloonKind::Golden
    } else if roll >= BOMB_THRESHOLD {
        BalloonKind::Bomb
    } else {
        BalloonKind::Normal
    }
}

fn roll_x(rng: &mut impl Rng) -> f32 {
    rng.random_range(SPAWN_X_MIN..=SPAWN_X_MAX)
}

fn roll_transit_ms(rng: &mut impl Rng, profile: &DifficultyProfile) -> u32 {
    rng.random_range(profile.min_transit_ms..=profile.max_transit_ms)
}

/// Create a balloon. Slow motion stretches the crossing by half again.
pub fn spawn_balloon(
    rng: &mut impl Rng,
    id: EntityId,
    profile: &DifficultyProfile,
    slow_mo: bool,
    now_ms: u64,
) -> Balloon {
    let palette_color = BalloonColor::PALETTE[rng.random_range(0..BalloonColor::PALETTE.len())];
    let mut transit_ms = roll_transit_ms(rng, profile);
    if slow_mo {
        transit_ms += transit_ms / 2;
    }
    let x = roll_x(rng);
    let kind = roll_balloon_kind(rng.random::<f32>());

    let color = match kind {
        BalloonKind::Normal => palette_color,
        BalloonKind::Golden => BalloonColor::Gold,
        BalloonKind::Bomb => BalloonColor::Black,
    };

    Balloon {
        id,
        kind,
        color,
        x,
        transit: Transit::new(transit_ms, now_ms),
    }
}

/// Create a power-up of a uniformly chosen kind
pub fn spawn_power_up(
    rng: &mut impl Rng,
    id: EntityId,
    profile: &DifficultyProfile,
    now_ms: u64,
) -> PowerUp {
    let kind = PowerUpKind::ALL[rng.random_range(0..PowerUpKind::ALL.len())];
    let transit_ms = roll_transit_ms(rng, profile);
    let x = roll_x(rng);

    PowerUp {
        id,
        kind,
        x,
        transit: Transit::new(transit_ms, now_ms),
    }
}

/// Spawns that came due during one tick, as the time each has already
/// been on screen by the end of the tick (oldest first)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpawnDue {
    pub balloon_ages_ms: Vec<u32>,
    /// Power-up slots; each still has to pass the spawn chance roll
    pub power_up_ages_ms: Vec<u32>,
}

/// Balloon and power-up cadence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnScheduler {
    /// Current balloon cadence
    pub spawn_interval_ms: u32,
    /// Time until the next balloon
    pub balloon_countdown_ms: u32,
    /// Time until the next power-up roll
    pub power_up_countdown_ms: u32,
    /// Highest score milestone reached so far
    pub milestones: u32,
    base_interval_ms: u32,
}

impl SpawnScheduler {
    pub fn new(profile: &DifficultyProfile) -> Self {
        let base = profile.spawn_interval_ms.max(MIN_SPAWN_INTERVAL_MS);
        Self {
            spawn_interval_ms: base,
            balloon_countdown_ms: base,
            power_up_countdown_ms: POWER_UP_SPAWN_INTERVAL_MS,
            milestones: 0,
            base_interval_ms: base,
        }
    }

    /// Cadence for a milestone count: 100 ms faster per milestone, floored
    pub fn interval_for(base_interval_ms: u32, milestones: u32) -> u32 {
        base_interval_ms
            .saturating_sub(milestones.saturating_mul(SPAWN_INTERVAL_STEP_MS))
            .max(MIN_SPAWN_INTERVAL_MS)
    }

    /// Update milestones from the current score.
    /// Returns the new interval when the cadence changed.
    pub fn record_score(&mut self, score: i64) -> Option<u32> {
        let reached = (score.max(0) / SCORE_MILESTONE) as u32;
        if reached <= self.milestones {
            return None;
        }
        self.milestones = reached;
        let interval = Self::interval_for(self.base_interval_ms, reached);
        if interval == self.spawn_interval_ms {
            return None;
        }
        self.spawn_interval_ms = interval;
        Some(interval)
    }

    /// Run both countdowns forward by `dt_ms`. A countdown that fires is
    /// re-armed with the cadence in effect at that moment.
    pub fn advance(&mut self, dt_ms: u32) -> SpawnDue {
        let interval = self.spawn_interval_ms;
        SpawnDue {
            balloon_ages_ms: run_countdown(&mut self.balloon_countdown_ms, interval, dt_ms),
            power_up_ages_ms: run_countdown(
                &mut self.power_up_countdown_ms,
                POWER_UP_SPAWN_INTERVAL_MS,
                dt_ms,
            ),
        }
    }
}

/// Returns, for each firing, how much of `dt_ms` was left after it
fn run_countdown(countdown: &mut u32, period: u32, dt_ms: u32) -> Vec<u32> {
    debug_assert!(period > 0);
    let mut left = dt_ms;
    let mut fired = Vec::new();
    while left >= *countdown {
        left -= *countdown;
        fired.push(left);
        *countdown = period;
    }
    *countdown -= left;
    fired
}
