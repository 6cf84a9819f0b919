//! Score history, high score and lifetime stats
//!
//! Three records under separate storage keys so a corrupt one never takes
//! the others down with it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::persistence::{self, Storage, StorageError};
use crate::sim::GameMode;

/// Maximum number of score entries to keep
pub const MAX_SCORE_ENTRIES: usize = 50;

/// A single finished run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    /// Session id; a session that is continued and ends again updates its entry
    pub id: u64,
    pub player_name: String,
    pub score: i64,
    pub mode: GameMode,
    /// Unix timestamp (ms) when recorded
    pub timestamp: f64,
}

/// Last run folded into the stats, so a continued run replaces its
/// earlier contribution instead of counting twice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct LastRun {
    id: u64,
    score: i64,
    duration_secs: u64,
}

/// Lifetime totals
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameStats {
    pub total_games: u32,
    pub total_score: i64,
    pub total_play_time_secs: u64,
    pub games_by_mode: BTreeMap<GameMode, u32>,
    last_run: Option<LastRun>,
}

impl GameStats {
    /// Fold a finished run into the totals
    pub fn record(&mut self, id: u64, mode: GameMode, score: i64, duration_secs: u64) {
        match self.last_run.filter(|run| run.id == id) {
            Some(previous) => {
                self.total_score -= previous.score;
                self.total_play_time_secs = self
                    .total_play_time_secs
                    .saturating_sub(previous.duration_secs);
            }
            None => {
                self.total_games += 1;
                *self.games_by_mode.entry(mode).or_default() += 1;
            }
        }
        self.total_score += score;
        self.total_play_time_secs += duration_secs;
        self.last_run = Some(LastRun {
            id,
            score,
            duration_secs,
        });
    }

    /// Rounded average score per game
    pub fn average_score(&self) -> i64 {
        if self.total_games == 0 {
            return 0;
        }
        (self.total_score as f64 / self.total_games as f64).round() as i64
    }
}

/// Score history plus high score and stats
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreBook {
    /// Newest first
    pub entries: Vec<ScoreEntry>,
    pub high_score: i64,
    pub stats: GameStats,
}

impl ScoreBook {
    pub const SCORES_KEY: &'static str = "balloon_pop_scores";
    pub const HIGH_SCORE_KEY: &'static str = "balloon_pop_high_score";
    pub const STATS_KEY: &'static str = "balloon_pop_stats";

    /// Create empty records
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `score` beats the stored high score
    pub fn is_new_high_score(&self, score: i64) -> bool {
        score > self.high_score
    }

    /// Raise the high score if beaten; returns true when it was
    pub fn submit_high_score(&mut self, score: i64) -> bool {
        if !self.is_new_high_score(score) {
            return false;
        }
        self.high_score = score;
        true
    }

    /// Record a run at the front of the history (replacing an entry with the
    /// same id), keeping at most `MAX_SCORE_ENTRIES`
    pub fn save_score(&mut self, id: u64, player_name: &str, score: i64, mode: GameMode, timestamp: f64) {
        self.entries.retain(|e| e.id != id);
        self.entries.insert(
            0,
            ScoreEntry {
                id,
                player_name: player_name.to_string(),
                score,
                mode,
                timestamp,
            },
        );
        self.entries.truncate(MAX_SCORE_ENTRIES);
    }

    /// Fold a run into the lifetime stats
    pub fn save_stats(&mut self, id: u64, mode: GameMode, score: i64, duration_secs: u64) {
        self.stats.record(id, mode, score, duration_secs);
    }

    /// Entries for one mode (or all), newest first
    pub fn filtered(&self, mode: Option<GameMode>) -> impl Iterator<Item = &ScoreEntry> {
        self.entries
            .iter()
            .filter(move |e| mode.is_none_or(|m| e.mode == m))
    }

    /// Best recorded score for a mode
    pub fn best_for(&self, mode: GameMode) -> Option<i64> {
        self.filtered(Some(mode)).map(|e| e.score).max()
    }

    /// Clear the history (high score and stats are kept)
    pub fn clear_history(&mut self) {
        self.entries.clear();
    }

    /// Check if the history is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Load all three records; each falls back to empty on its own
    pub fn load(storage: &impl Storage) -> Self {
        let entries = load_or_default::<Vec<ScoreEntry>>(storage, Self::SCORES_KEY);
        let high_score = load_or_default::<i64>(storage, Self::HIGH_SCORE_KEY);
        let stats = load_or_default::<GameStats>(storage, Self::STATS_KEY);
        log::info!("Loaded {} scores (high score {})", entries.len(), high_score);
        Self {
            entries,
            high_score,
            stats,
        }
    }

    /// Save all three records. Every write is attempted; the first failure is returned.
    pub fn save(&self, storage: &mut impl Storage) -> Result<(), StorageError> {
        let results = [
            persistence::save_json(storage, Self::SCORES_KEY, &self.entries),
            persistence::save_json(storage, Self::HIGH_SCORE_KEY, &self.high_score),
            persistence::save_json(storage, Self::STATS_KEY, &self.stats),
        ];
        results.into_iter().collect::<Result<Vec<()>, _>>()?;
        log::info!("Scores saved ({} entries)", self.entries.len());
        Ok(())
    }
}

fn load_or_default<T: serde::de::DeserializeOwned + Default>(storage: &impl Storage, key: &str) -> T {
    match persistence::load_json::<T>(storage, key) {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            log::warn!("Record `{}` unreadable ({}), starting fresh", key, e);
            T::default()
        }
    }
}
