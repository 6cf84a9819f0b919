//! Session controller
//!
//! Owns the running session plus everything around it: settings, score
//! records, storage and the host platform. The host drives it with
//! `advance` every frame and forwards taps and menu actions; it reads
//! back a [`Snapshot`] to draw.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::audio::{SoundEffect, SoundMixer};
use crate::consts::*;
use crate::highscores::ScoreBook;
use crate::persistence::Storage;
use crate::platform::{AdPacing, Notice, Platform, PlatformError};
use crate::settings::Settings;
use crate::sim::{
    self, BalloonColor, BalloonKind, EntityId, GameEvent, GameMode, GameOverReason, GamePhase,
    GameState, PowerUpKind, TickInput,
};
use crate::tuning::{DifficultyProfile, GameConfig};

/// How the last run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub mode: GameMode,
    pub reason: GameOverReason,
    pub score: i64,
    pub is_new_high_score: bool,
}

/// A balloon as the host draws it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BalloonView {
    pub id: EntityId,
    pub kind: BalloonKind,
    pub color: BalloonColor,
    /// Percent coordinates, y = 0 at the bottom edge
    pub position: Vec2,
}

/// A power-up as the host draws it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerUpView {
    pub id: EntityId,
    pub kind: PowerUpKind,
    pub position: Vec2,
}

/// Everything the host needs to render one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub mode: GameMode,
    pub phase: GamePhase,
    pub score: i64,
    pub high_score: i64,
    /// None in endless
    pub lives: Option<u32>,
    /// Present only in time attack
    pub time_remaining_secs: Option<u32>,
    pub balloons: Vec<BalloonView>,
    pub power_ups: Vec<PowerUpView>,
    /// Active timed effects with their remaining time
    pub active_power_ups: Vec<(PowerUpKind, u32)>,
    pub spawn_interval_ms: u32,
    /// Nothing has happened yet in this run
    pub show_hint: bool,
    pub can_continue: bool,
    pub last_result: Option<RunSummary>,
}

/// Session controller
pub struct Game<S: Storage, P: Platform> {
    state: Option<GameState>,
    settings: Settings,
    config: GameConfig,
    scores: ScoreBook,
    storage: S,
    platform: P,
    /// Seeds each new session
    seeds: Pcg32,
    accumulator_ms: u32,
    interstitial_pacing: AdPacing,
    reward_pacing: AdPacing,
    /// Game clock of finished sessions
    clock_base_ms: u64,
    last_result: Option<RunSummary>,
}

impl<S: Storage, P: Platform> Game<S, P> {
    /// Create a controller seeded from the OS
    pub fn new(storage: S, platform: P) -> Self {
        Self::with_seed(storage, platform, rand::random())
    }

    /// Create a controller whose sessions are fully reproducible
    pub fn with_seed(storage: S, platform: P, seed: u64) -> Self {
        let settings = Settings::load(&storage);
        let scores = ScoreBook::load(&storage);
        Self {
            state: None,
            settings,
            config: GameConfig::new(),
            scores,
            storage,
            platform,
            seeds: Pcg32::seed_from_u64(seed),
            accumulator_ms: 0,
            interstitial_pacing: AdPacing::default(),
            reward_pacing: AdPacing::default(),
            clock_base_ms: 0,
            last_result: None,
        }
    }

    /// Replace the gameplay policy for sessions started from now on
    pub fn with_config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Start a fresh session in `mode`
    pub fn select_mode(&mut self, mode: GameMode) {
        if let Some(previous) = self.state.take() {
            self.clock_base_ms += previous.clock_ms;
        }

        let seed = self.seeds.random();
        let profile = DifficultyProfile::for_difficulty(self.settings.difficulty);
        log::info!(
            "Starting {} on {} (seed {})",
            mode.as_str(),
            self.settings.difficulty.as_str(),
            seed
        );
        self.state = Some(GameState::new(seed, mode, profile, self.config));
        self.accumulator_ms = 0;
        self.last_result = None;
        self.platform.notify(Notice::NewGame);
    }

    /// Start over in the current mode. Returns false at mode select.
    pub fn restart(&mut self) -> bool {
        match self.state.as_ref().map(|s| s.mode) {
            Some(mode) => {
                self.select_mode(mode);
                true
            }
            None => false,
        }
    }

    /// Leave the session and go back to mode select
    pub fn quit_to_menu(&mut self) {
        if let Some(previous) = self.state.take() {
            self.clock_base_ms += previous.clock_ms;
            log::info!(
                "Back to mode select at score {} ({} entities dropped)",
                previous.score,
                previous.active_entities()
            );
        }
        self.accumulator_ms = 0;
    }

    /// Advance by a frame's worth of wall time. Only whole fixed steps are
    /// simulated; the remainder carries to the next frame.
    pub fn advance(&mut self, dt_ms: u32) {
        if self.state.as_ref().map(|s| s.phase) != Some(GamePhase::Playing) {
            return;
        }

        self.accumulator_ms += dt_ms.min(MAX_FRAME_MS);
        let mut substeps = 0;
        while self.accumulator_ms >= SIM_DT_MS && substeps < MAX_SUBSTEPS {
            let Some(state) = self.state.as_mut() else {
                break;
            };
            let events = sim::tick(state, &TickInput::default(), SIM_DT_MS);
            self.accumulator_ms -= SIM_DT_MS;
            substeps += 1;
            self.handle_events(events);

            if self.state.as_ref().map(|s| s.phase) != Some(GamePhase::Playing) {
                self.accumulator_ms = 0;
                break;
            }
        }
    }

    /// Tap on an entity
    pub fn pop(&mut self, id: EntityId) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        let events = sim::pop(state, id);
        self.handle_events(events);
    }

    pub fn request_pause(&mut self) -> bool {
        let paused = self.state.as_mut().and_then(sim::pause).is_some();
        if paused {
            log::info!("Paused");
        }
        paused
    }

    pub fn request_resume(&mut self) -> bool {
        let resumed = self.state.as_mut().and_then(sim::resume).is_some();
        if resumed {
            log::info!("Resumed");
        }
        resumed
    }

    /// Pause key: flips between playing and paused, ignored once over
    pub fn toggle_pause(&mut self) -> bool {
        match self.state.as_ref().map(|s| s.phase) {
            Some(GamePhase::Playing) => self.request_pause(),
            Some(GamePhase::Paused) => self.request_resume(),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Continue
    // ------------------------------------------------------------------

    /// Ask for a continue. Returns true when a reward ad is now in flight;
    /// the host reports its outcome through `resolve_continue`.
    pub fn request_continue(&mut self) -> bool {
        let now = self.platform.now_ms();
        let Some(state) = self.state.as_mut() else {
            return false;
        };
        if state.phase != GamePhase::GameOver || state.continue_used {
            log::debug!("Continue not offered in {:?}", state.phase);
            return false;
        }

        let outcome = if self.reward_pacing.can_show(now) {
            self.platform.request_reward_ad()
        } else {
            Err(PlatformError::AdFrequencyCapped)
        };

        match outcome {
            Ok(()) => {
                self.reward_pacing.record(now);
                sim::begin_continue(state)
            }
            Err(e) => {
                log::warn!("Continue unavailable: {}", e);
                self.platform.notify(Notice::ContinueUnavailable(e.to_string()));
                false
            }
        }
    }

    /// Outcome of the reward ad started by `request_continue`
    pub fn resolve_continue(&mut self, granted: bool) {
        let Some(state) = self.state.as_mut() else {
            return;
        };
        if state.phase != GamePhase::AwaitingReward {
            log::debug!("No continue pending");
            return;
        }
        match sim::finish_continue(state, granted) {
            Some(event) => {
                self.accumulator_ms = 0;
                self.last_result = None;
                self.handle_events(vec![event]);
            }
            None => {
                log::info!("Continue declined");
                self.platform.notify(Notice::ContinueDenied);
            }
        }
    }

    // ------------------------------------------------------------------
    // Settings and records
    // ------------------------------------------------------------------

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Replace and persist the settings. Difficulty applies from the next session.
    pub fn update_settings(&mut self, settings: Settings) {
        self.settings = settings.sanitized();
        if let Err(e) = self.settings.save(&mut self.storage) {
            log::warn!("Failed to save settings: {}", e);
            self.platform.notify(Notice::SaveFailed(e.to_string()));
        }
    }

    pub fn scores(&self) -> &ScoreBook {
        &self.scores
    }

    /// Wipe the score history (high score and stats are kept)
    pub fn clear_scores(&mut self) {
        self.scores.clear_history();
        self.persist_scores();
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Current frame, or None at mode select
    pub fn snapshot(&self) -> Option<Snapshot> {
        let state = self.state.as_ref()?;
        Some(Snapshot {
            mode: state.mode,
            phase: state.phase,
            score: state.score,
            high_score: self.scores.high_score,
            lives: state.lives.count(),
            time_remaining_secs: state.time_remaining_secs(),
            balloons: state
                .balloons
                .iter()
                .map(|b| BalloonView {
                    id: b.id,
                    kind: b.kind,
                    color: b.color,
                    position: b.position(),
                })
                .collect(),
            power_ups: state
                .power_ups
                .iter()
                .map(|p| PowerUpView {
                    id: p.id,
                    kind: p.kind,
                    position: p.position(),
                })
                .collect(),
            active_power_ups: state
                .effects
                .active_kinds()
                .into_iter()
                .map(|k| (k, state.effects.remaining_ms(k)))
                .collect(),
            spawn_interval_ms: state.scheduler.spawn_interval_ms,
            show_hint: state.phase == GamePhase::Playing
                && state.score == 0
                && state.balloons.is_empty(),
            can_continue: state.phase == GamePhase::GameOver
                && !state.continue_used
                && self.reward_pacing.can_show(self.platform.now_ms()),
            last_result: self.last_result,
        })
    }

    /// Underlying session, for hosts that want full detail
    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn platform_mut(&mut self) -> &mut P {
        &mut self.platform
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Game clock summed over every session so far
    pub fn game_clock_ms(&self) -> u64 {
        self.clock_base_ms + self.state.as_ref().map_or(0, |s| s.clock_ms)
    }

    // ------------------------------------------------------------------
    // Event handling
    // ------------------------------------------------------------------

    fn handle_events(&mut self, events: Vec<GameEvent>) {
        let mixer = SoundMixer::from_settings(&self.settings);

        for event in events {
            match event {
                GameEvent::BalloonPopped {
                    id,
                    color,
                    points,
                    position,
                    ..
                } => {
                    log::debug!("Popped {} for {} points", id, points);
                    self.play(&mixer, SoundEffect::Pop);
                    if self.settings.particles_enabled {
                        self.platform.spawn_particle_effect(position, color);
                    }
                }
                GameEvent::PowerUpCollected { kind, .. } => {
                    self.play(&mixer, SoundEffect::PowerUp);
                    self.platform.notify(Notice::PowerUp(kind));
                }
                GameEvent::GameOver { reason, score } => {
                    self.play(&mixer, SoundEffect::GameOver);
                    self.finish_run(reason, score);
                }
                GameEvent::Continued => {
                    self.platform.notify(Notice::ContinueGranted);
                }
                other => log::trace!("{:?}", other),
            }
        }
    }

    fn play(&mut self, mixer: &SoundMixer, effect: SoundEffect) {
        if let Some(volume) = mixer.volume_for(effect) {
            self.platform.play_sound(effect, volume);
        }
    }

    /// Record a finished run. A continued run that ends again replaces its
    /// earlier record instead of adding a second one.
    fn finish_run(&mut self, reason: GameOverReason, score: i64) {
        let Some(state) = self.state.as_ref() else {
            return;
        };
        let session = state.seed;
        let mode = state.mode;
        let duration_secs = state.clock_ms / 1000;

        let is_new_high_score = self.scores.submit_high_score(score);
        self.scores
            .save_score(session, &self.settings.display_name, score, mode, self.platform.now_ms());
        self.scores.save_stats(session, mode, score, duration_secs);
        self.persist_scores();

        self.platform.notify(match reason {
            GameOverReason::TimeUp => Notice::TimeUp,
            GameOverReason::LivesDepleted => Notice::GameOver,
        });
        if is_new_high_score {
            log::info!("New high score {}", score);
            self.platform.notify(Notice::NewHighScore(score));
        }

        self.last_result = Some(RunSummary {
            mode,
            reason,
            score,
            is_new_high_score,
        });
        self.show_interstitial();
    }

    fn persist_scores(&mut self) {
        if let Err(e) = self.scores.save(&mut self.storage) {
            log::warn!("Failed to save scores: {}", e);
            self.platform.notify(Notice::SaveFailed(e.to_string()));
        }
    }

    /// Game-over ad. Only the frequency cap skips it quietly.
    fn show_interstitial(&mut self) {
        let now = self.platform.now_ms();
        if !self.interstitial_pacing.can_show(now) {
            log::debug!("Ad frequency cap reached, skipping interstitial");
            return;
        }
        match self.platform.show_interstitial_ad() {
            Ok(()) => self.interstitial_pacing.record(now),
            Err(e) => {
                log::warn!("Interstitial failed: {}", e);
                self.platform.notify(Notice::AdUnavailable(e.to_string()));
            }
        }
    }
}
