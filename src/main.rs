//! Balloon Pop entry point
//!
//! Native builds run a headless autoplay session; the browser build is
//! driven through the library from the page.

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use balloon_pop::Game;
    use balloon_pop::persistence::FileStorage;
    use balloon_pop::platform::LogPlatform;
    use balloon_pop::sim::{BalloonKind, GameMode, GamePhase};

    /// Where settings and scores are kept between runs
    const DATA_DIR: &str = ".balloon-pop";
    /// Endless never ends on its own
    const ENDLESS_CAP_MS: u64 = 180_000;
    /// Simulated frame length
    const FRAME_MS: u32 = 16;
    /// Bot reaction: a balloon becomes tappable this far into its climb (percent)
    const REACH_HEIGHT: f32 = 35.0;

    pub fn run() {
        balloon_pop::init_logging();

        let mode = match std::env::args().nth(1) {
            Some(arg) => GameMode::from_str(&arg).unwrap_or_else(|| {
                log::warn!("Unknown mode `{}`, playing classic", arg);
                GameMode::Classic
            }),
            None => GameMode::Classic,
        };

        let storage = FileStorage::new(DATA_DIR);
        log::info!("Records kept in {}", storage.dir().display());
        let mut game = Game::new(storage, LogPlatform);
        log::info!(
            "Player {} on {}",
            game.settings().display_name,
            game.settings().difficulty.description()
        );
        game.select_mode(mode);

        let mut frames: u64 = 0;
        loop {
            let Some(snapshot) = game.snapshot() else {
                break;
            };
            if snapshot.phase != GamePhase::Playing {
                break;
            }
            if mode == GameMode::Endless && frames * FRAME_MS as u64 >= ENDLESS_CAP_MS {
                log::info!("Endless demo finished");
                break;
            }

            // Grab power-ups first, then the highest safe balloon. Every other
            // frame the bot is too slow, so some balloons get away.
            if frames % 2 == 0 {
                let target = snapshot
                    .power_ups
                    .iter()
                    .filter(|p| p.position.y >= REACH_HEIGHT)
                    .map(|p| p.id)
                    .next()
                    .or_else(|| {
                        snapshot
                            .balloons
                            .iter()
                            .filter(|b| b.kind != BalloonKind::Bomb && b.position.y >= REACH_HEIGHT)
                            .max_by(|a, b| a.position.y.total_cmp(&b.position.y))
                            .map(|b| b.id)
                    });
                if let Some(id) = target {
                    game.pop(id);
                }
            }

            game.advance(FRAME_MS);
            frames += 1;
        }

        if let Some(snapshot) = game.snapshot() {
            log::info!(
                "Final score {} in {} ({}s of play, high score {})",
                snapshot.score,
                mode.as_str(),
                game.game_clock_ms() / 1000,
                snapshot.high_score
            );
        }
        let stats = &game.scores().stats;
        log::info!(
            "{} games played, average score {}",
            stats.total_games,
            stats.average_score()
        );
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    native::run();
}

#[cfg(target_arch = "wasm32")]
fn main() {
    balloon_pop::init_logging();
    log::info!("Balloon Pop core loaded");
}
