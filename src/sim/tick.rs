//! Fixed timestep simulation tick
//!
//! Core game loop that advances a session deterministically. Within one
//! tick the order is: pause/resume, pops, effect timers, the time attack
//! countdown, entity expiry, spawning. An entity leaves its collection the
//! moment it is popped or missed, so a late event for the same id finds
//! nothing and is dropped.

use rand::Rng;

use super::spawn::{spawn_balloon, spawn_power_up};
use super::state::{
    Balloon, BalloonKind, EntityId, GameEvent, GameOverReason, GamePhase, GameState, Lives,
    PowerUp, PowerUpKind,
};
use crate::consts::*;
use crate::tuning::BombMissPolicy;

/// Input commands for a single tick (deterministic)
#[derive(Debug, Clone, Default)]
pub struct TickInput {
    /// Entities tapped since the previous tick, in tap order
    pub pops: Vec<EntityId>,
    /// Pause request (wins over pops in the same tick)
    pub pause: bool,
    /// Resume request
    pub resume: bool,
}

/// Advance the session by `dt_ms` of game time
pub fn tick(state: &mut GameState, input: &TickInput, dt_ms: u32) -> Vec<GameEvent> {
    let mut events = Vec::new();

    if input.pause {
        if let Some(event) = pause(state) {
            events.push(event);
            return events;
        }
    }
    if input.resume {
        events.extend(resume(state));
    }

    // Nothing moves unless playing
    if state.phase != GamePhase::Playing {
        return events;
    }

    for &id in &input.pops {
        events.extend(pop(state, id));
    }

    state.clock_ms += dt_ms as u64;

    for kind in state.effects.decay(dt_ms) {
        log::debug!("{} wore off", kind.label());
        events.push(GameEvent::PowerUpExpired { kind });
    }

    if let Some(remaining) = state.time_remaining_ms.as_mut() {
        *remaining = remaining.saturating_sub(dt_ms);
        if *remaining == 0 {
            end_game(state, GameOverReason::TimeUp, &mut events);
            return events;
        }
    }

    expire_entities(state, dt_ms, &mut events);
    if state.lives.is_depleted() {
        end_game(state, GameOverReason::LivesDepleted, &mut events);
        return events;
    }

    spawn_due(state, dt_ms, &mut events);

    events
}

/// Pop a balloon or collect a power-up. Unknown or already finished ids and
/// pops outside of play are ignored.
pub fn pop(state: &mut GameState, id: EntityId) -> Vec<GameEvent> {
    let mut events = Vec::new();

    if state.phase != GamePhase::Playing {
        log::debug!("Ignoring pop of {} while {:?}", id, state.phase);
        return events;
    }

    if let Some(index) = state.balloons.iter().position(|b| b.id == id) {
        let balloon = state.balloons.remove(index);
        let chain = state.config.multi_pop_chains
            && state.effects.is_active(PowerUpKind::MultiPop)
            && balloon.kind != BalloonKind::Bomb;
        let anchor_x = balloon.x;

        score_balloon(state, balloon, &mut events);

        if chain {
            let (caught, rest): (Vec<Balloon>, Vec<Balloon>) = std::mem::take(&mut state.balloons)
                .into_iter()
                .partition(|b| b.kind != BalloonKind::Bomb && (b.x - anchor_x).abs() <= MULTI_POP_RADIUS);
            state.balloons = rest;
            for balloon in caught {
                score_balloon(state, balloon, &mut events);
            }
        }
    } else if let Some(index) = state.power_ups.iter().position(|p| p.id == id) {
        let power_up = state.power_ups.remove(index);
        collect_power_up(state, power_up, &mut events);
    } else {
        log::debug!("Ignoring pop of unknown or finished entity {}", id);
    }

    events
}

/// Playing -> Paused
pub fn pause(state: &mut GameState) -> Option<GameEvent> {
    if state.phase != GamePhase::Playing {
        return None;
    }
    state.phase = GamePhase::Paused;
    Some(GameEvent::Paused)
}

/// Paused -> Playing. Timers pick up exactly where they stopped.
pub fn resume(state: &mut GameState) -> Option<GameEvent> {
    if state.phase != GamePhase::Paused {
        return None;
    }
    state.phase = GamePhase::Playing;
    Some(GameEvent::Resumed)
}

/// GameOver -> AwaitingReward, once per session
pub fn begin_continue(state: &mut GameState) -> bool {
    if state.phase != GamePhase::GameOver || state.continue_used {
        return false;
    }
    state.phase = GamePhase::AwaitingReward;
    true
}

/// Settle a pending continue. Granted: at least one life (plus bonus time
/// when the countdown ran out) and back to play with score and entities intact.
/// Denied: back to GameOver with the continue still available.
pub fn finish_continue(state: &mut GameState, granted: bool) -> Option<GameEvent> {
    if state.phase != GamePhase::AwaitingReward {
        return None;
    }
    if !granted {
        state.phase = GamePhase::GameOver;
        return None;
    }

    state.continue_used = true;
    if let Lives::Limited(left) = state.lives {
        state.lives = Lives::Limited(left.max(CONTINUE_LIVES));
    }
    if let Some(remaining) = state.time_remaining_ms.as_mut() {
        if *remaining == 0 {
            *remaining = CONTINUE_BONUS_MS;
        }
    }
    state.game_over_reason = None;
    state.phase = GamePhase::Playing;
    log::info!("Continue granted at score {}", state.score);
    Some(GameEvent::Continued)
}

fn score_balloon(state: &mut GameState, balloon: Balloon, events: &mut Vec<GameEvent>) {
    let points = balloon
        .kind
        .points_with(state.effects.is_active(PowerUpKind::DoubleScore));
    state.score += points;
    events.push(GameEvent::BalloonPopped {
        id: balloon.id,
        kind: balloon.kind,
        color: balloon.color,
        points,
        position: balloon.position(),
    });

    if let Some(interval_ms) = state.scheduler.record_score(state.score) {
        log::debug!("Spawn interval now {}ms", interval_ms);
        events.push(GameEvent::SpawnIntervalChanged { interval_ms });
    }
}

fn collect_power_up(state: &mut GameState, power_up: PowerUp, events: &mut Vec<GameEvent>) {
    match power_up.kind {
        PowerUpKind::ExtraLife => {
            if !state.lives.gain_one() {
                log::debug!("Extra life has nothing to add to in {:?}", state.mode);
            }
        }
        kind @ (PowerUpKind::SlowMo | PowerUpKind::DoubleScore | PowerUpKind::MultiPop) => {
            state.effects.activate(kind);
        }
    }
    events.push(GameEvent::PowerUpCollected {
        id: power_up.id,
        kind: power_up.kind,
    });
}

fn balloon_miss_costs_life(state: &GameState, kind: BalloonKind) -> bool {
    if !state.mode.uses_lives() {
        return false;
    }
    match kind {
        BalloonKind::Normal | BalloonKind::Golden => true,
        BalloonKind::Bomb => state.config.bomb_miss_policy == BombMissPolicy::CostsLife,
    }
}

fn expire_entities(state: &mut GameState, dt_ms: u32, events: &mut Vec<GameEvent>) {
    for balloon in &mut state.balloons {
        balloon.transit.advance(dt_ms);
    }
    let (missed, alive): (Vec<Balloon>, Vec<Balloon>) = std::mem::take(&mut state.balloons)
        .into_iter()
        .partition(|b| b.transit.has_escaped());
    state.balloons = alive;

    for balloon in missed {
        let life_lost = balloon_miss_costs_life(state, balloon.kind) && !state.lives.is_depleted();
        if life_lost {
            state.lives.lose_one();
        }
        events.push(GameEvent::BalloonMissed {
            id: balloon.id,
            kind: balloon.kind,
            life_lost,
        });
    }

    for power_up in &mut state.power_ups {
        power_up.transit.advance(dt_ms);
    }
    let (missed, alive): (Vec<PowerUp>, Vec<PowerUp>) = std::mem::take(&mut state.power_ups)
        .into_iter()
        .partition(|p| p.transit.has_escaped());
    state.power_ups = alive;

    for power_up in missed {
        events.push(GameEvent::PowerUpMissed {
            id: power_up.id,
            kind: power_up.kind,
        });
    }
}

/// Spawns that fired partway through a long tick start out already that far
/// into their crossing. One that is already across escapes on the next tick.
fn spawn_due(state: &mut GameState, dt_ms: u32, events: &mut Vec<GameEvent>) {
    let due = state.scheduler.advance(dt_ms);

    for age in due.balloon_ages_ms {
        let id = state.next_entity_id();
        let slow_mo = state.effects.is_active(PowerUpKind::SlowMo);
        let spawned_at = state.clock_ms - age as u64;
        let mut balloon = spawn_balloon(&mut state.rng, id, &state.profile, slow_mo, spawned_at);
        balloon.transit.advance(age);
        events.push(GameEvent::BalloonSpawned {
            id,
            kind: balloon.kind,
        });
        state.balloons.push(balloon);
    }

    for age in due.power_up_ages_ms {
        if !state.rng.random_bool(POWER_UP_SPAWN_CHANCE) {
            continue;
        }
        let id = state.next_entity_id();
        let spawned_at = state.clock_ms - age as u64;
        let mut power_up = spawn_power_up(&mut state.rng, id, &state.profile, spawned_at);
        power_up.transit.advance(age);
        events.push(GameEvent::PowerUpSpawned {
            id,
            kind: power_up.kind,
        });
        state.power_ups.push(power_up);
    }
}

/// Playing -> GameOver; a session that is already over stays as it is
fn end_game(state: &mut GameState, reason: GameOverReason, events: &mut Vec<GameEvent>) {
    if state.phase.is_over() {
        return;
    }
    state.phase = GamePhase::GameOver;
    state.game_over_reason = Some(reason);
    log::info!("Game over ({:?}) with score {}", reason, state.score);
    events.push(GameEvent::GameOver {
        reason,
        score: state.score,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::state::{BalloonColor, GameMode, Transit};
    use crate::tuning::{DifficultyProfile, GameConfig};

    fn new_state(mode: GameMode) -> GameState {
        GameState::new(12345, mode, DifficultyProfile::MEDIUM, GameConfig::new())
    }

    fn push_balloon(state: &mut GameState, kind: BalloonKind, x: f32, transit_ms: u32) -> EntityId {
        let id = state.next_entity_id();
        state.balloons.push(Balloon {
            id,
            kind,
            color: BalloonColor::Red,
            x,
            transit: Transit::new(transit_ms, state.clock_ms),
        });
        id
    }

    fn push_power_up(state: &mut GameState, kind: PowerUpKind) -> EntityId {
        let id = state.next_entity_id();
        state.power_ups.push(PowerUp {
            id,
            kind,
            x: 50.0,
            transit: Transit::new(5_000, state.clock_ms),
        });
        id
    }

    fn count_game_overs(events: &[GameEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(e, GameEvent::GameOver { .. }))
            .count()
    }

    #[test]
    fn test_golden_with_double_score_is_worth_100() {
        let mut state = new_state(GameMode::Classic);
        state.effects.activate(PowerUpKind::DoubleScore);
        let id = push_balloon(&mut state, BalloonKind::Golden, 40.0, 5_000);

        pop(&mut state, id);
        assert_eq!(state.score, 100);
    }

    #[test]
    fn test_bomb_costs_20_regardless_of_double_score() {
        let mut state = new_state(GameMode::Classic);
        let a = push_balloon(&mut state, BalloonKind::Bomb, 10.0, 5_000);
        pop(&mut state, a);
        assert_eq!(state.score, -20);

        state.effects.activate(PowerUpKind::DoubleScore);
        let b = push_balloon(&mut state, BalloonKind::Bomb, 60.0, 5_000);
        pop(&mut state, b);
        assert_eq!(state.score, -40);
    }

    #[test]
    fn test_second_pop_is_ignored() {
        let mut state = new_state(GameMode::Classic);
        let id = push_balloon(&mut state, BalloonKind::Normal, 50.0, 5_000);

        assert_eq!(pop(&mut state, id).len(), 1);
        assert!(pop(&mut state, id).is_empty());
        assert!(pop(&mut state, 9_999).is_empty());
        assert_eq!(state.score, 10);
    }

    #[test]
    fn test_pop_then_expiry_in_same_tick_is_single_terminal() {
        let mut state = new_state(GameMode::Classic);
        let id = push_balloon(&mut state, BalloonKind::Normal, 50.0, 10);

        let input = TickInput {
            pops: vec![id],
            ..Default::default()
        };
        let events = tick(&mut state, &input, SIM_DT_MS);
        let terminal: Vec<_> = events
            .iter()
            .filter(|e| {
                matches!(e, GameEvent::BalloonPopped { id: i, .. } | GameEvent::BalloonMissed { id: i, .. } if *i == id)
            })
            .collect();
        assert_eq!(terminal.len(), 1);
        assert!(matches!(terminal[0], GameEvent::BalloonPopped { .. }));
        assert_eq!(state.lives, Lives::Limited(5));
    }

    #[test]
    fn test_miss_costs_a_life() {
        let mut state = new_state(GameMode::Classic);
        push_balloon(&mut state, BalloonKind::Normal, 50.0, 20);

        tick(&mut state, &TickInput::default(), SIM_DT_MS);
        assert_eq!(state.lives, Lives::Limited(5));
        let events = tick(&mut state, &TickInput::default(), SIM_DT_MS);
        assert!(events.iter().any(|e| matches!(e, GameEvent::BalloonMissed { life_lost: true, .. })));
        assert_eq!(state.lives, Lives::Limited(4));
        assert!(state.balloons.is_empty());
    }

    #[test]
    fn test_bomb_miss_follows_policy() {
        let mut state = new_state(GameMode::Classic);
        push_balloon(&mut state, BalloonKind::Bomb, 50.0, 10);
        tick(&mut state, &TickInput::default(), SIM_DT_MS);
        assert_eq!(state.lives, Lives::Limited(5));

        state.config.bomb_miss_policy = BombMissPolicy::CostsLife;
        push_balloon(&mut state, BalloonKind::Bomb, 50.0, 10);
        tick(&mut state, &TickInput::default(), SIM_DT_MS);
        assert_eq!(state.lives, Lives::Limited(4));
    }

    #[test]
    fn test_endless_misses_are_free() {
        let mut state = new_state(GameMode::Endless);
        for _ in 0..20 {
            push_balloon(&mut state, BalloonKind::Normal, 50.0, 10);
        }
        let events = tick(&mut state, &TickInput::default(), SIM_DT_MS);
        assert_eq!(state.lives, Lives::Unlimited);
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(count_game_overs(&events), 0);
    }

    #[test]
    fn test_many_misses_in_one_tick_end_the_game_once() {
        let mut state = new_state(GameMode::Classic);
        for _ in 0..8 {
            push_balloon(&mut state, BalloonKind::Normal, 50.0, 10);
        }
        let events = tick(&mut state, &TickInput::default(), SIM_DT_MS);

        assert_eq!(state.lives, Lives::Limited(0));
        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.game_over_reason, Some(GameOverReason::LivesDepleted));
        assert_eq!(count_game_overs(&events), 1);
        // Every balloon was accounted for, only five cost a life
        let missed = events.iter().filter(|e| matches!(e, GameEvent::BalloonMissed { .. })).count();
        let costly = events
            .iter()
            .filter(|e| matches!(e, GameEvent::BalloonMissed { life_lost: true, .. }))
            .count();
        assert_eq!(missed, 8);
        assert_eq!(costly, 5);

        // Further ticks are inert
        let events = tick(&mut state, &TickInput::default(), SIM_DT_MS);
        assert!(events.is_empty());
    }

    #[test]
    fn test_pause_freezes_timers() {
        let mut state = new_state(GameMode::TimeAttack);
        let id = push_balloon(&mut state, BalloonKind::Normal, 50.0, 4_000);
        state.effects.activate(PowerUpKind::SlowMo);

        tick(&mut state, &TickInput::default(), 1_000);
        let pause = TickInput {
            pause: true,
            ..Default::default()
        };
        assert_eq!(tick(&mut state, &pause, 1_000), vec![GameEvent::Paused]);

        let before = state.clone();
        for _ in 0..500 {
            tick(&mut state, &TickInput::default(), 1_000);
        }
        assert_eq!(state.balloon(id).unwrap().transit, before.balloon(id).unwrap().transit);
        assert_eq!(state.time_remaining_ms, before.time_remaining_ms);
        assert_eq!(state.effects, before.effects);
        assert_eq!(state.scheduler, before.scheduler);
        assert_eq!(state.clock_ms, before.clock_ms);

        let resume = TickInput {
            resume: true,
            ..Default::default()
        };
        let events = tick(&mut state, &resume, 1_000);
        assert_eq!(events.first(), Some(&GameEvent::Resumed));
        assert_eq!(state.balloon(id).unwrap().transit.remaining_ms, 2_000);
        assert_eq!(state.time_remaining_ms, Some(58_000));
    }

    #[test]
    fn test_pops_ignored_while_paused() {
        let mut state = new_state(GameMode::Classic);
        let id = push_balloon(&mut state, BalloonKind::Normal, 50.0, 4_000);
        pause(&mut state);
        assert!(pop(&mut state, id).is_empty());
        assert!(state.balloon(id).is_some());
    }

    #[test]
    fn test_time_attack_ends_after_sixty_seconds() {
        let mut state = new_state(GameMode::TimeAttack);
        let mut game_overs = 0;

        for second in 0..60 {
            assert_eq!(state.phase, GamePhase::Playing, "ended early at {second}s");
            // Pop everything that is up so no lives are lost
            let input = TickInput {
                pops: state.balloons.iter().map(|b| b.id).collect(),
                ..Default::default()
            };
            game_overs += count_game_overs(&tick(&mut state, &input, 1_000));
        }

        assert_eq!(state.phase, GamePhase::GameOver);
        assert_eq!(state.time_remaining_ms, Some(0));
        assert_eq!(state.time_remaining_secs(), Some(0));
        assert_eq!(state.game_over_reason, Some(GameOverReason::TimeUp));
        assert_eq!(game_overs, 1);
    }

    #[test]
    fn test_extra_life() {
        let mut state = new_state(GameMode::Classic);
        let id = push_power_up(&mut state, PowerUpKind::ExtraLife);
        let events = pop(&mut state, id);

        assert_eq!(state.lives, Lives::Limited(6));
        assert!(state.effects.active_kinds().is_empty());
        assert_eq!(
            events,
            vec![GameEvent::PowerUpCollected {
                id,
                kind: PowerUpKind::ExtraLife
            }]
        );
    }

    #[test]
    fn test_power_ups_compose() {
        let mut state = new_state(GameMode::Classic);
        let slow = push_power_up(&mut state, PowerUpKind::SlowMo);
        let double = push_power_up(&mut state, PowerUpKind::DoubleScore);
        pop(&mut state, slow);
        pop(&mut state, double);
        assert_eq!(
            state.effects.active_kinds(),
            vec![PowerUpKind::SlowMo, PowerUpKind::DoubleScore]
        );

        let events = tick(&mut state, &TickInput::default(), 10_000);
        assert!(events.contains(&GameEvent::PowerUpExpired { kind: PowerUpKind::SlowMo }));
        assert!(events.contains(&GameEvent::PowerUpExpired { kind: PowerUpKind::DoubleScore }));
        assert!(state.effects.active_kinds().is_empty());
    }

    #[test]
    fn test_power_up_miss_is_free() {
        let mut state = new_state(GameMode::Classic);
        let id = push_power_up(&mut state, PowerUpKind::MultiPop);
        let events = tick(&mut state, &TickInput::default(), 5_000);
        assert!(events.contains(&GameEvent::PowerUpMissed {
            id,
            kind: PowerUpKind::MultiPop
        }));
        assert_eq!(state.lives, Lives::Limited(5));
    }

    #[test]
    fn test_multi_pop_clears_neighbours_but_not_bombs() {
        let mut state = new_state(GameMode::Classic);
        state.effects.activate(PowerUpKind::MultiPop);
        let target = push_balloon(&mut state, BalloonKind::Normal, 50.0, 5_000);
        let near = push_balloon(&mut state, BalloonKind::Golden, 58.0, 5_000);
        let bomb = push_balloon(&mut state, BalloonKind::Bomb, 52.0, 5_000);
        let far = push_balloon(&mut state, BalloonKind::Normal, 80.0, 5_000);

        let events = pop(&mut state, target);
        let popped = events
            .iter()
            .filter(|e| matches!(e, GameEvent::BalloonPopped { .. }))
            .count();
        assert_eq!(popped, 2);
        assert_eq!(state.score, 60);
        assert!(state.balloon(near).is_none());
        assert!(state.balloon(bomb).is_some());
        assert!(state.balloon(far).is_some());
    }

    #[test]
    fn test_spawn_interval_shrinks_with_score() {
        let mut state = new_state(GameMode::Endless);
        for _ in 0..5 {
            let id = push_balloon(&mut state, BalloonKind::Normal, 50.0, 5_000);
            pop(&mut state, id);
        }
        assert_eq!(state.score, 50);
        assert_eq!(state.scheduler.spawn_interval_ms, 1_400);
    }

    #[test]
    fn test_slow_mo_affects_new_balloons() {
        let mut state = new_state(GameMode::Endless);
        state.effects.activate(PowerUpKind::SlowMo);
        tick(&mut state, &TickInput::default(), 1_500);
        let balloon = &state.balloons[0];
        let max = DifficultyProfile::MEDIUM.max_transit_ms;
        assert!(balloon.transit.duration_ms >= DifficultyProfile::MEDIUM.min_transit_ms * 3 / 2);
        assert!(balloon.transit.duration_ms <= max + max / 2);
    }

    #[test]
    fn test_continue_flow() {
        let mut state = new_state(GameMode::Classic);
        for _ in 0..5 {
            push_balloon(&mut state, BalloonKind::Normal, 50.0, 10);
        }
        let keep = push_balloon(&mut state, BalloonKind::Normal, 20.0, 5_000);
        state.score = 120;
        tick(&mut state, &TickInput::default(), SIM_DT_MS);
        assert_eq!(state.phase, GamePhase::GameOver);

        // Denied: still over, continue not spent
        assert!(begin_continue(&mut state));
        assert_eq!(finish_continue(&mut state, false), None);
        assert_eq!(state.phase, GamePhase::GameOver);
        assert!(!state.continue_used);

        assert!(begin_continue(&mut state));
        assert_eq!(finish_continue(&mut state, true), Some(GameEvent::Continued));
        assert_eq!(state.phase, GamePhase::Playing);
        assert_eq!(state.lives, Lives::Limited(1));
        assert_eq!(state.score, 120);
        assert!(state.balloon(keep).is_some());

        // Only once per session
        state.phase = GamePhase::GameOver;
        assert!(!begin_continue(&mut state));
    }

    #[test]
    fn test_continue_after_time_up_adds_time() {
        let mut state = new_state(GameMode::TimeAttack);
        tick(&mut state, &TickInput::default(), 60_000);
        assert_eq!(state.game_over_reason, Some(GameOverReason::TimeUp));

        assert!(begin_continue(&mut state));
        finish_continue(&mut state, true);
        assert_eq!(state.time_remaining_ms, Some(CONTINUE_BONUS_MS));
        assert_eq!(state.game_over_reason, None);
        // Time ran out, not lives: the lives left are kept
        assert_eq!(state.lives, Lives::Limited(DifficultyProfile::MEDIUM.initial_lives));
    }

    #[test]
    fn test_continue_keeps_lives_left_after_time_up() {
        let mut state = new_state(GameMode::TimeAttack);
        push_balloon(&mut state, BalloonKind::Normal, 50.0, 10);
        tick(&mut state, &TickInput::default(), SIM_DT_MS);
        assert_eq!(state.lives, Lives::Limited(4));

        let remaining = state.time_remaining_ms.unwrap();
        tick(&mut state, &TickInput::default(), remaining);
        assert_eq!(state.game_over_reason, Some(GameOverReason::TimeUp));

        assert!(begin_continue(&mut state));
        finish_continue(&mut state, true);
        assert_eq!(state.lives, Lives::Limited(4));
        assert_eq!(state.time_remaining_ms, Some(CONTINUE_BONUS_MS));
    }

    #[test]
    fn test_long_tick_ages_spawns() {
        let mut coarse = new_state(GameMode::Endless);
        let mut fine = coarse.clone();

        let coarse_events = tick(&mut coarse, &TickInput::default(), 3_000);
        let mut fine_events = Vec::new();
        for _ in 0..300 {
            fine_events.extend(tick(&mut fine, &TickInput::default(), SIM_DT_MS));
        }

        assert_eq!(coarse_events, fine_events);
        assert_eq!(coarse.balloons.len(), 2);
        assert_eq!(coarse.balloons, fine.balloons);
        assert_eq!(coarse.balloons[0].transit.spawned_at_ms, 1_500);
        let first = coarse.balloons[0].transit;
        assert_eq!(first.remaining_ms, first.duration_ms - 1_500);
    }

    #[test]
    fn test_spawn_older_than_its_transit_escapes_next_tick() {
        let mut state = new_state(GameMode::Classic);
        // First balloon fires at 1 500 ms and has been up for 9 000 ms by
        // the end of the tick, longer than any medium crossing
        state.scheduler.spawn_interval_ms = 20_000;
        tick(&mut state, &TickInput::default(), 10_500);
        assert_eq!(state.balloons.len(), 1);
        assert!(state.balloons[0].transit.has_escaped());
        assert_eq!(state.balloons[0].transit.spawned_at_ms, 1_500);
        assert_eq!(state.lives, Lives::Limited(5));
        state.balloons[0].kind = BalloonKind::Normal;

        let events = tick(&mut state, &TickInput::default(), SIM_DT_MS);
        assert!(events.iter().any(|e| matches!(e, GameEvent::BalloonMissed { .. })));
        assert!(state.balloons.is_empty());
        assert_eq!(state.lives, Lives::Limited(4));
    }

    #[test]
    fn test_determinism() {
        // Two sessions with the same seed and inputs stay identical
        let mut state1 = new_state(GameMode::Classic);
        let mut state2 = new_state(GameMode::Classic);

        for step in 0..2_000 {
            let pops: Vec<EntityId> = if step % 37 == 0 {
                state1.balloons.iter().take(1).map(|b| b.id).collect()
            } else {
                Vec::new()
            };
            let input = TickInput {
                pops,
                ..Default::default()
            };
            let e1 = tick(&mut state1, &input, SIM_DT_MS);
            let e2 = tick(&mut state2, &input, SIM_DT_MS);
            assert_eq!(e1, e2);
        }

        assert_eq!(state1.score, state2.score);
        assert_eq!(state1.balloons, state2.balloons);
        assert_eq!(state1.power_ups, state2.power_ups);
        assert_eq!(state1.clock_ms, state2.clock_ms);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;
        use std::collections::{HashMap, HashSet};

        #[derive(Debug, Clone)]
        enum Step {
            Advance(u32),
            PopOldest,
            PopNewest,
            PopStale(EntityId),
            Pause,
            Resume,
        }

        fn step() -> impl Strategy<Value = Step> {
            prop_oneof![
                6 => (1u32..2_000).prop_map(Step::Advance),
                2 => Just(Step::PopOldest),
                2 => Just(Step::PopNewest),
                1 => (1u32..200).prop_map(Step::PopStale),
                1 => Just(Step::Pause),
                1 => Just(Step::Resume),
            ]
        }

        fn run(state: &mut GameState, step: &Step) -> Vec<GameEvent> {
            match step {
                Step::Advance(dt) => tick(state, &TickInput::default(), *dt),
                Step::PopOldest => match state.balloons.first().map(|b| b.id) {
                    Some(id) => pop(state, id),
                    None => Vec::new(),
                },
                Step::PopNewest => match state.power_ups.last().map(|p| p.id).or(state.balloons.last().map(|b| b.id)) {
                    Some(id) => pop(state, id),
                    None => Vec::new(),
                },
                Step::PopStale(id) => pop(state, *id),
                Step::Pause => pause(state).into_iter().collect(),
                Step::Resume => resume(state).into_iter().collect(),
            }
        }

        fn terminal_id(event: &GameEvent) -> Option<EntityId> {
            match event {
                GameEvent::BalloonPopped { id, .. }
                | GameEvent::BalloonMissed { id, .. }
                | GameEvent::PowerUpCollected { id, .. }
                | GameEvent::PowerUpMissed { id, .. } => Some(*id),
                _ => None,
            }
        }

        proptest! {
            #[test]
            fn every_entity_ends_exactly_once(
                seed in any::<u64>(),
                steps in prop::collection::vec(step(), 1..200),
            ) {
                let mut state = GameState::new(seed, GameMode::Endless, DifficultyProfile::HARD, GameConfig::new());
                let mut spawned = HashSet::new();
                let mut ended: HashMap<EntityId, usize> = HashMap::new();

                let mut record = |events: Vec<GameEvent>, spawned: &mut HashSet<EntityId>| {
                    for event in &events {
                        match event {
                            GameEvent::BalloonSpawned { id, .. } | GameEvent::PowerUpSpawned { id, .. } => {
                                spawned.insert(*id);
                            }
                            other => {
                                if let Some(id) = terminal_id(other) {
                                    *ended.entry(id).or_default() += 1;
                                }
                            }
                        }
                    }
                };

                for step in &steps {
                    let events = run(&mut state, step);
                    record(events, &mut spawned);
                }

                // Drain: resume and let everything left on screen escape
                let events: Vec<GameEvent> = resume(&mut state).into_iter().collect();
                record(events, &mut spawned);
                let drain_from = state.clock_ms;
                for _ in 0..20 {
                    let events = tick(&mut state, &TickInput::default(), 1_000);
                    record(events, &mut spawned);
                }

                for (id, count) in &ended {
                    prop_assert_eq!(*count, 1, "entity {} ended {} times", id, count);
                    prop_assert!(spawned.contains(id));
                }
                for id in &spawned {
                    let live = state
                        .balloon(*id)
                        .map(|b| b.transit)
                        .or(state.power_up(*id).map(|p| p.transit));
                    match live {
                        // Still on screen: not finished, and spawned late in the drain
                        Some(transit) => {
                            prop_assert!(!ended.contains_key(id));
                            prop_assert!(transit.spawned_at_ms > drain_from);
                        }
                        None => prop_assert!(ended.contains_key(id), "entity {} never ended", id),
                    }
                }
            }

            #[test]
            fn pausing_never_changes_the_outcome(
                seed in any::<u64>(),
                dts in prop::collection::vec(1u32..1_500, 1..60),
                pause_at in any::<prop::sample::Index>(),
                paused_ticks in 0usize..50,
            ) {
                let mut plain = GameState::new(seed, GameMode::TimeAttack, DifficultyProfile::EASY, GameConfig::new());
                let mut paused = plain.clone();
                let pause_index = pause_at.index(dts.len());

                for (i, dt) in dts.iter().enumerate() {
                    if i == pause_index {
                        pause(&mut paused);
                        for _ in 0..paused_ticks {
                            tick(&mut paused, &TickInput::default(), 1_000);
                        }
                        resume(&mut paused);
                    }
                    tick(&mut plain, &TickInput::default(), *dt);
                    tick(&mut paused, &TickInput::default(), *dt);
                }

                prop_assert_eq!(plain.clock_ms, paused.clock_ms);
                prop_assert_eq!(plain.time_remaining_ms, paused.time_remaining_ms);
                prop_assert_eq!(&plain.balloons, &paused.balloons);
                prop_assert_eq!(&plain.power_ups, &paused.power_ups);
                prop_assert_eq!(plain.lives, paused.lives);
                prop_assert_eq!(plain.phase, paused.phase);
            }

            #[test]
            fn lives_depletion_ends_game_once(
                seed in any::<u64>(),
                dts in prop::collection::vec(1u32..3_000, 1..120),
            ) {
                let mut state = GameState::new(seed, GameMode::Classic, DifficultyProfile::HARD, GameConfig::new());
                let mut game_overs = 0;
                for dt in dts {
                    let events = tick(&mut state, &TickInput::default(), dt);
                    game_overs += count_game_overs(&events);
                    if let Lives::Limited(n) = state.lives {
                        prop_assert!(n <= DifficultyProfile::HARD.initial_lives);
                        if n == 0 {
                            prop_assert_eq!(state.phase, GamePhase::GameOver);
                        }
                    }
                }
                prop_assert!(game_overs <= 1);
            }
        }
    }
}
