//! Session orchestration
//!
//! Drives one game from initial spawn to win or loss:
//! - `Spawning`: one token per tick is laid out from the path origin
//! - `Running`: queued collisions are applied, then the chain advances
//! - `Won` / `Lost`: everything frozen
//!
//! Collisions reported while a tick is in progress are queued with
//! [`SessionController::submit_collision`] and applied at the start of the next
//! tick, so motion and insertion never interleave.

use std::collections::VecDeque;

use super::chain::ChainEngine;
use super::collision::{CollisionEvent, InsertOutcome};
use super::matching::MatchEngine;
use super::path::PathProvider;
use super::state::{GameEvent, RngState, SessionPhase};
use super::supply::{Dictionary, SupplyManager};
use super::token::Token;
use crate::settings::{ConfigError, SessionConfig};

pub struct SessionController {
    config: SessionConfig,
    rng_state: RngState,
    supply: SupplyManager,
    chain: ChainEngine,
    matcher: MatchEngine,
    phase: SessionPhase,
    matched_count: u32,
    target_count: u32,
    tick_count: u64,
    /// Tokens laid out so far, origin first
    spawning: Vec<Token>,
    pending: VecDeque<CollisionEvent>,
    events: Vec<GameEvent>,
}

impl SessionController {
    /// Create a session with the given seed. The config is validated and
    /// dictionary words that do not fit the match window are dropped.
    pub fn new(config: SessionConfig, mut dictionary: Dictionary, seed: u64) -> Result<Self, ConfigError> {
        config.validate()?;
        drop_mismatched_words(&mut dictionary, config.match_window);
        let rng_state = RngState::new(seed);
        let supply = SupplyManager::new(dictionary, config.idioms_per_level, rng_state.to_rng());
        let target_count = config.effective_target(supply.session_words().len());
        let chain = ChainEngine::new(config.chain_speed);
        let matcher = MatchEngine::new(config.match_window, config.match_policy);

        log::info!(
            "Session created with seed {} (target {} words, {} initial tokens, {} insertion, {} matching)",
            seed,
            target_count,
            config.initial_chain_length,
            config.insert_policy.as_str(),
            config.match_policy.as_str()
        );

        Ok(Self {
            config,
            rng_state,
            supply,
            chain,
            matcher,
            phase: SessionPhase::Spawning,
            matched_count: 0,
            target_count,
            tick_count: 0,
            spawning: Vec::new(),
            pending: VecDeque::new(),
            events: Vec::new(),
        })
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn matched_count(&self) -> u32 {
        self.matched_count
    }

    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn seed(&self) -> u64 {
        self.rng_state.seed
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn chain(&self) -> &ChainEngine {
        &self.chain
    }

    pub fn supply(&self) -> &SupplyManager {
        &self.supply
    }

    /// Tokens placed during `Spawning` that are not in the chain yet
    pub fn spawning_tokens(&self) -> &[Token] {
        &self.spawning
    }

    /// Collisions waiting for the next tick
    pub fn pending_collisions(&self) -> usize {
        self.pending.len()
    }

    /// Take everything that happened since the last call
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Launcher API: the next character to load into the launcher
    pub fn peek_next_character_to_fire(&mut self) -> Option<char> {
        self.supply.next_shoot_char()
    }

    /// Advance the session by one fixed timestep
    pub fn tick(&mut self, path: &dyn PathProvider, dt: f32) {
        match self.phase {
            SessionPhase::Won | SessionPhase::Lost => return,
            SessionPhase::Spawning => self.spawn_step(path),
            SessionPhase::Running => {
                while let Some(event) = self.pending.pop_front() {
                    self.apply_collision(event, path);
                    if self.phase.is_terminal() {
                        break;
                    }
                }
                if self.phase == SessionPhase::Running {
                    self.chain.advance(path, dt);
                    self.check_outcome(path);
                }
            }
        }
        self.tick_count += 1;
    }

    /// Run the whole spawn sequence now instead of one token per tick
    pub fn spawn_all(&mut self, path: &dyn PathProvider) {
        while self.phase == SessionPhase::Spawning {
            self.spawn_step(path);
        }
    }

    /// Queue a collision for the start of the next tick
    pub fn submit_collision(&mut self, event: CollisionEvent) {
        if self.phase.is_terminal() {
            log::debug!("Dropping collision with token {:?}, session over", event.token_id);
            return;
        }
        self.pending.push_back(event);
    }

    /// Apply a collision immediately. Only call between ticks.
    pub fn handle_collision(&mut self, event: CollisionEvent, path: &dyn PathProvider) -> InsertOutcome {
        self.apply_collision(event, path)
    }

    /// Destroy every token, empty the queues and start over with fresh words
    pub fn reset(&mut self, mut dictionary: Dictionary) {
        drop_mismatched_words(&mut dictionary, self.config.match_window);
        self.chain.clear();
        self.spawning.clear();
        self.pending.clear();
        self.events.clear();
        self.supply.clear();

        self.rng_state.advance_stream();
        self.supply = SupplyManager::new(dictionary, self.config.idioms_per_level, self.rng_state.to_rng());
        self.target_count = self.config.effective_target(self.supply.session_words().len());
        self.matched_count = 0;
        self.tick_count = 0;
        self.phase = SessionPhase::Spawning;
        self.events.push(GameEvent::Reset);
        log::info!("Session reset (stream {})", self.rng_state.stream);
    }

    fn spawn_step(&mut self, path: &dyn PathProvider) {
        if self.spawning.len() >= self.config.initial_chain_length {
            self.finish_spawn(path);
            return;
        }
        let Some(glyph) = self.supply.next_initial_spawn_char() else {
            log::warn!("No characters available, spawn stopped at {} tokens", self.spawning.len());
            self.finish_spawn(path);
            return;
        };

        let mut token = self.chain.make_token(glyph, self.config.token_diameter);
        let offset = match self.spawning.last() {
            Some(prev) => prev.spacing_to(&token),
            None => token.diameter * 0.5,
        };
        let distance = self.spawning.last().map_or(0.0, |prev| prev.distance) + offset;
        token = token.at(distance, path.position(distance));
        self.events.push(GameEvent::TokenSpawned { id: token.id, glyph });
        self.spawning.push(token);

        if self.spawning.len() >= self.config.initial_chain_length {
            self.finish_spawn(path);
        }
    }

    fn finish_spawn(&mut self, path: &dyn PathProvider) {
        let mut tokens = std::mem::take(&mut self.spawning);
        // Furthest token becomes the head
        tokens.reverse();
        for i in 1..tokens.len() {
            let spacing = tokens[i - 1].spacing_to(&tokens[i]);
            tokens[i].distance = tokens[i - 1].distance - spacing;
        }
        self.chain.install(tokens, path);
        self.events.push(GameEvent::SpawnComplete {
            chain_len: self.chain.len(),
        });
        log::info!("Initial chain spawned: {} tokens", self.chain.len());

        // Words can line up by chance in the initial layout
        let cleared = self.matcher.resolve_cascades(&mut self.chain, &self.supply);
        self.record_matches(cleared);

        self.phase = SessionPhase::Running;
        self.check_outcome(path);
    }

    fn apply_collision(&mut self, event: CollisionEvent, path: &dyn PathProvider) -> InsertOutcome {
        if self.phase != SessionPhase::Running {
            return InsertOutcome::Ignored;
        }
        let Some(struck) = self.chain.index_of(event.token_id) else {
            log::debug!("Collision with token {:?} that is no longer in the chain", event.token_id);
            return InsertOutcome::NotFound;
        };
        let Some(index) = self.chain.insert_with_policy(
            self.config.insert_policy,
            struck,
            event.glyph,
            event.position,
            self.config.token_diameter,
            path,
        ) else {
            return InsertOutcome::NotFound;
        };

        let id = self.chain.tokens()[index].id;
        self.events.push(GameEvent::TokenInserted {
            id,
            glyph: event.glyph,
            index,
        });

        let cleared = self.matcher.resolve_after_insert(&mut self.chain, &self.supply, index);
        let matched = cleared.len();
        self.record_matches(cleared);
        self.check_outcome(path);

        InsertOutcome::Inserted { index, matched }
    }

    fn record_matches(&mut self, words: Vec<String>) {
        for word in words {
            self.matched_count += 1;
            self.events.push(GameEvent::WordMatched {
                word,
                matched_count: self.matched_count,
            });
        }
    }

    fn check_outcome(&mut self, path: &dyn PathProvider) {
        if self.phase != SessionPhase::Running {
            return;
        }
        if self.target_count > 0 && self.matched_count >= self.target_count {
            self.finish(SessionPhase::Won);
            self.events.push(GameEvent::Won {
                matched_count: self.matched_count,
            });
            log::info!("Session won with {} words", self.matched_count);
        } else if let Some(head) = self.chain.head_distance() {
            if head >= path.length() {
                self.finish(SessionPhase::Lost);
                self.events.push(GameEvent::Lost { head_distance: head });
                log::info!("Session lost: head reached {:.2} of {:.2}", head, path.length());
            }
        }
    }

    fn finish(&mut self, phase: SessionPhase) {
        self.phase = phase;
        self.chain.freeze();
        self.pending.clear();
    }
}

fn drop_mismatched_words(dictionary: &mut Dictionary, word_len: usize) {
    let dropped = dictionary.retain_len(word_len);
    if dropped > 0 {
        log::warn!("Dropped {} dictionary words that are not {} characters long", dropped, word_len);
    }
}

/// Holds the character the player will fire next
#[derive(Debug, Clone, Default)]
pub struct Launcher {
    loaded: Option<char>,
}

impl Launcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn loaded(&self) -> Option<char> {
        self.loaded
    }

    /// Pull the next character from the session
    pub fn reload(&mut self, session: &mut SessionController) -> Option<char> {
        self.loaded = session.peek_next_character_to_fire();
        self.loaded
    }

    /// Take the loaded character and immediately load the next one
    pub fn fire(&mut self, session: &mut SessionController) -> Option<char> {
        let shot = self.loaded.take().or_else(|| session.peek_next_character_to_fire());
        self.reload(session);
        shot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::path::PolylinePath;
    use crate::sim::token::TokenId;
    use glam::Vec2;
    use proptest::prelude::*;

    fn long_path() -> PolylinePath {
        PolylinePath::straight(Vec2::ZERO, Vec2::new(1000.0, 0.0))
    }

    fn config(initial: usize) -> SessionConfig {
        SessionConfig {
            idioms_per_level: 10,
            initial_chain_length: initial,
            chain_speed: 1.0,
            token_diameter: 1.0,
            ..Default::default()
        }
    }

    /// Running session with a hand-built chain
    fn running_with(glyphs: &str, words: &[&str], cfg: SessionConfig, path: &dyn PathProvider) -> SessionController {
        let mut session = SessionController::new(
            SessionConfig {
                initial_chain_length: 0,
                ..cfg
            },
            Dictionary::from_words(words.iter().copied()),
            1,
        )
        .unwrap();
        session.spawn_all(path);
        let n = glyphs.chars().count();
        let tokens = glyphs
            .chars()
            .enumerate()
            .map(|(i, g)| session.chain.make_token(g, 1.0).at((n - i) as f32, Vec2::ZERO))
            .collect();
        session.chain.install(tokens, path);
        session
    }

    #[test]
    fn test_spawn_one_token_per_tick() {
        let path = long_path();
        let dict = Dictionary::from_words(["ABCD", "EFGH", "IJKL"]);
        // Three tokens can never hold a four-letter word
        let mut session = SessionController::new(config(3), dict, 42).unwrap();
        assert_eq!(session.phase(), SessionPhase::Spawning);

        session.tick(&path, SIM_DT);
        assert_eq!(session.spawning_tokens().len(), 1);
        assert!((session.spawning_tokens()[0].distance - 0.5).abs() < 1e-6);
        assert!(session.chain().is_empty());

        session.tick(&path, SIM_DT);
        assert_eq!(session.phase(), SessionPhase::Spawning);
        session.tick(&path, SIM_DT);
        assert_eq!(session.phase(), SessionPhase::Running);
        assert!(session.spawning_tokens().is_empty());
        let chain = session.chain();
        assert_eq!(chain.len(), 3);
        assert!(chain.is_ordered());
        assert!(chain.is_spaced());
        // Furthest spawned token (2.5 from origin) is the head
        assert!((chain.head_distance().unwrap() - 2.5).abs() < 1e-5);
    }

    #[test]
    fn test_spawn_stops_on_empty_dictionary() {
        let path = long_path();
        let mut session = SessionController::new(config(5), Dictionary::default(), 1).unwrap();
        session.tick(&path, SIM_DT);
        assert_eq!(session.phase(), SessionPhase::Running);
        assert!(session.chain().is_empty());
        assert_eq!(session.peek_next_character_to_fire(), None);
    }

    #[test]
    fn test_initial_layout_is_cleared_of_words() {
        let path = long_path();
        let dict = Dictionary::from_words(["ABCD", "EFGH"]);
        let mut session = SessionController::new(config(40), dict, 3).unwrap();
        session.spawn_all(&path);
        let matcher = MatchEngine::new(4, Default::default());
        assert!(matcher.find_match(session.chain(), session.supply()).is_none());
    }

    #[test]
    fn test_insert_after_tail_completes_word() {
        let path = long_path();
        // The nearest-neighbour rule always puts a tail hit before the tail,
        // so reach "after" with the lateral policy: projectile behind C along +x
        let cfg = SessionConfig {
            target_count: Some(5),
            insert_policy: crate::settings::InsertPolicy::Lateral,
            ..config(0)
        };
        let mut session = running_with("ABC", &["ABCD", "WXYZ"], cfg, &path);
        let c = session.chain().tokens()[2].clone();
        let outcome = session.handle_collision(
            CollisionEvent {
                token_id: c.id,
                glyph: 'D',
                position: c.position - Vec2::new(0.3, 0.0),
            },
            &path,
        );
        assert_eq!(outcome, InsertOutcome::Inserted { index: 3, matched: 1 });
        assert!(session.chain().is_empty());
        assert_eq!(session.matched_count(), 1);
        let events = session.drain_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::WordMatched { word, .. } if word == "ABCD")));
    }

    #[test]
    fn test_collision_with_removed_token_is_noop() {
        let path = long_path();
        let mut session = running_with("ABC", &["WXYZ"], config(0), &path);
        let outcome = session.handle_collision(
            CollisionEvent {
                token_id: TokenId(9999),
                glyph: 'Q',
                position: Vec2::ZERO,
            },
            &path,
        );
        assert_eq!(outcome, InsertOutcome::NotFound);
        assert_eq!(session.chain().glyphs(), "ABC");
    }

    #[test]
    fn test_queued_collision_applies_next_tick() {
        let path = long_path();
        let mut session = running_with("ABC", &["WXYZ"], config(0), &path);
        let head = session.chain().tokens()[0].clone();
        session.submit_collision(CollisionEvent {
            token_id: head.id,
            glyph: 'Q',
            position: head.position + Vec2::new(0.0, 0.5),
        });
        assert_eq!(session.pending_collisions(), 1);
        assert_eq!(session.chain().len(), 3);

        session.tick(&path, SIM_DT);
        assert_eq!(session.pending_collisions(), 0);
        assert_eq!(session.chain().len(), 4);
        assert!(session.chain().is_ordered());
    }

    #[test]
    fn test_win_when_target_reached() {
        let path = long_path();
        let cfg = SessionConfig {
            target_count: Some(1),
            ..config(0)
        };
        let mut session = running_with("ABCDX", &["ABCD"], cfg, &path);
        // Re-run matching through a harmless insertion at the tail
        let x = session.chain().tokens()[4].clone();
        let outcome = session.handle_collision(
            CollisionEvent {
                token_id: x.id,
                glyph: 'Y',
                position: x.position - Vec2::new(0.0, 0.2),
            },
            &path,
        );
        assert!(outcome.is_inserted());
        assert_eq!(session.phase(), SessionPhase::Won);

        // Terminal: further collisions are ignored
        let remaining = session.chain().tokens()[0].clone();
        let outcome = session.handle_collision(
            CollisionEvent {
                token_id: remaining.id,
                glyph: 'Z',
                position: remaining.position,
            },
            &path,
        );
        assert_eq!(outcome, InsertOutcome::Ignored);
    }

    #[test]
    fn test_loss_at_path_end_freezes_chain() {
        let path = PolylinePath::straight(Vec2::ZERO, Vec2::new(10.0, 0.0));
        let cfg = SessionConfig {
            chain_speed: 60.0,
            target_count: Some(100),
            ..config(0)
        };
        let mut session = running_with("ABC", &["WXYZ"], cfg, &path);
        for _ in 0..120 {
            session.tick(&path, SIM_DT);
            if session.phase() == SessionPhase::Lost {
                break;
            }
        }
        assert_eq!(session.phase(), SessionPhase::Lost);
        assert!(session.chain().head_distance().unwrap() >= 10.0);
        assert!(session.chain().tokens().iter().all(|t| t.vel == Vec2::ZERO));

        // Frozen: ticking again moves nothing
        let before = session.chain().head_distance();
        session.tick(&path, SIM_DT);
        assert_eq!(session.chain().head_distance(), before);
        assert!(session.drain_events().iter().any(|e| matches!(e, GameEvent::Lost { .. })));
    }

    #[test]
    fn test_reset_clears_state() {
        let path = long_path();
        let dict = Dictionary::from_words(["ABCD", "EFGH"]);
        let mut session = SessionController::new(config(6), dict.clone(), 5).unwrap();
        session.spawn_all(&path);
        session.submit_collision(CollisionEvent {
            token_id: TokenId(1),
            glyph: 'A',
            position: Vec2::ZERO,
        });

        session.reset(dict);
        assert_eq!(session.phase(), SessionPhase::Spawning);
        assert!(session.chain().is_empty());
        assert_eq!(session.pending_collisions(), 0);
        assert_eq!(session.matched_count(), 0);
        assert_eq!(session.supply().initial_spawn_queue().len(), 4);
        assert_eq!(session.drain_events(), vec![GameEvent::Reset]);
    }

    #[test]
    fn test_launcher_reload_and_fire() {
        let dict = Dictionary::from_words(["ABCD", "EFGH"]);
        let mut session = SessionController::new(config(0), dict, 9).unwrap();
        let pool = session.supply().character_pool().to_vec();

        let mut launcher = Launcher::new();
        assert_eq!(launcher.reload(&mut session), Some(pool[0]));
        assert_eq!(launcher.fire(&mut session), Some(pool[0]));
        assert_eq!(launcher.loaded(), Some(pool[1]));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let dict = Dictionary::from_words(["ABCD"]);
        let bad = SessionConfig {
            match_window: 0,
            ..config(3)
        };
        assert!(matches!(
            SessionController::new(bad, dict.clone(), 1),
            Err(ConfigError::Invalid(_))
        ));
        let bad = SessionConfig {
            chain_speed: -2.0,
            ..config(3)
        };
        assert!(SessionController::new(bad, dict, 1).is_err());
    }

    #[test]
    fn test_words_must_fit_match_window() {
        let cfg = SessionConfig {
            match_window: 5,
            ..config(3)
        };
        let session = SessionController::new(cfg, Dictionary::from_words(["ABCD", "EFGH"]), 1).unwrap();
        assert!(session.supply().session_words().is_empty());
        assert_eq!(session.target_count(), 0);
    }

    #[test]
    fn test_five_character_window_matches() {
        let path = long_path();
        let cfg = SessionConfig {
            match_window: 5,
            target_count: Some(1),
            insert_policy: crate::settings::InsertPolicy::Lateral,
            ..config(0)
        };
        let dict = Dictionary::parse_with_len("ABCDE\nVWXYZ\nABCD\n", 5);
        assert_eq!(dict.len(), 2);
        let mut session = running_with("ABCD", &["ABCDE", "VWXYZ"], cfg, &path);
        assert_eq!(session.supply().session_words().len(), 2);

        let d = session.chain().tokens()[3].clone();
        let outcome = session.handle_collision(
            CollisionEvent {
                token_id: d.id,
                glyph: 'E',
                position: d.position - Vec2::new(0.3, 0.0),
            },
            &path,
        );
        assert_eq!(outcome, InsertOutcome::Inserted { index: 4, matched: 1 });
        assert!(session.chain().is_empty());
        assert_eq!(session.phase(), SessionPhase::Won);
    }

    proptest! {
        #[test]
        fn same_seed_same_session(seed in any::<u64>(), ticks in 1usize..60) {
            let path = long_path();
            let words = ["ABCD", "EFGH", "IJKL", "MNOP", "QRST"];
            let mut a = SessionController::new(config(12), Dictionary::from_words(words), seed).unwrap();
            let mut b = SessionController::new(config(12), Dictionary::from_words(words), seed).unwrap();
            for _ in 0..ticks {
                a.tick(&path, SIM_DT);
                b.tick(&path, SIM_DT);
            }
            prop_assert_eq!(a.phase(), b.phase());
            prop_assert_eq!(a.chain().glyphs(), b.chain().glyphs());
            prop_assert_eq!(a.supply().session_words(), b.supply().session_words());
            prop_assert_eq!(a.chain().head_distance(), b.chain().head_distance());
            prop_assert_eq!(a.peek_next_character_to_fire(), b.peek_next_character_to_fire());
            prop_assert_eq!(a.drain_events(), b.drain_events());
        }
    }
}
