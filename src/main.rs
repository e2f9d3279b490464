//! Idiom Chain headless driver
//!
//! Runs one session against a reference path with a simple aiming bot standing
//! in for the player and the physics layer. Useful for tuning configs and for
//! eyeballing determinism from the logs (`RUST_LOG=debug`).

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::path::PathBuf;

    use clap::{Parser, ValueEnum};
    use glam::Vec2;

    use idiom_chain::consts::{MAX_SUBSTEPS, SIM_DT};
    use idiom_chain::sim::{
        ArcPath, CollisionEvent, Dictionary, GameEvent, Launcher, Lexicon, PathProvider, PolylinePath,
        SessionController, SessionPhase,
    };
    use idiom_chain::settings::{InsertPolicy, MatchPolicy};
    use idiom_chain::SessionConfig;

    /// Built-in word list used when no dictionary file is given
    const SAMPLE_WORDS: &str = "画蛇添足\n守株待兔\n对牛弹琴\n亡羊补牢\n井底之蛙\n\
                                 掩耳盗铃\n杯弓蛇影\n刻舟求剑\n叶公好龙\n狐假虎威\n\
                                 鹤立鸡群\n万事如意\n";

    /// Render frame length fed to the fixed-step accumulator
    const FRAME_DT: f32 = 1.0 / 30.0;

    #[derive(Debug, Clone, Copy, ValueEnum)]
    enum PathShape {
        /// Three-quarter circle
        Arc,
        /// Back-and-forth polyline
        Zigzag,
    }

    #[derive(Debug, Parser)]
    #[command(name = "idiom-chain", about = "Run a headless idiom chain session")]
    struct Args {
        /// Newline-delimited word file (UTF-8)
        #[arg(long)]
        dictionary: Option<PathBuf>,
        /// Session config (JSON)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Write the effective config to this path and continue
        #[arg(long)]
        write_config: Option<PathBuf>,
        /// RNG seed
        #[arg(long, default_value_t = 1)]
        seed: u64,
        /// Simulated seconds before giving up
        #[arg(long, default_value_t = 300.0)]
        max_seconds: f32,
        /// Seconds between shots
        #[arg(long, default_value_t = 0.5)]
        fire_interval: f32,
        #[arg(long, value_enum, default_value_t = PathShape::Arc)]
        path: PathShape,
        /// Override the config's side rule (`nearest-neighbor` or `lateral`)
        #[arg(long, value_parser = parse_insert_policy)]
        insert_policy: Option<InsertPolicy>,
        /// Override the config's match search (`full` or `local`)
        #[arg(long, value_parser = parse_match_policy)]
        match_policy: Option<MatchPolicy>,
    }

    fn parse_insert_policy(s: &str) -> Result<InsertPolicy, String> {
        InsertPolicy::from_str(s).ok_or_else(|| format!("unknown insert policy '{}'", s))
    }

    fn parse_match_policy(s: &str) -> Result<MatchPolicy, String> {
        MatchPolicy::from_str(s).ok_or_else(|| format!("unknown match policy '{}'", s))
    }

    fn build_path(shape: PathShape) -> Box<dyn PathProvider> {
        match shape {
            PathShape::Arc => Box::new(ArcPath::new(Vec2::ZERO, 20.0, 0.0, 1.5 * std::f32::consts::PI)),
            PathShape::Zigzag => Box::new(PolylinePath::new(vec![
                Vec2::new(-30.0, 20.0),
                Vec2::new(30.0, 20.0),
                Vec2::new(-30.0, 0.0),
                Vec2::new(30.0, -20.0),
            ])),
        }
    }

    /// Pick the gap (token index the new glyph would take) for `glyph`.
    /// Prefers a gap that completes a word, otherwise the one before the tail.
    fn choose_gap(session: &SessionController, glyph: char) -> Option<usize> {
        let glyphs: Vec<char> = session.chain().glyphs().chars().collect();
        if glyphs.len() < 2 {
            return None;
        }
        let window = session.config().match_window;
        let completes = |gap: usize| {
            let mut candidate = glyphs.clone();
            candidate.insert(gap, glyph);
            let lowest = gap.saturating_sub(window - 1);
            (lowest..=gap).any(|start| {
                candidate
                    .get(start..start + window)
                    .is_some_and(|w| session.supply().contains_word(&w.iter().collect::<String>()))
            })
        };
        // Only interior gaps can be aimed at: the nearest-neighbour rule needs
        // a token on both sides to tell them apart
        (1..glyphs.len())
            .find(|&gap| completes(gap))
            .or(Some(glyphs.len() - 1))
    }

    /// Collision the physics layer would report for a shot into `gap`
    fn aim_at_gap(session: &SessionController, gap: usize, glyph: char) -> CollisionEvent {
        let tokens = session.chain().tokens();
        let struck = &tokens[gap - 1];
        let next = &tokens[gap];
        CollisionEvent {
            token_id: struck.id,
            glyph,
            position: struck.position.lerp(next.position, 0.6),
        }
    }

    fn log_events(session: &mut SessionController) {
        for event in session.drain_events() {
            match event {
                GameEvent::TokenSpawned { .. } => {}
                GameEvent::SpawnComplete { chain_len } => log::info!("Chain ready with {} tokens", chain_len),
                GameEvent::TokenInserted { glyph, index, .. } => log::debug!("'{}' landed at {}", glyph, index),
                GameEvent::WordMatched { word, matched_count } => {
                    log::info!("Cleared {} ({}/{})", word, matched_count, session.target_count())
                }
                GameEvent::Won { matched_count } => log::info!("Won after {} words", matched_count),
                GameEvent::Lost { head_distance } => log::info!("Lost, head at {:.2}", head_distance),
                GameEvent::Reset => log::info!("Session reset"),
            }
        }
    }

    pub fn run() -> Result<(), Box<dyn std::error::Error>> {
        let args = Args::parse();

        let mut config = match &args.config {
            Some(path) => SessionConfig::load(path)?,
            None => SessionConfig::default(),
        };
        if let Some(policy) = args.insert_policy {
            config.insert_policy = policy;
        }
        if let Some(policy) = args.match_policy {
            config.match_policy = policy;
        }
        config.validate()?;
        if let Some(path) = &args.write_config {
            config.save(path)?;
        }

        let dictionary = match &args.dictionary {
            Some(path) => Dictionary::load_with_len(path, config.match_window).unwrap_or_else(|e| {
                log::error!("{}, continuing with an empty dictionary", e);
                Dictionary::default()
            }),
            None => Dictionary::parse_with_len(SAMPLE_WORDS, config.match_window),
        };

        let path = build_path(args.path);
        log::info!("Path length {:.2}", path.length());

        let mut session = SessionController::new(config, dictionary, args.seed)?;
        let mut launcher = Launcher::new();
        launcher.reload(&mut session);

        let mut accumulator = 0.0;
        let mut sim_time = 0.0;
        let mut next_shot = args.fire_interval;

        while sim_time < args.max_seconds && !session.phase().is_terminal() {
            accumulator += FRAME_DT;
            let mut substeps = 0;
            while accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
                session.tick(path.as_ref(), SIM_DT);
                accumulator -= SIM_DT;
                sim_time += SIM_DT;
                substeps += 1;
            }

            if session.phase() == SessionPhase::Running && sim_time >= next_shot {
                next_shot += args.fire_interval;
                if let Some(glyph) = launcher.loaded() {
                    if let Some(gap) = choose_gap(&session, glyph) {
                        let event = aim_at_gap(&session, gap, glyph);
                        launcher.fire(&mut session);
                        session.submit_collision(event);
                    }
                }
            }

            log_events(&mut session);
        }

        println!(
            "{:?} after {:.1}s: {}/{} words, {} tokens left",
            session.phase(),
            sim_time,
            session.matched_count(),
            session.target_count(),
            session.chain().len()
        );
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    env_logger::init();
    log::info!("Idiom Chain (headless) starting...");

    if let Err(e) = native::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The library is the product on wasm; nothing to drive here
}
