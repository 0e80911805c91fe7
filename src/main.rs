//! Chain Arcade entry point
//!
//! Natively this runs a headless demo: one autopiloted round of each game
//! against the in-process ledger, then prints the leaderboard. The web build
//! is driven by the page through `platform::web`.

#[cfg(not(target_arch = "wasm32"))]
mod demo {
    use std::cell::RefCell;
    use std::rc::Rc;

    use chain_arcade::chain::{Address, ClientPool, LeaderboardScope, MemoryLedger, RuntimeConfig};
    use chain_arcade::consts::*;
    use chain_arcade::format::{format_address, format_duration, format_timestamp, format_tx_hash};
    use chain_arcade::persistence::{PersistentStore, default_store};
    use chain_arcade::platform::InputEvent;
    use chain_arcade::session::FrameReport;
    use chain_arcade::sim::{Cell, Direction, SimulationState};
    use chain_arcade::{
        GameKind, LeaderboardCache, RoundOutcome, ScoreSubmission, Session, Settings, Submitter,
    };

    /// ~60 fps
    const FRAME_MS: f64 = 1000.0 / 60.0;
    /// Autopilot plays for at most this long, then lets the round end
    const AUTOPILOT_FRAMES: u32 = 60 * 45;
    const MAX_FRAMES: u32 = AUTOPILOT_FRAMES + 60 * 30;

    const CONTRACT: Address = Address::from_bytes([
        0x5f, 0xbd, 0xb2, 0x31, 0x56, 0x78, 0xaf, 0xec, 0xb3, 0x67, 0xf0, 0x32, 0xd9, 0x3f, 0x64,
        0x2f, 0x64, 0x18, 0x0a, 0xa3,
    ]);
    const PLAYER: Address = Address::from_bytes([
        0xf3, 0x9f, 0xd6, 0xe5, 0x1a, 0xad, 0x88, 0xf6, 0xf4, 0xce, 0x6a, 0xb8, 0x82, 0x72, 0x79,
        0xcf, 0xff, 0xb9, 0x22, 0x66,
    ]);

    pub async fn run(seed: u64) {
        let ledger = Rc::new(MemoryLedger::default());
        ledger.deploy(CONTRACT);
        ledger.connect(PLAYER);
        // A couple of rows from earlier players
        ledger.seed(Address::from_bytes([0x70; 20]), 12, 1_699_990_000);
        ledger.seed(Address::from_bytes([0x3c; 20]), 4, 1_699_995_000);

        let config = Rc::new(RuntimeConfig::new().with_address(CONTRACT.to_string()));
        let pool = Rc::new(ClientPool::shared(Rc::clone(&ledger)));
        let machine = Rc::new(RefCell::new(ScoreSubmission::new()));
        let submitter = Submitter::new(Rc::clone(&machine), Rc::clone(&pool), Rc::clone(&config));
        let cache = LeaderboardCache::new(pool, Rc::clone(&config));
        let store: Rc<dyn PersistentStore> = Rc::from(default_store());

        for (i, game) in [GameKind::Flappy, GameKind::Snake].into_iter().enumerate() {
            let settings = Settings::load(store.as_ref());
            let mut session = Session::new(
                game,
                settings,
                Rc::clone(&store),
                Rc::clone(&machine),
                seed.wrapping_add(i as u64),
            );
            session.set_wallet_ready(submitter.wallet().is_ready_for(config.expected_chain_id()));
            if let Err(e) = session.start_round() {
                log::error!("Could not start {}: {}", game.as_str(), e);
                continue;
            }

            let Some((outcome, report)) = play(&mut session) else {
                log::warn!("{} round did not finish", game.as_str());
                continue;
            };
            println!(
                "{:>6}: score {} in {} (peak {})",
                game.as_str(),
                outcome.score,
                format_duration(outcome.duration_secs),
                outcome.speed_peak
            );

            if let Some(attempt) = report.attempt {
                if let Some(signal) = submitter.run(attempt).await {
                    cache.on_refresh_signal(signal).await;
                }
            }
            let machine = machine.borrow();
            let tx = machine.record().and_then(|r| r.tx.as_ref()).map(|t| t.0.as_str());
            println!("        {} {}", machine.guidance(), format_tx_hash(tx));
        }

        cache.refresh_global().await;
        print_board("Global top", &cache.view(LeaderboardScope::Global).entries);
        cache.refresh_for_player(PLAYER).await;
        print_board("Your runs", &cache.player(PLAYER).entries);
    }

    fn play(session: &mut Session) -> Option<(RoundOutcome, FrameReport)> {
        for frame in 0..MAX_FRAMES {
            if frame < AUTOPILOT_FRAMES {
                if let Some(event) = session.state().and_then(autopilot) {
                    session.push_input(event);
                }
            }
            let report = session.frame(FRAME_MS);
            if let Some(outcome) = report.outcome {
                return Some((outcome, report));
            }
        }
        None
    }

    fn autopilot(state: &SimulationState) -> Option<InputEvent> {
        if let Some(world) = state.flappy() {
            let bird = &world.bird;
            let next = world
                .pipes
                .iter()
                .filter(|p| p.right() >= bird.pos.x)
                .min_by(|a, b| a.x.total_cmp(&b.x));
            let floor = match next {
                Some(pipe) => pipe.gap_top + pipe.gap - 12.0,
                None => FLAPPY_HEIGHT * 0.6,
            };
            return (bird.pos.y + BIRD_HEIGHT > floor && bird.vel.y > 0.0)
                .then_some(InputEvent::Flap);
        }

        let world = state.snake()?;
        let food = world.food?;
        let distance = |c: Cell| (c.x - food.x).abs() + (c.y - food.y).abs();
        [Direction::Up, Direction::Down, Direction::Left, Direction::Right]
            .into_iter()
            .filter(|d| *d != world.previous_heading.opposite())
            .map(|d| (d, world.head.step(d)))
            .filter(|(_, cell)| cell.in_bounds() && !world.occupies(*cell))
            .min_by_key(|(_, cell)| distance(*cell))
            .map(|(d, _)| InputEvent::Turn(d))
    }

    fn print_board(title: &str, entries: &[chain_arcade::chain::LeaderboardEntry]) {
        println!("\n{}", title);
        if entries.is_empty() {
            println!("  (no scores yet)");
        }
        for (rank, e) in entries.iter().enumerate() {
            let player = e.player.to_string();
            println!(
                "  {:>2}. {}  {:>4}  {:>6}  {}",
                rank + 1,
                format_address(Some(player.as_str())),
                e.score,
                format_duration(e.duration_secs),
                format_timestamp(e.timestamp)
            );
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[tokio::main(flavor = "current_thread")]
async fn main() {
    chain_arcade::init_logging();
    log::info!("Chain Arcade (native demo) starting...");

    let seed = std::env::args()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| chain_arcade::platform::now_ms() as u64);
    demo::run(seed).await;
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // The page drives the library directly
}
