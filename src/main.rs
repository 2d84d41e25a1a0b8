//! Binary entrypoint for the battlebot CLI.
//!
//! Commands:
//! - `init` - write a starter `config.toml` and an empty roster
//! - `start [--seed N]` - run the battle service (expiry sweep + autosave) until Ctrl-C
//! - `status` - print a roster summary
//! - `duel <a> <b> [--seed N] [--stake S]` - fight two roster players right now
//!
//! See the library crate docs for module-level details: `battlebot::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::{error, info};
use std::sync::Arc;

use battlebot::battle::{
    seeded_rollers, Battle, BattleOutcome, GameError, ItemCatalog, PlayerRoster, SeededRoller,
};
use battlebot::config::Config;
use battlebot::game::Game;
use battlebot::messaging::{ChannelSink, ChatSink};
use battlebot::storage::{JsonPlayerStore, PlayerStore};

#[derive(Parser)]
#[command(name = "battlebot")]
#[command(about = "Turn-based battles for persistent chat characters")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the battle service
    Start {
        /// Base seed; battle n uses seed + n
        #[arg(long)]
        seed: Option<u64>,
    },
    /// Create a default configuration and an empty roster
    Init,
    /// Show roster statistics
    Status,
    /// Run a battle between two roster players and print the log
    Duel {
        /// Initiator id or name
        initiator: String,
        /// Defender id or name
        defender: String,
        /// Seed for a reproducible fight
        #[arg(long)]
        seed: Option<u64>,
        /// Money at stake (defaults to the configured stake)
        #[arg(long)]
        stake: Option<i64>,
    },
}

/// Prints narration straight to stdout.
struct StdoutSink;

impl ChatSink for StdoutSink {
    fn send_message(&self, channel: &str, text: &str) {
        println!("[{}]\n{}", channel, text);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Config::load(&cli.config).await.ok(),
    };
    init_logging(&pre_config, cli.verbose);

    match cli.command {
        Commands::Init => {
            info!("Initializing new battlebot configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            let cfg = Config::default();
            let store = JsonPlayerStore::new(&cfg.storage.data_dir);
            if store.load_all()?.is_empty() {
                store.save_all(&[])?;
            }
            info!("Roster initialized at {}", store.path().display());
        }
        Commands::Start { seed } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            info!("Starting battlebot v{}", env!("CARGO_PKG_VERSION"));
            run_service(config, seed).await?;
        }
        Commands::Status => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            let store = JsonPlayerStore::new(&config.storage.data_dir);
            let mut players = store.load_all()?;
            players.sort_by(|a, b| b.xp.cmp(&a.xp).then_with(|| a.name.cmp(&b.name)));
            println!("battlebot v{}", env!("CARGO_PKG_VERSION"));
            println!("Roster: {} players ({})", players.len(), store.path().display());
            for p in players {
                println!(
                    "  {:<20} lvl {:>3}  {:>6}$  {}W/{}L",
                    p.name,
                    p.level(),
                    p.money,
                    p.wins,
                    p.losses
                );
            }
        }
        Commands::Duel {
            initiator,
            defender,
            seed,
            stake,
        } => {
            let config = match pre_config {
                Some(c) => c,
                None => Config::load(&cli.config).await?,
            };
            run_duel(config, &initiator, &defender, seed, stake).await?;
        }
    }

    Ok(())
}

async fn run_service(config: Config, seed: Option<u64>) -> Result<()> {
    let store: Arc<dyn PlayerStore> = Arc::new(JsonPlayerStore::new(&config.storage.data_dir));
    let roster = Arc::new(PlayerRoster::new(config.game.starting_money));
    roster.load(store.as_ref()).await?;

    let (sink, mut outgoing) = ChannelSink::pair();
    let mut game = Game::new(
        config.game.clone(),
        Arc::new(ItemCatalog::default()),
        roster.clone(),
        Arc::new(sink),
    );
    if let Some(seed) = seed {
        info!("Battles are seeded from {}", seed);
        game = game.with_rollers(seeded_rollers(seed));
    }

    let transport = tokio::spawn(async move {
        while let Some(msg) = outgoing.recv().await {
            println!("[{}] {}", msg.channel, msg.text);
        }
    });
    let sweeper = game.spawn_sweeper();
    let autosave = tokio::spawn(
        roster
            .clone()
            .run_autosave(store.clone(), config.storage.save_interval()),
    );

    info!(
        "Ready: {} players, battles expire after {}s",
        roster.len().await,
        config.game.battle_timeout_secs
    );
    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    sweeper.abort();
    autosave.abort();
    if let Err(e) = roster.save(store.as_ref()).await {
        error!("Final save failed: {:#}", e);
    }
    drop(game);
    // flush narration still queued for the transport
    let _ = tokio::time::timeout(std::time::Duration::from_secs(1), transport).await;
    Ok(())
}

async fn run_duel(
    config: Config,
    initiator: &str,
    defender: &str,
    seed: Option<u64>,
    stake: Option<i64>,
) -> Result<()> {
    let store = JsonPlayerStore::new(&config.storage.data_dir);
    let roster = PlayerRoster::new(config.game.starting_money);
    roster.load(&store).await?;

    let a = roster.resolve(initiator).await?;
    let b = roster.resolve(defender).await?;
    if a.id() == b.id() {
        return Err(GameError::SelfBattle.into());
    }

    let roller = match seed {
        Some(s) => SeededRoller::new(s),
        None => SeededRoller::from_entropy(),
    };
    let stake = stake.unwrap_or(config.game.default_stake);
    if stake < 0 {
        return Err(GameError::InvalidAmount(stake).into());
    }
    let mut battle = Battle::new(a, b, stake, "duel").with_roller(Box::new(roller));
    let outcome = battle.run(&ItemCatalog::default(), &StdoutSink).await;
    match outcome {
        BattleOutcome::Decided { winner_id, turns, .. } => {
            info!("Duel won by {} after {} turns", winner_id, turns)
        }
        other => info!("Duel ended without a fight: {:?}", other),
    }

    roster.save(&store).await?;
    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .map(|c| c.logging.level_filter())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    if let Some(f) = log_file {
        let file = std::sync::Arc::new(std::sync::Mutex::new(f));
        // Mirror to the console only in the foreground
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = file.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}
