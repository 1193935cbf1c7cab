use clap::Parser;
use log::{error, info, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use server::config::GameConfig;
use server::content::ContentBank;
use server::game::RoundEngine;
use server::network::ConnectionAcceptor;
use server::registry::ConnectionRegistry;
use std::path::PathBuf;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = shared::DEFAULT_HOST)]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value_t = shared::DEFAULT_PORT)]
    port: u16,

    /// Number of rounds to play
    #[arg(short, long, default_value = "3")]
    rounds: u32,

    /// Seconds a player has to vote before echo 1 is assumed
    #[arg(long, default_value = "30")]
    vote_timeout: u64,

    /// Seconds to pause between rounds
    #[arg(long, default_value = "2")]
    round_pause: u64,

    /// JSON file with the echo bank (array of {"text", "is_true"})
    #[arg(short, long)]
    bank: Option<PathBuf>,

    /// Seed for role and echo selection
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = GameConfig {
        max_rounds: args.rounds,
        vote_timeout: Duration::from_secs(args.vote_timeout),
        round_pause: Duration::from_secs(args.round_pause),
        ..GameConfig::default()
    };

    let bank = match &args.bank {
        Some(path) => ContentBank::from_json_file(path)?,
        None => ContentBank::default(),
    };
    info!("Loaded {} echoes", bank.len());

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let registry = ConnectionRegistry::new();
    let engine = RoundEngine::new(config, bank, registry.clone(), rng);

    let address = format!("{}:{}", args.host, args.port);
    let acceptor = ConnectionAcceptor::bind(&address, registry, engine.subscribe()).await?;

    println!("Press Enter to start the game...");
    let game_handle = tokio::spawn(engine.run(wait_for_enter()));

    tokio::select! {
        _ = acceptor.run() => {}
        _ = tokio::signal::ctrl_c() => {
            println!("Received Ctrl+C, shutting down...");
            return Ok(());
        }
    }

    match game_handle.await {
        Ok(state) => info!(
            "Session finished: {} rounds, {} accepted lie(s)",
            state.current_round, state.accepted_lies
        ),
        Err(e) => error!("Game loop task panicked: {}", e),
    }

    Ok(())
}

/// Resolves on the first line (or EOF) from the console.
async fn wait_for_enter() {
    let mut line = String::new();
    if let Err(e) = BufReader::new(tokio::io::stdin()).read_line(&mut line).await {
        warn!("Could not read start signal from stdin: {}", e);
    }
}
