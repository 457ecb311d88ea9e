//! Sensor monitor: samples motion/humidity, stores each reading and raises
//! the conversation trigger on new motion.
//!
//! Usage:
//!   conversation-trigger-bridge            # continuous monitoring
//!   conversation-trigger-bridge test       # one manual trigger pulse
//!   conversation-trigger-bridge --dry-run  # in-memory store, no network

use clap::{Parser, Subcommand};
use conversation_trigger_bridge::clock::MonotonicClock;
use conversation_trigger_bridge::config::{self, Config};
use conversation_trigger_bridge::error::Result;
use conversation_trigger_bridge::input::SimulatedSensors;
use conversation_trigger_bridge::monitor::Monitor;
use conversation_trigger_bridge::store::{FirebaseClient, FlagStore, MemoryStore, SampleStore};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "conversation-trigger-bridge")]
#[command(about = "Raise a realtime database flag when motion starts")]
struct Cli {
    /// Realtime Database URL
    #[arg(long, env = "FIREBASE_DATABASE_URL")]
    database_url: Option<String>,

    /// Service-account key, database secret or ID token file
    #[arg(long, env = "FIREBASE_CREDENTIALS")]
    credentials: Option<PathBuf>,

    /// Keep everything in memory instead of talking to the database
    #[arg(long)]
    dry_run: bool,

    /// Seed for the simulated motion sensor
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Clone, Copy, Default)]
enum Command {
    /// Monitor sensors continuously (default)
    #[default]
    Run,
    /// Send a single start → idle trigger pulse and exit
    Test,
}

fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env before anything else
    config::load_dotenv();
    init_logger();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("System error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    info!("Starting Conversation Trigger Bridge");

    let mut config = Config::from_env();
    if let Some(url) = cli.database_url {
        config.firebase.database_url = url;
    }
    if let Some(path) = cli.credentials {
        config.firebase.credentials_path = Some(path);
    }
    info!("Configuration loaded:");
    info!("  Database URL: {}", config.firebase.database_url);
    info!("  Sample path: {}", config.firebase.sample_path);
    info!("  Trigger path: {}", config.firebase.trigger_path);

    let samples: Arc<dyn SampleStore>;
    let flags: Arc<dyn FlagStore>;
    if cli.dry_run {
        info!("Dry run: using in-memory store");
        let store = Arc::new(MemoryStore::new());
        samples = store.clone();
        flags = store;
    } else {
        if config.firebase.credentials_path.is_none() {
            warn!("No credentials configured, requests are sent unauthenticated");
        }
        // Bad credentials or URL end the process here
        let client = Arc::new(FirebaseClient::new(&config.firebase)?);
        samples = client.clone();
        flags = client;
    }

    let sensors = match cli.seed {
        Some(seed) => SimulatedSensors::seeded(&config.simulation, seed),
        None => SimulatedSensors::new(&config.simulation),
    };

    let mut monitor = Monitor::new(
        config.monitor.clone(),
        Box::new(sensors),
        samples,
        flags,
        Arc::new(MonotonicClock::new()),
    );

    match cli.command.unwrap_or_default() {
        Command::Test => monitor.manual_pulse().await,
        Command::Run => {
            let shutdown = CancellationToken::new();
            let token = shutdown.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => info!("Received shutdown signal"),
                    Err(e) => error!("Failed to listen for shutdown signal: {}", e),
                }
                token.cancel();
            });

            monitor.run(shutdown).await
        }
    }
}
