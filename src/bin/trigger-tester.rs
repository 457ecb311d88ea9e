//! Interactive tool for poking the conversation trigger by hand.
//!
//! Usage:
//!   cargo run --bin trigger-tester
//!   cargo run --bin trigger-tester -- --database-url https://<db>.firebasedatabase.app
//!
//! Bypasses the sensors entirely: every action reads or writes the shared
//! flag over the REST API.

use clap::Parser;
use conversation_trigger_bridge::config::{self, Config};
use conversation_trigger_bridge::error::Result;
use conversation_trigger_bridge::store::{FirebaseClient, FlagValue};
use conversation_trigger_bridge::tester::{ManualTrigger, MenuChoice, parse_interval};
use log::{error, info};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};
use tokio_util::sync::CancellationToken;

#[derive(Parser)]
#[command(name = "trigger-tester")]
#[command(about = "Manually set and read the conversation trigger")]
struct Cli {
    /// Realtime Database URL
    #[arg(long, env = "FIREBASE_DATABASE_URL")]
    database_url: Option<String>,

    /// Service-account key, database secret or ID token file
    #[arg(long, env = "FIREBASE_CREDENTIALS")]
    credentials: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Load .env file before anything else
    config::load_dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(()) => 0,
        Err(e) => {
            error!("Error: {}", e);
            1
        }
    };
    // A stdin read may still be parked on a blocking thread after Ctrl+C;
    // exit without waiting for the runtime to drain it.
    std::process::exit(code);
}

/// Print `text` and read one line; `None` on EOF or Ctrl+C.
async fn prompt(
    lines: &mut Lines<BufReader<Stdin>>,
    text: &str,
    shutdown: &CancellationToken,
) -> Result<Option<String>> {
    print!("{text}");
    std::io::stdout().flush()?;
    tokio::select! {
        _ = shutdown.cancelled() => Ok(None),
        line = lines.next_line() => Ok(line?),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(url) = cli.database_url {
        config.firebase.database_url = url;
    }
    if let Some(path) = cli.credentials {
        config.firebase.credentials_path = Some(path);
    }

    let client = Arc::new(FirebaseClient::new(&config.firebase)?);
    let tester = ManualTrigger::new(client, config.monitor.settle_delay());

    let shutdown = CancellationToken::new();
    let token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel();
        }
    });

    println!("Conversation trigger tester");
    println!("{}", "=".repeat(40));
    for choice in MenuChoice::ALL {
        println!("{}. {}", choice.number(), choice.label());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let Some(input) = prompt(&mut lines, "\nSelect (1-4): ", &shutdown).await? else {
        info!("[Tester] Exiting");
        return Ok(());
    };

    let choice = match MenuChoice::parse(&input) {
        Ok(choice) => choice,
        Err(e) => {
            error!("[Tester] {}", e);
            return Ok(());
        }
    };

    match choice {
        MenuChoice::Pulse => tester.pulse().await?,
        MenuChoice::RepeatPulse => {
            let default = Duration::from_secs(config.tester.repeat_interval_secs);
            let text = format!("Interval in seconds (default {}): ", default.as_secs());
            let Some(input) = prompt(&mut lines, &text, &shutdown).await? else {
                info!("[Tester] Exiting");
                return Ok(());
            };
            match parse_interval(&input, default) {
                Ok(interval) => {
                    tester.repeat(interval, shutdown).await;
                }
                Err(e) => error!("[Tester] {}", e),
            }
        }
        MenuChoice::ReadFlag => {
            tester.get().await?;
        }
        MenuChoice::ResetFlag => tester.set(&FlagValue::Idle).await?,
    }

    Ok(())
}
