use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use listing_monitor::cancel_on_shutdown_signal;
use listing_monitor::config::{Config, TICK_INTERVAL_SECS};
use listing_monitor::db::SqliteDedupStore;
use listing_monitor::error::{AppError, Result};
use listing_monitor::heartbeat::HeartbeatFile;
use listing_monitor::monitor::ListingMonitor;
use listing_monitor::notify::DiscordNotifier;
use listing_monitor::schedule::run_every;
use listing_monitor::search::EbayClient;

/// Command-line arguments for the listing monitor.
#[derive(Parser, Debug)]
#[command(author, version, about = "Polls eBay for new listings and alerts a Discord channel", long_about = None)]
struct Args {
    /// Run one check that records current listings without alerting, then exit.
    #[arg(long)]
    seed: bool,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    let result = if args.seed {
        seed(cfg).await
    } else {
        run(cfg).await
    };

    if let Err(e) = result {
        if args.seed {
            error!("Seeding failed: {e}");
        } else {
            error!("Fatal error: {e}");
        }
        std::process::exit(1);
    }
}

/// Record every listing the search currently returns so the first real run starts quiet.
async fn seed(cfg: Config) -> Result<()> {
    info!("Running in seed mode - Discord notifications disabled");
    cfg.require_ebay_credentials()?;

    let store = Arc::new(SqliteDedupStore::connect(&cfg.db_path).await?);
    let monitor = ListingMonitor::new(
        store.clone(),
        Arc::new(EbayClient::new(&cfg)?),
        Arc::new(DiscordNotifier::new(None)?),
        Arc::new(HeartbeatFile::new(cfg.heartbeat_path.clone())),
        cfg.min_feedback_percent,
    )
    .without_notifications();

    let result = monitor.tick().await;
    store.close().await;
    result?;

    info!("Seeding complete");
    Ok(())
}

async fn run(cfg: Config) -> Result<()> {
    cfg.require_ebay_credentials()?;

    // --- Discord channel ---
    let notifier = DiscordNotifier::new(cfg.discord_webhook_url.clone())?;
    if !notifier.is_active() {
        return Err(AppError::Config(
            "DISCORD_WEBHOOK_URL must be set unless running with --seed".to_string(),
        ));
    }
    notifier.verify().await?;

    // --- Database setup ---
    let store = Arc::new(SqliteDedupStore::connect(&cfg.db_path).await?);

    let monitor = ListingMonitor::new(
        store.clone(),
        Arc::new(EbayClient::new(&cfg)?),
        Arc::new(notifier),
        Arc::new(HeartbeatFile::new(cfg.heartbeat_path.clone())),
        cfg.min_feedback_percent,
    );

    let shutdown = CancellationToken::new();
    cancel_on_shutdown_signal(shutdown.clone());

    info!(
        heartbeat = %cfg.heartbeat_path.display(),
        min_feedback = cfg.min_feedback_percent,
        "Checking for new listings every {TICK_INTERVAL_SECS}s; running initial check now",
    );
    run_every(Arc::new(monitor), cfg.tick_interval(), true, shutdown).await;

    store.close().await;
    info!("Listing monitor stopped");
    Ok(())
}
