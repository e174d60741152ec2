use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use listing_monitor::cancel_on_shutdown_signal;
use listing_monitor::config::{Config, TICK_INTERVAL_SECS};
use listing_monitor::error::Result;
use listing_monitor::heartbeat::HeartbeatFile;
use listing_monitor::schedule::run_every;
use listing_monitor::supervisor::Pm2;
use listing_monitor::watchdog::Watchdog;

/// Command-line arguments for the heartbeat watchdog.
#[derive(Parser, Debug)]
#[command(author, version, about = "Restarts the listing monitor when its heartbeat goes stale", long_about = None)]
struct Args {
    /// Run a single heartbeat check and exit.
    #[arg(long)]
    once: bool,
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

    let watchdog = match connect(&cfg).await {
        Ok(w) => w,
        Err(e) => {
            error!("Failed to start watchdog: {e}");
            std::process::exit(1);
        }
    };

    if args.once {
        if let Err(e) = watchdog.check(Utc::now()).await {
            error!(process = %cfg.process_name, "Heartbeat check failed: {e}");
            std::process::exit(1);
        }
        return;
    }

    run(cfg, watchdog).await;
}

async fn connect(cfg: &Config) -> Result<Watchdog> {
    let pm2 = Pm2::new(cfg.pm2_bin.clone());
    pm2.connect().await?;

    Ok(Watchdog::new(
        Arc::new(HeartbeatFile::new(cfg.heartbeat_path.clone())),
        Arc::new(pm2),
        cfg.process_name.clone(),
        cfg.heartbeat_timeout(),
    ))
}

async fn run(cfg: Config, watchdog: Watchdog) {

    info!(
        heartbeat = %cfg.heartbeat_path.display(),
        "Starting watchdog for PM2 process: {} (checking every {TICK_INTERVAL_SECS}s, timeout: {} minutes)",
        cfg.process_name,
        cfg.heartbeat_timeout_minutes,
    );

    let shutdown = CancellationToken::new();
    cancel_on_shutdown_signal(shutdown.clone());
    run_every(Arc::new(watchdog), cfg.tick_interval(), false, shutdown).await;

    info!("Watchdog stopped");
}
