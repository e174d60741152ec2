use std::path::PathBuf;
use std::time::Duration;

use crate::error::{AppError, Result};

pub const EBAY_API_URL: &str = "https://api.ebay.com";
pub const EBAY_MARKETPLACE_ID: &str = "EBAY_AU";
pub const EBAY_END_USER_CTX: &str = "contextualLocation=country=AU,zip=2000";
pub const EBAY_OAUTH_SCOPE: &str = "https://api.ebay.com/oauth/api_scope";

/// Both loops fire once a minute.
pub const TICK_INTERVAL_SECS: u64 = 60;

/// Timeout applied to every outbound HTTP request (seconds).
pub const HTTP_TIMEOUT_SECS: u64 = 30;

/// Maximum item summaries requested per search. Only one page is ever fetched.
pub const SEARCH_LIMIT: u32 = 200;

/// Sellers below this feedback percentage are never alerted on.
pub const DEFAULT_MIN_FEEDBACK_PERCENT: f64 = 95.0;

/// Heartbeat age (minutes) past which the watchdog restarts the poller.
pub const DEFAULT_HEARTBEAT_TIMEOUT_MINUTES: u64 = 2;

pub const DEFAULT_PROCESS_NAME: &str = "ebay-listings-monitor";

/// Currency assumed for the total-price field and for prices that omit one.
pub const DEFAULT_CURRENCY: &str = "AUD";

/// Fixed search parameters for the listing query.
pub mod search_params {
    pub const SORT: &str = "newlyListed";
    pub const FILTER: &str = "buyingOptions:{FIXED_PRICE|BEST_OFFER},itemLocationCountry:AU,price:[200..350],priceCurrency:AUD";

    /// Base query. Foreign-set symbol exclusions are appended at build time.
    pub const BASE_QUERY: &str = r#"(Pokémon, Pokemon) booster box -japanese -japan -jp -empty -korean -etb -metazoo -thai -chinese -equivalent -collection -bundle -"elite trainer box" -"high class" -sticker -stickers -"ex box" -tin -blister -opened -unsealed -used -"uk exclusive" -"vstar universe" -"half booster box""#;

    /// Set codes of non-English print runs, excluded from every search.
    pub const FOREIGN_SET_SYMBOLS: &[&str] = &[
        // Sun and Moon
        "sm1", "sm1+", "sm2", "sm2+", "sm4", "sm4+", "sm5", "sm5+", "sm6a", "sm6b", "sm7a", "sm7b",
        "sm8a", "sm8b", "sm9a", "sm9b", "sm10a", "sm10b", "sm11a", "sm11b", "sm12a",
        // Sword and Shield
        "s1a", "s2a", "s3a", "s4a", "s5a", "s6a", "s7r", "s8a", "s8b", "s9a", "s10a", "s10b",
        "s11a", "s12a",
        // Scarlet and Violet
        "sv1a", "sv1b", "sv1s", "sv2a", "sv2p", "sv3a", "sv4a", "sv4k", "sv5a", "sv5k", "sv5m",
        "sv6a", "sv7a", "sv8a", "sv9a", "sv10", "sv11b", "sv11w",
        // Misc
        "as2a", "as4a",
    ];
}

#[derive(Debug, Clone)]
pub struct Config {
    pub ebay_api_url: String,
    pub ebay_client_id: String,
    pub ebay_client_secret: String,
    /// Discord webhook the alerts go to. `None` leaves the notifier without a channel.
    pub discord_webhook_url: Option<String>,
    pub log_level: String,
    pub db_path: String,
    pub heartbeat_path: PathBuf,
    /// Minimum seller feedback percentage (MIN_FEEDBACK_PERCENT)
    pub min_feedback_percent: f64,
    /// Heartbeat staleness threshold in minutes (HEARTBEAT_TIMEOUT_MINUTES)
    pub heartbeat_timeout_minutes: u64,
    /// pm2 name of the poller process (PM2_PROCESS_NAME)
    pub process_name: String,
    /// pm2 executable (PM2_BIN)
    pub pm2_bin: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            ebay_api_url: std::env::var("EBAY_API_URL")
                .unwrap_or_else(|_| EBAY_API_URL.to_string()),
            ebay_client_id: std::env::var("EBAY_PRODUCTION_CLIENT_ID").unwrap_or_default(),
            ebay_client_secret: std::env::var("EBAY_PRODUCTION_CLIENT_SECRET").unwrap_or_default(),
            discord_webhook_url: std::env::var("DISCORD_WEBHOOK_URL")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| "listings.db".to_string()),
            heartbeat_path: std::env::var("HEARTBEAT_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("heartbeat.txt")),
            min_feedback_percent: std::env::var("MIN_FEEDBACK_PERCENT")
                .unwrap_or_else(|_| DEFAULT_MIN_FEEDBACK_PERCENT.to_string())
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| {
                    AppError::Config("MIN_FEEDBACK_PERCENT must be a number".to_string())
                })?,
            heartbeat_timeout_minutes: parse_timeout_minutes(
                &std::env::var("HEARTBEAT_TIMEOUT_MINUTES")
                    .unwrap_or_else(|_| DEFAULT_HEARTBEAT_TIMEOUT_MINUTES.to_string()),
            )?,
            process_name: std::env::var("PM2_PROCESS_NAME")
                .unwrap_or_else(|_| DEFAULT_PROCESS_NAME.to_string()),
            pm2_bin: std::env::var("PM2_BIN").unwrap_or_else(|_| "pm2".to_string()),
        })
    }

    /// Credentials are only needed by the poller, so the watchdog never calls this.
    pub fn require_ebay_credentials(&self) -> Result<()> {
        if self.ebay_client_id.is_empty() || self.ebay_client_secret.is_empty() {
            return Err(AppError::Config(
                "EBAY_PRODUCTION_CLIENT_ID and EBAY_PRODUCTION_CLIENT_SECRET must be set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_minutes.saturating_mul(60))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(TICK_INTERVAL_SECS)
    }
}

/// Whole minutes whose length in seconds still fits a `u64`.
fn parse_timeout_minutes(raw: &str) -> Result<u64> {
    let minutes = raw.trim().parse::<u64>().map_err(|_| {
        AppError::Config("HEARTBEAT_TIMEOUT_MINUTES must be a whole number of minutes".to_string())
    })?;
    minutes.checked_mul(60).ok_or_else(|| {
        AppError::Config(format!("HEARTBEAT_TIMEOUT_MINUTES is too large: {minutes}"))
    })?;
    Ok(minutes)
}

/// Full search string: base query followed by one `-symbol` exclusion per foreign set.
pub fn listing_query() -> String {
    let exclusions = search_params::FOREIGN_SET_SYMBOLS
        .iter()
        .map(|s| format!("-{s}"))
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {}", search_params::BASE_QUERY, exclusions)
}
