use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Dedup store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Search query failed: {0}")]
    SearchQueryFailed(String),

    #[error("Notification failed: {0}")]
    NotifyFailed(String),

    #[error("Heartbeat missing or invalid: {0}")]
    SignalMissingOrInvalid(String),

    #[error("Process restart failed: {0}")]
    RestartFailed(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AppError>;
