//! Liveness signal shared between the poller and the watchdog.
//!
//! The poller overwrites a single RFC 3339 timestamp after every successful tick; the watchdog
//! only ever reads it. Writes go through a temp file plus rename so a reader never sees a
//! half-written value.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{AppError, Result};

#[async_trait]
pub trait LivenessSignal: Send + Sync {
    /// Record `at` as the last successful tick, replacing any previous value.
    async fn beat(&self, at: DateTime<Utc>) -> Result<()>;

    /// Last recorded beat. `Ok(None)` when nothing has been recorded yet,
    /// `SignalMissingOrInvalid` when the stored value is not a timestamp.
    async fn last_beat(&self) -> Result<Option<DateTime<Utc>>>;
}

/// Heartbeat stored in a plain text file.
#[derive(Debug, Clone)]
pub struct HeartbeatFile {
    path: PathBuf,
}

impl HeartbeatFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "heartbeat".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl LivenessSignal for HeartbeatFile {
    async fn beat(&self, at: DateTime<Utc>) -> Result<()> {
        let staging = self.staging_path();
        tokio::fs::write(&staging, at.to_rfc3339_opts(SecondsFormat::Millis, true)).await?;
        tokio::fs::rename(&staging, &self.path).await?;
        Ok(())
    }

    async fn last_beat(&self) -> Result<Option<DateTime<Utc>>> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        parse_heartbeat(&content).map(Some)
    }
}

pub fn parse_heartbeat(content: &str) -> Result<DateTime<Utc>> {
    let trimmed = content.trim();
    DateTime::parse_from_rfc3339(trimmed)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| AppError::SignalMissingOrInvalid(format!("{trimmed:?} is not a timestamp: {e}")))
}
