use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{error, info, warn};

use crate::error::Result;
use crate::heartbeat::LivenessSignal;
use crate::schedule::Job;
use crate::supervisor::ProcessRestarter;

/// What the watchdog concluded from the heartbeat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeartbeatStatus {
    Healthy { age: Duration },
    Stale { age: Duration },
    Missing,
    Invalid(String),
}

impl HeartbeatStatus {
    pub fn needs_restart(&self) -> bool {
        !matches!(self, HeartbeatStatus::Healthy { .. })
    }
}

/// Healthy unless the heartbeat is strictly older than `timeout`.
/// A heartbeat from the future counts as zero age.
pub fn classify(last: DateTime<Utc>, now: DateTime<Utc>, timeout: Duration) -> HeartbeatStatus {
    let age = (now - last).to_std().unwrap_or(Duration::ZERO);
    if age > timeout {
        HeartbeatStatus::Stale { age }
    } else {
        HeartbeatStatus::Healthy { age }
    }
}

fn minutes(d: Duration) -> f64 {
    d.as_secs_f64() / 60.0
}

/// Why `status` calls for a restart, or `None` when it is healthy.
fn restart_reason(status: &HeartbeatStatus, timeout: Duration) -> Option<String> {
    match status {
        HeartbeatStatus::Healthy { .. } => None,
        HeartbeatStatus::Stale { age } => Some(format!(
            "Heartbeat is {:.1} minutes old (timeout: {:.0}min)",
            minutes(*age),
            minutes(timeout),
        )),
        HeartbeatStatus::Missing => Some("Heartbeat file not found".to_string()),
        HeartbeatStatus::Invalid(reason) => Some(format!("Invalid heartbeat timestamp ({reason})")),
    }
}

/// Restarts the poller when its heartbeat goes stale, missing or unreadable.
pub struct Watchdog {
    liveness: Arc<dyn LivenessSignal>,
    restarter: Arc<dyn ProcessRestarter>,
    process_name: String,
    timeout: Duration,
}

impl Watchdog {
    pub fn new(
        liveness: Arc<dyn LivenessSignal>,
        restarter: Arc<dyn ProcessRestarter>,
        process_name: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            liveness,
            restarter,
            process_name: process_name.into(),
            timeout,
        }
    }

    pub async fn assess(&self, now: DateTime<Utc>) -> HeartbeatStatus {
        match self.liveness.last_beat().await {
            Ok(Some(last)) => {
                let status = classify(last, now, self.timeout);
                if let HeartbeatStatus::Healthy { age } | HeartbeatStatus::Stale { age } = &status {
                    info!(
                        "Last heartbeat: {} ({:.1} minutes ago)",
                        last.to_rfc3339_opts(SecondsFormat::Millis, true),
                        minutes(*age),
                    );
                }
                status
            }
            Ok(None) => HeartbeatStatus::Missing,
            Err(e) => HeartbeatStatus::Invalid(e.to_string()),
        }
    }

    /// One watchdog pass at `now`. Returns the verdict; a failed restart is an error and is not
    /// retried here.
    pub async fn check(&self, now: DateTime<Utc>) -> Result<HeartbeatStatus> {
        info!("[{}] Checking heartbeat...", now.to_rfc3339());
        let status = self.assess(now).await;

        let Some(reason) = restart_reason(&status, self.timeout) else {
            info!("Heartbeat is healthy");
            return Ok(status);
        };
        warn!("{reason}, restarting process...");

        info!(process = %self.process_name, "Restarting PM2 process: {}", self.process_name);
        self.restarter.restart(&self.process_name).await?;
        info!(process = %self.process_name, "Successfully restarted process: {}", self.process_name);
        Ok(status)
    }
}

#[async_trait]
impl Job for Watchdog {
    fn name(&self) -> &'static str {
        "watchdog"
    }

    async fn run_once(&self) {
        if let Err(e) = self.check(Utc::now()).await {
            error!(process = %self.process_name, "Heartbeat check failed: {e}");
        }
    }
}
