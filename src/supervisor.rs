use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::info;

use crate::error::{AppError, Result};

/// Restart a supervised process by its logical name.
#[async_trait]
pub trait ProcessRestarter: Send + Sync {
    async fn restart(&self, process_name: &str) -> Result<()>;
}

/// Drives the pm2 CLI.
#[derive(Debug, Clone)]
pub struct Pm2 {
    bin: String,
}

impl Pm2 {
    pub fn new(bin: impl Into<String>) -> Self {
        Self { bin: bin.into() }
    }

    /// Fails when the pm2 daemon cannot be reached.
    pub async fn connect(&self) -> Result<()> {
        let output = self.run(&["ping"]).await.map_err(|e| {
            AppError::RestartFailed(format!("cannot reach pm2 via `{}`: {e}", self.bin))
        })?;
        check_status("pm2 ping", &output)?;
        info!("Connected to PM2");
        Ok(())
    }

    async fn run(&self, args: &[&str]) -> std::io::Result<Output> {
        Command::new(&self.bin).args(args).output().await
    }
}

#[async_trait]
impl ProcessRestarter for Pm2 {
    async fn restart(&self, process_name: &str) -> Result<()> {
        let output = self
            .run(&["restart", process_name])
            .await
            .map_err(|e| AppError::RestartFailed(format!("spawn `{}`: {e}", self.bin)))?;
        check_status(&format!("pm2 restart {process_name}"), &output)
    }
}

fn check_status(what: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(AppError::RestartFailed(format!(
        "`{what}` exited with {}: {}",
        output.status,
        stderr.trim()
    )))
}
