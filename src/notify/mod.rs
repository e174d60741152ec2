pub mod discord;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ListingCandidate;

pub use discord::DiscordNotifier;

/// Outbound alert capability: one message per call.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Fails with `NotifyFailed`. Fails immediately when no channel is established.
    async fn send_alert(&self, candidate: &ListingCandidate) -> Result<()>;
}
