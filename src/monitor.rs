use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{error, info, warn};

use crate::db::DedupStore;
use crate::error::Result;
use crate::filter::{filter_new_listings, FilterStats};
use crate::heartbeat::LivenessSignal;
use crate::notify::Notifier;
use crate::schedule::Job;
use crate::search::{SearchRequest, SearchSource};
use crate::types::ListingKey;

/// Outcome of one successful poll tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub known_before: usize,
    pub filter: FilterStats,
    pub persisted: usize,
    pub notified: usize,
    pub notify_failed: usize,
}

/// Poll cycle: load known keys, search, filter, persist, notify, beat.
///
/// New keys are persisted before any alert goes out. A crash in between can lose an alert but
/// can never make the next tick alert on the same listing again.
pub struct ListingMonitor {
    store: Arc<dyn DedupStore>,
    search: Arc<dyn SearchSource>,
    notifier: Arc<dyn Notifier>,
    liveness: Arc<dyn LivenessSignal>,
    request: SearchRequest,
    min_feedback_percent: f64,
    notifications_enabled: bool,
}

impl ListingMonitor {
    pub fn new(
        store: Arc<dyn DedupStore>,
        search: Arc<dyn SearchSource>,
        notifier: Arc<dyn Notifier>,
        liveness: Arc<dyn LivenessSignal>,
        min_feedback_percent: f64,
    ) -> Self {
        Self {
            store,
            search,
            notifier,
            liveness,
            request: SearchRequest::listings(),
            min_feedback_percent,
            notifications_enabled: true,
        }
    }

    /// Record listings without alerting on them.
    pub fn without_notifications(mut self) -> Self {
        self.notifications_enabled = false;
        self
    }

    pub fn with_request(mut self, request: SearchRequest) -> Self {
        self.request = request;
        self
    }

    /// Run one tick. Load, search and persist failures abort the tick before the heartbeat is
    /// refreshed; alert failures are logged and counted only.
    pub async fn tick(&self) -> Result<TickReport> {
        info!("[{}] Checking for new listings...", Utc::now().to_rfc3339());

        let known = self.store.list_known_keys().await?;
        info!("Already tracking {} listings", known.len());

        let raw = self.search.search(&self.request).await?;
        if raw.is_empty() {
            info!("No listings found");
        } else {
            info!("Found {} listings", raw.len());
        }

        let outcome = filter_new_listings(&raw, self.min_feedback_percent, &known);
        info!(
            total = outcome.stats.total,
            no_key = outcome.stats.rejected_no_key,
            low_feedback = outcome.stats.rejected_low_feedback,
            known = outcome.stats.rejected_known,
            "{} new listings to process",
            outcome.stats.admitted,
        );

        let mut report = TickReport {
            known_before: known.len(),
            filter: outcome.stats.clone(),
            ..Default::default()
        };

        if !outcome.admitted.is_empty() {
            let keys: Vec<ListingKey> = outcome
                .admitted
                .iter()
                .filter_map(|c| c.listing_key().cloned())
                .collect();
            self.store.insert_keys(&keys).await?;
            report.persisted = keys.len();
        }

        for candidate in &outcome.admitted {
            let key = candidate.listing_key().map(|k| k.as_str()).unwrap_or_default();
            info!(key, "New listing found: {} ({key})", candidate.display_title());
            if !self.notifications_enabled {
                continue;
            }
            match self.notifier.send_alert(candidate).await {
                Ok(()) => report.notified += 1,
                Err(e) => {
                    warn!(key, "Alert for {key} not delivered: {e}");
                    report.notify_failed += 1;
                }
            }
        }

        if !self.notifications_enabled {
            info!("Seeded {} listings into database", report.persisted);
        }

        if let Err(e) = self.liveness.beat(Utc::now()).await {
            error!("Failed to refresh heartbeat: {e}");
        }

        Ok(report)
    }
}

#[async_trait]
impl Job for ListingMonitor {
    fn name(&self) -> &'static str {
        "listing-monitor"
    }

    async fn run_once(&self) {
        match self.tick().await {
            Ok(report) => info!(
                persisted = report.persisted,
                notified = report.notified,
                notify_failed = report.notify_failed,
                "Monitoring cycle complete",
            ),
            Err(e) => error!("Error in monitoring cycle: {e}"),
        }
    }
}
