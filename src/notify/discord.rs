use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::{DEFAULT_CURRENCY, HTTP_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::filter::total_price;
use crate::notify::Notifier;
use crate::types::{ListingCandidate, Money};

const EMBED_COLOR: u32 = 0x0099ff;

#[derive(Debug, Serialize)]
struct WebhookMessage {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize, PartialEq)]
struct Embed {
    title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    color: u32,
    fields: Vec<EmbedField>,
    timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumbnail: Option<EmbedImage>,
}

#[derive(Debug, Serialize, PartialEq)]
struct EmbedField {
    name: &'static str,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize, PartialEq)]
struct EmbedImage {
    url: String,
}

fn format_money(m: &Money) -> String {
    format!(
        "${} {}",
        m.value,
        m.currency.as_deref().unwrap_or(DEFAULT_CURRENCY)
    )
}

fn build_embed(candidate: &ListingCandidate, now: DateTime<Utc>) -> Embed {
    let price = candidate
        .price
        .as_ref()
        .map(format_money)
        .unwrap_or_else(|| format!("$N/A {DEFAULT_CURRENCY}"));
    let shipping = candidate
        .shipping_cost
        .as_ref()
        .filter(|m| !m.value.is_empty())
        .map(format_money)
        .unwrap_or_else(|| "See listing".to_string());

    Embed {
        title: candidate.display_title().to_string(),
        url: candidate.web_url.clone().filter(|u| !u.is_empty()),
        color: EMBED_COLOR,
        fields: vec![
            EmbedField { name: "Price", value: price, inline: true },
            EmbedField { name: "Shipping", value: shipping, inline: true },
            EmbedField {
                name: "Total Price",
                value: format!("${} {DEFAULT_CURRENCY}", total_price(candidate)),
                inline: true,
            },
        ],
        timestamp: now.to_rfc3339(),
        thumbnail: candidate
            .preview_image()
            .map(|url| EmbedImage { url: url.to_string() }),
    }
}

/// Posts listing alerts as embeds to a Discord webhook.
pub struct DiscordNotifier {
    http: reqwest::Client,
    webhook_url: Option<String>,
}

impl DiscordNotifier {
    pub fn new(webhook_url: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http, webhook_url })
    }

    pub fn is_active(&self) -> bool {
        self.webhook_url.is_some()
    }

    /// Confirm the webhook exists. Discord answers `GET <webhook>` with the webhook object.
    pub async fn verify(&self) -> Result<()> {
        let Some(url) = self.webhook_url.as_deref() else {
            return Err(AppError::NotifyFailed("no Discord webhook configured".to_string()));
        };
        self.http.get(url).send().await?.error_for_status()?;
        info!("Discord channel connected");
        Ok(())
    }

    async fn post(&self, url: &str, candidate: &ListingCandidate) -> Result<()> {
        let message = WebhookMessage {
            embeds: vec![build_embed(candidate, Utc::now())],
        };
        self.http
            .post(url)
            .json(&message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send_alert(&self, candidate: &ListingCandidate) -> Result<()> {
        let Some(url) = self.webhook_url.as_deref() else {
            return Err(AppError::NotifyFailed("Discord channel not available".to_string()));
        };
        self.post(url, candidate)
            .await
            .map_err(|e| AppError::NotifyFailed(e.to_string()))?;
        debug!(title = candidate.display_title(), "Discord alert sent");
        Ok(())
    }
}
