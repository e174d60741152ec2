use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Config, EBAY_END_USER_CTX, EBAY_MARKETPLACE_ID, EBAY_OAUTH_SCOPE, HTTP_TIMEOUT_SECS};
use crate::error::{AppError, Result};
use crate::search::{SearchRequest, SearchSource};
use crate::types::{ListingCandidate, ListingKey, Money};

/// Refresh the application token this long before eBay says it expires.
const TOKEN_REFRESH_MARGIN_SECS: u64 = 60;

// ---------------------------------------------------------------------------
// Browse API response shapes (only the fields the monitor reads)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchPagedCollection {
    #[serde(default)]
    item_summaries: Vec<ItemSummary>,
    total: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemSummary {
    item_id: Option<String>,
    title: Option<String>,
    price: Option<ConvertedAmount>,
    #[serde(default)]
    shipping_options: Vec<ShippingOption>,
    seller: Option<Seller>,
    item_web_url: Option<String>,
    #[serde(default)]
    thumbnail_images: Vec<Image>,
    image: Option<Image>,
}

#[derive(Debug, Deserialize)]
struct ConvertedAmount {
    value: Option<String>,
    currency: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShippingOption {
    shipping_cost: Option<ConvertedAmount>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Seller {
    username: Option<String>,
    feedback_percentage: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Image {
    image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

impl ConvertedAmount {
    fn into_money(self) -> Option<Money> {
        let value = self.value?;
        Some(Money {
            value,
            currency: self.currency,
        })
    }
}

impl From<ItemSummary> for ListingCandidate {
    fn from(item: ItemSummary) -> Self {
        let shipping_cost = item
            .shipping_options
            .into_iter()
            .next()
            .and_then(|o| o.shipping_cost)
            .and_then(ConvertedAmount::into_money);
        let (seller_username, seller_feedback_percentage) = match item.seller {
            Some(s) => (s.username, s.feedback_percentage),
            None => (None, None),
        };

        ListingCandidate {
            key: item.item_id.map(ListingKey::from),
            title: item.title,
            price: item.price.and_then(ConvertedAmount::into_money),
            shipping_cost,
            seller_username,
            seller_feedback_percentage,
            web_url: item.item_web_url,
            thumbnail_url: item.thumbnail_images.into_iter().next().and_then(|i| i.image_url),
            image_url: item.image.and_then(|i| i.image_url),
        }
    }
}

/// Parse a Browse `item_summary/search` body into candidates, keeping eBay's order.
fn parse_search_response(body: &str) -> Result<Vec<ListingCandidate>> {
    let page: SearchPagedCollection = serde_json::from_str(body)?;
    debug!(
        returned = page.item_summaries.len(),
        total = page.total.unwrap_or(0),
        "Browse search page parsed"
    );
    Ok(page.item_summaries.into_iter().map(ListingCandidate::from).collect())
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

struct AppToken {
    access_token: String,
    refresh_at: Instant,
}

/// eBay Browse API client authenticated with an application (client-credentials) token.
pub struct EbayClient {
    http: reqwest::Client,
    api_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<AppToken>>,
}

impl EbayClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            api_url: cfg.ebay_api_url.trim_end_matches('/').to_string(),
            client_id: cfg.ebay_client_id.clone(),
            client_secret: cfg.ebay_client_secret.clone(),
            token: Mutex::new(None),
        })
    }

    async fn app_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        let url = format!("{}/identity/v1/oauth2/token", self.api_url);
        let resp = self
            .http
            .post(&url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[("grant_type", "client_credentials"), ("scope", EBAY_OAUTH_SCOPE)])
            .send()
            .await?
            .error_for_status()?;
        let token: TokenResponse = resp.json().await?;

        let lifetime = token.expires_in.saturating_sub(TOKEN_REFRESH_MARGIN_SECS);
        info!("eBay application token acquired (valid {}s)", token.expires_in);
        *cached = Some(AppToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + Duration::from_secs(lifetime),
        });
        Ok(token.access_token)
    }

    async fn search_once(&self, request: &SearchRequest) -> Result<Vec<ListingCandidate>> {
        let token = self.app_token().await?;
        let url = format!("{}/buy/browse/v1/item_summary/search", self.api_url);
        let limit = request.limit.to_string();

        let resp = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header("X-EBAY-C-MARKETPLACE-ID", EBAY_MARKETPLACE_ID)
            .header("X-EBAY-C-ENDUSERCTX", EBAY_END_USER_CTX)
            .query(&[
                ("q", request.query.as_str()),
                ("limit", limit.as_str()),
                ("sort", request.sort.as_str()),
                ("filter", request.filter.as_str()),
            ])
            .send()
            .await?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            warn!("eBay rejected the application token; it will be refreshed next tick");
            self.token.lock().await.take();
        }

        let body = resp.error_for_status()?.text().await?;
        parse_search_response(&body)
    }
}

#[async_trait]
impl SearchSource for EbayClient {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<ListingCandidate>> {
        self.search_once(request)
            .await
            .map_err(|e| AppError::SearchQueryFailed(e.to_string()))
    }
}
