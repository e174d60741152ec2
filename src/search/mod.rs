pub mod ebay;

use async_trait::async_trait;

use crate::config::{listing_query, search_params, SEARCH_LIMIT};
use crate::error::Result;
use crate::types::ListingCandidate;

pub use ebay::EbayClient;

/// One bounded search request. Only a single page is ever requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    pub limit: u32,
    pub sort: String,
    pub filter: String,
}

impl SearchRequest {
    /// The fixed listing search: newest first, AU fixed-price/best-offer, AUD 200..350.
    pub fn listings() -> Self {
        Self {
            query: listing_query(),
            limit: SEARCH_LIMIT,
            sort: search_params::SORT.to_string(),
            filter: search_params::FILTER.to_string(),
        }
    }
}

/// Marketplace search capability.
#[async_trait]
pub trait SearchSource: Send + Sync {
    /// Results in the source's own ranking. Fails with `SearchQueryFailed`.
    async fn search(&self, request: &SearchRequest) -> Result<Vec<ListingCandidate>>;
}
