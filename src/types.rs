use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// ListingKey
// ---------------------------------------------------------------------------

/// Marketplace item identifier, e.g. `v1|297393658256|0`. The only thing ever persisted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingKey(String);

impl ListingKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ListingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ListingKey {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ListingKey {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// ListingCandidate
// ---------------------------------------------------------------------------

/// Decimal amount as the marketplace sends it: a string value plus currency code.
#[derive(Debug, Clone, PartialEq)]
pub struct Money {
    pub value: String,
    pub currency: Option<String>,
}

impl Money {
    pub fn new(value: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            currency: Some(currency.into()),
        }
    }

    /// Numeric value; anything that does not parse counts as zero.
    pub fn amount(&self) -> f64 {
        self.value.trim().parse::<f64>().unwrap_or(0.0)
    }
}

/// One item from the current tick's search response. Lives for a single tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingCandidate {
    pub key: Option<ListingKey>,
    pub title: Option<String>,
    pub price: Option<Money>,
    /// Cost of the first listed shipping option only.
    pub shipping_cost: Option<Money>,
    pub seller_username: Option<String>,
    /// Raw feedback percentage string, e.g. `"99.4"`.
    pub seller_feedback_percentage: Option<String>,
    pub web_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub image_url: Option<String>,
}

impl ListingCandidate {
    /// Key if present and non-empty.
    pub fn listing_key(&self) -> Option<&ListingKey> {
        self.key.as_ref().filter(|k| !k.as_str().trim().is_empty())
    }

    /// Seller feedback as a number. Missing, unparseable or non-finite feedback counts as 0%.
    pub fn feedback_percent(&self) -> f64 {
        self.seller_feedback_percentage
            .as_deref()
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    /// Image to attach to the alert: thumbnail first, primary image second.
    pub fn preview_image(&self) -> Option<&str> {
        self.thumbnail_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.image_url.as_deref().filter(|u| !u.is_empty()))
    }

    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Unknown Title")
    }
}
