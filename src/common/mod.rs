use std::time::Duration;

use chrono::NaiveDate;

mod data_types;
pub mod time;

pub use data_types::*;

/// Placeholder used when an API key is not configured
pub const PLACEHOLDER_KEY: &str = "YOUR_API_KEY";

/// What the user asked for; every adapter receives the same request
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub query: String,
    pub max_records: usize,
    pub from_date: Option<NaiveDate>,
    pub to_date: Option<NaiveDate>,
}

impl FetchRequest {
    #[must_use]
    pub fn new(query: &str, max_records: usize) -> Self {
        Self {
            query: query.to_string(),
            max_records,
            from_date: None,
            to_date: None,
        }
    }

    #[must_use]
    pub fn with_dates(mut self, from_date: Option<NaiveDate>, to_date: Option<NaiveDate>) -> Self {
        self.from_date = from_date;
        self.to_date = to_date;
        self
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Invalid API key")]
    InvalidApiKey,
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("API error: {0}")]
    Vendor(String),
    #[error("{0}")]
    Empty(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Rate limited, retries exhausted")]
    RateLimited,
}

/// One vendor adapter: turns a request into normalized entries
#[allow(async_fn_in_trait)]
pub trait Fetch {
    fn name(&self) -> &str;
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Entry>, FetchError>;
}

/// De-duplicate the fetched news items and return the unique items. URL is used as
/// the key, the first occurrence wins. Reports are kept as they are.
#[must_use]
pub fn deduplicate(items: Vec<Entry>) -> Vec<Entry> {
    let mut unique_items: Vec<Entry> = Vec::new();
    let mut urls: std::collections::HashSet<String> = std::collections::HashSet::new();

    for item in items {
        if item.is_report() || urls.insert(item.key()) {
            unique_items.push(item);
        }
    }

    unique_items
}

/// Check if a URL is missing or empty in the item
#[must_use]
pub fn is_missing_url(item_url: &str) -> bool {
    item_url.trim().is_empty() || item_url == "-"
}

/// An API key counts as unconfigured when empty or left at the placeholder
#[must_use]
pub fn is_placeholder_key(key: &str) -> bool {
    let key = key.trim();
    key.is_empty() || key == PLACEHOLDER_KEY
}

/// Build the HTTP client shared by an adapter
#[must_use]
pub fn http_client(timeout_secs: u64) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("news-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_default()
}

/// Fail with the response body when the status is not 2xx
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(FetchError::Status {
        status: status.as_u16(),
        body: truncate_chars(&body, 200),
    })
}

/// Cut a string to at most `max_chars` characters, appending "..." when cut
#[must_use]
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    format!("{}...", cut.trim_end())
}
