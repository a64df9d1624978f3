use chrono::DateTime;
use serde::Deserialize;
use tracing::{info, warn};

use crate::common::{
    check_status, http_client, is_placeholder_key, Entry, Fetch, FetchError, FetchRequest,
    NewsItem,
};

const API_BASE_URL: &str = "https://min-api.cryptocompare.com";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CryptoCompareResponse {
    #[serde(rename = "Type")]
    kind: Option<i64>,
    response: Option<String>,
    message: Option<String>,
    /// An array on success, an empty object on some errors
    #[serde(default)]
    data: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CryptoCompareArticle {
    title: Option<String>,
    body: Option<String>,
    url: Option<String>,
    imageurl: Option<String>,
    published_on: Option<i64>,
    source: Option<String>,
    source_info: Option<CryptoCompareSource>,
}

#[derive(Debug, Deserialize)]
struct CryptoCompareSource {
    name: Option<String>,
}

impl From<CryptoCompareArticle> for NewsItem {
    fn from(article: CryptoCompareArticle) -> Self {
        let published_at = article
            .published_on
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_default();
        let source = article
            .source_info
            .and_then(|s| s.name)
            .or(article.source)
            .unwrap_or_else(|| "CryptoCompare".to_string());
        NewsItem::new(
            &article.title.unwrap_or_default(),
            &article.url.unwrap_or_default(),
            &source,
            &published_at,
            &article.body.unwrap_or_default(),
            &article.imageurl.unwrap_or_default(),
        )
    }
}

/// The news endpoint has no search; the query is matched against title and body
fn matches_query(item: &NewsItem, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return true;
    }
    item.title.to_lowercase().contains(&query) || item.description.to_lowercase().contains(&query)
}

pub struct CryptoCompareFetcher {
    api_key: String,
    api_base_url: String,
    client: reqwest::Client,
}

impl CryptoCompareFetcher {
    #[must_use]
    pub fn new(api_key: &str, timeout_secs: u64) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            client: http_client(timeout_secs),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.api_base_url = base_url.to_string();
        self
    }
}

impl Fetch for CryptoCompareFetcher {
    fn name(&self) -> &str {
        "CryptoCompare"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Entry>, FetchError> {
        if is_placeholder_key(&self.api_key) {
            warn!("CryptoCompare API key is not configured");
            return Err(FetchError::InvalidApiKey);
        }

        let response = self
            .client
            .get(format!("{}/data/v2/news/", self.api_base_url))
            .query(&[("lang", "EN"), ("api_key", self.api_key.as_str())])
            .send()
            .await?;
        let body: CryptoCompareResponse = check_status(response).await?.json().await?;

        if body.response.as_deref() == Some("Error") {
            return Err(FetchError::Vendor(
                body.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        if body.kind.is_some_and(|kind| kind >= 99) {
            warn!("CryptoCompare answered with type {:?}", body.kind);
        }

        let articles: Vec<CryptoCompareArticle> = match body.data {
            serde_json::Value::Array(_) => serde_json::from_value(body.data)
                .map_err(|e| FetchError::Parse(e.to_string()))?,
            _ => Vec::new(),
        };
        let items: Vec<Entry> = articles
            .into_iter()
            .map(NewsItem::from)
            .filter(|item| matches_query(item, &request.query))
            .take(request.max_records)
            .map(Entry::News)
            .collect();
        if items.is_empty() {
            return Err(FetchError::Empty(format!(
                "No CryptoCompare news matching '{}'",
                request.query
            )));
        }
        info!("CryptoCompare returned {} articles", items.len());

        Ok(items)
    }
}
