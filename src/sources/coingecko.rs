use std::time::Duration;

use backoff::{backoff::Backoff, exponential::ExponentialBackoff, SystemClock};
use chrono::DateTime;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{info, warn};

use crate::common::{
    check_status, http_client, is_placeholder_key, Entry, Fetch, FetchError, FetchRequest,
    NewsItem,
};

const API_BASE_URL: &str = "https://api.coingecko.com/api/v3";
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Deserialize)]
struct CoinGeckoResponse {
    #[serde(default)]
    data: Vec<CoinGeckoArticle>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    news_site: Option<String>,
    thumb_2x: Option<String>,
    updated_at: Option<i64>,
    created_at: Option<i64>,
}

impl From<CoinGeckoArticle> for NewsItem {
    fn from(article: CoinGeckoArticle) -> Self {
        let published_at = article
            .created_at
            .or(article.updated_at)
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .map(|dt| dt.format("%Y-%m-%dT%H:%M:%SZ").to_string())
            .unwrap_or_default();
        NewsItem::new(
            &article.title.unwrap_or_default(),
            &article.url.unwrap_or_default(),
            &article.news_site.unwrap_or_else(|| "CoinGecko".to_string()),
            &published_at,
            &article.description.unwrap_or_default(),
            &article.thumb_2x.unwrap_or_default(),
        )
    }
}

pub struct CoinGeckoFetcher {
    api_key: String,
    api_base_url: String,
    client: reqwest::Client,
    initial_backoff: Duration,
}

impl CoinGeckoFetcher {
    #[must_use]
    pub fn new(api_key: &str, timeout_secs: u64) -> Self {
        Self {
            api_key: api_key.to_string(),
            api_base_url: API_BASE_URL.to_string(),
            client: http_client(timeout_secs),
            initial_backoff: Duration::from_secs(1),
        }
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.api_base_url = base_url.to_string();
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, initial_backoff: Duration) -> Self {
        self.initial_backoff = initial_backoff;
        self
    }

    /// Delays of 1x, 2x, 4x the initial backoff between the attempts
    fn retry_schedule(&self) -> ExponentialBackoff<SystemClock> {
        ExponentialBackoff {
            current_interval: self.initial_backoff,
            initial_interval: self.initial_backoff,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.initial_backoff * 2u32.pow(MAX_RETRIES),
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// GET the news page, retrying on 429
    async fn get_with_retry(&self) -> Result<reqwest::Response, FetchError> {
        let mut schedule = self.retry_schedule();
        for attempt in 0..=MAX_RETRIES {
            let response = self
                .client
                .get(format!("{}/news", self.api_base_url))
                .header("x-cg-demo-api-key", &self.api_key)
                .send()
                .await?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return check_status(response).await;
            }
            if attempt == MAX_RETRIES {
                break;
            }
            if let Some(delay) = schedule.next_backoff() {
                warn!(
                    "CoinGecko rate limited (attempt {}), retrying in {:?}",
                    attempt + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
            }
        }

        Err(FetchError::RateLimited)
    }
}

impl Fetch for CoinGeckoFetcher {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Entry>, FetchError> {
        if is_placeholder_key(&self.api_key) {
            warn!("CoinGecko API key is not configured");
            return Err(FetchError::InvalidApiKey);
        }

        let body: CoinGeckoResponse = self.get_with_retry().await?.json().await?;
        let query = request.query.trim().to_lowercase();
        let items: Vec<Entry> = body
            .data
            .into_iter()
            .map(NewsItem::from)
            .filter(|item| query.is_empty() || item.title.to_lowercase().contains(&query))
            .take(request.max_records)
            .map(Entry::News)
            .collect();
        if items.is_empty() {
            return Err(FetchError::Empty("No crypto news found in CoinGecko".to_string()));
        }
        info!("CoinGecko returned {} articles", items.len());

        Ok(items)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use httpmock::prelude::*;
    use tokio::test;

    #[test]
    async fn test_rate_limit_exhausts_retries() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/news");
            then.status(429).body("Too Many Requests");
        });

        let fetcher = CoinGeckoFetcher::new("secret", 5)
            .with_base_url(&server.base_url())
            .with_backoff(Duration::from_millis(1));
        let result = fetcher.fetch(&FetchRequest::new("", 10)).await;

        assert!(matches!(result, Err(FetchError::RateLimited)));
        mock.assert_hits(4);
    }

    #[test]
    async fn test_retry_delays_double() {
        let fetcher = CoinGeckoFetcher::new("secret", 5).with_backoff(Duration::from_millis(100));
        let mut schedule = fetcher.retry_schedule();
        let delays: Vec<u128> = (0..MAX_RETRIES)
            .filter_map(|_| schedule.next_backoff())
            .map(|delay| delay.as_millis())
            .collect();
        assert_eq!(delays, vec![100, 200, 400]);
    }

    #[test]
    async fn test_fetch_news() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/news")
                .header("x-cg-demo-api-key", "secret");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{
                        "data": [
                            {
                                "title": "Solana hits new high",
                                "description": "SOL rallies",
                                "author": "Jane",
                                "url": "https://example.com/sol",
                                "updated_at": 1715333400,
                                "news_site": "The Block",
                                "thumb_2x": "https://example.com/sol.png"
                            },
                            {
                                "title": "Dogecoin flat",
                                "url": "https://example.com/doge",
                                "updated_at": 1715329800
                            }
                        ]
                    }"#,
                );
        });

        let fetcher = CoinGeckoFetcher::new("secret", 5).with_base_url(&server.base_url());
        let items = fetcher.fetch(&FetchRequest::new("solana", 10)).await.unwrap();
        mock.assert();

        assert_eq!(items.len(), 1);
        let item = items[0].as_news().unwrap();
        assert_eq!(item.source, "The Block");
        assert_eq!(item.published_at, "2024-05-10T09:30:00Z");
    }
}
