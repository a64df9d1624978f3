use serde::Deserialize;
use tracing::{info, warn};

use crate::common::{
    check_status, http_client, is_placeholder_key, Entry, Fetch, FetchError, FetchRequest,
    NewsItem,
};

const API_BASE_URL: &str = "https://api.worldnewsapi.com";

#[derive(Debug, Deserialize)]
struct WorldNewsResponse {
    #[serde(default)]
    news: Vec<WorldNewsArticle>,
    status: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WorldNewsArticle {
    title: Option<String>,
    text: Option<String>,
    summary: Option<String>,
    url: Option<String>,
    image: Option<String>,
    publish_date: Option<String>,
    source_country: Option<String>,
}

impl From<WorldNewsArticle> for NewsItem {
    fn from(article: WorldNewsArticle) -> Self {
        // Prefer the summary; the full text can run to thousands of characters
        let description = article
            .summary
            .filter(|s| !s.trim().is_empty())
            .or_else(|| article.text.map(|t| t.chars().take(500).collect()))
            .unwrap_or_default();
        let source = match article.source_country {
            Some(country) if !country.is_empty() => format!("World News API ({country})"),
            _ => "World News API".to_string(),
        };
        NewsItem::new(
            &article.title.unwrap_or_default(),
            &article.url.unwrap_or_default(),
            &source,
            &article.publish_date.unwrap_or_default(),
            &description,
            &article.image.unwrap_or_default(),
        )
    }
}

pub struct WorldNewsFetcher {
    api_key: String,
    api_base_url: String,
    client: reqwest::Client,
}

impl WorldNewsFetcher {
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

impl Fetch for WorldNewsFetcher {
    fn name(&self) -> &str {
        "World News API"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Entry>, FetchError> {
        if is_placeholder_key(&self.api_key) {
            warn!("World News API key is not configured");
            return Err(FetchError::InvalidApiKey);
        }

        let mut params = vec![
            ("text", request.query.clone()),
            ("language", "en".to_string()),
            ("number", request.max_records.to_string()),
            ("api-key", self.api_key.clone()),
        ];
        if let Some(from) = request.from_date {
            params.push(("earliest-publish-date", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = request.to_date {
            params.push(("latest-publish-date", to.format("%Y-%m-%d").to_string()));
        }

        let response = self
            .client
            .get(format!("{}/search-news", self.api_base_url))
            .query(&params)
            .send()
            .await?;
        let body: WorldNewsResponse = check_status(response).await?.json().await?;

        if body.status.as_deref() == Some("failure") {
            return Err(FetchError::Vendor(
                body.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        if body.news.is_empty() {
            return Err(FetchError::Empty(
                "No articles found in World News API".to_string(),
            ));
        }

        let items: Vec<Entry> = body.news.into_iter().map(|a| Entry::News(a.into())).collect();
        info!("World News API returned {} articles", items.len());

        Ok(items)
    }
}
