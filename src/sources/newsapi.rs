use serde::Deserialize;
use tracing::{info, warn};

use crate::common::{
    http_client, is_missing_url, is_placeholder_key, Entry, Fetch, FetchError, FetchRequest,
    NewsItem,
};

const API_BASE_URL: &str = "https://newsapi.org/v2";

/// NewsAPI answers errors with a 4xx and a JSON body, so the body is read first
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiResponse {
    status: String,
    message: Option<String>,
    #[serde(default)]
    articles: Vec<NewsApiArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NewsApiArticle {
    source: Option<NewsApiSource>,
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    url_to_image: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NewsApiSource {
    name: Option<String>,
}

impl From<NewsApiArticle> for NewsItem {
    fn from(article: NewsApiArticle) -> Self {
        NewsItem::new(
            &article.title.unwrap_or_default(),
            &article.url.unwrap_or_default(),
            &article.source.and_then(|s| s.name).unwrap_or_else(|| "NewsAPI".to_string()),
            &article.published_at.unwrap_or_default(),
            &article.description.unwrap_or_default(),
            &article.url_to_image.unwrap_or_default(),
        )
    }
}

pub struct NewsApiFetcher {
    api_key: String,
    api_base_url: String,
    client: reqwest::Client,
}

impl NewsApiFetcher {
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

impl Fetch for NewsApiFetcher {
    fn name(&self) -> &str {
        "NewsAPI"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Entry>, FetchError> {
        if is_placeholder_key(&self.api_key) {
            warn!("NewsAPI key is not configured");
            return Err(FetchError::InvalidApiKey);
        }

        let mut params = vec![
            ("q", request.query.clone()),
            ("language", "en".to_string()),
            ("sortBy", "publishedAt".to_string()),
            ("pageSize", request.max_records.min(100).to_string()),
            ("apiKey", self.api_key.clone()),
        ];
        if let Some(from) = request.from_date {
            params.push(("from", from.format("%Y-%m-%d").to_string()));
        }
        if let Some(to) = request.to_date {
            params.push(("to", to.format("%Y-%m-%d").to_string()));
        }

        let response = self
            .client
            .get(format!("{}/everything", self.api_base_url))
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        let body: NewsApiResponse = match serde_json::from_str(&text) {
            Ok(body) => body,
            Err(_) if !status.is_success() => {
                return Err(FetchError::Status {
                    status: status.as_u16(),
                    body: text,
                })
            }
            Err(e) => return Err(FetchError::Parse(e.to_string())),
        };

        if body.status != "ok" {
            return Err(FetchError::Vendor(
                body.message.unwrap_or_else(|| format!("status {}", body.status)),
            ));
        }

        // Removed articles come back as "[Removed]" with no usable URL
        let items: Vec<Entry> = body
            .articles
            .into_iter()
            .map(NewsItem::from)
            .filter(|item| !is_missing_url(&item.url) && item.title != "[Removed]")
            .map(Entry::News)
            .collect();
        if items.is_empty() {
            return Err(FetchError::Empty("No articles found in NewsAPI".to_string()));
        }
        info!("NewsAPI returned {} articles", items.len());

        Ok(items)
    }
}
