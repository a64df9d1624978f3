use serde::Deserialize;
use tracing::{info, warn};

use crate::common::{
    check_status, http_client, is_placeholder_key, Entry, Fetch, FetchError, FetchRequest,
    NewsItem,
};

const API_BASE_URL: &str = "https://api.currentsapi.services/v1";

#[derive(Debug, Deserialize)]
struct CurrentsResponse {
    status: Option<String>,
    msg: Option<String>,
    #[serde(default)]
    news: Vec<CurrentsArticle>,
}

#[derive(Debug, Deserialize)]
struct CurrentsArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    author: Option<String>,
    image: Option<String>,
    published: Option<String>,
}

impl From<CurrentsArticle> for NewsItem {
    fn from(article: CurrentsArticle) -> Self {
        // Currents uses the literal "None" for a missing image
        let image = article.image.filter(|i| i != "None").unwrap_or_default();
        let source = article
            .author
            .filter(|a| !a.trim().is_empty())
            .unwrap_or_else(|| "CurrentsAPI".to_string());
        NewsItem::new(
            &article.title.unwrap_or_default(),
            &article.url.unwrap_or_default(),
            &source,
            &article.published.unwrap_or_default(),
            &article.description.unwrap_or_default(),
            &image,
        )
    }
}

pub struct CurrentsFetcher {
    api_key: String,
    api_base_url: String,
    client: reqwest::Client,
}

impl CurrentsFetcher {
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

impl Fetch for CurrentsFetcher {
    fn name(&self) -> &str {
        "CurrentsAPI"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Entry>, FetchError> {
        if is_placeholder_key(&self.api_key) {
            warn!("CurrentsAPI key is not configured");
            return Err(FetchError::InvalidApiKey);
        }

        let mut params = vec![
            ("keywords", request.query.clone()),
            ("language", "en".to_string()),
            ("page_size", request.max_records.to_string()),
            ("apiKey", self.api_key.clone()),
        ];
        if let Some(from) = request.from_date {
            params.push(("start_date", format!("{}T00:00:00Z", from.format("%Y-%m-%d"))));
        }
        if let Some(to) = request.to_date {
            params.push(("end_date", format!("{}T23:59:59Z", to.format("%Y-%m-%d"))));
        }

        let response = self
            .client
            .get(format!("{}/search", self.api_base_url))
            .query(&params)
            .send()
            .await?;
        let body: CurrentsResponse = check_status(response).await?.json().await?;

        if body.status.as_deref() != Some("ok") {
            return Err(FetchError::Vendor(body.msg.unwrap_or_else(|| {
                format!("status {}", body.status.unwrap_or_default())
            })));
        }
        if body.news.is_empty() {
            return Err(FetchError::Empty("No articles found in CurrentsAPI".to_string()));
        }

        let items: Vec<Entry> = body.news.into_iter().map(|a| Entry::News(a.into())).collect();
        info!("CurrentsAPI returned {} articles", items.len());

        Ok(items)
    }
}
