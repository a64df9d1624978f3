use serde::Deserialize;
use tracing::{info, warn};

use crate::common::{
    check_status, http_client, is_placeholder_key, Entry, Fetch, FetchError, FetchRequest,
    NewsItem,
};

const API_BASE_URL: &str = "https://gnews.io/api/v4";

#[derive(Debug, Deserialize)]
struct GNewsResponse {
    #[serde(default)]
    articles: Vec<GNewsArticle>,
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GNewsArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    image: Option<String>,
    published_at: Option<String>,
    source: Option<GNewsSource>,
}

#[derive(Debug, Deserialize)]
struct GNewsSource {
    name: Option<String>,
}

impl From<GNewsArticle> for NewsItem {
    fn from(article: GNewsArticle) -> Self {
        NewsItem::new(
            &article.title.unwrap_or_default(),
            &article.url.unwrap_or_default(),
            &article.source.and_then(|s| s.name).unwrap_or_else(|| "GNews".to_string()),
            &article.published_at.unwrap_or_default(),
            &article.description.unwrap_or_default(),
            &article.image.unwrap_or_default(),
        )
    }
}

pub struct GNewsFetcher {
    api_key: String,
    api_base_url: String,
    client: reqwest::Client,
}

impl GNewsFetcher {
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

impl Fetch for GNewsFetcher {
    fn name(&self) -> &str {
        "GNews"
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Entry>, FetchError> {
        if is_placeholder_key(&self.api_key) {
            warn!("GNews API key is not configured");
            return Err(FetchError::InvalidApiKey);
        }

        let mut params = vec![
            ("q", request.query.clone()),
            ("lang", "en".to_string()),
            ("max", request.max_records.to_string()),
            ("apikey", self.api_key.clone()),
        ];
        if let Some(from) = request.from_date {
            params.push(("from", format!("{}T00:00:00Z", from.format("%Y-%m-%d"))));
        }
        if let Some(to) = request.to_date {
            params.push(("to", format!("{}T23:59:59Z", to.format("%Y-%m-%d"))));
        }

        let response = self
            .client
            .get(format!("{}/search", self.api_base_url))
            .query(&params)
            .send()
            .await?;
        let body: GNewsResponse = check_status(response).await?.json().await?;

        if let Some(errors) = body.errors {
            return Err(FetchError::Vendor(errors.to_string()));
        }
        if body.articles.is_empty() {
            return Err(FetchError::Empty("No articles found in GNews".to_string()));
        }

        let items: Vec<Entry> = body
            .articles
            .into_iter()
            .map(|a| Entry::News(a.into()))
            .collect();
        info!("GNews returned {} articles for '{}'", items.len(), request.query);

        Ok(items)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::PLACEHOLDER_KEY;
    use httpmock::prelude::*;
    use tokio::test;

    #[test]
    async fn test_fetch_articles() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/search")
                .query_param("q", "Iran")
                .query_param("max", "10")
                .query_param("apikey", "secret");
            then.status(200)
                .header("content-type", "application/json")
                .body(
                    r#"{
                        "totalArticles": 2,
                        "articles": [
                            {
                                "title": "First",
                                "description": "First description",
                                "content": "...",
                                "url": "https://example.com/1",
                                "image": "https://example.com/1.jpg",
                                "publishedAt": "2024-05-10T09:30:00Z",
                                "source": {"name": "Example", "url": "https://example.com"}
                            },
                            {
                                "title": "Second",
                                "description": "Second description",
                                "url": "https://example.com/2",
                                "publishedAt": "2024-05-10T08:30:00Z",
                                "source": {"name": "Example"}
                            }
                        ]
                    }"#,
                );
        });

        let fetcher = GNewsFetcher::new("secret", 5).with_base_url(&server.base_url());
        let items = fetcher.fetch(&FetchRequest::new("Iran", 10)).await.unwrap();
        mock.assert();

        assert_eq!(items.len(), 2);
        let first = items[0].as_news().unwrap();
        assert_eq!(first.title, "First");
        assert_eq!(first.source, "Example");
        assert_eq!(first.image_url, "https://example.com/1.jpg");
        assert_eq!(first.translated_title, first.title);
        assert_eq!(first.translated_description, first.description);
    }

    #[test]
    async fn test_placeholder_key_skips_http() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200);
        });

        let fetcher = GNewsFetcher::new(PLACEHOLDER_KEY, 5).with_base_url(&server.base_url());
        let result = fetcher.fetch(&FetchRequest::new("Iran", 10)).await;

        assert!(matches!(result, Err(FetchError::InvalidApiKey)));
        assert_eq!(result.unwrap_err().to_string(), "Invalid API key");
        mock.assert_hits(0);
    }

    #[test]
    async fn test_vendor_errors() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"errors": ["The query is invalid"]}"#);
        });

        let fetcher = GNewsFetcher::new("secret", 5).with_base_url(&server.base_url());
        let result = fetcher.fetch(&FetchRequest::new("Iran", 10)).await;
        assert!(matches!(result, Err(FetchError::Vendor(_))));
    }

    #[test]
    async fn test_non_2xx_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(403).body("Forbidden");
        });

        let fetcher = GNewsFetcher::new("secret", 5).with_base_url(&server.base_url());
        match fetcher.fetch(&FetchRequest::new("Iran", 10)).await {
            Err(FetchError::Status { status, body }) => {
                assert_eq!(status, 403);
                assert_eq!(body, "Forbidden");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    async fn test_empty_result() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/search");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"totalArticles": 0, "articles": []}"#);
        });

        let fetcher = GNewsFetcher::new("secret", 5).with_base_url(&server.base_url());
        let result = fetcher.fetch(&FetchRequest::new("Iran", 10)).await;
        assert!(matches!(result, Err(FetchError::Empty(_))));
    }
}
