use std::sync::LazyLock;

use chrono::Utc;
use regex::{Regex, RegexBuilder};
use rss::Channel;
use tracing::{info, warn};
use url::Url;

use crate::common::{
    check_status, http_client, Entry, Fetch, FetchError, FetchRequest, NewsItem, ScrapeSource,
    SourceType,
};

use super::data_types::{strip_tags, FeedItem};

/// Anchors shorter than this are navigation, not headlines
const MIN_HEADLINE_CHARS: usize = 20;

static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r#"<a\s[^>]*?href\s*=\s*["']([^"'#]+)["'][^>]*>(.*?)</a>"#)
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .expect("anchor pattern is valid")
});

/// Pulls items from the user-defined scrape sources (RSS feeds and plain web pages)
pub struct ScrapeFetcher {
    sources: Vec<ScrapeSource>,
    client: reqwest::Client,
}

impl ScrapeFetcher {
    #[must_use]
    pub fn new(sources: &[ScrapeSource], timeout_secs: u64) -> ScrapeFetcher {
        Self {
            sources: sources.to_vec(),
            client: http_client(timeout_secs),
        }
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.client.get(url).send().await?;
        let response = check_status(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    async fn pull_feed_items(&self, source: &ScrapeSource) -> Result<Vec<NewsItem>, FetchError> {
        let content = self.download(&source.url).await?;
        let channel =
            Channel::read_from(&content[..]).map_err(|e| FetchError::Parse(e.to_string()))?;
        let fetched_at = Utc::now();

        Ok(channel
            .items()
            .iter()
            .map(|item| FeedItem::from(item, fetched_at))
            .map(|item| item.into_news_item(&source.name))
            .collect())
    }

    async fn pull_page_items(&self, source: &ScrapeSource) -> Result<Vec<NewsItem>, FetchError> {
        let content = self.download(&source.url).await?;
        let html = String::from_utf8_lossy(&content);
        let base = Url::parse(&source.url).map_err(|e| FetchError::Parse(e.to_string()))?;

        Ok(Self::extract_links(&html, &base, &source.name))
    }

    /// Collect headline-looking anchors from a page; links are resolved against `base`
    fn extract_links(html: &str, base: &Url, source_name: &str) -> Vec<NewsItem> {
        let fetched_at = Utc::now().to_rfc3339();
        let mut items: Vec<NewsItem> = Vec::new();

        for captures in ANCHOR_RE.captures_iter(html) {
            let title = strip_tags(&captures[2]);
            if title.chars().count() < MIN_HEADLINE_CHARS {
                continue;
            }
            let Ok(link) = base.join(captures[1].trim()) else {
                continue;
            };
            if !matches!(link.scheme(), "http" | "https") {
                continue;
            }
            let link = link.to_string();
            if items.iter().any(|i| i.url == link) {
                continue;
            }
            items.push(NewsItem::new(&title, &link, source_name, &fetched_at, "", ""));
        }

        items
    }

    async fn pull_source(&self, source: &ScrapeSource) -> Result<Vec<NewsItem>, FetchError> {
        match source.source_type {
            SourceType::Rss => self.pull_feed_items(source).await,
            SourceType::Web => self.pull_page_items(source).await,
        }
    }
}

/// Keep items whose title contains the query, ignoring case; an empty query keeps all
fn matches_query(item: &NewsItem, query: &str) -> bool {
    let query = query.trim().to_lowercase();
    query.is_empty() || item.title.to_lowercase().contains(&query)
}

impl Fetch for ScrapeFetcher {
    fn name(&self) -> &str {
        "Custom Scraped News"
    }

    /// Sources are pulled one after another; a failing source is logged and skipped
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Entry>, FetchError> {
        if self.sources.is_empty() {
            return Err(FetchError::Empty("No scrape sources configured".to_string()));
        }

        let mut items = Vec::new();
        for source in &self.sources {
            match self.pull_source(source).await {
                Ok(pulled) => {
                    info!("Pulled {} items from {}", pulled.len(), source.name);
                    items.extend(
                        pulled
                            .into_iter()
                            .filter(|item| matches_query(item, &request.query))
                            .map(Entry::News),
                    );
                }
                Err(e) => warn!("Could not scrape {} ({}): {e}", source.name, source.url),
            }
        }

        if items.is_empty() {
            return Err(FetchError::Empty(format!(
                "No scraped items matching '{}'",
                request.query
            )));
        }
        Ok(items)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use httpmock::prelude::*;
    use tokio::test;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <rss version="2.0">
          <channel>
            <title>Example feed</title>
            <link>https://example.com</link>
            <description>Example</description>
            <item>
              <title>Iran talks resume in Vienna</title>
              <link>https://example.com/vienna</link>
              <description>&lt;p&gt;Diplomats meet&lt;/p&gt;</description>
              <pubDate>Fri, 10 May 2024 09:30:00 +0000</pubDate>
            </item>
            <item>
              <title>Weather update</title>
              <link>https://example.com/weather</link>
            </item>
          </channel>
        </rss>"#;

    const PAGE: &str = r#"<html><body>
        <a href="/">Home</a>
        <a href="/news/iran-oil-exports-rise" class="headline"><span>Iran oil exports rise to a five-year high</span></a>
        <a href="https://other.example.org/iran-elections">Iran prepares for parliamentary elections</a>
        <a href="/news/iran-oil-exports-rise">Iran oil exports rise to a five-year high</a>
        <a href="mailto:desk@example.com">Send us your Iran news tips today</a>
    </body></html>"#;

    fn source(name: &str, url: String, source_type: SourceType) -> ScrapeSource {
        ScrapeSource {
            name: name.to_string(),
            url,
            source_type,
        }
    }

    #[test]
    async fn test_rss_source() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/feed.xml");
            then.status(200)
                .header("content-type", "application/rss+xml")
                .body(RSS);
        });

        let fetcher = ScrapeFetcher::new(
            &[source("Example", server.url("/feed.xml"), SourceType::Rss)],
            5,
        );
        let items = fetcher.fetch(&FetchRequest::new("iran", 10)).await.unwrap();
        mock.assert();

        assert_eq!(items.len(), 1);
        let item = items[0].as_news().unwrap();
        assert_eq!(item.url, "https://example.com/vienna");
        assert_eq!(item.description, "Diplomats meet");
        assert_eq!(item.source, "Example");
    }

    #[test]
    async fn test_web_source() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/news");
            then.status(200).header("content-type", "text/html").body(PAGE);
        });

        let fetcher =
            ScrapeFetcher::new(&[source("Page", server.url("/news"), SourceType::Web)], 5);
        let items = fetcher.fetch(&FetchRequest::new("Iran", 10)).await.unwrap();

        let urls: Vec<String> = items.iter().map(Entry::key).collect();
        assert_eq!(
            urls,
            vec![
                server.url("/news/iran-oil-exports-rise"),
                "https://other.example.org/iran-elections".to_string(),
            ]
        );
        assert_eq!(items[0].label(), "Iran oil exports rise to a five-year high");
    }

    #[test]
    async fn test_failing_source_is_skipped() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/feed.xml");
            then.status(200).body(RSS);
        });
        server.mock(|when, then| {
            when.method(GET).path("/broken");
            then.status(500);
        });

        let fetcher = ScrapeFetcher::new(
            &[
                source("Broken", server.url("/broken"), SourceType::Rss),
                source("Example", server.url("/feed.xml"), SourceType::Rss),
            ],
            5,
        );
        let items = fetcher.fetch(&FetchRequest::new("", 10)).await.unwrap();
        assert_eq!(items.len(), 2);
    }

    #[test]
    async fn test_no_sources() {
        let fetcher = ScrapeFetcher::new(&[], 5);
        let result = fetcher.fetch(&FetchRequest::new("", 10)).await;
        assert!(matches!(result, Err(FetchError::Empty(_))));
    }
}
