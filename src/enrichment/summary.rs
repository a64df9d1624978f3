use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::common::{check_status, http_client, truncate_chars, Entry};
use crate::feeds::strip_tags;

use super::llm::LlmClient;

const SUMMARY_PARAGRAPHS: usize = 3;
const SUMMARY_MAX_CHARS: usize = 500;

static PARAGRAPH_RE: LazyLock<Regex> = LazyLock::new(|| {
    RegexBuilder::new(r"<p(?:\s[^>]*)?>(.*?)</p>")
        .case_insensitive(true)
        .dot_matches_new_line(true)
        .build()
        .expect("paragraph pattern is valid")
});

/// Summaries keyed by article URL
pub type Summaries = HashMap<String, String>;

/// The text of the first few paragraphs of an article page
#[must_use]
pub fn extract_summary(html: &str) -> String {
    let paragraphs: Vec<String> = PARAGRAPH_RE
        .captures_iter(html)
        .map(|captures| strip_tags(&captures[1]))
        .filter(|text| !text.is_empty())
        .take(SUMMARY_PARAGRAPHS)
        .collect();
    truncate_chars(&paragraphs.join(" "), SUMMARY_MAX_CHARS)
}

/// Downloads article pages and condenses them into a short, optionally translated,
/// summary
pub struct Summarizer<'a> {
    client: reqwest::Client,
    llm: Option<&'a LlmClient>,
}

impl<'a> Summarizer<'a> {
    #[must_use]
    pub fn new(timeout_secs: u64, llm: Option<&'a LlmClient>) -> Self {
        Self {
            client: http_client(timeout_secs),
            llm,
        }
    }

    /// `None` when the page cannot be fetched or has no paragraph text
    pub async fn summarize(&self, url: &str) -> Option<String> {
        let html = match self.download(url).await {
            Ok(html) => html,
            Err(e) => {
                warn!("Could not fetch article {url} for a summary: {e}");
                return None;
            }
        };
        let summary = extract_summary(&html);
        if summary.is_empty() {
            return None;
        }

        match self.llm {
            Some(llm) => match llm.translate(&summary).await {
                Ok(translated) => Some(translated),
                Err(e) => {
                    warn!("Could not translate the summary of {url}: {e}");
                    Some(summary)
                }
            },
            None => Some(summary),
        }
    }

    /// Summaries for all news entries; reports and failed pages are left out
    pub async fn summarize_all(&self, entries: &[Entry]) -> Summaries {
        let mut summaries = Summaries::new();
        for item in entries.iter().filter_map(Entry::as_news) {
            if let Some(summary) = self.summarize(&item.url).await {
                summaries.insert(item.url.clone(), summary);
            }
        }
        summaries
    }

    async fn download(&self, url: &str) -> Result<String, crate::common::FetchError> {
        let response = self.client.get(url).send().await?;
        Ok(check_status(response).await?.text().await?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::NewsItem;
    use httpmock::prelude::*;
    use tokio::test;

    const ARTICLE: &str = r#"<html><body>
        <nav><p class="menu"></p></nav>
        <p>First <b>paragraph</b>.</p>
        <P>Second paragraph.</P>
        <p>Third paragraph.</p>
        <p>Fourth paragraph is left out.</p>
        <pre>not a paragraph</pre>
    </body></html>"#;

    #[test]
    async fn test_extract_summary() {
        assert_eq!(
            extract_summary(ARTICLE),
            "First paragraph . Second paragraph. Third paragraph."
        );
        assert_eq!(extract_summary("<div>No paragraphs</div>"), "");
    }

    #[test]
    async fn test_extract_summary_is_capped() {
        let html = format!("<p>{}</p>", "word ".repeat(200));
        let summary = extract_summary(&html);
        assert!(summary.ends_with("..."));
        assert_eq!(summary.chars().count(), SUMMARY_MAX_CHARS - 1 + 3);
    }

    #[test]
    async fn test_summarize_all() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/article");
            then.status(200).body(ARTICLE);
        });
        server.mock(|when, then| {
            when.method(GET).path("/gone");
            then.status(404);
        });

        let entries = vec![
            Entry::News(NewsItem::new("a", &server.url("/article"), "s", "", "", "")),
            Entry::News(NewsItem::new("b", &server.url("/gone"), "s", "", "", "")),
        ];
        let summaries = Summarizer::new(5, None).summarize_all(&entries).await;

        assert_eq!(summaries.len(), 1);
        assert!(summaries[&server.url("/article")].starts_with("First paragraph"));
    }
}
