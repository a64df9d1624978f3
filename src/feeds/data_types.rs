use chrono::{DateTime, Utc};

use crate::common::{time::parse_timestamp, NewsItem};

/// An item pulled from a user-defined RSS feed or web page
#[derive(Clone, Debug)]
pub struct FeedItem {
    pub title: String,
    pub link: String,
    pub description: String,
    pub published_at: String,
}

impl FeedItem {
    /// Build from an RSS item; items without a publication date take `fetched_at`
    pub fn from(item: &rss::Item, fetched_at: DateTime<Utc>) -> FeedItem {
        let link = match (item.link(), item.guid()) {
            (Some(link), _) => link.to_string(),
            (None, Some(guid)) if guid.is_permalink() => guid.value().to_string(),
            _ => String::new(),
        };
        let published_at = item
            .pub_date()
            .and_then(parse_timestamp)
            .unwrap_or(fetched_at)
            .to_rfc3339();
        Self {
            title: item.title().unwrap_or("").trim().to_string(),
            link,
            description: strip_tags(item.description().unwrap_or("")),
            published_at,
        }
    }

    #[must_use]
    pub fn into_news_item(self, source_name: &str) -> NewsItem {
        NewsItem::new(
            &self.title,
            &self.link,
            source_name,
            &self.published_at,
            &self.description,
            "",
        )
    }
}

/// Drop HTML tags and collapse whitespace
#[must_use]
pub fn strip_tags(html: &str) -> String {
    let mut text = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => {
                in_tag = false;
                text.push(' ');
            }
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let text = text
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">");
    text.split_whitespace().collect::<Vec<&str>>().join(" ")
}
