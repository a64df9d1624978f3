use serde::{Deserialize, Serialize};

/// A news article normalized from one of the vendor APIs or scrape sources
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub url: String,
    pub source: String,
    pub published_at: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub translated_title: String,
    #[serde(default)]
    pub translated_description: String,
}

impl NewsItem {
    /// Create an item whose translated fields mirror the originals
    #[must_use]
    pub fn new(
        title: &str,
        url: &str,
        source: &str,
        published_at: &str,
        description: &str,
        image_url: &str,
    ) -> Self {
        Self {
            title: title.to_string(),
            url: url.to_string(),
            source: source.to_string(),
            published_at: published_at.to_string(),
            description: description.to_string(),
            image_url: image_url.to_string(),
            translated_title: title.to_string(),
            translated_description: description.to_string(),
        }
    }
}

/// An income-statement entry for one company and reporting date
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub symbol: String,
    pub date: String,
    #[serde(default)]
    pub revenue: f64,
    #[serde(default)]
    pub net_income: f64,
    #[serde(default)]
    pub eps: f64,
    #[serde(default)]
    pub gross_profit: f64,
    #[serde(default)]
    pub operating_income: f64,
    #[serde(default)]
    pub reported_currency: String,
}

/// Anything the pipeline can carry: a news item or a financial report.
/// Serialized flat with a `type` discriminator.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum Entry {
    #[serde(rename = "news")]
    News(NewsItem),
    #[serde(rename = "report")]
    Report(Report),
}

impl Entry {
    /// Identity used for deduplication and selection matching
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Entry::News(item) => item.url.clone(),
            Entry::Report(report) => format!("{}:{}", report.symbol, report.date),
        }
    }

    #[must_use]
    pub fn is_report(&self) -> bool {
        matches!(self, Entry::Report(_))
    }

    /// Short human label, used in delivery reports and listings
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Entry::News(item) => item.title.clone(),
            Entry::Report(report) => format!("{} ({})", report.symbol, report.date),
        }
    }

    #[must_use]
    pub fn as_news(&self) -> Option<&NewsItem> {
        match self {
            Entry::News(item) => Some(item),
            Entry::Report(_) => None,
        }
    }
}

impl From<NewsItem> for Entry {
    fn from(item: NewsItem) -> Self {
        Entry::News(item)
    }
}

impl From<Report> for Entry {
    fn from(report: Report) -> Self {
        Entry::Report(report)
    }
}

/// Kind of a user-defined scrape source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Web,
    Rss,
}

impl std::str::FromStr for SourceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "web" => Ok(SourceType::Web),
            "rss" => Ok(SourceType::Rss),
            other => Err(format!("Unknown source type: {other}")),
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceType::Web => write!(f, "web"),
            SourceType::Rss => write!(f, "rss"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScrapeSource {
    pub name: String,
    pub url: String,
    #[serde(rename = "type")]
    pub source_type: SourceType,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_entry_serializes_flat_with_type() {
        let entry = Entry::News(NewsItem::new(
            "Title",
            "https://example.com/a",
            "Example",
            "2024-05-01T10:00:00Z",
            "Desc",
            "",
        ));
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "news");
        assert_eq!(value["url"], "https://example.com/a");
        assert_eq!(value["translated_title"], "Title");
    }

    #[test]
    fn test_report_uses_camel_case_fields() {
        let raw = r#"{
            "type": "report",
            "symbol": "AAPL",
            "date": "2024-09-28",
            "revenue": 391035000000,
            "netIncome": 93736000000,
            "eps": 6.11,
            "grossProfit": 180683000000,
            "operatingIncome": 123216000000,
            "reportedCurrency": "USD"
        }"#;
        let entry: Entry = serde_json::from_str(raw).unwrap();
        assert!(entry.is_report());
        assert_eq!(entry.key(), "AAPL:2024-09-28");
        match entry {
            Entry::Report(report) => {
                assert_eq!(report.net_income, 93_736_000_000.0);
                assert_eq!(report.reported_currency, "USD");
            }
            Entry::News(_) => panic!("expected a report"),
        }
    }

    #[test]
    fn test_scrape_source_type_field() {
        let json = r#"{"name": "BBC", "url": "https://bbc.co.uk/rss", "type": "rss"}"#;
        let source: ScrapeSource = serde_json::from_str(json).unwrap();
        assert_eq!(source.source_type, SourceType::Rss);
        assert_eq!("WEB".parse::<SourceType>().unwrap(), SourceType::Web);
        assert!("ftp".parse::<SourceType>().is_err());
    }
}
