use chrono::NaiveDate;
use serde::Deserialize;
use tracing::{info, warn};

use crate::common::{
    check_status, http_client, is_placeholder_key, Entry, Fetch, FetchError, FetchRequest, Report,
};

const API_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";

/// FMP returns either a list of statements or an object carrying `Error Message`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum FmpResponse {
    Statements(Vec<Report>),
    Error {
        #[serde(rename = "Error Message")]
        error_message: String,
    },
}

/// Keep the reports whose date falls inside the requested range. Reports with a
/// malformed date are kept; the range is a convenience, not a guarantee.
fn within_range(report: &Report, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    let day = report.date.get(..10).unwrap_or(&report.date);
    let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") else {
        return true;
    };
    from.is_none_or(|from| date >= from) && to.is_none_or(|to| date <= to)
}

pub struct FmpFetcher {
    api_key: String,
    api_base_url: String,
    client: reqwest::Client,
}

impl FmpFetcher {
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

impl Fetch for FmpFetcher {
    fn name(&self) -> &str {
        "Financial Modeling Prep"
    }

    /// The query is the company symbol, e.g. `AAPL`
    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Entry>, FetchError> {
        if is_placeholder_key(&self.api_key) {
            warn!("FMP API key is not configured");
            return Err(FetchError::InvalidApiKey);
        }
        let symbol = request.query.trim().to_uppercase();
        if symbol.is_empty() || symbol.contains(char::is_whitespace) {
            return Err(FetchError::Vendor(format!(
                "'{}' is not a company symbol",
                request.query
            )));
        }

        let response = self
            .client
            .get(format!("{}/income-statement/{symbol}", self.api_base_url))
            .query(&[
                ("limit", request.max_records.to_string()),
                ("apikey", self.api_key.clone()),
            ])
            .send()
            .await?;
        let body: FmpResponse = check_status(response).await?.json().await?;

        let reports = match body {
            FmpResponse::Error { error_message } => return Err(FetchError::Vendor(error_message)),
            FmpResponse::Statements(reports) => reports,
        };
        let items: Vec<Entry> = reports
            .into_iter()
            .filter(|r| within_range(r, request.from_date, request.to_date))
            .map(Entry::Report)
            .collect();
        if items.is_empty() {
            return Err(FetchError::Empty(format!("No financial reports found for {symbol}")));
        }
        info!("FMP returned {} reports for {symbol}", items.len());

        Ok(items)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use httpmock::prelude::*;
    use tokio::test;

    const BODY: &str = r#"[
        {
            "date": "2024-09-28",
            "symbol": "AAPL",
            "reportedCurrency": "USD",
            "cik": "0000320193",
            "revenue": 391035000000,
            "grossProfit": 180683000000,
            "operatingIncome": 123216000000,
            "netIncome": 93736000000,
            "eps": 6.11
        },
        {
            "date": "2023-09-30",
            "symbol": "AAPL",
            "reportedCurrency": "USD",
            "revenue": 383285000000,
            "grossProfit": 169148000000,
            "operatingIncome": 114301000000,
            "netIncome": 96995000000,
            "eps": 6.16
        }
    ]"#;

    #[test]
    async fn test_fetch_reports_in_range() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/income-statement/AAPL")
                .query_param("apikey", "secret");
            then.status(200)
                .header("content-type", "application/json")
                .body(BODY);
        });

        let fetcher = FmpFetcher::new("secret", 5).with_base_url(&server.base_url());
        let request = FetchRequest::new("aapl", 5).with_dates(
            NaiveDate::from_ymd_opt(2024, 1, 1),
            NaiveDate::from_ymd_opt(2024, 12, 31),
        );
        let items = fetcher.fetch(&request).await.unwrap();
        mock.assert();

        assert_eq!(items.len(), 1);
        match &items[0] {
            Entry::Report(report) => {
                assert_eq!(report.date, "2024-09-28");
                assert_eq!(report.eps, 6.11);
                assert_eq!(report.revenue, 391_035_000_000.0);
            }
            Entry::News(_) => panic!("expected a report"),
        }
    }

    #[test]
    async fn test_error_message() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/income-statement/AAPL");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"Error Message": "Invalid API KEY."}"#);
        });

        let fetcher = FmpFetcher::new("secret", 5).with_base_url(&server.base_url());
        match fetcher.fetch(&FetchRequest::new("AAPL", 5)).await {
            Err(FetchError::Vendor(message)) => assert_eq!(message, "Invalid API KEY."),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    async fn test_rejects_free_text_query() {
        let fetcher = FmpFetcher::new("secret", 5).with_base_url("http://127.0.0.1:1");
        let result = fetcher.fetch(&FetchRequest::new("Iran news", 5)).await;
        assert!(matches!(result, Err(FetchError::Vendor(_))));
    }
}
