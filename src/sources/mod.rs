mod coingecko;
mod cryptocompare;
mod currents;
mod fmp;
mod gnews;
mod newsapi;
mod world_news;

pub use coingecko::CoinGeckoFetcher;
pub use cryptocompare::CryptoCompareFetcher;
pub use currents::CurrentsFetcher;
pub use fmp::FmpFetcher;
pub use gnews::GNewsFetcher;
pub use newsapi::NewsApiFetcher;
pub use world_news::WorldNewsFetcher;

use crate::common::{Entry, Fetch, FetchError, FetchRequest, ScrapeSource};
use crate::config::AppConfig;
use crate::feeds::ScrapeFetcher;

/// The vendors a search can be dispatched to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiKind {
    GNews,
    WorldNews,
    NewsApi,
    CryptoCompare,
    CoinGecko,
    Fmp,
    Currents,
    Scraped,
}

impl std::str::FromStr for ApiKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_', ' '], "").as_str() {
            "gnews" => Ok(ApiKind::GNews),
            "worldnews" | "worldnewsapi" => Ok(ApiKind::WorldNews),
            "newsapi" => Ok(ApiKind::NewsApi),
            "cryptocompare" => Ok(ApiKind::CryptoCompare),
            "coingecko" => Ok(ApiKind::CoinGecko),
            "fmp" | "financialmodelingprep" => Ok(ApiKind::Fmp),
            "currents" | "currentsapi" => Ok(ApiKind::Currents),
            "scraped" | "scrape" | "custom" => Ok(ApiKind::Scraped),
            other => Err(format!("Unknown API: {other}")),
        }
    }
}

impl std::fmt::Display for ApiKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ApiKind::GNews => "gnews",
            ApiKind::WorldNews => "world-news",
            ApiKind::NewsApi => "newsapi",
            ApiKind::CryptoCompare => "cryptocompare",
            ApiKind::CoinGecko => "coingecko",
            ApiKind::Fmp => "fmp",
            ApiKind::Currents => "currents",
            ApiKind::Scraped => "scraped",
        };
        write!(f, "{name}")
    }
}

/// One of the adapters, picked at run time
pub enum SourceFetcher {
    GNews(GNewsFetcher),
    WorldNews(WorldNewsFetcher),
    NewsApi(NewsApiFetcher),
    CryptoCompare(CryptoCompareFetcher),
    CoinGecko(CoinGeckoFetcher),
    Fmp(FmpFetcher),
    Currents(CurrentsFetcher),
    Scraped(ScrapeFetcher),
}

impl SourceFetcher {
    #[must_use]
    pub fn new(kind: ApiKind, config: &AppConfig, scrape_sources: &[ScrapeSource]) -> Self {
        let keys = &config.api_keys;
        let timeout = config.http_timeout_secs;
        match kind {
            ApiKind::GNews => SourceFetcher::GNews(GNewsFetcher::new(&keys.gnews, timeout)),
            ApiKind::WorldNews => {
                SourceFetcher::WorldNews(WorldNewsFetcher::new(&keys.world_news, timeout))
            }
            ApiKind::NewsApi => SourceFetcher::NewsApi(NewsApiFetcher::new(&keys.newsapi, timeout)),
            ApiKind::CryptoCompare => SourceFetcher::CryptoCompare(CryptoCompareFetcher::new(
                &keys.cryptocompare,
                timeout,
            )),
            ApiKind::CoinGecko => {
                SourceFetcher::CoinGecko(CoinGeckoFetcher::new(&keys.coingecko, timeout))
            }
            ApiKind::Fmp => SourceFetcher::Fmp(FmpFetcher::new(&keys.fmp, timeout)),
            ApiKind::Currents => {
                SourceFetcher::Currents(CurrentsFetcher::new(&keys.currents, timeout))
            }
            ApiKind::Scraped => SourceFetcher::Scraped(ScrapeFetcher::new(scrape_sources, timeout)),
        }
    }
}

impl Fetch for SourceFetcher {
    fn name(&self) -> &str {
        match self {
            SourceFetcher::GNews(f) => f.name(),
            SourceFetcher::WorldNews(f) => f.name(),
            SourceFetcher::NewsApi(f) => f.name(),
            SourceFetcher::CryptoCompare(f) => f.name(),
            SourceFetcher::CoinGecko(f) => f.name(),
            SourceFetcher::Fmp(f) => f.name(),
            SourceFetcher::Currents(f) => f.name(),
            SourceFetcher::Scraped(f) => f.name(),
        }
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<Vec<Entry>, FetchError> {
        match self {
            SourceFetcher::GNews(f) => f.fetch(request).await,
            SourceFetcher::WorldNews(f) => f.fetch(request).await,
            SourceFetcher::NewsApi(f) => f.fetch(request).await,
            SourceFetcher::CryptoCompare(f) => f.fetch(request).await,
            SourceFetcher::CoinGecko(f) => f.fetch(request).await,
            SourceFetcher::Fmp(f) => f.fetch(request).await,
            SourceFetcher::Currents(f) => f.fetch(request).await,
            SourceFetcher::Scraped(f) => f.fetch(request).await,
        }
    }
}
