mod data_types;
mod fetcher;

pub use data_types::strip_tags;
pub use fetcher::ScrapeFetcher;
