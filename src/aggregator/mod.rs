use tracing::{error, info};

use crate::common::{deduplicate, Entry, Fetch, FetchError, FetchRequest};

/// A source that failed during a fetch, with the reason
#[derive(Debug)]
pub struct SourceFailure {
    pub source: String,
    pub error: FetchError,
}

impl std::fmt::Display for SourceFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.source, self.error)
    }
}

/// Result of an aggregation. Failures never abort it; they are collected next to
/// whatever the other sources returned.
#[derive(Debug, Default)]
pub struct Aggregated {
    pub entries: Vec<Entry>,
    pub errors: Vec<SourceFailure>,
}

/// Drop news items whose URL was already seen (first occurrence wins) and cut the
/// list to `max_records`. Reports are only truncated.
#[must_use]
pub fn merge_entries(entries: Vec<Entry>, max_records: usize) -> Vec<Entry> {
    let mut unique = deduplicate(entries);
    unique.truncate(max_records);
    unique
}

fn record_result<F: Fetch>(
    fetcher: &F,
    result: Result<Vec<Entry>, FetchError>,
    aggregated: &mut Aggregated,
) {
    match result {
        Ok(entries) => {
            info!("{} returned {} entries", fetcher.name(), entries.len());
            aggregated.entries.extend(entries);
        }
        Err(e) => {
            error!("Error fetching from {}: {e}", fetcher.name());
            aggregated.errors.push(SourceFailure {
                source: fetcher.name().to_string(),
                error: e,
            });
        }
    }
}

/// Fetch from one adapter, then deduplicate and truncate
pub async fn fetch_news<F: Fetch>(fetcher: &F, request: &FetchRequest) -> Aggregated {
    let mut aggregated = Aggregated::default();
    record_result(fetcher, fetcher.fetch(request).await, &mut aggregated);
    aggregated.entries = merge_entries(aggregated.entries, request.max_records);

    aggregated
}

/// Fetch from two adapters at once and merge their results, `first` before `second`.
/// Both calls run to completion; a failing side contributes nothing.
pub async fn fetch_combined<A: Fetch, B: Fetch>(
    first: &A,
    second: &B,
    request: &FetchRequest,
) -> Aggregated {
    let (first_result, second_result) = tokio::join!(first.fetch(request), second.fetch(request));

    let mut aggregated = Aggregated::default();
    record_result(first, first_result, &mut aggregated);
    record_result(second, second_result, &mut aggregated);
    aggregated.entries = merge_entries(aggregated.entries, request.max_records);

    aggregated
}
