use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta, TimeZone, Utc,
};
use tracing::warn;

use super::data_types::Entry;

/// Tehran is treated as a fixed UTC+03:30, without DST
pub const TEHRAN_OFFSET_SECS: i32 = 3 * 3600 + 30 * 60;

/// Formats carrying their own offset
const OFFSET_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S %z",
    "%a, %d %b %Y %H:%M:%S %z",
];

/// Formats without offset, read as UTC
const NAIVE_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%SZ",
    "%Y-%m-%dT%H:%M:%S%.fZ",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

#[must_use]
pub fn tehran() -> FixedOffset {
    FixedOffset::east_opt(TEHRAN_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Parse a vendor timestamp into UTC. Returns `None` when no known format matches.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(raw, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in NAIVE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&parsed));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)));
    }

    None
}

/// Parse a vendor timestamp and shift it to Tehran time
#[must_use]
pub fn parse_to_tehran_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    parse_timestamp(raw).map(|ts| ts.with_timezone(&tehran()))
}

#[must_use]
pub fn format_tehran_time(ts: &DateTime<FixedOffset>) -> String {
    ts.format("%Y-%m-%d %H:%M").to_string()
}

/// How fetched items are narrowed down by publication time
#[derive(Debug, Clone, PartialEq)]
pub enum TimeFilter {
    Disabled,
    /// Keep items published within the last `hours`
    Relative { hours: f64 },
    /// Keep items published between `start` 00:00 and `end` 23:59:59, Tehran time
    Range { start: NaiveDate, end: NaiveDate },
}

impl TimeFilter {
    /// Pick the filter mode from the driver options. Disabling wins; a finite hour
    /// window wins over the date range.
    #[must_use]
    pub fn from_options(
        hours: Option<f64>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
        disabled: bool,
    ) -> Self {
        if disabled {
            return TimeFilter::Disabled;
        }
        match (hours, start, end) {
            (Some(hours), _, _) if hours.is_finite() && hours > 0.0 => {
                TimeFilter::Relative { hours }
            }
            (_, Some(start), Some(end)) => TimeFilter::Range { start, end },
            (_, Some(start), None) => TimeFilter::Range {
                start,
                end: Utc::now().with_timezone(&tehran()).date_naive(),
            },
            _ => TimeFilter::Disabled,
        }
    }
}

/// Filter entries by time, evaluated against `now`. Reports are never filtered;
/// news items with unparseable timestamps are dropped unless the filter is disabled.
#[must_use]
pub fn filter_articles_by_time_at(
    entries: Vec<Entry>,
    filter: &TimeFilter,
    now: DateTime<Utc>,
) -> Vec<Entry> {
    let tz = tehran();
    let window = match filter {
        TimeFilter::Disabled => return entries,
        // A window reaching past the representable range has no lower bound
        TimeFilter::Relative { hours } => {
            #[allow(clippy::cast_possible_truncation)]
            let from = TimeDelta::try_seconds((hours * 3600.0) as i64)
                .and_then(|span| now.with_timezone(&tz).checked_sub_signed(span));
            (from, None)
        }
        TimeFilter::Range { start, end } => {
            let Some(from) = tz
                .from_local_datetime(&start.and_time(NaiveTime::MIN))
                .single()
            else {
                return entries;
            };
            let Some(to) = end
                .and_hms_opt(23, 59, 59)
                .and_then(|t| tz.from_local_datetime(&t).single())
            else {
                return entries;
            };
            (Some(from), Some(to))
        }
    };

    entries
        .into_iter()
        .filter(|entry| match entry {
            Entry::Report(_) => true,
            Entry::News(item) => match parse_to_tehran_time(&item.published_at) {
                Some(ts) => {
                    window.0.is_none_or(|from| ts >= from) && window.1.is_none_or(|to| ts <= to)
                }
                None => {
                    warn!(
                        "Dropping item with unparseable timestamp '{}': {}",
                        item.published_at, item.url
                    );
                    false
                }
            },
        })
        .collect()
}

#[must_use]
pub fn filter_articles_by_time(entries: Vec<Entry>, filter: &TimeFilter) -> Vec<Entry> {
    filter_articles_by_time_at(entries, filter, Utc::now())
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::common::data_types::{NewsItem, Report};

    fn news(url: &str, published_at: &str) -> Entry {
        Entry::News(NewsItem::new("t", url, "s", published_at, "d", ""))
    }

    fn report() -> Entry {
        Entry::Report(Report {
            symbol: "AAPL".to_string(),
            date: "not a date".to_string(),
            revenue: 1.0,
            net_income: 1.0,
            eps: 1.0,
            gross_profit: 1.0,
            operating_income: 1.0,
            reported_currency: "USD".to_string(),
        })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_known_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 10, 9, 30, 0).unwrap();
        for raw in [
            "2024-05-10T09:30:00Z",
            "2024-05-10T09:30:00.000Z",
            "2024-05-10T13:00:00+03:30",
            "2024-05-10 09:30:00",
            "2024-05-10 09:30:00 +0000",
            "Fri, 10 May 2024 09:30:00 +0000",
            "Fri, 10 May 2024 09:30:00 GMT",
            "2024-05-10T09:30:00",
        ] {
            assert_eq!(parse_timestamp(raw), Some(expected), "failed to parse {raw}");
        }
        assert!(parse_timestamp("2024-05-10").is_some());
        assert!(parse_timestamp("yesterday").is_none());
        assert!(parse_timestamp("").is_none());
    }

    #[test]
    fn test_tehran_shift() {
        let ts = parse_to_tehran_time("2024-05-10T09:30:00Z").unwrap();
        assert_eq!(format_tehran_time(&ts), "2024-05-10 13:00");
    }

    #[test]
    fn test_relative_window() {
        let entries = vec![
            news("a", "2024-05-10T11:00:00Z"),
            news("b", "2024-05-10T07:00:00Z"),
            news("c", "garbage"),
            report(),
        ];
        let filter = TimeFilter::Relative { hours: 4.0 };
        let kept = filter_articles_by_time_at(entries, &filter, now());
        let keys: Vec<String> = kept.iter().map(Entry::key).collect();
        assert_eq!(keys, vec!["a".to_string(), "AAPL:not a date".to_string()]);
    }

    #[test]
    fn test_half_hour_window() {
        let entries = vec![
            news("a", "2024-05-10T11:45:00Z"),
            news("b", "2024-05-10T11:15:00Z"),
        ];
        let filter = TimeFilter::Relative { hours: 0.5 };
        let kept = filter_articles_by_time_at(entries, &filter, now());
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].key(), "a");
    }

    #[test]
    fn test_huge_window_keeps_every_dated_item() {
        let entries = vec![
            news("a", "2024-05-10T11:00:00Z"),
            news("b", "1970-01-01T00:00:00Z"),
            news("c", "garbage"),
        ];
        let filter = TimeFilter::from_options(Some(1e10), None, None, false);
        assert_eq!(filter, TimeFilter::Relative { hours: 1e10 });

        let kept = filter_articles_by_time_at(entries, &filter, now());
        let keys: Vec<String> = kept.iter().map(Entry::key).collect();
        assert_eq!(keys, vec!["a", "b"]);
        let unbounded = TimeFilter::Relative { hours: f64::MAX };
        assert!(filter_articles_by_time(vec![], &unbounded).is_empty());
    }

    #[test]
    fn test_explicit_range_uses_tehran_days() {
        let filter = TimeFilter::Range {
            start: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
        };
        let entries = vec![
            // 2024-05-01 00:10 Tehran
            news("in-start", "2024-04-30T20:40:00Z"),
            // 2024-04-30 23:50 Tehran
            news("before", "2024-04-30T20:20:00Z"),
            // 2024-05-02 23:59 Tehran
            news("in-end", "2024-05-02T20:29:00Z"),
            // 2024-05-03 00:01 Tehran
            news("after", "2024-05-02T20:31:00Z"),
            news("broken", "not a timestamp"),
            report(),
        ];
        let kept = filter_articles_by_time_at(entries, &filter, now());
        let keys: Vec<String> = kept.iter().map(Entry::key).collect();
        assert_eq!(keys, vec!["in-start", "in-end", "AAPL:not a date"]);
    }

    #[test]
    fn test_disabled_keeps_everything() {
        let entries = vec![news("a", "garbage"), news("b", ""), report()];
        let kept = filter_articles_by_time_at(entries.clone(), &TimeFilter::Disabled, now());
        assert_eq!(kept, entries);
    }

    #[test]
    fn test_reports_pass_unchanged() {
        let entries = vec![report(), report()];
        let filter = TimeFilter::Relative { hours: 1.0 };
        let kept = filter_articles_by_time_at(entries.clone(), &filter, now());
        assert_eq!(kept, entries);
    }

    #[test]
    fn test_filter_from_options() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1);
        let end = NaiveDate::from_ymd_opt(2024, 2, 1);
        assert_eq!(TimeFilter::from_options(Some(4.0), start, end, true), TimeFilter::Disabled);
        assert_eq!(
            TimeFilter::from_options(Some(4.0), start, end, false),
            TimeFilter::Relative { hours: 4.0 }
        );
        assert_eq!(
            TimeFilter::from_options(Some(f64::INFINITY), start, end, false),
            TimeFilter::Range {
                start: start.unwrap(),
                end: end.unwrap()
            }
        );
        assert_eq!(TimeFilter::from_options(None, None, None, false), TimeFilter::Disabled);
    }
}
