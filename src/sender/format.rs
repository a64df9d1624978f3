use teloxide::utils::markdown;

use crate::common::{
    time::{format_tehran_time, parse_to_tehran_time},
    truncate_chars, Entry, NewsItem, Report,
};

/// Telegram rejects longer messages
pub const MAX_MESSAGE_CHARS: usize = 4096;
const DESCRIPTION_MAX_CHARS: usize = 100;
/// `*`, `*` and the blank line after the title
const TITLE_FRAME_CHARS: usize = 4;
/// `📝 ` before the summary and the blank line after it
const SUMMARY_FRAME_CHARS: usize = 4;

/// Render an entry as a MarkdownV2 message, at most `MAX_MESSAGE_CHARS` long
#[must_use]
pub fn format_message(entry: &Entry, summary: Option<&str>) -> String {
    match entry {
        Entry::News(item) => format_news(item, summary),
        Entry::Report(report) => format_report(report),
    }
}

/// Title, publish time and link are always kept whole; the title and then the summary
/// give way when the message would exceed the limit
fn format_news(item: &NewsItem, summary: Option<&str>) -> String {
    let published = parse_to_tehran_time(&item.published_at)
        .map_or_else(|| item.published_at.clone(), |ts| format_tehran_time(&ts));
    let description = truncate_chars(&item.translated_description, DESCRIPTION_MAX_CHARS);

    let mut body = String::new();
    if !description.is_empty() {
        body.push_str(&format!("{}\n\n", markdown::escape(&description)));
    }
    let mut footer = String::new();
    if !published.is_empty() {
        footer.push_str(&format!("🕒 {}\n", markdown::escape(&published)));
    }
    footer.push_str(&format!(
        "🔗 [Read more]({})",
        markdown::escape_link_url(&item.url)
    ));

    let used = char_count(&body) + char_count(&footer) + TITLE_FRAME_CHARS;
    let title = fit_escaped(
        &markdown::escape(&item.translated_title),
        MAX_MESSAGE_CHARS.saturating_sub(used),
    );
    let mut text = format!("*{title}*\n\n{body}");

    if let Some(summary) = summary.filter(|s| !s.trim().is_empty()) {
        let used = char_count(&text) + char_count(&footer) + SUMMARY_FRAME_CHARS;
        let summary = fit_escaped(
            &markdown::escape(summary),
            MAX_MESSAGE_CHARS.saturating_sub(used),
        );
        if !summary.is_empty() {
            text.push_str(&format!("📝 {summary}\n\n"));
        }
    }

    text.push_str(&footer);
    text
}

fn format_report(report: &Report) -> String {
    let currency = &report.reported_currency;
    let lines = [
        format!("📅 Date: {}", report.date),
        format!("💱 Currency: {currency}"),
        format!("💰 Revenue: {} {currency}", group_thousands(report.revenue)),
        format!("📈 Net income: {} {currency}", group_thousands(report.net_income)),
        format!("🏦 Gross profit: {} {currency}", group_thousands(report.gross_profit)),
        format!(
            "⚙️ Operating income: {} {currency}",
            group_thousands(report.operating_income)
        ),
        format!("💵 EPS: {}", report.eps),
    ];
    let body: Vec<String> = lines.iter().map(|line| markdown::escape(line)).collect();

    format!(
        "📊 *{}* financial report\n\n{}",
        markdown::escape(&report.symbol),
        body.join("\n")
    )
}

/// Whole units with a comma every three digits
#[must_use]
pub fn group_thousands(value: f64) -> String {
    let digits = format!("{:.0}", value.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if value < 0.0 && digits != "0" {
        grouped.insert(0, '-');
    }
    grouped
}

fn char_count(text: &str) -> usize {
    text.chars().count()
}

/// Cut escaped text to `max_chars`, marking the cut with an ellipsis and never leaving a
/// dangling escape character
fn fit_escaped(text: &str, max_chars: usize) -> String {
    if char_count(text) <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }
    let cut: String = text.chars().take(max_chars - 1).collect();
    format!("{}…", cut.trim_end_matches('\\'))
}
