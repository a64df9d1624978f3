mod llm;
mod summary;

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

pub use llm::LlmClient;
pub use summary::{Summaries, Summarizer};

use crate::common::{time::parse_timestamp, Entry, NewsItem};

/// What to do with a freshly fetched batch
#[derive(Debug, Clone, Default)]
pub struct EnrichOptions {
    pub translate: bool,
    pub num_items_to_translate: usize,
    pub rerank: bool,
    /// The search query, used as the relevance target when reranking
    pub query: String,
}

fn timestamp_of(item: &NewsItem) -> Option<DateTime<Utc>> {
    parse_timestamp(&item.published_at)
}

/// Read a ranking reply: a JSON array of indices, bare or under `"ranking"`, possibly
/// inside a Markdown code fence. Out-of-range and repeated indices are ignored.
#[must_use]
pub fn parse_ranking(reply: &str, len: usize) -> Option<Vec<usize>> {
    let mut text = reply.trim();
    if let Some(fenced) = text.strip_prefix("```") {
        let fenced = fenced.trim_start_matches(|c: char| c.is_ascii_alphabetic());
        text = fenced.trim_end().trim_end_matches("```").trim();
    }

    let value: serde_json::Value = serde_json::from_str(text).ok()?;
    let indices = match &value {
        serde_json::Value::Array(indices) => indices,
        serde_json::Value::Object(map) => map.get("ranking")?.as_array()?,
        _ => return None,
    };

    let mut seen = HashSet::new();
    Some(
        indices
            .iter()
            .filter_map(serde_json::Value::as_u64)
            .filter_map(|i| usize::try_from(i).ok())
            .filter(|&i| i < len && seen.insert(i))
            .collect(),
    )
}

/// Put the ranked items first, in ranking order; the rest keep their relative order
#[must_use]
pub fn apply_ranking<T>(items: Vec<T>, ranking: &[usize]) -> Vec<T> {
    let mut slots: Vec<Option<T>> = items.into_iter().map(Some).collect();
    let mut ordered: Vec<T> = ranking.iter().filter_map(|&i| slots.get_mut(i)?.take()).collect();
    ordered.extend(slots.into_iter().flatten());
    ordered
}

/// The translation of `text`, or `text` itself when the call fails
async fn translate_or_keep(llm: &LlmClient, text: &str, url: &str, field: &str) -> String {
    match llm.translate(text).await {
        Ok(translated) => translated,
        Err(e) => {
            warn!("Keeping the original {field} of {url}: {e}");
            text.to_string()
        }
    }
}

async fn translate_item(llm: &LlmClient, item: &mut NewsItem) {
    item.translated_title = translate_or_keep(llm, &item.title, &item.url, "title").await;
    item.translated_description =
        translate_or_keep(llm, &item.description, &item.url, "description").await;
}

/// Translate the news items picked for delivery whose title or description is still
/// in the source language. Items translated during the search are left as they are.
pub async fn translate_for_delivery(entries: &[Entry], llm: &LlmClient) -> Vec<Entry> {
    let mut translated = Vec::with_capacity(entries.len());
    for entry in entries {
        let mut entry = entry.clone();
        if let Entry::News(item) = &mut entry {
            if item.translated_title == item.title {
                item.translated_title =
                    translate_or_keep(llm, &item.title, &item.url, "title").await;
            }
            if item.translated_description == item.description {
                item.translated_description =
                    translate_or_keep(llm, &item.description, &item.url, "description").await;
            }
        }
        translated.push(entry);
    }
    translated
}

async fn rerank(llm: &LlmClient, query: &str, items: Vec<NewsItem>) -> Vec<NewsItem> {
    let titles: Vec<&str> = items.iter().map(|item| item.title.as_str()).collect();
    let reply = match llm.rank(query, &titles).await {
        Ok(reply) => reply,
        Err(e) => {
            warn!("Reranking failed, keeping the original order: {e}");
            return items;
        }
    };
    match parse_ranking(&reply, items.len()) {
        Some(ranking) => {
            info!("Reranked {} items", items.len());
            apply_ranking(items, &ranking)
        }
        None => {
            warn!("Reranking reply is not a JSON ranking, keeping the original order");
            items
        }
    }
}

/// Sort news by recency, translate the most recent ones and optionally rerank them.
/// Reports are left untouched and follow the news items. Failures degrade to the
/// original text or order.
pub async fn pre_process_articles(
    entries: Vec<Entry>,
    options: &EnrichOptions,
    llm: Option<&LlmClient>,
) -> Vec<Entry> {
    let (mut news, reports): (Vec<NewsItem>, Vec<Entry>) =
        entries
            .into_iter()
            .fold((Vec::new(), Vec::new()), |(mut news, mut reports), entry| {
                match entry {
                    Entry::News(item) => news.push(item),
                    report @ Entry::Report(_) => reports.push(report),
                }
                (news, reports)
            });
    if news.is_empty() {
        return reports;
    }

    // stable, unparseable timestamps last
    news.sort_by_key(|item| std::cmp::Reverse(timestamp_of(item)));

    let translate_count = match (options.translate, llm) {
        (true, Some(_)) => options.num_items_to_translate.min(news.len()),
        (true, None) => {
            warn!("Translation requested but no LLM key is configured");
            0
        }
        _ => 0,
    };
    for (i, item) in news.iter_mut().enumerate() {
        match llm {
            Some(llm) if i < translate_count => translate_item(llm, item).await,
            _ => {
                item.translated_title = item.title.clone();
                item.translated_description = item.description.clone();
            }
        }
    }
    if translate_count > 0 {
        info!("Translated {translate_count} of {} items", news.len());
    }

    if options.rerank {
        match llm {
            Some(llm) => news = rerank(llm, &options.query, news).await,
            None => warn!("Reranking requested but no LLM key is configured"),
        }
    }

    news.into_iter().map(Entry::News).chain(reports).collect()
}
