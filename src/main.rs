#![warn(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
mod aggregator;
mod arg_parse;
mod common;
mod config;
mod enrichment;
mod export;
mod feeds;
mod sender;
mod session;
mod sources;
mod storage;

use std::path::Path;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::aggregator::{fetch_combined, fetch_news};
use crate::arg_parse::{CmdArgs, Command};
use crate::common::{
    time::{filter_articles_by_time, TimeFilter},
    Entry, FetchRequest,
};
use crate::config::AppConfig;
use crate::enrichment::{
    pre_process_articles, translate_for_delivery, EnrichOptions, LlmClient, Summaries, Summarizer,
};
use crate::session::Session;
use crate::sources::{ApiKind, SourceFetcher};
use crate::storage::{ChatIdStore, FileStorage, ScrapeSourceStore};

type BoxResult<T> = Result<T, Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> BoxResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = &CmdArgs::parse(std::env::args().collect())?;
    let config = AppConfig::load(&args.config)?;
    let data_dir = config.get_data_dir();
    let mut session = Session::open(&data_dir, &args.session);
    info!("Using session '{}'", session.id());

    match args.get_command()? {
        Command::Search => search(args, &config, &data_dir, &mut session).await?,
        Command::Show => print_entries(&session),
        Command::Clear => {
            session.clear();
            session.save()?;
            println!("Cleared results");
        }
        Command::Select(references) => {
            for reference in &references {
                match session.find(reference).cloned() {
                    Some(entry) => {
                        let label = entry.label();
                        if session.selection_mut().add(entry) {
                            println!("Selected: {label}");
                        }
                    }
                    None => warn!("No item matches '{reference}'"),
                }
            }
            session.save()?;
            println!("{} items selected", session.selection().len());
        }
        Command::Unselect(references) => {
            for reference in &references {
                let key = session.find(reference).map_or_else(|| reference.clone(), Entry::key);
                session.selection_mut().remove(&key);
            }
            session.save()?;
            println!("{} items selected", session.selection().len());
        }
        Command::Reset => {
            session.selection_mut().clear();
            session.save()?;
            println!("Selection reset");
        }
        Command::Send => send(args, &config, &data_dir, &session).await?,
        Command::Sources => {
            let store = ScrapeSourceStore::from_fs(&data_dir);
            if store.sources().is_empty() {
                println!("No scrape sources added yet.");
            }
            for (i, source) in store.sources().iter().enumerate() {
                println!("{}. {} - {} ({})", i + 1, source.name, source.url, source.source_type);
            }
        }
        Command::AddSource(source) => {
            let mut store = ScrapeSourceStore::from_fs(&data_dir);
            let name = source.name.clone();
            store.add(source)?;
            store.dump()?;
            println!("Added {name} to scrape sources");
        }
        Command::RemoveSource(name) => {
            let mut store = ScrapeSourceStore::from_fs(&data_dir);
            if store.remove(&name) {
                store.dump()?;
                println!("Removed {name}");
            } else {
                println!("No scrape source named {name}");
            }
        }
        Command::Chats => {
            let store = ChatIdStore::from_fs(&data_dir);
            for (username, chat_id) in store.entries() {
                println!("@{username}: {chat_id}");
            }
        }
        Command::Export => {
            let contents = export::export(session.articles(), args.get_format()?)?;
            match &args.output {
                Some(path) => {
                    std::fs::write(path, contents)?;
                    println!("Exported {} items to {path}", session.articles().len());
                }
                None => print!("{contents}"),
            }
        }
    }

    Ok(())
}

/// The crypto-news source is searched for a fixed topic
fn effective_query(api: ApiKind, query: &str) -> String {
    match api {
        ApiKind::NewsApi => String::from("cryptocurrency"),
        _ => query.to_string(),
    }
}

async fn search(
    args: &CmdArgs,
    config: &AppConfig,
    data_dir: &Path,
    session: &mut Session,
) -> BoxResult<()> {
    let api = args.get_api()?;
    let (from_date, to_date) = args.get_dates()?;
    let scrape_sources = ScrapeSourceStore::from_fs(data_dir);
    let request = FetchRequest::new(&effective_query(api, &args.query), args.max_records)
        .with_dates(from_date, to_date);

    let first = SourceFetcher::new(api, config, scrape_sources.sources());
    info!("Searching {api} for '{}'", request.query);
    let aggregated = match args.get_second_api()? {
        Some(second_api) => {
            let second = SourceFetcher::new(second_api, config, scrape_sources.sources());
            fetch_combined(&first, &second, &request).await
        }
        None => fetch_news(&first, &request).await,
    };
    for failure in &aggregated.errors {
        eprintln!("Error: {failure}");
    }

    let filter = TimeFilter::from_options(args.hours, from_date, to_date, args.no_time_filter);
    let entries = filter_articles_by_time(aggregated.entries, &filter);

    let llm = LlmClient::from_config(&config.llm, config.http_timeout_secs);
    let options = EnrichOptions {
        translate: args.translate,
        num_items_to_translate: args.translate_count,
        rerank: args.rerank,
        query: args.query.clone(),
    };
    let entries = pre_process_articles(entries, &options, llm.as_ref()).await;

    session.set_articles(entries);
    session.save()?;
    print_entries(session);

    Ok(())
}

async fn send(
    args: &CmdArgs,
    config: &AppConfig,
    data_dir: &Path,
    session: &Session,
) -> BoxResult<()> {
    if session.selection().is_empty() {
        println!("Nothing selected");
        return Ok(());
    }

    let target = args
        .target
        .clone()
        .or_else(|| config.telegram.as_ref().map(|t| t.chat_id.clone()))
        .unwrap_or_default();

    let llm = LlmClient::from_config(&config.llm, config.http_timeout_secs);
    let selected = match &llm {
        Some(llm) => translate_for_delivery(session.selection().entries(), llm).await,
        None => session.selection().entries().to_vec(),
    };
    let summaries = if args.summary {
        Summarizer::new(config.http_timeout_secs, llm.as_ref())
            .summarize_all(&selected)
            .await
    } else {
        Summaries::new()
    };

    let mut chat_ids = ChatIdStore::from_fs(data_dir);
    let report = config
        .get_sender()
        .send_batch(&selected, &target, &mut chat_ids, &summaries)
        .await;

    for failure in &report.failures {
        eprintln!("Error sending {}: {}", failure.label, failure.reason);
    }
    if report.success_count > 0 {
        println!("{} items sent to Telegram", report.success_count);
    }
    if report.fail_count > 0 {
        println!("{} items failed", report.fail_count);
    }

    Ok(())
}

fn print_entries(session: &Session) {
    let articles = session.articles();
    if articles.is_empty() {
        println!("No items to display");
        return;
    }
    for (i, entry) in articles.iter().enumerate() {
        let mark = if session.selection().contains(&entry.key()) {
            "[x]"
        } else {
            "[ ]"
        };
        match entry {
            Entry::News(item) => {
                println!("{mark} {}. {}", i + 1, item.translated_title);
                println!("      {} | {}", item.source, item.published_at);
                println!("      {}", item.url);
            }
            Entry::Report(report) => {
                println!(
                    "{mark} {}. {} {} revenue {} {}",
                    i + 1,
                    report.symbol,
                    report.date,
                    sender::group_thousands(report.revenue),
                    report.reported_currency
                );
            }
        }
    }
    println!("{} items selected", session.selection().len());
}
