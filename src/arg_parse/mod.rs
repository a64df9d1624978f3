use std::io::{Error, ErrorKind};

use chrono::NaiveDate;

use crate::common::{ScrapeSource, SourceType};
use crate::export::ExportFormat;
use crate::session::DEFAULT_SESSION;
use crate::sources::ApiKind;

/// What the user asked the relay to do
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Search,
    Show,
    Clear,
    Select(Vec<String>),
    Unselect(Vec<String>),
    Reset,
    Send,
    Sources,
    AddSource(ScrapeSource),
    RemoveSource(String),
    Chats,
    Export,
}

#[derive(Clone, Debug)]
pub struct CmdArgs {
    pub config: String,
    pub session: String,
    pub command: String,
    pub arguments: Vec<String>,
    pub query: String,
    pub api: String,
    pub combine_with: Option<String>,
    pub max_records: usize,
    pub from_date: Option<String>,
    pub to_date: Option<String>,
    pub hours: Option<f64>,
    pub no_time_filter: bool,
    pub translate: bool,
    pub translate_count: usize,
    pub rerank: bool,
    pub target: Option<String>,
    pub summary: bool,
    pub source_type: String,
    pub format: String,
    pub output: Option<String>,
}

fn invalid(message: String) -> Error {
    Error::new(ErrorKind::InvalidInput, message)
}

fn parse_date(value: Option<&String>) -> Result<Option<NaiveDate>, Error> {
    value
        .map(|v| {
            NaiveDate::parse_from_str(v.trim(), "%Y-%m-%d")
                .map_err(|e| invalid(format!("Invalid date '{v}': {e}")))
        })
        .transpose()
}

impl CmdArgs {
    pub fn parse(args: Vec<String>) -> Result<Self, Error> {
        let mut config = String::from("./config.json");
        let mut session = String::from(DEFAULT_SESSION);
        let mut command = String::new();
        let mut arguments: Vec<String> = Vec::new();
        let mut query = String::from("Iran");
        let mut api = String::from("gnews");
        let mut combine_with: Option<String> = None;
        let mut max_records: usize = 20;
        let mut from_date: Option<String> = None;
        let mut to_date: Option<String> = None;
        let mut hours: Option<f64> = None;
        let mut no_time_filter = false;
        let mut translate = false;
        let mut translate_count: usize = 1;
        let mut rerank = false;
        let mut target: Option<String> = None;
        let mut summary = false;
        let mut source_type = String::from("web");
        let mut format = String::from("csv");
        let mut output: Option<String> = None;
        {
            let mut ap = argparse::ArgumentParser::new();
            ap.set_description(
                "News relay: search news and financial reports, pick items and forward them to Telegram. \
                 Commands: search, show, clear, select <n|url>..., unselect <n|url>..., reset, send, \
                 sources, add-source <name> <url>, remove-source <name>, chats, export",
            );
            ap.refer(&mut config).add_option(
                &["-c", "--config"],
                argparse::Store,
                "Config file path; default is config.json",
            );
            ap.refer(&mut session).add_option(
                &["-s", "--session"],
                argparse::Store,
                "Session id; each session keeps its own results and selection",
            );
            ap.refer(&mut query).add_option(
                &["-q", "--query"],
                argparse::Store,
                "Search query, or a company symbol for financial reports; default is Iran",
            );
            ap.refer(&mut api).add_option(
                &["-a", "--api"],
                argparse::Store,
                "Source to search: gnews, world-news, newsapi, cryptocompare, coingecko, fmp, currents, scraped",
            );
            ap.refer(&mut combine_with).add_option(
                &["--with"],
                argparse::StoreOption,
                "Second source to search at the same time",
            );
            ap.refer(&mut max_records).add_option(
                &["-n", "--max"],
                argparse::Store,
                "Maximum number of items; default is 20",
            );
            ap.refer(&mut from_date).add_option(
                &["--from"],
                argparse::StoreOption,
                "Start date, YYYY-MM-DD",
            );
            ap.refer(&mut to_date).add_option(
                &["--to"],
                argparse::StoreOption,
                "End date, YYYY-MM-DD",
            );
            ap.refer(&mut hours).add_option(
                &["--hours"],
                argparse::StoreOption,
                "Keep only news published in the last N hours",
            );
            ap.refer(&mut no_time_filter).add_option(
                &["--no-time-filter"],
                argparse::StoreTrue,
                "Keep all fetched items regardless of publication time",
            );
            ap.refer(&mut translate).add_option(
                &["-t", "--translate"],
                argparse::StoreTrue,
                "Translate the most recent news items",
            );
            ap.refer(&mut translate_count).add_option(
                &["--translate-count"],
                argparse::Store,
                "Number of news items to translate; default is 1",
            );
            ap.refer(&mut rerank).add_option(
                &["-r", "--rerank"],
                argparse::StoreTrue,
                "Rerank news items by relevance to the query",
            );
            ap.refer(&mut target).add_option(
                &["--chat"],
                argparse::StoreOption,
                "Telegram chat id or @username to send to; default comes from the config",
            );
            ap.refer(&mut summary).add_option(
                &["--summary"],
                argparse::StoreTrue,
                "Add a short summary of each article page to the sent messages",
            );
            ap.refer(&mut source_type).add_option(
                &["--type"],
                argparse::Store,
                "Type of a new scrape source: web or rss; default is web",
            );
            ap.refer(&mut format).add_option(
                &["-f", "--format"],
                argparse::Store,
                "Export format: csv or json; default is csv",
            );
            ap.refer(&mut output).add_option(
                &["-o", "--output"],
                argparse::StoreOption,
                "Export file path; default is stdout",
            );
            ap.refer(&mut command)
                .add_argument("command", argparse::Store, "Command to run")
                .required();
            ap.refer(&mut arguments)
                .add_argument("arguments", argparse::List, "Command arguments");

            match ap.parse(args, &mut std::io::stdout(), &mut std::io::stderr()) {
                Ok(()) => {}
                Err(_) => {
                    return Err(Error::from(ErrorKind::InvalidInput));
                }
            }
        }

        Ok(CmdArgs {
            config,
            session,
            command,
            arguments,
            query,
            api,
            combine_with,
            max_records,
            from_date,
            to_date,
            hours,
            no_time_filter,
            translate,
            translate_count,
            rerank,
            target,
            summary,
            source_type,
            format,
            output,
        })
    }

    pub fn get_command(&self) -> Result<Command, Error> {
        let args = &self.arguments;
        let command = match self.command.to_lowercase().as_str() {
            "search" => Command::Search,
            "show" => Command::Show,
            "clear" => Command::Clear,
            "select" | "unselect" if args.is_empty() => {
                return Err(invalid(format!("{} needs item numbers or URLs", self.command)));
            }
            "select" => Command::Select(args.clone()),
            "unselect" => Command::Unselect(args.clone()),
            "reset" => Command::Reset,
            "send" => Command::Send,
            "sources" => Command::Sources,
            "add-source" => match args.as_slice() {
                [name, url] => Command::AddSource(ScrapeSource {
                    name: name.clone(),
                    url: url.clone(),
                    source_type: self.source_type.parse::<SourceType>().map_err(invalid)?,
                }),
                _ => return Err(invalid("add-source needs a name and a URL".to_string())),
            },
            "remove-source" => match args.as_slice() {
                [name] => Command::RemoveSource(name.clone()),
                _ => return Err(invalid("remove-source needs a source name".to_string())),
            },
            "chats" => Command::Chats,
            "export" => Command::Export,
            other => return Err(invalid(format!("Unknown command: {other}"))),
        };
        Ok(command)
    }

    pub fn get_api(&self) -> Result<ApiKind, Error> {
        self.api.parse().map_err(invalid)
    }

    pub fn get_second_api(&self) -> Result<Option<ApiKind>, Error> {
        self.combine_with
            .as_deref()
            .map(|api| api.parse().map_err(invalid))
            .transpose()
    }

    pub fn get_dates(&self) -> Result<(Option<NaiveDate>, Option<NaiveDate>), Error> {
        Ok((
            parse_date(self.from_date.as_ref())?,
            parse_date(self.to_date.as_ref())?,
        ))
    }

    pub fn get_format(&self) -> Result<ExportFormat, Error> {
        self.format.parse().map_err(invalid)
    }
}
