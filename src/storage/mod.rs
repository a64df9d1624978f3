use std::{
    collections::BTreeMap,
    fs,
    io::{Error, ErrorKind},
    marker::PhantomData,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::common::ScrapeSource;

pub const CHAT_IDS_FILE: &str = "telegram_chat_ids.json";
pub const SCRAPE_SOURCES_FILE: &str = "scrape_sources.json";

/// A store backed by one JSON file under the data directory
pub trait FileStorage: Sized {
    /// Load the store; a missing or unreadable file gives an empty store
    fn from_fs(dir: &Path) -> Self;
    /// Write the whole store back to its file
    fn dump(&self) -> Result<(), Error>;
}

/// One JSON document on disk. No locking: the last writer wins.
#[derive(Debug, Clone)]
pub struct JsonFile<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize + DeserializeOwned + Default> JsonFile<T> {
    #[must_use]
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Read the document. Missing and corrupt files degrade to the default value.
    #[must_use]
    pub fn load(&self) -> T {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet", self.path.display());
                return T::default();
            }
            Err(e) => {
                warn!("Could not read {}: {e}", self.path.display());
                return T::default();
            }
        };
        serde_json::from_str(&contents).unwrap_or_else(|e| {
            warn!("Ignoring corrupt file {}: {e}", self.path.display());
            T::default()
        })
    }

    pub fn save(&self, value: &T) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(value).map_err(Error::other)?;
        fs::write(&self.path, contents)
    }
}

/// Chat ids are keyed by lowercase username without the leading `@`
#[must_use]
pub fn normalize_username(username: &str) -> String {
    username.trim().trim_start_matches('@').to_lowercase()
}

/// Cache of username to numeric chat id lookups; entries are only ever added
pub struct ChatIdStore {
    file: JsonFile<BTreeMap<String, i64>>,
    chat_ids: BTreeMap<String, i64>,
}

impl ChatIdStore {
    #[must_use]
    pub fn get(&self, username: &str) -> Option<i64> {
        self.chat_ids.get(&normalize_username(username)).copied()
    }

    pub fn insert(&mut self, username: &str, chat_id: i64) {
        self.chat_ids.insert(normalize_username(username), chat_id);
    }

    #[must_use]
    pub fn entries(&self) -> &BTreeMap<String, i64> {
        &self.chat_ids
    }
}

impl FileStorage for ChatIdStore {
    fn from_fs(dir: &Path) -> Self {
        let file = JsonFile::new(dir.join(CHAT_IDS_FILE));
        let chat_ids = file.load();
        Self { file, chat_ids }
    }

    fn dump(&self) -> Result<(), Error> {
        self.file.save(&self.chat_ids)
    }
}

/// The user-defined web and RSS sources, unique by name
pub struct ScrapeSourceStore {
    file: JsonFile<Vec<ScrapeSource>>,
    sources: Vec<ScrapeSource>,
}

impl ScrapeSourceStore {
    #[must_use]
    pub fn sources(&self) -> &[ScrapeSource] {
        &self.sources
    }

    /// Add a source. A source with the same name is an error and leaves the store
    /// unchanged.
    pub fn add(&mut self, source: ScrapeSource) -> Result<(), Error> {
        if self.exists(&source.name) {
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                format!("Source already exists: {}", source.name),
            ));
        }
        self.sources.push(source);
        Ok(())
    }

    /// Remove a source by name. Returns whether anything was removed.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.sources.len();
        self.sources.retain(|s| !s.name.eq_ignore_ascii_case(name));
        before != self.sources.len()
    }

    fn exists(&self, name: &str) -> bool {
        self.sources.iter().any(|s| s.name.eq_ignore_ascii_case(name))
    }
}

impl FileStorage for ScrapeSourceStore {
    fn from_fs(dir: &Path) -> Self {
        let file = JsonFile::new(dir.join(SCRAPE_SOURCES_FILE));
        let sources = file.load();
        Self { file, sources }
    }

    fn dump(&self) -> Result<(), Error> {
        self.file.save(&self.sources)
    }
}
