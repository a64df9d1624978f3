use std::{io::Error, path::Path};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::common::Entry;
use crate::storage::JsonFile;

pub const DEFAULT_SESSION: &str = "default";

/// Entries picked for delivery, in the order they were picked. Entries are matched
/// by identity key, so repeated adds and removes are no-ops.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Selection {
    entries: Vec<Entry>,
}

impl Selection {
    /// Returns `false` when an entry with the same key is already selected
    pub fn add(&mut self, entry: Entry) -> bool {
        if self.contains(&entry.key()) {
            return false;
        }
        self.entries.push(entry);
        true
    }

    /// Returns `false` when nothing with this key was selected
    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.key() != key);
        before != self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key() == key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct SessionState {
    #[serde(default)]
    articles: Vec<Entry>,
    #[serde(default)]
    selection: Selection,
}

/// Everything one user works on between commands: the last fetched entries and
/// the selection. Each session id has its own file, `session_{id}.json`.
pub struct Session {
    id: String,
    file: JsonFile<SessionState>,
    state: SessionState,
}

/// Keep session ids usable as file name parts
fn sanitize_id(id: &str) -> String {
    let id: String = id
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    if id.is_empty() {
        DEFAULT_SESSION.to_string()
    } else {
        id
    }
}

impl Session {
    #[must_use]
    pub fn open(dir: &Path, id: &str) -> Self {
        let id = sanitize_id(id);
        let file = JsonFile::new(dir.join(format!("session_{id}.json")));
        let state = file.load();
        Self { id, file, state }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn articles(&self) -> &[Entry] {
        &self.state.articles
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.state.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.state.selection
    }

    /// Replace the cached entries after a search; the old selection is dropped
    pub fn set_articles(&mut self, articles: Vec<Entry>) {
        info!("Session {} now holds {} entries", self.id, articles.len());
        self.state.articles = articles;
        self.state.selection.clear();
    }

    /// Discard the cached entries and the selection
    pub fn clear(&mut self) {
        self.state = SessionState::default();
    }

    /// Look up a cached entry by its 1-based position in the listing or by its key
    #[must_use]
    pub fn find(&self, reference: &str) -> Option<&Entry> {
        if let Ok(position) = reference.trim().parse::<usize>() {
            return position
                .checked_sub(1)
                .and_then(|i| self.state.articles.get(i));
        }
        self.state.articles.iter().find(|e| e.key() == reference)
    }

    pub fn save(&self) -> Result<(), Error> {
        self.file.save(&self.state)
    }
}
