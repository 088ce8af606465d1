use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::entry::Entry;
use crate::api::Fetcher;
use crate::error::{PadoruError, Result};

/// Where a collection document came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Origin {
    /// Created empty; not loaded from anywhere.
    #[default]
    Unset,
    /// Parsed from an in-memory document. Counts as local, but has no
    /// directory to resolve image paths against.
    Detached,
    LocalFile(PathBuf),
    Remote(Url),
}

/// Collection-level state that entries resolve their derived paths from.
///
/// The collection holds the only strong reference; entries keep a `Weak`
/// handle, so the pointer never keeps a collection alive on its own.
#[derive(Debug, Default)]
pub struct CollectionOrigin {
    origin: Origin,
    base_url: Option<Url>,
}

impl CollectionOrigin {
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    pub fn loaded_local(&self) -> bool {
        matches!(self.origin, Origin::Detached | Origin::LocalFile(_))
    }

    /// Directory image paths are relative to. Only local file origins have one.
    pub fn collection_root(&self) -> Option<PathBuf> {
        match &self.origin {
            Origin::LocalFile(path) => Some(path.parent().map(Path::to_path_buf).unwrap_or_default()),
            _ => None,
        }
    }

    /// Remote prefix image paths are relative to: the explicit override, or
    /// the directory of the remote document.
    pub fn base_url(&self) -> Option<Url> {
        if let Some(ref base) = self.base_url {
            return Some(base.clone());
        }
        match &self.origin {
            Origin::Remote(url) => url.join("./").ok(),
            _ => None,
        }
    }
}

/// A set of Padoru entries plus load/save metadata.
///
/// Deserializing goes through `CollectionDocument`, so entries are always
/// attached to their collection, even when serde is used directly instead
/// of `from_document`.
#[derive(Debug, Serialize, Deserialize)]
#[serde(from = "CollectionDocument")]
pub struct Collection {
    #[serde(rename = "Entries")]
    entries: Vec<Entry>,

    #[serde(rename = "LastChange", with = "timestamp")]
    last_change: DateTime<Utc>,

    #[serde(skip)]
    origin: Arc<CollectionOrigin>,
}

/// Wire form of a collection document.
#[derive(Deserialize)]
struct CollectionDocument {
    #[serde(rename = "Entries", alias = "entries")]
    entries: Vec<Entry>,

    #[serde(
        rename = "LastChange",
        alias = "lastChange",
        default = "Utc::now",
        with = "timestamp"
    )]
    last_change: DateTime<Utc>,
}

impl From<CollectionDocument> for Collection {
    fn from(doc: CollectionDocument) -> Self {
        let mut collection = Self {
            entries: doc.entries,
            last_change: doc.last_change,
            origin: Arc::default(),
        };
        collection.set_origin(Origin::Unset);
        collection
    }
}

impl Collection {
    pub fn create_empty() -> Self {
        Self {
            entries: Vec::new(),
            last_change: Utc::now(),
            origin: Arc::default(),
        }
    }

    /// Parse a collection document held in memory.
    pub fn from_document(text: &str) -> Result<Self> {
        let mut collection: Collection = serde_json::from_str(text)?;
        collection.set_origin(Origin::Detached);
        Ok(collection)
    }

    pub fn from_local_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| PadoruError::io(path, e))?;

        let mut collection = Self::from_document(&text)?;
        collection.set_origin(Origin::LocalFile(path.to_path_buf()));
        info!(path = %path.display(), entries = collection.len(), "Loaded local collection");
        Ok(collection)
    }

    pub async fn from_remote_document(fetcher: &dyn Fetcher, url: &Url) -> Result<Self> {
        let text = fetcher.fetch_text(url).await?;

        let mut collection = Self::from_document(&text)?;
        collection.set_origin(Origin::Remote(url.clone()));
        info!(url = %url, entries = collection.len(), "Loaded remote collection");
        Ok(collection)
    }

    /// Serialize the collection, stamping `last_change` first.
    pub fn to_document(&mut self, minify: bool) -> Result<String> {
        self.last_change = Utc::now();
        let text = if minify {
            serde_json::to_string(self)?
        } else {
            serde_json::to_string_pretty(self)?
        };
        Ok(text)
    }

    /// Write the collection to `path`, or back to the file it was loaded from.
    pub fn save_to_file(&mut self, path: Option<&Path>, minify: bool) -> Result<()> {
        let path = match path.filter(|p| !p.as_os_str().is_empty()) {
            Some(p) => p.to_path_buf(),
            None => match self.origin.origin() {
                Origin::LocalFile(p) => p.clone(),
                _ => {
                    return Err(PadoruError::InvalidState(
                        "no path given and collection was not loaded from a local file".to_string(),
                    ))
                }
            },
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| PadoruError::io(parent, e))?;
        }

        let contents = self.to_document(minify)?;
        std::fs::write(&path, contents).map_err(|e| PadoruError::io(&path, e))?;
        debug!(path = %path.display(), entries = self.len(), "Saved collection");
        Ok(())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [Entry] {
        &mut self.entries
    }

    pub fn entry_by_id(&self, id: Uuid) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entry_by_id_mut(&mut self, id: Uuid) -> Option<&mut Entry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    /// Append an entry, pointing it at this collection.
    pub fn push_entry(&mut self, mut entry: Entry) {
        entry.attach(&self.origin);
        self.entries.push(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last_change(&self) -> DateTime<Utc> {
        self.last_change
    }

    pub fn origin(&self) -> &Origin {
        self.origin.origin()
    }

    /// Path or URL the collection was loaded from; empty when there is none.
    pub fn loaded_from(&self) -> String {
        match self.origin.origin() {
            Origin::LocalFile(path) => path.display().to_string(),
            Origin::Remote(url) => url.to_string(),
            Origin::Unset | Origin::Detached => String::new(),
        }
    }

    pub fn loaded_local(&self) -> bool {
        self.origin.loaded_local()
    }

    pub fn collection_root(&self) -> Option<PathBuf> {
        self.origin.collection_root()
    }

    pub fn base_url(&self) -> Option<Url> {
        self.origin.base_url()
    }

    /// Override the remote prefix entry image paths are joined onto.
    pub fn set_base_url(&mut self, base_url: Option<Url>) {
        let origin = self.origin.origin().clone();
        self.rebuild_origin(origin, base_url);
    }

    fn set_origin(&mut self, origin: Origin) {
        let base_url = self.origin.base_url.clone();
        self.rebuild_origin(origin, base_url);
    }

    fn rebuild_origin(&mut self, origin: Origin, base_url: Option<Url>) {
        self.origin = Arc::new(CollectionOrigin { origin, base_url });
        for entry in &mut self.entries {
            entry.attach(&self.origin);
        }
    }
}

/// `LastChange` is written as RFC 3339. Older documents carry naive local
/// timestamps without an offset; those are read as UTC.
mod timestamp {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(serde::de::Error::custom)
    }
}
