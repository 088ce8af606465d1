//! Cached client over a single Padoru collection.
//!
//! The client keeps one synced snapshot of the collection and re-fetches
//! it on read once the snapshot is older than `max_collection_age`.
//! Snapshots are handed out behind `Arc`, so a resync never changes what
//! an earlier caller is looking at.

use std::fmt;
use std::ops::Deref;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use reqwest::Url;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::fetch::{Fetcher, HttpFetcher};
use crate::cache::{CachedData, DEFAULT_STALE_MINUTES};
use crate::config::Config;
use crate::error::{PadoruError, Result};
use crate::models::{Collection, Entry, ImageData, ImageFetchPolicy};

/// Where the client loads its collection document from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionSource {
    Remote(Url),
    Local(PathBuf),
}

impl CollectionSource {
    /// `http`/`https` URLs are remote; `file://` URLs and anything else are
    /// treated as local paths.
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(PadoruError::InvalidState(
                "collection source is empty".to_string(),
            ));
        }

        match Url::parse(raw) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Self::Remote(url)),
            Ok(url) if url.scheme() == "file" => url
                .to_file_path()
                .map(Self::Local)
                .map_err(|_| PadoruError::InvalidState(format!("invalid file URL: {}", raw))),
            _ => Ok(Self::Local(PathBuf::from(raw))),
        }
    }
}

impl FromStr for CollectionSource {
    type Err = PadoruError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for CollectionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionSource::Remote(url) => write!(f, "{}", url),
            CollectionSource::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Read-only selection of entries from one collection snapshot, in
/// collection order.
#[derive(Debug, Clone)]
pub struct EntrySet {
    collection: Arc<Collection>,
    indices: Vec<usize>,
}

impl EntrySet {
    fn all(collection: Arc<Collection>) -> Self {
        let indices = (0..collection.len()).collect();
        Self { collection, indices }
    }

    fn filtered(collection: Arc<Collection>, predicate: impl Fn(&Entry) -> bool) -> Self {
        let indices = collection
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| predicate(*e))
            .map(|(i, _)| i)
            .collect();
        Self { collection, indices }
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entry> {
        self.indices.get(index).map(|&i| &self.collection.entries()[i])
    }

    pub fn first(&self) -> Option<&Entry> {
        self.get(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> + '_ {
        self.indices.iter().map(move |&i| &self.collection.entries()[i])
    }

    /// The snapshot these entries belong to.
    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }
}

impl<'a> IntoIterator for &'a EntrySet {
    type Item = &'a Entry;
    type IntoIter = Box<dyn Iterator<Item = &'a Entry> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}

/// One entry of a collection snapshot. Keeps the snapshot alive, so its
/// derived image locations keep resolving after the client resyncs.
#[derive(Debug, Clone)]
pub struct EntryRef {
    collection: Arc<Collection>,
    index: usize,
}

impl EntryRef {
    pub fn collection(&self) -> &Arc<Collection> {
        &self.collection
    }
}

impl Deref for EntryRef {
    type Target = Entry;

    fn deref(&self) -> &Entry {
        &self.collection.entries()[self.index]
    }
}

impl fmt::Display for EntryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&**self, f)
    }
}

#[derive(Default)]
struct SyncState {
    source: Option<CollectionSource>,
    cached: Option<CachedData<Arc<Collection>>>,
}

/// Client for a remote (or local) Padoru collection.
pub struct PadoruClient {
    fetcher: Arc<dyn Fetcher>,
    max_collection_age: Duration,
    image_policy: ImageFetchPolicy,
    // Staleness check and resync both run under this lock, so overlapping
    // stale reads trigger a single fetch.
    state: Mutex<SyncState>,
}

impl PadoruClient {
    /// Create a client that downloads over HTTP with default settings.
    pub fn new() -> Result<Self> {
        Ok(Self::with_fetcher(Arc::new(HttpFetcher::new()?)))
    }

    pub fn with_fetcher(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            max_collection_age: Duration::minutes(DEFAULT_STALE_MINUTES),
            image_policy: ImageFetchPolicy::default(),
            state: Mutex::new(SyncState::default()),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let fetcher = HttpFetcher::with_timeout(config.request_timeout())?;
        let mut client = Self::with_fetcher(Arc::new(fetcher));
        client.set_max_collection_age(config.max_collection_age());
        client.set_image_policy(config.image_policy);
        Ok(client)
    }

    pub fn max_collection_age(&self) -> Duration {
        self.max_collection_age
    }

    pub fn set_max_collection_age(&mut self, max_age: Duration) {
        self.max_collection_age = max_age;
    }

    pub fn image_policy(&self) -> ImageFetchPolicy {
        self.image_policy
    }

    pub fn set_image_policy(&mut self, policy: ImageFetchPolicy) {
        self.image_policy = policy;
    }

    /// Sync `source` right away and remember it for later resyncs.
    ///
    /// On failure the previous source and snapshot stay in place.
    pub async fn load_collection(&self, source: CollectionSource) -> Result<()> {
        let mut state = self.state.lock().await;
        let collection = self.fetch_collection(&source).await?;
        state.source = Some(source);
        state.cached = Some(CachedData::new(Arc::new(collection)));
        Ok(())
    }

    /// Like `load_collection`, parsing the source from a URL or path string.
    pub async fn load_collection_str(&self, source: &str) -> Result<()> {
        self.load_collection(CollectionSource::parse(source)?).await
    }

    /// Discard the cached collection and fetch it again.
    pub async fn resync(&self) -> Result<()> {
        let mut state = self.state.lock().await;
        self.resync_locked(&mut state).await
    }

    async fn resync_locked(&self, state: &mut SyncState) -> Result<()> {
        let source = state.source.clone().ok_or_else(|| {
            PadoruError::InvalidState(
                "no collection source is known; call load_collection first".to_string(),
            )
        })?;

        let collection = self.fetch_collection(&source).await?;
        state.cached = Some(CachedData::new(Arc::new(collection)));
        Ok(())
    }

    async fn fetch_collection(&self, source: &CollectionSource) -> Result<Collection> {
        let collection = match source {
            CollectionSource::Remote(url) => {
                Collection::from_remote_document(self.fetcher.as_ref(), url).await?
            }
            CollectionSource::Local(path) => Collection::from_local_file(path)?,
        };
        info!(source = %source, entries = collection.len(), "Collection synced");
        Ok(collection)
    }

    /// Current snapshot, resynced first when it has gone stale.
    async fn current_collection(&self) -> Result<Arc<Collection>> {
        let mut state = self.state.lock().await;

        let stale = state
            .cached
            .as_ref()
            .map(|c| c.is_stale(self.max_collection_age))
            .unwrap_or(true);
        if stale {
            debug!(max_age_secs = self.max_collection_age.num_seconds(), "Collection is stale, resyncing");
            self.resync_locked(&mut state).await?;
        }

        state
            .cached
            .as_ref()
            .map(|c| Arc::clone(&c.data))
            .ok_or_else(|| PadoruError::InvalidState("no collection loaded".to_string()))
    }

    pub async fn get_entries(&self) -> Result<EntrySet> {
        Ok(EntrySet::all(self.current_collection().await?))
    }

    pub async fn get_entries_where<F>(&self, predicate: F) -> Result<EntrySet>
    where
        F: Fn(&Entry) -> bool,
    {
        Ok(EntrySet::filtered(self.current_collection().await?, predicate))
    }

    pub async fn get_random_entry(&self) -> Result<EntryRef> {
        let collection = self.current_collection().await?;
        if collection.is_empty() {
            return Err(PadoruError::EmptyCollection);
        }
        let index = rand::thread_rng().gen_range(0..collection.len());
        Ok(EntryRef { collection, index })
    }

    /// Image bytes for `entry` using this client's downloader and policy.
    pub async fn image_data(&self, entry: &Entry) -> Option<ImageData> {
        entry.get_image_data(self.fetcher.as_ref(), self.image_policy).await
    }

    pub async fn source(&self) -> Option<CollectionSource> {
        self.state.lock().await.source.clone()
    }

    pub async fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.state.lock().await.cached.as_ref().map(|c| c.cached_at)
    }

    /// Human-readable age of the cached collection, "never" if not synced.
    pub async fn sync_age_display(&self) -> String {
        self.state
            .lock()
            .await
            .cached
            .as_ref()
            .map(|c| c.age_display())
            .unwrap_or_else(|| "never".to_string())
    }
}
