use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};

use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use super::collection::CollectionOrigin;
use crate::api::Fetcher;
use crate::error::{PadoruError, Result};
use crate::utils::{make_absolute, make_relative, normalize_relative};

/// Which source produced a piece of image data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSource {
    Local,
    Remote,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    pub bytes: Vec<u8>,
    pub source: ImageSource,
}

/// How `Entry::get_image_data` combines the local and remote sources.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageFetchPolicy {
    /// Read the local file when possible and only download when that fails.
    #[default]
    LocalFirst,
    /// Always try the download as well; remote data replaces local data.
    RemoteOverride,
}

/// A Padoru character entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    #[serde(rename = "UID", alias = "uid", alias = "id", alias = "Id", default = "Uuid::new_v4")]
    pub id: Uuid,

    /// Absolute image URL
    #[serde(rename = "ImageUrl", alias = "imageUrl", default)]
    pub image_url: Option<String>,

    /// Image path relative to the collection root (or to the base URL)
    #[serde(rename = "ImagePath", alias = "imagePath", alias = "image", alias = "Image", default)]
    pub image_path: Option<String>,

    #[serde(rename = "Name", alias = "name")]
    pub name: String,

    #[serde(rename = "IsFemale", alias = "isFemale", default)]
    pub is_female: bool,

    #[serde(rename = "IsHumanoid", alias = "isHumanoid", default)]
    pub is_humanoid: bool,

    #[serde(rename = "IsNormal", alias = "isNormal", default)]
    pub is_normal: bool,

    #[serde(rename = "MALName", alias = "malName", default)]
    pub mal_name: Option<String>,

    #[serde(rename = "MALId", alias = "malId", default)]
    pub mal_id: Option<i64>,

    /// Person who contributed the image to the collection (not its creator)
    #[serde(rename = "ImageContributor", alias = "imageContributor", default)]
    pub image_contributor: Option<String>,

    #[serde(rename = "ImageCreator", alias = "imageCreator", default)]
    pub image_creator: Option<String>,

    /// Where the image was found (reddit post, pixiv, ...)
    #[serde(rename = "ImageSource", alias = "imageSource", default)]
    pub image_source: Option<String>,

    #[serde(skip)]
    parent: Weak<CollectionOrigin>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

impl Entry {
    /// Create a detached entry with a fresh id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            image_url: None,
            image_path: None,
            name: name.into(),
            is_female: false,
            is_humanoid: false,
            is_normal: false,
            mal_name: None,
            mal_id: None,
            image_contributor: None,
            image_creator: None,
            image_source: None,
            parent: Weak::new(),
        }
    }

    pub(crate) fn attach(&mut self, origin: &Arc<CollectionOrigin>) {
        self.parent = Arc::downgrade(origin);
    }

    fn parent(&self) -> Option<Arc<CollectionOrigin>> {
        self.parent.upgrade()
    }

    /// True while the owning collection is alive.
    pub fn has_parent(&self) -> bool {
        self.parent.strong_count() > 0
    }

    /// Image location on disk. Only resolvable for entries of a collection
    /// loaded from a local file.
    pub fn image_absolute_path(&self) -> Option<PathBuf> {
        let relative = non_blank(self.image_path.as_deref())?;
        let parent = self.parent().filter(|p| p.loaded_local())?;
        let root = parent.collection_root()?;
        Some(make_absolute(root, relative))
    }

    /// Image download URL: the explicit `image_url` when present, otherwise
    /// `image_path` joined onto the collection base URL.
    ///
    /// Any well-formed absolute URL counts; schemes the fetcher cannot
    /// download simply fail at download time.
    pub fn image_remote_url(&self) -> Option<Url> {
        match non_blank(self.image_url.as_deref()) {
            Some(raw) => Url::parse(raw.trim()).ok(),
            None => {
                let relative = non_blank(self.image_path.as_deref())?;
                let base = self.parent()?.base_url()?;
                base.join(&normalize_relative(relative)).ok()
            }
        }
    }

    /// Syntactic check only; the URL is not probed.
    pub fn has_valid_image_url(&self) -> bool {
        self.image_remote_url().is_some()
    }

    pub fn has_valid_local_image(&self) -> bool {
        self.image_absolute_path().map(|p| p.is_file()).unwrap_or(false)
    }

    /// Set `image_path` from an absolute path inside the collection root.
    pub fn set_image_path(&mut self, absolute: impl AsRef<Path>) -> Result<()> {
        let parent = self.parent().filter(|p| p.loaded_local()).ok_or_else(|| {
            PadoruError::InvalidState("the parent collection has to be loaded locally".to_string())
        })?;

        let root = parent
            .collection_root()
            .map(|r| r.to_string_lossy().into_owned())
            .unwrap_or_default();
        let absolute = absolute.as_ref().to_string_lossy();
        let relative = make_relative(&root, &absolute);
        if relative.trim().is_empty() {
            return Err(PadoruError::InvalidArgument(format!(
                "{} is not inside the collection root '{}'",
                absolute, root
            )));
        }

        self.image_path = Some(normalize_relative(&relative));
        Ok(())
    }

    /// Fetch the image from whichever source can provide it.
    ///
    /// Per-source failures are logged and skipped. `None` means no source
    /// produced data.
    pub async fn get_image_data(&self, fetcher: &dyn Fetcher, policy: ImageFetchPolicy) -> Option<ImageData> {
        let mut data = None;

        if self.parent().map(|p| p.loaded_local()).unwrap_or(false) {
            match self.get_image_data_local() {
                Ok(Some(bytes)) => {
                    data = Some(ImageData {
                        bytes,
                        source: ImageSource::Local,
                    })
                }
                Ok(None) => {}
                Err(e) => debug!(entry = %self.id, error = %e, "Local image read failed"),
            }
        }

        if data.is_some() && policy == ImageFetchPolicy::LocalFirst {
            return data;
        }

        match self.get_image_data_remote(fetcher).await {
            Ok(Some(bytes)) => {
                data = Some(ImageData {
                    bytes,
                    source: ImageSource::Remote,
                })
            }
            Ok(None) => {}
            Err(e) => debug!(entry = %self.id, error = %e, "Remote image download failed"),
        }

        data
    }

    /// Read the local image file, if there is one.
    pub fn get_image_data_local(&self) -> Result<Option<Vec<u8>>> {
        let Some(path) = self.image_absolute_path().filter(|p| p.is_file()) else {
            return Ok(None);
        };
        std::fs::read(&path)
            .map(Some)
            .map_err(|e| PadoruError::io(path, e))
    }

    /// Download the remote image, if there is a valid URL.
    pub async fn get_image_data_remote(&self, fetcher: &dyn Fetcher) -> Result<Option<Vec<u8>>> {
        let Some(url) = self.image_remote_url() else {
            return Ok(None);
        };
        fetcher.fetch_bytes(&url).await.map(Some)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mal_id {
            Some(id) => write!(f, "{} ({})", self.name, id),
            None => write!(f, "{}", self.name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::fetch::testing::MemoryFetcher;
    use crate::models::Collection;

    fn local_collection(dir: &Path) -> Collection {
        let doc = r#"{"Entries": [
            {"Name": "Nero", "ImagePath": "imgs/nero.png", "ImageUrl": "https://example.org/imgs/nero.png", "IsFemale": true},
            {"Name": "Broken", "ImagePath": "imgs/missing.png", "ImageUrl": "imgs/missing.png"}
        ]}"#;
        let path = dir.join("padoru.json");
        std::fs::write(&path, doc).unwrap();
        Collection::from_local_file(&path).unwrap()
    }

    #[test]
    fn test_display_with_and_without_mal_id() {
        let mut entry = Entry::new("Nero");
        assert_eq!(entry.to_string(), "Nero");
        entry.mal_id = Some(2518);
        assert_eq!(entry.to_string(), "Nero (2518)");
    }

    #[test]
    fn test_detached_entry_has_no_derived_paths() {
        let mut entry = Entry::new("Nero");
        entry.image_path = Some("imgs/nero.png".to_string());
        assert_eq!(entry.image_absolute_path(), None);
        assert_eq!(entry.image_remote_url(), None);
        assert!(!entry.has_valid_local_image());
    }

    #[test]
    fn test_document_load_resolves_no_local_path() {
        let collection = Collection::from_document(r#"{"Entries": [{"Name": "A", "ImagePath": "a.png"}]}"#).unwrap();
        assert!(collection.loaded_local());
        assert_eq!(collection.entries()[0].image_absolute_path(), None);
    }

    #[test]
    fn test_image_url_validation() {
        let mut entry = Entry::new("A");
        entry.image_url = Some("https://example.org/a.png".to_string());
        assert!(entry.has_valid_image_url());

        entry.image_url = Some("imgs/a.png".to_string());
        assert!(!entry.has_valid_image_url());

        entry.image_url = Some("   ".to_string());
        assert!(!entry.has_valid_image_url());

        entry.image_url = Some("ftp://example.org/a.png".to_string());
        assert!(entry.has_valid_image_url());
    }

    #[tokio::test]
    async fn test_unfetchable_scheme_yields_no_data() {
        let mut entry = Entry::new("A");
        entry.image_url = Some("ftp://example.org/a.png".to_string());
        let fetcher = MemoryFetcher::new();

        assert!(entry.has_valid_image_url());
        assert_eq!(entry.get_image_data(&fetcher, ImageFetchPolicy::LocalFirst).await, None);
        assert_eq!(fetcher.calls(), 1);
    }

    #[test]
    fn test_derived_paths_follow_parent_origin() {
        let dir = tempfile::tempdir().unwrap();
        let mut collection = local_collection(dir.path());
        let expected = dir.path().join("imgs/nero.png");
        assert_eq!(collection.entries()[0].image_absolute_path(), Some(expected));

        // no explicit url on this entry, so the base URL decides
        collection.entries_mut()[0].image_url = None;
        assert_eq!(collection.entries()[0].image_remote_url(), None);
        collection.set_base_url(Some(Url::parse("https://example.org/padoru/").unwrap()));
        assert_eq!(
            collection.entries()[0].image_remote_url().map(|u| u.to_string()),
            Some("https://example.org/padoru/imgs/nero.png".to_string())
        );
    }

    #[test]
    fn test_set_image_path_inside_root() {
        let dir = tempfile::tempdir().unwrap();
        let mut collection = local_collection(dir.path());
        let target = dir.path().join("imgs").join("x.png");

        collection.entries_mut()[0].set_image_path(&target).expect("inside root");
        assert_eq!(collection.entries()[0].image_path.as_deref(), Some("imgs/x.png"));
    }

    #[test]
    fn test_set_image_path_outside_root_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let mut collection = local_collection(dir.path());

        let err = collection.entries_mut()[0]
            .set_image_path(other.path().join("x.png"))
            .unwrap_err();
        assert!(matches!(err, PadoruError::InvalidArgument(_)));
    }

    #[test]
    fn test_set_image_path_requires_local_parent() {
        let mut entry = Entry::new("A");
        let err = entry.set_image_path("/tmp/x.png").unwrap_err();
        assert!(matches!(err, PadoruError::InvalidState(_)));
    }

    #[test]
    fn test_set_image_path_on_document_collection_is_invalid_argument() {
        let mut collection = Collection::from_document(r#"{"Entries": [{"Name": "A"}]}"#).unwrap();
        let err = collection.entries_mut()[0]
            .set_image_path("/srv/padoru/imgs/x.png")
            .unwrap_err();
        assert!(matches!(err, PadoruError::InvalidArgument(_)));
        assert_eq!(collection.entries()[0].image_path, None);
    }

    #[tokio::test]
    async fn test_get_image_data_prefers_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let collection = local_collection(dir.path());
        std::fs::create_dir_all(dir.path().join("imgs")).unwrap();
        std::fs::write(dir.path().join("imgs/nero.png"), b"local").unwrap();

        let fetcher = MemoryFetcher::new();
        fetcher.insert("https://example.org/imgs/nero.png", b"remote".to_vec());
        let entry = &collection.entries()[0];
        assert!(entry.has_valid_local_image());

        let data = entry.get_image_data(&fetcher, ImageFetchPolicy::LocalFirst).await.unwrap();
        assert_eq!(data.bytes, b"local");
        assert_eq!(data.source, ImageSource::Local);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_image_data_remote_override_replaces_local() {
        let dir = tempfile::tempdir().unwrap();
        let collection = local_collection(dir.path());
        std::fs::create_dir_all(dir.path().join("imgs")).unwrap();
        std::fs::write(dir.path().join("imgs/nero.png"), b"local").unwrap();

        let fetcher = MemoryFetcher::new();
        fetcher.insert("https://example.org/imgs/nero.png", b"remote".to_vec());
        let entry = &collection.entries()[0];

        let data = entry.get_image_data(&fetcher, ImageFetchPolicy::RemoteOverride).await.unwrap();
        assert_eq!(data.bytes, b"remote");
        assert_eq!(data.source, ImageSource::Remote);
    }

    #[tokio::test]
    async fn test_get_image_data_remote_failure_keeps_local() {
        let dir = tempfile::tempdir().unwrap();
        let collection = local_collection(dir.path());
        std::fs::create_dir_all(dir.path().join("imgs")).unwrap();
        std::fs::write(dir.path().join("imgs/nero.png"), b"local").unwrap();

        let fetcher = MemoryFetcher::new();
        let entry = &collection.entries()[0];

        let data = entry.get_image_data(&fetcher, ImageFetchPolicy::RemoteOverride).await.unwrap();
        assert_eq!(data.source, ImageSource::Local);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_get_image_data_falls_back_to_remote() {
        let dir = tempfile::tempdir().unwrap();
        let collection = local_collection(dir.path());

        let fetcher = MemoryFetcher::new();
        fetcher.insert("https://example.org/imgs/nero.png", b"remote".to_vec());

        let data = collection.entries()[0]
            .get_image_data(&fetcher, ImageFetchPolicy::LocalFirst)
            .await
            .unwrap();
        assert_eq!(data.bytes, b"remote");
        assert_eq!(data.source, ImageSource::Remote);
    }

    #[tokio::test]
    async fn test_get_image_data_no_source_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let collection = local_collection(dir.path());
        let fetcher = MemoryFetcher::new();

        let entry = &collection.entries()[1];
        assert!(!entry.has_valid_local_image());
        assert!(!entry.has_valid_image_url());
        assert_eq!(entry.get_image_data(&fetcher, ImageFetchPolicy::LocalFirst).await, None);
        assert_eq!(fetcher.calls(), 0);
    }

    #[tokio::test]
    async fn test_remote_download_error_surfaces_from_direct_call() {
        let mut entry = Entry::new("A");
        entry.image_url = Some("https://example.org/gone.png".to_string());
        let fetcher = MemoryFetcher::new();

        assert!(entry.get_image_data_remote(&fetcher).await.is_err());
        assert_eq!(entry.get_image_data(&fetcher, ImageFetchPolicy::LocalFirst).await, None);
    }
}
