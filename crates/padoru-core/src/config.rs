//! Client configuration.
//!
//! Holds the collection source, the staleness window, the request timeout,
//! and the image retrieval policy.
//!
//! Configuration is stored at `~/.config/padoru/config.json`.

use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::api::fetch::DEFAULT_REQUEST_TIMEOUT_SECS;
use crate::cache::DEFAULT_STALE_MINUTES;
use crate::error::{PadoruError, Result};
use crate::models::ImageFetchPolicy;

/// Application name used for the config directory path
const APP_NAME: &str = "padoru";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Collection published alongside the original Padoru image set
pub const DEFAULT_COLLECTION_URL: &str =
    "https://raw.githubusercontent.com/shadow578/Padoru-Padoru/master/padoru.json";

fn default_max_age_minutes() -> i64 {
    DEFAULT_STALE_MINUTES
}

fn default_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// URL or path of the collection document
    #[serde(default)]
    pub collection_source: Option<String>,
    #[serde(default = "default_max_age_minutes")]
    pub max_collection_age_minutes: i64,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub image_policy: ImageFetchPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            collection_source: None,
            max_collection_age_minutes: DEFAULT_STALE_MINUTES,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            image_policy: ImageFetchPolicy::default(),
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults when no
    /// file exists yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path).map_err(|e| PadoruError::io(path, e))?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| PadoruError::io(parent, e))?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|e| PadoruError::io(path, e))
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            PadoruError::InvalidState("could not find config directory".to_string())
        })?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    /// Configured source, or the public collection.
    pub fn collection_source_or_default(&self) -> &str {
        self.collection_source
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(DEFAULT_COLLECTION_URL)
    }

    /// Values beyond chrono's range mean "never stale".
    pub fn max_collection_age(&self) -> Duration {
        Duration::try_minutes(self.max_collection_age_minutes.max(0)).unwrap_or(Duration::MAX)
    }

    pub fn request_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.request_timeout_secs)
    }
}
