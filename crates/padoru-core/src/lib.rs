//! Client library for Padoru collections.
//!
//! A collection is a JSON document listing character entries and the
//! images that go with them. Documents load from a local file or a remote
//! URL, and images resolve against the collection's directory or base URL.
//!
//! ```no_run
//! # async fn demo() -> padoru_core::Result<()> {
//! use padoru_core::{ImageFetchPolicy, PadoruClient};
//!
//! let client = PadoruClient::new()?;
//! client.load_collection_str("https://example.org/padoru.json").await?;
//! let entry = client.get_random_entry().await?;
//! let image = client.image_data(&entry).await;
//! # let _ = (image, ImageFetchPolicy::LocalFirst);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod utils;

pub use api::{CollectionSource, EntryRef, EntrySet, Fetcher, HttpFetcher, PadoruClient};
pub use config::Config;
pub use error::{PadoruError, Result};
pub use models::{Collection, Entry, ImageData, ImageFetchPolicy, ImageSource, Origin};
