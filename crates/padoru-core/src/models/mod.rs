//! Data models for Padoru collections.
//!
//! - `Collection`: the entry list plus load/save metadata
//! - `Entry`: one character record with derived image locations
//! - `Origin`: where a collection document was loaded from

pub mod collection;
pub mod entry;

pub use collection::{Collection, CollectionOrigin, Origin};
pub use entry::{Entry, ImageData, ImageFetchPolicy, ImageSource};
