//! In-memory snapshot of the currently synced collection.
//!
//! A snapshot is considered stale once it is older than the client's
//! staleness window (60 minutes unless configured otherwise).

pub mod snapshot;

pub use snapshot::{CachedData, DEFAULT_STALE_MINUTES};
