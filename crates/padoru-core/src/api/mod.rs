//! Client side of a Padoru collection.
//!
//! `PadoruClient` owns one cached collection and re-fetches it once it
//! is older than the staleness window. Downloads go through the
//! `Fetcher` trait; `HttpFetcher` is the reqwest-backed implementation.

pub mod client;
pub mod fetch;

pub use client::{CollectionSource, EntryRef, EntrySet, PadoruClient};
pub use fetch::{Fetcher, HttpFetcher};
