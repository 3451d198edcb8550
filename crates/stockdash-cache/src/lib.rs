#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/stockdash/stockdash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Storage implementations for the stockdash fetch layer.
//!
//! This crate provides implementations of the [`KeyValueStore`] and
//! [`NewsStore`] traits from `stockdash-core`:
//!
//! - [`SqliteStore`] - Persistent SQLite-based store (default, requires `sqlite` feature)
//! - [`InMemoryStore`] - Simple in-memory store for testing
//! - [`NoopStore`] - No-op store that doesn't keep anything
//!
//! and the [`CacheLayer`] that adds TTL freshness on top of any of them.

/// TTL freshness layer.
pub mod layer;
/// In-memory store implementation.
pub mod memory;
/// No-op store implementation.
pub mod noop;

/// SQLite-based store implementation.
#[cfg(feature = "sqlite")]
pub mod sqlite;

// Re-export the traits for convenience
pub use stockdash_core::{KeyValueStore, NewsStore};

// Re-export implementations
pub use layer::{CacheLayer, CachedPayload, PAYLOAD_VERSION};
pub use memory::InMemoryStore;
pub use noop::NoopStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;
