#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/stockdash/stockdash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the stockdash fetch layer.
//!
//! This crate provides the foundational abstractions shared by the providers,
//! the storage backends and the orchestrator:
//!
//! - [`QuoteProvider`](provider::QuoteProvider) - Metrics, history and news retrieval
//! - [`KeyValueStore`](cache::KeyValueStore) - Opaque cached payloads
//! - [`NewsStore`](cache::NewsStore) - Append-only news rows
//! - [`parse`] - Tolerant parsing of loosely typed upstream fields

/// Storage traits for cached payloads and news.
pub mod cache;
/// Error types for data operations.
pub mod error;
/// History normalization and DataFrame view.
pub mod history;
/// Tolerant parsing utilities.
pub mod parse;
/// History period, interval and data-kind definitions.
pub mod period;
/// Provider traits for fetching market data.
pub mod provider;
/// Canonical data types (Symbol, MetricsRecord, HistoryPoint, NewsItem).
pub mod types;

// Re-export commonly used items at crate root
pub use cache::{CacheEntry, KeyValueStore, NewsStore};
pub use error::{DataError, Result};
pub use history::history_frame;
pub use period::{DataKind, Interval, Period};
pub use provider::{DataProvider, QuoteProvider};
pub use types::{HistoryPoint, MetricsRecord, NewsItem, Symbol};
