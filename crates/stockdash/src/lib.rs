#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/stockdash/stockdash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Cached, multi-provider fetch layer for a stock dashboard.
//!
//! This crate re-exports the core types, the storage backends and the
//! enabled providers, and adds:
//!
//! - [`Config`] - Credentials, database path and cache settings
//! - [`Fetcher`] - Cache-first orchestration over a provider chain
//! - [`StockService`] - The entry point the presentation layer uses

// Core types and traits
pub use stockdash_core::*;

// Storage
pub use stockdash_cache::{CacheLayer, InMemoryStore, NoopStore};
#[cfg(feature = "cache-sqlite")]
pub use stockdash_cache::SqliteStore;

// HTTP
pub use stockdash_http::{RetryClient, RetryPolicy};

// Providers
#[cfg(feature = "alphavantage")]
pub use stockdash_alphavantage::AlphaVantageProvider;
#[cfg(feature = "scrape")]
pub use stockdash_scrape::FinvizNewsProvider;
#[cfg(feature = "yahoo")]
pub use stockdash_yahoo::YahooProvider;

mod config;
mod fetcher;
mod service;

pub use config::{CacheKeyScope, CacheTtls, Config, DEFAULT_DB_PATH, DEFAULT_YAHOO_DELAY};
pub use fetcher::{Fetcher, SHARED_CACHE_LABEL};
pub use service::{DEFAULT_NEWS_LIMIT, StockService};
