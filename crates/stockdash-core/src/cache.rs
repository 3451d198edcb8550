//! Storage traits for cached payloads and news rows.
//!
//! This module defines [`KeyValueStore`] for opaque cached values and
//! [`NewsStore`] for the append-only news table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    types::{NewsItem, Symbol},
};

/// A stored cache row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Unique key of the row.
    pub key: String,
    /// Opaque serialized payload.
    pub value: String,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
}

/// Trait for point reads and writes of opaque string values.
///
/// A write replaces any prior value for the same key; a read returns the
/// most recent write or `None`.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Retrieves the row stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>>;

    /// Stores `value` under `key`, replacing any previous row.
    async fn set(&self, key: &str, value: &str) -> Result<()>;
}

/// Trait for the per-ticker news log.
#[async_trait]
pub trait NewsStore: Send + Sync {
    /// Appends news rows for a symbol, stamping each with the current time.
    async fn append_news(&self, symbol: &Symbol, items: &[NewsItem]) -> Result<()>;

    /// Returns at most `limit` rows for a symbol, newest `published_at` first.
    ///
    /// Rows without a publication time sort last.
    async fn list_news(&self, symbol: &Symbol, limit: usize) -> Result<Vec<NewsItem>>;
}
