//! No-op store implementation.

use async_trait::async_trait;
use stockdash_core::{CacheEntry, KeyValueStore, NewsItem, NewsStore, Result, Symbol};
use tracing::trace;

/// A no-op store that doesn't keep anything.
///
/// Every read returns nothing and every write succeeds without effect.
/// Useful for disabling caching or exercising fetch paths without cache hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

impl NoopStore {
    /// Create a new no-op store.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl KeyValueStore for NoopStore {
    async fn get(&self, _key: &str) -> Result<Option<CacheEntry>> {
        trace!("NoopStore: get called, returning None");
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<()> {
        trace!("NoopStore: set called, doing nothing");
        Ok(())
    }
}

#[async_trait]
impl NewsStore for NoopStore {
    async fn append_news(&self, _symbol: &Symbol, _items: &[NewsItem]) -> Result<()> {
        trace!("NoopStore: append_news called, doing nothing");
        Ok(())
    }

    async fn list_news(&self, _symbol: &Symbol, _limit: usize) -> Result<Vec<NewsItem>> {
        trace!("NoopStore: list_news called, returning empty");
        Ok(Vec::new())
    }
}
