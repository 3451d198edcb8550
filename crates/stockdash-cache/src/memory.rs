//! In-memory store implementation.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use stockdash_core::{CacheEntry, KeyValueStore, NewsItem, NewsStore, Result, Symbol};
use tokio::sync::RwLock;
use tracing::{debug, instrument};

/// Simple in-memory store for testing and development.
///
/// Data is stored in `RwLock`-protected `HashMap`s and is lost when the store
/// is dropped. Ordering rules match [`SqliteStore`](crate::SqliteStore).
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<HashMap<String, CacheEntry>>,
    news: RwLock<HashMap<Symbol, Vec<NewsItem>>>,
}

impl InMemoryStore {
    /// Create a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) => {
                debug!("Found cache row");
                Ok(Some(entry.clone()))
            }
            None => {
                debug!("No cache row found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let entry = CacheEntry {
            key: key.to_string(),
            value: value.to_string(),
            updated_at: Utc::now(),
        };
        self.entries.write().await.insert(key.to_string(), entry);
        debug!("Stored cache row");
        Ok(())
    }
}

#[async_trait]
impl NewsStore for InMemoryStore {
    #[instrument(skip(self, items), fields(symbol = %symbol, count = items.len()))]
    async fn append_news(&self, symbol: &Symbol, items: &[NewsItem]) -> Result<()> {
        let mut news = self.news.write().await;
        news.entry(symbol.clone())
            .or_default()
            .extend(items.iter().cloned());
        debug!("Stored {} news rows", items.len());
        Ok(())
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn list_news(&self, symbol: &Symbol, limit: usize) -> Result<Vec<NewsItem>> {
        let news = self.news.read().await;
        let mut items = news.get(symbol).cloned().unwrap_or_default();

        // None sorts below Some, so undated rows land last.
        items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        items.truncate(limit);
        debug!("Found {} news rows", items.len());
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_store_round_trip() {
        let store = InMemoryStore::new();

        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", "first").await.unwrap();
        store.set("k", "second").await.unwrap();

        let entry = store.get("k").await.unwrap().unwrap();
        assert_eq!(entry.value, "second");
        assert_eq!(store.entries.read().await.len(), 1);
    }

    #[tokio::test]
    async fn test_memory_store_news_order() {
        let store = InMemoryStore::new();
        let symbol = Symbol::new("AAPL");
        let first = NewsItem::new("First", "https://example.com/1")
            .with_published_at("2024-01-10T09:00:00Z");
        let second = NewsItem::new("Second", "https://example.com/2")
            .with_published_at("2024-01-12T09:00:00Z");
        let undated = NewsItem::new("Undated", "https://example.com/3");

        store
            .append_news(&symbol, &[first.clone(), undated.clone(), second.clone()])
            .await
            .unwrap();

        let items = store.list_news(&symbol, 20).await.unwrap();
        assert_eq!(items, vec![second.clone(), first, undated]);

        let top = store.list_news(&symbol, 1).await.unwrap();
        assert_eq!(top, vec![second]);

        assert!(store.list_news(&Symbol::new("MSFT"), 20).await.unwrap().is_empty());
    }
}
