//! Consumer-facing entry point for the dashboard.

use std::sync::Arc;

use tracing::{debug, warn};

use stockdash_core::{
    HistoryPoint, Interval, MetricsRecord, NewsItem, NewsStore, Period, Result, Symbol,
};

use crate::config::Config;
use crate::fetcher::Fetcher;

/// Number of stored headlines returned by [`StockService::get_news`].
pub const DEFAULT_NEWS_LIMIT: usize = 20;

/// What the presentation layer talks to.
///
/// Wraps a [`Fetcher`] for cached provider data and a [`NewsStore`] for the
/// persisted headline history.
#[derive(Clone)]
pub struct StockService {
    fetcher: Fetcher,
    news: Arc<dyn NewsStore>,
}

impl std::fmt::Debug for StockService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockService")
            .field("fetcher", &self.fetcher)
            .finish_non_exhaustive()
    }
}

impl StockService {
    /// Create a service from its parts.
    #[must_use]
    pub fn new(fetcher: Fetcher, news: Arc<dyn NewsStore>) -> Self {
        Self { fetcher, news }
    }

    /// Open the SQLite database at `config.db_path` and build the standard
    /// provider chain over it. Cache and news share the one database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or the HTTP client
    /// cannot be built.
    #[cfg(feature = "cache-sqlite")]
    pub fn open(config: &Config) -> Result<Self> {
        let store = Arc::new(stockdash_cache::SqliteStore::new(&config.db_path)?);
        let fetcher = Fetcher::from_config(config, store.clone())?;
        Ok(Self::new(fetcher, store))
    }

    /// Build the standard provider chain over an in-memory store.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn ephemeral(config: &Config) -> Result<Self> {
        let store = Arc::new(stockdash_cache::InMemoryStore::new());
        let fetcher = Fetcher::from_config(config, store.clone())?;
        Ok(Self::new(fetcher, store))
    }

    /// The underlying orchestrator.
    #[must_use]
    pub const fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// See [`Fetcher::fetch_metrics`].
    pub async fn fetch_metrics(&self, symbol: &Symbol, force_refresh: bool) -> MetricsRecord {
        self.fetcher.fetch_metrics(symbol, force_refresh).await
    }

    /// See [`Fetcher::fetch_history`].
    pub async fn fetch_history(
        &self,
        symbol: &Symbol,
        period: Period,
        interval: Interval,
        force_refresh: bool,
    ) -> Vec<HistoryPoint> {
        self.fetcher
            .fetch_history(symbol, period, interval, force_refresh)
            .await
    }

    /// See [`Fetcher::fetch_news`].
    pub async fn fetch_news(
        &self,
        symbol: &Symbol,
        limit: usize,
        force_refresh: bool,
    ) -> Vec<NewsItem> {
        self.fetcher.fetch_news(symbol, limit, force_refresh).await
    }

    /// Stored headlines, newest first, at most [`DEFAULT_NEWS_LIMIT`].
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn get_news(&self, symbol: &Symbol) -> Result<Vec<NewsItem>> {
        self.get_news_limited(symbol, DEFAULT_NEWS_LIMIT).await
    }

    /// Stored headlines, newest first, at most `limit`.
    ///
    /// # Errors
    /// Returns an error if the store cannot be read.
    pub async fn get_news_limited(&self, symbol: &Symbol, limit: usize) -> Result<Vec<NewsItem>> {
        self.news.list_news(symbol, limit).await
    }

    /// Append headlines to the store.
    ///
    /// # Errors
    /// Returns an error if the store cannot be written.
    pub async fn save_news(&self, symbol: &Symbol, items: &[NewsItem]) -> Result<()> {
        self.news.append_news(symbol, items).await
    }

    /// Headlines for display.
    ///
    /// Stored rows win: when the store already has headlines for the symbol
    /// they are returned and nothing is fetched, whatever `force_refresh`
    /// says. Otherwise news is fetched through the orchestrator and appended
    /// to the store. Store failures are logged and treated as an empty store.
    pub async fn latest_news(
        &self,
        symbol: &Symbol,
        limit: usize,
        force_refresh: bool,
    ) -> Vec<NewsItem> {
        match self.get_news_limited(symbol, limit).await {
            Ok(stored) if !stored.is_empty() => {
                debug!(symbol = %symbol, count = stored.len(), "Serving stored news");
                return stored;
            }
            Ok(_) => {}
            Err(e) => warn!(symbol = %symbol, error = %e, "News store read failed"),
        }

        let items = self.fetch_news(symbol, limit, force_refresh).await;
        if !items.is_empty() {
            if let Err(e) = self.save_news(symbol, &items).await {
                warn!(symbol = %symbol, error = %e, "Failed to store news");
            }
        }
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::tests::FakeProvider;
    use stockdash_cache::{CacheLayer, InMemoryStore};

    fn service(provider: Arc<FakeProvider>) -> (Arc<InMemoryStore>, StockService) {
        let store = Arc::new(InMemoryStore::new());
        let fetcher = Fetcher::new(CacheLayer::new(store.clone())).with_provider(provider);
        (store.clone(), StockService::new(fetcher, store))
    }

    #[tokio::test]
    async fn test_saved_news_newest_first() {
        let (_, service) = service(Arc::new(FakeProvider::new("none")));
        let symbol = Symbol::new("AAPL");
        let item1 = NewsItem::new("Older", "https://example.com/1")
            .with_published_at("2024-01-10T09:00:00Z");
        let item2 = NewsItem::new("Newer", "https://example.com/2")
            .with_published_at("2024-01-11T09:00:00Z");

        service
            .save_news(&symbol, &[item1.clone(), item2.clone()])
            .await
            .unwrap();

        assert_eq!(service.get_news(&symbol).await.unwrap(), vec![item2, item1]);
    }

    #[tokio::test]
    async fn test_get_news_default_limit() {
        let (_, service) = service(Arc::new(FakeProvider::new("none")));
        let symbol = Symbol::new("AAPL");
        let items: Vec<_> = (0..25)
            .map(|i| {
                NewsItem::new(format!("Story {i}"), format!("https://example.com/{i}"))
                    .with_published_at(format!("2024-01-{:02}T00:00:00Z", i + 1))
            })
            .collect();
        service.save_news(&symbol, &items).await.unwrap();

        let stored = service.get_news(&symbol).await.unwrap();
        assert_eq!(stored.len(), DEFAULT_NEWS_LIMIT);
        assert_eq!(stored[0].title, "Story 24");
        assert_eq!(service.get_news_limited(&symbol, 3).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_latest_news_fetches_and_persists_when_store_empty() {
        let fetched = vec![NewsItem::new("Fresh", "https://example.com/fresh")];
        let provider = Arc::new(FakeProvider {
            news: Some(fetched.clone()),
            ..FakeProvider::new("only")
        });
        let (_, service) = service(provider.clone());
        let symbol = Symbol::new("AAPL");

        assert_eq!(service.latest_news(&symbol, 10, false).await, fetched);
        assert_eq!(service.get_news(&symbol).await.unwrap(), fetched);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_latest_news_prefers_store() {
        let provider = Arc::new(FakeProvider {
            news: Some(vec![NewsItem::new("Fresh", "https://example.com/fresh")]),
            ..FakeProvider::new("only")
        });
        let (_, service) = service(provider.clone());
        let symbol = Symbol::new("AAPL");
        let stored = vec![NewsItem::new("Stored", "https://example.com/stored")];
        service.save_news(&symbol, &stored).await.unwrap();

        assert_eq!(service.latest_news(&symbol, 10, true).await, stored);
        assert_eq!(provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_latest_news_nothing_anywhere() {
        let (store, service) = service(Arc::new(FakeProvider::new("down")));
        let symbol = Symbol::new("AAPL");

        assert!(service.latest_news(&symbol, 10, false).await.is_empty());
        assert!(store.list_news(&symbol, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_metrics_delegate_to_fetcher() {
        let provider = Arc::new(FakeProvider {
            metrics: Some(crate::fetcher::tests::metrics("AAPL", 7)),
            ..FakeProvider::new("only")
        });
        let (_, service) = service(provider);

        let metrics = service.fetch_metrics(&Symbol::new("aapl"), false).await;
        assert_eq!(metrics.market_cap, Some(7));
    }

    #[cfg(feature = "cache-sqlite")]
    #[tokio::test]
    async fn test_open_creates_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default().with_db_path(dir.path().join("nested").join("dash.db"));

        let service = StockService::open(&config).unwrap();
        let symbol = Symbol::new("AAPL");
        service
            .save_news(&symbol, &[NewsItem::new("Saved", "https://example.com/s")])
            .await
            .unwrap();

        assert!(config.db_path.exists());
        assert_eq!(service.get_news(&symbol).await.unwrap().len(), 1);
    }
}
