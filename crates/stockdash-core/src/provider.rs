//! Provider traits for fetching market data.
//!
//! This module defines the two traits every upstream adapter implements:
//!
//! - [`DataProvider`] - Identity and cache label of a provider
//! - [`QuoteProvider`] - Metrics, history and news retrieval

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::{DataError, Result},
    period::{Interval, Period},
    types::{HistoryPoint, MetricsRecord, NewsItem, Symbol},
};

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the display name of this provider (e.g., "Alpha Vantage").
    fn name(&self) -> &str;

    /// Returns the short label used in provider-scoped cache keys (e.g., "alpha").
    fn label(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for the three data kinds a dashboard displays.
///
/// Implementations return data already mapped into the canonical types.
/// An empty value means the provider had nothing for the symbol; an error
/// means the provider could not be asked at all. Kinds a provider has no
/// endpoint for keep the default implementation, which reports
/// [`DataError::NotSupported`].
#[async_trait]
pub trait QuoteProvider: DataProvider {
    /// Fetches quote and valuation metrics for a symbol.
    async fn get_metrics(&self, symbol: &Symbol) -> Result<MetricsRecord> {
        let _ = symbol;
        Err(DataError::NotSupported(format!(
            "{} does not provide metrics",
            self.name()
        )))
    }

    /// Fetches price history for a symbol.
    ///
    /// Returns bars sorted ascending by date.
    async fn get_history(
        &self,
        symbol: &Symbol,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<HistoryPoint>> {
        let _ = (symbol, period, interval);
        Err(DataError::NotSupported(format!(
            "{} does not provide history",
            self.name()
        )))
    }

    /// Fetches at most `limit` news items for a symbol.
    async fn get_news(&self, symbol: &Symbol, limit: usize) -> Result<Vec<NewsItem>> {
        let _ = (symbol, limit);
        Err(DataError::NotSupported(format!(
            "{} does not provide news",
            self.name()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct NewsOnly;

    impl DataProvider for NewsOnly {
        fn name(&self) -> &str {
            "News Only"
        }

        fn label(&self) -> &str {
            "news-only"
        }

        fn description(&self) -> &str {
            "Test provider with a single endpoint"
        }
    }

    #[async_trait]
    impl QuoteProvider for NewsOnly {
        async fn get_news(&self, _symbol: &Symbol, _limit: usize) -> Result<Vec<NewsItem>> {
            Ok(vec![NewsItem::new("Headline", "https://example.com/1")])
        }
    }

    #[tokio::test]
    async fn test_default_methods_report_not_supported() {
        let provider = NewsOnly;
        let symbol = Symbol::new("AAPL");

        let metrics = provider.get_metrics(&symbol).await;
        assert!(matches!(metrics, Err(DataError::NotSupported(_))));

        let history = provider
            .get_history(&symbol, Period::default(), Interval::default())
            .await;
        assert!(matches!(history, Err(DataError::NotSupported(_))));

        let news = provider.get_news(&symbol, 5).await.unwrap();
        assert_eq!(news.len(), 1);
    }
}
