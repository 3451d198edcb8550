//! Fetch orchestrator: cache first, then providers in priority order.

use std::sync::Arc;

use polars::prelude::DataFrame;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use stockdash_cache::CacheLayer;
use stockdash_core::{
    DataKind, HistoryPoint, Interval, KeyValueStore, MetricsRecord, NewsItem, Period,
    QuoteProvider, Result, Symbol, history, history_frame,
};
use stockdash_http::RetryClient;

use crate::config::{CacheKeyScope, CacheTtls, Config};

/// Label used in cache keys under [`CacheKeyScope::Shared`].
pub const SHARED_CACHE_LABEL: &str = "shared";

/// Builds `<label>:<kind>:<ticker><suffix>`.
fn cache_key(label: &str, kind: DataKind, symbol: &Symbol, suffix: &str) -> String {
    format!("{label}:{kind}:{symbol}{suffix}")
}

/// Orchestrates cached, multi-provider fetches.
///
/// Every `fetch_*` call follows the same steps:
///
/// 1. Unless `force_refresh` is set, return a fresh cached value if one exists.
/// 2. Otherwise ask each provider in registration order. Errors (missing
///    credentials, hard HTTP failures, throttling) are logged and the next
///    provider is tried.
/// 3. The first non-empty result is cached and returned.
/// 4. If nothing produced data, return an empty value.
///
/// None of the `fetch_*` operations fail; "no data" is an ordinary outcome.
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use stockdash::{Config, Fetcher, SqliteStore, Symbol};
///
/// let config = Config::from_env();
/// let store = Arc::new(SqliteStore::new(&config.db_path)?);
/// let fetcher = Fetcher::from_config(&config, store)?;
///
/// let metrics = fetcher.fetch_metrics(&Symbol::new("AAPL"), false).await;
/// println!("{:?}", metrics.market_cap);
/// ```
#[derive(Clone)]
pub struct Fetcher {
    providers: Vec<Arc<dyn QuoteProvider>>,
    cache: CacheLayer,
    scope: CacheKeyScope,
    ttls: CacheTtls,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("providers", &self.provider_names())
            .field("scope", &self.scope)
            .field("ttls", &self.ttls)
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Create a fetcher with no providers over the given cache.
    #[must_use]
    pub fn new(cache: CacheLayer) -> Self {
        Self {
            providers: Vec::new(),
            cache,
            scope: CacheKeyScope::default(),
            ttls: CacheTtls::default(),
        }
    }

    /// Create a fetcher with the standard provider chain.
    ///
    /// Priority order is Alpha Vantage, then Yahoo Finance, then the Finviz
    /// news scraper. Alpha Vantage is registered even without a key; it then
    /// fails every call with a configuration error and is skipped.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    #[cfg_attr(
        not(any(feature = "alphavantage", feature = "yahoo", feature = "scrape")),
        allow(unused_mut, unused_variables)
    )]
    pub fn from_config(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let client = RetryClient::with_policy(config.retry.clone())?;

        let mut fetcher = Self::new(CacheLayer::new(store))
            .with_scope(config.cache_scope)
            .with_ttls(config.ttls);

        #[cfg(feature = "alphavantage")]
        fetcher.register(Arc::new(
            stockdash_alphavantage::AlphaVantageProvider::new(
                client.clone(),
                config.alpha_vantage_key.clone(),
            ),
        ));

        #[cfg(feature = "yahoo")]
        fetcher.register(Arc::new(
            stockdash_yahoo::YahooProvider::new(client.clone())
                .with_rate_limit(config.yahoo_delay),
        ));

        #[cfg(feature = "scrape")]
        fetcher.register(Arc::new(stockdash_scrape::FinvizNewsProvider::new(client)));

        Ok(fetcher)
    }

    /// Set the cache key scope.
    #[must_use]
    pub const fn with_scope(mut self, scope: CacheKeyScope) -> Self {
        self.scope = scope;
        self
    }

    /// Set the per-kind cache lifetimes.
    #[must_use]
    pub const fn with_ttls(mut self, ttls: CacheTtls) -> Self {
        self.ttls = ttls;
        self
    }

    /// Append a provider to the end of the priority list.
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn QuoteProvider>) -> Self {
        self.register(provider);
        self
    }

    /// Append a provider to the end of the priority list.
    pub fn register(&mut self, provider: Arc<dyn QuoteProvider>) {
        debug!(provider = provider.name(), "Registering provider");
        self.providers.push(provider);
    }

    /// Display names of the registered providers, in priority order.
    #[must_use]
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Keys to consult on read, in order.
    fn read_keys(&self, kind: DataKind, symbol: &Symbol, suffix: &str) -> Vec<String> {
        match self.scope {
            CacheKeyScope::Shared => vec![cache_key(SHARED_CACHE_LABEL, kind, symbol, suffix)],
            CacheKeyScope::PerProvider => self
                .providers
                .iter()
                .map(|p| cache_key(p.label(), kind, symbol, suffix))
                .collect(),
        }
    }

    fn write_key(
        &self,
        provider: &dyn QuoteProvider,
        kind: DataKind,
        symbol: &Symbol,
        suffix: &str,
    ) -> String {
        match self.scope {
            CacheKeyScope::Shared => cache_key(SHARED_CACHE_LABEL, kind, symbol, suffix),
            CacheKeyScope::PerProvider => cache_key(provider.label(), kind, symbol, suffix),
        }
    }

    async fn cached<T: DeserializeOwned>(
        &self,
        kind: DataKind,
        symbol: &Symbol,
        suffix: &str,
    ) -> Option<T> {
        let ttl = self.ttls.for_kind(kind);
        for key in self.read_keys(kind, symbol, suffix) {
            if let Some(data) = self.cache.get(&key, ttl).await {
                debug!(key = %key, symbol = %symbol, "Cache hit for {}", kind);
                return Some(data);
            }
        }
        None
    }

    /// Cache a winning result. A failed write is logged, never surfaced.
    async fn remember<T: Serialize + Sync>(
        &self,
        provider: &dyn QuoteProvider,
        kind: DataKind,
        symbol: &Symbol,
        suffix: &str,
        data: &T,
    ) {
        let key = self.write_key(provider, kind, symbol, suffix);
        if let Err(e) = self.cache.set(&key, data).await {
            warn!(
                provider = provider.name(),
                key = %key,
                error = %e,
                "Failed to cache {}", kind
            );
        }
    }

    /// Fetch quote metrics.
    ///
    /// Returns an empty record when no provider has data.
    pub async fn fetch_metrics(&self, symbol: &Symbol, force_refresh: bool) -> MetricsRecord {
        let kind = DataKind::Metrics;

        if !force_refresh {
            if let Some(cached) = self.cached::<MetricsRecord>(kind, symbol, "").await {
                return cached;
            }
        }

        for provider in &self.providers {
            debug!(provider = provider.name(), symbol = %symbol, "Fetching metrics");

            match provider.get_metrics(symbol).await {
                Ok(metrics) if !metrics.is_empty() => {
                    self.remember(provider.as_ref(), kind, symbol, "", &metrics)
                        .await;
                    return metrics;
                }
                Ok(_) => {
                    debug!(provider = provider.name(), symbol = %symbol, "No metrics, trying next");
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "Provider failed, trying next"
                    );
                }
            }
        }

        warn!(symbol = %symbol, "No provider returned metrics");
        MetricsRecord::default()
    }

    /// Fetch price history, sorted ascending with one bar per date.
    ///
    /// Returns an empty series when no provider has data.
    pub async fn fetch_history(
        &self,
        symbol: &Symbol,
        period: Period,
        interval: Interval,
        force_refresh: bool,
    ) -> Vec<HistoryPoint> {
        let kind = DataKind::History;
        let suffix = format!(":{period}:{interval}");

        if !force_refresh {
            if let Some(cached) = self.cached::<Vec<HistoryPoint>>(kind, symbol, &suffix).await {
                return cached;
            }
        }

        for provider in &self.providers {
            debug!(
                provider = provider.name(),
                symbol = %symbol,
                %period,
                %interval,
                "Fetching history"
            );

            match provider.get_history(symbol, period, interval).await {
                Ok(points) if !points.is_empty() => {
                    let points = history::normalize(points);
                    self.remember(provider.as_ref(), kind, symbol, &suffix, &points)
                        .await;
                    return points;
                }
                Ok(_) => {
                    debug!(provider = provider.name(), symbol = %symbol, "No history, trying next");
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "Provider failed, trying next"
                    );
                }
            }
        }

        warn!(symbol = %symbol, "No provider returned history");
        Vec::new()
    }

    /// Fetch price history as a DataFrame.
    ///
    /// # Errors
    /// Returns an error only if the frame cannot be assembled.
    pub async fn fetch_history_frame(
        &self,
        symbol: &Symbol,
        period: Period,
        interval: Interval,
        force_refresh: bool,
    ) -> Result<DataFrame> {
        let points = self
            .fetch_history(symbol, period, interval, force_refresh)
            .await;
        history_frame(&points)
    }

    /// Fetch at most `limit` news items.
    ///
    /// Returns an empty list when no provider has news.
    pub async fn fetch_news(
        &self,
        symbol: &Symbol,
        limit: usize,
        force_refresh: bool,
    ) -> Vec<NewsItem> {
        let kind = DataKind::News;

        if !force_refresh {
            if let Some(mut cached) = self.cached::<Vec<NewsItem>>(kind, symbol, "").await {
                cached.truncate(limit);
                return cached;
            }
        }

        for provider in &self.providers {
            debug!(provider = provider.name(), symbol = %symbol, limit, "Fetching news");

            match provider.get_news(symbol, limit).await {
                Ok(mut items) if !items.is_empty() => {
                    items.truncate(limit);
                    self.remember(provider.as_ref(), kind, symbol, "", &items)
                        .await;
                    return items;
                }
                Ok(_) => {
                    debug!(provider = provider.name(), symbol = %symbol, "No news, trying next");
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "Provider failed, trying next"
                    );
                }
            }
        }

        warn!(symbol = %symbol, "No provider returned news");
        Vec::new()
    }
}
