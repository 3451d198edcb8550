//! Environment-based configuration.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use stockdash_core::{DataError, DataKind};
use stockdash_http::RetryPolicy;

/// Default SQLite database location.
pub const DEFAULT_DB_PATH: &str = "data/stock_analyzer.db";

/// Default spacing between Yahoo requests.
pub const DEFAULT_YAHOO_DELAY: Duration = Duration::from_secs(1);

/// How cache keys are scoped.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheKeyScope {
    /// One key per kind and ticker: `shared:<kind>:<ticker>`.
    ///
    /// The freshest fetch from any provider satisfies later reads.
    #[default]
    Shared,
    /// One key per provider: `<label>:<kind>:<ticker>`.
    ///
    /// Writes go under the winning provider's label; reads try each
    /// provider's key in priority order.
    PerProvider,
}

impl FromStr for CacheKeyScope {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shared" => Ok(Self::Shared),
            "per-provider" | "per_provider" | "provider" => Ok(Self::PerProvider),
            other => Err(DataError::InvalidParameter(format!(
                "Unknown cache key scope: {other}"
            ))),
        }
    }
}

/// Per-kind cache lifetimes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CacheTtls {
    /// Lifetime of cached metrics.
    pub metrics: Duration,
    /// Lifetime of cached history.
    pub history: Duration,
    /// Lifetime of cached news.
    pub news: Duration,
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            metrics: DataKind::Metrics.default_ttl(),
            history: DataKind::History.default_ttl(),
            news: DataKind::News.default_ttl(),
        }
    }
}

impl CacheTtls {
    /// Returns the lifetime for a data kind.
    #[must_use]
    pub const fn for_kind(&self, kind: DataKind) -> Duration {
        match kind {
            DataKind::Metrics => self.metrics,
            DataKind::History => self.history,
            DataKind::News => self.news,
        }
    }
}

/// Fetch-layer configuration.
///
/// Built once and handed to [`Fetcher::from_config`](crate::Fetcher::from_config)
/// and [`StockService::open`](crate::StockService::open); nothing reads the
/// environment after construction.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    /// Alpha Vantage API key. Without it the primary provider reports a
    /// configuration error and the orchestrator falls through.
    pub alpha_vantage_key: Option<String>,
    /// SQLite database holding the cache and news tables.
    pub db_path: PathBuf,
    /// Cache key scoping.
    pub cache_scope: CacheKeyScope,
    /// Per-kind cache lifetimes.
    pub ttls: CacheTtls,
    /// Retry policy shared by every provider.
    pub retry: RetryPolicy,
    /// Minimum spacing between Yahoo requests.
    pub yahoo_delay: Duration,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field(
                "alpha_vantage_key",
                &self.alpha_vantage_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("db_path", &self.db_path)
            .field("cache_scope", &self.cache_scope)
            .field("ttls", &self.ttls)
            .field("retry", &self.retry)
            .field("yahoo_delay", &self.yahoo_delay)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            alpha_vantage_key: None,
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            cache_scope: CacheKeyScope::default(),
            ttls: CacheTtls::default(),
            retry: RetryPolicy::default(),
            yahoo_delay: DEFAULT_YAHOO_DELAY,
        }
    }
}

impl Config {
    /// Load a `.env` file if present, then read the process environment.
    ///
    /// | Variable | Meaning |
    /// |---|---|
    /// | `STOCK_API` (or `ALPHA_VANTAGE_KEY`) | Alpha Vantage API key |
    /// | `STOCKDASH_DB_PATH` | SQLite path, default `data/stock_analyzer.db` |
    /// | `STOCKDASH_CACHE_SCOPE` | `shared` (default) or `per-provider` |
    /// | `STOCKDASH_YAHOO_DELAY_MS` | Yahoo request spacing, default 1000 |
    #[must_use]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from any key lookup.
    ///
    /// Blank values count as unset. Unparsable optional values fall back to
    /// their defaults.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let defaults = Self::default();
        Self {
            alpha_vantage_key: var("STOCK_API").or_else(|| var("ALPHA_VANTAGE_KEY")),
            db_path: var("STOCKDASH_DB_PATH").map_or(defaults.db_path, PathBuf::from),
            cache_scope: var("STOCKDASH_CACHE_SCOPE")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.cache_scope),
            yahoo_delay: var("STOCKDASH_YAHOO_DELAY_MS")
                .and_then(|v| v.trim().parse().ok())
                .map_or(defaults.yahoo_delay, Duration::from_millis),
            ..defaults
        }
    }

    /// Set the Alpha Vantage API key.
    #[must_use]
    pub fn with_alpha_vantage_key(mut self, key: impl Into<String>) -> Self {
        self.alpha_vantage_key = Some(key.into());
        self
    }

    /// Set the database path.
    #[must_use]
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = path.into();
        self
    }

    /// Set the cache key scope.
    #[must_use]
    pub const fn with_cache_scope(mut self, scope: CacheKeyScope) -> Self {
        self.cache_scope = scope;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config, Config::default());
        assert_eq!(config.alpha_vantage_key, None);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
        assert_eq!(config.ttls.for_kind(DataKind::Metrics), Duration::from_secs(600));
        assert_eq!(config.ttls.for_kind(DataKind::History), Duration::from_secs(3600));
        assert_eq!(config.ttls.for_kind(DataKind::News), Duration::from_secs(21600));
    }

    #[test]
    fn test_reads_credential_and_alias() {
        let config = Config::from_lookup(lookup(&[("STOCK_API", "primary")]));
        assert_eq!(config.alpha_vantage_key.as_deref(), Some("primary"));

        let config = Config::from_lookup(lookup(&[("ALPHA_VANTAGE_KEY", "alias")]));
        assert_eq!(config.alpha_vantage_key.as_deref(), Some("alias"));

        let config = Config::from_lookup(lookup(&[
            ("STOCK_API", "primary"),
            ("ALPHA_VANTAGE_KEY", "alias"),
        ]));
        assert_eq!(config.alpha_vantage_key.as_deref(), Some("primary"));
    }

    #[test]
    fn test_blank_values_are_unset() {
        let config = Config::from_lookup(lookup(&[("STOCK_API", "   "), ("STOCKDASH_DB_PATH", "")]));
        assert_eq!(config.alpha_vantage_key, None);
        assert_eq!(config.db_path, PathBuf::from(DEFAULT_DB_PATH));
    }

    #[test]
    fn test_optional_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("STOCKDASH_DB_PATH", "/tmp/dash.db"),
            ("STOCKDASH_CACHE_SCOPE", "per-provider"),
            ("STOCKDASH_YAHOO_DELAY_MS", "250"),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/tmp/dash.db"));
        assert_eq!(config.cache_scope, CacheKeyScope::PerProvider);
        assert_eq!(config.yahoo_delay, Duration::from_millis(250));

        let config = Config::from_lookup(lookup(&[
            ("STOCKDASH_CACHE_SCOPE", "sometimes"),
            ("STOCKDASH_YAHOO_DELAY_MS", "soon"),
        ]));
        assert_eq!(config.cache_scope, CacheKeyScope::Shared);
        assert_eq!(config.yahoo_delay, DEFAULT_YAHOO_DELAY);
    }

    #[test]
    fn test_debug_redacts_credential() {
        let config = Config::default().with_alpha_vantage_key("secret_key_12345");
        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
    }
}
