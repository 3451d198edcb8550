//! SQLite-based store implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::Path;
use std::sync::Mutex;
use stockdash_core::{CacheEntry, DataError, KeyValueStore, NewsItem, NewsStore, Result, Symbol};
use tracing::{debug, instrument};

/// SQLite-backed cache and news store.
///
/// Holds the `cache(key, value, updated_at)` and
/// `news(id, ticker, title, url, source, published_at, fetched_at)` tables in
/// one database file, created on open.
#[derive(Debug)]
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite store at the given path.
    ///
    /// Missing parent directories are created.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or schema creation fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| DataError::Cache(e.to_string()))?;
        }
        let conn = Connection::open(path).map_err(|e| DataError::Cache(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory SQLite store.
    ///
    /// Useful for testing; data is lost when the store is dropped.
    ///
    /// # Errors
    /// Returns an error if schema creation fails.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| DataError::Cache(e.to_string()))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Initialize the database schema.
    fn initialize_schema(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS news (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                ticker TEXT NOT NULL,
                title TEXT,
                url TEXT,
                source TEXT,
                published_at TEXT,
                fetched_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| DataError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_news_ticker_published
             ON news(ticker, published_at)",
            [],
        )
        .map_err(|e| DataError::Cache(e.to_string()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS cache (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| DataError::Cache(e.to_string()))?;

        debug!("SQLite store schema initialized");
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Result<Option<CacheEntry>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        let row = conn
            .query_row(
                "SELECT value, updated_at FROM cache WHERE key = ?1",
                params![key],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        match row {
            Some((value, updated_at)) => {
                let updated_at = DateTime::parse_from_rfc3339(&updated_at)
                    .map_err(|e| DataError::Parse(e.to_string()))?
                    .with_timezone(&Utc);
                debug!("Found cache row");
                Ok(Some(CacheEntry {
                    key: key.to_string(),
                    value,
                    updated_at,
                }))
            }
            None => {
                debug!("No cache row found");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, value))]
    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let updated_at = Utc::now().to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        conn.execute(
            "INSERT OR REPLACE INTO cache (key, value, updated_at) VALUES (?1, ?2, ?3)",
            params![key, value, updated_at],
        )
        .map_err(|e| DataError::Cache(e.to_string()))?;

        debug!("Stored cache row");
        Ok(())
    }
}

#[async_trait]
impl NewsStore for SqliteStore {
    #[instrument(skip(self, items), fields(symbol = %symbol, count = items.len()))]
    async fn append_news(&self, symbol: &Symbol, items: &[NewsItem]) -> Result<()> {
        let fetched_at = Utc::now().to_rfc3339();

        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        for item in items {
            tx.execute(
                "INSERT INTO news (ticker, title, url, source, published_at, fetched_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    symbol.as_str(),
                    item.title,
                    item.url,
                    item.source,
                    item.published_at,
                    fetched_at
                ],
            )
            .map_err(|e| DataError::Cache(e.to_string()))?;
        }

        tx.commit().map_err(|e| DataError::Cache(e.to_string()))?;
        debug!("Stored {} news rows", items.len());
        Ok(())
    }

    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn list_news(&self, symbol: &Symbol, limit: usize) -> Result<Vec<NewsItem>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let conn = self
            .conn
            .lock()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        let mut stmt = conn
            .prepare(
                "SELECT title, url, source, published_at FROM news
                 WHERE ticker = ?1
                 ORDER BY published_at DESC, id ASC
                 LIMIT ?2",
            )
            .map_err(|e| DataError::Cache(e.to_string()))?;

        let rows = stmt
            .query_map(params![symbol.as_str(), limit], |row| {
                Ok(NewsItem {
                    title: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    url: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    source: row.get(2)?,
                    published_at: row.get(3)?,
                })
            })
            .map_err(|e| DataError::Cache(e.to_string()))?;

        let items = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| DataError::Cache(e.to_string()))?;

        debug!("Found {} news rows", items.len());
        Ok(items)
    }
}
