//! TTL freshness on top of a [`KeyValueStore`].

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use stockdash_core::{DataError, KeyValueStore, Result};
use tracing::{debug, warn};

/// Version written into every envelope. Rows with another version are misses.
pub const PAYLOAD_VERSION: u32 = 1;

/// The value stored inside a cache row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CachedPayload<T> {
    /// Envelope schema version.
    pub version: u32,
    /// When the data was fetched.
    pub cached_at: DateTime<Utc>,
    /// The cached data.
    pub data: T,
}

impl<T> CachedPayload<T> {
    /// Wraps data stamped with `cached_at`.
    #[must_use]
    pub const fn new(data: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            version: PAYLOAD_VERSION,
            cached_at,
            data,
        }
    }

    /// Returns true when the payload is older than `ttl` at `now`.
    #[must_use]
    pub fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.cached_at);
        age > chrono::TimeDelta::from_std(ttl).unwrap_or(chrono::TimeDelta::MAX)
    }
}

/// Reads and writes enveloped values with per-call TTLs.
///
/// Freshness is judged by the envelope's `cached_at`, not by the row's
/// `updated_at`. Missing, stale, corrupt or out-of-version rows all read as
/// `None`; a read never fails.
#[derive(Clone)]
pub struct CacheLayer {
    store: Arc<dyn KeyValueStore>,
}

impl fmt::Debug for CacheLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLayer").finish_non_exhaustive()
    }
}

impl CacheLayer {
    /// Creates a layer over a store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Returns the fresh data under `key`, or `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        self.get_at(key, ttl, Utc::now()).await
    }

    /// Like [`get`](Self::get) with an explicit notion of "now".
    pub async fn get_at<T: DeserializeOwned>(
        &self,
        key: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Option<T> {
        let entry = match self.store.get(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "Cache read failed, treating as miss");
                return None;
            }
        };

        let payload: CachedPayload<T> = match serde_json::from_str(&entry.value) {
            Ok(payload) => payload,
            Err(e) => {
                debug!(key, error = %e, "Undecodable cache row, treating as miss");
                return None;
            }
        };

        if payload.version != PAYLOAD_VERSION {
            debug!(key, version = payload.version, "Cache row from another version");
            return None;
        }

        if payload.is_stale(ttl, now) {
            debug!(key, cached_at = %payload.cached_at, "Stale cache row");
            return None;
        }

        debug!(key, "Cache hit");
        Some(payload.data)
    }

    /// Stores `data` under `key` stamped with the current time.
    ///
    /// # Errors
    /// Returns an error if serialization or the store write fails.
    pub async fn set<T: Serialize + Sync>(&self, key: &str, data: &T) -> Result<()> {
        self.set_at(key, data, Utc::now()).await
    }

    /// Stores `data` under `key` stamped with `cached_at`.
    ///
    /// # Errors
    /// Returns an error if serialization or the store write fails.
    pub async fn set_at<T: Serialize + Sync>(
        &self,
        key: &str,
        data: &T,
        cached_at: DateTime<Utc>,
    ) -> Result<()> {
        let payload = CachedPayload::new(data, cached_at);
        let value = serde_json::to_string(&payload).map_err(|e| DataError::Parse(e.to_string()))?;
        self.store.set(key, &value).await
    }
}
