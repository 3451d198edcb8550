#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/stockdash/stockdash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! HTTP retry client shared by the provider adapters.
//!
//! # Example
//!
//! ```no_run
//! use stockdash_http::RetryClient;
//!
//! # async fn example() -> stockdash_core::Result<()> {
//! let client = RetryClient::new()?;
//! match client.get_text("https://example.com/query", &[("symbol", "AAPL")], None).await? {
//!     Some(body) => println!("{} bytes", body.len()),
//!     None => println!("upstream unavailable"),
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use rand::Rng;
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use stockdash_core::{DataError, Result};
use tokio::time::sleep;
use tracing::{debug, warn};

/// User agent sent when the caller supplies no headers.
pub const DEFAULT_USER_AGENT: &str = "stock-analyzer/1.0";

/// Retry and timeout settings for [`RetryClient`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum number of requests per call.
    pub max_attempts: u32,
    /// Base of the exponential backoff; attempt `n` waits `base * 2^n`.
    pub backoff_base: Duration,
    /// Upper bound of the random jitter added to each wait.
    pub max_jitter: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(1),
            max_jitter: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// A policy with the default attempt count that retries without waiting.
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            backoff_base: Duration::ZERO,
            max_jitter: Duration::ZERO,
            ..Self::default()
        }
    }

    /// Returns the wait before the retry following attempt `attempt` (0-based).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponential = self.backoff_base.saturating_mul(2u32.saturating_pow(attempt));
        let jitter = if self.max_jitter.is_zero() {
            Duration::ZERO
        } else {
            self.max_jitter
                .mul_f64(rand::thread_rng().gen_range(0.0..1.0))
        };
        exponential + jitter
    }
}

/// HTTP GET client with bounded retries on transient failures.
///
/// - 200 returns the response.
/// - Connection errors, timeouts, 429 and 503 wait and retry.
/// - Any other status fails immediately with [`DataError::Http`].
/// - Exhausting every attempt returns `Ok(None)`.
#[derive(Clone, Debug)]
pub struct RetryClient {
    client: Client,
    policy: RetryPolicy,
}

impl RetryClient {
    /// Creates a client with the default policy.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new() -> Result<Self> {
        Self::with_policy(RetryPolicy::default())
    }

    /// Creates a client with a custom retry policy.
    ///
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn with_policy(policy: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .timeout(policy.timeout)
            .build()
            .map_err(|e| DataError::Network(e.to_string()))?;
        Ok(Self { client, policy })
    }

    /// The underlying HTTP client, for single requests that must read a
    /// response whatever its status (e.g. a cookie handshake).
    #[must_use]
    pub const fn http(&self) -> &Client {
        &self.client
    }

    /// Issues a GET request, retrying transient failures.
    ///
    /// `headers` replace the default user agent when they set one.
    ///
    /// # Errors
    /// Returns [`DataError::Http`] for a non-retryable status.
    pub async fn get(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: Option<&HeaderMap>,
    ) -> Result<Option<Response>> {
        let attempts = self.policy.max_attempts.max(1);

        for attempt in 0..attempts {
            let mut request = self.client.get(url).query(params);
            if let Some(headers) = headers {
                request = request.headers(headers.clone());
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status == StatusCode::OK {
                        return Ok(Some(response));
                    }
                    if status != StatusCode::TOO_MANY_REQUESTS
                        && status != StatusCode::SERVICE_UNAVAILABLE
                    {
                        return Err(DataError::Http {
                            status: status.as_u16(),
                            url: url.to_string(),
                        });
                    }
                    warn!(url, attempt, status = status.as_u16(), "Upstream throttled");
                }
                Err(e) => {
                    warn!(url, attempt, error = %e, "Request failed");
                }
            }

            if attempt + 1 < attempts {
                let wait = self.policy.delay(attempt);
                debug!(url, attempt, wait_ms = wait.as_millis() as u64, "Backing off");
                sleep(wait).await;
            }
        }

        warn!(url, attempts, "Retries exhausted, no response");
        Ok(None)
    }

    /// Issues a GET request and reads the body as text.
    ///
    /// # Errors
    /// Returns [`DataError::Http`] for a non-retryable status or
    /// [`DataError::Network`] if the body cannot be read.
    pub async fn get_text(
        &self,
        url: &str,
        params: &[(&str, &str)],
        headers: Option<&HeaderMap>,
    ) -> Result<Option<String>> {
        let Some(response) = self.get(url, params, headers).await? else {
            return Ok(None);
        };
        response
            .text()
            .await
            .map(Some)
            .map_err(|e| DataError::Network(e.to_string()))
    }
}
