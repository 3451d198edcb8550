#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/stockdash/stockdash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance data provider.
//!
//! This crate provides a Yahoo Finance provider that implements the
//! [`DataProvider`] and [`QuoteProvider`] traits from `stockdash-core`.
//!
//! # Features
//!
//! - Metrics from the quote summary API, authenticated with a cookie and crumb
//! - History from the chart API, normalized to exchange-local calendar dates
//! - News headlines from the search API
//! - Built-in request pacing (1 request per second by default)
//!
//! # Example
//!
//! ```no_run
//! use stockdash_yahoo::YahooProvider;
//! use stockdash_core::{Interval, Period, QuoteProvider, Symbol};
//! use stockdash_http::RetryClient;
//!
//! # async fn example() -> stockdash_core::Result<()> {
//! let provider = YahooProvider::new(RetryClient::new()?);
//! let history = provider
//!     .get_history(&Symbol::new("AAPL"), Period::Years(1), Interval::Daily)
//!     .await?;
//! println!("Fetched {} bars", history.len());
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::DateTime;
use reqwest::header::{COOKIE, HeaderMap, HeaderValue, SET_COOKIE, USER_AGENT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use stockdash_core::{
    DataError, DataProvider, HistoryPoint, Interval, MetricsRecord, NewsItem, Period,
    QuoteProvider, Result, Symbol, history, parse,
};
use stockdash_http::RetryClient;
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::debug;

/// Yahoo Finance API host.
const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Host that hands out the session cookie needed for a crumb.
const YAHOO_COOKIE_URL: &str = "https://fc.yahoo.com";

/// Default spacing between requests in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// Browser user agent; Yahoo rejects unknown agents.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Session cookie and the crumb issued for it.
#[derive(Clone, Debug)]
struct Crumb {
    cookie: HeaderValue,
    value: String,
}

/// Yahoo Finance data provider.
#[derive(Debug)]
pub struct YahooProvider {
    client: RetryClient,
    base_url: String,
    cookie_url: String,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
    crumb: RwLock<Option<Crumb>>,
}

impl YahooProvider {
    /// Create a provider with the default one-second request pacing.
    #[must_use]
    pub fn new(client: RetryClient) -> Self {
        Self {
            client,
            base_url: YAHOO_BASE_URL.to_string(),
            cookie_url: YAHOO_COOKIE_URL.to_string(),
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
            crumb: RwLock::new(None),
        }
    }

    /// Set the minimum spacing between consecutive requests.
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: Duration) -> Self {
        self.rate_limit_ms = rate_limit.as_millis() as u64;
        self
    }

    /// Point the provider at another host (e.g. a test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Fetch the session cookie from another URL.
    #[must_use]
    pub fn with_cookie_url(mut self, cookie_url: impl Into<String>) -> Self {
        self.cookie_url = cookie_url.into();
        self
    }

    fn now_ms() -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }

    /// Wait until the configured spacing since the previous request has passed.
    async fn apply_rate_limit(&self) {
        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = Self::now_ms().saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(Self::now_ms(), Ordering::Relaxed);
    }

    /// Returns the cached crumb, running the cookie handshake on first use.
    async fn ensure_crumb(&self) -> Result<Crumb> {
        if let Some(crumb) = self.crumb.read().await.as_ref() {
            return Ok(crumb.clone());
        }

        let crumb = self.fetch_crumb().await?;
        *self.crumb.write().await = Some(crumb.clone());
        Ok(crumb)
    }

    /// Get a session cookie, then trade it for a crumb.
    async fn fetch_crumb(&self) -> Result<Crumb> {
        self.apply_rate_limit().await;

        // The cookie host answers 404 and sets the cookie anyway.
        let response = self
            .client
            .http()
            .get(&self.cookie_url)
            .header(USER_AGENT, BROWSER_USER_AGENT)
            .send()
            .await
            .map_err(|e| DataError::Network(format!("Yahoo cookie request failed: {e}")))?;

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.split(';').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| DataError::Parse("No cookie in Yahoo handshake".to_string()))
            .and_then(|s| HeaderValue::from_str(s).map_err(|e| DataError::Parse(e.to_string())))?;

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert(COOKIE, cookie.clone());

        let url = format!("{}/v1/test/getcrumb", self.base_url);
        let value = self
            .client
            .get_text(&url, &[], Some(&headers))
            .await?
            .map(|text| text.trim().to_string())
            .filter(|text| !text.is_empty())
            .ok_or_else(|| DataError::Network("Yahoo crumb unavailable".to_string()))?;

        debug!("Obtained Yahoo crumb");
        Ok(Crumb { cookie, value })
    }

    /// Forget the crumb so the next call repeats the handshake.
    async fn clear_crumb(&self) {
        *self.crumb.write().await = None;
    }

    /// Paced GET decoded as JSON. `Ok(None)` when retries ran out.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
        cookie: Option<&HeaderValue>,
    ) -> Result<Option<T>> {
        self.apply_rate_limit().await;

        let url = format!("{}{}", self.base_url, path);
        debug!("Yahoo request: {}", url);

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        if let Some(cookie) = cookie {
            headers.insert(COOKIE, cookie.clone());
        }

        let Some(text) = self.client.get_text(&url, params, Some(&headers)).await? else {
            return Ok(None);
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| DataError::Parse(e.to_string()))
    }
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw)
}

/// Map quote summary modules into canonical metrics.
fn metrics_from_summary(symbol: &Symbol, data: QuoteSummaryData) -> MetricsRecord {
    let price = data.price.unwrap_or_default();
    let detail = data.summary_detail.unwrap_or_default();
    let stats = data.default_key_statistics.unwrap_or_default();

    let record = MetricsRecord {
        symbol: None,
        short_name: price.short_name,
        long_name: price.long_name,
        market_cap: raw(&price.market_cap)
            .or_else(|| raw(&detail.market_cap))
            .map(|v| v as i64),
        previous_close: raw(&detail.previous_close),
        open: raw(&detail.open),
        day_high: raw(&detail.day_high),
        day_low: raw(&detail.day_low),
        fifty_two_week_high: raw(&detail.fifty_two_week_high),
        fifty_two_week_low: raw(&detail.fifty_two_week_low),
        trailing_pe: raw(&detail.trailing_pe),
        forward_pe: raw(&detail.forward_pe).or_else(|| raw(&stats.forward_pe)),
        dividend_yield: raw(&detail.dividend_yield),
    };

    if record.is_empty() {
        return record;
    }
    MetricsRecord {
        symbol: Some(price.symbol.unwrap_or_else(|| symbol.to_string())),
        ..record
    }
}

/// Map a chart result into bars on exchange-local calendar dates.
///
/// Bars with no price at all are dropped.
fn points_from_chart(data: ChartData) -> Vec<HistoryPoint> {
    let offset = data.meta.map_or(0, |m| m.gmtoffset);
    let timestamps = data.timestamp.unwrap_or_default();
    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let adj_close = data
        .indicators
        .adjclose
        .and_then(|ac| ac.into_iter().next())
        .map(|ac| ac.adjclose)
        .unwrap_or_default();

    let at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();

    let points = timestamps
        .iter()
        .enumerate()
        .filter_map(|(i, &ts)| {
            let date = DateTime::from_timestamp(ts + offset, 0)?.date_naive();
            let point = HistoryPoint {
                date,
                open: at(&quote.open, i),
                high: at(&quote.high, i),
                low: at(&quote.low, i),
                close: at(&quote.close, i),
                adjusted_close: at(&adj_close, i),
                volume: quote.volume.get(i).copied().flatten().unwrap_or(0),
            };
            let has_price = point.open.is_some()
                || point.high.is_some()
                || point.low.is_some()
                || point.close.is_some();
            has_price.then_some(point)
        })
        .collect();

    history::normalize(points)
}

fn news_from_search(response: SearchResponse, limit: usize) -> Vec<NewsItem> {
    response
        .news
        .into_iter()
        .filter_map(|article| {
            let title = article.title.filter(|t| !t.is_empty())?;
            let url = article.link.filter(|l| !l.is_empty())?;
            let mut item = NewsItem::new(title, url);
            if let Some(publisher) = article.publisher {
                item = item.with_source(publisher);
            }
            if let Some(dt) = article
                .provider_publish_time
                .and_then(|ts| DateTime::from_timestamp(ts, 0))
            {
                item = item.with_published_at(parse::format_utc(dt));
            }
            Some(item)
        })
        .take(limit)
        .collect()
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    fn label(&self) -> &str {
        "yahoo"
    }

    fn description(&self) -> &str {
        "Yahoo Finance data provider for quote metrics, price history and news"
    }
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    async fn get_metrics(&self, symbol: &Symbol) -> Result<MetricsRecord> {
        let crumb = self.ensure_crumb().await?;
        let path = format!("/v10/finance/quoteSummary/{}", symbol.as_str());
        let params = [
            ("modules", "price,summaryDetail,defaultKeyStatistics"),
            ("crumb", crumb.value.as_str()),
        ];

        let response = self
            .fetch_json::<QuoteSummaryResponse>(&path, &params, Some(&crumb.cookie))
            .await;
        if let Err(DataError::Http { status: 401, .. }) = &response {
            debug!("Yahoo rejected the crumb for {}", symbol);
            self.clear_crumb().await;
        }

        let Some(summary) = response? else {
            return Ok(MetricsRecord::default());
        };

        if let Some(error) = summary.quote_summary.error {
            debug!("Quote summary error for {}: {}", symbol, error.description);
            return Ok(MetricsRecord::default());
        }

        Ok(summary
            .quote_summary
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(|data| metrics_from_summary(symbol, data))
            .unwrap_or_default())
    }

    async fn get_history(
        &self,
        symbol: &Symbol,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<HistoryPoint>> {
        let path = format!("/v8/finance/chart/{}", symbol.as_str());
        let range = period.to_string();
        let params = [
            ("range", range.as_str()),
            ("interval", interval.as_str()),
            ("includeAdjustedClose", "true"),
        ];

        let Some(chart) = self
            .fetch_json::<ChartResponse>(&path, &params, None)
            .await?
        else {
            return Ok(Vec::new());
        };

        if let Some(error) = chart.chart.error {
            if error.code == "Not Found" {
                return Ok(Vec::new());
            }
            return Err(DataError::Other(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        Ok(chart
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .map(points_from_chart)
            .unwrap_or_default())
    }

    async fn get_news(&self, symbol: &Symbol, limit: usize) -> Result<Vec<NewsItem>> {
        let news_count = limit.to_string();
        let params = [
            ("q", symbol.as_str()),
            ("newsCount", news_count.as_str()),
            ("quotesCount", "0"),
        ];

        let Some(response) = self
            .fetch_json::<SearchResponse>("/v1/finance/search", &params, None)
            .await?
        else {
            return Ok(Vec::new());
        };
        Ok(news_from_search(response, limit))
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

/// Quote Summary API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryData {
    price: Option<PriceModule>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
}

/// A `{"raw": 1.0, "fmt": "1.00"}` number. Missing values arrive as `{}`.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    symbol: Option<String>,
    short_name: Option<String>,
    long_name: Option<String>,
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    previous_close: Option<RawValue>,
    open: Option<RawValue>,
    day_high: Option<RawValue>,
    day_low: Option<RawValue>,
    fifty_two_week_high: Option<RawValue>,
    fifty_two_week_low: Option<RawValue>,
    market_cap: Option<RawValue>,
    #[serde(rename = "trailingPE")]
    trailing_pe: Option<RawValue>,
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
    dividend_yield: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct KeyStatistics {
    #[serde(rename = "forwardPE")]
    forward_pe: Option<RawValue>,
}

/// Search API response.
#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    news: Vec<SearchArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArticle {
    title: Option<String>,
    link: Option<String>,
    publisher: Option<String>,
    provider_publish_time: Option<i64>,
}
