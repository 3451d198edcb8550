#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/stockdash/stockdash/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Alpha Vantage data provider.
//!
//! This crate implements the stockdash-core provider traits for the
//! [Alpha Vantage](https://www.alphavantage.co/) API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use stockdash_alphavantage::AlphaVantageProvider;
//! use stockdash_core::{QuoteProvider, Symbol};
//! use stockdash_http::RetryClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let provider = AlphaVantageProvider::new(RetryClient::new()?, Some("your_api_key".into()));
//!
//!     let metrics = provider.get_metrics(&Symbol::new("AAPL")).await?;
//!     println!("{:?}", metrics.market_cap);
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use stockdash_core::{
    DataError, DataProvider, HistoryPoint, Interval, MetricsRecord, NewsItem, Period,
    QuoteProvider, Result, Symbol, history, parse,
};
use stockdash_http::RetryClient;
use tracing::debug;

/// Alpha Vantage query endpoint.
const ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";

/// Source name for news items that carry none.
const DEFAULT_NEWS_SOURCE: &str = "AlphaVantage";

/// Longest window, in calendar days, served from a compact daily series.
const COMPACT_DAYS: i64 = 100;

/// Alpha Vantage data provider.
///
/// Provides access to:
/// - Company overview metrics
/// - Daily, weekly and monthly adjusted price series
/// - News headlines
#[derive(Clone)]
pub struct AlphaVantageProvider {
    client: RetryClient,
    api_key: Option<String>,
    base_url: String,
}

impl fmt::Debug for AlphaVantageProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AlphaVantageProvider")
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl AlphaVantageProvider {
    /// Create a provider. A missing key is reported on each call, not here.
    #[must_use]
    pub fn new(client: RetryClient, api_key: Option<String>) -> Self {
        Self {
            client,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            base_url: ALPHA_VANTAGE_URL.to_string(),
        }
    }

    /// Point the provider at another endpoint (e.g. a test server).
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key.as_deref().ok_or_else(|| {
            DataError::ProviderNotConfigured("Alpha Vantage API key not set".to_string())
        })
    }

    /// Run a query function and parse the JSON body.
    ///
    /// `Ok(None)` means the retry client gave up without a response.
    async fn query(&self, function: &str, params: &[(&str, &str)]) -> Result<Option<Value>> {
        let api_key = self.api_key()?;

        let mut query = Vec::with_capacity(params.len() + 2);
        query.push(("function", function));
        query.extend_from_slice(params);
        query.push(("apikey", api_key));

        debug!("Alpha Vantage request: {}", function);
        let Some(text) = self.client.get_text(&self.base_url, &query, None).await? else {
            return Ok(None);
        };

        let json: Value =
            serde_json::from_str(&text).map_err(|e| DataError::Parse(format!("{e}: {text}")))?;
        check_notice(&json)?;
        Ok(Some(json))
    }
}

/// Alpha Vantage answers throttling and bad requests with 200 and a notice body.
fn check_notice(json: &Value) -> Result<()> {
    if let Some(note) = parse::text_field(json, &["Note", "Information"]) {
        return Err(DataError::RateLimited {
            provider: format!("Alpha Vantage ({note})"),
            retry_after: Some(Duration::from_secs(60)),
        });
    }
    if let Some(message) = parse::text_field(json, &["Error Message"]) {
        return Err(DataError::Other(format!("Alpha Vantage: {message}")));
    }
    Ok(())
}

fn is_empty_object(json: &Value) -> bool {
    json.as_object().is_none_or(|o| o.is_empty())
}

/// Map an `OVERVIEW` response into canonical metrics.
fn parse_overview(symbol: &Symbol, data: &Value) -> MetricsRecord {
    if is_empty_object(data) {
        return MetricsRecord::default();
    }

    MetricsRecord {
        symbol: parse::text_field(data, &["Symbol"]).or_else(|| Some(symbol.to_string())),
        short_name: parse::text_field(data, &["Name"]),
        long_name: parse::text_field(data, &["Description"]),
        market_cap: data.get("MarketCapitalization").and_then(parse::integer),
        previous_close: None,
        open: None,
        day_high: None,
        day_low: None,
        fifty_two_week_high: parse::float_field(data, &["52WeekHigh", "WeekHigh52", "52_Week_High"]),
        fifty_two_week_low: parse::float_field(data, &["52WeekLow", "WeekLow52", "52_Week_Low"]),
        trailing_pe: parse::float_field(data, &["PERatio"]),
        forward_pe: parse::float_field(data, &["ForwardPE"]),
        dividend_yield: parse::float_field(data, &["DividendYield"]),
    }
}

/// Query function and series key for an interval.
const fn series_for(interval: Interval) -> (&'static str, &'static str) {
    match interval {
        Interval::Daily => ("TIME_SERIES_DAILY_ADJUSTED", "Time Series (Daily)"),
        Interval::Weekly => ("TIME_SERIES_WEEKLY_ADJUSTED", "Weekly Adjusted Time Series"),
        Interval::Monthly => ("TIME_SERIES_MONTHLY_ADJUSTED", "Monthly Adjusted Time Series"),
    }
}

/// Map a flat date -> OHLCV object into bars. Unparsable dates are skipped.
fn parse_series(series: &Value) -> Vec<HistoryPoint> {
    let Some(series) = series.as_object() else {
        return Vec::new();
    };

    let points = series
        .iter()
        .filter_map(|(date, values)| {
            let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()?;
            let field = |k: &str| values.get(k).and_then(parse::float);
            Some(HistoryPoint {
                date,
                open: field("1. open"),
                high: field("2. high"),
                low: field("3. low"),
                close: field("4. close"),
                adjusted_close: field("5. adjusted close"),
                volume: values
                    .get("6. volume")
                    .and_then(parse::integer)
                    .map_or(0, |v| v.max(0) as u64),
            })
        })
        .collect();

    history::normalize(points)
}

/// Daily `outputsize`. `compact` holds the last 100 trading days, which
/// covers any window of up to 100 calendar days.
fn output_size(period: Period, today: NaiveDate) -> &'static str {
    match period.start_date(today) {
        Some(start) if (today - start).num_days() <= COMPACT_DAYS => "compact",
        _ => "full",
    }
}

/// Map a `NEWS_SENTIMENT` feed into news items.
fn parse_feed(data: &Value, limit: usize) -> Vec<NewsItem> {
    let Some(feed) = parse::first(data, &["feed", "items", "articles"]).and_then(Value::as_array)
    else {
        return Vec::new();
    };

    feed.iter()
        .filter_map(|item| {
            let title = parse::text_field(item, &["title", "headline"])?;
            let url = parse::text_field(item, &["url", "link"])?;
            let source = parse::text_field(item, &["source", "provider_name"])
                .unwrap_or_else(|| DEFAULT_NEWS_SOURCE.to_string());
            let mut news = NewsItem::new(title, url).with_source(source);
            if let Some(published) = parse::text_field(item, &["time_published", "published_at", "time"]) {
                news = news.with_published_at(parse::timestamp(&published));
            }
            Some(news)
        })
        .take(limit)
        .collect()
}

impl DataProvider for AlphaVantageProvider {
    fn name(&self) -> &str {
        "Alpha Vantage"
    }

    fn label(&self) -> &str {
        "alpha"
    }

    fn description(&self) -> &str {
        "Alpha Vantage - Company overview, adjusted price series and news sentiment API"
    }
}

#[async_trait]
impl QuoteProvider for AlphaVantageProvider {
    async fn get_metrics(&self, symbol: &Symbol) -> Result<MetricsRecord> {
        let Some(data) = self.query("OVERVIEW", &[("symbol", symbol.as_str())]).await? else {
            return Ok(MetricsRecord::default());
        };
        Ok(parse_overview(symbol, &data))
    }

    async fn get_history(
        &self,
        symbol: &Symbol,
        period: Period,
        interval: Interval,
    ) -> Result<Vec<HistoryPoint>> {
        let today = Utc::now().date_naive();
        let (function, series_key) = series_for(interval);
        let mut params = vec![("symbol", symbol.as_str())];
        if interval == Interval::Daily {
            params.push(("outputsize", output_size(period, today)));
        }

        let Some(data) = self.query(function, &params).await? else {
            return Ok(Vec::new());
        };
        let points = data.get(series_key).map(parse_series).unwrap_or_default();

        Ok(history::trim_to_period(points, period, today))
    }

    async fn get_news(&self, symbol: &Symbol, limit: usize) -> Result<Vec<NewsItem>> {
        let limit_param = limit.to_string();
        let params = [("tickers", symbol.as_str()), ("limit", limit_param.as_str())];
        let Some(data) = self.query("NEWS_SENTIMENT", &params).await? else {
            return Ok(Vec::new());
        };
        Ok(parse_feed(&data, limit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;
    use stockdash_http::RetryPolicy;

    fn provider(server: &Server, api_key: Option<&str>) -> AlphaVantageProvider {
        let client = RetryClient::with_policy(RetryPolicy::immediate()).unwrap();
        AlphaVantageProvider::new(client, api_key.map(String::from))
            .with_base_url(format!("{}/query", server.url()))
    }

    #[test]
    fn test_provider_metadata() {
        let client = RetryClient::new().unwrap();
        let provider = AlphaVantageProvider::new(client, Some("k".into()));
        assert_eq!(provider.name(), "Alpha Vantage");
        assert_eq!(provider.label(), "alpha");
        assert!(!provider.description().is_empty());
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let client = RetryClient::new().unwrap();
        let provider = AlphaVantageProvider::new(client, Some("secret_key_12345".into()));
        let debug_str = format!("{:?}", provider);
        assert!(!debug_str.contains("secret_key_12345"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_blank_key_counts_as_missing() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let result = provider(&server, Some("  "))
            .get_history(&Symbol::new("AAPL"), Period::Years(1), Interval::Daily)
            .await;

        assert!(matches!(result, Err(DataError::ProviderNotConfigured(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_missing_key_is_a_configuration_error() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/query")
            .expect(0)
            .create_async()
            .await;

        let result = provider(&server, None)
            .get_metrics(&Symbol::new("AAPL"))
            .await;

        assert!(matches!(result, Err(DataError::ProviderNotConfigured(_))));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_overview_maps_to_canonical_metrics() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("function".into(), "OVERVIEW".into()),
                Matcher::UrlEncoded("symbol".into(), "AAPL".into()),
                Matcher::UrlEncoded("apikey".into(), "demo".into()),
            ]))
            .with_status(200)
            .with_body(
                json!({
                    "Symbol": "AAPL",
                    "MarketCapitalization": "3000000000000",
                    "PERatio": "35.2"
                })
                .to_string(),
            )
            .create_async()
            .await;

        let metrics = provider(&server, Some("demo"))
            .get_metrics(&Symbol::new("AAPL"))
            .await
            .unwrap();

        assert_eq!(
            metrics,
            MetricsRecord {
                symbol: Some("AAPL".to_string()),
                market_cap: Some(3_000_000_000_000),
                trailing_pe: Some(35.2),
                ..Default::default()
            }
        );
        mock.assert_async().await;
    }

    #[test]
    fn test_overview_tolerates_placeholders() {
        let data = json!({
            "Symbol": "IBM",
            "Name": "International Business Machines",
            "MarketCapitalization": "None",
            "PERatio": "-",
            "ForwardPE": "",
            "DividendYield": "0.0377",
            "52WeekHigh": "199.18",
            "52WeekLow": null
        });

        let metrics = parse_overview(&Symbol::new("IBM"), &data);

        assert_eq!(metrics.short_name.as_deref(), Some("International Business Machines"));
        assert_eq!(metrics.market_cap, None);
        assert_eq!(metrics.trailing_pe, None);
        assert_eq!(metrics.forward_pe, None);
        assert_eq!(metrics.dividend_yield, Some(0.0377));
        assert_eq!(metrics.fifty_two_week_high, Some(199.18));
        assert_eq!(metrics.fifty_two_week_low, None);
    }

    #[test]
    fn test_empty_overview_is_empty_metrics() {
        assert!(parse_overview(&Symbol::new("ZZZZ"), &json!({})).is_empty());
    }

    #[tokio::test]
    async fn test_throttle_notice_is_rate_limited() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"Note": "Thank you for using Alpha Vantage! Our standard API call frequency is 5 calls per minute."}"#)
            .create_async()
            .await;

        let result = provider(&server, Some("demo"))
            .get_metrics(&Symbol::new("AAPL"))
            .await;

        assert!(matches!(result, Err(DataError::RateLimited { .. })));
    }

    #[tokio::test]
    async fn test_exhausted_retries_yield_empty_metrics() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let metrics = provider(&server, Some("demo"))
            .get_metrics(&Symbol::new("AAPL"))
            .await
            .unwrap();

        assert!(metrics.is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_hard_failure_surfaces() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/query")
            .match_query(Matcher::Any)
            .with_status(401)
            .create_async()
            .await;

        let result = provider(&server, Some("demo"))
            .get_news(&Symbol::new("AAPL"), 5)
            .await;

        assert!(matches!(result, Err(DataError::Http { status: 401, .. })));
    }

    #[tokio::test]
    async fn test_history_sorted_and_trimmed_to_years() {
        let today = Utc::now().date_naive();
        let recent = today - chrono::Duration::days(10);
        let older = today - chrono::Duration::days(40);
        let ancient = today - chrono::Duration::days(800);

        let body = json!({
            "Meta Data": {"2. Symbol": "AAPL"},
            "Time Series (Daily)": {
                recent.to_string(): {
                    "1. open": "190.0", "2. high": "192.5", "3. low": "189.1",
                    "4. close": "191.7", "5. adjusted close": "191.2", "6. volume": "51234567"
                },
                ancient.to_string(): {
                    "1. open": "120.0", "2. high": "121.0", "3. low": "119.0",
                    "4. close": "120.5", "5. adjusted close": "119.9", "6. volume": "1000"
                },
                older.to_string(): {
                    "1. open": "None", "2. high": "180.0", "3. low": "175.0",
                    "4. close": "178.0", "5. adjusted close": "177.5", "6. volume": ""
                },
                "not-a-date": {"1. open": "1"}
            }
        });

        let mut server = Server::new_async().await;
        server
            .mock("GET", "/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("function".into(), "TIME_SERIES_DAILY_ADJUSTED".into()),
                Matcher::UrlEncoded("outputsize".into(), "full".into()),
            ]))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let points = provider(&server, Some("demo"))
            .get_history(&Symbol::new("AAPL"), Period::Years(1), Interval::Daily)
            .await
            .unwrap();

        let dates: Vec<_> = points.iter().map(|p| p.date).collect();
        assert_eq!(dates, vec![older, recent]);
        assert_eq!(points[0].open, None);
        assert_eq!(points[0].volume, 0);
        assert_eq!(points[1].close, Some(191.7));
        assert_eq!(points[1].adjusted_close, Some(191.2));
        assert_eq!(points[1].volume, 51_234_567);
    }

    #[tokio::test]
    async fn test_short_window_uses_compact_series() {
        let today = Utc::now().date_naive();
        let inside = today - chrono::Duration::days(3);
        let outside = today - chrono::Duration::days(45);
        let bar = json!({
            "1. open": "100.0", "2. high": "101.0", "3. low": "99.0",
            "4. close": "100.5", "5. adjusted close": "100.5", "6. volume": "1000"
        });
        let body = json!({
            "Time Series (Daily)": {
                inside.to_string(): bar.clone(),
                outside.to_string(): bar
            }
        });

        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("function".into(), "TIME_SERIES_DAILY_ADJUSTED".into()),
                Matcher::UrlEncoded("outputsize".into(), "compact".into()),
            ]))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let points = provider(&server, Some("demo"))
            .get_history(&Symbol::new("AAPL"), Period::Months(1), Interval::Daily)
            .await
            .unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].date, inside);
        mock.assert_async().await;
    }

    #[test]
    fn test_output_size_by_window() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(output_size(Period::Days(5), today), "compact");
        assert_eq!(output_size(Period::Months(3), today), "compact");
        assert_eq!(output_size(Period::Months(6), today), "full");
        assert_eq!(output_size(Period::YearToDate, today), "full");
        assert_eq!(output_size(Period::Years(1), today), "full");
        assert_eq!(output_size(Period::Max, today), "full");
    }

    #[tokio::test]
    async fn test_weekly_history_uses_weekly_series() {
        let body = json!({
            "Weekly Adjusted Time Series": {
                "2024-01-12": {
                    "1. open": "185.0", "2. high": "187.0", "3. low": "183.0",
                    "4. close": "186.0", "5. adjusted close": "185.5", "6. volume": "250000000"
                }
            }
        });

        let mut server = Server::new_async().await;
        server
            .mock("GET", "/query")
            .match_query(Matcher::UrlEncoded(
                "function".into(),
                "TIME_SERIES_WEEKLY_ADJUSTED".into(),
            ))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let points = provider(&server, Some("demo"))
            .get_history(&Symbol::new("AAPL"), Period::Max, Interval::Weekly)
            .await
            .unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2024, 1, 12).unwrap());
    }

    #[tokio::test]
    async fn test_news_feed_mapping() {
        let body = json!({
            "items": "3",
            "feed": [
                {
                    "title": "Apple unveils new chip",
                    "url": "https://example.com/chip",
                    "source": "Reuters",
                    "time_published": "20240115T123000"
                },
                {
                    "headline": "Fallback headline",
                    "link": "https://example.com/fallback",
                    "provider_name": "Wire"
                },
                {"title": "No link"},
                {
                    "title": "Third",
                    "url": "https://example.com/3",
                    "time_published": "20240114T080000"
                }
            ]
        });

        let mut server = Server::new_async().await;
        server
            .mock("GET", "/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("function".into(), "NEWS_SENTIMENT".into()),
                Matcher::UrlEncoded("tickers".into(), "AAPL".into()),
            ]))
            .with_status(200)
            .with_body(body.to_string())
            .create_async()
            .await;

        let items = provider(&server, Some("demo"))
            .get_news(&Symbol::new("aapl"), 2)
            .await
            .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Apple unveils new chip");
        assert_eq!(items[0].source.as_deref(), Some("Reuters"));
        assert_eq!(items[0].published_at.as_deref(), Some("2024-01-15T12:30:00Z"));
        assert_eq!(items[1].url, "https://example.com/fallback");
        assert_eq!(items[1].source.as_deref(), Some("Wire"));
        assert_eq!(items[1].published_at, None);
    }

    #[test]
    fn test_feed_source_defaults() {
        let data = json!({"feed": [{"title": "t", "url": "https://example.com"}]});
        let items = parse_feed(&data, 10);
        assert_eq!(items[0].source.as_deref(), Some(DEFAULT_NEWS_SOURCE));
    }
}
