//! Canonical data types for the fetch layer.
//!
//! Every provider adapter maps its own response shape into these types:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`MetricsRecord`] - Snapshot of quote and valuation metrics
//! - [`HistoryPoint`] - One daily (or coarser) OHLCV bar
//! - [`NewsItem`] - A headline with its link and source

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A trading symbol/ticker.
///
/// Symbols are trimmed and uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// Quote and valuation metrics for a single symbol.
///
/// Every field is optional; providers leave out what they do not supply.
/// Serialized field names follow the camelCase layout consumers display.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsRecord {
    /// Ticker as reported by the provider.
    pub symbol: Option<String>,
    /// Short display name.
    pub short_name: Option<String>,
    /// Long display name or description.
    pub long_name: Option<String>,
    /// Market capitalization.
    pub market_cap: Option<i64>,
    /// Previous session close.
    pub previous_close: Option<f64>,
    /// Current session open.
    pub open: Option<f64>,
    /// Current session high.
    pub day_high: Option<f64>,
    /// Current session low.
    pub day_low: Option<f64>,
    /// 52-week high price.
    pub fifty_two_week_high: Option<f64>,
    /// 52-week low price.
    pub fifty_two_week_low: Option<f64>,
    /// Trailing twelve-month price-to-earnings ratio.
    #[serde(rename = "trailingPE")]
    pub trailing_pe: Option<f64>,
    /// Forward price-to-earnings ratio.
    #[serde(rename = "forwardPE")]
    pub forward_pe: Option<f64>,
    /// Dividend yield as a fraction.
    pub dividend_yield: Option<f64>,
}

impl MetricsRecord {
    /// Creates an empty record tagged with a symbol.
    #[must_use]
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: Some(symbol.into()),
            ..Default::default()
        }
    }

    /// Returns true when no field carries a value.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.symbol.is_none()
            && self.short_name.is_none()
            && self.long_name.is_none()
            && self.market_cap.is_none()
            && self.previous_close.is_none()
            && self.open.is_none()
            && self.day_high.is_none()
            && self.day_low.is_none()
            && self.fifty_two_week_high.is_none()
            && self.fifty_two_week_low.is_none()
            && self.trailing_pe.is_none()
            && self.forward_pe.is_none()
            && self.dividend_yield.is_none()
    }
}

/// One OHLCV bar keyed by calendar day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistoryPoint {
    /// Calendar day of the bar.
    pub date: NaiveDate,
    /// Opening price.
    pub open: Option<f64>,
    /// Highest price during the period.
    pub high: Option<f64>,
    /// Lowest price during the period.
    pub low: Option<f64>,
    /// Closing price.
    pub close: Option<f64>,
    /// Split/dividend adjusted closing price.
    pub adjusted_close: Option<f64>,
    /// Trading volume.
    pub volume: u64,
}

impl HistoryPoint {
    /// Creates a bar with prices and volume.
    #[must_use]
    pub const fn new(
        date: NaiveDate,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: u64,
    ) -> Self {
        Self {
            date,
            open: Some(open),
            high: Some(high),
            low: Some(low),
            close: Some(close),
            adjusted_close: None,
            volume,
        }
    }

    /// Sets the adjusted close price.
    #[must_use]
    pub const fn with_adjusted_close(mut self, adjusted_close: f64) -> Self {
        self.adjusted_close = Some(adjusted_close);
        self
    }
}

/// A news headline for a symbol.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    /// Headline text.
    pub title: String,
    /// Absolute link to the article.
    pub url: String,
    /// Publisher name.
    pub source: Option<String>,
    /// Publication time, RFC3339 when the provider format is recognised.
    pub published_at: Option<String>,
}

impl NewsItem {
    /// Creates a news item with a title and link.
    #[must_use]
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            source: None,
            published_at: None,
        }
    }

    /// Sets the publisher name.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Sets the publication time.
    #[must_use]
    pub fn with_published_at(mut self, published_at: impl Into<String>) -> Self {
        self.published_at = Some(published_at.into());
        self
    }
}
