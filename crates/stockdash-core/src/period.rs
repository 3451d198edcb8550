//! History window, bar interval and data-kind definitions.
//!
//! This module defines [`Period`] for the look-back window of a history request,
//! [`Interval`] for bar granularity and [`DataKind`] for the three cached
//! data kinds.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::error::DataError;

/// Look-back window for a history request.
///
/// Parses the short forms `5d`, `3mo`, `1y`, `ytd` and `max`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    /// A number of calendar days.
    Days(u32),
    /// A number of calendar months.
    Months(u32),
    /// A number of whole years.
    Years(u32),
    /// From the first day of the current year.
    YearToDate,
    /// Everything the provider has.
    Max,
}

impl Period {
    /// First calendar date inside the window ending on `today`.
    ///
    /// `None` for [`Period::Max`], or when the start would fall before the
    /// earliest representable date.
    #[must_use]
    pub fn start_date(&self, today: NaiveDate) -> Option<NaiveDate> {
        match *self {
            Self::Days(n) => today.checked_sub_days(Days::new(u64::from(n))),
            Self::Months(n) => today.checked_sub_months(Months::new(n)),
            Self::Years(n) => today.checked_sub_months(Months::new(n.checked_mul(12)?)),
            Self::YearToDate => NaiveDate::from_ymd_opt(today.year(), 1, 1),
            Self::Max => None,
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Self::Years(1)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Days(n) => write!(f, "{n}d"),
            Self::Months(n) => write!(f, "{n}mo"),
            Self::Years(n) => write!(f, "{n}y"),
            Self::YearToDate => f.write_str("ytd"),
            Self::Max => f.write_str("max"),
        }
    }
}

impl FromStr for Period {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_lowercase();
        match s.as_str() {
            "ytd" => return Ok(Self::YearToDate),
            "max" => return Ok(Self::Max),
            _ => {}
        }

        let invalid = || DataError::InvalidParameter(format!("Invalid period: {s}"));
        let (count, ctor): (&str, fn(u32) -> Self) = if let Some(n) = s.strip_suffix("mo") {
            (n, Self::Months)
        } else if let Some(n) = s.strip_suffix('y') {
            (n, Self::Years)
        } else if let Some(n) = s.strip_suffix('d') {
            (n, Self::Days)
        } else {
            return Err(invalid());
        };

        match count.parse::<u32>() {
            Ok(n) if n > 0 => Ok(ctor(n)),
            _ => Err(invalid()),
        }
    }
}

/// Granularity of history bars.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    /// Daily bars.
    #[default]
    Daily,
    /// Weekly bars.
    Weekly,
    /// Monthly bars.
    Monthly,
}

impl Interval {
    /// Returns the short form used in requests and cache keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1d" => Ok(Self::Daily),
            "1wk" => Ok(Self::Weekly),
            "1mo" => Ok(Self::Monthly),
            other => Err(DataError::InvalidParameter(format!(
                "Invalid interval: {other}"
            ))),
        }
    }
}

/// The kinds of data the fetch layer caches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataKind {
    /// Quote and valuation metrics.
    Metrics,
    /// Price history.
    History,
    /// News headlines.
    News,
}

impl DataKind {
    /// Returns the label used inside cache keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Metrics => "metrics",
            Self::History => "history",
            Self::News => "news",
        }
    }

    /// Returns how long a cached value of this kind stays fresh.
    #[must_use]
    pub const fn default_ttl(&self) -> Duration {
        match self {
            Self::Metrics => Duration::from_secs(60 * 10),
            Self::History => Duration::from_secs(60 * 60),
            Self::News => Duration::from_secs(60 * 60 * 6),
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
