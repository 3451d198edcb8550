//! Helpers shared by every history producer.

use chrono::NaiveDate;
use polars::prelude::*;

use crate::{
    error::{DataError, Result},
    period::Period,
    types::HistoryPoint,
};

/// Sorts bars ascending by date and drops duplicate dates.
///
/// When a date occurs more than once the last occurrence wins.
#[must_use]
pub fn normalize(mut points: Vec<HistoryPoint>) -> Vec<HistoryPoint> {
    // Stable sort keeps input order among equal dates, so the last one is the
    // latest reported bar for that day.
    points.sort_by_key(|p| p.date);
    let mut out: Vec<HistoryPoint> = Vec::with_capacity(points.len());
    for point in points {
        match out.last_mut() {
            Some(last) if last.date == point.date => *last = point,
            _ => out.push(point),
        }
    }
    out
}

/// Drops bars dated before the start of `period` counted back from `today`.
///
/// [`Period::Max`] leaves the input untouched.
#[must_use]
pub fn trim_to_period(
    points: Vec<HistoryPoint>,
    period: Period,
    today: NaiveDate,
) -> Vec<HistoryPoint> {
    let Some(cutoff) = period.start_date(today) else {
        return points;
    };
    points.into_iter().filter(|p| p.date >= cutoff).collect()
}

/// Builds a DataFrame view of a bar series.
///
/// Columns: `date` (Date), `open`, `high`, `low`, `close`, `adjusted_close`, `volume`.
pub fn history_frame(points: &[HistoryPoint]) -> Result<DataFrame> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1)
        .ok_or_else(|| DataError::Other("Invalid epoch date".to_string()))?;

    let dates: Vec<i32> = points
        .iter()
        .map(|p| (p.date - epoch).num_days() as i32)
        .collect();
    let opens: Vec<Option<f64>> = points.iter().map(|p| p.open).collect();
    let highs: Vec<Option<f64>> = points.iter().map(|p| p.high).collect();
    let lows: Vec<Option<f64>> = points.iter().map(|p| p.low).collect();
    let closes: Vec<Option<f64>> = points.iter().map(|p| p.close).collect();
    let adj_closes: Vec<Option<f64>> = points.iter().map(|p| p.adjusted_close).collect();
    let volumes: Vec<u64> = points.iter().map(|p| p.volume).collect();

    let date_col = Column::new("date".into(), dates)
        .cast(&DataType::Date)
        .map_err(|e| DataError::Other(e.to_string()))?;

    DataFrame::new(vec![
        date_col,
        Column::new("open".into(), opens),
        Column::new("high".into(), highs),
        Column::new("low".into(), lows),
        Column::new("close".into(), closes),
        Column::new("adjusted_close".into(), adj_closes),
        Column::new("volume".into(), volumes),
    ])
    .map_err(|e| DataError::Other(e.to_string()))
}
