//! Tolerant parsing of loosely typed upstream values.
//!
//! Upstream APIs mix JSON numbers, numeric strings and placeholder strings
//! such as `"None"` or `"-"` in the same field. Every adapter goes through
//! these helpers so a malformed field degrades to `None` instead of failing
//! the whole response.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use serde_json::Value;

/// Placeholder strings that mean "no value".
const MISSING_MARKERS: &[&str] = &["", "none", "null", "nan", "-", "n/a"];

/// Returns the trimmed string form of a value, or `None` if it is a placeholder.
fn numeric_text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().replace(',', ""),
        _ => return None,
    };
    if MISSING_MARKERS.contains(&s.to_lowercase().as_str()) {
        return None;
    }
    Some(s)
}

/// Parses a value as a finite float.
#[must_use]
pub fn float(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(_) => numeric_text(value)?.parse::<f64>().ok(),
        _ => None,
    }?;
    parsed.is_finite().then_some(parsed)
}

/// Parses a value as an integer, truncating fractional input.
#[must_use]
pub fn integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(_) => {
            let s = numeric_text(value)?;
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(truncate))
        }
        _ => None,
    }
}

/// Parses a value as a non-empty trimmed string.
#[must_use]
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty() && !s.eq_ignore_ascii_case("none")).then(|| s.to_string())
        }
        _ => None,
    }
}

/// Looks up the first of several keys that holds a non-null value.
#[must_use]
pub fn first<'a>(object: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .filter_map(|k| object.get(*k))
        .find(|v| !v.is_null())
}

/// Looks up the first of several keys and parses it as a float.
#[must_use]
pub fn float_field(object: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().filter_map(|k| object.get(*k)).find_map(float)
}

/// Looks up the first of several keys and parses it as a string.
#[must_use]
pub fn text_field(object: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|k| object.get(*k)).find_map(text)
}

/// Normalizes a provider timestamp to RFC3339 UTC where the format is known.
///
/// Recognises RFC3339, `YYYYMMDDTHHMMSS`, `YYYY-MM-DD HH:MM:SS` and epoch
/// seconds. Anything else is returned unchanged.
#[must_use]
pub fn timestamp(raw: &str) -> String {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return format_utc(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y%m%dT%H%M%S", "%Y%m%dT%H%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return format_utc(naive.and_utc());
        }
    }
    if let Some(dt) = raw
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
    {
        return format_utc(dt);
    }
    raw.to_string()
}

/// Formats a UTC instant the way news timestamps are stored.
#[must_use]
pub fn format_utc(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn truncate(f: f64) -> Option<i64> {
    (f.is_finite() && f.abs() < i64::MAX as f64).then(|| f.trunc() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_float_accepts_numbers_and_numeric_strings() {
        assert_eq!(float(&json!(35.2)), Some(35.2));
        assert_eq!(float(&json!("35.2")), Some(35.2));
        assert_eq!(float(&json!(" 0.0044 ")), Some(0.0044));
        assert_eq!(float(&json!("1,234.5")), Some(1234.5));
        assert_eq!(float(&json!(7)), Some(7.0));
    }

    #[test]
    fn test_float_degrades_to_none() {
        for v in [
            json!(null),
            json!(""),
            json!("None"),
            json!("-"),
            json!("NaN"),
            json!("abc"),
            json!(true),
            json!([1]),
        ] {
            assert_eq!(float(&v), None, "{v} should not parse");
        }
    }

    #[test]
    fn test_integer() {
        assert_eq!(integer(&json!("3000000000000")), Some(3_000_000_000_000));
        assert_eq!(integer(&json!("12.9")), Some(12));
        assert_eq!(integer(&json!(42)), Some(42));
        assert_eq!(integer(&json!(4.0e9)), Some(4_000_000_000));
        assert_eq!(integer(&json!("None")), None);
        assert_eq!(integer(&json!("1e400")), None);
    }

    #[test]
    fn test_text() {
        assert_eq!(text(&json!(" Apple Inc ")), Some("Apple Inc".to_string()));
        assert_eq!(text(&json!("")), None);
        assert_eq!(text(&json!("None")), None);
        assert_eq!(text(&json!(5)), None);
    }

    #[test]
    fn test_field_lookup_falls_back_across_keys() {
        let obj = json!({"52WeekHigh": "None", "WeekHigh52": "199.6", "Name": ""});
        assert_eq!(float_field(&obj, &["52WeekHigh", "WeekHigh52"]), Some(199.6));
        assert_eq!(text_field(&obj, &["Name", "Symbol"]), None);
        assert_eq!(first(&obj, &["missing", "Name"]), Some(&json!("")));
    }

    #[test]
    fn test_timestamp_normalization() {
        assert_eq!(timestamp("20240115T123000"), "2024-01-15T12:30:00Z");
        assert_eq!(timestamp("2024-01-15T14:30:00+02:00"), "2024-01-15T12:30:00Z");
        assert_eq!(timestamp("1705321800"), "2024-01-15T12:30:00Z");
        assert_eq!(timestamp("yesterday"), "yesterday");
    }
}
