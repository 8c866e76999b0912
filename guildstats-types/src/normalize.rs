/*
 * Copyright 2025 Security Union LLC
 *
 * Licensed under either of
 *
 * * Apache License, Version 2.0
 *   (http://www.apache.org/licenses/LICENSE-2.0)
 * * MIT license
 *   (http://opensource.org/licenses/MIT)
 *
 * at your option.
 */

//! Lenient field decoding and numeric normalization.
//!
//! The statistics API is fed by a bot that writes whatever it last observed,
//! so counters may arrive as numbers, numeric strings, `null`, or not at all.
//! Anything that is not a number, a string or `null` (objects, arrays,
//! booleans) is rejected so the whole payload is classified as malformed.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Deserialize a numeric field that may be a number, a numeric string or `null`.
///
/// Non-numeric strings decode to `None` and end up as zero after
/// normalization.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        None => None,
        Some(NumberOrText::Number(n)) => Some(n),
        Some(NumberOrText::Text(s)) => s.trim().parse::<f64>().ok(),
    })
}

/// Deserialize an identifier that may be sent as a string or a number
/// (snowflake ids are sometimes emitted unquoted).
pub fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Unsigned(u64),
        Signed(i64),
    }

    Ok(
        Option::<TextOrNumber>::deserialize(deserializer)?.map(|value| match value {
            TextOrNumber::Text(s) => s,
            TextOrNumber::Unsigned(n) => n.to_string(),
            TextOrNumber::Signed(n) => n.to_string(),
        }),
    )
}

/// Deserialize a timestamp given either as an RFC 3339 string or as
/// milliseconds since the Unix epoch. Unparsable values decode to `None`.
pub fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<NumberOrText>::deserialize(deserializer)? {
        None => None,
        Some(NumberOrText::Number(ms)) => timestamp_from_millis(ms),
        Some(NumberOrText::Text(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| dt.with_timezone(&Utc))
            .ok(),
    })
}

fn timestamp_from_millis(ms: f64) -> Option<DateTime<Utc>> {
    if !ms.is_finite() || ms < 0.0 {
        return None;
    }
    Utc.timestamp_millis_opt(ms as i64).single()
}

/// Normalize an integer counter: missing, negative and non-finite values
/// become `0`, fractional values are rounded.
pub fn count(value: Option<f64>) -> u64 {
    match value {
        Some(n) if n.is_finite() && n > 0.0 => n.round() as u64,
        _ => 0,
    }
}

/// Normalize a fractional quantity (hours, days): missing, negative and
/// non-finite values become `0.0`.
pub fn amount(value: Option<f64>) -> f64 {
    match value {
        Some(n) if n.is_finite() && n > 0.0 => n,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Probe {
        #[serde(default, deserialize_with = "lenient_number")]
        n: Option<f64>,
        #[serde(default, deserialize_with = "lenient_timestamp")]
        at: Option<DateTime<Utc>>,
    }

    fn probe(json: &str) -> Result<Probe, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn test_count_clamps_and_rounds() {
        assert_eq!(count(None), 0);
        assert_eq!(count(Some(-5.0)), 0);
        assert_eq!(count(Some(f64::NAN)), 0);
        assert_eq!(count(Some(f64::INFINITY)), 0);
        assert_eq!(count(Some(41.6)), 42);
        assert_eq!(count(Some(1283.0)), 1283);
    }

    #[test]
    fn test_amount_clamps() {
        assert_eq!(amount(None), 0.0);
        assert_eq!(amount(Some(-0.5)), 0.0);
        assert_eq!(amount(Some(12.25)), 12.25);
    }

    #[test]
    fn test_lenient_number_accepts_numbers_strings_and_null() {
        assert_eq!(probe(r#"{"n": 7}"#).unwrap().n, Some(7.0));
        assert_eq!(probe(r#"{"n": 7.5}"#).unwrap().n, Some(7.5));
        assert_eq!(probe(r#"{"n": " 12 "}"#).unwrap().n, Some(12.0));
        assert_eq!(probe(r#"{"n": "lots"}"#).unwrap().n, None);
        assert_eq!(probe(r#"{"n": null}"#).unwrap().n, None);
        assert_eq!(probe(r#"{}"#).unwrap().n, None);
    }

    #[test]
    fn test_lenient_number_rejects_structured_values() {
        assert!(probe(r#"{"n": {"value": 1}}"#).is_err());
        assert!(probe(r#"{"n": [1]}"#).is_err());
        assert!(probe(r#"{"n": true}"#).is_err());
    }

    #[test]
    fn test_lenient_timestamp_formats() {
        let iso = probe(r#"{"at": "2025-03-01T12:00:00Z"}"#).unwrap().at;
        let millis = probe(r#"{"at": 1740830400000}"#).unwrap().at;
        assert!(iso.is_some());
        assert_eq!(iso, millis);
        assert_eq!(probe(r#"{"at": "yesterday"}"#).unwrap().at, None);
        assert_eq!(probe(r#"{"at": -1}"#).unwrap().at, None);
    }
}
