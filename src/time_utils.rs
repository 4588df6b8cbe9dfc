// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Shared helpers for date/time parsing and formatting.

use chrono::{DateTime, Duration, NaiveDate, SecondsFormat, Utc};

use crate::error::{AppError, Result};

/// Format a UTC timestamp as RFC3339 using a `Z` suffix.
pub fn format_utc_rfc3339(date: DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Resolve the bounds of a manually triggered sync.
///
/// `end_date` defaults to now and an explicit `YYYY-MM-DD` pins it to
/// 11:00 UTC on that day; `start_date` defaults to 24h before the end
/// and an explicit date pins it to 18:00 UTC (the vendor posts most
/// daily records between those hours).
pub fn resolve_manual_bounds(
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Result<(DateTime<Utc>, DateTime<Utc>)> {
    let end = match end_date {
        Some(raw) => parse_ymd(raw)?
            .and_hms_opt(11, 0, 0)
            .expect("11:00:00 is a valid time")
            .and_utc(),
        None => Utc::now(),
    };
    let start = match start_date {
        Some(raw) => parse_ymd(raw)?
            .and_hms_opt(18, 0, 0)
            .expect("18:00:00 is a valid time")
            .and_utc(),
        None => end - Duration::hours(24),
    };
    Ok((start, end))
}

fn parse_ymd(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("invalid date `{raw}`, expected YYYY-MM-DD")))
}

/// Parse a vendor epoch-seconds value into a UTC timestamp.
pub fn from_epoch_seconds(secs: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| AppError::Parse(format!("epoch timestamp {secs} out of range")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_utc_rfc3339() {
        let date = DateTime::from_timestamp(1_609_459_200, 0).unwrap();
        assert_eq!(format_utc_rfc3339(date), "2021-01-01T00:00:00Z");
    }

    #[test]
    fn test_resolve_manual_bounds_defaults() {
        let before = Utc::now();
        let (start, end) = resolve_manual_bounds(None, None).unwrap();
        assert_eq!(end - start, Duration::hours(24));
        assert!(end >= before);
    }

    #[test]
    fn test_resolve_manual_bounds_explicit() {
        let (start, end) =
            resolve_manual_bounds(Some("2021-03-01"), Some("2021-03-02")).unwrap();
        assert_eq!(format_utc_rfc3339(start), "2021-03-01T18:00:00Z");
        assert_eq!(format_utc_rfc3339(end), "2021-03-02T11:00:00Z");
    }

    #[test]
    fn test_resolve_manual_bounds_rejects_garbage() {
        let err = resolve_manual_bounds(Some("yesterday"), None).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn test_from_epoch_seconds() {
        let ts = from_epoch_seconds(1_594_768_740).unwrap();
        assert_eq!(format_utc_rfc3339(ts), "2020-07-14T23:19:00Z");
    }
}
