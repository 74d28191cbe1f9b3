//! Timestamp and calendar-date encodings shared by every backend.
//!
//! Timestamps are kept at microsecond precision and rendered with a fixed
//! width so that their text form sorts the same way the instants do.

use chrono::{DateTime, NaiveDate, SubsecRound, Utc};

use crate::ValidationError;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Current time, truncated to what the stores can represent.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Truncate a caller-provided instant to storage precision.
pub fn normalize(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(6)
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, ValidationError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ValidationError::malformed("timestamp", e.to_string()))
}

pub fn format_date(date: &NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(s: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT)
        .map_err(|e| ValidationError::malformed("date", e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn timestamp_text_roundtrips_at_micro_precision() {
        let ts = Utc
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .unwrap()
            .checked_add_signed(chrono::Duration::nanoseconds(123_456_789))
            .unwrap();
        let text = format_timestamp(&ts);
        assert_eq!(text, "2024-03-09T07:05:01.123456Z");
        assert_eq!(parse_timestamp(&text).unwrap(), normalize(ts));
    }

    #[test]
    fn timestamp_text_sorts_chronologically() {
        let early = Utc.with_ymd_and_hms(2024, 1, 9, 23, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2024, 1, 10, 1, 0, 0).unwrap();
        assert!(format_timestamp(&early) < format_timestamp(&late));
    }

    #[test]
    fn dates() {
        let d = parse_date(" 2024-02-29 ").unwrap();
        assert_eq!(format_date(&d), "2024-02-29");
        assert!(parse_date("2023-02-29").is_err());
        assert!(parse_date("29/02/2024").is_err());
    }
}
