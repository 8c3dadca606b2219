//! Timestamp utilities
//!
//! All timestamps stored by yfdb are UTC strings no longer than 24 characters,
//! the width of the `created_at` / `updated_at` / date columns.

use chrono::{DateTime, Datelike, FixedOffset, SecondsFormat, TimeZone, Utc};

/// Maximum width of a stored timestamp string
pub const TIMESTAMP_WIDTH: usize = 24;

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Current UTC time as `YYYY-MM-DDTHH:MM:SS.mmmZ` (exactly 24 characters)
pub fn now_timestamp() -> String {
    format_timestamp(&now())
}

/// Format a UTC instant as `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current calendar year (UTC)
pub fn current_year() -> i32 {
    now().year()
}

/// Convert epoch seconds to `YYYY-MM-DDTHH:MM:SS` (UTC)
///
/// Returns `None` for values chrono cannot represent.
pub fn epoch_to_iso(epoch_secs: i64) -> Option<String> {
    Utc.timestamp_opt(epoch_secs, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Convert epoch seconds to a 24-character UTC timestamp
pub fn epoch_to_timestamp(epoch_secs: i64) -> Option<String> {
    Utc.timestamp_opt(epoch_secs, 0)
        .single()
        .map(|dt| format_timestamp(&dt))
}

/// Convert epoch seconds to the calendar date seen by an exchange
/// whose UTC offset is `gmt_offset_secs` (e.g. 32400 for Tokyo)
pub fn epoch_to_local_date(epoch_secs: i64, gmt_offset_secs: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(gmt_offset_secs)?;
    offset
        .timestamp_opt(epoch_secs, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Convert epoch seconds to exchange wall-clock time `YYYY-MM-DDTHH:MM:SS`
pub fn epoch_to_local_iso(epoch_secs: i64, gmt_offset_secs: i32) -> Option<String> {
    let offset = FixedOffset::east_opt(gmt_offset_secs)?;
    offset
        .timestamp_opt(epoch_secs, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
}

/// Truncate a remote-provided timestamp string to the stored width
pub fn truncate_timestamp(value: &str) -> String {
    value.chars().take(TIMESTAMP_WIDTH).collect()
}

/// Normalise a date-like string (`2024-03-31`, `2024-03-31T00:00:00Z`, …) to `YYYY-MM-DD`
pub fn date_part(value: &str) -> Option<String> {
    let date: String = value.trim().chars().take(10).collect();
    if chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok() {
        Some(date)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_timestamp_width() {
        let ts = now_timestamp();
        assert_eq!(ts.len(), TIMESTAMP_WIDTH);
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_now_returns_recent_timestamp() {
        let timestamp = now();
        assert!(timestamp.timestamp() > 946_684_800); // 2000-01-01 00:00:00 UTC
        assert!(timestamp.timestamp() < 4_102_444_800); // 2100-01-01 00:00:00 UTC
    }

    #[test]
    fn test_epoch_to_iso() {
        assert_eq!(epoch_to_iso(0).as_deref(), Some("1970-01-01T00:00:00"));
        assert_eq!(
            epoch_to_iso(1_711_843_200).as_deref(),
            Some("2024-03-31T00:00:00")
        );
    }

    #[test]
    fn test_epoch_to_timestamp() {
        assert_eq!(
            epoch_to_timestamp(1_711_843_200).as_deref(),
            Some("2024-03-31T00:00:00.000Z")
        );
    }

    #[test]
    fn test_epoch_to_local_date_crosses_midnight() {
        // 2024-03-31T15:00:00Z is already April 1st in Tokyo
        let ts = 1_711_897_200;
        assert_eq!(epoch_to_local_date(ts, 0).as_deref(), Some("2024-03-31"));
        assert_eq!(epoch_to_local_date(ts, 9 * 3600).as_deref(), Some("2024-04-01"));
    }

    #[test]
    fn test_epoch_to_local_iso() {
        // Tokyo session open, 2024-04-01 09:00 JST
        assert_eq!(
            epoch_to_local_iso(1_711_929_600, 9 * 3600).as_deref(),
            Some("2024-04-01T09:00:00")
        );
        assert_eq!(epoch_to_local_iso(0, 100_000), None);
    }

    #[test]
    fn test_truncate_timestamp() {
        assert_eq!(
            truncate_timestamp("2025-09-01T09:30:00.000000+09:00"),
            "2025-09-01T09:30:00.0000"
        );
        assert_eq!(truncate_timestamp("2025-09-01"), "2025-09-01");
    }

    #[test]
    fn test_date_part() {
        assert_eq!(date_part("2024-03-31").as_deref(), Some("2024-03-31"));
        assert_eq!(date_part("2024-03-31T12:00:00Z").as_deref(), Some("2024-03-31"));
        assert_eq!(date_part("not a date"), None);
        assert_eq!(date_part(""), None);
    }
}
