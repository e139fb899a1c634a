//! Shared utility functions for RFS crates.

/// Timestamp utility functions
pub mod dates {
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    /// Sensor exports and output files use this layout.
    pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    /// Minutes between consecutive quarter-hourly samples.
    pub const QUARTER_HOUR_MINUTES: i64 = 15;

    /// Format a NaiveDate as "YYYY-MM-DD"
    pub fn format_date(date: &NaiveDate) -> String {
        date.format("%Y-%m-%d").to_string()
    }

    /// Parse a date string in "YYYY-MM-DD" format
    pub fn parse_date(s: &str) -> anyhow::Result<NaiveDate> {
        Ok(NaiveDate::parse_from_str(s, "%Y-%m-%d")?)
    }

    /// Format a timestamp as "YYYY-MM-DD HH:MM:SS"
    pub fn format_timestamp(ts: &NaiveDateTime) -> String {
        ts.format(TIMESTAMP_FORMAT).to_string()
    }

    /// Parse a timestamp.
    ///
    /// Accepts "YYYY-MM-DD HH:MM:SS", the same with a `T` separator, and
    /// RFC 3339 strings with an offset (as returned by KiWIS), whose offset
    /// is dropped. A bare date means midnight.
    pub fn parse_timestamp(s: &str) -> anyhow::Result<NaiveDateTime> {
        let s = s.trim();
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT) {
            return Ok(ts);
        }
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
            return Ok(ts);
        }
        if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(s) {
            return Ok(ts.naive_local());
        }
        let date = parse_date(s)?;
        date.and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow::anyhow!("invalid midnight for {}", date))
    }

    /// `count` timestamps `step` apart, starting at `start`.
    pub fn timestamps_from(start: NaiveDateTime, count: usize, step: Duration) -> Vec<NaiveDateTime> {
        (0..count).map(|i| start + step * i as i32).collect()
    }

    /// Interval between samples for a given number of samples per day,
    /// in whole seconds.
    pub fn sample_interval(samples_per_day: usize) -> Duration {
        Duration::seconds(86_400 / samples_per_day.max(1) as i64)
    }

}
