use chrono::{DateTime, Duration, DurationRound, FixedOffset, NaiveDateTime, TimeZone, Utc};

/// Get the current time as a UTC datetime.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Truncate to the start of the containing UTC hour.
pub fn hour_floor(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.duration_trunc(Duration::hours(1)).unwrap_or(dt)
}

/// Parse a timestamp string into a UTC datetime.
///
/// Supports:
/// - RFC 3339 / ISO 8601 (e.g. `"2026-02-08T05:00:00.000Z"`)
/// - ISO 8601 with a colon-less offset (e.g. `"2026-02-08T05:00:00+0000"`)
/// - ISO 8601 without an offset, taken as UTC (e.g. `"2026-02-08T05:00:00"`)
/// - Millisecond epoch as string (13+ digits, e.g. `"1770526800000"`)
/// - Second epoch as string (10-12 digits, e.g. `"1770526800"`)
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    let trimmed = s.trim();

    // Try RFC 3339 / ISO 8601
    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f%z") {
        return Some(dt.with_timezone(&Utc));
    }

    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }

    // Try numeric epoch
    if !trimmed.is_empty() && trimmed.bytes().all(|b| b.is_ascii_digit()) {
        match trimmed.len() {
            13.. => {
                let ms = trimmed.parse::<i64>().ok()?;
                return Utc.timestamp_millis_opt(ms).single();
            }
            10..=12 => {
                let secs = trimmed.parse::<i64>().ok()?;
                return Utc.timestamp_opt(secs, 0).single();
            }
            _ => {}
        }
    }

    None
}
