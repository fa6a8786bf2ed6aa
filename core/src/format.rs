//! Display helpers for durations and dates

use chrono::{DateTime, TimeZone, Utc};

/// `MM:SS`, as shown on the call overlay. Minutes keep growing past 59.
pub fn clock(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// `1h 2m 3s`, `2m 3s` or `3s`.
pub fn duration_long(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// `Xh Ym` for aggregate durations.
pub fn hours_minutes(seconds: u64) -> String {
    format!("{}h {}m", seconds / 3600, (seconds % 3600) / 60)
}

/// `Jan 1, 2025, 12:00 AM` in UTC.
pub fn short_date(at: &DateTime<Utc>) -> String {
    at.format("%b %-d, %Y, %-I:%M %p").to_string()
}

/// [`short_date`] for a millisecond timestamp.
pub fn short_date_ms(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|at| short_date(&at))
        .unwrap_or_default()
}

/// `HH:MM` for chat bubbles.
pub fn time_of_day_ms(ms: i64) -> String {
    Utc.timestamp_millis_opt(ms)
        .single()
        .map(|at| at.format("%H:%M").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::placeholder::BASE_DATE_MS;

    #[test]
    fn clock_pads() {
        assert_eq!(clock(0), "00:00");
        assert_eq!(clock(65), "01:05");
        assert_eq!(clock(3_600), "60:00");
    }

    #[test]
    fn long_durations_drop_leading_zero_units() {
        assert_eq!(duration_long(3), "3s");
        assert_eq!(duration_long(123), "2m 3s");
        assert_eq!(duration_long(3_723), "1h 2m 3s");
        assert_eq!(duration_long(3_600), "1h 0m 0s");
    }

    #[test]
    fn hours_and_minutes() {
        assert_eq!(hours_minutes(0), "0h 0m");
        assert_eq!(hours_minutes(5_400), "1h 30m");
    }

    #[test]
    fn dates() {
        assert_eq!(short_date_ms(BASE_DATE_MS), "Jan 1, 2025, 12:00 AM");
        assert_eq!(short_date_ms(BASE_DATE_MS + 13 * 3_600_000 + 5 * 60_000), "Jan 1, 2025, 1:05 PM");
        assert_eq!(time_of_day_ms(BASE_DATE_MS + 9 * 60_000), "00:09");
    }
}
