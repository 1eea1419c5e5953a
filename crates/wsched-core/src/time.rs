//! Time-of-day normalization and per-table offsets.

use std::fmt;

use chrono::{Duration, NaiveTime};

use crate::error::ScheduleError;

/// Clock formats tried in order; the first that parses wins.
const CLOCK_FORMATS: [&str; 2] = [
    "%I:%M %p", // 9:30 am
    "%H:%M",    // 09:30
];

const MINUTES_PER_HOUR: i64 = 60;

/// A start time as written in the workshop configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartTime {
    /// `"9:30 am"` or `"09:30"`.
    Clock(String),
    /// Minutes since midnight. YAML 1.1 writers turn an unquoted `9:30` into `570`.
    Minutes(i64),
    /// Any other YAML value, kept in its rendered form for error reporting.
    Unsupported(String),
}

impl fmt::Display for StartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartTime::Clock(text) => write!(f, "{text:?}"),
            StartTime::Minutes(minutes) => write!(f, "{minutes}"),
            StartTime::Unsupported(raw) => write!(f, "{raw}"),
        }
    }
}

impl From<&str> for StartTime {
    fn from(value: &str) -> Self {
        StartTime::Clock(value.to_string())
    }
}

impl From<i64> for StartTime {
    fn from(value: i64) -> Self {
        StartTime::Minutes(value)
    }
}

/// Parse a clock string with the first matching format.
pub fn parse_clock(raw: &str) -> Option<NaiveTime> {
    let trimmed = raw.trim();
    CLOCK_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(trimmed, format).ok())
}

/// Resolve minutes since midnight through the 24-hour clock format.
fn parse_minutes(minutes: i64) -> Option<NaiveTime> {
    let hours = minutes.div_euclid(MINUTES_PER_HOUR);
    let rest = minutes.rem_euclid(MINUTES_PER_HOUR);
    NaiveTime::parse_from_str(&format!("{hours}:{rest:02}"), "%H:%M").ok()
}

/// Normalize a configured start time into a time of day.
pub fn normalize(lesson: &str, value: &StartTime) -> Result<NaiveTime, ScheduleError> {
    let parsed = match value {
        StartTime::Clock(text) => parse_clock(text),
        StartTime::Minutes(minutes) => parse_minutes(*minutes),
        StartTime::Unsupported(_) => None,
    };

    parsed.ok_or_else(|| ScheduleError::InvalidTimeFormat {
        lesson: lesson.to_string(),
        value: value.to_string(),
    })
}

/// Normalize a time string embedded in a lesson's raw schedule.
pub fn normalize_clock(lesson: &str, raw: &str) -> Result<NaiveTime, ScheduleError> {
    normalize(lesson, &StartTime::Clock(raw.to_string()))
}

/// Signed whole minutes from the schedule's first row to the declared start.
pub fn offset_minutes(declared: NaiveTime, first_row: NaiveTime) -> i64 {
    (declared - first_row).num_minutes()
}

/// Shift a time of day, wrapping across midnight.
pub fn shift(time: NaiveTime, minutes: i64) -> NaiveTime {
    let (shifted, _days) = time.overflowing_add_signed(Duration::minutes(minutes));
    shifted
}

pub fn format_clock(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hm(hour: u32, minute: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, minute, 0).unwrap()
    }

    #[test]
    fn test_all_encodings_normalize_to_same_time() {
        let encodings = [
            StartTime::from("9:30 am"),
            StartTime::from("09:30"),
            StartTime::from(570),
        ];
        for encoding in &encodings {
            assert_eq!(normalize("intro", encoding).unwrap(), hm(9, 30), "{encoding}");
        }
    }

    #[test]
    fn test_twelve_hour_afternoon_and_uppercase() {
        assert_eq!(parse_clock("1:15 PM"), Some(hm(13, 15)));
        assert_eq!(parse_clock("12:00 pm"), Some(hm(12, 0)));
        assert_eq!(parse_clock("12:05 am"), Some(hm(0, 5)));
    }

    #[test]
    fn test_twenty_four_hour_fallback() {
        assert_eq!(parse_clock("9:05"), Some(hm(9, 5)));
        assert_eq!(parse_clock(" 14:45 "), Some(hm(14, 45)));
    }

    #[test]
    fn test_invalid_strings_are_rejected() {
        for raw in ["", "noon", "25:00", "9.30", "13:30 pm"] {
            let err = normalize_clock("intro", raw).unwrap_err();
            assert!(
                matches!(err, ScheduleError::InvalidTimeFormat { ref lesson, .. } if lesson == "intro"),
                "expected InvalidTimeFormat for {raw:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn test_minutes_out_of_range_are_rejected() {
        assert!(normalize("intro", &StartTime::Minutes(24 * 60)).is_err());
        assert!(normalize("intro", &StartTime::Minutes(-30)).is_err());
        assert_eq!(normalize("intro", &StartTime::Minutes(0)).unwrap(), hm(0, 0));
    }

    #[test]
    fn test_unsupported_value_reports_raw_text() {
        let err = normalize("git-novice", &StartTime::Unsupported("9.5".into())).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("git-novice"), "{message}");
        assert!(message.contains("9.5"), "{message}");
    }

    #[test]
    fn test_offset_and_shift() {
        let offset = offset_minutes(hm(9, 30), hm(10, 0));
        assert_eq!(offset, -30);
        assert_eq!(format_clock(shift(hm(10, 15), offset)), "09:45");
    }

    #[test]
    fn test_shift_wraps_at_midnight() {
        assert_eq!(format_clock(shift(hm(23, 30), 45)), "00:15");
        assert_eq!(format_clock(shift(hm(0, 10), -20)), "23:50");
    }
}
