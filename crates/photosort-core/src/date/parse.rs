use std::sync::LazyLock;

use chrono::{FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;

use crate::metadata::Rational;

static OFFSET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([+-])(\d{2}):(\d{2})$").unwrap());

const DATETIME_FORMATS: &[&str] = &[
    "%Y:%m:%d %H:%M:%S",
    "%Y:%m:%d %H:%M",
    "%Y:%m:%dT%H:%M:%S",
    "%Y:%m:%dT%H:%M",
];

/// Parse an EXIF date/time string (`YYYY:MM:DD HH:MM:SS`).
/// Cameras are sloppy with separators, so `-` and `/` are accepted too, as are
/// a missing seconds field and an ISO `T`. A bare date is read as midnight; a
/// date followed by an unreadable time is no match.
pub fn parse_exif_datetime(s: &str) -> Option<NaiveDateTime> {
    let cleaned = s.trim().replace(['-', '/'], ":");

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(&cleaned, format).ok())
    {
        return Some(dt);
    }

    if cleaned.contains([' ', 'T']) {
        return None;
    }
    parse_exif_date(&cleaned)?.and_hms_opt(0, 0, 0)
}

pub fn parse_exif_date(s: &str) -> Option<NaiveDate> {
    let cleaned = s.trim().replace(['-', '/'], ":");
    NaiveDate::parse_from_str(&cleaned, "%Y:%m:%d").ok()
}

/// Parse an EXIF offset tag (`+HH:MM` / `-HH:MM`).
pub fn parse_offset(s: &str) -> Option<FixedOffset> {
    let caps = OFFSET_RE.captures(s.trim())?;
    let hours: i32 = caps[2].parse().ok()?;
    let minutes: i32 = caps[3].parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    let seconds = hours * 3600 + minutes * 60;
    if &caps[1] == "-" {
        FixedOffset::west_opt(seconds)
    } else {
        FixedOffset::east_opt(seconds)
    }
}

/// GPS time stamps are three rationals: hour, minute, second. Fractional
/// seconds are truncated.
pub fn parse_gps_time(parts: &[Rational]) -> Option<NaiveTime> {
    let [hour, minute, second] = parts else {
        return None;
    };
    let component = |r: &Rational| {
        let value = r.to_f64()?;
        (value.is_finite() && value >= 0.0).then(|| value.trunc() as u32)
    };
    NaiveTime::from_hms_opt(component(hour)?, component(minute)?, component(second)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exif_datetime() {
        let expected = NaiveDate::from_ymd_opt(2023, 1, 5)
            .unwrap()
            .and_hms_opt(13, 5, 7)
            .unwrap();
        assert_eq!(parse_exif_datetime("2023:01:05 13:05:07"), Some(expected));
        assert_eq!(parse_exif_datetime("2023-01-05 13:05:07"), Some(expected));
        assert_eq!(parse_exif_datetime(" 2023/01/05 13:05:07 "), Some(expected));

        let midnight = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap().and_hms_opt(0, 0, 0);
        assert_eq!(parse_exif_datetime("2023:01:05"), midnight);

        let minutes = NaiveDate::from_ymd_opt(2023, 1, 5).unwrap().and_hms_opt(13, 5, 0);
        assert_eq!(parse_exif_datetime("2023:01:05 13:05"), minutes);
        assert_eq!(parse_exif_datetime("2023-01-05T13:05:07"), Some(expected));
        assert_eq!(parse_exif_datetime("2023-01-05T13:05"), minutes);

        assert_eq!(parse_exif_datetime("2023:01:05 99:99:99"), None);
        assert_eq!(parse_exif_datetime("2023:01:05 garbage"), None);
        assert_eq!(parse_exif_datetime("0000:00:00 00:00:00"), None);
        assert_eq!(parse_exif_datetime(""), None);
        assert_eq!(parse_exif_datetime("yesterday"), None);
    }

    #[test]
    fn test_offsets() {
        assert_eq!(parse_offset("+02:00"), FixedOffset::east_opt(7200));
        assert_eq!(parse_offset("-05:30"), FixedOffset::west_opt(5 * 3600 + 1800));
        assert_eq!(parse_offset("+00:00"), FixedOffset::east_opt(0));
        assert_eq!(parse_offset("02:00"), None);
        assert_eq!(parse_offset("+2:00"), None);
        assert_eq!(parse_offset("+25:00"), None);
        assert_eq!(parse_offset("+01:75"), None);
        assert_eq!(parse_offset("   "), None);
    }

    #[test]
    fn test_gps_time() {
        let parts = [Rational::new(12, 1), Rational::new(0, 1), Rational::new(0, 1)];
        assert_eq!(parse_gps_time(&parts), NaiveTime::from_hms_opt(12, 0, 0));

        let fractional = [Rational::new(8, 1), Rational::new(15, 1), Rational::new(4599, 100)];
        assert_eq!(parse_gps_time(&fractional), NaiveTime::from_hms_opt(8, 15, 45));

        let zero_denominator = [Rational::new(8, 0), Rational::new(15, 1), Rational::new(0, 1)];
        assert_eq!(parse_gps_time(&zero_denominator), None);
        assert_eq!(parse_gps_time(&parts[..2]), None);
    }
}
