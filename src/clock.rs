//! Venue-local clock arithmetic.
//!
//! Everything downstream works in [`Minutes`] from the service day's local
//! midnight; this module is the only place that touches timezones.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;

use crate::limits::MINUTES_PER_DAY;
use crate::model::Minutes;

/// Parse `HH:MM` or `HH:MM:SS` into minutes of the day. Seconds are dropped.
pub fn parse_clock(s: &str) -> Option<Minutes> {
    let s = s.trim();
    let t = NaiveTime::parse_from_str(s, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
        .ok()?;
    Some(minute_of_day(&t))
}

/// Format a service-day minute back to `HH:MM`, wrapping past midnight.
pub fn format_clock(m: Minutes) -> String {
    let m = m.rem_euclid(MINUTES_PER_DAY);
    format!("{:02}:{:02}", m / 60, m % 60)
}

fn minute_of_day<T: Timelike>(t: &T) -> Minutes {
    (t.hour() * 60 + t.minute()) as Minutes
}

/// Minutes between `day`'s local midnight and `local`.
pub fn local_offset<Z: TimeZone>(local: &DateTime<Z>, day: NaiveDate) -> Minutes {
    let day_offset = local.date_naive().signed_duration_since(day).num_days() as Minutes;
    day_offset * MINUTES_PER_DAY + minute_of_day(local)
}

/// Minutes between `day`'s local midnight (in `tz`) and the instant `ts`.
pub fn minute_offset(ts: &DateTime<Utc>, day: NaiveDate, tz: Tz) -> Minutes {
    local_offset(&ts.with_timezone(&tz), day)
}

/// The venue's current calendar date.
pub fn today(tz: Tz) -> NaiveDate {
    Utc::now().with_timezone(&tz).date_naive()
}

pub fn now_local(tz: Tz) -> DateTime<Tz> {
    Utc::now().with_timezone(&tz)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()
    }

    #[test]
    fn parse_clock_formats() {
        assert_eq!(parse_clock("09:00"), Some(540));
        assert_eq!(parse_clock("23:30:00"), Some(1410));
        assert_eq!(parse_clock(" 00:05 "), Some(5));
        assert_eq!(parse_clock("25:00"), None);
        assert_eq!(parse_clock("soon"), None);
        assert_eq!(parse_clock(""), None);
    }

    #[test]
    fn format_clock_wraps() {
        assert_eq!(format_clock(540), "09:00");
        assert_eq!(format_clock(1470), "00:30");
        assert_eq!(format_clock(-30), "23:30");
    }

    #[test]
    fn offset_crosses_midnight() {
        let tz: Tz = "Europe/London".parse().unwrap();
        // 00:30 BST on the 16th is 23:30 UTC on the 15th.
        let ts = Utc.with_ymd_and_hms(2026, 10, 15, 23, 30, 0).unwrap();
        assert_eq!(minute_offset(&ts, day(), tz), 1440 + 30);
    }

    #[test]
    fn offset_previous_day_is_negative() {
        let tz = chrono_tz::UTC;
        let ts = Utc.with_ymd_and_hms(2026, 10, 14, 23, 0, 0).unwrap();
        assert_eq!(minute_offset(&ts, day(), tz), -60);
    }
}
