//! Wall-clock helpers: `HH:MM` parsing, weekday numbering, snapping.
//!
//! All schedule arithmetic happens in the tenant's local wall-clock time
//! (`NaiveDateTime`). Weekdays are numbered `0 = Sunday … 6 = Saturday`.

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Weekday};

use crate::error::{Result, ScheduleError};

/// Longest class, block or candidate window accepted on input.
pub const MAX_DURATION_MINUTES: u32 = 720;

/// Parse `"HH:MM"` (seconds optional) into a `NaiveTime`.
pub fn parse_hhmm(s: &str) -> Result<NaiveTime> {
    let s = s.trim();
    NaiveTime::parse_from_str(s, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
        .map_err(|_| ScheduleError::invalid(format!("invalid time '{}', expected HH:MM", s)))
}

/// Parse a `"YYYY-MM-DD"` date.
pub fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| ScheduleError::invalid(format!("invalid date '{}', expected YYYY-MM-DD", s)))
}

/// Weekday index of a date, Sunday = 0.
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Inverse of [`weekday_index`]. `None` for indices above 6.
pub fn weekday_from_index(index: u8) -> Option<Weekday> {
    match index {
        0 => Some(Weekday::Sun),
        1 => Some(Weekday::Mon),
        2 => Some(Weekday::Tue),
        3 => Some(Weekday::Wed),
        4 => Some(Weekday::Thu),
        5 => Some(Weekday::Fri),
        6 => Some(Weekday::Sat),
        _ => None,
    }
}

/// Minutes elapsed since midnight.
pub fn minutes_of_day(time: NaiveTime) -> i64 {
    i64::from(time.num_seconds_from_midnight()) / 60
}

/// Round `dt` up to the next multiple of `snap_minutes` counted from midnight.
///
/// Already-aligned values are returned unchanged.
pub fn snap_up(dt: NaiveDateTime, snap_minutes: u32) -> NaiveDateTime {
    let step = i64::from(snap_minutes.max(1)) * 60;
    let secs = i64::from(dt.time().num_seconds_from_midnight());
    let rem = secs % step;
    if rem == 0 && dt.time().nanosecond() == 0 {
        dt
    } else {
        let base = dt.date().and_time(NaiveTime::MIN) + Duration::seconds(secs - rem);
        base + Duration::seconds(step)
    }
}

/// Every date in `[start, end]`, inclusive.
pub fn dates_between(start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = NaiveDate> {
    start.iter_days().take_while(move |d| *d <= end)
}

/// Reject `end < start` and ranges longer than `max_days`.
pub fn check_range(start: NaiveDate, end: NaiveDate, max_days: u32) -> Result<()> {
    if end < start {
        return Err(ScheduleError::invalid(format!(
            "end date {} is before start date {}",
            end, start
        )));
    }
    let days = (end - start).num_days() + 1;
    if days > i64::from(max_days) {
        return Err(ScheduleError::invalid(format!(
            "range of {} days exceeds the maximum of {}",
            days, max_days
        )));
    }
    Ok(())
}

/// Accept durations in `[1, MAX_DURATION_MINUTES]`.
pub fn check_duration(minutes: u32) -> Result<u32> {
    if minutes == 0 || minutes > MAX_DURATION_MINUTES {
        return Err(ScheduleError::invalid(format!(
            "duration {} is outside 1..={} minutes",
            minutes, MAX_DURATION_MINUTES
        )));
    }
    Ok(minutes)
}

/// Serde adapter writing `NaiveTime` as `"HH:MM"`.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        super::parse_hhmm(&s).map_err(serde::de::Error::custom)
    }
}

/// [`hhmm`] for optional fields. Pair with `#[serde(default)]`.
pub mod hhmm_opt {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        time: &Option<NaiveTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match time {
            Some(t) => serializer.serialize_some(&t.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveTime>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|s| super::parse_hhmm(&s).map_err(serde::de::Error::custom))
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 2, 16)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn snap_up_rounds_to_next_boundary() {
        assert_eq!(snap_up(at(7, 0), 15), at(7, 0));
        assert_eq!(snap_up(at(7, 1), 15), at(7, 15));
        assert_eq!(snap_up(at(7, 50), 30), at(8, 0));
        assert_eq!(snap_up(at(23, 50), 15), at(23, 45) + Duration::minutes(15));
    }

    #[test]
    fn weekday_numbering_starts_on_sunday() {
        // 2026-02-15 is a Sunday, 2026-02-16 a Monday.
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2026, 2, 15).unwrap()), 0);
        assert_eq!(weekday_index(NaiveDate::from_ymd_opt(2026, 2, 16).unwrap()), 1);
        assert_eq!(weekday_from_index(6), Some(Weekday::Sat));
        assert_eq!(weekday_from_index(7), None);
    }

    #[test]
    fn parse_hhmm_accepts_optional_seconds() {
        assert_eq!(parse_hhmm("09:30").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(parse_hhmm("09:30:00").unwrap(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert!(parse_hhmm("9h30").is_err());
        assert!(parse_hhmm("25:00").is_err());
    }

    #[test]
    fn check_range_rejects_reversed_and_oversized() {
        let a = NaiveDate::from_ymd_opt(2026, 2, 16).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 2, 22).unwrap();
        assert!(check_range(a, b, 7).is_ok());
        assert!(check_range(b, a, 7).is_err());
        assert!(check_range(a, b, 6).is_err());
    }
}
