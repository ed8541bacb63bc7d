//! Conversion between calendar weekdays and the alarm's weekday markers.
//!
//! Alarms store the days they repeat on as small integers where
//! `0` is Monday and `6` is Sunday. Everything that needs to know
//! "which marker is today" goes through this module.

use chrono::{Datelike, NaiveDateTime, Weekday};

/// number of distinct weekday markers
pub const DAYS_IN_WEEK: u8 = 7;

/// marker for a chrono weekday (Monday = 0 .. Sunday = 6)
#[must_use]
pub fn to_marker(day: Weekday) -> u8 {
    // always < 7
    day.num_days_from_monday() as u8
}

/// inverse of [`to_marker`], `None` for markers outside 0..=6
#[must_use]
pub fn from_marker(marker: u8) -> Option<Weekday> {
    match marker {
        0 => Some(Weekday::Mon),
        1 => Some(Weekday::Tue),
        2 => Some(Weekday::Wed),
        3 => Some(Weekday::Thu),
        4 => Some(Weekday::Fri),
        5 => Some(Weekday::Sat),
        6 => Some(Weekday::Sun),
        _ => None,
    }
}

/// marker for a platform calendar weekday number where Sunday = 1 .. Saturday = 7
#[must_use]
pub fn from_calendar_number(number: u32) -> Option<u8> {
    if !(1..=7).contains(&number) {
        return None;
    }
    // Sunday (1) -> 6, Monday (2) -> 0, ..., Saturday (7) -> 5
    Some(((number + 5) % 7) as u8)
}

/// platform calendar weekday number (Sunday = 1 .. Saturday = 7) for a marker
#[must_use]
pub fn to_calendar_number(marker: u8) -> Option<u32> {
    (marker < DAYS_IN_WEEK).then(|| (u32::from(marker) + 1) % 7 + 1)
}

/// marker for the day `now` falls on
#[must_use]
pub fn today(now: NaiveDateTime) -> u8 {
    to_marker(now.weekday())
}

/// short name used in listings
#[must_use]
pub fn short_name(marker: u8) -> &'static str {
    match marker {
        0 => "Mon",
        1 => "Tue",
        2 => "Wed",
        3 => "Thu",
        4 => "Fri",
        5 => "Sat",
        6 => "Sun",
        _ => "?",
    }
}

/// parses `mon`, `Tuesday`, `3`, ... into a marker
#[must_use]
pub fn parse(input: &str) -> Option<u8> {
    let input = input.trim();
    if let Ok(marker) = input.parse::<u8>() {
        return (marker < DAYS_IN_WEEK).then_some(marker);
    }
    input.parse::<Weekday>().ok().map(to_marker)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn monday_is_zero_sunday_is_six() {
        assert_eq!(to_marker(Weekday::Mon), 0);
        assert_eq!(to_marker(Weekday::Wed), 2);
        assert_eq!(to_marker(Weekday::Sun), 6);
    }

    #[test]
    fn marker_roundtrips_through_weekday() {
        for marker in 0..DAYS_IN_WEEK {
            assert_eq!(from_marker(marker).map(to_marker), Some(marker));
        }
        assert_eq!(from_marker(7), None);
    }

    #[test]
    fn calendar_numbers_start_on_sunday() {
        assert_eq!(from_calendar_number(1), Some(6));
        assert_eq!(from_calendar_number(2), Some(0));
        assert_eq!(from_calendar_number(4), Some(2));
        assert_eq!(from_calendar_number(7), Some(5));
        assert_eq!(from_calendar_number(0), None);
        assert_eq!(from_calendar_number(8), None);
    }

    #[test]
    fn calendar_number_is_inverse() {
        for number in 1..=7 {
            let marker = from_calendar_number(number).unwrap();
            assert_eq!(to_calendar_number(marker), Some(number));
        }
        assert_eq!(to_calendar_number(7), None);
    }

    #[test]
    fn today_uses_the_local_date() {
        // 2024-01-01 was a Monday
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(23, 59, 59)
            .unwrap();
        assert_eq!(today(monday), 0);
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(today(sunday), 6);
    }

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!(parse("mon"), Some(0));
        assert_eq!(parse("Sunday"), Some(6));
        assert_eq!(parse(" 4 "), Some(4));
        assert_eq!(parse("9"), None);
        assert_eq!(parse("someday"), None);
    }
}
