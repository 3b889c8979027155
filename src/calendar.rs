//! UTC calendar helpers shared by the jobs and the store layer.
//!
//! Every timestamp in the store is UTC text in [`TIMESTAMP_FORMAT`], so string
//! comparison in SQL orders the same way as the timestamps themselves.

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
}

/// Accepts either a full timestamp or a bare `YYYY-MM-DD` (midnight).
pub fn parse_date_or_timestamp(s: &str) -> Result<NaiveDateTime, String> {
    let s = s.trim();
    if let Ok(ts) = parse_timestamp(s) {
        return Ok(ts);
    }
    NaiveDate::parse_from_str(s, DATE_FORMAT)
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| format!("Invalid date '{}'. Please use YYYY-MM-DD.", s))
}

/// `[start_of_month, start_of_next_month)` for the month containing `now`.
pub fn month_window(now: DateTime<Utc>) -> (NaiveDateTime, NaiveDateTime) {
    let today = now.date_naive();
    let start = first_of_month(today.year(), today.month());
    let (next_year, next_month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    let end = first_of_month(next_year, next_month);
    (start.and_time(NaiveTime::MIN), end.and_time(NaiveTime::MIN))
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(NaiveDate::MIN)
}

pub fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_next = NaiveDate::from_ymd_opt(next_year, next_month, 1)?;
    Some((first_next - Duration::days(1)).day())
}

/// Moves `ts` to the next calendar month, keeping the time of day. The target
/// day is `preferred_day`, clamped to the last day of the target month.
pub fn add_month_clamped(ts: NaiveDateTime, preferred_day: u32) -> Option<NaiveDateTime> {
    let date = ts.date();
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    let day = preferred_day.clamp(1, days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day).map(|d| d.and_time(ts.time()))
}

/// First instant strictly after `after` whose UTC time of day is `at`.
pub fn next_fire_after(after: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let candidate = after.date_naive().and_time(at).and_utc();
    if candidate > after {
        candidate
    } else {
        candidate + Duration::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn test_month_window_mid_month() {
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 13, 45, 0).unwrap();
        let (start, end) = month_window(now);
        assert_eq!(start, ts(2024, 5, 1));
        assert_eq!(end, ts(2024, 6, 1));
    }

    #[test]
    fn test_month_window_december_rolls_year() {
        let now = Utc.with_ymd_and_hms(2024, 12, 31, 23, 59, 59).unwrap();
        let (start, end) = month_window(now);
        assert_eq!(start, ts(2024, 12, 1));
        assert_eq!(end, ts(2025, 1, 1));
    }

    #[test]
    fn test_days_in_month() {
        assert_eq!(days_in_month(2024, 2), Some(29));
        assert_eq!(days_in_month(2023, 2), Some(28));
        assert_eq!(days_in_month(2024, 4), Some(30));
        assert_eq!(days_in_month(2024, 12), Some(31));
    }

    #[test]
    fn test_add_month_clamps_to_short_month() {
        assert_eq!(add_month_clamped(ts(2024, 1, 31), 31), Some(ts(2024, 2, 29)));
        assert_eq!(add_month_clamped(ts(2023, 1, 31), 31), Some(ts(2023, 2, 28)));
        assert_eq!(add_month_clamped(ts(2024, 3, 31), 31), Some(ts(2024, 4, 30)));
    }

    #[test]
    fn test_add_month_restores_preferred_day() {
        assert_eq!(add_month_clamped(ts(2024, 2, 29), 31), Some(ts(2024, 3, 31)));
    }

    #[test]
    fn test_add_month_december_rollover_keeps_time() {
        let from = NaiveDate::from_ymd_opt(2024, 12, 15)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2025, 1, 15)
            .unwrap()
            .and_hms_opt(8, 30, 0)
            .unwrap();
        assert_eq!(add_month_clamped(from, 15), Some(expected));
    }

    #[test]
    fn test_next_fire_after_later_today() {
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 0, 2, 0).unwrap();
        let at = NaiveTime::from_hms_opt(0, 5, 0).unwrap();
        assert_eq!(
            next_fire_after(now, at),
            Utc.with_ymd_and_hms(2024, 5, 17, 0, 5, 0).unwrap()
        );
    }

    #[test]
    fn test_next_fire_after_is_strictly_later() {
        let now = Utc.with_ymd_and_hms(2024, 5, 17, 0, 0, 0).unwrap();
        assert_eq!(
            next_fire_after(now, NaiveTime::MIN),
            Utc.with_ymd_and_hms(2024, 5, 18, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_parse_date_or_timestamp() {
        assert_eq!(parse_date_or_timestamp("2024-03-05").unwrap(), ts(2024, 3, 5));
        assert_eq!(
            parse_date_or_timestamp("2024-03-05 10:11:12").unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap().and_hms_opt(10, 11, 12).unwrap()
        );
        assert!(parse_date_or_timestamp("05/03/2024").unwrap_err().contains("Invalid date"));
    }
}
