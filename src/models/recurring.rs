use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Duration, NaiveDateTime};

use crate::calendar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frequency {
    Daily,
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }

    /// The due instant one period after `from`. Monthly schedules land on
    /// `anchor_day`, clamped to the length of the target month.
    pub fn advance(self, from: NaiveDateTime, anchor_day: Option<u32>) -> Option<NaiveDateTime> {
        match self {
            Frequency::Daily => from.checked_add_signed(Duration::days(1)),
            Frequency::Weekly => from.checked_add_signed(Duration::days(7)),
            Frequency::Monthly => {
                calendar::add_month_clamped(from, anchor_day.unwrap_or_else(|| from.day()))
            }
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            other => Err(format!(
                "Invalid frequency '{}'. Use 'daily', 'weekly' or 'monthly'.",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecurringSchedule {
    pub id: i64,
    pub expense_id: i64,
    pub frequency: Frequency,
    pub next_due: NaiveDateTime,
    pub anchor_day: Option<u32>,
}

impl RecurringSchedule {
    /// Next due instant after the current one fires. Always strictly later.
    pub fn following_due(&self) -> Option<NaiveDateTime> {
        self.frequency
            .advance(self.next_due, self.anchor_day)
            .filter(|next| *next > self.next_due)
    }
}

/// A schedule row exactly as stored, before validation.
#[derive(Debug, Clone)]
pub struct ScheduleRecord {
    pub id: i64,
    pub expense_id: i64,
    pub frequency: String,
    pub next_due: String,
    pub anchor_day: Option<i64>,
}

impl TryFrom<ScheduleRecord> for RecurringSchedule {
    type Error = String;

    fn try_from(record: ScheduleRecord) -> Result<Self, Self::Error> {
        let frequency = record.frequency.parse::<Frequency>()?;
        let next_due = calendar::parse_timestamp(&record.next_due)
            .map_err(|e| format!("invalid next_due '{}': {}", record.next_due, e))?;
        let anchor_day = match record.anchor_day {
            None => None,
            Some(day @ 1..=31) => Some(day as u32),
            Some(day) => return Err(format!("invalid anchor day {}", day)),
        };
        Ok(RecurringSchedule {
            id: record.id,
            expense_id: record.expense_id,
            frequency,
            next_due,
            anchor_day,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn schedule(frequency: Frequency, next_due: NaiveDateTime, anchor_day: Option<u32>) -> RecurringSchedule {
        RecurringSchedule {
            id: 1,
            expense_id: 1,
            frequency,
            next_due,
            anchor_day,
        }
    }

    #[test]
    fn test_daily_advances_one_day() {
        let s = schedule(Frequency::Daily, at(2024, 2, 28), None);
        assert_eq!(s.following_due(), Some(at(2024, 2, 29)));
    }

    #[test]
    fn test_weekly_advances_seven_days() {
        let s = schedule(Frequency::Weekly, at(2024, 12, 28), None);
        assert_eq!(s.following_due(), Some(at(2025, 1, 4)));
    }

    #[test]
    fn test_monthly_jan_31_clamps_to_leap_february() {
        let s = schedule(Frequency::Monthly, at(2024, 1, 31), Some(31));
        assert_eq!(s.following_due(), Some(at(2024, 2, 29)));
    }

    #[test]
    fn test_monthly_jan_31_clamps_to_february() {
        let s = schedule(Frequency::Monthly, at(2023, 1, 31), Some(31));
        assert_eq!(s.following_due(), Some(at(2023, 2, 28)));
    }

    #[test]
    fn test_monthly_without_anchor_uses_current_day() {
        let s = schedule(Frequency::Monthly, at(2024, 2, 29), None);
        assert_eq!(s.following_due(), Some(at(2024, 3, 29)));
    }

    #[test]
    fn test_monthly_anchor_survives_short_month() {
        let s = schedule(Frequency::Monthly, at(2024, 2, 29), Some(31));
        assert_eq!(s.following_due(), Some(at(2024, 3, 31)));
    }

    #[test]
    fn test_monthly_december_rollover() {
        let s = schedule(Frequency::Monthly, at(2024, 12, 15), Some(15));
        assert_eq!(s.following_due(), Some(at(2025, 1, 15)));
    }

    #[test]
    fn test_frequency_parse() {
        assert_eq!("Weekly".parse::<Frequency>(), Ok(Frequency::Weekly));
        assert!("yearly".parse::<Frequency>().unwrap_err().contains("Invalid frequency"));
    }

    #[test]
    fn test_record_with_bad_frequency_is_rejected() {
        let record = ScheduleRecord {
            id: 4,
            expense_id: 2,
            frequency: "fortnightly".to_string(),
            next_due: "2024-01-01 00:00:00".to_string(),
            anchor_day: None,
        };
        assert!(RecurringSchedule::try_from(record).is_err());
    }

    #[test]
    fn test_record_with_bad_timestamp_is_rejected() {
        let record = ScheduleRecord {
            id: 4,
            expense_id: 2,
            frequency: "daily".to_string(),
            next_due: "tomorrow".to_string(),
            anchor_day: None,
        };
        let err = RecurringSchedule::try_from(record).unwrap_err();
        assert!(err.contains("invalid next_due"));
    }
}
