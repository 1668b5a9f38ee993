//! Trigger policies.

use chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};

use crate::vcs::BranchFilter;
use crate::{Error, Result};

/// What starts a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Trigger {
    /// Triggered by new commits on matching branches.
    Vcs { branch_filter: BranchFilter },
    /// Triggered at a fixed time of day.
    Schedule(ScheduleTrigger),
}

impl Trigger {
    pub fn branch_filter(&self) -> &BranchFilter {
        match self {
            Trigger::Vcs { branch_filter } => branch_filter,
            Trigger::Schedule(schedule) => &schedule.branch_filter,
        }
    }
}

/// A daily (or weekly, when `weekday` is set) schedule in UTC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTrigger {
    pub hour: u32,
    pub minute: u32,
    pub weekday: Option<Weekday>,
    pub branch_filter: BranchFilter,
}

impl ScheduleTrigger {
    pub fn new(
        hour: u32,
        minute: u32,
        weekday: Option<Weekday>,
        branch_filter: BranchFilter,
    ) -> Result<Self> {
        if hour > 23 {
            return Err(Error::configuration(format!(
                "schedule hour {} is out of range 0-23",
                hour
            )));
        }
        if minute > 59 {
            return Err(Error::configuration(format!(
                "schedule minute {} is out of range 0-59",
                minute
            )));
        }
        Ok(Self {
            hour,
            minute,
            weekday,
            branch_filter,
        })
    }

    /// The first firing instant strictly after `after`.
    ///
    /// Returns `None` if the hour or minute is out of range.
    pub fn next_after(&self, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let time = NaiveTime::from_hms_opt(self.hour, self.minute, 0)?;
        let mut date = after.date_naive();
        if date.and_time(time).and_utc() <= after {
            date = date.succ_opt()?;
        }
        if let Some(weekday) = self.weekday {
            while date.weekday() != weekday {
                date = date.succ_opt()?;
            }
        }
        Some(date.and_time(time).and_utc())
    }
}

impl std::fmt::Display for ScheduleTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.weekday {
            Some(day) => write!(f, "weekly on {} at {:02}:{:02} UTC", day, self.hour, self.minute),
            None => write!(f, "daily at {:02}:{:02} UTC", self.hour, self.minute),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn test_daily_later_today() {
        let schedule = ScheduleTrigger::new(9, 30, None, BranchFilter::all()).unwrap();
        assert_eq!(
            schedule.next_after(at(2024, 12, 2, 8, 0)),
            Some(at(2024, 12, 2, 9, 30))
        );
    }

    #[test]
    fn test_daily_rolls_to_tomorrow() {
        let schedule = ScheduleTrigger::new(9, 30, None, BranchFilter::all()).unwrap();
        assert_eq!(
            schedule.next_after(at(2024, 12, 2, 9, 30)),
            Some(at(2024, 12, 3, 9, 30))
        );
        assert_eq!(
            schedule.next_after(at(2024, 12, 31, 23, 0)),
            Some(at(2025, 1, 1, 9, 30))
        );
    }

    #[test]
    fn test_weekly() {
        // 2024-12-02 is a Monday.
        let schedule =
            ScheduleTrigger::new(6, 0, Some(Weekday::Sat), BranchFilter::all()).unwrap();
        assert_eq!(
            schedule.next_after(at(2024, 12, 2, 12, 0)),
            Some(at(2024, 12, 7, 6, 0))
        );
        assert_eq!(
            schedule.next_after(at(2024, 12, 7, 6, 0)),
            Some(at(2024, 12, 14, 6, 0))
        );
    }

    #[test]
    fn test_out_of_range() {
        assert!(ScheduleTrigger::new(24, 0, None, BranchFilter::all()).is_err());
        assert!(ScheduleTrigger::new(0, 60, None, BranchFilter::all()).is_err());
    }
}
