// src/pipeline/windows.rs

//! Crawl window planning.
//!
//! Decomposes a day range into consecutive fixed-length windows. Every
//! calendar day is partitioned into `interval_minutes` blocks starting at
//! 00:00:00; the final block of each day is truncated to end at 23:59:59,
//! so the per-day union is exactly `[00:00:00, 23:59:59]` with no gap or
//! overlap. Window bounds carry the configured fixed offset.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

use crate::error::{AppError, Result};
use crate::models::TimeWindow;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// A validated plan for the crawl windows of one run.
///
/// The plan itself is cheap; windows are produced lazily by [`WindowPlan::iter`],
/// and every fresh iteration yields the identical sequence.
#[derive(Debug, Clone)]
pub struct WindowPlan {
    start_day: NaiveDate,
    end_day: NaiveDate,
    interval_minutes: u32,
    offset: FixedOffset,
}

impl WindowPlan {
    /// Create a plan covering every day from `start_day` to `end_day` inclusive.
    pub fn new(
        start_day: NaiveDate,
        end_day: NaiveDate,
        interval_minutes: u32,
        offset: FixedOffset,
    ) -> Result<Self> {
        if interval_minutes == 0 || interval_minutes > MINUTES_PER_DAY {
            return Err(AppError::validation(format!(
                "interval_minutes must be in 1..={MINUTES_PER_DAY}, got {interval_minutes}"
            )));
        }
        if start_day > end_day {
            return Err(AppError::validation(format!(
                "start day {start_day} is after end day {end_day}"
            )));
        }
        Ok(Self {
            start_day,
            end_day,
            interval_minutes,
            offset,
        })
    }

    /// Iterate the plan's windows in chronological order.
    pub fn iter(&self) -> Windows {
        Windows {
            plan: self.clone(),
            day: self.start_day,
            minute: 0,
            done: false,
        }
    }

    fn localize(&self, naive: NaiveDateTime) -> DateTime<FixedOffset> {
        self.offset
            .from_local_datetime(&naive)
            .single()
            .expect("fixed offsets map local times uniquely")
    }
}

/// Lazy iterator over a plan's windows.
#[derive(Debug, Clone)]
pub struct Windows {
    plan: WindowPlan,
    day: NaiveDate,
    minute: u32,
    done: bool,
}

impl Iterator for Windows {
    type Item = TimeWindow;

    fn next(&mut self) -> Option<TimeWindow> {
        if self.done || self.day > self.plan.end_day {
            return None;
        }

        let start_minute = self.minute;
        let end_minute = (start_minute + self.plan.interval_minutes).min(MINUTES_PER_DAY);

        let since_time = NaiveTime::from_num_seconds_from_midnight_opt(start_minute * 60, 0)
            .expect("window start is within the day");
        // The day's last window ends at 23:59:59, whatever its length.
        let until_time = NaiveTime::from_num_seconds_from_midnight_opt(end_minute * 60 - 1, 0)
            .expect("window end is within the day");

        let since = self.plan.localize(self.day.and_time(since_time));
        let until = self.plan.localize(self.day.and_time(until_time));

        if end_minute == MINUTES_PER_DAY {
            match self.day.succ_opt() {
                Some(next_day) => {
                    self.day = next_day;
                    self.minute = 0;
                }
                None => self.done = true,
            }
        } else {
            self.minute = end_minute;
        }

        Some(TimeWindow::new(since, until))
    }
}

/// Parse a day from a date (`2024-01-01`) or RFC 3339 timestamp argument.
pub fn parse_day(input: &str) -> Result<NaiveDate> {
    if let Ok(day) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(day);
    }
    DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.date_naive())
        .map_err(|_| {
            AppError::validation(format!(
                "{input:?} is not a date (YYYY-MM-DD) or RFC 3339 timestamp"
            ))
        })
}
