//! Weekly series cadence, inclusive date ranges and break notes.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Days between consecutive occurrences of a series.
pub const SERIES_CADENCE_DAYS: i64 = 7;

/// `count` dates starting at `first`, one week apart.
pub fn weekly_dates(first: NaiveDate, count: usize) -> Vec<NaiveDate> {
    (0..count)
        .map(|step| first + Duration::days(SERIES_CADENCE_DAYS * step as i64))
        .collect()
}

/// An inclusive `[start, end]` range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, CoreError> {
        if start > end {
            return Err(CoreError::Validation(format!(
                "start_date ({start}) must not be after end_date ({end})"
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Status note shown on every enrollment of a break, e.g. `on break till Jan 05, 2024`.
pub fn break_note(until: NaiveDate) -> String {
    format!("on break till {}", until.format("%b %d, %Y"))
}
