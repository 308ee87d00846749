use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::time_interval::TimeInterval;
use crate::errors::{ModelError, Result};

/// Discrete simulation time: a start date stepped forward one period at a time.
///
/// Period dates are always derived from the start anchor, so a clock started on
/// Jan 31 with a monthly period visits Feb 29, Mar 31, Apr 30, and so on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "ClockData")]
pub struct Clock {
    name: String,
    start: NaiveDate,
    period: TimeInterval,
    #[serde(default)]
    period_ix: u32,
}

#[derive(Deserialize)]
struct ClockData {
    name: String,
    start: NaiveDate,
    period: TimeInterval,
    #[serde(default)]
    period_ix: u32,
}

impl TryFrom<ClockData> for Clock {
    type Error = ModelError;

    fn try_from(data: ClockData) -> Result<Self> {
        let mut clock = Clock::new(data.name, data.start, data.period)?;
        clock.period_ix = data.period_ix;
        Ok(clock)
    }
}

impl Clock {
    /// Fails with `InvalidConfiguration` when the period duration is zero.
    pub fn new(name: impl Into<String>, start: NaiveDate, period: TimeInterval) -> Result<Self> {
        period.validate()?;
        Ok(Self {
            name: name.into(),
            start,
            period,
            period_ix: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn period(&self) -> TimeInterval {
        self.period
    }

    /// Zero-based index of the current period.
    pub fn period_ix(&self) -> u32 {
        self.period_ix
    }

    /// Advances by one period. There is no way to step backwards other than
    /// [`Clock::reset`].
    pub fn tick(&mut self) {
        self.period_ix = self.period_ix.saturating_add(1);
    }

    /// Date of the current period.
    pub fn get_date(&self) -> NaiveDate {
        self.date_at(self.period_ix)
    }

    pub fn date_at(&self, period_ix: u32) -> NaiveDate {
        self.period.offset(self.start, period_ix)
    }

    /// Index of the first period dated on or after `date`.
    pub fn first_period_on_or_after(&self, date: NaiveDate) -> u32 {
        if date <= self.start {
            return 0;
        }
        // `date_at` is non-decreasing: gallop to an upper bound, then bisect.
        // Invariant: date_at(lo) < date <= date_at(hi).
        let mut hi: u32 = 1;
        while self.date_at(hi) < date {
            if hi == u32::MAX {
                return u32::MAX;
            }
            hi = hi.saturating_mul(2);
        }
        let mut lo = hi / 2;
        while hi - lo > 1 {
            let mid = lo + (hi - lo) / 2;
            if self.date_at(mid) < date {
                lo = mid;
            } else {
                hi = mid;
            }
        }
        hi
    }

    /// Index of the last period dated on or before `date`, if any.
    pub fn last_period_on_or_before(&self, date: NaiveDate) -> Option<u32> {
        if date < self.start {
            return None;
        }
        let first_after = self.first_period_on_or_after(date);
        if self.date_at(first_after) == date {
            Some(first_after)
        } else {
            first_after.checked_sub(1)
        }
    }

    pub fn reset(&mut self) {
        self.period_ix = 0;
    }
}
