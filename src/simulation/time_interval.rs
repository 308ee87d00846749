use chrono::{Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::{ModelError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Year,
}

/// A period duration: `every` whole units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeInterval {
    pub every: u32,
    pub unit: TimeUnit,
}

impl TimeInterval {
    pub fn days(every: u32) -> Self {
        Self {
            every,
            unit: TimeUnit::Day,
        }
    }

    pub fn weeks(every: u32) -> Self {
        Self {
            every,
            unit: TimeUnit::Week,
        }
    }

    pub fn months(every: u32) -> Self {
        Self {
            every,
            unit: TimeUnit::Month,
        }
    }

    pub fn years(every: u32) -> Self {
        Self {
            every,
            unit: TimeUnit::Year,
        }
    }

    pub fn monthly() -> Self {
        Self::months(1)
    }

    pub fn is_monthly(&self) -> bool {
        self.every == 1 && self.unit == TimeUnit::Month
    }

    /// Rejects zero-length intervals.
    pub fn validate(&self) -> Result<()> {
        if self.every == 0 {
            return Err(ModelError::InvalidConfiguration(format!(
                "period duration must be positive, got `{}`",
                self.label()
            )));
        }
        Ok(())
    }

    pub fn next_date(&self, from: NaiveDate) -> NaiveDate {
        self.offset(from, 1)
    }

    /// Date `steps` intervals after `from`, computed in one jump so month ends
    /// clamp once instead of drifting (Jan 31 + 2 months is Mar 31).
    pub fn offset(&self, from: NaiveDate, steps: u32) -> NaiveDate {
        let count = u64::from(self.every) * u64::from(steps);
        let shifted = match self.unit {
            TimeUnit::Day => from.checked_add_days(Days::new(count)),
            TimeUnit::Week => count
                .checked_mul(7)
                .and_then(|days| from.checked_add_days(Days::new(days))),
            TimeUnit::Month => u32::try_from(count)
                .ok()
                .and_then(|months| from.checked_add_months(Months::new(months))),
            TimeUnit::Year => count
                .checked_mul(12)
                .and_then(|months| u32::try_from(months).ok())
                .and_then(|months| from.checked_add_months(Months::new(months))),
        };
        shifted.unwrap_or(NaiveDate::MAX)
    }

    pub fn label(&self) -> String {
        match (self.every, &self.unit) {
            (1, TimeUnit::Day) => "Daily".into(),
            (1, TimeUnit::Week) => "Weekly".into(),
            (1, TimeUnit::Month) => "Monthly".into(),
            (1, TimeUnit::Year) => "Yearly".into(),
            (n, unit) => format!("Every {} {:?}{}", n, unit, if n > 1 { "s" } else { "" }),
        }
    }
}

impl Default for TimeInterval {
    fn default() -> Self {
        Self::monthly()
    }
}
