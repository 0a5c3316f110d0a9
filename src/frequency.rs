use chrono::{Duration, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Records the recurrence of an expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

#[derive(Error, Debug, Eq, PartialEq)]
#[error("unknown frequency '{0}'")]
pub struct ParseFrequencyError(String);

impl Frequency {
    /// Returns the number of calendar months this frequency advances by, or `None`
    /// for frequencies measured in days.
    fn months(self) -> Option<u32> {
        match self {
            Frequency::Weekly => None,
            Frequency::Monthly => Some(1),
            Frequency::Quarterly => Some(3),
            Frequency::Yearly => Some(12),
        }
    }

    /// Returns the occurrence following `date`.
    ///
    /// Month based frequencies keep the day of month where they can. Where the target
    /// month is shorter (e.g. 31 January + 1 month), the date is clamped to the last
    /// day of that month. The result is always strictly later than `date`; `None` is
    /// only returned at the end of the representable calendar.
    pub fn next_date(self, date: NaiveDate) -> Option<NaiveDate> {
        match self.months() {
            Some(months) => date.checked_add_months(Months::new(months)),
            None => date.checked_add_signed(Duration::weeks(1)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Yearly => "yearly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Frequency {
    type Err = ParseFrequencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "weekly" => Ok(Frequency::Weekly),
            "monthly" => Ok(Frequency::Monthly),
            "quarterly" => Ok(Frequency::Quarterly),
            "yearly" | "annually" => Ok(Frequency::Yearly),
            _ => Err(ParseFrequencyError(s.to_owned())),
        }
    }
}
