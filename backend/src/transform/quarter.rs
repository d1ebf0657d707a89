//! Fiscal quarter and the date range it covers.
//!
//! | Quarter | Start      | End        |
//! |---------|------------|------------|
//! | Q1      | YYYY-01-01 | YYYY-03-31 |
//! | Q2      | YYYY-04-01 | YYYY-06-30 |
//! | Q3      | YYYY-07-01 | YYYY-09-30 |
//! | Q4      | YYYY-10-01 | YYYY-12-31 |

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::category::CategoryColumn;
use crate::error::{DataloadError, DataloadResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    pub const ALL: [Quarter; 4] = [Quarter::Q1, Quarter::Q2, Quarter::Q3, Quarter::Q4];

    pub fn from_number(n: u32) -> Option<Self> {
        match n {
            1 => Some(Quarter::Q1),
            2 => Some(Quarter::Q2),
            3 => Some(Quarter::Q3),
            4 => Some(Quarter::Q4),
            _ => None,
        }
    }

    pub fn number(self) -> u32 {
        match self {
            Quarter::Q1 => 1,
            Quarter::Q2 => 2,
            Quarter::Q3 => 3,
            Quarter::Q4 => 4,
        }
    }

    /// (month, day) pairs for the first and last day.
    fn bounds(self) -> ((u32, u32), (u32, u32)) {
        match self {
            Quarter::Q1 => ((1, 1), (3, 31)),
            Quarter::Q2 => ((4, 1), (6, 30)),
            Quarter::Q3 => ((7, 1), (9, 30)),
            Quarter::Q4 => ((10, 1), (12, 31)),
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.number())
    }
}

/// Accepts `Q3`, `q3` or `3`.
impl FromStr for Quarter {
    type Err = DataloadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix('Q')
            .or_else(|| trimmed.strip_prefix('q'))
            .unwrap_or(trimmed);

        digits
            .parse::<u32>()
            .ok()
            .and_then(Quarter::from_number)
            .ok_or_else(|| DataloadError::InvalidQuarter(s.to_string()))
    }
}

/// Inclusive date range of one quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub year: i32,
    pub quarter: Quarter,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn for_quarter(year: i32, quarter: Quarter) -> DataloadResult<Self> {
        let ((sm, sd), (em, ed)) = quarter.bounds();
        let invalid = || DataloadError::InvalidQuarter(format!("{} {}", quarter, year));

        Ok(Self {
            year,
            quarter,
            start: NaiveDate::from_ymd_opt(year, sm, sd).ok_or_else(invalid)?,
            end: NaiveDate::from_ymd_opt(year, em, ed).ok_or_else(invalid)?,
        })
    }

    /// `YYYY-MM-DD`
    pub fn start_date(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    /// `YYYY-MM-DD`
    pub fn end_date(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({} → {})",
            self.quarter,
            self.year,
            self.start_date(),
            self.end_date()
        )
    }
}

/// Where the dataload dates come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateSource {
    /// Year and quarter parsed from the category column header.
    #[default]
    FromColumn,
    /// Quarter picked by the user; year defaults to the current year.
    Explicit { quarter: Quarter, year: Option<i32> },
}

impl DateSource {
    pub fn resolve(&self, column: &CategoryColumn) -> DataloadResult<DateRange> {
        match *self {
            DateSource::FromColumn => DateRange::for_quarter(column.year, column.quarter),
            DateSource::Explicit { quarter, year } => {
                DateRange::for_quarter(year.unwrap_or_else(current_year), quarter)
            }
        }
    }
}

/// Calendar year on the local clock.
pub fn current_year() -> i32 {
    chrono::Local::now().year()
}
