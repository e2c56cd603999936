//! Calendar months used as observation periods and delinquency snapshots

use super::FORWARD_MONTHS;
use crate::error::{MonitoringError, Result};
use chrono::{Datelike, NaiveDate};
use std::fmt;
use std::str::FromStr;

/// A calendar month
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct YearMonth {
    year: i32,
    month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// Parse an observation period label, `YYYY.MM`
    pub fn parse_period(label: &str) -> Result<Self> {
        let bad = || {
            MonitoringError::config(format!(
                "invalid observation period '{}' (expected YYYY.MM)",
                label
            ))
        };
        let (y, m) = label.trim().split_once('.').ok_or_else(bad)?;
        if y.len() != 4 || m.len() != 2 {
            return Err(bad());
        }
        let year = y.parse().map_err(|_| bad())?;
        let month = m.parse().map_err(|_| bad())?;
        Self::new(year, month).ok_or_else(bad)
    }

    /// Parse a delinquency snapshot label, `MMYY` (years 2000-2099)
    pub fn parse_mmyy(label: &str) -> Result<Self> {
        let label = label.trim();
        let bad = || {
            MonitoringError::config(format!(
                "invalid delinquency month '{}' (expected MMYY)",
                label
            ))
        };
        if label.len() != 4 || !label.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad());
        }
        let month: u32 = label[..2].parse().map_err(|_| bad())?;
        let yy: i32 = label[2..].parse().map_err(|_| bad())?;
        Self::new(2000 + yy, month).ok_or_else(bad)
    }

    /// `YYYY.MM`, used for sheet names and month columns
    pub fn label(&self) -> String {
        format!("{:04}.{:02}", self.year, self.month)
    }

    /// `MMYY`, used in delinquency file names
    pub fn mmyy(&self) -> String {
        format!("{:02}{:02}", self.month, self.year.rem_euclid(100))
    }

    pub fn plus_months(&self, n: u32) -> Self {
        let zero_based = self.year * 12 + (self.month as i32 - 1) + n as i32;
        Self {
            year: zero_based.div_euclid(12),
            month: zero_based.rem_euclid(12) as u32 + 1,
        }
    }

    /// The months observed after this period, in calendar order
    pub fn forward_window(&self) -> [YearMonth; FORWARD_MONTHS] {
        std::array::from_fn(|i| self.plus_months(i as u32 + 1))
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for YearMonth {
    type Err = MonitoringError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_period(s)
    }
}
