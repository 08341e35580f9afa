use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A whole calendar month, stored as a month ordinal (`year * 12 + month0`).
///
/// Ordinals make month arithmetic and affine mapping trivial: consecutive
/// months differ by exactly 1 regardless of year boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthPeriod {
    ordinal: i32,
}

impl MonthPeriod {
    pub fn from_ymd(year: i32, month: u32) -> Option<Self> {
        if !(1..=12).contains(&month) {
            return None;
        }
        Some(Self {
            ordinal: year * 12 + (month as i32 - 1),
        })
    }

    pub fn from_ordinal(ordinal: i32) -> Self {
        Self { ordinal }
    }

    pub fn ordinal(&self) -> i32 {
        self.ordinal
    }

    pub fn year(&self) -> i32 {
        self.ordinal.div_euclid(12)
    }

    pub fn month(&self) -> u32 {
        (self.ordinal.rem_euclid(12) + 1) as u32
    }
}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for MonthPeriod {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidPeriod(raw.to_string());
        let (year, month) = raw.split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        Self::from_ymd(year, month).ok_or_else(invalid)
    }
}

impl TryFrom<String> for MonthPeriod {
    type Error = Error;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        raw.parse()
    }
}

impl From<MonthPeriod> for String {
    fn from(period: MonthPeriod) -> Self {
        period.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_labels() {
        let period: MonthPeriod = "2025-12".parse().expect("valid period");
        assert_eq!(period.year(), 2025);
        assert_eq!(period.month(), 12);
        assert_eq!(period.to_string(), "2025-12");
    }

    #[test]
    fn ordinal_arithmetic_crosses_year_boundary() {
        let december: MonthPeriod = "2025-12".parse().expect("valid period");
        assert_eq!(
            MonthPeriod::from_ordinal(december.ordinal() + 1).to_string(),
            "2026-01"
        );
    }

    #[test]
    fn rejects_malformed_labels() {
        assert!("2025-13".parse::<MonthPeriod>().is_err());
        assert!("2025".parse::<MonthPeriod>().is_err());
        assert!("jan-2025".parse::<MonthPeriod>().is_err());
    }

    #[test]
    fn ordinal_round_trip() {
        let period = MonthPeriod::from_ymd(2026, 2).expect("valid month");
        assert_eq!(MonthPeriod::from_ordinal(period.ordinal()), period);
    }
}
