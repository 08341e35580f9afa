use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use chronoshift_core::{Dataset, Granularity, MonthPeriod};

use crate::errors::EngineError;

/// A calendar boundary in one of the two unit families the engine maps in:
/// whole days or whole months.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boundary {
    Day(NaiveDate),
    Month(MonthPeriod),
}

impl Boundary {
    /// Unit ordinal of this boundary, validated against the dataset
    /// granularity it is applied to.
    pub fn unit(&self, granularity: Granularity) -> Result<i64, EngineError> {
        match (self, granularity) {
            (Boundary::Day(date), Granularity::Date | Granularity::DateTime) => {
                Ok(i64::from(date.num_days_from_ce()))
            }
            (Boundary::Month(period), Granularity::MonthPeriod) => Ok(i64::from(period.ordinal())),
            _ => Err(EngineError::BoundaryMismatch { granularity }),
        }
    }
}

impl fmt::Display for Boundary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Boundary::Day(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            Boundary::Month(period) => write!(f, "{period}"),
        }
    }
}

/// Target (start, end) window a dataset is rebased onto.
#[derive(Debug, Clone, Copy)]
pub struct TargetWindow {
    pub start: Boundary,
    pub end: Boundary,
}

impl TargetWindow {
    pub fn new(start: Boundary, end: Boundary) -> Self {
        Self { start, end }
    }

    /// (start, end) unit ordinals; the window must not be inverted.
    pub fn units(&self, granularity: Granularity) -> Result<(i64, i64), EngineError> {
        let start = self.start.unit(granularity)?;
        let end = self.end.unit(granularity)?;
        if end < start {
            return Err(EngineError::EmptyWindow);
        }
        Ok((start, end))
    }
}

/// Options for one extension operation on one table.
#[derive(Debug, Clone)]
pub struct ExtendOptions {
    /// Dataset kind, used to look up derived-field rules.
    pub kind: String,
    /// Boundary the series must reach (inclusive).
    pub target_end: Boundary,
    /// Records per missing unit; defaults to the historical average.
    pub records_per_unit: Option<f64>,
    /// Grouping field for per-entity series (e.g. a subscriber key).
    pub scope_field: Option<String>,
    /// Fraction of known entities resampled per unit in scoped mode.
    pub entity_fraction: (f64, f64),
}

impl ExtendOptions {
    pub fn new(kind: &str, target_end: Boundary) -> Self {
        Self {
            kind: kind.to_string(),
            target_end,
            records_per_unit: None,
            scope_field: None,
            entity_fraction: (0.7, 0.9),
        }
    }
}

/// Audit summary of one rebase operation.
#[derive(Debug, Clone, Serialize)]
pub struct RebaseReport {
    pub granularity: Granularity,
    pub records: u64,
    pub derived_recomputed: u64,
    pub old_min: String,
    pub old_max: String,
    pub new_min: String,
    pub new_max: String,
}

/// Audit summary of one extension operation.
#[derive(Debug, Clone, Serialize)]
pub struct ExtendReport {
    pub granularity: Granularity,
    /// True when the series already reached the target (no-op).
    pub already_current: bool,
    /// Missing units that were filled.
    pub units_added: u64,
    pub records_added: u64,
    /// Entity/unit pairs skipped because their scope had no templates.
    pub skipped_scopes: u64,
    pub first_new_identifier: Option<i64>,
    pub last_new_identifier: Option<i64>,
    pub new_max: String,
}

/// Granularity implied by the dataset's declared primary timestamp field.
pub(crate) fn dataset_granularity(dataset: &Dataset) -> Result<Granularity, EngineError> {
    let field = dataset.timestamp_field()?;
    Granularity::for_type(field.field_type).ok_or_else(|| EngineError::ValueKind {
        field: field.name.clone(),
        expected: "date, datetime or month",
        found: "non-temporal type",
    })
}
