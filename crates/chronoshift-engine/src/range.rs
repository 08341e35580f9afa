use chrono::{Datelike, NaiveDate};

use chronoshift_core::{Granularity, MonthPeriod, Value};

/// Affine map from a source unit-ordinal range onto a target range.
///
/// Units are days since CE for `Date`/`DateTime` and month ordinals for
/// `MonthPeriod`. The map is exact at both endpoints and monotonic
/// non-decreasing everywhere; intermediate points round half-up in unit
/// space, so month granularity never produces a partial month.
#[derive(Debug, Clone, Copy)]
pub struct RangeMapper {
    source_min: i64,
    source_span: i64,
    target_start: i64,
    target_span: i64,
}

impl RangeMapper {
    /// A degenerate source range (min == max) is widened to one unit so the
    /// whole input collapses onto `target_start`; it is not an error.
    pub fn new(source_min: i64, source_max: i64, target_start: i64, target_end: i64) -> Self {
        Self {
            source_min,
            source_span: (source_max - source_min).max(1),
            target_start,
            target_span: target_end - target_start,
        }
    }

    pub fn map(&self, unit: i64) -> i64 {
        let offset = unit - self.source_min;
        // floor((offset * span' / span) + 1/2) without leaving integers
        let scaled =
            (2 * offset * self.target_span + self.source_span).div_euclid(2 * self.source_span);
        self.target_start + scaled
    }
}

/// Unit ordinal of a timestamp value under the given granularity.
pub fn to_unit(value: &Value, granularity: Granularity) -> Option<i64> {
    match granularity {
        Granularity::Date | Granularity::DateTime => {
            value.as_date().map(|date| i64::from(date.num_days_from_ce()))
        }
        Granularity::MonthPeriod => value.as_month().map(|month| i64::from(month.ordinal())),
    }
}

pub fn day_from_unit(unit: i64) -> Option<NaiveDate> {
    i32::try_from(unit)
        .ok()
        .and_then(NaiveDate::from_num_days_from_ce_opt)
}

/// Rebuild a timestamp value from a mapped unit ordinal.
///
/// For `DateTime` the clock time is taken from `original`, unchanged; only
/// the calendar date component moves.
pub fn value_from_unit(unit: i64, granularity: Granularity, original: &Value) -> Option<Value> {
    match granularity {
        Granularity::Date => day_from_unit(unit).map(Value::Date),
        Granularity::DateTime => {
            let time = original.as_datetime()?.time();
            day_from_unit(unit).map(|date| Value::DateTime(date.and_time(time)))
        }
        Granularity::MonthPeriod => {
            let ordinal = i32::try_from(unit).ok()?;
            Some(Value::Month(MonthPeriod::from_ordinal(ordinal)))
        }
    }
}
