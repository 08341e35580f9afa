use rand_chacha::ChaCha8Rng;
use tracing::info;

use chronoshift_core::{Dataset, Value};

use crate::derive::FieldRecalculator;
use crate::errors::EngineError;
use crate::model::{RebaseReport, TargetWindow, dataset_granularity};
use crate::range::{RangeMapper, to_unit, value_from_unit};

/// Maps every record's primary timestamp onto a target window, preserving
/// relative spacing, then recomputes derived fields and re-sorts.
#[derive(Debug, Clone, Copy)]
pub struct DateRebaser {
    window: TargetWindow,
}

impl DateRebaser {
    pub fn new(window: TargetWindow) -> Self {
        Self { window }
    }

    pub fn rebase(
        &self,
        dataset: &mut Dataset,
        kind: &str,
        recalc: &FieldRecalculator,
        rng: &mut ChaCha8Rng,
    ) -> Result<RebaseReport, EngineError> {
        let granularity = dataset_granularity(dataset)?;
        let field = dataset.timestamp_field()?.name.clone();

        let (old_min, old_max) = dataset.timestamp_range()?;
        let source_min = unit_of(&old_min, &field, granularity)?;
        let source_max = unit_of(&old_max, &field, granularity)?;
        let (target_start, target_end) = self.window.units(granularity)?;
        let mapper = RangeMapper::new(source_min, source_max, target_start, target_end);

        let mut touched = Vec::with_capacity(dataset.len());
        for (index, record) in dataset.records.iter_mut().enumerate() {
            let Some(value) = record.get(&field) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            let unit = unit_of(value, &field, granularity)?;
            let mapped = mapper.map(unit);
            let rebased = value_from_unit(mapped, granularity, value)
                .ok_or(EngineError::OutOfRange(mapped))?;
            record.insert(field.clone(), rebased);
            touched.push(index);
        }

        let derived_recomputed = recalc.apply(kind, dataset, &touched, rng)?;
        dataset.sort_by_timestamp()?;
        let (new_min, new_max) = dataset.timestamp_range()?;

        let report = RebaseReport {
            granularity,
            records: touched.len() as u64,
            derived_recomputed,
            old_min: old_min.to_csv(),
            old_max: old_max.to_csv(),
            new_min: new_min.to_csv(),
            new_max: new_max.to_csv(),
        };
        info!(
            kind,
            records = report.records,
            old_min = %report.old_min,
            old_max = %report.old_max,
            new_min = %report.new_min,
            new_max = %report.new_max,
            "rebased dataset"
        );
        Ok(report)
    }
}

fn unit_of(
    value: &Value,
    field: &str,
    granularity: chronoshift_core::Granularity,
) -> Result<i64, EngineError> {
    to_unit(value, granularity).ok_or_else(|| EngineError::ValueKind {
        field: field.to_string(),
        expected: "timestamp matching the declared granularity",
        found: value.kind(),
    })
}
