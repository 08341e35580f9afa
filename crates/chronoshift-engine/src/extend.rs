use std::collections::HashSet;

use chrono::NaiveTime;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use tracing::{info, warn};

use chronoshift_core::{Dataset, Field, FieldRole, FieldType, Granularity, Record, Value};

use crate::derive::FieldRecalculator;
use crate::errors::EngineError;
use crate::model::{ExtendOptions, ExtendReport, dataset_granularity};
use crate::range::{day_from_unit, to_unit, value_from_unit};
use crate::sampler::TemplateSampler;

/// Identifier sequence owned by a single extension operation.
///
/// Seeded at (max existing identifier + 1); never module-level state, so
/// per-table operations stay safe to run in parallel processes.
#[derive(Debug)]
pub struct IdCounter {
    next: i64,
}

impl IdCounter {
    pub fn starting_at(next: i64) -> Self {
        Self { next }
    }

    pub fn take(&mut self) -> i64 {
        let value = self.next;
        self.next += 1;
        value
    }

    pub fn peek(&self) -> i64 {
        self.next
    }
}

/// Extends a dataset forward in time to a target boundary by cloning
/// template records into every missing unit.
#[derive(Debug, Clone)]
pub struct SeriesExtender {
    options: ExtendOptions,
}

impl SeriesExtender {
    pub fn new(options: ExtendOptions) -> Self {
        Self { options }
    }

    pub fn extend(
        &self,
        dataset: &mut Dataset,
        recalc: &FieldRecalculator,
        rng: &mut ChaCha8Rng,
    ) -> Result<ExtendReport, EngineError> {
        let granularity = dataset_granularity(dataset)?;
        let ts_field = dataset.timestamp_field()?.name.clone();

        let (current_min, current_max) = dataset.timestamp_range()?;
        let min_unit = unit_of(&current_min, &ts_field, granularity)?;
        let max_unit = unit_of(&current_max, &ts_field, granularity)?;
        let target_unit = self.options.target_end.unit(granularity)?;

        if max_unit >= target_unit {
            info!(
                kind = %self.options.kind,
                current_max = %current_max.to_csv(),
                target = %self.options.target_end,
                "series already reaches target, nothing to extend"
            );
            return Ok(ExtendReport {
                granularity,
                already_current: true,
                units_added: 0,
                records_added: 0,
                skipped_scopes: 0,
                first_new_identifier: None,
                last_new_identifier: None,
                new_max: current_max.to_csv(),
            });
        }

        let history_units = (max_unit - min_unit + 1).max(1);
        let rate = self
            .options
            .records_per_unit
            .unwrap_or(dataset.len() as f64 / history_units as f64);

        let id_field = dataset.schema.identifier().map(|field| field.name.clone());
        let existing_ids: HashSet<i64> = match &id_field {
            Some(name) => dataset
                .records
                .iter()
                .filter_map(|record| record.get(name))
                .filter_map(Value::as_i64)
                .collect(),
            None => HashSet::new(),
        };
        let mut counter =
            IdCounter::starting_at(dataset.max_identifier().map(|max| max + 1).unwrap_or(1));
        let first_id = counter.peek();

        let fields = dataset.schema.fields.clone();
        let sampler = TemplateSampler::new(dataset, self.options.scope_field.as_deref())?;

        let mut new_records: Vec<Record> = Vec::new();
        let mut skipped_scopes = 0_u64;

        for unit in (max_unit + 1)..=target_unit {
            if self.options.scope_field.is_some() {
                let keys = sampler.scope_keys();
                if keys.is_empty() {
                    continue;
                }
                // Not every entity reports every unit: resample a random
                // 70-90% subset of known entities for this unit.
                let (lo, hi) = self.options.entity_fraction;
                let wanted = ((keys.len() as f64) * rng.random_range(lo..hi)).round() as usize;
                let wanted = wanted.clamp(1, keys.len());
                let picked = rand::seq::index::sample(rng, keys.len(), wanted);
                for key_index in picked.iter() {
                    match sampler.sample_scoped(&keys[key_index], rng) {
                        Ok(template) => new_records.push(synthesize(
                            template,
                            &fields,
                            &ts_field,
                            self.options.scope_field.as_deref(),
                            granularity,
                            unit,
                            id_field.as_deref(),
                            &mut counter,
                            rng,
                        )?),
                        Err(EngineError::ScopeEmpty(_)) => skipped_scopes += 1,
                        Err(err) => return Err(err),
                    }
                }
            } else {
                let count = ((rate * rng.random_range(0.8..1.2)).round() as i64).max(1);
                for _ in 0..count {
                    let template = sampler.sample(rng)?;
                    new_records.push(synthesize(
                        template,
                        &fields,
                        &ts_field,
                        self.options.scope_field.as_deref(),
                        granularity,
                        unit,
                        id_field.as_deref(),
                        &mut counter,
                        rng,
                    )?);
                }
            }
        }

        // Counter discipline makes a collision impossible; verify anyway
        // before the dataset is mutated so a detected collision leaves the
        // caller's data exactly as it was.
        if let Some(name) = &id_field {
            for record in &new_records {
                if let Some(id) = record.get(name).and_then(Value::as_i64)
                    && existing_ids.contains(&id)
                {
                    return Err(EngineError::IdentifierCollision(id));
                }
            }
        }

        let records_added = new_records.len() as u64;
        let last_id = counter.peek() - 1;
        let touched: Vec<usize> = (dataset.len()..dataset.len() + new_records.len()).collect();
        dataset.records.extend(new_records);
        recalc.apply(&self.options.kind, dataset, &touched, rng)?;
        dataset.sort_by_timestamp()?;
        let (_, new_max) = dataset.timestamp_range()?;

        let report = ExtendReport {
            granularity,
            already_current: false,
            units_added: (target_unit - max_unit) as u64,
            records_added,
            skipped_scopes,
            first_new_identifier: (id_field.is_some() && records_added > 0).then_some(first_id),
            last_new_identifier: (id_field.is_some() && records_added > 0).then_some(last_id),
            new_max: new_max.to_csv(),
        };
        if report.skipped_scopes > 0 {
            warn!(
                kind = %self.options.kind,
                units = report.units_added,
                added = report.records_added,
                skipped_scopes = report.skipped_scopes,
                new_max = %report.new_max,
                "extended dataset with skipped scopes"
            );
        } else {
            info!(
                kind = %self.options.kind,
                units = report.units_added,
                added = report.records_added,
                new_max = %report.new_max,
                "extended dataset"
            );
        }
        Ok(report)
    }
}

/// Clone a template into a new record for one time unit.
fn synthesize(
    template: &Record,
    fields: &[Field],
    ts_field: &str,
    scope_field: Option<&str>,
    granularity: Granularity,
    unit: i64,
    id_field: Option<&str>,
    counter: &mut IdCounter,
    rng: &mut ChaCha8Rng,
) -> Result<Record, EngineError> {
    let mut record = template.clone();

    // Jitter plain numeric fields so clones never duplicate values exactly.
    // Identifier, derived and timestamp roles are never jittered, and
    // neither is the scope field: its value names an entity, not a measure.
    for field in fields {
        if field.role != FieldRole::Plain {
            continue;
        }
        if scope_field == Some(field.name.as_str()) {
            continue;
        }
        if !matches!(field.field_type, FieldType::Int | FieldType::Float) {
            continue;
        }
        let factor = rng.random_range(0.9..1.1);
        match record.get(&field.name) {
            Some(Value::Int(value)) => {
                let jittered = (*value as f64 * factor).round() as i64;
                record.insert(field.name.clone(), Value::Int(jittered));
            }
            Some(Value::Float(value)) => {
                let jittered = *value * factor;
                record.insert(field.name.clone(), Value::Float(jittered));
            }
            _ => {}
        }
    }

    let timestamp = match granularity {
        Granularity::DateTime => {
            let date = day_from_unit(unit).ok_or(EngineError::OutOfRange(unit))?;
            let seconds = rng.random_range(0..86400);
            let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0).unwrap_or_default();
            Value::DateTime(date.and_time(time))
        }
        _ => value_from_unit(unit, granularity, &Value::Null)
            .ok_or(EngineError::OutOfRange(unit))?,
    };
    record.insert(ts_field.to_string(), timestamp);

    if let Some(name) = id_field {
        record.insert(name.to_string(), Value::Int(counter.take()));
    }

    if let Some(missing) = fields
        .iter()
        .find(|field| !record.contains_key(&field.name))
    {
        return Err(EngineError::SchemaMismatch(missing.name.clone()));
    }
    Ok(record)
}

fn unit_of(value: &Value, field: &str, granularity: Granularity) -> Result<i64, EngineError> {
    to_unit(value, granularity).ok_or_else(|| EngineError::ValueKind {
        field: field.to_string(),
        expected: "timestamp matching the declared granularity",
        found: value.kind(),
    })
}
