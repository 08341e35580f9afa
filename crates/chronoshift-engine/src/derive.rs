use std::collections::{BTreeMap, HashMap};

use chrono::Duration;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use regex::Regex;
use serde::{Deserialize, Serialize};

use chronoshift_core::{Dataset, FieldType, Value};

use crate::errors::EngineError;

/// How a derived field is recomputed from a record's finalized fields.
///
/// Every temporal rule offsets forward from its source timestamp, so a
/// recomputed value never precedes the timestamp it is derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum DerivedRule {
    /// `field = source + days` (e.g. due date 30 days after invoice date).
    DayOffset { source: String, days: i64 },
    /// `field = source + uniform(min_days..=max_days)`.
    RandomDayOffset {
        source: String,
        min_days: i64,
        max_days: i64,
    },
    /// `field = source + minutes_field minutes` (e.g. incident resolution).
    MinutesFromField {
        source: String,
        minutes_field: String,
    },
    /// `field = source + uniform minutes drawn from a per-category range`.
    RandomMinutesByCategory {
        source: String,
        category_field: String,
        #[serde(default)]
        ranges: BTreeMap<String, (i64, i64)>,
        default: (i64, i64),
    },
    /// Sequential reference code `PREFIX00000042`, renumbered from the
    /// largest existing suffix so codes never collide across the dataset.
    SequenceCode { prefix: String, width: usize },
}

/// Guard restricting a rule to records where `field` equals `equals`
/// (compared in canonical key form, so `true`, `42`, `Resolved` all work).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldEquals {
    pub field: String,
    pub equals: String,
}

/// One derived field plus the rule that recomputes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedFieldRule {
    pub field: String,
    #[serde(flatten)]
    pub rule: DerivedRule,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<FieldEquals>,
}

/// Lookup table mapping a dataset kind to its ordered derived-field rules.
#[derive(Debug, Clone, Default)]
pub struct FieldRecalculator {
    rules: HashMap<String, Vec<DerivedFieldRule>>,
}

impl FieldRecalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule sets for the table kinds the original demo environment ships.
    pub fn builtin() -> Self {
        let mut recalc = Self::new();
        recalc.register(
            "invoice",
            vec![
                rule(
                    "due_date",
                    DerivedRule::DayOffset {
                        source: "invoice_date".to_string(),
                        days: 30,
                    },
                    None,
                ),
                rule(
                    "invoice_number",
                    DerivedRule::SequenceCode {
                        prefix: "INV".to_string(),
                        width: 8,
                    },
                    None,
                ),
            ],
        );
        recalc.register(
            "support_ticket",
            vec![
                rule(
                    "resolved_date",
                    DerivedRule::RandomDayOffset {
                        source: "created_date".to_string(),
                        min_days: 1,
                        max_days: 5,
                    },
                    Some(("status", "Resolved")),
                ),
                rule(
                    "ticket_number",
                    DerivedRule::SequenceCode {
                        prefix: "TKT".to_string(),
                        width: 8,
                    },
                    None,
                ),
            ],
        );
        recalc.register(
            "network_alarm",
            vec![rule(
                "cleared_time",
                DerivedRule::RandomMinutesByCategory {
                    source: "raised_time".to_string(),
                    category_field: "severity".to_string(),
                    ranges: BTreeMap::from([
                        ("Critical".to_string(), (30, 120)),
                        ("Major".to_string(), (60, 240)),
                        ("Minor".to_string(), (120, 480)),
                    ]),
                    default: (30, 480),
                },
                Some(("acknowledged", "true")),
            )],
        );
        recalc.register(
            "it_incident",
            vec![
                rule(
                    "resolved_date",
                    DerivedRule::MinutesFromField {
                        source: "created_date".to_string(),
                        minutes_field: "resolution_mins".to_string(),
                    },
                    Some(("status", "Closed")),
                ),
                rule(
                    "incident_number",
                    DerivedRule::SequenceCode {
                        prefix: "INC".to_string(),
                        width: 8,
                    },
                    None,
                ),
            ],
        );
        recalc.register(
            "complaint",
            vec![
                rule(
                    "resolved_date",
                    DerivedRule::RandomDayOffset {
                        source: "received_date".to_string(),
                        min_days: 3,
                        max_days: 30,
                    },
                    Some(("status", "Resolved")),
                ),
                rule(
                    "complaint_reference",
                    DerivedRule::SequenceCode {
                        prefix: "CMP".to_string(),
                        width: 5,
                    },
                    None,
                ),
            ],
        );
        recalc
    }

    /// Replaces any existing rule set for `kind`.
    pub fn register(&mut self, kind: &str, rules: Vec<DerivedFieldRule>) {
        self.rules.insert(kind.to_string(), rules);
    }

    pub fn rules_for(&self, kind: &str) -> &[DerivedFieldRule] {
        self.rules.get(kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Recompute the derived fields of `kind` on the touched records only.
    /// Returns the number of field assignments performed.
    pub fn apply(
        &self,
        kind: &str,
        dataset: &mut Dataset,
        touched: &[usize],
        rng: &mut ChaCha8Rng,
    ) -> Result<u64, EngineError> {
        let mut assigned = 0_u64;
        for spec in self.rules_for(kind) {
            assigned += match &spec.rule {
                DerivedRule::SequenceCode { prefix, width } => {
                    apply_sequence_code(dataset, touched, spec, prefix, *width)?
                }
                _ => apply_offset_rule(dataset, touched, spec, rng)?,
            };
        }
        Ok(assigned)
    }
}

fn rule(field: &str, rule: DerivedRule, when: Option<(&str, &str)>) -> DerivedFieldRule {
    DerivedFieldRule {
        field: field.to_string(),
        rule,
        when: when.map(|(field, equals)| FieldEquals {
            field: field.to_string(),
            equals: equals.to_string(),
        }),
    }
}

fn guard_passes(record: &chronoshift_core::Record, when: &Option<FieldEquals>) -> bool {
    match when {
        None => true,
        Some(guard) => record
            .get(&guard.field)
            .map(|value| value.key() == guard.equals)
            .unwrap_or(false),
    }
}

fn apply_sequence_code(
    dataset: &mut Dataset,
    touched: &[usize],
    spec: &DerivedFieldRule,
    prefix: &str,
    width: usize,
) -> Result<u64, EngineError> {
    let pattern = Regex::new(&format!("^{}(\\d+)$", regex::escape(prefix))).map_err(|err| {
        EngineError::InvalidRule {
            field: spec.field.clone(),
            reason: err.to_string(),
        }
    })?;

    // Highest suffix anywhere in the dataset, including records we are
    // about to renumber; allocation starts strictly above it.
    let mut next = dataset
        .records
        .iter()
        .filter_map(|record| record.get(&spec.field))
        .filter_map(|value| value.as_text())
        .filter_map(|text| pattern.captures(text))
        .filter_map(|caps| caps[1].parse::<u64>().ok())
        .max()
        .unwrap_or(0)
        + 1;

    dataset.schema.push_derived(&spec.field, FieldType::Text);

    let mut assigned = 0_u64;
    for &index in touched {
        let Some(record) = dataset.records.get_mut(index) else {
            continue;
        };
        if !guard_passes(record, &spec.when) {
            continue;
        }
        record.insert(
            spec.field.clone(),
            Value::Text(format!("{prefix}{next:0width$}")),
        );
        next += 1;
        assigned += 1;
    }
    Ok(assigned)
}

fn apply_offset_rule(
    dataset: &mut Dataset,
    touched: &[usize],
    spec: &DerivedFieldRule,
    rng: &mut ChaCha8Rng,
) -> Result<u64, EngineError> {
    let derived_type = match &spec.rule {
        DerivedRule::DayOffset { source, .. } | DerivedRule::RandomDayOffset { source, .. } => {
            dataset
                .schema
                .field(source)
                .map(|field| field.field_type)
                .unwrap_or(FieldType::Date)
        }
        _ => FieldType::DateTime,
    };
    dataset.schema.push_derived(&spec.field, derived_type);

    let mut assigned = 0_u64;
    for &index in touched {
        let Some(record) = dataset.records.get_mut(index) else {
            continue;
        };
        if !guard_passes(record, &spec.when) {
            continue;
        }
        if let Some(value) = compute_offset(record, spec, rng)? {
            record.insert(spec.field.clone(), value);
            assigned += 1;
        }
    }
    Ok(assigned)
}

/// Offsets are clamped non-negative: a derived timestamp never precedes
/// the timestamp it is computed from.
fn compute_offset(
    record: &chronoshift_core::Record,
    spec: &DerivedFieldRule,
    rng: &mut ChaCha8Rng,
) -> Result<Option<Value>, EngineError> {
    match &spec.rule {
        DerivedRule::DayOffset { source, days } => {
            Ok(shift_days(record.get(source), (*days).max(0)))
        }
        DerivedRule::RandomDayOffset {
            source,
            min_days,
            max_days,
        } => {
            let (min, max) = ordered_range(spec, *min_days, *max_days)?;
            let days = rng.random_range(min..=max);
            Ok(shift_days(record.get(source), days))
        }
        DerivedRule::MinutesFromField {
            source,
            minutes_field,
        } => {
            let Some(minutes) = record.get(minutes_field).and_then(Value::as_f64) else {
                return Ok(None);
            };
            Ok(shift_minutes(record.get(source), (minutes.round() as i64).max(0)))
        }
        DerivedRule::RandomMinutesByCategory {
            source,
            category_field,
            ranges,
            default,
        } => {
            let category = record
                .get(category_field)
                .map(Value::key)
                .unwrap_or_default();
            let (min, max) = ranges.get(&category).copied().unwrap_or(*default);
            let (min, max) = ordered_range(spec, min, max)?;
            let minutes = rng.random_range(min..=max);
            Ok(shift_minutes(record.get(source), minutes))
        }
        DerivedRule::SequenceCode { .. } => unreachable!("handled by apply_sequence_code"),
    }
}

fn ordered_range(spec: &DerivedFieldRule, min: i64, max: i64) -> Result<(i64, i64), EngineError> {
    if min > max {
        return Err(EngineError::InvalidRule {
            field: spec.field.clone(),
            reason: format!("offset range {min}..{max} is inverted"),
        });
    }
    Ok((min.max(0), max.max(0)))
}

fn shift_days(source: Option<&Value>, days: i64) -> Option<Value> {
    match source? {
        Value::Date(date) => Some(Value::Date(*date + Duration::days(days))),
        Value::DateTime(datetime) => Some(Value::DateTime(*datetime + Duration::days(days))),
        _ => None,
    }
}

fn shift_minutes(source: Option<&Value>, minutes: i64) -> Option<Value> {
    let datetime = source?.as_datetime()?;
    Some(Value::DateTime(datetime + Duration::minutes(minutes)))
}
