use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::schema::{Field, Schema};
use crate::value::Value;

/// One row, keyed by field name.
pub type Record = HashMap<String, Value>;

/// An ordered collection of records sharing one schema.
///
/// The core never owns file lifetime: datasets are loaded once by the I/O
/// layer, transformed in memory, and handed back for persistence.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: Schema,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(schema: Schema, records: Vec<Record>) -> Self {
        Self { schema, records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn timestamp_field(&self) -> Result<&Field> {
        self.schema
            .primary_timestamp()
            .ok_or(Error::MissingPrimaryTimestamp)
    }

    /// Observed (min, max) of the primary timestamp field. Null cells are
    /// ignored; an all-null or empty dataset is an error.
    pub fn timestamp_range(&self) -> Result<(Value, Value)> {
        let field = self.timestamp_field()?;
        let mut range: Option<(Value, Value)> = None;
        for record in &self.records {
            let Some(value) = record.get(&field.name) else {
                continue;
            };
            if value.is_null() {
                continue;
            }
            range = Some(match range {
                None => (value.clone(), value.clone()),
                Some((min, max)) => (
                    if value.cmp_value(&min).is_lt() {
                        value.clone()
                    } else {
                        min
                    },
                    if value.cmp_value(&max).is_gt() {
                        value.clone()
                    } else {
                        max
                    },
                ),
            });
        }
        range.ok_or(Error::EmptyDataset)
    }

    /// Largest identifier value, when an identifier field is declared.
    /// Identifier fields are integer by schema validation.
    pub fn max_identifier(&self) -> Option<i64> {
        let field = self.schema.identifier()?;
        self.records
            .iter()
            .filter_map(|record| record.get(&field.name))
            .filter_map(Value::as_i64)
            .max()
    }

    /// Stable ascending sort on the primary timestamp field.
    pub fn sort_by_timestamp(&mut self) -> Result<()> {
        let field = self.timestamp_field()?.name.clone();
        self.records.sort_by(|a, b| {
            let left = a.get(&field).unwrap_or(&Value::Null);
            let right = b.get(&field).unwrap_or(&Value::Null);
            left.cmp_value(right)
        });
        Ok(())
    }
}
