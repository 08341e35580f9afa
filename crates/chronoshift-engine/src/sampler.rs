use std::collections::BTreeMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use chronoshift_core::{Dataset, Error as CoreError, Record, Value};

use crate::errors::EngineError;

/// Draws template records for synthesis, uniformly with replacement.
///
/// With a scope field, draws are restricted to records sharing the
/// requested scope value. An empty scope is an error, never a silent
/// widening to the full population: substituting a different entity's
/// records would break the per-entity continuity the caller relies on.
#[derive(Debug)]
pub struct TemplateSampler<'a> {
    records: &'a [Record],
    by_scope: BTreeMap<String, Vec<usize>>,
    scope_keys: Vec<String>,
}

impl<'a> TemplateSampler<'a> {
    pub fn new(dataset: &'a Dataset, scope_field: Option<&str>) -> Result<Self, EngineError> {
        let mut by_scope: BTreeMap<String, Vec<usize>> = BTreeMap::new();
        if let Some(field) = scope_field {
            if dataset.schema.field(field).is_none() {
                return Err(EngineError::UnknownField(field.to_string()));
            }
            for (index, record) in dataset.records.iter().enumerate() {
                let key = record.get(field).unwrap_or(&Value::Null).key();
                by_scope.entry(key).or_default().push(index);
            }
        }
        let scope_keys = by_scope.keys().cloned().collect();
        Ok(Self {
            records: &dataset.records,
            by_scope,
            scope_keys,
        })
    }

    /// Known entity keys, in deterministic order.
    pub fn scope_keys(&self) -> &[String] {
        &self.scope_keys
    }

    /// Uniform draw from the whole dataset.
    pub fn sample(&self, rng: &mut ChaCha8Rng) -> Result<&'a Record, EngineError> {
        if self.records.is_empty() {
            return Err(EngineError::Core(CoreError::EmptyDataset));
        }
        let index = rng.random_range(0..self.records.len());
        Ok(&self.records[index])
    }

    /// Uniform draw from one scope's records.
    pub fn sample_scoped(
        &self,
        scope_key: &str,
        rng: &mut ChaCha8Rng,
    ) -> Result<&'a Record, EngineError> {
        let positions = self
            .by_scope
            .get(scope_key)
            .filter(|positions| !positions.is_empty())
            .ok_or_else(|| EngineError::ScopeEmpty(scope_key.to_string()))?;
        let index = positions[rng.random_range(0..positions.len())];
        Ok(&self.records[index])
    }
}
