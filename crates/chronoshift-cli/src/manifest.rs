use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use chronoshift_core::{Field, Schema, validate_schema};
use chronoshift_engine::DerivedFieldRule;

use crate::CliError;

/// Declares the tables a run operates on; the CLI analog of a plan file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default = "default_version")]
    pub version: String,
    /// Base seed; each table derives its own stream from it.
    #[serde(default)]
    pub seed: u64,
    pub tables: Vec<TableSpec>,
}

/// One table: file location, declared schema, and engine knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableSpec {
    pub name: String,
    pub file: String,
    /// Dataset kind for derived-field rule lookup; defaults to the name.
    #[serde(default)]
    pub kind: Option<String>,
    pub fields: Vec<Field>,
    /// Grouping field for per-entity extension (e.g. subscriber key).
    #[serde(default)]
    pub scope_field: Option<String>,
    /// Derived-field rules overriding the built-in set for this kind.
    #[serde(default)]
    pub derived: Vec<DerivedFieldRule>,
}

impl Manifest {
    pub fn load(path: &Path) -> Result<Self, CliError> {
        let reader = BufReader::new(File::open(path)?);
        let manifest: Manifest = serde_json::from_reader(reader)?;
        for table in &manifest.tables {
            let schema = table.schema();
            validate_schema(&schema)?;
            if schema.primary_timestamp().is_none() {
                return Err(CliError::InvalidManifest(format!(
                    "table '{}' declares no primary_timestamp field",
                    table.name
                )));
            }
            if let Some(scope) = &table.scope_field
                && schema.field(scope).is_none()
            {
                return Err(CliError::InvalidManifest(format!(
                    "table '{}' scope field '{}' is not declared",
                    table.name, scope
                )));
            }
        }
        Ok(manifest)
    }
}

impl TableSpec {
    pub fn schema(&self) -> Schema {
        Schema::new(self.fields.clone())
    }

    pub fn kind(&self) -> &str {
        self.kind.as_deref().unwrap_or(&self.name)
    }
}

fn default_version() -> String {
    chronoshift_core::SCHEMA_VERSION.to_string()
}

/// Derive a per-table seed so each table's stream is independent of the
/// order tables are processed in.
pub fn table_seed(seed: u64, table: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in table.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
