//! Core contracts and helpers for ChronoShift.
//!
//! This crate defines the canonical dataset/schema types and value model
//! shared by the rebasing engine and the CLI.

pub mod dataset;
pub mod error;
pub mod period;
pub mod schema;
pub mod validation;
pub mod value;

pub use dataset::{Dataset, Record};
pub use error::{Error, Result};
pub use period::MonthPeriod;
pub use schema::{Field, FieldRole, FieldType, Granularity, Schema};
pub use validation::validate_schema;
pub use value::Value;

/// Current contract version for manifest/schema artifacts.
pub const SCHEMA_VERSION: &str = "0.1";
