use thiserror::Error;

/// Errors emitted by the core data model.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
    #[error("schema declares no primary timestamp field")]
    MissingPrimaryTimestamp,
    #[error("dataset has no records")]
    EmptyDataset,
    #[error("invalid {expected} value '{raw}'")]
    InvalidValue { expected: &'static str, raw: String },
    #[error("invalid month period '{0}', expected YYYY-MM")]
    InvalidPeriod(String),
}

pub type Result<T> = std::result::Result<T, Error>;
