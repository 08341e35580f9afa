use chronoshift_core::Granularity;
use thiserror::Error;

/// Errors emitted by the rebasing/extension engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("core error: {0}")]
    Core(#[from] chronoshift_core::Error),
    #[error("template scope '{0}' has no records")]
    ScopeEmpty(String),
    #[error("synthesized record is missing declared field '{0}'")]
    SchemaMismatch(String),
    #[error("identifier {0} already exists in the dataset")]
    IdentifierCollision(i64),
    #[error("target boundary does not match dataset granularity ({granularity:?})")]
    BoundaryMismatch { granularity: Granularity },
    #[error("target window end precedes its start")]
    EmptyWindow,
    #[error("field '{field}' holds {found}, expected {expected}")]
    ValueKind {
        field: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("unknown field '{0}'")]
    UnknownField(String),
    #[error("unit ordinal {0} is outside the calendar range")]
    OutOfRange(i64),
    #[error("invalid derived rule for '{field}': {reason}")]
    InvalidRule { field: String, reason: String },
}
