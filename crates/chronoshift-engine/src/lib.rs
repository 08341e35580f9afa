//! Temporal rebasing and forward-extension engine for ChronoShift.
//!
//! This crate moves an in-memory dataset's timeline onto a new calendar
//! window (rebase) or grows it forward to a target boundary (extend) while
//! preserving ordering, identifier monotonicity, and derived-field
//! causality. File I/O and per-domain value synthesis live in the callers.

pub mod derive;
pub mod errors;
pub mod extend;
pub mod model;
pub mod range;
pub mod rebase;
pub mod sampler;

pub use derive::{DerivedFieldRule, DerivedRule, FieldEquals, FieldRecalculator};
pub use errors::EngineError;
pub use extend::{IdCounter, SeriesExtender};
pub use model::{Boundary, ExtendOptions, ExtendReport, RebaseReport, TargetWindow};
pub use range::RangeMapper;
pub use rebase::DateRebaser;
pub use sampler::TemplateSampler;
