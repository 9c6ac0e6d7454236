//! Compilation errors

use chrono::NaiveDateTime;
use patientgrid_types::AgeRangeError;
use thiserror::Error;

/// Errors that abort a grid compilation.
///
/// Every variant is fatal to the current compilation: no partial query
/// plan is ever returned.
#[derive(Debug, Clone, Error)]
pub enum CompileError {
    /// A column declares a kind with no retrieval strategy
    #[error("don't know how to handle column kind: {kind}")]
    UnsupportedColumnKind {
        /// The offending kind's wire name
        kind: String,
    },

    /// Two columns share an output key
    #[error("duplicate column name `{name}` in grid")]
    DuplicateColumn {
        /// The repeated output key
        name: String,
    },

    /// The declared period bounds are inverted
    #[error("invalid period: from {from} is after to {to}")]
    InvalidPeriod {
        /// Declared lower bound
        from: NaiveDateTime,
        /// Declared upper bound
        to: NaiveDateTime,
    },

    /// The age range catalog could not be built
    #[error(transparent)]
    Configuration(#[from] AgeRangeError),
}
