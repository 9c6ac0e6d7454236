//! Grid-to-query-plan compiler
//!
//! Turns one declarative grid specification into one executable tabular
//! query plan: a hidden identity column, one planned column per declared
//! column with its retrieval strategy and converter, and the grid's sort
//! order. The shared location and period filters are extracted exactly
//! once per compilation and threaded to every strategy that needs them.

pub mod compiler;
pub mod error;
pub mod filters;
pub mod plan;

// Re-export main types
pub use compiler::compile;
pub use error::CompileError;
pub use filters::{
    extract_location_filter, extract_period_range, resolve_caller_timezone, PeriodRange,
};
pub use plan::{
    ColumnConverter, ColumnRetrieval, EncounterScope, PlannedColumn, QueryPlan, SortCriteria,
    SortDirection, SortElement, COLUMN_UUID,
};
