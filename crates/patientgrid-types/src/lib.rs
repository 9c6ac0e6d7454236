//! Grid specification model and operand type system
//!
//! This crate defines the declarative input of the engine (a grid with
//! typed column definitions and optional filters), the operand value
//! system with its type-directed converter, and the age range catalog
//! used to coarsen exact ages into display buckets.

pub mod age_range;
pub mod convert;
pub mod grid;
pub mod value;

// Re-export main types
pub use age_range::{parse_age_ranges, range_for_age, range_with_label, AgeRange, AgeRangeCatalog, AgeRangeError};
pub use convert::{convert, ConversionContext, ConvertError, DATETIME_FORMAT, DATE_FORMAT};
pub use grid::{ColumnFilter, ColumnKind, GridColumn, LocationFilter, PatientGrid, PeriodFilter};
pub use value::{OperandKind, OperandValue};
