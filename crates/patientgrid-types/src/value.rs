//! Operand value types
//!
//! Runtime representation of typed filter operands after conversion from
//! their free-text form.

use crate::age_range::AgeRange;
use chrono::NaiveDateTime;
use patientgrid_model::{Concept, Location};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of operand target kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperandKind {
    /// Free text; carried verbatim, no conversion rule exists
    Text,
    /// Whole number
    Integer,
    /// Decimal number
    Decimal,
    /// Boolean literal
    Boolean,
    /// Date or date-time
    Date,
    /// Concept reference by uuid
    Concept,
    /// Location reference by uuid
    Location,
    /// Age bucket, structured or by label
    AgeRange,
}

impl fmt::Display for OperandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Decimal => "DECIMAL",
            Self::Boolean => "BOOLEAN",
            Self::Date => "DATE",
            Self::Concept => "CONCEPT",
            Self::Location => "LOCATION",
            Self::AgeRange => "AGE_RANGE",
        };
        write!(f, "{}", name)
    }
}

/// A typed operand value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OperandValue {
    /// Whole number
    Integer(i64),
    /// Decimal number
    Decimal(Decimal),
    /// Boolean
    Boolean(bool),
    /// Date or date-time
    Date(NaiveDateTime),
    /// Resolved concept
    Concept(Concept),
    /// Resolved location
    Location(Location),
    /// Resolved or structured age bucket
    AgeRange(AgeRange),
}

impl OperandValue {
    /// Try to get as integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get as boolean
    pub fn as_boolean(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to get as date
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            Self::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Try to get as concept
    pub fn as_concept(&self) -> Option<&Concept> {
        match self {
            Self::Concept(c) => Some(c),
            _ => None,
        }
    }

    /// Try to get as age range
    pub fn as_age_range(&self) -> Option<&AgeRange> {
        match self {
            Self::AgeRange(r) => Some(r),
            _ => None,
        }
    }
}
