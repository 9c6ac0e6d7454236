//! Grid cell values
//!
//! The normalized output type every converter produces: one flat value
//! per cell, ready for rendering and sorting.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use patientgrid_types::DATETIME_FORMAT;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A normalized grid cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CellValue {
    /// Missing value
    Null,
    /// Text value
    Text(String),
    /// Whole number
    Integer(i64),
    /// Decimal number
    Decimal(Decimal),
    /// Boolean
    Boolean(bool),
    /// Calendar date
    Date(NaiveDate),
    /// Date and time
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Check if this cell is null
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Try to get as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Try to get as integer
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Try to get as date-time
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(value) => Some(*value),
            Self::Date(value) => Some(value.and_time(NaiveTime::MIN)),
            _ => None,
        }
    }

    /// Ordering between two cells of the same shape.
    ///
    /// Null collates after every value; heterogeneous cells do not order.
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Greater,
            (_, Self::Null) => Ordering::Less,
            (Self::Text(a), Self::Text(b)) => a.cmp(b),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Decimal(a), Self::Decimal(b)) => a.cmp(b),
            (Self::Integer(a), Self::Decimal(b)) => Decimal::from(*a).cmp(b),
            (Self::Decimal(a), Self::Integer(b)) => a.cmp(&Decimal::from(*b)),
            (Self::Boolean(a), Self::Boolean(b)) => a.cmp(b),
            (Self::Date(a), Self::Date(b)) => a.cmp(b),
            (Self::DateTime(a), Self::DateTime(b)) => a.cmp(b),
            (Self::Date(a), Self::DateTime(b)) => a.and_time(NaiveTime::MIN).cmp(b),
            (Self::DateTime(a), Self::Date(b)) => a.cmp(&b.and_time(NaiveTime::MIN)),
            _ => Ordering::Equal,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(text) => write!(f, "{}", text),
            Self::Integer(value) => write!(f, "{}", value),
            Self::Decimal(value) => write!(f, "{}", value),
            Self::Boolean(value) => write!(f, "{}", value),
            Self::Date(value) => write!(f, "{}", value),
            Self::DateTime(value) => write!(f, "{}", value.format(DATETIME_FORMAT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_collates_last() {
        let date = CellValue::Date(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap());
        assert_eq!(CellValue::Null.compare(&date), Ordering::Greater);
        assert_eq!(date.compare(&CellValue::Null), Ordering::Less);
    }

    #[test]
    fn test_mixed_numeric_comparison() {
        let int = CellValue::Integer(3);
        let dec = CellValue::Decimal("3.5".parse().unwrap());
        assert_eq!(int.compare(&dec), Ordering::Less);
        assert_eq!(dec.compare(&int), Ordering::Greater);
    }

    #[test]
    fn test_date_and_datetime_interoperate() {
        let date = CellValue::Date(NaiveDate::from_ymd_opt(2023, 6, 15).unwrap());
        let datetime = CellValue::DateTime(
            NaiveDate::from_ymd_opt(2023, 6, 15)
                .unwrap()
                .and_hms_opt(8, 0, 0)
                .unwrap(),
        );
        assert_eq!(date.compare(&datetime), Ordering::Less);
    }
}
