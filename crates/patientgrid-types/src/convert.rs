//! Type-directed operand conversion
//!
//! Converts free-text operand strings into typed values. Each target kind
//! maps to one explicit parsing rule; unknown combinations are an error,
//! never a silent default.

use crate::age_range::{range_with_label, AgeRange, AgeRangeCatalog, AgeRangeError};
use crate::value::{OperandKind, OperandValue};
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use patientgrid_model::{ReferenceLookup, SettingRegistry};
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

/// Full date-time operand format, tried first.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date-only operand format, tried when the full format fails.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors raised while converting an operand.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The text cannot be parsed as the target kind
    #[error("failed to convert `{value}` to {target}")]
    Conversion {
        /// The operand text
        value: String,
        /// The requested target kind
        target: OperandKind,
    },

    /// Both date formats failed
    #[error("failed to convert `{value}` to a date")]
    DateFormat {
        /// The operand text
        value: String,
        /// Failure of the full date-time format
        datetime_error: chrono::ParseError,
        /// Failure of the date-only format
        #[source]
        date_error: chrono::ParseError,
    },

    /// The target kind has no conversion rule
    #[error("don't know how to convert operand value to kind: {kind}")]
    UnsupportedOperandKind {
        /// The offending kind
        kind: OperandKind,
    },

    /// The age range catalog could not be loaded for a label lookup
    #[error(transparent)]
    Configuration(#[from] AgeRangeError),
}

/// Collaborators an operand conversion may need.
pub struct ConversionContext<'a> {
    /// Reference resolution by uuid
    pub lookup: &'a dyn ReferenceLookup,
    /// Global configuration, read when a label lookup builds the catalog
    pub settings: &'a dyn SettingRegistry,
    /// The age range catalog
    pub catalog: &'a AgeRangeCatalog,
}

/// Structured age-range operand payload.
#[derive(Deserialize)]
struct AgeRangeOperand {
    #[serde(rename = "minAge")]
    min_age: Option<u32>,
    #[serde(rename = "maxAge")]
    max_age: Option<u32>,
}

/// Convert `value` to the `target` kind.
///
/// Reference kinds resolve through the clinical-data collaborator; a
/// missing match there is `Ok(None)`, not an error. Every parse failure
/// is fatal to the conversion.
pub fn convert(
    value: &str,
    target: OperandKind,
    context: &ConversionContext<'_>,
) -> Result<Option<OperandValue>, ConvertError> {
    match target {
        OperandKind::Integer => value
            .parse::<i64>()
            .map(|parsed| Some(OperandValue::Integer(parsed)))
            .map_err(|_| ConvertError::Conversion {
                value: value.to_string(),
                target,
            }),
        OperandKind::Decimal => value
            .parse::<Decimal>()
            .map(|parsed| Some(OperandValue::Decimal(parsed)))
            .map_err(|_| ConvertError::Conversion {
                value: value.to_string(),
                target,
            }),
        OperandKind::Boolean => match value {
            "true" => Ok(Some(OperandValue::Boolean(true))),
            "false" => Ok(Some(OperandValue::Boolean(false))),
            _ => Err(ConvertError::Conversion {
                value: value.to_string(),
                target,
            }),
        },
        OperandKind::Date => parse_date(value).map(|parsed| Some(OperandValue::Date(parsed))),
        OperandKind::Concept => Ok(context
            .lookup
            .concept_by_uuid(value)
            .map(OperandValue::Concept)),
        OperandKind::Location => Ok(context
            .lookup
            .location_by_uuid(value)
            .map(OperandValue::Location)),
        OperandKind::AgeRange => convert_age_range(value, context),
        OperandKind::Text => Err(ConvertError::UnsupportedOperandKind { kind: target }),
    }
}

/// Parse a date operand, trying the full date-time format first and the
/// date-only format second.
pub fn parse_date(value: &str) -> Result<NaiveDateTime, ConvertError> {
    let datetime_error = match NaiveDateTime::parse_from_str(value, DATETIME_FORMAT) {
        Ok(parsed) => return Ok(parsed),
        Err(error) => error,
    };
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(parsed) => Ok(parsed.and_time(NaiveTime::MIN)),
        Err(date_error) => Err(ConvertError::DateFormat {
            value: value.to_string(),
            datetime_error,
            date_error,
        }),
    }
}

fn convert_age_range(
    value: &str,
    context: &ConversionContext<'_>,
) -> Result<Option<OperandValue>, ConvertError> {
    // A structured operand carries explicit bounds; anything that fails the
    // structural parse is treated as a bucket label.
    if let Ok(operand) = serde_json::from_str::<AgeRangeOperand>(value) {
        let range = AgeRange::unlabeled(operand.min_age.unwrap_or(0), operand.max_age);
        return Ok(Some(OperandValue::AgeRange(range)));
    }
    let ranges = context.catalog.get(context.settings)?;
    Ok(range_with_label(&ranges, value)
        .cloned()
        .map(OperandValue::AgeRange))
}
