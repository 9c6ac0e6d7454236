//! Operand conversion tests
//!
//! Tests type-directed conversion of free-text operands:
//! - Numeric and boolean parsing
//! - Date parsing with the two-format fallback
//! - Reference resolution through the lookup collaborator
//! - Structured and label-based age range operands
//! - Unsupported target kinds

use patientgrid_model::{Concept, InMemoryClinicalStore, Location, SETTING_AGE_RANGES};
use patientgrid_types::{
    convert, AgeRange, AgeRangeCatalog, ConversionContext, ConvertError, OperandKind, OperandValue,
};
use pretty_assertions::assert_eq;

fn store() -> InMemoryClinicalStore {
    let mut store = InMemoryClinicalStore::new();
    store.add_concept(Concept::new("c-malaria", "Malaria"));
    store.add_location(Location::new("l-clinic", "Central Clinic").with_country("Belgium"));
    store.set_setting(SETTING_AGE_RANGES, "0-14:children,15-47:adults,elders");
    store
}

fn convert_with(
    store: &InMemoryClinicalStore,
    catalog: &AgeRangeCatalog,
    value: &str,
    target: OperandKind,
) -> Result<Option<OperandValue>, ConvertError> {
    let context = ConversionContext {
        lookup: store,
        settings: store,
        catalog,
    };
    convert(value, target, &context)
}

// === Numeric and Boolean Operands ===

#[test]
fn test_integer_operand() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let value = convert_with(&store, &catalog, "42", OperandKind::Integer).unwrap();
    assert_eq!(value, Some(OperandValue::Integer(42)));
}

#[test]
fn test_invalid_integer_operand_fails() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let result = convert_with(&store, &catalog, "forty-two", OperandKind::Integer);
    assert!(matches!(result, Err(ConvertError::Conversion { .. })));
}

#[test]
fn test_decimal_operand() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let value = convert_with(&store, &catalog, "3.14", OperandKind::Decimal).unwrap();
    assert_eq!(value, Some(OperandValue::Decimal("3.14".parse().unwrap())));
}

#[test]
fn test_boolean_operands() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    assert_eq!(
        convert_with(&store, &catalog, "true", OperandKind::Boolean).unwrap(),
        Some(OperandValue::Boolean(true))
    );
    assert_eq!(
        convert_with(&store, &catalog, "false", OperandKind::Boolean).unwrap(),
        Some(OperandValue::Boolean(false))
    );
}

#[test]
fn test_boolean_parsing_is_case_sensitive() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let result = convert_with(&store, &catalog, "True", OperandKind::Boolean);
    assert!(matches!(result, Err(ConvertError::Conversion { .. })));
}

// === Date Operands ===

#[test]
fn test_date_operand_accepts_both_formats() {
    let store = store();
    let catalog = AgeRangeCatalog::new();

    let full = convert_with(&store, &catalog, "2023-06-15 10:30:00", OperandKind::Date)
        .unwrap()
        .and_then(|v| v.as_date());
    assert_eq!(
        full.map(|d| d.to_string()),
        Some("2023-06-15 10:30:00".to_string())
    );

    let date_only = convert_with(&store, &catalog, "2023-06-15", OperandKind::Date)
        .unwrap()
        .and_then(|v| v.as_date());
    assert_eq!(
        date_only.map(|d| d.to_string()),
        Some("2023-06-15 00:00:00".to_string())
    );
}

#[test]
fn test_invalid_date_operand_fails_with_both_parse_errors() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let result = convert_with(&store, &catalog, "not-a-date", OperandKind::Date);
    assert!(matches!(result, Err(ConvertError::DateFormat { .. })));
}

// === Reference Operands ===

#[test]
fn test_concept_operand_resolves_by_uuid() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let value = convert_with(&store, &catalog, "c-malaria", OperandKind::Concept).unwrap();
    assert_eq!(
        value.as_ref().and_then(|v| v.as_concept()).map(|c| c.name.as_str()),
        Some("Malaria")
    );
}

#[test]
fn test_unknown_reference_is_none_not_error() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    assert_eq!(
        convert_with(&store, &catalog, "no-such", OperandKind::Concept).unwrap(),
        None
    );
    assert_eq!(
        convert_with(&store, &catalog, "no-such", OperandKind::Location).unwrap(),
        None
    );
}

#[test]
fn test_location_operand_resolves_by_uuid() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let value = convert_with(&store, &catalog, "l-clinic", OperandKind::Location).unwrap();
    let location = match value {
        Some(OperandValue::Location(location)) => location,
        other => panic!("expected a location, got {:?}", other),
    };
    assert_eq!(location.country.as_deref(), Some("Belgium"));
}

// === Age Range Operands ===

#[test]
fn test_structured_age_range_operand() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let value = convert_with(
        &store,
        &catalog,
        r#"{"minAge":15,"maxAge":47}"#,
        OperandKind::AgeRange,
    )
    .unwrap();
    assert_eq!(
        value.as_ref().and_then(|v| v.as_age_range()),
        Some(&AgeRange::unlabeled(15, Some(47)))
    );
}

#[test]
fn test_age_range_label_fallback() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let value = convert_with(&store, &catalog, "adults", OperandKind::AgeRange).unwrap();
    assert_eq!(
        value.and_then(|v| v.as_age_range().cloned()),
        Some(AgeRange::new(15, Some(47), "adults"))
    );
}

#[test]
fn test_unknown_age_range_label_is_none() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let value = convert_with(&store, &catalog, "toddlers", OperandKind::AgeRange).unwrap();
    assert_eq!(value, None);
}

#[test]
fn test_age_range_label_without_configured_spec_fails() {
    let store = InMemoryClinicalStore::new();
    let catalog = AgeRangeCatalog::new();
    let result = convert_with(&store, &catalog, "adults", OperandKind::AgeRange);
    assert!(matches!(result, Err(ConvertError::Configuration(_))));
}

#[test]
fn test_column_filter_operands_convert_by_kind() {
    use patientgrid_types::{ColumnFilter, ColumnKind, GridColumn};

    let column = GridColumn::new(
        "ageCategory",
        ColumnKind::EncounterAge {
            encounter_type: patientgrid_model::EncounterType::new("et-intake", "Intake"),
            into_age_range: true,
        },
    )
    .with_display("Age category")
    .with_filter(ColumnFilter::new("equals", "adults"));

    let store = store();
    let catalog = AgeRangeCatalog::new();
    let operand = &column.filters[0].operand;
    let value = convert_with(&store, &catalog, operand, OperandKind::AgeRange).unwrap();
    assert_eq!(
        value.and_then(|v| v.as_age_range().cloned()),
        Some(AgeRange::new(15, Some(47), "adults"))
    );
}

// === Unsupported Kinds ===

#[test]
fn test_text_kind_has_no_conversion_rule() {
    let store = store();
    let catalog = AgeRangeCatalog::new();
    let result = convert_with(&store, &catalog, "anything", OperandKind::Text);
    match result {
        Err(ConvertError::UnsupportedOperandKind { kind }) => {
            assert_eq!(kind, OperandKind::Text);
        }
        other => panic!("expected an unsupported-kind error, got {:?}", other),
    }
}
