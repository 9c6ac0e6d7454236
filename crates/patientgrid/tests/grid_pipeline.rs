//! End-to-end pipeline tests
//!
//! Drives the one-call entry points over the in-memory clinical store:
//! compile a grid, evaluate it, and read back normalized rows.

use chrono::{NaiveDate, NaiveDateTime};
use patientgrid::eval::CellValue;
use patientgrid::model::{
    Concept, Encounter, EncounterType, InMemoryClinicalStore, Obs, ObsValue, PatientRecord,
    PersonName, SETTING_AGE_RANGES,
};
use patientgrid::types::ColumnKind;
use patientgrid::{
    compile_grid, run_grid, ClinicalServices, Cohort, CompileError, EvaluationContext, GridColumn,
    GridError, PatientGrid,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;

fn datetime(text: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn intake() -> EncounterType {
    EncounterType::new("et-intake", "Intake")
}

fn sample_services() -> ClinicalServices {
    let mut store = InMemoryClinicalStore::new();
    store.set_setting(SETTING_AGE_RANGES, "0-14:children,15-47:adults,elders");

    store.add_patient(PatientRecord {
        id: 1,
        uuid: "p-alice".into(),
        name: PersonName::new("Alice", "Smith"),
        gender: "F".into(),
        birthdate: NaiveDate::from_ymd_opt(1990, 3, 10).unwrap(),
    });
    store.add_patient(PatientRecord {
        id: 2,
        uuid: "p-bob".into(),
        name: PersonName::new("Bob", "Jones"),
        gender: "M".into(),
        birthdate: NaiveDate::from_ymd_opt(2015, 8, 20).unwrap(),
    });

    let mut visit = Encounter {
        uuid: "e1".into(),
        encounter_type: intake(),
        patient: 1,
        datetime: datetime("2023-09-01 10:00:00"),
        location: None,
        obs: Vec::new(),
    };
    visit.obs.push(Obs::new(
        "o1",
        Concept::new("c-weight", "Weight"),
        ObsValue::Numeric("64.5".parse().unwrap()),
    ));
    store.add_encounter(visit);

    ClinicalServices::from_store(Arc::new(store))
}

fn report_grid() -> PatientGrid {
    PatientGrid::new("g1", "intake report")
        .with_column(GridColumn::new("name", ColumnKind::Name))
        .with_column(GridColumn::new(
            "encDate",
            ColumnKind::EncounterDate {
                encounter_type: intake(),
            },
        ))
        .with_column(GridColumn::new(
            "ageCategory",
            ColumnKind::EncounterAge {
                encounter_type: intake(),
                into_age_range: true,
            },
        ))
        .with_column(GridColumn::new(
            "weight",
            ColumnKind::Obs {
                encounter_type: intake(),
                concept: Concept::new("c-weight", "Weight"),
            },
        ))
}

#[test]
fn test_compile_then_run_produces_normalized_rows() {
    let services = sample_services();
    let plan = compile_grid(&report_grid(), true, Some("+00:00"), &services).unwrap();
    assert_eq!(plan.columns.len(), 5);

    let mut context = EvaluationContext::new();
    let dataset = run_grid(
        &report_grid(),
        &Cohort::of([1, 2]),
        true,
        Some("+00:00"),
        &services,
        &mut context,
    )
    .unwrap();

    assert_eq!(dataset.rows.len(), 2);
    let alice = dataset.row(1).unwrap();
    assert_eq!(alice.cell("name"), Some(&CellValue::Text("Alice Smith".into())));
    assert_eq!(
        alice.cell("encDate"),
        Some(&CellValue::DateTime(datetime("2023-09-01 10:00:00")))
    );
    assert_eq!(
        alice.cell("ageCategory"),
        Some(&CellValue::Text("adults".into()))
    );
    assert_eq!(
        alice.cell("weight"),
        Some(&CellValue::Decimal("64.5".parse().unwrap()))
    );

    // Bob never visited; his encounter-backed cells are null.
    let bob = dataset.row(2).unwrap();
    assert!(bob.cell("encDate").unwrap().is_null());
    assert!(bob.cell("weight").unwrap().is_null());

    // Alice sorts first on the descending date key.
    assert_eq!(dataset.rows[0].patient, 1);
}

#[test]
fn test_unsupported_kind_aborts_the_pipeline() {
    let services = sample_services();
    let grid = report_grid().with_column(GridColumn::new("id", ColumnKind::Identifier));

    let mut context = EvaluationContext::new();
    let result = run_grid(
        &grid,
        &Cohort::of([1]),
        true,
        Some("+00:00"),
        &services,
        &mut context,
    );
    assert!(matches!(
        result,
        Err(GridError::Compile(CompileError::UnsupportedColumnKind { .. }))
    ));
}

#[test]
fn test_excluded_obs_columns_are_not_planned() {
    let services = sample_services();
    let plan = compile_grid(&report_grid(), false, Some("+00:00"), &services).unwrap();
    let names: Vec<_> = plan.columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["uuid", "name", "encDate", "ageCategory"]);
}
