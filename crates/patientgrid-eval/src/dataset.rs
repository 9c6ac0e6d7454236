//! Result normalization
//!
//! Executes a compiled query plan over a cohort and assembles one flat
//! row per patient. Each planned column runs its retrieval through the
//! collaborator traits and pushes the raw value through the attached
//! converter; the plan's sort order is applied to the assembled rows.
//! No column's retrieval assumes another column's retrieval has run.

use crate::context::EvaluationContext;
use crate::encounters::{resolve_encounters, EncounterMatches};
use crate::error::{EvalError, EvalResult};
use crate::obs::find_observation;
use crate::value::CellValue;
use indexmap::IndexMap;
use patientgrid_compile::{
    ColumnConverter, ColumnRetrieval, EncounterScope, PlannedColumn, QueryPlan, SortCriteria,
    SortDirection,
};
use patientgrid_model::{
    age_in_years, ClinicalServices, Cohort, Location, ObsValue, PatientId, PersonName,
};
use patientgrid_types::range_for_age;
use std::cmp::Ordering;
use std::collections::HashMap;

/// The assembled output of one plan evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct PatientDataSet {
    /// One row per cohort member, in the plan's sort order
    pub rows: Vec<GridRow>,
}

impl PatientDataSet {
    /// The row belonging to `patient`, if present
    pub fn row(&self, patient: PatientId) -> Option<&GridRow> {
        self.rows.iter().find(|row| row.patient == patient)
    }
}

/// One flat row of grid output.
#[derive(Debug, Clone, PartialEq)]
pub struct GridRow {
    /// The patient the row belongs to
    pub patient: PatientId,
    /// Cells keyed by column output key, in plan order
    pub cells: IndexMap<String, CellValue>,
}

impl GridRow {
    /// The cell under `name`, if the plan declared such a column
    pub fn cell(&self, name: &str) -> Option<&CellValue> {
        self.cells.get(name)
    }
}

/// A raw, unconverted column value.
#[derive(Debug, Clone)]
enum RawValue {
    Text(String),
    Name(PersonName),
    Date(chrono::NaiveDateTime),
    Age(i64),
    Location(Location),
    Obs(ObsValue),
}

/// Executes query plans against the collaborator layer.
pub struct GridEvaluator {
    services: ClinicalServices,
}

impl GridEvaluator {
    /// Create an evaluator over the given collaborators
    pub fn new(services: ClinicalServices) -> Self {
        Self { services }
    }

    /// Evaluate `plan` over `cohort`, assembling one row per member.
    ///
    /// `context` must be fresh per evaluation; it accumulates the
    /// latest-encounter-date cache and any diagnostics.
    pub fn evaluate(
        &self,
        plan: &QueryPlan,
        cohort: &Cohort,
        context: &mut EvaluationContext,
    ) -> EvalResult<PatientDataSet> {
        let mut columns: Vec<(String, HashMap<PatientId, CellValue>)> =
            Vec::with_capacity(plan.columns.len());
        for planned in &plan.columns {
            let cells = self.evaluate_column(planned, cohort, context)?;
            columns.push((planned.name.clone(), cells));
        }

        let mut rows: Vec<GridRow> = cohort
            .iter()
            .map(|patient| {
                let cells = columns
                    .iter()
                    .map(|(name, cells)| {
                        let cell = cells.get(&patient).cloned().unwrap_or(CellValue::Null);
                        (name.clone(), cell)
                    })
                    .collect();
                GridRow { patient, cells }
            })
            .collect();

        if let Some(sort) = &plan.sort {
            apply_sort(&mut rows, sort);
        }

        Ok(PatientDataSet { rows })
    }

    fn evaluate_column(
        &self,
        planned: &PlannedColumn,
        cohort: &Cohort,
        context: &mut EvaluationContext,
    ) -> EvalResult<HashMap<PatientId, CellValue>> {
        let raw: HashMap<PatientId, RawValue> = match &planned.retrieval {
            ColumnRetrieval::PatientUuid => self
                .services
                .data
                .patient_uuids(cohort)?
                .into_iter()
                .map(|(patient, uuid)| (patient, RawValue::Text(uuid)))
                .collect(),
            ColumnRetrieval::PreferredName => self
                .services
                .data
                .preferred_names(cohort)?
                .into_iter()
                .map(|(patient, name)| (patient, RawValue::Name(name)))
                .collect(),
            ColumnRetrieval::Gender => self
                .services
                .data
                .genders(cohort)?
                .into_iter()
                .map(|(patient, gender)| (patient, RawValue::Text(gender)))
                .collect(),
            ColumnRetrieval::EncounterDate(scope) => self
                .latest_encounters(scope, cohort, context)?
                .into_iter()
                .filter_map(|(patient, matches)| {
                    matches
                        .newest()
                        .map(|encounter| (patient, RawValue::Date(encounter.datetime)))
                })
                .collect(),
            ColumnRetrieval::EncounterAge(scope) => {
                let birthdates = self.services.data.birthdates(cohort)?;
                self.latest_encounters(scope, cohort, context)?
                    .into_iter()
                    .filter_map(|(patient, matches)| {
                        let encounter = matches.newest()?;
                        let birthdate = birthdates.get(&patient)?;
                        let age = age_in_years(*birthdate, encounter.datetime.date());
                        Some((patient, RawValue::Age(age)))
                    })
                    .collect()
            }
            ColumnRetrieval::EncounterObs { scope, concept } => self
                .latest_encounters(scope, cohort, context)?
                .into_iter()
                .filter_map(|(patient, matches)| {
                    let encounter = matches.newest()?;
                    find_observation(encounter, concept, context)
                        .map(|obs| (patient, RawValue::Obs(obs.value.clone())))
                })
                .collect(),
            ColumnRetrieval::EncounterLocation => {
                // Unscoped on purpose: the newest visit of any type decides
                // where the patient was last seen.
                resolve_encounters(None, cohort, None, None, true, &self.services, context)?
                    .into_iter()
                    .filter_map(|(patient, matches)| {
                        let location = matches.newest()?.location.clone()?;
                        Some((patient, RawValue::Location(location)))
                    })
                    .collect()
            }
        };

        let mut cells = HashMap::with_capacity(raw.len());
        for (patient, value) in raw {
            cells.insert(patient, convert_value(value, &planned.converter)?);
        }
        Ok(cells)
    }

    fn latest_encounters(
        &self,
        scope: &EncounterScope,
        cohort: &Cohort,
        context: &mut EvaluationContext,
    ) -> EvalResult<HashMap<PatientId, EncounterMatches>> {
        resolve_encounters(
            Some(&scope.encounter_type),
            cohort,
            scope.locations.as_ref(),
            scope.period.as_ref(),
            true,
            &self.services,
            context,
        )
    }
}

/// Push one raw value through the column's converter.
fn convert_value(raw: RawValue, converter: &ColumnConverter) -> EvalResult<CellValue> {
    let converted = match (converter, raw) {
        (ColumnConverter::Identity, RawValue::Text(text)) => CellValue::Text(text),
        (ColumnConverter::Identity, RawValue::Date(datetime)) => CellValue::DateTime(datetime),
        (ColumnConverter::Object, RawValue::Name(name)) => CellValue::Text(name.to_string()),
        (ColumnConverter::Object, RawValue::Location(location)) => {
            CellValue::Text(location.name)
        }
        (ColumnConverter::Object, RawValue::Text(text)) => CellValue::Text(text),
        (ColumnConverter::CountryName, RawValue::Location(location)) => location
            .country
            .map(CellValue::Text)
            .unwrap_or(CellValue::Null),
        (ColumnConverter::Age, RawValue::Age(age)) => CellValue::Integer(age),
        (ColumnConverter::AgeBucket(ranges), RawValue::Age(age)) => range_for_age(ranges, age)
            .map(|range| CellValue::Text(range.label.clone()))
            .unwrap_or(CellValue::Null),
        (ColumnConverter::ObsValue, RawValue::Obs(value)) => match value {
            ObsValue::Text(text) => CellValue::Text(text),
            ObsValue::Numeric(number) => CellValue::Decimal(number),
            ObsValue::Boolean(flag) => CellValue::Boolean(flag),
            ObsValue::DateTime(datetime) => CellValue::DateTime(datetime),
            ObsValue::Coded(concept) => CellValue::Text(concept.name),
        },
        (converter, raw) => {
            return Err(EvalError::evaluation(format!(
                "converter {:?} cannot format raw value {:?}",
                converter, raw
            )));
        }
    };
    Ok(converted)
}

/// Sort `rows` by `sort`, element precedence in order; null cells
/// collate last regardless of direction.
fn apply_sort(rows: &mut [GridRow], sort: &SortCriteria) {
    rows.sort_by(|a, b| {
        for element in &sort.elements {
            let left = a.cell(&element.column).unwrap_or(&CellValue::Null);
            let right = b.cell(&element.column).unwrap_or(&CellValue::Null);
            let ordering = match (left.is_null(), right.is_null()) {
                (true, true) => Ordering::Equal,
                (true, false) => Ordering::Greater,
                (false, true) => Ordering::Less,
                (false, false) => match element.direction {
                    SortDirection::Ascending => left.compare(right),
                    SortDirection::Descending => left.compare(right).reverse(),
                },
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}
