//! Grid compiler
//!
//! Dispatches on every declared column kind to produce the matching
//! query-plan fragment. The dispatch table is a closed, exhaustive match:
//! a kind with no retrieval strategy aborts the whole compilation, and no
//! partial plan ever escapes.

use crate::error::CompileError;
use crate::filters::{extract_location_filter, extract_period_range};
use crate::plan::{
    ColumnConverter, ColumnRetrieval, EncounterScope, PlannedColumn, QueryPlan, SortCriteria,
    COLUMN_UUID,
};
use log::debug;
use patientgrid_model::SettingRegistry;
use patientgrid_types::{AgeRangeCatalog, ColumnKind, PatientGrid};
use std::collections::HashSet;

/// Compile `grid` into an executable query plan.
///
/// A hidden identity column keyed by the patient uuid is always planned
/// first. Observation columns are skipped entirely when `include_obs` is
/// false; their retrieval is expensive and optional. The age range
/// catalog is only consulted for columns that bucket ages, so a missing
/// age range setting cannot fail grids without such columns.
pub fn compile(
    grid: &PatientGrid,
    include_obs: bool,
    caller_timezone: Option<&str>,
    settings: &dyn SettingRegistry,
    catalog: &AgeRangeCatalog,
) -> Result<QueryPlan, CompileError> {
    debug!("compiling grid {} ({} columns)", grid.name, grid.columns.len());

    let mut plan = QueryPlan {
        columns: vec![PlannedColumn {
            name: COLUMN_UUID.to_string(),
            hidden: true,
            retrieval: ColumnRetrieval::PatientUuid,
            converter: ColumnConverter::Identity,
        }],
        sort: None,
    };

    let location_filter = extract_location_filter(grid);
    let period = extract_period_range(grid, caller_timezone)?;

    let mut seen: HashSet<&str> = HashSet::new();
    seen.insert(COLUMN_UUID);

    for column in &grid.columns {
        if !include_obs && matches!(column.kind, ColumnKind::Obs { .. }) {
            continue;
        }
        if !seen.insert(column.name.as_str()) {
            return Err(CompileError::DuplicateColumn {
                name: column.name.clone(),
            });
        }

        let (retrieval, converter) = match &column.kind {
            ColumnKind::Name => (ColumnRetrieval::PreferredName, ColumnConverter::Object),
            ColumnKind::Gender => (ColumnRetrieval::Gender, ColumnConverter::Identity),
            ColumnKind::Identifier => {
                return Err(CompileError::UnsupportedColumnKind {
                    kind: column.kind.datatype().to_string(),
                });
            }
            ColumnKind::EncounterDate { encounter_type } => {
                // The newest encounter date is the grid's primary sort key
                // by convention; a later date column replaces the criteria.
                plan.sort = Some(SortCriteria::descending(&column.name));
                (
                    ColumnRetrieval::EncounterDate(EncounterScope {
                        encounter_type: encounter_type.clone(),
                        locations: location_filter.clone(),
                        period: period.clone(),
                    }),
                    ColumnConverter::Identity,
                )
            }
            ColumnKind::EncounterAge {
                encounter_type,
                into_age_range,
            } => {
                let converter = if *into_age_range {
                    ColumnConverter::AgeBucket(catalog.get(settings)?)
                } else {
                    ColumnConverter::Age
                };
                (
                    ColumnRetrieval::EncounterAge(EncounterScope {
                        encounter_type: encounter_type.clone(),
                        locations: location_filter.clone(),
                        period: period.clone(),
                    }),
                    converter,
                )
            }
            ColumnKind::Obs {
                encounter_type,
                concept,
            } => (
                ColumnRetrieval::EncounterObs {
                    scope: EncounterScope {
                        encounter_type: encounter_type.clone(),
                        locations: location_filter.clone(),
                        period: period.clone(),
                    },
                    concept: concept.clone(),
                },
                ColumnConverter::ObsValue,
            ),
            ColumnKind::EncounterLocation => {
                (ColumnRetrieval::EncounterLocation, ColumnConverter::Object)
            }
            ColumnKind::EncounterCountry => (
                ColumnRetrieval::EncounterLocation,
                ColumnConverter::CountryName,
            ),
        };

        plan.columns.push(PlannedColumn {
            name: column.name.clone(),
            hidden: column.hidden,
            retrieval,
            converter,
        });
    }

    Ok(plan)
}
