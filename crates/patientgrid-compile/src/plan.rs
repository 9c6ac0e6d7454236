//! Query plan model
//!
//! The compiled form of a grid: an ordered list of planned columns, each
//! pairing a retrieval strategy with the converter that normalizes its
//! raw values, plus the plan's sort order. A plan is constructed once per
//! compilation and consumed once by the evaluation side.

use crate::filters::PeriodRange;
use patientgrid_model::{Concept, EncounterType};
use patientgrid_types::{AgeRange, LocationFilter};
use std::sync::Arc;

/// Output key of the hidden identity column every plan starts with.
pub const COLUMN_UUID: &str = "uuid";

/// An executable tabular query plan.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    /// Planned columns, identity column first, then declaration order
    pub columns: Vec<PlannedColumn>,
    /// Sort order applied to the assembled rows
    pub sort: Option<SortCriteria>,
}

impl QueryPlan {
    /// Find a planned column by output key
    pub fn column(&self, name: &str) -> Option<&PlannedColumn> {
        self.columns.iter().find(|column| column.name == name)
    }
}

/// One column of a query plan.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedColumn {
    /// Output key
    pub name: String,
    /// Whether the column is hidden from rendered output
    pub hidden: bool,
    /// What to fetch
    pub retrieval: ColumnRetrieval,
    /// How to normalize the fetched value
    pub converter: ColumnConverter,
}

/// The retrieval strategy of one planned column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnRetrieval {
    /// External unique identifier of the patient
    PatientUuid,
    /// Preferred patient name
    PreferredName,
    /// Patient gender
    Gender,
    /// Date of the most recent matching encounter
    EncounterDate(EncounterScope),
    /// Age at the most recent matching encounter
    EncounterAge(EncounterScope),
    /// Answer of an observation at the most recent matching encounter
    EncounterObs {
        /// The encounter match scope
        scope: EncounterScope,
        /// The question concept to match
        concept: Concept,
    },
    /// Location of the patient's most recent encounter of any type
    EncounterLocation,
}

/// Scope shared by encounter-backed retrievals: the encounter type plus
/// the grid-level filter snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct EncounterScope {
    /// The encounter type to match
    pub encounter_type: EncounterType,
    /// Location match scope from the shared filter snapshot
    pub locations: Option<LocationFilter>,
    /// Period bounds from the shared filter snapshot
    pub period: Option<PeriodRange>,
}

/// The converter attached to one planned column.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnConverter {
    /// Pass the raw value through
    Identity,
    /// Generic display formatting
    Object,
    /// Project the country off a location
    CountryName,
    /// Exact age in whole years
    Age,
    /// Coarsen the age into a configured bucket label
    AgeBucket(Arc<Vec<AgeRange>>),
    /// Unwrap the recorded observation answer
    ObsValue,
}

/// Sort order of the assembled rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortCriteria {
    /// Sort elements, highest precedence first
    pub elements: Vec<SortElement>,
}

impl SortCriteria {
    /// A single descending sort on `column`
    pub fn descending(column: impl Into<String>) -> Self {
        Self {
            elements: vec![SortElement {
                column: column.into(),
                direction: SortDirection::Descending,
            }],
        }
    }
}

/// One element of a sort order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortElement {
    /// The column to sort by
    pub column: String,
    /// The sort direction
    pub direction: SortDirection,
}

/// Direction of one sort element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}
