//! Grid specification model
//!
//! A grid describes one tabular clinical report: an ordered sequence of
//! typed column definitions plus optional location and period filters.
//! Grids arrive from an external resource layer and are immutable once
//! compilation begins.

use chrono::NaiveDateTime;
use patientgrid_model::{Concept, EncounterType, Location};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A declarative specification of one tabular clinical report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientGrid {
    /// External unique identifier
    pub uuid: String,
    /// Grid name
    pub name: String,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Column definitions, in declaration order
    pub columns: Vec<GridColumn>,
    /// Location constraints; empty means unconstrained
    #[serde(default)]
    pub location_filters: Vec<LocationFilter>,
    /// Period constraint, at most one
    #[serde(default)]
    pub period_filter: Option<PeriodFilter>,
}

impl PatientGrid {
    /// Create a grid with no columns or filters
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            description: None,
            columns: Vec::new(),
            location_filters: Vec::new(),
            period_filter: None,
        }
    }

    /// Append a column definition
    pub fn with_column(mut self, column: GridColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Append a location filter
    pub fn with_location_filter(mut self, filter: LocationFilter) -> Self {
        self.location_filters.push(filter);
        self
    }

    /// Set the period filter
    pub fn with_period_filter(mut self, filter: PeriodFilter) -> Self {
        self.period_filter = Some(filter);
        self
    }

    /// Distinct encounter types across all observation columns, in
    /// declaration order.
    pub fn obs_encounter_types(&self) -> Vec<EncounterType> {
        let mut types: Vec<EncounterType> = Vec::new();
        for column in &self.columns {
            if let ColumnKind::Obs { encounter_type, .. } = &column.kind {
                if !types.iter().any(|t| t.uuid == encounter_type.uuid) {
                    types.push(encounter_type.clone());
                }
            }
        }
        types
    }
}

/// One column definition within a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridColumn {
    /// Output key, unique within a grid
    pub name: String,
    /// Display label
    #[serde(default)]
    pub display: Option<String>,
    /// Optional description
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the column is hidden from rendered output
    #[serde(default)]
    pub hidden: bool,
    /// Column-level filters, interpreted by the operand converter
    #[serde(default)]
    pub filters: Vec<ColumnFilter>,
    /// The column kind and its kind-specific attributes
    #[serde(flatten)]
    pub kind: ColumnKind,
}

impl GridColumn {
    /// Create a visible, unfiltered column
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            display: None,
            description: None,
            hidden: false,
            filters: Vec::new(),
            kind,
        }
    }

    /// Set the display label
    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Mark the column hidden
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Append a column-level filter
    pub fn with_filter(mut self, filter: ColumnFilter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// The closed set of column kinds a grid can declare.
///
/// The external representation carries the kind under a `datatype` tag
/// using the wire names the resource layer exposes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "datatype")]
pub enum ColumnKind {
    /// Preferred patient name
    #[serde(rename = "NAME")]
    Name,
    /// Patient gender
    #[serde(rename = "GENDER")]
    Gender,
    /// Patient identifier; declared but carries no retrieval strategy
    #[serde(rename = "IDENTIFIER")]
    Identifier,
    /// Date of the most recent encounter of a type
    #[serde(rename = "ENC_DATE")]
    EncounterDate {
        /// The encounter type to match
        #[serde(rename = "encounterType")]
        encounter_type: EncounterType,
    },
    /// Age at the most recent encounter of a type
    #[serde(rename = "ENC_AGE")]
    EncounterAge {
        /// The encounter type to match
        #[serde(rename = "encounterType")]
        encounter_type: EncounterType,
        /// Coarsen the exact age into a configured age bucket
        #[serde(rename = "convertToAgeRange", default)]
        into_age_range: bool,
    },
    /// Answer of an observation recorded at the most recent encounter
    #[serde(rename = "OBS")]
    Obs {
        /// The encounter type to match
        #[serde(rename = "encounterType")]
        encounter_type: EncounterType,
        /// The question concept to match
        concept: Concept,
    },
    /// Location of the most recent encounter
    #[serde(rename = "ENC_LOCATION")]
    EncounterLocation,
    /// Country of the most recent encounter's location
    #[serde(rename = "ENC_COUNTRY")]
    EncounterCountry,
}

impl ColumnKind {
    /// The wire name of this kind
    pub fn datatype(&self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Gender => "GENDER",
            Self::Identifier => "IDENTIFIER",
            Self::EncounterDate { .. } => "ENC_DATE",
            Self::EncounterAge { .. } => "ENC_AGE",
            Self::Obs { .. } => "OBS",
            Self::EncounterLocation => "ENC_LOCATION",
            Self::EncounterCountry => "ENC_COUNTRY",
        }
    }
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.datatype())
    }
}

/// A column-level filter with a free-text operand.
///
/// Operands are interpreted on demand by the operand converter; the cohort
/// layer consuming them is external to this engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnFilter {
    /// Filter name
    pub name: String,
    /// Free-text operand
    pub operand: String,
}

impl ColumnFilter {
    /// Create a new filter
    pub fn new(name: impl Into<String>, operand: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            operand: operand.into(),
        }
    }
}

/// A period constraint declared on a grid.
///
/// Bounds are naive datetimes expressed in the caller's timezone; the
/// compiler converts them into the server zone before use. `from <= to`
/// must hold when both bounds are present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeriodFilter {
    /// Lower bound, inclusive
    #[serde(rename = "fromDate", default)]
    pub from_date: Option<NaiveDateTime>,
    /// Upper bound, inclusive
    #[serde(rename = "toDate", default)]
    pub to_date: Option<NaiveDateTime>,
}

/// A location constraint declared on a grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationFilter {
    /// Member locations
    pub locations: Vec<Location>,
    /// Expand every member to its descendant set before matching
    #[serde(default)]
    pub country: bool,
}
