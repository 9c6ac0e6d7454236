//! Collaborator traits the grid engine consumes
//!
//! Everything external to the engine sits behind these traits: the backing
//! clinical data store and its definition-evaluation machinery, the
//! administrative location hierarchy, reference resolution by uuid, and
//! global configuration. The engine issues synchronous calls and is
//! transparent to whatever threading model the implementations use.

use crate::records::{Cohort, Concept, Encounter, EncounterType, Location, PatientId, PersonName};
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Well-known setting key holding the comma-separated age range spec.
pub const SETTING_AGE_RANGES: &str = "patientgrid.ageRanges";

/// Which encounters of the match set to return per patient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeQualifier {
    /// Only the most recent matching encounter
    Last,
    /// The full matching history
    Any,
}

/// An encounter-retrieval definition evaluated by the backing store.
#[derive(Debug, Clone)]
pub struct EncounterQuery {
    /// Restrict to visits of this type; `None` matches every type
    pub encounter_type: Option<EncounterType>,
    /// Match scope; `None` leaves the location unrestricted
    pub locations: Option<Vec<Location>>,
    /// Lower period bound, inclusive
    pub on_or_after: Option<NaiveDateTime>,
    /// Upper period bound, inclusive
    pub on_or_before: Option<NaiveDateTime>,
    /// Latest-only or full history
    pub which: TimeQualifier,
}

impl EncounterQuery {
    /// Create an unrestricted full-history query
    pub fn new() -> Self {
        Self {
            encounter_type: None,
            locations: None,
            on_or_after: None,
            on_or_before: None,
            which: TimeQualifier::Any,
        }
    }

    /// Restrict to one encounter type
    pub fn with_type(mut self, encounter_type: EncounterType) -> Self {
        self.encounter_type = Some(encounter_type);
        self
    }

    /// Restrict the location match scope
    pub fn with_locations(mut self, locations: Vec<Location>) -> Self {
        self.locations = Some(locations);
        self
    }

    /// Set the inclusive period bounds; either may be `None`
    pub fn with_period(
        mut self,
        on_or_after: Option<NaiveDateTime>,
        on_or_before: Option<NaiveDateTime>,
    ) -> Self {
        self.on_or_after = on_or_after;
        self.on_or_before = on_or_before;
        self
    }

    /// Request only the most recent matching encounter per patient
    pub fn most_recent_only(mut self) -> Self {
        self.which = TimeQualifier::Last;
        self
    }
}

impl Default for EncounterQuery {
    fn default() -> Self {
        Self::new()
    }
}

/// Error raised by the backing store while evaluating a definition.
#[derive(Debug, Clone, Error)]
pub enum DataSourceError {
    /// The store accepted the definition but failed evaluating it
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// The store could not be reached
    #[error("backing store unavailable: {0}")]
    Unavailable(String),
}

/// Evaluates data definitions over a cohort.
///
/// This is the generic evaluation machinery the grid engine treats as a
/// black box: hand it a definition and a cohort, get a per-patient result
/// map back. Patients with no matching data are absent from the map.
pub trait PatientDataSource: Send + Sync {
    /// Evaluate an encounter-retrieval definition
    fn evaluate_encounters(
        &self,
        query: &EncounterQuery,
        cohort: &Cohort,
    ) -> Result<HashMap<PatientId, Vec<Encounter>>, DataSourceError>;

    /// Preferred name per patient
    fn preferred_names(
        &self,
        cohort: &Cohort,
    ) -> Result<HashMap<PatientId, PersonName>, DataSourceError>;

    /// Gender per patient
    fn genders(&self, cohort: &Cohort) -> Result<HashMap<PatientId, String>, DataSourceError>;

    /// External unique identifier per patient
    fn patient_uuids(
        &self,
        cohort: &Cohort,
    ) -> Result<HashMap<PatientId, String>, DataSourceError>;

    /// Birthdate per patient
    fn birthdates(&self, cohort: &Cohort)
        -> Result<HashMap<PatientId, NaiveDate>, DataSourceError>;
}

/// Administrative location hierarchy.
pub trait LocationHierarchy: Send + Sync {
    /// All descendant locations of `location`.
    ///
    /// Whether the location itself appears among its own descendants is
    /// defined by the implementation, not by this trait.
    fn descendant_locations(&self, location: &Location) -> Vec<Location>;
}

/// Resolves external identifiers to records. Absence of a match is `None`,
/// never an error.
pub trait ReferenceLookup: Send + Sync {
    /// Concept by external uuid
    fn concept_by_uuid(&self, uuid: &str) -> Option<Concept>;

    /// Location by external uuid
    fn location_by_uuid(&self, uuid: &str) -> Option<Location>;
}

/// Read access to global configuration.
pub trait SettingRegistry: Send + Sync {
    /// The setting value for `key`, when one is configured
    fn setting(&self, key: &str) -> Option<String>;
}

/// Bundle of collaborator handles threaded through one compilation and
/// evaluation. Cloning shares the underlying handles.
#[derive(Clone)]
pub struct ClinicalServices {
    /// The definition-evaluation machinery
    pub data: Arc<dyn PatientDataSource>,
    /// The administrative location hierarchy
    pub hierarchy: Arc<dyn LocationHierarchy>,
    /// Reference resolution by uuid
    pub lookup: Arc<dyn ReferenceLookup>,
    /// Global configuration
    pub settings: Arc<dyn SettingRegistry>,
}

impl ClinicalServices {
    /// Create a bundle from individual handles
    pub fn new(
        data: Arc<dyn PatientDataSource>,
        hierarchy: Arc<dyn LocationHierarchy>,
        lookup: Arc<dyn ReferenceLookup>,
        settings: Arc<dyn SettingRegistry>,
    ) -> Self {
        Self {
            data,
            hierarchy,
            lookup,
            settings,
        }
    }

    /// Convenience for a store implementing every collaborator trait
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: PatientDataSource + LocationHierarchy + ReferenceLookup + SettingRegistry + 'static,
    {
        Self {
            data: store.clone(),
            hierarchy: store.clone(),
            lookup: store.clone(),
            settings: store,
        }
    }
}
