//! Clinical data model abstraction for the patient grid engine
//!
//! This crate defines the record types the engine reads (patients,
//! encounters, observations, concepts, locations) and the collaborator
//! traits everything external is reached through: the backing data store,
//! the location hierarchy, reference lookup, and administrative settings.
//! An in-memory implementation of all four traits backs the test suites.

pub mod memory;
pub mod provider;
pub mod records;

// Re-export main types
pub use memory::{InMemoryClinicalStore, PatientRecord};
pub use provider::{
    ClinicalServices, DataSourceError, EncounterQuery, LocationHierarchy, PatientDataSource,
    ReferenceLookup, SettingRegistry, TimeQualifier, SETTING_AGE_RANGES,
};
pub use records::{
    age_in_years, Cohort, Concept, Encounter, EncounterType, Location, Obs, ObsValue, PatientId,
    PersonName,
};
