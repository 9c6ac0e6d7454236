//! In-memory collaborator implementation
//!
//! A small clinical store implementing every collaborator trait, used by
//! the test suites across the workspace. It honors period bounds, location
//! scope, and latest-only semantics so resolver tests exercise real
//! filtering rather than canned maps.

use crate::provider::{
    DataSourceError, EncounterQuery, LocationHierarchy, PatientDataSource, ReferenceLookup,
    SettingRegistry, TimeQualifier,
};
use crate::records::{Cohort, Concept, Encounter, Location, PatientId, PersonName};
use chrono::NaiveDate;
use std::collections::HashMap;

/// Demographics of one stored patient.
#[derive(Debug, Clone)]
pub struct PatientRecord {
    /// Internal id
    pub id: PatientId,
    /// External unique identifier
    pub uuid: String,
    /// Preferred name
    pub name: PersonName,
    /// Gender code
    pub gender: String,
    /// Birthdate
    pub birthdate: NaiveDate,
}

/// In-memory clinical store.
#[derive(Default)]
pub struct InMemoryClinicalStore {
    patients: HashMap<PatientId, PatientRecord>,
    encounters: Vec<Encounter>,
    concepts: HashMap<String, Concept>,
    locations: HashMap<String, Location>,
    descendants: HashMap<String, Vec<Location>>,
    settings: HashMap<String, String>,
}

impl InMemoryClinicalStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a patient
    pub fn add_patient(&mut self, patient: PatientRecord) {
        self.patients.insert(patient.id, patient);
    }

    /// Add an encounter
    pub fn add_encounter(&mut self, encounter: Encounter) {
        self.encounters.push(encounter);
    }

    /// Register a concept for uuid lookup
    pub fn add_concept(&mut self, concept: Concept) {
        self.concepts.insert(concept.uuid.clone(), concept);
    }

    /// Register a location for uuid lookup
    pub fn add_location(&mut self, location: Location) {
        self.locations.insert(location.uuid.clone(), location);
    }

    /// Register a descendant of `parent_uuid` in the location hierarchy
    pub fn add_descendant(&mut self, parent_uuid: impl Into<String>, descendant: Location) {
        self.descendants
            .entry(parent_uuid.into())
            .or_default()
            .push(descendant);
    }

    /// Set a global setting
    pub fn set_setting(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.settings.insert(key.into(), value.into());
    }

    fn matches(query: &EncounterQuery, encounter: &Encounter) -> bool {
        if let Some(encounter_type) = &query.encounter_type {
            if encounter.encounter_type.uuid != encounter_type.uuid {
                return false;
            }
        }
        if let Some(after) = query.on_or_after {
            if encounter.datetime < after {
                return false;
            }
        }
        if let Some(before) = query.on_or_before {
            if encounter.datetime > before {
                return false;
            }
        }
        if let Some(scope) = &query.locations {
            match &encounter.location {
                Some(location) => {
                    if !scope.iter().any(|l| l.uuid == location.uuid) {
                        return false;
                    }
                }
                None => return false,
            }
        }
        true
    }
}

impl PatientDataSource for InMemoryClinicalStore {
    fn evaluate_encounters(
        &self,
        query: &EncounterQuery,
        cohort: &Cohort,
    ) -> Result<HashMap<PatientId, Vec<Encounter>>, DataSourceError> {
        let mut results: HashMap<PatientId, Vec<Encounter>> = HashMap::new();
        for encounter in &self.encounters {
            if cohort.contains(encounter.patient) && Self::matches(query, encounter) {
                results
                    .entry(encounter.patient)
                    .or_default()
                    .push(encounter.clone());
            }
        }
        for list in results.values_mut() {
            list.sort_by(|a, b| b.datetime.cmp(&a.datetime));
            if query.which == TimeQualifier::Last {
                list.truncate(1);
            }
        }
        Ok(results)
    }

    fn preferred_names(
        &self,
        cohort: &Cohort,
    ) -> Result<HashMap<PatientId, PersonName>, DataSourceError> {
        Ok(cohort
            .iter()
            .filter_map(|id| self.patients.get(&id).map(|p| (id, p.name.clone())))
            .collect())
    }

    fn genders(&self, cohort: &Cohort) -> Result<HashMap<PatientId, String>, DataSourceError> {
        Ok(cohort
            .iter()
            .filter_map(|id| self.patients.get(&id).map(|p| (id, p.gender.clone())))
            .collect())
    }

    fn patient_uuids(
        &self,
        cohort: &Cohort,
    ) -> Result<HashMap<PatientId, String>, DataSourceError> {
        Ok(cohort
            .iter()
            .filter_map(|id| self.patients.get(&id).map(|p| (id, p.uuid.clone())))
            .collect())
    }

    fn birthdates(
        &self,
        cohort: &Cohort,
    ) -> Result<HashMap<PatientId, NaiveDate>, DataSourceError> {
        Ok(cohort
            .iter()
            .filter_map(|id| self.patients.get(&id).map(|p| (id, p.birthdate)))
            .collect())
    }
}

impl LocationHierarchy for InMemoryClinicalStore {
    fn descendant_locations(&self, location: &Location) -> Vec<Location> {
        self.descendants
            .get(&location.uuid)
            .cloned()
            .unwrap_or_default()
    }
}

impl ReferenceLookup for InMemoryClinicalStore {
    fn concept_by_uuid(&self, uuid: &str) -> Option<Concept> {
        self.concepts.get(uuid).cloned()
    }

    fn location_by_uuid(&self, uuid: &str) -> Option<Location> {
        self.locations.get(uuid).cloned()
    }
}

impl SettingRegistry for InMemoryClinicalStore {
    fn setting(&self, key: &str) -> Option<String> {
        self.settings.get(key).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::EncounterType;
    use chrono::NaiveDateTime;

    fn encounter(
        uuid: &str,
        patient: PatientId,
        type_uuid: &str,
        datetime: &str,
        location: Option<Location>,
    ) -> Encounter {
        Encounter {
            uuid: uuid.into(),
            encounter_type: EncounterType::new(type_uuid, type_uuid),
            patient,
            datetime: NaiveDateTime::parse_from_str(datetime, "%Y-%m-%d %H:%M:%S").unwrap(),
            location,
            obs: Vec::new(),
        }
    }

    #[test]
    fn test_latest_only_returns_single_newest() {
        let mut store = InMemoryClinicalStore::new();
        store.add_encounter(encounter("e1", 1, "intake", "2023-01-01 08:00:00", None));
        store.add_encounter(encounter("e2", 1, "intake", "2023-06-01 08:00:00", None));

        let query = EncounterQuery::new()
            .with_type(EncounterType::new("intake", "Intake"))
            .most_recent_only();
        let results = store
            .evaluate_encounters(&query, &Cohort::of([1]))
            .unwrap();

        assert_eq!(results[&1].len(), 1);
        assert_eq!(results[&1][0].uuid, "e2");
    }

    #[test]
    fn test_period_bounds_are_inclusive() {
        let mut store = InMemoryClinicalStore::new();
        store.add_encounter(encounter("e1", 1, "intake", "2023-03-01 00:00:00", None));
        store.add_encounter(encounter("e2", 1, "intake", "2023-05-01 00:00:00", None));

        let from = NaiveDateTime::parse_from_str("2023-03-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let to = NaiveDateTime::parse_from_str("2023-04-01 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
        let query = EncounterQuery::new().with_period(Some(from), Some(to));
        let results = store
            .evaluate_encounters(&query, &Cohort::of([1]))
            .unwrap();

        assert_eq!(results[&1].len(), 1);
        assert_eq!(results[&1][0].uuid, "e1");
    }

    #[test]
    fn test_location_scope_excludes_unlocated_encounters() {
        let mut store = InMemoryClinicalStore::new();
        let clinic = Location::new("clinic-a", "Clinic A");
        store.add_encounter(encounter("e1", 1, "intake", "2023-01-01 08:00:00", None));
        store.add_encounter(encounter(
            "e2",
            1,
            "intake",
            "2023-02-01 08:00:00",
            Some(clinic.clone()),
        ));

        let query = EncounterQuery::new().with_locations(vec![clinic]);
        let results = store
            .evaluate_encounters(&query, &Cohort::of([1]))
            .unwrap();

        assert_eq!(results[&1].len(), 1);
        assert_eq!(results[&1][0].uuid, "e2");
    }

    #[test]
    fn test_patient_without_matches_is_absent() {
        let store = InMemoryClinicalStore::new();
        let query = EncounterQuery::new();
        let results = store
            .evaluate_encounters(&query, &Cohort::of([7]))
            .unwrap();
        assert!(!results.contains_key(&7));
    }
}
