//! Clinical record types
//!
//! Thin snapshots of the records the backing store hands the engine: just
//! the fields grid compilation and normalization actually read.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Internal identifier of a patient in the backing store.
pub type PatientId = i32;

/// The set of patient ids a query is scoped to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cohort {
    members: BTreeSet<PatientId>,
}

impl Cohort {
    /// Create an empty cohort
    pub fn new() -> Self {
        Self {
            members: BTreeSet::new(),
        }
    }

    /// Create a cohort from the given member ids
    pub fn of(members: impl IntoIterator<Item = PatientId>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    /// Add a member
    pub fn insert(&mut self, id: PatientId) {
        self.members.insert(id);
    }

    /// Check membership
    pub fn contains(&self, id: PatientId) -> bool {
        self.members.contains(&id)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the cohort has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Iterate members in ascending id order
    pub fn iter(&self) -> impl Iterator<Item = PatientId> + '_ {
        self.members.iter().copied()
    }
}

impl FromIterator<PatientId> for Cohort {
    fn from_iter<T: IntoIterator<Item = PatientId>>(iter: T) -> Self {
        Self::of(iter)
    }
}

/// A clinical concept, resolved by external uuid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    /// External unique identifier
    pub uuid: String,
    /// Preferred display name
    pub name: String,
}

impl Concept {
    /// Create a new concept
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A service location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// External unique identifier
    pub uuid: String,
    /// Display name
    pub name: String,
    /// Country from the administrative hierarchy, when recorded
    pub country: Option<String>,
}

impl Location {
    /// Create a new location with no country
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
            country: None,
        }
    }

    /// Set the country
    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// The type of a clinical visit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterType {
    /// External unique identifier
    pub uuid: String,
    /// Display name
    pub name: String,
}

impl EncounterType {
    /// Create a new encounter type
    pub fn new(uuid: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for EncounterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// A single clinical visit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Encounter {
    /// External unique identifier
    pub uuid: String,
    /// The type of visit
    pub encounter_type: EncounterType,
    /// The patient the visit belongs to
    pub patient: PatientId,
    /// When the visit happened
    pub datetime: NaiveDateTime,
    /// Where the visit happened, when recorded
    pub location: Option<Location>,
    /// Observations recorded during the visit
    pub obs: Vec<Obs>,
}

/// The recorded answer of an observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ObsValue {
    /// Free-text answer
    Text(String),
    /// Numeric answer
    Numeric(Decimal),
    /// Boolean answer
    Boolean(bool),
    /// Date/time answer
    DateTime(NaiveDateTime),
    /// Coded answer
    Coded(Concept),
}

/// A single question/answer data point recorded within an encounter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Obs {
    /// External unique identifier
    pub uuid: String,
    /// The question concept
    pub concept: Concept,
    /// The recorded answer
    pub value: ObsValue,
    /// Whether the observation has been voided
    pub voided: bool,
    /// Uuid of the parent grouping observation, if this obs is grouped
    pub obs_group: Option<String>,
    /// Member observations when this obs is itself a group header
    pub group_members: Vec<Obs>,
}

impl Obs {
    /// Create a new top-level, non-voided observation
    pub fn new(uuid: impl Into<String>, concept: Concept, value: ObsValue) -> Self {
        Self {
            uuid: uuid.into(),
            concept,
            value,
            voided: false,
            obs_group: None,
            group_members: Vec::new(),
        }
    }

    /// Check if this observation is a group header
    pub fn has_group_members(&self) -> bool {
        !self.group_members.is_empty()
    }
}

/// A person's preferred name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName {
    /// Given name
    pub given: String,
    /// Family name
    pub family: String,
}

impl PersonName {
    /// Create a new name
    pub fn new(given: impl Into<String>, family: impl Into<String>) -> Self {
        Self {
            given: given.into(),
            family: family.into(),
        }
    }
}

impl fmt::Display for PersonName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.given, self.family)
    }
}

/// Whole years between `birthdate` and `on`.
pub fn age_in_years(birthdate: NaiveDate, on: NaiveDate) -> i64 {
    use chrono::Datelike;
    let mut age = i64::from(on.year() - birthdate.year());
    if (on.month(), on.day()) < (birthdate.month(), birthdate.day()) {
        age -= 1;
    }
    age
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cohort_ordering() {
        let cohort = Cohort::of([3, 1, 2]);
        let ids: Vec<_> = cohort.iter().collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn test_age_in_years_before_birthday() {
        let birth = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();
        let on = NaiveDate::from_ymd_opt(2024, 6, 14).unwrap();
        assert_eq!(age_in_years(birth, on), 33);
    }

    #[test]
    fn test_age_in_years_on_birthday() {
        let birth = NaiveDate::from_ymd_opt(1990, 6, 15).unwrap();
        let on = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        assert_eq!(age_in_years(birth, on), 34);
    }

    #[test]
    fn test_obs_group_header() {
        let concept = Concept::new("c1", "Vitals");
        let member = Obs::new("o2", Concept::new("c2", "Weight"), ObsValue::Text("70".into()));
        let mut header = Obs::new("o1", concept, ObsValue::Text("".into()));
        header.group_members.push(member);
        assert!(header.has_group_members());
    }
}
