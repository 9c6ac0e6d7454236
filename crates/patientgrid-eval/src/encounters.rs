//! Encounter resolution
//!
//! Retrieves, for a cohort and an optional encounter type, either the
//! single most recent matching encounter per patient or the full ordered
//! history, applying location-hierarchy expansion and period bounds.

use crate::context::EvaluationContext;
use crate::error::EvalResult;
use log::info;
use patientgrid_compile::PeriodRange;
use patientgrid_model::{
    ClinicalServices, Cohort, Encounter, EncounterQuery, EncounterType, Location, PatientId,
};
use patientgrid_types::LocationFilter;
use std::collections::HashMap;
use std::time::Instant;

/// The encounters resolved for one patient.
#[derive(Debug, Clone, PartialEq)]
pub enum EncounterMatches {
    /// The single most recent matching encounter
    Latest(Encounter),
    /// The full matching history, newest to oldest
    History(Vec<Encounter>),
}

impl EncounterMatches {
    /// The newest matching encounter
    pub fn newest(&self) -> Option<&Encounter> {
        match self {
            Self::Latest(encounter) => Some(encounter),
            Self::History(encounters) => encounters.first(),
        }
    }

    /// Number of matching encounters
    pub fn len(&self) -> usize {
        match self {
            Self::Latest(_) => 1,
            Self::History(encounters) => encounters.len(),
        }
    }

    /// Check if there are no matching encounters
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Resolve the matching encounters for every patient in `cohort`.
///
/// Country-flagged location filters are expanded to the union of every
/// member's descendant set, recomputed on each call; plain filters use
/// the declared locations verbatim. Every patient's most recent
/// encounter date is recorded on `context` whatever the result shape,
/// so date and age strategies can reuse it. In history mode each list is
/// ordered newest to oldest; downstream consumers depend on index 0
/// being the newest. Patients with zero matching encounters are absent
/// from the result, never present with an empty placeholder.
pub fn resolve_encounters(
    encounter_type: Option<&EncounterType>,
    cohort: &Cohort,
    locations: Option<&LocationFilter>,
    period: Option<&PeriodRange>,
    most_recent_only: bool,
    services: &ClinicalServices,
    context: &mut EvaluationContext,
) -> EvalResult<HashMap<PatientId, EncounterMatches>> {
    // Single-patient lookups are frequent and would flood the log.
    let verbose = cohort.len() > 1;
    if verbose {
        info!(
            "fetching encounters of type: {:?}, most recent only: {}",
            encounter_type.map(|t| t.name.as_str()),
            most_recent_only
        );
    }
    let started = Instant::now();

    let mut query = EncounterQuery::new();
    if let Some(encounter_type) = encounter_type {
        query = query.with_type(encounter_type.clone());
    }
    if let Some(filter) = locations {
        query = query.with_locations(match_scope(filter, services));
    }
    if let Some(period) = period {
        query = query.with_period(period.from, period.to);
    }
    if most_recent_only {
        query = query.most_recent_only();
    }

    let raw = services.data.evaluate_encounters(&query, cohort)?;

    let mut results = HashMap::with_capacity(raw.len());
    for (patient, mut encounters) in raw {
        if encounters.is_empty() {
            continue;
        }
        for encounter in &encounters {
            context.record_latest_encounter(patient, encounter.datetime);
        }
        // Newest first; the location-at-encounter lookup depends on
        // index 0 being the newest.
        encounters.sort_by(|a, b| b.datetime.cmp(&a.datetime));
        let matches = if most_recent_only {
            match encounters.into_iter().next() {
                Some(newest) => EncounterMatches::Latest(newest),
                None => continue,
            }
        } else {
            EncounterMatches::History(encounters)
        };
        results.insert(patient, matches);
    }

    if verbose {
        info!(
            "fetching encounters of type: {:?}, most recent only: {} completed in {:?}",
            encounter_type.map(|t| t.name.as_str()),
            most_recent_only,
            started.elapsed()
        );
    }

    Ok(results)
}

/// The location match scope of `filter`: the declared locations, or the
/// union of their descendant sets when the country flag is set.
fn match_scope(filter: &LocationFilter, services: &ClinicalServices) -> Vec<Location> {
    if !filter.country {
        return filter.locations.clone();
    }
    let mut expanded: Vec<Location> = Vec::new();
    for location in &filter.locations {
        for descendant in services.hierarchy.descendant_locations(location) {
            if !expanded.iter().any(|l| l.uuid == descendant.uuid) {
                expanded.push(descendant);
            }
        }
    }
    expanded
}
