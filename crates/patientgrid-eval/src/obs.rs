//! Observation matching
//!
//! Finds, within a resolved encounter, the single top-level non-voided
//! observation whose question concept matches a target concept.

use crate::context::{EvalDiagnostic, EvaluationContext};
use log::debug;
use patientgrid_model::{Concept, Encounter, Obs};

/// The observation on `encounter` answering `concept`, if exactly one
/// exists.
///
/// Grouped observations and group headers are excluded, as are voided
/// ones. More than one match is the declared multi-answer limitation:
/// a diagnostic is recorded and no value is returned rather than
/// guessing, since picking a match would silently corrupt grid output.
pub fn find_observation<'a>(
    encounter: &'a Encounter,
    concept: &Concept,
    context: &mut EvaluationContext,
) -> Option<&'a Obs> {
    let matches: Vec<&Obs> = encounter
        .obs
        .iter()
        .filter(|obs| {
            !obs.voided
                && obs.obs_group.is_none()
                && obs.concept.uuid == concept.uuid
                && !obs.has_group_members()
        })
        .collect();

    if matches.len() > 1 {
        debug!(
            "multi obs answer not yet supported, no data will be returned for encounter {}",
            encounter.uuid
        );
        context.record_diagnostic(EvalDiagnostic::MultipleObsMatches {
            encounter: encounter.uuid.clone(),
            concept: concept.uuid.clone(),
        });
        return None;
    }

    matches.into_iter().next()
}
