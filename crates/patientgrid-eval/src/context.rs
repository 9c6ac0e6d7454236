//! Per-evaluation context
//!
//! One evaluation owns one context. The patient to latest-encounter-date
//! cache is filled in by the encounter resolver as a side channel and
//! reused by date and age strategies; the diagnostics list records
//! conditions that degrade to a no-value result instead of failing.
//! Contexts must not be shared across concurrent evaluations: every
//! compilation/evaluation call receives its own fresh instance.

use chrono::NaiveDateTime;
use patientgrid_model::PatientId;
use std::collections::HashMap;
use std::fmt;

/// State threaded through one plan evaluation.
#[derive(Debug, Default)]
pub struct EvaluationContext {
    latest_encounter_dates: HashMap<PatientId, NaiveDateTime>,
    diagnostics: Vec<EvalDiagnostic>,
}

impl EvaluationContext {
    /// Create a fresh context
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `datetime` if it is the newest seen for `patient`
    pub fn record_latest_encounter(&mut self, patient: PatientId, datetime: NaiveDateTime) {
        self.latest_encounter_dates
            .entry(patient)
            .and_modify(|current| {
                if datetime > *current {
                    *current = datetime;
                }
            })
            .or_insert(datetime);
    }

    /// The newest encounter date recorded for `patient`, if any
    pub fn latest_encounter_date(&self, patient: PatientId) -> Option<NaiveDateTime> {
        self.latest_encounter_dates.get(&patient).copied()
    }

    /// Record a diagnostic
    pub fn record_diagnostic(&mut self, diagnostic: EvalDiagnostic) {
        self.diagnostics.push(diagnostic);
    }

    /// Diagnostics recorded so far
    pub fn diagnostics(&self) -> &[EvalDiagnostic] {
        &self.diagnostics
    }
}

/// A condition that degraded to a no-value result instead of failing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalDiagnostic {
    /// More than one top-level observation answered the question concept
    MultipleObsMatches {
        /// Uuid of the encounter searched
        encounter: String,
        /// Uuid of the question concept
        concept: String,
    },
}

impl fmt::Display for EvalDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleObsMatches { encounter, concept } => write!(
                f,
                "multi obs answer not supported, no data returned for concept {} on encounter {}",
                concept, encounter
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn datetime(text: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_latest_encounter_cache_keeps_the_newest() {
        let mut context = EvaluationContext::new();
        context.record_latest_encounter(1, datetime("2023-06-01 08:00:00"));
        context.record_latest_encounter(1, datetime("2023-01-01 08:00:00"));
        context.record_latest_encounter(1, datetime("2023-09-01 08:00:00"));

        assert_eq!(
            context.latest_encounter_date(1),
            Some(datetime("2023-09-01 08:00:00"))
        );
        assert_eq!(context.latest_encounter_date(2), None);
    }
}
