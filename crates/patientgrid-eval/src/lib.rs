//! Query plan execution and result normalization
//!
//! Executes a compiled query plan over a cohort through the collaborator
//! traits and reconciles the heterogeneous raw values (dates, concepts,
//! locations, numeric ages) into grid-ready cells. One evaluation owns
//! one [`EvaluationContext`]; the context carries the patient to
//! latest-encounter-date cache the resolver fills in as a side channel,
//! plus any diagnostics recorded along the way.

pub mod context;
pub mod dataset;
pub mod encounters;
pub mod error;
pub mod obs;
pub mod value;

// Re-export main types
pub use context::{EvalDiagnostic, EvaluationContext};
pub use dataset::{GridEvaluator, GridRow, PatientDataSet};
pub use encounters::{resolve_encounters, EncounterMatches};
pub use error::{EvalError, EvalResult};
pub use obs::find_observation;
pub use value::CellValue;
