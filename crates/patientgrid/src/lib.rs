//! Patient grid compilation and normalization engine
//!
//! This crate compiles a declarative patient grid specification into an
//! executable tabular query plan over clinical records and normalizes
//! the raw evaluation results (sorting, age bucketing, type conversion)
//! into one flat row per patient.
//!
//! # Example
//!
//! ```ignore
//! use patientgrid::{compile_grid, run_grid, ClinicalServices, EvaluationContext};
//!
//! let services = ClinicalServices::from_store(store);
//! let plan = compile_grid(&grid, true, Some("+02:00"), &services)?;
//!
//! let mut context = EvaluationContext::new();
//! let dataset = run_grid(&grid, &cohort, true, Some("+02:00"), &services, &mut context)?;
//! ```

use once_cell::sync::Lazy;
use std::sync::Arc;
use thiserror::Error;

// Re-export all public APIs from internal crates
pub use patientgrid_compile as compile;
pub use patientgrid_eval as eval;
pub use patientgrid_model as model;
pub use patientgrid_types as types;

// Convenience re-exports
pub use patientgrid_compile::{CompileError, QueryPlan};
pub use patientgrid_eval::{EvalError, EvaluationContext, GridEvaluator, PatientDataSet};
pub use patientgrid_model::{ClinicalServices, Cohort};
pub use patientgrid_types::{AgeRange, AgeRangeCatalog, AgeRangeError, ColumnKind, GridColumn, PatientGrid};

/// Umbrella error for the one-call entry points.
#[derive(Debug, Clone, Error)]
pub enum GridError {
    /// Compilation failed; no plan was produced
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// Evaluation failed; no dataset was produced
    #[error(transparent)]
    Eval(#[from] EvalError),
}

/// The process-wide age range catalog, built lazily on first use and
/// reused by every subsequent compilation.
static AGE_RANGES: Lazy<AgeRangeCatalog> = Lazy::new(AgeRangeCatalog::new);

/// Compile `grid` into a query plan using the process-wide age range
/// catalog.
///
/// Tests and callers needing an isolated catalog can drive
/// [`patientgrid_compile::compile`] directly with their own
/// [`AgeRangeCatalog`].
pub fn compile_grid(
    grid: &PatientGrid,
    include_obs: bool,
    caller_timezone: Option<&str>,
    services: &ClinicalServices,
) -> Result<QueryPlan, CompileError> {
    patientgrid_compile::compile(
        grid,
        include_obs,
        caller_timezone,
        services.settings.as_ref(),
        &AGE_RANGES,
    )
}

/// Compile and evaluate `grid` over `cohort` in one call.
///
/// `context` must be fresh per call; it accumulates the latest-encounter
/// cache and any diagnostics recorded during evaluation.
pub fn run_grid(
    grid: &PatientGrid,
    cohort: &Cohort,
    include_obs: bool,
    caller_timezone: Option<&str>,
    services: &ClinicalServices,
    context: &mut EvaluationContext,
) -> Result<PatientDataSet, GridError> {
    let plan = compile_grid(grid, include_obs, caller_timezone, services)?;
    let dataset = GridEvaluator::new(services.clone()).evaluate(&plan, cohort, context)?;
    Ok(dataset)
}

/// Force the process-wide age range catalog to rebuild from settings.
///
/// The catalog otherwise serves its first-built value for the process
/// lifetime; a changed backing setting is only picked up through this
/// hook.
pub fn reload_age_ranges(
    services: &ClinicalServices,
) -> Result<Arc<Vec<AgeRange>>, AgeRangeError> {
    AGE_RANGES.reload(services.settings.as_ref())
}
