//! Evaluation errors

use patientgrid_model::DataSourceError;
use thiserror::Error;

/// Result type for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that abort a plan evaluation.
///
/// Every variant is fatal to the current evaluation; retries, if any,
/// are a caller concern. No partial dataset is ever returned.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    /// The backing store failed evaluating a definition
    #[error(transparent)]
    DataSource(#[from] DataSourceError),

    /// The plan could not be executed
    #[error("evaluation error: {message}")]
    Evaluation {
        /// What went wrong
        message: String,
    },
}

impl EvalError {
    /// Create an evaluation error
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }
}
