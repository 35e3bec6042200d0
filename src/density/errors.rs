//! Errors for the Gaussian density kernel (shape validation and covariance
//! failures).
//!
//! [`DensityError`] keeps `NotPositiveDefinite` as a **distinguished
//! variant** rather than burying it inside the wrapped Toeplitz error:
//! optimizers probing a parameter space routinely step outside the positive
//! definite cone and need to penalize that case without string matching or
//! aborting.
//!
//! ## Conventions
//! - Shape errors name the offending table (`"dmu"`, `"dacf"`, `"d2acf"`,
//!   …) so multi-table call sites stay debuggable.
//! - Everything else from the matrix layer arrives via
//!   `From<ToeplitzError>`.

use crate::toeplitz::errors::ToeplitzError;

/// Result alias for density-kernel operations.
pub type DensityResult<T> = Result<T, DensityError>;

/// Unified error type for density, score, and Hessian evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum DensityError {
    /// Observation length differs from the covariance order.
    ObservationLength { expected: usize, actual: usize },

    /// Mean vector length differs from the covariance order.
    MeanLength { expected: usize, actual: usize },

    /// A derivative table has the wrong number of rows (must equal N).
    TableRows { table: &'static str, expected: usize, actual: usize },

    /// Derivative tables disagree on the parameter count P.
    ParamCountMismatch { table: &'static str, expected: usize, actual: usize },

    /// The covariance is not positive definite — the sentinel optimizers
    /// penalize instead of aborting.
    NotPositiveDefinite { step: usize, pivot: f64 },

    /// Any other ACF/handle failure from the Toeplitz layer.
    Acf(ToeplitzError),
}

impl std::error::Error for DensityError {}

impl std::fmt::Display for DensityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DensityError::ObservationLength { expected, actual } => {
                write!(f, "Observation length mismatch: expected {expected}, got {actual}")
            }
            DensityError::MeanLength { expected, actual } => {
                write!(f, "Mean length mismatch: expected {expected}, got {actual}")
            }
            DensityError::TableRows { table, expected, actual } => {
                write!(f, "Table `{table}` must have {expected} rows, got {actual}")
            }
            DensityError::ParamCountMismatch { table, expected, actual } => {
                write!(
                    f,
                    "Table `{table}` implies {actual} parameters, other tables imply {expected}"
                )
            }
            DensityError::NotPositiveDefinite { step, pivot } => {
                write!(
                    f,
                    "Covariance is not positive definite: pivot {pivot} at step {step}"
                )
            }
            DensityError::Acf(err) => {
                write!(f, "Covariance rejected by the Toeplitz layer: {err}")
            }
        }
    }
}

/// Lift Toeplitz-layer failures, keeping the positive-definiteness sentinel
/// distinguished.
impl From<ToeplitzError> for DensityError {
    fn from(err: ToeplitzError) -> DensityError {
        match err {
            ToeplitzError::NotPositiveDefinite { step, pivot } => {
                DensityError::NotPositiveDefinite { step, pivot }
            }
            other => DensityError::Acf(other),
        }
    }
}

impl DensityError {
    /// True when the evaluation failed only because the covariance left the
    /// positive definite cone (the penalizable case).
    pub fn is_not_positive_definite(&self) -> bool {
        matches!(self, DensityError::NotPositiveDefinite { .. })
    }
}
