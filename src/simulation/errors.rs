//! Errors for exact simulation of stationary Gaussian vectors.
//!
//! Defines [`SimulationError`] and the alias [`SimulationResult`]. Failures
//! split into embedding problems (a valid ACF whose circulant extension has
//! a negative eigenvalue at this size) and ACF problems propagated from the
//! Toeplitz layer (validation or positive definiteness in the DL fallback).
//!
//! ## Conventions
//! - `NonEmbeddable` reports the first offending spectral index and value;
//!   callers may retry after zero-padding the ACF to a larger order.

use crate::toeplitz::errors::ToeplitzError;

/// Result alias for simulation paths that may produce [`SimulationError`].
pub type SimulationResult<T> = Result<T, SimulationError>;

/// Unified error type for the circulant and Durbin–Levinson samplers.
#[derive(Debug, Clone, PartialEq)]
pub enum SimulationError {
    /// The ACF is empty: there is no order to sample at.
    EmptyAcf,

    /// The circulant extension has a negative eigenvalue: the ACF fails
    /// Bochner's criterion at the embedding size.
    NonEmbeddable { index: usize, value: f64 },

    /// ACF validation or factorization failure from the Toeplitz layer.
    Acf(ToeplitzError),
}

impl std::error::Error for SimulationError {}

impl std::fmt::Display for SimulationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationError::EmptyAcf => {
                write!(f, "ACF must not be empty.")
            }
            SimulationError::NonEmbeddable { index, value } => {
                write!(
                    f,
                    "Circulant embedding has a negative eigenvalue at index {index}: {value}"
                )
            }
            SimulationError::Acf(err) => {
                write!(f, "ACF rejected by the Toeplitz layer: {err}")
            }
        }
    }
}

impl From<ToeplitzError> for SimulationError {
    fn from(err: ToeplitzError) -> SimulationError {
        SimulationError::Acf(err)
    }
}
