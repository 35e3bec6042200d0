//! Errors for Toeplitz covariance operations (input validation, handle state,
//! and factorization failures).
//!
//! This module defines [`ToeplitzError`] and the crate-wide alias
//! [`ToeplitzResult`] used across the handle, the GSchur factorizer, and the
//! Durbin–Levinson engine.
//!
//! ## Conventions
//! - **Indices are 0-based** (match Rust/NumPy).
//! - The leading ACF value γ₀ must be **finite and strictly positive**; all
//!   other entries must be finite.
//! - A failed factorization reports the step at which the pivot collapsed and
//!   leaves the handle in its pre-factorization state; callers can rebind a
//!   valid ACF and retry.
//! - `NotPositiveDefinite` is the distinguished sentinel the density layer
//!   forwards to optimizers so they can penalize rather than abort.

/// Crate-wide result alias for Toeplitz operations that may produce
/// [`ToeplitzError`].
pub type ToeplitzResult<T> = Result<T, ToeplitzError>;

/// Unified error type for Toeplitz covariance handling.
///
/// Covers input/ACF validation, handle state errors, and positive
/// definiteness failures detected during factorization.
#[derive(Debug, Clone, PartialEq)]
pub enum ToeplitzError {
    // ---- Input/ACF validation ----
    /// Input vector length differs from the handle order.
    InvalidLength { expected: usize, actual: usize },

    /// An ACF entry is NaN/±inf.
    NonFiniteAcf { index: usize, value: f64 },

    /// The leading ACF value γ₀ must be finite and > 0.
    InvalidLeadingAcf { value: f64 },

    // ---- Handle state ----
    /// Operation requires an ACF but none has been bound.
    Unbound,

    // ---- Factorization ----
    /// The Schur/Durbin recursion hit a non-positive pivot: the implied
    /// Toeplitz matrix is not positive definite at the reported step.
    NotPositiveDefinite { step: usize, pivot: f64 },
}

impl std::error::Error for ToeplitzError {}

impl std::fmt::Display for ToeplitzError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ToeplitzError::InvalidLength { expected, actual } => {
                write!(f, "Vector length mismatch: expected {expected}, got {actual}")
            }
            ToeplitzError::NonFiniteAcf { index, value } => {
                write!(f, "ACF entry at index {index} is non-finite: {value}")
            }
            ToeplitzError::InvalidLeadingAcf { value } => {
                write!(f, "Leading ACF value must be finite and > 0; got: {value}")
            }
            ToeplitzError::Unbound => {
                write!(f, "No ACF bound to this handle; call set_acf first.")
            }
            ToeplitzError::NotPositiveDefinite { step, pivot } => {
                write!(
                    f,
                    "Toeplitz matrix is not positive definite: pivot {pivot} at step {step}"
                )
            }
        }
    }
}
