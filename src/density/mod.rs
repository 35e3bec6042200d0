//! density — Gaussian log-density, score, and Hessian on Toeplitz
//! covariances.
//!
//! Purpose
//! -------
//! Turn the matrix primitives of the `toeplitz` layer into the three
//! statistical primitives of likelihood inference: [`dnormtz`] (log-density
//! of one or more observations), [`snorm_grad`] (score with respect to a
//! parameter vector θ indexing μ(θ) and γ(θ) through caller-supplied
//! derivative tables), and [`snorm_hess`] (the full closed-form Hessian).
//!
//! Key behaviors
//! -------------
//! - Covariances are passed as a borrowed ACF or an existing [`Toeplitz`]
//!   handle ([`Covariance`]); handles keep their factorization cached across
//!   repeated calls — the dominant optimizer pattern.
//! - Every kernel takes a [`Method`]: the superfast GSchur path, the O(N²)
//!   Durbin–Levinson reference path, or `Auto` (crossover at order 300,
//!   `TOEPLITZ_DL_CROSSOVER` overrides).
//! - Absent derivative tables mean "that derivative is identically zero";
//!   mean-independent and variance-independent models simply omit them.
//! - `NotPositiveDefinite` is a distinguished, penalizable error variant.
//!
//! Downstream usage
//! ----------------
//! - Optimizers evaluate [`dnormtz`]/[`snorm_grad`] per iterate on a shared
//!   handle; [`snorm_hess`] supplies observed information for standard
//!   errors at the optimum.
//!
//! [`Toeplitz`]: crate::toeplitz::Toeplitz

pub mod errors;
pub mod kernel;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::errors::{DensityError, DensityResult};
pub use self::kernel::{dnormtz, snorm_grad, snorm_hess, Covariance, Method};

pub mod prelude {
    pub use super::errors::{DensityError, DensityResult};
    pub use super::kernel::{dnormtz, snorm_grad, snorm_hess, Covariance, Method};
}
