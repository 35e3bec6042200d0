//! rust_toeplitz — superfast likelihood inference for stationary Gaussian
//! time series.
//!
//! Purpose
//! -------
//! Provide the computational core for Gaussian likelihoods whose covariance
//! is a symmetric positive-definite Toeplitz matrix of order N, defined by
//! its first row (the autocorrelation function, ACF). Four matrix
//! primitives — multiply, solve, log-determinant, trace-of-product — are
//! implemented superfast (O(N log N) per operation after an O(N log² N)
//! generalized-Schur factorization) and composed into the density, score,
//! and Hessian of the multivariate Gaussian log-likelihood, plus exact
//! simulation of stationary Gaussian vectors.
//!
//! Key behaviors
//! -------------
//! - `toeplitz` owns the matrix layer: the stateful [`Toeplitz`] handle
//!   (lazy GSchur factorization, explicit shallow/deep duplication), the
//!   O(N²) Durbin–Levinson reference engine, and the trace machinery.
//! - `density` exposes `dnormtz`, `snorm_grad`, `snorm_hess` with optional
//!   mean/derivative tables and a GSchur/DL/Auto method switch.
//! - `simulation` samples exact stationary paths by circulant embedding
//!   (two paths per FFT) or the sequential Durbin–Levinson recursion.
//! - `fft` caches transform plans process-wide and supplies the packed-real
//!   polynomial products every other module builds on.
//!
//! Invariants & assumptions
//! ------------------------
//! - ACFs are finite with γ₀ > 0; positive definiteness is detected during
//!   factorization and reported as a distinguished error so optimizers can
//!   penalize rather than abort.
//! - Deterministic operations are bitwise-reproducible for a fixed ACF and
//!   FFT backend; simulation is deterministic conditional on the
//!   caller-supplied RNG seed.
//! - A handle is single-threaded by design; deep clones are independent and
//!   may run in parallel. The FFT plan cache is the only process-wide
//!   mutable state.
//!
//! Conventions
//! -----------
//! - All public numeric APIs speak `ndarray`; multi-path/multi-observation
//!   data is `N×k`, one column per path.
//! - Errors are per-domain enums (`ToeplitzError`, `SimulationError`,
//!   `DensityError`) with `Result` aliases; panics are reserved for
//!   programmer errors.
//!
//! Downstream usage
//! ----------------
//! - Parameter optimization, ACF families (fBM, Matérn, …), and language
//!   bindings are consumers of this crate, not part of it: they construct a
//!   handle (or pass a raw ACF), supply derivative tables, and call the
//!   density kernels.
//!
//! Testing notes
//! -------------
//! - Unit tests per module validate each primitive against dense linear
//!   algebra; the integration suite cross-checks the GSchur and
//!   Durbin–Levinson paths on densities, scores, and Hessians and exercises
//!   the documented failure and recovery modes.
//!
//! [`Toeplitz`]: crate::toeplitz::Toeplitz

pub mod density;
pub mod fft;
pub mod simulation;
pub mod toeplitz;
