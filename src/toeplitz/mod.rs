//! toeplitz — SPD Toeplitz covariance handling: factorization, solves,
//! traces, and the Durbin–Levinson reference engine.
//!
//! Purpose
//! -------
//! Collect the matrix layer of the crate: a stateful [`Toeplitz`] handle
//! bound to an order N and an ACF, the generalized Schur factorizer behind
//! it, the O(N²) Durbin–Levinson reference path, the trace-of-product
//! machinery used by likelihood derivatives, and the preallocated workspace
//! all of them share. The statistical layers (`density`, `simulation`) build
//! on these primitives.
//!
//! Key behaviors
//! -------------
//! - [`Toeplitz`] exposes multiply, solve, log-determinant,
//!   `trace_grad`/`trace_hess`, and explicit shallow/deep duplication, with
//!   a lazy UNBOUND → BOUND_DIRTY → FACTORED life cycle ([`FactorState`]).
//! - `gschur` factors an SPD Toeplitz matrix in O(N log² N), yielding the
//!   Gohberg–Semencul generator pair of Σ⁻¹ plus log|Σ|.
//! - `durbin_levinson` provides the stateless O(N²) ground-truth path
//!   ([`dl_solve`], [`dl_logdet`], [`dl_density`]).
//! - `validation` concentrates entry-point checks; errors are reported via
//!   [`ToeplitzResult`] and never panic on user input.
//!
//! Invariants & assumptions
//! ------------------------
//! - ACFs are finite with γ₀ > 0 after validation; positive definiteness is
//!   established (or refuted) only by factorization so that multiplication
//!   keeps working on indefinite inputs.
//! - In the FACTORED state the generators satisfy the Gohberg–Semencul
//!   identity and the cached log-determinant matches the factorization.
//! - Steady-state operations are allocation-free through the workspace; a
//!   handle is single-threaded by design, while deep clones are independent
//!   and may run in parallel.
//!
//! Downstream usage
//! ----------------
//! - `density` consumes solves, log-determinants and traces for the
//!   Gaussian log-likelihood and its derivatives.
//! - `simulation` shares only the FFT service; its DL fallback sampler uses
//!   the recursion exposed by `durbin_levinson`.

pub mod durbin_levinson;
pub mod errors;
pub mod gschur;
pub mod handle;
pub(crate) mod ops;
pub(crate) mod trace;
pub mod validation;
pub(crate) mod workspace;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::durbin_levinson::{dl_density, dl_logdet, dl_solve};
pub use self::errors::{ToeplitzError, ToeplitzResult};
pub use self::handle::{FactorState, Toeplitz};
pub use self::validation::validate_acf;

// ---- Optional convenience prelude for downstream crates -------------------
//
// Downstream crates can write
//
//     use rust_toeplitz::toeplitz::prelude::*;
//
// to import the main Toeplitz surface in a single line.

pub mod prelude {
    pub use super::durbin_levinson::{dl_density, dl_logdet, dl_solve};
    pub use super::errors::{ToeplitzError, ToeplitzResult};
    pub use super::handle::{FactorState, Toeplitz};
}
