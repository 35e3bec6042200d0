//! simulation — exact sampling of stationary Gaussian vectors.
//!
//! Purpose
//! -------
//! Generate exact draws from `N(0, Σ)` with Σ the Toeplitz covariance of a
//! given ACF, either through circulant embedding (one FFT per two paths) or
//! through the sequential Durbin–Levinson innovations recursion. This
//! pipeline shares only the FFT service with the matrix layer.
//!
//! Key behaviors
//! -------------
//! - [`rnormtz`] dispatches on `use_fft`; both branches are exact samplers,
//!   deterministic conditional on the caller-supplied RNG seed.
//! - The embedding branch reports [`SimulationError::NonEmbeddable`] when
//!   the length-2(N−1) circulant has a negative eigenvalue — possible for
//!   valid ACFs; zero-padding and retrying is the documented recourse.
//! - [`dl_sample`] is the fallback for small N and for non-embeddable ACFs.
//!
//! Downstream usage
//! ----------------
//! - Monte-Carlo consumers draw paths here and evaluate them with the
//!   `density` kernel; independent chains should use independent RNGs (and
//!   independent deep-cloned handles when a handle is involved).

pub mod circulant;
pub mod errors;

// ---- Re-exports (primary public surface) ----------------------------------

pub use self::circulant::{dl_sample, rnormtz};
pub use self::errors::{SimulationError, SimulationResult};

pub mod prelude {
    pub use super::circulant::{dl_sample, rnormtz};
    pub use super::errors::{SimulationError, SimulationResult};
}
