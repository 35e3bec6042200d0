//! Preallocated scratch pool for repeated Toeplitz operations.
//!
//! The dominant use pattern for this crate is repeated likelihood evaluation
//! at a fixed order N inside an optimizer, so every buffer the hot paths need
//! (multiply, solve, trace profiles) is allocated **once** when the handle is
//! constructed and reused on every call. Nothing here grows after
//! construction; teardown releases the buffers while FFT plans stay in the
//! process-wide cache.
//!
//! ## Slots
//! - `cplx_a` — packed-real convolution scratch of length `M = next_pow2(2N)`.
//! - `emb_hat` — spectrum of the circulant embedding of the bound ACF,
//!   refreshed by `set_acf` and consumed by `multiply`.
//! - `real_a`/`real_b`/`real_c` — length-M real staging (reversals, truncated
//!   convolutions, weighted correlations).
//! - `pair_g`/`pair_h`/`pair_sign` — displacement generator staging for the
//!   trace-of-product machinery (a fixed number of length-N pairs).
//! - `profile` — diagonal-sum profile output reused across trace calls.
//!
//! ## Lifetimes
//! The pool is owned by the handle's shared inner state; shallow clones of a
//! handle share one pool, deep clones allocate their own.

use crate::fft::{self, FftPlan};
use ndarray::Array2;
use rustfft::num_complex::Complex;

/// Number of displacement generator pairs needed to represent
/// `Σ⁻¹ T(x) Σ⁻¹`: five from the first product, two from the second factor,
/// one shift correction.
pub(crate) const GEN_PAIRS: usize = 8;

/// Fixed-size scratch pool bound to a handle order.
#[derive(Clone)]
pub(crate) struct Workspace {
    /// Handle order N.
    pub n: usize,
    /// Transform length `M = next_pow2(2N)`.
    pub m: usize,
    /// Shared plan pair for length `m`.
    pub plan: FftPlan,
    /// Complex convolution scratch (length `m`).
    pub cplx_a: Vec<Complex<f64>>,
    /// Second complex slot: embedding spectrum of a derivative ACF during
    /// trace-of-product evaluation (length `m`).
    pub cplx_b: Vec<Complex<f64>>,
    /// Circulant-embedding spectrum of the bound ACF (length `m`).
    pub emb_hat: Vec<Complex<f64>>,
    /// Real staging buffers (length `m`).
    pub real_a: Vec<f64>,
    pub real_b: Vec<f64>,
    pub real_c: Vec<f64>,
    /// Solve/multiply output staging (length `m`).
    pub real_d: Vec<f64>,
    /// Derivative-ACF staging for trace-of-product calls (length N); moved
    /// out and back around `hess_profile` so the borrow stays disjoint.
    pub xbuf: Vec<f64>,
    /// Displacement generator staging: `GEN_PAIRS` rows of length N.
    pub pair_g: Array2<f64>,
    pub pair_h: Array2<f64>,
    pub pair_sign: [f64; GEN_PAIRS],
    /// Diagonal-sum profile scratch (length N).
    pub profile: Vec<f64>,
}

impl Workspace {
    /// Allocate every slot for order `n`.
    ///
    /// `M = next_pow2(2N)` keeps all circulant products alias-free
    /// (`M ≥ 2N − 1`) and power-of-two sized for the transform engine.
    pub fn new(n: usize) -> Workspace {
        let m = fft::next_pow2(2 * n.max(1));
        Workspace {
            n,
            m,
            plan: fft::plan(m),
            cplx_a: vec![Complex::new(0.0, 0.0); m],
            cplx_b: vec![Complex::new(0.0, 0.0); m],
            emb_hat: vec![Complex::new(0.0, 0.0); m],
            real_a: vec![0.0; m],
            real_b: vec![0.0; m],
            real_c: vec![0.0; m],
            real_d: vec![0.0; m],
            xbuf: vec![0.0; n],
            pair_g: Array2::zeros((GEN_PAIRS, n)),
            pair_h: Array2::zeros((GEN_PAIRS, n)),
            pair_sign: [0.0; GEN_PAIRS],
            profile: vec![0.0; n],
        }
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace").field("n", &self.n).field("m", &self.m).finish()
    }
}
