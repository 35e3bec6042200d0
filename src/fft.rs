//! fft — process-wide FFT plan cache and real-convolution helpers.
//!
//! Purpose
//! -------
//! Wrap the `rustfft` complex 1-D transform engine behind a small service:
//! plans are cached process-wide keyed by length, acquisition is idempotent
//! and thread-safe, and transforms execute on borrowed buffers. On top of the
//! raw transforms this module provides the real polynomial products used by
//! the GSchur recursion, the Toeplitz handle, and the trace machinery.
//!
//! Key behaviors
//! -------------
//! - [`plan`] returns a [`FftPlan`] (forward + inverse pair) for a given
//!   length, creating it at most once per process.
//! - Transforms are **unnormalized**: callers divide by the length after an
//!   inverse when an L² inverse is desired (same convention as the engine).
//! - [`conv_into`] computes a linear convolution of two real sequences with a
//!   single forward transform by packing them into the real and imaginary
//!   parts of one complex buffer.
//!
//! Invariants & assumptions
//! ------------------------
//! - The plan cache is the only process-wide mutable state in the crate; its
//!   policy is grow-only.
//! - All circulant-style products are performed at a length `M ≥ 2N − 1`;
//!   callers pick `M = next_pow2(2N)`.
//! - Plan execution on distinct buffers is safe concurrently; the engine's
//!   plan objects are `Send + Sync`.
//!
//! Conventions
//! -----------
//! - Scratch buffers are caller-owned and borrowed per call so the hot paths
//!   stay allocation-free; see `toeplitz::workspace`.

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

/// Forward/inverse transform pair for a fixed length.
///
/// Cheap to clone (the underlying plans are reference-counted) and safe to
/// share across threads. Obtained via [`plan`]; both directions are
/// unnormalized.
#[derive(Clone)]
pub struct FftPlan {
    len: usize,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
}

impl FftPlan {
    /// Transform length this plan was built for.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True only for the degenerate zero-length plan, which is never built.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// In-place unnormalized forward transform of `buf`.
    ///
    /// # Panics
    /// Panics if `buf.len() != self.len()` (programmer error).
    pub fn forward(&self, buf: &mut [Complex<f64>]) {
        self.forward.process(buf);
    }

    /// In-place unnormalized inverse transform of `buf`.
    ///
    /// Callers divide by `self.len()` afterwards for an L² inverse.
    ///
    /// # Panics
    /// Panics if `buf.len() != self.len()` (programmer error).
    pub fn inverse(&self, buf: &mut [Complex<f64>]) {
        self.inverse.process(buf);
    }
}

impl std::fmt::Debug for FftPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftPlan").field("len", &self.len).finish()
    }
}

/// Process-wide cache: one planner (so the engine can reuse twiddle tables
/// across lengths) plus the finished plan pairs keyed by length.
static PLAN_CACHE: OnceLock<Mutex<(FftPlanner<f64>, HashMap<usize, FftPlan>)>> = OnceLock::new();

/// Acquire the plan pair for length `len`, building it on first use.
///
/// Acquisition is idempotent: repeated calls with the same length return
/// clones of the same cached pair. The cache grows monotonically and is never
/// evicted for the lifetime of the process.
///
/// # Panics
/// Panics if `len == 0` or if the cache mutex was poisoned by a panicking
/// thread; both are programmer errors.
pub fn plan(len: usize) -> FftPlan {
    assert!(len > 0, "fft plan length must be positive");
    let cache = PLAN_CACHE.get_or_init(|| Mutex::new((FftPlanner::new(), HashMap::new())));
    let mut guard = cache.lock().expect("fft plan cache poisoned");
    let (planner, plans) = &mut *guard;
    plans
        .entry(len)
        .or_insert_with(|| FftPlan {
            len,
            forward: planner.plan_fft_forward(len),
            inverse: planner.plan_fft_inverse(len),
        })
        .clone()
}

/// Smallest power of two that is `>= n` (and at least 1).
pub fn next_pow2(n: usize) -> usize {
    let mut m = 1usize;
    while m < n {
        m <<= 1;
    }
    m
}

/// Linear convolution of two real sequences, truncated to `out.len()`.
///
/// Writes `out[k] = Σ_j a[j] b[k − j]` for `k = 0..out.len()`. Uses the
/// packed-real trick: `a` and `b` ride in the real and imaginary parts of a
/// single complex buffer, so one forward and one inverse transform suffice.
///
/// # Inputs
/// - `plan`: transform pair with `plan.len() >= a.len() + b.len() − 1`.
/// - `scratch`: complex buffer of length `plan.len()`, overwritten.
///
/// # Panics
/// Panics if the scratch length does not match the plan or the plan is too
/// short for the full product (programmer errors; callers size buffers from
/// a shared workspace).
pub fn conv_into(
    plan: &FftPlan, a: &[f64], b: &[f64], out: &mut [f64], scratch: &mut [Complex<f64>],
) {
    let m = plan.len();
    assert_eq!(scratch.len(), m, "conv scratch must match plan length");
    assert!(a.len() + b.len() <= m + 1, "plan too short for linear convolution");
    assert!(out.len() <= m, "output longer than transform");

    for (j, slot) in scratch.iter_mut().enumerate() {
        let re = if j < a.len() { a[j] } else { 0.0 };
        let im = if j < b.len() { b[j] } else { 0.0 };
        *slot = Complex::new(re, im);
    }
    plan.forward(scratch);

    // Unpack the two real spectra from the packed transform and form the
    // product spectrum in place, walking conjugate pairs (k, m − k).
    let half = m / 2;
    for k in 0..=half {
        let k2 = (m - k) % m;
        let fk = scratch[k];
        let fk2 = scratch[k2];
        let ak = (fk + fk2.conj()).scale(0.5);
        let bk = (fk - fk2.conj()) * Complex::new(0.0, -0.5);
        let ck = ak * bk;
        scratch[k] = ck;
        if k2 != k {
            let ak2 = (fk2 + fk.conj()).scale(0.5);
            let bk2 = (fk2 - fk.conj()) * Complex::new(0.0, -0.5);
            scratch[k2] = ak2 * bk2;
        }
    }
    plan.inverse(scratch);

    let inv_m = 1.0 / m as f64;
    for (k, slot) in out.iter_mut().enumerate() {
        *slot = scratch[k].re * inv_m;
    }
}

/// Full linear convolution returning a fresh vector of length
/// `a.len() + b.len() − 1`.
///
/// Convenience wrapper over [`conv_into`] for call sites that are not on an
/// allocation-free path (e.g. the one-shot factorization recursion).
pub fn conv(a: &[f64], b: &[f64]) -> Vec<f64> {
    if a.is_empty() || b.is_empty() {
        return Vec::new();
    }
    let n = a.len() + b.len() - 1;
    // Small products are cheaper (and exactly associative) done directly.
    if a.len().min(b.len()) <= 16 {
        let mut out = vec![0.0; n];
        for (i, &ai) in a.iter().enumerate() {
            for (j, &bj) in b.iter().enumerate() {
                out[i + j] += ai * bj;
            }
        }
        return out;
    }
    let m = next_pow2(n);
    let plan = plan(m);
    let mut scratch = vec![Complex::new(0.0, 0.0); m];
    let mut out = vec![0.0; n];
    conv_into(&plan, a, b, &mut out, &mut scratch);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Idempotent plan acquisition.
    // - Packed-real convolution against the schoolbook product.
    //
    // They intentionally DO NOT cover:
    // - Engine-level transform accuracy (delegated to rustfft).
    // -------------------------------------------------------------------------

    fn naive_conv(a: &[f64], b: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; a.len() + b.len() - 1];
        for (i, &ai) in a.iter().enumerate() {
            for (j, &bj) in b.iter().enumerate() {
                out[i + j] += ai * bj;
            }
        }
        out
    }

    #[test]
    // Purpose
    // -------
    // Verify that plan acquisition is idempotent and hands back working
    // transforms for a round trip.
    //
    // Given
    // -----
    // - Two acquisitions of the length-8 plan and a simple impulse input.
    //
    // Expect
    // ------
    // - Both acquisitions agree on length; forward-then-inverse recovers the
    //   input up to the 1/M normalization.
    fn plan_acquisition_is_idempotent_and_round_trips() {
        // Arrange
        let p1 = plan(8);
        let p2 = plan(8);
        let mut buf = vec![Complex::new(0.0, 0.0); 8];
        buf[1] = Complex::new(1.0, 0.0);

        // Act
        p1.forward(&mut buf);
        p2.inverse(&mut buf);

        // Assert
        assert_eq!(p1.len(), p2.len());
        assert!((buf[1].re / 8.0 - 1.0).abs() < 1e-12);
        for (k, v) in buf.iter().enumerate() {
            if k != 1 {
                assert!((v.re / 8.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    // Purpose
    // -------
    // Check the packed-real convolution against the schoolbook product on
    // uneven lengths.
    //
    // Given
    // -----
    // - Real sequences of lengths 5 and 9 with mixed signs.
    //
    // Expect
    // ------
    // - `conv_into` matches the naive O(n²) convolution to 1e-12.
    fn packed_convolution_matches_schoolbook() {
        // Arrange
        let a: Vec<f64> = (0..5).map(|i| 0.3 * i as f64 - 0.7).collect();
        let b: Vec<f64> = (0..9).map(|i| (-0.5f64).powi(i) + 0.1).collect();
        let n = a.len() + b.len() - 1;
        let m = next_pow2(n);
        let p = plan(m);
        let mut scratch = vec![Complex::new(0.0, 0.0); m];
        let mut out = vec![0.0; n];

        // Act
        conv_into(&p, &a, &b, &mut out, &mut scratch);
        let expect = naive_conv(&a, &b);

        // Assert
        for (got, want) in out.iter().zip(expect.iter()) {
            assert!((got - want).abs() < 1e-12, "got {got}, want {want}");
        }
    }

    #[test]
    // Purpose
    // -------
    // Confirm the allocating `conv` wrapper agrees with the schoolbook
    // product across the small/large dispatch boundary.
    //
    // Given
    // -----
    // - A pair of length-24 sequences (FFT path) and a length-3 pair
    //   (direct path).
    //
    // Expect
    // ------
    // - Both dispatches match the naive convolution to 1e-11.
    fn conv_wrapper_agrees_on_both_dispatch_paths() {
        // Arrange
        let long: Vec<f64> = (0..24).map(|i| ((i * 7 % 11) as f64 - 5.0) * 0.25).collect();
        let short = vec![1.0, -2.0, 0.5];

        // Act / Assert
        let got_fft = conv(&long, &long);
        let want_fft = naive_conv(&long, &long);
        for (g, w) in got_fft.iter().zip(want_fft.iter()) {
            assert!((g - w).abs() < 1e-11);
        }

        let got_direct = conv(&short, &short);
        let want_direct = naive_conv(&short, &short);
        for (g, w) in got_direct.iter().zip(want_direct.iter()) {
            assert!((g - w).abs() < 1e-12);
        }
    }
}
