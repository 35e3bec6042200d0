//! Low-level allocation-free kernels shared by the handle and the trace
//! machinery.
//!
//! Everything here operates on borrowed slices sized by the caller (see
//! `workspace`): circulant-embedding spectra and multiplies, the
//! Gohberg–Semencul solve, and the shift operators `Z`/`Zᵀ` used by the
//! displacement algebra.
//!
//! ## Conventions
//! - `n` is the Toeplitz order, `m = plan.len() ≥ 2n − 1` the transform
//!   length; all spectra and complex scratch have length `m`.
//! - Triangular-Toeplitz products are truncated linear convolutions;
//!   transposed products are convolutions against a reversed operand.
//! - `Z` shifts down (`(Zv)_0 = 0`), `Zᵀ` shifts up (`(Zᵀv)_{n−1} = 0`).

use crate::fft::{conv_into, FftPlan};
use rustfft::num_complex::Complex;

/// Fill `spec` with the spectrum of the length-`m` circulant embedding of a
/// symmetric Toeplitz matrix with first row `x`.
///
/// The embedding places `x` at the head and its reflected tail at the end:
/// `c₀..c_{n−1} = x`, `c_{m−j} = x_j` for `j = 1..n`, zeros between.
/// `spec` is transformed in place (unnormalized forward).
pub(crate) fn fill_embedding_spectrum(plan: &FftPlan, x: &[f64], spec: &mut [Complex<f64>]) {
    let n = x.len();
    let m = plan.len();
    for slot in spec.iter_mut() {
        *slot = Complex::new(0.0, 0.0);
    }
    for (j, &xj) in x.iter().enumerate() {
        spec[j].re = xj;
        if j > 0 {
            spec[m - j].re = xj;
        }
    }
    debug_assert!(m >= 2 * n - 1);
    plan.forward(spec);
}

/// In-place circulant multiply: `buf[..n] ← (T(x) buf[..n])` where `spec` is
/// the embedding spectrum produced by [`fill_embedding_spectrum`].
///
/// Only the first `n` entries of `buf` are read and written; `work` is a
/// length-`m` complex scratch.
pub(crate) fn spec_multiply_in_place(
    plan: &FftPlan, spec: &[Complex<f64>], buf: &mut [f64], n: usize, work: &mut [Complex<f64>],
) {
    let m = plan.len();
    for (j, slot) in work.iter_mut().enumerate() {
        let re = if j < n { buf[j] } else { 0.0 };
        *slot = Complex::new(re, 0.0);
    }
    plan.forward(work);
    for (w, s) in work.iter_mut().zip(spec.iter()) {
        *w *= *s;
    }
    plan.inverse(work);
    let inv_m = 1.0 / m as f64;
    for (i, slot) in buf.iter_mut().take(n).enumerate() {
        *slot = work[i].re * inv_m;
    }
}

/// Gohberg–Semencul solve: `out ← Σ⁻¹ z` from the generator pair,
/// `Σ⁻¹ = (1/δ₀)(L(δ)L(δ)ᵀ − L(δ̃)L(δ̃)ᵀ)`.
///
/// Four truncated triangular-Toeplitz products, each one FFT-based
/// convolution; the transposed factors are convolutions against the reversed
/// operand (`L(g)ᵀ z = rev(L(g) rev z)` truncated to order).
///
/// `ra`/`rb`/`rc` are length-`≥ n` real scratch, `cplx` a length-`m` complex
/// scratch. `z` and `out` must not alias the scratch.
#[allow(clippy::too_many_arguments)]
pub(crate) fn gs_solve_into(
    delta: &[f64], delta_rev: &[f64], plan: &FftPlan, z: &[f64], out: &mut [f64],
    ra: &mut [f64], rb: &mut [f64], rc: &mut [f64], cplx: &mut [Complex<f64>],
) {
    let n = delta.len();
    let d0 = delta[0];
    for j in 0..n {
        ra[j] = z[n - 1 - j];
    }
    // w₁ = L(δ) L(δ)ᵀ z.
    conv_into(plan, delta, &ra[..n], &mut rb[..n], cplx);
    for j in 0..n {
        rc[j] = rb[n - 1 - j];
    }
    conv_into(plan, delta, &rc[..n], &mut rb[..n], cplx);
    out[..n].copy_from_slice(&rb[..n]);
    // w₂ = L(δ̃) L(δ̃)ᵀ z, then out = (w₁ − w₂)/δ₀.
    conv_into(plan, delta_rev, &ra[..n], &mut rb[..n], cplx);
    for j in 0..n {
        rc[j] = rb[n - 1 - j];
    }
    conv_into(plan, delta_rev, &rc[..n], &mut rb[..n], cplx);
    for j in 0..n {
        out[j] = (out[j] - rb[j]) / d0;
    }
}

/// `dst ← Z src` (shift down, zero in front). Distinct slices.
pub(crate) fn shift_down_into(src: &[f64], dst: &mut [f64]) {
    let n = src.len();
    dst[0] = 0.0;
    dst[1..n].copy_from_slice(&src[..n - 1]);
}

/// `buf ← Z buf` in place.
pub(crate) fn shift_down_in_place(buf: &mut [f64]) {
    for j in (1..buf.len()).rev() {
        buf[j] = buf[j - 1];
    }
    buf[0] = 0.0;
}

/// `dst ← Zᵀ src` (shift up, zero at the back). Distinct slices.
pub(crate) fn shift_up_into(src: &[f64], dst: &mut [f64]) {
    let n = src.len();
    dst[..n - 1].copy_from_slice(&src[1..n]);
    dst[n - 1] = 0.0;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fft;
    use crate::toeplitz::gschur::gschur_factor;
    use ndarray::Array1;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - Circulant multiply against the dense Toeplitz product.
    // - The Gohberg–Semencul solve against a dense solve.
    // - Shift operators.
    //
    // They intentionally DO NOT cover:
    // - Handle state transitions (handle tests) or trace reductions
    //   (trace tests).
    // -------------------------------------------------------------------------

    #[test]
    // Purpose
    // -------
    // The spectrum-based multiply must reproduce the dense Toeplitz product.
    //
    // Given
    // -----
    // - x = (2, 1, 0.5, 0.25) and z = (1, 0, 0, 0), then a second z with
    //   mixed signs.
    //
    // Expect
    // ------
    // - T(x)·e₀ equals x itself; the dense product matches to 1e-12.
    fn circulant_multiply_matches_dense() {
        // Arrange
        let x = [2.0, 1.0, 0.5, 0.25];
        let n = x.len();
        let m = fft::next_pow2(2 * n);
        let plan = fft::plan(m);
        let mut spec = vec![Complex::new(0.0, 0.0); m];
        let mut work = vec![Complex::new(0.0, 0.0); m];
        fill_embedding_spectrum(&plan, &x, &mut spec);

        // Act / Assert: unit vector picks out the first column.
        let mut buf = vec![0.0; m];
        buf[0] = 1.0;
        spec_multiply_in_place(&plan, &spec, &mut buf, n, &mut work);
        for j in 0..n {
            assert!((buf[j] - x[j]).abs() < 1e-12);
        }

        // Act / Assert: general operand against the dense product.
        let z = [1.0, -2.0, 0.5, 3.0];
        buf[..n].copy_from_slice(&z);
        spec_multiply_in_place(&plan, &spec, &mut buf, n, &mut work);
        for i in 0..n {
            let mut want = 0.0;
            for j in 0..n {
                want += x[(i as isize - j as isize).unsigned_abs()] * z[j];
            }
            assert!((buf[i] - want).abs() < 1e-12, "row {i}: {} vs {want}", buf[i]);
        }
    }

    #[test]
    // Purpose
    // -------
    // The four-product Gohberg–Semencul solve must invert the multiply.
    //
    // Given
    // -----
    // - γ_k = 2·0.55^k of order 6 and a mixed-sign operand.
    //
    // Expect
    // ------
    // - solve(multiply(z)) returns z to 1e-10.
    fn gs_solve_inverts_the_multiply() {
        // Arrange
        let n = 6;
        let acf = Array1::from_iter((0..n).map(|k| 2.0 * 0.55f64.powi(k as i32)));
        let factors = gschur_factor(&acf.view()).unwrap();
        let m = fft::next_pow2(2 * n);
        let plan = fft::plan(m);
        let mut spec = vec![Complex::new(0.0, 0.0); m];
        let mut work = vec![Complex::new(0.0, 0.0); m];
        fill_embedding_spectrum(&plan, acf.as_slice().unwrap(), &mut spec);

        let z: Vec<f64> = (0..n).map(|i| 0.5 * i as f64 - 1.0).collect();
        let mut buf = vec![0.0; m];
        buf[..n].copy_from_slice(&z);
        spec_multiply_in_place(&plan, &spec, &mut buf, n, &mut work);

        // Act
        let mut out = vec![0.0; n];
        let (mut ra, mut rb, mut rc) = (vec![0.0; m], vec![0.0; m], vec![0.0; m]);
        let mut cplx = vec![Complex::new(0.0, 0.0); m];
        gs_solve_into(
            factors.delta.as_slice().unwrap(),
            factors.delta_rev.as_slice().unwrap(),
            &plan,
            &buf[..n],
            &mut out,
            &mut ra,
            &mut rb,
            &mut rc,
            &mut cplx,
        );

        // Assert
        for j in 0..n {
            assert!((out[j] - z[j]).abs() < 1e-10, "index {j}: {} vs {}", out[j], z[j]);
        }
    }

    #[test]
    // Purpose
    // -------
    // Shift operators agree with their matrix definitions.
    //
    // Given
    // -----
    // - v = (1, 2, 3).
    //
    // Expect
    // ------
    // - Z v = (0, 1, 2), Zᵀ v = (2, 3, 0); the in-place variant matches.
    fn shifts_match_their_definitions() {
        let v = [1.0, 2.0, 3.0];
        let mut down = [0.0; 3];
        let mut up = [0.0; 3];
        shift_down_into(&v, &mut down);
        shift_up_into(&v, &mut up);
        assert_eq!(down, [0.0, 1.0, 2.0]);
        assert_eq!(up, [2.0, 3.0, 0.0]);

        let mut buf = v;
        shift_down_in_place(&mut buf);
        assert_eq!(buf, down);
    }
}
