//! Trace-of-product primitives via displacement generators.
//!
//! The score and Hessian of the Gaussian log-likelihood need
//! `tr(Σ⁻¹ T(y))` and `tr(Σ⁻¹ T(x) Σ⁻¹ T(y))` where `T(·)` is the symmetric
//! Toeplitz lift of a derivative ACF. Both reduce to **diagonal-sum
//! profiles**: for any matrix `K`,
//!
//!   tr(K T(y)) = Σ_{d≥0} profile_d(K) · y_d,
//!
//! where `profile_0` is the diagonal sum of `K` and `profile_d` (d ≥ 1) the
//! sum of its d-th super- plus sub-diagonal.
//!
//! ## Why profiles are cheap here
//! Every matrix involved has small displacement rank. If
//! `K − Z K Zᵀ = Σ_k σ_k g_k h_kᵀ` then `K = Σ_k σ_k L(g_k) L(h_k)ᵀ`, and the
//! diagonal sums of one `L(g)L(h)ᵀ` term are weighted cross-correlations of
//! `g` and `h`:
//!
//!   sup_d = (N−d)·r_d − s_d,   sub_d = N·r_{−d} − s_{−d},
//!
//! with `r_d = Σ_u g_u h_{u+d}` and `s_d = Σ_u u·g_u h_{u+d}` — two FFT
//! correlations per generator pair.
//!
//! ## Composing generators
//! `Σ⁻¹` carries its generators directly from the Gohberg–Semencul pair:
//! `∇(Σ⁻¹) = (1/δ₀)(δδᵀ − δ̃δ̃ᵀ)`. For `K = Σ⁻¹ T(x) Σ⁻¹` the product rule
//!
//!   ∇(AB) = Σ_k σ_k a_k (Z B Zᵀ b_k)ᵀ + Σ_l τ_l (A c_l) d_lᵀ
//!           − (Z A e_{N−1})(Z Bᵀ e_{N−1})ᵀ
//!
//! (A, B symmetric here; `∇T(x) = e₀xᵀ + x̂e₀ᵀ` with `x̂ = x − x₀e₀`)
//! applied twice yields eight generator pairs whose vectors cost a fixed
//! number of solves and Toeplitz multiplies — keeping the whole evaluation
//! at O(N log N) per derivative pair. Persymmetry supplies the last columns
//! for free: `Σ⁻¹ e_{N−1} = rev δ`, `T(x) e_{N−1} = rev x`.

use crate::fft::{conv_into, FftPlan};
use crate::toeplitz::gschur::SchurFactors;
use crate::toeplitz::ops::{
    fill_embedding_spectrum, gs_solve_into, shift_down_in_place, shift_down_into,
    shift_up_into, spec_multiply_in_place,
};
use crate::toeplitz::workspace::Workspace;
use ndarray::{Array1, Array2};
use rustfft::num_complex::Complex;

/// Diagonal-sum profile of Σ⁻¹ from its Gohberg–Semencul generators.
///
/// Computed once per factorization; afterwards every
/// `trace_grad(dγ) = tr(Σ⁻¹ T(dγ))` is an O(N) dot product against the
/// returned profile. Two weighted autocorrelations per generator.
pub(crate) fn inverse_profile(factors: &SchurFactors, ws: &mut Workspace) -> Array1<f64> {
    let delta = factors.delta.as_slice().expect("generators are contiguous");
    let delta_rev = factors.delta_rev.as_slice().expect("generators are contiguous");
    let d0 = delta[0];
    let mut profile = Array1::zeros(ws.n);
    let out = profile.as_slice_mut().expect("freshly allocated profile is contiguous");
    let Workspace {
        ref plan, ref mut cplx_a, ref mut real_a, ref mut real_b, ref mut real_c, n, ..
    } = *ws;
    accumulate_pair(1.0 / d0, delta, delta, n, plan, cplx_a, real_a, real_b, real_c, out);
    accumulate_pair(-1.0 / d0, delta_rev, delta_rev, n, plan, cplx_a, real_a, real_b, real_c, out);
    profile
}

/// `tr(K T(y))` from a diagonal-sum profile: a plain dot product (the lag-0
/// term is counted once and every other lag twice by construction).
pub(crate) fn profile_dot(profile: &[f64], y: &[f64]) -> f64 {
    profile.iter().zip(y.iter()).map(|(p, yi)| p * yi).sum()
}

/// Fill `ws.profile` with the diagonal-sum profile of `K = Σ⁻¹ T(x) Σ⁻¹`,
/// so that `tr(Σ⁻¹ T(x) Σ⁻¹ T(y)) = ws.profile · y` for any lag vector `y`.
///
/// The eight generator pairs of `K` are staged in
/// `ws.pair_g`/`ws.pair_h`/`ws.pair_sign`; the construction performs nine
/// Gohberg–Semencul solves and four circulant multiplies, then two FFT
/// correlations per pair. No heap allocation.
pub(crate) fn hess_profile(factors: &SchurFactors, ws: &mut Workspace, x: &[f64]) {
    let delta = factors.delta.as_slice().expect("generators are contiguous");
    let delta_rev = factors.delta_rev.as_slice().expect("generators are contiguous");
    let d0 = delta[0];

    // Embedding spectrum of T(x) for the duration of this call.
    fill_embedding_spectrum(&ws.plan, x, &mut ws.cplx_b);

    let Workspace {
        ref plan,
        ref mut cplx_a,
        ref cplx_b,
        ref mut real_a,
        ref mut real_b,
        ref mut real_c,
        ref mut pair_g,
        ref mut pair_h,
        ref mut pair_sign,
        ref mut profile,
        n,
        ..
    } = *ws;

    // ---- Generators of P = Σ⁻¹ T(x): rows 0..5 ----
    // Rows 0, 1: (±1, (δ or δ̃)/δ₀, Z T(x) Zᵀ (δ or δ̃)).
    for (i, &(gen, sign)) in [(delta, 1.0), (delta_rev, -1.0)].iter().enumerate() {
        pair_sign[i] = sign;
        for (slot, &v) in row_mut(pair_g, i).iter_mut().zip(gen.iter()) {
            *slot = v / d0;
        }
        let h = row_mut(pair_h, i);
        shift_up_into(gen, h);
        spec_multiply_in_place(plan, cplx_b, h, n, cplx_a);
        shift_down_in_place(h);
    }
    // Row 2: (+1, Σ⁻¹ e₀ = δ, x).
    pair_sign[2] = 1.0;
    row_mut(pair_g, 2).copy_from_slice(delta);
    row_mut(pair_h, 2).copy_from_slice(x);
    // Row 3: (+1, Σ⁻¹ x̂, e₀) with x̂ = x − x₀ e₀ staged in the h-row.
    pair_sign[3] = 1.0;
    {
        let staging = row_mut(pair_h, 3);
        staging.copy_from_slice(x);
        staging[0] = 0.0;
    }
    {
        let z: &[f64] = row_mut(pair_h, 3);
        gs_solve_into(delta, delta_rev, plan, z, row_mut(pair_g, 3), real_a, real_b, real_c, cplx_a);
    }
    {
        let h = row_mut(pair_h, 3);
        h.fill(0.0);
        h[0] = 1.0;
    }
    // Row 4: (−1, Z Σ⁻¹ e_{N−1}, Z T(x) e_{N−1}) = (−1, Z rev δ, Z rev x).
    pair_sign[4] = -1.0;
    reverse_into(delta, real_a);
    shift_down_into(&real_a[..n], row_mut(pair_g, 4));
    reverse_into(x, real_a);
    shift_down_into(&real_a[..n], row_mut(pair_h, 4));

    // ---- Lift to K = P Σ⁻¹: rows 0..5 keep g, h_i ← Z Σ⁻¹ Zᵀ h_i ----
    for i in 0..5 {
        shift_up_into(row_mut(pair_h, i), &mut profile[..n]);
        gs_solve_into(
            delta,
            delta_rev,
            plan,
            &profile[..n],
            row_mut(pair_h, i),
            real_a,
            real_b,
            real_c,
            cplx_a,
        );
        shift_down_in_place(row_mut(pair_h, i));
    }
    // Rows 5, 6: (±1, Σ⁻¹ T(x) (δ or δ̃)/δ₀, δ or δ̃).
    for (i, &(gen, sign)) in [(delta, 1.0), (delta_rev, -1.0)].iter().enumerate() {
        let dst = 5 + i;
        pair_sign[dst] = sign;
        for (slot, &v) in profile.iter_mut().take(n).zip(gen.iter()) {
            *slot = v / d0;
        }
        spec_multiply_in_place(plan, cplx_b, profile, n, cplx_a);
        gs_solve_into(
            delta,
            delta_rev,
            plan,
            &profile[..n],
            row_mut(pair_g, dst),
            real_a,
            real_b,
            real_c,
            cplx_a,
        );
        row_mut(pair_h, dst).copy_from_slice(gen);
    }
    // Row 7: (−1, Z Σ⁻¹ T(x) e_{N−1}, Z Σ⁻¹ e_{N−1}) = (−1, Z Σ⁻¹ rev x, Z rev δ).
    pair_sign[7] = -1.0;
    reverse_into(x, profile);
    gs_solve_into(
        delta,
        delta_rev,
        plan,
        &profile[..n],
        row_mut(pair_g, 7),
        real_a,
        real_b,
        real_c,
        cplx_a,
    );
    shift_down_in_place(row_mut(pair_g, 7));
    reverse_into(delta, real_a);
    shift_down_into(&real_a[..n], row_mut(pair_h, 7));

    // ---- Reduce the pairs to the diagonal-sum profile ----
    profile.fill(0.0);
    for i in 0..pair_sign.len() {
        let g: &[f64] = pair_g.row(i).to_slice().expect("rows are contiguous");
        let h: &[f64] = pair_h.row(i).to_slice().expect("rows are contiguous");
        accumulate_pair(
            pair_sign[i], g, h, n, plan, cplx_a, real_a, real_b, real_c, profile,
        );
    }
}

/// Add the diagonal-sum profile of `sign · L(g) L(h)ᵀ` to `out` via two
/// weighted FFT cross-correlations.
#[allow(clippy::too_many_arguments)]
fn accumulate_pair(
    sign: f64, g: &[f64], h: &[f64], n: usize, plan: &FftPlan, cplx: &mut [Complex<f64>],
    ra: &mut [f64], rb: &mut [f64], rc: &mut [f64], out: &mut [f64],
) {
    // r_d = conv(rev g, h)[d + n − 1]  for d in −(n−1)..n.
    reverse_into(g, rc);
    conv_into(plan, &rc[..n], h, &mut ra[..2 * n - 1], cplx);
    // s_d: same correlation with weights u·g_u.
    for (j, slot) in rc.iter_mut().take(n).enumerate() {
        *slot *= (n - 1 - j) as f64;
    }
    conv_into(plan, &rc[..n], h, &mut rb[..2 * n - 1], cplx);

    let nf = n as f64;
    // d = 0: S₀ = N·r₀ − s₀, counted once.
    out[0] += sign * (nf * ra[n - 1] - rb[n - 1]);
    for d in 1..n {
        let sup = (nf - d as f64) * ra[n - 1 + d] - rb[n - 1 + d];
        let sub = nf * ra[n - 1 - d] - rb[n - 1 - d];
        out[d] += sign * (sup + sub);
    }
}

/// `dst[..src.len()] ← rev src`.
fn reverse_into(src: &[f64], dst: &mut [f64]) {
    let n = src.len();
    for j in 0..n {
        dst[j] = src[n - 1 - j];
    }
}

/// Contiguous mutable row of a standard-layout matrix.
fn row_mut(m: &mut Array2<f64>, i: usize) -> &mut [f64] {
    m.row_mut(i).into_slice().expect("rows of a standard-layout matrix are contiguous")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toeplitz::gschur::gschur_factor;
    use ndarray::Array1;

    // -------------------------------------------------------------------------
    // Scope
    // -----
    // These tests cover:
    // - The Σ⁻¹ profile against the dense inverse.
    // - The Σ⁻¹T(x)Σ⁻¹ profile (hence trace_hess) against dense products.
    //
    // They intentionally DO NOT cover:
    // - Handle-level wiring of the profiles (handle tests) or the density
    //   kernel's use of the traces (integration suite).
    // -------------------------------------------------------------------------

    fn dense_sigma(acf: &Array1<f64>) -> nalgebra::DMatrix<f64> {
        let n = acf.len();
        nalgebra::DMatrix::from_fn(n, n, |i, j| acf[(i as isize - j as isize).unsigned_abs()])
    }

    fn dense_toeplitz(x: &Array1<f64>) -> nalgebra::DMatrix<f64> {
        let n = x.len();
        nalgebra::DMatrix::from_fn(n, n, |i, j| x[(i as isize - j as isize).unsigned_abs()])
    }

    #[test]
    // Purpose
    // -------
    // tr(Σ⁻¹ T(y)) via the cached profile must match the dense trace.
    //
    // Given
    // -----
    // - γ_k = 2·0.6^k of order 7 and a lag vector y with mixed signs.
    //
    // Expect
    // ------
    // - Agreement to 1e-10.
    fn inverse_profile_reproduces_dense_trace() {
        // Arrange
        let n = 7;
        let acf = Array1::from_iter((0..n).map(|k| 2.0 * 0.6f64.powi(k as i32)));
        let y = Array1::from_iter((0..n).map(|k| 0.4 * (k as f64 * 0.9).cos()));
        let factors = gschur_factor(&acf.view()).unwrap();
        let mut ws = Workspace::new(n);

        let sigma = dense_sigma(&acf);
        let inv = sigma.try_inverse().expect("SPD by construction");
        let want = (&inv * dense_toeplitz(&y)).trace();

        // Act
        let profile = inverse_profile(&factors, &mut ws);
        let got = profile_dot(profile.as_slice().unwrap(), y.as_slice().unwrap());

        // Assert
        assert!((got - want).abs() < 1e-10, "{got} vs {want}");
    }

    #[test]
    // Purpose
    // -------
    // The composed generator profile must reproduce the dense value of
    // tr(Σ⁻¹ T(x) Σ⁻¹ T(y)), including on the smallest orders.
    //
    // Given
    // -----
    // - Orders 1, 2, 3 and 8 with γ_k = 1.5·0.5^k and two distinct lag
    //   vectors x, y.
    //
    // Expect
    // ------
    // - Agreement to 1e-9 at every order.
    fn hess_profile_reproduces_dense_trace() {
        for n in [1usize, 2, 3, 8] {
            // Arrange
            let acf = Array1::from_iter((0..n).map(|k| 1.5 * 0.5f64.powi(k as i32)));
            let x = Array1::from_iter((0..n).map(|k| 1.0 / (1.0 + k as f64)));
            let y = Array1::from_iter((0..n).map(|k| (-0.3f64).powi(k as i32)));
            let factors = gschur_factor(&acf.view()).unwrap();
            let mut ws = Workspace::new(n);

            let inv = dense_sigma(&acf).try_inverse().expect("SPD by construction");
            let k_dense = &inv * dense_toeplitz(&x) * &inv;
            let want = (&k_dense * dense_toeplitz(&y)).trace();

            // Act
            hess_profile(&factors, &mut ws, x.as_slice().unwrap());
            let got = profile_dot(&ws.profile, y.as_slice().unwrap());

            // Assert
            assert!((got - want).abs() < 1e-9, "order {n}: {got} vs {want}");
        }
    }
}
