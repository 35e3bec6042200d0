//! Durbin–Levinson reference engine: O(N²) solve, log-determinant, density.
//!
//! This is the ground-truth path for the superfast kernel and the default
//! below the GSchur/DL crossover. Everything here is stateless: free
//! functions over borrowed ACF/observation views, O(N) memory.
//!
//! ## Recursion convention
//! The engine carries the **monic prediction-error filter** a⁽ᵗ⁾ of order t,
//! `a₀ = 1`, satisfying `Σ_{t+1} a = (v_t, 0, …, 0)` with innovation variance
//! `v_t`. One order update reads
//!
//!   ρ_{t+1} = (Σ_j a_j γ_{t+1−j}) / v_t,
//!   a′_j = a_j − ρ_{t+1} a_{t+1−j},   v′ = v_t (1 − ρ²),
//!
//! and the one-step predictor is `x̂_t = −Σ_{j≥1} a_j x_{t−j}`, so
//! `e_t = x_t − x̂_t` are the innovations with variances `v_t`.
//!
//! ## Positive definiteness
//! The same pivot policy as the GSchur factorizer applies: a non-finite
//! reflection, |ρ| ≥ 1, or `v ≤ ε·γ₀` reports `NotPositiveDefinite` with the
//! offending order.

use crate::toeplitz::errors::{ToeplitzError, ToeplitzResult};
use crate::toeplitz::validation::validate_acf;
use ndarray::{Array1, ArrayView1, ArrayView2};
use std::f64::consts::PI;

const PIVOT_EPS: f64 = f64::EPSILON;

/// Incremental Durbin recursion holding the monic filter and variance.
///
/// Shared by the solver, density, log-determinant, and the sequential
/// sampler in `simulation`. `advance` extends the order by one; `predict`
/// applies the current filter to a history slice.
#[derive(Debug, Clone)]
pub(crate) struct DurbinRecursion {
    acf: Array1<f64>,
    /// Monic filter a⁽ᵗ⁾, valid in `filter[..order + 1]`.
    filter: Vec<f64>,
    scratch: Vec<f64>,
    order: usize,
    var: f64,
}

impl DurbinRecursion {
    /// Start at order 0 with `v₀ = γ₀`. The ACF is copied once.
    pub fn new(acf: &ArrayView1<f64>) -> DurbinRecursion {
        let n = acf.len();
        let mut filter = vec![0.0; n];
        filter[0] = 1.0;
        DurbinRecursion {
            acf: acf.to_owned(),
            filter,
            scratch: vec![0.0; n],
            order: 0,
            var: acf[0],
        }
    }

    /// Current innovation variance `v_t`.
    pub fn var(&self) -> f64 {
        self.var
    }

    /// Current monic filter coefficients `a₀..a_t`.
    pub fn filter(&self) -> &[f64] {
        &self.filter[..self.order + 1]
    }

    /// One-step prediction `x̂_t = −Σ_{j≥1} a_j x_{t−j}` from a history of
    /// length ≥ current order (only the trailing `order` values are read).
    pub fn predict(&self, history: &[f64]) -> f64 {
        let t = history.len();
        let mut acc = 0.0;
        for j in 1..=self.order {
            acc -= self.filter[j] * history[t - j];
        }
        acc
    }

    /// Extend the filter order by one.
    ///
    /// # Errors
    /// - [`ToeplitzError::NotPositiveDefinite`] on a collapsed pivot; the
    ///   reported step is the new order.
    pub fn advance(&mut self) -> ToeplitzResult<()> {
        let t = self.order;
        let mut num = 0.0;
        for j in 0..=t {
            num += self.filter[j] * self.acf[t + 1 - j];
        }
        let rho = num / self.var;
        if !rho.is_finite() || rho.abs() >= 1.0 {
            return Err(ToeplitzError::NotPositiveDefinite { step: t + 1, pivot: rho });
        }
        for j in 0..=t + 1 {
            let mirrored = if t + 1 - j <= t { self.filter[t + 1 - j] } else { 0.0 };
            let own = if j <= t { self.filter[j] } else { 0.0 };
            self.scratch[j] = own - rho * mirrored;
        }
        self.filter[..t + 2].copy_from_slice(&self.scratch[..t + 2]);
        self.var *= 1.0 - rho * rho;
        if !self.var.is_finite() || self.var <= PIVOT_EPS * self.acf[0] {
            return Err(ToeplitzError::NotPositiveDefinite { step: t + 1, pivot: self.var });
        }
        self.order = t + 1;
        Ok(())
    }
}

/// Solve `Σ y = z` by the Levinson recursion with a general right-hand side.
///
/// O(N²) time, O(N) memory. The update appends `μ = (z_t − s)/v_t` using the
/// reversed monic filter as the backward vector.
///
/// # Errors
/// - ACF validation errors (`InvalidLength`, `NonFiniteAcf`,
///   `InvalidLeadingAcf`)
/// - [`ToeplitzError::InvalidLength`] if `z.len() != acf.len()`
/// - [`ToeplitzError::NotPositiveDefinite`] on a collapsed pivot
pub fn dl_solve(acf: &ArrayView1<f64>, z: &ArrayView1<f64>) -> ToeplitzResult<Array1<f64>> {
    let n = acf.len();
    validate_acf(acf, n)?;
    if z.len() != n {
        return Err(ToeplitzError::InvalidLength { expected: n, actual: z.len() });
    }
    let mut rec = DurbinRecursion::new(acf);
    let mut y = Array1::zeros(n);
    y[0] = z[0] / acf[0];
    for t in 1..n {
        rec.advance()?;
        // s = row t of Σ applied to the current partial solution.
        let mut s = 0.0;
        for j in 0..t {
            s += acf[t - j] * y[j];
        }
        let mu = (z[t] - s) / rec.var();
        let a = rec.filter();
        for j in 0..=t {
            y[j] += mu * a[t - j];
        }
    }
    Ok(y)
}

/// Log-determinant `log|Σ| = Σ_t log v_t` by the Durbin recursion.
///
/// # Errors
/// - ACF validation errors and [`ToeplitzError::NotPositiveDefinite`].
pub fn dl_logdet(acf: &ArrayView1<f64>) -> ToeplitzResult<f64> {
    let n = acf.len();
    validate_acf(acf, n)?;
    let mut rec = DurbinRecursion::new(acf);
    let mut log_det = rec.var().ln();
    for _ in 1..n {
        rec.advance()?;
        log_det += rec.var().ln();
    }
    Ok(log_det)
}

/// Exact Gaussian log-density of each column of `x` under the zero-mean
/// stationary model with the given ACF, via the innovations decomposition:
/// `ℓ = −½ Σ_t [log(2π v_t) + e_t²/v_t]`.
///
/// Returns one value per column; O(N²) time independent of the column count
/// apart from the O(N²·k) prediction sums.
///
/// # Errors
/// - ACF validation errors
/// - [`ToeplitzError::InvalidLength`] if `x.nrows() != acf.len()`
/// - [`ToeplitzError::NotPositiveDefinite`] on a collapsed pivot
pub fn dl_density(x: &ArrayView2<f64>, acf: &ArrayView1<f64>) -> ToeplitzResult<Array1<f64>> {
    let n = acf.len();
    validate_acf(acf, n)?;
    if x.nrows() != n {
        return Err(ToeplitzError::InvalidLength { expected: n, actual: x.nrows() });
    }
    let k = x.ncols();
    let mut rec = DurbinRecursion::new(acf);
    let mut ll = Array1::zeros(k);
    for t in 0..n {
        if t > 0 {
            rec.advance()?;
        }
        let v = rec.var();
        let log_term = (2.0 * PI * v).ln();
        let a = rec.filter();
        for c in 0..k {
            // Columns of a row-major view are strided; index directly.
            let mut pred = 0.0;
            for (j, &aj) in a.iter().enumerate().skip(1) {
                pred -= aj * x[[t - j, c]];
            }
            let e = x[[t, c]] - pred;
            ll[c] -= 0.5 * (log_term + e * e / v);
        }
    }
    Ok(ll)
}

/// First column of `Σ⁻¹` and log|Σ| from the final predictor:
/// `δ = a⁽ᴺ⁻¹⁾ / v_{N−1}`.
///
/// Used by the DL derivative path and as ground truth for the GSchur
/// generators.
pub(crate) fn dl_delta(acf: &ArrayView1<f64>) -> ToeplitzResult<(Array1<f64>, f64)> {
    let n = acf.len();
    validate_acf(acf, n)?;
    let mut rec = DurbinRecursion::new(acf);
    let mut log_det = rec.var().ln();
    for _ in 1..n {
        rec.advance()?;
        log_det += rec.var().ln();
    }
    let v = rec.var();
    let delta = Array1::from_iter(rec.filter().iter().map(|&a| a / v));
    Ok((delta, log_det))
}
