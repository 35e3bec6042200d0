//! Gaussian log-density, score, and Hessian for Toeplitz covariances.
//!
//! Implements, for ε = X − μ(θ) and Σ = T(γ(θ)):
//!
//!   ℓ = −½(N log 2π + log|Σ| + εᵀΣ⁻¹ε)
//!   ∂ℓ/∂θ_p = (∂μ_p)ᵀΣ⁻¹ε + ½ εᵀΣ⁻¹ T(∂γ_p) Σ⁻¹ε − ½ tr(Σ⁻¹ T(∂γ_p))
//!
//! and the closed-form Hessian combining the second-order μ/γ terms with
//! the trace identity tr(Σ⁻¹T(∂²γ_pq)) − tr(Σ⁻¹T(∂γ_p)Σ⁻¹T(∂γ_q)).
//!
//! ## Missing modes
//! μ, ∂μ, ∂γ, ∂²μ, ∂²γ are all optional: an absent table means "that
//! derivative is identically zero" and the corresponding terms are skipped.
//! These modes are part of the public contract (a mean-independent model
//! passes no ∂μ; a variance-independent model passes no ∂γ).
//!
//! ## Method selection
//! Every entry point takes a [`Method`]: `GSchur` (superfast handle path),
//! `DurbinLevinson` (O(N²) reference path), or `Auto`, which picks DL below
//! a crossover order (default 300, overridable via the
//! `TOEPLITZ_DL_CROSSOVER` environment variable).
//!
//! ## Cost per evaluation
//! With a factored handle, the density and score cost O(1) solves and
//! multiplies each (O(N log N)); the Hessian adds one solve per parameter
//! and one trace-profile per parameter pair.

use crate::density::errors::{DensityError, DensityResult};
use crate::fft;
use crate::toeplitz::durbin_levinson::{dl_delta, dl_density};
use crate::toeplitz::handle::Toeplitz;
use ndarray::{s, Array1, Array2, ArrayView1, ArrayView2, ArrayView3};
use std::f64::consts::PI;

/// Crossover order below which `Method::Auto` resolves to Durbin–Levinson.
const DEFAULT_CROSSOVER: usize = 300;

/// Computational path for density, score, and Hessian evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Durbin–Levinson below the crossover order, GSchur at or above it.
    Auto,
    /// Superfast generalized-Schur path through a [`Toeplitz`] handle.
    GSchur,
    /// O(N²) Durbin–Levinson reference path.
    DurbinLevinson,
}

impl Method {
    fn resolve(self, n: usize) -> Method {
        match self {
            Method::Auto => {
                if n < crossover() {
                    Method::DurbinLevinson
                } else {
                    Method::GSchur
                }
            }
            other => other,
        }
    }
}

fn crossover() -> usize {
    std::env::var("TOEPLITZ_DL_CROSSOVER")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_CROSSOVER)
}

/// Covariance argument: either a borrowed ACF (a handle is built
/// internally) or an existing handle whose cached factorization is reused
/// across calls.
#[derive(Debug)]
pub enum Covariance<'a> {
    /// First row γ of the covariance; length fixes the order.
    Acf(ArrayView1<'a, f64>),
    /// Existing handle; shallow-shared, so the factorization this call
    /// triggers stays cached on the caller's handle.
    Handle(&'a Toeplitz),
}

impl Covariance<'_> {
    fn order(&self) -> usize {
        match self {
            Covariance::Acf(acf) => acf.len(),
            Covariance::Handle(handle) => handle.order(),
        }
    }

    fn acf_owned(&self) -> DensityResult<Array1<f64>> {
        match self {
            Covariance::Acf(acf) => Ok(acf.to_owned()),
            Covariance::Handle(handle) => Ok(handle.get_acf()?),
        }
    }
}

/// Log-density (or density) of each column of `x` under `N(0, Σ)`.
///
/// `x` is `N×k`, one observation per column; the result has one entry per
/// column. Pass `log = false` for the density itself.
///
/// # Errors
/// - [`DensityError::ObservationLength`] if `x.nrows()` differs from the
///   covariance order
/// - [`DensityError::NotPositiveDefinite`] (the penalizable sentinel)
/// - [`DensityError::Acf`] for validation/state failures
pub fn dnormtz(
    x: &ArrayView2<f64>, cov: &Covariance, log: bool, method: Method,
) -> DensityResult<Array1<f64>> {
    let n = cov.order();
    if x.nrows() != n {
        return Err(DensityError::ObservationLength { expected: n, actual: x.nrows() });
    }
    let ll = match method.resolve(n) {
        Method::DurbinLevinson => {
            let acf = cov.acf_owned()?;
            dl_density(x, &acf.view())?
        }
        _ => {
            let handle = fast_handle(cov)?;
            let log_det = handle.log_det()?;
            let w = handle.solve(x)?;
            let constant = n as f64 * (2.0 * PI).ln() + log_det;
            Array1::from_iter(
                x.columns()
                    .into_iter()
                    .zip(w.columns())
                    .map(|(xc, wc)| -0.5 * (constant + xc.dot(&wc))),
            )
        }
    };
    Ok(if log { ll } else { ll.mapv(f64::exp) })
}

/// Score ∂ℓ/∂θ of the Gaussian log-density at one observation.
///
/// `dmu` and `dacf` are `N×P` tables (column p holds ∂μ/∂θ_p resp.
/// ∂γ/∂θ_p); either may be `None` (that derivative is zero). With both
/// absent the result is empty. Tables are caller-owned and never mutated.
///
/// # Errors
/// - Shape errors ([`DensityError::MeanLength`], [`DensityError::TableRows`],
///   [`DensityError::ParamCountMismatch`])
/// - [`DensityError::NotPositiveDefinite`] and [`DensityError::Acf`]
pub fn snorm_grad(
    x: &ArrayView1<f64>, mu: Option<&ArrayView1<f64>>, cov: &Covariance,
    dmu: Option<&ArrayView2<f64>>, dacf: Option<&ArrayView2<f64>>, method: Method,
) -> DensityResult<Array1<f64>> {
    let n = cov.order();
    check_observation(x, mu, n)?;
    check_table_rows("dmu", dmu, n)?;
    check_table_rows("dacf", dacf, n)?;
    let p_count = match resolve_param_count(&[
        ("dmu", dmu.map(|t| t.ncols())),
        ("dacf", dacf.map(|t| t.ncols())),
    ])? {
        Some(p) => p,
        None => return Ok(Array1::zeros(0)),
    };

    let engine = Engine::build(cov, method)?;
    let eps = residual(x, mu);
    let s = engine.solve(&eps.view())?;

    let mut grad = Array1::zeros(p_count);
    for p in 0..p_count {
        let mut acc = 0.0;
        if let Some(dmu) = dmu {
            acc += dmu.column(p).dot(&s);
        }
        if let Some(dacf) = dacf {
            let w = toeplitz_mul(&dacf.column(p), &s.view());
            acc += 0.5 * s.dot(&w);
            acc -= 0.5 * engine.trace_grad(&dacf.column(p))?;
        }
        grad[p] = acc;
    }
    Ok(grad)
}

/// Hessian ∂²ℓ/∂θ∂θᵀ of the Gaussian log-density at one observation.
///
/// Second-order tables `d2mu`/`d2acf` are `N×P×P` (slice `[.., p, q]` holds
/// ∂²μ resp. ∂²γ by θ_p, θ_q); all derivative tables are optional with the
/// same missing-mode semantics as [`snorm_grad`]. The result is explicitly
/// symmetrized.
///
/// # Errors
/// - Shape errors and the covariance failures of [`snorm_grad`].
#[allow(clippy::too_many_arguments)]
pub fn snorm_hess(
    x: &ArrayView1<f64>, mu: Option<&ArrayView1<f64>>, cov: &Covariance,
    dmu: Option<&ArrayView2<f64>>, dacf: Option<&ArrayView2<f64>>,
    d2mu: Option<&ArrayView3<f64>>, d2acf: Option<&ArrayView3<f64>>, method: Method,
) -> DensityResult<Array2<f64>> {
    let n = cov.order();
    check_observation(x, mu, n)?;
    check_table_rows("dmu", dmu, n)?;
    check_table_rows("dacf", dacf, n)?;
    check_cube("d2mu", d2mu, n)?;
    check_cube("d2acf", d2acf, n)?;
    let p_count = match resolve_param_count(&[
        ("dmu", dmu.map(|t| t.ncols())),
        ("dacf", dacf.map(|t| t.ncols())),
        ("d2mu", d2mu.map(|t| t.dim().1)),
        ("d2acf", d2acf.map(|t| t.dim().1)),
    ])? {
        Some(p) => p,
        None => return Ok(Array2::zeros((0, 0))),
    };

    let engine = Engine::build(cov, method)?;
    let eps = residual(x, mu);
    let s = engine.solve(&eps.view())?;

    // Per-parameter solves: u_p = Σ⁻¹ ∂μ_p, w_p = T(∂γ_p) s, v_p = Σ⁻¹ w_p.
    let u: Option<Vec<Array1<f64>>> = match dmu {
        Some(dmu) => {
            let mut cols = Vec::with_capacity(p_count);
            for p in 0..p_count {
                cols.push(engine.solve(&dmu.column(p))?);
            }
            Some(cols)
        }
        None => None,
    };
    let (w, v) = match dacf {
        Some(dacf) => {
            let mut ws = Vec::with_capacity(p_count);
            let mut vs = Vec::with_capacity(p_count);
            for p in 0..p_count {
                let wp = toeplitz_mul(&dacf.column(p), &s.view());
                vs.push(engine.solve(&wp.view())?);
                ws.push(wp);
            }
            (Some(ws), Some(vs))
        }
        None => (None, None),
    };
    let trace_pairs = match dacf {
        Some(dacf) => Some(engine.trace_hess_matrix(dacf, p_count)?),
        None => None,
    };

    let mut hess = Array2::zeros((p_count, p_count));
    for p in 0..p_count {
        for q in 0..p_count {
            let mut acc = 0.0;
            if let Some(d2mu) = d2mu {
                acc += s.dot(&d2mu.slice(s![.., p, q]));
            }
            if let Some(u) = &u {
                if let Some(dmu) = dmu {
                    acc -= dmu.column(p).dot(&u[q]);
                }
            }
            if let (Some(dmu), Some(v)) = (dmu, &v) {
                acc -= dmu.column(p).dot(&v[q]);
                acc -= dmu.column(q).dot(&v[p]);
            }
            if let (Some(w), Some(v)) = (&w, &v) {
                acc -= w[p].dot(&v[q]);
            }
            if let Some(tp) = &trace_pairs {
                acc += 0.5 * tp[[p, q]];
            }
            if let Some(d2acf) = d2acf {
                let d2col = d2acf.slice(s![.., p, q]);
                let t = toeplitz_mul(&d2col, &s.view());
                acc += 0.5 * s.dot(&t);
                acc -= 0.5 * engine.trace_grad(&d2col)?;
            }
            hess[[p, q]] = acc;
        }
    }
    // The trace and quadratic terms are symmetric analytically but not
    // bitwise; enforce H = (H + Hᵀ)/2.
    for p in 0..p_count {
        for q in p + 1..p_count {
            let avg = 0.5 * (hess[[p, q]] + hess[[q, p]]);
            hess[[p, q]] = avg;
            hess[[q, p]] = avg;
        }
    }
    Ok(hess)
}

// ---- Engine: one implementation of the primitives per method --------------

/// Primitive provider for the derivative kernels: the superfast handle, or
/// the dense reference state assembled from the Durbin–Levinson output.
enum Engine {
    Fast(Toeplitz),
    Reference(Reference),
}

/// Dense reference state: Σ⁻¹ assembled in O(N²) from the first column via
/// the displacement recurrence `Σ⁻¹_{ij} = ∇_{ij} + Σ⁻¹_{i−1,j−1}`,
/// ∇ = (δδᵀ − δ̃δ̃ᵀ)/δ₀.
struct Reference {
    inv: Array2<f64>,
    inv_profile: Array1<f64>,
}

impl Engine {
    fn build(cov: &Covariance, method: Method) -> DensityResult<Engine> {
        let n = cov.order();
        match method.resolve(n) {
            Method::DurbinLevinson => {
                let acf = cov.acf_owned()?;
                Ok(Engine::Reference(Reference::build(&acf.view())?))
            }
            _ => Ok(Engine::Fast(fast_handle(cov)?)),
        }
    }

    fn solve(&self, z: &ArrayView1<f64>) -> DensityResult<Array1<f64>> {
        match self {
            Engine::Fast(handle) => Ok(handle.solve_vec(z)?),
            Engine::Reference(r) => Ok(r.inv.dot(z)),
        }
    }

    fn trace_grad(&self, lags: &ArrayView1<f64>) -> DensityResult<f64> {
        match self {
            Engine::Fast(handle) => Ok(handle.trace_grad(lags)?),
            Engine::Reference(r) => Ok(r.inv_profile.dot(lags)),
        }
    }

    /// All pairwise `tr(Σ⁻¹ T(∂γ_p) Σ⁻¹ T(∂γ_q))` values.
    fn trace_hess_matrix(
        &self, dacf: &ArrayView2<f64>, p_count: usize,
    ) -> DensityResult<Array2<f64>> {
        let mut out = Array2::zeros((p_count, p_count));
        match self {
            Engine::Fast(handle) => {
                for p in 0..p_count {
                    for q in 0..p_count {
                        out[[p, q]] = handle.trace_hess(&dacf.column(p), &dacf.column(q))?;
                    }
                }
            }
            Engine::Reference(r) => {
                let n = dacf.nrows();
                // M_p = Σ⁻¹ T(∂γ_p); tr(M_p M_q) = Σ_{ij} M_p[i,j] M_q[j,i].
                let mut m: Vec<Array2<f64>> = Vec::with_capacity(p_count);
                for p in 0..p_count {
                    let tp = dense_toeplitz(&dacf.column(p), n);
                    m.push(r.inv.dot(&tp));
                }
                for p in 0..p_count {
                    for q in 0..p_count {
                        let mut acc = 0.0;
                        for i in 0..n {
                            acc += m[p].row(i).dot(&m[q].column(i));
                        }
                        out[[p, q]] = acc;
                    }
                }
            }
        }
        Ok(out)
    }
}

impl Reference {
    fn build(acf: &ArrayView1<f64>) -> DensityResult<Reference> {
        let n = acf.len();
        let (delta, _log_det) = dl_delta(acf)?;
        let d0 = delta[0];
        let mut delta_rev = Array1::zeros(n);
        for j in 1..n {
            delta_rev[j] = delta[n - j];
        }
        let mut inv = Array2::zeros((n, n));
        for i in 0..n {
            for j in 0..n {
                let mut val = (delta[i] * delta[j] - delta_rev[i] * delta_rev[j]) / d0;
                if i > 0 && j > 0 {
                    val += inv[[i - 1, j - 1]];
                }
                inv[[i, j]] = val;
            }
        }
        let mut inv_profile = Array1::zeros(n);
        for d in 0..n {
            let mut acc = 0.0;
            for i in d..n {
                acc += inv[[i, i - d]];
            }
            inv_profile[d] = if d == 0 { acc } else { 2.0 * acc };
        }
        Ok(Reference { inv, inv_profile })
    }
}

/// Obtain the superfast handle for a covariance argument: shallow-share an
/// existing handle (so its factorization cache is reused and retained) or
/// build one from the ACF.
fn fast_handle(cov: &Covariance) -> DensityResult<Toeplitz> {
    match cov {
        Covariance::Handle(handle) => Ok(handle.clone_shallow()),
        Covariance::Acf(acf) => Ok(Toeplitz::from_acf(acf)?),
    }
}

/// Symmetric Toeplitz multiply by arbitrary lags:
/// `T(x)v = L(x)v + U(x)v − x₀v`, two FFT convolutions.
fn toeplitz_mul(lags: &ArrayView1<f64>, v: &ArrayView1<f64>) -> Array1<f64> {
    let n = lags.len();
    let x: Vec<f64> = lags.iter().copied().collect();
    let vf: Vec<f64> = v.iter().copied().collect();
    let vr: Vec<f64> = v.iter().rev().copied().collect();
    let lower = fft::conv(&x, &vf);
    let upper = fft::conv(&x, &vr);
    Array1::from_iter((0..n).map(|i| lower[i] + upper[n - 1 - i] - x[0] * vf[i]))
}

fn dense_toeplitz(lags: &ArrayView1<f64>, n: usize) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |(i, j)| lags[(i as isize - j as isize).unsigned_abs()])
}

fn residual(x: &ArrayView1<f64>, mu: Option<&ArrayView1<f64>>) -> Array1<f64> {
    match mu {
        Some(mu) => x - mu,
        None => x.to_owned(),
    }
}

// ---- Shape checks ----------------------------------------------------------

fn check_observation(
    x: &ArrayView1<f64>, mu: Option<&ArrayView1<f64>>, n: usize,
) -> DensityResult<()> {
    if x.len() != n {
        return Err(DensityError::ObservationLength { expected: n, actual: x.len() });
    }
    if let Some(mu) = mu {
        if mu.len() != n {
            return Err(DensityError::MeanLength { expected: n, actual: mu.len() });
        }
    }
    Ok(())
}

fn check_table_rows(
    table: &'static str, t: Option<&ArrayView2<f64>>, n: usize,
) -> DensityResult<()> {
    if let Some(t) = t {
        if t.nrows() != n {
            return Err(DensityError::TableRows { table, expected: n, actual: t.nrows() });
        }
    }
    Ok(())
}

fn check_cube(table: &'static str, t: Option<&ArrayView3<f64>>, n: usize) -> DensityResult<()> {
    if let Some(t) = t {
        let (rows, p1, p2) = t.dim();
        if rows != n {
            return Err(DensityError::TableRows { table, expected: n, actual: rows });
        }
        if p1 != p2 {
            return Err(DensityError::ParamCountMismatch { table, expected: p1, actual: p2 });
        }
    }
    Ok(())
}

/// Agree on P across the present tables; `None` when every table is absent
/// (the fully-skipped slice).
fn resolve_param_count(
    counts: &[(&'static str, Option<usize>)],
) -> DensityResult<Option<usize>> {
    let mut resolved: Option<usize> = None;
    for &(table, count) in counts {
        if let Some(count) = count {
            match resolved {
                None => resolved = Some(count),
                Some(expected) if expected != count => {
                    return Err(DensityError::ParamCountMismatch {
                        table,
                        expected,
                        actual: count,
                    });
                }
                _ => {}
            }
        }
    }
    Ok(resolved)
}
