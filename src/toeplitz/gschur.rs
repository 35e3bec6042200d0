//! Generalized Schur factorization of an SPD Toeplitz matrix.
//!
//! Computes, from an ACF γ of length N, the Gohberg–Semencul generator pair
//! of Σ⁻¹ — δ (the first column of Σ⁻¹) and its persymmetric companion
//! δ̃ = (0, δ_{N−1}, …, δ₁) — together with log|Σ|, in O(N log² N).
//!
//! ## How the recursion is organized
//! The Schur recursion advances a generator pair `(u, v)` of the displacement
//! `Σ − ZΣZᵀ = (1/γ₀)(γγᵀ − γ̂γ̂ᵀ)` one order at a time. In *based*
//! coordinates (windows re-indexed so the current pivot sits at position 0)
//! one step reads
//!
//!   ρ = v[0]/u[0],   c = 1/(u[0](1 − ρ²)),
//!   u[j] ← c(u[j] − ρ v[j]),   v[j] ← c(v[j+1] − ρ u[j+1]),
//!
//! which keeps the pivot normalized to 1 and yields the reflection
//! coefficient ρ_k of order k at each step. The innovation variances follow
//! as d₀ = γ₀, d_k = d_{k−1}(1 − ρ_k²), and log|Σ| = Σ_k log d_k.
//!
//! ## Doubling
//! A block of s steps acts on the generators as a 2×2 polynomial transmission
//! matrix Θ(z) = Π c_k [[z, −ρ_k z], [−ρ_k, 1]] of degree s. The recursion
//! splits a block at `floor(s/2)`, runs the first half on a truncated window,
//! advances the full window through Θ₁ with FFT polynomial products, runs the
//! second half, and merges Θ = Θ₂·Θ₁. Leaves (≤ 64 steps) run the classical
//! progressive recursion above.
//!
//! ## From reflections to δ
//! The monic prediction polynomial a(z) of order N−1 satisfies
//! [a_k; ã_k] = [[1, −ρ_k z], [−ρ_k, z]]·[a_{k−1}; ã_{k−1}] starting from
//! [1; 1]; the full product is assembled by the same divide-and-conquer
//! polynomial machinery, and δ = a / d_{N−1}.
//!
//! ## Numerical policy
//! A non-finite reflection, |ρ_k| ≥ 1, or a variance below ε·γ₀ aborts with
//! `NotPositiveDefinite` carrying the offending step. No partial state
//! escapes: the caller only observes the error.

use crate::fft;
use crate::toeplitz::errors::{ToeplitzError, ToeplitzResult};
use ndarray::{Array1, ArrayView1};

/// Leaf size for the doubling recursion; below this the classical
/// progressive recursion is cheaper than FFT merges.
const SCHUR_LEAF: usize = 64;

/// Variance floor relative to γ₀ below which the matrix is treated as
/// numerically indefinite.
const PIVOT_EPS: f64 = f64::EPSILON;

/// Gohberg–Semencul generators of Σ⁻¹ plus the log-determinant.
///
/// In the factored state of a handle these satisfy
/// `Σ⁻¹ = (1/δ₀)(L(δ)L(δ)ᵀ − L(δ̃)L(δ̃)ᵀ)` with `L(·)` the lower-triangular
/// Toeplitz lift of its argument.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SchurFactors {
    /// δ — first column of Σ⁻¹.
    pub delta: Array1<f64>,
    /// δ̃ — persymmetric companion `(0, δ_{N−1}, …, δ₁)`.
    pub delta_rev: Array1<f64>,
    /// log|Σ| accumulated from the step variances.
    pub log_det: f64,
}

/// Factor an SPD Toeplitz matrix given by its ACF.
///
/// # Inputs
/// - `acf`: validated ACF of length ≥ 1 with `γ₀ > 0` (see
///   `validation::validate_acf`; this function assumes well-formed input).
///
/// # Returns
/// - [`SchurFactors`] with δ, δ̃ and log|Σ|.
///
/// # Errors
/// - [`ToeplitzError::NotPositiveDefinite`] when the recursion meets a
///   non-finite reflection, |ρ| ≥ 1, or a variance below ε·γ₀.
pub(crate) fn gschur_factor(acf: &ArrayView1<f64>) -> ToeplitzResult<SchurFactors> {
    factor_with_leaf(acf, SCHUR_LEAF)
}

/// Implementation of [`gschur_factor`] with an explicit leaf size so tests
/// can force the doubling merges on small inputs.
pub(crate) fn factor_with_leaf(
    acf: &ArrayView1<f64>, leaf: usize,
) -> ToeplitzResult<SchurFactors> {
    let n = acf.len();
    let gamma0 = acf[0];
    if n == 1 {
        return Ok(SchurFactors {
            delta: Array1::from_elem(1, 1.0 / gamma0),
            delta_rev: Array1::zeros(1),
            log_det: gamma0.ln(),
        });
    }

    // Based initial windows: u[j] = γ_j, v[j] = γ_{j+1}, one step per order.
    let steps = n - 1;
    let u: Vec<f64> = acf.iter().take(steps).copied().collect();
    let v: Vec<f64> = acf.iter().skip(1).take(steps).copied().collect();

    let mut rhos = Vec::with_capacity(steps);
    let mut norms = Vec::with_capacity(steps);
    schur_blocks(u, v, steps, 0, leaf, false, &mut rhos, &mut norms)?;

    // Innovation variances and the determinant; the variance floor catches
    // products of near-unit reflections that no single step trips.
    let mut log_det = gamma0.ln();
    let mut d = gamma0;
    for (k, &rho) in rhos.iter().enumerate() {
        d *= 1.0 - rho * rho;
        if !d.is_finite() || d <= PIVOT_EPS * gamma0 {
            return Err(ToeplitzError::NotPositiveDefinite { step: k + 1, pivot: d });
        }
        log_det += d.ln();
    }

    // Monic prediction polynomial of order N−1, then δ = a / d_{N−1}.
    let a = levinson_polynomial(&rhos, leaf);
    let scale = 1.0 / d;
    let delta = Array1::from_iter(a.iter().map(|&ai| ai * scale));
    let mut delta_rev = Array1::zeros(n);
    for j in 1..n {
        delta_rev[j] = delta[n - j];
    }
    Ok(SchurFactors { delta, delta_rev, log_det })
}

/// 2×2 polynomial matrix in coefficient form, used both for Schur
/// transmission matrices and Durbin order-update products.
#[derive(Debug, Clone)]
struct PolyMat {
    a: Vec<f64>,
    b: Vec<f64>,
    c: Vec<f64>,
    d: Vec<f64>,
}

impl PolyMat {
    fn identity() -> PolyMat {
        PolyMat { a: vec![1.0], b: vec![0.0], c: vec![0.0], d: vec![1.0] }
    }

    /// `self · rhs`, entrywise polynomial products via FFT convolution.
    fn mul(&self, rhs: &PolyMat) -> PolyMat {
        PolyMat {
            a: poly_add(fft::conv(&self.a, &rhs.a), fft::conv(&self.b, &rhs.c)),
            b: poly_add(fft::conv(&self.a, &rhs.b), fft::conv(&self.b, &rhs.d)),
            c: poly_add(fft::conv(&self.c, &rhs.a), fft::conv(&self.d, &rhs.c)),
            d: poly_add(fft::conv(&self.c, &rhs.b), fft::conv(&self.d, &rhs.d)),
        }
    }
}

/// Coefficientwise sum, padding the shorter operand.
fn poly_add(mut x: Vec<f64>, y: Vec<f64>) -> Vec<f64> {
    if y.len() > x.len() {
        x.resize(y.len(), 0.0);
    }
    for (xi, yi) in x.iter_mut().zip(y.iter()) {
        *xi += yi;
    }
    x
}

/// Run `steps` Schur steps on based windows `(u, v)`, collecting reflection
/// coefficients and normalizers, and (when `need_theta`) the block
/// transmission matrix.
///
/// Windows must have length ≥ `steps`; ownership is taken because the
/// recursion consumes them. `offset` is the global step index of the first
/// step in this block, used only for error reporting.
#[allow(clippy::too_many_arguments)]
fn schur_blocks(
    mut u: Vec<f64>, mut v: Vec<f64>, steps: usize, offset: usize, leaf: usize, need_theta: bool,
    rhos: &mut Vec<f64>, norms: &mut Vec<f64>,
) -> ToeplitzResult<Option<PolyMat>> {
    if steps <= leaf.max(1) {
        schur_leaf(&mut u[..steps], &mut v[..steps], offset, rhos, norms)?;
        if !need_theta {
            return Ok(None);
        }
        let first = rhos.len() - steps;
        return Ok(Some(theta_from_steps(&rhos[first..], &norms[first..])));
    }

    let m1 = steps / 2;
    let m2 = steps - m1;

    let u1 = u[..m1].to_vec();
    let v1 = v[..m1].to_vec();
    let th1 = schur_blocks(u1, v1, m1, offset, leaf, true, rhos, norms)?
        .expect("first half always returns its transmission matrix");

    // Advance the full windows through Θ₁ and drop the consumed m1 leading
    // coefficients; the second half only ever reads m2 of them.
    let u2 = advance(&th1.a, &th1.b, &u, &v, m1, m2);
    let v2 = advance(&th1.c, &th1.d, &u, &v, m1, m2);

    let th2 = schur_blocks(u2, v2, m2, offset + m1, leaf, need_theta, rhos, norms)?;
    match th2 {
        Some(th2) => Ok(Some(th2.mul(&th1))),
        None => Ok(None),
    }
}

/// One row of a transmission-matrix application:
/// coefficients `skip .. skip + take` of `p·u + q·v`.
fn advance(p: &[f64], q: &[f64], u: &[f64], v: &[f64], skip: usize, take: usize) -> Vec<f64> {
    let pu = fft::conv(p, u);
    let qv = fft::conv(q, v);
    let full = poly_add(pu, qv);
    full[skip..skip + take].to_vec()
}

/// Classical progressive Schur recursion on based windows.
///
/// Appends one `(ρ_k, c_k)` pair per step. The in-place update order matters:
/// at index `j` the new `u[j]` is formed before `v[j]` is overwritten, and
/// both reads of index `j + 1` happen before the next iteration writes it.
fn schur_leaf(
    u: &mut [f64], v: &mut [f64], offset: usize, rhos: &mut Vec<f64>, norms: &mut Vec<f64>,
) -> ToeplitzResult<()> {
    let steps = u.len();
    for s in 0..steps {
        let pivot = u[0];
        let rho = v[0] / pivot;
        if !rho.is_finite() || rho.abs() >= 1.0 {
            return Err(ToeplitzError::NotPositiveDefinite { step: offset + s + 1, pivot: rho });
        }
        let c = 1.0 / (pivot * (1.0 - rho * rho));
        rhos.push(rho);
        norms.push(c);
        let active = steps - s;
        for j in 0..active - 1 {
            let nu = c * (u[j] - rho * v[j]);
            let nv = c * (v[j + 1] - rho * u[j + 1]);
            u[j] = nu;
            v[j] = nv;
        }
        if active == 1 {
            // Last step of the block: nothing left to advance.
            break;
        }
    }
    Ok(())
}

/// Build the block transmission matrix Θ = Π c_k [[z, −ρ_k z], [−ρ_k, 1]]
/// by iterative accumulation (used at leaves, where degrees stay small).
fn theta_from_steps(rhos: &[f64], norms: &[f64]) -> PolyMat {
    let mut th = PolyMat::identity();
    for (&rho, &c) in rhos.iter().zip(norms.iter()) {
        let deg = th.a.len(); // all four entries share this padded length
        let mut a = vec![0.0; deg + 1];
        let mut b = vec![0.0; deg + 1];
        let mut cc = vec![0.0; deg + 1];
        let mut d = vec![0.0; deg + 1];
        for j in 0..deg {
            // Row 1: c·z·(A − ρC), c·z·(B − ρD).
            a[j + 1] = c * (th.a[j] - rho * th.c[j]);
            b[j + 1] = c * (th.b[j] - rho * th.d[j]);
            // Row 2: c·(−ρA + C), c·(−ρB + D).
            cc[j] = c * (th.c[j] - rho * th.a[j]);
            d[j] = c * (th.d[j] - rho * th.b[j]);
        }
        th = PolyMat { a, b, c: cc, d };
    }
    th
}

/// Assemble the monic order-(N−1) prediction polynomial from the reflection
/// coefficients via a divide-and-conquer product of the Durbin order-update
/// matrices [[1, −ρz], [−ρ, z]].
fn levinson_polynomial(rhos: &[f64], leaf: usize) -> Vec<f64> {
    let p = levinson_product(rhos, leaf);
    // [a; ã] = P · [1; 1], monic by construction.
    let mut a = poly_add(p.a, p.b);
    a.truncate(rhos.len() + 1);
    a
}

fn levinson_product(rhos: &[f64], leaf: usize) -> PolyMat {
    if rhos.len() <= leaf.max(1) {
        let mut p = PolyMat::identity();
        for &rho in rhos {
            let deg = p.a.len();
            let mut a = vec![0.0; deg + 1];
            let mut b = vec![0.0; deg + 1];
            let mut c = vec![0.0; deg + 1];
            let mut d = vec![0.0; deg + 1];
            for j in 0..deg {
                // Row 1: A − ρ·z·C, B − ρ·z·D.
                a[j] += p.a[j];
                a[j + 1] -= rho * p.c[j];
                b[j] += p.b[j];
                b[j + 1] -= rho * p.d[j];
                // Row 2: −ρA + z·C, −ρB + z·D.
                c[j] -= rho * p.a[j];
                c[j + 1] += p.c[j];
                d[j] -= rho * p.b[j];
                d[j + 1] += p.d[j];
            }
            p = PolyMat { a, b, c, d };
        }
        return p;
    }
    let mid = rhos.len() / 2;
    let lo = levinson_product(&rhos[..mid], leaf);
    let hi = levinson_product(&rhos[mid..], leaf);
    hi.mul(&lo)
}
