//! Stateful Toeplitz covariance handle.
//!
//! Purpose
//! -------
//! Bind an order N and an ACF to a reusable object exposing the four matrix
//! primitives — multiply, solve, log-determinant, trace-of-product — with the
//! GSchur factorization maintained lazily and every steady-state operation
//! running allocation-free out of a preallocated workspace.
//!
//! Key behaviors
//! -------------
//! - State machine: UNBOUND → (`set_acf`) → BOUND_DIRTY → (any operation
//!   needing the factorization) → FACTORED → (`set_acf`) → BOUND_DIRTY.
//!   `multiply` works from BOUND_DIRTY without factoring.
//! - A failed factorization surfaces `NotPositiveDefinite` and leaves the
//!   handle BOUND_DIRTY with no partial state; rebinding a valid ACF fully
//!   recovers.
//! - `clone_shallow` returns another handle to the **same** state — both
//!   observers see mutations. `clone_deep` allocates an independent copy
//!   (generators and workspace included) that can be driven from another
//!   thread.
//!
//! Invariants & assumptions
//! ------------------------
//! - In the FACTORED state the generator pair satisfies the
//!   Gohberg–Semencul identity `Σ⁻¹ = (1/δ₀)(L(δ)L(δ)ᵀ − L(δ̃)L(δ̃)ᵀ)` and
//!   the cached log-determinant equals `Σ_k log d_k` from the factorization.
//! - Handle methods mutate observable state behind `&self`; a handle is a
//!   resource with identity, and per-handle use is single-threaded by
//!   design (the internal mutex makes sharing safe, not concurrent-fast).
//!
//! Conventions
//! -----------
//! - Multi-column operands are `N×k` arrays, one observation per column.
//! - All errors are `ToeplitzResult`; panics are reserved for programmer
//!   errors (poisoned mutex, non-contiguous freshly-allocated buffers).

use crate::toeplitz::errors::{ToeplitzError, ToeplitzResult};
use crate::toeplitz::gschur::{gschur_factor, SchurFactors};
use crate::toeplitz::ops::{fill_embedding_spectrum, gs_solve_into, spec_multiply_in_place};
use crate::toeplitz::trace::{hess_profile, inverse_profile};
use crate::toeplitz::validation::{validate_acf, validate_len};
use crate::toeplitz::workspace::Workspace;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use std::sync::{Arc, Mutex, MutexGuard};

/// Factorization state of a handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactorState {
    /// No ACF bound yet.
    Unbound,
    /// ACF bound; generators stale or never computed.
    BoundDirty,
    /// Generators and log-determinant current for the bound ACF.
    Factored,
}

#[derive(Debug, Clone)]
struct Inner {
    n: usize,
    acf: Array1<f64>,
    state: FactorState,
    ws: Workspace,
    factors: Option<SchurFactors>,
    /// Diagonal-sum profile of Σ⁻¹, cached with the factorization so
    /// `trace_grad` is an O(N) dot product.
    inv_profile: Option<Array1<f64>>,
}

/// Handle to a symmetric positive-definite Toeplitz covariance of fixed
/// order.
///
/// Shallow duplicates alias state (pass-a-reference semantics); deep
/// duplicates are fully independent (pass-a-copy semantics). See
/// [`Toeplitz::clone_shallow`] and [`Toeplitz::clone_deep`].
#[derive(Debug)]
pub struct Toeplitz {
    inner: Arc<Mutex<Inner>>,
}

impl Toeplitz {
    /// Allocate a handle of order `n` in the UNBOUND state.
    ///
    /// The workspace (FFT plans included) is sized here, once; repeated
    /// evaluations at this order never allocate again.
    ///
    /// # Errors
    /// - [`ToeplitzError::InvalidLength`] if `n == 0`.
    pub fn new(n: usize) -> ToeplitzResult<Toeplitz> {
        if n == 0 {
            return Err(ToeplitzError::InvalidLength { expected: 1, actual: 0 });
        }
        Ok(Toeplitz {
            inner: Arc::new(Mutex::new(Inner {
                n,
                acf: Array1::zeros(n),
                state: FactorState::Unbound,
                ws: Workspace::new(n),
                factors: None,
                inv_profile: None,
            })),
        })
    }

    /// Construct a handle directly from an ACF (`new` + `set_acf`).
    pub fn from_acf(acf: &ArrayView1<f64>) -> ToeplitzResult<Toeplitz> {
        let handle = Toeplitz::new(acf.len())?;
        handle.set_acf(acf)?;
        Ok(handle)
    }

    /// The fixed order N.
    pub fn order(&self) -> usize {
        self.lock().n
    }

    /// Current factorization state.
    pub fn state(&self) -> FactorState {
        self.lock().state
    }

    /// Bind an ACF. Validates length, finiteness and γ₀ > 0; refreshes the
    /// circulant-embedding spectrum used by `multiply`; does **not** factor.
    /// Positive definiteness is only checked when a factorization is first
    /// needed, so indefinite-but-well-formed ACFs can still be multiplied.
    ///
    /// # Errors
    /// - [`ToeplitzError::InvalidLength`], [`ToeplitzError::NonFiniteAcf`],
    ///   [`ToeplitzError::InvalidLeadingAcf`].
    pub fn set_acf(&self, acf: &ArrayView1<f64>) -> ToeplitzResult<()> {
        let mut inner = self.lock();
        validate_acf(acf, inner.n)?;
        inner.acf.assign(acf);
        inner.factors = None;
        inner.inv_profile = None;
        inner.state = FactorState::BoundDirty;
        let Inner { ref acf, ref mut ws, .. } = *inner;
        fill_embedding_spectrum(
            &ws.plan,
            acf.as_slice().expect("owned ACF is contiguous"),
            &mut ws.emb_hat,
        );
        Ok(())
    }

    /// Copy of the bound ACF.
    ///
    /// # Errors
    /// - [`ToeplitzError::Unbound`] before the first `set_acf`.
    pub fn get_acf(&self) -> ToeplitzResult<Array1<f64>> {
        let inner = self.lock();
        inner.ensure_bound()?;
        Ok(inner.acf.clone())
    }

    /// `w = Σ z` for an `N×k` operand, by circulant embedding: one forward
    /// and one inverse FFT per column against the cached spectrum.
    ///
    /// Requires BOUND, not FACTORED.
    ///
    /// # Errors
    /// - [`ToeplitzError::Unbound`], [`ToeplitzError::InvalidLength`].
    pub fn multiply(&self, z: &ArrayView2<f64>) -> ToeplitzResult<Array2<f64>> {
        let mut inner = self.lock();
        inner.ensure_bound()?;
        validate_len(z.nrows(), inner.n)?;
        let mut out = Array2::zeros(z.dim());
        for (zc, mut oc) in z.columns().into_iter().zip(out.columns_mut()) {
            inner.multiply_col(&zc, &mut oc);
        }
        Ok(out)
    }

    /// Single-column convenience wrapper over [`Toeplitz::multiply`].
    pub fn multiply_vec(&self, z: &ArrayView1<f64>) -> ToeplitzResult<Array1<f64>> {
        let mut inner = self.lock();
        inner.ensure_bound()?;
        validate_len(z.len(), inner.n)?;
        let mut out = Array1::zeros(inner.n);
        inner.multiply_col(z, &mut out.view_mut());
        Ok(out)
    }

    /// `w = Σ⁻¹ z` for an `N×k` operand via the Gohberg–Semencul form —
    /// four FFT-based triangular-Toeplitz products per column. Factors
    /// first if the handle is dirty.
    ///
    /// # Errors
    /// - [`ToeplitzError::Unbound`], [`ToeplitzError::InvalidLength`],
    ///   [`ToeplitzError::NotPositiveDefinite`].
    pub fn solve(&self, z: &ArrayView2<f64>) -> ToeplitzResult<Array2<f64>> {
        let mut inner = self.lock();
        inner.ensure_factored()?;
        validate_len(z.nrows(), inner.n)?;
        let mut out = Array2::zeros(z.dim());
        for (zc, mut oc) in z.columns().into_iter().zip(out.columns_mut()) {
            inner.solve_col(&zc, &mut oc);
        }
        Ok(out)
    }

    /// Single-column convenience wrapper over [`Toeplitz::solve`].
    pub fn solve_vec(&self, z: &ArrayView1<f64>) -> ToeplitzResult<Array1<f64>> {
        let mut inner = self.lock();
        inner.ensure_factored()?;
        validate_len(z.len(), inner.n)?;
        let mut out = Array1::zeros(inner.n);
        inner.solve_col(z, &mut out.view_mut());
        Ok(out)
    }

    /// log|Σ|, cached by the factorization.
    ///
    /// # Errors
    /// - [`ToeplitzError::Unbound`], [`ToeplitzError::NotPositiveDefinite`].
    pub fn log_det(&self) -> ToeplitzResult<f64> {
        let mut inner = self.lock();
        inner.ensure_factored()?;
        Ok(inner.factors.as_ref().expect("factored state implies factors").log_det)
    }

    /// `tr(Σ⁻¹ T(dγ))` — the score's trace term. O(N) against the profile
    /// cached at factorization.
    ///
    /// # Errors
    /// - [`ToeplitzError::Unbound`], [`ToeplitzError::InvalidLength`],
    ///   [`ToeplitzError::NotPositiveDefinite`].
    pub fn trace_grad(&self, dacf: &ArrayView1<f64>) -> ToeplitzResult<f64> {
        let mut inner = self.lock();
        inner.ensure_factored()?;
        validate_len(dacf.len(), inner.n)?;
        let profile = inner.inv_profile.as_ref().expect("factored state implies profile");
        Ok(profile.dot(dacf))
    }

    /// `tr(Σ⁻¹ T(dγ_p) Σ⁻¹ T(dγ_q))` — the Hessian's trace term,
    /// O(N log N) per pair via displacement-generator composition.
    ///
    /// # Errors
    /// - [`ToeplitzError::Unbound`], [`ToeplitzError::InvalidLength`],
    ///   [`ToeplitzError::NotPositiveDefinite`].
    pub fn trace_hess(
        &self, dacf_p: &ArrayView1<f64>, dacf_q: &ArrayView1<f64>,
    ) -> ToeplitzResult<f64> {
        let mut guard = self.lock();
        let inner: &mut Inner = &mut guard;
        inner.ensure_factored()?;
        validate_len(dacf_p.len(), inner.n)?;
        validate_len(dacf_q.len(), inner.n)?;
        let factors = inner.factors.as_ref().expect("factored state implies factors");
        // Stage dγ_p through the dedicated slot; moved out so the profile
        // construction can borrow the rest of the workspace freely.
        let mut x = std::mem::take(&mut inner.ws.xbuf);
        for (slot, &v) in x.iter_mut().zip(dacf_p.iter()) {
            *slot = v;
        }
        hess_profile(factors, &mut inner.ws, &x);
        inner.ws.xbuf = x;
        Ok(inner.ws.profile.iter().zip(dacf_q.iter()).map(|(p, y)| p * y).sum())
    }

    /// Additional handle to the **same** state: mutations through either
    /// handle are visible to both.
    pub fn clone_shallow(&self) -> Toeplitz {
        Toeplitz { inner: Arc::clone(&self.inner) }
    }

    /// Fully independent copy — ACF, generators and workspace included.
    /// Deep clones may be driven in parallel (independent MCMC chains).
    pub fn clone_deep(&self) -> Toeplitz {
        let inner = self.lock().clone();
        Toeplitz { inner: Arc::new(Mutex::new(inner)) }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().expect("toeplitz handle mutex poisoned")
    }
}

impl Inner {
    fn ensure_bound(&self) -> ToeplitzResult<()> {
        if self.state == FactorState::Unbound {
            return Err(ToeplitzError::Unbound);
        }
        Ok(())
    }

    /// Factor lazily. On failure the handle stays BOUND_DIRTY and keeps no
    /// partial generators.
    fn ensure_factored(&mut self) -> ToeplitzResult<()> {
        match self.state {
            FactorState::Unbound => Err(ToeplitzError::Unbound),
            FactorState::Factored => Ok(()),
            FactorState::BoundDirty => {
                let factors = gschur_factor(&self.acf.view())?;
                let profile = inverse_profile(&factors, &mut self.ws);
                self.factors = Some(factors);
                self.inv_profile = Some(profile);
                self.state = FactorState::Factored;
                Ok(())
            }
        }
    }

    fn multiply_col(&mut self, z: &ArrayView1<f64>, out: &mut ndarray::ArrayViewMut1<f64>) {
        let Inner { ref mut ws, n, .. } = *self;
        for (slot, &v) in ws.real_a.iter_mut().zip(z.iter()) {
            *slot = v;
        }
        spec_multiply_in_place(&ws.plan, &ws.emb_hat, &mut ws.real_a, n, &mut ws.cplx_a);
        for (o, &v) in out.iter_mut().zip(ws.real_a[..n].iter()) {
            *o = v;
        }
    }

    fn solve_col(&mut self, z: &ArrayView1<f64>, out: &mut ndarray::ArrayViewMut1<f64>) {
        let factors = self.factors.as_ref().expect("solve_col requires factors");
        let delta = factors.delta.as_slice().expect("generators are contiguous");
        let delta_rev = factors.delta_rev.as_slice().expect("generators are contiguous");
        let Workspace {
            ref plan,
            ref mut cplx_a,
            ref mut real_a,
            ref mut real_b,
            ref mut real_c,
            ref mut real_d,
            ref mut profile,
            n,
            ..
        } = self.ws;
        for (slot, &v) in profile.iter_mut().zip(z.iter()) {
            *slot = v;
        }
        gs_solve_into(
            delta,
            delta_rev,
            plan,
            &profile[..n],
            &mut real_d[..n],
            real_a,
            real_b,
            real_c,
            cplx_a,
        );
        for (o, &v) in out.iter_mut().zip(real_d[..n].iter()) {
            *o = v;
        }
    }
}
