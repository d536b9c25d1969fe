//! Biconjugate gradient smoother for the discrete Laplacian.
//!
//! A fixed-budget BiCG iteration on `A * u = f`, with `A` the zero-flux
//! 5-point Laplacian of [`crate::laplacian`]. The shadow residual starts at
//! `A * r0` and the "preconditioner" is a uniform scaling by -4 (the interior
//! diagonal), which makes the iteration a minimum-residual method for this
//! symmetric operator: the residual norm never grows from one iteration to
//! the next.
//!
//! Inside a V-cycle only a handful of iterations are run per call. Stopping
//! before convergence is the normal case, not an error.

use reliefkit_core::HeightField;
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::laplacian::atimes;

const EPS: f64 = 1.0e-32;

/// Convergence test used to stop the iteration early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToleranceMode {
    /// `|r| / |f|`
    RhsNorm,
    /// `|M r| / |M f|` with the diagonal scaling `M`
    PreconditionedRhsNorm,
    /// Estimated relative change of the solution, L2 norms
    SolutionChange,
    /// Estimated relative change of the solution, max norms
    SolutionChangeMax,
}

impl Default for ToleranceMode {
    fn default() -> Self {
        Self::PreconditionedRhsNorm
    }
}

impl ToleranceMode {
    fn norm(self, v: &HeightField) -> f64 {
        match self {
            Self::SolutionChangeMax => v.norm_max(),
            _ => v.norm_l2(),
        }
    }
}

/// Outcome of one smoother call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothOutcome {
    /// Iterations actually performed.
    pub iterations: usize,
    /// Last error estimate under the configured [`ToleranceMode`].
    pub error: f64,
    /// Whether the estimate reached the tolerance.
    pub converged: bool,
}

/// `x = -4 * b`
#[inline]
fn asolve(b: &HeightField, x: &mut HeightField) {
    for (xi, &bi) in x.iter_mut().zip(b.iter()) {
        *xi = -4.0 * bi;
    }
}

/// `p = bk * p + z`
#[inline]
fn update_direction(p: &mut HeightField, bk: f64, z: &HeightField) {
    for (pi, &zi) in p.iter_mut().zip(z.iter()) {
        *pi = bk * *pi + zi;
    }
}

/// Fixed-iteration BiCG relaxation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BiCgSmoother {
    /// Maximum iterations per call.
    pub iterations: usize,
    /// Early-exit threshold for the error estimate.
    pub tolerance: f64,
    pub mode: ToleranceMode,
}

impl Default for BiCgSmoother {
    fn default() -> Self {
        Self {
            iterations: 5,
            tolerance: 1.0e-3,
            mode: ToleranceMode::default(),
        }
    }
}

impl BiCgSmoother {
    pub fn new(iterations: usize, tolerance: f64, mode: ToleranceMode) -> Self {
        Self {
            iterations,
            tolerance,
            mode,
        }
    }

    /// Improve `u` towards `A * u = f` in place.
    pub fn smooth(&self, u: &mut HeightField, f: &HeightField) -> SmoothOutcome {
        u.assert_same_shape(f, "smooth");
        let mode = self.mode;

        let mut r = HeightField::zeros_like(u);
        let mut rr = HeightField::zeros_like(u);
        let mut z = HeightField::zeros_like(u);
        let mut zz = HeightField::zeros_like(u);
        let mut p = HeightField::zeros_like(u);
        let mut pp = HeightField::zeros_like(u);

        atimes(u, &mut r);
        for (ri, &fi) in r.iter_mut().zip(f.iter()) {
            *ri = fi - *ri;
        }
        // minimum residual variant
        atimes(&r, &mut rr);

        let mut znrm = 1.0;
        let bnrm = match mode {
            ToleranceMode::RhsNorm => mode.norm(f),
            ToleranceMode::PreconditionedRhsNorm => {
                asolve(f, &mut z);
                mode.norm(&z)
            }
            ToleranceMode::SolutionChange | ToleranceMode::SolutionChangeMax => {
                asolve(f, &mut z);
                let bnrm = mode.norm(&z);
                asolve(&r, &mut z);
                znrm = mode.norm(&z);
                bnrm
            }
        };
        // zero right-hand side: fall back to an absolute error
        let bnrm = if bnrm > 0.0 { bnrm } else { 1.0 };
        asolve(&r, &mut z);

        let mut bkden = 0.0;
        let mut err = f64::INFINITY;
        let mut iter = 0;
        while iter < self.iterations {
            iter += 1;
            let zm1nrm = znrm;
            asolve(&rr, &mut zz);
            let bknum = z.dot(&rr);
            if iter == 1 {
                p.copy_from(&z);
                pp.copy_from(&zz);
            } else {
                if bkden == 0.0 {
                    trace!(iter, "BiCG stopped: vanishing direction denominator");
                    break;
                }
                let bk = bknum / bkden;
                update_direction(&mut p, bk, &z);
                update_direction(&mut pp, bk, &zz);
            }
            bkden = bknum;

            atimes(&p, &mut z);
            let akden = z.dot(&pp);
            if akden == 0.0 {
                trace!(iter, "BiCG stopped: vanishing step denominator");
                break;
            }
            let ak = bknum / akden;
            atimes(&pp, &mut zz);

            u.add_scaled(ak, &p);
            r.add_scaled(-ak, &z);
            rr.add_scaled(-ak, &zz);
            asolve(&r, &mut z);

            match mode {
                ToleranceMode::RhsNorm => {
                    znrm = 1.0;
                    err = mode.norm(&r) / bnrm;
                }
                ToleranceMode::PreconditionedRhsNorm => {
                    znrm = 1.0;
                    err = mode.norm(&z) / bnrm;
                }
                ToleranceMode::SolutionChange | ToleranceMode::SolutionChangeMax => {
                    znrm = mode.norm(&z);
                    if (zm1nrm - znrm).abs() > EPS * znrm {
                        let dxnrm = ak.abs() * mode.norm(&p);
                        err = znrm / (zm1nrm - znrm).abs() * dxnrm;
                    } else {
                        err = znrm / bnrm;
                        continue;
                    }
                    let xnrm = mode.norm(u);
                    if err <= 0.5 * xnrm {
                        err /= xnrm;
                    } else {
                        err = znrm / bnrm;
                        continue;
                    }
                }
            }

            if err <= self.tolerance {
                break;
            }
        }

        trace!(iter, err, "BiCG smoothing pass");
        SmoothOutcome {
            iterations: iter,
            error: err,
            converged: err <= self.tolerance,
        }
    }
}
