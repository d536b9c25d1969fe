//! Nested-iteration multigrid solver for the relief Poisson problem.
//!
//! Solves `A * u = f` on the finest grid, where `A` is the zero-flux
//! Laplacian and `f` the divergence of the processed gradient field.
//!
//! The solve runs as an explicit loop over a [`GridHierarchy`] (level 0 is the
//! source resolution, level `L` the coarsest):
//!
//! 1. restrict the right-hand side and planar mask down to level `L`
//! 2. start from a zero solution at level `L`
//! 3. for each level `k` from `L - 1` to 0: prolongate the coarser solution as
//!    the initial guess, then run V-cycles whose target at level `k` is the
//!    level's right-hand side and, below it, the restricted defect
//!
//! The coarsest-level "exact solve" is a reset to zero. Background pixels are
//! pinned to the current minimum at level 0 when the planar constraint is on.

use reliefkit_core::{
    is_cancelled, CancelFlag, HeightField, ParameterError, PlanarMask, ReliefError, ReliefResult,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::bicg::BiCgSmoother;
use crate::laplacian::{calculate_defect, residual_norm};
use crate::resample::{prolongate_into, restrict, restrict_into, restrict_mask};

/// Multigrid iteration settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultigridConfig {
    /// Smoother calls per level before and after the coarse correction.
    pub smooth_iterations: usize,
    /// V-cycles per level of the nested iteration.
    pub vcycle_iterations: usize,
    /// Smallest allowed dimension of the coarsest grid.
    pub min_gridsize: usize,
    /// Pin background pixels to the solution minimum at level 0.
    pub use_planar: bool,
    pub smoother: BiCgSmoother,
}

impl Default for MultigridConfig {
    fn default() -> Self {
        Self {
            smooth_iterations: 1,
            vcycle_iterations: 2,
            min_gridsize: 16,
            use_planar: false,
            smoother: BiCgSmoother::default(),
        }
    }
}

/// Number of coarse levels below a `width x height` grid.
///
/// Counts the halvings `k >= 1` for which `floor(min(width, height) / 2^k)`
/// stays at or above `min_gridsize`.
pub fn level_count(width: usize, height: usize, min_gridsize: usize) -> usize {
    let mut size = width.min(height);
    let mut levels = 0;
    loop {
        size /= 2;
        if size == 0 || size < min_gridsize {
            break;
        }
        levels += 1;
    }
    levels
}

/// Buffers of one multigrid resolution.
#[derive(Debug, Clone)]
pub struct GridLevel {
    pub rhs: HeightField,
    pub solution: HeightField,
    pub vcycle_target: HeightField,
    pub planar: PlanarMask,
}

impl GridLevel {
    fn new(rhs: HeightField, planar: PlanarMask) -> Self {
        let solution = HeightField::zeros_like(&rhs);
        let vcycle_target = HeightField::zeros_like(&rhs);
        Self {
            rhs,
            solution,
            vcycle_target,
            planar,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.rhs.shape()
    }

    fn pin_planar(&mut self) {
        let floor = self.solution.min();
        self.solution.fill_masked(&self.planar, floor);
    }
}

/// `levels + 1` grid levels, finest first.
#[derive(Debug, Clone)]
pub struct GridHierarchy {
    levels: Vec<GridLevel>,
}

impl GridHierarchy {
    /// Restrict `rhs` and `planar` down to the coarsest level allowed by
    /// `min_gridsize`.
    pub fn build(rhs: HeightField, planar: PlanarMask, min_gridsize: usize) -> ReliefResult<Self> {
        if !rhs.same_shape(&planar) {
            return Err(ReliefError::ShapeMismatch {
                what: "planar mask".to_string(),
                expected: rhs.shape(),
                actual: planar.shape(),
            });
        }

        let (width, height) = rhs.shape();
        let depth = level_count(width, height, min_gridsize);
        if depth == 0 {
            return Err(ParameterError::InvalidDimensions(format!(
                "min_gridsize {} leaves no coarse level below {}x{}",
                min_gridsize, width, height
            ))
            .into());
        }

        let mut levels = Vec::with_capacity(depth + 1);
        levels.push(GridLevel::new(rhs, planar));
        for k in 0..depth {
            let (w, h) = levels[k].shape();
            let (cw, ch) = (w / 2, h / 2);
            let rhs = restrict(&levels[k].rhs, cw, ch);
            let planar = restrict_mask(&levels[k].planar, cw, ch);
            levels.push(GridLevel::new(rhs, planar));
        }

        Ok(Self { levels })
    }

    /// Index of the coarsest level.
    pub fn coarsest(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn level(&self, k: usize) -> &GridLevel {
        &self.levels[k]
    }

    pub fn shapes(&self) -> Vec<(usize, usize)> {
        self.levels.iter().map(GridLevel::shape).collect()
    }

    /// Level `k` and level `k + 1`, both mutable.
    fn pair_mut(&mut self, k: usize) -> (&mut GridLevel, &mut GridLevel) {
        let (fine, coarse) = self.levels.split_at_mut(k + 1);
        (&mut fine[k], &mut coarse[0])
    }

    fn into_finest_solution(mut self) -> HeightField {
        self.levels.swap_remove(0).solution
    }
}

/// Summary of a completed solve.
#[derive(Debug, Clone, PartialEq)]
pub struct SolveReport {
    /// Coarse levels below the source grid.
    pub levels: usize,
    /// `(width, height)` of every level, finest first.
    pub level_shapes: Vec<(usize, usize)>,
    /// V-cycles run across all nested-iteration levels.
    pub vcycles_run: usize,
    /// `|f - A u|` on the finest grid after the solve.
    pub final_residual: f64,
}

/// Solved height field plus its report.
#[derive(Debug, Clone)]
pub struct MultigridOutcome {
    pub solution: HeightField,
    pub report: SolveReport,
}

/// Nested-iteration V-cycle solver.
#[derive(Debug, Clone, Default)]
pub struct MultigridSolver {
    config: MultigridConfig,
}

impl MultigridSolver {
    pub fn new(config: MultigridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MultigridConfig {
        &self.config
    }

    /// Solve `A * u = rhs` starting from zero.
    pub fn solve(&self, rhs: HeightField, planar: PlanarMask) -> ReliefResult<MultigridOutcome> {
        self.solve_with_progress(rhs, planar, |_| {}, None)
    }

    /// Solve with a progress callback (fraction of V-cycles done) and an
    /// optional cancellation flag checked before every V-cycle.
    pub fn solve_with_progress<F>(
        &self,
        rhs: HeightField,
        planar: PlanarMask,
        mut progress_callback: F,
        cancel: Option<&CancelFlag>,
    ) -> ReliefResult<MultigridOutcome>
    where
        F: FnMut(f32),
    {
        let cfg = &self.config;
        let mut hierarchy = GridHierarchy::build(rhs, planar, cfg.min_gridsize)?;
        let coarsest = hierarchy.coarsest();
        let level_shapes = hierarchy.shapes();
        info!(
            levels = coarsest,
            finest = ?level_shapes[0],
            coarsest = ?level_shapes[coarsest],
            "Multigrid hierarchy built"
        );

        hierarchy.levels[coarsest].solution.fill(0.0);

        let total_cycles = (coarsest * cfg.vcycle_iterations).max(1);
        let mut cycles_done = 0;
        progress_callback(0.0);

        for k in (0..coarsest).rev() {
            {
                let (fine, coarse) = hierarchy.pair_mut(k);
                prolongate_into(&coarse.solution, &mut fine.solution);
                fine.vcycle_target.copy_from(&fine.rhs);
            }

            for cycle in 0..cfg.vcycle_iterations {
                if is_cancelled(cancel) {
                    return Err(ReliefError::Cancelled);
                }
                debug!(level = k, cycle, "V-cycle");
                self.vcycle(&mut hierarchy, k);
                cycles_done += 1;
                progress_callback(cycles_done as f32 / total_cycles as f32);
            }
        }

        let finest = hierarchy.level(0);
        let final_residual = residual_norm(&finest.solution, &finest.rhs);
        info!(vcycles = cycles_done, final_residual, "Multigrid solve finished");

        Ok(MultigridOutcome {
            solution: hierarchy.into_finest_solution(),
            report: SolveReport {
                levels: coarsest,
                level_shapes,
                vcycles_run: cycles_done,
                final_residual,
            },
        })
    }

    /// One V-cycle rooted at level `k`.
    fn vcycle(&self, hierarchy: &mut GridHierarchy, k: usize) {
        let cfg = &self.config;
        let coarsest = hierarchy.coarsest();

        // downward stroke: pre-smooth, then hand the defect to the next level
        for k2 in k..coarsest {
            let (level, next) = hierarchy.pair_mut(k2);
            if k2 != k {
                level.solution.fill(0.0);
            }
            self.smooth_level(level);
            if cfg.use_planar && k2 == 0 {
                level.pin_planar();
            }
            let mut defect = HeightField::zeros_like(&level.solution);
            calculate_defect(&mut defect, &level.solution, &level.vcycle_target);
            restrict_into(&defect, &mut next.vcycle_target);
        }

        // coarsest grid: reset stands in for the exact solve
        hierarchy.levels[coarsest].solution.fill(0.0);

        // upward stroke: add the interpolated correction, then post-smooth
        for k2 in (k..coarsest).rev() {
            let (level, next) = hierarchy.pair_mut(k2);
            let mut correction = HeightField::zeros_like(&level.solution);
            prolongate_into(&next.solution, &mut correction);
            level.solution += &correction;
            self.smooth_level(level);
            if cfg.use_planar && k2 == 0 {
                level.pin_planar();
            }
        }
    }

    fn smooth_level(&self, level: &mut GridLevel) {
        for _ in 0..self.config.smooth_iterations {
            self.config
                .smoother
                .smooth(&mut level.solution, &level.vcycle_target);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_count() {
        assert_eq!(level_count(32, 32, 4), 3); // 16, 8, 4
        assert_eq!(level_count(100, 40, 16), 1); // 20
        assert_eq!(level_count(31, 64, 16), 0);
        assert_eq!(level_count(64, 64, 64), 0);
        assert_eq!(level_count(10, 10, 0), 3); // 5, 2, 1
    }

    #[test]
    fn test_hierarchy_halves_each_level() {
        let rhs = HeightField::zeros(45, 37);
        let planar = PlanarMask::filled(45, 37, false);
        let hierarchy = GridHierarchy::build(rhs, planar, 4).unwrap();
        assert_eq!(hierarchy.coarsest(), 3);
        assert_eq!(hierarchy.shapes(), vec![(45, 37), (22, 18), (11, 9), (5, 4)]);
    }

    #[test]
    fn test_hierarchy_rejects_oversized_min_gridsize() {
        let rhs = HeightField::zeros(20, 20);
        let planar = PlanarMask::filled(20, 20, false);
        let err = GridHierarchy::build(rhs, planar, 64).unwrap_err();
        assert!(matches!(err, ReliefError::Parameter(_)));
    }

    #[test]
    fn test_hierarchy_rejects_mask_mismatch() {
        let rhs = HeightField::zeros(20, 20);
        let planar = PlanarMask::filled(20, 10, false);
        let err = GridHierarchy::build(rhs, planar, 4).unwrap_err();
        assert!(matches!(err, ReliefError::ShapeMismatch { .. }));
    }

    #[test]
    fn test_planar_mask_restricted_per_level() {
        let rhs = HeightField::zeros(16, 16);
        let planar = PlanarMask::from_fn(16, 16, |x, y| x == 0 && y == 0);
        let hierarchy = GridHierarchy::build(rhs, planar, 2).unwrap();
        for k in 0..=hierarchy.coarsest() {
            let mask = &hierarchy.level(k).planar;
            assert!(mask.get(0, 0));
            assert_eq!(mask.count(), 1);
        }
    }

    #[test]
    fn test_cancelled_before_first_cycle() {
        let flag = reliefkit_core::cancel_flag();
        flag.store(true, std::sync::atomic::Ordering::Relaxed);
        let solver = MultigridSolver::new(MultigridConfig {
            min_gridsize: 4,
            ..Default::default()
        });
        let rhs = HeightField::zeros(16, 16);
        let planar = PlanarMask::filled(16, 16, false);
        let result = solver.solve_with_progress(rhs, planar, |_| {}, Some(&flag));
        assert!(matches!(result, Err(ReliefError::Cancelled)));
    }
}
