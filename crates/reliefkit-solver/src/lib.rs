//! # ReliefKit Solver
//!
//! Multigrid Poisson solver used to integrate a processed gradient field
//! back into a height field.
//!
//! ## Components
//!
//! - **Laplacian**: 5-point stencil with a zero-flux boundary, defect computation
//! - **Resample**: box-filter restriction and tent-filter prolongation between levels
//! - **BiCG**: fixed-budget biconjugate gradient smoother
//! - **Multigrid**: grid hierarchy and nested-iteration V-cycle driver

pub mod bicg;
pub mod laplacian;
pub mod multigrid;
pub mod resample;

pub use bicg::{BiCgSmoother, SmoothOutcome, ToleranceMode};
pub use laplacian::{atimes, calculate_defect, residual_norm};
pub use multigrid::{
    level_count, GridHierarchy, GridLevel, MultigridConfig, MultigridOutcome, MultigridSolver,
    SolveReport,
};
pub use resample::{prolongate, prolongate_into, resample, restrict, restrict_into, restrict_mask};
