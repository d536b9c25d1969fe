//! # ReliefKit
//!
//! Bas-relief generation from depth maps for CNC carving.
//!
//! A depth map (rendered depth buffer or grayscale image) is turned into a
//! shallow relief whose surface gradients follow the source while keeping
//! silhouettes climbable and slopes bounded. The result is a regular quad
//! mesh sized in millimetres, ready for toolpath generation.
//!
//! ## Architecture
//!
//! ReliefKit is organized as a workspace with multiple crates:
//!
//! 1. **reliefkit-core** - Grid buffers, error types, cancellation
//! 2. **reliefkit-solver** - Restriction/prolongation, Laplacian, BiCG smoother, multigrid
//! 3. **reliefkit-relief** - Parameters, tone mapping, gradient processing, mesh building
//! 4. **reliefkit** - Logging setup, re-exports and the command-line driver
//!
//! ## Example
//!
//! ```no_run
//! use reliefkit::{ReliefGenerator, ReliefParameters};
//!
//! # fn main() -> anyhow::Result<()> {
//! let output = ReliefGenerator::from_file("depth.png", ReliefParameters::default())?.generate()?;
//! output.mesh.save_obj(std::path::Path::new("relief.obj"))?;
//! # Ok(())
//! # }
//! ```

pub use reliefkit_core::{
    cancel_flag, is_cancelled, CancelFlag, Grid2D, HeightField, ParameterError, PlanarMask,
    ReliefError, ReliefResult,
};

pub use reliefkit_solver::{
    BiCgSmoother, GridHierarchy, MultigridConfig, MultigridSolver, SolveReport, ToleranceMode,
};

pub use reliefkit_relief::{
    DetailEnhancer, GradientField, GradientSettings, Justify, ReliefGenerator, ReliefMesh,
    ReliefMeshBuilder, ReliefOutput, ReliefParameters,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Initialize logging with the default configuration
///
/// Sets up structured logging with:
/// - Console output (stderr) with pretty formatting
/// - RUST_LOG environment variable support, INFO by default
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(tracing::Level::INFO.to_string()));

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .with_line_number(true)
        .pretty();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}
