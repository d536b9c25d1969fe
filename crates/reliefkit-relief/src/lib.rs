//! # ReliefKit Relief
//!
//! Turns a depth map into a bas-relief mesh.
//!
//! ## Stages
//!
//! - **Tone mapping**: normalize the depth map to `[0, 1]`, invert it and mark background pixels
//! - **Gradient processing**: silhouette detection and recovery, slope attenuation, divergence
//! - **Detail enhancement**: optional frequency-domain boost of fine detail
//! - **Solve**: multigrid integration of the divergence (see `reliefkit-solver`)
//! - **Mesh**: regular quad mesh scaled to its physical size, optional decimation, OBJ export
//!
//! [`ReliefGenerator`] runs the whole pipeline; [`ReliefParameters`] holds every option.

pub mod detail;
pub mod generator;
pub mod gradient;
pub mod mesh;
pub mod params;
pub mod tonemap;

pub use detail::DetailEnhancer;
pub use generator::{image_to_field, ReliefGenerator, ReliefOutput};
pub use gradient::{
    divergence, forward_gradients, problem_areas, GradientField, GradientSettings,
    SilhouetteClass,
};
pub use mesh::{decimate, ReliefMesh, ReliefMeshBuilder, DECIMATE_SKIP_RATIO};
pub use params::{Justify, ReliefParameters};
pub use tonemap::{check_depth_range, prepare_depth, tonemap};
