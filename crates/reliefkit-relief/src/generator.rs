//! Bas-relief generation pipeline.
//!
//! depth map -> tone mapping + inversion -> processed gradients -> divergence
//! (-> detail enhancement) -> multigrid solve -> tone mapping -> mesh.

use image::DynamicImage;
use reliefkit_core::{is_cancelled, CancelFlag, HeightField, ReliefError, ReliefResult};
use reliefkit_solver::{resample, MultigridSolver, SolveReport};
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

use crate::detail::DetailEnhancer;
use crate::gradient::{problem_areas, GradientField, GradientSettings};
use crate::mesh::{ReliefMesh, ReliefMeshBuilder};
use crate::params::ReliefParameters;
use crate::tonemap::{prepare_depth, tonemap};

/// Share of the progress range taken by the multigrid solve.
const SOLVE_START: f32 = 0.1;
const SOLVE_END: f32 = 0.9;

/// Everything a generation run produces.
#[derive(Debug, Clone)]
pub struct ReliefOutput {
    pub mesh: ReliefMesh,
    /// Solved height field, normalized to `[0, 1]`, before decimation
    pub height_field: HeightField,
    pub report: SolveReport,
}

/// Convert an image into a height field, bottom row first so image "up"
/// becomes +y.
pub fn image_to_field(img: &DynamicImage) -> HeightField {
    let luma = img.to_luma32f();
    let (w, h) = (luma.width() as usize, luma.height() as usize);
    HeightField::from_fn(w, h, |x, y| {
        luma.get_pixel(x as u32, (h - 1 - y) as u32).0[0] as f64
    })
}

fn open_image(path: &Path) -> ReliefResult<DynamicImage> {
    image::open(path)
        .map_err(|e| ReliefError::ImageError(format!("{}: {}", path.display(), e)))
}

/// Bas-relief generator for one depth map.
#[derive(Debug, Clone)]
pub struct ReliefGenerator {
    depth: HeightField,
    mask: Option<HeightField>,
    params: ReliefParameters,
}

impl ReliefGenerator {
    /// Create a generator from a raw depth buffer (larger = farther).
    pub fn new(depth: HeightField, params: ReliefParameters) -> Self {
        Self {
            depth,
            mask: None,
            params,
        }
    }

    /// Load the depth map from an image file.
    pub fn from_file<P: AsRef<Path>>(path: P, params: ReliefParameters) -> ReliefResult<Self> {
        let img = open_image(path.as_ref())?;
        Ok(Self::from_image(&img, params))
    }

    /// Use the luminance of `img` as depth map.
    pub fn from_image(img: &DynamicImage, params: ReliefParameters) -> Self {
        Self::new(image_to_field(img), params)
    }

    /// Scale the processed gradients by `mask` (same size as the depth map).
    pub fn with_gradient_mask(mut self, mask: HeightField) -> Self {
        self.mask = Some(mask);
        self
    }

    pub fn with_gradient_mask_image(self, img: &DynamicImage) -> Self {
        self.with_gradient_mask(image_to_field(img))
    }

    pub fn with_gradient_mask_file<P: AsRef<Path>>(self, path: P) -> ReliefResult<Self> {
        let img = open_image(path.as_ref())?;
        Ok(self.with_gradient_mask_image(&img))
    }

    /// Resample the depth map (and mask) to one sample per tool pass.
    pub fn fit_to_tool(mut self) -> Self {
        let (w, h) = self.params.sampling_resolution();
        info!(
            from = ?self.depth.shape(),
            to = ?(w, h),
            pass = self.params.pass_spacing(),
            "Resampling depth map to tool resolution"
        );
        self.depth = resample(&self.depth, w, h);
        self.mask = self.mask.map(|m| resample(&m, w, h));
        self
    }

    pub fn params(&self) -> &ReliefParameters {
        &self.params
    }

    pub fn depth(&self) -> &HeightField {
        &self.depth
    }

    /// Depth map and mask after the optional pre-scaling.
    fn scaled_inputs(&self) -> (HeightField, Option<HeightField>) {
        match self.params.scale_down_before {
            Some(factor) if factor < 1.0 => {
                let (w, h) = self.depth.shape();
                let nw = ((w as f64 * factor).round() as usize).max(1);
                let nh = ((h as f64 * factor).round() as usize).max(1);
                debug!(factor, to = ?(nw, nh), "Scaling depth map down");
                (
                    resample(&self.depth, nw, nh),
                    self.mask.as_ref().map(|m| resample(m, nw, nh)),
                )
            }
            _ => (self.depth.clone(), self.mask.clone()),
        }
    }

    /// Diagnostic map of regions dominated by silhouette handling.
    pub fn problem_areas(&self) -> ReliefResult<HeightField> {
        self.params.validate()?;
        let (depth, mask) = self.scaled_inputs();
        let (depth, _) = prepare_depth(depth, self.params.depth_exponent)?;
        problem_areas(&depth, &self.params, mask.as_ref())
    }

    pub fn generate(&self) -> ReliefResult<ReliefOutput> {
        self.generate_with_progress(|_| {}, None)
    }

    /// Run the pipeline, reporting progress in `[0, 1]` and stopping with
    /// [`ReliefError::Cancelled`] once `cancel` is raised.
    pub fn generate_with_progress<F>(
        &self,
        mut progress_callback: F,
        cancel: Option<&CancelFlag>,
    ) -> ReliefResult<ReliefOutput>
    where
        F: FnMut(f32),
    {
        let started = Instant::now();
        self.params.validate()?;
        progress_callback(0.0);

        let (depth, mask) = self.scaled_inputs();
        info!(size = ?depth.shape(), masked = mask.is_some(), "Generating relief");
        let (depth, planar) = prepare_depth(depth, self.params.depth_exponent)?;

        let settings = GradientSettings::from(&self.params);
        let gradients = GradientField::from_depth(&depth, &settings, mask.as_ref())?;
        let mut rhs = gradients.divergence();
        if self.params.detail_enhancement {
            rhs = DetailEnhancer::new(
                self.params.detail_enhancement_amount,
                self.params.detail_enhancement_freq,
            )
            .apply(&rhs);
        }
        if is_cancelled(cancel) {
            return Err(ReliefError::Cancelled);
        }
        progress_callback(SOLVE_START);

        let solver = MultigridSolver::new(self.params.multigrid_config());
        let span = SOLVE_END - SOLVE_START;
        let outcome = solver.solve_with_progress(
            rhs,
            planar,
            |p| progress_callback((SOLVE_START + p * span).min(SOLVE_END)),
            cancel,
        )?;

        let mut height_field = outcome.solution;
        tonemap(&mut height_field, 1.0);
        if is_cancelled(cancel) {
            return Err(ReliefError::Cancelled);
        }
        progress_callback(SOLVE_END);

        let mesh = ReliefMeshBuilder::from(&self.params).build(height_field.clone())?;
        progress_callback(1.0);

        info!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Relief generated"
        );
        Ok(ReliefOutput {
            mesh,
            height_field,
            report: outcome.report,
        })
    }
}
