//! Gradient processing.
//!
//! Turns the normalized, inverted depth map into the right-hand side of the
//! Poisson problem:
//!
//! 1. forward-difference gradients `gx` (along x) and `gy` (along y), zero in
//!    the last column / row
//! 2. per-axis classification of every pixel as a positive silhouette, a
//!    negative silhouette or a slope by comparing the raw gradient against
//!    `silhouette_threshold`
//! 3. silhouettes are recovered to `sign(g) * thres * scale * sqrt^k(|g|)`
//!    (or flattened to 0), slopes are attenuated to `sign(g)/a * ln(1 + a|g|)`
//! 4. optional multiplication by a gradient scaling mask
//! 5. backward-difference divergence of the processed field

use reliefkit_core::{HeightField, ReliefError, ReliefResult};
use reliefkit_solver::atimes;
use tracing::debug;

use crate::params::ReliefParameters;

/// How one gradient sample is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SilhouetteClass {
    /// Rising step larger than the threshold
    Positive,
    /// Falling step larger than the threshold
    Negative,
    /// Everything else
    Slope,
}

impl SilhouetteClass {
    pub fn classify(gradient: f64, threshold: f64) -> Self {
        if gradient > threshold {
            Self::Positive
        } else if gradient < -threshold {
            Self::Negative
        } else {
            Self::Slope
        }
    }

    pub fn is_silhouette(self) -> bool {
        self != Self::Slope
    }
}

/// Options of the gradient stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientSettings {
    pub silhouette_threshold: f64,
    pub recover_silhouettes: bool,
    pub silhouette_scale: f64,
    pub silhouette_exponent: u32,
    pub attenuation: f64,
}

impl From<&ReliefParameters> for GradientSettings {
    fn from(p: &ReliefParameters) -> Self {
        Self {
            silhouette_threshold: p.silhouette_threshold,
            recover_silhouettes: p.recover_silhouettes,
            silhouette_scale: p.silhouette_scale,
            silhouette_exponent: p.silhouette_exponent,
            attenuation: p.attenuation,
        }
    }
}

impl Default for GradientSettings {
    fn default() -> Self {
        Self::from(&ReliefParameters::default())
    }
}

impl GradientSettings {
    /// Processed value of one raw gradient sample.
    pub fn process(&self, g: f64) -> f64 {
        match SilhouetteClass::classify(g, self.silhouette_threshold) {
            SilhouetteClass::Slope => {
                let a = self.attenuation;
                g.signum() / a * (a * g.abs()).ln_1p()
            }
            _ if !self.recover_silhouettes => 0.0,
            _ => {
                let mut root = g.abs();
                for _ in 0..self.silhouette_exponent {
                    root = root.sqrt();
                }
                g.signum() * self.silhouette_threshold * self.silhouette_scale * root
            }
        }
    }
}

/// Forward differences of `depth` along x and y.
pub fn forward_gradients(depth: &HeightField) -> (HeightField, HeightField) {
    let (w, h) = depth.shape();
    let gx = HeightField::from_fn(w, h, |x, y| {
        if x + 1 < w {
            depth.get(x + 1, y) - depth.get(x, y)
        } else {
            0.0
        }
    });
    let gy = HeightField::from_fn(w, h, |x, y| {
        if y + 1 < h {
            depth.get(x, y + 1) - depth.get(x, y)
        } else {
            0.0
        }
    });
    (gx, gy)
}

/// Discrete divergence matching the forward-difference gradient.
pub fn divergence(gx: &HeightField, gy: &HeightField) -> HeightField {
    gx.assert_same_shape(gy, "divergence");
    let (w, h) = gx.shape();
    HeightField::from_fn(w, h, |x, y| {
        let mut d = gx.get(x, y) + gy.get(x, y);
        if x > 0 {
            d -= gx.get(x - 1, y);
        }
        if y > 0 {
            d -= gy.get(x, y - 1);
        }
        d
    })
}

/// Processed gradient field of one depth map.
#[derive(Debug, Clone)]
pub struct GradientField {
    pub gx: HeightField,
    pub gy: HeightField,
    /// Silhouette pixels found along x
    pub silhouettes_x: usize,
    /// Silhouette pixels found along y
    pub silhouettes_y: usize,
}

impl GradientField {
    /// Compute and process the gradients of `depth`, optionally scaled by a
    /// same-sized `mask`.
    pub fn from_depth(
        depth: &HeightField,
        settings: &GradientSettings,
        mask: Option<&HeightField>,
    ) -> ReliefResult<Self> {
        if let Some(mask) = mask {
            if !mask.same_shape(depth) {
                return Err(ReliefError::ShapeMismatch {
                    what: "gradient scaling mask".to_string(),
                    expected: depth.shape(),
                    actual: mask.shape(),
                });
            }
        }

        let (mut gx, mut gy) = forward_gradients(depth);
        let thres = settings.silhouette_threshold;
        let count = |g: &HeightField| {
            g.iter()
                .filter(|&&v| SilhouetteClass::classify(v, thres).is_silhouette())
                .count()
        };
        let silhouettes_x = count(&gx);
        let silhouettes_y = count(&gy);

        for g in gx.iter_mut().chain(gy.iter_mut()) {
            *g = settings.process(*g);
        }

        if let Some(mask) = mask {
            gx *= mask;
            gy *= mask;
        }

        debug!(silhouettes_x, silhouettes_y, "Gradients processed");
        Ok(Self {
            gx,
            gy,
            silhouettes_x,
            silhouettes_y,
        })
    }

    pub fn divergence(&self) -> HeightField {
        divergence(&self.gx, &self.gy)
    }
}

/// Diagnostic map of where silhouette handling concentrates.
///
/// The pointwise sum `gx + gy` of the processed gradients (not the
/// backward-difference divergence fed to the solver) is thresholded at a
/// quarter of the silhouette threshold (1 below, 0 above) and passed twice
/// through the Laplacian, so nonzero values outline regions of strong slope.
pub fn problem_areas(
    depth: &HeightField,
    params: &ReliefParameters,
    mask: Option<&HeightField>,
) -> ReliefResult<HeightField> {
    let field = GradientField::from_depth(depth, &GradientSettings::from(params), mask)?;
    let limit = params.silhouette_threshold / 4.0;
    let calm = field
        .gx
        .zip_map(&field.gy, |&a, &b| if (a + b).abs() > limit { 0.0 } else { 1.0 });

    let mut once = HeightField::zeros_like(&calm);
    atimes(&calm, &mut once);
    let mut twice = HeightField::zeros_like(&calm);
    atimes(&once, &mut twice);
    Ok(twice)
}
