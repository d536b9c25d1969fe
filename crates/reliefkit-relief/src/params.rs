//! Relief generation parameters.
//!
//! One flat record holds every option of the pipeline: silhouette handling,
//! multigrid settings, detail enhancement and the physical size of the
//! resulting mesh. Records are stored as JSON or TOML.

use reliefkit_core::{ParameterError, ParameterResult, ReliefError, ReliefResult};
use reliefkit_solver::{BiCgSmoother, MultigridConfig, ToleranceMode};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Side of the origin a mesh axis is placed on.
///
/// Stored as `-1` (negative side: right / top / below zero), `0` (centred)
/// or `1` (positive side: left / bottom / above zero).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum Justify {
    /// Origin at the maximum of the extent, the mesh spans `[-extent, 0]`
    Negative,
    /// Origin at the centre of the extent
    Center,
    /// Origin at the minimum of the extent, the mesh spans `[0, extent]`
    Positive,
}

impl Justify {
    /// Offset that moves an axis spanning `[0, extent]` into place.
    pub fn offset(self, extent: f64) -> f64 {
        match self {
            Self::Negative => -extent,
            Self::Center => -0.5 * extent,
            Self::Positive => 0.0,
        }
    }
}

impl TryFrom<i8> for Justify {
    type Error = String;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        match value {
            -1 => Ok(Self::Negative),
            0 => Ok(Self::Center),
            1 => Ok(Self::Positive),
            other => Err(format!("justify must be -1, 0 or 1, got {}", other)),
        }
    }
}

impl From<Justify> for i8 {
    fn from(value: Justify) -> Self {
        match value {
            Justify::Negative => -1,
            Justify::Center => 0,
            Justify::Positive => 1,
        }
    }
}

/// Complete set of relief options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReliefParameters {
    /// Gradient magnitude above which a pixel counts as a silhouette
    pub silhouette_threshold: f64,
    /// Keep a compressed slope at silhouettes instead of flattening them
    pub recover_silhouettes: bool,
    pub silhouette_scale: f64,
    /// Number of square roots applied to silhouette gradients
    pub silhouette_exponent: u32,
    /// Soft-attenuation factor `a` for slope gradients
    pub attenuation: f64,

    pub min_gridsize: usize,
    pub smooth_iterations: usize,
    pub vcycle_iterations: usize,
    pub linbcg_iterations: usize,
    pub linbcg_tolerance: f64,
    pub tolerance_mode: ToleranceMode,
    /// Pin background pixels to the lowest height during the solve
    pub use_planar: bool,

    /// Exponent applied to the normalized depth map
    pub depth_exponent: f64,

    pub detail_enhancement: bool,
    /// Normalized radius of the low-frequency band kept at gain 1 (0..=1)
    pub detail_enhancement_freq: f64,
    pub detail_enhancement_amount: f64,

    /// Downscale the depth map by this factor before processing
    pub scale_down_before: Option<f64>,

    /// Target fraction of faces kept; values above 0.95 disable decimation
    pub decimate_ratio: f64,

    pub width_mm: f64,
    pub height_mm: f64,
    pub thickness_mm: f64,
    pub justify_x: Justify,
    pub justify_y: Justify,
    pub justify_z: Justify,

    /// Ball-end bit diameter used to pick the sampling resolution (mm)
    pub bit_diameter: f64,
    pub passes_per_radius: u32,
}

impl Default for ReliefParameters {
    fn default() -> Self {
        Self {
            silhouette_threshold: 0.003,
            recover_silhouettes: true,
            silhouette_scale: 0.3,
            silhouette_exponent: 3,
            attenuation: 1.0,
            min_gridsize: 16,
            smooth_iterations: 1,
            vcycle_iterations: 2,
            linbcg_iterations: 5,
            linbcg_tolerance: 1.0e-3,
            tolerance_mode: ToleranceMode::PreconditionedRhsNorm,
            use_planar: false,
            depth_exponent: 1.0,
            detail_enhancement: false,
            detail_enhancement_freq: 0.0,
            detail_enhancement_amount: 0.5,
            scale_down_before: None,
            decimate_ratio: 0.1,
            width_mm: 200.0,
            height_mm: 150.0,
            thickness_mm: 15.0,
            justify_x: Justify::Negative,
            justify_y: Justify::Negative,
            justify_z: Justify::Negative,
            bit_diameter: 3.175,
            passes_per_radius: 2,
        }
    }
}

fn require_positive(name: &str, value: f64) -> ParameterResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ParameterError::InvalidValue {
            name: name.to_string(),
            reason: format!("must be > 0, got {}", value),
        })
    }
}

fn require_nonzero(name: &str, value: usize) -> ParameterResult<()> {
    if value == 0 {
        Err(ParameterError::InvalidValue {
            name: name.to_string(),
            reason: "must be at least 1".to_string(),
        })
    } else {
        Ok(())
    }
}

fn require_range(name: &str, value: f64, min: f64, max: f64) -> ParameterResult<()> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ParameterError::OutOfRange {
            name: name.to_string(),
            value,
            min,
            max,
        })
    }
}

impl ReliefParameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load parameters from a `.json` or `.toml` file and validate them.
    pub fn load_from_file(path: &Path) -> ReliefResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let params: Self = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::from_str(&content)?
        } else {
            return Err(ReliefError::InvalidParameters(
                "Config file must be .json or .toml".to_string(),
            ));
        };

        params.validate()?;
        Ok(params)
    }

    /// Save parameters to a `.json` or `.toml` file.
    pub fn save_to_file(&self, path: &Path) -> ReliefResult<()> {
        self.validate()?;

        let content = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::to_string_pretty(self)?
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            toml::to_string_pretty(self)?
        } else {
            return Err(ReliefError::InvalidParameters(
                "Config file must be .json or .toml".to_string(),
            ));
        };

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check every option for a usable value.
    pub fn validate(&self) -> ParameterResult<()> {
        require_positive("silhouette_threshold", self.silhouette_threshold)?;
        require_positive("silhouette_scale", self.silhouette_scale)?;
        require_positive("attenuation", self.attenuation)?;
        require_positive("depth_exponent", self.depth_exponent)?;
        require_positive("linbcg_tolerance", self.linbcg_tolerance)?;

        require_nonzero("smooth_iterations", self.smooth_iterations)?;
        require_nonzero("vcycle_iterations", self.vcycle_iterations)?;
        require_nonzero("linbcg_iterations", self.linbcg_iterations)?;
        if self.min_gridsize < 2 {
            return Err(ParameterError::InvalidDimensions(format!(
                "min_gridsize must be at least 2, got {}",
                self.min_gridsize
            )));
        }

        require_range("detail_enhancement_freq", self.detail_enhancement_freq, 0.0, 1.0)?;
        if self.detail_enhancement_amount < 0.0 {
            return Err(ParameterError::InvalidValue {
                name: "detail_enhancement_amount".to_string(),
                reason: format!("must be >= 0, got {}", self.detail_enhancement_amount),
            });
        }

        if let Some(factor) = self.scale_down_before {
            require_positive("scale_down_before", factor)?;
            require_range("scale_down_before", factor, 0.0, 1.0)?;
        }

        require_positive("decimate_ratio", self.decimate_ratio)?;

        require_positive("width_mm", self.width_mm)?;
        require_positive("height_mm", self.height_mm)?;
        require_positive("thickness_mm", self.thickness_mm)?;

        require_positive("bit_diameter", self.bit_diameter)?;
        require_nonzero("passes_per_radius", self.passes_per_radius as usize)?;

        Ok(())
    }

    /// Solver settings derived from these parameters.
    pub fn multigrid_config(&self) -> MultigridConfig {
        MultigridConfig {
            smooth_iterations: self.smooth_iterations,
            vcycle_iterations: self.vcycle_iterations,
            min_gridsize: self.min_gridsize,
            use_planar: self.use_planar,
            smoother: BiCgSmoother::new(
                self.linbcg_iterations,
                self.linbcg_tolerance,
                self.tolerance_mode,
            ),
        }
    }

    /// Distance between neighbouring tool passes (mm).
    pub fn pass_spacing(&self) -> f64 {
        self.bit_diameter / (2.0 * self.passes_per_radius as f64)
    }

    /// Depth map resolution giving one sample per tool pass over the
    /// physical footprint.
    pub fn sampling_resolution(&self) -> (usize, usize) {
        let pass = self.pass_spacing();
        let x = (self.width_mm / pass).round().max(1.0) as usize;
        let y = (self.height_mm / pass).round().max(1.0) as usize;
        (x, y)
    }
}
