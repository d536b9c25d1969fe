//! Relief mesh construction and export.
//!
//! One vertex per height-field sample and one quad per 2x2 neighbourhood,
//! both in row-major order. After construction the mesh is scaled to its
//! physical size and moved into place according to the per-axis
//! [`Justify`] settings.

use nalgebra::{Matrix4, Point3, Vector3};
use reliefkit_core::{HeightField, ParameterError, ReliefResult};
use reliefkit_solver::resample;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{info, warn};

use crate::params::{Justify, ReliefParameters};

/// Decimation ratios above this are treated as "keep everything".
pub const DECIMATE_SKIP_RATIO: f64 = 0.95;

/// Regular quad mesh of a height field.
#[derive(Debug, Clone, PartialEq)]
pub struct ReliefMesh {
    pub vertices: Vec<Point3<f64>>,
    /// Vertex indices of each quad, counter-clockwise seen from +z
    pub faces: Vec<[usize; 4]>,
    /// Samples per row of the source grid
    pub columns: usize,
    /// Rows of the source grid
    pub rows: usize,
}

impl ReliefMesh {
    /// Build the mesh of `field` with vertex `(x * scale_xy, y * scale_xy, z * scale_z)`.
    pub fn from_height_field(field: &HeightField, scale_xy: f64, scale_z: f64) -> Self {
        let (w, h) = field.shape();

        let mut vertices = Vec::with_capacity(w * h);
        for y in 0..h {
            for x in 0..w {
                vertices.push(Point3::new(
                    x as f64 * scale_xy,
                    y as f64 * scale_xy,
                    field.get(x, y) * scale_z,
                ));
            }
        }

        let mut faces = Vec::with_capacity(w.saturating_sub(1) * h.saturating_sub(1));
        for y in 0..h.saturating_sub(1) {
            for x in 0..w.saturating_sub(1) {
                let i = y * w + x;
                faces.push([i, i + 1, i + w + 1, i + w]);
            }
        }

        Self {
            vertices,
            faces,
            columns: w,
            rows: h,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    /// Axis-aligned bounding box as `(min, max)`.
    pub fn bounds(&self) -> (Point3<f64>, Point3<f64>) {
        let mut min = Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY);
        let mut max = Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for v in &self.vertices {
            min = min.inf(v);
            max = max.sup(v);
        }
        (min, max)
    }

    pub fn extent(&self) -> Vector3<f64> {
        let (min, max) = self.bounds();
        max - min
    }

    /// Apply a homogeneous transform to every vertex.
    pub fn transform(&mut self, m: &Matrix4<f64>) {
        for v in self.vertices.iter_mut() {
            *v = m.transform_point(v);
        }
    }

    /// Scale to `size` and anchor each axis per `justify`.
    ///
    /// An axis with zero extent is left unscaled.
    pub fn fit(&mut self, size: Vector3<f64>, justify: [Justify; 3]) {
        if self.vertices.is_empty() {
            return;
        }
        let (min, _) = self.bounds();
        let extent = self.extent();
        let scale = Vector3::from_fn(|i, _| {
            if extent[i] > 0.0 {
                size[i] / extent[i]
            } else {
                1.0
            }
        });
        let placed = Vector3::from_fn(|i, _| {
            let scaled = extent[i] * scale[i];
            justify[i].offset(scaled) - min[i] * scale[i]
        });

        let m = Matrix4::new_translation(&placed) * Matrix4::new_nonuniform_scaling(&scale);
        self.transform(&m);
    }

    /// Write the mesh as Wavefront OBJ with 1-based quad faces.
    pub fn write_obj<W: Write>(&self, out: &mut W) -> std::io::Result<()> {
        writeln!(out, "# ReliefKit bas-relief mesh")?;
        writeln!(
            out,
            "# Generated: {}",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
        )?;
        writeln!(
            out,
            "# Grid: {} x {}, {} vertices, {} faces",
            self.columns,
            self.rows,
            self.vertex_count(),
            self.face_count()
        )?;
        writeln!(out, "o BasRelief")?;
        for v in &self.vertices {
            writeln!(out, "v {:.6} {:.6} {:.6}", v.x, v.y, v.z)?;
        }
        for f in &self.faces {
            writeln!(out, "f {} {} {} {}", f[0] + 1, f[1] + 1, f[2] + 1, f[3] + 1)?;
        }
        Ok(())
    }

    /// Write the mesh as OBJ to `path`.
    pub fn save_obj(&self, path: &Path) -> ReliefResult<()> {
        let mut out = BufWriter::new(File::create(path)?);
        self.write_obj(&mut out)?;
        out.flush()?;
        info!(path = %path.display(), faces = self.face_count(), "Mesh written");
        Ok(())
    }
}

/// Reduce a height field so its mesh has about `ratio` of the faces.
///
/// Ratios above [`DECIMATE_SKIP_RATIO`] return the field unchanged.
pub fn decimate(field: HeightField, ratio: f64) -> ReliefResult<HeightField> {
    if ratio.is_nan() || ratio <= 0.0 {
        return Err(ParameterError::InvalidValue {
            name: "decimate_ratio".to_string(),
            reason: format!("must be > 0, got {}", ratio),
        }
        .into());
    }
    if ratio > DECIMATE_SKIP_RATIO {
        warn!(ratio, "Skipping decimation, ratio > {}", DECIMATE_SKIP_RATIO);
        return Ok(field);
    }

    let (w, h) = field.shape();
    let factor = ratio.sqrt();
    let nw = ((w as f64 * factor).round() as usize).clamp(2.min(w), w);
    let nh = ((h as f64 * factor).round() as usize).clamp(2.min(h), h);
    info!(ratio, from = ?(w, h), to = ?(nw, nh), "Decimating");
    Ok(resample(&field, nw, nh))
}

/// Turns a solved height field into a placed, physically sized mesh.
#[derive(Debug, Clone, PartialEq)]
pub struct ReliefMeshBuilder {
    pub width_mm: f64,
    pub height_mm: f64,
    pub thickness_mm: f64,
    pub justify: [Justify; 3],
    pub decimate_ratio: f64,
}

impl From<&ReliefParameters> for ReliefMeshBuilder {
    fn from(p: &ReliefParameters) -> Self {
        Self {
            width_mm: p.width_mm,
            height_mm: p.height_mm,
            thickness_mm: p.thickness_mm,
            justify: [p.justify_x, p.justify_y, p.justify_z],
            decimate_ratio: p.decimate_ratio,
        }
    }
}

impl Default for ReliefMeshBuilder {
    fn default() -> Self {
        Self::from(&ReliefParameters::default())
    }
}

impl ReliefMeshBuilder {
    pub fn build(&self, field: HeightField) -> ReliefResult<ReliefMesh> {
        let field = decimate(field, self.decimate_ratio)?;
        let mut mesh = ReliefMesh::from_height_field(&field, 1.0, 1.0);
        info!(
            vertices = mesh.vertex_count(),
            faces = mesh.face_count(),
            "Mesh built"
        );
        mesh.fit(
            Vector3::new(self.width_mm, self.height_mm, self.thickness_mm),
            self.justify,
        );
        Ok(mesh)
    }
}
