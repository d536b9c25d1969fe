//! ReliefKit command-line driver.
//!
//! Reads a depth image, generates the relief and writes it as Wavefront OBJ.

use anyhow::{Context, Result};
use clap::Parser;
use image::{GrayImage, Luma};
use reliefkit::{
    init_logging, HeightField, ReliefGenerator, ReliefParameters, BUILD_DATE, VERSION,
};
use std::path::PathBuf;
use tracing::{debug, info};

#[derive(Parser, Debug)]
#[command(name = "reliefkit")]
#[command(about = "Generate a bas-relief mesh from a depth image", long_about = None)]
struct Cli {
    /// Depth image (brighter = farther)
    input: PathBuf,

    /// Output OBJ file path
    #[arg(short, long)]
    output: PathBuf,

    /// Relief parameters (.json or .toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Gradient scaling mask image, same size as the depth image
    #[arg(short, long)]
    mask: Option<PathBuf>,

    /// Resample the depth image to one sample per ball-end tool pass
    #[arg(long)]
    fit_tool: bool,

    /// Also write the problem-area map as a grayscale image
    #[arg(long)]
    problem_map: Option<PathBuf>,

    /// Write the effective parameters to this file (.json or .toml)
    #[arg(long)]
    save_config: Option<PathBuf>,
}

fn field_to_image(field: &HeightField) -> GrayImage {
    let (lo, hi) = (field.min(), field.max());
    let span = if hi > lo { hi - lo } else { 1.0 };
    let (w, h) = field.shape();
    GrayImage::from_fn(w as u32, h as u32, |x, y| {
        let v = field.get(x as usize, h - 1 - y as usize);
        Luma([(((v - lo) / span) * 255.0).round() as u8])
    })
}

fn main() -> Result<()> {
    init_logging()?;
    let cli = Cli::parse();
    info!(version = VERSION, built = BUILD_DATE, "ReliefKit");

    let params = match &cli.config {
        Some(path) => ReliefParameters::load_from_file(path)
            .with_context(|| format!("Failed to load parameters from {}", path.display()))?,
        None => ReliefParameters::default(),
    };
    if let Some(path) = &cli.save_config {
        params
            .save_to_file(path)
            .with_context(|| format!("Failed to write parameters to {}", path.display()))?;
    }

    let mut generator = ReliefGenerator::from_file(&cli.input, params)
        .with_context(|| format!("Failed to load depth image {}", cli.input.display()))?;
    if let Some(mask) = &cli.mask {
        generator = generator
            .with_gradient_mask_file(mask)
            .with_context(|| format!("Failed to load mask image {}", mask.display()))?;
    }
    if cli.fit_tool {
        generator = generator.fit_to_tool();
    }

    if let Some(path) = &cli.problem_map {
        let map = generator.problem_areas()?;
        field_to_image(&map)
            .save(path)
            .with_context(|| format!("Failed to write problem map {}", path.display()))?;
        info!(path = %path.display(), "Problem map written");
    }

    let output = generator.generate_with_progress(
        |p| debug!(progress = p, "Generating"),
        None,
    )?;
    output
        .mesh
        .save_obj(&cli.output)
        .with_context(|| format!("Failed to write mesh {}", cli.output.display()))?;

    let report = &output.report;
    println!(
        "{}: {} vertices, {} faces, {} levels, {} V-cycles, residual {:.3e}",
        cli.output.display(),
        output.mesh.vertex_count(),
        output.mesh.face_count(),
        report.levels,
        report.vcycles_run,
        report.final_residual
    );
    Ok(())
}
