use image::{DynamicImage, GrayImage, Luma};
use reliefkit_core::{cancel_flag, HeightField, ReliefError};
use reliefkit_relief::{GradientSettings, Justify, ReliefGenerator, ReliefParameters};
use reliefkit_solver::ToleranceMode;
use std::sync::atomic::Ordering;
use tempfile::TempDir;

/// Far background at depth 1 with a near dome in the middle.
fn dome(w: usize, h: usize) -> HeightField {
    let (cx, cy) = (w as f64 / 2.0, h as f64 / 2.0);
    let r = w.min(h) as f64 / 3.0;
    HeightField::from_fn(w, h, |x, y| {
        let d2 = ((x as f64 - cx).powi(2) + (y as f64 - cy).powi(2)) / (r * r);
        if d2 < 1.0 {
            1.0 - 0.5 * (1.0 - d2).sqrt()
        } else {
            1.0
        }
    })
}

fn small_params() -> ReliefParameters {
    ReliefParameters {
        min_gridsize: 4,
        decimate_ratio: 1.0,
        ..Default::default()
    }
}

#[test]
fn test_generate_mesh_counts_and_placement() {
    let generator = ReliefGenerator::new(dome(48, 40), small_params());
    let output = generator.generate().unwrap();

    assert_eq!(output.mesh.vertex_count(), 48 * 40);
    assert_eq!(output.mesh.face_count(), 47 * 39);
    assert_eq!(output.report.levels, 3);
    assert_eq!(output.report.vcycles_run, 6);

    let (min, max) = output.mesh.bounds();
    assert!((min.x + 200.0).abs() < 1e-6 && max.x.abs() < 1e-6);
    assert!((min.y + 150.0).abs() < 1e-6 && max.y.abs() < 1e-6);
    assert!((min.z + 15.0).abs() < 1e-6 && max.z.abs() < 1e-6);

    assert!(output.height_field.iter().all(|v| (0.0..=1.0).contains(v)));
}

#[test]
fn test_generate_with_positive_justify_and_decimation() {
    let params = ReliefParameters {
        decimate_ratio: 0.25,
        justify_x: Justify::Positive,
        justify_y: Justify::Center,
        justify_z: Justify::Positive,
        ..small_params()
    };
    let output = ReliefGenerator::new(dome(48, 40), params).generate().unwrap();
    assert_eq!(output.mesh.vertex_count(), 24 * 20);
    assert_eq!(output.mesh.face_count(), 23 * 19);
    assert_eq!(output.height_field.shape(), (48, 40));

    let (min, max) = output.mesh.bounds();
    assert!(min.x.abs() < 1e-6 && (max.x - 200.0).abs() < 1e-6);
    assert!((min.y + 75.0).abs() < 1e-6 && (max.y - 75.0).abs() < 1e-6);
    assert!(min.z.abs() < 1e-6);
}

#[test]
fn test_detail_enhancement_and_planar_run() {
    let params = ReliefParameters {
        detail_enhancement: true,
        detail_enhancement_amount: 0.8,
        use_planar: true,
        ..small_params()
    };
    let output = ReliefGenerator::new(dome(32, 32), params).generate().unwrap();
    assert_eq!(output.mesh.vertex_count(), 32 * 32);
    assert!(output.height_field.iter().all(|v| v.is_finite()));
}

#[test]
fn test_constant_depth_rejected() {
    for value in [0.25, 0.0, -2.0] {
        let generator = ReliefGenerator::new(HeightField::filled(32, 32, value), small_params());
        assert!(matches!(
            generator.generate(),
            Err(ReliefError::DegenerateInput { .. })
        ));
    }
}

#[test]
fn test_min_gridsize_too_large() {
    let params = ReliefParameters {
        min_gridsize: 64,
        ..small_params()
    };
    let generator = ReliefGenerator::new(dome(40, 40), params);
    assert!(matches!(generator.generate(), Err(ReliefError::Parameter(_))));
}

#[test]
fn test_mask_shape_mismatch_rejected() {
    let generator = ReliefGenerator::new(dome(32, 32), small_params())
        .with_gradient_mask(HeightField::filled(16, 16, 1.0));
    assert!(matches!(
        generator.generate(),
        Err(ReliefError::ShapeMismatch { .. })
    ));
}

#[test]
fn test_invalid_parameters_rejected_before_work() {
    let params = ReliefParameters {
        attenuation: -1.0,
        ..small_params()
    };
    let generator = ReliefGenerator::new(dome(32, 32), params);
    assert!(matches!(generator.generate(), Err(ReliefError::Parameter(_))));
}

#[test]
fn test_cancellation() {
    let flag = cancel_flag();
    flag.store(true, Ordering::Relaxed);
    let generator = ReliefGenerator::new(dome(32, 32), small_params());
    let result = generator.generate_with_progress(|_| {}, Some(&flag));
    assert!(matches!(result, Err(ReliefError::Cancelled)));
}

#[test]
fn test_progress_is_monotonic() {
    let generator = ReliefGenerator::new(dome(32, 32), small_params());
    let mut seen = Vec::new();
    generator
        .generate_with_progress(|p| seen.push(p), None)
        .unwrap();
    assert_eq!(seen.first(), Some(&0.0));
    assert_eq!(seen.last(), Some(&1.0));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_recovery_monotonic_in_scale() {
    let g = 0.2;
    let mut last = 0.0;
    for scale in [0.1, 0.2, 0.5, 1.0, 2.0] {
        let settings = GradientSettings {
            silhouette_scale: scale,
            ..Default::default()
        };
        let value = settings.process(g);
        assert!(value > last);
        last = value;
    }
}

#[test]
fn test_problem_areas_shape() {
    let generator = ReliefGenerator::new(dome(24, 20), small_params());
    let map = generator.problem_areas().unwrap();
    assert_eq!(map.shape(), (24, 20));
    assert!(map.iter().any(|&v| v != 0.0));
}

#[test]
fn test_parameters_file_round_trip() {
    let dir = TempDir::new().unwrap();
    let params = ReliefParameters {
        silhouette_exponent: 2,
        scale_down_before: Some(0.5),
        tolerance_mode: ToleranceMode::SolutionChangeMax,
        justify_y: Justify::Center,
        ..Default::default()
    };

    for name in ["relief.json", "relief.toml"] {
        let path = dir.path().join(name);
        params.save_to_file(&path).unwrap();
        let loaded = ReliefParameters::load_from_file(&path).unwrap();
        assert_eq!(loaded, params);
    }

    let bad = dir.path().join("relief.yaml");
    assert!(params.save_to_file(&bad).is_err());
}

#[test]
fn test_partial_config_uses_defaults() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("partial.json");
    std::fs::write(&path, r#"{ "attenuation": 3.0, "justify_x": 0 }"#).unwrap();
    let loaded = ReliefParameters::load_from_file(&path).unwrap();
    assert_eq!(loaded.attenuation, 3.0);
    assert_eq!(loaded.justify_x, Justify::Center);
    assert_eq!(loaded.min_gridsize, 16);
}

#[test]
fn test_justify_codes_place_mesh() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("placement.toml");
    std::fs::write(&path, "justify_x = 1\njustify_y = 0\njustify_z = -1\n").unwrap();
    let mut params = ReliefParameters::load_from_file(&path).unwrap();
    assert_eq!(params.justify_x, Justify::Positive);
    assert_eq!(params.justify_z, Justify::Negative);
    params.min_gridsize = 4;
    params.decimate_ratio = 1.0;

    let output = ReliefGenerator::new(dome(32, 24), params).generate().unwrap();
    let (min, max) = output.mesh.bounds();
    assert!(min.x.abs() < 1e-6 && (max.x - 200.0).abs() < 1e-6);
    assert!((min.y + 75.0).abs() < 1e-6 && (max.y - 75.0).abs() < 1e-6);
    assert!((min.z + 15.0).abs() < 1e-6 && max.z.abs() < 1e-6);

    let saved = dir.path().join("defaults.json");
    ReliefParameters::default().save_to_file(&saved).unwrap();
    let text = std::fs::read_to_string(&saved).unwrap();
    assert!(text.contains("\"justify_z\": -1"));
}

#[test]
fn test_invalid_config_file_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.toml");
    std::fs::write(&path, "vcycle_iterations = 0\n").unwrap();
    assert!(matches!(
        ReliefParameters::load_from_file(&path),
        Err(ReliefError::Parameter(_))
    ));
}

#[test]
fn test_from_file_and_obj_export() {
    let dir = TempDir::new().unwrap();
    let depth = dome(32, 24);
    let mut img = GrayImage::new(32, 24);
    for (x, y, px) in img.enumerate_pixels_mut() {
        *px = Luma([(depth.get(x as usize, y as usize) * 255.0).round() as u8]);
    }
    let image_path = dir.path().join("depth.png");
    DynamicImage::ImageLuma8(img).save(&image_path).unwrap();

    let output = ReliefGenerator::from_file(&image_path, small_params())
        .unwrap()
        .generate()
        .unwrap();

    let obj_path = dir.path().join("relief.obj");
    output.mesh.save_obj(&obj_path).unwrap();
    let text = std::fs::read_to_string(&obj_path).unwrap();
    assert_eq!(text.lines().filter(|l| l.starts_with("v ")).count(), 32 * 24);
    assert_eq!(text.lines().filter(|l| l.starts_with("f ")).count(), 31 * 23);
}

#[test]
fn test_missing_image_reports_image_error() {
    let result = ReliefGenerator::from_file("/nonexistent/depth.png", small_params());
    assert!(matches!(result, Err(ReliefError::ImageError(_))));
}
