//! Depth normalization.

use reliefkit_core::{HeightField, PlanarMask, ReliefError, ReliefResult};
use tracing::debug;

/// Depth values at or above this magnitude were never written by the renderer.
pub const SENTINEL_THRESHOLD: f64 = 1.0e9;

/// Pixels within this distance of the lowest inverted depth are background.
pub const PLANAR_EPSILON: f64 = 1.0e-4;

/// Largest written value, ignoring sentinels (0 when nothing qualifies).
fn written_max(field: &HeightField) -> f64 {
    field
        .max_where(|v| v < SENTINEL_THRESHOLD)
        .map_or(0.0, |m| m.max(0.0))
}

/// Clip `field` to its written range, rescale to `[0, 1]` and raise to
/// `exponent`, in place. A constant field maps to zeros.
pub fn tonemap(field: &mut HeightField, exponent: f64) {
    let max = written_max(field);
    let min = field.min();
    let range = max - min;
    debug!(min, max, exponent, "Tone mapping");

    for v in field.iter_mut() {
        *v = if range > 0.0 {
            ((v.clamp(min, max) - min) / range).powf(exponent)
        } else {
            0.0
        };
    }
}

/// Reject a depth map that holds no relief: one depth value everywhere
/// once unwritten pixels are ignored.
pub fn check_depth_range(depth: &HeightField) -> ReliefResult<()> {
    let min = depth.min();
    match depth.max_where(|v| v < SENTINEL_THRESHOLD) {
        Some(max) if max > min => Ok(()),
        _ => Err(ReliefError::DegenerateInput { value: min }),
    }
}

/// Normalize a raw depth map and flip it so near surfaces are high.
///
/// Returns the inverted map together with its background mask.
pub fn prepare_depth(mut depth: HeightField, exponent: f64) -> ReliefResult<(HeightField, PlanarMask)> {
    check_depth_range(&depth)?;
    tonemap(&mut depth, exponent);
    for v in depth.iter_mut() {
        *v = 1.0 - *v;
    }
    let floor = depth.min() + PLANAR_EPSILON;
    let planar = depth.select(|v| v < floor);
    debug!(
        min = depth.min(),
        max = depth.max(),
        planar = planar.count(),
        "Depth map normalized"
    );
    Ok((depth, planar))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescales_to_unit_range() {
        let mut f = HeightField::from_vec(4, 1, vec![2.0, 4.0, 6.0, 10.0]);
        tonemap(&mut f, 1.0);
        assert_eq!(f.as_slice(), &[0.0, 0.25, 0.5, 1.0]);
    }

    #[test]
    fn test_exponent_applied_after_rescale() {
        let mut f = HeightField::from_vec(3, 1, vec![0.0, 1.0, 2.0]);
        tonemap(&mut f, 2.0);
        assert_eq!(f.as_slice(), &[0.0, 0.25, 1.0]);
    }

    #[test]
    fn test_sentinels_clipped_to_written_max() {
        let mut f = HeightField::from_vec(3, 1, vec![1.0, 3.0, 1.0e10]);
        tonemap(&mut f, 1.0);
        assert_eq!(f.as_slice(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_constant_maps_to_zero() {
        let mut f = HeightField::filled(3, 3, 0.7);
        tonemap(&mut f, 1.0);
        assert!(f.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_idempotent_with_unit_exponent() {
        let mut once = HeightField::from_fn(5, 4, |x, y| ((x * 7 + y * 3) % 11) as f64 - 2.5);
        tonemap(&mut once, 1.0);
        let mut twice = once.clone();
        tonemap(&mut twice, 1.0);
        for (a, b) in once.iter().zip(twice.iter()) {
            assert!((a - b).abs() < 1e-15);
        }
    }

    #[test]
    fn test_degenerate_depth_rejected() {
        let depth = HeightField::filled(8, 8, 0.5);
        assert!(matches!(
            prepare_depth(depth, 1.0),
            Err(ReliefError::DegenerateInput { .. })
        ));
        let unwritten = HeightField::from_fn(4, 4, |x, _| if x == 0 { 0.5 } else { 1.0e10 });
        assert!(check_depth_range(&unwritten).is_err());
        let negative = HeightField::filled(8, 8, -2.0);
        assert!(matches!(
            prepare_depth(negative, 1.0),
            Err(ReliefError::DegenerateInput { value }) if value == -2.0
        ));
        assert!(check_depth_range(&HeightField::filled(4, 4, 1.0e10)).is_err());
        let negative_ramp = HeightField::from_fn(4, 1, |x, _| -(x as f64) - 1.0);
        assert!(check_depth_range(&negative_ramp).is_ok());
    }

    #[test]
    fn test_prepare_inverts_and_marks_background() {
        // far background (large depth) around a near square
        let depth = HeightField::from_fn(6, 6, |x, y| {
            if (2..4).contains(&x) && (2..4).contains(&y) {
                1.0
            } else {
                5.0
            }
        });
        let (inverted, planar) = prepare_depth(depth, 1.0).unwrap();
        assert_eq!(inverted.get(2, 2), 1.0);
        assert_eq!(inverted.get(0, 0), 0.0);
        assert_eq!(planar.count(), 32);
        assert!(!planar.get(3, 3));
    }
}
