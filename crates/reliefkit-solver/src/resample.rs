//! Restriction and prolongation between multigrid levels.
//!
//! Both operators work on cell-centred samples: target cell `o` maps to the
//! source coordinate `c = (o + 0.5) * d - 0.5`, with `d = source / target`
//! along each axis.
//!
//! - **Restriction** averages the source cells of a box window of half-width
//!   `0.5 * d` around `c`. An exact 2:1 ratio takes the 2x2 block mean fast path.
//! - **Prolongation** weights source cells within distance 1 of `c` with a
//!   tent filter and normalizes by the weights actually used, so boundary cells
//!   see the same scale as interior ones. An exact 1:2 ratio broadcasts every
//!   coarse value over its 2x2 block (nearest neighbour, deliberately not
//!   bilinear).
//!
//! Windows are clipped to the source bounds; neither operator ever indexes
//! outside its input, whatever the ratio.

use reliefkit_core::{HeightField, PlanarMask};

/// Source taps and weights contributing to one target index along one axis.
type Taps = Vec<Vec<(usize, f64)>>;

#[inline]
fn source_center(o: usize, d: f64) -> f64 {
    (o as f64 + 0.5) * d - 0.5
}

#[inline]
fn nearest(c: f64, n: usize) -> usize {
    (c.round().max(0.0) as usize).min(n - 1)
}

/// Half-open box window `[c - d/2, c + d/2)` per target index, uniform weights.
fn box_taps(n_in: usize, n_out: usize) -> Taps {
    let d = n_in as f64 / n_out as f64;
    (0..n_out)
        .map(|o| {
            let c = source_center(o, d);
            let start = (c - 0.5 * d).ceil().max(0.0) as usize;
            let end = ((c + 0.5 * d).ceil().max(0.0) as usize).min(n_in);
            if start < end {
                (start..end).map(|i| (i, 1.0)).collect()
            } else {
                vec![(nearest(c, n_in), 1.0)]
            }
        })
        .collect()
}

/// Tent window of half-width 1 per target index.
fn tent_taps(n_in: usize, n_out: usize) -> Taps {
    let d = n_in as f64 / n_out as f64;
    (0..n_out)
        .map(|o| {
            let c = source_center(o, d);
            let start = (c - 1.0).ceil().max(0.0) as usize;
            let end = ((c + 1.0).floor().max(0.0) as usize).min(n_in - 1);
            let taps: Vec<(usize, f64)> = (start..=end)
                .map(|i| (i, 1.0 - (c - i as f64).abs()))
                .filter(|&(_, w)| w > 0.0)
                .collect();
            if taps.is_empty() {
                vec![(nearest(c, n_in), 1.0)]
            } else {
                taps
            }
        })
        .collect()
}

/// Apply separable taps, normalizing each target sample by its weight sum.
fn apply_separable(src: &HeightField, dst: &mut HeightField, xt: &Taps, yt: &Taps) {
    for (y, ytaps) in yt.iter().enumerate() {
        for (x, xtaps) in xt.iter().enumerate() {
            let mut value = 0.0;
            let mut weight = 0.0;
            for &(iy, wy) in ytaps {
                for &(ix, wx) in xtaps {
                    let w = wx * wy;
                    value += src.get(ix, iy) * w;
                    weight += w;
                }
            }
            dst.set(x, y, if weight > 0.0 { value / weight } else { 0.0 });
        }
    }
}

/// Restrict `fine` into the (smaller) shape of `coarse`.
pub fn restrict_into(fine: &HeightField, coarse: &mut HeightField) {
    let (inx, iny) = fine.shape();
    let (outx, outy) = coarse.shape();
    if outx == 0 || outy == 0 || inx == 0 || iny == 0 {
        return;
    }

    if inx == 2 * outx && iny == 2 * outy {
        for y in 0..outy {
            let (fy0, fy1) = (fine.row(2 * y), fine.row(2 * y + 1));
            for x in 0..outx {
                let fx = 2 * x;
                let sum = fy0[fx] + fy0[fx + 1] + fy1[fx] + fy1[fx + 1];
                coarse.set(x, y, sum * 0.25);
            }
        }
        return;
    }

    let xt = box_taps(inx, outx);
    let yt = box_taps(iny, outy);
    apply_separable(fine, coarse, &xt, &yt);
}

/// Restrict `fine` to a freshly allocated `width x height` buffer.
pub fn restrict(fine: &HeightField, width: usize, height: usize) -> HeightField {
    let mut coarse = HeightField::zeros(width, height);
    restrict_into(fine, &mut coarse);
    coarse
}

/// Prolongate `coarse` into the (larger) shape of `fine`.
pub fn prolongate_into(coarse: &HeightField, fine: &mut HeightField) {
    let (inx, iny) = coarse.shape();
    let (outx, outy) = fine.shape();
    if outx == 0 || outy == 0 || inx == 0 || iny == 0 {
        return;
    }

    if outx == 2 * inx && outy == 2 * iny {
        for y in 0..outy {
            let src = coarse.row(y / 2);
            for x in 0..outx {
                fine.set(x, y, src[x / 2]);
            }
        }
        return;
    }

    let xt = tent_taps(inx, outx);
    let yt = tent_taps(iny, outy);
    apply_separable(coarse, fine, &xt, &yt);
}

/// Prolongate `coarse` to a freshly allocated `width x height` buffer.
pub fn prolongate(coarse: &HeightField, width: usize, height: usize) -> HeightField {
    let mut fine = HeightField::zeros(width, height);
    prolongate_into(coarse, &mut fine);
    fine
}

/// Restrict a mask; any coarse cell with a nonzero average becomes `true`.
pub fn restrict_mask(mask: &PlanarMask, width: usize, height: usize) -> PlanarMask {
    restrict(&mask.to_field(), width, height).select(|v| v > 0.0)
}

/// Resample to an arbitrary shape, picking the operator by direction.
///
/// Shrinking along both axes uses the box-filter restriction; anything else
/// uses the tent-filter prolongation.
pub fn resample(src: &HeightField, width: usize, height: usize) -> HeightField {
    if width <= src.width() && height <= src.height() {
        restrict(src, width, height)
    } else {
        prolongate(src, width, height)
    }
}
