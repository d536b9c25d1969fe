//! Discrete 5-point Laplacian with a zero-flux boundary.
//!
//! Each sample is compared only with the neighbours that exist: interior
//! cells use 4 neighbours and a diagonal of -4, edge cells 3 and -3, corner
//! cells 2 and -2. There is no wraparound and no Dirichlet boundary, so the
//! operator is symmetric and constants lie in its null space.

use reliefkit_core::HeightField;

/// Neighbour sum and neighbour count of sample `(x, y)`.
#[inline]
fn neighbours(u: &HeightField, x: usize, y: usize) -> (f64, f64) {
    let (w, h) = u.shape();
    let mut sum = 0.0;
    let mut count = 0.0;
    if x > 0 {
        sum += u.get(x - 1, y);
        count += 1.0;
    }
    if x + 1 < w {
        sum += u.get(x + 1, y);
        count += 1.0;
    }
    if y > 0 {
        sum += u.get(x, y - 1);
        count += 1.0;
    }
    if y + 1 < h {
        sum += u.get(x, y + 1);
        count += 1.0;
    }
    (sum, count)
}

/// `res = A * x`
pub fn atimes(x: &HeightField, res: &mut HeightField) {
    x.assert_same_shape(res, "atimes");
    let (w, h) = x.shape();
    for y in 0..h {
        for xi in 0..w {
            let (sum, count) = neighbours(x, xi, y);
            res.set(xi, y, sum - count * x.get(xi, y));
        }
    }
}

/// Defect `d = f - A * u`: how far `u` is from satisfying `A * u = f`.
pub fn calculate_defect(d: &mut HeightField, u: &HeightField, f: &HeightField) {
    u.assert_same_shape(f, "calculate_defect");
    u.assert_same_shape(d, "calculate_defect");
    let (w, h) = u.shape();
    for y in 0..h {
        for x in 0..w {
            let (sum, count) = neighbours(u, x, y);
            d.set(x, y, f.get(x, y) - (sum - count * u.get(x, y)));
        }
    }
}

/// L2 norm of `f - A * u`.
pub fn residual_norm(u: &HeightField, f: &HeightField) -> f64 {
    let mut d = HeightField::zeros_like(u);
    calculate_defect(&mut d, u, f);
    d.norm_l2()
}
