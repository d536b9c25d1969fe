//! Frequency-domain detail enhancement of the divergence field.
//!
//! The divergence is transformed with a 2-D FFT, its spectrum is centred
//! and multiplied by a gain that grows with the square root of the Manhattan
//! distance from the zero frequency, then transformed back. The gain is
//! `1 - amount` at the centre and `1` at the farthest frequency; the centre
//! 2x2 block (and any frequency inside the protected band) stays at exactly
//! `1` so the base shape is preserved.

use reliefkit_core::HeightField;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use tracing::debug;

/// Detail enhancement options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DetailEnhancer {
    /// Boost of the highest frequencies relative to the lowest
    pub amount: f64,
    /// Normalized radius of the band kept at gain 1
    pub protected_band: f64,
}

impl DetailEnhancer {
    pub fn new(amount: f64, protected_band: f64) -> Self {
        Self {
            amount,
            protected_band,
        }
    }

    /// Gain per centred frequency, row-major `width x height`.
    pub fn gain_mask(&self, width: usize, height: usize) -> HeightField {
        let (cx, cy) = (width / 2, height / 2);
        let mut mask = HeightField::from_fn(width, height, |x, y| {
            ((x.abs_diff(cx) + y.abs_diff(cy)) as f64).sqrt()
        });

        let (lo, hi) = (mask.min(), mask.max());
        let span = hi - lo;
        for v in mask.iter_mut() {
            let normalized = if span > 0.0 { (*v - lo) / span } else { 0.0 };
            *v = if normalized < self.protected_band {
                1.0
            } else {
                1.0 - self.amount + self.amount * normalized
            };
        }

        for y in cy.saturating_sub(1)..(cy + 1).min(height) {
            for x in cx.saturating_sub(1)..(cx + 1).min(width) {
                mask.set(x, y, 1.0);
            }
        }
        mask
    }

    /// Filter `field` through the gain mask.
    pub fn apply(&self, field: &HeightField) -> HeightField {
        let (w, h) = field.shape();
        if field.is_empty() {
            return field.clone();
        }

        let mut spectrum: Vec<Complex<f64>> =
            field.iter().map(|&v| Complex::new(v, 0.0)).collect();
        let mut planner = FftPlanner::<f64>::new();
        fft2(&mut planner, &mut spectrum, w, h, false);

        let mask = self.gain_mask(w, h);
        // centred frequency (x, y) sits at ((x + w - w/2) % w, (y + h - h/2) % h)
        for y in 0..h {
            let sy = (y + h - h / 2) % h;
            for x in 0..w {
                let sx = (x + w - w / 2) % w;
                spectrum[sy * w + sx] *= mask.get(x, y);
            }
        }

        fft2(&mut planner, &mut spectrum, w, h, true);
        let scale = 1.0 / (w * h) as f64;
        debug!(
            amount = self.amount,
            band = self.protected_band,
            "Detail enhancement applied"
        );
        HeightField::from_vec(w, h, spectrum.iter().map(|c| c.re * scale).collect())
    }
}

/// Unnormalized 2-D transform of a row-major buffer.
fn fft2(
    planner: &mut FftPlanner<f64>,
    data: &mut [Complex<f64>],
    w: usize,
    h: usize,
    inverse: bool,
) {
    let row_fft = if inverse {
        planner.plan_fft_inverse(w)
    } else {
        planner.plan_fft_forward(w)
    };
    for row in data.chunks_exact_mut(w) {
        row_fft.process(row);
    }

    let col_fft = if inverse {
        planner.plan_fft_inverse(h)
    } else {
        planner.plan_fft_forward(h)
    };
    let mut column = vec![Complex::new(0.0, 0.0); h];
    for x in 0..w {
        for (y, c) in column.iter_mut().enumerate() {
            *c = data[y * w + x];
        }
        col_fft.process(&mut column);
        for (y, c) in column.iter().enumerate() {
            data[y * w + x] = *c;
        }
    }
}
