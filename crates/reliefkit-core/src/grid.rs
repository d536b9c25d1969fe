//! Dense two-dimensional buffers for the numeric kernels.
//!
//! `Grid2D<T>` stores `width * height` samples in row-major order
//! (`index = y * width + x`). Two instantiations carry the pipeline:
//!
//! - [`HeightField`]: `f64` samples (depth maps, gradients, divergence,
//!   multigrid solutions and corrections)
//! - [`PlanarMask`]: `bool` samples marking flat background pixels
//!
//! Elementwise operations between two buffers require identical shapes.
//! A mismatch is a programming error and panics with the offending shapes.

use std::ops::{AddAssign, DivAssign, Index, IndexMut, MulAssign, SubAssign};

/// Row-major 2-D buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2D<T> {
    width: usize,
    height: usize,
    data: Vec<T>,
}

/// Unnormalized scalar height/depth samples.
pub type HeightField = Grid2D<f64>;

/// `true` where a pixel belongs to the flat background.
pub type PlanarMask = Grid2D<bool>;

impl<T: Clone> Grid2D<T> {
    /// Create a buffer with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: T) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Set every sample to `value`.
    pub fn fill(&mut self, value: T) {
        self.data.fill(value);
    }
}

impl<T> Grid2D<T> {
    /// Wrap an existing row-major vector.
    ///
    /// # Panics
    /// Panics if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<T>) -> Self {
        assert_eq!(
            data.len(),
            width * height,
            "buffer length does not match {}x{} grid",
            width,
            height
        );
        Self {
            width,
            height,
            data,
        }
    }

    /// Build a buffer by evaluating `f(x, y)` for every sample.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> T,
    {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// `(width, height)`
    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear index of sample `(x, y)`.
    #[inline]
    pub fn idx(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// One row of samples.
    #[inline]
    pub fn row(&self, y: usize) -> &[T] {
        let start = y * self.width;
        &self.data[start..start + self.width]
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.data.iter_mut()
    }

    /// Shape-preserving elementwise transform.
    pub fn map<U, F>(&self, f: F) -> Grid2D<U>
    where
        F: FnMut(&T) -> U,
    {
        Grid2D {
            width: self.width,
            height: self.height,
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Combine two same-shape buffers sample by sample.
    pub fn zip_map<U, V, F>(&self, other: &Grid2D<U>, mut f: F) -> Grid2D<V>
    where
        F: FnMut(&T, &U) -> V,
    {
        self.assert_same_shape(other, "zip_map");
        Grid2D {
            width: self.width,
            height: self.height,
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(a, b)| f(a, b))
                .collect(),
        }
    }

    pub fn same_shape<U>(&self, other: &Grid2D<U>) -> bool {
        self.shape() == other.shape()
    }

    /// # Panics
    /// Panics when the two buffers differ in shape.
    #[track_caller]
    pub fn assert_same_shape<U>(&self, other: &Grid2D<U>, op: &str) {
        assert!(
            self.same_shape(other),
            "{}: shape mismatch {}x{} vs {}x{}",
            op,
            self.width,
            self.height,
            other.width,
            other.height
        );
    }
}

impl<T: Copy> Grid2D<T> {
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> T {
        self.data[self.idx(x, y)]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, value: T) {
        let i = self.idx(x, y);
        self.data[i] = value;
    }

    /// Overwrite this buffer with the contents of `other`.
    pub fn copy_from(&mut self, other: &Self) {
        self.assert_same_shape(other, "copy_from");
        self.data.copy_from_slice(&other.data);
    }
}

impl<T> Index<(usize, usize)> for Grid2D<T> {
    type Output = T;

    fn index(&self, (x, y): (usize, usize)) -> &T {
        &self.data[self.idx(x, y)]
    }
}

impl<T> IndexMut<(usize, usize)> for Grid2D<T> {
    fn index_mut(&mut self, (x, y): (usize, usize)) -> &mut T {
        let i = self.idx(x, y);
        &mut self.data[i]
    }
}

impl Grid2D<f64> {
    pub fn zeros(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    pub fn zeros_like<U>(other: &Grid2D<U>) -> Self {
        Self::zeros(other.width, other.height)
    }

    /// Smallest sample, `+inf` for an empty buffer.
    pub fn min(&self) -> f64 {
        self.data.iter().copied().fold(f64::INFINITY, f64::min)
    }

    /// Largest sample, `-inf` for an empty buffer.
    pub fn max(&self) -> f64 {
        self.data.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Smallest sample satisfying `pred`.
    pub fn min_where<P>(&self, pred: P) -> Option<f64>
    where
        P: Fn(f64) -> bool,
    {
        self.data
            .iter()
            .copied()
            .filter(|&v| pred(v))
            .reduce(f64::min)
    }

    /// Largest sample satisfying `pred`.
    pub fn max_where<P>(&self, pred: P) -> Option<f64>
    where
        P: Fn(f64) -> bool,
    {
        self.data
            .iter()
            .copied()
            .filter(|&v| pred(v))
            .reduce(f64::max)
    }

    pub fn sum(&self) -> f64 {
        self.data.iter().sum()
    }

    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.sum() / self.data.len() as f64
    }

    /// Sum of the elementwise product.
    pub fn dot(&self, other: &Self) -> f64 {
        self.assert_same_shape(other, "dot");
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    pub fn norm_l2(&self) -> f64 {
        self.data.iter().map(|v| v * v).sum::<f64>().sqrt()
    }

    pub fn norm_max(&self) -> f64 {
        self.data.iter().fold(0.0, |acc: f64, v| acc.max(v.abs()))
    }

    /// `self += alpha * other`
    pub fn add_scaled(&mut self, alpha: f64, other: &Self) {
        self.assert_same_shape(other, "add_scaled");
        for (a, b) in self.data.iter_mut().zip(other.data.iter()) {
            *a += alpha * b;
        }
    }

    /// Write `value` into every sample selected by `mask`.
    pub fn fill_masked(&mut self, mask: &PlanarMask, value: f64) {
        self.assert_same_shape(mask, "fill_masked");
        for (v, &m) in self.data.iter_mut().zip(mask.data.iter()) {
            if m {
                *v = value;
            }
        }
    }

    /// Samples selected by `mask`, in row-major order.
    pub fn masked_values(&self, mask: &PlanarMask) -> Vec<f64> {
        self.assert_same_shape(mask, "masked_values");
        self.data
            .iter()
            .zip(mask.data.iter())
            .filter_map(|(&v, &m)| m.then_some(v))
            .collect()
    }

    /// Boolean buffer of samples satisfying `pred`.
    pub fn select<P>(&self, pred: P) -> PlanarMask
    where
        P: Fn(f64) -> bool,
    {
        self.map(|&v| pred(v))
    }
}

impl Grid2D<bool> {
    /// `1.0` where set, `0.0` elsewhere.
    pub fn to_field(&self) -> HeightField {
        self.map(|&m| if m { 1.0 } else { 0.0 })
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&m| m).count()
    }
}

macro_rules! elementwise_assign {
    ($trait:ident, $method:ident, $op:tt) => {
        impl $trait<&Grid2D<f64>> for Grid2D<f64> {
            #[track_caller]
            fn $method(&mut self, rhs: &Grid2D<f64>) {
                self.assert_same_shape(rhs, stringify!($method));
                for (a, b) in self.data.iter_mut().zip(rhs.data.iter()) {
                    *a $op *b;
                }
            }
        }

        impl $trait<f64> for Grid2D<f64> {
            fn $method(&mut self, rhs: f64) {
                for a in self.data.iter_mut() {
                    *a $op rhs;
                }
            }
        }
    };
}

elementwise_assign!(AddAssign, add_assign, +=);
elementwise_assign!(SubAssign, sub_assign, -=);
elementwise_assign!(MulAssign, mul_assign, *=);
elementwise_assign!(DivAssign, div_assign, /=);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_layout() {
        let g = Grid2D::from_fn(3, 2, |x, y| (y * 10 + x) as f64);
        assert_eq!(g.shape(), (3, 2));
        assert_eq!(g.as_slice(), &[0.0, 1.0, 2.0, 10.0, 11.0, 12.0]);
        assert_eq!(g.get(2, 1), 12.0);
        assert_eq!(g[(1, 1)], 11.0);
        assert_eq!(g.row(1), &[10.0, 11.0, 12.0]);
    }

    #[test]
    fn test_elementwise_ops() {
        let mut a = HeightField::filled(2, 2, 3.0);
        let b = HeightField::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        a += &b;
        assert_eq!(a.as_slice(), &[4.0, 5.0, 6.0, 7.0]);
        a -= &b;
        a *= &b;
        assert_eq!(a.as_slice(), &[3.0, 6.0, 9.0, 12.0]);
        a /= &b;
        assert_eq!(a.as_slice(), &[3.0; 4]);
        a *= 2.0;
        a -= 1.0;
        assert_eq!(a.as_slice(), &[5.0; 4]);
    }

    #[test]
    #[should_panic(expected = "shape mismatch")]
    fn test_shape_mismatch_panics() {
        let mut a = HeightField::zeros(2, 3);
        let b = HeightField::zeros(3, 2);
        a += &b;
    }

    #[test]
    fn test_min_max_reductions() {
        let g = HeightField::from_vec(2, 2, vec![-1.0, 5.0, 1e10, 2.0]);
        assert_eq!(g.min(), -1.0);
        assert_eq!(g.max(), 1e10);
        assert_eq!(g.max_where(|v| v < 1e9), Some(5.0));
        assert_eq!(g.min_where(|v| v > 100.0), Some(1e10));
        assert_eq!(g.min_where(|v| v > 1e11), None);
    }

    #[test]
    fn test_masking() {
        let mut g = HeightField::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]);
        let mask = g.select(|v| v > 2.5);
        assert_eq!(mask.count(), 2);
        assert_eq!(g.masked_values(&mask), vec![3.0, 4.0]);
        g.fill_masked(&mask, 0.0);
        assert_eq!(g.as_slice(), &[1.0, 2.0, 0.0, 0.0]);
        assert_eq!(mask.to_field().as_slice(), &[0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_norms_and_dot() {
        let a = HeightField::from_vec(2, 1, vec![3.0, -4.0]);
        assert_eq!(a.norm_l2(), 5.0);
        assert_eq!(a.norm_max(), 4.0);
        assert_eq!(a.dot(&a), 25.0);
        let mut b = HeightField::zeros(2, 1);
        b.add_scaled(2.0, &a);
        assert_eq!(b.as_slice(), &[6.0, -8.0]);
        assert_eq!(b.mean(), -1.0);
    }
}
