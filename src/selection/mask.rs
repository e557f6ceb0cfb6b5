//! Binary selection masks.
//!
//! A [`Mask`] is a one-byte-per-pixel occupancy grid (0 or 1) with a
//! bounding box that always contains every set pixel. The box may be
//! loose, it never excludes a set pixel.

use ndarray::Array2;

use crate::error::{Error, Result};

/// Inclusive pixel bounds of a mask's set region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub min_x: usize,
    pub min_y: usize,
    pub max_x: usize,
    pub max_y: usize,
}

impl Bounds {
    pub fn new(min_x: usize, min_y: usize, max_x: usize, max_y: usize) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Bounds covering a whole `width` x `height` grid.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width.saturating_sub(1), height.saturating_sub(1))
    }

    #[inline]
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Smallest bounds containing both.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }
}

/// Boolean combination rule for [`combine`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CombineMode {
    /// `a ∨ b`
    Union,
    /// `a ∧ ¬b`
    Erase,
}

/// Binary mask over a rectangular pixel region.
#[derive(Clone, Debug, PartialEq)]
pub struct Mask {
    /// Row-major occupancy, shape `(height, width)`, values 0 or 1.
    pub data: Array2<u8>,
    pub bounds: Bounds,
}

impl Mask {
    /// Empty mask with full-grid bounds.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: Array2::zeros((height, width)),
            bounds: Bounds::full(width, height),
        }
    }

    /// Build a mask from raw data. Bounds are computed tightly.
    pub fn from_data(data: Array2<u8>) -> Self {
        let (height, width) = data.dim();
        let mut mask = Self {
            data,
            bounds: Bounds::full(width, height),
        };
        mask.shrink_bounds();
        mask
    }

    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// Dimensions as `(width, height)`.
    pub fn size(&self) -> (usize, usize) {
        (self.width(), self.height())
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.data[[y, x]] != 0
    }

    /// Number of set pixels.
    pub fn count(&self) -> usize {
        self.data.iter().filter(|&&v| v != 0).count()
    }

    /// Exact bounds of the set pixels, or `None` for an empty mask.
    pub fn tight_bounds(&self) -> Option<Bounds> {
        let mut found: Option<Bounds> = None;
        for ((y, x), &v) in self.data.indexed_iter() {
            if v == 0 {
                continue;
            }
            found = Some(match found {
                None => Bounds::new(x, y, x, y),
                Some(b) => b.union(&Bounds::new(x, y, x, y)),
            });
        }
        found
    }

    /// Replace the bounds with the exact bounds. Empty masks keep theirs.
    pub fn shrink_bounds(&mut self) {
        if let Some(bounds) = self.tight_bounds() {
            self.bounds = bounds;
        }
    }

    pub(crate) fn check_size(&self, other: &Mask) -> Result<()> {
        other.check_dims(self.width(), self.height())
    }

    /// Fails unless this mask is `width` x `height`.
    pub(crate) fn check_dims(&self, width: usize, height: usize) -> Result<()> {
        if self.size() != (width, height) {
            return Err(Error::DimensionMismatch {
                expected: (width, height),
                actual: self.size(),
            });
        }
        Ok(())
    }
}

/// Grow a mask by a one pixel ring of zeros on every side.
///
/// Used before boundary tracing so the tracer never indexes outside the
/// buffer.
pub fn pad(mask: &Mask) -> Mask {
    let (width, height) = mask.size();
    let mut data = Array2::<u8>::zeros((height + 2, width + 2));
    for ((y, x), &v) in mask.data.indexed_iter() {
        data[[y + 1, x + 1]] = v;
    }
    let b = mask.bounds;
    Mask {
        data,
        bounds: Bounds::new(b.min_x + 1, b.min_y + 1, b.max_x + 1, b.max_y + 1),
    }
}

/// Combine two masks on the same pixel grid.
///
/// Union takes the hull of both bounds; erase keeps `a`'s bounds, since
/// erasing only ever removes pixels.
pub fn combine(a: &Mask, b: &Mask, mode: CombineMode) -> Result<Mask> {
    a.check_size(b)?;

    let (data, bounds) = match mode {
        CombineMode::Union => {
            let mut data = a.data.clone();
            data.zip_mut_with(&b.data, |x, &y| *x = (*x != 0 || y != 0) as u8);
            (data, a.bounds.union(&b.bounds))
        }
        CombineMode::Erase => {
            let mut data = a.data.clone();
            data.zip_mut_with(&b.data, |x, &y| *x = (*x != 0 && y == 0) as u8);
            (data, a.bounds)
        }
    };

    Ok(Mask { data, bounds })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect_mask(width: usize, height: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> Mask {
        let mut data = Array2::<u8>::zeros((height, width));
        for y in y0..=y1 {
            for x in x0..=x1 {
                data[[y, x]] = 1;
            }
        }
        Mask::from_data(data)
    }

    #[test]
    fn test_from_data_tight_bounds() {
        let mask = rect_mask(8, 6, 2, 1, 4, 3);
        assert_eq!(mask.bounds, Bounds::new(2, 1, 4, 3));
        assert_eq!(mask.count(), 9);
    }

    #[test]
    fn test_empty_mask_bounds() {
        let mask = Mask::from_data(Array2::zeros((3, 4)));
        assert_eq!(mask.tight_bounds(), None);
        assert_eq!(mask.bounds, Bounds::full(4, 3));
    }

    #[test]
    fn test_pad() {
        let mask = rect_mask(3, 3, 0, 0, 2, 2);
        let padded = pad(&mask);
        assert_eq!(padded.size(), (5, 5));
        assert_eq!(padded.count(), 9);
        for i in 0..5 {
            assert!(!padded.get(i, 0));
            assert!(!padded.get(i, 4));
            assert!(!padded.get(0, i));
            assert!(!padded.get(4, i));
        }
        assert_eq!(padded.bounds, Bounds::new(1, 1, 3, 3));
    }

    #[test]
    fn test_combine_union() {
        let a = rect_mask(10, 10, 0, 0, 3, 3);
        let b = rect_mask(10, 10, 6, 6, 8, 8);
        let u = combine(&a, &b, CombineMode::Union).unwrap();
        assert_eq!(u.count(), 16 + 9);
        assert_eq!(u.bounds, Bounds::new(0, 0, 8, 8));
    }

    #[test]
    fn test_combine_erase() {
        let a = rect_mask(10, 10, 0, 0, 4, 4);
        let b = rect_mask(10, 10, 2, 2, 6, 6);
        let e = combine(&a, &b, CombineMode::Erase).unwrap();
        assert_eq!(e.count(), 25 - 9);
        assert!(e.get(1, 1));
        assert!(!e.get(3, 3));
        assert_eq!(e.bounds, a.bounds);
    }

    #[test]
    fn test_union_then_erase_is_self_erasing() {
        let a = rect_mask(12, 12, 1, 1, 6, 6);
        let b = rect_mask(12, 12, 4, 4, 9, 9);
        let u = combine(&a, &b, CombineMode::Union).unwrap();
        let back = combine(&u, &b, CombineMode::Erase).unwrap();
        let direct = combine(&a, &b, CombineMode::Erase).unwrap();
        let ab = a.bounds;
        for y in ab.min_y..=ab.max_y {
            for x in ab.min_x..=ab.max_x {
                assert_eq!(back.get(x, y), direct.get(x, y));
            }
        }
    }

    #[test]
    fn test_combine_dimension_mismatch() {
        let a = Mask::new(4, 4);
        let b = Mask::new(4, 5);
        match combine(&a, &b, CombineMode::Union) {
            Err(Error::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, (4, 4));
                assert_eq!(actual, (4, 5));
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
