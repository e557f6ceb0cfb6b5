//! Read-only view of a cropped raster window.

use ndarray::ArrayView3;

use crate::error::{Error, Result};

/// Immutable, row-major sample buffer for one rectangular window of the
/// source image.
///
/// Layout is `(height, width, bytes_per_sample)`. Windows with fewer than
/// three samples per pixel are treated as grayscale.
#[derive(Clone, Copy, Debug)]
pub struct PixelWindow<'a> {
    samples: ArrayView3<'a, u8>,
}

impl<'a> PixelWindow<'a> {
    /// Wrap an existing `(height, width, channels)` view.
    pub fn new(samples: ArrayView3<'a, u8>) -> Result<Self> {
        let (height, width, channels) = samples.dim();
        if width == 0 || height == 0 {
            return Err(Error::InvalidWindow(format!(
                "empty window {}x{}",
                width, height
            )));
        }
        if channels == 0 {
            return Err(Error::InvalidWindow("zero bytes per sample".into()));
        }
        Ok(Self { samples })
    }

    /// Wrap a flat byte buffer (length = width * height * bytes_per_sample).
    pub fn from_raw(
        data: &'a [u8],
        width: usize,
        height: usize,
        bytes_per_sample: usize,
    ) -> Result<Self> {
        let samples = ArrayView3::from_shape((height, width, bytes_per_sample), data)?;
        Self::new(samples)
    }

    pub fn width(&self) -> usize {
        self.samples.dim().1
    }

    pub fn height(&self) -> usize {
        self.samples.dim().0
    }

    pub fn bytes_per_sample(&self) -> usize {
        self.samples.dim().2
    }

    /// RGB color of a pixel. Gray windows replicate their first sample.
    #[inline]
    pub fn color(&self, x: usize, y: usize) -> [u8; 3] {
        if self.bytes_per_sample() >= 3 {
            [
                self.samples[[y, x, 0]],
                self.samples[[y, x, 1]],
                self.samples[[y, x, 2]],
            ]
        } else {
            let v = self.samples[[y, x, 0]];
            [v, v, v]
        }
    }

    pub(crate) fn check_seed(&self, x: usize, y: usize) -> Result<()> {
        if x >= self.width() || y >= self.height() {
            return Err(Error::SeedOutOfBounds {
                x,
                y,
                width: self.width(),
                height: self.height(),
            });
        }
        Ok(())
    }
}

/// Check if a color matches the sample color within tolerance.
///
/// Each channel is tested independently (maximum channel difference),
/// not by Euclidean distance.
#[inline]
pub(crate) fn color_matches(color: [u8; 3], sample: [u8; 3], threshold: i32) -> bool {
    color
        .iter()
        .zip(sample.iter())
        .all(|(&c, &s)| (c as i32 - s as i32).abs() <= threshold)
}
