//! Mask filters used to clean up raw segmentation results.
//!
//! All filters take a [`Mask`](crate::selection::Mask) and return a new
//! one; nothing is modified in place. Work is restricted to the mask's
//! bounds wherever the result outside them is known to be empty.
//!
//! ## Filter Categories
//!
//! - **Blur**: separable Gaussian blur thresholded back to binary, plus a
//!   border-only variant that only recomputes pixels near region edges
//! - **Morphology**: single-pass 3×3 dilation

pub mod blur;
pub mod core;
pub mod morphology;

pub use blur::{border_pixels, gaussian_blur, gaussian_blur_border_only};
pub use morphology::dilate;
