//! Magic wand selection.
//!
//! This module turns a click on a raster window into selection outlines:
//! - **Window**: read-only view of the pixels under the cursor
//! - **Mask**: binary masks, padding and boolean combination
//! - **Magic wand**: scanline flood fill and global color thresholding
//! - **Contour**: Moore-neighbour boundary tracing into inner/outer rings
//! - **Simplify**: Douglas-Peucker reduction of traced rings
//! - **Pipeline**: replace / accumulate / erase driver tying it together

pub mod contour;
pub mod magic_wand;
pub mod mask;
pub mod pipeline;
pub mod simplify;
pub mod window;

pub use contour::{rasterize_contours, trace_contours, Contour};
pub use magic_wand::{flood_fill, threshold_mask, ThresholdOptions};
pub use mask::{combine, pad, Bounds, CombineMode, Mask};
pub use pipeline::{select, FillMode, Selection, SelectionMode, WandSettings};
pub use simplify::{distance_to_segment, simplify_contours};
pub use window::PixelWindow;
