//! Mathematical morphology for raster processing
//!
//! Minimum/maximum kernel filters used to smooth the cloud-shadow score:
//! - **Erosion**: minimum filter (shrinks bright regions)
//! - **Dilation**: maximum filter (expands bright regions)
//!
//! Unlike textbook formulations that leave a no-data border, these
//! filters clamp the kernel at the raster boundary and skip NaN
//! neighbors, so iterated smoothing of a probability surface never eats
//! the grid from the edges inward.

mod dilate;
mod element;
mod erode;
mod filter;

pub use dilate::dilate;
pub use element::StructuringElement;
pub use erode::erode;
