//! Morphological erosion (minimum filter)
//!
//! Replaces each pixel with the minimum finite value in its structuring
//! element neighborhood. Shrinks bright regions; iterated over the
//! shadow score it removes isolated high-score speckle before the mask
//! is re-grown by dilation.

use cosecha_core::raster::Raster;
use cosecha_core::Result;

use super::element::StructuringElement;
use super::filter::{kernel_extreme, Extreme};

/// Perform morphological erosion on a raster.
///
/// Boundary cells use the in-bounds portion of the kernel; nodata
/// neighbors are skipped rather than propagated.
pub fn erode(raster: &Raster<f64>, element: &StructuringElement) -> Result<Raster<f64>> {
    kernel_extreme(raster, element, Extreme::Min)
}
