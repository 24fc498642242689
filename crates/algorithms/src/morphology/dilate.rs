//! Morphological dilation (maximum filter)
//!
//! Replaces each pixel with the maximum finite value in its structuring
//! element neighborhood. Expands bright regions; the mask compositor
//! uses it both to re-grow the eroded shadow score and, with a square
//! element, as the local-max extension onto adjacent pixels.

use cosecha_core::raster::Raster;
use cosecha_core::Result;

use super::element::StructuringElement;
use super::filter::{kernel_extreme, Extreme};

/// Perform morphological dilation on a raster.
///
/// Boundary cells use the in-bounds portion of the kernel; nodata
/// neighbors are skipped rather than propagated.
pub fn dilate(raster: &Raster<f64>, element: &StructuringElement) -> Result<Raster<f64>> {
    kernel_extreme(raster, element, Extreme::Max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cosecha_core::GeoTransform;

    fn make_raster(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    #[test]
    fn test_dilate_uniform() {
        let raster = make_raster(7, 7, 0.5);
        let result = dilate(&raster, &StructuringElement::Square(1)).unwrap();
        let val = result.get(3, 3).unwrap();
        assert!((val - 0.5).abs() < 1e-10);
    }

    #[test]
    fn test_dilate_spreads_maximum() {
        let mut raster = make_raster(7, 7, 0.0);
        raster.set(3, 3, 1.0).unwrap();

        let result = dilate(&raster, &StructuringElement::Square(1)).unwrap();
        // All 8 neighbors of the bright pixel pick it up
        for (r, c) in [(2, 2), (2, 3), (3, 4), (4, 4)] {
            let val = result.get(r, c).unwrap();
            assert!(
                (val - 1.0).abs() < 1e-10,
                "Dilation should spread maximum to ({}, {}), got {}",
                r,
                c,
                val
            );
        }
        // Two cells away is untouched
        let far = result.get(3, 5).unwrap();
        assert!(far.abs() < 1e-10);
    }

    #[test]
    fn test_dilate_then_erode_recovers_plateau() {
        // A 3x3 plateau survives one erosion after one dilation
        let mut raster = make_raster(9, 9, 0.0);
        for r in 3..6 {
            for c in 3..6 {
                raster.set(r, c, 1.0).unwrap();
            }
        }

        let opened = super::super::erode(&raster, &StructuringElement::Square(1)).unwrap();
        let opened = dilate(&opened, &StructuringElement::Square(1)).unwrap();
        let val = opened.get(4, 4).unwrap();
        assert!(
            (val - 1.0).abs() < 1e-10,
            "Opening should preserve plateau center, got {}",
            val
        );
    }
}
