//! Inclusion-mask composition
//!
//! Smooths the raw shadow score morphologically (iterated circular
//! opening, then a local-max extension onto adjacent pixels), thresholds
//! cloud and shadow probability, and composes the boolean inclusion
//! mask. Pure functions of their inputs and parameters.

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use crate::morphology::{dilate, erode, StructuringElement};
use cosecha_core::raster::Raster;
use cosecha_core::{Error, Result, Scene};

use super::shadow::{project_shadows, ShadowParams};

/// Parameters for shadow-score smoothing and mask thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskParams {
    /// Probability above which a pixel is masked as cloud, `[0, 100]`
    pub cloud_prob_threshold: f64,
    /// Smoothed score above which a pixel is masked as shadow, `[0, 1]`
    pub shadow_prob_threshold: f64,
    /// Circular erosion radius in cells
    pub erode_radius: f64,
    /// Circular dilation radius in cells
    pub dilate_radius: f64,
    /// Passes of erosion and of dilation
    pub smooth_iterations: usize,
    /// Square local-max radius extending the score onto neighbors;
    /// 0 disables the extension
    pub extend_radius: usize,
}

impl Default for MaskParams {
    fn default() -> Self {
        Self {
            cloud_prob_threshold: 65.0,
            shadow_prob_threshold: 0.02,
            erode_radius: 1.5,
            dilate_radius: 3.0,
            smooth_iterations: 3,
            extend_radius: 1,
        }
    }
}

/// Smooth a raw shadow score: iterated erosion, iterated dilation, then
/// a local-max extension.
///
/// The erosion passes remove isolated high-score speckle; the larger
/// dilation radius re-grows and slightly over-masks the surviving
/// shadow regions, and the final local max pushes the score one more
/// kernel onto adjacent pixels.
pub fn smooth_score(score: &Raster<f64>, params: &MaskParams) -> Result<Raster<f64>> {
    let erode_el = StructuringElement::Disk(params.erode_radius);
    let dilate_el = StructuringElement::Disk(params.dilate_radius);

    let mut smoothed = score.clone();
    for _ in 0..params.smooth_iterations {
        smoothed = erode(&smoothed, &erode_el)?;
    }
    for _ in 0..params.smooth_iterations {
        smoothed = dilate(&smoothed, &dilate_el)?;
    }

    if params.extend_radius > 0 {
        smoothed = dilate(&smoothed, &StructuringElement::Square(params.extend_radius))?;
    }

    Ok(smoothed)
}

/// Compose the boolean inclusion mask from the cloud-probability band
/// and the smoothed shadow score.
///
/// A pixel is retained (1) iff it is neither cloud nor shadow:
/// `cloud_prob <= cloud_prob_threshold AND score <= shadow_prob_threshold`.
/// Nodata in either surface fails both comparisons and is excluded.
pub fn inclusion_mask(
    cloud_prob: &Raster<f64>,
    smoothed_score: &Raster<f64>,
    params: &MaskParams,
) -> Result<Raster<u8>> {
    let (rows, cols) = cloud_prob.shape();
    if smoothed_score.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: smoothed_score.rows(),
            ac: smoothed_score.cols(),
        });
    }

    let data: Vec<u8> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0u8; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let p = unsafe { cloud_prob.get_unchecked(row, col) };
                let s = unsafe { smoothed_score.get_unchecked(row, col) };
                if p <= params.cloud_prob_threshold && s <= params.shadow_prob_threshold {
                    *out = 1;
                }
            }
            row_data
        })
        .collect();

    let mut mask = cloud_prob.with_same_meta::<u8>(rows, cols);
    *mask.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(mask)
}

/// Full cloud/shadow masking: projection, smoothing and composition.
pub fn cloud_shadow_mask(
    scene: &Scene,
    cloud_prob: &Raster<f64>,
    shadow_params: &ShadowParams,
    mask_params: &MaskParams,
) -> Result<Raster<u8>> {
    let score = project_shadows(scene, cloud_prob, shadow_params)?;
    let smoothed = smooth_score(&score, mask_params)?;
    inclusion_mask(cloud_prob, &smoothed, mask_params)
}

/// Apply an inclusion mask to every band of a scene.
///
/// Excluded pixels become NaN; the scene keeps its full metadata (the
/// acquisition and its illumination geometry are unchanged).
pub fn apply_mask(scene: &Scene, mask: &Raster<u8>) -> Result<Scene> {
    let (rows, cols) = mask.shape();
    if scene.shape() != Some((rows, cols)) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: scene.shape().map(|s| s.0).unwrap_or(0),
            ac: scene.shape().map(|s| s.1).unwrap_or(0),
        });
    }

    scene.map_bands(|_, band| {
        let data: Vec<f64> = (0..rows)
            .into_par_iter()
            .flat_map(|row| {
                let mut row_data = vec![f64::NAN; cols];
                for (col, out) in row_data.iter_mut().enumerate() {
                    if unsafe { mask.get_unchecked(row, col) } != 0 {
                        *out = unsafe { band.get_unchecked(row, col) };
                    }
                }
                row_data
            })
            .collect();

        let mut masked = band.with_same_meta::<f64>(rows, cols);
        masked.set_nodata(Some(f64::NAN));
        *masked.data_mut() =
            Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
        Ok(masked)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use cosecha_core::GeoTransform;

    fn raster(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64 * 20.0, 20.0, -20.0));
        r
    }

    fn quick_params() -> MaskParams {
        MaskParams {
            smooth_iterations: 1,
            ..MaskParams::default()
        }
    }

    #[test]
    fn test_smoothing_removes_speckle() {
        // A single noisy high-score pixel disappears under opening
        let mut score = raster(15, 15, 0.0);
        score.set(7, 7, 0.9).unwrap();

        let smoothed = smooth_score(&score, &quick_params()).unwrap();
        for row in 0..15 {
            for col in 0..15 {
                let v = smoothed.get(row, col).unwrap();
                assert!(
                    v.abs() < 1e-10,
                    "speckle should be removed at ({}, {}), got {}",
                    row,
                    col,
                    v
                );
            }
        }
    }

    #[test]
    fn test_smoothing_extends_large_region() {
        // An 8x8 shadow block survives and grows past its borders
        let mut score = raster(20, 20, 0.0);
        for r in 6..14 {
            for c in 6..14 {
                score.set(r, c, 0.5).unwrap();
            }
        }

        let smoothed = smooth_score(&score, &quick_params()).unwrap();
        assert!((smoothed.get(10, 10).unwrap() - 0.5).abs() < 1e-10);
        // Dilation radius exceeds erosion radius: the score spills
        // outside the original block
        assert!(smoothed.get(10, 4).unwrap() > 0.0);
    }

    #[test]
    fn test_inclusion_mask_thresholds() {
        let mut cloud = raster(5, 5, 10.0);
        cloud.set(1, 1, 80.0).unwrap(); // cloud
        let mut score = raster(5, 5, 0.0);
        score.set(3, 3, 0.4).unwrap(); // shadow

        let mask = inclusion_mask(&cloud, &score, &MaskParams::default()).unwrap();
        assert_eq!(mask.get(1, 1).unwrap(), 0);
        assert_eq!(mask.get(3, 3).unwrap(), 0);
        assert_eq!(mask.get(0, 0).unwrap(), 1);
    }

    #[test]
    fn test_inclusion_mask_nodata_excluded() {
        let mut cloud = raster(3, 3, 10.0);
        cloud.set(0, 0, f64::NAN).unwrap();
        let score = raster(3, 3, 0.0);

        let mask = inclusion_mask(&cloud, &score, &MaskParams::default()).unwrap();
        assert_eq!(mask.get(0, 0).unwrap(), 0);
        assert_eq!(mask.get(1, 1).unwrap(), 1);
    }

    #[test]
    fn test_mask_monotone_in_cloud_threshold() {
        // Raising the cloud threshold never shrinks the retained set
        let mut cloud = raster(8, 8, 0.0);
        for (i, v) in [5.0, 20.0, 40.0, 63.0, 66.0, 80.0, 95.0].iter().enumerate() {
            cloud.set(i, i, *v).unwrap();
        }
        let score = raster(8, 8, 0.0);

        let retained = |threshold: f64| -> usize {
            let params = MaskParams {
                cloud_prob_threshold: threshold,
                ..MaskParams::default()
            };
            let mask = inclusion_mask(&cloud, &score, &params).unwrap();
            mask.data().iter().filter(|&&v| v == 1).count()
        };

        let mut previous = retained(0.0);
        for threshold in [10.0, 30.0, 64.0, 65.0, 79.0, 90.0, 100.0] {
            let current = retained(threshold);
            assert!(
                current >= previous,
                "retained count dropped from {} to {} at threshold {}",
                previous,
                current,
                threshold
            );
            previous = current;
        }
    }

    #[test]
    fn test_apply_mask_blanks_excluded_pixels() {
        let scene = Scene::new("S2A_0001", Utc.with_ymd_and_hms(2016, 3, 14, 10, 30, 0).unwrap())
            .with_band("B4", raster(4, 4, 0.2))
            .unwrap();

        let mut mask: Raster<u8> = Raster::filled(4, 4, 1);
        mask.set(2, 2, 0).unwrap();

        let masked = apply_mask(&scene, &mask).unwrap();
        let band = masked.band("B4").unwrap();
        assert!(band.get(2, 2).unwrap().is_nan());
        assert!((band.get(0, 0).unwrap() - 0.2).abs() < 1e-10);
    }

    #[test]
    fn test_apply_mask_shape_mismatch() {
        let scene = Scene::new("S2A_0001", Utc.with_ymd_and_hms(2016, 3, 14, 10, 30, 0).unwrap())
            .with_band("B4", raster(4, 4, 0.2))
            .unwrap();
        let mask: Raster<u8> = Raster::filled(5, 4, 1);
        assert!(apply_mask(&scene, &mask).is_err());
    }
}
