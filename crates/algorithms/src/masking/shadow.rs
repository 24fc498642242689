//! Cloud-shadow probability from solar geometry
//!
//! The cloud height for a given pixel is unknown, so the projector
//! casts the cloud-probability band along the solar direction once per
//! candidate height and averages the displaced rasters pixelwise: an
//! integration over a uniform height prior rather than a per-pixel
//! height estimate. The averaged score is then suppressed outside
//! plausible dark regions (low infrared sum, not water, not already
//! cloud).

use std::f64::consts::PI;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use cosecha_core::raster::Raster;
use cosecha_core::{Error, Result, Scene};

/// Input probability range of the companion band
const PROBABILITY_SCALE: f64 = 100.0;

/// Ascending sequence of candidate cloud heights in meters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CloudHeights {
    pub min: f64,
    pub max: f64,
    pub step: f64,
}

impl Default for CloudHeights {
    fn default() -> Self {
        // Mean cloud heights used for shadow projection
        Self {
            min: 200.0,
            max: 10_000.0,
            step: 250.0,
        }
    }
}

impl CloudHeights {
    pub fn validate(&self) -> Result<()> {
        if !(self.step > 0.0) || !(self.min > 0.0) || self.max < self.min {
            return Err(Error::InvalidParameter {
                name: "cloud_heights",
                value: format!("{}..{} step {}", self.min, self.max, self.step),
                reason: "heights must be positive and ascending".to_string(),
            });
        }
        Ok(())
    }

    /// Candidate heights `min, min+step, ...` up to and including `max`
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let count = ((self.max - self.min) / self.step).floor() as usize + 1;
        (0..count).map(move |i| self.min + i as f64 * self.step)
    }
}

/// Parameters for cloud-shadow projection
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShadowParams {
    /// Candidate cloud heights for the geometric projection
    pub cloud_heights: CloudHeights,
    /// Probability above which a pixel counts as cloud, `[0, 100]`
    pub cloud_prob_threshold: f64,
    /// Infrared band sum below which a pixel is a dark-pixel candidate
    pub ir_dark_threshold: f64,
    /// NDVI below which a dark pixel is treated as water, not shadow
    pub ndvi_water_threshold: f64,
    /// Bands summed for the dark-pixel test
    pub ir_bands: Vec<String>,
    /// NDVI numerator band for the water test
    pub nir_band: String,
    /// NDVI subtrahend band for the water test
    pub red_band: String,
}

impl Default for ShadowParams {
    fn default() -> Self {
        Self {
            cloud_heights: CloudHeights::default(),
            cloud_prob_threshold: 65.0,
            ir_dark_threshold: 0.3,
            ndvi_water_threshold: -0.1,
            ir_bands: vec!["B8".to_string(), "B11".to_string(), "B12".to_string()],
            nir_band: "B8".to_string(),
            red_band: "B4".to_string(),
        }
    }
}

/// Project cloud shadows and return a shadow-probability band in `[0, 1]`.
///
/// Requires solar azimuth and zenith in the scene metadata and a
/// companion probability raster on the scene's grid. The returned score
/// is the multi-height mean of the displaced cloud probability,
/// normalized by the input probability range and zeroed outside the
/// dark-pixel gate. Pixels whose gate inputs are nodata come out NaN.
pub fn project_shadows(
    scene: &Scene,
    cloud_prob: &Raster<f64>,
    params: &ShadowParams,
) -> Result<Raster<f64>> {
    params.cloud_heights.validate()?;

    let (rows, cols) = scene
        .shape()
        .ok_or_else(|| Error::Algorithm(format!("scene {} has no bands", scene.id())))?;
    if cloud_prob.shape() != (rows, cols) {
        return Err(Error::SizeMismatch {
            er: rows,
            ec: cols,
            ar: cloud_prob.rows(),
            ac: cloud_prob.cols(),
        });
    }

    let azimuth = scene.solar_azimuth()?;
    let zenith = scene.solar_zenith()?;

    // Illumination geometry in radians; the shadow falls away from the sun
    let az_r = (azimuth + 180.0) * PI / 180.0;
    let zen_r = zenith * PI / 180.0;

    // One whole-pixel offset per candidate height
    let transform = *cloud_prob.transform();
    let offsets: Vec<(isize, isize)> = params
        .cloud_heights
        .iter()
        .map(|height| {
            let cast_distance = zen_r.tan() * height;
            let x = -az_r.sin() * cast_distance;
            let y = -az_r.cos() * cast_distance;
            let (dcol, drow) = transform.map_offset_to_pixels(x, y);
            (drow.round() as isize, dcol.round() as isize)
        })
        .collect();

    let ir_bands = params
        .ir_bands
        .iter()
        .map(|name| scene.band(name))
        .collect::<Result<Vec<_>>>()?;
    let nir = scene.band(&params.nir_band)?;
    let red = scene.band(&params.red_band)?;

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                // Mean displaced cloud probability over all heights;
                // shifts that land off-grid simply do not contribute
                let mut sum = 0.0;
                let mut valid = 0usize;
                for &(drow, dcol) in &offsets {
                    let sr = row as isize - drow;
                    let sc = col as isize - dcol;
                    if sr < 0 || sc < 0 || sr >= rows as isize || sc >= cols as isize {
                        continue;
                    }
                    let p = unsafe { cloud_prob.get_unchecked(sr as usize, sc as usize) };
                    if p.is_finite() {
                        sum += p;
                        valid += 1;
                    }
                }
                if valid == 0 {
                    continue;
                }
                let mean_prob = sum / valid as f64;

                // Dark-pixel gate
                let mut ir_sum = 0.0;
                for band in &ir_bands {
                    ir_sum += unsafe { band.get_unchecked(row, col) };
                }
                let n = unsafe { nir.get_unchecked(row, col) };
                let r = unsafe { red.get_unchecked(row, col) };
                let p = unsafe { cloud_prob.get_unchecked(row, col) };
                if !ir_sum.is_finite() || !n.is_finite() || !r.is_finite() || !p.is_finite() {
                    continue;
                }

                let denom = n + r;
                let ndvi = if denom.abs() < 1e-10 {
                    0.0
                } else {
                    (n - r) / denom
                };

                let dark = ir_sum < params.ir_dark_threshold
                    && !(ndvi < params.ndvi_water_threshold)
                    && !(p > params.cloud_prob_threshold);

                *out = if dark {
                    mean_prob / PROBABILITY_SCALE
                } else {
                    0.0
                };
            }

            row_data
        })
        .collect();

    let mut output = cloud_prob.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
