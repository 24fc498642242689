//! Per-pixel index formulas
//!
//! All formulas are pure per-pixel transforms built on a shared two-band
//! combinator. Nodata in any input, and near-zero denominators, produce
//! NaN in the output; no state is carried across scenes.

use ndarray::Array2;

use crate::maybe_rayon::*;
use cosecha_core::raster::Raster;
use cosecha_core::{Error, Result};

use serde::{Deserialize, Serialize};

/// Post-processing applied to a computed index band.
///
/// `Clamp` pins values into `[min, max]`; `Window` drops values outside
/// the open interval `(min, max)` to NaN, discarding saturated and
/// bare-soil pixels instead of pinning them.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum ValueAdjustment {
    #[default]
    None,
    Clamp {
        min: f64,
        max: f64,
    },
    Window {
        min: f64,
        max: f64,
    },
}

impl ValueAdjustment {
    /// Apply the adjustment to one value
    fn apply(&self, value: f64) -> f64 {
        match *self {
            ValueAdjustment::None => value,
            ValueAdjustment::Clamp { min, max } => value.clamp(min, max),
            ValueAdjustment::Window { min, max } => {
                if value > min && value < max {
                    value
                } else {
                    f64::NAN
                }
            }
        }
    }
}

/// Adjust every finite value of a band
pub(super) fn adjust(band: &Raster<f64>, adjustment: &ValueAdjustment) -> Result<Raster<f64>> {
    if matches!(adjustment, ValueAdjustment::None) {
        return Ok(band.clone());
    }
    let (rows, cols) = band.shape();
    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let v = unsafe { band.get_unchecked(row, col) };
                if v.is_finite() {
                    *out = adjustment.apply(v);
                }
            }
            row_data
        })
        .collect();
    build_output(band, rows, cols, data)
}

// ---------------------------------------------------------------------------
// Normalized difference
// ---------------------------------------------------------------------------

/// Compute the normalized difference between two bands:
///
/// `(band_a - band_b) / (band_a + band_b)`
///
/// Result is in `[-1, 1]`; nodata inputs and zero sums come out NaN.
pub fn normalized_difference(band_a: &Raster<f64>, band_b: &Raster<f64>) -> Result<Raster<f64>> {
    combine2(band_a, band_b, |a, b| {
        let sum = a + b;
        if sum.abs() < 1e-10 {
            f64::NAN
        } else {
            (a - b) / sum
        }
    })
}

/// Normalized Difference Vegetation Index
///
/// `NDVI = (NIR - Red) / (NIR + Red)`
pub fn ndvi(nir: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(nir, red)
}

/// Normalized Difference Red Edge Index
///
/// `NDRE = (RedEdge3 - Red) / (RedEdge3 + Red)`
///
/// Uses the upper red-edge band against red, tracking chlorophyll in
/// mid-to-late growth stages where NDVI saturates.
pub fn ndre(red_edge3: &Raster<f64>, red: &Raster<f64>) -> Result<Raster<f64>> {
    normalized_difference(red_edge3, red)
}

// ---------------------------------------------------------------------------
// IRECI
// ---------------------------------------------------------------------------

/// Inverted Red-Edge Chlorophyll Index (Frampton et al., 2013)
///
/// `IRECI = (RedEdge3 - Red) / (RedEdge1 / RedEdge2)`
pub fn ireci(
    red_edge3: &Raster<f64>,
    red: &Raster<f64>,
    red_edge1: &Raster<f64>,
    red_edge2: &Raster<f64>,
) -> Result<Raster<f64>> {
    let slope = combine2(red_edge1, red_edge2, |re1, re2| {
        if re2.abs() < 1e-10 {
            f64::NAN
        } else {
            re1 / re2
        }
    })?;
    let difference = combine2(red_edge3, red, |re3, r| re3 - r)?;

    combine2(&difference, &slope, |d, s| {
        if s.abs() < 1e-10 {
            f64::NAN
        } else {
            d / s
        }
    })
}

// ---------------------------------------------------------------------------
// Cross-ratio
// ---------------------------------------------------------------------------

/// Radar cross-ratio in decibels.
///
/// Both polarisation bands arrive in dB. The ratio is computed through
/// the inverse logarithm (back to linear backscatter, divide, back to
/// dB), keeping results numerically comparable across processing
/// pipelines that work in either domain:
///
/// `CR_dB = 10 * log10( 10^(VH/10) / 10^(VV/10) )`
pub fn cross_ratio_db(vh: &Raster<f64>, vv: &Raster<f64>) -> Result<Raster<f64>> {
    combine2(vh, vv, |vh_db, vv_db| {
        let vh_lin = 10f64.powf(vh_db / 10.0);
        let vv_lin = 10f64.powf(vv_db / 10.0);
        if vv_lin.abs() < f64::MIN_POSITIVE {
            f64::NAN
        } else {
            10.0 * (vh_lin / vv_lin).log10()
        }
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Combine two bands per-pixel with `f`.
///
/// Nodata in either input yields NaN; `f` sees only finite values.
fn combine2<F>(band_a: &Raster<f64>, band_b: &Raster<f64>, f: F) -> Result<Raster<f64>>
where
    F: Fn(f64, f64) -> f64 + Sync,
{
    check_dimensions(band_a, band_b)?;

    let (rows, cols) = band_a.shape();
    let nodata_a = band_a.nodata();
    let nodata_b = band_b.nodata();

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let a = unsafe { band_a.get_unchecked(row, col) };
                let b = unsafe { band_b.get_unchecked(row, col) };

                if is_nodata_f64(a, nodata_a) || is_nodata_f64(b, nodata_b) {
                    continue;
                }

                *out = f(a, b);
            }
            row_data
        })
        .collect();

    build_output(band_a, rows, cols, data)
}

fn is_nodata_f64(value: f64, nodata: Option<f64>) -> bool {
    if value.is_nan() {
        return true;
    }
    match nodata {
        Some(nd) => (value - nd).abs() < f64::EPSILON,
        None => false,
    }
}

fn check_dimensions(a: &Raster<f64>, b: &Raster<f64>) -> Result<()> {
    if a.shape() != b.shape() {
        return Err(Error::SizeMismatch {
            er: a.rows(),
            ec: a.cols(),
            ar: b.rows(),
            ac: b.cols(),
        });
    }
    Ok(())
}

fn build_output(
    template: &Raster<f64>,
    rows: usize,
    cols: usize,
    data: Vec<f64>,
) -> Result<Raster<f64>> {
    let mut output = template.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use cosecha_core::GeoTransform;

    fn make_band(rows: usize, cols: usize, value: f64) -> Raster<f64> {
        let mut r = Raster::filled(rows, cols, value);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        r
    }

    fn make_gradient(rows: usize, cols: usize, start: f64, step: f64) -> Raster<f64> {
        let mut r = Raster::new(rows, cols);
        r.set_transform(GeoTransform::new(0.0, rows as f64, 1.0, -1.0));
        for row in 0..rows {
            for col in 0..cols {
                r.set(row, col, start + (row * cols + col) as f64 * step)
                    .unwrap();
            }
        }
        r
    }

    #[test]
    fn test_normalized_difference_basic() {
        let a = make_band(5, 5, 0.8);
        let b = make_band(5, 5, 0.2);

        let result = normalized_difference(&a, &b).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.8 - 0.2) / (0.8 + 0.2) = 0.6
        assert!((val - 0.6).abs() < 1e-10, "Expected 0.6, got {}", val);
    }

    #[test]
    fn test_ndvi_water_negative() {
        // Water: Red > NIR -> negative NDVI
        let nir = make_band(5, 5, 0.05);
        let red = make_band(5, 5, 0.15);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(2, 2).unwrap() < 0.0);
    }

    #[test]
    fn test_ndre() {
        let re3 = make_band(5, 5, 0.6);
        let red = make_band(5, 5, 0.2);

        let result = ndre(&re3, &red).unwrap();
        let val = result.get(2, 2).unwrap();

        let expected = (0.6 - 0.2) / (0.6 + 0.2);
        assert!(
            (val - expected).abs() < 1e-10,
            "Expected {}, got {}",
            expected,
            val
        );
    }

    #[test]
    fn test_ireci() {
        let re3 = make_band(5, 5, 0.5);
        let red = make_band(5, 5, 0.1);
        let re1 = make_band(5, 5, 0.2);
        let re2 = make_band(5, 5, 0.4);

        let result = ireci(&re3, &red, &re1, &re2).unwrap();
        let val = result.get(2, 2).unwrap();

        // (0.5 - 0.1) / (0.2 / 0.4) = 0.4 / 0.5 = 0.8
        assert!((val - 0.8).abs() < 1e-10, "Expected 0.8, got {}", val);
    }

    #[test]
    fn test_ireci_zero_red_edge2() {
        let re3 = make_band(3, 3, 0.5);
        let red = make_band(3, 3, 0.1);
        let re1 = make_band(3, 3, 0.2);
        let re2 = make_band(3, 3, 0.0);

        let result = ireci(&re3, &red, &re1, &re2).unwrap();
        assert!(result.get(1, 1).unwrap().is_nan());
    }

    #[test]
    fn test_cross_ratio_identity() {
        // CR_dB must equal VH_dB - VV_dB regardless of the inverse-log
        // round trip, across a spread of realistic backscatter values
        let vh = make_gradient(10, 10, -25.0, 0.17);
        let vv = make_gradient(10, 10, -18.0, 0.11);

        let result = cross_ratio_db(&vh, &vv).unwrap();

        for row in 0..10 {
            for col in 0..10 {
                let cr = result.get(row, col).unwrap();
                let expected = vh.get(row, col).unwrap() - vv.get(row, col).unwrap();
                assert!(
                    (cr - expected).abs() < 1e-6,
                    "CR {} != VH - VV {} at ({}, {})",
                    cr,
                    expected,
                    row,
                    col
                );
            }
        }
    }

    #[test]
    fn test_cross_ratio_value() {
        let vh = make_band(3, 3, -20.0);
        let vv = make_band(3, 3, -12.0);

        let result = cross_ratio_db(&vh, &vv).unwrap();
        let val = result.get(1, 1).unwrap();
        assert!((val + 8.0).abs() < 1e-9, "Expected -8 dB, got {}", val);
    }

    #[test]
    fn test_clamp_adjustment() {
        let band = make_gradient(3, 3, 0.0, 0.12); // 0.0 .. 0.96
        let adjusted = adjust(
            &band,
            &ValueAdjustment::Clamp { min: 0.1, max: 0.8 },
        )
        .unwrap();

        assert!((adjusted.get(0, 0).unwrap() - 0.1).abs() < 1e-10);
        assert!((adjusted.get(2, 2).unwrap() - 0.8).abs() < 1e-10);
        assert!((adjusted.get(1, 1).unwrap() - 0.48).abs() < 1e-10);
    }

    #[test]
    fn test_window_adjustment() {
        let band = make_gradient(3, 3, 0.0, 0.12);
        let adjusted = adjust(
            &band,
            &ValueAdjustment::Window { min: 0.1, max: 0.9 },
        )
        .unwrap();

        // 0.0 is outside the open window
        assert!(adjusted.get(0, 0).unwrap().is_nan());
        assert!((adjusted.get(1, 1).unwrap() - 0.48).abs() < 1e-10);
    }

    #[test]
    fn test_nodata_propagation() {
        let mut nir = make_band(5, 5, 0.5);
        nir.set_nodata(Some(-9999.0));
        nir.set(2, 2, -9999.0).unwrap();

        let red = make_band(5, 5, 0.1);

        let result = ndvi(&nir, &red).unwrap();
        assert!(result.get(2, 2).unwrap().is_nan());
    }

    #[test]
    fn test_dimension_mismatch() {
        let a = make_band(5, 5, 1.0);
        let b = make_band(5, 10, 1.0);
        assert!(normalized_difference(&a, &b).is_err());
    }
}
