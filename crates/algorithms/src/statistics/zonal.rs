//! Zonal statistics over integer zones and vector geometries

use std::collections::HashMap;

use geo::{BoundingRect, Contains};
use geo_types::{MultiPolygon, Point};
use ndarray::Array2;

use serde::{Deserialize, Serialize};

use crate::maybe_rayon::*;
use cosecha_core::raster::{GeoTransform, Raster};
use cosecha_core::{Error, Result};

/// Reduction statistic for a zonal aggregation.
///
/// Mean is the default; Median is more robust to residual cloud
/// contamination that survives masking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ReduceStatistic {
    #[default]
    Mean,
    Median,
    Sum,
    Max,
}

/// Summary statistics for one zone
#[derive(Debug, Clone)]
pub struct ZoneSummary {
    pub zone_id: i32,
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

impl ZoneSummary {
    /// Pick one statistic out of the summary
    pub fn statistic(&self, statistic: ReduceStatistic) -> f64 {
        match statistic {
            ReduceStatistic::Mean => self.mean,
            ReduceStatistic::Median => self.median,
            ReduceStatistic::Sum => self.sum,
            ReduceStatistic::Max => self.max,
        }
    }
}

/// Compute summary statistics for each zone of an integer zone raster.
///
/// Zone 0 is the background and is skipped, as are NaN values.
pub fn zonal_statistics(
    values: &Raster<f64>,
    zones: &Raster<i32>,
) -> Result<HashMap<i32, ZoneSummary>> {
    let (rows_v, cols_v) = values.shape();
    let (rows_z, cols_z) = zones.shape();

    if rows_v != rows_z || cols_v != cols_z {
        return Err(Error::SizeMismatch {
            er: rows_v,
            ec: cols_v,
            ar: rows_z,
            ac: cols_z,
        });
    }

    // Collect values per zone
    let mut zone_values: HashMap<i32, Vec<f64>> = HashMap::new();

    for row in 0..rows_v {
        for col in 0..cols_v {
            let zone = unsafe { zones.get_unchecked(row, col) };
            let val = unsafe { values.get_unchecked(row, col) };

            if zone == 0 || val.is_nan() {
                continue;
            }

            zone_values.entry(zone).or_default().push(val);
        }
    }

    let mut results = HashMap::new();

    for (zone_id, mut vals) in zone_values {
        if vals.is_empty() {
            continue;
        }

        let count = vals.len();
        let sum: f64 = vals.iter().sum();
        let mean = sum / count as f64;

        vals.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let min = vals[0];
        let max = vals[count - 1];

        let median = if count % 2 == 0 {
            (vals[count / 2 - 1] + vals[count / 2]) / 2.0
        } else {
            vals[count / 2]
        };

        results.insert(
            zone_id,
            ZoneSummary {
                zone_id,
                count,
                sum,
                mean,
                min,
                max,
                median,
            },
        );
    }

    Ok(results)
}

/// Rasterize a geometry to a zone raster: 1 where the pixel center lies
/// strictly inside the geometry, 0 elsewhere.
///
/// Pixel centers exactly on the boundary are excluded.
pub fn geometry_mask(
    rows: usize,
    cols: usize,
    transform: &GeoTransform,
    geometry: &MultiPolygon<f64>,
) -> Raster<i32> {
    let mut zones: Raster<i32> = Raster::new(rows, cols);
    zones.set_transform(*transform);

    let bbox = match geometry.bounding_rect() {
        Some(rect) => rect,
        None => return zones,
    };

    let data: Vec<i32> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![0i32; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                let (x, y) = transform.pixel_to_geo(col, row);
                if x < bbox.min().x || x > bbox.max().x || y < bbox.min().y || y > bbox.max().y {
                    continue;
                }
                if geometry.contains(&Point::new(x, y)) {
                    *out = 1;
                }
            }
            row_data
        })
        .collect();

    if let Ok(array) = Array2::from_shape_vec((rows, cols), data) {
        *zones.data_mut() = array;
    }
    zones
}

/// Clip a band to a geometry: pixels whose centers fall outside become
/// NaN.
pub fn clip_to_geometry(band: &Raster<f64>, geometry: &MultiPolygon<f64>) -> Result<Raster<f64>> {
    let (rows, cols) = band.shape();
    let zones = geometry_mask(rows, cols, band.transform(), geometry);

    let data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];
            for (col, out) in row_data.iter_mut().enumerate() {
                if unsafe { zones.get_unchecked(row, col) } == 1 {
                    *out = unsafe { band.get_unchecked(row, col) };
                }
            }
            row_data
        })
        .collect();

    let mut output = band.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() =
        Array2::from_shape_vec((rows, cols), data).map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}

/// Reduce a band to one scalar over a geometry.
///
/// Returns `None` when no finite pixel center lies inside the geometry;
/// the caller decides whether that is a skip or an error.
pub fn zonal_reduce(
    band: &Raster<f64>,
    geometry: &MultiPolygon<f64>,
    statistic: ReduceStatistic,
) -> Result<Option<f64>> {
    let (rows, cols) = band.shape();
    let zones = geometry_mask(rows, cols, band.transform(), geometry);
    let summaries = zonal_statistics(band, &zones)?;

    Ok(summaries.get(&1).map(|summary| summary.statistic(statistic)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    fn square_geometry(x0: f64, y0: f64, side: f64) -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (x0, y0),
                (x0 + side, y0),
                (x0 + side, y0 + side),
                (x0, y0 + side),
                (x0, y0),
            ]),
            vec![],
        )])
    }

    /// 10x10 grid of 10 m cells with origin at (0, 100), north-up
    fn make_band(value: f64) -> Raster<f64> {
        let mut r = Raster::filled(10, 10, value);
        r.set_transform(GeoTransform::new(0.0, 100.0, 10.0, -10.0));
        r
    }

    #[test]
    fn test_zonal_statistics_two_zones() {
        let mut values = Raster::new(4, 4);
        let mut zones: Raster<i32> = Raster::new(4, 4);

        for row in 0..4 {
            for col in 0..4 {
                values.set(row, col, (row * 4 + col) as f64).unwrap();
                zones.set(row, col, if col < 2 { 1 } else { 2 }).unwrap();
            }
        }

        let results = zonal_statistics(&values, &zones).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results.get(&1).unwrap().count, 8);
        assert_eq!(results.get(&2).unwrap().count, 8);
    }

    #[test]
    fn test_zonal_statistics_skips_nan() {
        let mut values = Raster::filled(3, 3, 5.0);
        values.set(1, 1, f64::NAN).unwrap();
        let zones: Raster<i32> = Raster::filled(3, 3, 1);

        let results = zonal_statistics(&values, &zones).unwrap();
        assert_eq!(results.get(&1).unwrap().count, 8);
    }

    #[test]
    fn test_geometry_mask_covers_interior_centers() {
        let band = make_band(1.0);
        // Covers map x in [0, 40], y in [60, 100]: pixel centers at
        // x = 5..35, y = 65..95 -> cols 0..4, rows 0..4
        let geom = square_geometry(0.0, 60.0, 40.0);

        let zones = geometry_mask(10, 10, band.transform(), &geom);
        let inside: usize = zones.data().iter().filter(|&&z| z == 1).count();
        assert_eq!(inside, 16);
        assert_eq!(zones.get(0, 0).unwrap(), 1);
        assert_eq!(zones.get(4, 4).unwrap(), 0);
    }

    #[test]
    fn test_clip_blanks_outside() {
        let band = make_band(3.0);
        let geom = square_geometry(0.0, 60.0, 40.0);

        let clipped = clip_to_geometry(&band, &geom).unwrap();
        assert!((clipped.get(1, 1).unwrap() - 3.0).abs() < 1e-10);
        assert!(clipped.get(8, 8).unwrap().is_nan());
    }

    #[test]
    fn test_reduce_mean_and_median() {
        let mut band = make_band(2.0);
        band.set(0, 0, 10.0).unwrap(); // inside the geometry

        let geom = square_geometry(0.0, 60.0, 40.0);

        let mean = zonal_reduce(&band, &geom, ReduceStatistic::Mean)
            .unwrap()
            .unwrap();
        // 15 cells of 2.0 and one of 10.0
        let expected = (15.0 * 2.0 + 10.0) / 16.0;
        assert!((mean - expected).abs() < 1e-10);

        let median = zonal_reduce(&band, &geom, ReduceStatistic::Median)
            .unwrap()
            .unwrap();
        assert!((median - 2.0).abs() < 1e-10);

        let max = zonal_reduce(&band, &geom, ReduceStatistic::Max)
            .unwrap()
            .unwrap();
        assert!((max - 10.0).abs() < 1e-10);
    }

    #[test]
    fn test_reduce_no_data_is_none() {
        // Geometry entirely off the grid
        let band = make_band(1.0);
        let geom = square_geometry(500.0, 500.0, 40.0);

        let result = zonal_reduce(&band, &geom, ReduceStatistic::Mean).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_reduce_all_masked_is_none() {
        // Geometry covers cells, but every covered cell is NaN
        let mut band = make_band(f64::NAN);
        band.set_nodata(Some(f64::NAN));
        band.set(8, 8, 1.0).unwrap(); // finite, but outside the geometry
        let geom = square_geometry(0.0, 60.0, 40.0);

        let result = zonal_reduce(&band, &geom, ReduceStatistic::Mean).unwrap();
        assert!(result.is_none());
    }
}
