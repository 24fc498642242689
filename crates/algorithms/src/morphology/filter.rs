//! Shared kernel-extreme filter backing erosion and dilation

use ndarray::Array2;

use crate::maybe_rayon::*;
use cosecha_core::raster::{Raster, RasterElement};
use cosecha_core::{Error, Result};

use super::element::StructuringElement;

/// Which extreme the kernel picks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Extreme {
    Min,
    Max,
}

/// Replace each cell with the minimum or maximum finite value inside the
/// structuring element.
///
/// The kernel is clamped at the raster boundary (only the in-bounds part
/// contributes) and nodata neighbors are skipped. A cell whose entire
/// window is nodata stays NaN.
pub(super) fn kernel_extreme(
    raster: &Raster<f64>,
    element: &StructuringElement,
    extreme: Extreme,
) -> Result<Raster<f64>> {
    element.validate()?;

    let (rows, cols) = raster.shape();
    let nodata = raster.nodata();
    let offsets = element.offsets();

    let output_data: Vec<f64> = (0..rows)
        .into_par_iter()
        .flat_map(|row| {
            let mut row_data = vec![f64::NAN; cols];

            for (col, out) in row_data.iter_mut().enumerate() {
                let mut best = f64::NAN;

                for &(dr, dc) in &offsets {
                    let nr = row as isize + dr;
                    let nc = col as isize + dc;
                    if nr < 0 || nc < 0 || nr >= rows as isize || nc >= cols as isize {
                        continue;
                    }

                    let v = unsafe { raster.get_unchecked(nr as usize, nc as usize) };
                    if v.is_nodata(nodata) {
                        continue;
                    }

                    let better = match extreme {
                        Extreme::Min => v < best,
                        Extreme::Max => v > best,
                    };
                    if best.is_nan() || better {
                        best = v;
                    }
                }

                *out = best;
            }

            row_data
        })
        .collect();

    let mut output = raster.with_same_meta::<f64>(rows, cols);
    output.set_nodata(Some(f64::NAN));
    *output.data_mut() = Array2::from_shape_vec((rows, cols), output_data)
        .map_err(|e| Error::Other(e.to_string()))?;
    Ok(output)
}
