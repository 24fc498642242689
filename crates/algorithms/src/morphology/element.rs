//! Structuring element definitions for morphological operations

use cosecha_core::raster::Neighborhood;
use cosecha_core::{Error, Result};

/// Shape of a structuring element for morphological operations.
///
/// `Disk` takes a fractional radius in cells, matching the circular
/// focal kernels of the shadow-mask smoothing (erode 1.5 px, dilate
/// 3 px).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StructuringElement {
    /// Square element of given radius (side = 2*radius + 1)
    Square(usize),
    /// Disk element of given fractional radius
    Disk(f64),
}

impl Default for StructuringElement {
    fn default() -> Self {
        StructuringElement::Square(1)
    }
}

impl StructuringElement {
    /// Validate the structuring element
    pub fn validate(&self) -> Result<()> {
        match self {
            StructuringElement::Square(r) => {
                if *r == 0 {
                    return Err(Error::InvalidParameter {
                        name: "radius",
                        value: "0".to_string(),
                        reason: "structuring element radius must be at least 1".to_string(),
                    });
                }
                Ok(())
            }
            StructuringElement::Disk(r) => {
                if !(*r >= 1.0) {
                    return Err(Error::InvalidParameter {
                        name: "radius",
                        value: r.to_string(),
                        reason: "disk radius must be at least 1 cell".to_string(),
                    });
                }
                Ok(())
            }
        }
    }

    /// Compute (dr, dc) offsets relative to center for all active cells
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        match self {
            StructuringElement::Square(r) => Neighborhood::Square(*r).offsets(),
            StructuringElement::Disk(r) => Neighborhood::Circle(*r).offsets(),
        }
    }
}
