//! Neighborhood patterns for kernel operations

/// Defines a neighborhood pattern around a cell.
///
/// `Circle` takes a fractional radius in cells: the cloud-shadow
/// smoothing erodes with a 1.5-cell circular kernel, which covers the
/// full 3x3 block while a 1.0-cell circle covers only the cardinal arms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Neighborhood {
    /// Square neighborhood of given radius (side = 2*radius + 1)
    Square(usize),
    /// Circular neighborhood of given fractional radius (in cells)
    Circle(f64),
}

impl Neighborhood {
    /// Get the integer radius bounding the neighborhood
    pub fn radius(&self) -> usize {
        match self {
            Neighborhood::Square(r) => *r,
            Neighborhood::Circle(r) => r.floor().max(0.0) as usize,
        }
    }

    /// Check if a relative position is within this neighborhood
    pub fn contains(&self, dr: isize, dc: isize) -> bool {
        match self {
            Neighborhood::Square(r) => {
                let r = *r as isize;
                dr.abs() <= r && dc.abs() <= r
            }
            Neighborhood::Circle(r) => {
                let dist_sq = (dr * dr + dc * dc) as f64;
                dist_sq <= r * r
            }
        }
    }

    /// Enumerate relative positions (dr, dc) in this neighborhood
    pub fn offsets(&self) -> Vec<(isize, isize)> {
        let r = self.radius() as isize;
        let mut offsets = Vec::new();

        for dr in -r..=r {
            for dc in -r..=r {
                if self.contains(dr, dc) {
                    offsets.push((dr, dc));
                }
            }
        }

        offsets
    }
}
