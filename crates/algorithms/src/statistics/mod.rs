//! Zonal statistics
//!
//! Reduction of raster values over zones, where a zone is either an
//! integer zone raster or a vector geometry rasterized by pixel-center
//! containment.

mod zonal;

pub use zonal::{
    clip_to_geometry, geometry_mask, zonal_reduce, zonal_statistics, ReduceStatistic, ZoneSummary,
};
