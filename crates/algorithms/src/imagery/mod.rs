//! Vegetation and radar indices
//!
//! Per-pixel band algebra producing one derived band per scene:
//! - **NDVI** `(NIR - RED)/(NIR + RED)` with optional clamp or quality window
//! - **NDRE** `(RE3 - RED)/(RE3 + RED)`
//! - **IRECI** `(RE3 - RED)/(RE1/RE2)`
//! - **CR** cross-ratio of two radar polarisations in dB

mod index;
mod indices;

pub use index::{compute_index, derive_scene, BandMap, IndexKind};
pub use indices::{
    cross_ratio_db, ireci, ndre, ndvi, normalized_difference, ValueAdjustment,
};
