//! # Cosecha Core
//!
//! Core types for the cosecha crop-monitoring library.
//!
//! This crate provides:
//! - `Raster<T>`: generic raster grid type
//! - `GeoTransform`: affine transformation for georeferencing
//! - `Scene`: a multi-band satellite acquisition with timestamp and metadata
//! - `Companion`: an auxiliary cloud-probability raster keyed to a scene
//! - `Parcel`: a cultivated polygon with per-harvest-year production figures

pub mod error;
pub mod raster;
pub mod scene;
pub mod vector;

pub use error::{Error, Result};
pub use raster::{GeoTransform, Neighborhood, Raster, RasterElement};
pub use scene::{Companion, Scene, SceneMeta};
pub use vector::{AttributeValue, Parcel};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{GeoTransform, Neighborhood, Raster, RasterElement};
    pub use crate::scene::{Companion, Scene, SceneMeta};
    pub use crate::vector::{AttributeValue, Parcel};
}
