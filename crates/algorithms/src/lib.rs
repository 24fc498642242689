//! # Cosecha Algorithms
//!
//! Pure raster transforms for the cosecha crop-monitoring pipeline:
//!
//! - **morphology**: erosion, dilation, structuring elements
//! - **masking**: cloud-shadow projection and inclusion-mask composition
//! - **imagery**: spectral and radar indices (NDVI, NDRE, IRECI, CR)
//! - **statistics**: geometry masking and zonal reduction
//!
//! All transforms are pure functions of their inputs and parameters;
//! per-image pipelines compose them without shared state, so whole
//! scenes can be processed concurrently.

mod maybe_rayon;

pub mod imagery;
pub mod masking;
pub mod morphology;
pub mod statistics;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::imagery::{
        compute_index, cross_ratio_db, derive_scene, ireci, ndre, ndvi, normalized_difference,
        BandMap, IndexKind, ValueAdjustment,
    };
    pub use crate::masking::{
        apply_mask, cloud_shadow_mask, inclusion_mask, project_shadows, smooth_score,
        CloudHeights, MaskParams, ShadowParams,
    };
    pub use crate::morphology::{dilate, erode, StructuringElement};
    pub use crate::statistics::{
        clip_to_geometry, geometry_mask, zonal_reduce, ReduceStatistic,
    };
    pub use cosecha_core::prelude::*;
}
