//! Cloud and cloud-shadow masking
//!
//! Two-stage pipeline over a scene and its companion cloud-probability
//! raster:
//!
//! 1. **shadow**: geometric projection of cloud shadows from solar
//!    illumination angles over a range of candidate cloud heights,
//!    gated by dark-pixel plausibility (after Schmitt et al., 2019)
//! 2. **composite**: morphological smoothing of the shadow score,
//!    thresholding of both probability surfaces, and composition into a
//!    boolean inclusion mask

mod composite;
mod shadow;

pub use composite::{
    apply_mask, cloud_shadow_mask, inclusion_mask, smooth_score, MaskParams,
};
pub use shadow::{project_shadows, CloudHeights, ShadowParams};
