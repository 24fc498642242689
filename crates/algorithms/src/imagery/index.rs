//! Scene-level index dispatch

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use cosecha_core::raster::Raster;
use cosecha_core::{Result, Scene};

use super::indices::{adjust, cross_ratio_db, ireci, ndre, ndvi, ValueAdjustment};

/// The index to compute over each scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexKind {
    /// Radar cross-ratio VH/VV in dB
    CrossRatio,
    /// Normalized Difference Vegetation Index
    Ndvi,
    /// Normalized Difference Red Edge Index
    Ndre,
    /// Inverted Red-Edge Chlorophyll Index
    Ireci,
}

impl IndexKind {
    /// Band name for the derived band
    pub fn band_name(&self) -> &'static str {
        match self {
            IndexKind::CrossRatio => "CR",
            IndexKind::Ndvi => "NDVI",
            IndexKind::Ndre => "NDRE",
            IndexKind::Ireci => "IRECI",
        }
    }

    /// Whether the index reads radar polarisations rather than optical
    /// reflectance (radar scenes carry no cloud companion)
    pub fn is_radar(&self) -> bool {
        matches!(self, IndexKind::CrossRatio)
    }
}

/// Mapping from formula roles to the band names actually present in the
/// scenes. Defaults follow Sentinel-2 (B4/B5/B6/B7/B8) and Sentinel-1
/// (VH/VV) naming.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BandMap {
    pub nir: String,
    pub red: String,
    pub red_edge1: String,
    pub red_edge2: String,
    pub red_edge3: String,
    pub vh: String,
    pub vv: String,
}

impl Default for BandMap {
    fn default() -> Self {
        Self {
            nir: "B8".to_string(),
            red: "B4".to_string(),
            red_edge1: "B5".to_string(),
            red_edge2: "B6".to_string(),
            red_edge3: "B7".to_string(),
            vh: "VH".to_string(),
            vv: "VV".to_string(),
        }
    }
}

/// Compute the selected index band for a scene.
pub fn compute_index(
    scene: &Scene,
    kind: IndexKind,
    bands: &BandMap,
    adjustment: &ValueAdjustment,
) -> Result<Raster<f64>> {
    let band = match kind {
        IndexKind::CrossRatio => cross_ratio_db(scene.band(&bands.vh)?, scene.band(&bands.vv)?)?,
        IndexKind::Ndvi => ndvi(scene.band(&bands.nir)?, scene.band(&bands.red)?)?,
        IndexKind::Ndre => ndre(scene.band(&bands.red_edge3)?, scene.band(&bands.red)?)?,
        IndexKind::Ireci => ireci(
            scene.band(&bands.red_edge3)?,
            scene.band(&bands.red)?,
            scene.band(&bands.red_edge1)?,
            scene.band(&bands.red_edge2)?,
        )?,
    };
    adjust(&band, adjustment)
}

/// Compute the selected index and wrap it in a derived single-band
/// scene (keeps id, timestamp, product id per the metadata contract).
pub fn derive_scene(
    scene: &Scene,
    kind: IndexKind,
    bands: &BandMap,
    adjustment: &ValueAdjustment,
) -> Result<Scene> {
    let band = compute_index(scene, kind, bands, adjustment)?;
    let mut derived = BTreeMap::new();
    derived.insert(kind.band_name().to_string(), band);
    Ok(scene.derive(derived))
}
