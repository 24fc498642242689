//! Satellite scenes and companion rasters
//!
//! A `Scene` is one satellite acquisition: named reflectance or
//! backscatter bands on a shared grid, an acquisition timestamp, and
//! scalar metadata. Scenes are immutable values; every transform
//! produces a new `Scene`, which keeps per-image processing free of
//! shared mutable state under concurrency.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster};
use crate::vector::AttributeValue;

/// Scalar metadata attached to a scene.
///
/// The typed fields are the ones the processing pipeline reads; the
/// `properties` map carries opaque acquisition attributes (orbit pass,
/// instrument mode, resolution class) that only source filter
/// predicates interpret.
#[derive(Debug, Clone, Default)]
pub struct SceneMeta {
    /// Mean solar azimuth angle in degrees
    pub solar_azimuth: Option<f64>,
    /// Mean solar zenith angle in degrees
    pub solar_zenith: Option<f64>,
    /// Catalog product identifier
    pub product_id: Option<String>,
    /// Opaque acquisition attributes
    pub properties: HashMap<String, AttributeValue>,
}

/// One satellite acquisition: named bands, timestamp, metadata.
#[derive(Debug, Clone)]
pub struct Scene {
    id: String,
    timestamp: DateTime<Utc>,
    bands: BTreeMap<String, Raster<f64>>,
    meta: SceneMeta,
}

impl Scene {
    /// Create an empty scene
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            bands: BTreeMap::new(),
            meta: SceneMeta::default(),
        }
    }

    /// Add a band, consuming and returning the scene.
    ///
    /// All bands of a scene must share one grid shape.
    pub fn with_band(mut self, name: impl Into<String>, band: Raster<f64>) -> Result<Self> {
        if let Some((rows, cols)) = self.shape() {
            if band.shape() != (rows, cols) {
                return Err(Error::SizeMismatch {
                    er: rows,
                    ec: cols,
                    ar: band.rows(),
                    ac: band.cols(),
                });
            }
        }
        self.bands.insert(name.into(), band);
        Ok(self)
    }

    /// Attach metadata, consuming and returning the scene
    pub fn with_meta(mut self, meta: SceneMeta) -> Self {
        self.meta = meta;
        self
    }

    /// Scene identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Acquisition timestamp
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Scene metadata
    pub fn meta(&self) -> &SceneMeta {
        &self.meta
    }

    /// All bands keyed by name
    pub fn bands(&self) -> &BTreeMap<String, Raster<f64>> {
        &self.bands
    }

    /// Look up a band by name
    pub fn band(&self, name: &str) -> Result<&Raster<f64>> {
        self.bands.get(name).ok_or_else(|| Error::MissingBand {
            scene: self.id.clone(),
            name: name.to_string(),
        })
    }

    /// Grid shape shared by all bands, or None for an empty scene
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.bands.values().next().map(|b| b.shape())
    }

    /// Geotransform shared by all bands, or None for an empty scene
    pub fn transform(&self) -> Option<&GeoTransform> {
        self.bands.values().next().map(|b| b.transform())
    }

    /// Solar azimuth in degrees, required by shadow projection
    pub fn solar_azimuth(&self) -> Result<f64> {
        self.meta.solar_azimuth.ok_or(Error::MissingMetadata {
            scene: self.id.clone(),
            field: "solar_azimuth",
        })
    }

    /// Solar zenith in degrees, required by shadow projection
    pub fn solar_zenith(&self) -> Result<f64> {
        self.meta.solar_zenith.ok_or(Error::MissingMetadata {
            scene: self.id.clone(),
            field: "solar_zenith",
        })
    }

    /// Derive a new scene from this one with a replaced band set.
    ///
    /// Metadata-propagation contract: keeps `id`, `timestamp` and
    /// `product_id`; solar geometry and acquisition properties are
    /// dropped because they describe the source acquisition, not the
    /// derived product.
    pub fn derive(&self, bands: BTreeMap<String, Raster<f64>>) -> Scene {
        Scene {
            id: self.id.clone(),
            timestamp: self.timestamp,
            bands,
            meta: SceneMeta {
                product_id: self.meta.product_id.clone(),
                ..SceneMeta::default()
            },
        }
    }

    /// Apply a per-band transform, keeping the full metadata.
    ///
    /// Used for masking: the pixels change but the acquisition (and its
    /// illumination geometry) stays the same.
    pub fn map_bands<F>(&self, mut f: F) -> Result<Scene>
    where
        F: FnMut(&str, &Raster<f64>) -> Result<Raster<f64>>,
    {
        let mut bands = BTreeMap::new();
        for (name, band) in &self.bands {
            bands.insert(name.clone(), f(name, band)?);
        }
        Ok(Scene {
            id: self.id.clone(),
            timestamp: self.timestamp,
            bands,
            meta: self.meta.clone(),
        })
    }
}

/// Auxiliary cloud-probability raster associated with a scene by key.
///
/// The probability band is in `[0, 100]`. The association is weak: a
/// companion is looked up by matching id or timestamp, never merged
/// into the scene's band set.
#[derive(Debug, Clone)]
pub struct Companion {
    id: String,
    timestamp: DateTime<Utc>,
    probability: Raster<f64>,
}

impl Companion {
    pub fn new(id: impl Into<String>, timestamp: DateTime<Utc>, probability: Raster<f64>) -> Self {
        Self {
            id: id.into(),
            timestamp,
            probability,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Cloud probability band, `[0, 100]`
    pub fn probability(&self) -> &Raster<f64> {
        &self.probability
    }
}
