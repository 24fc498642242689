//! External data source interfaces
//!
//! The pipeline never fetches anything itself: scenes, companion
//! rasters and parcels arrive through these traits. Production
//! deployments back them with a catalog client; tests and the demo use
//! the in-memory implementations in [`crate::memory`].

use chrono::{DateTime, Utc};
use geo_types::MultiPolygon;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cosecha_core::{AttributeValue, Companion, Parcel, Scene};

/// Failure reported by a data source
#[derive(Debug, Error)]
#[error("source error: {0}")]
pub struct SourceError(pub String);

/// Key for companion lookup: the same identifier scheme as scenes, or
/// exact acquisition-timestamp equality
#[derive(Debug, Clone, PartialEq)]
pub enum CompanionKey {
    Id(String),
    Timestamp(DateTime<Utc>),
}

/// Opaque attribute predicate evaluated by a raster source.
///
/// Predicates select acquisitions by catalog attributes the core never
/// interprets: instrument mode, resolution class, orbit pass,
/// polarisation lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterPredicate {
    /// Attribute equals the given value
    Equals(String, AttributeValue),
    /// List-valued attribute contains the given string
    ListContains(String, String),
    /// Numeric attribute is below the given bound
    LessThan(String, f64),
}

impl FilterPredicate {
    /// Evaluate the predicate against a scene's opaque properties
    pub fn matches(&self, scene: &Scene) -> bool {
        let properties = &scene.meta().properties;
        match self {
            FilterPredicate::Equals(field, expected) => {
                properties.get(field) == Some(expected)
            }
            FilterPredicate::ListContains(field, needle) => properties
                .get(field)
                .map_or(false, |value| value.list_contains(needle)),
            FilterPredicate::LessThan(field, bound) => match properties.get(field) {
                Some(AttributeValue::Float(value)) => value < bound,
                Some(AttributeValue::Int(value)) => (*value as f64) < *bound,
                _ => false,
            },
        }
    }
}

/// Source of primary scenes.
pub trait RasterSource: Send + Sync {
    /// Scenes intersecting `bounds` with timestamp in the half-open
    /// window `[window.0, window.1)`, matching every filter predicate,
    /// ordered by acquisition time.
    fn query(
        &self,
        bounds: &MultiPolygon<f64>,
        window: (DateTime<Utc>, DateTime<Utc>),
        filters: &[FilterPredicate],
    ) -> std::result::Result<Vec<Scene>, SourceError>;
}

/// Source of companion cloud-probability rasters.
pub trait CompanionSource: Send + Sync {
    /// All companions matching the key. The joiner enforces that
    /// exactly one exists; returning every match lets it distinguish
    /// a missing companion from an ambiguous one.
    fn matches(&self, key: &CompanionKey)
        -> std::result::Result<Vec<Companion>, SourceError>;
}

/// Read-only store of the holding's parcels.
pub trait ParcelStore: Send + Sync {
    fn parcels(&self) -> std::result::Result<Vec<Parcel>, SourceError>;
}
