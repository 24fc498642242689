//! In-memory source implementations
//!
//! Back the integration tests and the synthetic demo; a production
//! deployment supplies catalog-backed implementations of the same
//! traits.

use chrono::{DateTime, Utc};
use geo::BoundingRect;
use geo_types::MultiPolygon;

use cosecha_core::{Companion, Parcel, Scene};

use crate::sources::{
    CompanionKey, CompanionSource, FilterPredicate, ParcelStore, RasterSource, SourceError,
};

/// Scene source over a fixed in-memory collection
#[derive(Debug, Default)]
pub struct MemoryRasterSource {
    scenes: Vec<Scene>,
}

impl MemoryRasterSource {
    pub fn new(scenes: Vec<Scene>) -> Self {
        Self { scenes }
    }
}

impl RasterSource for MemoryRasterSource {
    fn query(
        &self,
        bounds: &MultiPolygon<f64>,
        window: (DateTime<Utc>, DateTime<Utc>),
        filters: &[FilterPredicate],
    ) -> Result<Vec<Scene>, SourceError> {
        let bbox = bounds.bounding_rect();

        let mut selected: Vec<Scene> = self
            .scenes
            .iter()
            .filter(|scene| scene.timestamp() >= window.0 && scene.timestamp() < window.1)
            .filter(|scene| match (&bbox, scene.transform(), scene.shape()) {
                (Some(rect), Some(transform), Some((rows, cols))) => {
                    let (min_x, min_y, max_x, max_y) = transform.bounds(cols, rows);
                    rect.min().x <= max_x
                        && rect.max().x >= min_x
                        && rect.min().y <= max_y
                        && rect.max().y >= min_y
                }
                _ => false,
            })
            .filter(|scene| filters.iter().all(|predicate| predicate.matches(scene)))
            .cloned()
            .collect();

        selected.sort_by_key(|scene| scene.timestamp());
        Ok(selected)
    }
}

/// Companion source over a fixed in-memory collection
#[derive(Debug, Default)]
pub struct MemoryCompanionSource {
    companions: Vec<Companion>,
}

impl MemoryCompanionSource {
    pub fn new(companions: Vec<Companion>) -> Self {
        Self { companions }
    }
}

impl CompanionSource for MemoryCompanionSource {
    fn matches(&self, key: &CompanionKey) -> Result<Vec<Companion>, SourceError> {
        let matches = self
            .companions
            .iter()
            .filter(|companion| match key {
                CompanionKey::Id(id) => companion.id() == id,
                CompanionKey::Timestamp(timestamp) => companion.timestamp() == *timestamp,
            })
            .cloned()
            .collect();
        Ok(matches)
    }
}

/// Parcel store over a fixed in-memory collection
#[derive(Debug, Default)]
pub struct MemoryParcelStore {
    parcels: Vec<Parcel>,
}

impl MemoryParcelStore {
    pub fn new(parcels: Vec<Parcel>) -> Self {
        Self { parcels }
    }
}

impl ParcelStore for MemoryParcelStore {
    fn parcels(&self) -> Result<Vec<Parcel>, SourceError> {
        Ok(self.parcels.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use cosecha_core::{GeoTransform, Raster};
    use geo_types::{LineString, Polygon};

    fn ts(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 10, 30, 0).unwrap()
    }

    fn scene(id: &str, timestamp: DateTime<Utc>) -> Scene {
        let mut band = Raster::filled(4, 4, 0.5);
        band.set_transform(GeoTransform::new(0.0, 80.0, 20.0, -20.0));
        Scene::new(id, timestamp).with_band("B4", band).unwrap()
    }

    fn aoi() -> MultiPolygon<f64> {
        MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (80.0, 0.0),
                (80.0, 80.0),
                (0.0, 80.0),
                (0.0, 0.0),
            ]),
            vec![],
        )])
    }

    #[test]
    fn test_query_window_is_half_open() {
        let start = ts(2015, 10, 1);
        let end = ts(2016, 8, 1);
        let source = MemoryRasterSource::new(vec![
            scene("a", start),
            scene("b", ts(2016, 3, 14)),
            scene("c", end),
        ]);

        let scenes = source.query(&aoi(), (start, end), &[]).unwrap();
        let ids: Vec<&str> = scenes.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_query_orders_by_timestamp() {
        let source = MemoryRasterSource::new(vec![
            scene("late", ts(2016, 6, 1)),
            scene("early", ts(2015, 11, 1)),
        ]);

        let scenes = source
            .query(&aoi(), (ts(2015, 10, 1), ts(2016, 8, 1)), &[])
            .unwrap();
        let ids: Vec<&str> = scenes.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec!["early", "late"]);
    }

    #[test]
    fn test_query_excludes_disjoint_bounds() {
        let source = MemoryRasterSource::new(vec![scene("a", ts(2016, 3, 14))]);

        let far_away = MultiPolygon::new(vec![Polygon::new(
            LineString::from(vec![
                (1000.0, 1000.0),
                (1100.0, 1000.0),
                (1100.0, 1100.0),
                (1000.0, 1100.0),
                (1000.0, 1000.0),
            ]),
            vec![],
        )]);

        let scenes = source
            .query(&far_away, (ts(2015, 10, 1), ts(2016, 8, 1)), &[])
            .unwrap();
        assert!(scenes.is_empty());
    }

    #[test]
    fn test_companion_lookup_by_id_and_timestamp() {
        let timestamp = ts(2016, 3, 14);
        let source = MemoryCompanionSource::new(vec![Companion::new(
            "S2A_0001",
            timestamp,
            Raster::filled(4, 4, 20.0),
        )]);

        let by_id = source
            .matches(&CompanionKey::Id("S2A_0001".to_string()))
            .unwrap();
        assert_eq!(by_id.len(), 1);

        let by_ts = source.matches(&CompanionKey::Timestamp(timestamp)).unwrap();
        assert_eq!(by_ts.len(), 1);

        let none = source
            .matches(&CompanionKey::Id("S2A_0002".to_string()))
            .unwrap();
        assert!(none.is_empty());
    }
}
