//! Vector data: cultivated parcels and attribute values

use geo_types::Polygon;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Attribute value types for opaque acquisition properties and filter
/// predicates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<AttributeValue>),
}

impl AttributeValue {
    /// Whether a list-valued attribute contains the given string
    pub fn list_contains(&self, needle: &str) -> bool {
        match self {
            AttributeValue::List(items) => items
                .iter()
                .any(|item| matches!(item, AttributeValue::String(s) if s == needle)),
            _ => false,
        }
    }
}

/// A cultivated land parcel: polygon geometry plus a typed mapping from
/// harvest year to production quantity.
///
/// Production is recorded against the harvest year, one year after
/// planting; a parcel is cultivated in the season ending in year Y iff
/// `production(Y) > 0`. Years without a recorded figure count as zero.
#[derive(Debug, Clone)]
pub struct Parcel {
    id: String,
    geometry: Polygon<f64>,
    production: BTreeMap<i32, f64>,
}

impl Parcel {
    /// Create a parcel with no production records
    pub fn new(id: impl Into<String>, geometry: Polygon<f64>) -> Self {
        Self {
            id: id.into(),
            geometry,
            production: BTreeMap::new(),
        }
    }

    /// Record the production quantity for a harvest year.
    ///
    /// Quantities must be non-negative.
    pub fn with_production(mut self, year: i32, quantity: f64) -> Result<Self> {
        if !(quantity >= 0.0) {
            return Err(Error::InvalidParameter {
                name: "production",
                value: quantity.to_string(),
                reason: format!("production for year {} must be non-negative", year),
            });
        }
        self.production.insert(year, quantity);
        Ok(self)
    }

    /// Parcel identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Parcel geometry
    pub fn geometry(&self) -> &Polygon<f64> {
        &self.geometry
    }

    /// Production quantity for a harvest year (zero when unrecorded)
    pub fn production(&self, year: i32) -> f64 {
        self.production.get(&year).copied().unwrap_or(0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::{LineString, Polygon};

    fn square(x0: f64, y0: f64, side: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (x0, y0),
                (x0 + side, y0),
                (x0 + side, y0 + side),
                (x0, y0 + side),
                (x0, y0),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_production_lookup() {
        let parcel = Parcel::new("recinto-7", square(0.0, 0.0, 100.0))
            .with_production(2016, 400.0)
            .unwrap()
            .with_production(2017, 0.0)
            .unwrap();

        assert_eq!(parcel.production(2016), 400.0);
        assert_eq!(parcel.production(2017), 0.0);
        // Unrecorded year reads as zero, not an error
        assert_eq!(parcel.production(2018), 0.0);
    }

    #[test]
    fn test_negative_production_rejected() {
        let result =
            Parcel::new("recinto-7", square(0.0, 0.0, 100.0)).with_production(2016, -3.0);
        assert!(result.is_err());
    }

    #[test]
    fn test_nan_production_rejected() {
        let result =
            Parcel::new("recinto-7", square(0.0, 0.0, 100.0)).with_production(2016, f64::NAN);
        assert!(result.is_err());
    }

    #[test]
    fn test_list_contains() {
        let polarisations = AttributeValue::List(vec![
            AttributeValue::String("VV".to_string()),
            AttributeValue::String("VH".to_string()),
        ]);
        assert!(polarisations.list_contains("VH"));
        assert!(!polarisations.list_contains("HH"));
        assert!(!AttributeValue::String("VV".to_string()).list_contains("VV"));
    }
}
