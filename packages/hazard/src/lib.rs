#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Per-category hazard analysis for property reports.
//!
//! Each module under this crate owns one hazard domain and composes the
//! same four steps: fetch features for the property's buffer, normalize the
//! raw property bags into typed records with a computed distance, classify
//! into a discrete risk tier via an ordered threshold table, and generate a
//! narrative with mitigation recommendations.
//!
//! Orchestrator entry points (`assess` / `assess_at`) never return errors:
//! a geocoder outage, a dead feature service, or a malformed payload
//! degrades that one category to its deterministic minimal report so the
//! composite report is always produced.
//!
//! Classification contract shared by every category:
//! * rules are evaluated top to bottom, first match wins;
//! * a feature that affects the property directly always yields the worst
//!   tier regardless of distance signals;
//! * threshold comparisons are strict `<` — a distance exactly equal to a
//!   boundary belongs to the next less severe bucket.

pub mod biodiversity;
pub mod bushfire;
pub mod common;
pub mod easements;
pub mod flood;
pub mod heritage;
pub mod infrastructure;
pub mod landslide;
pub mod noise;
pub mod odour;
pub mod waterway;

use thiserror::Error;

/// Errors internal to a single category assessment. Never escapes the
/// orchestrator entry points — every variant degrades to the category's
/// minimal report.
#[derive(Debug, Error)]
pub enum HazardError {
    /// Address could not be resolved to a coordinate.
    #[error("Geocoding failed: {0}")]
    Geocode(#[from] property_report_geocoder::GeocodeError),

    /// Feature service failed in a non-graceful way.
    #[error("Feature source failed: {0}")]
    Source(#[from] property_report_features::FeatureSourceError),

    /// Local layer database query failed.
    #[error("Database query failed: {0}")]
    Db(#[from] duckdb::Error),
}

#[cfg(test)]
pub(crate) mod testing {
    //! Stub collaborators shared by the category orchestrator tests.

    use std::collections::HashMap;

    use async_trait::async_trait;
    use geo::{LineString, Point, Polygon};
    use property_report_features::{FeatureSource, FeatureSourceError, GeographicFeature};
    use property_report_geocoder::{Address, GeocodeError, GeocodedPoint, Geocoder};
    use property_report_geometry::FeatureGeometry;
    use serde_json::{Map, Value};

    /// Returns canned features per layer name; unknown layers are empty.
    pub struct StaticSource {
        pub layers: HashMap<String, Vec<GeographicFeature>>,
    }

    impl StaticSource {
        pub fn new(layers: Vec<(&str, Vec<GeographicFeature>)>) -> Self {
            Self {
                layers: layers
                    .into_iter()
                    .map(|(k, v)| (k.to_string(), v))
                    .collect(),
            }
        }

        pub fn empty() -> Self {
            Self {
                layers: HashMap::new(),
            }
        }
    }

    #[async_trait]
    impl FeatureSource for StaticSource {
        async fn query(
            &self,
            _lat: f64,
            _lon: f64,
            _buffer_degrees: f64,
            layer: &str,
        ) -> Result<Vec<GeographicFeature>, FeatureSourceError> {
            Ok(self.layers.get(layer).cloned().unwrap_or_default())
        }
    }

    /// Always fails with a shape error, exercising the non-graceful path.
    pub struct BrokenSource;

    #[async_trait]
    impl FeatureSource for BrokenSource {
        async fn query(
            &self,
            _lat: f64,
            _lon: f64,
            _buffer_degrees: f64,
            _layer: &str,
        ) -> Result<Vec<GeographicFeature>, FeatureSourceError> {
            Err(FeatureSourceError::Shape {
                message: "stubbed outage".to_string(),
            })
        }
    }

    /// Resolves every address to one fixed point.
    pub struct StubGeocoder {
        pub latitude: f64,
        pub longitude: f64,
    }

    #[async_trait]
    impl Geocoder for StubGeocoder {
        async fn geocode(&self, _address: &Address) -> Result<GeocodedPoint, GeocodeError> {
            Ok(GeocodedPoint {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// Never resolves.
    pub struct FailingGeocoder;

    #[async_trait]
    impl Geocoder for FailingGeocoder {
        async fn geocode(&self, _address: &Address) -> Result<GeocodedPoint, GeocodeError> {
            Err(GeocodeError::NoMatch)
        }
    }

    pub fn melbourne_address() -> Address {
        Address {
            street: "1 Treasury Place".to_string(),
            suburb: "East Melbourne".to_string(),
            state: "VIC".to_string(),
            postcode: Some("3002".to_string()),
        }
    }

    /// A square polygon feature centred on `(lon, lat)` with the given
    /// half-width in degrees and property bag.
    pub fn polygon_feature(
        lon: f64,
        lat: f64,
        half: f64,
        properties: Vec<(&str, Value)>,
    ) -> GeographicFeature {
        let ring = LineString::from(vec![
            (lon - half, lat - half),
            (lon + half, lat - half),
            (lon + half, lat + half),
            (lon - half, lat + half),
            (lon - half, lat - half),
        ]);
        GeographicFeature {
            id: None,
            geometry: Some(FeatureGeometry::Polygon(Polygon::new(ring, vec![]))),
            properties: bag(properties),
            bbox: None,
        }
    }

    /// A point feature with the given property bag.
    pub fn point_feature(lon: f64, lat: f64, properties: Vec<(&str, Value)>) -> GeographicFeature {
        GeographicFeature {
            id: None,
            geometry: Some(FeatureGeometry::Point(Point::new(lon, lat))),
            properties: bag(properties),
            bbox: None,
        }
    }

    fn bag(properties: Vec<(&str, Value)>) -> Map<String, Value> {
        properties
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }
}
