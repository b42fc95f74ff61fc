#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Geographic feature model and feature-service client seam.
//!
//! External feature services return heterogeneous `GeoJSON`-shaped payloads:
//! points, lines, polygons and multi-polygons, with an open property bag
//! whose field shapes vary by layer. This crate owns the loose-deserialize /
//! validating-constructor boundary: raw JSON goes in, typed
//! [`GeographicFeature`]s come out, and nothing structurally invalid
//! propagates past it.
//!
//! The [`FeatureSource`] trait is the seam category orchestrators depend on;
//! [`arcgis::ArcGisFeatureSource`] is the production implementation.

pub mod arcgis;
pub mod properties;

use async_trait::async_trait;
use property_report_geometry::FeatureGeometry;
use serde_json::{Map, Value};
use thiserror::Error;

/// Metres per degree of latitude, used to derive query buffers in decimal
/// degrees from a metres radius.
pub const METERS_PER_DEGREE: f64 = 111_000.0;

/// Converts a buffer radius in metres to decimal degrees.
#[must_use]
pub fn buffer_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Errors from feature-service operations.
#[derive(Debug, Error)]
pub enum FeatureSourceError {
    /// HTTP request failed (includes timeouts).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body was not valid JSON.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// Top-level feature collection did not have the expected shape.
    #[error("Malformed feature collection: {message}")]
    Shape {
        /// Description of the structural mismatch.
        message: String,
    },
}

/// One record from an external feature service.
///
/// Immutable once constructed; owned exclusively by the orchestrator call
/// that fetched it. `geometry` is `None` when the service returned a
/// geometry type the pipeline does not consume or a malformed coordinate
/// payload — the feature is kept so its property bag can still be read.
#[derive(Debug, Clone)]
pub struct GeographicFeature {
    /// Feature identifier, if the service provided one.
    pub id: Option<String>,
    /// Parsed geometry, if usable.
    pub geometry: Option<FeatureGeometry>,
    /// Open bag of layer-specific scalar fields.
    pub properties: Map<String, Value>,
    /// Bounding box as `[min_lon, min_lat, max_lon, max_lat]`, if provided.
    pub bbox: Option<Vec<f64>>,
}

/// Parses a `GeoJSON` feature collection value into typed features.
///
/// Individual features with unusable geometry are kept with `geometry:
/// None` (and logged); only a structurally invalid top-level collection is
/// an error.
///
/// # Errors
///
/// Returns [`FeatureSourceError::Shape`] if the value is not an object with
/// a `features` array.
pub fn parse_feature_collection(
    body: &Value,
) -> Result<Vec<GeographicFeature>, FeatureSourceError> {
    let features = body
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| FeatureSourceError::Shape {
            message: "expected an object with a `features` array".to_string(),
        })?;

    let mut parsed = Vec::with_capacity(features.len());
    for raw in features {
        parsed.push(parse_feature(raw));
    }
    Ok(parsed)
}

/// Validating constructor for one raw feature value.
fn parse_feature(raw: &Value) -> GeographicFeature {
    let id = match raw.get("id") {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };

    let geometry = raw.get("geometry").and_then(|g| {
        if g.is_null() {
            return None;
        }
        let geojson_geom: geojson::Geometry = serde_json::from_value(g.clone()).ok()?;
        let parsed = FeatureGeometry::from_geojson(geojson_geom);
        if parsed.is_none() {
            log::debug!("Dropping unusable geometry for feature {id:?}");
        }
        parsed
    });

    let properties = raw
        .get("properties")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let bbox = raw.get("bbox").and_then(Value::as_array).map(|values| {
        values
            .iter()
            .filter_map(Value::as_f64)
            .collect::<Vec<f64>>()
    });

    GeographicFeature {
        id,
        geometry,
        properties,
        bbox,
    }
}

/// Seam between category orchestrators and the external feature services.
///
/// Implementations return the features intersecting a square buffer of
/// `buffer_degrees` around the query point for one named layer. A layer
/// that does not exist is an empty result, not an error — the
/// graceful-degradation contract every orchestrator relies on.
#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Fetches features for one layer around a point.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureSourceError`] for transport failures and malformed
    /// response bodies. Missing layers are `Ok(vec![])`.
    async fn query(
        &self,
        lat: f64,
        lon: f64,
        buffer_degrees: f64,
        layer: &str,
    ) -> Result<Vec<GeographicFeature>, FeatureSourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_collection_with_mixed_geometry() {
        let body = json!({
            "type": "FeatureCollection",
            "features": [
                {
                    "type": "Feature",
                    "id": 7,
                    "geometry": {
                        "type": "Point",
                        "coordinates": [144.9631, -37.8136]
                    },
                    "properties": { "NAME": "Yarra River" }
                },
                {
                    "type": "Feature",
                    "geometry": null,
                    "properties": { "NAME": "No geometry" }
                }
            ]
        });

        let features = parse_feature_collection(&body).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(features[0].id.as_deref(), Some("7"));
        assert!(features[0].geometry.is_some());
        assert!(features[1].geometry.is_none());
        assert_eq!(
            features[1].properties.get("NAME").and_then(Value::as_str),
            Some("No geometry")
        );
    }

    #[test]
    fn unsupported_geometry_becomes_none() {
        let body = json!({
            "features": [{
                "type": "Feature",
                "geometry": {
                    "type": "GeometryCollection",
                    "geometries": []
                },
                "properties": {}
            }]
        });
        let features = parse_feature_collection(&body).unwrap();
        assert!(features[0].geometry.is_none());
    }

    #[test]
    fn rejects_structurally_invalid_collection() {
        let body = json!({ "rows": [] });
        let err = parse_feature_collection(&body).unwrap_err();
        assert!(matches!(err, FeatureSourceError::Shape { .. }));
    }

    #[test]
    fn empty_collection_is_ok() {
        let body = json!({ "type": "FeatureCollection", "features": [] });
        assert!(parse_feature_collection(&body).unwrap().is_empty());
    }

    #[test]
    fn buffer_conversion_uses_fixed_approximation() {
        assert!((buffer_degrees(111_000.0) - 1.0).abs() < f64::EPSILON);
        assert!((buffer_degrees(555.0) - 0.005).abs() < 1e-12);
    }
}
