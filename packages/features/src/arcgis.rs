//! `ArcGIS` REST feature-service client.
//!
//! Queries a `FeatureServer` or `MapServer` endpoint for the features
//! intersecting an envelope around a point, in `GeoJSON` output format.
//! A missing layer (HTTP 4xx, or an `ArcGIS` error body) is an empty
//! result, not an error — one absent government layer must never block the
//! rest of a report.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::{FeatureSource, FeatureSourceError, GeographicFeature, parse_feature_collection};

/// Default per-request timeout. Individual sources observed in production
/// range from 10 to 30 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// `ArcGIS` REST feature source rooted at one service URL.
///
/// Layer names passed to [`FeatureSource::query`] are appended to the base
/// URL, so `https://services.example.gov/arcgis/rest/services/env` with
/// layer `"flood_extents/0"` queries
/// `.../env/flood_extents/0/query`.
pub struct ArcGisFeatureSource {
    base_url: String,
    client: reqwest::Client,
}

impl ArcGisFeatureSource {
    /// Creates a client with the default 30 second timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureSourceError::Http`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn new(base_url: impl Into<String>) -> Result<Self, FeatureSourceError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Creates a client with an explicit per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`FeatureSourceError::Http`] if the underlying HTTP client
    /// cannot be constructed.
    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FeatureSourceError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[async_trait]
impl FeatureSource for ArcGisFeatureSource {
    async fn query(
        &self,
        lat: f64,
        lon: f64,
        buffer_degrees: f64,
        layer: &str,
    ) -> Result<Vec<GeographicFeature>, FeatureSourceError> {
        let envelope = format!(
            "{},{},{},{}",
            lon - buffer_degrees,
            lat - buffer_degrees,
            lon + buffer_degrees,
            lat + buffer_degrees
        );
        let url = format!("{}/{}/query", self.base_url, layer.trim_matches('/'));

        log::debug!("Querying layer {layer} with envelope {envelope}");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("geometry", envelope.as_str()),
                ("geometryType", "esriGeometryEnvelope"),
                ("inSR", "4326"),
                ("spatialRel", "esriSpatialRelIntersects"),
                ("outFields", "*"),
                ("outSR", "4326"),
                ("f", "geojson"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            // Layer not published / not found: degrade to "no data".
            log::warn!("Layer {layer} returned {status}; treating as absent");
            return Ok(Vec::new());
        }

        let body: Value = response.json().await?;
        if let Some(error) = body.get("error") {
            // ArcGIS reports missing layers as HTTP 200 with an error body.
            log::warn!("Layer {layer} returned service error {error}; treating as absent");
            return Ok(Vec::new());
        }

        let features = parse_feature_collection(&body)?;
        log::debug!("Layer {layer}: {} features in buffer", features.len());
        Ok(features)
    }
}
