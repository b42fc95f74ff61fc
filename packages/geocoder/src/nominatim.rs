//! Nominatim / OpenStreetMap geocoder client.
//!
//! Uses the structured search endpoint with Australian country filtering.
//! The public instance enforces a strict rate limit (1 request per second);
//! report generation issues at most one geocode per category, which stays
//! well under it for single-report workloads.
//!
//! See <https://nominatim.org/release-docs/develop/api/Search/>

use async_trait::async_trait;

use crate::{Address, GeocodeError, GeocodedPoint, Geocoder};

/// Public Nominatim search endpoint.
pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Nominatim-backed [`Geocoder`] implementation.
pub struct NominatimGeocoder {
    base_url: String,
    client: reqwest::Client,
}

impl NominatimGeocoder {
    /// Creates a client against the public Nominatim instance.
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client against a self-hosted instance.
    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            client: reqwest::Client::new(),
        }
    }
}

impl Default for NominatimGeocoder {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Geocoder for NominatimGeocoder {
    async fn geocode(&self, address: &Address) -> Result<GeocodedPoint, GeocodeError> {
        let postcode = address.postcode.clone().unwrap_or_default();
        let mut query = vec![
            ("street", address.street.as_str()),
            ("city", address.suburb.as_str()),
            ("state", address.state.as_str()),
            ("countrycodes", "au"),
            ("format", "jsonv2"),
            ("limit", "1"),
        ];
        if !postcode.is_empty() {
            query.push(("postalcode", postcode.as_str()));
        }

        let resp = self
            .client
            .get(&self.base_url)
            .query(&query)
            .send()
            .await?;

        let body: serde_json::Value = resp.json().await?;
        parse_response(&body)
    }
}

/// Parses a Nominatim JSON response into a coordinate.
fn parse_response(body: &serde_json::Value) -> Result<GeocodedPoint, GeocodeError> {
    let results = body.as_array().ok_or_else(|| GeocodeError::Parse {
        message: "Nominatim response is not an array".to_string(),
    })?;

    let Some(first) = results.first() else {
        return Err(GeocodeError::NoMatch);
    };

    let latitude = first["lat"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lat in Nominatim response".to_string(),
        })?;

    let longitude = first["lon"]
        .as_str()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| GeocodeError::Parse {
            message: "Missing lon in Nominatim response".to_string(),
        })?;

    Ok(GeocodedPoint {
        latitude,
        longitude,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_nominatim_result() {
        let body = serde_json::json!([{
            "lat": "-37.8136",
            "lon": "144.9631",
            "display_name": "1, Treasury Place, Melbourne, VIC, Australia"
        }]);
        let point = parse_response(&body).unwrap();
        assert!((point.latitude - -37.8136).abs() < 1e-6);
        assert!((point.longitude - 144.9631).abs() < 1e-6);
    }

    #[test]
    fn empty_result_is_no_match() {
        let body = serde_json::json!([]);
        assert!(matches!(parse_response(&body), Err(GeocodeError::NoMatch)));
    }

    #[test]
    fn non_array_body_is_parse_error() {
        let body = serde_json::json!({ "error": "boom" });
        assert!(matches!(
            parse_response(&body),
            Err(GeocodeError::Parse { .. })
        ));
    }
}
