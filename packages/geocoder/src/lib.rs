#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Address geocoding seam for report generation.
//!
//! Converts a structured street address to a WGS84 coordinate. The pipeline
//! treats geocoding as a black box behind the [`Geocoder`] trait: a failure
//! is fatal to the hazard category asking, never to the composite report.
//!
//! [`nominatim`] provides the structured-search HTTP implementation.

pub mod nominatim;

use async_trait::async_trait;
use thiserror::Error;

/// A structured street address to resolve.
#[derive(Debug, Clone)]
pub struct Address {
    /// Street line (e.g., "1 Treasury Place").
    pub street: String,
    /// Suburb or locality.
    pub suburb: String,
    /// State abbreviation (e.g., "VIC").
    pub state: String,
    /// Postcode, if available.
    pub postcode: Option<String>,
}

/// A resolved coordinate.
#[derive(Debug, Clone, Copy)]
pub struct GeocodedPoint {
    /// Latitude (WGS84).
    pub latitude: f64,
    /// Longitude (WGS84).
    pub longitude: f64,
}

/// Errors from geocoding operations.
#[derive(Debug, Error)]
pub enum GeocodeError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response parsing failed.
    #[error("Parse error: {message}")]
    Parse {
        /// Description of the parsing failure.
        message: String,
    },

    /// The address could not be matched to a coordinate.
    #[error("No match for address")]
    NoMatch,
}

/// Seam between hazard orchestrators and the external geocoding service.
#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves a structured address to a coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError`] if the request fails, the response is
    /// malformed, or no match exists.
    async fn geocode(&self, address: &Address) -> Result<GeocodedPoint, GeocodeError>;
}
