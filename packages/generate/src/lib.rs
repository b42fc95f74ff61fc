#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Composite environmental data generation.
//!
//! Resolves the address once, then runs every enabled hazard category
//! against the resolved coordinate and assembles the composite
//! [`EnvironmentalData`]. Category failures never propagate: each
//! orchestrator degrades itself to its minimal report, so the composite is
//! always produced.
//!
//! A category is `None` only when it was not attempted at all (the
//! infrastructure and traffic-volume layers need the local asset store, so
//! without a database handle the infrastructure category is absent rather
//! than minimal). Serialization skips absent categories.

use duckdb::Connection;
use property_report_features::FeatureSource;
use property_report_geocoder::{Address, Geocoder};
use property_report_hazard::{
    biodiversity, bushfire, easements, flood, heritage, infrastructure, landslide, noise, odour,
    waterway,
};
use serde::Serialize;

/// The composite environmental report for one property.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentalData {
    /// Waterway proximity assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub waterway: Option<waterway::WaterwayReport>,
    /// Flood risk assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flood: Option<flood::FloodReport>,
    /// Steep land / landslide assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub landslide: Option<landslide::LandslideReport>,
    /// Bushfire risk assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bushfire: Option<bushfire::BushfireReport>,
    /// Heritage and character overlay assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heritage: Option<heritage::HeritageReport>,
    /// Biodiversity significance assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub biodiversity: Option<biodiversity::BiodiversityReport>,
    /// Odour source assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub odour: Option<odour::OdourReport>,
    /// Traffic noise assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub noise: Option<noise::NoiseReport>,
    /// Easement assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub easements: Option<easements::EasementReport>,
    /// Underground and overhead infrastructure assessment.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<infrastructure::InfrastructureReport>,
}

/// Generates the composite environmental report for an address.
///
/// The address is resolved once; every category then runs against the
/// resolved coordinate. If geocoding fails, every attempted category
/// degrades to its minimal report so the composite still carries the full
/// shape. `db` is the optional local asset store used by the noise and
/// infrastructure categories; without it the infrastructure category is
/// not attempted.
pub async fn generate_environmental_data(
    address: &Address,
    geocoder: &dyn Geocoder,
    source: &dyn FeatureSource,
    db: Option<&Connection>,
) -> EnvironmentalData {
    match geocoder.geocode(address).await {
        Ok(point) => {
            generate_environmental_data_at(point.latitude, point.longitude, source, db).await
        }
        Err(err) => {
            log::warn!("Geocoding failed, producing minimal report for all categories: {err}");
            minimal_data(db.is_some())
        }
    }
}

/// Generates the composite environmental report for a pre-resolved
/// coordinate.
pub async fn generate_environmental_data_at(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
    db: Option<&Connection>,
) -> EnvironmentalData {
    // Category order carries no meaning; each call owns its own fetched
    // data and degrades independently.
    let waterway = waterway::assess_at(lat, lon, source).await;
    let flood = flood::assess_at(lat, lon, source).await;
    let landslide = landslide::assess_at(lat, lon, source).await;
    let bushfire = bushfire::assess_at(lat, lon, source).await;
    let heritage = heritage::assess_at(lat, lon, source).await;
    let biodiversity = biodiversity::assess_at(lat, lon, source).await;
    let odour = odour::assess_at(lat, lon, source).await;
    let noise = noise::assess_at(lat, lon, source, db).await;
    let easements = easements::assess_at(lat, lon, source).await;
    let infrastructure = db.map(|conn| infrastructure::assess_at(lat, lon, conn));

    EnvironmentalData {
        waterway: Some(waterway),
        flood: Some(flood),
        landslide: Some(landslide),
        bushfire: Some(bushfire),
        heritage: Some(heritage),
        biodiversity: Some(biodiversity),
        odour: Some(odour),
        noise: Some(noise),
        easements: Some(easements),
        infrastructure,
    }
}

fn minimal_data(with_db: bool) -> EnvironmentalData {
    EnvironmentalData {
        waterway: Some(waterway::minimal_report()),
        flood: Some(flood::minimal_report()),
        landslide: Some(landslide::minimal_report()),
        bushfire: Some(bushfire::minimal_report()),
        heritage: Some(heritage::minimal_report()),
        biodiversity: Some(biodiversity::minimal_report()),
        odour: Some(odour::minimal_report()),
        noise: Some(noise::minimal_report()),
        easements: Some(easements::minimal_report()),
        infrastructure: with_db.then(infrastructure::minimal_report),
    }
}
