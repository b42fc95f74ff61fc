//! Character and heritage overlay assessment.
//!
//! Queries the heritage overlay layer (registered places, precincts and
//! neighbourhood character overlays) and classifies significance by
//! overlay containment and nearest-overlay distance.

use geo::Point;
use property_report_features::{FeatureSource, GeographicFeature, buffer_degrees};
use property_report_geocoder::{Address, Geocoder};
use property_report_hazard_models::{Measurement, RiskLevel};
use serde::Serialize;

use crate::HazardError;
use crate::common::{
    HazardRecord, any_affects, feature_proximity, nearest_distance_m, sort_by_proximity,
};

/// Feature-service layer holding heritage and character overlays.
pub const LAYER: &str = "heritage_overlays";

/// Search buffer radius in metres.
pub const SEARCH_RADIUS_M: f64 = 200.0;

/// A normalized heritage or character overlay.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeritageOverlay {
    /// Overlay schedule code, e.g. `"HO123"`.
    pub overlay_code: Option<String>,
    /// Place or precinct name, if published.
    pub overlay_name: Option<String>,
    /// True when the overlay covers the property.
    pub affects_property: bool,
    /// Nearest distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl HazardRecord for HeritageOverlay {
    fn affects_property(&self) -> bool {
        self.affects_property
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// Heritage category report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeritageReport {
    /// Classified significance tier.
    pub significance_level: RiskLevel,
    /// Normalized overlays, affects-property first then nearest.
    pub overlays: Vec<HeritageOverlay>,
    /// True when any overlay covers the property.
    pub affected_by_heritage_overlay: bool,
    /// Narrative summary.
    pub description: String,
    /// Ordered mitigation recommendations.
    pub recommendations: Vec<String>,
}

/// Normalizes raw overlay features.
#[must_use]
pub fn normalize(point: Point<f64>, features: &[GeographicFeature]) -> Vec<HeritageOverlay> {
    use property_report_features::properties::prop_str;

    features
        .iter()
        .map(|feature| {
            let (distance, affects_property) = feature_proximity(point, feature);
            HeritageOverlay {
                overlay_code: prop_str(&feature.properties, "OVERLAY_CODE")
                    .or_else(|| prop_str(&feature.properties, "ZONE_CODE")),
                overlay_name: prop_str(&feature.properties, "OVERLAY_NAME")
                    .or_else(|| prop_str(&feature.properties, "SITE_NAME")),
                affects_property,
                distance,
            }
        })
        .collect()
}

/// Classifies heritage significance.
///
/// Ordered rules, first match wins: any overlay affecting the property ⇒
/// `VERY_HIGH`; nearest `< 50 m` ⇒ `HIGH`; `< 100 m` ⇒ `MODERATE`;
/// `< 200 m` ⇒ `LOW`; else `MINIMAL`.
#[must_use]
pub fn determine_significance(overlays: &[HeritageOverlay]) -> RiskLevel {
    if any_affects(overlays) {
        return RiskLevel::VeryHigh;
    }
    match nearest_distance_m(overlays) {
        Some(d) if d < 50.0 => RiskLevel::High,
        Some(d) if d < 100.0 => RiskLevel::Moderate,
        Some(d) if d < 200.0 => RiskLevel::Low,
        _ => RiskLevel::Minimal,
    }
}

/// Narrative description for the classified tier.
#[must_use]
pub fn generate_description(level: RiskLevel, overlays: &[HeritageOverlay]) -> String {
    use crate::common::affecting_names;

    match level {
        RiskLevel::VeryHigh => {
            let codes = affecting_names(overlays, |o| o.overlay_code.as_deref());
            if codes.is_empty() {
                "A heritage or character overlay applies to the property.".to_string()
            } else {
                format!("Heritage/character overlay(s) {codes} apply to the property.")
            }
        }
        RiskLevel::High => {
            "A heritage or character overlay lies within 50 metres of the property. \
             Streetscape controls may influence development."
                .to_string()
        }
        RiskLevel::Moderate => {
            "A heritage or character overlay lies within 100 metres of the property."
                .to_string()
        }
        RiskLevel::Low => {
            "A heritage or character overlay lies within 200 metres of the property."
                .to_string()
        }
        RiskLevel::Minimal => fallback_description(),
    }
}

/// Ordered mitigation recommendations.
#[must_use]
pub fn generate_recommendations(level: RiskLevel) -> Vec<String> {
    let strings: &[&str] = match level {
        RiskLevel::VeryHigh => &[
            "A planning permit is likely required for demolition, external alteration or new buildings",
            "Review the heritage citation and statement of significance for the place",
            "Engage a heritage consultant before preparing development plans",
        ],
        RiskLevel::High => &[
            "Check whether abutting heritage places constrain built form or setbacks",
            "Review the heritage citation and statement of significance for the precinct",
        ],
        RiskLevel::Moderate | RiskLevel::Low => {
            &["Check the planning scheme for nearby heritage and character controls"]
        }
        RiskLevel::Minimal => &[],
    };
    strings.iter().map(ToString::to_string).collect()
}

/// Assesses the heritage category for a street address.
///
/// Never fails: geocoding or data-source errors degrade to the minimal
/// report.
pub async fn assess(
    address: &Address,
    geocoder: &dyn Geocoder,
    source: &dyn FeatureSource,
) -> HeritageReport {
    match geocoder.geocode(address).await {
        Ok(point) => assess_at(point.latitude, point.longitude, source).await,
        Err(err) => {
            log::warn!("Heritage assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

/// Assesses the heritage category for a pre-resolved coordinate.
pub async fn assess_at(lat: f64, lon: f64, source: &dyn FeatureSource) -> HeritageReport {
    match try_assess(lat, lon, source).await {
        Ok(report) => report,
        Err(err) => {
            log::warn!("Heritage assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

async fn try_assess(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
) -> Result<HeritageReport, HazardError> {
    let features = source
        .query(lat, lon, buffer_degrees(SEARCH_RADIUS_M), LAYER)
        .await?;

    let point = Point::new(lon, lat);
    let mut overlays = normalize(point, &features);
    sort_by_proximity(&mut overlays);

    let significance_level = determine_significance(&overlays);
    let affected_by_heritage_overlay = any_affects(&overlays);
    let description = generate_description(significance_level, &overlays);
    let recommendations = generate_recommendations(significance_level);

    Ok(HeritageReport {
        significance_level,
        overlays,
        affected_by_heritage_overlay,
        description,
        recommendations,
    })
}

/// Deterministic fallback when the category cannot be assessed.
#[must_use]
pub fn minimal_report() -> HeritageReport {
    HeritageReport {
        significance_level: RiskLevel::Minimal,
        overlays: Vec::new(),
        affected_by_heritage_overlay: false,
        description: fallback_description(),
        recommendations: Vec::new(),
    }
}

fn fallback_description() -> String {
    "No heritage or character constraints identified within the search area.".to_string()
}
