//! Steep land / landslide hazard assessment.
//!
//! Queries the landslide hazard overlay layer and classifies risk by zone
//! containment and nearest-zone distance. Two overlay sub-types carry their
//! own recommendation blocks: Landslip zones and Erosion Management zones.

use geo::Point;
use property_report_features::{FeatureSource, GeographicFeature, buffer_degrees};
use property_report_geocoder::{Address, Geocoder};
use property_report_hazard_models::{Measurement, RiskLevel};
use serde::Serialize;

use crate::HazardError;
use crate::common::{
    HazardRecord, any_affects, feature_proximity, nearest_distance_m, sort_by_proximity,
};

/// Feature-service layer holding landslide hazard overlays.
pub const LAYER: &str = "landslide_hazard";

/// Search buffer radius in metres.
pub const SEARCH_RADIUS_M: f64 = 500.0;

/// Landslip hazard sub-type label as published by the overlay layer.
pub const HAZARD_TYPE_LANDSLIP: &str = "Landslip";

/// Erosion Management hazard sub-type label.
pub const HAZARD_TYPE_EROSION: &str = "Erosion Management";

/// A normalized landslide hazard zone.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandslideHazardZone {
    /// Overlay sub-type, e.g. `"Landslip"` or `"Erosion Management"`.
    pub hazard_type: Option<String>,
    /// Overlay schedule code, e.g. `"LSO2"`.
    pub zone_code: Option<String>,
    /// True when the zone covers the property.
    pub affects_property: bool,
    /// Nearest distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl LandslideHazardZone {
    fn is_landslip(&self) -> bool {
        self.hazard_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(HAZARD_TYPE_LANDSLIP))
    }

    fn is_erosion(&self) -> bool {
        self.hazard_type
            .as_deref()
            .is_some_and(|t| t.eq_ignore_ascii_case(HAZARD_TYPE_EROSION))
    }
}

impl HazardRecord for LandslideHazardZone {
    fn affects_property(&self) -> bool {
        self.affects_property
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// Landslide category report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LandslideReport {
    /// Classified risk tier.
    pub risk_level: RiskLevel,
    /// Normalized hazard zones, affects-property first then nearest.
    pub zones: Vec<LandslideHazardZone>,
    /// True when any hazard zone covers the property.
    pub affected_by_landslide: bool,
    /// Narrative summary.
    pub description: String,
    /// Ordered mitigation recommendations.
    pub recommendations: Vec<String>,
}

/// Normalizes raw overlay features into [`LandslideHazardZone`] records.
#[must_use]
pub fn normalize(point: Point<f64>, features: &[GeographicFeature]) -> Vec<LandslideHazardZone> {
    use property_report_features::properties::prop_str;

    features
        .iter()
        .map(|feature| {
            let (distance, affects_property) = feature_proximity(point, feature);
            LandslideHazardZone {
                hazard_type: prop_str(&feature.properties, "HAZARD_TYPE")
                    .or_else(|| prop_str(&feature.properties, "hazardType")),
                zone_code: prop_str(&feature.properties, "ZONE_CODE")
                    .or_else(|| prop_str(&feature.properties, "SCHEDULE")),
                affects_property,
                distance,
            }
        })
        .collect()
}

/// Classifies landslide risk.
///
/// Ordered rules, first match wins: any zone affecting the property ⇒
/// `VERY_HIGH`; nearest `< 50 m` ⇒ `HIGH`; `< 100 m` ⇒ `MODERATE`; else
/// `MINIMAL`. There is no `LOW` bucket for this category.
#[must_use]
pub fn determine_risk_level(zones: &[LandslideHazardZone]) -> RiskLevel {
    if any_affects(zones) {
        return RiskLevel::VeryHigh;
    }
    match nearest_distance_m(zones) {
        Some(d) if d < 50.0 => RiskLevel::High,
        Some(d) if d < 100.0 => RiskLevel::Moderate,
        _ => RiskLevel::Minimal,
    }
}

/// Narrative description for the classified tier.
#[must_use]
pub fn generate_description(level: RiskLevel, zones: &[LandslideHazardZone]) -> String {
    use crate::common::affecting_names;

    match level {
        RiskLevel::VeryHigh => {
            let codes = affecting_names(zones, |z| z.zone_code.as_deref());
            let prefix = if codes.is_empty() {
                "The property lies within a landslide hazard zone.".to_string()
            } else {
                format!("The property lies within landslide hazard zone(s) {codes}.")
            };
            format!("{prefix} Significant geotechnical constraints apply.")
        }
        RiskLevel::High => {
            "A landslide hazard zone lies within 50 metres of the property. Slope stability \
             should be assessed before any works."
                .to_string()
        }
        RiskLevel::Moderate => {
            "A landslide hazard zone lies within 100 metres of the property. Localized slope \
             instability is possible."
                .to_string()
        }
        RiskLevel::Low | RiskLevel::Minimal => fallback_description(),
    }
}

/// Ordered mitigation recommendations.
///
/// Sub-type blocks are appended unconditionally when an affecting zone of
/// that sub-type is present — Landslip first, then Erosion Management —
/// followed by the fixed closing block for the tier. The exact strings are
/// part of the report contract.
#[must_use]
pub fn generate_recommendations(level: RiskLevel, zones: &[LandslideHazardZone]) -> Vec<String> {
    let mut recommendations = Vec::new();

    if level == RiskLevel::VeryHigh {
        if zones.iter().any(|z| z.affects_property && z.is_landslip()) {
            recommendations.extend(
                [
                    "Landslip Overlay applies - planning permit required for most development",
                    "Commission a geotechnical assessment by a qualified engineer before works",
                    "Engage a building surveyor regarding footing and retaining wall design",
                ]
                .map(String::from),
            );
        }
        if zones.iter().any(|z| z.affects_property && z.is_erosion()) {
            recommendations.extend(
                [
                    "Erosion Management Overlay applies - site disturbance controls required",
                    "Maintain vegetation cover on slopes to limit soil loss",
                ]
                .map(String::from),
            );
        }
        recommendations.extend(
            [
                "Obtain a detailed geotechnical site investigation before purchase",
                "Review landslip insurance availability and policy exclusions",
                "Avoid cut-and-fill earthworks without engineering advice",
                "Design surface and subsurface drainage to direct water away from slopes",
                "Consult council records for historical slope instability in the area",
            ]
            .map(String::from),
        );
        return recommendations;
    }

    let strings: &[&str] = match level {
        RiskLevel::High => &[
            "Obtain a geotechnical appraisal before significant earthworks",
            "Design surface and subsurface drainage to direct water away from slopes",
        ],
        RiskLevel::Moderate => &["Check council mapping for steep land controls on the title"],
        _ => &[],
    };
    strings.iter().map(ToString::to_string).collect()
}

/// Assesses the landslide category for a street address.
///
/// Never fails: geocoding or data-source errors degrade to the minimal
/// report.
pub async fn assess(
    address: &Address,
    geocoder: &dyn Geocoder,
    source: &dyn FeatureSource,
) -> LandslideReport {
    match geocoder.geocode(address).await {
        Ok(point) => assess_at(point.latitude, point.longitude, source).await,
        Err(err) => {
            log::warn!("Landslide assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

/// Assesses the landslide category for a pre-resolved coordinate.
pub async fn assess_at(lat: f64, lon: f64, source: &dyn FeatureSource) -> LandslideReport {
    match try_assess(lat, lon, source).await {
        Ok(report) => report,
        Err(err) => {
            log::warn!("Landslide assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

async fn try_assess(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
) -> Result<LandslideReport, HazardError> {
    let features = source
        .query(lat, lon, buffer_degrees(SEARCH_RADIUS_M), LAYER)
        .await?;

    let point = Point::new(lon, lat);
    let mut zones = normalize(point, &features);
    sort_by_proximity(&mut zones);

    let risk_level = determine_risk_level(&zones);
    let affected_by_landslide = any_affects(&zones);
    let description = generate_description(risk_level, &zones);
    let recommendations = generate_recommendations(risk_level, &zones);

    Ok(LandslideReport {
        risk_level,
        zones,
        affected_by_landslide,
        description,
        recommendations,
    })
}

/// Deterministic fallback when the category cannot be assessed.
#[must_use]
pub fn minimal_report() -> LandslideReport {
    LandslideReport {
        risk_level: RiskLevel::Minimal,
        zones: Vec::new(),
        affected_by_landslide: false,
        description: fallback_description(),
        recommendations: Vec::new(),
    }
}

fn fallback_description() -> String {
    "No landslide or steep land constraints identified within the search area.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BrokenSource, StaticSource, polygon_feature};
    use serde_json::json;

    fn zone(
        hazard_type: Option<&str>,
        affects: bool,
        distance_m: Option<f64>,
    ) -> LandslideHazardZone {
        LandslideHazardZone {
            hazard_type: hazard_type.map(String::from),
            zone_code: None,
            affects_property: affects,
            distance: distance_m.map(Measurement::metres),
        }
    }

    #[test]
    fn affecting_zone_is_very_high_with_geotech_text() {
        let zones = vec![zone(Some("Landslip"), true, Some(0.0))];
        let level = determine_risk_level(&zones);
        assert_eq!(level, RiskLevel::VeryHigh);
        let description = generate_description(level, &zones);
        assert!(description.contains("Significant geotechnical constraints apply."));
    }

    #[test]
    fn no_low_bucket_falls_to_minimal() {
        assert_eq!(
            determine_risk_level(&[zone(None, false, Some(150.0))]),
            RiskLevel::Minimal
        );
        assert_eq!(
            determine_risk_level(&[zone(None, false, Some(100.0))]),
            RiskLevel::Minimal
        );
        assert_eq!(
            determine_risk_level(&[zone(None, false, Some(99.9))]),
            RiskLevel::Moderate
        );
        assert_eq!(
            determine_risk_level(&[zone(None, false, Some(50.0))]),
            RiskLevel::Moderate
        );
        assert_eq!(
            determine_risk_level(&[zone(None, false, Some(49.999))]),
            RiskLevel::High
        );
    }

    #[test]
    fn landslip_recommendations_exclude_erosion_strings() {
        let zones = vec![zone(Some("Landslip"), true, Some(0.0))];
        let recommendations = generate_recommendations(RiskLevel::VeryHigh, &zones);
        assert!(recommendations.contains(
            &"Landslip Overlay applies - planning permit required for most development"
                .to_string()
        ));
        assert!(!recommendations.iter().any(|r| r.contains("Erosion")));
        // 3 Landslip-specific + 5 generic.
        assert_eq!(recommendations.len(), 8);
    }

    #[test]
    fn both_subtypes_concatenate_to_exactly_ten_strings() {
        let zones = vec![
            zone(Some("Landslip"), true, Some(0.0)),
            zone(Some("Erosion Management"), true, Some(0.0)),
        ];
        let recommendations = generate_recommendations(RiskLevel::VeryHigh, &zones);
        assert_eq!(recommendations.len(), 10);
        // Landslip block first, then Erosion, then the generic closing block.
        assert_eq!(
            recommendations[0],
            "Landslip Overlay applies - planning permit required for most development"
        );
        assert_eq!(
            recommendations[3],
            "Erosion Management Overlay applies - site disturbance controls required"
        );
        assert_eq!(
            recommendations[5],
            "Obtain a detailed geotechnical site investigation before purchase"
        );
    }

    #[test]
    fn nearby_zones_are_not_named_in_narrative() {
        let zones = vec![
            LandslideHazardZone {
                hazard_type: Some("Landslip".to_string()),
                zone_code: Some("LSO1".to_string()),
                affects_property: true,
                distance: Some(Measurement::metres(0.0)),
            },
            LandslideHazardZone {
                hazard_type: Some("Landslip".to_string()),
                zone_code: Some("LSO9".to_string()),
                affects_property: false,
                distance: Some(Measurement::metres(40.0)),
            },
        ];
        let description = generate_description(RiskLevel::VeryHigh, &zones);
        assert!(description.contains("LSO1"));
        assert!(!description.contains("LSO9"));
    }

    #[tokio::test]
    async fn affecting_overlay_end_to_end() {
        let (lat, lon) = (-37.8136, 144.9631);
        let source = StaticSource::new(vec![(
            LAYER,
            vec![polygon_feature(
                lon,
                lat,
                0.001,
                vec![
                    ("HAZARD_TYPE", json!("Landslip")),
                    ("ZONE_CODE", json!("LSO2")),
                ],
            )],
        )]);
        let report = assess_at(lat, lon, &source).await;
        assert_eq!(report.risk_level, RiskLevel::VeryHigh);
        assert!(report.affected_by_landslide);
        assert!(report.description.contains("LSO2"));
        assert_eq!(report.recommendations.len(), 8);
    }

    #[tokio::test]
    async fn outage_degrades_to_minimal() {
        let report = assess_at(-37.8136, 144.9631, &BrokenSource).await;
        assert_eq!(report.risk_level, RiskLevel::Minimal);
        assert_eq!(
            report.description,
            "No landslide or steep land constraints identified within the search area."
        );
    }
}
