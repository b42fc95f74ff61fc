//! Easement assessment.
//!
//! Queries the registered easement layer (drainage, sewerage, carriageway
//! and party-wall easements) and classifies by containment and proximity.
//! Easement layers publish either a width or a parcel area for the same
//! entity, so each record carries a kind-tagged dimension when one is
//! published.

use geo::Point;
use property_report_features::{FeatureSource, GeographicFeature, buffer_degrees};
use property_report_geocoder::{Address, Geocoder};
use property_report_hazard_models::{
    EasementMeasurement, Measurement, MeasurementKind, RiskLevel,
};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::HazardError;
use crate::common::{
    HazardRecord, any_affects, feature_proximity, nearest_distance_m, sort_by_proximity,
};

/// Feature-service layer holding registered easements.
pub const LAYER: &str = "easements";

/// Search buffer radius in metres.
pub const SEARCH_RADIUS_M: f64 = 200.0;

/// A normalized easement near the property.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Easement {
    /// Easement purpose label, e.g. `"Drainage"`.
    pub purpose: Option<String>,
    /// Beneficiary authority, if published.
    pub beneficiary: Option<String>,
    /// Published width or area, when the layer carries one.
    pub dimension: Option<EasementMeasurement>,
    /// True when the easement lies on the property.
    pub affects_property: bool,
    /// Nearest distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl HazardRecord for Easement {
    fn affects_property(&self) -> bool {
        self.affects_property
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// Easement category report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EasementReport {
    /// Classified significance tier.
    pub significance_level: RiskLevel,
    /// Normalized easements, affects-property first then nearest.
    pub easements: Vec<Easement>,
    /// True when any easement lies on the property.
    pub affected_by_easement: bool,
    /// Narrative summary.
    pub description: String,
    /// Ordered mitigation recommendations.
    pub recommendations: Vec<String>,
}

/// Extracts the kind-tagged dimension from an easement property bag.
///
/// Width fields win over area fields when both are published, since a
/// width is the more actionable constraint for building works.
#[must_use]
pub fn parse_dimension(properties: &Map<String, Value>) -> Option<EasementMeasurement> {
    use property_report_features::properties::prop_f64;

    if let Some(width) = prop_f64(properties, "WIDTH_M") {
        return Some(EasementMeasurement {
            kind: MeasurementKind::Length,
            measurement: width,
            unit: "metres".to_string(),
        });
    }
    prop_f64(properties, "AREA_SQM").map(|area| EasementMeasurement {
        kind: MeasurementKind::Area,
        measurement: area,
        unit: "square metres".to_string(),
    })
}

/// Normalizes raw easement features.
#[must_use]
pub fn normalize(point: Point<f64>, features: &[GeographicFeature]) -> Vec<Easement> {
    use property_report_features::properties::prop_str;

    features
        .iter()
        .map(|feature| {
            let (distance, affects_property) = feature_proximity(point, feature);
            Easement {
                purpose: prop_str(&feature.properties, "PURPOSE"),
                beneficiary: prop_str(&feature.properties, "BENEFICIARY"),
                dimension: parse_dimension(&feature.properties),
                affects_property,
                distance,
            }
        })
        .collect()
}

/// Classifies easement significance.
///
/// Ordered rules, first match wins: any easement on the property ⇒
/// `VERY_HIGH`; nearest `< 50 m` ⇒ `HIGH`; `< 100 m` ⇒ `MODERATE`;
/// `< 200 m` ⇒ `LOW`; else `MINIMAL`.
#[must_use]
pub fn determine_significance(easements: &[Easement]) -> RiskLevel {
    if any_affects(easements) {
        return RiskLevel::VeryHigh;
    }
    match nearest_distance_m(easements) {
        Some(d) if d < 50.0 => RiskLevel::High,
        Some(d) if d < 100.0 => RiskLevel::Moderate,
        Some(d) if d < 200.0 => RiskLevel::Low,
        _ => RiskLevel::Minimal,
    }
}

/// Narrative description for the classified tier.
#[must_use]
pub fn generate_description(level: RiskLevel, easements: &[Easement]) -> String {
    use crate::common::affecting_names;

    match level {
        RiskLevel::VeryHigh => {
            let purposes = affecting_names(easements, |e| e.purpose.as_deref());
            if purposes.is_empty() {
                "A registered easement lies on the property. Building over the easement \
                 requires authority consent."
                    .to_string()
            } else {
                format!(
                    "Registered easement(s) on the property: {purposes}. Building over an \
                     easement requires authority consent."
                )
            }
        }
        RiskLevel::High => {
            "A registered easement lies within 50 metres of the property.".to_string()
        }
        RiskLevel::Moderate => {
            "A registered easement lies within 100 metres of the property.".to_string()
        }
        RiskLevel::Low => {
            "A registered easement lies within 200 metres of the property.".to_string()
        }
        RiskLevel::Minimal => fallback_description(),
    }
}

/// Ordered mitigation recommendations.
#[must_use]
pub fn generate_recommendations(level: RiskLevel) -> Vec<String> {
    let strings: &[&str] = match level {
        RiskLevel::VeryHigh => &[
            "Obtain build-over-easement consent from the beneficiary authority before any works",
            "Review the title plan for the exact easement location and width",
            "Locate underground assets before excavation",
        ],
        RiskLevel::High | RiskLevel::Moderate => {
            &["Review the title plan for easements on adjoining parcels"]
        }
        RiskLevel::Low | RiskLevel::Minimal => &[],
    };
    strings.iter().map(ToString::to_string).collect()
}

/// Assesses the easement category for a street address.
///
/// Never fails: geocoding or data-source errors degrade to the minimal
/// report.
pub async fn assess(
    address: &Address,
    geocoder: &dyn Geocoder,
    source: &dyn FeatureSource,
) -> EasementReport {
    match geocoder.geocode(address).await {
        Ok(point) => assess_at(point.latitude, point.longitude, source).await,
        Err(err) => {
            log::warn!("Easement assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

/// Assesses the easement category for a pre-resolved coordinate.
pub async fn assess_at(lat: f64, lon: f64, source: &dyn FeatureSource) -> EasementReport {
    match try_assess(lat, lon, source).await {
        Ok(report) => report,
        Err(err) => {
            log::warn!("Easement assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

async fn try_assess(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
) -> Result<EasementReport, HazardError> {
    let features = source
        .query(lat, lon, buffer_degrees(SEARCH_RADIUS_M), LAYER)
        .await?;

    let point = Point::new(lon, lat);
    let mut easements = normalize(point, &features);
    sort_by_proximity(&mut easements);

    let significance_level = determine_significance(&easements);
    let affected_by_easement = any_affects(&easements);
    let description = generate_description(significance_level, &easements);
    let recommendations = generate_recommendations(significance_level);

    Ok(EasementReport {
        significance_level,
        easements,
        affected_by_easement,
        description,
        recommendations,
    })
}

/// Deterministic fallback when the category cannot be assessed.
#[must_use]
pub fn minimal_report() -> EasementReport {
    EasementReport {
        significance_level: RiskLevel::Minimal,
        easements: Vec::new(),
        affected_by_easement: false,
        description: fallback_description(),
        recommendations: Vec::new(),
    }
}

fn fallback_description() -> String {
    "No registered easements identified within the search area.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticSource, polygon_feature};
    use serde_json::json;

    fn easement(affects: bool, distance_m: Option<f64>) -> Easement {
        Easement {
            purpose: None,
            beneficiary: None,
            dimension: None,
            affects_property: affects,
            distance: distance_m.map(Measurement::metres),
        }
    }

    #[test]
    fn boundary_values_fall_to_less_severe_bucket() {
        assert_eq!(
            determine_significance(&[easement(false, Some(50.0))]),
            RiskLevel::Moderate
        );
        assert_eq!(
            determine_significance(&[easement(false, Some(200.0))]),
            RiskLevel::Minimal
        );
    }

    #[test]
    fn width_wins_over_area() {
        let mut bag = Map::new();
        bag.insert("WIDTH_M".to_string(), json!("3.0"));
        bag.insert("AREA_SQM".to_string(), json!(120.0));
        let dim = parse_dimension(&bag).unwrap();
        assert_eq!(dim.kind, MeasurementKind::Length);
        assert!((dim.measurement - 3.0).abs() < f64::EPSILON);
        assert_eq!(dim.unit, "metres");
    }

    #[test]
    fn area_only_bag_yields_area_dimension() {
        let mut bag = Map::new();
        bag.insert("AREA_SQM".to_string(), json!(85.5));
        let dim = parse_dimension(&bag).unwrap();
        assert_eq!(dim.kind, MeasurementKind::Area);
        assert_eq!(dim.unit, "square metres");
    }

    #[test]
    fn missing_dimension_is_absent() {
        assert!(parse_dimension(&Map::new()).is_none());
    }

    #[tokio::test]
    async fn on_property_easement_end_to_end() {
        let (lat, lon) = (-37.8136, 144.9631);
        let source = StaticSource::new(vec![(
            LAYER,
            vec![polygon_feature(
                lon,
                lat,
                0.001,
                vec![("PURPOSE", json!("Drainage")), ("WIDTH_M", json!(2.5))],
            )],
        )]);
        let report = assess_at(lat, lon, &source).await;
        assert_eq!(report.significance_level, RiskLevel::VeryHigh);
        assert!(report.description.contains("Drainage"));
        let dim = report.easements[0].dimension.as_ref().unwrap();
        assert_eq!(dim.kind, MeasurementKind::Length);
    }

    #[tokio::test]
    async fn empty_layer_is_minimal() {
        let report = assess_at(-37.8136, 144.9631, &StaticSource::empty()).await;
        assert_eq!(report.significance_level, RiskLevel::Minimal);
        assert_eq!(
            report.description,
            "No registered easements identified within the search area."
        );
    }
}
