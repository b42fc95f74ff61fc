//! Waterway proximity assessment.
//!
//! Queries the waterways layer (rivers, creeks and drainage lines) around
//! the property and classifies significance by nearest-feature distance.

use geo::Point;
use property_report_features::{FeatureSource, GeographicFeature, buffer_degrees};
use property_report_geocoder::{Address, Geocoder};
use property_report_hazard_models::{Measurement, RiskLevel};
use serde::Serialize;

use crate::HazardError;
use crate::common::{
    HazardRecord, any_affects, feature_proximity, nearest_distance_m, sort_by_proximity,
};

/// Feature-service layer holding waterway centrelines.
pub const LAYER: &str = "waterways";

/// Search buffer radius in metres. Matches the outermost classification
/// bucket; anything farther cannot change the tier.
pub const SEARCH_RADIUS_M: f64 = 200.0;

/// A normalized waterway feature near the property.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterwayFeature {
    /// Waterway name, if the layer published one.
    pub name: Option<String>,
    /// Feature type (e.g. "river", "drainage line").
    pub waterway_type: Option<String>,
    /// True when the property point falls within the waterway feature.
    pub in_buffer: bool,
    /// Nearest distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl HazardRecord for WaterwayFeature {
    fn affects_property(&self) -> bool {
        self.in_buffer
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// Waterway category report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WaterwayReport {
    /// Classified significance tier.
    pub significance_level: RiskLevel,
    /// Normalized waterway features, affects-property first then nearest.
    pub features: Vec<WaterwayFeature>,
    /// True when any waterway feature covers the property.
    pub affected_by_waterway: bool,
    /// Narrative summary.
    pub description: String,
    /// Ordered mitigation recommendations.
    pub recommendations: Vec<String>,
}

/// Normalizes raw features into [`WaterwayFeature`] records with distance
/// computed once from the property point.
#[must_use]
pub fn normalize(point: Point<f64>, features: &[GeographicFeature]) -> Vec<WaterwayFeature> {
    use property_report_features::properties::prop_str;

    features
        .iter()
        .map(|feature| {
            let (distance, in_buffer) = feature_proximity(point, feature);
            WaterwayFeature {
                name: prop_str(&feature.properties, "NAME")
                    .or_else(|| prop_str(&feature.properties, "name")),
                waterway_type: prop_str(&feature.properties, "FEATURE_TYPE")
                    .or_else(|| prop_str(&feature.properties, "type")),
                in_buffer,
                distance,
            }
        })
        .collect()
}

/// Classifies waterway significance.
///
/// Ordered rules, first match wins: in buffer ⇒ `VERY_HIGH`; nearest
/// `< 50 m` ⇒ `HIGH`; `< 100 m` ⇒ `MODERATE`; `< 200 m` ⇒ `LOW`; else
/// `MINIMAL`. A distance exactly on a boundary belongs to the less severe
/// bucket.
#[must_use]
pub fn determine_significance(features: &[WaterwayFeature]) -> RiskLevel {
    if any_affects(features) {
        return RiskLevel::VeryHigh;
    }
    match nearest_distance_m(features) {
        Some(d) if d < 50.0 => RiskLevel::High,
        Some(d) if d < 100.0 => RiskLevel::Moderate,
        Some(d) if d < 200.0 => RiskLevel::Low,
        _ => RiskLevel::Minimal,
    }
}

/// Narrative description for the classified tier.
#[must_use]
pub fn generate_description(level: RiskLevel, features: &[WaterwayFeature]) -> String {
    use crate::common::affecting_names;

    match level {
        RiskLevel::VeryHigh => {
            let names = affecting_names(features, |f| f.name.as_deref());
            if names.is_empty() {
                "A waterway runs through the property. Development is subject to waterway \
                 protection controls."
                    .to_string()
            } else {
                format!(
                    "The property is traversed by {names}. Development is subject to waterway \
                     protection controls."
                )
            }
        }
        RiskLevel::High => {
            "A waterway lies within 50 metres of the property. Setback and overland flow \
             requirements are likely to apply."
                .to_string()
        }
        RiskLevel::Moderate => {
            "A waterway lies within 100 metres of the property. Some drainage and setback \
             controls may apply."
                .to_string()
        }
        RiskLevel::Low => {
            "A waterway lies within 200 metres of the property. No direct constraints are \
             expected."
                .to_string()
        }
        RiskLevel::Minimal => fallback_description(),
    }
}

/// Ordered mitigation recommendations for the classified tier.
#[must_use]
pub fn generate_recommendations(level: RiskLevel) -> Vec<String> {
    let strings: &[&str] = match level {
        RiskLevel::VeryHigh => &[
            "Maintain riparian vegetation and waterway buffers",
            "Engage council regarding waterway protection overlay requirements",
            "Obtain a flood and drainage assessment before any works",
            "Do not alter the waterway channel or banks without a permit",
        ],
        RiskLevel::High => &[
            "Maintain riparian vegetation and waterway buffers",
            "Confirm building setbacks from the waterway with council",
            "Design stormwater discharge to avoid bank erosion",
        ],
        RiskLevel::Moderate => &[
            "Check drainage easements and overland flow paths on the title",
            "Design stormwater discharge to avoid bank erosion",
        ],
        RiskLevel::Low => &["Check drainage easements and overland flow paths on the title"],
        RiskLevel::Minimal => &[],
    };
    strings.iter().map(ToString::to_string).collect()
}

/// Assesses the waterway category for a street address.
///
/// Never fails: geocoding or data-source errors degrade to the minimal
/// report.
pub async fn assess(
    address: &Address,
    geocoder: &dyn Geocoder,
    source: &dyn FeatureSource,
) -> WaterwayReport {
    match geocoder.geocode(address).await {
        Ok(point) => assess_at(point.latitude, point.longitude, source).await,
        Err(err) => {
            log::warn!("Waterway assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

/// Assesses the waterway category for a pre-resolved coordinate.
pub async fn assess_at(lat: f64, lon: f64, source: &dyn FeatureSource) -> WaterwayReport {
    match try_assess(lat, lon, source).await {
        Ok(report) => report,
        Err(err) => {
            log::warn!("Waterway assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

async fn try_assess(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
) -> Result<WaterwayReport, HazardError> {
    let features = source
        .query(lat, lon, buffer_degrees(SEARCH_RADIUS_M), LAYER)
        .await?;

    let point = Point::new(lon, lat);
    let mut records = normalize(point, &features);
    sort_by_proximity(&mut records);

    let significance_level = determine_significance(&records);
    let affected_by_waterway = any_affects(&records);
    let description = generate_description(significance_level, &records);
    let recommendations = generate_recommendations(significance_level);

    Ok(WaterwayReport {
        significance_level,
        features: records,
        affected_by_waterway,
        description,
        recommendations,
    })
}

/// Deterministic fallback when the category cannot be assessed.
#[must_use]
pub fn minimal_report() -> WaterwayReport {
    WaterwayReport {
        significance_level: RiskLevel::Minimal,
        features: Vec::new(),
        affected_by_waterway: false,
        description: fallback_description(),
        recommendations: Vec::new(),
    }
}

fn fallback_description() -> String {
    "No waterway constraints identified within the search area.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{
        BrokenSource, FailingGeocoder, StaticSource, StubGeocoder, melbourne_address,
        polygon_feature,
    };
    use serde_json::json;

    fn feature_at(distance_m: Option<f64>, in_buffer: bool) -> WaterwayFeature {
        WaterwayFeature {
            name: None,
            waterway_type: None,
            in_buffer,
            distance: distance_m.map(Measurement::metres),
        }
    }

    #[test]
    fn in_buffer_wins_regardless_of_distance() {
        let features = vec![feature_at(Some(500.0), true)];
        assert_eq!(determine_significance(&features), RiskLevel::VeryHigh);
    }

    #[test]
    fn boundary_values_fall_to_less_severe_bucket() {
        assert_eq!(
            determine_significance(&[feature_at(Some(49.999), false)]),
            RiskLevel::High
        );
        assert_eq!(
            determine_significance(&[feature_at(Some(50.0), false)]),
            RiskLevel::Moderate
        );
        assert_eq!(
            determine_significance(&[feature_at(Some(100.0), false)]),
            RiskLevel::Low
        );
        assert_eq!(
            determine_significance(&[feature_at(Some(200.0), false)]),
            RiskLevel::Minimal
        );
    }

    #[test]
    fn classification_is_order_independent() {
        let a = vec![
            feature_at(Some(150.0), false),
            feature_at(Some(30.0), false),
        ];
        let b = vec![
            feature_at(Some(30.0), false),
            feature_at(Some(150.0), false),
        ];
        assert_eq!(determine_significance(&a), determine_significance(&b));
        assert_eq!(determine_significance(&a), RiskLevel::High);
    }

    #[test]
    fn unknown_distance_is_excluded() {
        let features = vec![feature_at(None, false)];
        assert_eq!(determine_significance(&features), RiskLevel::Minimal);
    }

    #[tokio::test]
    async fn in_buffer_feature_yields_very_high_end_to_end() {
        // Property at Melbourne CBD; one waterway polygon covering it.
        let (lat, lon) = (-37.8136, 144.9631);
        let source = StaticSource::new(vec![(
            LAYER,
            vec![polygon_feature(
                lon,
                lat,
                0.001,
                vec![("NAME", json!("Yarra River"))],
            )],
        )]);
        let geocoder = StubGeocoder {
            latitude: lat,
            longitude: lon,
        };

        let report = assess(&melbourne_address(), &geocoder, &source).await;
        assert_eq!(report.significance_level, RiskLevel::VeryHigh);
        assert!(report.affected_by_waterway);
        assert!(report.description.contains("Yarra River"));
        assert!(
            report
                .recommendations
                .iter()
                .any(|r| r == "Maintain riparian vegetation and waterway buffers")
        );
        assert_eq!(report.significance_level.to_string(), "VERY_HIGH");
    }

    #[tokio::test]
    async fn empty_layer_yields_minimal_fallback() {
        let report = assess_at(-37.8136, 144.9631, &StaticSource::empty()).await;
        assert_eq!(report.significance_level, RiskLevel::Minimal);
        assert!(report.features.is_empty());
        assert_eq!(
            report.description,
            "No waterway constraints identified within the search area."
        );
    }

    #[tokio::test]
    async fn source_outage_degrades_to_minimal() {
        let report = assess_at(-37.8136, 144.9631, &BrokenSource).await;
        assert_eq!(report.significance_level, RiskLevel::Minimal);
        assert!(report.recommendations.is_empty());
    }

    #[tokio::test]
    async fn geocode_failure_degrades_to_minimal() {
        let report = assess(
            &melbourne_address(),
            &FailingGeocoder,
            &StaticSource::empty(),
        )
        .await;
        assert_eq!(report.significance_level, RiskLevel::Minimal);
        assert!(!report.affected_by_waterway);
    }
}
