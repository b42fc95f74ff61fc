//! Odour source assessment.
//!
//! Queries the registered odour source layer (landfills, wastewater
//! treatment plants, intensive agriculture) and combines per-source
//! distance bands into an additive weighted score. Each source kind has
//! its own band table and its own cap, so a cluster of one kind cannot
//! dominate the score alone.

use geo::Point;
use property_report_features::{FeatureSource, GeographicFeature, buffer_degrees};
use property_report_geocoder::{Address, Geocoder};
use property_report_hazard_models::{Measurement, RiskLevel};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::HazardError;
use crate::common::{HazardRecord, any_affects, feature_proximity, sort_by_proximity};

/// Feature-service layer holding registered odour sources.
pub const LAYER: &str = "odour_sources";

/// Search buffer radius in metres; matches the widest scoring band.
pub const SEARCH_RADIUS_M: f64 = 2_000.0;

/// Kind of odour source, parsed from the layer's source-type field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OdourSourceKind {
    /// Operating or closed landfill.
    Landfill,
    /// Wastewater / sewage treatment plant.
    Wastewater,
    /// Intensive agriculture (poultry, piggery, feedlot).
    Agriculture,
    /// Any other registered source.
    Other,
}

impl OdourSourceKind {
    fn parse(label: Option<&str>) -> Self {
        let Some(label) = label else {
            return Self::Other;
        };
        let lower = label.to_ascii_lowercase();
        if lower.contains("landfill") || lower.contains("tip") {
            Self::Landfill
        } else if lower.contains("wastewater") || lower.contains("sewage") {
            Self::Wastewater
        } else if lower.contains("poultry")
            || lower.contains("piggery")
            || lower.contains("feedlot")
            || lower.contains("agricult")
        {
            Self::Agriculture
        } else {
            Self::Other
        }
    }
}

/// A normalized odour source near the property.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OdourSource {
    /// Parsed source kind.
    pub kind: OdourSourceKind,
    /// Facility name, if published.
    pub name: Option<String>,
    /// True when the source site covers the property.
    pub affects_property: bool,
    /// Nearest distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl HazardRecord for OdourSource {
    fn affects_property(&self) -> bool {
        self.affects_property
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// Distance bands and caps for the odour score. Part of the classification
/// contract; named so the weights are visible and testable.
#[derive(Debug, Clone, Copy)]
pub struct OdourWeights {
    /// Landfill points for `< 500 m` / `< 1 km` / `< 2 km`.
    pub landfill_bands: [u32; 3],
    /// Cap on total landfill points.
    pub landfill_cap: u32,
    /// Wastewater points for `< 500 m` / `< 1 km` / `< 2 km`.
    pub wastewater_bands: [u32; 3],
    /// Cap on total wastewater points.
    pub wastewater_cap: u32,
    /// Agriculture/other points for `< 1 km` / `< 2 km`.
    pub agriculture_bands: [u32; 2],
    /// Cap on total agriculture/other points.
    pub agriculture_cap: u32,
}

impl Default for OdourWeights {
    fn default() -> Self {
        Self {
            landfill_bands: [4, 3, 2],
            landfill_cap: 4,
            wastewater_bands: [3, 2, 1],
            wastewater_cap: 3,
            agriculture_bands: [2, 1],
            agriculture_cap: 2,
        }
    }
}

/// Odour category report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OdourReport {
    /// Classified risk tier.
    pub risk_level: RiskLevel,
    /// The computed weighted score.
    pub score: u32,
    /// Normalized sources, affects-property first then nearest.
    pub sources: Vec<OdourSource>,
    /// True when a source site covers the property.
    pub affected_by_odour_source: bool,
    /// Narrative summary.
    pub description: String,
    /// Ordered mitigation recommendations.
    pub recommendations: Vec<String>,
}

/// Normalizes raw odour source features.
#[must_use]
pub fn normalize(point: Point<f64>, features: &[GeographicFeature]) -> Vec<OdourSource> {
    use property_report_features::properties::prop_str;

    features
        .iter()
        .map(|feature| {
            let (distance, affects_property) = feature_proximity(point, feature);
            let kind =
                OdourSourceKind::parse(prop_str(&feature.properties, "SOURCE_TYPE").as_deref());
            OdourSource {
                kind,
                name: prop_str(&feature.properties, "FACILITY_NAME")
                    .or_else(|| prop_str(&feature.properties, "NAME")),
                affects_property,
                distance,
            }
        })
        .collect()
}

/// Computes the weighted odour score from scratch.
#[must_use]
pub fn odour_score(sources: &[OdourSource], weights: &OdourWeights) -> u32 {
    let mut landfill = 0u32;
    let mut wastewater = 0u32;
    let mut agriculture = 0u32;

    for source in sources {
        let Some(d) = source.distance_m().filter(|d| d.is_finite()) else {
            continue;
        };
        match source.kind {
            OdourSourceKind::Landfill => landfill += three_band(d, weights.landfill_bands),
            OdourSourceKind::Wastewater => wastewater += three_band(d, weights.wastewater_bands),
            OdourSourceKind::Agriculture | OdourSourceKind::Other => {
                agriculture += two_band(d, weights.agriculture_bands);
            }
        }
    }

    landfill.min(weights.landfill_cap)
        + wastewater.min(weights.wastewater_cap)
        + agriculture.min(weights.agriculture_cap)
}

const fn three_band(distance_m: f64, bands: [u32; 3]) -> u32 {
    if distance_m < 500.0 {
        bands[0]
    } else if distance_m < 1_000.0 {
        bands[1]
    } else if distance_m < 2_000.0 {
        bands[2]
    } else {
        0
    }
}

const fn two_band(distance_m: f64, bands: [u32; 2]) -> u32 {
    if distance_m < 1_000.0 {
        bands[0]
    } else if distance_m < 2_000.0 {
        bands[1]
    } else {
        0
    }
}

/// Maps a weighted score to a tier: `>= 7` ⇒ `VERY_HIGH`, `>= 5` ⇒ `HIGH`,
/// `>= 3` ⇒ `MODERATE`, `>= 1` ⇒ `LOW`, else `MINIMAL`.
#[must_use]
pub const fn determine_risk_level(score: u32) -> RiskLevel {
    if score >= 7 {
        RiskLevel::VeryHigh
    } else if score >= 5 {
        RiskLevel::High
    } else if score >= 3 {
        RiskLevel::Moderate
    } else if score >= 1 {
        RiskLevel::Low
    } else {
        RiskLevel::Minimal
    }
}

/// Narrative description for the classified tier.
#[must_use]
pub fn generate_description(level: RiskLevel, sources: &[OdourSource]) -> String {
    use crate::common::affecting_names;

    match level {
        RiskLevel::VeryHigh => {
            let names = affecting_names(sources, |s| s.name.as_deref());
            if names.is_empty() {
                "Multiple significant odour sources operate in close proximity to the \
                 property."
                    .to_string()
            } else {
                format!(
                    "The property adjoins registered odour source(s): {names}. Amenity \
                     impacts are likely."
                )
            }
        }
        RiskLevel::High => {
            "Significant odour sources operate near the property. Periodic amenity impacts \
             are likely under adverse winds."
                .to_string()
        }
        RiskLevel::Moderate => {
            "Registered odour sources operate within 2 kilometres of the property."
                .to_string()
        }
        RiskLevel::Low => {
            "A registered odour source operates in the broader area around the property."
                .to_string()
        }
        RiskLevel::Minimal => fallback_description(),
    }
}

/// Ordered mitigation recommendations.
#[must_use]
pub fn generate_recommendations(level: RiskLevel) -> Vec<String> {
    let strings: &[&str] = match level {
        RiskLevel::VeryHigh | RiskLevel::High => &[
            "Inspect the property under different wind conditions before purchase",
            "Review EPA licence conditions and complaint history for nearby facilities",
            "Check planned closure or rehabilitation timelines for nearby facilities",
        ],
        RiskLevel::Moderate => &[
            "Inspect the property under different wind conditions before purchase",
            "Review EPA licence conditions and complaint history for nearby facilities",
        ],
        RiskLevel::Low => &["Check the locations of registered odour sources in the area"],
        RiskLevel::Minimal => &[],
    };
    strings.iter().map(ToString::to_string).collect()
}

/// Assesses the odour category for a street address.
///
/// Never fails: geocoding or data-source errors degrade to the minimal
/// report.
pub async fn assess(
    address: &Address,
    geocoder: &dyn Geocoder,
    source: &dyn FeatureSource,
) -> OdourReport {
    match geocoder.geocode(address).await {
        Ok(point) => assess_at(point.latitude, point.longitude, source).await,
        Err(err) => {
            log::warn!("Odour assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

/// Assesses the odour category for a pre-resolved coordinate.
pub async fn assess_at(lat: f64, lon: f64, source: &dyn FeatureSource) -> OdourReport {
    match try_assess(lat, lon, source).await {
        Ok(report) => report,
        Err(err) => {
            log::warn!("Odour assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

async fn try_assess(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
) -> Result<OdourReport, HazardError> {
    let features = source
        .query(lat, lon, buffer_degrees(SEARCH_RADIUS_M), LAYER)
        .await?;

    let point = Point::new(lon, lat);
    let mut sources = normalize(point, &features);
    sort_by_proximity(&mut sources);

    let weights = OdourWeights::default();
    let score = odour_score(&sources, &weights);
    let risk_level = determine_risk_level(score);
    let affected_by_odour_source = any_affects(&sources);
    let description = generate_description(risk_level, &sources);
    let recommendations = generate_recommendations(risk_level);

    Ok(OdourReport {
        risk_level,
        score,
        sources,
        affected_by_odour_source,
        description,
        recommendations,
    })
}

/// Deterministic fallback when the category cannot be assessed.
#[must_use]
pub fn minimal_report() -> OdourReport {
    OdourReport {
        risk_level: RiskLevel::Minimal,
        score: 0,
        sources: Vec::new(),
        affected_by_odour_source: false,
        description: fallback_description(),
        recommendations: Vec::new(),
    }
}

fn fallback_description() -> String {
    "No registered odour sources identified within the search area.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{StaticSource, point_feature};
    use serde_json::json;

    fn source(kind: OdourSourceKind, distance_m: f64) -> OdourSource {
        OdourSource {
            kind,
            name: None,
            affects_property: false,
            distance: Some(Measurement::metres(distance_m)),
        }
    }

    #[test]
    fn close_landfill_and_wastewater_reach_very_high() {
        let weights = OdourWeights::default();
        let sources = vec![
            source(OdourSourceKind::Landfill, 400.0),
            source(OdourSourceKind::Wastewater, 450.0),
        ];
        let score = odour_score(&sources, &weights);
        assert_eq!(score, 7);
        assert_eq!(determine_risk_level(score), RiskLevel::VeryHigh);
    }

    #[test]
    fn per_kind_caps_prevent_domination() {
        let weights = OdourWeights::default();
        // Three close landfills would be 12 uncapped.
        let sources = vec![
            source(OdourSourceKind::Landfill, 100.0),
            source(OdourSourceKind::Landfill, 200.0),
            source(OdourSourceKind::Landfill, 300.0),
        ];
        assert_eq!(odour_score(&sources, &weights), 4);
    }

    #[test]
    fn band_boundaries_fall_to_weaker_band() {
        let weights = OdourWeights::default();
        assert_eq!(
            odour_score(&[source(OdourSourceKind::Landfill, 500.0)], &weights),
            3
        );
        assert_eq!(
            odour_score(&[source(OdourSourceKind::Landfill, 2_000.0)], &weights),
            0
        );
    }

    #[test]
    fn score_thresholds_map_to_tiers() {
        assert_eq!(determine_risk_level(7), RiskLevel::VeryHigh);
        assert_eq!(determine_risk_level(5), RiskLevel::High);
        assert_eq!(determine_risk_level(3), RiskLevel::Moderate);
        assert_eq!(determine_risk_level(1), RiskLevel::Low);
        assert_eq!(determine_risk_level(0), RiskLevel::Minimal);
    }

    #[test]
    fn source_kind_parsing_is_lenient() {
        assert_eq!(
            OdourSourceKind::parse(Some("Closed Landfill")),
            OdourSourceKind::Landfill
        );
        assert_eq!(
            OdourSourceKind::parse(Some("Sewage Treatment")),
            OdourSourceKind::Wastewater
        );
        assert_eq!(
            OdourSourceKind::parse(Some("Poultry farm")),
            OdourSourceKind::Agriculture
        );
        assert_eq!(OdourSourceKind::parse(None), OdourSourceKind::Other);
    }

    #[tokio::test]
    async fn nearby_landfill_end_to_end() {
        let (lat, lon) = (-37.8136, 144.9631);
        // ~0.004 degrees of longitude ≈ 350 m at this latitude.
        let source = StaticSource::new(vec![(
            LAYER,
            vec![point_feature(
                lon + 0.004,
                lat,
                vec![
                    ("SOURCE_TYPE", json!("Landfill")),
                    ("FACILITY_NAME", json!("West Gate Tip")),
                ],
            )],
        )]);
        let report = assess_at(lat, lon, &source).await;
        assert_eq!(report.score, 4);
        assert_eq!(report.risk_level, RiskLevel::Moderate);
        assert!(!report.affected_by_odour_source);
    }

    #[tokio::test]
    async fn empty_layer_is_minimal() {
        let report = assess_at(-37.8136, 144.9631, &StaticSource::empty()).await;
        assert_eq!(report.risk_level, RiskLevel::Minimal);
        assert_eq!(report.score, 0);
        assert_eq!(
            report.description,
            "No registered odour sources identified within the search area."
        );
    }
}
