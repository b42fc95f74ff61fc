//! Bushfire risk assessment.
//!
//! Unlike the distance-bucket categories, bushfire combines several
//! independent signals — bushfire-prone-area overlay membership, fire
//! management zone membership, counts of recorded fires within 5 and
//! 10 km, and fire recency — into an additive weighted score. Individual
//! signals are capped so one noisy layer cannot dominate. The score is
//! recomputed from scratch per address; nothing is cached.

use chrono::Datelike;
use futures::join;
use geo::Point;
use property_report_features::{FeatureSource, GeographicFeature, buffer_degrees};
use property_report_geocoder::{Address, Geocoder};
use property_report_hazard_models::{BushfireRiskLevel, Measurement};
use serde::Serialize;

use crate::HazardError;
use crate::common::{HazardRecord, centroid_proximity, feature_proximity, sort_by_proximity};

/// Layer of designated bushfire-prone areas and fire management zones.
pub const PRONE_AREA_LAYER: &str = "bushfire_prone_area";

/// Layer of recorded fire history polygons.
pub const FIRE_HISTORY_LAYER: &str = "fire_history";

/// Search buffer radius in metres; fire history is relevant out to 10 km.
pub const SEARCH_RADIUS_M: f64 = 10_000.0;

/// A fire is "recent" when its season started within this many years.
pub const RECENT_FIRE_YEARS: i32 = 10;

/// A normalized bushfire-prone-area overlay record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BushfireProneArea {
    /// Designation category, e.g. `"BPA"`.
    pub category: Option<String>,
    /// Fire management zone type, when the layer publishes one.
    pub zone_type: Option<String>,
    /// True when the designation covers the property.
    pub affects_property: bool,
    /// Nearest distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl HazardRecord for BushfireProneArea {
    fn affects_property(&self) -> bool {
        self.affects_property
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// A normalized fire history record.
///
/// Distance is centroid-based: fire scars are large polygons and only a
/// coarse radius check is needed, so the nearest-edge computation is
/// deliberately skipped.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FireHistoryRecord {
    /// Fire name, if recorded.
    pub fire_name: Option<String>,
    /// Season start year, if recorded.
    pub season_year: Option<i64>,
    /// Burnt area, if recorded.
    pub area: Option<Measurement>,
    /// True when the fire scar covers the property.
    pub affects_property: bool,
    /// Centroid distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl HazardRecord for FireHistoryRecord {
    fn affects_property(&self) -> bool {
        self.affects_property
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// The additive score weight table. Constants are part of the
/// classification contract, named here so they are visible and testable
/// rather than buried inline.
#[derive(Debug, Clone, Copy)]
pub struct BushfireWeights {
    /// Points when a bushfire-prone-area designation covers the property.
    pub prone_area_overlap: u32,
    /// Points when a fire management zone covers the property.
    pub management_zone_overlap: u32,
    /// Points per recorded fire within 5 km.
    pub per_fire_within_5km: u32,
    /// Cap on total points from fires within 5 km.
    pub fires_within_5km_cap: u32,
    /// Points per recorded fire within 10 km.
    pub per_fire_within_10km: u32,
    /// Cap on total points from fires within 10 km.
    pub fires_within_10km_cap: u32,
    /// Points when any fire within 10 km is recent.
    pub recent_fire: u32,
}

impl Default for BushfireWeights {
    fn default() -> Self {
        Self {
            prone_area_overlap: 4,
            management_zone_overlap: 2,
            per_fire_within_5km: 2,
            fires_within_5km_cap: 4,
            per_fire_within_10km: 1,
            fires_within_10km_cap: 2,
            recent_fire: 1,
        }
    }
}

/// Bushfire category report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BushfireReport {
    /// Classified risk tier on the bushfire four-tier scale.
    pub risk_level: BushfireRiskLevel,
    /// The computed weighted score.
    pub score: u32,
    /// Normalized prone-area designations.
    pub prone_areas: Vec<BushfireProneArea>,
    /// Normalized fire history records, nearest first.
    pub fire_history: Vec<FireHistoryRecord>,
    /// True when a bushfire-prone designation covers the property.
    pub affected_by_bushfire_prone_area: bool,
    /// Narrative summary.
    pub description: String,
    /// Ordered mitigation recommendations.
    pub recommendations: Vec<String>,
}

/// Normalizes prone-area overlay features.
#[must_use]
pub fn normalize_prone_areas(
    point: Point<f64>,
    features: &[GeographicFeature],
) -> Vec<BushfireProneArea> {
    use property_report_features::properties::prop_str;

    features
        .iter()
        .map(|feature| {
            let (distance, affects_property) = feature_proximity(point, feature);
            BushfireProneArea {
                category: prop_str(&feature.properties, "CATEGORY"),
                zone_type: prop_str(&feature.properties, "ZONE_TYPE"),
                affects_property,
                distance,
            }
        })
        .collect()
}

/// Normalizes fire history features with coarse centroid distances.
#[must_use]
pub fn normalize_fire_history(
    point: Point<f64>,
    features: &[GeographicFeature],
) -> Vec<FireHistoryRecord> {
    use property_report_features::properties::{prop_f64, prop_i64, prop_str};

    features
        .iter()
        .map(|feature| {
            let (distance, affects_property) = centroid_proximity(point, feature);
            FireHistoryRecord {
                fire_name: prop_str(&feature.properties, "FIRE_NAME"),
                season_year: prop_i64(&feature.properties, "SEASON")
                    .or_else(|| prop_i64(&feature.properties, "FIRE_YEAR")),
                area: prop_f64(&feature.properties, "AREA_HA").map(Measurement::hectares),
                affects_property,
                distance,
            }
        })
        .collect()
}

/// Computes the weighted bushfire score.
///
/// `current_year` parameterizes the recency signal so the score is a pure
/// function of its inputs.
#[must_use]
pub fn bushfire_score(
    prone_areas: &[BushfireProneArea],
    fire_history: &[FireHistoryRecord],
    weights: &BushfireWeights,
    current_year: i32,
) -> u32 {
    let mut score = 0;

    if prone_areas.iter().any(|a| a.affects_property) {
        score += weights.prone_area_overlap;
    }
    if prone_areas
        .iter()
        .any(|a| a.affects_property && a.zone_type.is_some())
    {
        score += weights.management_zone_overlap;
    }

    let within_5km = crate::common::count_within(fire_history, 5_000.0);
    let within_10km = crate::common::count_within(fire_history, 10_000.0);
    score += u32::try_from(within_5km)
        .unwrap_or(u32::MAX)
        .saturating_mul(weights.per_fire_within_5km)
        .min(weights.fires_within_5km_cap);
    score += u32::try_from(within_10km)
        .unwrap_or(u32::MAX)
        .saturating_mul(weights.per_fire_within_10km)
        .min(weights.fires_within_10km_cap);

    let recent = fire_history.iter().any(|f| {
        f.distance_m().is_some_and(|d| d.is_finite() && d < 10_000.0)
            && f.season_year
                .is_some_and(|y| i64::from(current_year) - y <= i64::from(RECENT_FIRE_YEARS))
    });
    if recent {
        score += weights.recent_fire;
    }

    score
}

/// Maps a weighted score to the bushfire tier: `>= 8` ⇒ `EXTREME`,
/// `>= 5` ⇒ `HIGH`, `>= 3` ⇒ `MEDIUM`, else `LOW`.
#[must_use]
pub const fn determine_risk_level(score: u32) -> BushfireRiskLevel {
    if score >= 8 {
        BushfireRiskLevel::Extreme
    } else if score >= 5 {
        BushfireRiskLevel::High
    } else if score >= 3 {
        BushfireRiskLevel::Medium
    } else {
        BushfireRiskLevel::Low
    }
}

/// Narrative description for the classified tier.
#[must_use]
pub fn generate_description(
    level: BushfireRiskLevel,
    prone_areas: &[BushfireProneArea],
) -> String {
    let in_prone_area = prone_areas.iter().any(|a| a.affects_property);
    match level {
        BushfireRiskLevel::Extreme => {
            "The property is in a designated bushfire prone area with significant recorded \
             fire activity nearby. Bushfire attack level assessment and defendable space \
             requirements apply."
                .to_string()
        }
        BushfireRiskLevel::High if in_prone_area => {
            "The property is in a designated bushfire prone area. Construction standards for \
             bushfire attack apply."
                .to_string()
        }
        BushfireRiskLevel::High => {
            "Significant recorded fire activity exists in the surrounding landscape."
                .to_string()
        }
        BushfireRiskLevel::Medium => {
            "Some bushfire exposure signals are present in the surrounding landscape."
                .to_string()
        }
        BushfireRiskLevel::Low => fallback_description(),
    }
}

/// Ordered mitigation recommendations.
#[must_use]
pub fn generate_recommendations(level: BushfireRiskLevel) -> Vec<String> {
    let strings: &[&str] = match level {
        BushfireRiskLevel::Extreme => &[
            "Obtain a bushfire attack level (BAL) assessment before any building works",
            "Establish and maintain defendable space around dwellings",
            "Prepare a written bushfire survival plan",
            "Review bushfire insurance cover and rebuild costs",
        ],
        BushfireRiskLevel::High => &[
            "Obtain a bushfire attack level (BAL) assessment before any building works",
            "Establish and maintain defendable space around dwellings",
            "Prepare a written bushfire survival plan",
        ],
        BushfireRiskLevel::Medium => &[
            "Maintain vegetation and fuel loads on the property",
            "Prepare a written bushfire survival plan",
        ],
        BushfireRiskLevel::Low => &[],
    };
    strings.iter().map(ToString::to_string).collect()
}

/// Assesses the bushfire category for a street address.
///
/// Never fails: geocoding or data-source errors degrade to the minimal
/// report.
pub async fn assess(
    address: &Address,
    geocoder: &dyn Geocoder,
    source: &dyn FeatureSource,
) -> BushfireReport {
    match geocoder.geocode(address).await {
        Ok(point) => assess_at(point.latitude, point.longitude, source).await,
        Err(err) => {
            log::warn!("Bushfire assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

/// Assesses the bushfire category for a pre-resolved coordinate.
pub async fn assess_at(lat: f64, lon: f64, source: &dyn FeatureSource) -> BushfireReport {
    match try_assess(lat, lon, source).await {
        Ok(report) => report,
        Err(err) => {
            log::warn!("Bushfire assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

async fn try_assess(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
) -> Result<BushfireReport, HazardError> {
    let buffer = buffer_degrees(SEARCH_RADIUS_M);
    let (prone_raw, history_raw) = join!(
        source.query(lat, lon, buffer, PRONE_AREA_LAYER),
        source.query(lat, lon, buffer, FIRE_HISTORY_LAYER)
    );
    let prone_raw = prone_raw?;
    let history_raw = history_raw?;

    let point = Point::new(lon, lat);
    let mut prone_areas = normalize_prone_areas(point, &prone_raw);
    let mut fire_history = normalize_fire_history(point, &history_raw);
    sort_by_proximity(&mut prone_areas);
    sort_by_proximity(&mut fire_history);

    let weights = BushfireWeights::default();
    let current_year = chrono::Utc::now().year();
    let score = bushfire_score(&prone_areas, &fire_history, &weights, current_year);
    let risk_level = determine_risk_level(score);
    let affected = prone_areas.iter().any(|a| a.affects_property);
    let description = generate_description(risk_level, &prone_areas);
    let recommendations = generate_recommendations(risk_level);

    Ok(BushfireReport {
        risk_level,
        score,
        prone_areas,
        fire_history,
        affected_by_bushfire_prone_area: affected,
        description,
        recommendations,
    })
}

/// Deterministic fallback when the category cannot be assessed.
#[must_use]
pub fn minimal_report() -> BushfireReport {
    BushfireReport {
        risk_level: BushfireRiskLevel::Low,
        score: 0,
        prone_areas: Vec::new(),
        fire_history: Vec::new(),
        affected_by_bushfire_prone_area: false,
        description: fallback_description(),
        recommendations: Vec::new(),
    }
}

fn fallback_description() -> String {
    "No bushfire constraints identified within the search area.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BrokenSource, StaticSource, polygon_feature};
    use serde_json::json;

    fn prone(affects: bool, zone_type: Option<&str>) -> BushfireProneArea {
        BushfireProneArea {
            category: Some("BPA".to_string()),
            zone_type: zone_type.map(String::from),
            affects_property: affects,
            distance: Some(Measurement::metres(if affects { 0.0 } else { 400.0 })),
        }
    }

    fn fire(distance_m: f64, season_year: Option<i64>) -> FireHistoryRecord {
        FireHistoryRecord {
            fire_name: None,
            season_year,
            area: None,
            affects_property: false,
            distance: Some(Measurement::metres(distance_m)),
        }
    }

    #[test]
    fn five_km_signal_is_capped() {
        let weights = BushfireWeights::default();
        // Four fires at 2 points each would be 8 without the cap.
        let fires = vec![
            fire(1_000.0, None),
            fire(2_000.0, None),
            fire(3_000.0, None),
            fire(4_000.0, None),
        ];
        let score = bushfire_score(&[], &fires, &weights, 2026);
        // Capped at 4 for the 5 km signal + capped at 2 for the 10 km signal.
        assert_eq!(score, 6);
    }

    #[test]
    fn overlay_plus_fires_reaches_extreme() {
        let weights = BushfireWeights::default();
        let prone_areas = vec![prone(true, None)];
        let fires = vec![fire(1_000.0, Some(2_024)), fire(3_000.0, None)];
        // 4 (overlay) + 4 (two fires in 5 km) + 2 (capped 10 km) + 1 (recent) = 11.
        let score = bushfire_score(&prone_areas, &fires, &weights, 2026);
        assert_eq!(score, 11);
        assert_eq!(determine_risk_level(score), BushfireRiskLevel::Extreme);
    }

    #[test]
    fn score_thresholds_map_to_tiers() {
        assert_eq!(determine_risk_level(8), BushfireRiskLevel::Extreme);
        assert_eq!(determine_risk_level(7), BushfireRiskLevel::High);
        assert_eq!(determine_risk_level(5), BushfireRiskLevel::High);
        assert_eq!(determine_risk_level(4), BushfireRiskLevel::Medium);
        assert_eq!(determine_risk_level(3), BushfireRiskLevel::Medium);
        assert_eq!(determine_risk_level(2), BushfireRiskLevel::Low);
        assert_eq!(determine_risk_level(0), BushfireRiskLevel::Low);
    }

    #[test]
    fn old_fires_do_not_add_recency_points() {
        let weights = BushfireWeights::default();
        let fires = vec![fire(1_000.0, Some(1_983))];
        // 2 (5 km) + 1 (10 km), no recency point.
        assert_eq!(bushfire_score(&[], &fires, &weights, 2026), 3);
    }

    #[test]
    fn management_zone_adds_points_on_top_of_overlay() {
        let weights = BushfireWeights::default();
        let prone_areas = vec![prone(true, Some("Ash Range FMZ"))];
        assert_eq!(bushfire_score(&prone_areas, &[], &weights, 2026), 6);
    }

    #[test]
    fn unknown_distance_fires_are_excluded() {
        let weights = BushfireWeights::default();
        let fires = vec![FireHistoryRecord {
            fire_name: None,
            season_year: Some(2_024),
            area: None,
            affects_property: false,
            distance: None,
        }];
        assert_eq!(bushfire_score(&[], &fires, &weights, 2026), 0);
    }

    #[tokio::test]
    async fn prone_area_overlay_end_to_end() {
        let (lat, lon) = (-37.5, 145.3);
        let source = StaticSource::new(vec![
            (
                PRONE_AREA_LAYER,
                vec![polygon_feature(
                    lon,
                    lat,
                    0.01,
                    vec![("CATEGORY", json!("BPA"))],
                )],
            ),
            (FIRE_HISTORY_LAYER, vec![]),
        ]);
        let report = assess_at(lat, lon, &source).await;
        assert!(report.affected_by_bushfire_prone_area);
        assert_eq!(report.score, 4);
        assert_eq!(report.risk_level, BushfireRiskLevel::Medium);
    }

    #[tokio::test]
    async fn outage_degrades_to_low() {
        let report = assess_at(-37.5, 145.3, &BrokenSource).await;
        assert_eq!(report.risk_level, BushfireRiskLevel::Low);
        assert_eq!(report.score, 0);
    }
}
