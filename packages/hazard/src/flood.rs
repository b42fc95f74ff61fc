//! Flood risk assessment.
//!
//! Queries two layers concurrently: recorded historical flood extents and
//! the modelled 1% AEP (100-year) flood extent. Historical inundation of
//! the property outranks modelled extent membership.

use futures::join;
use geo::Point;
use property_report_features::{FeatureSource, GeographicFeature, buffer_degrees};
use property_report_geocoder::{Address, Geocoder};
use property_report_hazard_models::{Measurement, RiskLevel};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::HazardError;
use crate::common::{HazardRecord, feature_proximity, nearest_distance_m, sort_by_proximity};

/// Layer of recorded historical flood extents.
pub const HISTORY_LAYER: &str = "flood_history";

/// Layer of the modelled 1% AEP (100-year) flood extent.
pub const MODELLED_LAYER: &str = "flood_1pct_aep";

/// Search buffer radius in metres. Matches the outermost classification
/// bucket.
pub const SEARCH_RADIUS_M: f64 = 500.0;

/// Which flood layer a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum FloodExtentKind {
    /// A recorded historical flood event.
    Historical,
    /// The modelled 100-year flood extent.
    Modelled100Year,
}

/// A normalized flood extent near the property.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloodExtent {
    /// Source layer for this extent.
    pub kind: FloodExtentKind,
    /// Event or study name, if published.
    pub name: Option<String>,
    /// Event year for historical extents, if published.
    pub event_year: Option<i64>,
    /// True when the extent covers the property.
    pub affects_property: bool,
    /// Nearest distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl HazardRecord for FloodExtent {
    fn affects_property(&self) -> bool {
        self.affects_property
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// Flood category report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FloodReport {
    /// Classified risk tier.
    pub risk_level: RiskLevel,
    /// Normalized flood extents, affects-property first then nearest.
    pub extents: Vec<FloodExtent>,
    /// True when any flood extent covers the property.
    pub affected_by_flood: bool,
    /// Narrative summary.
    pub description: String,
    /// Ordered mitigation recommendations.
    pub recommendations: Vec<String>,
}

/// Normalizes raw features from one flood layer.
#[must_use]
pub fn normalize(
    point: Point<f64>,
    kind: FloodExtentKind,
    features: &[GeographicFeature],
) -> Vec<FloodExtent> {
    use property_report_features::properties::{prop_i64, prop_str};

    features
        .iter()
        .map(|feature| {
            let (distance, affects_property) = feature_proximity(point, feature);
            FloodExtent {
                kind,
                name: prop_str(&feature.properties, "EVENT_NAME")
                    .or_else(|| prop_str(&feature.properties, "STUDY_NAME")),
                event_year: prop_i64(&feature.properties, "EVENT_YEAR"),
                affects_property,
                distance,
            }
        })
        .collect()
}

/// Classifies flood risk.
///
/// Ordered rules, first match wins: historical extent affecting the
/// property ⇒ `VERY_HIGH`; within the modelled 100-year extent ⇒ `HIGH`;
/// nearest extent `< 100 m` ⇒ `MODERATE`; `< 500 m` ⇒ `LOW`; else
/// `MINIMAL`.
#[must_use]
pub fn determine_risk_level(extents: &[FloodExtent]) -> RiskLevel {
    if extents
        .iter()
        .any(|e| e.affects_property && e.kind == FloodExtentKind::Historical)
    {
        return RiskLevel::VeryHigh;
    }
    if extents
        .iter()
        .any(|e| e.affects_property && e.kind == FloodExtentKind::Modelled100Year)
    {
        return RiskLevel::High;
    }
    match nearest_distance_m(extents) {
        Some(d) if d < 100.0 => RiskLevel::Moderate,
        Some(d) if d < 500.0 => RiskLevel::Low,
        _ => RiskLevel::Minimal,
    }
}

/// Narrative description for the classified tier.
#[must_use]
pub fn generate_description(level: RiskLevel, extents: &[FloodExtent]) -> String {
    use crate::common::affecting_names;

    match level {
        RiskLevel::VeryHigh => {
            let names = affecting_names(extents, |e| e.name.as_deref());
            if names.is_empty() {
                "The property lies within a recorded historical flood extent.".to_string()
            } else {
                format!("The property lies within recorded flood extent(s): {names}.")
            }
        }
        RiskLevel::High => {
            "The property lies within the modelled 1% AEP (100-year) flood extent.".to_string()
        }
        RiskLevel::Moderate => {
            "A mapped flood extent lies within 100 metres of the property.".to_string()
        }
        RiskLevel::Low => {
            "A mapped flood extent lies within 500 metres of the property.".to_string()
        }
        RiskLevel::Minimal => fallback_description(),
    }
}

/// Ordered mitigation recommendations.
#[must_use]
pub fn generate_recommendations(level: RiskLevel) -> Vec<String> {
    let strings: &[&str] = match level {
        RiskLevel::VeryHigh => &[
            "Obtain a site-specific flood level certificate from the floodplain authority",
            "Set habitable floor levels above the declared flood level",
            "Review flood insurance availability and premiums before purchase",
            "Prepare a flood emergency plan for the property",
        ],
        RiskLevel::High => &[
            "Obtain a site-specific flood level certificate from the floodplain authority",
            "Set habitable floor levels above the declared flood level",
            "Review flood insurance availability and premiums before purchase",
        ],
        RiskLevel::Moderate => &[
            "Check overland flow paths and local drainage capacity with council",
            "Review flood insurance availability and premiums before purchase",
        ],
        RiskLevel::Low => &["Check overland flow paths and local drainage capacity with council"],
        RiskLevel::Minimal => &[],
    };
    strings.iter().map(ToString::to_string).collect()
}

/// Assesses the flood category for a street address.
///
/// Never fails: geocoding or data-source errors degrade to the minimal
/// report.
pub async fn assess(
    address: &Address,
    geocoder: &dyn Geocoder,
    source: &dyn FeatureSource,
) -> FloodReport {
    match geocoder.geocode(address).await {
        Ok(point) => assess_at(point.latitude, point.longitude, source).await,
        Err(err) => {
            log::warn!("Flood assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

/// Assesses the flood category for a pre-resolved coordinate.
pub async fn assess_at(lat: f64, lon: f64, source: &dyn FeatureSource) -> FloodReport {
    match try_assess(lat, lon, source).await {
        Ok(report) => report,
        Err(err) => {
            log::warn!("Flood assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

async fn try_assess(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
) -> Result<FloodReport, HazardError> {
    let buffer = buffer_degrees(SEARCH_RADIUS_M);
    let (history, modelled) = join!(
        source.query(lat, lon, buffer, HISTORY_LAYER),
        source.query(lat, lon, buffer, MODELLED_LAYER)
    );
    let history = history?;
    let modelled = modelled?;

    let point = Point::new(lon, lat);
    let mut extents = normalize(point, FloodExtentKind::Historical, &history);
    extents.extend(normalize(
        point,
        FloodExtentKind::Modelled100Year,
        &modelled,
    ));
    sort_by_proximity(&mut extents);

    let risk_level = determine_risk_level(&extents);
    let affected_by_flood = extents.iter().any(|e| e.affects_property);
    let description = generate_description(risk_level, &extents);
    let recommendations = generate_recommendations(risk_level);

    Ok(FloodReport {
        risk_level,
        extents,
        affected_by_flood,
        description,
        recommendations,
    })
}

/// Deterministic fallback when the category cannot be assessed.
#[must_use]
pub fn minimal_report() -> FloodReport {
    FloodReport {
        risk_level: RiskLevel::Minimal,
        extents: Vec::new(),
        affected_by_flood: false,
        description: fallback_description(),
        recommendations: Vec::new(),
    }
}

fn fallback_description() -> String {
    "No flood constraints identified within the search area.".to_string()
}
