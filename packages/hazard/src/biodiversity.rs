//! Biodiversity significance assessment.
//!
//! Queries threatened fauna and flora record layers concurrently and
//! classifies significance by proximity of recorded observations.
//! Observation layers publish large survey polygons, so distances are
//! centroid-based — a coarse radius check, not a nearest-edge computation.

use futures::join;
use geo::Point;
use property_report_features::{FeatureSource, GeographicFeature, buffer_degrees};
use property_report_geocoder::{Address, Geocoder};
use property_report_hazard_models::{Measurement, RiskLevel};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::HazardError;
use crate::common::{
    HazardRecord, any_affects, centroid_proximity, nearest_distance_m, sort_by_proximity,
};

/// Layer of threatened fauna records.
pub const FAUNA_LAYER: &str = "fauna_records";

/// Layer of threatened flora records.
pub const FLORA_LAYER: &str = "flora_records";

/// Search buffer radius in metres.
pub const SEARCH_RADIUS_M: f64 = 1_000.0;

/// Which taxon group a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TaxonGroup {
    /// Animal observation.
    Fauna,
    /// Plant observation.
    Flora,
}

/// A normalized biodiversity observation near the property.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiodiversityRecord {
    /// Fauna or flora.
    pub taxon: TaxonGroup,
    /// Common name, if recorded.
    pub common_name: Option<String>,
    /// Scientific name, if recorded.
    pub scientific_name: Option<String>,
    /// Conservation status label (e.g. "Endangered"), if recorded.
    pub conservation_status: Option<String>,
    /// True when the observation polygon covers the property.
    pub affects_property: bool,
    /// Centroid distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl HazardRecord for BiodiversityRecord {
    fn affects_property(&self) -> bool {
        self.affects_property
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// Biodiversity category report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BiodiversityReport {
    /// Classified significance tier.
    pub significance_level: RiskLevel,
    /// Normalized records, affects-property first then nearest.
    pub records: Vec<BiodiversityRecord>,
    /// True when any observation covers the property.
    pub affected_by_biodiversity: bool,
    /// Narrative summary.
    pub description: String,
    /// Ordered mitigation recommendations.
    pub recommendations: Vec<String>,
}

/// Normalizes raw observation features from one taxon layer.
#[must_use]
pub fn normalize(
    point: Point<f64>,
    taxon: TaxonGroup,
    features: &[GeographicFeature],
) -> Vec<BiodiversityRecord> {
    use property_report_features::properties::prop_str;

    features
        .iter()
        .map(|feature| {
            let (distance, affects_property) = centroid_proximity(point, feature);
            BiodiversityRecord {
                taxon,
                common_name: prop_str(&feature.properties, "COMM_NAME"),
                scientific_name: prop_str(&feature.properties, "SCI_NAME"),
                conservation_status: prop_str(&feature.properties, "CONS_STATUS"),
                affects_property,
                distance,
            }
        })
        .collect()
}

/// Classifies biodiversity significance.
///
/// Ordered rules, first match wins: any observation covering the property
/// ⇒ `VERY_HIGH`; nearest `< 100 m` ⇒ `HIGH`; `< 500 m` ⇒ `MODERATE`;
/// `< 1000 m` ⇒ `LOW`; else `MINIMAL`.
#[must_use]
pub fn determine_significance(records: &[BiodiversityRecord]) -> RiskLevel {
    if any_affects(records) {
        return RiskLevel::VeryHigh;
    }
    match nearest_distance_m(records) {
        Some(d) if d < 100.0 => RiskLevel::High,
        Some(d) if d < 500.0 => RiskLevel::Moderate,
        Some(d) if d < 1_000.0 => RiskLevel::Low,
        _ => RiskLevel::Minimal,
    }
}

/// Narrative description for the classified tier.
#[must_use]
pub fn generate_description(level: RiskLevel, records: &[BiodiversityRecord]) -> String {
    use crate::common::affecting_names;

    match level {
        RiskLevel::VeryHigh => {
            let names = affecting_names(records, |r| {
                r.common_name.as_deref().or(r.scientific_name.as_deref())
            });
            if names.is_empty() {
                "Threatened species records overlap the property. Native vegetation and \
                 habitat controls are likely to apply."
                    .to_string()
            } else {
                format!(
                    "Threatened species records overlap the property ({names}). Native \
                     vegetation and habitat controls are likely to apply."
                )
            }
        }
        RiskLevel::High => {
            "Threatened species have been recorded within 100 metres of the property."
                .to_string()
        }
        RiskLevel::Moderate => {
            "Threatened species have been recorded within 500 metres of the property."
                .to_string()
        }
        RiskLevel::Low => {
            "Threatened species have been recorded within 1 kilometre of the property."
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
            "A permit is likely required to remove, destroy or lop native vegetation",
            "Commission a flora and fauna assessment before site works",
            "Retain habitat trees and understorey vegetation where practicable",
        ],
        RiskLevel::High => &[
            "Commission a flora and fauna assessment before site works",
            "Retain habitat trees and understorey vegetation where practicable",
        ],
        RiskLevel::Moderate | RiskLevel::Low => {
            &["Check native vegetation controls before removing any vegetation"]
        }
        RiskLevel::Minimal => &[],
    };
    strings.iter().map(ToString::to_string).collect()
}

/// Assesses the biodiversity category for a street address.
///
/// Never fails: geocoding or data-source errors degrade to the minimal
/// report.
pub async fn assess(
    address: &Address,
    geocoder: &dyn Geocoder,
    source: &dyn FeatureSource,
) -> BiodiversityReport {
    match geocoder.geocode(address).await {
        Ok(point) => assess_at(point.latitude, point.longitude, source).await,
        Err(err) => {
            log::warn!("Biodiversity assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

/// Assesses the biodiversity category for a pre-resolved coordinate.
pub async fn assess_at(lat: f64, lon: f64, source: &dyn FeatureSource) -> BiodiversityReport {
    match try_assess(lat, lon, source).await {
        Ok(report) => report,
        Err(err) => {
            log::warn!("Biodiversity assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

async fn try_assess(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
) -> Result<BiodiversityReport, HazardError> {
    let buffer = buffer_degrees(SEARCH_RADIUS_M);
    let (fauna, flora) = join!(
        source.query(lat, lon, buffer, FAUNA_LAYER),
        source.query(lat, lon, buffer, FLORA_LAYER)
    );
    let fauna = fauna?;
    let flora = flora?;

    let point = Point::new(lon, lat);
    let mut records = normalize(point, TaxonGroup::Fauna, &fauna);
    records.extend(normalize(point, TaxonGroup::Flora, &flora));
    sort_by_proximity(&mut records);

    let significance_level = determine_significance(&records);
    let affected_by_biodiversity = any_affects(&records);
    let description = generate_description(significance_level, &records);
    let recommendations = generate_recommendations(significance_level);

    Ok(BiodiversityReport {
        significance_level,
        records,
        affected_by_biodiversity,
        description,
        recommendations,
    })
}

/// Deterministic fallback when the category cannot be assessed.
#[must_use]
pub fn minimal_report() -> BiodiversityReport {
    BiodiversityReport {
        significance_level: RiskLevel::Minimal,
        records: Vec::new(),
        affected_by_biodiversity: false,
        description: fallback_description(),
        recommendations: Vec::new(),
    }
}

fn fallback_description() -> String {
    "No significant biodiversity records identified within the search area.".to_string()
}
