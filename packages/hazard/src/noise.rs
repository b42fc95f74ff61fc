//! Traffic noise assessment.
//!
//! Combines a mapped road/rail noise corridor layer with locally-stored
//! traffic signal volume counts. The corridor layer drives classification;
//! volume sites enrich the narrative with measured daily traffic near the
//! property. The volume store is a read-only DuckDB handle owned by the
//! process and passed in by reference.

use duckdb::Connection;
use geo::Point;
use property_report_features::{FeatureSource, GeographicFeature, buffer_degrees};
use property_report_geocoder::{Address, Geocoder};
use property_report_geometry::haversine_meters;
use property_report_hazard_models::{Measurement, RiskLevel};
use serde::Serialize;

use crate::HazardError;
use crate::common::{
    HazardRecord, any_affects, feature_proximity, nearest_distance_m, sort_by_proximity,
};

/// Feature-service layer holding mapped road and rail noise corridors.
pub const LAYER: &str = "traffic_noise_corridors";

/// Search buffer radius in metres.
pub const SEARCH_RADIUS_M: f64 = 200.0;

/// Radius for the traffic volume site lookup, in metres.
pub const VOLUME_SITE_RADIUS_M: f64 = 500.0;

/// A normalized noise corridor near the property.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseCorridor {
    /// Corridor kind label from the layer, e.g. `"Freeway"` or `"Rail"`.
    pub corridor_type: Option<String>,
    /// Road or line name, if published.
    pub name: Option<String>,
    /// True when the corridor covers the property.
    pub affects_property: bool,
    /// Nearest distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl HazardRecord for NoiseCorridor {
    fn affects_property(&self) -> bool {
        self.affects_property
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// A measured traffic volume site near the property.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficVolumeSite {
    /// Site identifier in the volume store.
    pub site_id: String,
    /// Site description, usually the intersection name.
    pub description: Option<String>,
    /// Average daily vehicle count.
    pub avg_daily_volume: i64,
    /// Straight-line distance from the property.
    pub distance: Measurement,
}

/// Noise category report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoiseReport {
    /// Classified risk tier.
    pub risk_level: RiskLevel,
    /// Normalized corridors, affects-property first then nearest.
    pub corridors: Vec<NoiseCorridor>,
    /// Measured volume sites within range, nearest first.
    pub traffic_sites: Vec<TrafficVolumeSite>,
    /// True when a noise corridor covers the property.
    pub affected_by_noise_corridor: bool,
    /// Narrative summary.
    pub description: String,
    /// Ordered mitigation recommendations.
    pub recommendations: Vec<String>,
}

/// Normalizes raw corridor features.
#[must_use]
pub fn normalize(point: Point<f64>, features: &[GeographicFeature]) -> Vec<NoiseCorridor> {
    use property_report_features::properties::prop_str;

    features
        .iter()
        .map(|feature| {
            let (distance, affects_property) = feature_proximity(point, feature);
            NoiseCorridor {
                corridor_type: prop_str(&feature.properties, "CORRIDOR_TYPE"),
                name: prop_str(&feature.properties, "ROAD_NAME")
                    .or_else(|| prop_str(&feature.properties, "NAME")),
                affects_property,
                distance,
            }
        })
        .collect()
}

/// Classifies noise exposure.
///
/// Ordered rules, first match wins: any corridor covering the property ⇒
/// `VERY_HIGH`; nearest `< 50 m` ⇒ `HIGH`; `< 100 m` ⇒ `MODERATE`;
/// `< 200 m` ⇒ `LOW`; else `MINIMAL`.
#[must_use]
pub fn determine_risk_level(corridors: &[NoiseCorridor]) -> RiskLevel {
    if any_affects(corridors) {
        return RiskLevel::VeryHigh;
    }
    match nearest_distance_m(corridors) {
        Some(d) if d < 50.0 => RiskLevel::High,
        Some(d) if d < 100.0 => RiskLevel::Moderate,
        Some(d) if d < 200.0 => RiskLevel::Low,
        _ => RiskLevel::Minimal,
    }
}

/// Reads traffic volume sites within [`VOLUME_SITE_RADIUS_M`] of the
/// property, nearest first. The store holds point sites only, so distance
/// is a haversine computation over the stored coordinates.
///
/// # Errors
///
/// Returns [`HazardError::Db`] if the query fails.
pub fn query_volume_sites(
    conn: &Connection,
    lat: f64,
    lon: f64,
) -> Result<Vec<TrafficVolumeSite>, HazardError> {
    let buffer = buffer_degrees(VOLUME_SITE_RADIUS_M);
    let mut stmt = conn.prepare(
        "SELECT site_id, description, longitude, latitude, avg_daily_volume
         FROM traffic_volume_sites
         WHERE longitude BETWEEN ? AND ? AND latitude BETWEEN ? AND ?",
    )?;
    let rows = stmt.query_map(
        duckdb::params![lon - buffer, lon + buffer, lat - buffer, lat + buffer],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<String>>(1)?,
                row.get::<_, f64>(2)?,
                row.get::<_, f64>(3)?,
                row.get::<_, i64>(4)?,
            ))
        },
    )?;

    let point = Point::new(lon, lat);
    let mut sites = Vec::new();
    for row in rows {
        let (site_id, description, site_lon, site_lat, avg_daily_volume) = row?;
        let meters = haversine_meters(point, Point::new(site_lon, site_lat));
        if meters <= VOLUME_SITE_RADIUS_M {
            sites.push(TrafficVolumeSite {
                site_id,
                description,
                avg_daily_volume,
                distance: Measurement::metres(meters),
            });
        }
    }
    sites.sort_by(|a, b| a.distance.value.total_cmp(&b.distance.value));
    Ok(sites)
}

/// Narrative description for the classified tier.
#[must_use]
pub fn generate_description(
    level: RiskLevel,
    corridors: &[NoiseCorridor],
    sites: &[TrafficVolumeSite],
) -> String {
    use crate::common::affecting_names;

    let mut description = match level {
        RiskLevel::VeryHigh => {
            let names = affecting_names(corridors, |c| c.name.as_deref());
            if names.is_empty() {
                "The property lies within a mapped traffic noise corridor.".to_string()
            } else {
                format!("The property lies within the {names} noise corridor.")
            }
        }
        RiskLevel::High => {
            "A mapped traffic noise corridor lies within 50 metres of the property."
                .to_string()
        }
        RiskLevel::Moderate => {
            "A mapped traffic noise corridor lies within 100 metres of the property."
                .to_string()
        }
        RiskLevel::Low => {
            "A mapped traffic noise corridor lies within 200 metres of the property."
                .to_string()
        }
        RiskLevel::Minimal => fallback_description(),
    };

    if let Some(site) = sites.first() {
        description.push_str(&format!(
            " The nearest counted intersection carries around {} vehicles per day.",
            site.avg_daily_volume
        ));
    }
    description
}

/// Ordered mitigation recommendations.
#[must_use]
pub fn generate_recommendations(level: RiskLevel) -> Vec<String> {
    let strings: &[&str] = match level {
        RiskLevel::VeryHigh => &[
            "Acoustic treatment (glazing, facade insulation) is likely required for habitable rooms",
            "Inspect the property at peak traffic times before purchase",
            "Orient living areas and private open space away from the corridor",
        ],
        RiskLevel::High => &[
            "Consider acoustic glazing for bedrooms facing the corridor",
            "Inspect the property at peak traffic times before purchase",
        ],
        RiskLevel::Moderate | RiskLevel::Low => {
            &["Inspect the property at peak traffic times before purchase"]
        }
        RiskLevel::Minimal => &[],
    };
    strings.iter().map(ToString::to_string).collect()
}

/// Assesses the noise category for a street address.
///
/// Never fails: geocoding or data-source errors degrade to the minimal
/// report. `db` is the optional traffic volume store; when absent the
/// corridor layer alone drives the report.
pub async fn assess(
    address: &Address,
    geocoder: &dyn Geocoder,
    source: &dyn FeatureSource,
    db: Option<&Connection>,
) -> NoiseReport {
    match geocoder.geocode(address).await {
        Ok(point) => assess_at(point.latitude, point.longitude, source, db).await,
        Err(err) => {
            log::warn!("Noise assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

/// Assesses the noise category for a pre-resolved coordinate.
pub async fn assess_at(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
    db: Option<&Connection>,
) -> NoiseReport {
    match try_assess(lat, lon, source, db).await {
        Ok(report) => report,
        Err(err) => {
            log::warn!("Noise assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

async fn try_assess(
    lat: f64,
    lon: f64,
    source: &dyn FeatureSource,
    db: Option<&Connection>,
) -> Result<NoiseReport, HazardError> {
    let features = source
        .query(lat, lon, buffer_degrees(SEARCH_RADIUS_M), LAYER)
        .await?;

    let point = Point::new(lon, lat);
    let mut corridors = normalize(point, &features);
    sort_by_proximity(&mut corridors);

    // A missing or failing volume store only drops the enrichment.
    let traffic_sites = match db.map(|conn| query_volume_sites(conn, lat, lon)) {
        Some(Ok(sites)) => sites,
        Some(Err(err)) => {
            log::warn!("Traffic volume lookup failed, continuing without: {err}");
            Vec::new()
        }
        None => Vec::new(),
    };

    let risk_level = determine_risk_level(&corridors);
    let affected_by_noise_corridor = any_affects(&corridors);
    let description = generate_description(risk_level, &corridors, &traffic_sites);
    let recommendations = generate_recommendations(risk_level);

    Ok(NoiseReport {
        risk_level,
        corridors,
        traffic_sites,
        affected_by_noise_corridor,
        description,
        recommendations,
    })
}

/// Deterministic fallback when the category cannot be assessed.
#[must_use]
pub fn minimal_report() -> NoiseReport {
    NoiseReport {
        risk_level: RiskLevel::Minimal,
        corridors: Vec::new(),
        traffic_sites: Vec::new(),
        affected_by_noise_corridor: false,
        description: fallback_description(),
        recommendations: Vec::new(),
    }
}

fn fallback_description() -> String {
    "No traffic noise constraints identified within the search area.".to_string()
}
