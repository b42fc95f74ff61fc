//! Underground and overhead infrastructure assessment.
//!
//! Sewer mains and electricity assets are not served by the public feature
//! services; they live in a locally-stored DuckDB layer with one GeoJSON
//! geometry per asset. The connection is read-only, owned by the process,
//! and passed in by reference. Thresholds are tight because the constraint
//! is physical clearance, not amenity.

use duckdb::Connection;
use geo::Point;
use property_report_geocoder::{Address, Geocoder};
use property_report_geometry::{FeatureGeometry, nearest_distance_meters};
use property_report_hazard_models::{Measurement, RiskLevel};
use serde::Serialize;
use strum_macros::{AsRefStr, Display};

use crate::HazardError;
use crate::common::{
    HazardRecord, any_affects, distance_measurement, nearest_distance_m, sort_by_proximity,
};

/// Search radius in metres. Matches the outermost classification bucket.
pub const SEARCH_RADIUS_M: f64 = 100.0;

/// Which local layer an asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum InfrastructureKind {
    /// Sewerage main.
    SewerMain,
    /// Electricity transmission or distribution asset.
    ElectricityAsset,
}

impl InfrastructureKind {
    const fn table(self) -> &'static str {
        match self {
            Self::SewerMain => "sewer_mains",
            Self::ElectricityAsset => "electricity_assets",
        }
    }
}

/// A normalized infrastructure asset near the property.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureAsset {
    /// Source layer for this asset.
    pub kind: InfrastructureKind,
    /// Asset identifier in the local store.
    pub asset_id: String,
    /// Asset description, if recorded.
    pub description: Option<String>,
    /// True when the asset crosses the property.
    pub affects_property: bool,
    /// Nearest distance from the property, absent when not computable.
    pub distance: Option<Measurement>,
}

impl HazardRecord for InfrastructureAsset {
    fn affects_property(&self) -> bool {
        self.affects_property
    }

    fn distance_m(&self) -> Option<f64> {
        self.distance.as_ref().map(|m| m.value)
    }
}

/// Infrastructure category report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InfrastructureReport {
    /// Classified significance tier.
    pub significance_level: RiskLevel,
    /// Normalized assets, affects-property first then nearest.
    pub assets: Vec<InfrastructureAsset>,
    /// True when any asset crosses the property.
    pub affected_by_infrastructure: bool,
    /// Narrative summary.
    pub description: String,
    /// Ordered mitigation recommendations.
    pub recommendations: Vec<String>,
}

/// Reads one local layer and computes per-asset proximity.
///
/// Rows whose geometry column fails to parse are skipped; an asset with a
/// parseable but degenerate geometry keeps its row with an absent
/// distance.
///
/// # Errors
///
/// Returns [`HazardError::Db`] if the query fails.
pub fn query_layer(
    conn: &Connection,
    kind: InfrastructureKind,
    point: Point<f64>,
) -> Result<Vec<InfrastructureAsset>, HazardError> {
    let sql = format!(
        "SELECT asset_id, description, geojson FROM {}",
        kind.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get::<_, String>(0)?,
            row.get::<_, Option<String>>(1)?,
            row.get::<_, String>(2)?,
        ))
    })?;

    let mut assets = Vec::new();
    for row in rows {
        let (asset_id, description, geojson_str) = row?;
        let Some(geometry) = parse_geometry(&geojson_str) else {
            log::debug!("Skipping asset {asset_id} with unparseable geometry");
            continue;
        };
        let meters = nearest_distance_meters(point, &geometry);
        if meters > SEARCH_RADIUS_M && meters.is_finite() {
            continue;
        }
        assets.push(InfrastructureAsset {
            kind,
            asset_id,
            description,
            affects_property: meters == 0.0,
            distance: distance_measurement(meters),
        });
    }
    Ok(assets)
}

fn parse_geometry(geojson_str: &str) -> Option<FeatureGeometry> {
    match geojson_str.parse::<geojson::GeoJson>() {
        Ok(geojson::GeoJson::Geometry(geometry)) => FeatureGeometry::from_geojson(geometry),
        Ok(_) | Err(_) => None,
    }
}

/// Classifies infrastructure significance.
///
/// Ordered rules, first match wins: any asset crossing the property ⇒
/// `VERY_HIGH`; nearest `< 10 m` ⇒ `HIGH`; `< 30 m` ⇒ `MODERATE`;
/// `< 100 m` ⇒ `LOW`; else `MINIMAL`.
#[must_use]
pub fn determine_significance(assets: &[InfrastructureAsset]) -> RiskLevel {
    if any_affects(assets) {
        return RiskLevel::VeryHigh;
    }
    match nearest_distance_m(assets) {
        Some(d) if d < 10.0 => RiskLevel::High,
        Some(d) if d < 30.0 => RiskLevel::Moderate,
        Some(d) if d < 100.0 => RiskLevel::Low,
        _ => RiskLevel::Minimal,
    }
}

/// Narrative description for the classified tier.
#[must_use]
pub fn generate_description(level: RiskLevel, assets: &[InfrastructureAsset]) -> String {
    match level {
        RiskLevel::VeryHigh => {
            let has_sewer = assets
                .iter()
                .any(|a| a.affects_property && a.kind == InfrastructureKind::SewerMain);
            let has_electricity = assets
                .iter()
                .any(|a| a.affects_property && a.kind == InfrastructureKind::ElectricityAsset);
            match (has_sewer, has_electricity) {
                (true, true) => {
                    "Sewer and electricity assets cross the property. Clearance and access \
                     requirements apply to any works."
                        .to_string()
                }
                (_, true) => {
                    "An electricity asset crosses the property. Clearance requirements apply \
                     to any works."
                        .to_string()
                }
                _ => {
                    "A sewer main crosses the property. Build-over consent is required for \
                     works above the main."
                        .to_string()
                }
            }
        }
        RiskLevel::High => {
            "Service infrastructure lies within 10 metres of the property.".to_string()
        }
        RiskLevel::Moderate => {
            "Service infrastructure lies within 30 metres of the property.".to_string()
        }
        RiskLevel::Low => {
            "Service infrastructure lies within 100 metres of the property.".to_string()
        }
        RiskLevel::Minimal => fallback_description(),
    }
}

/// Ordered mitigation recommendations.
#[must_use]
pub fn generate_recommendations(level: RiskLevel) -> Vec<String> {
    let strings: &[&str] = match level {
        RiskLevel::VeryHigh => &[
            "Obtain asset plans from the water and electricity authorities before design",
            "Apply for build-over consent before constructing above a sewer main",
            "Maintain required clearances from electricity assets during works",
        ],
        RiskLevel::High => &[
            "Obtain asset plans from the water and electricity authorities before design",
            "Locate underground services before excavation",
        ],
        RiskLevel::Moderate | RiskLevel::Low => {
            &["Locate underground services before excavation"]
        }
        RiskLevel::Minimal => &[],
    };
    strings.iter().map(ToString::to_string).collect()
}

/// Assesses the infrastructure category for a street address.
///
/// Never fails: geocoding or store errors degrade to the minimal report.
pub async fn assess(
    address: &Address,
    geocoder: &dyn Geocoder,
    conn: &Connection,
) -> InfrastructureReport {
    match geocoder.geocode(address).await {
        Ok(point) => assess_at(point.latitude, point.longitude, conn),
        Err(err) => {
            log::warn!("Infrastructure assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

/// Assesses the infrastructure category for a pre-resolved coordinate.
///
/// Both local layers are read synchronously; the store is an embedded
/// database, so there is nothing to await.
#[must_use]
pub fn assess_at(lat: f64, lon: f64, conn: &Connection) -> InfrastructureReport {
    match try_assess(lat, lon, conn) {
        Ok(report) => report,
        Err(err) => {
            log::warn!("Infrastructure assessment degraded to minimal report: {err}");
            minimal_report()
        }
    }
}

fn try_assess(lat: f64, lon: f64, conn: &Connection) -> Result<InfrastructureReport, HazardError> {
    let point = Point::new(lon, lat);
    let mut assets = query_layer(conn, InfrastructureKind::SewerMain, point)?;
    assets.extend(query_layer(
        conn,
        InfrastructureKind::ElectricityAsset,
        point,
    )?);
    sort_by_proximity(&mut assets);

    let significance_level = determine_significance(&assets);
    let affected_by_infrastructure = any_affects(&assets);
    let description = generate_description(significance_level, &assets);
    let recommendations = generate_recommendations(significance_level);

    Ok(InfrastructureReport {
        significance_level,
        assets,
        affected_by_infrastructure,
        description,
        recommendations,
    })
}

/// Deterministic fallback when the category cannot be assessed.
#[must_use]
pub fn minimal_report() -> InfrastructureReport {
    InfrastructureReport {
        significance_level: RiskLevel::Minimal,
        assets: Vec::new(),
        affected_by_infrastructure: false,
        description: fallback_description(),
        recommendations: Vec::new(),
    }
}

fn fallback_description() -> String {
    "No service infrastructure identified within the search area.".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(
        kind: InfrastructureKind,
        affects: bool,
        distance_m: Option<f64>,
    ) -> InfrastructureAsset {
        InfrastructureAsset {
            kind,
            asset_id: "A1".to_string(),
            description: None,
            affects_property: affects,
            distance: distance_m.map(Measurement::metres),
        }
    }

    fn infra_db() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE sewer_mains (
                asset_id VARCHAR,
                description VARCHAR,
                geojson VARCHAR
            );
            CREATE TABLE electricity_assets (
                asset_id VARCHAR,
                description VARCHAR,
                geojson VARCHAR
            );",
        )
        .unwrap();
        conn
    }

    fn line_between(lon_a: f64, lat_a: f64, lon_b: f64, lat_b: f64) -> String {
        format!(
            "{{\"type\":\"LineString\",\"coordinates\":[[{lon_a},{lat_a}],[{lon_b},{lat_b}]]}}"
        )
    }

    #[test]
    fn boundary_values_fall_to_less_severe_bucket() {
        assert_eq!(
            determine_significance(&[asset(InfrastructureKind::SewerMain, false, Some(10.0))]),
            RiskLevel::Moderate
        );
        assert_eq!(
            determine_significance(&[asset(InfrastructureKind::SewerMain, false, Some(30.0))]),
            RiskLevel::Low
        );
        assert_eq!(
            determine_significance(&[asset(InfrastructureKind::SewerMain, false, Some(100.0))]),
            RiskLevel::Minimal
        );
    }

    #[test]
    fn crossing_main_is_very_high() {
        let (lat, lon) = (-37.8136, 144.9631);
        let conn = infra_db();
        conn.execute(
            "INSERT INTO sewer_mains VALUES (?, ?, ?)",
            duckdb::params![
                "SM-100",
                "225mm main",
                // Runs east-west through the property point.
                line_between(lon - 0.001, lat, lon + 0.001, lat)
            ],
        )
        .unwrap();

        let report = assess_at(lat, lon, &conn);
        assert_eq!(report.significance_level, RiskLevel::VeryHigh);
        assert!(report.affected_by_infrastructure);
        assert!(report.description.contains("sewer main"));
        assert_eq!(report.assets[0].asset_id, "SM-100");
    }

    #[test]
    fn distant_assets_filtered_and_both_tables_read() {
        let (lat, lon) = (-37.8136, 144.9631);
        let conn = infra_db();
        // ~0.0005° lon ≈ 44 m here; ~0.05° ≈ 4.4 km.
        conn.execute(
            "INSERT INTO electricity_assets VALUES (?, ?, ?)",
            duckdb::params![
                "EA-7",
                Option::<String>::None,
                line_between(lon + 0.0005, lat - 0.001, lon + 0.0005, lat + 0.001)
            ],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO sewer_mains VALUES (?, ?, ?)",
            duckdb::params![
                "SM-far",
                Option::<String>::None,
                line_between(lon + 0.05, lat, lon + 0.06, lat)
            ],
        )
        .unwrap();

        let report = assess_at(lat, lon, &conn);
        assert_eq!(report.assets.len(), 1);
        assert_eq!(report.assets[0].kind, InfrastructureKind::ElectricityAsset);
        assert_eq!(report.significance_level, RiskLevel::Low);
    }

    #[test]
    fn unparseable_geometry_rows_are_skipped() {
        let (lat, lon) = (-37.8136, 144.9631);
        let conn = infra_db();
        conn.execute(
            "INSERT INTO sewer_mains VALUES (?, ?, ?)",
            duckdb::params!["SM-bad", Option::<String>::None, "not geojson"],
        )
        .unwrap();

        let report = assess_at(lat, lon, &conn);
        assert!(report.assets.is_empty());
        assert_eq!(report.significance_level, RiskLevel::Minimal);
    }

    #[test]
    fn empty_store_is_minimal() {
        let conn = infra_db();
        let report = assess_at(-37.8136, 144.9631, &conn);
        assert_eq!(report.significance_level, RiskLevel::Minimal);
        assert_eq!(
            report.description,
            "No service infrastructure identified within the search area."
        );
    }

    #[test]
    fn missing_tables_degrade_to_minimal() {
        let conn = Connection::open_in_memory().unwrap();
        let report = assess_at(-37.8136, 144.9631, &conn);
        assert_eq!(report.significance_level, RiskLevel::Minimal);
    }
}
