#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Risk tier enumerations and measurement types shared across hazard
//! categories.
//!
//! Every hazard category classifies into the shared [`RiskLevel`] ladder,
//! except bushfire which uses the four-tier [`BushfireRiskLevel`] scale
//! mandated by the fire authority reporting conventions.

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Discrete risk tier for a hazard category, ordered from worst to least.
///
/// Exactly one tier is produced per category per address. A hazard that
/// affects the property directly always classifies as [`Self::VeryHigh`]
/// regardless of any distance-based signal.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    /// Hazard feature intersects the property itself.
    VeryHigh,
    /// Hazard feature in the immediate vicinity.
    High,
    /// Hazard feature nearby.
    Moderate,
    /// Hazard feature in the broader surrounds.
    Low,
    /// No constraint identified within the search buffer.
    Minimal,
}

impl RiskLevel {
    /// Numeric severity, 5 (worst) down to 1.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::VeryHigh => 5,
            Self::High => 4,
            Self::Moderate => 3,
            Self::Low => 2,
            Self::Minimal => 1,
        }
    }
}

/// Bushfire risk tier, ordered from worst to least.
///
/// Bushfire uses a four-tier scale driven by a weighted score rather than
/// simple distance buckets; see the bushfire category for the score table.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum BushfireRiskLevel {
    /// Weighted score at or above the extreme threshold.
    Extreme,
    /// Elevated bushfire exposure.
    High,
    /// Some bushfire exposure signals present.
    Medium,
    /// No material bushfire exposure identified.
    Low,
}

impl BushfireRiskLevel {
    /// Numeric severity, 4 (worst) down to 1.
    #[must_use]
    pub const fn severity(self) -> u8 {
        match self {
            Self::Extreme => 4,
            Self::High => 3,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }
}

/// A scalar quantity with an explicit unit. Always non-negative.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// The magnitude in `unit`.
    pub value: f64,
    /// Unit label, e.g. `"metres"`, `"km"`, `"square metres"`, `"ha"`.
    pub unit: String,
}

impl Measurement {
    /// A length in metres.
    #[must_use]
    pub fn metres(value: f64) -> Self {
        Self {
            value,
            unit: "metres".to_string(),
        }
    }

    /// A length in kilometres.
    #[must_use]
    pub fn kilometres(value: f64) -> Self {
        Self {
            value,
            unit: "km".to_string(),
        }
    }

    /// An area in square metres.
    #[must_use]
    pub fn square_metres(value: f64) -> Self {
        Self {
            value,
            unit: "square metres".to_string(),
        }
    }

    /// An area in hectares.
    #[must_use]
    pub fn hectares(value: f64) -> Self {
        Self {
            value,
            unit: "ha".to_string(),
        }
    }
}

/// Whether an easement dimension describes a length or an area.
///
/// Easement layers publish either a width or a parcel area for the same
/// entity, so the discriminator travels with the measurement.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum MeasurementKind {
    /// A linear dimension (e.g. easement width).
    Length,
    /// An areal dimension (e.g. easement extent).
    Area,
}

/// An easement dimension: a [`Measurement`] tagged with its kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EasementMeasurement {
    /// Length or area.
    #[serde(rename = "type")]
    pub kind: MeasurementKind,
    /// The dimension itself.
    pub measurement: f64,
    /// Unit label for `measurement`.
    pub unit: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_level_severity_is_total_order() {
        assert!(RiskLevel::VeryHigh.severity() > RiskLevel::High.severity());
        assert!(RiskLevel::High.severity() > RiskLevel::Moderate.severity());
        assert!(RiskLevel::Moderate.severity() > RiskLevel::Low.severity());
        assert!(RiskLevel::Low.severity() > RiskLevel::Minimal.severity());
    }

    #[test]
    fn risk_level_serializes_screaming_snake() {
        let json = serde_json::to_string(&RiskLevel::VeryHigh).unwrap();
        assert_eq!(json, "\"VERY_HIGH\"");
        assert_eq!(RiskLevel::VeryHigh.to_string(), "VERY_HIGH");
    }

    #[test]
    fn bushfire_scale_serializes_screaming_snake() {
        let json = serde_json::to_string(&BushfireRiskLevel::Extreme).unwrap();
        assert_eq!(json, "\"EXTREME\"");
        assert!(BushfireRiskLevel::Extreme.severity() > BushfireRiskLevel::High.severity());
    }

    #[test]
    fn measurement_constructors_set_units() {
        assert_eq!(Measurement::metres(42.0).unit, "metres");
        assert_eq!(Measurement::hectares(1.5).unit, "ha");
    }

    #[test]
    fn easement_measurement_tags_kind() {
        let m = EasementMeasurement {
            kind: MeasurementKind::Length,
            measurement: 3.0,
            unit: "metres".to_string(),
        };
        let json = serde_json::to_string(&m).unwrap();
        assert!(json.contains("\"type\":\"LENGTH\""));
    }
}
