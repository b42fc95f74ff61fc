//! Shared record helpers used by every category module.
//!
//! Normalized records implement [`HazardRecord`] so sorting, nearest-feature
//! lookup, and in-radius counting behave identically across categories.

use geo::Point;
use property_report_features::GeographicFeature;
use property_report_geometry::{centroid, haversine_meters, nearest_distance_meters};
use property_report_hazard_models::Measurement;

/// A normalized record with the two signals every classifier keys off.
pub trait HazardRecord {
    /// True when the property point falls inside the feature's geometry.
    fn affects_property(&self) -> bool;
    /// Computed distance in metres, absent when unknown/not computable.
    fn distance_m(&self) -> Option<f64>;
}

/// Sorts records affects-property first, then ascending distance, records
/// with unknown distance last. Classifiers and narrative generators that
/// key off "first/closest record" rely on this ordering.
pub fn sort_by_proximity<R: HazardRecord>(records: &mut [R]) {
    records.sort_by(|a, b| {
        b.affects_property()
            .cmp(&a.affects_property())
            .then_with(|| {
                let da = a.distance_m().unwrap_or(f64::INFINITY);
                let db = b.distance_m().unwrap_or(f64::INFINITY);
                da.total_cmp(&db)
            })
    });
}

/// Minimum finite distance across records, if any.
#[must_use]
pub fn nearest_distance_m<R: HazardRecord>(records: &[R]) -> Option<f64> {
    records
        .iter()
        .filter_map(HazardRecord::distance_m)
        .filter(|d| d.is_finite())
        .min_by(f64::total_cmp)
}

/// Number of records strictly closer than `meters`. Unknown and infinite
/// distances are excluded.
#[must_use]
pub fn count_within<R: HazardRecord>(records: &[R], meters: f64) -> usize {
    records
        .iter()
        .filter_map(HazardRecord::distance_m)
        .filter(|d| d.is_finite() && *d < meters)
        .count()
}

/// True when any record affects the property directly.
#[must_use]
pub fn any_affects<R: HazardRecord>(records: &[R]) -> bool {
    records.iter().any(HazardRecord::affects_property)
}

/// Wraps a metre distance as a [`Measurement`], mapping the infinite
/// "no usable geometry" sentinel to absent.
#[must_use]
pub fn distance_measurement(meters: f64) -> Option<Measurement> {
    meters.is_finite().then(|| Measurement::metres(meters))
}

/// Distance and containment for one feature, computed once at
/// normalization time.
///
/// Returns `(distance, affects_property)`. Distance is absent when the
/// feature has no usable geometry; `affects_property` is true exactly when
/// the nearest distance is zero (containment).
#[must_use]
pub fn feature_proximity(point: Point<f64>, feature: &GeographicFeature) -> (Option<Measurement>, bool) {
    let Some(geometry) = feature.geometry.as_ref() else {
        return (None, false);
    };
    let meters = nearest_distance_meters(point, geometry);
    let affects = meters == 0.0;
    (distance_measurement(meters), affects)
}

/// Coarse centroid distance for one feature, used by polygon categories
/// where only a radius check is needed (fire history, heritage,
/// biodiversity buffers). Cheaper than the nearest-edge computation and
/// explicitly approximate.
#[must_use]
pub fn centroid_proximity(
    point: Point<f64>,
    feature: &GeographicFeature,
) -> (Option<Measurement>, bool) {
    let Some(geometry) = feature.geometry.as_ref() else {
        return (None, false);
    };
    let affects = property_report_geometry::point_in_polygon(point, geometry);
    if affects {
        return (Some(Measurement::metres(0.0)), true);
    }
    let distance =
        centroid(geometry).map(|c| Measurement::metres(haversine_meters(point, c)));
    (distance, false)
}

/// Comma-joined names of the affecting records, for narrative text.
/// Only records that affect the property directly are ever named.
#[must_use]
pub fn affecting_names<R, F>(records: &[R], name: F) -> String
where
    R: HazardRecord,
    F: Fn(&R) -> Option<&str>,
{
    records
        .iter()
        .filter(|r| r.affects_property())
        .filter_map(|r| name(r))
        .collect::<Vec<_>>()
        .join(", ")
}
