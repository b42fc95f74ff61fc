#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Point-to-geometry proximity math for hazard analysis.
//!
//! Every hazard category reduces to the same two questions about a property
//! coordinate and a government feature layer geometry: does the feature
//! cover the property, and if not, how far away is it in metres? This crate
//! answers both without ever panicking or returning an error — degenerate
//! geometry degrades to an infinite distance, which callers treat as
//! "unknown/very far" and exclude from nearby counts.
//!
//! Containment and distance are evaluated against **outer rings only**;
//! interior rings (holes) are deliberately ignored. A point inside a hole
//! therefore registers as inside the polygon. This mirrors the behaviour of
//! the upstream report system and must not be "fixed" — changing it would
//! silently alter classification outcomes.

use geo::{Contains, Coord, Distance, Geodesic, LineString, Point, Polygon};

/// Mean Earth radius in metres, used for great-circle point distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Outer rings with more vertices than this are simplified before the
/// nearest-edge computation, bounding cost on very large government
/// polygons.
pub const MAX_RING_VERTICES: usize = 5_000;

/// Ramer-Douglas-Peucker tolerance for oversized rings, in decimal degrees
/// (~11 m at the equator). Distances for simplified rings are approximate,
/// never more accurate than this.
pub const SIMPLIFY_TOLERANCE_DEG: f64 = 0.0001;

/// Geometry of one feature from an external feature service.
///
/// A closed union: consumers match exhaustively rather than probing runtime
/// type names. Coordinates are WGS84 `(longitude, latitude)` pairs.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureGeometry {
    /// A single coordinate (e.g. an asset or incident point).
    Point(Point<f64>),
    /// An open polyline (e.g. a waterway centreline).
    LineString(LineString<f64>),
    /// Several polylines belonging to one feature.
    MultiLineString(geo::MultiLineString<f64>),
    /// A closed ring with optional holes.
    Polygon(Polygon<f64>),
    /// Several polygons belonging to one feature.
    MultiPolygon(geo::MultiPolygon<f64>),
}

impl FeatureGeometry {
    /// Converts a `GeoJSON` geometry into the closed union.
    ///
    /// Returns `None` for geometry types the pipeline does not consume
    /// (e.g. `GeometryCollection`) or for malformed coordinate payloads.
    #[must_use]
    pub fn from_geojson(geometry: geojson::Geometry) -> Option<Self> {
        let geo_geom: geo::Geometry<f64> = geometry.try_into().ok()?;
        match geo_geom {
            geo::Geometry::Point(p) => Some(Self::Point(p)),
            geo::Geometry::LineString(ls) => Some(Self::LineString(ls)),
            geo::Geometry::MultiLineString(mls) => Some(Self::MultiLineString(mls)),
            geo::Geometry::Polygon(p) => Some(Self::Polygon(p)),
            geo::Geometry::MultiPolygon(mp) => Some(Self::MultiPolygon(mp)),
            _ => None,
        }
    }
}

/// Great-circle distance in metres between two WGS84 points.
#[must_use]
pub fn haversine_meters(a: Point<f64>, b: Point<f64>) -> f64 {
    let lat1 = a.y().to_radians();
    let lat2 = b.y().to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.x() - a.x()).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_M * c
}

/// Tests whether a point falls inside a polygonal feature.
///
/// Only `Polygon` and `MultiPolygon` variants can contain a point; all
/// other variants return `false`. Containment is evaluated against each
/// outer ring with holes stripped, so a point inside a hole counts as
/// contained (documented limitation, see crate docs).
#[must_use]
pub fn point_in_polygon(point: Point<f64>, geometry: &FeatureGeometry) -> bool {
    match geometry {
        FeatureGeometry::Polygon(polygon) => outer_shell(polygon).contains(&point),
        FeatureGeometry::MultiPolygon(multi) => {
            multi.iter().any(|p| outer_shell(p).contains(&point))
        }
        FeatureGeometry::Point(_)
        | FeatureGeometry::LineString(_)
        | FeatureGeometry::MultiLineString(_) => false,
    }
}

/// Nearest distance in metres from a point to a feature geometry.
///
/// * `Polygon`/`MultiPolygon`: `0.0` when the point is contained, otherwise
///   the minimum over all outer rings of the point-to-polyline distance.
/// * `LineString`/`MultiLineString`: minimum point-to-polyline distance.
/// * `Point`: great-circle distance.
///
/// Non-finite coordinates are filtered out first; a ring reduced below
/// four points is skipped. When every ring of a feature is unusable the
/// result is [`f64::INFINITY`] — callers must exclude infinite distances
/// from nearby counts. This function never panics.
#[must_use]
pub fn nearest_distance_meters(point: Point<f64>, geometry: &FeatureGeometry) -> f64 {
    match geometry {
        FeatureGeometry::Point(other) => haversine_meters(point, *other),
        FeatureGeometry::LineString(line) => polyline_distance(point, line),
        FeatureGeometry::MultiLineString(multi) => multi
            .iter()
            .map(|line| polyline_distance(point, line))
            .fold(f64::INFINITY, f64::min),
        FeatureGeometry::Polygon(polygon) => polygon_distance(point, polygon),
        FeatureGeometry::MultiPolygon(multi) => multi
            .iter()
            .map(|polygon| polygon_distance(point, polygon))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Centroid of a feature geometry, if one can be computed.
#[must_use]
pub fn centroid(geometry: &FeatureGeometry) -> Option<Point<f64>> {
    use geo::Centroid;

    match geometry {
        FeatureGeometry::Point(p) => Some(*p),
        FeatureGeometry::LineString(ls) => ls.centroid(),
        FeatureGeometry::MultiLineString(mls) => mls.centroid(),
        FeatureGeometry::Polygon(p) => p.centroid(),
        FeatureGeometry::MultiPolygon(mp) => mp.centroid(),
    }
}

/// A polygon rebuilt from its exterior ring only, holes stripped.
fn outer_shell(polygon: &Polygon<f64>) -> Polygon<f64> {
    Polygon::new(polygon.exterior().clone(), vec![])
}

fn polygon_distance(point: Point<f64>, polygon: &Polygon<f64>) -> f64 {
    if outer_shell(polygon).contains(&point) {
        return 0.0;
    }
    usable_ring(polygon.exterior())
        .map_or(f64::INFINITY, |coords| point_to_segments(point, &coords))
}

fn polyline_distance(point: Point<f64>, line: &LineString<f64>) -> f64 {
    let coords = sanitize(line.coords());
    if coords.len() < 2 {
        return f64::INFINITY;
    }
    point_to_segments(point, &coords)
}

/// Validates an outer ring: filters non-finite coordinates, rejects rings
/// reduced below four points, and simplifies oversized rings.
fn usable_ring(ring: &LineString<f64>) -> Option<Vec<Coord<f64>>> {
    let coords = sanitize(ring.coords());
    if coords.len() < 4 {
        log::debug!("Skipping degenerate ring with {} usable points", coords.len());
        return None;
    }
    if coords.len() > MAX_RING_VERTICES {
        log::debug!(
            "Simplifying oversized ring ({} vertices) before distance calculation",
            coords.len()
        );
        return Some(simplify_rdp(&coords, SIMPLIFY_TOLERANCE_DEG));
    }
    Some(coords)
}

fn sanitize<'a>(coords: impl Iterator<Item = &'a Coord<f64>>) -> Vec<Coord<f64>> {
    coords
        .filter(|c| c.x.is_finite() && c.y.is_finite())
        .copied()
        .collect()
}

/// Minimum distance in metres from a point to a polyline, one segment at a
/// time. The closest point on each segment is found in coordinate space;
/// the metre distance to it is geodesic (ellipsoidal).
fn point_to_segments(point: Point<f64>, coords: &[Coord<f64>]) -> f64 {
    let mut min = f64::INFINITY;
    for pair in coords.windows(2) {
        let nearest = closest_on_segment(point, pair[0], pair[1]);
        let d = Geodesic.distance(point, Point::new(nearest.x, nearest.y));
        if d < min {
            min = d;
        }
    }
    min
}

/// Closest point on the segment `a`-`b` to `point`, in coordinate space.
fn closest_on_segment(point: Point<f64>, a: Coord<f64>, b: Coord<f64>) -> Coord<f64> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx.mul_add(dx, dy * dy);
    if len_sq == 0.0 {
        return a;
    }
    let t = ((point.x() - a.x).mul_add(dx, (point.y() - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    Coord {
        x: t.mul_add(dx, a.x),
        y: t.mul_add(dy, a.y),
    }
}

/// Ramer-Douglas-Peucker curve simplification in coordinate space.
///
/// Endpoints are always retained, so a closed ring stays closed.
fn simplify_rdp(coords: &[Coord<f64>], tolerance: f64) -> Vec<Coord<f64>> {
    if coords.len() <= 2 {
        return coords.to_vec();
    }

    let first = coords[0];
    let last = coords[coords.len() - 1];

    let mut max_dist = 0.0;
    let mut max_idx = 0;
    for (idx, c) in coords.iter().enumerate().skip(1).take(coords.len() - 2) {
        let d = perpendicular_distance(*c, first, last);
        if d > max_dist {
            max_dist = d;
            max_idx = idx;
        }
    }

    if max_dist <= tolerance {
        return vec![first, last];
    }

    let mut left = simplify_rdp(&coords[..=max_idx], tolerance);
    let right = simplify_rdp(&coords[max_idx..], tolerance);
    left.pop();
    left.extend(right);
    left
}

/// Perpendicular distance (in coordinate units) from `point` to the line
/// through `a` and `b`.
fn perpendicular_distance(point: Coord<f64>, a: Coord<f64>, b: Coord<f64>) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len = dx.hypot(dy);
    if len == 0.0 {
        return (point.x - a.x).hypot(point.y - a.y);
    }
    (dy.mul_add(point.x, -(dx * point.y)) + b.x.mul_add(a.y, -(b.y * a.x))).abs() / len
}
