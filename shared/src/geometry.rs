//! Farm boundary geometry
//!
//! A [`BoundaryRing`] is the closed outline of a farm. The validator computes
//! its area and checks it against boundaries that were already accepted.

use geo::coordinate_position::CoordPos;
use geo::dimensions::Dimensions;
use geo::{GeodesicArea, LineString, Polygon, Relate};
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::types::LatLng;

/// Square meters per hectare
pub const SQ_METERS_PER_HECTARE: f64 = 10_000.0;

/// Acres per hectare
pub const ACRES_PER_HECTARE: f64 = 2.47105;

/// Minimum number of distinct vertices in a boundary
pub const MIN_BOUNDARY_POINTS: usize = 3;

/// Errors building a boundary ring
#[derive(Debug, Error, PartialEq)]
pub enum RingError {
    #[error("A boundary needs at least {MIN_BOUNDARY_POINTS} points, got {0}")]
    TooFewPoints(usize),

    #[error("Boundary ring is not closed")]
    NotClosed,

    #[error("Unsupported geometry: {0}")]
    UnsupportedGeometry(String),
}

/// Closed ring of coordinates describing a farm outline
///
/// Always holds at least three distinct vertices with the first point
/// repeated at the end.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct BoundaryRing(Vec<LatLng>);

impl BoundaryRing {
    /// Close an open sequence of vertices by repeating the first point
    ///
    /// An already closed sequence is accepted as is.
    /// Repeated consecutive vertices (a double tap while drawing) collapse
    /// into one.
    pub fn close(mut points: Vec<LatLng>) -> Result<Self, RingError> {
        points.dedup();
        if points.len() > 1 && points.first() == points.last() {
            points.pop();
        }
        let distinct = distinct_count(&points);
        if distinct < MIN_BOUNDARY_POINTS {
            return Err(RingError::TooFewPoints(distinct));
        }
        let first = points[0];
        points.push(first);
        Ok(Self(points))
    }

    /// Accept a ring that must already be closed
    pub fn from_closed(points: Vec<LatLng>) -> Result<Self, RingError> {
        if points.len() < MIN_BOUNDARY_POINTS + 1 {
            return Err(RingError::TooFewPoints(points.len().saturating_sub(1)));
        }
        if points.first() != points.last() {
            return Err(RingError::NotClosed);
        }
        Self::close(points)
    }

    pub fn points(&self) -> &[LatLng] {
        &self.0
    }

    /// Number of distinct vertices (closing point excluded)
    pub fn vertex_count(&self) -> usize {
        self.0.len() - 1
    }

    pub fn to_polygon(&self) -> Polygon<f64> {
        let exterior: LineString<f64> = self.0.iter().map(|p| p.to_coord()).collect();
        Polygon::new(exterior, vec![])
    }

    /// Arithmetic mean of the distinct vertices, used for map markers
    pub fn center(&self) -> LatLng {
        let vertices = &self.0[..self.0.len() - 1];
        let n = vertices.len() as f64;
        let (lat, lng) = vertices
            .iter()
            .fold((0.0, 0.0), |(lat, lng), p| (lat + p.lat, lng + p.lng));
        LatLng::new(lat / n, lng / n)
    }

    /// GeoJSON MultiPolygon geometry, positions in `[lng, lat]` order
    pub fn to_geojson(&self) -> geojson::Geometry {
        let ring: Vec<Vec<f64>> = self.0.iter().map(|p| vec![p.lng, p.lat]).collect();
        geojson::Geometry::new(geojson::Value::MultiPolygon(vec![vec![ring]]))
    }

    /// Read the outer ring of the first polygon of a Polygon or MultiPolygon
    pub fn from_geojson(geometry: &geojson::Geometry) -> Result<Self, RingError> {
        let outer = match &geometry.value {
            geojson::Value::Polygon(rings) => rings.first(),
            geojson::Value::MultiPolygon(polygons) => polygons.first().and_then(|p| p.first()),
            _ => {
                return Err(RingError::UnsupportedGeometry(
                    "expected Polygon or MultiPolygon".to_string(),
                ))
            }
        };
        let points = outer
            .map(|ring| {
                ring.iter()
                    .filter(|pos| pos.len() >= 2)
                    .map(|pos| LatLng::new(pos[1], pos[0]))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();
        Self::close(points)
    }
}

fn distinct_count(points: &[LatLng]) -> usize {
    points
        .iter()
        .enumerate()
        .filter(|(i, p)| !points[..*i].contains(p))
        .count()
}

impl<'de> Deserialize<'de> for BoundaryRing {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let points = Vec::<LatLng>::deserialize(deserializer)?;
        BoundaryRing::close(points).map_err(serde::de::Error::custom)
    }
}

/// A previously accepted farm boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExistingBoundary {
    pub farm_id: Uuid,
    pub ring: BoundaryRing,
}

/// Result of validating a new boundary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeometryAssessment {
    pub area_square_meters: f64,
    pub area_hectares: Decimal,
    pub area_acres: Decimal,
    pub overlaps: bool,
    /// First existing farm found to conflict with the new boundary
    pub conflicting_farm_id: Option<Uuid>,
}

/// Geodesic area of a ring in square meters
pub fn area_square_meters(ring: &BoundaryRing) -> f64 {
    ring.to_polygon().geodesic_area_unsigned()
}

/// Round to one decimal place for display; never negative zero
pub fn round_one_decimal(value: f64) -> Decimal {
    let mut rounded = Decimal::from_f64(value)
        .unwrap_or_default()
        .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
    if rounded.is_zero() {
        rounded.set_sign_positive(true);
    }
    rounded
}

pub fn square_meters_to_hectares(square_meters: f64) -> f64 {
    square_meters / SQ_METERS_PER_HECTARE
}

pub fn hectares_to_acres(hectares: f64) -> f64 {
    hectares * ACRES_PER_HECTARE
}

/// Area of a ring in hectares, rounded to one decimal place
pub fn area_hectares(ring: &BoundaryRing) -> Decimal {
    round_one_decimal(square_meters_to_hectares(area_square_meters(ring)))
}

/// True when the two boundaries share interior area or one contains the other
pub fn boundaries_overlap(new: &BoundaryRing, existing: &BoundaryRing) -> bool {
    let matrix = new.to_polygon().relate(&existing.to_polygon());

    matrix.get(CoordPos::Inside, CoordPos::Inside) != Dimensions::Empty
        || matrix.is_within()
        || matrix.is_contains()
}

/// First existing boundary that conflicts with `ring`
pub fn find_overlap<'a>(
    ring: &BoundaryRing,
    existing: &'a [ExistingBoundary],
) -> Option<&'a ExistingBoundary> {
    existing.iter().find(|e| boundaries_overlap(ring, &e.ring))
}

/// Whether a GPS fix is far enough from the last kept point to be recorded
///
/// Fixes off the globe are never recorded; the first valid fix always is.
pub fn accept_trace_point(last: Option<&LatLng>, next: &LatLng, min_distance_meters: f64) -> bool {
    if crate::validation::validate_coordinates(next.lat, next.lng).is_err() {
        return false;
    }
    match last {
        Some(last) => last.distance_meters(next) > min_distance_meters,
        None => true,
    }
}

/// Compute area and overlap for a newly captured boundary
pub fn assess(ring: &BoundaryRing, existing: &[ExistingBoundary]) -> GeometryAssessment {
    let square_meters = area_square_meters(ring);
    let hectares = square_meters_to_hectares(square_meters);
    let conflict = find_overlap(ring, existing);

    GeometryAssessment {
        area_square_meters: square_meters,
        area_hectares: round_one_decimal(hectares),
        area_acres: round_one_decimal(hectares_to_acres(hectares)),
        overlaps: conflict.is_some(),
        conflicting_farm_id: conflict.map(|c| c.farm_id),
    }
}
