//! Planar predicates used to classify grid cells against a query shape.
//!
//! Thin adapter over the `geo` crate. The quad-tree only needs to ask three
//! questions of a shape (disjoint, contains, intersects) against an axis
//! aligned cell or a single point, so that is all this module exposes.

use crate::error::{GeoIndexError, Result};
use geo::{BoundingRect, Contains, Coord, Intersects, LineString, Point, Polygon, Rect};
use rustc_hash::FxHashSet;

/// Predicates a query shape must answer for quad-tree classification.
pub trait GeometryPredicates {
    /// Shape and `rect` share no point, boundary included.
    fn disjoint(&self, rect: &Rect) -> bool {
        !self.intersects(rect)
    }

    /// Every point of `rect` lies inside the shape.
    fn contains(&self, rect: &Rect) -> bool;

    /// Shape and `rect` share at least one point, boundary included.
    fn intersects(&self, rect: &Rect) -> bool;

    /// Shape and `point` are not disjoint.
    fn touches_point(&self, point: &Point) -> bool;
}

impl GeometryPredicates for Polygon {
    fn contains(&self, rect: &Rect) -> bool {
        Contains::contains(self, &rect.to_polygon())
    }

    fn intersects(&self, rect: &Rect) -> bool {
        Intersects::intersects(self, rect)
    }

    fn touches_point(&self, point: &Point) -> bool {
        Intersects::intersects(self, point)
    }
}

impl GeometryPredicates for Rect {
    fn contains(&self, rect: &Rect) -> bool {
        self.min().x <= rect.min().x
            && self.min().y <= rect.min().y
            && self.max().x >= rect.max().x
            && self.max().y >= rect.max().y
    }

    fn intersects(&self, rect: &Rect) -> bool {
        !(self.max().x < rect.min().x
            || rect.max().x < self.min().x
            || self.max().y < rect.min().y
            || rect.max().y < self.min().y)
    }

    fn touches_point(&self, point: &Point) -> bool {
        (self.min().x..=self.max().x).contains(&point.x())
            && (self.min().y..=self.max().y).contains(&point.y())
    }
}

/// Builds a closed polygon from an ordered vertex list.
///
/// The ring is closed automatically. Fewer than 3 distinct vertices is an
/// error.
///
/// # Examples
///
/// ```
/// use geo::coord;
/// use geoindex::compute::geometry::polygon_from_vertices;
///
/// let poly = polygon_from_vertices(&[
///     coord! { x: 0.0, y: 0.0 },
///     coord! { x: 1.0, y: 0.0 },
///     coord! { x: 1.0, y: 1.0 },
/// ])
/// .unwrap();
/// assert_eq!(poly.exterior().0.len(), 4);
/// ```
pub fn polygon_from_vertices(vertices: &[Coord]) -> Result<Polygon> {
    let mut distinct: FxHashSet<(u64, u64)> = FxHashSet::default();
    for vertex in vertices {
        if !vertex.x.is_finite() || !vertex.y.is_finite() {
            return Err(GeoIndexError::InvalidInput(format!(
                "Polygon vertex must be finite, got: ({}, {})",
                vertex.x, vertex.y
            )));
        }
        // adding 0.0 folds -0.0 onto 0.0
        distinct.insert(((vertex.x + 0.0).to_bits(), (vertex.y + 0.0).to_bits()));
    }

    if distinct.len() < 3 {
        return Err(GeoIndexError::InvalidInput(format!(
            "Polygon requires at least 3 distinct vertices, got {}",
            distinct.len()
        )));
    }

    Ok(Polygon::new(LineString::from(vertices.to_vec()), vec![]))
}

/// Axis-aligned bounding envelope of a polygon.
pub fn envelope(polygon: &Polygon) -> Result<Rect> {
    polygon
        .bounding_rect()
        .ok_or_else(|| GeoIndexError::InvalidInput("Polygon has no vertices".to_string()))
}
