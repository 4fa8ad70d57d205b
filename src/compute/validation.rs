//! Validation and parsing of query coordinates.

use crate::error::{GeoIndexError, Result};
use geo::{Coord, coord};

/// Validates a coordinate has a finite longitude in [-180, 180] and latitude in [-90, 90].
///
/// # Examples
///
/// ```
/// use geo::coord;
/// use geoindex::compute::validation::validate_geographic_coord;
///
/// assert!(validate_geographic_coord(&coord! { x: 116.39, y: 39.91 }).is_ok());
/// assert!(validate_geographic_coord(&coord! { x: 200.0, y: 39.91 }).is_err());
/// assert!(validate_geographic_coord(&coord! { x: 116.39, y: 95.0 }).is_err());
/// ```
pub fn validate_geographic_coord(coord: &Coord) -> Result<()> {
    let (x, y) = (coord.x, coord.y);

    if !x.is_finite() {
        return Err(GeoIndexError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            x
        )));
    }

    if !y.is_finite() {
        return Err(GeoIndexError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            y
        )));
    }

    if !(-180.0..=180.0).contains(&x) {
        return Err(GeoIndexError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(GeoIndexError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// Validates every vertex of a query polygon and that there are at least 3.
pub fn validate_vertices(vertices: &[Coord]) -> Result<()> {
    if vertices.len() < 3 {
        return Err(GeoIndexError::InvalidInput(format!(
            "Polygon requires at least 3 points, got {}",
            vertices.len()
        )));
    }

    for (idx, vertex) in vertices.iter().enumerate() {
        validate_geographic_coord(vertex).map_err(|e| {
            GeoIndexError::InvalidInput(format!("Point at index {}: {}", idx, e))
        })?;
    }
    Ok(())
}

/// Parses `"lon,lat;lon,lat;..."` into polygon vertices.
///
/// Whitespace around numbers and a trailing `;` are ignored.
///
/// # Examples
///
/// ```
/// use geoindex::compute::validation::parse_polygon_text;
///
/// let vertices = parse_polygon_text("116.32,40.12; 116.13,40.01; 116.35,39.97;").unwrap();
/// assert_eq!(vertices.len(), 3);
/// assert_eq!(vertices[0].x, 116.32);
///
/// assert!(parse_polygon_text("116.32,40.12;116.13,40.01").is_err());
/// assert!(parse_polygon_text("116.32;116.13,40.01;116.35,39.97").is_err());
/// ```
pub fn parse_polygon_text(text: &str) -> Result<Vec<Coord>> {
    let vertices = text
        .split(';')
        .map(str::trim)
        .filter(|point| !point.is_empty())
        .enumerate()
        .map(|(idx, point)| parse_point(idx, point))
        .collect::<Result<Vec<_>>>()?;

    validate_vertices(&vertices)?;
    Ok(vertices)
}

fn parse_point(idx: usize, point: &str) -> Result<Coord> {
    let parts: Vec<&str> = point.split(',').map(str::trim).collect();
    if parts.len() != 2 {
        return Err(GeoIndexError::InvalidInput(format!(
            "Point at index {} must have exactly 2 coordinates, got: '{}'",
            idx, point
        )));
    }

    let parse = |raw: &str| {
        raw.parse::<f64>().map_err(|_| {
            GeoIndexError::InvalidInput(format!(
                "Point at index {} has a non-numeric coordinate: '{}'",
                idx, raw
            ))
        })
    };

    Ok(coord! { x: parse(parts[0])?, y: parse(parts[1])? })
}
