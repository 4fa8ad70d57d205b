//! GeoJSON input for query polygons.

use super::validation::validate_vertices;
use crate::error::{GeoIndexError, Result};
use geo::Coord;
use geojson::{GeoJson, Geometry, Value};

/// Parses a GeoJSON Polygon geometry (or a Feature wrapping one) into the
/// vertices of its exterior ring.
///
/// Polygons with holes are rejected.
pub fn polygon_vertices_from_geojson(geojson: &str) -> Result<Vec<Coord>> {
    let parsed: GeoJson = geojson
        .parse()
        .map_err(|e| GeoIndexError::InvalidInput(format!("Failed to parse GeoJSON: {}", e)))?;

    let geometry = match parsed {
        GeoJson::Geometry(geometry) => geometry,
        GeoJson::Feature(feature) => feature.geometry.ok_or_else(|| {
            GeoIndexError::InvalidInput("GeoJSON feature has no geometry".to_string())
        })?,
        GeoJson::FeatureCollection(_) => {
            return Err(GeoIndexError::InvalidInput(
                "GeoJSON FeatureCollection is not a single polygon".to_string(),
            ));
        }
    };

    exterior_ring(geometry)
}

fn exterior_ring(geometry: Geometry) -> Result<Vec<Coord>> {
    match geometry.value {
        Value::Polygon(rings) => {
            if rings.is_empty() {
                return Err(GeoIndexError::InvalidInput(
                    "Polygon must have at least one ring".to_string(),
                ));
            }
            if rings.len() > 1 {
                return Err(GeoIndexError::InvalidInput(format!(
                    "Polygon holes are not supported, got {} interior rings",
                    rings.len() - 1
                )));
            }

            let vertices = rings[0]
                .iter()
                .map(|coords| {
                    if coords.len() < 2 {
                        return Err(GeoIndexError::InvalidInput(
                            "Coordinate must have at least 2 values".to_string(),
                        ));
                    }
                    Ok(Coord {
                        x: coords[0],
                        y: coords[1],
                    })
                })
                .collect::<Result<Vec<_>>>()?;

            validate_vertices(&vertices)?;
            Ok(vertices)
        }
        _ => Err(GeoIndexError::InvalidInput(
            "GeoJSON geometry is not a Polygon".to_string(),
        )),
    }
}
