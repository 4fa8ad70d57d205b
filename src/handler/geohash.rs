//! Z-order grid index handler.

use super::{ColumnValue, IndexHandler};
use crate::compute::HashRange;
use crate::compute::encoder::GeoGridEncoder;
use crate::compute::geometry;
use crate::compute::morton::HashKey;
use crate::compute::validation::{parse_polygon_text, validate_vertices};
use crate::config::GeoHashConfig;
use crate::error::{GeoIndexError, Result};
use geo::Coord;
use std::collections::HashMap;

/// Geohash index over a longitude/latitude column pair.
///
/// The encoder is derived once when the handler is built and shared by every
/// `generate` and `query` call afterwards. Each query builds and drops its
/// own range tree.
///
/// # Example
///
/// ```rust
/// use geoindex::{GeoHashConfig, GeoHashIndex, RangeSet};
///
/// let config = GeoHashConfig::new(
///     39.832277,
///     (115.811865, 116.782233),
///     (39.832277, 40.225281),
///     50.0,
///     1_000_000,
/// );
/// let index = GeoHashIndex::new("mygeohash", config)?;
///
/// let key = index.encode(116_285_807, 40_084_087)?;
/// let ranges = RangeSet::new(
///     index.query_text("116.28,40.08;116.29,40.08;116.29,40.09;116.28,40.09")?,
/// );
/// assert!(ranges.contains(key));
/// # Ok::<(), geoindex::GeoIndexError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GeoHashIndex {
    name: String,
    config: GeoHashConfig,
    encoder: GeoGridEncoder,
}

impl GeoHashIndex {
    pub fn new(name: &str, config: GeoHashConfig) -> Result<Self> {
        config.validate()?;
        let encoder = GeoGridEncoder::from_config(&config)?;
        Ok(Self {
            name: name.to_string(),
            config,
            encoder,
        })
    }

    /// Builds the handler declared as `handler_name` in a table property map.
    pub fn from_properties(
        handler_name: &str,
        properties: &HashMap<String, String>,
    ) -> Result<Self> {
        let config = GeoHashConfig::from_properties(handler_name, properties)?;
        Self::new(handler_name, config)
    }

    pub fn config(&self) -> &GeoHashConfig {
        &self.config
    }

    pub fn encoder(&self) -> &GeoGridEncoder {
        &self.encoder
    }

    /// Key of a fixed-point coordinate pair.
    pub fn encode(&self, longitude: i64, latitude: i64) -> Result<HashKey> {
        self.encoder.encode(longitude, latitude)
    }

    /// Ranges covering every grid cell the polygon touches.
    ///
    /// A polygon reaching past the padded grid, or not touching it, selects
    /// nothing and yields an empty list.
    pub fn query_polygon(&self, vertices: &[Coord]) -> Result<Vec<HashRange>> {
        let polygon = validate_vertices(vertices)
            .and_then(|()| geometry::polygon_from_vertices(vertices))
            .inspect_err(|e| log::warn!("Rejected query polygon on '{}': {}", self.name, e))?;

        let mut tree = self.encoder.range_tree();
        if !tree.insert_polygon(&polygon)? {
            log::debug!("Query on '{}' selected no cells", self.name);
            return Ok(Vec::new());
        }

        let ranges = tree.ranges();
        log::debug!(
            "Query on '{}': {} vertices, {} tree nodes, {} ranges",
            self.name,
            vertices.len(),
            tree.node_count(),
            ranges.len()
        );
        Ok(ranges)
    }

    /// Parses `"lon,lat;lon,lat;..."` and queries it.
    pub fn query_text(&self, polygon: &str) -> Result<Vec<HashRange>> {
        let vertices = parse_polygon_text(polygon)?;
        self.query_polygon(&vertices)
    }

    /// Queries the exterior ring of a GeoJSON Polygon geometry or Feature.
    #[cfg(feature = "geojson")]
    pub fn query_geojson(&self, geojson: &str) -> Result<Vec<HashRange>> {
        let vertices = crate::compute::geojson::polygon_vertices_from_geojson(geojson)?;
        self.query_polygon(&vertices)
    }

    fn source_value(&self, idx: usize, value: &ColumnValue) -> Result<i64> {
        match value {
            ColumnValue::Long(v) => Ok(*v),
            other => Err(GeoIndexError::InvalidInput(format!(
                "Source column '{}' must be a long value, got {}: {}",
                self.config.source_columns[idx],
                other.type_name(),
                other
            ))),
        }
    }
}

impl IndexHandler for GeoHashIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn source_columns(&self) -> &[String] {
        &self.config.source_columns
    }

    fn generate(&self, sources: &[ColumnValue]) -> Result<String> {
        if sources.len() != 2 {
            return Err(GeoIndexError::InvalidInput(format!(
                "Expected 2 source values for '{}', got {}",
                self.name,
                sources.len()
            )));
        }
        let longitude = self.source_value(0, &sources[0])?;
        let latitude = self.source_value(1, &sources[1])?;
        Ok(self.encode(longitude, latitude)?.to_string())
    }

    fn query(&self, query: &str) -> Result<Vec<HashRange>> {
        self.query_text(query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::RangeSet;
    use crate::compute::encoder::cell_degrees;
    use geo::coord;

    fn beijing() -> GeoHashIndex {
        let config = GeoHashConfig::new(
            39.832277,
            (115.811865, 116.782233),
            (39.832277, 40.225281),
            50.0,
            1_000_000,
        );
        GeoHashIndex::new("mygeohash", config).unwrap()
    }

    // 4x4 grid of 100m cells at the equator.
    fn small() -> (GeoHashIndex, f64) {
        let (_, d) = cell_degrees(100.0, 0.0);
        let config = GeoHashConfig::new(0.0, (0.0, 3.5 * d), (0.0, 3.5 * d), 100.0, 10_000_000);
        (GeoHashIndex::new("small", config).unwrap(), d)
    }

    #[test]
    fn test_generate() {
        let index = beijing();
        let key = index
            .generate(&[ColumnValue::Long(116_285_807), ColumnValue::Long(40_084_087)])
            .unwrap();
        assert_eq!(
            key,
            index.encode(116_285_807, 40_084_087).unwrap().to_string()
        );
    }

    #[test]
    fn test_generate_rejects_bad_sources() {
        let index = beijing();
        assert!(index.generate(&[ColumnValue::Long(1)]).is_err());
        assert!(
            index
                .generate(&[ColumnValue::Long(1), ColumnValue::Long(2), ColumnValue::Long(3)])
                .is_err()
        );

        let err = index
            .generate(&[ColumnValue::Long(116_285_807), ColumnValue::Double(40.08)])
            .unwrap_err();
        assert!(err.to_string().contains("latitude"), "{}", err);
        assert!(
            index
                .generate(&[ColumnValue::Null, ColumnValue::Long(40_084_087)])
                .is_err()
        );
    }

    #[test]
    fn test_generate_before_origin() {
        let index = beijing();
        assert!(matches!(
            index.generate(&[ColumnValue::Long(115_000_000), ColumnValue::Long(40_000_000)]),
            Err(GeoIndexError::OutOfDomain { .. })
        ));
    }

    #[test]
    fn test_query_whole_grid() {
        let (index, _) = small();
        let bounds = index.encoder().padded_bounds();
        let (min, max) = (bounds.min(), bounds.max());
        let ranges = index
            .query_polygon(&[
                coord! { x: min.x, y: min.y },
                coord! { x: max.x, y: min.y },
                coord! { x: max.x, y: max.y },
                coord! { x: min.x, y: max.y },
            ])
            .unwrap();
        assert_eq!(ranges, vec![HashRange::new(0, 15)]);
    }

    #[test]
    fn test_query_cell_contains_encoded_point() {
        let (index, d) = small();
        let ratio = 10_000_000.0;
        // centre of row 2, column 1
        let (lon, lat) = (2.5 * d, 1.5 * d);
        let key = index
            .encode((lon * ratio).round() as i64, (lat * ratio).round() as i64)
            .unwrap();
        assert_eq!(key, 9);

        let eps = d * 0.1;
        let ranges = index
            .query_polygon(&[
                coord! { x: lon - eps, y: lat - eps },
                coord! { x: lon + eps, y: lat - eps },
                coord! { x: lon + eps, y: lat + eps },
                coord! { x: lon - eps, y: lat + eps },
            ])
            .unwrap();
        assert_eq!(ranges, vec![HashRange::single(9)]);
    }

    #[test]
    fn test_query_outside_grid() {
        let index = beijing();
        let ranges = index
            .query_text("10.0,10.0;10.1,10.0;10.1,10.1;10.0,10.1")
            .unwrap();
        assert!(ranges.is_empty());
    }

    #[test]
    fn test_query_text_errors() {
        let index = beijing();
        assert!(index.query_text("116.3,40.0;116.4,40.0").is_err());
        assert!(index.query_text("116.3,40.0;116.4;116.4,40.1").is_err());
        assert!(index.query_text("116.3,40.0;116.4,forty;116.4,40.1").is_err());
    }

    #[test]
    fn test_query_repeated_vertices() {
        let index = beijing();
        for text in [
            "116.3,40.0;116.3,40.0;116.3,40.0",
            "116.3,40.0;116.4,40.0;116.3,40.0;116.4,40.0",
        ] {
            let err = index.query_text(text).unwrap_err();
            assert!(matches!(err, GeoIndexError::InvalidInput(_)), "{}", err);
            assert!(err.to_string().contains("distinct"), "{}", err);
        }
    }

    #[test]
    fn test_query_keys_inside_ranges() {
        let index = beijing();
        let ranges = RangeSet::new(
            index
                .query("116.20,39.95;116.40,39.95;116.40,40.10;116.20,40.10")
                .unwrap(),
        );
        assert!(!ranges.is_empty());

        for (lon, lat) in [(116.25, 40.0), (116.3, 39.96), (116.39, 40.09)] {
            let key = index.encoder().encode_degrees(lon, lat).unwrap();
            assert!(ranges.contains(key), "({}, {}) key {}", lon, lat, key);
        }
    }

    #[cfg(feature = "geojson")]
    #[test]
    fn test_query_geojson_matches_text() {
        let index = beijing();
        let text = index
            .query_text("116.20,39.95;116.40,39.95;116.40,40.10;116.20,40.10")
            .unwrap();
        let json = index
            .query_geojson(
                r#"{"type":"Polygon","coordinates":[[[116.20,39.95],[116.40,39.95],[116.40,40.10],[116.20,40.10],[116.20,39.95]]]}"#,
            )
            .unwrap();
        assert_eq!(text, json);
    }
}
