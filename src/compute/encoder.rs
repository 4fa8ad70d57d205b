//! Coordinate-to-grid encoder.
//!
//! The configured bounding box is padded up to a square `2^cut_level` grid
//! of cells whose edge is `grid_size` meters on a spherical earth. Rows
//! advance with longitude from `min_longitude`, columns advance with latitude
//! from `min_latitude`. The quad-tree uses the same convention when it splits
//! cells, so keys produced here fall inside the ranges produced there.

use super::morton::{self, HashKey};
use super::quadtree::SpatialRangeTree;
use crate::config::GeoHashConfig;
use crate::error::{GeoIndexError, Result};
use geo::{Rect, coord};

/// Earth radius in meters used for the degree/meter conversion.
pub const EARTH_RADIUS: f64 = 6_371_004.0;

/// Deepest subdivision accepted at configuration time.
pub const MAX_CUT_LEVEL: u32 = 26;

/// Degrees spanned by one cell of `grid_size` meters, as `(delta_x, delta_y)`.
///
/// `delta_x` is widened by `1 / cos(origin_latitude)` so cells stay square
/// on the ground near the origin.
pub fn cell_degrees(grid_size: f64, origin_latitude: f64) -> (f64, f64) {
    let cos = origin_latitude.to_radians().cos();
    let delta_y = grid_size * 360.0 / (2.0 * std::f64::consts::PI * EARTH_RADIUS);
    (delta_y / cos, delta_y)
}

/// Signed grid indices of a point before interleaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCoordinate {
    pub row: i64,
    pub column: i64,
}

/// Bounds and depth a [`SpatialRangeTree`] needs to match an encoder.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridParameters {
    pub min_longitude: f64,
    pub min_latitude: f64,
    /// Padded maximum longitude.
    pub max_longitude: f64,
    /// Padded maximum latitude.
    pub max_latitude: f64,
    pub cut_level: u32,
}

/// Derived coordinate system. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct EncoderConfig {
    pub origin_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub grid_size: f64,
    pub conversion_ratio: i64,

    pub cos_origin: f64,
    pub delta_x: f64,
    pub delta_y: f64,
    pub delta_x_by_ratio: f64,
    pub delta_y_by_ratio: f64,
    pub lon0_by_ratio: f64,
    pub lat0_by_ratio: f64,
    pub cut_level: u32,
    pub calc_max_longitude: f64,
    pub calc_max_latitude: f64,
}

impl EncoderConfig {
    fn derive(config: &GeoHashConfig) -> Result<Self> {
        config.validate()?;

        let (delta_x, delta_y) = cell_degrees(config.grid_size, config.origin_latitude);
        if delta_x <= 0.0 || delta_y <= 0.0 || !delta_x.is_finite() || !delta_y.is_finite() {
            return Err(GeoIndexError::Config(format!(
                "grid deltas must be positive and finite, got: ({}, {})",
                delta_x, delta_y
            )));
        }

        let xn = ((config.max_longitude - config.min_longitude) / delta_x).log2();
        let yn = ((config.max_latitude - config.min_latitude) / delta_y).log2();
        let levels = xn.max(yn).ceil();
        if levels > MAX_CUT_LEVEL as f64 {
            return Err(GeoIndexError::Config(format!(
                "bounding box spans 2^{} cells per axis at grid size {}m; at most 2^{} is supported",
                levels, config.grid_size, MAX_CUT_LEVEL
            )));
        }
        let cut_level = levels.max(0.0) as u32;

        let side = (1u64 << cut_level) as f64;
        let ratio = config.conversion_ratio as f64;

        Ok(Self {
            origin_latitude: config.origin_latitude,
            min_longitude: config.min_longitude,
            max_longitude: config.max_longitude,
            min_latitude: config.min_latitude,
            max_latitude: config.max_latitude,
            grid_size: config.grid_size,
            conversion_ratio: config.conversion_ratio,
            cos_origin: config.origin_latitude.to_radians().cos(),
            delta_x,
            delta_y,
            delta_x_by_ratio: delta_x * ratio,
            delta_y_by_ratio: delta_y * ratio,
            lon0_by_ratio: config.min_longitude * ratio,
            lat0_by_ratio: config.min_latitude * ratio,
            cut_level,
            calc_max_longitude: config.min_longitude + side * delta_x,
            calc_max_latitude: config.min_latitude + side * delta_y,
        })
    }
}

/// Encodes fixed-point (longitude, latitude) pairs into Z-order grid keys.
///
/// The encoder is plain data, so it can be shared across threads without
/// locking.
///
/// # Examples
///
/// ```rust
/// use geoindex::GeoGridEncoder;
///
/// let encoder = GeoGridEncoder::configure(
///     39.832277,
///     (115.811865, 116.782233),
///     (39.832277, 40.225281),
///     50.0,
///     1_000_000,
/// )?;
///
/// // Source columns hold degrees * conversion ratio.
/// let key = encoder.encode(116_000_000, 40_000_000)?;
/// assert!(key < 1u64 << (2 * encoder.cut_level()));
/// # Ok::<(), geoindex::GeoIndexError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GeoGridEncoder {
    config: EncoderConfig,
}

impl GeoGridEncoder {
    /// Validates the parameters and derives the grid.
    pub fn configure(
        origin_latitude: f64,
        longitude_range: (f64, f64),
        latitude_range: (f64, f64),
        grid_size: f64,
        conversion_ratio: i64,
    ) -> Result<Self> {
        let config = GeoHashConfig::new(
            origin_latitude,
            longitude_range,
            latitude_range,
            grid_size,
            conversion_ratio,
        );
        Self::from_config(&config)
    }

    pub fn from_config(config: &GeoHashConfig) -> Result<Self> {
        let config = EncoderConfig::derive(config)?;
        log::debug!(
            "Grid derived: cut_level={}, delta=({}, {}), padded box=({}, {}) -> ({}, {})",
            config.cut_level,
            config.delta_x,
            config.delta_y,
            config.min_longitude,
            config.min_latitude,
            config.calc_max_longitude,
            config.calc_max_latitude
        );
        Ok(Self { config })
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn cut_level(&self) -> u32 {
        self.config.cut_level
    }

    /// Cells per axis.
    pub fn grid_dimension(&self) -> u64 {
        1u64 << self.config.cut_level
    }

    pub fn delta_x(&self) -> f64 {
        self.config.delta_x
    }

    pub fn delta_y(&self) -> f64 {
        self.config.delta_y
    }

    /// Padded bounding box in degrees.
    pub fn padded_bounds(&self) -> Rect {
        Rect::new(
            coord! { x: self.config.min_longitude, y: self.config.min_latitude },
            coord! { x: self.config.calc_max_longitude, y: self.config.calc_max_latitude },
        )
    }

    pub fn grid_parameters(&self) -> GridParameters {
        GridParameters {
            min_longitude: self.config.min_longitude,
            min_latitude: self.config.min_latitude,
            max_longitude: self.config.calc_max_longitude,
            max_latitude: self.config.calc_max_latitude,
            cut_level: self.config.cut_level,
        }
    }

    /// Empty range tree covering this encoder's padded grid.
    pub fn range_tree(&self) -> SpatialRangeTree {
        let params = self.grid_parameters();
        SpatialRangeTree::new(
            params.min_longitude,
            params.min_latitude,
            params.max_longitude,
            params.max_latitude,
            params.cut_level,
        )
    }

    /// Grid row and column of a fixed-point coordinate.
    ///
    /// Indices past the padded edge are returned as is; negative indices mean
    /// the point lies before the grid origin.
    pub fn grid_coordinate(&self, longitude: i64, latitude: i64) -> Result<GridCoordinate> {
        let c = &self.config;
        if c.delta_x_by_ratio == 0.0 || !c.delta_x_by_ratio.is_finite() {
            return Err(GeoIndexError::Arithmetic(format!(
                "longitude delta is {}",
                c.delta_x_by_ratio
            )));
        }
        if c.delta_y_by_ratio == 0.0 || !c.delta_y_by_ratio.is_finite() {
            return Err(GeoIndexError::Arithmetic(format!(
                "latitude delta is {}",
                c.delta_y_by_ratio
            )));
        }

        let row = ((longitude as f64 - c.lon0_by_ratio) / c.delta_x_by_ratio).floor();
        let column = ((latitude as f64 - c.lat0_by_ratio) / c.delta_y_by_ratio).floor();
        Ok(GridCoordinate {
            row: row as i64,
            column: column as i64,
        })
    }

    /// Encodes a fixed-point coordinate (degrees scaled by the conversion ratio).
    pub fn encode(&self, longitude: i64, latitude: i64) -> Result<HashKey> {
        let GridCoordinate { row, column } = self.grid_coordinate(longitude, latitude)?;
        if row < 0 || column < 0 {
            return Err(GeoIndexError::OutOfDomain { row, column });
        }
        let limit = 2i64 << self.config.cut_level;
        if row >= limit || column >= limit {
            log::warn!(
                "Point ({}, {}) is at row {} column {}, past {} cells per axis; its key aliases a cell inside the grid",
                longitude,
                latitude,
                row,
                column,
                limit
            );
        }
        Ok(morton::interleave(
            row as u64,
            column as u64,
            self.config.cut_level,
        ))
    }

    /// Scales degrees by the conversion ratio, then encodes.
    pub fn encode_degrees(&self, longitude: f64, latitude: f64) -> Result<HashKey> {
        if !longitude.is_finite() || !latitude.is_finite() {
            return Err(GeoIndexError::InvalidInput(format!(
                "Coordinates must be finite, got: ({}, {})",
                longitude, latitude
            )));
        }
        let ratio = self.config.conversion_ratio as f64;
        self.encode(
            (longitude * ratio).round() as i64,
            (latitude * ratio).round() as i64,
        )
    }

    /// Degree rectangle covered by the cell of `key`.
    pub fn cell_rect(&self, key: HashKey) -> Rect {
        let (row, column) = morton::deinterleave(key, self.config.cut_level);
        let c = &self.config;
        let left = c.min_longitude + row as f64 * c.delta_x;
        let bottom = c.min_latitude + column as f64 * c.delta_y;
        Rect::new(
            coord! { x: left, y: bottom },
            coord! { x: left + c.delta_x, y: bottom + c.delta_y },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Centroid;

    // Equator origin keeps delta_x == delta_y.
    fn small_grid(cells: f64) -> GeoGridEncoder {
        let (_, d) = cell_degrees(100.0, 0.0);
        GeoGridEncoder::configure(0.0, (0.0, cells * d), (0.0, cells * d), 100.0, 10_000_000)
            .unwrap()
    }

    #[test]
    fn test_cell_degrees() {
        let (dx, dy) = cell_degrees(100.0, 0.0);
        assert!((dx - dy).abs() < 1e-15);
        assert!((dy - 100.0 * 360.0 / (2.0 * std::f64::consts::PI * EARTH_RADIUS)).abs() < 1e-15);

        let (dx, dy) = cell_degrees(100.0, 60.0);
        assert!((dx - 2.0 * dy).abs() < 1e-12);
    }

    #[test]
    fn test_cut_level_rounds_up() {
        assert_eq!(small_grid(3.5).cut_level(), 2);
        assert_eq!(small_grid(5.0).cut_level(), 3);
        assert_eq!(small_grid(0.5).cut_level(), 0);
    }

    #[test]
    fn test_cut_level_exact_power_of_two() {
        assert_eq!(small_grid(1.0).cut_level(), 0);
        assert_eq!(small_grid(2.0).cut_level(), 1);
        assert_eq!(small_grid(4.0).cut_level(), 2);
        assert_eq!(small_grid(8.0).cut_level(), 3);
        assert_eq!(small_grid(64.0).cut_level(), 6);

        let encoder = small_grid(4.0);
        assert_eq!(encoder.grid_dimension(), 4);
        let max = encoder.padded_bounds().max();
        assert!((max.x - 4.0 * encoder.delta_x()).abs() < 1e-15);
    }

    #[test]
    fn test_padded_box_contains_user_box() {
        let encoder = GeoGridEncoder::configure(
            39.832277,
            (115.811865, 116.782233),
            (39.832277, 40.225281),
            50.0,
            1_000_000,
        )
        .unwrap();
        let c = encoder.config();
        assert!(c.calc_max_longitude >= c.max_longitude);
        assert!(c.calc_max_latitude >= c.max_latitude);

        let side = encoder.grid_dimension() as f64;
        assert!((c.calc_max_longitude - (c.min_longitude + side * c.delta_x)).abs() < 1e-9);
        assert!((c.calc_max_latitude - (c.min_latitude + side * c.delta_y)).abs() < 1e-9);

        // one level less would not cover the box
        let half = side / 2.0;
        assert!(
            c.min_longitude + half * c.delta_x < c.max_longitude
                || c.min_latitude + half * c.delta_y < c.max_latitude
        );
    }

    #[test]
    fn test_encode_cells() {
        let encoder = small_grid(3.5);
        let d = encoder.delta_y();

        // centre of cell (row, column) in degrees
        let center = |row: f64, column: f64| ((row + 0.5) * d, (column + 0.5) * d);

        let (x, y) = center(0.0, 0.0);
        assert_eq!(encoder.encode_degrees(x, y).unwrap(), 0);

        let (x, y) = center(1.0, 0.0);
        assert_eq!(encoder.encode_degrees(x, y).unwrap(), 2);

        let (x, y) = center(0.0, 1.0);
        assert_eq!(encoder.encode_degrees(x, y).unwrap(), 1);

        let (x, y) = center(3.0, 3.0);
        assert_eq!(encoder.encode_degrees(x, y).unwrap(), 15);
    }

    #[test]
    fn test_encode_fixed_point() {
        let encoder = small_grid(3.5);
        let ratio = encoder.config().conversion_ratio as f64;
        let d = encoder.delta_y();

        let lon = (2.5 * d * ratio) as i64;
        let lat = (1.5 * d * ratio) as i64;
        let coord = encoder.grid_coordinate(lon, lat).unwrap();
        assert_eq!(coord, GridCoordinate { row: 2, column: 1 });
        assert_eq!(
            encoder.encode(lon, lat).unwrap(),
            morton::interleave(2, 1, encoder.cut_level())
        );
    }

    #[test]
    fn test_encode_before_origin() {
        let encoder = small_grid(3.5);
        let d = encoder.delta_y();
        let err = encoder.encode_degrees(-0.5 * d, 0.5 * d).unwrap_err();
        assert_eq!(err, GeoIndexError::OutOfDomain { row: -1, column: 0 });
    }

    #[test]
    fn test_encode_past_padded_edge_is_accepted() {
        let encoder = small_grid(3.5);
        let d = encoder.delta_y();
        let key = encoder.encode_degrees(4.5 * d, 0.5 * d).unwrap();
        assert_eq!(key, morton::interleave(4, 0, encoder.cut_level()));
    }

    #[test]
    fn test_encode_far_past_edge_aliases() {
        // rows of 8 or more on a 4x4 grid drop their high bit
        let encoder = small_grid(3.5);
        let d = encoder.delta_y();
        let far = encoder.encode_degrees(8.5 * d, 0.5 * d).unwrap();
        let origin = encoder.encode_degrees(0.5 * d, 0.5 * d).unwrap();
        assert_eq!(far, origin);

        let near = encoder.encode_degrees(7.5 * d, 0.5 * d).unwrap();
        assert_ne!(near, origin);
    }

    #[test]
    fn test_encode_non_finite() {
        let encoder = small_grid(3.5);
        assert!(matches!(
            encoder.encode_degrees(f64::NAN, 0.0),
            Err(GeoIndexError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_cell_rect_round_trip() {
        let encoder = small_grid(7.0);
        for key in 0..encoder.grid_dimension().pow(2) {
            let center = encoder.cell_rect(key).centroid();
            assert_eq!(encoder.encode_degrees(center.x(), center.y()).unwrap(), key);
        }
    }

    #[test]
    fn test_rejects_impractical_depth() {
        let result = GeoGridEncoder::configure(0.0, (0.0, 90.0), (0.0, 80.0), 0.01, 1_000_000);
        assert!(matches!(result, Err(GeoIndexError::Config(_))));
    }

    #[test]
    fn test_grid_parameters_match_tree() {
        let encoder = small_grid(3.5);
        let params = encoder.grid_parameters();
        assert_eq!(params.cut_level, 2);
        assert_eq!(params.min_longitude, 0.0);
        assert_eq!(params.max_longitude, encoder.config().calc_max_longitude);

        let tree = encoder.range_tree();
        assert_eq!(tree.root().cell().hash_range().end, 15);
    }

    #[test]
    fn test_concurrent_encode() {
        let encoder = small_grid(100.0);
        let d = encoder.delta_y();
        let expected: Vec<u64> = (0..64)
            .map(|i| encoder.encode_degrees((i as f64 + 0.5) * d, 0.5 * d).unwrap())
            .collect();

        std::thread::scope(|scope| {
            for _ in 0..4 {
                scope.spawn(|| {
                    for (i, want) in expected.iter().enumerate() {
                        let got = encoder.encode_degrees((i as f64 + 0.5) * d, 0.5 * d).unwrap();
                        assert_eq!(got, *want);
                    }
                });
            }
        });
    }
}
