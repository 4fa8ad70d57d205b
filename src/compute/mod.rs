//! Grid encoding and query decomposition.
//!
//! This module holds the algorithms and has no knowledge of handler
//! properties or row formats:
//! - Morton interleaving of grid coordinates
//! - The fixed-point coordinate-to-grid encoder
//! - Quad-tree decomposition of a polygon into key ranges
//! - Sorting, merging, and searching of key ranges

pub mod encoder;
#[cfg(feature = "geojson")]
pub mod geojson;
pub mod geometry;
pub mod morton;
pub mod quadtree;
pub mod ranges;
pub mod validation;

pub use encoder::{GeoGridEncoder, GridCoordinate, GridParameters};
pub use morton::HashKey;
pub use quadtree::{SpatialRangeTree, Status};
pub use ranges::{HashRange, RangeMatch, RangeSet};
