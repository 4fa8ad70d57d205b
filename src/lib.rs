//! Z-order grid index for longitude/latitude columns.
//!
//! Points are encoded into a single integer key at load time, and query
//! polygons are decomposed into the minimal list of key ranges a scan must
//! read.
//!
//! ```rust
//! use geoindex::{GeoHashConfig, GeoHashIndex, IndexHandler, RangeSet};
//!
//! let config = GeoHashConfig::new(
//!     39.832277,
//!     (115.811865, 116.782233),
//!     (39.832277, 40.225281),
//!     50.0,
//!     1_000_000,
//! );
//! let index = GeoHashIndex::new("mygeohash", config)?;
//!
//! let key = index.encode(116_400_000, 39_950_000)?;
//! let ranges = index.query("116.35,39.90;116.45,39.90;116.45,40.00;116.35,40.00")?;
//! assert!(RangeSet::new(ranges).contains(key));
//! # Ok::<(), geoindex::GeoIndexError>(())
//! ```

pub mod compute;
pub mod config;
pub mod error;
pub mod handler;

pub use error::{GeoIndexError, Result};

pub use config::GeoHashConfig;

pub use compute::{
    GeoGridEncoder, GridCoordinate, GridParameters, HashKey, HashRange, RangeMatch, RangeSet,
    SpatialRangeTree, Status,
};

pub use handler::{
    ColumnValue, GeoHashIndex, HandlerFactory, IndexHandler, create_handler, create_handlers,
    register_handler, registered_handlers,
};

pub use geo::{Coord, Polygon, Rect};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{GeoHashConfig, GeoIndexError, Result};

    pub use crate::{GeoGridEncoder, HashRange, RangeSet, SpatialRangeTree};

    pub use crate::{ColumnValue, GeoHashIndex, IndexHandler, create_handler};

    pub use geo::{Coord, Polygon, coord};
}
