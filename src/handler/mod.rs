//! Pluggable index handlers.
//!
//! A handler turns the source columns of a row into one generated index
//! value, and turns a query string into the key ranges a scan must read.
//! Handlers are created by type name through a process-wide registry so new
//! encoding schemes can be added without touching callers.
//!
//! ```rust
//! use geoindex::handler::{ColumnValue, create_handler};
//! use std::collections::HashMap;
//!
//! let props: HashMap<String, String> = [
//!     ("index_handler", "mygeohash"),
//!     ("index_handler.mygeohash.type", "geohash"),
//!     ("index_handler.mygeohash.sourcecolumns", "longitude,latitude"),
//!     ("index_handler.mygeohash.sourcecolumntypes", "bigint,bigint"),
//!     ("index_handler.mygeohash.originlatitude", "39.832277"),
//!     ("index_handler.mygeohash.minlongitude", "115.811865"),
//!     ("index_handler.mygeohash.maxlongitude", "116.782233"),
//!     ("index_handler.mygeohash.minlatitude", "39.832277"),
//!     ("index_handler.mygeohash.maxlatitude", "40.225281"),
//!     ("index_handler.mygeohash.gridsize", "50"),
//!     ("index_handler.mygeohash.conversionratio", "1000000"),
//! ]
//! .into_iter()
//! .map(|(k, v)| (k.to_string(), v.to_string()))
//! .collect();
//!
//! let handler = create_handler("mygeohash", &props)?;
//! let key = handler.generate(&[ColumnValue::Long(116_285_807), ColumnValue::Long(40_084_087)])?;
//! assert!(key.parse::<u64>().is_ok());
//!
//! let ranges = handler.query("116.28,40.08;116.29,40.08;116.29,40.09;116.28,40.09")?;
//! assert!(!ranges.is_empty());
//! # Ok::<(), geoindex::GeoIndexError>(())
//! ```

mod geohash;

pub use geohash::GeoHashIndex;

use crate::compute::HashRange;
use crate::config::{self, GEOHASH, INDEX_HANDLER};
use crate::error::{GeoIndexError, Result};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::collections::HashMap;
use std::fmt;

/// A single source column value handed over by the loading pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Long(i64),
    Int(i32),
    Double(f64),
    Text(String),
    Null,
}

impl ColumnValue {
    pub fn type_name(&self) -> &'static str {
        match self {
            ColumnValue::Long(_) => "long",
            ColumnValue::Int(_) => "int",
            ColumnValue::Double(_) => "double",
            ColumnValue::Text(_) => "string",
            ColumnValue::Null => "null",
        }
    }
}

impl fmt::Display for ColumnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnValue::Long(v) => write!(f, "{}", v),
            ColumnValue::Int(v) => write!(f, "{}", v),
            ColumnValue::Double(v) => write!(f, "{}", v),
            ColumnValue::Text(v) => write!(f, "{}", v),
            ColumnValue::Null => write!(f, "null"),
        }
    }
}

impl From<i64> for ColumnValue {
    fn from(value: i64) -> Self {
        ColumnValue::Long(value)
    }
}

/// Capability every index scheme provides.
///
/// Implementations are configured once and then shared read-only, so both
/// methods take `&self` and may run concurrently.
pub trait IndexHandler: Send + Sync + fmt::Debug {
    /// Name of the generated column.
    fn name(&self) -> &str;

    /// Source column names, in the order `generate` expects values.
    fn source_columns(&self) -> &[String];

    /// Generated column value for one row.
    fn generate(&self, sources: &[ColumnValue]) -> Result<String>;

    /// Sorted, merged key ranges a scan must read to answer `query`.
    fn query(&self, query: &str) -> Result<Vec<HashRange>>;
}

/// Builds a handler from its column name and the table property map.
pub type HandlerFactory = fn(&str, &HashMap<String, String>) -> Result<Box<dyn IndexHandler>>;

static REGISTRY: Lazy<RwLock<FxHashMap<String, HandlerFactory>>> = Lazy::new(|| {
    let mut factories: FxHashMap<String, HandlerFactory> = FxHashMap::default();
    factories.insert(GEOHASH.to_string(), geohash_factory);
    RwLock::new(factories)
});

fn geohash_factory(
    name: &str,
    properties: &HashMap<String, String>,
) -> Result<Box<dyn IndexHandler>> {
    Ok(Box::new(GeoHashIndex::from_properties(name, properties)?))
}

/// Registers a factory under `type_name` (case-insensitive), returning the
/// factory it replaced.
pub fn register_handler(type_name: &str, factory: HandlerFactory) -> Option<HandlerFactory> {
    let type_name = type_name.to_lowercase();
    log::debug!("Registering index handler type '{}'", type_name);
    REGISTRY.write().insert(type_name, factory)
}

/// Registered type names, sorted.
pub fn registered_handlers() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY.read().keys().cloned().collect();
    names.sort();
    names
}

/// Instantiates the handler declared as `handler_name` in `properties`.
///
/// The handler type is read from `index_handler.<handler_name>.type`.
pub fn create_handler(
    handler_name: &str,
    properties: &HashMap<String, String>,
) -> Result<Box<dyn IndexHandler>> {
    let type_key = format!("{}.{}.{}", INDEX_HANDLER, handler_name, config::keys::TYPE);
    let handler_type = properties
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(&type_key))
        .map(|(_, v)| v.trim().to_lowercase())
        .ok_or_else(|| {
            GeoIndexError::Config(format!("{} property must be specified.", type_key))
        })?;

    let factory = REGISTRY
        .read()
        .get(&handler_type)
        .copied()
        .ok_or_else(|| GeoIndexError::UnknownHandler(handler_type.clone()))?;

    factory(handler_name, properties)
}

/// Instantiates every handler listed in the `index_handler` property.
pub fn create_handlers(
    properties: &HashMap<String, String>,
) -> Result<Vec<Box<dyn IndexHandler>>> {
    let declared = properties.get(INDEX_HANDLER).ok_or_else(|| {
        GeoIndexError::Config(format!("{} property is invalid.", INDEX_HANDLER))
    })?;

    declared
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| create_handler(name, properties))
        .collect()
}
