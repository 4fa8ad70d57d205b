//! Configuration for the geohash index handler.
//!
//! A handler is declared through a flat string property map owned by the
//! surrounding table definition:
//!
//! ```text
//! index_handler                              = mygeohash
//! index_handler.mygeohash.type               = geohash
//! index_handler.mygeohash.sourcecolumns      = longitude,latitude
//! index_handler.mygeohash.sourcecolumntypes  = bigint,bigint
//! index_handler.mygeohash.originlatitude     = 39.832277
//! index_handler.mygeohash.minlongitude       = 115.811865
//! index_handler.mygeohash.maxlongitude       = 116.782233
//! index_handler.mygeohash.minlatitude        = 39.832277
//! index_handler.mygeohash.maxlatitude        = 40.225281
//! index_handler.mygeohash.gridsize           = 50
//! index_handler.mygeohash.conversionratio    = 1000000
//! ```
//!
//! The same parameters can also be loaded from JSON, or TOML with the `toml`
//! feature.

use crate::error::{GeoIndexError, Result};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Property naming the configured handler(s).
pub const INDEX_HANDLER: &str = "index_handler";

/// Handler type name for the Z-order grid scheme.
pub const GEOHASH: &str = "geohash";

/// Source column type accepted for longitude and latitude.
pub const SOURCE_COLUMN_TYPE: &str = "bigint";

/// Data type of the generated index column.
pub const TARGET_DATA_TYPE: &str = "long";

/// Property suffixes under `index_handler.<name>.`
pub mod keys {
    pub const TYPE: &str = "type";
    pub const SOURCE_COLUMNS: &str = "sourcecolumns";
    pub const SOURCE_COLUMN_TYPES: &str = "sourcecolumntypes";
    pub const DATA_TYPE: &str = "datatype";
    pub const ORIGIN_LATITUDE: &str = "originlatitude";
    pub const MIN_LONGITUDE: &str = "minlongitude";
    pub const MAX_LONGITUDE: &str = "maxlongitude";
    pub const MIN_LATITUDE: &str = "minlatitude";
    pub const MAX_LATITUDE: &str = "maxlatitude";
    pub const GRID_SIZE: &str = "gridsize";
    pub const CONVERSION_RATIO: &str = "conversionratio";
}

/// Parameters of a geohash index handler.
///
/// # Example
///
/// ```rust
/// use geoindex::GeoHashConfig;
///
/// let json = r#"{
///     "origin_latitude": 39.832277,
///     "min_longitude": 115.811865,
///     "max_longitude": 116.782233,
///     "min_latitude": 39.832277,
///     "max_latitude": 40.225281,
///     "grid_size": 50.0,
///     "conversion_ratio": 1000000
/// }"#;
/// let config = GeoHashConfig::from_json(json).unwrap();
/// assert_eq!(config.source_columns, vec!["longitude", "latitude"]);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeoHashConfig {
    /// Latitude (degrees) whose cosine scales the longitude cell width.
    pub origin_latitude: f64,

    pub min_longitude: f64,
    pub max_longitude: f64,
    pub min_latitude: f64,
    pub max_latitude: f64,

    /// Cell edge length in meters.
    pub grid_size: f64,

    /// Scale from degrees to the fixed-point integers stored in the source columns.
    pub conversion_ratio: i64,

    #[serde(default = "GeoHashConfig::default_source_columns")]
    pub source_columns: Vec<String>,

    #[serde(default = "GeoHashConfig::default_source_column_types")]
    pub source_column_types: Vec<String>,

    #[serde(default = "GeoHashConfig::default_data_type")]
    pub data_type: String,
}

impl GeoHashConfig {
    fn default_source_columns() -> Vec<String> {
        vec!["longitude".to_string(), "latitude".to_string()]
    }

    fn default_source_column_types() -> Vec<String> {
        vec![SOURCE_COLUMN_TYPE.to_string(), SOURCE_COLUMN_TYPE.to_string()]
    }

    fn default_data_type() -> String {
        TARGET_DATA_TYPE.to_string()
    }

    /// Creates a config with default column metadata. Call [`validate`](Self::validate)
    /// or pass it to [`GeoGridEncoder::from_config`](crate::GeoGridEncoder::from_config)
    /// before use.
    pub fn new(
        origin_latitude: f64,
        (min_longitude, max_longitude): (f64, f64),
        (min_latitude, max_latitude): (f64, f64),
        grid_size: f64,
        conversion_ratio: i64,
    ) -> Self {
        Self {
            origin_latitude,
            min_longitude,
            max_longitude,
            min_latitude,
            max_latitude,
            grid_size,
            conversion_ratio,
            source_columns: Self::default_source_columns(),
            source_column_types: Self::default_source_column_types(),
            data_type: Self::default_data_type(),
        }
    }

    pub fn with_source_columns(mut self, longitude: &str, latitude: &str) -> Self {
        self.source_columns = vec![longitude.to_string(), latitude.to_string()];
        self
    }

    /// Reads the handler named `handler_name` out of a table property map.
    ///
    /// Property names after the `index_handler.<name>.` prefix are matched
    /// case-insensitively.
    pub fn from_properties(
        handler_name: &str,
        properties: &HashMap<String, String>,
    ) -> Result<Self> {
        let declared = properties
            .get(INDEX_HANDLER)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                GeoIndexError::Config(format!("{} property is invalid.", INDEX_HANDLER))
            })?;

        let wanted = handler_name.to_lowercase();
        if !declared
            .split(',')
            .any(|name| name.trim().to_lowercase() == wanted)
        {
            return Err(GeoIndexError::Config(format!(
                "{} property is invalid. {} is not present.",
                INDEX_HANDLER, handler_name
            )));
        }

        let props = HandlerProperties::new(handler_name, properties);

        let handler_type = props.required(keys::TYPE)?;
        if !handler_type.eq_ignore_ascii_case(GEOHASH) {
            return Err(GeoIndexError::Config(format!(
                "{} property must be {} for this handler, got: {}",
                props.key(keys::TYPE),
                GEOHASH,
                handler_type
            )));
        }

        let source_columns = split_list(props.required(keys::SOURCE_COLUMNS)?);
        let source_column_types = split_list(props.required(keys::SOURCE_COLUMN_TYPES)?);
        let data_type = props
            .optional(keys::DATA_TYPE)
            .map(str::to_string)
            .unwrap_or_else(Self::default_data_type);

        let config = Self {
            origin_latitude: props.number(keys::ORIGIN_LATITUDE)?,
            min_longitude: props.number(keys::MIN_LONGITUDE)?,
            max_longitude: props.number(keys::MAX_LONGITUDE)?,
            min_latitude: props.number(keys::MIN_LATITUDE)?,
            max_latitude: props.number(keys::MAX_LATITUDE)?,
            grid_size: props.number(keys::GRID_SIZE)?,
            conversion_ratio: props.integer(keys::CONVERSION_RATIO)?,
            source_columns,
            source_column_types,
            data_type,
        };

        config.validate()?;
        Ok(config)
    }

    /// Checks column metadata and numeric parameters.
    pub fn validate(&self) -> Result<()> {
        if self.source_columns.len() != 2 {
            return Err(GeoIndexError::Config(format!(
                "{} must name exactly 2 columns, got {}",
                keys::SOURCE_COLUMNS,
                self.source_columns.len()
            )));
        }

        if self.source_column_types.len() != 2 {
            return Err(GeoIndexError::Config(format!(
                "{} must list exactly 2 types, got {}",
                keys::SOURCE_COLUMN_TYPES,
                self.source_column_types.len()
            )));
        }

        if let Some(bad) = self
            .source_column_types
            .iter()
            .find(|t| !t.eq_ignore_ascii_case(SOURCE_COLUMN_TYPE))
        {
            return Err(GeoIndexError::Config(format!(
                "source column types must be {}, got: {}",
                SOURCE_COLUMN_TYPE, bad
            )));
        }

        if !self.data_type.eq_ignore_ascii_case(TARGET_DATA_TYPE) {
            return Err(GeoIndexError::Config(format!(
                "{} must be {}, got: {}",
                keys::DATA_TYPE,
                TARGET_DATA_TYPE,
                self.data_type
            )));
        }

        for (name, value) in [
            (keys::ORIGIN_LATITUDE, self.origin_latitude),
            (keys::MIN_LONGITUDE, self.min_longitude),
            (keys::MAX_LONGITUDE, self.max_longitude),
            (keys::MIN_LATITUDE, self.min_latitude),
            (keys::MAX_LATITUDE, self.max_latitude),
            (keys::GRID_SIZE, self.grid_size),
        ] {
            if !value.is_finite() {
                return Err(GeoIndexError::Config(format!(
                    "{} must be finite, got: {}",
                    name, value
                )));
            }
        }

        if self.origin_latitude <= -90.0 || self.origin_latitude >= 90.0 {
            return Err(GeoIndexError::Config(format!(
                "{} must be inside (-90, 90), got: {}",
                keys::ORIGIN_LATITUDE,
                self.origin_latitude
            )));
        }

        if self.grid_size <= 0.0 {
            return Err(GeoIndexError::Config(format!(
                "{} must be greater than zero, got: {}",
                keys::GRID_SIZE,
                self.grid_size
            )));
        }

        if self.conversion_ratio <= 0 {
            return Err(GeoIndexError::Config(format!(
                "{} must be greater than zero, got: {}",
                keys::CONVERSION_RATIO,
                self.conversion_ratio
            )));
        }

        if self.min_longitude >= self.max_longitude {
            return Err(GeoIndexError::Config(format!(
                "min longitude ({}) must be < max longitude ({})",
                self.min_longitude, self.max_longitude
            )));
        }

        if self.min_latitude >= self.max_latitude {
            return Err(GeoIndexError::Config(format!(
                "min latitude ({}) must be < max latitude ({})",
                self.min_latitude, self.max_latitude
            )));
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: GeoHashConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: GeoHashConfig = toml::from_str(toml_str)
            .map_err(|e| GeoIndexError::Serialization(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| GeoIndexError::Serialization(e.to_string()))
    }
}

/// Case-insensitive view of the `index_handler.<name>.*` properties.
struct HandlerProperties {
    prefix: String,
    values: FxHashMap<String, String>,
}

impl HandlerProperties {
    fn new(handler_name: &str, properties: &HashMap<String, String>) -> Self {
        let prefix = format!("{}.{}.", INDEX_HANDLER, handler_name).to_lowercase();
        let values = properties
            .iter()
            .filter_map(|(k, v)| {
                let k = k.to_lowercase();
                k.strip_prefix(&prefix)
                    .map(|suffix| (suffix.to_string(), v.trim().to_string()))
            })
            .collect();
        Self { prefix, values }
    }

    fn key(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }

    fn optional(&self, suffix: &str) -> Option<&str> {
        self.values
            .get(suffix)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    fn required(&self, suffix: &str) -> Result<&str> {
        self.optional(suffix).ok_or_else(|| {
            GeoIndexError::Config(format!("{} property must be specified.", self.key(suffix)))
        })
    }

    fn number(&self, suffix: &str) -> Result<f64> {
        let raw = self.required(suffix)?;
        raw.parse::<f64>().map_err(|_| {
            GeoIndexError::Config(format!(
                "{} property must be numeric, got: {}",
                self.key(suffix),
                raw
            ))
        })
    }

    fn integer(&self, suffix: &str) -> Result<i64> {
        let raw = self.required(suffix)?;
        raw.parse::<i64>().map_err(|_| {
            GeoIndexError::Config(format!(
                "{} property must be an integer, got: {}",
                self.key(suffix),
                raw
            ))
        })
    }
}

fn split_list(raw: &str) -> Vec<String> {
    raw.split(',').map(|s| s.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn properties() -> HashMap<String, String> {
        [
            ("index_handler", "mygeohash"),
            ("index_handler.mygeohash.type", "geohash"),
            ("index_handler.mygeohash.sourcecolumns", "longitude, latitude"),
            ("index_handler.mygeohash.sourcecolumntypes", "bigint,bigint"),
            ("index_handler.mygeohash.originlatitude", "39.832277"),
            ("index_handler.mygeohash.minlongitude", "115.811865"),
            ("index_handler.mygeohash.maxlongitude", "116.782233"),
            ("index_handler.mygeohash.minlatitude", "39.832277"),
            ("index_handler.mygeohash.maxlatitude", "40.225281"),
            ("index_handler.mygeohash.gridsize", "50"),
            ("index_handler.mygeohash.conversionratio", "1000000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_from_properties() {
        let config = GeoHashConfig::from_properties("mygeohash", &properties()).unwrap();
        assert_eq!(config.source_columns, vec!["longitude", "latitude"]);
        assert_eq!(config.grid_size, 50.0);
        assert_eq!(config.conversion_ratio, 1_000_000);
        assert_eq!(config.data_type, "long");
    }

    #[test]
    fn test_property_keys_case_insensitive() {
        let props: HashMap<String, String> = properties()
            .into_iter()
            .map(|(k, v)| (k.replace("gridsize", "gridSize"), v))
            .collect();
        assert!(GeoHashConfig::from_properties("MyGeoHash", &props).is_ok());
    }

    #[test]
    fn test_missing_handler_declaration() {
        let mut props = properties();
        props.remove(INDEX_HANDLER);
        assert!(matches!(
            GeoHashConfig::from_properties("mygeohash", &props),
            Err(GeoIndexError::Config(_))
        ));

        let props = properties();
        assert!(GeoHashConfig::from_properties("other", &props).is_err());
    }

    #[test]
    fn test_missing_numeric_property() {
        for key in [
            keys::ORIGIN_LATITUDE,
            keys::MIN_LONGITUDE,
            keys::MAX_LATITUDE,
            keys::GRID_SIZE,
            keys::CONVERSION_RATIO,
        ] {
            let mut props = properties();
            props.remove(&format!("index_handler.mygeohash.{}", key));
            let err = GeoHashConfig::from_properties("mygeohash", &props).unwrap_err();
            assert!(err.to_string().contains(key), "{}", err);
        }
    }

    #[test]
    fn test_non_numeric_property() {
        let mut props = properties();
        props.insert(
            "index_handler.mygeohash.gridsize".to_string(),
            "fifty".to_string(),
        );
        assert!(GeoHashConfig::from_properties("mygeohash", &props).is_err());
    }

    #[test]
    fn test_wrong_column_metadata() {
        let mut props = properties();
        props.insert(
            "index_handler.mygeohash.sourcecolumns".to_string(),
            "longitude".to_string(),
        );
        assert!(GeoHashConfig::from_properties("mygeohash", &props).is_err());

        let mut props = properties();
        props.insert(
            "index_handler.mygeohash.sourcecolumntypes".to_string(),
            "int,bigint".to_string(),
        );
        assert!(GeoHashConfig::from_properties("mygeohash", &props).is_err());

        let mut props = properties();
        props.insert(
            "index_handler.mygeohash.datatype".to_string(),
            "string".to_string(),
        );
        assert!(GeoHashConfig::from_properties("mygeohash", &props).is_err());

        let mut props = properties();
        props.insert("index_handler.mygeohash.type".to_string(), "s2".to_string());
        assert!(GeoHashConfig::from_properties("mygeohash", &props).is_err());
    }

    #[test]
    fn test_zero_grid_size_and_ratio() {
        let config = GeoHashConfig::new(0.0, (0.0, 1.0), (0.0, 1.0), 0.0, 100);
        assert!(config.validate().is_err());

        let config = GeoHashConfig::new(0.0, (0.0, 1.0), (0.0, 1.0), 50.0, 0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_degenerate_box() {
        let config = GeoHashConfig::new(0.0, (1.0, 1.0), (0.0, 1.0), 50.0, 100);
        assert!(config.validate().is_err());

        let config = GeoHashConfig::new(0.0, (0.0, 1.0), (2.0, 1.0), 50.0, 100);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let config = GeoHashConfig::new(10.0, (0.0, 1.0), (10.0, 11.0), 100.0, 1_000_000)
            .with_source_columns("lon", "lat");
        let json = config.to_json().unwrap();
        let parsed = GeoHashConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_json_rejects_unknown_fields() {
        let json = r#"{
            "origin_latitude": 0.0,
            "min_longitude": 0.0,
            "max_longitude": 1.0,
            "min_latitude": 0.0,
            "max_latitude": 1.0,
            "grid_size": 50.0,
            "conversion_ratio": 1000,
            "precision": 7
        }"#;
        assert!(matches!(
            GeoHashConfig::from_json(json),
            Err(GeoIndexError::Serialization(_))
        ));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_round_trip() {
        let config = GeoHashConfig::new(10.0, (0.0, 1.0), (10.0, 11.0), 100.0, 1_000_000);
        let text = config.to_toml().unwrap();
        assert_eq!(GeoHashConfig::from_toml(&text).unwrap(), config);
    }
}
