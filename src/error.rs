//! Error types for grid encoding and range queries.

use thiserror::Error;

/// Errors raised while configuring an index handler, encoding a point, or
/// decomposing a query polygon.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoIndexError {
    /// Missing or invalid handler property. Raised at configuration time only.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input to a single encode or query call.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Division by a zero or non-finite grid delta.
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// The point lies before the grid origin on at least one axis.
    #[error("Point outside grid domain: row={row}, column={column}")]
    OutOfDomain { row: i64, column: i64 },

    /// No handler is registered under the requested type name.
    #[error("Unknown index handler type: {0}")]
    UnknownHandler(String),

    /// JSON, TOML, or GeoJSON (de)serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for GeoIndexError {
    fn from(err: serde_json::Error) -> Self {
        GeoIndexError::Serialization(err.to_string())
    }
}

/// Result type for index operations.
pub type Result<T> = std::result::Result<T, GeoIndexError>;
