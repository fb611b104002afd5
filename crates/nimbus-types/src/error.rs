//! Error types for data parsing in nimbus-types.

use thiserror::Error;

/// Errors that can occur when parsing Nimbus data.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new error variants
/// in future versions without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Generic malformed input.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Weather condition label that matches no known condition.
    #[error("Unknown weather condition: {0}")]
    UnknownCondition(String),

    /// History period name that is not day, week or month.
    #[error("Unknown history period: {0} (expected day, week or month)")]
    UnknownPeriod(String),

    /// View name that is not routable.
    #[error("Unknown view: {0}")]
    UnknownView(String),

    /// Capability name that is not location, camera or notification.
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    /// Coordinate outside the valid WGS84 range.
    #[error("Invalid coordinate: latitude {latitude}, longitude {longitude}")]
    InvalidCoordinate { latitude: f64, longitude: f64 },
}

/// Result type alias using nimbus-types' ParseError type.
pub type ParseResult<T> = std::result::Result<T, ParseError>;
