//! Error types for nimbus-core.
//!
//! None of these errors is fatal to the application. The components that
//! produce them degrade to a cached value, an empty collection or a status
//! message; the variants exist so callers can decide which.
//!
//! | Error | Surfaced as |
//! |-------|-------------|
//! | [`Error::Http`], [`Error::ProviderStatus`], [`Error::MalformedResponse`] | Cached weather or "unavailable" |
//! | [`Error::PermissionDenied`] | Permission label change |
//! | [`Error::CameraBusy`], [`Error::CameraUnavailable`] | Retryable camera message |
//! | [`Error::Store`] on read | Logged, empty collection |

use std::time::Duration;

use thiserror::Error;

use nimbus_types::{Capability, ParseError};

use crate::camera::FacingMode;

/// Errors raised by Nimbus components.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Transport-level failure talking to the weather provider.
    #[cfg(feature = "http")]
    #[error("Weather request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The provider answered with a non-success status.
    #[error("Weather provider returned HTTP {status}")]
    ProviderStatus { status: u16 },

    /// The provider answered with something that is not a realtime envelope.
    #[error("Malformed weather response: {0}")]
    MalformedResponse(String),

    /// Persistent store failure.
    #[error("Storage error: {0}")]
    Store(#[from] nimbus_store::Error),

    /// Invalid input value.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// JSON (de)serialization failure.
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The camera is held by another stream or application.
    #[error("Camera busy: {0}")]
    CameraBusy(String),

    /// No camera could be opened.
    #[error("Camera unavailable: {0}")]
    CameraUnavailable(String),

    /// The requested facing mode is not provided by any camera.
    #[error("No {0} camera available")]
    FacingUnavailable(FacingMode),

    /// A still was requested without an active stream.
    #[error("No active camera stream")]
    NoActiveStream,

    /// Frame encoding failed.
    #[error("Image encoding failed: {0}")]
    Encoding(String),

    /// Gallery image data is not an image data URL.
    #[error("Invalid image data: {0}")]
    InvalidImage(String),

    /// No photo with the given identifier exists.
    #[error("Photo not found: {0}")]
    PhotoNotFound(String),

    /// The user denied a capability.
    #[error("{0} permission denied")]
    PermissionDenied(Capability),

    /// Geolocation did not answer in time.
    #[error("Geolocation timed out after {0:?}")]
    GeolocationTimeout(Duration),

    /// Geolocation failed.
    #[error("Geolocation unavailable: {0}")]
    GeolocationUnavailable(String),

    /// An operation needed a location before one was known.
    #[error("Location not available")]
    NoLocation,

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Create a malformed-response error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    /// Whether the user can reasonably retry the same action.
    pub fn is_retryable(&self) -> bool {
        match self {
            #[cfg(feature = "http")]
            Error::Http(_) => true,
            Error::ProviderStatus { status } => *status >= 500 || *status == 429,
            Error::CameraBusy(_)
            | Error::CameraUnavailable(_)
            | Error::GeolocationTimeout(_)
            | Error::GeolocationUnavailable(_) => true,
            _ => false,
        }
    }
}

/// Result type alias using nimbus-core's Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::ProviderStatus { status: 401 };
        assert_eq!(err.to_string(), "Weather provider returned HTTP 401");

        let err = Error::PermissionDenied(Capability::Camera);
        assert_eq!(err.to_string(), "Camera permission denied");

        let err = Error::FacingUnavailable(FacingMode::Environment);
        assert_eq!(err.to_string(), "No environment camera available");

        let err = Error::GeolocationTimeout(Duration::from_secs(5));
        assert!(err.to_string().contains("5s"));
    }

    #[test]
    fn test_retryable() {
        assert!(Error::CameraBusy("in use".into()).is_retryable());
        assert!(Error::ProviderStatus { status: 503 }.is_retryable());
        assert!(!Error::ProviderStatus { status: 401 }.is_retryable());
        assert!(!Error::PermissionDenied(Capability::Location).is_retryable());
        assert!(!Error::malformed("missing data").is_retryable());
    }

    #[test]
    fn test_from_parse_error() {
        let err: Error = ParseError::UnknownView("#nope".into()).into();
        assert!(matches!(err, Error::Parse(_)));
    }
}
