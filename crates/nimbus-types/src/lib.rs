//! Platform-agnostic types for the Nimbus weather companion.
//!
//! This crate provides shared types used by the native crates
//! (nimbus-core, nimbus-store, nimbus-worker) and by the WebAssembly
//! module (nimbus-wasm).
//!
//! # Features
//!
//! - Weather condition classification from raw provider values
//! - Weather samples, history entries and gallery photos
//! - Permission, view and history-period enums
//! - URL classification for the offline cache worker
//!
//! # Example
//!
//! ```
//! use nimbus_types::{Condition, ProviderValues, WeatherSample};
//! use time::OffsetDateTime;
//!
//! let values = ProviderValues::new(12.0, 80.0, 10.0);
//! let sample = WeatherSample::from_values(&values, OffsetDateTime::now_utc());
//! assert_eq!(sample.condition, Condition::Cloudy);
//! ```

pub mod condition;
pub mod error;
pub mod routing;
pub mod types;

pub use condition::{Condition, ProviderValues, RealtimeData, RealtimeResponse};
pub use error::{ParseError, ParseResult};
pub use routing::{DEFAULT_API_HOST, RequestKind, RouteClassifier};
pub use types::{
    Capability, HistoryEntry, Location, Period, PermissionState, Photo, View, WeatherSample,
};
