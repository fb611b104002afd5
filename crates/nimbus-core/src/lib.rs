//! Components of the Nimbus weather companion.
//!
//! This crate holds the application logic, independent of any UI:
//!
//! - **Weather**: fetch realtime weather through a [`WeatherProvider`]
//!   (HTTP or the local [`Simulator`]), falling back to the last cached
//!   response when the provider fails
//! - **History**: rolling, anti-spam-gated weather history with period
//!   filters and summaries
//! - **Camera and gallery**: single active camera stream, JPEG stills,
//!   persisted newest-first gallery
//! - **Permissions**: probe/request for location, camera and notifications,
//!   with denials final for the session
//! - **App**: explicit [`AppState`] with a pure [`update`] function and an
//!   [`App`] adapter translating UI events into component calls
//!
//! Platform services (weather API, camera, geolocation, permission prompts,
//! notifications) sit behind traits so everything runs headless in tests.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use nimbus_core::{Simulator, WeatherFetcher};
//! use nimbus_store::Store;
//! use nimbus_types::Location;
//! use tokio::sync::Mutex;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Mutex::new(Store::open_default()?);
//!     let fetcher = WeatherFetcher::new(Arc::new(Simulator::new()));
//!
//!     let outcome = fetcher
//!         .fetch_weather(&store, &Location::new(59.33, 18.06)?)
//!         .await;
//!     println!("{}", outcome.description());
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod camera;
pub mod error;
pub mod gallery;
pub mod history;
pub mod location;
pub mod notify;
pub mod permissions;
#[cfg(feature = "http")]
pub mod provider;
pub mod refresh;
pub mod simulator;
pub mod state;
pub mod view;
pub mod weather;

pub use app::{App, AppComponents, AppEvent, AppOptions, UiEvent};
pub use camera::{
    Camera, CameraManager, FacingMode, Frame, StreamInfo, TestPatternCamera, VideoStream,
};
pub use error::{Error, Result};
pub use history::{
    ConditionCount, HistoryPolicy, HistorySummary, HistoryTracker, RecordOutcome, sort_newest_first,
    summarize,
};
pub use location::{FixedGeolocator, GeoOptions, Geolocator, LocationTracker};
pub use notify::{LogNotifier, Notifier, RecordingNotifier};
pub use permissions::{PermissionBackend, PermissionGateway, PlatformPermission, StaticPermissions};
#[cfg(feature = "http")]
pub use provider::HttpProvider;
pub use refresh::RefreshSchedule;
pub use simulator::Simulator;
pub use state::{AppState, PermissionStates, StateChange, update};
pub use view::ViewSwitcher;
pub use weather::{WeatherFetcher, WeatherOutcome, WeatherProvider};

/// Store shared between components.
pub type SharedStore = std::sync::Arc<tokio::sync::Mutex<nimbus_store::Store>>;
