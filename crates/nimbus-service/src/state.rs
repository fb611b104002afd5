//! Application state shared across handlers.
//!
//! The [`App`] owns every component and is driven by one request at a time
//! through a mutex. Events reach WebSocket clients through two broadcast
//! channels (app events and cache worker messages); slow subscribers lose
//! the oldest messages rather than blocking senders.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};

use nimbus_core::{
    App, AppComponents, AppEvent, FixedGeolocator, HttpProvider, LogNotifier, Simulator,
    StaticPermissions, TestPatternCamera, WeatherProvider,
};
use nimbus_store::Store;
use nimbus_worker::{CacheWorker, HttpNetwork, WorkerMessage};

use crate::config::{Config, ProviderKind};

/// Frame size of the synthetic camera.
const CAMERA_WIDTH: u32 = 640;
const CAMERA_HEIGHT: u32 = 480;

/// Shared application state.
pub struct AppState {
    /// The application (wrapped in Mutex; one operation at a time).
    pub app: Mutex<App>,
    /// Offline cache worker, if enabled.
    pub worker: Option<CacheWorker>,
    /// Configuration (RwLock for runtime reads).
    pub config: RwLock<Config>,
}

impl AppState {
    /// Create new application state.
    pub fn new(app: App, worker: Option<CacheWorker>, config: Config) -> Arc<Self> {
        Arc::new(Self {
            app: Mutex::new(app),
            worker,
            config: RwLock::new(config),
        })
    }

    /// Build the app and worker the configuration describes.
    ///
    /// The service runs headless: permissions are granted, the position is
    /// the configured one, and the camera renders a test pattern.
    pub fn from_config(config: Config, store: Store) -> Result<Arc<Self>, StartupError> {
        let provider: Arc<dyn WeatherProvider> = match config.weather.provider {
            ProviderKind::Simulator => Arc::new(Simulator::new()),
            ProviderKind::Http => Arc::new(HttpProvider::new(
                &config.weather.base_url,
                config.weather.api_key.clone().unwrap_or_default(),
            )?),
        };
        let geolocator = match config.location.location() {
            Some(location) => FixedGeolocator::new(location),
            None => FixedGeolocator::unavailable(),
        };

        let components = AppComponents {
            store: Arc::new(Mutex::new(store)),
            provider,
            permissions: Arc::new(StaticPermissions::granted()),
            geolocator: Arc::new(geolocator),
            camera: Arc::new(TestPatternCamera::new(CAMERA_WIDTH, CAMERA_HEIGHT)),
            notifier: Arc::new(LogNotifier),
        };
        let app = App::new(components, config.app_options());

        let worker = if config.worker.enabled {
            let network = HttpNetwork::new(Duration::from_secs(config.worker.timeout))?;
            Some(CacheWorker::new(
                config.worker.worker_config(),
                Arc::new(network),
            ))
        } else {
            None
        };

        Ok(Self::new(app, worker, config))
    }
}

/// An event pushed to WebSocket clients.
///
/// App events serialize as `{"type": "weather_updated", "data": ...}`,
/// worker messages as `{"type": "OFFLINE_STATUS", "payload": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ServiceEvent {
    App(AppEvent),
    Worker(WorkerMessage),
}

/// Errors building the service state.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("Failed to create weather provider: {0}")]
    Provider(#[from] nimbus_core::Error),
    #[error("Failed to create cache worker: {0}")]
    Worker(#[from] nimbus_worker::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_types::Location;

    #[tokio::test]
    async fn test_from_default_config() {
        let store = Store::open_in_memory().unwrap();
        let state = AppState::from_config(Config::default(), store).unwrap();

        assert!(state.worker.is_some());
        let app = state.app.lock().await;
        assert_eq!(app.provider_name(), "simulator");
        assert!(app.state().location.is_none());
    }

    #[tokio::test]
    async fn test_worker_can_be_disabled() {
        let mut config = Config::default();
        config.worker.enabled = false;
        let state = AppState::from_config(config, Store::open_in_memory().unwrap()).unwrap();
        assert!(state.worker.is_none());
    }

    #[tokio::test]
    async fn test_configured_location_is_used_on_load() {
        let mut config = Config::default();
        config.location.latitude = Some(59.33);
        config.location.longitude = Some(18.06);
        let state = AppState::from_config(config, Store::open_in_memory().unwrap()).unwrap();

        let mut app = state.app.lock().await;
        app.on_load().await;
        assert_eq!(app.state().location, Location::new(59.33, 18.06).ok());
        assert!(app.state().weather.as_ref().unwrap().is_fresh());
    }

    #[test]
    fn test_service_event_serialization() {
        let event = ServiceEvent::Worker(WorkerMessage::OfflineStatus(true));
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"type": "OFFLINE_STATUS", "payload": true})
        );

        let event = ServiceEvent::App(AppEvent::GalleryChanged { count: 3 });
        assert_eq!(
            serde_json::to_value(&event).unwrap(),
            serde_json::json!({"type": "gallery_changed", "data": {"count": 3}})
        );
    }
}
