//! Adapter translating UI events into component calls.
//!
//! [`App`] wires the components together and owns the [`AppState`]. A UI
//! (or the HTTP service, or the CLI) feeds it [`UiEvent`]s and renders the
//! resulting state; interested parties can also subscribe to [`AppEvent`]s.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use nimbus_types::{Capability, HistoryEntry, Location, Period, PermissionState, Photo, View};

use crate::SharedStore;
use crate::camera::{Camera, CameraManager, DEFAULT_SETTLE_DELAY, FacingMode, StreamInfo};
use crate::error::{Error, Result};
use crate::gallery;
use crate::history::{HistoryPolicy, HistorySummary, HistoryTracker, RecordOutcome, summarize};
use crate::location::{DEFAULT_CHANGE_THRESHOLD, GeoOptions, Geolocator, LocationTracker, locate};
use crate::notify::{Notifier, condition_change};
use crate::permissions::{PermissionBackend, PermissionGateway};
use crate::refresh::{DEFAULT_REFRESH_INTERVAL, RefreshSchedule};
use crate::state::{AppState, StateChange, update};
use crate::view::ViewSwitcher;
use crate::weather::{WeatherFetcher, WeatherOutcome, WeatherProvider};

/// Status shown when a refresh is requested before a location is known.
pub const NO_LOCATION_MESSAGE: &str = "Please enable location first";

/// Status shown while a fetch is in flight.
pub const UPDATING_MESSAGE: &str = "Updating...";

/// Capacity of the event broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Backends the app runs on.
pub struct AppComponents {
    pub store: SharedStore,
    pub provider: Arc<dyn WeatherProvider>,
    pub permissions: Arc<dyn PermissionBackend>,
    pub geolocator: Arc<dyn Geolocator>,
    pub camera: Arc<dyn Camera>,
    pub notifier: Arc<dyn Notifier>,
}

/// Tunable behavior.
#[derive(Debug, Clone)]
pub struct AppOptions {
    pub history: HistoryPolicy,
    pub location_threshold: f64,
    pub geo: GeoOptions,
    pub settle_delay: Duration,
    pub refresh_interval: Duration,
    pub preferred_facing: FacingMode,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            history: HistoryPolicy::default(),
            location_threshold: DEFAULT_CHANGE_THRESHOLD,
            geo: GeoOptions::default(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
            preferred_facing: FacingMode::default(),
        }
    }
}

/// Events a UI reports.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    Loaded,
    Navigate(String),
    RefreshClicked,
    PermissionClicked(Capability),
    PositionReported(Location),
    StartCamera(FacingMode),
    StopCamera,
    CaptureClicked,
    DeletePhoto(String),
    PeriodSelected(Period),
    VisibilityChanged(bool),
    ConnectivityChanged(bool),
}

/// Notifications emitted as the app changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum AppEvent {
    WeatherUpdated(WeatherOutcome),
    LocationChanged(Location),
    HistoryRecorded(HistoryEntry),
    GalleryChanged {
        count: usize,
    },
    PermissionChanged {
        capability: Capability,
        state: PermissionState,
    },
    Notification {
        title: String,
        body: String,
    },
    Status {
        message: String,
    },
}

/// The application.
pub struct App {
    store: SharedStore,
    fetcher: WeatherFetcher,
    history: HistoryTracker,
    permissions: PermissionGateway,
    geolocator: Arc<dyn Geolocator>,
    geo: GeoOptions,
    camera: CameraManager,
    preferred_facing: FacingMode,
    notifier: Arc<dyn Notifier>,
    location: LocationTracker,
    views: ViewSwitcher,
    schedule: RefreshSchedule,
    state: AppState,
    events: broadcast::Sender<AppEvent>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("fetcher", &self.fetcher)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl App {
    pub fn new(components: AppComponents, options: AppOptions) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store: components.store,
            fetcher: WeatherFetcher::new(components.provider),
            history: HistoryTracker::new(options.history),
            permissions: PermissionGateway::new(components.permissions),
            geolocator: components.geolocator,
            geo: options.geo,
            camera: CameraManager::new(components.camera).with_settle_delay(options.settle_delay),
            preferred_facing: options.preferred_facing,
            notifier: components.notifier,
            location: LocationTracker::new(options.location_threshold),
            views: ViewSwitcher::default(),
            schedule: RefreshSchedule::new(options.refresh_interval),
            state: AppState::default(),
            events,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn provider_name(&self) -> &str {
        self.fetcher.provider_name()
    }

    pub fn history_policy(&self) -> &HistoryPolicy {
        self.history.policy()
    }

    /// Subscribe to app events.
    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.events.subscribe()
    }

    /// Dispatch a UI event.
    pub async fn handle(&mut self, event: UiEvent) -> Result<()> {
        debug!("UI event: {:?}", event);
        match event {
            UiEvent::Loaded => self.on_load().await,
            UiEvent::Navigate(anchor) => {
                self.navigate(&anchor)?;
            }
            UiEvent::RefreshClicked => {
                self.on_refresh().await;
            }
            UiEvent::PermissionClicked(capability) => {
                self.request_permission(capability).await;
            }
            UiEvent::PositionReported(location) => {
                self.set_location(location).await;
            }
            UiEvent::StartCamera(facing) => {
                self.start_camera(facing).await?;
            }
            UiEvent::StopCamera => self.stop_camera().await,
            UiEvent::CaptureClicked => {
                self.take_still().await?;
            }
            UiEvent::DeletePhoto(id) => {
                self.delete_photo(&id).await?;
            }
            UiEvent::PeriodSelected(period) => {
                self.select_period(period).await;
            }
            UiEvent::VisibilityChanged(visible) => self.set_visible(visible),
            UiEvent::ConnectivityChanged(online) => self.set_online(online),
        }
        Ok(())
    }

    fn apply(&mut self, change: StateChange) {
        self.state = update(std::mem::take(&mut self.state), change);
    }

    fn emit(&self, event: AppEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn set_status(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.apply(StateChange::Status(Some(message.clone())));
        self.emit(AppEvent::Status { message });
    }

    fn set_permission(&mut self, capability: Capability, state: PermissionState) {
        self.apply(StateChange::PermissionChanged(capability, state));
        self.emit(AppEvent::PermissionChanged { capability, state });
    }

    /// Page load: probe permissions, then start whatever is already granted.
    pub async fn on_load(&mut self) {
        info!("Loading (provider: {})", self.fetcher.provider_name());

        let count = gallery::list_photos(&*self.store.lock().await).len();
        self.apply(StateChange::GalleryChanged(count));

        for (capability, state) in self.permissions.probe_all().await {
            self.set_permission(capability, state);
        }

        match self.state.permissions.location {
            PermissionState::Granted => self.acquire_location().await,
            PermissionState::Denied => {
                self.set_status(PermissionState::Denied.label(Capability::Location))
            }
            PermissionState::Unknown => {}
        }

        if self.state.permissions.camera.is_granted()
            && let Err(e) = self.start_camera(self.preferred_facing).await
        {
            warn!("Camera not started: {}", e);
        }
    }

    /// User clicked a permission button.
    pub async fn request_permission(&mut self, capability: Capability) -> PermissionState {
        let state = self.permissions.request(capability).await;
        self.set_permission(capability, state);

        match (capability, state) {
            (Capability::Location, PermissionState::Granted) => self.acquire_location().await,
            (Capability::Camera, PermissionState::Granted) => {
                if let Err(e) = self.start_camera(self.preferred_facing).await {
                    self.set_status(e.to_string());
                }
            }
            (_, PermissionState::Denied) => self.set_status(state.label(capability)),
            _ => {}
        }
        state
    }

    async fn acquire_location(&mut self) {
        match locate(self.geolocator.as_ref(), &self.geo).await {
            Ok(location) => {
                self.set_location(location).await;
            }
            Err(e) => {
                warn!("Could not determine location: {}", e);
                self.set_status(format!("Unable to determine location: {e}"));
            }
        }
    }

    /// A position was reported. Fetches weather when it moved.
    pub async fn set_location(&mut self, location: Location) -> Option<WeatherOutcome> {
        if !self.location.update(location) {
            return None;
        }
        self.apply(StateChange::LocationChanged(location));
        self.emit(AppEvent::LocationChanged(location));
        Some(self.refresh_weather(location).await)
    }

    /// User clicked refresh.
    pub async fn on_refresh(&mut self) -> Option<WeatherOutcome> {
        match self.location.current() {
            Some(location) => Some(self.refresh_weather(location).await),
            None => {
                self.set_status(NO_LOCATION_MESSAGE);
                None
            }
        }
    }

    /// Run a scheduled refresh if one is due.
    pub async fn tick(&mut self, now: Instant) -> Option<WeatherOutcome> {
        let location = self.location.current();
        if !self
            .schedule
            .is_due(now, self.state.visible, location.is_some())
        {
            return None;
        }
        let location = location?;
        Some(self.refresh_weather(location).await)
    }

    async fn refresh_weather(&mut self, location: Location) -> WeatherOutcome {
        self.set_status(UPDATING_MESSAGE);
        let previous = self
            .state
            .weather
            .as_ref()
            .and_then(|w| w.sample())
            .map(|s| s.condition);

        let outcome = self.fetcher.fetch_weather(&self.store, &location).await;
        self.schedule.mark_refreshed(tokio::time::Instant::now().into_std());

        if let WeatherOutcome::Fresh { sample } = &outcome {
            let recorded = {
                let store = self.store.lock().await;
                self.history
                    .record_sample(&store, sample, OffsetDateTime::now_utc())
            };
            match recorded {
                Ok(RecordOutcome::Recorded(entry)) => {
                    self.apply(StateChange::HistoryChanged(self.history.generation()));
                    self.emit(AppEvent::HistoryRecorded(entry));
                }
                Ok(RecordOutcome::Skipped) => {}
                Err(e) => warn!("Failed to record weather history: {}", e),
            }

            if self.state.permissions.notification.is_granted()
                && let Some((title, body)) = condition_change(previous, sample)
            {
                if let Err(e) = self.notifier.notify(&title, &body).await {
                    warn!("Notification failed: {}", e);
                }
                self.emit(AppEvent::Notification { title, body });
            }
        }

        self.apply(StateChange::WeatherUpdated(outcome.clone()));
        self.emit(AppEvent::WeatherUpdated(outcome.clone()));
        outcome
    }

    /// Switch to the view named by an anchor (`#photos`).
    pub fn navigate(&mut self, anchor: &str) -> Result<View> {
        let view = self.views.navigate(anchor)?;
        self.apply(StateChange::ViewSwitched(view));
        Ok(view)
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.apply(StateChange::VisibilityChanged(visible));
    }

    pub fn set_online(&mut self, online: bool) {
        self.apply(StateChange::ConnectivityChanged(online));
    }

    /// Start (or restart) the camera.
    pub async fn start_camera(&mut self, facing: FacingMode) -> Result<StreamInfo> {
        if !self.state.permissions.camera.is_granted() {
            return Err(Error::PermissionDenied(Capability::Camera));
        }
        let info = self.camera.start_capture(facing).await?;
        self.apply(StateChange::CameraChanged(true));
        Ok(info)
    }

    pub async fn stop_camera(&mut self) {
        self.camera.stop_capture().await;
        self.apply(StateChange::CameraChanged(false));
    }

    /// Capture a still from the active stream into the gallery.
    pub async fn take_still(&mut self) -> Result<Photo> {
        let image_data = self.camera.capture_still().await?;
        self.add_photo(image_data).await
    }

    /// Add an already-encoded still to the gallery.
    pub async fn add_photo(&mut self, image_data: String) -> Result<Photo> {
        let (photo, count) = {
            let store = self.store.lock().await;
            let photo = gallery::add_photo(&store, image_data, OffsetDateTime::now_utc())?;
            (photo, gallery::list_photos(&store).len())
        };
        self.apply(StateChange::GalleryChanged(count));
        self.emit(AppEvent::GalleryChanged { count });
        Ok(photo)
    }

    pub async fn delete_photo(&mut self, id: &str) -> Result<Photo> {
        let (photo, count) = {
            let store = self.store.lock().await;
            let photo = gallery::delete_photo(&store, id)?;
            (photo, gallery::list_photos(&store).len())
        };
        self.apply(StateChange::GalleryChanged(count));
        self.emit(AppEvent::GalleryChanged { count });
        Ok(photo)
    }

    pub async fn photos(&self) -> Vec<Photo> {
        gallery::list_photos(&*self.store.lock().await)
    }

    /// History entries for `period`, newest first.
    pub async fn history(&self, period: Period) -> Vec<HistoryEntry> {
        let store = self.store.lock().await;
        self.history
            .query_history(&store, period, OffsetDateTime::now_utc())
    }

    pub async fn history_summary(&self, period: Period) -> HistorySummary {
        summarize(&self.history(period).await)
    }

    /// Make `period` the active history view and return its entries.
    pub async fn select_period(&mut self, period: Period) -> Vec<HistoryEntry> {
        self.apply(StateChange::HistoryPeriodSelected(period));
        self.history(period).await
    }
}
