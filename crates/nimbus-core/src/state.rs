//! Application state and its pure update function.
//!
//! All UI-visible state lives in [`AppState`]. It is only changed through
//! [`update`], which takes the old state and a [`StateChange`] and returns
//! the new state, so every transition can be tested without a UI.

use serde::{Deserialize, Serialize};

use nimbus_types::{Capability, Location, Period, PermissionState, View};

use crate::weather::WeatherOutcome;

/// Permission state per capability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermissionStates {
    pub location: PermissionState,
    pub camera: PermissionState,
    pub notification: PermissionState,
}

impl PermissionStates {
    pub fn get(&self, capability: Capability) -> PermissionState {
        match capability {
            Capability::Location => self.location,
            Capability::Camera => self.camera,
            Capability::Notification => self.notification,
        }
    }

    pub fn set(&mut self, capability: Capability, state: PermissionState) {
        match capability {
            Capability::Location => self.location = state,
            Capability::Camera => self.camera = state,
            Capability::Notification => self.notification = state,
        }
    }
}

/// Everything the UI renders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppState {
    pub view: View,
    pub location: Option<Location>,
    pub weather: Option<WeatherOutcome>,
    pub permissions: PermissionStates,
    pub online: bool,
    pub visible: bool,
    pub camera_active: bool,
    pub history_period: Period,
    /// Bumped whenever stored history changes.
    pub history_generation: u64,
    pub photo_count: usize,
    /// Transient status line ("Updating...", "Please enable location first").
    pub status: Option<String>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            view: View::default(),
            location: None,
            weather: None,
            permissions: PermissionStates::default(),
            online: true,
            visible: true,
            camera_active: false,
            history_period: Period::default(),
            history_generation: 0,
            photo_count: 0,
            status: None,
        }
    }
}

impl AppState {
    /// Label for a permission button.
    pub fn permission_label(&self, capability: Capability) -> String {
        self.permissions.get(capability).label(capability)
    }
}

/// A single state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum StateChange {
    ViewSwitched(View),
    LocationChanged(Location),
    WeatherUpdated(WeatherOutcome),
    PermissionChanged(Capability, PermissionState),
    ConnectivityChanged(bool),
    VisibilityChanged(bool),
    CameraChanged(bool),
    HistoryPeriodSelected(Period),
    HistoryChanged(u64),
    GalleryChanged(usize),
    Status(Option<String>),
}

/// Apply a change, returning the new state.
pub fn update(mut state: AppState, change: StateChange) -> AppState {
    match change {
        StateChange::ViewSwitched(view) => state.view = view,
        StateChange::LocationChanged(location) => state.location = Some(location),
        StateChange::WeatherUpdated(outcome) => {
            state.weather = Some(outcome);
            state.status = None;
        }
        StateChange::PermissionChanged(capability, permission) => {
            state.permissions.set(capability, permission);
            if capability == Capability::Camera && !permission.is_granted() {
                state.camera_active = false;
            }
        }
        StateChange::ConnectivityChanged(online) => state.online = online,
        StateChange::VisibilityChanged(visible) => state.visible = visible,
        StateChange::CameraChanged(active) => state.camera_active = active,
        StateChange::HistoryPeriodSelected(period) => state.history_period = period,
        StateChange::HistoryChanged(generation) => {
            state.history_generation = state.history_generation.max(generation)
        }
        StateChange::GalleryChanged(count) => state.photo_count = count,
        StateChange::Status(status) => state.status = status,
    }
    state
}
