//! Geolocation.

use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use nimbus_types::Location;

use crate::error::{Error, Result};

/// Default minimum coordinate change (degrees) that counts as a move.
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.001;

/// Default geolocation timeout.
pub const DEFAULT_GEO_TIMEOUT: Duration = Duration::from_secs(5);

/// Options passed to the geolocation backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Maximum age of a cached position. Zero disables cached positions.
    pub maximum_age: Duration,
}

impl Default for GeoOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: DEFAULT_GEO_TIMEOUT,
            maximum_age: Duration::ZERO,
        }
    }
}

/// Platform position source.
#[async_trait]
pub trait Geolocator: Send + Sync {
    async fn current_position(&self, options: &GeoOptions) -> Result<Location>;
}

/// Acquire a position, giving up after `options.timeout`.
pub async fn locate(geolocator: &dyn Geolocator, options: &GeoOptions) -> Result<Location> {
    match tokio::time::timeout(options.timeout, geolocator.current_position(options)).await {
        Ok(result) => result,
        Err(_) => Err(Error::GeolocationTimeout(options.timeout)),
    }
}

/// A geolocator reporting a position set by the caller.
#[derive(Debug, Default)]
pub struct FixedGeolocator {
    position: RwLock<Option<Location>>,
}

impl FixedGeolocator {
    pub fn new(location: Location) -> Self {
        Self {
            position: RwLock::new(Some(location)),
        }
    }

    /// A geolocator that never has a fix.
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub async fn set(&self, location: Option<Location>) {
        *self.position.write().await = location;
    }
}

#[async_trait]
impl Geolocator for FixedGeolocator {
    async fn current_position(&self, _options: &GeoOptions) -> Result<Location> {
        self.position
            .read()
            .await
            .ok_or_else(|| Error::GeolocationUnavailable("position unavailable".into()))
    }
}

/// Keeps the current location, ignoring jitter below a threshold.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationTracker {
    threshold: f64,
    current: Option<Location>,
}

impl Default for LocationTracker {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_THRESHOLD)
    }
}

impl LocationTracker {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            current: None,
        }
    }

    pub fn current(&self) -> Option<Location> {
        self.current
    }

    /// Accept a reported position. Returns `true` when it replaced the
    /// current location (and a new weather fetch is due).
    pub fn update(&mut self, reported: Location) -> bool {
        let changed = match self.current {
            None => true,
            Some(current) => current.differs_from(&reported, self.threshold),
        };
        if changed {
            debug!("Location changed to {}", reported);
            self.current = Some(reported);
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowGeolocator;

    #[async_trait]
    impl Geolocator for SlowGeolocator {
        async fn current_position(&self, _options: &GeoOptions) -> Result<Location> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(Location::new(0.0, 0.0)?)
        }
    }

    #[test]
    fn test_default_options() {
        let options = GeoOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(5));
        assert_eq!(options.maximum_age, Duration::ZERO);
        assert!(options.high_accuracy);
    }

    #[test]
    fn test_tracker_ignores_jitter() {
        let mut tracker = LocationTracker::default();
        assert!(tracker.update(Location::new(52.52, 13.405).unwrap()));
        assert!(!tracker.update(Location::new(52.5205, 13.4055).unwrap()));
        assert!(!tracker.update(Location::new(52.521, 13.405).unwrap()));
        assert!(tracker.update(Location::new(52.5215, 13.405).unwrap()));
        assert_eq!(tracker.current().unwrap().latitude, 52.5215);
    }

    #[tokio::test(start_paused = true)]
    async fn test_locate_times_out() {
        let err = locate(&SlowGeolocator, &GeoOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::GeolocationTimeout(d) if d == Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_fixed_geolocator() {
        let geo = FixedGeolocator::unavailable();
        assert!(locate(&geo, &GeoOptions::default()).await.is_err());
        geo.set(Some(Location::new(1.0, 2.0).unwrap())).await;
        assert_eq!(
            locate(&geo, &GeoOptions::default()).await.unwrap(),
            Location::new(1.0, 2.0).unwrap()
        );
    }
}
