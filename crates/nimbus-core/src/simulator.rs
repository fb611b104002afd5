//! Local weather simulator.
//!
//! Produces plausible realtime envelopes without network access, for demos
//! and for running the app with no provider key. Seeded simulators are
//! deterministic.

use std::sync::Mutex;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use nimbus_types::{Location, ProviderValues, RealtimeData, RealtimeResponse};

use crate::error::{Error, Result};
use crate::weather::WeatherProvider;

/// Simulated weather provider.
pub struct Simulator {
    rng: Mutex<StdRng>,
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator").finish_non_exhaustive()
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    /// Create a simulator seeded from the OS.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_os_rng()),
        }
    }

    /// Create a deterministic simulator.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Generate values for a location.
    ///
    /// Temperatures fall off with latitude; sky and precipitation are random.
    pub fn values(&self, location: &Location) -> ProviderValues {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let base = 28.0 - location.latitude.abs() * 0.45;
        let temperature = round1(base + rng.random_range(-6.0..6.0));
        let cloud_cover = rng.random_range(0..=100) as f64;
        let precipitation = if cloud_cover > 60.0 {
            rng.random_range(20..=100) as f64
        } else {
            rng.random_range(0..=30) as f64
        };
        ProviderValues::new(temperature, cloud_cover, precipitation)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[async_trait]
impl WeatherProvider for Simulator {
    fn name(&self) -> &str {
        "simulator"
    }

    async fn fetch_realtime(&self, location: &Location) -> Result<Value> {
        let time = OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .map_err(|e| Error::malformed(e.to_string()))?;
        let response = RealtimeResponse {
            data: RealtimeData {
                time: Some(time),
                values: self.values(location),
            },
        };
        Ok(serde_json::to_value(response)?)
    }
}
