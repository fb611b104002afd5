//! Weather fetching with last-known-cache fallback.
//!
//! [`WeatherFetcher::fetch_weather`] makes exactly one provider request per
//! call. A successful response is persisted as both the current and the
//! last-known weather document; any failure (transport, status, malformed
//! payload) falls back to the last-known document. Periodic re-invocation is
//! the caller's job, see [`crate::refresh::RefreshSchedule`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use nimbus_store::{CachedWeather, Store};
use nimbus_types::{Location, ProviderValues, RealtimeResponse, WeatherSample};

use crate::error::{Error, Result};

/// Source of realtime weather readings.
///
/// Implementations return the provider's JSON envelope untouched; the
/// fetcher owns parsing and classification so every provider is held to
/// the same rules.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Short provider name for logs and status output.
    fn name(&self) -> &str;

    /// Fetch the realtime envelope for a location.
    async fn fetch_realtime(&self, location: &Location) -> Result<Value>;
}

/// Result of a weather fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WeatherOutcome {
    /// Live data from the provider.
    Fresh { sample: WeatherSample },
    /// The provider failed; this is the last successful response.
    Cached {
        sample: WeatherSample,
        #[serde(with = "time::serde::rfc3339")]
        fetched_at: OffsetDateTime,
        reason: String,
    },
    /// The provider failed and nothing was cached.
    Unavailable { reason: String },
}

impl WeatherOutcome {
    /// The sample to display, if any.
    pub fn sample(&self) -> Option<&WeatherSample> {
        match self {
            WeatherOutcome::Fresh { sample } | WeatherOutcome::Cached { sample, .. } => {
                Some(sample)
            }
            WeatherOutcome::Unavailable { .. } => None,
        }
    }

    /// When the displayed data was captured ("last updated").
    pub fn last_updated(&self) -> Option<OffsetDateTime> {
        match self {
            WeatherOutcome::Fresh { sample } => Some(sample.timestamp),
            WeatherOutcome::Cached { fetched_at, .. } => Some(*fetched_at),
            WeatherOutcome::Unavailable { .. } => None,
        }
    }

    pub fn is_fresh(&self) -> bool {
        matches!(self, WeatherOutcome::Fresh { .. })
    }

    /// One-line description for a status display.
    ///
    /// ```
    /// use nimbus_core::WeatherOutcome;
    ///
    /// let outcome = WeatherOutcome::Unavailable { reason: "offline".into() };
    /// assert_eq!(outcome.description(), "Failed to fetch weather data");
    /// ```
    pub fn description(&self) -> String {
        match self {
            WeatherOutcome::Fresh { sample } => {
                format!("{}°C {}", sample.rounded_temperature(), sample.condition)
            }
            WeatherOutcome::Cached {
                sample, fetched_at, ..
            } => format!(
                "{}°C {} (offline, last updated {})",
                sample.rounded_temperature(),
                sample.condition,
                format_clock(*fetched_at)
            ),
            WeatherOutcome::Unavailable { .. } => "Failed to fetch weather data".to_string(),
        }
    }
}

fn format_clock(ts: OffsetDateTime) -> String {
    format!("{:02}:{:02}", ts.hour(), ts.minute())
}

/// Fetches weather through a provider and persists the result.
pub struct WeatherFetcher {
    provider: Arc<dyn WeatherProvider>,
}

impl std::fmt::Debug for WeatherFetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WeatherFetcher")
            .field("provider", &self.provider.name())
            .finish()
    }
}

impl WeatherFetcher {
    pub fn new(provider: Arc<dyn WeatherProvider>) -> Self {
        Self { provider }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Fetch weather for `location`, falling back to the last cached response.
    ///
    /// The store lock is only taken after the network request completes.
    pub async fn fetch_weather(&self, store: &Mutex<Store>, location: &Location) -> WeatherOutcome {
        let result = self.request(location).await;
        let now = OffsetDateTime::now_utc();
        let store = store.lock().await;
        settle(&store, result, now)
    }

    async fn request(&self, location: &Location) -> Result<(Value, ProviderValues)> {
        debug!(
            "Requesting weather for {} from {}",
            location,
            self.provider.name()
        );
        let raw = self.provider.fetch_realtime(location).await?;
        let values = parse_values(&raw)?;
        Ok((raw, values))
    }
}

/// Parse and validate a realtime envelope.
pub fn parse_values(raw: &Value) -> Result<ProviderValues> {
    let response: RealtimeResponse =
        serde_json::from_value(raw.clone()).map_err(|e| Error::malformed(e.to_string()))?;
    response
        .data
        .values
        .validate()
        .map_err(|e| Error::malformed(e.to_string()))?;
    Ok(response.data.values)
}

fn settle(
    store: &Store,
    result: Result<(Value, ProviderValues)>,
    now: OffsetDateTime,
) -> WeatherOutcome {
    match result {
        Ok((raw, values)) => {
            let sample = WeatherSample::from_values(&values, now);
            if let Err(e) = store.write_weather(&CachedWeather::new(raw, now)) {
                warn!("Failed to cache weather response: {}", e);
            }
            info!(
                "Weather updated: {:.1}°C {}",
                sample.temperature, sample.condition
            );
            WeatherOutcome::Fresh { sample }
        }
        Err(e) => {
            warn!("Weather fetch failed: {}", e);
            let reason = e.to_string();
            match last_known(store) {
                Some((sample, fetched_at)) => {
                    info!("Using cached weather from {}", fetched_at);
                    WeatherOutcome::Cached {
                        sample,
                        fetched_at,
                        reason,
                    }
                }
                None => WeatherOutcome::Unavailable { reason },
            }
        }
    }
}

fn last_known(store: &Store) -> Option<(WeatherSample, OffsetDateTime)> {
    let cached = match store.read_last_weather() {
        Ok(cached) => cached?,
        Err(e) => {
            warn!("Failed to read cached weather: {}", e);
            return None;
        }
    };
    match cached.sample() {
        Some(sample) => Some((sample, cached.fetched_at)),
        None => {
            warn!("Ignoring unparseable cached weather");
            None
        }
    }
}
