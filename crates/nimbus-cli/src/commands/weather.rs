//! Weather command implementation.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, anyhow, bail};
use nimbus_core::{
    HistoryTracker, HttpProvider, RecordOutcome, Simulator, WeatherFetcher, WeatherOutcome,
    WeatherProvider,
};
use nimbus_service::{Config, ProviderKind};
use nimbus_store::Store;
use nimbus_types::Location;
use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::cli::OutputFormat;
use crate::format::{FormatOptions, format_json, format_weather_text};
use crate::util::{open_store, write_output};

/// Arguments for the weather command.
pub struct WeatherArgs<'a> {
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub simulate: bool,
    pub no_record: bool,
    pub format: OutputFormat,
    pub output: Option<&'a PathBuf>,
    pub database: Option<&'a PathBuf>,
    pub config: &'a Config,
    pub opts: &'a FormatOptions,
}

/// What a single fetch produced.
#[derive(Debug, Serialize)]
struct WeatherReport {
    location: Location,
    #[serde(flatten)]
    outcome: WeatherOutcome,
    recorded: bool,
}

pub async fn cmd_weather(args: WeatherArgs<'_>) -> Result<()> {
    let WeatherArgs {
        lat,
        lon,
        simulate,
        no_record,
        format,
        output,
        database,
        config,
        opts,
    } = args;

    let location = resolve_location(lat, lon, config)?;
    let fetcher = WeatherFetcher::new(build_provider(config, simulate)?);
    let tracker = HistoryTracker::new(config.history.policy());
    let store = Mutex::new(open_store(database, config)?);

    let report = fetch_and_record(&fetcher, &store, &tracker, location, !no_record).await?;

    let content = match format {
        OutputFormat::Json => format_json(&report)?,
        OutputFormat::Text => format_weather_text(&report.outcome, &report.location, opts),
    };
    write_output(output, &content)?;

    if let WeatherOutcome::Unavailable { reason } = &report.outcome {
        bail!("Failed to fetch weather data: {}", reason);
    }
    Ok(())
}

/// Coordinates from the command line, else from the configuration.
fn resolve_location(lat: Option<f64>, lon: Option<f64>, config: &Config) -> Result<Location> {
    match (lat, lon) {
        (Some(lat), Some(lon)) => Ok(Location::new(lat, lon)?),
        _ => config.location.location().ok_or_else(|| {
            anyhow!(
                "No location given. Use --lat/--lon or set location.latitude and \
                 location.longitude in the config file."
            )
        }),
    }
}

fn build_provider(config: &Config, simulate: bool) -> Result<Arc<dyn WeatherProvider>> {
    if simulate || config.weather.provider == ProviderKind::Simulator {
        return Ok(Arc::new(Simulator::new()));
    }
    let key = config
        .weather
        .api_key
        .clone()
        .ok_or_else(|| anyhow!("weather.api_key is required for the http provider"))?;
    Ok(Arc::new(HttpProvider::new(&config.weather.base_url, key)?))
}

async fn fetch_and_record(
    fetcher: &WeatherFetcher,
    store: &Mutex<Store>,
    tracker: &HistoryTracker,
    location: Location,
    record: bool,
) -> Result<WeatherReport> {
    let outcome = fetcher.fetch_weather(store, &location).await;

    let mut recorded = false;
    if record && let WeatherOutcome::Fresh { sample } = &outcome {
        let store = store.lock().await;
        match tracker.record_sample(&store, sample, OffsetDateTime::now_utc())? {
            RecordOutcome::Recorded(entry) => {
                info!("Recorded history entry {}", entry.id);
                recorded = true;
            }
            RecordOutcome::Skipped => debug!("Reading unchanged, history not updated"),
        }
    }

    Ok(WeatherReport {
        location,
        outcome,
        recorded,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nimbus_core::Error;
    use nimbus_types::Period;

    struct FailingProvider;

    #[async_trait::async_trait]
    impl WeatherProvider for FailingProvider {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch_realtime(
            &self,
            _location: &Location,
        ) -> nimbus_core::Result<serde_json::Value> {
            Err(Error::ProviderStatus { status: 503 })
        }
    }

    fn stockholm() -> Location {
        Location::new(59.33, 18.06).unwrap()
    }

    #[test]
    fn test_resolve_location_prefers_arguments() {
        let mut config = Config::default();
        config.location.latitude = Some(1.0);
        config.location.longitude = Some(2.0);

        let location = resolve_location(Some(10.0), Some(20.0), &config).unwrap();
        assert_eq!(location, Location::new(10.0, 20.0).unwrap());

        let location = resolve_location(None, None, &config).unwrap();
        assert_eq!(location, Location::new(1.0, 2.0).unwrap());
    }

    #[test]
    fn test_resolve_location_errors() {
        assert!(resolve_location(None, None, &Config::default()).is_err());
        assert!(resolve_location(Some(91.0), Some(0.0), &Config::default()).is_err());
    }

    #[test]
    fn test_build_provider_simulator_by_default() {
        let provider = build_provider(&Config::default(), false).unwrap();
        assert_eq!(provider.name(), "simulator");
    }

    #[test]
    fn test_build_provider_http_requires_key() {
        let mut config = Config::default();
        config.weather.provider = ProviderKind::Http;
        assert!(build_provider(&config, false).is_err());
        assert_eq!(build_provider(&config, true).unwrap().name(), "simulator");
    }

    #[tokio::test]
    async fn test_fresh_reading_is_recorded() {
        let fetcher = WeatherFetcher::new(Arc::new(Simulator::seeded(7)));
        let store = Mutex::new(Store::open_in_memory().unwrap());
        let tracker = HistoryTracker::default();

        let report = fetch_and_record(&fetcher, &store, &tracker, stockholm(), true)
            .await
            .unwrap();
        assert!(report.outcome.is_fresh());
        assert!(report.recorded);

        let store = store.lock().await;
        let entries = tracker.query_history(&store, Period::Day, OffsetDateTime::now_utc());
        assert_eq!(entries.len(), 1);
    }

    #[tokio::test]
    async fn test_no_record_leaves_history_untouched() {
        let fetcher = WeatherFetcher::new(Arc::new(Simulator::seeded(7)));
        let store = Mutex::new(Store::open_in_memory().unwrap());
        let tracker = HistoryTracker::default();

        let report = fetch_and_record(&fetcher, &store, &tracker, stockholm(), false)
            .await
            .unwrap();
        assert!(!report.recorded);
        assert!(store.lock().await.read_history().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_fetch_falls_back_without_recording() {
        let store = Mutex::new(Store::open_in_memory().unwrap());
        let tracker = HistoryTracker::default();

        // Prime the cache with a successful fetch.
        let good = WeatherFetcher::new(Arc::new(Simulator::seeded(1)));
        fetch_and_record(&good, &store, &tracker, stockholm(), false)
            .await
            .unwrap();

        let bad = WeatherFetcher::new(Arc::new(FailingProvider));
        let report = fetch_and_record(&bad, &store, &tracker, stockholm(), true)
            .await
            .unwrap();
        assert!(matches!(report.outcome, WeatherOutcome::Cached { .. }));
        assert!(!report.recorded);

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "cached");
        assert_eq!(json["recorded"], false);
    }
}
