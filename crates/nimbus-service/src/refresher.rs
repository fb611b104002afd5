//! Background weather refresher.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, interval};
use tracing::{debug, error, info, warn};

use nimbus_core::WeatherOutcome;

use crate::state::AppState;

/// How often the refresh schedule is checked.
pub const CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Runs scheduled refreshes while the app is visible and has a location.
pub struct Refresher {
    state: Arc<AppState>,
    check_interval: Duration,
}

impl Refresher {
    /// Create a new refresher.
    pub fn new(state: Arc<AppState>) -> Self {
        Self {
            state,
            check_interval: CHECK_INTERVAL,
        }
    }

    pub fn with_check_interval(mut self, check_interval: Duration) -> Self {
        self.check_interval = check_interval;
        self
    }

    /// Spawn the refresh loop. Returns immediately.
    pub fn start(self) -> JoinHandle<()> {
        info!(
            "Starting weather refresher (checking every {}s)",
            self.check_interval.as_secs()
        );
        tokio::spawn(async move { self.run().await })
    }

    async fn run(self) {
        let mut timer = interval(self.check_interval);
        let mut consecutive_failures = 0u32;

        loop {
            timer.tick().await;

            let outcome = self.state.app.lock().await.tick(Instant::now().into_std()).await;
            match outcome {
                None => {}
                Some(WeatherOutcome::Fresh { sample }) => {
                    consecutive_failures = 0;
                    debug!(
                        "Refreshed weather: {:.1}°C {}",
                        sample.temperature, sample.condition
                    );
                }
                Some(outcome) => {
                    consecutive_failures += 1;
                    if consecutive_failures <= 3 {
                        warn!(
                            "Weather refresh failed: {} (attempt {})",
                            outcome.description(),
                            consecutive_failures
                        );
                    } else if consecutive_failures == 4 {
                        error!(
                            "Weather refresh failed {} times, will continue trying silently",
                            consecutive_failures
                        );
                    }
                }
            }
        }
    }
}
