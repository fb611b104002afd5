//! Periodic weather refresh schedule.

use std::time::{Duration, Instant};

/// Default refresh interval.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(300);

/// Decides when a background weather refresh is due.
///
/// Refreshes only run while the client is visible and a location is known.
#[derive(Debug, Clone)]
pub struct RefreshSchedule {
    interval: Duration,
    last_refresh: Option<Instant>,
}

impl Default for RefreshSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}

impl RefreshSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_refresh: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a refresh should run at `now`.
    pub fn is_due(&self, now: Instant, visible: bool, has_location: bool) -> bool {
        if !visible || !has_location {
            return false;
        }
        match self.last_refresh {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.interval,
        }
    }

    /// Note that a refresh ran (scheduled or manual).
    pub fn mark_refreshed(&mut self, now: Instant) {
        self.last_refresh = Some(now);
    }

    /// Time left until the next refresh, ignoring visibility.
    pub fn time_until_due(&self, now: Instant) -> Duration {
        match self.last_refresh {
            None => Duration::ZERO,
            Some(last) => self
                .interval
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_visibility_and_location() {
        let schedule = RefreshSchedule::default();
        let now = Instant::now();
        assert!(schedule.is_due(now, true, true));
        assert!(!schedule.is_due(now, false, true));
        assert!(!schedule.is_due(now, true, false));
    }

    #[test]
    fn test_interval() {
        let mut schedule = RefreshSchedule::new(Duration::from_secs(300));
        let start = Instant::now();
        schedule.mark_refreshed(start);

        assert!(!schedule.is_due(start + Duration::from_secs(299), true, true));
        assert!(schedule.is_due(start + Duration::from_secs(300), true, true));
        assert_eq!(
            schedule.time_until_due(start + Duration::from_secs(100)),
            Duration::from_secs(200)
        );
        assert_eq!(
            schedule.time_until_due(start + Duration::from_secs(400)),
            Duration::ZERO
        );
    }
}
