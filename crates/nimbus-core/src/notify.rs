//! User notifications.

use std::sync::Mutex;

use async_trait::async_trait;
use tracing::info;

use nimbus_types::{Condition, WeatherSample};

use crate::error::Result;

/// Delivers a notification to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, title: &str, body: &str) -> Result<()>;
}

/// Writes notifications to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        info!("Notification: {} - {}", title, body);
        Ok(())
    }
}

/// Keeps notifications in memory.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications sent so far, oldest first.
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push((title.to_string(), body.to_string()));
        Ok(())
    }
}

/// Notification for a condition change, if there is one.
///
/// No notification is produced for the first sample of a session.
pub fn condition_change(
    previous: Option<Condition>,
    sample: &WeatherSample,
) -> Option<(String, String)> {
    let previous = previous?;
    if previous == sample.condition {
        return None;
    }
    Some((
        format!("Weather changed: {}", sample.condition),
        format!(
            "Now {}°C and {} (was {})",
            sample.rounded_temperature(),
            sample.condition.label().to_lowercase(),
            previous.label().to_lowercase()
        ),
    ))
}
