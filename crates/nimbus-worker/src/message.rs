//! Messages exchanged between the worker and its clients.

use serde::{Deserialize, Serialize};
use tracing::debug;

/// A message rebroadcast to every client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum WorkerMessage {
    /// Connectivity changed; `true` means offline.
    #[serde(rename = "OFFLINE_STATUS")]
    OfflineStatus(bool),
}

impl WorkerMessage {
    /// Parse a client message. Unknown or malformed messages yield `None`.
    pub fn parse(value: &serde_json::Value) -> Option<Self> {
        match serde_json::from_value(value.clone()) {
            Ok(message) => Some(message),
            Err(e) => {
                debug!("Ignoring worker message {}: {}", value, e);
                None
            }
        }
    }
}
