//! Data models for stored documents.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use nimbus_types::{RealtimeResponse, WeatherSample};

use crate::error::Error;

/// Keys of the persisted documents.
///
/// The string forms match the keys the browser app used in local storage, so
/// exported data can be imported unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentKey {
    /// Rolling weather history (array of history entries).
    #[serde(rename = "weatherHistory")]
    WeatherHistory,
    /// Photo gallery (array of photos, newest first).
    #[serde(rename = "photoGallery")]
    PhotoGallery,
    /// Most recent provider response.
    #[serde(rename = "weatherData")]
    WeatherData,
    /// Last successfully fetched provider response (used as fallback).
    #[serde(rename = "lastWeatherData")]
    LastWeatherData,
}

impl DocumentKey {
    pub const ALL: [DocumentKey; 4] = [
        DocumentKey::WeatherHistory,
        DocumentKey::PhotoGallery,
        DocumentKey::WeatherData,
        DocumentKey::LastWeatherData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKey::WeatherHistory => "weatherHistory",
            DocumentKey::PhotoGallery => "photoGallery",
            DocumentKey::WeatherData => "weatherData",
            DocumentKey::LastWeatherData => "lastWeatherData",
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DocumentKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DocumentKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| Error::UnknownKey(s.to_string()))
    }
}

/// A raw provider response together with the time it was captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedWeather {
    /// The provider response exactly as received.
    pub raw: serde_json::Value,
    /// When the response was fetched.
    #[serde(with = "time::serde::rfc3339")]
    pub fetched_at: OffsetDateTime,
}

impl CachedWeather {
    pub fn new(raw: serde_json::Value, fetched_at: OffsetDateTime) -> Self {
        Self { raw, fetched_at }
    }

    /// Parse and classify the cached response.
    ///
    /// Returns `None` when the cached payload no longer parses as a provider
    /// response; callers treat that the same as a missing cache.
    pub fn sample(&self) -> Option<WeatherSample> {
        let response: RealtimeResponse = serde_json::from_value(self.raw.clone()).ok()?;
        Some(WeatherSample::from_values(
            &response.data.values,
            self.fetched_at,
        ))
    }
}

/// Metadata about a stored document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentInfo {
    /// Document key.
    pub key: DocumentKey,
    /// Schema version of the stored value.
    pub version: i64,
    /// Size of the serialized value in bytes.
    pub size: usize,
    /// When the document was last written.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}
