//! Core types for weather samples, history, photos and app navigation.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};

use crate::condition::{Condition, ProviderValues};
use crate::error::ParseError;

/// A classified weather observation.
///
/// Samples are immutable once created; use [`WeatherSample::from_values`] to
/// derive one from raw provider fields.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct WeatherSample {
    /// Temperature in Celsius.
    pub temperature: f64,
    /// Classified condition.
    pub condition: Condition,
    /// When the underlying observation was captured.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl WeatherSample {
    /// Classify raw provider values captured at `timestamp`.
    pub fn from_values(values: &ProviderValues, timestamp: OffsetDateTime) -> Self {
        Self {
            temperature: values.temperature,
            condition: Condition::classify(values),
            timestamp,
        }
    }

    /// Temperature rounded to the nearest whole degree.
    ///
    /// Halves round away from zero on both sides, so -2.5 becomes -3. The
    /// history gate compares these values, so -2.5 and -3.0 count as the
    /// same reading.
    ///
    /// ```
    /// use nimbus_types::{Condition, WeatherSample};
    /// use time::OffsetDateTime;
    ///
    /// let sample = WeatherSample {
    ///     temperature: 21.5,
    ///     condition: Condition::Sunny,
    ///     timestamp: OffsetDateTime::UNIX_EPOCH,
    /// };
    /// assert_eq!(sample.rounded_temperature(), 22);
    /// ```
    #[must_use]
    pub fn rounded_temperature(&self) -> i32 {
        self.temperature.round() as i32
    }
}

/// A stored weather sample with a generated identifier.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HistoryEntry {
    /// Unique identifier (UUID v4).
    pub id: String,
    /// Temperature in Celsius.
    pub temperature: f64,
    /// Classified condition.
    pub condition: Condition,
    /// When the sample was captured.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl HistoryEntry {
    /// Create an entry for `sample` with a fresh identifier.
    pub fn new(sample: &WeatherSample) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            temperature: sample.temperature,
            condition: sample.condition,
            timestamp: sample.timestamp,
        }
    }

    /// The sample this entry was created from.
    pub fn sample(&self) -> WeatherSample {
        WeatherSample {
            temperature: self.temperature,
            condition: self.condition,
            timestamp: self.timestamp,
        }
    }

    /// Time elapsed between this entry and `now`.
    pub fn age(&self, now: OffsetDateTime) -> Duration {
        now - self.timestamp
    }
}

/// A captured still stored in the gallery.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Photo {
    /// Timestamp-based identifier (milliseconds since the Unix epoch).
    pub id: String,
    /// Encoded image as a data URL (`data:image/jpeg;base64,...`).
    pub image_data: String,
    /// When the photo was captured.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub timestamp: OffsetDateTime,
}

impl Photo {
    /// Identifier derived from a capture time.
    pub fn id_for(timestamp: OffsetDateTime) -> String {
        (timestamp.unix_timestamp_nanos() / 1_000_000).to_string()
    }

    /// MIME type declared by the data URL, if any.
    ///
    /// ```
    /// use nimbus_types::Photo;
    /// use time::OffsetDateTime;
    ///
    /// let photo = Photo {
    ///     id: "1".into(),
    ///     image_data: "data:image/jpeg;base64,AAAA".into(),
    ///     timestamp: OffsetDateTime::UNIX_EPOCH,
    /// };
    /// assert_eq!(photo.mime_type(), Some("image/jpeg"));
    /// ```
    pub fn mime_type(&self) -> Option<&str> {
        let rest = self.image_data.strip_prefix("data:")?;
        let end = rest.find([';', ','])?;
        Some(&rest[..end])
    }
}

/// A geographic position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Create a location, validating the coordinate range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ParseError> {
        let location = Self {
            latitude,
            longitude,
        };
        location.validate()?;
        Ok(location)
    }

    /// Check that both coordinates are finite and in range.
    pub fn validate(&self) -> Result<(), ParseError> {
        let lat_ok = self.latitude.is_finite() && (-90.0..=90.0).contains(&self.latitude);
        let lon_ok = self.longitude.is_finite() && (-180.0..=180.0).contains(&self.longitude);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(ParseError::InvalidCoordinate {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// Whether `other` is further than `threshold` degrees away on either axis.
    #[must_use]
    pub fn differs_from(&self, other: &Location, threshold: f64) -> bool {
        (self.latitude - other.latitude).abs() > threshold
            || (self.longitude - other.longitude).abs() > threshold
    }

    /// The `lat,lon` form used in provider query strings.
    pub fn query_param(&self) -> String {
        format!("{},{}", self.latitude, self.longitude)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// History view period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
}

impl Period {
    /// Length of the period.
    pub fn duration(&self) -> Duration {
        match self {
            Period::Day => Duration::hours(24),
            Period::Week => Duration::days(7),
            Period::Month => Duration::days(30),
        }
    }

    /// Whether a timestamp falls inside the period ending at `now` (inclusive).
    pub fn contains(&self, timestamp: OffsetDateTime, now: OffsetDateTime) -> bool {
        now - timestamp <= self.duration()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Day => "day",
            Period::Week => "week",
            Period::Month => "month",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Period {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "24h" => Ok(Period::Day),
            "week" | "7d" => Ok(Period::Week),
            "month" | "30d" => Ok(Period::Month),
            _ => Err(ParseError::UnknownPeriod(s.to_string())),
        }
    }
}

/// An OS-mediated capability guarded by a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Capability {
    Location,
    Camera,
    Notification,
}

impl Capability {
    pub const ALL: [Capability; 3] = [
        Capability::Location,
        Capability::Camera,
        Capability::Notification,
    ];

    /// Capitalized name used in status labels.
    pub fn title(&self) -> &'static str {
        match self {
            Capability::Location => "Location",
            Capability::Camera => "Camera",
            Capability::Notification => "Notification",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

impl FromStr for Capability {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "location" | "geolocation" => Ok(Capability::Location),
            "camera" => Ok(Capability::Camera),
            "notification" | "notifications" => Ok(Capability::Notification),
            _ => Err(ParseError::UnknownCapability(s.to_string())),
        }
    }
}

/// Known state of a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum PermissionState {
    #[default]
    Unknown,
    Granted,
    Denied,
}

impl PermissionState {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionState::Granted)
    }

    /// Status label for a capability in this state.
    ///
    /// ```
    /// use nimbus_types::{Capability, PermissionState};
    ///
    /// assert_eq!(
    ///     PermissionState::Denied.label(Capability::Location),
    ///     "Location Access Denied"
    /// );
    /// ```
    pub fn label(&self, capability: Capability) -> String {
        match self {
            PermissionState::Unknown => format!("Enable {}", capability.title()),
            PermissionState::Granted => format!("{} Enabled", capability.title()),
            PermissionState::Denied => format!("{} Access Denied", capability.title()),
        }
    }
}

/// A top-level view of the app. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum View {
    #[default]
    Weather,
    Photos,
    Settings,
}

impl View {
    pub const ALL: [View; 3] = [View::Weather, View::Photos, View::Settings];

    pub fn as_str(&self) -> &'static str {
        match self {
            View::Weather => "weather",
            View::Photos => "photos",
            View::Settings => "settings",
        }
    }

    /// Navigation anchor for this view (`#weather`).
    pub fn anchor(&self) -> String {
        format!("#{}", self.as_str())
    }
}

impl FromStr for View {
    type Err = ParseError;

    /// Parse a view name, with or without a leading `#`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_start_matches('#');
        View::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseError::UnknownView(s.to_string()))
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
