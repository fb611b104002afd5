//! Weather condition classification.
//!
//! Raw provider readings carry continuous values (cloud cover, chance of
//! precipitation, temperature). The rest of the system works with a
//! discretized [`Condition`] derived from those values by fixed thresholds.

use core::fmt;
use core::str::FromStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Precipitation probability (percent) above which a reading counts as wet.
pub const PRECIPITATION_THRESHOLD: f64 = 50.0;
/// Cloud cover (percent) above which the sky counts as overcast.
pub const CLOUDY_THRESHOLD: f64 = 70.0;
/// Cloud cover (percent) above which the sky counts as partly cloudy.
pub const PARTLY_CLOUDY_THRESHOLD: f64 = 30.0;
/// Temperature (Celsius) at or below which precipitation falls as snow.
pub const FREEZING_POINT: f64 = 0.0;

/// Discretized weather state.
///
/// # Display vs Serialization
///
/// `Display` returns the human-readable label ("Partly Cloudy"), while serde
/// uses the variant name ("PartlyCloudy").
///
/// ```
/// use nimbus_types::Condition;
///
/// assert_eq!(Condition::PartlyCloudy.to_string(), "Partly Cloudy");
/// assert_eq!("Clear".parse::<Condition>(), Ok(Condition::Sunny));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Condition {
    Sunny,
    PartlyCloudy,
    Cloudy,
    Rainy,
    Snowy,
}

impl Condition {
    /// All conditions in classification order, driest first.
    pub const ALL: [Condition; 5] = [
        Condition::Sunny,
        Condition::PartlyCloudy,
        Condition::Cloudy,
        Condition::Rainy,
        Condition::Snowy,
    ];

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Condition::Sunny => "Sunny",
            Condition::PartlyCloudy => "Partly Cloudy",
            Condition::Cloudy => "Cloudy",
            Condition::Rainy => "Rainy",
            Condition::Snowy => "Snowy",
        }
    }

    /// Whether this condition involves precipitation.
    #[must_use]
    pub fn is_wet(&self) -> bool {
        matches!(self, Condition::Rainy | Condition::Snowy)
    }

    /// Classify raw provider values.
    ///
    /// Precipitation dominates cloud cover: a likely-wet reading is Rainy (or
    /// Snowy at or below freezing) regardless of how cloudy it is.
    ///
    /// ```
    /// use nimbus_types::{Condition, ProviderValues};
    ///
    /// let values = ProviderValues::new(-2.0, 90.0, 80.0);
    /// assert_eq!(Condition::classify(&values), Condition::Snowy);
    /// ```
    #[must_use]
    pub fn classify(values: &ProviderValues) -> Self {
        if values.precipitation_probability > PRECIPITATION_THRESHOLD {
            if values.temperature <= FREEZING_POINT {
                Condition::Snowy
            } else {
                Condition::Rainy
            }
        } else if values.cloud_cover > CLOUDY_THRESHOLD {
            Condition::Cloudy
        } else if values.cloud_cover > PARTLY_CLOUDY_THRESHOLD {
            Condition::PartlyCloudy
        } else {
            Condition::Sunny
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Condition {
    type Err = ParseError;

    /// Parse either a label or a variant name, case-insensitively.
    ///
    /// Older stored data used "Clear" for what is now Sunny.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "sunny" | "clear" => Ok(Condition::Sunny),
            "partlycloudy" => Ok(Condition::PartlyCloudy),
            "cloudy" => Ok(Condition::Cloudy),
            "rainy" | "rain" => Ok(Condition::Rainy),
            "snowy" | "snow" => Ok(Condition::Snowy),
            _ => Err(ParseError::UnknownCondition(s.to_string())),
        }
    }
}

/// The subset of provider fields used for classification.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ProviderValues {
    /// Air temperature in Celsius.
    pub temperature: f64,
    /// Cloud cover in percent (0-100).
    #[cfg_attr(feature = "serde", serde(default))]
    pub cloud_cover: f64,
    /// Chance of precipitation in percent (0-100).
    #[cfg_attr(feature = "serde", serde(default))]
    pub precipitation_probability: f64,
}

impl ProviderValues {
    /// Create values from temperature, cloud cover and precipitation probability.
    pub fn new(temperature: f64, cloud_cover: f64, precipitation_probability: f64) -> Self {
        Self {
            temperature,
            cloud_cover,
            precipitation_probability,
        }
    }

    /// Reject values that cannot come from a sane provider.
    pub fn validate(&self) -> Result<(), ParseError> {
        if !self.temperature.is_finite() {
            return Err(ParseError::InvalidData("temperature is not finite".into()));
        }
        for (name, value) in [
            ("cloudCover", self.cloud_cover),
            ("precipitationProbability", self.precipitation_probability),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ParseError::InvalidData(format!(
                    "{name} {value} outside 0-100"
                )));
            }
        }
        Ok(())
    }
}

/// Realtime weather envelope returned by the provider.
///
/// Only the nested `data.values` block is required; unknown fields are ignored.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RealtimeResponse {
    pub data: RealtimeData,
}

/// The `data` block of a [`RealtimeResponse`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RealtimeData {
    /// Observation time as reported by the provider (ISO 8601).
    #[cfg_attr(feature = "serde", serde(default))]
    pub time: Option<String>,
    pub values: ProviderValues,
}

impl RealtimeResponse {
    /// Wrap provider values into an envelope.
    pub fn from_values(values: ProviderValues) -> Self {
        Self {
            data: RealtimeData { time: None, values },
        }
    }

    /// The classified condition of this response.
    pub fn condition(&self) -> Condition {
        Condition::classify(&self.data.values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_wet_readings() {
        let snowy = ProviderValues::new(0.0, 10.0, 51.0);
        assert_eq!(Condition::classify(&snowy), Condition::Snowy);

        let rainy = ProviderValues::new(0.1, 10.0, 51.0);
        assert_eq!(Condition::classify(&rainy), Condition::Rainy);
    }

    #[test]
    fn test_classify_cloud_cover() {
        assert_eq!(
            Condition::classify(&ProviderValues::new(15.0, 71.0, 50.0)),
            Condition::Cloudy
        );
        assert_eq!(
            Condition::classify(&ProviderValues::new(15.0, 31.0, 0.0)),
            Condition::PartlyCloudy
        );
        assert_eq!(
            Condition::classify(&ProviderValues::new(15.0, 10.0, 20.0)),
            Condition::Sunny
        );
    }

    #[test]
    fn test_classify_exact_thresholds_are_exclusive() {
        assert_eq!(
            Condition::classify(&ProviderValues::new(15.0, 70.0, 50.0)),
            Condition::PartlyCloudy
        );
        assert_eq!(
            Condition::classify(&ProviderValues::new(15.0, 30.0, 0.0)),
            Condition::Sunny
        );
    }

    #[test]
    fn test_condition_from_str() {
        assert_eq!("Partly Cloudy".parse::<Condition>(), Ok(Condition::PartlyCloudy));
        assert_eq!("PartlyCloudy".parse::<Condition>(), Ok(Condition::PartlyCloudy));
        assert_eq!("partly_cloudy".parse::<Condition>(), Ok(Condition::PartlyCloudy));
        assert_eq!("clear".parse::<Condition>(), Ok(Condition::Sunny));
        assert!("Foggy".parse::<Condition>().is_err());
    }

    #[test]
    fn test_label_roundtrips_through_from_str() {
        for condition in Condition::ALL {
            assert_eq!(condition.label().parse::<Condition>(), Ok(condition));
        }
    }

    #[test]
    fn test_serialization_uses_variant_names() {
        assert_eq!(
            serde_json::to_string(&Condition::PartlyCloudy).unwrap(),
            "\"PartlyCloudy\""
        );
    }

    #[test]
    fn test_realtime_response_parses_provider_payload() {
        let json = r#"{
            "data": {
                "time": "2024-05-01T12:00:00Z",
                "values": {
                    "temperature": 18.4,
                    "cloudCover": 45,
                    "precipitationProbability": 5,
                    "humidity": 62,
                    "windSpeed": 3.1
                }
            },
            "location": { "lat": 52.37, "lon": 4.89 }
        }"#;

        let response: RealtimeResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.data.time.as_deref(), Some("2024-05-01T12:00:00Z"));
        assert!((response.data.values.temperature - 18.4).abs() < f64::EPSILON);
        assert_eq!(response.condition(), Condition::PartlyCloudy);
    }

    #[test]
    fn test_realtime_response_requires_values() {
        let json = r#"{"data": {"time": "2024-05-01T12:00:00Z"}}"#;
        assert!(serde_json::from_str::<RealtimeResponse>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range() {
        assert!(ProviderValues::new(10.0, 101.0, 0.0).validate().is_err());
        assert!(ProviderValues::new(10.0, 50.0, -1.0).validate().is_err());
        assert!(ProviderValues::new(f64::NAN, 50.0, 0.0).validate().is_err());
        assert!(ProviderValues::new(-40.0, 0.0, 100.0).validate().is_ok());
    }

    proptest! {
        #[test]
        fn prop_wet_and_freezing_is_snowy(
            temp in -60.0f64..=0.0,
            cloud in 0.0f64..=100.0,
            precip in 50.001f64..=100.0,
        ) {
            let values = ProviderValues::new(temp, cloud, precip);
            prop_assert_eq!(Condition::classify(&values), Condition::Snowy);
        }

        #[test]
        fn prop_wet_and_above_freezing_is_rainy(
            temp in 0.001f64..=50.0,
            cloud in 0.0f64..=100.0,
            precip in 50.001f64..=100.0,
        ) {
            let values = ProviderValues::new(temp, cloud, precip);
            prop_assert_eq!(Condition::classify(&values), Condition::Rainy);
        }

        #[test]
        fn prop_dry_readings_never_wet(
            temp in -60.0f64..=50.0,
            cloud in 0.0f64..=100.0,
            precip in 0.0f64..=50.0,
        ) {
            let values = ProviderValues::new(temp, cloud, precip);
            prop_assert!(!Condition::classify(&values).is_wet());
        }
    }
}
