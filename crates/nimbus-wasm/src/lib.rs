//! WebAssembly bindings for the Nimbus browser app.
//!
//! Exposes the same condition classification, request routing and history
//! filtering the native crates use, so the page and its service worker agree
//! with the server on every rule.
//!
//! Timestamps cross the boundary as milliseconds since the Unix epoch
//! (`Date.now()`), and structured values as JSON strings.

use nimbus_types::{
    Condition, HistoryEntry, Period, ProviderValues, RealtimeResponse, RequestKind,
    RouteClassifier, WeatherSample,
};
use time::OffsetDateTime;
use wasm_bindgen::prelude::*;

/// Initialize the WASM module (called automatically)
#[wasm_bindgen(start)]
pub fn init() {
    log("Nimbus WASM module initialized");
}

/// Log a message to the browser console
#[wasm_bindgen]
pub fn log(message: &str) {
    web_sys::console::log_1(&message.into());
}

/// Condition label ("Sunny", "Partly Cloudy", ...) for raw provider values.
#[wasm_bindgen(js_name = classifyCondition)]
pub fn classify_condition(
    temperature: f64,
    cloud_cover: f64,
    precipitation_probability: f64,
) -> String {
    Condition::classify(&ProviderValues::new(
        temperature,
        cloud_cover,
        precipitation_probability,
    ))
    .label()
    .to_string()
}

/// Parse a realtime API response into a weather sample (JSON).
#[wasm_bindgen(js_name = parseRealtime)]
pub fn parse_realtime(json: &str, now_ms: f64) -> Result<String, JsValue> {
    realtime_sample(json, now_ms).map_err(|e| JsValue::from_str(&e))
}

/// Keep the history entries (JSON array) inside `period` ending at `now_ms`.
#[wasm_bindgen(js_name = filterHistory)]
pub fn filter_history(entries_json: &str, period: &str, now_ms: f64) -> Result<String, JsValue> {
    history_in_period(entries_json, period, now_ms).map_err(|e| JsValue::from_str(&e))
}

/// Routes service-worker requests to a cache strategy.
#[wasm_bindgen]
pub struct RequestRouter {
    classifier: RouteClassifier,
}

#[wasm_bindgen]
impl RequestRouter {
    /// Router for the given API hosts; an empty list means the default host.
    #[wasm_bindgen(constructor)]
    pub fn new(api_hosts: Vec<String>) -> RequestRouter {
        let classifier = if api_hosts.is_empty() {
            RouteClassifier::default()
        } else {
            RouteClassifier::new(api_hosts)
        };
        RequestRouter { classifier }
    }

    /// "api", "image" or "static".
    pub fn classify(&self, url: &str) -> String {
        self.classifier.classify(url).to_string()
    }

    /// Name of the strategy serving `url`.
    pub fn strategy(&self, url: &str) -> String {
        strategy_name(self.classifier.classify(url)).to_string()
    }
}

fn strategy_name(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::Api => "network-first",
        RequestKind::Image => "stale-while-revalidate",
        RequestKind::Static => "cache-first",
    }
}

fn timestamp_from_ms(ms: f64) -> Result<OffsetDateTime, String> {
    if !ms.is_finite() {
        return Err(format!("invalid timestamp: {ms}"));
    }
    OffsetDateTime::from_unix_timestamp_nanos(ms as i128 * 1_000_000).map_err(|e| e.to_string())
}

fn realtime_sample(json: &str, now_ms: f64) -> Result<String, String> {
    let response: RealtimeResponse = serde_json::from_str(json).map_err(|e| e.to_string())?;
    response.data.values.validate().map_err(|e| e.to_string())?;
    let sample = WeatherSample::from_values(&response.data.values, timestamp_from_ms(now_ms)?);
    serde_json::to_string(&sample).map_err(|e| e.to_string())
}

fn history_in_period(entries_json: &str, period: &str, now_ms: f64) -> Result<String, String> {
    let period: Period = period.parse().map_err(|e: nimbus_types::ParseError| e.to_string())?;
    let now = timestamp_from_ms(now_ms)?;
    let entries: Vec<HistoryEntry> =
        serde_json::from_str(entries_json).map_err(|e| e.to_string())?;
    let kept: Vec<HistoryEntry> = entries
        .into_iter()
        .filter(|e| period.contains(e.timestamp, now))
        .collect();
    serde_json::to_string(&kept).map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW_MS: f64 = 1_714_564_800_000.0;

    #[test]
    fn test_classify_condition() {
        assert_eq!(classify_condition(20.0, 10.0, 0.0), "Sunny");
        assert_eq!(classify_condition(20.0, 50.0, 0.0), "Partly Cloudy");
        assert_eq!(classify_condition(-2.0, 90.0, 80.0), "Snowy");
    }

    #[test]
    fn test_router() {
        let router = RequestRouter::new(Vec::new());
        let api = "https://api.tomorrow.io/v4/weather/realtime?location=1,2";
        assert_eq!(router.classify(api), "api");
        assert_eq!(router.strategy(api), "network-first");
        assert_eq!(router.strategy("./icons/sun.png"), "stale-while-revalidate");
        assert_eq!(router.strategy("./app.js"), "cache-first");

        let custom = RequestRouter::new(vec!["weather.example".into()]);
        assert_eq!(custom.classify(api), "static");
        assert_eq!(custom.classify("https://eu.weather.example/now"), "api");
    }

    #[test]
    fn test_realtime_sample() {
        let json = r#"{"data":{"values":{"temperature":3.4,"cloudCover":80,"precipitationProbability":10}}}"#;
        let sample: serde_json::Value =
            serde_json::from_str(&realtime_sample(json, NOW_MS).unwrap()).unwrap();
        assert_eq!(sample["condition"], "Cloudy");
        assert_eq!(sample["timestamp"], "2024-05-01T12:00:00Z");

        let bad = r#"{"data":{"values":{"temperature":3.4,"cloudCover":180}}}"#;
        assert!(realtime_sample(bad, NOW_MS).is_err());
        assert!(realtime_sample("{}", NOW_MS).is_err());
        assert!(realtime_sample(json, f64::NAN).is_err());
    }

    #[test]
    fn test_history_in_period_is_inclusive() {
        let entries = r#"[
            {"id":"a","temperature":10.0,"condition":"Sunny","timestamp":"2024-05-01T11:00:00Z"},
            {"id":"b","temperature":9.0,"condition":"Cloudy","timestamp":"2024-04-30T12:00:00Z"},
            {"id":"c","temperature":8.0,"condition":"Rainy","timestamp":"2024-04-28T12:00:00Z"}
        ]"#;

        let day: Vec<HistoryEntry> =
            serde_json::from_str(&history_in_period(entries, "day", NOW_MS).unwrap()).unwrap();
        let ids: Vec<_> = day.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);

        let week: Vec<HistoryEntry> =
            serde_json::from_str(&history_in_period(entries, "week", NOW_MS).unwrap()).unwrap();
        assert_eq!(week.len(), 3);

        assert!(history_in_period(entries, "year", NOW_MS).is_err());
    }
}
