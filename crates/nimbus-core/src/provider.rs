//! HTTP weather provider.
//!
//! Talks to a realtime endpoint with the query shape
//! `?location={lat},{lon}&fields=...&units=metric&apikey={key}` and returns
//! the JSON envelope as received.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use nimbus_types::Location;

use crate::error::{Error, Result};
use crate::weather::WeatherProvider;

/// Default realtime endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.tomorrow.io/v4/weather/realtime";

/// Provider fields needed for classification.
pub const REQUESTED_FIELDS: &str = "temperature,cloudCover,precipitationProbability";

/// Weather provider backed by an HTTP API.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpProvider {
    /// Create a provider for `base_url` authenticated with `api_key`.
    pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Self::with_client(base_url, api_key, client)
    }

    /// Create a provider with a custom reqwest Client.
    pub fn with_client(base_url: &str, api_key: impl Into<String>, client: Client) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(Error::invalid_config(format!(
                "weather base URL must start with http:// or https://, got: {}",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            api_key: api_key.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl WeatherProvider for HttpProvider {
    fn name(&self) -> &str {
        "http"
    }

    async fn fetch_realtime(&self, location: &Location) -> Result<Value> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("location", location.query_param().as_str()),
                ("fields", REQUESTED_FIELDS),
                ("units", "metric"),
                ("apikey", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::ProviderStatus {
                status: status.as_u16(),
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| Error::malformed(e.to_string()))
    }
}
