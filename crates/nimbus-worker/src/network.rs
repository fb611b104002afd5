//! Requests, responses and the network seam.

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// How a request was initiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestMode {
    /// Top-level page navigation.
    Navigate,
    /// Subresource or script fetch.
    #[default]
    Cors,
}

impl fmt::Display for RequestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestMode::Navigate => f.write_str("navigate"),
            RequestMode::Cors => f.write_str("cors"),
        }
    }
}

/// An intercepted GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub url: String,
    pub mode: RequestMode,
}

impl FetchRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RequestMode::Cors,
        }
    }

    pub fn navigate(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mode: RequestMode::Navigate,
        }
    }

    pub fn is_navigation(&self) -> bool {
        self.mode == RequestMode::Navigate
    }
}

/// A response as stored in and served from the caches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Bytes,
}

impl FetchResponse {
    pub fn new(status: u16, content_type: Option<&str>, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type: content_type.map(str::to_string),
            body: body.into(),
        }
    }

    /// A plain-text response.
    pub fn text(status: u16, body: &str) -> Self {
        Self::new(
            status,
            Some("text/plain; charset=utf-8"),
            Bytes::copy_from_slice(body.as_bytes()),
        )
    }

    /// A JSON response.
    pub fn json(status: u16, value: &serde_json::Value) -> Self {
        Self::new(
            status,
            Some("application/json"),
            Bytes::from(value.to_string()),
        )
    }

    /// Status in `200..=299`.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Outbound network access.
#[async_trait]
pub trait Network: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse>;
}

#[cfg(feature = "http")]
pub use http::HttpNetwork;

#[cfg(feature = "http")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;
    use reqwest::Client;
    use reqwest::header::CONTENT_TYPE;
    use tracing::debug;

    use super::{FetchRequest, FetchResponse, Network};
    use crate::error::Result;

    /// Network access over reqwest.
    #[derive(Debug, Clone)]
    pub struct HttpNetwork {
        client: Client,
    }

    impl HttpNetwork {
        pub fn new(timeout: Duration) -> Result<Self> {
            let client = Client::builder().timeout(timeout).build()?;
            Ok(Self { client })
        }

        pub fn with_client(client: Client) -> Self {
            Self { client }
        }
    }

    #[async_trait]
    impl Network for HttpNetwork {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
            debug!("GET {} ({})", request.url, request.mode);
            let response = self.client.get(&request.url).send().await?;
            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await?;
            Ok(FetchResponse {
                status,
                content_type,
                body,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_range() {
        assert!(FetchResponse::text(200, "ok").is_success());
        assert!(FetchResponse::text(204, "").is_success());
        assert!(!FetchResponse::text(304, "").is_success());
        assert!(!FetchResponse::text(503, "").is_success());
    }

    #[test]
    fn test_json_response() {
        let response = FetchResponse::json(503, &serde_json::json!({"error": "x"}));
        assert_eq!(response.content_type.as_deref(), Some("application/json"));
        assert_eq!(&response.body[..], br#"{"error":"x"}"#);
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_network_against_local_server() {
        use axum::Router;
        use axum::http::StatusCode;
        use axum::routing::get;

        let app = Router::new()
            .route("/index.html", get(|| async { "<html></html>" }))
            .route("/missing", get(|| async { (StatusCode::NOT_FOUND, "gone") }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let network = HttpNetwork::new(std::time::Duration::from_secs(5)).unwrap();
        let ok = network
            .fetch(&FetchRequest::navigate(format!("http://{addr}/index.html")))
            .await
            .unwrap();
        assert_eq!(ok.status, 200);
        assert_eq!(&ok.body[..], b"<html></html>");
        assert!(ok.content_type.unwrap().starts_with("text/plain"));

        let missing = network
            .fetch(&FetchRequest::new(format!("http://{addr}/missing")))
            .await
            .unwrap();
        assert_eq!(missing.status, 404);
    }
}
