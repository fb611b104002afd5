//! Cache strategies.
//!
//! Each strategy always produces a response: a fresh one, a cached copy or
//! a synthesized fallback. None of them return errors.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use nimbus_types::RequestKind;

use crate::cache::{API_CACHE, CacheStorage, IMAGE_CACHE, STATIC_CACHE};
use crate::network::{FetchRequest, FetchResponse, Network};

/// Body of the placeholder served when nothing else is available.
pub const OFFLINE_PLACEHOLDER: &str = "Resource not available offline";

/// How a request was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    NetworkFirst,
    StaleWhileRevalidate,
    CacheFirst,
    /// Not intercepted; sent straight to the network.
    Passthrough,
}

impl Strategy {
    /// The strategy for a classified request.
    pub fn for_kind(kind: RequestKind) -> Self {
        match kind {
            RequestKind::Api => Strategy::NetworkFirst,
            RequestKind::Image => Strategy::StaleWhileRevalidate,
            RequestKind::Static => Strategy::CacheFirst,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::NetworkFirst => "network-first",
            Strategy::StaleWhileRevalidate => "stale-while-revalidate",
            Strategy::CacheFirst => "cache-first",
            Strategy::Passthrough => "passthrough",
        };
        f.write_str(name)
    }
}

/// Synthesized API response when neither network nor cache can answer.
pub fn offline_api_response() -> FetchResponse {
    FetchResponse::json(
        503,
        &json!({
            "error": "NetworkError",
            "message": "No internet connection",
        }),
    )
}

/// Placeholder for assets unavailable offline.
pub fn offline_placeholder() -> FetchResponse {
    FetchResponse::text(404, OFFLINE_PLACEHOLDER)
}

/// Network, then cache, then a synthesized 503.
pub async fn network_first(
    cache: &CacheStorage,
    network: &dyn Network,
    request: &FetchRequest,
) -> FetchResponse {
    match network.fetch(request).await {
        Ok(response) if response.is_success() => {
            cache.put(API_CACHE, &request.url, response.clone()).await;
            return response;
        }
        Ok(response) => debug!(
            "API returned {} for {}, trying cache",
            response.status, request.url
        ),
        Err(e) => debug!("API fetch failed for {}: {}, trying cache", request.url, e),
    }

    match cache.match_any(&request.url).await {
        Some(cached) => {
            debug!("Serving cached API response for {}", request.url);
            cached
        }
        None => offline_api_response(),
    }
}

/// Cache, then network. Navigations fall back to the app shell.
pub async fn cache_first(
    cache: &CacheStorage,
    network: &dyn Network,
    request: &FetchRequest,
    shell_url: &str,
) -> FetchResponse {
    if let Some(cached) = cache.match_any(&request.url).await {
        return cached;
    }

    match network.fetch(request).await {
        Ok(response) => {
            if response.is_success() {
                cache
                    .put(STATIC_CACHE, &request.url, response.clone())
                    .await;
            }
            response
        }
        Err(e) => {
            debug!("Fetch failed for {}: {}", request.url, e);
            if request.is_navigation()
                && let Some(shell) = cache.match_any(shell_url).await
            {
                return shell;
            }
            offline_placeholder()
        }
    }
}

/// Result of a stale-while-revalidate lookup.
#[derive(Debug)]
pub struct Revalidated {
    pub response: FetchResponse,
    /// Background refresh started when a cached copy was served.
    pub refresh: Option<JoinHandle<()>>,
}

/// Serve the cached copy now and refresh it in the background.
pub async fn stale_while_revalidate(
    cache: Arc<CacheStorage>,
    network: Arc<dyn Network>,
    request: FetchRequest,
) -> Revalidated {
    match cache.match_any(&request.url).await {
        Some(cached) => {
            let refresh = tokio::spawn(async move {
                refresh_image(&cache, network.as_ref(), &request).await;
            });
            Revalidated {
                response: cached,
                refresh: Some(refresh),
            }
        }
        None => Revalidated {
            response: refresh_image(&cache, network.as_ref(), &request)
                .await
                .unwrap_or_else(offline_placeholder),
            refresh: None,
        },
    }
}

async fn refresh_image(
    cache: &CacheStorage,
    network: &dyn Network,
    request: &FetchRequest,
) -> Option<FetchResponse> {
    match network.fetch(request).await {
        Ok(response) => {
            if response.is_success() {
                cache.put(IMAGE_CACHE, &request.url, response.clone()).await;
            }
            Some(response)
        }
        Err(e) => {
            warn!("Image refresh failed for {}: {}", request.url, e);
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::error::{Error, Result};

    /// Network answering from a URL table; unknown URLs fail.
    #[derive(Default)]
    pub(crate) struct MockNetwork {
        routes: Mutex<HashMap<String, FetchResponse>>,
        calls: AtomicUsize,
    }

    impl MockNetwork {
        pub(crate) fn route(&self, url: &str, response: FetchResponse) {
            self.routes.lock().unwrap().insert(url.to_string(), response);
        }

        pub(crate) fn go_offline(&self) {
            self.routes.lock().unwrap().clear();
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Network for MockNetwork {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.routes
                .lock()
                .unwrap()
                .get(&request.url)
                .cloned()
                .ok_or_else(|| Error::network("offline"))
        }
    }

    const API: &str = "https://api.tomorrow.io/v4/weather/realtime?location=1,2";
    const PAGE: &str = "https://nimbus.test/about.html";
    const SHELL: &str = "https://nimbus.test/index.html";
    const IMAGE: &str = "https://nimbus.test/images/sky.png";

    #[tokio::test]
    async fn test_network_first_caches_success() {
        let cache = CacheStorage::new();
        let network = MockNetwork::default();
        network.route(API, FetchResponse::text(200, "fresh"));

        let response = network_first(&cache, &network, &FetchRequest::new(API)).await;
        assert_eq!(&response.body[..], b"fresh");
        assert!(cache.match_in(API_CACHE, API).await.is_some());
    }

    #[tokio::test]
    async fn test_network_first_falls_back_to_cache() {
        let cache = CacheStorage::new();
        cache
            .put(API_CACHE, API, FetchResponse::text(200, "stale"))
            .await;
        let network = MockNetwork::default();
        network.route(API, FetchResponse::text(500, "boom"));

        let response = network_first(&cache, &network, &FetchRequest::new(API)).await;
        assert_eq!(&response.body[..], b"stale");

        network.go_offline();
        let response = network_first(&cache, &network, &FetchRequest::new(API)).await;
        assert_eq!(&response.body[..], b"stale");
    }

    #[tokio::test]
    async fn test_network_first_synthesizes_error() {
        let cache = CacheStorage::new();
        let network = MockNetwork::default();

        let response = network_first(&cache, &network, &FetchRequest::new(API)).await;
        assert_eq!(response.status, 503);
        let body: serde_json::Value = serde_json::from_slice(&response.body).unwrap();
        assert_eq!(body["error"], "NetworkError");
        assert_eq!(body["message"], "No internet connection");
    }

    #[tokio::test]
    async fn test_cache_first_prefers_cache() {
        let cache = CacheStorage::new();
        cache
            .put(STATIC_CACHE, PAGE, FetchResponse::text(200, "cached"))
            .await;
        let network = MockNetwork::default();
        network.route(PAGE, FetchResponse::text(200, "network"));

        let response = cache_first(&cache, &network, &FetchRequest::new(PAGE), SHELL).await;
        assert_eq!(&response.body[..], b"cached");
        assert_eq!(network.calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_first_does_not_cache_errors() {
        let cache = CacheStorage::new();
        let network = MockNetwork::default();
        network.route(PAGE, FetchResponse::text(404, "not here"));

        let response = cache_first(&cache, &network, &FetchRequest::new(PAGE), SHELL).await;
        assert_eq!(response.status, 404);
        assert_eq!(&response.body[..], b"not here");
        assert!(cache.match_any(PAGE).await.is_none());
    }

    #[tokio::test]
    async fn test_cache_first_offline_fallbacks() {
        let cache = CacheStorage::new();
        cache
            .put(crate::cache::APP_CACHE, SHELL, FetchResponse::text(200, "shell"))
            .await;
        let network = MockNetwork::default();

        let nav = cache_first(&cache, &network, &FetchRequest::navigate(PAGE), SHELL).await;
        assert_eq!(&nav.body[..], b"shell");

        let sub = cache_first(&cache, &network, &FetchRequest::new(PAGE), SHELL).await;
        assert_eq!(sub.status, 404);
        assert_eq!(&sub.body[..], OFFLINE_PLACEHOLDER.as_bytes());
    }

    #[tokio::test]
    async fn test_swr_serves_stale_then_refreshes() {
        let cache = Arc::new(CacheStorage::new());
        cache
            .put(IMAGE_CACHE, IMAGE, FetchResponse::text(200, "old"))
            .await;
        let network = Arc::new(MockNetwork::default());
        network.route(IMAGE, FetchResponse::text(200, "new"));

        let outcome =
            stale_while_revalidate(cache.clone(), network.clone(), FetchRequest::new(IMAGE)).await;
        assert_eq!(&outcome.response.body[..], b"old");

        outcome.refresh.unwrap().await.unwrap();
        let refreshed = cache.match_in(IMAGE_CACHE, IMAGE).await.unwrap();
        assert_eq!(&refreshed.body[..], b"new");
    }

    #[tokio::test]
    async fn test_swr_without_cache_waits_for_network() {
        let cache = Arc::new(CacheStorage::new());
        let network = Arc::new(MockNetwork::default());
        network.route(IMAGE, FetchResponse::text(200, "png"));

        let outcome =
            stale_while_revalidate(cache.clone(), network.clone(), FetchRequest::new(IMAGE)).await;
        assert_eq!(&outcome.response.body[..], b"png");
        assert!(outcome.refresh.is_none());
        assert!(cache.match_in(IMAGE_CACHE, IMAGE).await.is_some());

        network.go_offline();
        let other = "https://nimbus.test/images/none.png";
        let outcome = stale_while_revalidate(cache, network, FetchRequest::new(other)).await;
        assert_eq!(outcome.response.status, 404);
    }

    #[test]
    fn test_strategy_for_kind() {
        assert_eq!(Strategy::for_kind(RequestKind::Api), Strategy::NetworkFirst);
        assert_eq!(
            Strategy::for_kind(RequestKind::Image),
            Strategy::StaleWhileRevalidate
        );
        assert_eq!(Strategy::for_kind(RequestKind::Static), Strategy::CacheFirst);
        assert_eq!(Strategy::CacheFirst.to_string(), "cache-first");
    }
}
