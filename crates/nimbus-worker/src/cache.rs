//! Named response caches.
//!
//! Mirrors the browser cache storage model: a set of named caches, each
//! mapping request URLs to responses. Lookups across all caches search them
//! in creation order. Fragments are not part of a cache key.

use std::collections::HashMap;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::network::FetchResponse;

/// Static app shell populated on install.
pub const APP_CACHE: &str = "weather-app-v1";
/// Weather API responses.
pub const API_CACHE: &str = "weather-api-cache-v1";
/// Static assets fetched at runtime.
pub const STATIC_CACHE: &str = "weather-static-cache-v1";
/// Images.
pub const IMAGE_CACHE: &str = "weather-image-cache-v1";

/// Caches that survive activation.
pub const CURRENT_CACHES: [&str; 4] = [APP_CACHE, API_CACHE, STATIC_CACHE, IMAGE_CACHE];

/// Cache key for a URL.
pub fn cache_key(url: &str) -> &str {
    url.split_once('#').map_or(url, |(before, _)| before)
}

#[derive(Debug, Default)]
struct NamedCache {
    name: String,
    entries: HashMap<String, FetchResponse>,
}

/// Entry count of one cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    pub name: String,
    pub entries: usize,
}

/// All named caches.
#[derive(Debug, Default)]
pub struct CacheStorage {
    caches: RwLock<Vec<NamedCache>>,
}

impl CacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create the cache if it does not exist yet.
    pub async fn open(&self, name: &str) {
        let mut caches = self.caches.write().await;
        if !caches.iter().any(|c| c.name == name) {
            caches.push(NamedCache {
                name: name.to_string(),
                entries: HashMap::new(),
            });
        }
    }

    /// Store a response, creating the cache on first use.
    pub async fn put(&self, name: &str, url: &str, response: FetchResponse) {
        let mut caches = self.caches.write().await;
        let key = cache_key(url).to_string();
        match caches.iter_mut().find(|c| c.name == name) {
            Some(cache) => {
                cache.entries.insert(key, response);
            }
            None => {
                let mut entries = HashMap::new();
                entries.insert(key, response);
                caches.push(NamedCache {
                    name: name.to_string(),
                    entries,
                });
            }
        }
        debug!("Cached {} in {}", url, name);
    }

    /// Store several responses at once.
    pub async fn put_all(&self, name: &str, responses: Vec<(String, FetchResponse)>) {
        for (url, response) in responses {
            self.put(name, &url, response).await;
        }
    }

    /// Look up a URL in one cache.
    pub async fn match_in(&self, name: &str, url: &str) -> Option<FetchResponse> {
        let caches = self.caches.read().await;
        caches
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.entries.get(cache_key(url)).cloned())
    }

    /// Look up a URL in every cache, oldest cache first.
    pub async fn match_any(&self, url: &str) -> Option<FetchResponse> {
        let key = cache_key(url);
        let caches = self.caches.read().await;
        caches.iter().find_map(|c| c.entries.get(key).cloned())
    }

    /// Drop a whole cache. Returns `false` if it did not exist.
    pub async fn delete(&self, name: &str) -> bool {
        let mut caches = self.caches.write().await;
        let before = caches.len();
        caches.retain(|c| c.name != name);
        caches.len() != before
    }

    /// Cache names in creation order.
    pub async fn keys(&self) -> Vec<String> {
        self.caches
            .read()
            .await
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    /// Name and entry count of every cache.
    pub async fn inventory(&self) -> Vec<CacheInfo> {
        self.caches
            .read()
            .await
            .iter()
            .map(|c| CacheInfo {
                name: c.name.clone(),
                entries: c.entries.len(),
            })
            .collect()
    }
}
