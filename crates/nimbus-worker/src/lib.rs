//! Offline cache worker for Nimbus.
//!
//! A service-worker style request interceptor backed by named in-process
//! caches:
//!
//! - weather API calls are answered network-first, falling back to the
//!   last cached response and finally a synthesized 503 JSON error;
//! - images are served stale-while-revalidate;
//! - everything else is cache-first, with offline navigations answered by
//!   the cached app shell.
//!
//! The worker installs by pre-caching a static manifest, deletes outdated
//! caches on activation and only intercepts once active. Clients subscribe
//! to a broadcast channel that carries `OFFLINE_STATUS` messages.

pub mod cache;
pub mod error;
pub mod lifecycle;
pub mod manifest;
pub mod message;
pub mod network;
pub mod strategy;
pub mod worker;

pub use cache::{
    API_CACHE, APP_CACHE, CURRENT_CACHES, CacheInfo, CacheStorage, IMAGE_CACHE, STATIC_CACHE,
};
pub use error::{Error, Result};
pub use lifecycle::WorkerState;
pub use manifest::{APP_SHELL, DEFAULT_MANIFEST, default_manifest, resolve_manifest, resolve_url};
pub use message::WorkerMessage;
#[cfg(feature = "http")]
pub use network::HttpNetwork;
pub use network::{FetchRequest, FetchResponse, Network, RequestMode};
pub use strategy::{OFFLINE_PLACEHOLDER, Strategy};
pub use worker::{CacheWorker, FetchOutcome, WorkerConfig, WorkerStatus};
