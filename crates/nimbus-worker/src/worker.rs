//! The cache worker: lifecycle, fetch interception and client messaging.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use nimbus_types::{DEFAULT_API_HOST, RouteClassifier};

use crate::cache::{APP_CACHE, CURRENT_CACHES, CacheInfo, CacheStorage};
use crate::error::{Error, Result};
use crate::lifecycle::WorkerState;
use crate::manifest::{APP_SHELL, default_manifest, resolve_manifest, resolve_url};
use crate::message::WorkerMessage;
use crate::network::{FetchRequest, FetchResponse, Network};
use crate::strategy::{self, Strategy};

/// Capacity of the client broadcast channel.
pub const CLIENT_CHANNEL_CAPACITY: usize = 64;

/// Worker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Base URL relative requests and the manifest resolve against.
    pub origin: String,
    pub api_hosts: Vec<String>,
    pub manifest: Vec<String>,
    /// Activate immediately after install.
    pub skip_waiting: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            origin: "http://127.0.0.1:8080/".to_string(),
            api_hosts: vec![DEFAULT_API_HOST.to_string()],
            manifest: default_manifest(),
            skip_waiting: false,
        }
    }
}

/// Result of an intercepted fetch.
#[derive(Debug)]
pub struct FetchOutcome {
    pub response: FetchResponse,
    pub strategy: Strategy,
    /// Background image refresh, if one was started.
    pub refresh: Option<JoinHandle<()>>,
}

/// Lifecycle state and cache inventory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerStatus {
    pub state: WorkerState,
    pub caches: Vec<CacheInfo>,
}

/// Offline cache worker.
pub struct CacheWorker {
    config: WorkerConfig,
    classifier: RouteClassifier,
    cache: Arc<CacheStorage>,
    network: Arc<dyn Network>,
    state: RwLock<WorkerState>,
    clients: broadcast::Sender<WorkerMessage>,
}

impl std::fmt::Debug for CacheWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheWorker")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CacheWorker {
    pub fn new(config: WorkerConfig, network: Arc<dyn Network>) -> Self {
        let (clients, _) = broadcast::channel(CLIENT_CHANNEL_CAPACITY);
        Self {
            classifier: RouteClassifier::new(&config.api_hosts),
            config,
            cache: Arc::new(CacheStorage::new()),
            network,
            state: RwLock::new(WorkerState::Installing),
            clients,
        }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CacheStorage> {
        &self.cache
    }

    pub async fn state(&self) -> WorkerState {
        *self.state.read().await
    }

    pub async fn status(&self) -> WorkerStatus {
        WorkerStatus {
            state: self.state().await,
            caches: self.cache.inventory().await,
        }
    }

    /// Subscribe to messages broadcast to clients.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkerMessage> {
        self.clients.subscribe()
    }

    async fn transition(&self, to: WorkerState) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.can_transition_to(to) {
            return Err(Error::InvalidTransition { from: *state, to });
        }
        info!("Cache worker {} -> {}", *state, to);
        *state = to;
        Ok(())
    }

    /// Pre-populate the app cache from the manifest and move to `Waiting`.
    ///
    /// Population is all-or-nothing: if any asset fails nothing is stored.
    /// A failed population is logged and does not stop the lifecycle.
    /// With `skip_waiting` the worker continues straight into activation.
    pub async fn install(&self) -> Result<()> {
        let current = self.state().await;
        if current != WorkerState::Installing {
            return Err(Error::InvalidTransition {
                from: current,
                to: WorkerState::Waiting,
            });
        }

        match self.fetch_manifest().await {
            Ok(assets) => {
                let count = assets.len();
                self.cache.open(APP_CACHE).await;
                self.cache.put_all(APP_CACHE, assets).await;
                info!("Cached {} static assets", count);
            }
            Err(e) => error!("Cache installation failed: {}", e),
        }

        self.transition(WorkerState::Waiting).await?;
        if self.config.skip_waiting {
            self.activate().await?;
        }
        Ok(())
    }

    async fn fetch_manifest(&self) -> Result<Vec<(String, FetchResponse)>> {
        let urls = resolve_manifest(&self.config.origin, &self.config.manifest)?;
        let fetches = urls.iter().map(|url| {
            let request = FetchRequest::new(url.clone());
            let network = self.network.clone();
            async move { network.fetch(&request).await }
        });

        let mut assets = Vec::with_capacity(urls.len());
        for (url, result) in urls.iter().zip(join_all(fetches).await) {
            let response = result?;
            if !response.is_success() {
                return Err(Error::network(format!(
                    "{} returned status {}",
                    url, response.status
                )));
            }
            assets.push((url.clone(), response));
        }
        Ok(assets)
    }

    /// Delete caches not in the current set and start intercepting fetches.
    ///
    /// Returns the names of the deleted caches.
    pub async fn activate(&self) -> Result<Vec<String>> {
        self.transition(WorkerState::Activated).await?;

        let mut deleted = Vec::new();
        for name in self.cache.keys().await {
            if !CURRENT_CACHES.contains(&name.as_str()) && self.cache.delete(&name).await {
                info!("Deleting old cache: {}", name);
                deleted.push(name);
            }
        }

        self.transition(WorkerState::Active).await?;
        Ok(deleted)
    }

    /// Install, then activate if not already activated by skip-waiting.
    pub async fn start(&self) -> Result<()> {
        self.install().await?;
        if self.state().await == WorkerState::Waiting {
            self.activate().await?;
        }
        Ok(())
    }

    /// Answer a request.
    ///
    /// Before the worker is active requests go straight to the network and
    /// network errors are returned. Once active exactly one strategy
    /// answers each request and no error is returned.
    pub async fn handle_fetch(&self, request: FetchRequest) -> Result<FetchOutcome> {
        let request = FetchRequest {
            url: resolve_url(&self.config.origin, &request.url)?,
            mode: request.mode,
        };

        if !self.state().await.intercepts() {
            debug!("Worker not active, passing {} through", request.url);
            let response = self.network.fetch(&request).await?;
            return Ok(FetchOutcome {
                response,
                strategy: Strategy::Passthrough,
                refresh: None,
            });
        }

        let strategy = Strategy::for_kind(self.classifier.classify(&request.url));
        debug!("{} {}", strategy, request.url);
        let outcome = match strategy {
            Strategy::NetworkFirst => FetchOutcome {
                response: strategy::network_first(&self.cache, self.network.as_ref(), &request)
                    .await,
                strategy,
                refresh: None,
            },
            Strategy::StaleWhileRevalidate => {
                let revalidated = strategy::stale_while_revalidate(
                    self.cache.clone(),
                    self.network.clone(),
                    request,
                )
                .await;
                FetchOutcome {
                    response: revalidated.response,
                    strategy,
                    refresh: revalidated.refresh,
                }
            }
            Strategy::CacheFirst | Strategy::Passthrough => {
                let shell = resolve_url(&self.config.origin, APP_SHELL)?;
                FetchOutcome {
                    response: strategy::cache_first(
                        &self.cache,
                        self.network.as_ref(),
                        &request,
                        &shell,
                    )
                    .await,
                    strategy: Strategy::CacheFirst,
                    refresh: None,
                }
            }
        };
        Ok(outcome)
    }

    /// Handle a message from a client.
    ///
    /// `OFFLINE_STATUS` is rebroadcast to every client; anything else is
    /// ignored. Returns the number of clients reached.
    pub fn handle_message(&self, value: &serde_json::Value) -> usize {
        let Some(message) = WorkerMessage::parse(value) else {
            return 0;
        };
        match self.clients.send(message) {
            Ok(receivers) => {
                debug!("Broadcast {:?} to {} clients", message, receivers);
                receivers
            }
            Err(_) => {
                warn!("No clients to receive {:?}", message);
                0
            }
        }
    }
}
