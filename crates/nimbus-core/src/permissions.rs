//! Permission gateway for location, camera and notifications.
//!
//! Probing asks the platform for the current state without prompting.
//! Requesting may prompt the user, but a denial is final for the session:
//! later requests return `Denied` without prompting again. Only a fresh
//! probe (for example on the next load) can observe a change made in the
//! platform settings.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use nimbus_types::{Capability, PermissionState};

use crate::error::Result;

/// Permission state as the platform reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformPermission {
    Granted,
    Denied,
    /// The platform would ask the user.
    Prompt,
}

/// Platform permission API.
#[async_trait]
pub trait PermissionBackend: Send + Sync {
    /// Current state, without prompting.
    async fn query(&self, capability: Capability) -> Result<PlatformPermission>;

    /// Ask the user.
    async fn prompt(&self, capability: Capability) -> Result<PlatformPermission>;
}

/// Tracks permission state for the session.
pub struct PermissionGateway {
    backend: Arc<dyn PermissionBackend>,
    states: RwLock<HashMap<Capability, PermissionState>>,
}

impl std::fmt::Debug for PermissionGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermissionGateway").finish_non_exhaustive()
    }
}

impl PermissionGateway {
    pub fn new(backend: Arc<dyn PermissionBackend>) -> Self {
        Self {
            backend,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// Last known state of a capability.
    pub async fn state(&self, capability: Capability) -> PermissionState {
        self.states
            .read()
            .await
            .get(&capability)
            .copied()
            .unwrap_or_default()
    }

    /// Snapshot of all capabilities.
    pub async fn states(&self) -> Vec<(Capability, PermissionState)> {
        let states = self.states.read().await;
        Capability::ALL
            .iter()
            .map(|c| (*c, states.get(c).copied().unwrap_or_default()))
            .collect()
    }

    /// Query the platform without prompting.
    pub async fn probe(&self, capability: Capability) -> PermissionState {
        let state = match self.backend.query(capability).await {
            Ok(PlatformPermission::Granted) => PermissionState::Granted,
            Ok(PlatformPermission::Denied) => PermissionState::Denied,
            Ok(PlatformPermission::Prompt) => PermissionState::Unknown,
            Err(e) => {
                warn!("Failed to query {} permission: {}", capability, e);
                PermissionState::Unknown
            }
        };
        debug!("Probed {} permission: {:?}", capability, state);
        self.states.write().await.insert(capability, state);
        state
    }

    /// Probe every capability.
    pub async fn probe_all(&self) -> Vec<(Capability, PermissionState)> {
        let mut out = Vec::with_capacity(Capability::ALL.len());
        for capability in Capability::ALL {
            out.push((capability, self.probe(capability).await));
        }
        out
    }

    /// Request a capability, prompting if its state is still unknown.
    ///
    /// A dismissed prompt or a prompt error counts as a denial.
    pub async fn request(&self, capability: Capability) -> PermissionState {
        let current = self.state(capability).await;
        if current != PermissionState::Unknown {
            debug!(
                "{} permission already {:?}, not prompting",
                capability, current
            );
            return current;
        }

        let state = match self.backend.prompt(capability).await {
            Ok(PlatformPermission::Granted) => PermissionState::Granted,
            Ok(PlatformPermission::Denied | PlatformPermission::Prompt) => PermissionState::Denied,
            Err(e) => {
                warn!("{} permission request failed: {}", capability, e);
                PermissionState::Denied
            }
        };
        info!("{}", state.label(capability));
        self.states.write().await.insert(capability, state);
        state
    }

    /// Status label for a capability.
    pub async fn label(&self, capability: Capability) -> String {
        self.state(capability).await.label(capability)
    }
}

/// A backend with fixed answers, for tests and headless use.
#[derive(Debug)]
pub struct StaticPermissions {
    current: std::sync::RwLock<HashMap<Capability, PlatformPermission>>,
    answers: std::sync::RwLock<HashMap<Capability, PlatformPermission>>,
    prompts: AtomicUsize,
}

impl Default for StaticPermissions {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticPermissions {
    /// Everything in the prompt state; every prompt is granted.
    pub fn new() -> Self {
        Self {
            current: std::sync::RwLock::new(HashMap::new()),
            answers: std::sync::RwLock::new(HashMap::new()),
            prompts: AtomicUsize::new(0),
        }
    }

    /// Everything already granted.
    pub fn granted() -> Self {
        let perms = Self::new();
        for capability in Capability::ALL {
            perms.set_current(capability, PlatformPermission::Granted);
        }
        perms
    }

    /// Set what a probe reports (an out-of-band settings change).
    pub fn set_current(&self, capability: Capability, permission: PlatformPermission) {
        self.current
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(capability, permission);
    }

    /// Set how the user answers a prompt.
    pub fn set_answer(&self, capability: Capability, permission: PlatformPermission) {
        self.answers
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(capability, permission);
    }

    /// Number of prompts shown so far.
    pub fn prompt_count(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionBackend for StaticPermissions {
    async fn query(&self, capability: Capability) -> Result<PlatformPermission> {
        Ok(self
            .current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&capability)
            .copied()
            .unwrap_or(PlatformPermission::Prompt))
    }

    async fn prompt(&self, capability: Capability) -> Result<PlatformPermission> {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        let answer = self
            .answers
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&capability)
            .copied()
            .unwrap_or(PlatformPermission::Granted);
        self.set_current(capability, answer);
        Ok(answer)
    }
}
