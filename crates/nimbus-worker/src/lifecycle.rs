//! Worker lifecycle states.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of the cache worker.
///
/// `Installing → Waiting → Activated → Active`. With skip-waiting the
/// worker moves from install directly through activation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    #[default]
    Installing,
    Waiting,
    Activated,
    Active,
}

impl WorkerState {
    /// The state that follows this one, if any.
    pub fn next(self) -> Option<WorkerState> {
        match self {
            WorkerState::Installing => Some(WorkerState::Waiting),
            WorkerState::Waiting => Some(WorkerState::Activated),
            WorkerState::Activated => Some(WorkerState::Active),
            WorkerState::Active => None,
        }
    }

    pub fn can_transition_to(self, to: WorkerState) -> bool {
        self.next() == Some(to)
    }

    /// Whether fetches go through the cache strategies.
    pub fn intercepts(self) -> bool {
        self == WorkerState::Active
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WorkerState::Installing => "installing",
            WorkerState::Waiting => "waiting",
            WorkerState::Activated => "activated",
            WorkerState::Active => "active",
        };
        f.write_str(name)
    }
}
