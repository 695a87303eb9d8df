//! Project update notifications.
//!
//! The workspace calls `EventEmitter::project_updated` exactly once per
//! completed reload, from the thread that ran it. Updates for one project are
//! emitted in publish order; different projects are not ordered relative to
//! each other.

use crate::project::ProjectId;
use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UpdateOutcome {
    /// A new snapshot was published.
    Published { version: u64 },
    /// The reload failed; the previous snapshot is still current.
    Degraded { version: u64, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One completed reload.
pub struct ProjectUpdate {
    pub project: ProjectId,
    /// Per-project count of completed reloads, starting at 1.
    pub sequence: u64,
    pub outcome: UpdateOutcome,
}

impl ProjectUpdate {
    pub fn is_published(&self) -> bool {
        matches!(self.outcome, UpdateOutcome::Published { .. })
    }
}

pub trait EventEmitter: Send + Sync {
    fn project_updated(&self, update: &ProjectUpdate);
}

/// Emitter that drops every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmitter;

impl EventEmitter for NullEmitter {
    fn project_updated(&self, _update: &ProjectUpdate) {}
}

/// Fans updates out to per-project subscribers.
#[derive(Debug, Default)]
pub struct UpdateBroadcaster {
    subscribers: Mutex<HashMap<ProjectId, Vec<Sender<ProjectUpdate>>>>,
}

impl UpdateBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive every update for `project` emitted after this call.
    pub fn subscribe(&self, project: &ProjectId) -> UpdateWaiter {
        let (tx, rx) = unbounded();
        self.subscribers
            .lock()
            .entry(project.clone())
            .or_default()
            .push(tx);
        UpdateWaiter { rx }
    }
}

impl EventEmitter for UpdateBroadcaster {
    fn project_updated(&self, update: &ProjectUpdate) {
        let mut subs = self.subscribers.lock();
        if let Some(list) = subs.get_mut(&update.project) {
            // Dropped waiters are pruned here.
            list.retain(|tx| tx.send(update.clone()).is_ok());
        }
    }
}

/// Blocking handle over one subscription.
#[derive(Debug)]
pub struct UpdateWaiter {
    rx: Receiver<ProjectUpdate>,
}

impl UpdateWaiter {
    /// Next update, or `None` if none arrives within `timeout`.
    pub fn wait(&self, timeout: Duration) -> Option<ProjectUpdate> {
        match self.rx.recv_timeout(timeout) {
            Ok(u) => Some(u),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Update already delivered, without blocking.
    pub fn try_next(&self) -> Option<ProjectUpdate> {
        self.rx.try_recv().ok()
    }
}
