//! Queued retries produced by failed remote calls.
//!
//! When a create or update fails, the optimistic state is retained and the
//! remote half of the mutation parks here until the host drains the queue
//! with `ListSession::flush_pending`. The queue is deduplicated by target:
//! one create per surrogate id, one update per canonical id (latest value
//! wins).

use crate::{LocalId, RemoteId};
use serde::{Deserialize, Serialize};

/// A remote mutation that failed and is waiting to be retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PendingChange {
    /// Re-send the create for an item still under its surrogate id.
    #[serde(rename_all = "camelCase")]
    Create { local_id: LocalId, title: String },
    /// Re-send the completed flag for a canonical item.
    Update { id: RemoteId, completed: bool },
}

/// Ordered, deduplicated buffer of pending changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingQueue {
    changes: Vec<PendingChange>,
}

impl PendingQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a create retry for a surrogate id. No-op if one is already
    /// queued for the same id.
    pub fn queue_create(&mut self, local_id: LocalId, title: impl Into<String>) {
        let exists = self.changes.iter().any(
            |c| matches!(c, PendingChange::Create { local_id: queued, .. } if *queued == local_id),
        );
        if !exists {
            self.changes.push(PendingChange::Create {
                local_id,
                title: title.into(),
            });
        }
    }

    /// Queue an update retry for a canonical id, replacing any earlier
    /// queued value for the same id.
    pub fn queue_update(&mut self, id: RemoteId, completed: bool) {
        for change in &mut self.changes {
            if let PendingChange::Update { id: queued, completed: value } = change {
                if *queued == id {
                    *value = completed;
                    return;
                }
            }
        }
        self.changes.push(PendingChange::Update { id, completed });
    }

    /// Drop a queued create, returning whether one was present.
    pub fn cancel_create(&mut self, local_id: LocalId) -> bool {
        let before = self.changes.len();
        self.changes.retain(
            |c| !matches!(c, PendingChange::Create { local_id: queued, .. } if *queued == local_id),
        );
        self.changes.len() != before
    }

    /// Drop a queued update, returning whether one was present.
    pub fn cancel_update(&mut self, id: RemoteId) -> bool {
        let before = self.changes.len();
        self.changes
            .retain(|c| !matches!(c, PendingChange::Update { id: queued, .. } if *queued == id));
        self.changes.len() != before
    }

    /// Take every queued change, leaving the queue empty. Queue order is
    /// preserved, so creates retry before updates queued after them.
    pub fn drain(&mut self) -> Vec<PendingChange> {
        std::mem::take(&mut self.changes)
    }

    /// Discard everything (used when the current list switches).
    pub fn clear(&mut self) {
        self.changes.clear();
    }

    /// Iterate queued changes in order.
    pub fn iter(&self) -> impl Iterator<Item = &PendingChange> {
        self.changes.iter()
    }

    /// Number of queued changes.
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
