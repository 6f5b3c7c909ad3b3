//! Offline action queue
//!
//! Actions taken while offline are kept in order and persisted so they survive
//! a reload. On reconnect each action is offered once to a handler; actions
//! the handler rejects stay queued for the next reconnect.

use chrono::{DateTime, Utc};
use lendhub_core::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Key holding the serialized queue
pub const PENDING_ACTIONS_KEY: &str = "lendhub.pendingActions";

/// A user action waiting for connectivity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAction {
    pub id: String,
    /// Action name, e.g. `loan.request` or `group.join`
    pub kind: String,
    pub payload: serde_json::Value,
    pub queued_at: DateTime<Utc>,
}

/// Outcome of one replay pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub delivered: usize,
    pub failed: usize,
}

impl FlushReport {
    pub fn is_complete(&self) -> bool {
        self.failed == 0
    }
}

pub struct OfflineQueue {
    store: Arc<dyn KeyValueStore>,
    actions: VecDeque<QueuedAction>,
    capacity: usize,
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("len", &self.actions.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl OfflineQueue {
    /// Load the persisted queue. Unreadable data is dropped.
    pub fn load(store: Arc<dyn KeyValueStore>, capacity: usize) -> Self {
        let actions = match store.get(PENDING_ACTIONS_KEY) {
            Ok(Some(raw)) => match serde_json::from_str::<VecDeque<QueuedAction>>(&raw) {
                Ok(actions) => actions,
                Err(e) => {
                    warn!("Pending action queue is corrupt, dropping it: {}", e);
                    if let Err(e) = store.remove(PENDING_ACTIONS_KEY) {
                        warn!("Failed to clear pending action queue: {}", e);
                    }
                    VecDeque::new()
                }
            },
            Ok(None) => VecDeque::new(),
            Err(e) => {
                warn!("Failed to read pending action queue: {}", e);
                VecDeque::new()
            }
        };

        debug!("Loaded {} pending actions", actions.len());
        Self {
            store,
            actions,
            capacity: capacity.max(1),
        }
    }

    /// Queue an action. When full, the oldest action is dropped.
    pub fn enqueue<K: Into<String>>(&mut self, kind: K, payload: serde_json::Value) -> QueuedAction {
        let action = QueuedAction {
            id: uuid::Uuid::new_v4().to_string(),
            kind: kind.into(),
            payload,
            queued_at: Utc::now(),
        };

        if self.actions.len() >= self.capacity {
            if let Some(dropped) = self.actions.pop_front() {
                warn!("Offline queue full, dropping oldest action {}", dropped.kind);
            }
        }

        self.actions.push_back(action.clone());
        self.persist();
        action
    }

    /// Offer every queued action to `handler` once, oldest first
    pub fn flush<F, E>(&mut self, mut handler: F) -> FlushReport
    where
        F: FnMut(&QueuedAction) -> Result<(), E>,
        E: std::fmt::Display,
    {
        let mut report = FlushReport::default();
        let mut remaining = VecDeque::new();

        while let Some(action) = self.actions.pop_front() {
            match handler(&action) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Replay of {} ({}) failed: {}", action.kind, action.id, e);
                    report.failed += 1;
                    remaining.push_back(action);
                }
            }
        }

        self.actions = remaining;
        self.persist();

        info!(
            "Replayed offline actions: {} delivered, {} still pending",
            report.delivered, report.failed
        );
        report
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn actions(&self) -> impl Iterator<Item = &QueuedAction> {
        self.actions.iter()
    }

    fn persist(&self) {
        let result = if self.actions.is_empty() {
            self.store.remove(PENDING_ACTIONS_KEY)
        } else {
            serde_json::to_string(&self.actions)
                .map_err(Into::into)
                .and_then(|json| self.store.set(PENDING_ACTIONS_KEY, &json))
        };

        if let Err(e) = result {
            warn!("Failed to persist offline queue, keeping it in memory: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lendhub_core::MemoryStore;
    use serde_json::json;

    #[test]
    fn test_queue_survives_reload() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());

        let mut queue = OfflineQueue::load(store.clone(), 10);
        queue.enqueue("group.join", json!({ "groupId": "g1" }));
        queue.enqueue("loan.request", json!({ "amount": 500 }));

        let reloaded = OfflineQueue::load(store, 10);
        let kinds: Vec<&str> = reloaded.actions().map(|a| a.kind.as_str()).collect();
        assert_eq!(kinds, vec!["group.join", "loan.request"]);
    }

    #[test]
    fn test_failed_actions_stay_queued_in_order() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut queue = OfflineQueue::load(store.clone(), 10);
        queue.enqueue("a", json!(1));
        queue.enqueue("b", json!(2));
        queue.enqueue("c", json!(3));

        let mut seen = Vec::new();
        let report = queue.flush(|action| {
            seen.push(action.kind.clone());
            if action.kind == "b" {
                Err("server rejected")
            } else {
                Ok(())
            }
        });

        assert_eq!(seen, vec!["a", "b", "c"]);
        assert_eq!(report, FlushReport { delivered: 2, failed: 1 });
        assert!(!report.is_complete());
        assert_eq!(queue.len(), 1);

        let report = queue.flush(|_| Ok::<(), String>(()));
        assert!(report.is_complete());
        assert!(queue.is_empty());
        assert_eq!(store.get(PENDING_ACTIONS_KEY).unwrap(), None);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let mut queue = OfflineQueue::load(store, 2);
        queue.enqueue("first", json!(null));
        queue.enqueue("second", json!(null));
        queue.enqueue("third", json!(null));

        let kinds: Vec<&str> = queue.actions().map(|a| a.kind.as_str()).collect();
        assert_eq!(kinds, vec!["second", "third"]);
    }

    #[test]
    fn test_corrupt_queue_is_dropped() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(PENDING_ACTIONS_KEY, "not json").unwrap();

        let queue = OfflineQueue::load(store.clone(), 5);
        assert!(queue.is_empty());
        assert_eq!(store.get(PENDING_ACTIONS_KEY).unwrap(), None);
    }
}
