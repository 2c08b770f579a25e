//! Persisted FIFO queue of offline actions.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::types::{ActionKind, ActionOutcome, OfflineAction, QueueSummary};
use crate::session::SessionResult;
use crate::storage::{LocalStore, Result, StorageError, OFFLINE_QUEUE_KEY};

/// Applies a queued action through the same store method the UI uses.
#[async_trait]
pub trait OfflineActionHandler: Send + Sync {
    /// Applies one action.
    async fn apply(&self, action: &OfflineAction) -> SessionResult<()>;
}

/// Offline action queue persisted under a single key.
pub struct OfflineQueue {
    store: Arc<LocalStore>,
    /// Serializes read-modify-write of the persisted list.
    write_lock: Mutex<()>,
    processing: AtomicBool,
}

/// Clears the in-flight flag when a pass ends, including on early return.
struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl OfflineQueue {
    /// Creates a queue backed by `store`.
    #[must_use]
    pub fn new(store: Arc<LocalStore>) -> Self {
        Self {
            store,
            write_lock: Mutex::new(()),
            processing: AtomicBool::new(false),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| StorageError::Storage(format!("Queue lock poisoned: {e}")))
    }

    fn read(&self) -> Result<Vec<OfflineAction>> {
        Ok(self
            .store
            .get_json::<Vec<OfflineAction>>(OFFLINE_QUEUE_KEY)?
            .unwrap_or_default())
    }

    /// Appends an action.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn enqueue(&self, kind: ActionKind) -> Result<OfflineAction> {
        self.enqueue_at(kind, Utc::now())
    }

    /// [`enqueue`](Self::enqueue) stamped with `now`.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn enqueue_at(&self, kind: ActionKind, now: DateTime<Utc>) -> Result<OfflineAction> {
        let action = OfflineAction {
            id: hex::encode(rand::random::<[u8; 8]>()),
            queued_at: now,
            kind,
        };

        let _guard = self.lock()?;
        let mut actions = self.read()?;
        actions.push(action.clone());
        self.store.set_json(OFFLINE_QUEUE_KEY, &actions)?;

        info!(
            action_id = %action.id,
            action = %action.kind.describe(),
            queued = actions.len(),
            "Queued offline action"
        );
        Ok(action)
    }

    /// Pending actions, oldest first.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn pending(&self) -> Result<Vec<OfflineAction>> {
        self.read()
    }

    /// Number of pending actions.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    /// Whether nothing is pending.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.is_empty())
    }

    /// Drops every pending action.
    ///
    /// # Errors
    ///
    /// Storage errors.
    pub fn clear(&self) -> Result<()> {
        let _guard = self.lock()?;
        self.store.remove(OFFLINE_QUEUE_KEY)
    }

    /// Whether a replay pass is running.
    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    /// Replays every pending action once, in enqueue order.
    ///
    /// A failed action is recorded in the summary and does not stop the
    /// pass. Every replayed action is removed afterwards whether it applied
    /// or not; actions enqueued during the pass stay queued. Returns `None`
    /// if another pass is already running.
    ///
    /// # Errors
    ///
    /// Storage errors reading or rewriting the queue.
    pub async fn process(&self, handler: &dyn OfflineActionHandler) -> Result<Option<QueueSummary>> {
        if self.processing.swap(true, Ordering::SeqCst) {
            debug!("Offline queue already processing");
            return Ok(None);
        }
        let _processing = ProcessingGuard(&self.processing);

        let actions = self.pending()?;
        if actions.is_empty() {
            return Ok(Some(QueueSummary::default()));
        }
        info!(count = actions.len(), "Replaying offline actions");

        let mut summary = QueueSummary::default();
        let mut replayed = HashSet::with_capacity(actions.len());

        for action in &actions {
            let description = action.kind.describe();
            let error = match handler.apply(action).await {
                Ok(()) => {
                    summary.applied += 1;
                    None
                }
                Err(e) => {
                    warn!(action_id = %action.id, action = %description, error = %e, "Offline action failed");
                    summary.failed += 1;
                    Some(e.to_string())
                }
            };
            replayed.insert(action.id.clone());
            summary.outcomes.push(ActionOutcome {
                action_id: action.id.clone(),
                description,
                error,
            });
        }

        {
            let _guard = self.lock()?;
            let remaining: Vec<OfflineAction> = self
                .read()?
                .into_iter()
                .filter(|a| !replayed.contains(&a.id))
                .collect();
            if remaining.is_empty() {
                self.store.remove(OFFLINE_QUEUE_KEY)?;
            } else {
                self.store.set_json(OFFLINE_QUEUE_KEY, &remaining)?;
            }
        }

        info!(
            applied = summary.applied,
            failed = summary.failed,
            "Offline replay finished"
        );
        Ok(Some(summary))
    }
}

impl std::fmt::Debug for OfflineQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OfflineQueue")
            .field("processing", &self.is_processing())
            .finish_non_exhaustive()
    }
}
