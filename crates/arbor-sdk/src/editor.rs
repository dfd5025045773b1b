//! Editor service composing the mutation lock with store transactions.

use crate::config::EditorConfig;
use crate::error::Result;
use crate::lock::MutationLock;
use arbor_core::AtomicOperation;
use arbor_store::{Listener, NodeStore};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Shared handle on a [`NodeStore`] whose writes go through the lock.
///
/// Every batch runs inside its own transaction, and batches from different
/// owners are serialized in request order.
pub struct Editor {
    config: EditorConfig,
    store: Arc<RwLock<NodeStore>>,
    lock: Arc<MutationLock>,
    event_tx: broadcast::Sender<AtomicOperation>,
    listener: Listener,
}

impl Editor {
    pub fn new(store: NodeStore) -> Self {
        Self::with_config(store, EditorConfig::default())
    }

    pub fn with_config(mut store: NodeStore, config: EditorConfig) -> Self {
        let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
        let sender = event_tx.clone();
        let listener: Listener = Arc::new(move |op: &AtomicOperation| {
            // No receivers is fine.
            let _ = sender.send(op.clone());
        });
        store.subscribe(listener.clone());
        let lock = Arc::new(MutationLock::new(config.lock.clone()));

        Self {
            config,
            store: Arc::new(RwLock::new(store)),
            lock,
            event_tx,
            listener,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<RwLock<NodeStore>> {
        &self.store
    }

    pub fn lock(&self) -> &Arc<MutationLock> {
        &self.lock
    }

    /// Receive every operation the store emits, including those of batches
    /// that later roll back.
    pub fn subscribe(&self) -> broadcast::Receiver<AtomicOperation> {
        self.event_tx.subscribe()
    }

    fn owner_id(&self, owner: &str) -> String {
        format!("{}:{}", self.config.owner_prefix, owner)
    }

    /// Run `f` as one transaction while holding the lock.
    ///
    /// Commits when `f` succeeds and rolls back when it fails. Returns the
    /// closure's value together with the committed operations.
    pub async fn batch<T, F>(&self, owner: &str, f: F) -> Result<(T, Vec<AtomicOperation>)>
    where
        F: FnOnce(&mut NodeStore) -> arbor_store::Result<T>,
    {
        let holder = self.lock.acquire(self.owner_id(owner)).await?;

        let outcome = {
            let mut store = self.store.write();
            store.begin_transaction();
            match f(&mut store) {
                Ok(value) => store.commit_transaction().map(|ops| (value, ops)),
                Err(err) => {
                    store.rollback_transaction();
                    Err(err)
                }
            }
        };

        if let Err(err) = self.lock.release(&holder.lock_id) {
            // Only reachable when the safety timeout already reclaimed the lock.
            tracing::warn!(owner = %holder.owner_id, error = %err, "batch outlived its lock");
        }
        match &outcome {
            Ok((_, ops)) => tracing::debug!(%owner, operations = ops.len(), "batch committed"),
            Err(err) => tracing::debug!(%owner, error = %err, "batch rolled back"),
        }
        outcome.map_err(Into::into)
    }

    /// Run a read-only closure against the current store state.
    pub fn read<T>(&self, f: impl FnOnce(&NodeStore) -> T) -> T {
        f(&self.store.read())
    }
}

impl Drop for Editor {
    fn drop(&mut self) {
        self.store.write().unsubscribe(&self.listener);
    }
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("config", &self.config)
            .field("lock", &self.lock)
            .finish_non_exhaustive()
    }
}
