//! Per-conversation snapshot cache
//!
//! Snapshots are captured by whatever produces project file state and are
//! only ever removed here as a side effect of deleting their record. Removal
//! is best-effort: [`delete_snapshot`] logs failures and never returns them.

use crate::error::{ChathistError, Result};
use crate::storage::types::Snapshot;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Prefix of every snapshot key
pub const SNAPSHOT_KEY_PREFIX: &str = "snapshot:";

/// Build the cache key for a record's snapshot
///
/// # Errors
///
/// Returns `ChathistError::ValidationFailed` for an empty record id.
///
/// # Examples
///
/// ```
/// use chathist::storage::snapshot_key;
///
/// assert_eq!(snapshot_key("01HX").unwrap(), "snapshot:01HX");
/// assert!(snapshot_key("").is_err());
/// ```
pub fn snapshot_key(record_id: &str) -> Result<String> {
    if record_id.is_empty() {
        return Err(ChathistError::ValidationFailed(
            "snapshot key requires a record id".to_string(),
        )
        .into());
    }
    Ok(format!("{}{}", SNAPSHOT_KEY_PREFIX, record_id))
}

/// Storage for snapshots, keyed by record id
#[async_trait]
pub trait SnapshotCache: Send + Sync + std::fmt::Debug {
    /// Fetch the snapshot for a record, if any
    async fn get(&self, record_id: &str) -> Result<Option<Snapshot>>;

    /// Store or replace the snapshot for a record
    async fn put(&self, record_id: &str, snapshot: &Snapshot) -> Result<()>;

    /// Remove the snapshot for a record; removing an absent snapshot succeeds
    async fn remove(&self, record_id: &str) -> Result<()>;
}

/// Remove a record's snapshot, swallowing any failure
///
/// Snapshot loss is never fatal to record deletion, so errors are logged
/// as [`ChathistError::SnapshotDeletionFailed`] and dropped.
pub async fn delete_snapshot(cache: &dyn SnapshotCache, record_id: &str) {
    match cache.remove(record_id).await {
        Ok(()) => tracing::debug!(record_id, "Removed snapshot"),
        Err(e) => {
            let err = ChathistError::SnapshotDeletionFailed {
                record_id: record_id.to_string(),
                message: format!("{:#}", e),
            };
            tracing::error!(error = %err, "Error deleting snapshot");
        }
    }
}

/// Snapshot cache stored in a dedicated `sled` tree
#[derive(Debug, Clone)]
pub struct SledSnapshotCache {
    tree: sled::Tree,
}

impl SledSnapshotCache {
    pub(crate) fn new(tree: sled::Tree) -> Self {
        Self { tree }
    }
}

#[async_trait]
impl SnapshotCache for SledSnapshotCache {
    async fn get(&self, record_id: &str) -> Result<Option<Snapshot>> {
        let key = snapshot_key(record_id)?;
        match self
            .tree
            .get(key.as_bytes())
            .map_err(|e| ChathistError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn put(&self, record_id: &str, snapshot: &Snapshot) -> Result<()> {
        let key = snapshot_key(record_id)?;
        let value = serde_json::to_vec(snapshot)?;
        self.tree
            .insert(key.as_bytes(), value)
            .map_err(|e| ChathistError::Storage(format!("Insert failed: {}", e)))?;
        Ok(())
    }

    async fn remove(&self, record_id: &str) -> Result<()> {
        let key = snapshot_key(record_id)?;
        self.tree
            .remove(key.as_bytes())
            .map_err(|e| ChathistError::Storage(format!("Remove failed: {}", e)))?;
        Ok(())
    }
}

/// In-memory snapshot cache
///
/// [`InMemorySnapshotCache::set_failing`] makes every operation fail, which
/// lets tests exercise the best-effort cleanup path.
#[derive(Debug, Default)]
pub struct InMemorySnapshotCache {
    entries: Mutex<HashMap<String, Snapshot>>,
    failing: AtomicBool,
}

impl InMemorySnapshotCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent operations fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of stored snapshots
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Whether no snapshot is stored
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    fn check(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ChathistError::Storage("snapshot storage unavailable".to_string()).into());
        }
        Ok(())
    }
}

#[async_trait]
impl SnapshotCache for InMemorySnapshotCache {
    async fn get(&self, record_id: &str) -> Result<Option<Snapshot>> {
        self.check()?;
        let key = snapshot_key(record_id)?;
        Ok(self.entries.lock().await.get(&key).cloned())
    }

    async fn put(&self, record_id: &str, snapshot: &Snapshot) -> Result<()> {
        self.check()?;
        let key = snapshot_key(record_id)?;
        self.entries.lock().await.insert(key, snapshot.clone());
        Ok(())
    }

    async fn remove(&self, record_id: &str) -> Result<()> {
        self.check()?;
        let key = snapshot_key(record_id)?;
        self.entries.lock().await.remove(&key);
        Ok(())
    }
}
