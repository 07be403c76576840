//! Embedded `sled` backend for conversation history
//!
//! Records live in the database's default tree keyed by record id, stored as
//! JSON. Snapshots live in a separate `snapshots` tree of the same database,
//! see [`SledRecordStore::snapshot_cache`].

use crate::error::{ChathistError, Result};
use crate::storage::snapshot::SledSnapshotCache;
use crate::storage::types::ConversationRecord;
use crate::storage::RecordStore;
use async_trait::async_trait;
use sled::Db;
use std::path::Path;

/// Name of the tree holding snapshots
const SNAPSHOT_TREE: &str = "snapshots";

/// Conversation persistence manager
///
/// Manages persistent storage and retrieval of conversation records using
/// an embedded `sled` key-value database.
#[derive(Debug, Clone)]
pub struct SledRecordStore {
    db: Db,
}

impl SledRecordStore {
    /// Open or create a record store
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the database directory
    ///
    /// # Errors
    ///
    /// Returns `ChathistError::StoreUnavailable` if the database cannot be opened
    ///
    /// # Examples
    ///
    /// ```
    /// use chathist::storage::SledRecordStore;
    ///
    /// # fn main() -> chathist::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let store = SledRecordStore::open(dir.path().join("history.db"))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ChathistError::StoreUnavailable(format!(
                    "Failed to create parent directory for {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        let db = sled::open(path).map_err(|e| {
            ChathistError::StoreUnavailable(format!("Failed to open database: {}", e))
        })?;
        tracing::debug!(path = %path.display(), "Opened history database");
        Ok(Self { db })
    }

    /// Snapshot cache sharing this database, in its own tree
    pub fn snapshot_cache(&self) -> Result<SledSnapshotCache> {
        let tree = self.db.open_tree(SNAPSHOT_TREE).map_err(|e| {
            ChathistError::StoreUnavailable(format!("Failed to open snapshot tree: {}", e))
        })?;
        Ok(SledSnapshotCache::new(tree))
    }

    fn flush(&self) -> Result<()> {
        self.db
            .flush()
            .map_err(|e| ChathistError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl RecordStore for SledRecordStore {
    async fn get_all(&self) -> Result<Vec<ConversationRecord>> {
        let mut records = Vec::new();
        for result in self.db.iter() {
            let (_, value) =
                result.map_err(|e| ChathistError::Storage(format!("Iteration failed: {}", e)))?;

            let record: ConversationRecord = serde_json::from_slice(&value).map_err(|e| {
                ChathistError::Storage(format!("Deserialization failed: {}", e))
            })?;
            records.push(record);
        }

        Ok(records)
    }

    async fn get(&self, id: &str) -> Result<Option<ConversationRecord>> {
        match self
            .db
            .get(id.as_bytes())
            .map_err(|e| ChathistError::Storage(format!("Get failed: {}", e)))?
        {
            Some(bytes) => {
                let record = serde_json::from_slice(&bytes).map_err(|e| {
                    ChathistError::Storage(format!("Deserialization failed: {}", e))
                })?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    async fn put(&self, record: &ConversationRecord) -> Result<()> {
        let value = serde_json::to_vec(record)
            .map_err(|e| ChathistError::Storage(format!("Serialization failed: {}", e)))?;

        self.db
            .insert(record.id.as_bytes(), value)
            .map_err(|e| ChathistError::Storage(format!("Insert failed: {}", e)))?;

        self.flush()
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        let removed = self
            .db
            .remove(id.as_bytes())
            .map_err(|e| ChathistError::Storage(format!("Delete failed: {}", e)))?;

        if removed.is_none() {
            return Err(ChathistError::NotFound(id.to_string()).into());
        }

        self.flush()?;
        tracing::debug!(id, "Deleted conversation");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::snapshot::SnapshotCache;
    use crate::storage::types::Snapshot;
    use serde_json::json;
    use tempfile::TempDir;

    /// Helper: create a store backed by a temp directory.
    ///
    /// Returns the `TempDir` too so the caller keeps it alive.
    fn create_test_store() -> (SledRecordStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store =
            SledRecordStore::open(temp_dir.path().join("history.db")).expect("Failed to open store");
        (store, temp_dir)
    }

    fn record(description: &str) -> ConversationRecord {
        ConversationRecord::new(
            Some(description.to_string()),
            vec![json!({"role": "user", "content": description})],
        )
    }

    #[tokio::test]
    async fn test_open_creates_nested_directories() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("history.db");
        SledRecordStore::open(&path).expect("Failed to open store");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (store, _dir) = create_test_store();
        let rec = record("hello");
        store.put(&rec).await.expect("put failed");

        let loaded = store.get(&rec.id).await.expect("get failed");
        assert_eq!(loaded, Some(rec));
    }

    #[tokio::test]
    async fn test_get_missing_returns_none() {
        let (store, _dir) = create_test_store();
        assert!(store.get("missing").await.expect("get failed").is_none());
    }

    #[tokio::test]
    async fn test_get_all_returns_every_record() {
        let (store, _dir) = create_test_store();
        for i in 0..4 {
            store
                .save(record(&format!("task_{}", i)))
                .await
                .expect("save failed");
        }
        assert_eq!(store.get_all().await.expect("get_all failed").len(), 4);
    }

    #[tokio::test]
    async fn test_get_all_ignores_snapshot_tree() {
        let (store, _dir) = create_test_store();
        let rec = store.save(record("with snapshot")).await.expect("save failed");
        let cache = store.snapshot_cache().expect("snapshot tree");
        cache
            .put(&rec.id, &Snapshot::default())
            .await
            .expect("put snapshot failed");

        assert_eq!(store.get_all().await.expect("get_all failed").len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_record() {
        let (store, _dir) = create_test_store();
        let rec = store.save(record("doomed")).await.expect("save failed");

        store.delete_by_id(&rec.id).await.expect("delete failed");
        assert!(store.get(&rec.id).await.expect("get failed").is_none());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (store, _dir) = create_test_store();
        let err = store.delete_by_id("ghost").await.expect_err("deleted a ghost");
        assert!(matches!(
            ChathistError::classify(err),
            ChathistError::NotFound(id) if id == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("history.db");
        let id = {
            let store = SledRecordStore::open(&path).expect("Failed to open store");
            store.save(record("durable")).await.expect("save failed").id
        };

        let reopened = SledRecordStore::open(&path).expect("Failed to reopen store");
        let loaded = reopened.get(&id).await.expect("get failed").expect("missing");
        assert_eq!(loaded.description.as_deref(), Some("durable"));
    }
}
