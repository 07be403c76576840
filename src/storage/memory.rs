//! In-process record store
//!
//! Holds records in a map behind a `tokio` mutex. Besides serving embedders
//! that do not want a database on disk, it can be told to fail specific
//! deletions or to behave as an unavailable store, so callers can exercise
//! partial-failure paths deterministically.
//!
//! # Example
//!
//! ```
//! use chathist::storage::{ConversationRecord, InMemoryRecordStore, RecordStore};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let store = InMemoryRecordStore::new();
//! let saved = store
//!     .save(ConversationRecord::new(Some("Hello".to_string()), vec![]))
//!     .await
//!     .unwrap();
//!
//! store.fail_delete_for(&saved.id).await;
//! assert!(store.delete_by_id(&saved.id).await.is_err());
//! # }
//! ```

use crate::error::{ChathistError, Result};
use crate::storage::types::ConversationRecord;
use crate::storage::RecordStore;
use async_trait::async_trait;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Mutex;

/// Record store kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    records: Mutex<BTreeMap<String, ConversationRecord>>,
    failing_deletes: Mutex<HashSet<String>>,
    delete_attempts: Mutex<Vec<String>>,
    unavailable: AtomicBool,
}

impl InMemoryRecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records, written as-is
    pub async fn with_records(records: impl IntoIterator<Item = ConversationRecord>) -> Self {
        let store = Self::new();
        {
            let mut map = store.records.lock().await;
            for record in records {
                map.insert(record.id.clone(), record);
            }
        }
        store
    }

    /// Make every later deletion of `id` fail with a storage error
    pub async fn fail_delete_for(&self, id: &str) {
        self.failing_deletes.lock().await.insert(id.to_string());
    }

    /// Toggle whether the store reports itself as unavailable
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Ids passed to `delete_by_id`, in call order
    pub async fn delete_attempts(&self) -> Vec<String> {
        self.delete_attempts.lock().await.clone()
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(
                ChathistError::StoreUnavailable("in-memory store is offline".to_string()).into(),
            );
        }
        Ok(())
    }
}

#[async_trait]
impl RecordStore for InMemoryRecordStore {
    async fn get_all(&self) -> Result<Vec<ConversationRecord>> {
        self.check_available()?;
        Ok(self.records.lock().await.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> Result<Option<ConversationRecord>> {
        self.check_available()?;
        Ok(self.records.lock().await.get(id).cloned())
    }

    async fn put(&self, record: &ConversationRecord) -> Result<()> {
        self.check_available()?;
        self.records
            .lock()
            .await
            .insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        self.delete_attempts.lock().await.push(id.to_string());
        self.check_available()?;

        if self.failing_deletes.lock().await.contains(id) {
            return Err(ChathistError::Storage(format!("simulated delete failure for {}", id)).into());
        }

        match self.records.lock().await.remove(id) {
            Some(_) => Ok(()),
            None => Err(ChathistError::NotFound(id.to_string()).into()),
        }
    }
}
